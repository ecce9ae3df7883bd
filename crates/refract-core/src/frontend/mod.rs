//! The parsing front-end contract.
//!
//! The extractor does not parse source itself: a [`Frontend`] turns one
//! compile command into a [`TranslationUnit`], a tree of declaration
//! records with locations and raw comment text. The built-in
//! [`HeaderScanner`] handles the declaration-level subset of the language;
//! it is not a compiler: no preprocessing, no template instantiation, no
//! expression evaluation, and function bodies are skipped.

mod lexer;
mod scanner;

pub use scanner::{scan, ScanError};

use crate::error::Error;
use crate::extract::CompileCommand;
use crate::symbol::{Access, RecordTag, SourceLocation};

/// One preprocessed source file's declarations.
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    /// The primary source file.
    pub file: String,
    /// Top-level declarations in source order.
    pub decls: Vec<Decl>,
}

/// One declaration record as seen in one translation unit.
#[derive(Debug, Clone)]
pub struct Decl {
    pub kind: DeclKind,
    /// Empty for anonymous entities.
    pub name: String,
    pub loc: SourceLocation,
    pub access: Access,
    pub is_definition: bool,
    /// Internal linkage (`static` at namespace scope, anonymous
    /// namespaces): excluded from extraction.
    pub internal_linkage: bool,
    /// Raw doc-comment text, decoration already stripped.
    pub comment: Option<String>,
    /// Nested declarations in source order.
    pub children: Vec<Decl>,
}

impl Decl {
    pub fn new(kind: DeclKind, name: impl Into<String>, loc: SourceLocation) -> Self {
        Self {
            kind,
            name: name.into(),
            loc,
            access: Access::None,
            is_definition: true,
            internal_linkage: false,
            comment: None,
            children: Vec::new(),
        }
    }
}

/// Kind-specific contents of a declaration record. All types and
/// initializers are verbatim text; resolution happens in the extractor.
#[derive(Debug, Clone)]
pub enum DeclKind {
    Namespace,
    Record {
        tag: RecordTag,
        bases: Vec<BaseDecl>,
    },
    /// An explicit specialization, e.g. `template <> struct S<int>`.
    Specialization {
        tag: RecordTag,
        /// The primary template's name.
        primary: String,
        /// Template-argument text.
        args: String,
    },
    Function {
        params: Vec<ParamDecl>,
        /// Empty for constructors, destructors, and conversions.
        return_type: String,
        specs: FnSpecDecl,
        kind: FunctionDeclKind,
    },
    Enum {
        scoped: bool,
        underlying: Option<String>,
    },
    EnumValue {
        init: Option<String>,
    },
    Typedef {
        underlying: String,
    },
    Variable {
        ty: String,
        init: Option<String>,
    },
    Field {
        ty: String,
        init: Option<String>,
    },
    Friend {
        target: String,
    },
}

/// A base-class entry as written.
#[derive(Debug, Clone)]
pub struct BaseDecl {
    pub ty: String,
    pub access: Access,
    pub is_virtual: bool,
}

/// A parameter as written.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: String,
    pub ty: String,
    pub default: Option<String>,
}

/// Function qualifiers as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct FnSpecDecl {
    pub is_const: bool,
    pub is_ref_qualified: bool,
    pub is_noexcept: bool,
    pub is_constexpr: bool,
    pub is_consteval: bool,
    pub is_explicit: bool,
    pub is_virtual: bool,
    pub is_pure: bool,
    pub is_defaulted: bool,
    pub is_deleted: bool,
}

/// What sort of function a declaration is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FunctionDeclKind {
    #[default]
    Plain,
    Constructor,
    Destructor,
    Operator,
    Conversion,
}

/// Produces a translation unit from a compile command.
pub trait Frontend: Send + Sync {
    fn parse(&self, command: &CompileCommand) -> Result<TranslationUnit, Error>;
}

/// The built-in declaration scanner reading headers from disk.
#[derive(Debug, Default)]
pub struct HeaderScanner;

impl Frontend for HeaderScanner {
    fn parse(&self, command: &CompileCommand) -> Result<TranslationUnit, Error> {
        let path = command.absolute_file();
        let source = std::fs::read_to_string(&path)
            .map_err(|err| Error::new(format!("read \"{}\": {err}", path.display())))?;
        let file = command.file.clone();
        let decls = scan(&source, &file)
            .map_err(|err| Error::new(format!("scan \"{file}\": {err}")))?;
        Ok(TranslationUnit { file, decls })
    }
}

/// A front-end serving pre-built declaration trees, for tests and tools
/// that already hold an AST.
#[derive(Debug, Default)]
pub struct MemoryFrontend {
    units: std::collections::HashMap<String, Vec<Decl>>,
}

impl MemoryFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file: impl Into<String>, decls: Vec<Decl>) {
        self.units.insert(file.into(), decls);
    }

    /// Register a source text, scanning it with the built-in scanner.
    pub fn insert_source(&mut self, file: impl Into<String>, source: &str) -> Result<(), Error> {
        let file = file.into();
        let decls = scan(source, &file)
            .map_err(|err| Error::new(format!("scan \"{file}\": {err}")))?;
        self.units.insert(file, decls);
        Ok(())
    }
}

impl Frontend for MemoryFrontend {
    fn parse(&self, command: &CompileCommand) -> Result<TranslationUnit, Error> {
        match self.units.get(&command.file) {
            Some(decls) => Ok(TranslationUnit {
                file: command.file.clone(),
                decls: decls.clone(),
            }),
            None => Err(Error::new(format!(
                "no translation unit registered for \"{}\"",
                command.file
            ))),
        }
    }
}
