//! Per-translation-unit extraction.
//!
//! The extractor turns one TU's declaration tree into partial symbols and
//! feeds them to the corpus builder. Everything here is TU-local: ids are
//! computed from canonical qualified identities so the same entity seen
//! from any TU lands on the same id, and type names resolve against a
//! TU-local name table with the textual form kept as the fallback.

mod compiledb;

pub use compiledb::{CompilationDatabase, CompileCommand};

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::corpus::{Corpus, CorpusBuilder, PartialSymbol};
use crate::error::Error;
use crate::frontend::{Decl, DeclKind, Frontend, FunctionDeclKind, TranslationUnit};
use crate::report::Reporter;
use crate::symbol::{
    Access, Base, EnumInfo, EnumValueInfo, FnSpecs, FriendInfo, FunctionInfo, FunctionKind,
    Javadoc, Param, RecordInfo, SpecializationInfo, Symbol, SymbolId, SymbolKind, TypeRef,
    TypedefInfo, VariableInfo,
};
use crate::taskgroup::ThreadPool;

/// Visibility policy for extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Also extract private members of records.
    pub include_private: bool,
}

/// Run the full extraction phase and finalize the corpus.
///
/// Translation units map in parallel on the pool; failures are reported
/// per TU and, under `ignore_map_errors`, do not stop the run.
pub fn build_corpus(
    db: &CompilationDatabase,
    frontend: &dyn Frontend,
    options: ExtractOptions,
    pool: &ThreadPool,
    reporter: &Arc<Reporter>,
    ignore_map_errors: bool,
) -> Result<Corpus, Error> {
    let builder = CorpusBuilder::new(Arc::clone(reporter));
    let total = db.len();
    let counter = AtomicUsize::new(0);
    let errors = pool.for_each(&db.commands, |command| {
        let index = counter.fetch_add(1, Ordering::Relaxed) + 1;
        reporter.info(format!("[{index}/{total}] mapping \"{}\"", command.file));
        match frontend.parse(command) {
            Ok(tu) => {
                extract_translation_unit(&tu, options, &builder);
                Ok(())
            }
            Err(err) => {
                reporter.could_not(format!("map \"{}\"", command.file), &err);
                Err(err)
            }
        }
    });
    if !ignore_map_errors && !errors.is_empty() {
        return Err(Error::from_errors(errors));
    }
    builder.finalize()
}

/// Extract one translation unit into the builder.
pub fn extract_translation_unit(
    tu: &TranslationUnit,
    options: ExtractOptions,
    builder: &CorpusBuilder,
) {
    let mut names = HashMap::new();
    for decl in &tu.decls {
        index_names(decl, "", &mut names);
    }
    let extractor = Extractor {
        tu_file: &tu.file,
        options,
        builder,
        names,
    };
    for decl in &tu.decls {
        extractor.emit(decl, "", SymbolId::GLOBAL);
    }
}

fn join_qual(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_owned()
    } else {
        format!("{scope}::{name}")
    }
}

/// The usr segment a declaration contributes to its qualified identity.
fn segment_for(decl: &Decl, simple: &str) -> String {
    match &decl.kind {
        DeclKind::Friend { target } => format!("friend:{target}"),
        DeclKind::Specialization { args, .. } => format!("{simple}<{args}>"),
        _ if simple.is_empty() => {
            format!("(anonymous@{}:{})", decl.loc.line, decl.loc.column)
        }
        _ => simple.to_owned(),
    }
}

/// Split a possibly qualified declared name (`n::f`, from an out-of-line
/// definition) into the effective parent qualification and the simple
/// name. Only functions and variables can be declared with a nested name
/// specifier; conversion operators keep their `operator std::string`
/// spelling intact.
fn effective_scope(decl: &Decl, scope_qual: &str) -> (String, String) {
    let splittable = matches!(
        decl.kind,
        DeclKind::Function { .. } | DeclKind::Variable { .. }
    ) && !decl.name.starts_with("operator");
    if splittable {
        if let Some((prefix, simple)) = decl.name.rsplit_once("::") {
            return (join_qual(scope_qual, prefix), simple.to_owned());
        }
    }
    (scope_qual.to_owned(), decl.name.clone())
}

/// First pass: qualified type names visible anywhere in this TU, used to
/// resolve type references in the second pass.
fn index_names(decl: &Decl, scope_qual: &str, names: &mut HashMap<String, SymbolId>) {
    let (parent_qual, simple) = effective_scope(decl, scope_qual);
    let segment = segment_for(decl, &simple);
    let qual = join_qual(&parent_qual, &segment);
    match &decl.kind {
        DeclKind::Namespace => {
            names.insert(qual.clone(), SymbolId::from_usr(&qual));
        }
        DeclKind::Record { .. }
        | DeclKind::Specialization { .. }
        | DeclKind::Enum { .. }
        | DeclKind::Typedef { .. } => {
            names.insert(qual.clone(), SymbolId::from_usr(&qual));
        }
        _ => {}
    }
    for child in &decl.children {
        index_names(child, &qual, names);
    }
}

struct Extractor<'a> {
    tu_file: &'a str,
    options: ExtractOptions,
    builder: &'a CorpusBuilder,
    names: HashMap<String, SymbolId>,
}

impl Extractor<'_> {
    /// Resolve a type name from the given scope outward.
    fn resolve(&self, scope_qual: &str, name: &str) -> Option<SymbolId> {
        let mut scope = scope_qual.to_owned();
        loop {
            let candidate = join_qual(&scope, name);
            if let Some(id) = self.names.get(&candidate) {
                return Some(*id);
            }
            if scope.is_empty() {
                return None;
            }
            scope = scope
                .rsplit_once("::")
                .map(|(head, _)| head.to_owned())
                .unwrap_or_default();
        }
    }

    fn type_ref(&self, scope_qual: &str, text: &str) -> TypeRef {
        TypeRef::parse(text, &|name| self.resolve(scope_qual, name))
    }

    /// The default visibility policy: external linkage, public access,
    /// widened by `include-private`. Friends are part of the record's
    /// public contract and always survive.
    fn skipped(&self, decl: &Decl) -> bool {
        if decl.internal_linkage {
            return true;
        }
        decl.access == Access::Private
            && !self.options.include_private
            && !matches!(decl.kind, DeclKind::Friend { .. })
    }

    /// Emit a partial symbol for `decl` and recurse into its members.
    /// Returns the id when the declaration was extracted.
    fn emit(&self, decl: &Decl, parent_qual: &str, parent_id: SymbolId) -> Option<SymbolId> {
        if self.skipped(decl) {
            return None;
        }

        let (effective_qual, simple) = effective_scope(decl, parent_qual);
        let effective_parent = if effective_qual == parent_qual {
            parent_id
        } else if effective_qual.is_empty() {
            SymbolId::GLOBAL
        } else {
            SymbolId::from_usr(&effective_qual)
        };
        let segment = segment_for(decl, &simple);
        let qual = join_qual(&effective_qual, &segment);
        let usr = match &decl.kind {
            DeclKind::Function { params, specs, .. } => {
                let signature: Vec<&str> = params.iter().map(|p| p.ty.as_str()).collect();
                let constness = if specs.is_const { " const" } else { "" };
                format!("{qual}({}){constness}", signature.join(","))
            }
            _ => qual.clone(),
        };
        let id = SymbolId::from_usr(&usr);

        let members: Vec<SymbolId> = decl
            .children
            .iter()
            .filter_map(|child| self.emit(child, &qual, id))
            .collect();

        let doc = decl
            .comment
            .as_deref()
            .map(Javadoc::parse)
            .filter(|doc| !doc.is_empty());

        let symbol = Symbol {
            id,
            name: simple,
            parent: effective_parent,
            access: decl.access,
            members,
            doc,
            loc: Some(decl.loc.clone()),
            redecls: Vec::new(),
            kind: self.symbol_kind(decl, &qual),
        };
        self.builder.insert_or_merge(PartialSymbol {
            symbol,
            tu_file: self.tu_file.to_owned(),
            is_definition: decl.is_definition,
        });
        Some(id)
    }

    fn symbol_kind(&self, decl: &Decl, qual: &str) -> SymbolKind {
        match &decl.kind {
            DeclKind::Namespace => SymbolKind::Namespace,
            DeclKind::Record { tag, bases } => SymbolKind::Record(RecordInfo {
                tag: *tag,
                bases: bases
                    .iter()
                    .map(|base| Base {
                        ty: self.type_ref(qual, &base.ty),
                        access: base.access,
                        is_virtual: base.is_virtual,
                    })
                    .collect(),
            }),
            DeclKind::Specialization { primary, args, .. } => {
                SymbolKind::Specialization(SpecializationInfo {
                    primary: self.resolve(qual, primary),
                    args: args.clone(),
                })
            }
            DeclKind::Function {
                params,
                return_type,
                specs,
                kind,
            } => SymbolKind::Function(FunctionInfo {
                kind: match kind {
                    FunctionDeclKind::Plain => FunctionKind::Plain,
                    FunctionDeclKind::Constructor => FunctionKind::Constructor,
                    FunctionDeclKind::Destructor => FunctionKind::Destructor,
                    FunctionDeclKind::Operator => FunctionKind::Operator,
                    FunctionDeclKind::Conversion => FunctionKind::Conversion,
                },
                params: params
                    .iter()
                    .map(|param| Param {
                        name: param.name.clone(),
                        ty: self.type_ref(qual, &param.ty),
                        default: param.default.clone(),
                    })
                    .collect(),
                return_type: if return_type.is_empty() {
                    None
                } else {
                    Some(self.type_ref(qual, return_type))
                },
                specs: FnSpecs {
                    is_const: specs.is_const,
                    is_ref_qualified: specs.is_ref_qualified,
                    is_noexcept: specs.is_noexcept,
                    is_constexpr: specs.is_constexpr,
                    is_consteval: specs.is_consteval,
                    is_explicit: specs.is_explicit,
                    is_virtual: specs.is_virtual,
                    is_pure: specs.is_pure,
                    is_defaulted: specs.is_defaulted,
                    is_deleted: specs.is_deleted,
                },
            }),
            DeclKind::Enum { scoped, underlying } => SymbolKind::Enum(EnumInfo {
                scoped: *scoped,
                underlying: underlying.as_deref().map(|u| self.type_ref(qual, u)),
            }),
            DeclKind::EnumValue { init } => SymbolKind::EnumValue(EnumValueInfo {
                init: init.clone(),
            }),
            DeclKind::Typedef { underlying } => SymbolKind::Typedef(TypedefInfo {
                underlying: self.type_ref(qual, underlying),
            }),
            DeclKind::Variable { ty, init } => SymbolKind::Variable(VariableInfo {
                ty: self.type_ref(qual, ty),
                init: init.clone(),
            }),
            DeclKind::Field { ty, init } => SymbolKind::Field(VariableInfo {
                ty: self.type_ref(qual, ty),
                init: init.clone(),
            }),
            DeclKind::Friend { target } => SymbolKind::Friend(FriendInfo {
                target: target.clone(),
            }),
        }
    }
}
