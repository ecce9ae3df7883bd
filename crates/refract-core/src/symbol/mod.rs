//! The symbol model: every entity that may appear in documentation output.
//!
//! Symbols form a tree rooted at the global namespace. Each symbol carries
//! the fields common to all kinds plus a kind-specific payload in
//! [`SymbolKind`]; the fieldless [`Kind`] discriminant gives constant-time
//! dispatch for walkers and serializers.

mod id;
mod javadoc;
mod types;

pub use id::SymbolId;
pub use javadoc::{Block, Javadoc, Span, Text};
pub use types::{TypeForm, TypeRef};

use std::fmt;

/// Provenance file used for symbols synthesized during finalization.
pub const INFERRED_FILE: &str = "<inferred>";

/// A position in a source file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// The location attached to synthesized placeholder symbols.
    pub fn inferred() -> Self {
        Self::new(INFERRED_FILE, 0, 0)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Member access of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    Public,
    Protected,
    Private,
    /// Not a class member.
    #[default]
    None,
}

impl Access {
    pub fn as_str(self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Protected => "protected",
            Access::Private => "private",
            Access::None => "none",
        }
    }
}

/// The class-key of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordTag {
    Class,
    #[default]
    Struct,
    Union,
}

impl RecordTag {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordTag::Class => "class",
            RecordTag::Struct => "struct",
            RecordTag::Union => "union",
        }
    }
}

/// A base-class entry of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base {
    pub ty: TypeRef,
    pub access: Access,
    pub is_virtual: bool,
}

/// What sort of function a function symbol is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FunctionKind {
    #[default]
    Plain,
    Constructor,
    Destructor,
    Operator,
    Conversion,
}

/// Declaration qualifiers observed on a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FnSpecs {
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

impl FnSpecs {
    /// Union of qualifiers observed across translation units.
    pub fn union(self, other: Self) -> Self {
        Self {
            is_const: self.is_const || other.is_const,
            is_ref_qualified: self.is_ref_qualified || other.is_ref_qualified,
            is_noexcept: self.is_noexcept || other.is_noexcept,
            is_constexpr: self.is_constexpr || other.is_constexpr,
            is_consteval: self.is_consteval || other.is_consteval,
            is_explicit: self.is_explicit || other.is_explicit,
            is_virtual: self.is_virtual || other.is_virtual,
            is_pure: self.is_pure || other.is_pure,
            is_defaulted: self.is_defaulted || other.is_defaulted,
            is_deleted: self.is_deleted || other.is_deleted,
        }
    }
}

/// One function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
    /// Default-argument text, verbatim.
    pub default: Option<String>,
}

/// Record payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordInfo {
    pub tag: RecordTag,
    pub bases: Vec<Base>,
}

/// Function payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub kind: FunctionKind,
    pub params: Vec<Param>,
    /// Absent for constructors and destructors.
    pub return_type: Option<TypeRef>,
    pub specs: FnSpecs,
}

/// Enum payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumInfo {
    pub scoped: bool,
    pub underlying: Option<TypeRef>,
}

/// Enum-value payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumValueInfo {
    /// Initializer text, verbatim.
    pub init: Option<String>,
}

/// Typedef / alias payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedefInfo {
    pub underlying: TypeRef,
}

/// Variable or field payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableInfo {
    pub ty: TypeRef,
    /// Initializer text, verbatim.
    pub init: Option<String>,
}

/// Friend payload: the befriended declaration, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FriendInfo {
    pub target: String,
}

/// Explicit-specialization payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecializationInfo {
    /// The primary template, when seen.
    pub primary: Option<SymbolId>,
    /// Template-argument text, verbatim.
    pub args: String,
}

/// Kind-specific payload of a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Namespace,
    Record(RecordInfo),
    Function(FunctionInfo),
    Enum(EnumInfo),
    EnumValue(EnumValueInfo),
    Typedef(TypedefInfo),
    Variable(VariableInfo),
    Field(VariableInfo),
    Friend(FriendInfo),
    Specialization(SpecializationInfo),
}

impl SymbolKind {
    pub fn kind(&self) -> Kind {
        match self {
            SymbolKind::Namespace => Kind::Namespace,
            SymbolKind::Record(_) => Kind::Record,
            SymbolKind::Function(_) => Kind::Function,
            SymbolKind::Enum(_) => Kind::Enum,
            SymbolKind::EnumValue(_) => Kind::EnumValue,
            SymbolKind::Typedef(_) => Kind::Typedef,
            SymbolKind::Variable(_) => Kind::Variable,
            SymbolKind::Field(_) => Kind::Field,
            SymbolKind::Friend(_) => Kind::Friend,
            SymbolKind::Specialization(_) => Kind::Specialization,
        }
    }
}

/// Fieldless discriminant for constant-time dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Namespace,
    Record,
    Function,
    Enum,
    EnumValue,
    Typedef,
    Variable,
    Field,
    Friend,
    Specialization,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Namespace => "namespace",
            Kind::Record => "record",
            Kind::Function => "function",
            Kind::Enum => "enum",
            Kind::EnumValue => "enum-value",
            Kind::Typedef => "typedef",
            Kind::Variable => "variable",
            Kind::Field => "field",
            Kind::Friend => "friend",
            Kind::Specialization => "specialization",
        }
    }

    /// Whether this kind admits member symbols.
    pub fn has_members(self) -> bool {
        matches!(self, Kind::Namespace | Kind::Record | Kind::Enum)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One documented entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub id: SymbolId,
    /// Empty for the global namespace and anonymous entities.
    pub name: String,
    /// The lexical enclosing symbol; [`SymbolId::GLOBAL`] for the root's
    /// own parent field.
    pub parent: SymbolId,
    pub access: Access,
    /// Member ids ordered by primary source location, ties broken by id.
    pub members: Vec<SymbolId>,
    pub doc: Option<Javadoc>,
    /// Primary provenance. The synthesized root has none.
    pub loc: Option<SourceLocation>,
    /// Redeclaration provenances, sorted.
    pub redecls: Vec<SourceLocation>,
    pub kind: SymbolKind,
}

impl Symbol {
    /// The global namespace root.
    pub fn global_namespace() -> Self {
        Self {
            id: SymbolId::GLOBAL,
            name: String::new(),
            parent: SymbolId::GLOBAL,
            access: Access::None,
            members: Vec::new(),
            doc: None,
            loc: None,
            redecls: Vec::new(),
            kind: SymbolKind::Namespace,
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind.kind()
    }

    pub fn is_record(&self) -> bool {
        self.kind() == Kind::Record
    }

    pub fn has_members(&self) -> bool {
        self.kind().has_members()
    }

    /// The sort key ordering members under a parent.
    pub fn order_key(&self) -> (SourceLocation, SymbolId) {
        (self.loc.clone().unwrap_or_default(), self.id)
    }
}
