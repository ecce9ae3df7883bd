//! Type references.
//!
//! A type is either resolved to a symbol id (the referent was seen during
//! extraction) or kept as its unresolved textual form. The verbatim
//! spelling is always retained so type text round-trips even when
//! resolution failed. Types store ids, never owning handles, which is what
//! lets `struct S { S* next; };` exist without an ownership cycle.

use super::id::SymbolId;

/// A reference to a type as it appeared in a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    /// The spelling as written in source.
    pub text: String,
    /// The referent's id, when the declaration was seen in this run.
    pub id: Option<SymbolId>,
    /// Structural decoration, when recognized.
    pub form: TypeForm,
}

/// Recognized structure of a type spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeForm {
    Named { name: String },
    Const(Box<TypeRef>),
    Pointer(Box<TypeRef>),
    Reference(Box<TypeRef>),
    RValueReference(Box<TypeRef>),
    Array {
        element: Box<TypeRef>,
        extent: Option<String>,
    },
    Function {
        params: Vec<TypeRef>,
        result: Box<TypeRef>,
    },
    Template { name: String, args: Vec<TypeRef> },
}

impl TypeRef {
    /// Parse a spelling, resolving base names through `resolve`.
    pub fn parse(text: &str, resolve: &dyn Fn(&str) -> Option<SymbolId>) -> Self {
        subref(text, resolve)
    }

    /// A purely textual reference with no resolution.
    pub fn unresolved(text: &str) -> Self {
        Self::parse(text, &|_| None)
    }

    /// The name of the underlying named type, if the form exposes one.
    pub fn base_name(&self) -> Option<&str> {
        fn descend(form: &TypeForm) -> Option<&str> {
            match form {
                TypeForm::Named { name } | TypeForm::Template { name, .. } => Some(name),
                TypeForm::Const(inner)
                | TypeForm::Pointer(inner)
                | TypeForm::Reference(inner)
                | TypeForm::RValueReference(inner) => descend(&inner.form),
                TypeForm::Array { element, .. } => descend(&element.form),
                TypeForm::Function { .. } => None,
            }
        }
        descend(&self.form)
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

fn base_id(form: &TypeForm) -> Option<SymbolId> {
    match form {
        TypeForm::Named { .. } | TypeForm::Template { .. } => None,
        TypeForm::Const(inner)
        | TypeForm::Pointer(inner)
        | TypeForm::Reference(inner)
        | TypeForm::RValueReference(inner) => inner.id,
        TypeForm::Array { element, .. } => element.id,
        TypeForm::Function { .. } => None,
    }
}

fn parse_form(text: &str, resolve: &dyn Fn(&str) -> Option<SymbolId>) -> TypeForm {
    let text = text.trim();

    if let Some(head) = text.strip_suffix("&&") {
        return TypeForm::RValueReference(Box::new(subref(head, resolve)));
    }
    if let Some(head) = text.strip_suffix('&') {
        return TypeForm::Reference(Box::new(subref(head, resolve)));
    }
    if let Some(head) = text.strip_suffix('*') {
        return TypeForm::Pointer(Box::new(subref(head, resolve)));
    }
    if text.ends_with(']') {
        if let Some(open) = find_array_open(text) {
            let extent = text[open + 1..text.len() - 1].trim();
            return TypeForm::Array {
                element: Box::new(subref(&text[..open], resolve)),
                extent: if extent.is_empty() {
                    None
                } else {
                    Some(extent.to_owned())
                },
            };
        }
    }
    if let Some(rest) = text.strip_prefix("const ") {
        return TypeForm::Const(Box::new(subref(rest, resolve)));
    }
    if text.ends_with('>') {
        if let Some(lt) = find_template_open(text) {
            let name = text[..lt].trim().to_owned();
            let args = split_top_level(&text[lt + 1..text.len() - 1])
                .into_iter()
                .map(|arg| subref(arg, resolve))
                .collect();
            return TypeForm::Template { name, args };
        }
    }
    if text.ends_with(')') {
        if let Some(open) = find_call_open(text) {
            let head = text[..open].trim();
            if !head.is_empty() && !head.ends_with("operator") {
                let params = split_top_level(&text[open + 1..text.len() - 1])
                    .into_iter()
                    .filter(|p| !p.trim().is_empty() && p.trim() != "void")
                    .map(|p| subref(p, resolve))
                    .collect();
                return TypeForm::Function {
                    params,
                    result: Box::new(subref(head, resolve)),
                };
            }
        }
    }
    TypeForm::Named {
        name: text.to_owned(),
    }
}

fn subref(text: &str, resolve: &dyn Fn(&str) -> Option<SymbolId>) -> TypeRef {
    let trimmed = text.trim();
    let form = parse_form(trimmed, resolve);
    let id = match &form {
        TypeForm::Named { name } | TypeForm::Template { name, .. } => resolve(name),
        _ => base_id(&form),
    };
    TypeRef {
        text: trimmed.to_owned(),
        id,
        form,
    }
}

/// Find the `[` matching the trailing `]`.
fn find_array_open(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().rev() {
        match b {
            b']' => depth += 1,
            b'[' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Find the `<` matching the trailing `>`.
fn find_template_open(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().rev() {
        match b {
            b'>' => depth += 1,
            b'<' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Find the `(` matching the trailing `)`.
fn find_call_open(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().rev() {
        match b {
            b')' => depth += 1,
            b'(' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas that sit outside any bracket nesting.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if !text[start..].trim().is_empty() {
        parts.push(&text[start..]);
    }
    parts
}
