//! Merging partial symbols across translation units.
//!
//! Extraction emits one [`PartialSymbol`] per declaration per TU; the same
//! entity seen from N translation units produces N partials with one id.
//! Merging folds each group into a canonical symbol. The fold is
//! arrival-order independent: observations are first sorted by a total
//! preference order (definitions first, then lexicographic TU file, then
//! location), so the outcome is identical at any concurrency level.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::Error;
use crate::report::Reporter;
use crate::symbol::{
    Javadoc, SourceLocation, Symbol, SymbolId, SymbolKind,
};

/// One translation unit's view of a symbol.
#[derive(Debug, Clone)]
pub struct PartialSymbol {
    pub symbol: Symbol,
    /// The TU this view came from.
    pub tu_file: String,
    /// Whether this view saw the definition.
    pub is_definition: bool,
}

/// Merge a group of partials sharing one id into a canonical symbol.
///
/// Kind mismatch within a group is a fatal corpus inconsistency. Field
/// conflicts that survive the preference order are reported as warnings
/// and resolved deterministically.
pub fn merge_group(
    mut group: Vec<PartialSymbol>,
    reporter: &Arc<Reporter>,
) -> Result<Symbol, Error> {
    debug_assert!(!group.is_empty());

    // Definitions beat declarations; ties go to the lexicographically
    // first TU, then the earliest location.
    group.sort_by(|a, b| {
        b.is_definition
            .cmp(&a.is_definition)
            .then_with(|| a.tu_file.cmp(&b.tu_file))
            .then_with(|| a.symbol.loc.cmp(&b.symbol.loc))
    });

    let id = group[0].symbol.id;
    for partial in &group[1..] {
        if partial.symbol.kind.kind() != group[0].symbol.kind.kind() {
            return Err(Error::new(format!(
                "symbol {id} was seen both as {} (in \"{}\") and as {} (in \"{}\")",
                group[0].symbol.kind.kind(),
                group[0].tu_file,
                partial.symbol.kind.kind(),
                partial.tu_file,
            )));
        }
    }

    let mut members: BTreeSet<SymbolId> = BTreeSet::new();
    let mut locations: BTreeSet<SourceLocation> = BTreeSet::new();
    let mut docs: Vec<(String, bool, Javadoc)> = Vec::new();

    let mut iter = group.into_iter();
    let strongest = iter.next().unwrap_or_else(|| unreachable!());
    let strongest_def = strongest.is_definition;
    let strongest_tu = strongest.tu_file.clone();
    let mut canon = strongest.symbol;

    members.extend(canon.members.drain(..));
    locations.extend(canon.loc.iter().cloned());
    locations.extend(canon.redecls.drain(..));
    if let Some(doc) = canon.doc.take() {
        if !doc.is_empty() {
            docs.push((strongest_tu.clone(), strongest_def, doc));
        }
    }

    for partial in iter {
        let mut sym = partial.symbol;

        if canon.name.is_empty() && !sym.name.is_empty() {
            canon.name = sym.name.clone();
        } else if !sym.name.is_empty() && sym.name != canon.name {
            reporter.warn(format!(
                "conflicting names for symbol {id}: keeping \"{}\" over \"{}\" (from \"{}\")",
                canon.name, sym.name, partial.tu_file,
            ));
        }

        if sym.parent != canon.parent {
            reporter.warn(format!(
                "conflicting parents for symbol {id}: keeping the one from \"{strongest_tu}\"",
            ));
        }
        if sym.access != canon.access {
            reporter.warn(format!(
                "conflicting access for symbol {id}: keeping {}",
                canon.access.as_str(),
            ));
        }

        merge_payload(id, &mut canon.kind, sym.kind, &partial.tu_file, reporter);

        members.extend(sym.members.drain(..));
        locations.extend(sym.loc.iter().cloned());
        locations.extend(sym.redecls.drain(..));
        if let Some(doc) = sym.doc.take() {
            if !doc.is_empty() {
                docs.push((partial.tu_file.clone(), partial.is_definition, doc));
            }
        }
    }

    canon.members = members.into_iter().collect();
    locations.remove(&canon.loc.clone().unwrap_or_default());
    canon.redecls = locations.into_iter().collect();
    canon.doc = merge_docs(docs);
    Ok(canon)
}

/// Pick the surviving doc block: the definition's doc wins; with only
/// declarations, docs concatenate in TU lexicographic order.
fn merge_docs(mut docs: Vec<(String, bool, Javadoc)>) -> Option<Javadoc> {
    if docs.is_empty() {
        return None;
    }
    if let Some((_, _, doc)) = docs
        .iter()
        .filter(|(_, is_def, _)| *is_def)
        .min_by(|a, b| a.0.cmp(&b.0))
    {
        return Some(doc.clone());
    }
    docs.sort_by(|a, b| a.0.cmp(&b.0));
    let mut merged = Javadoc::default();
    for (_, _, doc) in docs {
        merged.append(doc);
    }
    Some(merged)
}

/// Fold a weaker payload observation into the canonical one.
///
/// Empty attributes are overridden by non-empty observations; surviving
/// disagreements keep the canonical (stronger) value and warn. Qualifier
/// flags and the scoped flag union across observations.
fn merge_payload(
    id: SymbolId,
    canon: &mut SymbolKind,
    other: SymbolKind,
    other_tu: &str,
    reporter: &Arc<Reporter>,
) {
    match (canon, other) {
        (SymbolKind::Namespace, SymbolKind::Namespace) => {}
        (SymbolKind::Record(a), SymbolKind::Record(b)) => {
            if a.bases.is_empty() {
                a.bases = b.bases;
            } else if !b.bases.is_empty() && b.bases != a.bases {
                reporter.warn(format!(
                    "conflicting base lists for symbol {id}; ignoring the ones from \"{other_tu}\"",
                ));
            }
            if a.tag != b.tag {
                reporter.warn(format!(
                    "conflicting record tags for symbol {id}: keeping {}",
                    a.tag.as_str(),
                ));
            }
        }
        (SymbolKind::Function(a), SymbolKind::Function(b)) => {
            a.specs = a.specs.union(b.specs);
            if a.params.is_empty() {
                a.params = b.params;
            } else if a.params.len() == b.params.len() {
                for (pa, pb) in a.params.iter_mut().zip(b.params) {
                    if pa.name.is_empty() {
                        pa.name = pb.name;
                    }
                    match (&pa.default, pb.default) {
                        (None, Some(default)) => pa.default = Some(default),
                        (Some(ours), Some(theirs)) if *ours != theirs => {
                            reporter.warn(format!(
                                "conflicting default arguments for symbol {id}: keeping \"{ours}\"",
                            ));
                        }
                        _ => {}
                    }
                }
            } else if !b.params.is_empty() {
                reporter.warn(format!(
                    "conflicting parameter lists for symbol {id}; ignoring the ones from \"{other_tu}\"",
                ));
            }
            if a.return_type.is_none() {
                a.return_type = b.return_type;
            }
        }
        (SymbolKind::Enum(a), SymbolKind::Enum(b)) => {
            a.scoped |= b.scoped;
            if a.underlying.is_none() {
                a.underlying = b.underlying;
            }
        }
        (SymbolKind::EnumValue(a), SymbolKind::EnumValue(b)) => {
            if a.init.is_none() {
                a.init = b.init;
            }
        }
        (SymbolKind::Typedef(a), SymbolKind::Typedef(b)) => {
            if a.underlying.text != b.underlying.text {
                reporter.warn(format!(
                    "conflicting aliased types for symbol {id}: keeping \"{}\"",
                    a.underlying.text,
                ));
            } else if a.underlying.id.is_none() {
                a.underlying = b.underlying;
            }
        }
        (SymbolKind::Variable(a), SymbolKind::Variable(b))
        | (SymbolKind::Field(a), SymbolKind::Field(b)) => {
            if a.init.is_none() {
                a.init = b.init;
            }
            if a.ty.id.is_none() && b.ty.text == a.ty.text {
                a.ty = b.ty;
            }
        }
        (SymbolKind::Friend(a), SymbolKind::Friend(b)) => {
            if a.target.is_empty() {
                a.target = b.target;
            }
        }
        (SymbolKind::Specialization(a), SymbolKind::Specialization(b)) => {
            if a.primary.is_none() {
                a.primary = b.primary;
            }
            if a.args.is_empty() {
                a.args = b.args;
            }
        }
        // Kind agreement was checked before folding.
        _ => unreachable!("payload kinds diverge after kind check"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CaptureSink;
    use crate::symbol::{Access, FunctionInfo, FunctionKind, FnSpecs, RecordInfo, TypeRef};

    fn reporter() -> Arc<Reporter> {
        Reporter::with_sink(Box::new(CaptureSink::new()), false)
    }

    fn partial(
        name: &str,
        kind: SymbolKind,
        tu: &str,
        is_definition: bool,
        doc: Option<&str>,
    ) -> PartialSymbol {
        let id = SymbolId::from_usr(name);
        let mut symbol = Symbol::global_namespace();
        symbol.id = id;
        symbol.name = name.to_owned();
        symbol.access = Access::None;
        symbol.kind = kind;
        symbol.loc = Some(SourceLocation::new(tu, 1, 1));
        symbol.doc = doc.map(Javadoc::parse);
        PartialSymbol {
            symbol,
            tu_file: tu.to_owned(),
            is_definition,
        }
    }

    fn function(return_type: &str) -> SymbolKind {
        SymbolKind::Function(FunctionInfo {
            kind: FunctionKind::Plain,
            params: Vec::new(),
            return_type: Some(TypeRef::unresolved(return_type)),
            specs: FnSpecs::default(),
        })
    }

    #[test]
    fn kind_mismatch_is_fatal() {
        let rep = reporter();
        let err = merge_group(
            vec![
                partial("X", SymbolKind::Record(RecordInfo::default()), "a.cpp", true, None),
                partial("X", SymbolKind::Enum(Default::default()), "b.cpp", true, None),
            ],
            &rep,
        )
        .unwrap_err();
        assert!(err.failed());
        assert!(err.message().contains(&SymbolId::from_usr("X").to_string()));
        assert!(err.message().contains("record"));
        assert!(err.message().contains("enum"));
    }

    #[test]
    fn definition_doc_wins() {
        let rep = reporter();
        let merged = merge_group(
            vec![
                partial("f", function("int"), "a.cpp", false, Some("brief a")),
                partial("f", function("int"), "b.cpp", true, Some("brief b")),
            ],
            &rep,
        )
        .unwrap();
        let doc = merged.doc.expect("doc survives");
        assert_eq!(doc.brief().map(|t| t.to_plain()).as_deref(), Some("brief b"));
    }

    #[test]
    fn declaration_docs_concatenate_in_tu_order() {
        let rep = reporter();
        let merged = merge_group(
            vec![
                partial("f", function("int"), "z.cpp", false, Some("brief z")),
                partial("f", function("int"), "a.cpp", false, Some("brief a")),
            ],
            &rep,
        )
        .unwrap();
        let doc = merged.doc.expect("doc survives");
        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.brief().map(|t| t.to_plain()).as_deref(), Some("brief a"));
    }

    #[test]
    fn merge_is_arrival_order_independent() {
        let rep = reporter();
        let forward = vec![
            partial("f", function("int"), "a.cpp", false, Some("brief a")),
            partial("f", function("int"), "b.cpp", true, Some("brief b")),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();
        let lhs = merge_group(forward, &rep).unwrap();
        let rhs = merge_group(reversed, &rep).unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn forward_declaration_gains_definition_fields() {
        let rep = reporter();
        let decl = partial("S", SymbolKind::Record(RecordInfo::default()), "b.cpp", false, None);
        let mut def = partial("S", SymbolKind::Record(RecordInfo::default()), "a.cpp", true, None);
        def.symbol.members = vec![SymbolId::from_usr("S::m")];
        let merged = merge_group(vec![decl, def], &rep).unwrap();
        assert_eq!(merged.members, vec![SymbolId::from_usr("S::m")]);
        assert!(merged.loc.is_some());
        assert_eq!(merged.redecls.len(), 1);
    }

    #[test]
    fn merge_single_partial_is_identity() {
        let rep = reporter();
        let original = partial("f", function("int"), "a.cpp", true, Some("brief"));
        let expected = original.symbol.clone();
        let merged = merge_group(vec![original], &rep).unwrap();
        assert_eq!(merged, expected);
    }
}
