//! Filesystem-safe artifact names.
//!
//! Maps every symbol id to a filename that is deterministic, unique
//! within the corpus, and valid on all supported filesystems. Built once
//! on the walker thread; workers receive their names precomputed.

use std::collections::{HashMap, HashSet};

use crate::corpus::Corpus;
use crate::symbol::{Symbol, SymbolId};

/// Longest natural name kept before eliding to a hash suffix.
const MAX_NAME_LEN: usize = 200;
/// How much of the natural name survives elision.
const ELIDED_PREFIX_LEN: usize = 160;

/// The safe-name table for one corpus.
#[derive(Debug, Clone)]
pub struct SafeNames {
    names: HashMap<SymbolId, String>,
}

impl SafeNames {
    /// Allocate names for every symbol, in id order so collision suffixes
    /// are deterministic.
    pub fn build(corpus: &Corpus) -> Self {
        let mut names = HashMap::new();
        // Filesystems may fold case; reserve names case-insensitively.
        let mut taken: HashSet<String> = HashSet::new();
        for symbol in corpus.iter() {
            let base = if symbol.id.is_global() {
                "index".to_owned()
            } else {
                sanitize(&qualified_name(corpus, symbol), symbol.id)
            };
            let mut name = base.clone();
            let mut suffix = 1u32;
            while !taken.insert(name.to_lowercase()) {
                suffix += 1;
                name = format!("{base}-{suffix}");
            }
            names.insert(symbol.id, name);
        }
        Self { names }
    }

    /// The name allocated for `id`. Ids must come from the same corpus.
    pub fn get(&self, id: SymbolId) -> &str {
        self.names
            .get(&id)
            .map(String::as_str)
            .unwrap_or("unnamed")
    }
}

/// The `-`-joined qualified name of a symbol.
fn qualified_name(corpus: &Corpus, symbol: &Symbol) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let mut current = symbol;
    loop {
        segments.push(if current.name.is_empty() {
            "anon"
        } else {
            current.name.as_str()
        });
        if current.parent == SymbolId::GLOBAL {
            break;
        }
        match corpus.find(current.parent) {
            Some(parent) if !parent.id.is_global() => current = parent,
            _ => break,
        }
    }
    segments.reverse();
    segments.join("-")
}

/// Restrict a name to portable filename characters, dodge reserved
/// Windows device names, and elide over-long names to a hash suffix.
fn sanitize(natural: &str, id: SymbolId) -> String {
    let mut name: String = natural
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    while name.starts_with('.') {
        name.remove(0);
    }
    if name.is_empty() {
        name = format!("sym-{}", &id.to_string()[..16]);
    }
    if is_reserved_device_name(&name) {
        name.push('_');
    }
    if name.len() > MAX_NAME_LEN {
        name.truncate(ELIDED_PREFIX_LEN);
        name.push('-');
        name.push_str(&id.to_string()[..16]);
    }
    name
}

fn is_reserved_device_name(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    matches!(upper.as_str(), "CON" | "PRN" | "AUX" | "NUL")
        || (upper.len() == 4
            && (upper.starts_with("COM") || upper.starts_with("LPT"))
            && upper[3..].chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{CorpusBuilder, PartialSymbol};
    use crate::report::{CaptureSink, Reporter};
    use crate::symbol::{SourceLocation, SymbolKind, VariableInfo, TypeRef};

    fn corpus_with(names: &[&str]) -> Corpus {
        let reporter = Reporter::with_sink(Box::new(CaptureSink::new()), false);
        let builder = CorpusBuilder::new(reporter);
        for (line, name) in names.iter().enumerate() {
            let mut symbol = Symbol::global_namespace();
            symbol.id = SymbolId::from_usr(name);
            symbol.name = (*name).to_owned();
            symbol.kind = SymbolKind::Variable(VariableInfo {
                ty: TypeRef::unresolved("int"),
                init: None,
            });
            symbol.loc = Some(SourceLocation::new("a.cpp", line as u32 + 1, 1));
            builder.insert_or_merge(PartialSymbol {
                symbol,
                tu_file: "a.cpp".to_owned(),
                is_definition: true,
            });
        }
        builder.finalize().expect("finalize succeeds")
    }

    #[test]
    fn global_namespace_is_index() {
        let corpus = corpus_with(&[]);
        let names = SafeNames::build(&corpus);
        assert_eq!(names.get(SymbolId::GLOBAL), "index");
    }

    #[test]
    fn names_are_injective() {
        let corpus = corpus_with(&["alpha", "beta", "Alpha"]);
        let names = SafeNames::build(&corpus);
        let mut seen: Vec<String> = corpus
            .iter()
            .map(|sym| names.get(sym.id).to_lowercase())
            .collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), corpus.len());
    }

    #[test]
    fn case_collisions_get_numeric_suffixes() {
        let corpus = corpus_with(&["value", "Value"]);
        let names = SafeNames::build(&corpus);
        let mut allocated: Vec<&str> = corpus
            .iter()
            .filter(|sym| !sym.id.is_global())
            .map(|sym| names.get(sym.id))
            .collect();
        allocated.sort_unstable();
        assert!(allocated.iter().any(|n| n.ends_with("-2")));
    }

    #[test]
    fn unsafe_characters_are_replaced() {
        assert_eq!(
            sanitize("operator<<", SymbolId::from_usr("x")),
            "operator__"
        );
        assert!(!sanitize("...leading", SymbolId::from_usr("x")).starts_with('.'));
    }

    #[test]
    fn reserved_device_names_are_dodged() {
        let id = SymbolId::from_usr("x");
        assert_eq!(sanitize("CON", id), "CON_");
        assert_eq!(sanitize("com1", id), "com1_");
        assert_eq!(sanitize("common", id), "common");
    }

    #[test]
    fn long_names_elide_to_hash_suffix() {
        let id = SymbolId::from_usr("long");
        let long = "n".repeat(500);
        let name = sanitize(&long, id);
        assert!(name.len() <= MAX_NAME_LEN);
        assert!(name.contains('-'));
        let again = sanitize(&long, id);
        assert_eq!(name, again);
    }
}
