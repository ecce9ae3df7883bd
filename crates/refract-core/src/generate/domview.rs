//! Dom views over the corpus.
//!
//! Template-driven formatters consume [`crate::dom::Value`]s rather than
//! symbols directly. The views here are lazy: an object holds the corpus
//! and an id, and materializes fields on lookup. Values are read-only
//! once handed to a formatter.

use std::sync::Arc;

use crate::corpus::Corpus;
use crate::dom::{Array, ArrayImpl, Object, ObjectImpl, Value};
use crate::symbol::{Symbol, SymbolId, SymbolKind};

/// The dom view of one symbol.
pub fn symbol_value(corpus: &Arc<Corpus>, id: SymbolId) -> Value {
    Value::Object(Object::new(Arc::new(SymbolObject {
        corpus: Arc::clone(corpus),
        id,
    })))
}

struct SymbolObject {
    corpus: Arc<Corpus>,
    id: SymbolId,
}

impl SymbolObject {
    fn symbol(&self) -> &Symbol {
        self.corpus.get(self.id)
    }
}

impl ObjectImpl for SymbolObject {
    fn is_empty(&self) -> bool {
        false
    }

    fn get(&self, key: &str) -> Option<Value> {
        let symbol = self.symbol();
        match key {
            "id" => Some(Value::from(symbol.id.to_string())),
            "kind" => Some(Value::from(symbol.kind().as_str())),
            "name" => Some(Value::from(symbol.name.as_str())),
            "parent" => Some(Value::from(symbol.parent.to_string())),
            "access" => Some(Value::from(symbol.access.as_str())),
            "signature" => Some(Value::from(super::adoc::signature(symbol))),
            "brief" => Some(
                symbol
                    .doc
                    .as_ref()
                    .and_then(|doc| doc.brief())
                    .map(|text| Value::from(text.to_plain()))
                    .unwrap_or(Value::Null),
            ),
            "file" => Some(
                symbol
                    .loc
                    .as_ref()
                    .map(|loc| Value::from(loc.file.as_str()))
                    .unwrap_or(Value::Null),
            ),
            "line" => Some(
                symbol
                    .loc
                    .as_ref()
                    .map(|loc| Value::Integer(i64::from(loc.line)))
                    .unwrap_or(Value::Null),
            ),
            "members" => Some(Value::Array(Array::new(Arc::new(MemberArray {
                corpus: Arc::clone(&self.corpus),
                ids: symbol.members.clone(),
            })))),
            "is-record" => Some(Value::Boolean(symbol.is_record())),
            "scoped" => match &symbol.kind {
                SymbolKind::Enum(info) => Some(Value::Boolean(info.scoped)),
                _ => None,
            },
            _ => None,
        }
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = [
            "id",
            "kind",
            "name",
            "parent",
            "access",
            "signature",
            "brief",
            "file",
            "line",
            "members",
            "is-record",
        ]
        .iter()
        .map(|k| (*k).to_owned())
        .collect();
        if matches!(self.symbol().kind, SymbolKind::Enum(_)) {
            keys.push("scoped".to_owned());
        }
        keys
    }
}

struct MemberArray {
    corpus: Arc<Corpus>,
    ids: Vec<SymbolId>,
}

impl ArrayImpl for MemberArray {
    fn len(&self) -> usize {
        self.ids.len()
    }

    fn get(&self, index: usize) -> Value {
        symbol_value(&self.corpus, self.ids[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusBuilder;
    use crate::extract::{extract_translation_unit, ExtractOptions};
    use crate::frontend::TranslationUnit;
    use crate::report::{CaptureSink, Reporter};

    fn corpus() -> Arc<Corpus> {
        let reporter = Reporter::with_sink(Box::new(CaptureSink::new()), false);
        let builder = CorpusBuilder::new(reporter);
        let source = "namespace n { /// Briefly.\nvoid f(); }";
        let decls = crate::frontend::scan(source, "a.cpp").expect("scan succeeds");
        let tu = TranslationUnit {
            file: "a.cpp".to_owned(),
            decls,
        };
        extract_translation_unit(&tu, ExtractOptions::default(), &builder);
        Arc::new(builder.finalize().expect("finalize succeeds"))
    }

    #[test]
    fn lazy_object_materializes_fields() {
        let corpus = corpus();
        let root = symbol_value(&corpus, SymbolId::GLOBAL);
        let Value::Object(root) = root else {
            panic!("expected an object");
        };
        assert!(root.exists("members"));
        let Some(Value::Array(members)) = root.get("members") else {
            panic!("expected a member array");
        };
        assert_eq!(members.len(), 1);

        let Value::Object(n) = members.get(0) else {
            panic!("expected an object");
        };
        let Some(Value::String(name)) = n.get("name") else {
            panic!("expected a name");
        };
        assert_eq!(name, "n");
        let Some(Value::String(kind)) = n.get("kind") else {
            panic!("expected a kind");
        };
        assert_eq!(kind, "namespace");
    }

    #[test]
    fn brief_flattens_to_text() {
        let corpus = corpus();
        let n = corpus.get(SymbolId::from_usr("n"));
        let Value::Object(f) = symbol_value(&corpus, n.members[0]) else {
            panic!("expected an object");
        };
        let Some(Value::String(brief)) = f.get("brief") else {
            panic!("expected a brief");
        };
        assert_eq!(brief, "Briefly.");
        assert!(f.get("members").is_some_and(|v| !v.is_truthy()));
    }
}
