//! Documentation generators.
//!
//! A [`Generator`] serializes symbols for one output format. The walking
//! and writing machinery lives here and is shared by all formats: the
//! single-file writer streams a depth-first walk into one sink, and the
//! multi-file writer fans one task per visited symbol out onto the worker
//! pool, with filenames precomputed on the walker thread.

mod adoc;
mod bitcode;
mod domview;
mod safe_names;
mod xml;

pub use adoc::AdocGenerator;
pub use bitcode::{read_stream, BitcodeGenerator};
pub use domview::symbol_value;
pub use safe_names::SafeNames;
pub use xml::XmlGenerator;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::corpus::Corpus;
use crate::error::Error;
use crate::report::Reporter;
use crate::symbol::Symbol;
use crate::taskgroup::{TaskGroup, ThreadPool};

/// Format-specific serialization of symbols.
pub trait Generator: Send + Sync {
    /// The format name used in configuration (`adoc`, `xml`, `bitcode`).
    fn id(&self) -> &'static str;

    /// The file extension of produced artifacts.
    fn ext(&self) -> &'static str;

    /// Append one symbol's serialization to a concatenated stream.
    fn write_symbol(
        &self,
        out: &mut dyn Write,
        symbol: &Symbol,
        corpus: &Corpus,
    ) -> std::io::Result<()>;

    /// Write a self-contained per-symbol artifact. Defaults to the stream
    /// form framed by the prologue and epilogue.
    fn write_file(
        &self,
        out: &mut dyn Write,
        symbol: &Symbol,
        corpus: &Corpus,
    ) -> std::io::Result<()> {
        self.begin_stream(out)?;
        self.write_symbol(out, symbol, corpus)?;
        self.end_stream(out)
    }

    /// Stream prologue for single-file output.
    fn begin_stream(&self, _out: &mut dyn Write) -> std::io::Result<()> {
        Ok(())
    }

    /// Stream epilogue for single-file output.
    fn end_stream(&self, _out: &mut dyn Write) -> std::io::Result<()> {
        Ok(())
    }
}

/// Look up a generator by format name.
pub fn find_generator(id: &str) -> Option<Arc<dyn Generator>> {
    match id {
        "adoc" => Some(Arc::new(AdocGenerator)),
        "xml" => Some(Arc::new(XmlGenerator)),
        "bitcode" => Some(Arc::new(BitcodeGenerator)),
        _ => None,
    }
}

/// Whether the walk descends into this symbol's members.
///
/// Namespaces form the walk's spine and records recurse immediately after
/// their own dispatch; enum values stay inside their enum's artifact.
fn recurses(symbol: &Symbol) -> bool {
    use crate::symbol::Kind;
    matches!(symbol.kind(), Kind::Namespace | Kind::Record)
}

/// Write one concatenated artifact to `out`: a depth-first walk from the
/// global namespace in stored order. No concurrency; writes are
/// serialized by construction.
pub fn build_one(
    generator: &dyn Generator,
    out: &mut dyn Write,
    corpus: &Corpus,
) -> Result<(), Error> {
    fn visit(
        generator: &dyn Generator,
        out: &mut dyn Write,
        corpus: &Corpus,
        symbol: &Symbol,
    ) -> std::io::Result<()> {
        generator.write_symbol(out, symbol, corpus)?;
        if recurses(symbol) {
            for id in &symbol.members {
                visit(generator, out, corpus, corpus.get(*id))?;
            }
        }
        Ok(())
    }

    generator
        .begin_stream(out)
        .and_then(|()| visit(generator, out, corpus, corpus.global_namespace()))
        .and_then(|()| generator.end_stream(out))
        .map_err(|err| Error::from_io(&err))
}

/// Write one artifact per visited symbol into `output_dir`.
///
/// Tasks are enqueued in walk order with their filenames precomputed; a
/// failing task reports its error and returns without touching its
/// siblings. The collected errors become one bulk error.
pub fn build(
    generator: &Arc<dyn Generator>,
    output_dir: &Path,
    corpus: &Arc<Corpus>,
    reporter: &Arc<Reporter>,
    pool: &ThreadPool,
) -> Result<(), Error> {
    std::fs::create_dir_all(output_dir)
        .map_err(|err| Error::new(format!("create \"{}\": {err}", output_dir.display())))?;

    let names = SafeNames::build(corpus);
    let group = TaskGroup::new(pool);

    struct Walker<'w> {
        generator: &'w Arc<dyn Generator>,
        output_dir: &'w Path,
        corpus: &'w Arc<Corpus>,
        reporter: &'w Arc<Reporter>,
        names: SafeNames,
    }

    impl Walker<'_> {
        fn dispatch(&self, group: &TaskGroup<'_>, symbol: &Symbol) {
            let path = self
                .output_dir
                .join(format!("{}.{}", self.names.get(symbol.id), self.generator.ext()));
            let generator = Arc::clone(self.generator);
            let corpus = Arc::clone(self.corpus);
            let reporter = Arc::clone(self.reporter);
            let id = symbol.id;
            group.spawn(move || {
                let mut file = match std::fs::File::create(&path) {
                    Ok(file) => file,
                    Err(err) => {
                        let err = Error::from_io(&err);
                        reporter.could_not(format!("open \"{}\"", path.display()), &err);
                        return Err(err);
                    }
                };
                let symbol = corpus.get(id);
                if let Err(err) = generator.write_file(&mut file, symbol, &corpus) {
                    let err = Error::from_io(&err);
                    reporter.could_not(format!("write \"{}\"", path.display()), &err);
                    return Err(err);
                }
                Ok(())
            });
        }

        fn visit(&self, group: &TaskGroup<'_>, symbol: &Symbol) {
            self.dispatch(group, symbol);
            // Records recurse right away on the walker thread, keeping the
            // task queue monotonic in walk order.
            if recurses(symbol) {
                for id in &symbol.members {
                    self.visit(group, self.corpus.get(*id));
                }
            }
        }
    }

    let walker = Walker {
        generator,
        output_dir,
        corpus,
        reporter,
        names,
    };
    walker.visit(&group, corpus.global_namespace());

    let errors = group.wait();
    let bulk = Error::from_errors(errors);
    if bulk.failed() {
        return Err(bulk);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusBuilder;
    use crate::extract::{extract_translation_unit, ExtractOptions};
    use crate::frontend::TranslationUnit;
    use crate::report::CaptureSink;

    fn corpus_from(source: &str) -> Arc<Corpus> {
        let reporter = Reporter::with_sink(Box::new(CaptureSink::new()), false);
        let builder = CorpusBuilder::new(reporter);
        let decls = crate::frontend::scan(source, "test.hpp").expect("scan succeeds");
        let tu = TranslationUnit {
            file: "test.hpp".to_owned(),
            decls,
        };
        extract_translation_unit(&tu, ExtractOptions::default(), &builder);
        Arc::new(builder.finalize().expect("finalize succeeds"))
    }

    #[test]
    fn generator_lookup() {
        assert_eq!(find_generator("adoc").map(|g| g.ext()), Some("adoc"));
        assert_eq!(find_generator("xml").map(|g| g.ext()), Some("xml"));
        assert_eq!(find_generator("bitcode").map(|g| g.ext()), Some("bc"));
        assert!(find_generator("pdf").is_none());
    }

    #[test]
    fn multi_file_writes_one_file_per_visited_symbol() {
        let corpus = corpus_from("namespace n { struct S { int m; }; void f(); }");
        let dir = tempfile::tempdir().unwrap();
        let reporter = Reporter::with_sink(Box::new(CaptureSink::new()), false);
        let pool = ThreadPool::new(2).unwrap();
        let generator = find_generator("adoc").unwrap();
        build(&generator, dir.path(), &corpus, &reporter, &pool).unwrap();

        let mut files: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        // Root, n, S, S::m, f: every visited symbol gets an artifact.
        assert_eq!(files.len(), corpus.len());
        assert!(files.contains(&"index.adoc".to_owned()));
        assert!(files.contains(&"n.adoc".to_owned()));
        assert!(files.contains(&"n-S.adoc".to_owned()));
    }

    #[test]
    fn failing_path_does_not_abort_siblings() {
        let corpus = corpus_from("namespace n { void a(); void b(); void c(); }");
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on a safe name forces one open failure.
        std::fs::create_dir(dir.path().join("n-a.adoc")).unwrap();

        let sink = CaptureSink::new();
        let reporter = Reporter::with_sink(Box::new(sink.clone()), false);
        let pool = ThreadPool::new(2).unwrap();
        let generator = find_generator("adoc").unwrap();
        let err = build(&generator, dir.path(), &corpus, &reporter, &pool).unwrap_err();
        assert!(err.failed());

        // The siblings were still written.
        assert!(dir.path().join("n-b.adoc").is_file());
        assert!(dir.path().join("n-c.adoc").is_file());
        assert!(dir.path().join("index.adoc").is_file());
        let output = sink.contents();
        assert_eq!(output.matches("Could not open").count(), 1);
        assert_eq!(reporter.error_count(), 1);
    }

    #[test]
    fn single_file_walk_is_deterministic() {
        let corpus = corpus_from("namespace n { void f(); void g(); }");
        let generator = find_generator("adoc").unwrap();
        let mut first = Vec::new();
        build_one(generator.as_ref(), &mut first, &corpus).unwrap();
        let mut second = Vec::new();
        build_one(generator.as_ref(), &mut second, &corpus).unwrap();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }
}
