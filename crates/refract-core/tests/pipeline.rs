//! End-to-end pipeline scenarios: sources in, artifacts out.

use std::sync::Arc;

use refract_core::corpus::{Corpus, CorpusBuilder, PartialSymbol};
use refract_core::extract::{self, CompilationDatabase, ExtractOptions};
use refract_core::frontend::MemoryFrontend;
use refract_core::generate::{self, read_stream, SafeNames};
use refract_core::report::CaptureSink;
use refract_core::symbol::{Kind, SymbolId, SymbolKind};
use refract_core::{Reporter, ThreadPool};

fn pipeline(
    sources: &[(&str, &str)],
    concurrency: usize,
) -> (Arc<Corpus>, Arc<Reporter>, CaptureSink) {
    let sink = CaptureSink::new();
    let reporter = Reporter::with_sink(Box::new(sink.clone()), false);
    let pool = ThreadPool::new(concurrency).expect("pool starts");
    let mut frontend = MemoryFrontend::new();
    for (file, source) in sources {
        frontend
            .insert_source(*file, source)
            .expect("source scans");
    }
    let db = CompilationDatabase::from_sources(sources.iter().map(|(file, _)| *file));
    let corpus = extract::build_corpus(
        &db,
        &frontend,
        ExtractOptions::default(),
        &pool,
        &reporter,
        true,
    )
    .expect("corpus builds");
    (Arc::new(corpus), reporter, sink)
}

// An empty input set produces an empty run, not an error.
#[test]
fn empty_input_is_success() {
    let sink = CaptureSink::new();
    let reporter = Reporter::with_sink(Box::new(sink.clone()), false);
    let pool = ThreadPool::new(1).unwrap();
    let frontend = MemoryFrontend::new();
    let db = CompilationDatabase::default();
    let corpus = extract::build_corpus(
        &db,
        &frontend,
        ExtractOptions::default(),
        &pool,
        &reporter,
        true,
    )
    .unwrap();
    assert_eq!(corpus.len(), 1);
    assert_eq!(reporter.error_count(), 0);
}

// A single free function yields root, namespace, and function, and the
// single-file bitcode stream carries exactly those three records in
// depth-first order.
#[test]
fn single_free_function_bitcode() {
    let (corpus, _, _) = pipeline(&[("a.cpp", "namespace n { int f(int x); }")], 1);
    assert_eq!(corpus.len(), 3);
    assert_eq!(
        corpus.get(SymbolId::from_usr("n")).parent,
        SymbolId::GLOBAL
    );

    let generator = generate::find_generator("bitcode").unwrap();
    let mut stream = Vec::new();
    generate::build_one(generator.as_ref(), &mut stream, &corpus).unwrap();

    let symbols = read_stream(&stream).unwrap();
    assert_eq!(symbols.len(), 3);
    assert!(symbols[0].id.is_global());
    assert_eq!(symbols[1].name, "n");
    assert_eq!(symbols[1].kind.kind(), Kind::Namespace);
    assert_eq!(symbols[2].name, "f");
    assert_eq!(symbols[2].kind.kind(), Kind::Function);
}

// A definition in one TU and a forward declaration in another merge
// into one record, and uses of the type resolve to its id.
#[test]
fn declaration_and_definition_across_tus() {
    let (corpus, _, _) = pipeline(
        &[
            ("a.cpp", "struct S { int m; };"),
            ("b.cpp", "struct S;\nvoid use(S* s);"),
        ],
        2,
    );
    let s = corpus.get(SymbolId::from_usr("S"));
    assert_eq!(s.kind.kind(), Kind::Record);
    assert_eq!(s.members.len(), 1);

    let use_fn = corpus.iter().find(|sym| sym.name == "use").unwrap();
    let SymbolKind::Function(info) = &use_fn.kind else {
        panic!("expected a function");
    };
    assert_eq!(info.params[0].ty.id, Some(s.id));
    assert_eq!(info.params[0].ty.text, "S*");
}

// The same id with mismatching kinds is a fatal corpus inconsistency
// naming the conflicting id.
#[test]
fn kind_conflict_is_fatal() {
    let sink = CaptureSink::new();
    let reporter = Reporter::with_sink(Box::new(sink.clone()), false);
    let pool = ThreadPool::new(2).unwrap();
    let mut frontend = MemoryFrontend::new();
    frontend.insert_source("a.cpp", "struct X {};").unwrap();
    frontend.insert_source("b.cpp", "enum X {};").unwrap();
    let db = CompilationDatabase::from_sources(["a.cpp", "b.cpp"]);
    let err = extract::build_corpus(
        &db,
        &frontend,
        ExtractOptions::default(),
        &pool,
        &reporter,
        true,
    )
    .unwrap_err();
    assert!(err.message().contains(&SymbolId::from_usr("X").to_string()));
}

// One failing output path costs exactly one artifact and one error
// line; every sibling file is still written.
#[test]
fn multi_file_with_one_failing_path() {
    let mut source = String::from("namespace n {\n");
    for index in 0..100 {
        source.push_str(&format!("void f{index}();\n"));
    }
    source.push_str("}\n");
    let (corpus, _, _) = pipeline(&[("a.cpp", source.as_str())], 4);
    // Root + n + 100 functions.
    assert_eq!(corpus.len(), 102);

    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("n-f17.adoc")).unwrap();

    let sink = CaptureSink::new();
    let reporter = Reporter::with_sink(Box::new(sink.clone()), false);
    let pool = ThreadPool::new(4).unwrap();
    let generator = generate::find_generator("adoc").unwrap();
    let err = generate::build(&generator, dir.path(), &corpus, &reporter, &pool).unwrap_err();
    assert!(err.failed());

    let written = std::fs::read_dir(dir.path())
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().is_file())
        .count();
    assert_eq!(written, 101);
    assert_eq!(reporter.error_count(), 1);
    let diagnostics = sink.contents();
    assert_eq!(diagnostics.matches("Could not open").count(), 1);
    assert!(diagnostics.contains("n-f17.adoc"));
}

// The definition's doc wins; declaration docs concatenate in TU
// lexicographic order.
#[test]
fn doc_merge_prefers_the_definition() {
    let (corpus, _, _) = pipeline(
        &[
            ("a.cpp", "namespace n { /// brief a\nint f(int x); }"),
            (
                "b.cpp",
                "namespace n { /// brief b\nint f(int x) { return x; } }",
            ),
        ],
        2,
    );
    let f = corpus.iter().find(|sym| sym.name == "f").unwrap();
    let doc = f.doc.as_ref().unwrap();
    assert_eq!(
        doc.brief().map(|t| t.to_plain()).as_deref(),
        Some("brief b")
    );
}

#[test]
fn doc_merge_concatenates_declarations() {
    let (corpus, _, _) = pipeline(
        &[
            ("z.cpp", "namespace n { /// brief z\nint f(int x); }"),
            ("a.cpp", "namespace n { /// brief a\nint f(int x); }"),
        ],
        2,
    );
    let f = corpus.iter().find(|sym| sym.name == "f").unwrap();
    let doc = f.doc.as_ref().unwrap();
    assert_eq!(doc.blocks.len(), 2);
    // Lexicographically first TU leads.
    assert_eq!(
        doc.brief().map(|t| t.to_plain()).as_deref(),
        Some("brief a")
    );
}

// Identical inputs produce byte-identical output at any concurrency,
// in both output modes.
#[test]
fn output_is_deterministic() {
    let sources: &[(&str, &str)] = &[
        (
            "a.cpp",
            "namespace n { struct S { int m; void f() const; }; enum class E { A, B }; }",
        ),
        ("b.cpp", "namespace n { struct S; void g(S* s); }"),
    ];

    let mut streams = Vec::new();
    for concurrency in [1, 4] {
        let (corpus, _, _) = pipeline(sources, concurrency);
        let generator = generate::find_generator("xml").unwrap();
        let mut out = Vec::new();
        generate::build_one(generator.as_ref(), &mut out, &corpus).unwrap();
        streams.push(out);
    }
    assert_eq!(streams[0], streams[1]);

    let mut file_sets = Vec::new();
    for concurrency in [1, 4] {
        let (corpus, _, _) = pipeline(sources, concurrency);
        let dir = tempfile::tempdir().unwrap();
        let reporter = Reporter::with_sink(Box::new(CaptureSink::new()), false);
        let pool = ThreadPool::new(concurrency).unwrap();
        let generator = generate::find_generator("adoc").unwrap();
        generate::build(&generator, dir.path(), &corpus, &reporter, &pool).unwrap();

        let mut files: Vec<(String, Vec<u8>)> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| {
                let entry = entry.unwrap();
                (
                    entry.file_name().to_string_lossy().into_owned(),
                    std::fs::read(entry.path()).unwrap(),
                )
            })
            .collect();
        files.sort();
        file_sets.push(files);
    }
    assert_eq!(file_sets[0], file_sets[1]);
}

// A symbol's id does not depend on TU order or on unrelated
// translation units.
#[test]
fn ids_are_stable_across_unrelated_tus() {
    let (small, _, _) = pipeline(&[("a.cpp", "namespace n { void f(); }")], 1);
    let (large, _, _) = pipeline(
        &[
            ("z.cpp", "namespace other { struct T {}; }"),
            ("a.cpp", "namespace n { void f(); }"),
        ],
        2,
    );
    let f_small = small.iter().find(|sym| sym.name == "f").unwrap();
    let f_large = large.iter().find(|sym| sym.name == "f").unwrap();
    assert_eq!(f_small.id, f_large.id);
}

// The parent/member relation is a rooted tree and bidirectional.
#[test]
fn corpus_tree_property() {
    let (corpus, _, _) = pipeline(
        &[(
            "a.cpp",
            "namespace a { namespace b { struct S { int m; struct Inner {}; }; } void f(); }",
        )],
        2,
    );
    for symbol in corpus.iter() {
        if symbol.id.is_global() {
            continue;
        }
        let parent = corpus.get(symbol.parent);
        assert!(
            parent.members.contains(&symbol.id),
            "child {} missing from its parent's members",
            symbol.id
        );
        for member in &symbol.members {
            assert_eq!(corpus.get(*member).parent, symbol.id);
        }
    }
}

// Members are ordered by primary location, ties broken by id.
#[test]
fn member_order_follows_source_location() {
    let (corpus, _, _) = pipeline(
        &[("a.cpp", "namespace n { void c(); void a(); void b(); }")],
        1,
    );
    let n = corpus.get(SymbolId::from_usr("n"));
    let names: Vec<&str> = n
        .members
        .iter()
        .map(|id| corpus.get(*id).name.as_str())
        .collect();
    assert_eq!(names, vec!["c", "a", "b"]);
}

// Feeding a finalized corpus back through the merger reproduces it.
#[test]
fn merge_is_idempotent() {
    let (corpus, _, _) = pipeline(
        &[
            ("a.cpp", "namespace n { struct S { int m; }; /// doc\nvoid f(int x = 3); }"),
            ("b.cpp", "namespace n { struct S; }"),
        ],
        2,
    );
    let reporter = Reporter::with_sink(Box::new(CaptureSink::new()), false);
    let builder = CorpusBuilder::new(reporter);
    for symbol in corpus.iter() {
        if symbol.id.is_global() {
            continue;
        }
        builder.insert_or_merge(PartialSymbol {
            symbol: symbol.clone(),
            tu_file: symbol.loc.clone().unwrap_or_default().file,
            is_definition: true,
        });
    }
    let again = builder.finalize().unwrap();
    assert_eq!(corpus.len(), again.len());
    for (lhs, rhs) in corpus.iter().zip(again.iter()) {
        assert_eq!(lhs, rhs);
    }
}

// Safe names are injective over the corpus, overloads and case
// collisions included.
#[test]
fn safe_names_are_injective() {
    let (corpus, _, _) = pipeline(
        &[(
            "a.cpp",
            "namespace n { void f(int a); void f(long a); struct value {}; struct Value {}; }",
        )],
        1,
    );
    let names = SafeNames::build(&corpus);
    let mut allocated: Vec<String> = corpus
        .iter()
        .map(|sym| names.get(sym.id).to_lowercase())
        .collect();
    allocated.sort();
    allocated.dedup();
    assert_eq!(allocated.len(), corpus.len());
}

// Extraction failures are reported per TU and do not stop the run when
// ignore-map-errors is on.
#[test]
fn map_errors_are_tolerated_by_default() {
    let sink = CaptureSink::new();
    let reporter = Reporter::with_sink(Box::new(sink.clone()), false);
    let pool = ThreadPool::new(2).unwrap();
    let mut frontend = MemoryFrontend::new();
    frontend
        .insert_source("good.cpp", "namespace n { void f(); }")
        .unwrap();
    // "broken.cpp" is never registered, so mapping it fails.
    let db = CompilationDatabase::from_sources(["broken.cpp", "good.cpp"]);

    let corpus = extract::build_corpus(
        &db,
        &frontend,
        ExtractOptions::default(),
        &pool,
        &reporter,
        true,
    )
    .unwrap();
    assert!(corpus.iter().any(|sym| sym.name == "f"));
    assert_eq!(reporter.error_count(), 1);
    assert!(sink.contents().contains("Could not map \"broken.cpp\""));

    let reporter = Reporter::with_sink(Box::new(CaptureSink::new()), false);
    let err = extract::build_corpus(
        &db,
        &frontend,
        ExtractOptions::default(),
        &pool,
        &reporter,
        false,
    )
    .unwrap_err();
    assert!(err.failed());
}
