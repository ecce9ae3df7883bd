//! The corpus: the complete, finalized index of all documented symbols.
//!
//! Construction has two phases. During extraction, workers feed partial
//! symbols into a [`CorpusBuilder`] keyed by id, with no ordering assumed.
//! A single-threaded [`CorpusBuilder::finalize`] then merges each group,
//! repairs missing parents, computes member orderings, verifies the tree
//! invariants, and freezes the structure. A finalized [`Corpus`] is
//! immutable; readers need no locks.

mod merge;

pub use merge::{merge_group, PartialSymbol};

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crate::error::Error;
use crate::report::Reporter;
use crate::symbol::{Symbol, SymbolId};

/// The finalized symbol index for one run.
#[derive(Debug, Default)]
pub struct Corpus {
    symbols: BTreeMap<SymbolId, Symbol>,
}

impl Corpus {
    /// Look up a symbol known to exist.
    ///
    /// Panics when `id` is absent; ids must come from the corpus itself
    /// (use [`Corpus::find`] for foreign ids).
    pub fn get(&self, id: SymbolId) -> &Symbol {
        self.find(id)
            .unwrap_or_else(|| panic!("corpus has no symbol {id}"))
    }

    /// Look up a symbol that may be absent.
    pub fn find(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(&id)
    }

    /// The global namespace root.
    pub fn global_namespace(&self) -> &Symbol {
        self.get(SymbolId::GLOBAL)
    }

    /// Invoke `visitor` for each member of `parent`, in stored order.
    ///
    /// The visitor may call `traverse` again to recurse.
    pub fn traverse(&self, parent: &Symbol, visitor: &mut dyn FnMut(&Symbol)) {
        for id in &parent.members {
            visitor(self.get(*id));
        }
    }

    /// All symbols in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Accumulates partial symbols during parallel extraction.
pub struct CorpusBuilder {
    reporter: Arc<Reporter>,
    partials: Mutex<HashMap<SymbolId, Vec<PartialSymbol>>>,
}

impl CorpusBuilder {
    pub fn new(reporter: Arc<Reporter>) -> Self {
        Self {
            reporter,
            partials: Mutex::new(HashMap::new()),
        }
    }

    /// Record one translation unit's view of a symbol.
    ///
    /// Called concurrently from extraction workers; merging itself is
    /// deferred to [`CorpusBuilder::finalize`] so the result cannot depend
    /// on arrival order.
    pub fn insert_or_merge(&self, partial: PartialSymbol) {
        if let Ok(mut partials) = self.partials.lock() {
            partials.entry(partial.symbol.id).or_default().push(partial);
        }
    }

    /// Merge, repair, order, verify, and freeze.
    pub fn finalize(self) -> Result<Corpus, Error> {
        let partials = self
            .partials
            .into_inner()
            .map_err(|_| Error::new("corpus builder poisoned by a panicked worker"))?;

        let mut groups: Vec<(SymbolId, Vec<PartialSymbol>)> = partials.into_iter().collect();
        groups.sort_by_key(|(id, _)| *id);

        let mut symbols: BTreeMap<SymbolId, Symbol> = BTreeMap::new();
        let mut fatal = Vec::new();
        for (id, group) in groups {
            match merge_group(group, &self.reporter) {
                Ok(symbol) => {
                    symbols.insert(id, symbol);
                }
                Err(err) => fatal.push(err),
            }
        }
        let inconsistency = Error::from_errors(fatal);
        if inconsistency.failed() {
            return Err(inconsistency);
        }

        symbols
            .entry(SymbolId::GLOBAL)
            .or_insert_with(Symbol::global_namespace);

        synthesize_missing_parents(&mut symbols);
        rebuild_members(&mut symbols, &self.reporter);
        check_acyclic(&symbols)?;

        Ok(Corpus { symbols })
    }
}

/// Invariant repair: a `parent` referring to an unknown symbol is promoted
/// by synthesizing a minimal placeholder namespace with inferred
/// provenance.
fn synthesize_missing_parents(symbols: &mut BTreeMap<SymbolId, Symbol>) {
    loop {
        let missing: Vec<SymbolId> = symbols
            .values()
            .filter(|sym| !sym.id.is_global())
            .map(|sym| sym.parent)
            .filter(|parent| !symbols.contains_key(parent))
            .collect();
        if missing.is_empty() {
            return;
        }
        for id in missing {
            let mut placeholder = Symbol::global_namespace();
            placeholder.id = id;
            placeholder.loc = Some(crate::symbol::SourceLocation::inferred());
            symbols.insert(id, placeholder);
        }
    }
}

/// Make membership bidirectional and ordered: each symbol's member list
/// becomes exactly its children by parent link, sorted by primary source
/// location with ids breaking ties.
fn rebuild_members(symbols: &mut BTreeMap<SymbolId, Symbol>, reporter: &Arc<Reporter>) {
    let mut children: HashMap<SymbolId, Vec<SymbolId>> = HashMap::new();
    for sym in symbols.values() {
        if !sym.id.is_global() {
            children.entry(sym.parent).or_default().push(sym.id);
        }
        for member in &sym.members {
            match symbols.get(member) {
                Some(child) if child.parent == sym.id => {}
                Some(_) => reporter.warn(format!(
                    "symbol {member} listed as a member of {} but declares another parent",
                    sym.id,
                )),
                None => reporter.warn(format!(
                    "symbol {member} listed as a member of {} was never extracted",
                    sym.id,
                )),
            }
        }
    }

    let order: HashMap<SymbolId, (crate::symbol::SourceLocation, SymbolId)> = symbols
        .values()
        .map(|sym| (sym.id, sym.order_key()))
        .collect();

    for sym in symbols.values_mut() {
        sym.members.clear();
    }
    for (id, mut list) in children {
        list.sort_by(|a, b| order[a].cmp(&order[b]));
        list.dedup();
        if let Some(parent) = symbols.get_mut(&id) {
            parent.members = list;
        }
    }
}

/// The parent relation must be a tree rooted at the global namespace.
fn check_acyclic(symbols: &BTreeMap<SymbolId, Symbol>) -> Result<(), Error> {
    for start in symbols.keys() {
        let mut seen = vec![*start];
        let mut current = *start;
        while !current.is_global() {
            let parent = symbols[&current].parent;
            if seen.contains(&parent) {
                return Err(Error::new(format!(
                    "cycle in the symbol tree involving {parent}"
                )));
            }
            seen.push(parent);
            current = parent;
        }
    }
    Ok(())
}
