//! The in-memory analysis cache and its cross-file queries.
//!
//! One [`FileIndex`] per analyzed file, keyed by the file's uri or
//! path. Entries are replaced wholesale on each (re)analysis — there
//! is no partial merge across analyses — and dropped when a file
//! closes. All writes come from the analysis pipeline; readers may
//! observe a snapshot that is one analysis behind.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::index::{CallSite, FileIndex, PredicateRecord};
use crate::types::{Position, Range};

/// A resolved predicate definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    /// The file the definition lives in.
    pub file: String,
    /// The full predicate record.
    pub predicate: PredicateRecord,
}

/// Summary of the predicate whose body contains a call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclosingPredicate {
    /// The enclosing predicate's name.
    pub name: String,
    /// The enclosing predicate's arity.
    pub arity: u32,
    /// The enclosing predicate's definition range.
    pub definition_range: Range,
}

impl EnclosingPredicate {
    fn of(record: &PredicateRecord) -> Self {
        Self {
            name: record.name.clone(),
            arity: record.arity,
            definition_range: record.definition_range,
        }
    }
}

/// One reference to a predicate: a call site plus its context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// The file the call site lives in.
    pub file: String,
    /// The call site, with its original location untouched.
    pub call: CallSite,
    /// The predicate whose body contains the call.
    pub caller: EnclosingPredicate,
}

/// What a position inside a file resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionHit {
    /// The position is inside a predicate's definition range.
    Definition(PredicateRecord),
    /// The position is inside a call site's identifier.
    Call {
        call: CallSite,
        caller: PredicateRecord,
    },
}

/// In-memory store of per-file indexes.
///
/// `get` never fails: an unanalyzed file is simply absent. The store
/// itself does no locking; the pipeline owns the concurrency
/// discipline around it.
#[derive(Debug, Default)]
pub struct AnalysisCache {
    entries: HashMap<String, Arc<FileIndex>>,
}

impl AnalysisCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace (or insert) the entry for a file entirely.
    pub fn set(&mut self, id: impl Into<String>, index: Arc<FileIndex>) {
        self.entries.insert(id.into(), index);
    }

    /// Get the entry for a file, if one is cached.
    pub fn get(&self, id: &str) -> Option<Arc<FileIndex>> {
        self.entries.get(id).cloned()
    }

    /// Remove the entry for a file (used on file close).
    pub fn delete(&mut self, id: &str) {
        self.entries.remove(id);
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the definition of `name/arity` across all cached files.
    ///
    /// Returns the first match in cache iteration order. When several
    /// files define the same `(name, arity)` the winner is whichever
    /// file the scan reaches first — no conflict is signaled, and the
    /// order is not otherwise specified.
    pub fn find_definition(&self, name: &str, arity: u32) -> Option<Definition> {
        for (file, index) in &self.entries {
            if let Some(record) = index.predicate(name, arity) {
                return Some(Definition {
                    file: file.clone(),
                    predicate: record.clone(),
                });
            }
        }
        None
    }

    /// Find every call site referencing `name/arity` across all cached
    /// files, each paired with the predicate whose body contains it.
    pub fn find_references(&self, name: &str, arity: u32) -> Vec<Reference> {
        let mut references = Vec::new();
        for (file, index) in &self.entries {
            for record in &index.predicates {
                for call in &record.calls {
                    if call.arity == arity && call.name == name {
                        references.push(Reference {
                            file: file.clone(),
                            call: call.clone(),
                            caller: EnclosingPredicate::of(record),
                        });
                    }
                }
            }
        }
        references
    }

    /// Resolve what sits at `position` within one file.
    ///
    /// Records are scanned in stored order. For each record the
    /// definition range is tested first, then the record's call sites
    /// in order; the first containment wins. Containment treats the
    /// end character as inclusive, so a position exactly at a token's
    /// trailing edge still resolves.
    pub fn find_element_at_position(&self, id: &str, position: Position) -> Option<PositionHit> {
        let index = self.entries.get(id)?;
        for record in &index.predicates {
            if record.definition_range.contains(position) {
                return Some(PositionHit::Definition(record.clone()));
            }
            for call in &record.calls {
                if call.location.contains(position) {
                    return Some(PositionHit::Call {
                        call: call.clone(),
                        caller: record.clone(),
                    });
                }
            }
        }
        None
    }
}
