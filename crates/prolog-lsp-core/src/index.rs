//! Per-file predicate index and the syntax-tree-to-index transformer.
//!
//! [`build_file_index`] turns one file's [`SyntaxTree`] into a
//! [`FileIndex`]: the predicates the file defines, the call sites
//! inside their clause bodies, and the diagnostics for unparseable
//! regions. The function is total — malformed or position-less input
//! degrades into diagnostics, fallback ranges, or skipped items, never
//! into an error — and pure: the same tree always yields the same
//! index.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::syntax::{Item, NodePosition, NodeSpan, SyntaxTree, Term};
use crate::types::{Diagnostic, Position, Range};

/// An occurrence of a goal inside a clause body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// The called predicate's name.
    pub name: String,
    /// The called predicate's arity.
    pub arity: u32,
    /// The range of the call identifier (not the whole call term).
    pub location: Range,
}

/// One predicate's definition within a file: all clauses for the same
/// `(name, arity)` merged into a single record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateRecord {
    /// The predicate's name.
    pub name: String,
    /// The predicate's arity.
    pub arity: u32,
    /// The range of the first clause's head. Fixed at first occurrence;
    /// later clauses never move it.
    pub definition_range: Range,
    /// The full extent of every merged clause, including leading
    /// comments where the analyzer reports them. Grows monotonically
    /// as clauses merge.
    pub full_range: Range,
    /// All call sites from all clauses, in clause order.
    pub calls: Vec<CallSite>,
}

impl PredicateRecord {
    /// The `name/arity` predicate indicator.
    pub fn indicator(&self) -> String {
        format!("{}/{}", self.name, self.arity)
    }
}

/// The analysis result for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileIndex {
    /// The analyzed file's path or uri.
    pub file_path: String,
    /// Predicates defined in the file, in first-occurrence order,
    /// unique by `(name, arity)`.
    pub predicates: Vec<PredicateRecord>,
    /// Diagnostics produced while indexing (parse-error items).
    pub diagnostics: Vec<Diagnostic>,
}

impl FileIndex {
    /// Look up a predicate by name and arity.
    pub fn predicate(&self, name: &str, arity: u32) -> Option<&PredicateRecord> {
        self.predicates
            .iter()
            .find(|p| p.arity == arity && p.name == name)
    }
}

/// Build the per-file index from a parsed syntax tree.
///
/// Top-level items are walked in source order. Rules and facts
/// contribute predicates keyed by `(name, arity)`; multiple clauses
/// for the same key merge into one [`PredicateRecord`]. Parse-error
/// items become error diagnostics; directives are skipped silently.
pub fn build_file_index(file_path: &str, tree: &SyntaxTree) -> FileIndex {
    let mut builder = IndexBuilder::new(file_path);
    for item in &tree.items {
        builder.add_item(item);
    }
    builder.finish()
}

struct IndexBuilder {
    file_path: String,
    predicates: Vec<PredicateRecord>,
    by_indicator: HashMap<(String, u32), usize>,
    diagnostics: Vec<Diagnostic>,
}

impl IndexBuilder {
    fn new(file_path: &str) -> Self {
        Self {
            file_path: file_path.to_string(),
            predicates: Vec::new(),
            by_indicator: HashMap::new(),
            diagnostics: Vec::new(),
        }
    }

    fn add_item(&mut self, item: &Item) {
        match item {
            Item::Rule {
                head, body, span, ..
            } => self.add_clause(head, body, *span),
            Item::Fact { head, span, .. } => self.add_clause(head, &[], *span),
            Item::Directive { .. } => {}
            Item::ParseError {
                message,
                line,
                column,
            } => {
                self.diagnostics
                    .push(Diagnostic::error(*line, *column, message.clone()));
            }
        }
    }

    fn add_clause(&mut self, head: &Term, body: &[Term], span: Option<NodeSpan>) {
        let (name, arity) = match head_name_arity(head) {
            Some(pair) => pair,
            None => {
                // Unexpected tree shape from the analyzer, not a source
                // error: log it and move on without a diagnostic.
                tracing::warn!(
                    file = %self.file_path,
                    "skipping clause with unsupported head shape: {}",
                    head.rendered()
                );
                return;
            }
        };

        let definition_range = match head.position() {
            Some(pos) => head_range(head, pos),
            None => {
                tracing::warn!(
                    file = %self.file_path,
                    predicate = %format!("{name}/{arity}"),
                    "head term has no position, using fallback range"
                );
                fallback_range()
            }
        };

        let full_range = span.map(span_to_range).unwrap_or(definition_range);

        let mut calls = Vec::new();
        for goal in body {
            collect_calls(goal, &self.file_path, &mut calls);
        }

        match self.by_indicator.get(&(name.clone(), arity)) {
            Some(&idx) => {
                // Merge: first writer keeps the definition range, the
                // full range grows, calls append in clause order.
                let record = &mut self.predicates[idx];
                record.full_range.expand_to(full_range);
                record.calls.extend(calls);
            }
            None => {
                self.by_indicator
                    .insert((name.clone(), arity), self.predicates.len());
                self.predicates.push(PredicateRecord {
                    name,
                    arity,
                    definition_range,
                    full_range,
                    calls,
                });
            }
        }
    }

    fn finish(self) -> FileIndex {
        FileIndex {
            file_path: self.file_path,
            predicates: self.predicates,
            diagnostics: self.diagnostics,
        }
    }
}

/// Derive `(name, arity)` from a clause head.
///
/// A compound head has its declared arity; a bare atom head defines a
/// zero-arity predicate. Anything else is an unsupported head shape.
fn head_name_arity(head: &Term) -> Option<(String, u32)> {
    match head {
        Term::Compound {
            name, arguments, ..
        } => Some((name.clone(), arguments.len() as u32)),
        Term::Atom { name, .. } => Some((name.clone(), 0)),
        _ => None,
    }
}

/// Range of a clause head: its position plus its rendered width.
fn head_range(head: &Term, pos: NodePosition) -> Range {
    Range::new(
        Position::new(pos.line, pos.column),
        Position::new(pos.line, pos.column + head.rendered_len()),
    )
}

/// Minimal placeholder for a node the analyzer gave no position.
fn fallback_range() -> Range {
    Range::new(Position::new(1, 0), Position::new(1, 1))
}

fn span_to_range(span: NodeSpan) -> Range {
    Range::new(
        Position::new(span.start.line, span.start.column),
        Position::new(span.end.line, span.end.column),
    )
}

/// Pre-order depth-first call collection.
///
/// Every compound application is a call site; its arguments are then
/// visited for nested calls. Infix operands, list items, and
/// parenthesized contents are traversed. Atoms, variables, numbers,
/// operators, and cuts are leaves and never calls (the analyzer emits
/// zero-arity goals as zero-argument compounds).
fn collect_calls(term: &Term, file_path: &str, calls: &mut Vec<CallSite>) {
    match term {
        Term::Compound {
            name,
            arguments,
            position,
        } => {
            let location = match position {
                Some(pos) => Range::new(
                    Position::new(pos.line, pos.column),
                    Position::new(pos.line, pos.column + name.chars().count() as u32),
                ),
                None => {
                    tracing::warn!(
                        file = %file_path,
                        call = %name,
                        "call term has no position, using fallback range"
                    );
                    fallback_range()
                }
            };
            calls.push(CallSite {
                name: name.clone(),
                arity: arguments.len() as u32,
                location,
            });
            for arg in arguments {
                collect_calls(arg, file_path, calls);
            }
        }
        Term::Infix { left, right, .. } => {
            collect_calls(left, file_path, calls);
            collect_calls(right, file_path, calls);
        }
        Term::List { items, .. } => {
            for item in items {
                collect_calls(item, file_path, calls);
            }
        }
        Term::Paren { inner, .. } => collect_calls(inner, file_path, calls),
        Term::Atom { .. }
        | Term::Variable { .. }
        | Term::Number { .. }
        | Term::Operator { .. }
        | Term::Cut { .. } => {}
    }
}
