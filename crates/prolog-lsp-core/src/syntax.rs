//! The syntax tree produced by the external analyzer.
//!
//! The analyzer emits one JSON document per analyzed file; this module
//! is the typed form of that wire format. Node kinds are a closed set
//! of tagged enums (`"kind"` discriminator on the wire), so traversals
//! match exhaustively instead of switching on strings.
//!
//! Coordinates follow the analyzer's convention: 1-based lines,
//! 0-based columns. Position information is optional on every term —
//! the indexer substitutes fallback ranges rather than failing when a
//! node arrives without one.
//!
//! Wire convention for clause bodies: every *goal* is emitted as a
//! [`Term::Compound`], with an empty argument list for zero-arity
//! goals such as `pred1`. `Atom` nodes only occur in argument
//! position. The indexer relies on this to tell calls apart from data.

use serde::{Deserialize, Serialize};

/// A point in the analyzed source: 1-based line, 0-based column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePosition {
    /// One-based line number.
    pub line: u32,
    /// Zero-based column.
    pub column: u32,
}

impl NodePosition {
    /// Create a new node position.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// The full extent of a top-level item, including leading comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpan {
    /// Start of the item's full extent.
    pub start: NodePosition,
    /// End of the item's full extent.
    pub end: NodePosition,
}

/// A term node in a parsed clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Term {
    /// A bare atom (in argument position).
    Atom {
        name: String,
        #[serde(default)]
        position: Option<NodePosition>,
    },
    /// A logic variable.
    Variable {
        name: String,
        #[serde(default)]
        position: Option<NodePosition>,
    },
    /// A numeric literal, kept as the source text.
    Number {
        text: String,
        #[serde(default)]
        position: Option<NodePosition>,
    },
    /// A standalone operator atom.
    Operator {
        name: String,
        #[serde(default)]
        position: Option<NodePosition>,
    },
    /// A compound/functor application. Zero arguments means a
    /// zero-arity goal, not an atom.
    Compound {
        name: String,
        #[serde(default)]
        arguments: Vec<Term>,
        #[serde(default)]
        position: Option<NodePosition>,
    },
    /// An infix expression such as `A = B` or `X , Y`.
    Infix {
        operator: String,
        left: Box<Term>,
        right: Box<Term>,
        #[serde(default)]
        position: Option<NodePosition>,
    },
    /// A list term.
    List {
        #[serde(default)]
        items: Vec<Term>,
        #[serde(default)]
        position: Option<NodePosition>,
    },
    /// A parenthesized group.
    Paren {
        inner: Box<Term>,
        #[serde(default)]
        position: Option<NodePosition>,
    },
    /// The cut (`!`).
    Cut {
        #[serde(default)]
        position: Option<NodePosition>,
    },
}

impl Term {
    /// The term's own source position, if the analyzer provided one.
    pub fn position(&self) -> Option<NodePosition> {
        match self {
            Term::Atom { position, .. }
            | Term::Variable { position, .. }
            | Term::Number { position, .. }
            | Term::Operator { position, .. }
            | Term::Compound { position, .. }
            | Term::Infix { position, .. }
            | Term::List { position, .. }
            | Term::Paren { position, .. }
            | Term::Cut { position } => *position,
        }
    }

    /// Render the term back to canonical source text.
    ///
    /// Used to estimate the on-screen width of a clause head. This is
    /// an approximation: the analyzer's original layout (whitespace,
    /// line breaks inside a term) is not reconstructed, so multi-line
    /// heads yield an end offset that is at best a lower bound.
    pub fn rendered(&self) -> String {
        match self {
            Term::Atom { name, .. }
            | Term::Variable { name, .. }
            | Term::Operator { name, .. } => name.clone(),
            Term::Number { text, .. } => text.clone(),
            Term::Compound {
                name, arguments, ..
            } => {
                if arguments.is_empty() {
                    name.clone()
                } else {
                    let args: Vec<String> = arguments.iter().map(Term::rendered).collect();
                    format!("{}({})", name, args.join(","))
                }
            }
            Term::Infix {
                operator,
                left,
                right,
                ..
            } => format!("{} {} {}", left.rendered(), operator, right.rendered()),
            Term::List { items, .. } => {
                let items: Vec<String> = items.iter().map(Term::rendered).collect();
                format!("[{}]", items.join(","))
            }
            Term::Paren { inner, .. } => format!("({})", inner.rendered()),
            Term::Cut { .. } => "!".to_string(),
        }
    }

    /// The rendered width in characters.
    pub fn rendered_len(&self) -> u32 {
        self.rendered().chars().count() as u32
    }
}

/// A top-level item of an analyzed file, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    /// A rule: `Head :- Body`.
    Rule {
        head: Term,
        #[serde(default)]
        body: Vec<Term>,
        line: u32,
        column: u32,
        #[serde(default)]
        span: Option<NodeSpan>,
    },
    /// A fact: a bodiless clause.
    Fact {
        head: Term,
        line: u32,
        column: u32,
        #[serde(default)]
        span: Option<NodeSpan>,
    },
    /// A directive such as `:- module(...)`. Not indexed.
    Directive {
        line: u32,
        column: u32,
        #[serde(default)]
        span: Option<NodeSpan>,
    },
    /// A region the analyzer could not parse.
    ParseError {
        message: String,
        line: u32,
        column: u32,
    },
}

/// The parsed syntax tree for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyntaxTree {
    /// Top-level items in source order.
    #[serde(default)]
    pub items: Vec<Item>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(name: &str) -> Term {
        Term::Atom {
            name: name.to_string(),
            position: None,
        }
    }

    #[test]
    fn term_roundtrips_through_wire_format() {
        let json = r#"{
            "kind": "compound",
            "name": "likes",
            "arguments": [
                {"kind": "atom", "name": "mary"},
                {"kind": "variable", "name": "X", "position": {"line": 3, "column": 11}}
            ],
            "position": {"line": 3, "column": 0}
        }"#;

        let term: Term = serde_json::from_str(json).unwrap();
        match &term {
            Term::Compound {
                name,
                arguments,
                position,
            } => {
                assert_eq!(name, "likes");
                assert_eq!(arguments.len(), 2);
                assert_eq!(*position, Some(NodePosition::new(3, 0)));
            }
            other => panic!("expected compound, got {other:?}"),
        }

        let back = serde_json::to_string(&term).unwrap();
        let again: Term = serde_json::from_str(&back).unwrap();
        assert_eq!(term, again);
    }

    #[test]
    fn zero_arity_compound_is_distinct_from_atom() {
        let goal: Term = serde_json::from_str(r#"{"kind": "compound", "name": "halt"}"#).unwrap();
        assert!(matches!(goal, Term::Compound { ref arguments, .. } if arguments.is_empty()));

        let arg: Term = serde_json::from_str(r#"{"kind": "atom", "name": "halt"}"#).unwrap();
        assert!(matches!(arg, Term::Atom { .. }));
    }

    #[test]
    fn rendered_compound() {
        let term = Term::Compound {
            name: "foo".to_string(),
            arguments: vec![
                atom("a"),
                Term::List {
                    items: vec![atom("b"), atom("c")],
                    position: None,
                },
            ],
            position: None,
        };
        assert_eq!(term.rendered(), "foo(a,[b,c])");
        assert_eq!(term.rendered_len(), 12);
    }

    #[test]
    fn rendered_infix_and_paren() {
        let term = Term::Paren {
            inner: Box::new(Term::Infix {
                operator: "=".to_string(),
                left: Box::new(Term::Variable {
                    name: "X".to_string(),
                    position: None,
                }),
                right: Box::new(Term::Number {
                    text: "42".to_string(),
                    position: None,
                }),
                position: None,
            }),
            position: None,
        };
        assert_eq!(term.rendered(), "(X = 42)");
    }

    #[test]
    fn item_parse_error_from_wire() {
        let json = r#"{"items": [
            {"kind": "parse_error", "message": "operator expected", "line": 7, "column": 3}
        ]}"#;
        let tree: SyntaxTree = serde_json::from_str(json).unwrap();
        assert_eq!(tree.items.len(), 1);
        assert!(matches!(tree.items[0], Item::ParseError { line: 7, .. }));
    }
}
