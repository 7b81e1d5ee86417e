//! Conversion between prolog-lsp-core types and tower_lsp::lsp_types.
//!
//! Core coordinates use 1-based lines and 0-based characters (the
//! analyzer's convention); LSP uses 0-based for both, so every
//! conversion shifts the line by one. `saturating_sub` keeps the
//! synthetic internal-error diagnostic at line 0 from underflowing.

use tower_lsp::lsp_types::{
    Diagnostic as LspDiagnostic, DiagnosticSeverity as LspSeverity, Position as LspPosition,
    Range as LspRange,
};

use prolog_lsp_core::{Diagnostic, DiagnosticSeverity, Position, Range};

/// Diagnostic source reported to the client.
const DIAGNOSTIC_SOURCE: &str = "prolog";

/// Convert a core Position to an lsp-types Position.
pub fn position_to_lsp(pos: &Position) -> LspPosition {
    LspPosition {
        line: pos.line.saturating_sub(1),
        character: pos.character,
    }
}

/// Convert an lsp-types Position to a core Position.
pub fn position_from_lsp(pos: &LspPosition) -> Position {
    Position::new(pos.line + 1, pos.character)
}

/// Convert a core Range to an lsp-types Range.
pub fn range_to_lsp(range: &Range) -> LspRange {
    LspRange {
        start: position_to_lsp(&range.start),
        end: position_to_lsp(&range.end),
    }
}

/// Convert a core DiagnosticSeverity to an lsp-types DiagnosticSeverity.
pub fn severity_to_lsp(severity: DiagnosticSeverity) -> LspSeverity {
    match severity {
        DiagnosticSeverity::Error => LspSeverity::ERROR,
        DiagnosticSeverity::Warning => LspSeverity::WARNING,
        DiagnosticSeverity::Information => LspSeverity::INFORMATION,
        DiagnosticSeverity::Hint => LspSeverity::HINT,
    }
}

/// Convert a core Diagnostic to an lsp-types Diagnostic.
///
/// Core diagnostics carry a point, not a range; the LSP range is
/// zero-width at that point and clients extend it to the enclosing
/// word for display.
pub fn diagnostic_to_lsp(diag: &Diagnostic) -> LspDiagnostic {
    let position = LspPosition {
        line: diag.line.saturating_sub(1),
        character: diag.character,
    };
    LspDiagnostic {
        range: LspRange {
            start: position,
            end: position,
        },
        severity: Some(severity_to_lsp(diag.severity)),
        code: None,
        code_description: None,
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: diag.message.clone(),
        related_information: None,
        tags: None,
        data: None,
    }
}
