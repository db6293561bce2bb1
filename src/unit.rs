//! Per-translation-unit state shared by the preprocessor and the parser.

use crate::diagnostics::{Diagnostic, Diagnostics, Severity};
use crate::source::{Interner, SourceLocation, SourceMap};

/// The owning compilation unit: file registry, string table and the
/// diagnostics sink every stage reports into.
#[derive(Debug, Clone, Default)]
pub struct CompileUnit {
    pub sources: SourceMap,
    pub interner: Interner,
    pub diagnostics: Diagnostics,
}

impl CompileUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, severity: Severity, location: SourceLocation, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            severity,
            file: self.sources.display_name(location.file),
            line: location.line,
            column: location.column,
            message: message.into(),
        };
        self.diagnostics.report(diagnostic);
    }

    pub fn error(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.report(Severity::Error, location, message);
    }

    pub fn warning(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.report(Severity::Warning, location, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_resolves_file_name() {
        let mut unit = CompileUnit::new();
        let file = unit.sources.add("lib/util.h");
        unit.warning(SourceLocation::new(file, 12, 3), "unknown preprocessor directive");
        let diag = unit.diagnostics.iter().next().cloned();
        assert_eq!(
            diag.map(|d| d.to_string()),
            Some("lib/util.h:12:3: warning: unknown preprocessor directive".to_string())
        );
    }
}
