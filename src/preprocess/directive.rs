//! Directive names and the lookup table the preprocessor dispatches on.

use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    Include,
    Define,
    Undef,
    If,
    Ifdef,
    Ifndef,
    Elif,
    Else,
    Endif,
    Pragma,
    Error,
    Warning,
    Line,
}

const DIRECTIVES: &[(&str, Directive)] = &[
    ("include", Directive::Include),
    ("define", Directive::Define),
    ("undef", Directive::Undef),
    ("if", Directive::If),
    ("ifdef", Directive::Ifdef),
    ("ifndef", Directive::Ifndef),
    ("elif", Directive::Elif),
    ("else", Directive::Else),
    ("endif", Directive::Endif),
    ("pragma", Directive::Pragma),
    ("error", Directive::Error),
    ("warning", Directive::Warning),
    ("line", Directive::Line),
];

impl Directive {
    pub fn name(self) -> &'static str {
        DIRECTIVES
            .iter()
            .find(|&&(_, d)| d == self)
            .map_or("?", |&(name, _)| name)
    }

    /// Conditional directives are processed even inside skipped regions.
    pub fn is_conditional(self) -> bool {
        matches!(
            self,
            Directive::If
                | Directive::Ifdef
                | Directive::Ifndef
                | Directive::Elif
                | Directive::Else
                | Directive::Endif
        )
    }
}

/// Directive name to handler mapping, owned by each preprocessor.
#[derive(Debug, Clone)]
pub struct DirectiveTable {
    table: FxHashMap<&'static str, Directive>,
}

impl DirectiveTable {
    pub fn new() -> Self {
        Self {
            table: DIRECTIVES.iter().copied().collect(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Directive> {
        self.table.get(name).copied()
    }
}

impl Default for DirectiveTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let table = DirectiveTable::new();
        assert_eq!(table.lookup("ifndef"), Some(Directive::Ifndef));
        assert_eq!(table.lookup("warning"), Some(Directive::Warning));
        assert_eq!(table.lookup("ident"), None);
        assert_eq!(Directive::Pragma.name(), "pragma");
        assert!(Directive::Elif.is_conditional());
        assert!(!Directive::Include.is_conditional());
    }
}
