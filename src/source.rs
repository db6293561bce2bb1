//! Source positions, the file registry, and interned text.
//!
//! Token and AST text is never borrowed from a source buffer. Every spelling
//! is interned into the per-unit [`Interner`] and referred to through a
//! [`Symbol`] handle, so tokens stay valid after the buffer they were lexed
//! from has been dropped (included files, macro replay).

use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// Index of a file registered in a [`SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub file: FileId,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: FileId, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }
}

/// Registry of every file that contributed tokens to a translation unit.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: Vec<PathBuf>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and return its id. Registering the same path twice
    /// yields two ids; each inclusion is a distinct lexing context.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(path.into());
        id
    }

    pub fn path(&self, id: FileId) -> Option<&Path> {
        self.files.get(id.0 as usize).map(PathBuf::as_path)
    }

    /// Name used in diagnostics; unknown ids render as `<unknown>`.
    pub fn display_name(&self, id: FileId) -> String {
        self.path(id)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Handle to an interned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// The empty string, pre-interned by every [`Interner`].
    pub const EMPTY: Symbol = Symbol(0);
}

/// Content-keyed string table owned by one translation unit.
///
/// Entries are keyed by their exact bytes. Source bytes that are not valid
/// UTF-8 still intern to distinct symbols; only their display form is
/// lossy.
#[derive(Debug, Clone)]
pub struct Interner {
    map: FxHashMap<Box<[u8]>, Symbol>,
    bytes: Vec<Box<[u8]>>,
    strings: Vec<Box<str>>,
}

impl Interner {
    pub fn new() -> Self {
        let mut interner = Self {
            map: FxHashMap::default(),
            bytes: Vec::new(),
            strings: Vec::new(),
        };
        interner.intern("");
        interner
    }

    pub fn intern(&mut self, text: &str) -> Symbol {
        self.intern_bytes(text.as_bytes())
    }

    /// Intern raw source bytes without decoding them.
    pub fn intern_bytes(&mut self, bytes: &[u8]) -> Symbol {
        if let Some(&sym) = self.map.get(bytes) {
            return sym;
        }
        let sym = Symbol(self.bytes.len() as u32);
        self.bytes.push(bytes.into());
        self.strings
            .push(String::from_utf8_lossy(bytes).into_owned().into_boxed_str());
        self.map.insert(bytes.into(), sym);
        sym
    }

    /// Look up text without interning it.
    pub fn get(&self, text: &str) -> Option<Symbol> {
        self.map.get(text.as_bytes()).copied()
    }

    /// Display spelling. Invalid UTF-8 shows as U+FFFD.
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.strings.get(sym.0 as usize).map_or("", |s| &s[..])
    }

    /// Exact bytes the symbol was interned from.
    pub fn resolve_bytes(&self, sym: Symbol) -> &[u8] {
        self.bytes.get(sym.0 as usize).map_or(&[][..], |b| &b[..])
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_keyed_by_content() {
        let mut interner = Interner::new();
        let a = interner.intern("main");
        let b = interner.intern("main");
        let c = interner.intern("x");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.resolve(a), "main");
        assert_eq!(interner.resolve(Symbol::EMPTY), "");
    }

    #[test]
    fn non_utf8_bytes_intern_distinctly() {
        let mut interner = Interner::new();
        let ff = interner.intern_bytes(b"a\xff");
        let fe = interner.intern_bytes(b"a\xfe");
        assert_ne!(ff, fe);
        assert_eq!(interner.intern_bytes(b"a\xff"), ff);
        assert_eq!(interner.resolve_bytes(fe), b"a\xfe");
        assert_eq!(interner.resolve(ff), "a\u{fffd}");
    }

    #[test]
    fn source_map_names() {
        let mut map = SourceMap::new();
        let id = map.add("src/main.c");
        assert_eq!(map.display_name(id), "src/main.c");
        assert_eq!(map.display_name(FileId(7)), "<unknown>");
    }
}
