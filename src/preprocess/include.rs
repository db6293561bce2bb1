//! Include search paths and source loading.
//!
//! Quoted includes look in the including file's directory first, then the
//! user directories, then the system directories. Angled includes skip the
//! including file's directory. A directory marked `recursive` also has its
//! subdirectories searched, depth first in name order.

use crate::config::IncludeConfig;
use rustc_hash::FxHashMap;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    /// `-I`
    User,
    /// `-isystem`
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeSyntax {
    Quoted,
    Angled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeDir {
    pub path: PathBuf,
    pub kind: IncludeKind,
    pub recursive: bool,
}

#[derive(Debug, Clone, Default)]
pub struct IncludeSearchPath {
    dirs: Vec<IncludeDir>,
}

impl IncludeSearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &IncludeConfig) -> Self {
        let mut search = Self::new();
        for dir in &config.user_dirs {
            search.add(dir, IncludeKind::User, config.recursive);
        }
        for dir in &config.system_dirs {
            search.add(dir, IncludeKind::System, config.recursive);
        }
        search
    }

    pub fn add(&mut self, path: impl Into<PathBuf>, kind: IncludeKind, recursive: bool) {
        self.dirs.push(IncludeDir {
            path: path.into(),
            kind,
            recursive,
        });
    }

    /// Every path that `name` could refer to, in search order.
    pub fn candidates(&self, name: &str, syntax: IncludeSyntax, current_dir: Option<&Path>) -> Vec<PathBuf> {
        let mut out = Vec::new();
        if syntax == IncludeSyntax::Quoted {
            out.push(current_dir.map_or_else(|| PathBuf::from(name), |dir| dir.join(name)));
        }
        for kind in [IncludeKind::User, IncludeKind::System] {
            for dir in self.dirs.iter().filter(|d| d.kind == kind) {
                out.push(dir.path.join(name));
                if dir.recursive {
                    let mut subdirs = Vec::new();
                    collect_subdirectories(&dir.path, &mut subdirs);
                    out.extend(subdirs.into_iter().map(|sub| sub.join(name)));
                }
            }
        }
        out
    }

    /// First candidate that `reader` can open.
    pub fn resolve(
        &self,
        name: &str,
        syntax: IncludeSyntax,
        current_dir: Option<&Path>,
        reader: &dyn SourceReader,
    ) -> Option<PathBuf> {
        let found = self
            .candidates(name, syntax, current_dir)
            .into_iter()
            .find(|candidate| reader.exists(candidate));
        tracing::debug!(name, ?found, "include lookup");
        found
    }
}

fn collect_subdirectories(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let mut children: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    children.sort();
    for child in children {
        out.push(child.clone());
        collect_subdirectories(&child, out);
    }
}

/// Where source bytes come from.
pub trait SourceReader {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn exists(&self, path: &Path) -> bool;
}

/// Reads from the file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSourceReader;

impl SourceReader for FsSourceReader {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// In-memory file set, keyed by exact path.
#[derive(Debug, Clone, Default)]
pub struct MemorySourceReader {
    files: FxHashMap<PathBuf, Vec<u8>>,
}

impl MemorySourceReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.files.insert(normalize(&path.into()), contents.into());
    }
}

/// Drop `.` components so `./a.h` and `a.h` name the same entry.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect()
}

impl SourceReader for MemorySourceReader {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file in memory"))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(&normalize(path))
    }
}
