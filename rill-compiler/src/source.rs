use std::path::{Path, PathBuf};

/// Identifier stamped on every token so diagnostics can name the file
/// they came from. A pipeline run compiles exactly one script, so the
/// entry file is always id 0; synthesized tokens (builtin parameter
/// defaults) reuse that id with zeroed positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SourceId(pub u32);

/// An input script held in memory for the duration of one compilation.
/// The contents are immutable once loaded; every stage reads positions
/// against this same text.
#[derive(Debug, Clone)]
pub struct SourceFile {
    id: SourceId,
    path: PathBuf,
    contents: String,
}

impl SourceFile {
    pub fn new(id: SourceId, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
            contents: contents.into(),
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }
}
