use std::path::{Path, PathBuf};

/// Identifier for a source file that declarations are attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileId(pub usize);

impl FileId {
    pub const UNKNOWN: Self = FileId(usize::MAX);
}

impl Default for FileId {
    fn default() -> Self {
        FileId::UNKNOWN
    }
}

/// Captured line/column information (1-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
}

#[derive(Clone, Debug)]
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub source: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    #[must_use]
    pub fn new(id: FileId, path: PathBuf, source: String) -> Self {
        let line_starts = compute_line_starts(&source);
        Self {
            id,
            path,
            source,
            line_starts,
        }
    }

    #[must_use]
    pub fn line_col(&self, offset: usize) -> Option<LineCol> {
        if offset > self.source.len() {
            return None;
        }
        let index = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_start = *self.line_starts.get(index)?;
        let column = self.source.get(line_start..offset)?.chars().count() + 1;
        Some(LineCol {
            line: index + 1,
            column,
        })
    }

    /// Text of a 1-based line without its terminator.
    #[must_use]
    pub fn line(&self, line: usize) -> Option<&str> {
        let (start, end) = self.line_bounds(line)?;
        self.source
            .get(start..end)
            .map(|text| text.trim_end_matches(['\n', '\r']))
    }

    /// Start and end byte offsets (exclusive) for a line.
    #[must_use]
    pub fn line_bounds(&self, line: usize) -> Option<(usize, usize)> {
        let start = *self.line_starts.get(line.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(line)
            .copied()
            .unwrap_or(self.source.len());
        Some((start, end))
    }
}

/// Collection of source files used by diagnostics.
#[derive(Clone, Debug, Default)]
pub struct FileCache {
    files: Vec<SourceFile>,
}

impl FileCache {
    pub fn add_file(&mut self, path: impl Into<PathBuf>, source: impl Into<String>) -> FileId {
        let id = FileId(self.files.len());
        self.files
            .push(SourceFile::new(id, path.into(), source.into()));
        id
    }

    #[must_use]
    pub fn get(&self, file_id: FileId) -> Option<&SourceFile> {
        self.files.get(file_id.0)
    }

    #[must_use]
    pub fn path(&self, file_id: FileId) -> Option<&Path> {
        self.get(file_id).map(|file| file.path.as_path())
    }

    #[must_use]
    pub fn line_col(&self, file_id: FileId, offset: usize) -> Option<LineCol> {
        self.get(file_id).and_then(|file| file.line_col(offset))
    }
}

fn compute_line_starts(source: &str) -> Vec<usize> {
    let mut starts = Vec::with_capacity(source.lines().count() + 1);
    starts.push(0);
    for (idx, ch) in source.char_indices() {
        if ch == '\n' {
            starts.push(idx + ch.len_utf8());
        }
    }
    starts
}
