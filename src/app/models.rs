use std::fs;
use std::path::PathBuf;

/// A file matched by the include patterns and not excluded, prior to
/// content-level filtering. Lives only for the duration of one run.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub path: PathBuf,
    /// Relative to the project root, forward slashes.
    pub relative_path: String,
    size: Option<u64>,
}

impl CandidateFile {
    pub fn new(path: PathBuf, relative_path: String) -> Self {
        Self {
            path,
            relative_path,
            size: None,
        }
    }

    /// Stat is deferred until the size gate needs it, then cached.
    /// Missing files and non-files report 0.
    pub fn size_bytes(&mut self) -> u64 {
        if let Some(size) = self.size {
            return size;
        }
        let size = fs::metadata(&self.path)
            .map(|meta| if meta.is_file() { meta.len() } else { 0 })
            .unwrap_or(0);
        self.size = Some(size);
        size
    }
}

/// One accepted file, fully rendered for the File Contents section.
/// Immutable once produced; output order matches pipeline order.
#[derive(Debug, Clone)]
pub struct RenderedBlock {
    pub relative_path: String,
    pub fence_len: usize,
    pub tokens: usize,
    /// Section header plus fenced content.
    pub text: String,
}

/// Counters accumulated over a single run. Monotonic; never decremented.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub files_discovered: usize,
    pub included: usize,
    pub skipped_by_size: usize,
    pub skipped_by_token_cap: usize,
    pub skipped_binary: usize,
    pub skipped_read_error: usize,
    pub total_tokens: usize,
    pub budget_reached: bool,
}
