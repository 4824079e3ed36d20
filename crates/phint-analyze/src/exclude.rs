//! Excluded path matching
//!
//! The same list of patterns (usually dependency directories such as
//! `vendor/`) is used by the trace parser and every source file scan.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Set of exclude patterns
///
/// A pattern matches when it glob-matches the whole path or its file name,
/// or, for patterns ending in `/`, when the path contains that directory.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    patterns: Vec<String>,
}

impl PathFilter {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        self.is_excluded_str(&path.to_string_lossy())
    }

    /// Check a path given as text, as it appears in a trace file
    pub fn is_excluded_str(&self, path_str: &str) -> bool {
        let file_name = path_str.rsplit(['/', '\\']).next().unwrap_or(path_str);

        for pattern in &self.patterns {
            if pattern.ends_with('/') {
                let dir_pattern = pattern.trim_end_matches('/');
                if path_str.contains(&format!("/{}/", dir_pattern))
                    || path_str.starts_with(&format!("{}/", dir_pattern))
                {
                    return true;
                }
                continue;
            }

            if let Ok(glob_pattern) = glob::Pattern::new(pattern) {
                if glob_pattern.matches(path_str) || glob_pattern.matches(file_name) {
                    return true;
                }
            }
        }

        false
    }

    /// Collect every non-excluded PHP file under the given files or directories
    pub fn collect_php_files(&self, roots: &[PathBuf]) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for root in roots {
            if root.is_file() {
                if !self.is_excluded(root) {
                    files.push(root.clone());
                }
            } else if root.is_dir() {
                for entry in WalkDir::new(root)
                    .follow_links(true)
                    .into_iter()
                    .filter_map(|e| e.ok())
                {
                    let entry_path = entry.path();
                    if entry_path.is_file()
                        && entry_path.extension().map(|e| e == "php").unwrap_or(false)
                        && !self.is_excluded(entry_path)
                    {
                        files.push(entry_path.to_path_buf());
                    }
                }
            }
        }

        files.sort();
        files.dedup();
        files
    }
}
