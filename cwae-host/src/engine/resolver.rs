//! File location resolution for banks

use super::{EngineError, EngineResult};
use std::path::{Path, PathBuf};

/// Bank file extension
pub const BANK_EXTENSION: &str = "bnk";

/// Maps bank names to files under a base path
///
/// Localized banks are looked up in `<base>/<language>/` first, then the base
/// folder itself.
#[derive(Debug, Clone)]
pub struct FileLocationResolver {
    base_path: PathBuf,
    language: String,
}

impl Default for FileLocationResolver {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            language: String::new(),
        }
    }
}

impl FileLocationResolver {
    pub fn set_base_path(&mut self, path: &Path) {
        self.base_path = path.to_path_buf();
    }

    pub fn set_language(&mut self, language: &str) {
        self.language = language.to_string();
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Candidate paths for `name`, in lookup order
    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let file_name = bank_file_name(name);
        let mut paths = Vec::with_capacity(2);
        if !self.language.is_empty() {
            paths.push(self.base_path.join(&self.language).join(&file_name));
        }
        paths.push(self.base_path.join(file_name));
        paths
    }

    /// First existing candidate for `name`
    pub fn resolve(&self, name: &str) -> EngineResult<PathBuf> {
        let candidates = self.candidates(name);
        match candidates.iter().find(|p| p.is_file()) {
            Some(path) => Ok(path.clone()),
            None => Err(EngineError::BankNotFound {
                name: name.to_string(),
                searched: candidates,
            }),
        }
    }
}

/// `name` with the bank extension appended when it has none
pub fn bank_file_name(name: &str) -> String {
    if Path::new(name).extension().is_some() {
        name.to_string()
    } else {
        format!("{}.{}", name, BANK_EXTENSION)
    }
}

/// `name` without a trailing bank extension
pub fn bank_stem(name: &str) -> &str {
    let split = name.len().saturating_sub(BANK_EXTENSION.len() + 1);
    if split > 0 && name.is_char_boundary(split) {
        let (stem, ext) = name.split_at(split);
        if ext.eq_ignore_ascii_case(".bnk") {
            return stem;
        }
    }
    name
}
