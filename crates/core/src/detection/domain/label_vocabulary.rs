use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VocabularyError {
    #[error("failed to read labels from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("label file {0} contains no labels")]
    Empty(PathBuf),
    #[error("duplicate label '{label}' at lines {first} and {second}")]
    Duplicate {
        label: String,
        first: usize,
        second: usize,
    },
}

/// Ordered class names the model was trained on, addressed by class id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelVocabulary {
    labels: Vec<String>,
}

impl LabelVocabulary {
    /// Builds a vocabulary from names, rejecting duplicates. Empty names are
    /// placeholders that keep later class ids aligned and never match.
    pub fn new(labels: Vec<String>) -> Result<Self, VocabularyError> {
        for (i, label) in labels.iter().enumerate() {
            if label.is_empty() {
                continue;
            }
            if let Some(j) = labels[..i].iter().position(|l| l == label) {
                return Err(VocabularyError::Duplicate {
                    label: label.clone(),
                    first: j + 1,
                    second: i + 1,
                });
            }
        }
        Ok(Self { labels })
    }

    /// Reads a names file: one label per line, surrounding whitespace and
    /// leading/trailing blank lines dropped. Interior blank lines keep their
    /// class id.
    pub fn from_file(path: &Path) -> Result<Self, VocabularyError> {
        let text = fs::read_to_string(path).map_err(|e| VocabularyError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let vocabulary = Self::parse(&text)?;
        if vocabulary.is_empty() {
            return Err(VocabularyError::Empty(path.to_path_buf()));
        }
        Ok(vocabulary)
    }

    pub fn parse(text: &str) -> Result<Self, VocabularyError> {
        let labels = text
            .trim()
            .lines()
            .map(|l| l.trim().to_string())
            .collect();
        Self::new(labels)
    }

    pub fn label(&self, class_id: usize) -> Option<&str> {
        self.labels.get(class_id).map(String::as_str)
    }

    /// Exact, case-sensitive lookup.
    pub fn class_id(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        self.labels.iter().position(|l| l == name)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
