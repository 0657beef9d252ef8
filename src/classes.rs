//! Class-name lookup tables.

use crate::util::{YoloDecodeError, YoloDecodeResult};
use std::path::Path;

/// Ordered class labels, indexed by class index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassNames {
    names: Vec<String>,
}

impl ClassNames {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Parses a newline-delimited list; the segment after the final newline is dropped.
    pub fn parse(text: &str) -> Self {
        let mut names: Vec<String> = text
            .split('\n')
            .map(|line| line.trim_end_matches('\r').to_owned())
            .collect();
        names.pop();
        Self { names }
    }

    /// Reads and parses a names file such as `coco.names`.
    pub fn load<P: AsRef<Path>>(path: P) -> YoloDecodeResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| YoloDecodeError::ClassNamesIo {
            reason: err.to_string(),
        })?;
        Ok(Self::parse(&text))
    }

    pub fn get(&self, class_index: usize) -> Option<&str> {
        self.names.get(class_index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(String::as_str)
    }
}
