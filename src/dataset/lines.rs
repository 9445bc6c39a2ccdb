use std::path::Path;

use super::{check_index, Dataset};
use crate::data::loader::read_lines;
use crate::error::Result;

/// A text file read eagerly, one example per line.
#[derive(Debug, Clone)]
pub struct LineDataset {
    lines: Vec<String>,
}

impl LineDataset {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(LineDataset {
            lines: read_lines(path)?,
        })
    }

    pub fn from_lines(lines: Vec<String>) -> Self {
        LineDataset { lines }
    }
}

impl Dataset for LineDataset {
    type Item = String;

    fn len(&self) -> usize {
        self.lines.len()
    }

    /// The raw line, terminator included.
    fn get_example(&self, idx: usize) -> Result<String> {
        check_index(idx, self.lines.len())?;
        Ok(self.lines[idx].clone())
    }
}
