//! Indexed datasets: the `len()` / `get_example(idx)` contract a serving
//! framework pulls examples through.

pub mod genomic_interval;
pub mod lines;
pub mod tabular;

use crate::error::{LoaderError, Result};

pub use genomic_interval::GenomicIntervalDataset;
pub use lines::LineDataset;
pub use tabular::TabularFeatureDataset;

pub trait Dataset {
    type Item;

    fn len(&self) -> usize;

    /// Build the example at `idx`, computed fresh on every call.
    fn get_example(&self, idx: usize) -> Result<Self::Item>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(LoaderError::IndexOutOfRange { index, len });
    }
    Ok(())
}

pub(crate) fn check_length(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(LoaderError::LengthMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}
