//! Extractors turn a batch of intervals into a float32 array.
//!
//! ```text
//!   &[Interval] ──► check_or_create_output ──► extract_into ──► ArrayD<f32>
//!                   (shape + dtype of `out`)
//! ```

pub mod annotation;
pub mod landmarks;
pub mod sequence;

use ndarray::{ArrayD, IxDyn};

use crate::data::model::{Interval, Tensor};
use crate::error::{LoaderError, Result};

/// Element type every extractor writes.
pub const EXTRACTOR_DTYPE: &str = "float32";

pub trait Extractor {
    /// Shape of the output for `num_intervals` intervals of `width` bases.
    fn output_shape(&self, num_intervals: usize, width: usize) -> Vec<usize>;

    /// Fill `out`, already validated against [`Extractor::output_shape`].
    fn extract_into(&self, intervals: &[Interval], out: &mut ArrayD<f32>) -> Result<()>;

    /// Extract into `out` if given, otherwise into a fresh zeroed array.
    fn extract(&self, intervals: &[Interval], out: Option<Tensor>) -> Result<ArrayD<f32>> {
        let mut data = self.check_or_create_output(intervals, out)?;
        self.extract_into(intervals, &mut data)?;
        Ok(data)
    }

    /// The batch width is the width of the first interval.
    fn check_or_create_output(
        &self,
        intervals: &[Interval],
        out: Option<Tensor>,
    ) -> Result<ArrayD<f32>> {
        let first = intervals.first().ok_or(LoaderError::EmptyBatch)?;
        let shape = self.output_shape(intervals.len(), first.width());

        let Some(out) = out else {
            return Ok(ArrayD::zeros(IxDyn(&shape)));
        };
        if out.shape() != shape.as_slice() {
            return Err(LoaderError::OutputShape {
                expected: shape,
                actual: out.shape().to_vec(),
            });
        }
        match out {
            Tensor::F32(array) => Ok(array),
            other => Err(LoaderError::OutputDtype {
                expected: EXTRACTOR_DTYPE,
                actual: other.dtype(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Strand;

    /// Writes the interval index into every cell of its row.
    struct RowIndex;

    impl Extractor for RowIndex {
        fn output_shape(&self, num_intervals: usize, width: usize) -> Vec<usize> {
            vec![num_intervals, width]
        }

        fn extract_into(&self, _intervals: &[Interval], out: &mut ArrayD<f32>) -> Result<()> {
            for (ix, v) in out.indexed_iter_mut() {
                *v = ix[0] as f32;
            }
            Ok(())
        }
    }

    fn batch() -> Vec<Interval> {
        vec![
            Interval::new("chr1", 0, 4, Strand::Forward),
            Interval::new("chr1", 10, 14, Strand::Forward),
        ]
    }

    #[test]
    fn creates_output_when_absent() {
        let out = RowIndex.extract(&batch(), None).unwrap();
        assert_eq!(out.shape(), &[2, 4]);
        assert_eq!(out[[1, 3]], 1.0);
    }

    #[test]
    fn reuses_valid_output() {
        let out = Tensor::F32(ArrayD::zeros(IxDyn(&[2, 4])));
        let data = RowIndex.extract(&batch(), Some(out)).unwrap();
        assert_eq!(data[[1, 0]], 1.0);
    }

    #[test]
    fn rejects_wrong_shape() {
        let out = Tensor::F32(ArrayD::zeros(IxDyn(&[2, 5])));
        match RowIndex.extract(&batch(), Some(out)) {
            Err(LoaderError::OutputShape { expected, actual }) => {
                assert_eq!(expected, vec![2, 4]);
                assert_eq!(actual, vec![2, 5]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_wrong_dtype() {
        let out = Tensor::F64(ArrayD::zeros(IxDyn(&[2, 4])));
        let err = RowIndex.extract(&batch(), Some(out)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "out array has incorrect dtype: float64 (need float32)"
        );
    }

    #[test]
    fn empty_batch() {
        assert!(matches!(
            RowIndex.extract(&[], None),
            Err(LoaderError::EmptyBatch)
        ));
    }
}
