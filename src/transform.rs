//! Fitted transformers applied at inference time.
//!
//! Transformers are trained elsewhere and shipped as JSON, tagged by `kind`:
//!
//! ```json
//! {"kind": "standard_scaler", "mean": [0.5, 1.0], "scale": [2.0, 1.0]}
//! {"kind": "min_max_scaler", "min": [0.0], "scale": [0.1]}
//! {"kind": "encode_splines", "n_bases": 10, "spline_order": 3,
//!  "data_min": [-5000.0], "data_max": [5000.0]}
//! {"kind": "identity"}
//! ```

use std::fmt;
use std::path::Path;

use log::debug;
use ndarray::{Array1, Array2, Array3, ArrayD, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{LoaderError, Result};

/// A previously fitted numeric transform. Never mutated by the loaders.
pub trait FittedTransformer: fmt::Debug + Send + Sync {
    /// Transform a `rows x columns` matrix. The output keeps `rows` as its
    /// first axis; any further axes depend on the transformer.
    fn transform(&self, x: ArrayView2<'_, f64>) -> Result<ArrayD<f64>>;

    /// Transform one feature row and flatten the result.
    fn transform_feature_vector(&self, row: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        let out = self.transform(row.insert_axis(Axis(0)))?;
        Ok(out.iter().copied().collect())
    }

    /// Transform one vector of distances, dropping the leading batch axis.
    fn transform_distance_vector(&self, dist: ArrayView1<'_, f64>) -> Result<ArrayD<f64>> {
        let out = self.transform(dist.insert_axis(Axis(0)))?;
        Ok(out.index_axis_move(Axis(0), 0))
    }
}

fn check_columns(kind: &str, x: &ArrayView2<'_, f64>, expected: usize) -> Result<()> {
    if x.ncols() != expected {
        return Err(LoaderError::Transform(format!(
            "{kind} was fitted on {expected} columns, got {}",
            x.ncols()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Serialized form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformerSpec {
    Identity,
    StandardScaler(StandardScaler),
    MinMaxScaler(MinMaxScaler),
    EncodeSplines(EncodeSplines),
}

impl TransformerSpec {
    pub fn into_transformer(self) -> Result<Box<dyn FittedTransformer>> {
        Ok(match self {
            TransformerSpec::Identity => Box::new(Identity),
            TransformerSpec::StandardScaler(t) => {
                t.validate()?;
                Box::new(t)
            }
            TransformerSpec::MinMaxScaler(t) => {
                t.validate()?;
                Box::new(t)
            }
            TransformerSpec::EncodeSplines(t) => {
                t.validate()?;
                Box::new(t)
            }
        })
    }
}

/// Load a fitted transformer from its JSON parameter file.
pub fn load_transformer(path: &Path) -> Result<Box<dyn FittedTransformer>> {
    let text = std::fs::read_to_string(path).map_err(|e| LoaderError::io(path, e))?;
    let spec: TransformerSpec =
        serde_json::from_str(&text).map_err(|e| LoaderError::parse(path, e.to_string()))?;
    debug!("Loaded transformer {:?} from {:?}", spec, path);
    spec.into_transformer()
}

// ---------------------------------------------------------------------------
// Scalers
// ---------------------------------------------------------------------------

/// Passes values through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl FittedTransformer for Identity {
    fn transform(&self, x: ArrayView2<'_, f64>) -> Result<ArrayD<f64>> {
        Ok(x.to_owned().into_dyn())
    }
}

/// `(x - mean) / scale`; a missing `mean` or `scale` skips that step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    #[serde(default)]
    pub mean: Option<Vec<f64>>,
    #[serde(default)]
    pub scale: Option<Vec<f64>>,
}

impl StandardScaler {
    fn validate(&self) -> Result<()> {
        if let (Some(m), Some(s)) = (&self.mean, &self.scale) {
            if m.len() != s.len() {
                return Err(LoaderError::Transform(format!(
                    "standard_scaler: mean has {} entries, scale has {}",
                    m.len(),
                    s.len()
                )));
            }
        }
        if self.scale.iter().flatten().any(|s| *s == 0.0) {
            return Err(LoaderError::Transform("standard_scaler: zero scale".into()));
        }
        Ok(())
    }
}

impl FittedTransformer for StandardScaler {
    fn transform(&self, x: ArrayView2<'_, f64>) -> Result<ArrayD<f64>> {
        let mut out = x.to_owned();
        if let Some(mean) = &self.mean {
            check_columns("standard_scaler", &x, mean.len())?;
            out -= &ArrayView1::from(mean.as_slice());
        }
        if let Some(scale) = &self.scale {
            check_columns("standard_scaler", &x, scale.len())?;
            out /= &ArrayView1::from(scale.as_slice());
        }
        Ok(out.into_dyn())
    }
}

/// `x * scale + min`, the fitted form of a min-max scaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub min: Vec<f64>,
    pub scale: Vec<f64>,
}

impl MinMaxScaler {
    fn validate(&self) -> Result<()> {
        if self.min.len() != self.scale.len() {
            return Err(LoaderError::Transform(format!(
                "min_max_scaler: min has {} entries, scale has {}",
                self.min.len(),
                self.scale.len()
            )));
        }
        Ok(())
    }
}

impl FittedTransformer for MinMaxScaler {
    fn transform(&self, x: ArrayView2<'_, f64>) -> Result<ArrayD<f64>> {
        check_columns("min_max_scaler", &x, self.min.len())?;
        let mut out = x.to_owned();
        out *= &ArrayView1::from(self.scale.as_slice());
        out += &ArrayView1::from(self.min.as_slice());
        Ok(out.into_dyn())
    }
}

// ---------------------------------------------------------------------------
// B-spline encoding
// ---------------------------------------------------------------------------

fn default_n_bases() -> usize {
    10
}

fn default_spline_order() -> usize {
    3
}

/// Encodes every column into `n_bases` B-spline basis values.
///
/// Each column keeps its own fitted range; values outside it are clipped to
/// the boundary before encoding. Output shape is `(rows, columns, n_bases)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeSplines {
    #[serde(default = "default_n_bases")]
    pub n_bases: usize,
    #[serde(default = "default_spline_order")]
    pub spline_order: usize,
    pub data_min: Vec<f64>,
    pub data_max: Vec<f64>,
}

impl EncodeSplines {
    fn validate(&self) -> Result<()> {
        if self.data_min.len() != self.data_max.len() {
            return Err(LoaderError::Transform(format!(
                "encode_splines: data_min has {} entries, data_max has {}",
                self.data_min.len(),
                self.data_max.len()
            )));
        }
        if self.spline_order == 0 {
            return Err(LoaderError::Transform(
                "encode_splines: spline_order must be at least 1".into(),
            ));
        }
        if self.n_bases < self.spline_order + 1 {
            return Err(LoaderError::Transform(format!(
                "encode_splines: n_bases ({}) must be at least spline_order + 1 ({})",
                self.n_bases,
                self.spline_order + 1
            )));
        }
        for (lo, hi) in self.data_min.iter().zip(&self.data_max) {
            if !(hi > lo) {
                return Err(LoaderError::Transform(format!(
                    "encode_splines: empty range [{lo}, {hi}]"
                )));
            }
        }
        Ok(())
    }

    /// Knot vector for one column: the range padded by 0.1% on both sides,
    /// `n_bases - spline_order + 1` interior knots and `spline_order + 1`
    /// extra knots beyond each end.
    pub fn knots(&self, start: f64, end: f64) -> Vec<f64> {
        let range = end - start;
        let start = start - range * 0.001;
        let end = end + range * 0.001;

        let m = self.spline_order - 1;
        let n_interior = self.n_bases - m;
        let step = (end - start) / (n_interior - 1) as f64;
        let first = start - step * (m + 1) as f64;
        let n_knots = n_interior + 2 * m + 2;
        (0..n_knots).map(|i| first + step * i as f64).collect()
    }
}

/// Cox–de Boor evaluation of every basis function of `degree` at `x`.
fn bspline_basis(x: f64, knots: &[f64], degree: usize) -> Vec<f64> {
    let n = knots.len() - 1;
    let mut b: Vec<f64> = (0..n)
        .map(|i| {
            if knots[i] <= x && x < knots[i + 1] {
                1.0
            } else {
                0.0
            }
        })
        .collect();

    for d in 1..=degree {
        for i in 0..(n - d) {
            let left_den = knots[i + d] - knots[i];
            let right_den = knots[i + d + 1] - knots[i + 1];
            let left = if left_den > 0.0 {
                (x - knots[i]) / left_den * b[i]
            } else {
                0.0
            };
            let right = if right_den > 0.0 {
                (knots[i + d + 1] - x) / right_den * b[i + 1]
            } else {
                0.0
            };
            b[i] = left + right;
        }
    }
    b.truncate(n - degree);
    b
}

impl FittedTransformer for EncodeSplines {
    fn transform(&self, x: ArrayView2<'_, f64>) -> Result<ArrayD<f64>> {
        check_columns("encode_splines", &x, self.data_min.len())?;
        let mut out = Array3::<f64>::zeros((x.nrows(), x.ncols(), self.n_bases));

        for (col, column) in x.axis_iter(Axis(1)).enumerate() {
            let (lo, hi) = (self.data_min[col], self.data_max[col]);
            let knots = self.knots(lo, hi);
            for (row, &value) in column.iter().enumerate() {
                if value < lo || value > hi {
                    debug!("Clipping {value} into [{lo}, {hi}] (column {col})");
                }
                let clipped = value.clamp(lo, hi);
                let basis = bspline_basis(clipped, &knots, self.spline_order);
                for (k, v) in basis.into_iter().enumerate() {
                    out[[row, col, k]] = v;
                }
            }
        }
        Ok(out.into_dyn())
    }
}

/// Build a fitted spline encoder from observed data, one range per column.
pub fn fit_splines(x: &Array2<f64>, n_bases: usize, spline_order: usize) -> Result<EncodeSplines> {
    let fold = |init: f64, pick: fn(f64, f64) -> f64| -> Vec<f64> {
        x.axis_iter(Axis(1))
            .map(|c| c.iter().copied().filter(|v| !v.is_nan()).fold(init, pick))
            .collect()
    };
    let spline = EncodeSplines {
        n_bases,
        spline_order,
        data_min: fold(f64::INFINITY, f64::min),
        data_max: fold(f64::NEG_INFINITY, f64::max),
    };
    spline.validate()?;
    Ok(spline)
}
