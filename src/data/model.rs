use std::collections::BTreeMap;
use std::fmt;

use ndarray::{Array2, ArrayD, ArrayView1};

// ---------------------------------------------------------------------------
// MetadataValue – a single metadata entry of an example
// ---------------------------------------------------------------------------

/// A dynamically-typed metadata value. `Map` nests, e.g. `ranges.chr`.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Map(BTreeMap<String, MetadataValue>),
    Null,
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v:.4}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            MetadataValue::Null => write!(f, "<null>"),
        }
    }
}

impl MetadataValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a key of a nested `Map` value.
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        match self {
            MetadataValue::Map(m) => m.get(key),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Integer(i)
    }
}

impl From<Option<String>> for MetadataValue {
    fn from(s: Option<String>) -> Self {
        s.map_or(MetadataValue::Null, MetadataValue::String)
    }
}

// ---------------------------------------------------------------------------
// Tensor – one named model input or target
// ---------------------------------------------------------------------------

/// An n-dimensional array whose element type is only known at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
    Text(ArrayD<String>),
}

impl Tensor {
    pub fn shape(&self) -> &[usize] {
        match self {
            Tensor::F32(a) => a.shape(),
            Tensor::F64(a) => a.shape(),
            Tensor::Text(a) => a.shape(),
        }
    }

    /// Numpy-style dtype name, used in validation errors.
    pub fn dtype(&self) -> &'static str {
        match self {
            Tensor::F32(_) => "float32",
            Tensor::F64(_) => "float64",
            Tensor::Text(_) => "str",
        }
    }

    pub fn as_f32(&self) -> Option<&ArrayD<f32>> {
        match self {
            Tensor::F32(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&ArrayD<f64>> {
        match self {
            Tensor::F64(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&ArrayD<String>> {
        match self {
            Tensor::Text(a) => Some(a),
            _ => None,
        }
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", self.dtype(), self.shape())
    }
}

// ---------------------------------------------------------------------------
// Example – what a dataset yields per index
// ---------------------------------------------------------------------------

/// Targets are either an array or, when the dataset has none, an empty map.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Targets {
    #[default]
    Empty,
    Tensor(Tensor),
}

impl Targets {
    pub fn is_empty(&self) -> bool {
        matches!(self, Targets::Empty)
    }

    pub fn tensor(&self) -> Option<&Tensor> {
        match self {
            Targets::Tensor(t) => Some(t),
            Targets::Empty => None,
        }
    }
}

/// One model example: `inputs`, `targets` and `metadata`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Example {
    pub inputs: BTreeMap<String, Tensor>,
    pub targets: Targets,
    pub metadata: BTreeMap<String, MetadataValue>,
}

// ---------------------------------------------------------------------------
// Interval – one row of a BED-like file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strand {
    Forward,
    Reverse,
    Unknown,
}

impl Strand {
    /// `+` and `-` are stranded, anything else is unknown.
    pub fn from_symbol(s: &str) -> Self {
        match s {
            "+" => Strand::Forward,
            "-" => Strand::Reverse,
            _ => Strand::Unknown,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Strand::Forward => "+",
            Strand::Reverse => "-",
            Strand::Unknown => ".",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Strand::Unknown)
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A half-open, 0-based genomic interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub name: Option<String>,
    pub strand: Strand,
}

impl Interval {
    pub fn new(chrom: impl Into<String>, start: u64, end: u64, strand: Strand) -> Self {
        Interval {
            chrom: chrom.into(),
            start,
            end,
            name: None,
            strand,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn width(&self) -> usize {
        self.end.saturating_sub(self.start) as usize
    }

    /// `floor((start + end) / 2)`
    pub fn midpoint(&self) -> i64 {
        ((self.start + self.end) / 2) as i64
    }
}

// ---------------------------------------------------------------------------
// FeatureTable – a fully loaded numeric table
// ---------------------------------------------------------------------------

/// A numeric table read fully into memory, one row per example.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    /// Column names in file order.
    pub column_names: Vec<String>,
    /// `rows x columns` values.
    pub values: Array2<f64>,
}

impl FeatureTable {
    pub fn new(column_names: Vec<String>, values: Array2<f64>) -> Self {
        FeatureTable {
            column_names,
            values,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    pub fn row(&self, idx: usize) -> Option<ArrayView1<'_, f64>> {
        (idx < self.len()).then(|| self.values.row(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_floors() {
        let iv = Interval::new("chr1", 10, 15, Strand::Forward);
        assert_eq!(iv.midpoint(), 12);
        assert_eq!(iv.width(), 5);
    }

    #[test]
    fn strand_symbols() {
        assert_eq!(Strand::from_symbol("+"), Strand::Forward);
        assert_eq!(Strand::from_symbol("-"), Strand::Reverse);
        assert_eq!(Strand::from_symbol("."), Strand::Unknown);
        assert_eq!(Strand::Reverse.to_string(), "-");
    }

    #[test]
    fn nested_metadata_lookup() {
        let mut ranges = BTreeMap::new();
        ranges.insert("chr".to_string(), MetadataValue::from("chr22"));
        let meta = MetadataValue::Map(ranges);
        assert_eq!(meta.get("chr").and_then(|v| v.as_str()), Some("chr22"));
        assert_eq!(meta.to_string(), "{chr: chr22}");
    }
}
