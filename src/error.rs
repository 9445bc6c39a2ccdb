use std::path::PathBuf;

use thiserror::Error;

/// Everything a loader, extractor or transformer can fail with.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unsupported table extension: .{0}")]
    UnsupportedExtension(String),

    #[error("{what} has {actual} rows but {expected} were expected")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No '{landmark}' landmarks on chromosome {chrom} (strand {strand})")]
    MissingLandmark {
        landmark: String,
        chrom: String,
        strand: String,
    },

    #[error("Unknown landmark kind: {0}")]
    UnknownLandmark(String),

    #[error("out array has incorrect shape: {actual:?} (need {expected:?})")]
    OutputShape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("out array has incorrect dtype: {actual} (need {expected})")]
    OutputDtype {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Cannot extract from an empty batch of intervals")]
    EmptyBatch,

    #[error("Interval {index} has width {actual}, batch width is {expected}")]
    WidthMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Chromosome {0} not found in genome")]
    UnknownChromosome(String),

    #[error("Interval {chrom}:{start}-{end} exceeds chromosome length {len}")]
    SequenceOutOfBounds {
        chrom: String,
        start: u64,
        end: u64,
        len: u64,
    },

    #[error("FASTA error: {0}")]
    Fasta(String),

    #[error("GTF error: {0}")]
    Gtf(String),

    #[error("Transformer error: {0}")]
    Transform(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LoaderError>;

impl LoaderError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoaderError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        LoaderError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}
