//! Data loaders that turn tabular feature files and genomic intervals into
//! model-ready examples.
//!
//! Every dataset exposes `len()` and `get_example(idx)` through
//! [`dataset::Dataset`]; an example is `inputs` + `targets` + `metadata`.

pub mod config;
pub mod data;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod transform;

pub use data::model::{Example, Interval, MetadataValue, Strand, Targets, Tensor};
pub use dataset::{Dataset, GenomicIntervalDataset, LineDataset, TabularFeatureDataset};
pub use error::{LoaderError, Result};
