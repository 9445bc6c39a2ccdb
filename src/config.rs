//! Dataloader configuration: which dataset to build and with which files.
//!
//! ```json
//! {
//!   "type": "genomic_interval",
//!   "args": {
//!     "intervals_file": "intervals.tsv",
//!     "fasta_file": "genome.fa",
//!     "gtf_file": "annotation.gtf",
//!     "preproc_transformer": "encode_splines.json",
//!     "target_file": "targets.tsv"
//!   }
//! }
//! ```
//!
//! Relative paths are resolved against the directory of the config file.

use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::data::model::Example;
use crate::dataset::{Dataset, GenomicIntervalDataset, LineDataset, TabularFeatureDataset};
use crate::error::{LoaderError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "args", rename_all = "snake_case")]
pub enum DataloaderConfig {
    Tabular {
        features_file: PathBuf,
        #[serde(default)]
        targets_file: Option<PathBuf>,
        x_transformer: PathBuf,
        #[serde(default)]
        y_transformer: Option<PathBuf>,
    },
    Lines {
        path: PathBuf,
    },
    #[serde(alias = "seq_dist")]
    GenomicInterval {
        intervals_file: PathBuf,
        fasta_file: PathBuf,
        gtf_file: PathBuf,
        preproc_transformer: PathBuf,
        #[serde(default)]
        target_file: Option<PathBuf>,
    },
}

fn resolve(base: &Path, path: &mut PathBuf) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

impl DataloaderConfig {
    /// Read a JSON config and resolve its paths.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| LoaderError::io(path, e))?;
        let mut config: DataloaderConfig = serde_json::from_str(&text)
            .map_err(|e| LoaderError::Config(format!("{path:?}: {e}")))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        Ok(config)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        match self {
            DataloaderConfig::Tabular {
                features_file,
                targets_file,
                x_transformer,
                y_transformer,
            } => {
                resolve(base, features_file);
                resolve(base, x_transformer);
                targets_file.iter_mut().for_each(|p| resolve(base, p));
                y_transformer.iter_mut().for_each(|p| resolve(base, p));
            }
            DataloaderConfig::Lines { path } => resolve(base, path),
            DataloaderConfig::GenomicInterval {
                intervals_file,
                fasta_file,
                gtf_file,
                preproc_transformer,
                target_file,
            } => {
                resolve(base, intervals_file);
                resolve(base, fasta_file);
                resolve(base, gtf_file);
                resolve(base, preproc_transformer);
                target_file.iter_mut().for_each(|p| resolve(base, p));
            }
        }
    }

    pub fn build(&self) -> Result<LoadedDataset> {
        let dataset = match self {
            DataloaderConfig::Tabular {
                features_file,
                targets_file,
                x_transformer,
                y_transformer,
            } => LoadedDataset::Tabular(TabularFeatureDataset::open(
                features_file,
                targets_file.as_deref(),
                x_transformer,
                y_transformer.as_deref(),
            )?),
            DataloaderConfig::Lines { path } => LoadedDataset::Lines(LineDataset::open(path)?),
            DataloaderConfig::GenomicInterval {
                intervals_file,
                fasta_file,
                gtf_file,
                preproc_transformer,
                target_file,
            } => LoadedDataset::GenomicInterval(GenomicIntervalDataset::open(
                intervals_file,
                fasta_file,
                gtf_file,
                preproc_transformer,
                target_file.as_deref(),
            )?),
        };
        info!("Built {} dataset with {} examples", dataset.kind(), dataset.len());
        Ok(dataset)
    }
}

/// Any dataset a config can describe.
#[derive(Debug)]
pub enum LoadedDataset {
    Tabular(TabularFeatureDataset),
    Lines(LineDataset),
    GenomicInterval(GenomicIntervalDataset),
}

impl LoadedDataset {
    pub fn kind(&self) -> &'static str {
        match self {
            LoadedDataset::Tabular(_) => "tabular",
            LoadedDataset::Lines(_) => "lines",
            LoadedDataset::GenomicInterval(_) => "genomic_interval",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            LoadedDataset::Tabular(d) => d.len(),
            LoadedDataset::Lines(d) => d.len(),
            LoadedDataset::GenomicInterval(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One-line description of the example at `idx`.
    pub fn describe(&self, idx: usize) -> Result<String> {
        match self {
            LoadedDataset::Tabular(d) => d.get_example(idx).map(|ex| describe_example(&ex)),
            LoadedDataset::Lines(d) => d.get_example(idx).map(|line| format!("{:?}", line)),
            LoadedDataset::GenomicInterval(d) => {
                d.get_example(idx).map(|ex| describe_example(&ex))
            }
        }
    }
}

/// `inputs: {name: dtype[shape]} targets: ... metadata: {...}`
pub fn describe_example(ex: &Example) -> String {
    let inputs: Vec<String> = ex
        .inputs
        .iter()
        .map(|(name, t)| format!("{name}: {t}"))
        .collect();
    let targets = match ex.targets.tensor() {
        Some(t) => t.to_string(),
        None => "{}".to_string(),
    };
    let metadata: Vec<String> = ex
        .metadata
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect();
    format!(
        "inputs: {{{}}} targets: {} metadata: {{{}}}",
        inputs.join(", "),
        targets,
        metadata.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_resolves_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataloader.json");
        std::fs::write(
            &path,
            r#"{"type": "seq_dist", "args": {
                "intervals_file": "intervals.tsv",
                "fasta_file": "/data/genome.fa",
                "gtf_file": "ann.gtf",
                "preproc_transformer": "splines.json"
            }}"#,
        )
        .unwrap();

        let config = DataloaderConfig::load(&path).unwrap();
        match config {
            DataloaderConfig::GenomicInterval {
                intervals_file,
                fasta_file,
                target_file,
                ..
            } => {
                assert_eq!(intervals_file, dir.path().join("intervals.tsv"));
                assert_eq!(fasta_file, PathBuf::from("/data/genome.fa"));
                assert_eq!(target_file, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"type": "images", "args": {}}"#).unwrap();
        assert!(matches!(
            DataloaderConfig::load(&path),
            Err(LoaderError::Config(_))
        ));
    }

    #[test]
    fn lines_dataset_from_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("t.txt"), "a\nb\n").unwrap();
        let path = dir.path().join("lines.json");
        std::fs::write(&path, r#"{"type": "lines", "args": {"path": "t.txt"}}"#).unwrap();

        let ds = DataloaderConfig::load(&path).unwrap().build().unwrap();
        assert_eq!(ds.kind(), "lines");
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.describe(1).unwrap(), "\"b\\n\"");
    }
}
