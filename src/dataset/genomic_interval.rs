use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use ndarray::{arr1, ArrayD, Axis, Ix1};
use once_cell::sync::OnceCell;

use super::{check_index, check_length, Dataset, LineDataset};
use crate::data::intervals::read_intervals;
use crate::data::model::{Example, Interval, MetadataValue, Targets, Tensor};
use crate::error::{LoaderError, Result};
use crate::extract::annotation::{is_protein_coding, read_gtf, GtfRecord};
use crate::extract::landmarks::{Landmark, LandmarkDistanceExtractor};
use crate::extract::sequence::FastaStringExtractor;
use crate::extract::Extractor;
use crate::transform::{load_transformer, FittedTransformer};

/// Input name of the one-hot sequence.
pub const SEQ_INPUT: &str = "seq";
/// Input name of the transformed polyA distance.
pub const DIST_INPUT: &str = "dist_polya_st";

/// Extractors built on first access.
#[derive(Debug)]
struct Extractors {
    seq: FastaStringExtractor,
    dist: LandmarkDistanceExtractor,
}

/// One-hot sequence plus spline-encoded distance to the closest polyA
/// site, per interval of a BED-like file.
#[derive(Debug)]
pub struct GenomicIntervalDataset {
    intervals: Vec<Interval>,
    fasta_file: PathBuf,
    gtf: Vec<GtfRecord>,
    transformer: Box<dyn FittedTransformer>,
    targets: Option<LineDataset>,
    extractors: OnceCell<Extractors>,
}

impl GenomicIntervalDataset {
    /// `gtf_file` is filtered to protein-coding records up front; the FASTA
    /// is only opened on first access.
    pub fn open(
        intervals_file: &Path,
        fasta_file: &Path,
        gtf_file: &Path,
        preproc_transformer: &Path,
        target_file: Option<&Path>,
    ) -> Result<Self> {
        let gtf = read_gtf(gtf_file, is_protein_coding)?;
        let transformer = load_transformer(preproc_transformer)?;
        let intervals = read_intervals(intervals_file)?;
        let targets = target_file.map(LineDataset::open).transpose()?;
        Self::new(intervals, fasta_file, gtf, transformer, targets)
    }

    pub fn new(
        intervals: Vec<Interval>,
        fasta_file: &Path,
        gtf: Vec<GtfRecord>,
        transformer: Box<dyn FittedTransformer>,
        targets: Option<LineDataset>,
    ) -> Result<Self> {
        if let Some(t) = &targets {
            check_length("targets", intervals.len(), t.len())?;
        }
        Ok(GenomicIntervalDataset {
            intervals,
            fasta_file: fasta_file.to_path_buf(),
            gtf,
            transformer,
            targets,
            extractors: OnceCell::new(),
        })
    }

    fn extractors(&self) -> Result<&Extractors> {
        self.extractors.get_or_try_init(|| {
            info!("Initialising sequence and landmark extractors");
            let seq = FastaStringExtractor::open(&self.fasta_file, false)?;
            let dist = LandmarkDistanceExtractor::from_gtf(&self.gtf, &[Landmark::Polya], true);
            Ok(Extractors { seq, dist })
        })
    }

    pub fn interval(&self, idx: usize) -> Option<&Interval> {
        self.intervals.get(idx)
    }
}

fn ranges_metadata(interval: &Interval) -> MetadataValue {
    let mut ranges = BTreeMap::new();
    ranges.insert("chr".to_string(), MetadataValue::from(interval.chrom.as_str()));
    ranges.insert("start".to_string(), MetadataValue::Integer(interval.start as i64));
    ranges.insert("end".to_string(), MetadataValue::Integer(interval.end as i64));
    ranges.insert("id".to_string(), MetadataValue::from(interval.name.clone()));
    ranges.insert("strand".to_string(), MetadataValue::from(interval.strand.symbol()));
    MetadataValue::Map(ranges)
}

impl Dataset for GenomicIntervalDataset {
    type Item = Example;

    fn len(&self) -> usize {
        self.intervals.len()
    }

    fn get_example(&self, idx: usize) -> Result<Example> {
        check_index(idx, self.len())?;
        let extractors = self.extractors()?;
        let interval = &self.intervals[idx];
        let batch = std::slice::from_ref(interval);
        debug!(
            "Building example {idx} for {}:{}-{}",
            interval.chrom, interval.start, interval.end
        );

        let seq = extractors.seq.extract(batch, None)?.index_axis_move(Axis(0), 0);

        let dist = extractors.dist.extract(batch, None)?.index_axis_move(Axis(0), 0);
        let dist = dist
            .mapv(f64::from)
            .into_dimensionality::<Ix1>()
            .map_err(|e| LoaderError::Transform(format!("distance vector: {e}")))?;
        let dist: ArrayD<f32> = self
            .transformer
            .transform_distance_vector(dist.view())?
            .mapv(|v| v as f32);

        let mut inputs = BTreeMap::new();
        inputs.insert(SEQ_INPUT.to_string(), Tensor::F32(seq));
        inputs.insert(DIST_INPUT.to_string(), Tensor::F32(dist));

        let targets = match &self.targets {
            Some(t) => {
                let line = t.get_example(idx)?;
                Targets::Tensor(Tensor::Text(arr1(&[line]).into_dyn()))
            }
            None => Targets::Empty,
        };

        let mut metadata = BTreeMap::new();
        metadata.insert("ranges".to_string(), ranges_metadata(interval));

        Ok(Example {
            inputs,
            targets,
            metadata,
        })
    }
}
