//! Genome sequence extraction and one-hot encoding.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bio::io::fasta;
use log::{info, warn};
use ndarray::{Array2, ArrayD, Axis};

use super::Extractor;
use crate::data::model::{Interval, Strand};
use crate::error::{LoaderError, Result};

/// Width of the one-hot alphabet (`A C G T`).
pub const NUM_SEQ_CHARS: usize = 4;

/// Value used in every column for `N`.
pub const NEUTRAL_VALUE: f32 = 0.25;

enum Genome {
    /// Random access through a `.fai` index.
    Indexed {
        reader: Mutex<fasta::IndexedReader<File>>,
        lengths: HashMap<String, u64>,
    },
    /// Every record held in memory.
    InMemory(HashMap<String, Vec<u8>>),
}

/// Reads interval sequences from a FASTA file.
pub struct FastaStringExtractor {
    path: PathBuf,
    genome: Genome,
    use_strand: bool,
}

impl std::fmt::Debug for FastaStringExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastaStringExtractor")
            .field("path", &self.path)
            .field("use_strand", &self.use_strand)
            .finish()
    }
}

fn fai_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".fai");
    PathBuf::from(name)
}

impl FastaStringExtractor {
    /// Open `path`, using `<path>.fai` for random access when present.
    pub fn open(path: &Path, use_strand: bool) -> Result<Self> {
        let fai = fai_path(path);
        let genome = if fai.exists() {
            let reader = fasta::IndexedReader::from_file(&path)
                .map_err(|e| LoaderError::Fasta(format!("{path:?}: {e}")))?;
            let lengths: HashMap<String, u64> = reader
                .index
                .sequences()
                .into_iter()
                .map(|s| (s.name, s.len))
                .collect();
            info!("Opened indexed FASTA {:?} ({} sequences)", path, lengths.len());
            Genome::Indexed {
                reader: Mutex::new(reader),
                lengths,
            }
        } else {
            warn!("No index at {:?}; loading {:?} into memory", fai, path);
            let file = File::open(path).map_err(|e| LoaderError::io(path, e))?;
            let mut seqs = HashMap::new();
            for result in fasta::Reader::new(file).records() {
                let record = result.map_err(|e| LoaderError::Fasta(format!("{path:?}: {e}")))?;
                seqs.insert(record.id().to_string(), record.seq().to_vec());
            }
            info!("Loaded {} sequences from {:?}", seqs.len(), path);
            Genome::InMemory(seqs)
        };

        Ok(FastaStringExtractor {
            path: path.to_path_buf(),
            genome,
            use_strand,
        })
    }

    /// Sequence of `[start, end)`; reverse complemented for minus-strand
    /// intervals when strand-aware.
    pub fn extract_seq(&self, interval: &Interval) -> Result<Vec<u8>> {
        let out_of_bounds = |len: u64| LoaderError::SequenceOutOfBounds {
            chrom: interval.chrom.clone(),
            start: interval.start,
            end: interval.end,
            len,
        };

        if interval.start > interval.end {
            return Err(LoaderError::Fasta(format!(
                "{}:{}-{}: start is past end",
                interval.chrom, interval.start, interval.end
            )));
        }

        let mut seq = match &self.genome {
            Genome::Indexed { reader, lengths } => {
                let len = *lengths
                    .get(&interval.chrom)
                    .ok_or_else(|| LoaderError::UnknownChromosome(interval.chrom.clone()))?;
                if interval.end > len {
                    return Err(out_of_bounds(len));
                }
                let mut reader = reader
                    .lock()
                    .map_err(|_| LoaderError::Fasta("FASTA reader lock poisoned".into()))?;
                let mut seq = Vec::with_capacity(interval.width());
                reader
                    .fetch(&interval.chrom, interval.start, interval.end)
                    .and_then(|_| reader.read(&mut seq))
                    .map_err(|e| LoaderError::Fasta(format!("{:?}: {e}", self.path)))?;
                seq
            }
            Genome::InMemory(seqs) => {
                let full = seqs
                    .get(&interval.chrom)
                    .ok_or_else(|| LoaderError::UnknownChromosome(interval.chrom.clone()))?;
                let len = full.len() as u64;
                if interval.end > len {
                    return Err(out_of_bounds(len));
                }
                full[interval.start as usize..interval.end as usize].to_vec()
            }
        };

        if self.use_strand && interval.strand == Strand::Reverse {
            seq = reverse_complement(&seq);
        }
        Ok(seq)
    }
}

/// Reverse complement, keeping case; unknown symbols map to `N`.
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&b| match b {
            b'A' => b'T',
            b'C' => b'G',
            b'G' => b'C',
            b'T' => b'A',
            b'a' => b't',
            b'c' => b'g',
            b'g' => b'c',
            b't' => b'a',
            b'n' => b'n',
            _ => b'N',
        })
        .collect()
}

/// One-hot encode over `A C G T` (case-insensitive). `N` is
/// [`NEUTRAL_VALUE`] in every column, other symbols are all zeros.
pub fn one_hot_dna(seq: &[u8]) -> Array2<f32> {
    let mut out = Array2::<f32>::zeros((seq.len(), NUM_SEQ_CHARS));
    for (mut row, &base) in out.axis_iter_mut(Axis(0)).zip(seq) {
        match base.to_ascii_uppercase() {
            b'A' => row[0] = 1.0,
            b'C' => row[1] = 1.0,
            b'G' => row[2] = 1.0,
            b'T' => row[3] = 1.0,
            b'N' => row.fill(NEUTRAL_VALUE),
            _ => {}
        }
    }
    out
}

impl Extractor for FastaStringExtractor {
    fn output_shape(&self, num_intervals: usize, width: usize) -> Vec<usize> {
        vec![num_intervals, width, NUM_SEQ_CHARS]
    }

    fn extract_into(&self, intervals: &[Interval], out: &mut ArrayD<f32>) -> Result<()> {
        let width = out.shape()[1];
        for (index, (interval, mut slot)) in
            intervals.iter().zip(out.axis_iter_mut(Axis(0))).enumerate()
        {
            if interval.width() != width {
                return Err(LoaderError::WidthMismatch {
                    index,
                    expected: width,
                    actual: interval.width(),
                });
            }
            let encoded = one_hot_dna(&self.extract_seq(interval)?);
            slot.assign(&encoded.into_dyn());
        }
        Ok(())
    }
}
