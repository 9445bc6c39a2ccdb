//! GTF annotation records, read with `bio`'s GFF reader in GTF2 mode.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use bio::io::gff::{self, GffType};
use bio_types::strand::Strand as BioStrand;
use flate2::read::MultiGzDecoder;
use log::info;

use crate::data::model::Strand;
use crate::error::{LoaderError, Result};

/// One GTF line, with 1-based inclusive coordinates as in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct GtfRecord {
    pub seqname: String,
    pub feature: String,
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
    /// First value of every attribute key.
    pub attributes: BTreeMap<String, String>,
}

impl GtfRecord {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// 5' end: `start` on the plus (or unknown) strand, `end` on minus.
    pub fn five_prime(&self) -> u64 {
        match self.strand {
            Strand::Reverse => self.end,
            _ => self.start,
        }
    }

    /// 3' end: `end` on the plus (or unknown) strand, `start` on minus.
    pub fn three_prime(&self) -> u64 {
        match self.strand {
            Strand::Reverse => self.start,
            _ => self.end,
        }
    }
}

/// Keeps records annotated `gene_type "protein_coding"`.
pub fn is_protein_coding(record: &GtfRecord) -> bool {
    record.attribute("gene_type") == Some("protein_coding")
}

/// Read a GTF file (gzip if the name ends in `.gz`), keeping records that
/// pass `keep`.
pub fn read_gtf<F>(path: &Path, keep: F) -> Result<Vec<GtfRecord>>
where
    F: Fn(&GtfRecord) -> bool,
{
    let file = File::open(path).map_err(|e| LoaderError::io(path, e))?;
    let input: Box<dyn Read> = if path.extension().is_some_and(|e| e == "gz") {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut reader = gff::Reader::new(input, GffType::GTF2);
    let mut records = Vec::new();
    let mut total = 0usize;

    for result in reader.records() {
        let rec = result.map_err(|e| LoaderError::Gtf(format!("{path:?}: {e}")))?;
        total += 1;

        let strand = match rec.strand() {
            Some(BioStrand::Forward) => Strand::Forward,
            Some(BioStrand::Reverse) => Strand::Reverse,
            _ => Strand::Unknown,
        };
        let attributes = rec
            .attributes()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let record = GtfRecord {
            seqname: rec.seqname().to_string(),
            feature: rec.feature_type().to_string(),
            start: rec.start().to_owned(),
            end: rec.end().to_owned(),
            strand,
            attributes,
        };
        if keep(&record) {
            records.push(record);
        }
    }

    info!("Kept {} of {} GTF records from {:?}", records.len(), total, path);
    Ok(records)
}
