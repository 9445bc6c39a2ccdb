//! Distance from an interval's midpoint to the closest genomic landmark.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use log::{debug, info};
use ndarray::ArrayD;

use super::annotation::GtfRecord;
use super::Extractor;
use crate::data::model::{Interval, Strand};
use crate::error::{LoaderError, Result};

// ---------------------------------------------------------------------------
// Landmark kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Landmark {
    Tss,
    Polya,
    ExonIntron,
    IntronExon,
    StartCodon,
    StopCodon,
    GeneStart,
    GeneEnd,
}

impl Landmark {
    pub const ALL: [Landmark; 8] = [
        Landmark::Tss,
        Landmark::Polya,
        Landmark::ExonIntron,
        Landmark::IntronExon,
        Landmark::StartCodon,
        Landmark::StopCodon,
        Landmark::GeneStart,
        Landmark::GeneEnd,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Landmark::Tss => "tss",
            Landmark::Polya => "polya",
            Landmark::ExonIntron => "exon_intron",
            Landmark::IntronExon => "intron_exon",
            Landmark::StartCodon => "start_codon",
            Landmark::StopCodon => "stop_codon",
            Landmark::GeneStart => "gene_start",
            Landmark::GeneEnd => "gene_end",
        }
    }
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Landmark {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        Landmark::ALL
            .into_iter()
            .find(|l| l.name() == lower)
            .ok_or_else(|| LoaderError::UnknownLandmark(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// LandmarkTable – positions keyed by (chromosome, strand)
// ---------------------------------------------------------------------------

/// 1-based landmark positions grouped by chromosome and strand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkTable {
    positions: HashMap<String, BTreeMap<Strand, Vec<u64>>>,
}

impl LandmarkTable {
    pub fn from_positions<I, S>(positions: I) -> Self
    where
        I: IntoIterator<Item = (S, Strand, u64)>,
        S: Into<String>,
    {
        let mut table = LandmarkTable::default();
        for (chrom, strand, pos) in positions {
            table
                .positions
                .entry(chrom.into())
                .or_default()
                .entry(strand)
                .or_default()
                .push(pos);
        }
        table
    }

    /// Total number of positions.
    pub fn len(&self) -> usize {
        self.positions
            .values()
            .flat_map(|by_strand| by_strand.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Candidates on `chrom`, restricted to `strand` when it is known.
    ///
    /// A missing chromosome, or a known strand without entries, is `None`.
    pub fn candidates(&self, chrom: &str, strand: Option<Strand>) -> Option<Cow<'_, [u64]>> {
        let by_strand = self.positions.get(chrom)?;
        match strand {
            Some(s) if s.is_known() => by_strand.get(&s).map(|v| Cow::Borrowed(v.as_slice())),
            _ => match by_strand.len() {
                1 => by_strand.values().next().map(|v| Cow::Borrowed(v.as_slice())),
                _ => Some(Cow::Owned(by_strand.values().flatten().copied().collect())),
            },
        }
    }
}

/// Build one table per requested landmark kind from GTF records.
pub fn extract_landmarks(
    records: &[GtfRecord],
    kinds: &[Landmark],
) -> BTreeMap<Landmark, LandmarkTable> {
    kinds
        .iter()
        .map(|&kind| {
            let table = LandmarkTable::from_positions(landmark_positions(records, kind));
            info!("Extracted {} '{}' landmarks", table.len(), kind);
            (kind, table)
        })
        .collect()
}

fn landmark_positions(records: &[GtfRecord], kind: Landmark) -> Vec<(String, Strand, u64)> {
    let of_feature = |feature: &'static str, pick: fn(&GtfRecord) -> u64| {
        records
            .iter()
            .filter(|r| r.feature == feature)
            .map(|r| (r.seqname.clone(), r.strand, pick(r)))
            .collect::<Vec<_>>()
    };

    match kind {
        Landmark::Tss => of_feature("transcript", GtfRecord::five_prime),
        Landmark::Polya => of_feature("transcript", GtfRecord::three_prime),
        Landmark::GeneStart => of_feature("gene", GtfRecord::five_prime),
        Landmark::GeneEnd => of_feature("gene", GtfRecord::three_prime),
        Landmark::StartCodon => of_feature("start_codon", GtfRecord::five_prime),
        Landmark::StopCodon => of_feature("stop_codon", GtfRecord::five_prime),
        Landmark::ExonIntron => exon_junctions(records, true),
        Landmark::IntronExon => exon_junctions(records, false),
    }
}

/// Exon boundaries facing an intron. `donor` picks the 3' end of every exon
/// but the last of its transcript, otherwise the 5' end of every exon but
/// the first.
fn exon_junctions(records: &[GtfRecord], donor: bool) -> Vec<(String, Strand, u64)> {
    let mut by_transcript: BTreeMap<&str, Vec<&GtfRecord>> = BTreeMap::new();
    for r in records.iter().filter(|r| r.feature == "exon") {
        match r.attribute("transcript_id") {
            Some(id) => by_transcript.entry(id).or_default().push(r),
            None => debug!("Skipping exon without transcript_id at {}:{}", r.seqname, r.start),
        }
    }

    let mut out = Vec::new();
    for exons in by_transcript.values_mut() {
        // transcription order
        exons.sort_by_key(|e| e.start);
        if exons.first().is_some_and(|e| e.strand == Strand::Reverse) {
            exons.reverse();
        }
        let n = exons.len();
        for (i, exon) in exons.iter().enumerate() {
            let pos = match (donor, i) {
                (true, i) if i + 1 < n => exon.three_prime(),
                (false, i) if i > 0 => exon.five_prime(),
                _ => continue,
            };
            out.push((exon.seqname.clone(), exon.strand, pos));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// LandmarkDistanceExtractor
// ---------------------------------------------------------------------------

/// Signed distance from each interval's midpoint to the closest landmark,
/// one column per landmark kind.
///
/// With `use_strand`, candidates are restricted to the interval's strand and
/// distances on the minus strand are negated, so downstream is positive.
#[derive(Debug, Clone)]
pub struct LandmarkDistanceExtractor {
    columns: Vec<String>,
    tables: Vec<LandmarkTable>,
    use_strand: bool,
}

impl LandmarkDistanceExtractor {
    pub fn new(tables: Vec<(String, LandmarkTable)>, use_strand: bool) -> Self {
        let (columns, tables) = tables.into_iter().unzip();
        LandmarkDistanceExtractor {
            columns,
            tables,
            use_strand,
        }
    }

    pub fn from_gtf(records: &[GtfRecord], kinds: &[Landmark], use_strand: bool) -> Self {
        let mut tables = extract_landmarks(records, kinds);
        let tables = kinds
            .iter()
            .map(|k| (k.name().to_string(), tables.remove(k).unwrap_or_default()))
            .collect();
        Self::new(tables, use_strand)
    }

    /// Landmark names, in output column order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Distance to the closest landmark of column `col` for one interval.
    pub fn find_closest(&self, col: usize, interval: &Interval) -> Result<i64> {
        if col >= self.columns.len() {
            return Err(LoaderError::IndexOutOfRange {
                index: col,
                len: self.columns.len(),
            });
        }
        let strand = self.use_strand.then_some(interval.strand);
        let missing = || LoaderError::MissingLandmark {
            landmark: self.columns[col].clone(),
            chrom: interval.chrom.clone(),
            strand: interval.strand.to_string(),
        };

        let positions = self.tables[col]
            .candidates(&interval.chrom, strand)
            .ok_or_else(missing)?;

        let midpoint = interval.midpoint();
        let flip = self.use_strand && interval.strand == Strand::Reverse;
        positions
            .iter()
            // positions are 1-based
            .map(|&p| {
                let dist = (p as i64 - 1) - midpoint;
                if flip {
                    -dist
                } else {
                    dist
                }
            })
            .min_by_key(|d| d.abs())
            .ok_or_else(missing)
    }
}

impl Extractor for LandmarkDistanceExtractor {
    fn output_shape(&self, num_intervals: usize, _width: usize) -> Vec<usize> {
        vec![num_intervals, self.columns.len()]
    }

    fn extract_into(&self, intervals: &[Interval], out: &mut ArrayD<f32>) -> Result<()> {
        for (row, interval) in intervals.iter().enumerate() {
            for col in 0..self.columns.len() {
                out[[row, col]] = self.find_closest(col, interval)? as f32;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Tensor;
    use crate::extract::annotation::tests::SAMPLE_GTF;
    use crate::extract::annotation::{is_protein_coding, read_gtf};
    use ndarray::IxDyn;

    fn single(positions: &[(Strand, u64)], use_strand: bool) -> LandmarkDistanceExtractor {
        let table =
            LandmarkTable::from_positions(positions.iter().map(|&(s, p)| ("chr1", s, p)));
        LandmarkDistanceExtractor::new(vec![("polya".to_string(), table)], use_strand)
    }

    // midpoint (90 + 111) / 2 = 100
    fn interval(strand: Strand) -> Interval {
        Interval::new("chr1", 90, 111, strand)
    }

    #[test]
    fn plus_strand_distance() {
        let ex = single(&[(Strand::Forward, 131)], true);
        assert_eq!(ex.find_closest(0, &interval(Strand::Forward)).unwrap(), 30);
    }

    #[test]
    fn minus_strand_distance_is_negated() {
        let ex = single(&[(Strand::Reverse, 131)], true);
        assert_eq!(ex.find_closest(0, &interval(Strand::Reverse)).unwrap(), -30);
    }

    #[test]
    fn picks_smallest_absolute_distance() {
        let positions = [(Strand::Forward, 90), (Strand::Forward, 150), (Strand::Forward, 500)];
        let ex = single(&positions, true);
        assert_eq!(ex.find_closest(0, &interval(Strand::Forward)).unwrap(), -11);

        let shifted = [(Strand::Forward, 91), (Strand::Forward, 151), (Strand::Forward, 501)];
        let ex = single(&shifted, true);
        assert_eq!(ex.find_closest(0, &interval(Strand::Forward)).unwrap(), -10);
    }

    #[test]
    fn strand_filter() {
        let positions = [(Strand::Forward, 500), (Strand::Reverse, 105)];
        let stranded = single(&positions, true);
        assert_eq!(stranded.find_closest(0, &interval(Strand::Forward)).unwrap(), 399);
        // unknown strand sees both
        assert_eq!(stranded.find_closest(0, &interval(Strand::Unknown)).unwrap(), 4);

        let unstranded = single(&positions, false);
        assert_eq!(unstranded.find_closest(0, &interval(Strand::Reverse)).unwrap(), 4);
    }

    #[test]
    fn stranded_candidates_are_borrowed() {
        let table = LandmarkTable::from_positions([
            ("chr1", Strand::Forward, 10),
            ("chr1", Strand::Reverse, 20),
        ]);
        assert!(matches!(
            table.candidates("chr1", Some(Strand::Forward)),
            Some(Cow::Borrowed(&[10]))
        ));
        let mut all = table.candidates("chr1", None).unwrap().into_owned();
        all.sort_unstable();
        assert_eq!(all, vec![10, 20]);
    }

    #[test]
    fn unknown_column_is_an_error() {
        let ex = single(&[(Strand::Forward, 131)], true);
        assert!(matches!(
            ex.find_closest(1, &interval(Strand::Forward)),
            Err(LoaderError::IndexOutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn missing_chromosome_is_an_error() {
        let ex = single(&[(Strand::Forward, 10)], true);
        let iv = Interval::new("chr2", 0, 10, Strand::Forward);
        assert!(matches!(
            ex.find_closest(0, &iv),
            Err(LoaderError::MissingLandmark { chrom, .. }) if chrom == "chr2"
        ));
        // known strand without entries
        assert!(ex.find_closest(0, &interval(Strand::Reverse)).is_err());
    }

    #[test]
    fn batch_output_shape() {
        let ex = single(&[(Strand::Forward, 131), (Strand::Reverse, 131)], true);
        let intervals = vec![interval(Strand::Forward), interval(Strand::Reverse)];
        let out = ex.extract(&intervals, None).unwrap();
        assert_eq!(out.shape(), &[2, 1]);
        assert_eq!(out[[0, 0]], 30.0);
        assert_eq!(out[[1, 0]], -30.0);

        let wrong = Tensor::F32(ArrayD::zeros(IxDyn(&[2, 2])));
        assert!(ex.extract(&intervals, Some(wrong)).is_err());
    }

    #[test]
    fn landmark_names_parse() {
        assert_eq!("polyA".parse::<Landmark>().unwrap(), Landmark::Polya);
        assert!("enhancer".parse::<Landmark>().is_err());
    }

    #[test]
    fn landmarks_from_gtf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ann.gtf");
        std::fs::write(&path, SAMPLE_GTF).unwrap();
        let records = read_gtf(&path, is_protein_coding).unwrap();

        let tables = extract_landmarks(&records, &Landmark::ALL);
        let polya = &tables[&Landmark::Polya];
        assert_eq!(polya.candidates("chr22", Some(Strand::Forward)).as_deref(), Some(&[900][..]));
        assert_eq!(polya.candidates("chr22", Some(Strand::Reverse)).as_deref(), Some(&[1500][..]));

        let tss = &tables[&Landmark::Tss];
        assert_eq!(tss.candidates("chr22", Some(Strand::Reverse)).as_deref(), Some(&[2500][..]));

        let donors = &tables[&Landmark::ExonIntron];
        assert_eq!(donors.candidates("chr22", Some(Strand::Forward)).as_deref(), Some(&[200][..]));
        assert_eq!(donors.candidates("chr22", Some(Strand::Reverse)).as_deref(), Some(&[2000][..]));

        let acceptors = &tables[&Landmark::IntronExon];
        assert_eq!(acceptors.candidates("chr22", Some(Strand::Forward)).as_deref(), Some(&[400][..]));
        assert_eq!(acceptors.candidates("chr22", Some(Strand::Reverse)).as_deref(), Some(&[1700][..]));

        assert!(tables[&Landmark::StartCodon].is_empty());
    }
}
