//! BED-like interval files: `chrom start end [name score strand ...]`.

use std::path::Path;

use log::info;

use super::model::{Interval, Strand};
use crate::error::{LoaderError, Result};

/// Read every interval of a tab-separated BED-like file.
///
/// `#` comments and `track`/`browser` header lines are skipped. Only the
/// first three columns are required; a `.` name counts as no name.
pub fn read_intervals(path: &Path) -> Result<Vec<Interval>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_path(path)
        .map_err(|e| LoaderError::parse(path, e.to_string()))?;

    let mut intervals = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| LoaderError::parse(path, e.to_string()))?;
        // 1-based, counting skipped comment lines
        let line_no = record.position().map_or(idx as u64 + 1, |p| p.line());
        let first = record.get(0).unwrap_or("");
        if first.is_empty() || first.starts_with("track") || first.starts_with("browser") {
            continue;
        }
        if record.len() < 3 {
            return Err(LoaderError::parse(
                path,
                format!("line {line_no}: expected at least 3 columns, found {}", record.len()),
            ));
        }

        let coord = |i: usize, what: &str| -> Result<u64> {
            let field = record.get(i).unwrap_or("").trim();
            field.parse::<u64>().map_err(|_| {
                LoaderError::parse(path, format!("line {line_no}: bad {what} '{field}'"))
            })
        };
        let start = coord(1, "start")?;
        let end = coord(2, "end")?;
        if end < start {
            return Err(LoaderError::parse(
                path,
                format!("line {line_no}: end {end} < start {start}"),
            ));
        }

        let name = record
            .get(3)
            .filter(|n| !n.is_empty() && *n != ".")
            .map(str::to_string);
        let strand = record.get(5).map_or(Strand::Unknown, Strand::from_symbol);

        intervals.push(Interval {
            chrom: first.to_string(),
            start,
            end,
            name,
            strand,
        });
    }

    info!("Read {} intervals from {:?}", intervals.len(), path);
    Ok(intervals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bed6_and_bed3() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intervals.tsv");
        std::fs::write(
            &path,
            "track name=test\nchr22\t100\t110\tid1\t0\t-\n# comment\nchr22\t5\t9\n",
        )
        .unwrap();

        let intervals = read_intervals(&path).unwrap();
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].name.as_deref(), Some("id1"));
        assert_eq!(intervals[0].strand, Strand::Reverse);
        assert_eq!(intervals[1].strand, Strand::Unknown);
        assert_eq!(intervals[1].name, None);
        assert_eq!((intervals[1].start, intervals[1].end), (5, 9));
    }

    #[test]
    fn rejects_bad_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bed");
        std::fs::write(&path, "chr1\tten\t20\n").unwrap();
        let err = read_intervals(&path).unwrap_err();
        assert!(err.to_string().contains("line 1: bad start"));
    }

    #[test]
    fn errors_report_one_based_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bed");
        std::fs::write(&path, "chr1\t5\t9\nchr1\t20\t10\n").unwrap();
        let err = read_intervals(&path).unwrap_err();
        assert!(err.to_string().contains("line 2: end 10 < start 20"));
    }
}
