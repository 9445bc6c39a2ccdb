use std::path::{Path, PathBuf};

use approx::assert_abs_diff_eq;
use tempfile::TempDir;

use seqdist_loader::config::{describe_example, DataloaderConfig};
use seqdist_loader::{
    Dataset, GenomicIntervalDataset, LoaderError, MetadataValue, TabularFeatureDataset,
};

const GTF: &str = "\
chr22\tTEST\tgene\t100\t900\t.\t+\t.\tgene_id \"g1\"; gene_type \"protein_coding\";
chr22\tTEST\ttranscript\t100\t900\t.\t+\t.\tgene_id \"g1\"; transcript_id \"t1\"; gene_type \"protein_coding\";
chr22\tTEST\ttranscript\t1500\t1900\t.\t-\t.\tgene_id \"g2\"; transcript_id \"t2\"; gene_type \"protein_coding\";
chr22\tTEST\ttranscript\t950\t990\t.\t+\t.\tgene_id \"g3\"; transcript_id \"t3\"; gene_type \"lincRNA\";
";

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let seq = "ACGT".repeat(500);
        write(&dir, "genome.fa", &format!(">chr22\n{seq}\n"));
        write(&dir, "annotation.gtf", GTF);
        write(
            &dir,
            "intervals.tsv",
            "chr22\t100\t201\tsite_a\t0\t+\nchr22\t1000\t1101\tsite_b\t0\t-\n",
        );
        write(&dir, "targets.tsv", "0.25\n0.75\n");
        write(&dir, "identity.json", r#"{"kind": "identity"}"#);
        write(
            &dir,
            "splines.json",
            r#"{"kind": "encode_splines", "n_bases": 10, "spline_order": 3,
                "data_min": [-1000.0], "data_max": [1000.0]}"#,
        );
        Fixture { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn open(&self, transformer: &str, targets: Option<&str>) -> seqdist_loader::Result<GenomicIntervalDataset> {
        let targets = targets.map(|t| self.path(t));
        GenomicIntervalDataset::open(
            &self.path("intervals.tsv"),
            &self.path("genome.fa"),
            &self.path("annotation.gtf"),
            &self.path(transformer),
            targets.as_deref(),
        )
    }
}

#[test]
fn raw_polya_distances_are_strand_aware() {
    let fx = Fixture::new();
    let ds = fx.open("identity.json", None).unwrap();
    assert_eq!(ds.len(), 2);

    // midpoint 150, polyA at 900 on +
    let ex = ds.get_example(0).unwrap();
    let dist = ex.inputs["dist_polya_st"].as_f32().unwrap();
    assert_eq!(dist.shape(), &[1]);
    assert_eq!(dist[[0]], 749.0);

    // midpoint 1050, polyA at 1500 on -
    let ex = ds.get_example(1).unwrap();
    assert_eq!(ex.inputs["dist_polya_st"].as_f32().unwrap()[[0]], -449.0);
}

#[test]
fn genomic_example_layout() {
    let fx = Fixture::new();
    let ds = fx.open("splines.json", Some("targets.tsv")).unwrap();

    let ex = ds.get_example(1).unwrap();
    let keys: Vec<&str> = ex.inputs.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["dist_polya_st", "seq"]);

    let seq = ex.inputs["seq"].as_f32().unwrap();
    assert_eq!(seq.shape(), &[101, 4]);
    // position 1000 is 'A'
    assert_eq!(seq[[0, 0]], 1.0);
    assert_eq!(seq.sum(), 101.0);

    let dist = ex.inputs["dist_polya_st"].as_f32().unwrap();
    assert_eq!(dist.shape(), &[1, 10]);
    assert_abs_diff_eq!(dist.sum(), 1.0, epsilon = 1e-5);

    let targets = ex.targets.tensor().and_then(|t| t.as_text()).unwrap();
    assert_eq!(targets.shape(), &[1]);
    assert_eq!(targets[[0]], "0.75\n");

    let ranges = &ex.metadata["ranges"];
    assert_eq!(ranges.get("chr").and_then(MetadataValue::as_str), Some("chr22"));
    assert_eq!(ranges.get("start").and_then(MetadataValue::as_i64), Some(1000));
    assert_eq!(ranges.get("end").and_then(MetadataValue::as_i64), Some(1101));
    assert_eq!(ranges.get("id").and_then(MetadataValue::as_str), Some("site_b"));
    assert_eq!(ranges.get("strand").and_then(MetadataValue::as_str), Some("-"));

    let summary = describe_example(&ex);
    assert!(summary.contains("seq: float32[101, 4]"));
}

#[test]
fn fasta_is_opened_on_first_access() {
    let fx = Fixture::new();
    std::fs::remove_file(fx.path("genome.fa")).unwrap();

    let ds = fx.open("identity.json", None).unwrap();
    assert!(matches!(ds.get_example(0), Err(LoaderError::Io { .. })));
}

#[test]
fn target_count_must_match_intervals() {
    let fx = Fixture::new();
    write(&fx.dir, "short.tsv", "0.5\n");
    assert!(matches!(
        fx.open("identity.json", Some("short.tsv")),
        Err(LoaderError::LengthMismatch { expected: 2, actual: 1, .. })
    ));
}

#[test]
fn interval_without_landmarks_fails() {
    let fx = Fixture::new();
    write(&fx.dir, "intervals.tsv", "chr22\t100\t201\tsite_a\t0\t+\nchr1\t0\t10\tx\t0\t+\n");
    let ds = fx.open("identity.json", None).unwrap();
    assert!(ds.get_example(0).is_ok());
    assert!(matches!(
        ds.get_example(1),
        Err(LoaderError::MissingLandmark { .. }) | Err(LoaderError::UnknownChromosome(_))
    ));
    assert!(matches!(
        ds.get_example(2),
        Err(LoaderError::IndexOutOfRange { index: 2, len: 2 })
    ));
}

fn tabular_files(dir: &TempDir) -> (PathBuf, PathBuf, PathBuf) {
    let features = write(dir, "features.csv", "a,b\n1.0,10.0\n3.0,30.0\n5.0,50.0\n");
    let targets = write(dir, "targets.csv", "y\n0\n1\n1\n");
    let scaler = write(
        dir,
        "scaler.json",
        r#"{"kind": "standard_scaler", "mean": [3.0, 30.0], "scale": [2.0, 20.0]}"#,
    );
    (features, targets, scaler)
}

#[test]
fn tabular_dataset_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let (features, targets, scaler) = tabular_files(&dir);

    let ds = TabularFeatureDataset::open(&features, Some(&targets), &scaler, None).unwrap();
    assert_eq!(ds.len(), 3);

    for idx in 0..ds.len() {
        let ex = ds.get_example(idx).unwrap();
        assert_eq!(ex.inputs.len(), 1);
        assert!(!ex.targets.is_empty());
        assert_eq!(
            ex.metadata["example_row_number"],
            MetadataValue::Integer(idx as i64)
        );
    }

    let ex = ds.get_example(2).unwrap();
    let x = ex.inputs["features"].as_f64().unwrap();
    assert_eq!(x.as_slice().unwrap(), &[1.0, 1.0]);
}

#[test]
fn tabular_row_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let (features, _, scaler) = tabular_files(&dir);
    let targets = write(&dir, "few.csv", "y\n0\n");
    assert!(matches!(
        TabularFeatureDataset::open(&features, Some(&targets), &scaler, None),
        Err(LoaderError::LengthMismatch { .. })
    ));
}

#[test]
fn tabular_dataset_from_config() {
    let dir = tempfile::tempdir().unwrap();
    tabular_files(&dir);
    let config = write(
        &dir,
        "dataloader.json",
        r#"{"type": "tabular", "args": {"features_file": "features.csv", "x_transformer": "scaler.json"}}"#,
    );
    let ds = DataloaderConfig::load(Path::new(&config)).unwrap().build().unwrap();
    assert_eq!(ds.len(), 3);
    assert!(ds.describe(0).unwrap().contains("targets: {}"));
}
