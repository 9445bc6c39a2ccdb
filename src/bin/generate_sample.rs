use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use ndarray::{Array2, Axis};

use seqdist_loader::config::DataloaderConfig;
use seqdist_loader::transform::{EncodeSplines, StandardScaler, TransformerSpec};

const CHROM: &str = "chr22";
const CHROM_LEN: usize = 20_000;
const LINE_WIDTH: usize = 60;
const INTERVAL_WIDTH: u64 = 101;
const N_INTERVALS: usize = 20;
const N_ROWS: usize = 30;

/// Write a small, deterministic data bundle for both dataloaders.
#[derive(Parser, Debug)]
struct Args {
    /// Output directory
    #[arg(default_value = "sample_data")]
    out: PathBuf,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn create(dir: &Path, name: &str) -> Result<BufWriter<File>> {
    let path = dir.join(name);
    let file = File::create(&path).with_context(|| format!("creating {path:?}"))?;
    Ok(BufWriter::new(file))
}

fn write_json<T: serde::Serialize>(dir: &Path, name: &str, value: &T) -> Result<()> {
    let mut w = create(dir, name)?;
    serde_json::to_writer_pretty(&mut w, value)?;
    writeln!(w)?;
    Ok(())
}

/// features.csv, targets.csv, a fitted standard scaler and the config.
fn write_tabular(dir: &Path, rng: &mut SimpleRng) -> Result<()> {
    let columns = ["gc_content", "conservation", "expression"];
    let centers = [0.45, 2.0, 10.0];

    let mut values = Array2::<f64>::zeros((N_ROWS, columns.len()));
    for mut row in values.axis_iter_mut(Axis(0)) {
        for (v, &mu) in row.iter_mut().zip(&centers) {
            *v = rng.gauss(mu, mu * 0.2);
        }
    }

    let mut features = csv::Writer::from_path(dir.join("features.csv"))?;
    features.write_record(columns)?;
    let mut targets = csv::Writer::from_path(dir.join("targets.csv"))?;
    targets.write_record(["label"])?;
    for row in values.axis_iter(Axis(0)) {
        features.write_record(row.iter().map(|v| format!("{v:.6}")))?;
        let label = if row[2] > centers[2] { 1 } else { 0 };
        targets.write_record([label.to_string()])?;
    }
    features.flush()?;
    targets.flush()?;

    let mean = values.mean_axis(Axis(0)).context("empty feature table")?;
    let scale = values.std_axis(Axis(0), 0.0);
    let scaler = TransformerSpec::StandardScaler(StandardScaler {
        mean: Some(mean.to_vec()),
        scale: Some(scale.to_vec()),
    });
    write_json(dir, "x_transformer.json", &scaler)?;
    write_json(dir, "y_transformer.json", &TransformerSpec::Identity)?;

    let config = DataloaderConfig::Tabular {
        features_file: "features.csv".into(),
        targets_file: Some("targets.csv".into()),
        x_transformer: "x_transformer.json".into(),
        y_transformer: Some("y_transformer.json".into()),
    };
    write_json(dir, "tabular.json", &config)
}

/// One chromosome with 60-column lines plus its `.fai` index.
fn write_genome(dir: &Path, rng: &mut SimpleRng) -> Result<()> {
    const BASES: &[u8] = b"ACGT";
    let seq: Vec<u8> = (0..CHROM_LEN)
        .map(|i| {
            // a short run of N near the start
            if (100..110).contains(&i) {
                b'N'
            } else {
                BASES[rng.below(4) as usize]
            }
        })
        .collect();

    let header = format!(">{CHROM}\n");
    let mut fa = create(dir, "genome.fa")?;
    fa.write_all(header.as_bytes())?;
    for line in seq.chunks(LINE_WIDTH) {
        fa.write_all(line)?;
        fa.write_all(b"\n")?;
    }
    fa.flush()?;

    let mut fai = create(dir, "genome.fa.fai")?;
    writeln!(
        fai,
        "{CHROM}\t{CHROM_LEN}\t{}\t{LINE_WIDTH}\t{}",
        header.len(),
        LINE_WIDTH + 1
    )?;
    Ok(())
}

/// Two-exon transcripts on both strands; one non-coding gene is filtered out.
fn write_annotation(dir: &Path) -> Result<()> {
    let genes = [
        ("g1", "+", 500u64, 3_000u64, "protein_coding"),
        ("g2", "-", 4_000, 7_500, "protein_coding"),
        ("g3", "+", 9_000, 12_000, "lincRNA"),
        ("g4", "+", 11_000, 15_000, "protein_coding"),
        ("g5", "-", 16_000, 19_500, "protein_coding"),
    ];

    let mut gtf = create(dir, "annotation.gtf")?;
    writeln!(gtf, "##description: generated sample annotation")?;
    for (id, strand, start, end, gene_type) in genes {
        let attrs = format!("gene_id \"{id}\"; gene_type \"{gene_type}\";");
        let tx = format!("gene_id \"{id}\"; transcript_id \"{id}.1\"; gene_type \"{gene_type}\";");
        let mid = (start + end) / 2;
        let rows = [
            ("gene", start, end, &attrs),
            ("transcript", start, end, &tx),
            ("exon", start, mid - 200, &tx),
            ("exon", mid + 200, end, &tx),
        ];
        for (feature, s, e, a) in rows {
            writeln!(gtf, "{CHROM}\tSAMPLE\t{feature}\t{s}\t{e}\t.\t{strand}\t.\t{a}")?;
        }
    }
    gtf.flush()?;
    Ok(())
}

/// BED6 intervals, their targets, a spline encoder and the config.
fn write_intervals(dir: &Path, rng: &mut SimpleRng) -> Result<()> {
    let mut bed = create(dir, "intervals.tsv")?;
    let mut targets = create(dir, "targets.tsv")?;
    for i in 0..N_INTERVALS {
        let start = rng.below(CHROM_LEN as u64 - INTERVAL_WIDTH);
        let strand = if i % 2 == 0 { "+" } else { "-" };
        writeln!(
            bed,
            "{CHROM}\t{start}\t{}\tsite_{i}\t0\t{strand}",
            start + INTERVAL_WIDTH
        )?;
        writeln!(targets, "{:.4}", rng.next_f64())?;
    }
    bed.flush()?;
    targets.flush()?;

    let splines = TransformerSpec::EncodeSplines(EncodeSplines {
        n_bases: 10,
        spline_order: 3,
        data_min: vec![-(CHROM_LEN as f64)],
        data_max: vec![CHROM_LEN as f64],
    });
    write_json(dir, "encode_splines.json", &splines)?;

    let config = DataloaderConfig::GenomicInterval {
        intervals_file: "intervals.tsv".into(),
        fasta_file: "genome.fa".into(),
        gtf_file: "annotation.gtf".into(),
        preproc_transformer: "encode_splines.json".into(),
        target_file: Some("targets.tsv".into()),
    };
    write_json(dir, "genomic_interval.json", &config)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    std::fs::create_dir_all(&args.out).with_context(|| format!("creating {:?}", args.out))?;

    let mut rng = SimpleRng::new(42);
    write_tabular(&args.out, &mut rng)?;
    write_genome(&args.out, &mut rng)?;
    write_annotation(&args.out)?;
    write_intervals(&args.out, &mut rng)?;

    println!(
        "Wrote {N_ROWS} feature rows and {N_INTERVALS} intervals on {CHROM} ({CHROM_LEN} bp) to {:?}",
        args.out
    );
    Ok(())
}
