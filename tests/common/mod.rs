//! Shared on-disk fixtures: two well-separated speakers, a checkpoint whose
//! single head scores `sigmoid(3 - |mean_a - mean_b|)`.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Utterances per speaker and the base value of their frames
pub const SPEAKERS: [(&str, [f32; 3]); 2] = [("spkA", [0.0, 0.1, 0.2]), ("spkB", [5.0, 5.1, 5.2])];

/// Paths of a written fixture
pub struct Fixture {
    pub dir: TempDir,
    pub feats: PathBuf,
    pub checkpoint: PathBuf,
    pub spk2utt: PathBuf,
    pub trials: PathBuf,
}

fn utt_id(speaker: &str, i: usize) -> String {
    format!("{speaker}-utt{i}")
}

fn write_ark(path: &Path) {
    let mut ark = String::new();
    for (speaker, values) in SPEAKERS {
        for (i, v) in values.iter().enumerate() {
            writeln!(ark, "{} [", utt_id(speaker, i)).expect("write");
            writeln!(ark, "  {v}").expect("write");
            writeln!(ark, "  {} ]", v + 0.2).expect("write");
        }
    }
    fs::write(path, ark).expect("write ark");
}

pub const CHECKPOINT: &str = r#"{
  "arch": "stats-linear",
  "ncoef": 1,
  "latent_size": 2,
  "projection": { "weights": [[1.0, 0.0], [0.0, 1.0]], "bias": [0.0, 0.0] },
  "output": { "weights": [[1.0, 0.0]], "bias": [0.0] },
  "discriminators": [
    { "layers": [
        { "weights": [[1.0, 0.0, -1.0, 0.0], [-1.0, 0.0, 1.0, 0.0]], "bias": [0.0, 0.0] },
        { "weights": [[-1.0, -1.0]], "bias": [3.0] }
    ] }
  ]
}"#;

pub fn fixture() -> Fixture {
    let dir = TempDir::new().expect("tempdir");
    let feats = dir.path().join("feats");
    fs::create_dir(&feats).expect("mkdir");
    write_ark(&feats.join("feats.ark"));

    let checkpoint = dir.path().join("model.json");
    fs::write(&checkpoint, CHECKPOINT).expect("write checkpoint");

    let mut spk2utt = String::new();
    for (speaker, values) in SPEAKERS {
        let utts: Vec<String> = (0..values.len()).map(|i| utt_id(speaker, i)).collect();
        writeln!(spk2utt, "{speaker} {}", utts.join(" ")).expect("write");
    }
    let spk2utt_path = dir.path().join("spk2utt");
    fs::write(&spk2utt_path, spk2utt).expect("write spk2utt");

    let trials = dir.path().join("trials");
    fs::write(
        &trials,
        "spkA-utt0 spkA-utt1 target\nspkA-utt0 spkB-utt2 nontarget\nspkB-utt0 spkB-utt1 target\n",
    )
    .expect("write trials");

    Fixture {
        dir,
        feats,
        checkpoint,
        spk2utt: spk2utt_path,
        trials,
    }
}
