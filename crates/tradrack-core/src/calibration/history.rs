//! CSV history of measured bowden lengths.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use super::BowdenSample;
use crate::error::StoreResult;

const HEADER: &str = "time,length,diff_from_set_length,new_set_length,new_sample_count";
const LOAD_FILE: &str = "bowden_load_lengths.csv";
const UNLOAD_FILE: &str = "bowden_unload_lengths.csv";

/// Appends every bowden sample to a per-direction CSV file.
#[derive(Debug, Clone)]
pub struct BowdenHistory {
    load_path: PathBuf,
    unload_path: PathBuf,
}

impl BowdenHistory {
    /// Log into `dir`; a leading `~` is expanded to the home directory.
    pub fn new(dir: &str) -> Self {
        let dir = expand_home(dir);
        Self { load_path: dir.join(LOAD_FILE), unload_path: dir.join(UNLOAD_FILE) }
    }

    pub fn load_path(&self) -> &Path {
        &self.load_path
    }

    pub fn unload_path(&self) -> &Path {
        &self.unload_path
    }

    pub fn record_load(&self, sample: &BowdenSample) -> StoreResult<()> {
        append_row(&self.load_path, sample)
    }

    pub fn record_unload(&self, sample: &BowdenSample) -> StoreResult<()> {
        append_row(&self.unload_path, sample)
    }
}

fn expand_home(dir: &str) -> PathBuf {
    if let Some(rest) = dir.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches(['/', '\\']));
        }
    }
    PathBuf::from(dir)
}

fn append_row(path: &Path, sample: &BowdenSample) -> StoreResult<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if file.metadata()?.len() == 0 {
        writeln!(file, "{HEADER}")?;
    }
    writeln!(
        file,
        "{},{:.3},{:.3},{:.3},{}",
        Local::now().format("%Y%m%d_%H%M%S"),
        sample.length,
        sample.diff_from_set_length(),
        sample.new_set_length,
        sample.sample_count
    )?;
    Ok(())
}
