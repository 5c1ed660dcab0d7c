//! Progress monitors.
//!
//! A monitor receives `(evaluation_count, x, fitness)` triples. Solvers hold
//! two of them: a generation monitor fed with the best point once per
//! generation, and an evaluation monitor fed with every evaluated trial.
//! Recording never fails and never alters the values.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::Array1;
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::Result;

pub trait Monitor: Send + Sync {
    fn record(&self, evaluation_count: usize, x: &Array1<f64>, fitness: f64);
}

/// A single monitor entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorRecord {
    /// Evaluations spent when the entry was recorded
    pub evaluation_count: usize,
    pub parameters: Vec<f64>,
    pub fitness: f64,
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMonitor;

impl Monitor for NullMonitor {
    fn record(&self, _evaluation_count: usize, _x: &Array1<f64>, _fitness: f64) {}
}

/// Append-only in-memory log.
#[derive(Debug, Default)]
pub struct MemoryMonitor {
    records: Mutex<Vec<MonitorRecord>>,
}

impl MemoryMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of all records
    pub fn records(&self) -> Vec<MonitorRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn last(&self) -> Option<MonitorRecord> {
        self.records.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&*self.records.lock())?)
    }
}

impl Monitor for MemoryMonitor {
    fn record(&self, evaluation_count: usize, x: &Array1<f64>, fitness: f64) {
        self.records.lock().push(MonitorRecord {
            evaluation_count,
            parameters: x.to_vec(),
            fitness,
        });
    }
}

/// Logs every `interval`-th record at info level.
#[derive(Debug)]
pub struct VerboseMonitor {
    pub interval: usize,
    count: AtomicUsize,
}

impl VerboseMonitor {
    pub fn new(interval: usize) -> Self {
        Self { interval: interval.max(1), count: AtomicUsize::new(0) }
    }
}

impl Monitor for VerboseMonitor {
    fn record(&self, evaluation_count: usize, x: &Array1<f64>, fitness: f64) {
        let n = self.count.fetch_add(1, Ordering::Relaxed);
        if n % self.interval == 0 {
            let shown: Vec<String> = x.iter().take(6).map(|v| format!("{:.4}", v)).collect();
            let ellipsis = if x.len() > 6 { ", ..." } else { "" };
            log::info!(
                "record {:5}  nfev={:7}  f={:.6e}  x=[{}{}]",
                n,
                evaluation_count,
                fitness,
                shown.join(", "),
                ellipsis
            );
        }
    }
}

/// Buffers records and writes them to `<dir>/<name>.csv` on [`CsvMonitor::finalize`].
#[derive(Debug)]
pub struct CsvMonitor {
    dir: PathBuf,
    name: String,
    records: Mutex<Vec<MonitorRecord>>,
}

impl CsvMonitor {
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
        Self { dir: dir.as_ref().to_path_buf(), name: name.to_string(), records: Mutex::new(Vec::new()) }
    }

    /// Write into the directory named by `EVOSOLVE_RECORDS_DIR`.
    pub fn from_env(name: &str) -> Result<Self> {
        Ok(Self::new(evosolve_env::records_dir()?, name))
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.csv", self.name))
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Save all buffered records; header is `evaluation_count,x0..x{n-1},fitness`.
    pub fn finalize(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path();
        let mut writer = csv::Writer::from_path(&path)?;
        let records = self.records.lock();
        let dim = records.first().map(|r| r.parameters.len()).unwrap_or(0);

        let mut header = vec!["evaluation_count".to_string()];
        header.extend((0..dim).map(|i| format!("x{}", i)));
        header.push("fitness".to_string());
        writer.write_record(&header)?;

        for record in records.iter() {
            let mut row = Vec::with_capacity(dim + 2);
            row.push(record.evaluation_count.to_string());
            row.extend(record.parameters.iter().map(|v| format!("{:.16}", v)));
            row.push(format!("{:.16}", record.fitness));
            writer.write_record(&row)?;
        }
        writer.flush()?;
        log::info!("Saved {} monitor records to {}", records.len(), path.display());
        Ok(path)
    }
}

impl Monitor for CsvMonitor {
    fn record(&self, evaluation_count: usize, x: &Array1<f64>, fitness: f64) {
        self.records.lock().push(MonitorRecord {
            evaluation_count,
            parameters: x.to_vec(),
            fitness,
        });
    }
}
