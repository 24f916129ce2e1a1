// Persisting cascade trajectories.
//
// One destination file per run, chosen by the configured output kind.
// Workers write whole cascades under a single lock so that batches from
// concurrent cascades never interleave; each batch ends with the configured
// marker line. A pre-existing destination file is renamed aside with a
// timestamp before the run starts, never overwritten.

use crate::cascade::TrajectoryRecord;
use crate::config::Config;
use crate::error::{CascadeError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Move an existing destination file out of the way, tagging it with a
/// local timestamp, and make sure the output directory exists.
pub fn prepare_output_files(config: &Config) -> Result<()> {
    fs::create_dir_all(&config.output_directory).map_err(|e| CascadeError::Output {
        path: config.output_directory.clone(),
        source: e,
    })?;
    let path = config.output_path(config.output_kind);
    if path.exists() {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let aside = config.output_directory.join(format!(
            "{}_{}_{}.{}",
            config.output_stem,
            config.output_kind.suffix(),
            stamp,
            config.output_extension
        ));
        fs::rename(&path, &aside).map_err(|e| CascadeError::Output {
            path: path.clone(),
            source: e,
        })?;
        log::info!("moved existing output {} to {}", path.display(), aside.display());
    }
    Ok(())
}

/// Shared, thread-safe writer for the run's destination file.
#[derive(Debug)]
pub struct OutputWriter {
    path: PathBuf,
    end_marker: String,
    file: Mutex<BufWriter<File>>,
}

impl OutputWriter {
    /// Open (or create) the destination file for appending.
    pub fn create(config: &Config) -> Result<Self> {
        let path = config.output_path(config.output_kind);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| CascadeError::Output {
                path: path.clone(),
                source: e,
            })?;
        Ok(OutputWriter {
            path,
            end_marker: config.end_marker.clone(),
            file: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Append one cascade's records as a single batch: every retained point
    /// as an `x y z depth` line, terminated by the end-marker line. Held
    /// under the lock from first line to flush.
    pub fn write_cascade(&self, records: &[TrajectoryRecord]) -> Result<()> {
        let mut guard = self.file.lock().unwrap_or_else(|p| p.into_inner());
        let io = |e| CascadeError::Output {
            path: self.path.clone(),
            source: e,
        };
        for record in records {
            for point in &record.points {
                writeln!(guard, "{} {} {} {}", point.x, point.y, point.z, point.depth)
                    .map_err(io)?;
            }
        }
        writeln!(guard, "{}", self.end_marker).map_err(io)?;
        guard.flush().map_err(io)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
