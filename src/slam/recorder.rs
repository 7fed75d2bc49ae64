//! EuRoC-style CSV writers for offline trajectory analysis. Diagnostic
//! only: the format carries no stability guarantee.

use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::math::Pose;

const CSV_EOL: &str = "\r\n";
const CSV_PRECISION: usize = 10;

/// Writes poses and their timestamps to a CSV file, EuRoC column order.
pub struct TrajectoryWriter {
    pub enabled: bool,
    path: PathBuf,
    file: Option<BufWriter<File>>,
}

impl TrajectoryWriter {
    pub fn new(dir: &Path, filename: &str, enabled: bool) -> TrajectoryWriter {
        TrajectoryWriter {
            enabled,
            path: dir.join(filename),
            file: None,
        }
    }

    // File creation is deferred so disabled writers never touch the disk.
    fn create(&mut self) -> std::io::Result<&mut BufWriter<File>> {
        if self.file.is_none() {
            if let Some(parent) = self.path.parent() {
                create_dir_all(parent)?;
            }
            let mut file = BufWriter::new(File::create(&self.path)?);
            write!(
                file,
                "#timestamp [ns], p_RS_R_x [m], p_RS_R_y [m], p_RS_R_z [m], \
                 q_RS_w [], q_RS_x [], q_RS_y [], q_RS_z []{CSV_EOL}"
            )?;
            self.file = Some(file);
        }
        Ok(self.file.as_mut().expect("just created"))
    }

    pub fn push(&mut self, timestamp_ns: u64, pose: &Pose) {
        if !self.enabled {
            return;
        }

        let (p, q) = (pose.position, pose.orientation);
        let result = self.create().and_then(|file| {
            write!(
                file,
                "{timestamp_ns},\
                 {:.prec$},{:.prec$},{:.prec$},\
                 {:.prec$},{:.prec$},{:.prec$},{:.prec$}{CSV_EOL}",
                p.x,
                p.y,
                p.z,
                q.w,
                q.x,
                q.y,
                q.z,
                prec = CSV_PRECISION,
            )
        });
        if let Err(e) = result {
            log::warn!("Failed to write trajectory CSV {:?}: {e}", self.path);
            self.enabled = false;
        }
    }
}

/// Writes rows of pipeline timestamps measured while estimating each pose.
pub struct TimingWriter {
    pub enabled: bool,
    path: PathBuf,
    column_names: Vec<String>,
    file: Option<BufWriter<File>>,
}

impl TimingWriter {
    pub fn new(dir: &Path, filename: &str, enabled: bool, column_names: Vec<String>) -> TimingWriter {
        TimingWriter {
            enabled,
            path: dir.join(filename),
            column_names,
            file: None,
        }
    }

    fn create(&mut self) -> std::io::Result<&mut BufWriter<File>> {
        if self.file.is_none() {
            if let Some(parent) = self.path.parent() {
                create_dir_all(parent)?;
            }
            let mut file = BufWriter::new(File::create(&self.path)?);
            write!(file, "#{}{CSV_EOL}", self.column_names.join(","))?;
            self.file = Some(file);
        }
        Ok(self.file.as_mut().expect("just created"))
    }

    pub fn push(&mut self, timestamps: &[u64]) {
        if !self.enabled {
            return;
        }

        let row = timestamps
            .iter()
            .map(|ts| ts.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let result = self.create().and_then(|file| write!(file, "{row}{CSV_EOL}"));
        if let Err(e) = result {
            log::warn!("Failed to write timing CSV {:?}: {e}", self.path);
            self.enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    #[test]
    fn test_trajectory_writer_format() {
        let dir = std::env::temp_dir().join("sixdof-test-csv");
        let _ = std::fs::remove_dir_all(&dir);

        let mut w = TrajectoryWriter::new(&dir, "tracking.csv", true);
        w.push(
            123,
            &Pose::new(Quat::IDENTITY, Vec3::new(1.0, 2.0, 3.0)),
        );
        drop(w);

        let contents = std::fs::read_to_string(dir.join("tracking.csv")).unwrap();
        let mut lines = contents.split("\r\n");
        assert!(lines.next().unwrap().starts_with("#timestamp [ns]"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("123,1.0000000000,2.0000000000,3.0000000000,1.0000000000,"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_disabled_writer_writes_nothing() {
        let dir = std::env::temp_dir().join("sixdof-test-csv-disabled");
        let _ = std::fs::remove_dir_all(&dir);

        let mut w = TrajectoryWriter::new(&dir, "tracking.csv", false);
        w.push(1, &Pose::IDENTITY);
        assert!(!dir.join("tracking.csv").exists());
    }
}
