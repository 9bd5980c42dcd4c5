//! Append-only activation log writer

use super::{DEFAULT_COMMENT, HISTORY_HEADER, HistoryRecord, join_row, split_row};
use crate::error::PipelineError;
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::Context;
use binsort_core::Command;
use chrono::{DateTime, Local};
use image::RgbImage;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

pub struct HistoryRecorder {
    dir: PathBuf,
    log_path: PathBuf,
    comment: String,
}

impl HistoryRecorder {
    /// Prepare the history directory and log. Safe to call on every start:
    /// the header is only written when the log does not exist yet.
    pub fn open<P: AsRef<Path>>(dir: P, log_file: &str) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| persistence_error(&dir, e))
            .with_context(|| format!("Failed to create history directory: {:?}", dir))?;

        let recorder = Self {
            log_path: dir.join(log_file),
            dir,
            comment: DEFAULT_COMMENT.to_string(),
        };
        recorder.ensure_log()?;
        Ok(recorder)
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    fn ensure_log(&self) -> Result<()> {
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.log_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(()),
            Err(e) => return Err(persistence_error(&self.log_path, e).into()),
        };

        writeln!(file, "{}", join_row(&HISTORY_HEADER))
            .map_err(|e| persistence_error(&self.log_path, e))?;
        info!(path = ?self.log_path, "Created activation log");
        Ok(())
    }

    /// Save the snapshot, then append its row. No row is written when the
    /// snapshot could not be saved.
    pub fn record(
        &self,
        image: &RgbImage,
        object_count: usize,
        command: Command,
        at: SystemTime,
    ) -> Result<HistoryRecord> {
        let stamp: DateTime<Local> = at.into();
        let record = HistoryRecord::new(stamp, object_count, command, self.comment.as_str());

        let image_path = self.dir.join(&record.image_file);
        ImageUtils::save_jpeg(image, &image_path).map_err(|e| PipelineError::Persistence {
            path: image_path.display().to_string(),
            reason: format!("{e:#}"),
        })?;

        // The log may have been removed while running.
        self.ensure_log()?;
        self.append_row(&record.to_row())
            .map_err(|e| persistence_error(&self.log_path, e))?;

        debug!(file = %record.image_file, command = %command, "History row appended");
        Ok(record)
    }

    fn append_row(&self, row: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.log_path)?;
        writeln!(file, "{}", row)?;
        file.flush()
    }

    /// Data rows of the log, header excluded
    pub fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        let file = File::open(&self.log_path)
            .with_context(|| format!("Failed to open activation log: {:?}", self.log_path))?;

        let mut rows = Vec::new();
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| {
                format!("Failed to read line {} from {:?}", line_num + 1, self.log_path)
            })?;
            if line_num == 0 || line.is_empty() {
                continue;
            }
            rows.push(split_row(&line));
        }
        Ok(rows)
    }
}

fn persistence_error(path: &Path, e: io::Error) -> PipelineError {
    PipelineError::Persistence {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
    }

    fn header_count(path: &Path) -> Result<usize> {
        let text = fs::read_to_string(path)?;
        Ok(text.lines().filter(|l| l.starts_with("fecha_hora,")).count())
    }

    #[test]
    fn test_open_creates_dir_and_header() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let dir = tmp.path().join("historial");

        let recorder = HistoryRecorder::open(&dir, "activaciones.csv")?;
        assert!(dir.is_dir());
        assert_eq!(
            fs::read_to_string(recorder.log_path())?,
            "fecha_hora,archivo_imagen,objetos_detectados,comando_mqtt,comentario\n"
        );
        assert!(recorder.read_rows()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_record_writes_artifact_then_row() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let recorder = HistoryRecorder::open(tmp.path(), "activaciones.csv")?;

        let record = recorder.record(&RgbImage::new(16, 16), 1, Command::Paper, at(0))?;

        assert!(record.image_file.ends_with("_detectado.jpg"));
        assert!(tmp.path().join(&record.image_file).is_file());

        let rows = recorder.read_rows()?;
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0],
            vec![
                record.timestamp.clone(),
                record.image_file.clone(),
                "1".to_string(),
                "PAPER".to_string(),
                DEFAULT_COMMENT.to_string(),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_header_once_across_reopen() -> Result<()> {
        let tmp = tempfile::tempdir()?;

        let first = HistoryRecorder::open(tmp.path(), "log.csv")?;
        first.record(&RgbImage::new(4, 4), 2, Command::Metal, at(0))?;
        drop(first);

        let second = HistoryRecorder::open(tmp.path(), "log.csv")?;
        second.record(&RgbImage::new(4, 4), 3, Command::Plastic, at(10))?;

        assert_eq!(header_count(second.log_path())?, 1);

        let rows = second.read_rows()?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][3], "METAL");
        assert_eq!(rows[1][3], "PLASTIC");
        assert_ne!(rows[0][1], rows[1][1]);
        for row in &rows {
            assert!(tmp.path().join(&row[1]).is_file());
        }
        Ok(())
    }

    #[test]
    fn test_log_recreated_if_removed() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let recorder = HistoryRecorder::open(tmp.path(), "log.csv")?;
        fs::remove_file(recorder.log_path())?;

        recorder.record(&RgbImage::new(4, 4), 1, Command::Paper, at(0))?;
        assert_eq!(header_count(recorder.log_path())?, 1);
        assert_eq!(recorder.read_rows()?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_failed_snapshot_leaves_no_row() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let recorder = HistoryRecorder::open(tmp.path(), "log.csv")?;

        // A directory squatting on the snapshot name makes the save fail.
        let name = HistoryRecord::image_file_name(at(0).into());
        fs::create_dir(tmp.path().join(name))?;

        let err = recorder
            .record(&RgbImage::new(4, 4), 1, Command::Paper, at(0))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Persistence { .. })
        ));
        assert!(recorder.read_rows()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_custom_comment() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let recorder = HistoryRecorder::open(tmp.path(), "log.csv")?.with_comment("line 2");
        let record = recorder.record(&RgbImage::new(4, 4), 1, Command::Metal, at(0))?;
        assert_eq!(record.comment, "line 2");
        Ok(())
    }
}
