use std::{
  fs::{
    File,
    OpenOptions,
  },
  io::{
    self,
    Write,
  },
  path::Path,
};

use anyhow::{
  Context,
  Result,
};

/// Append-only log file that starts over once the next record would push it
/// past `max_bytes`. No backups are kept.
///
/// Writes are staged until `flush`, which fern calls once per record, so a
/// record is never split across a truncation.
#[derive(Debug)]
pub struct RotatingFile {
  file:      File,
  record:    Vec<u8>,
  written:   u64,
  max_bytes: u64,
}

impl RotatingFile {
  pub fn open(path: &Path, max_bytes: u64) -> io::Result<Self> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let written = file.metadata()?.len();
    Ok(Self {
      file,
      record: Vec::new(),
      written,
      max_bytes,
    })
  }

  fn truncate(&mut self) -> io::Result<()> {
    self.file.set_len(0)?;
    self.written = 0;
    Ok(())
  }

  fn commit(&mut self) -> io::Result<()> {
    if self.record.is_empty() {
      return Ok(());
    }
    let len = self.record.len() as u64;
    if self.max_bytes > 0 && self.written > 0 && self.written + len > self.max_bytes {
      self.truncate()?;
    }
    self.file.write_all(&self.record)?;
    self.written += len;
    self.record.clear();
    Ok(())
  }
}

impl Write for RotatingFile {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.record.extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    self.commit()?;
    self.file.flush()
  }
}

impl Drop for RotatingFile {
  fn drop(&mut self) {
    let _ = self.commit();
  }
}

pub fn level_filter(verbosity: u8) -> log::LevelFilter {
  match verbosity {
    0 => log::LevelFilter::Info,
    1 => log::LevelFilter::Debug,
    _ => log::LevelFilter::Trace,
  }
}

/// `[2024-01-31 12:00:00,042 - INFO] src/file.rs...crate::module, line 12 > message`
pub fn format_record(timestamp: &str, record: &log::Record) -> String {
  format!(
    "[{timestamp} - {}] {}...{}, line {} > {}",
    record.level(),
    record.file().unwrap_or("<unknown>"),
    record.module_path().unwrap_or("<unknown>"),
    record.line().unwrap_or(0),
    record.args()
  )
}

/// Install the global logger writing to `log_file`.
pub fn setup_logging(verbosity: u8, log_file: &Path, max_bytes: u64) -> Result<()> {
  let file = RotatingFile::open(log_file, max_bytes)
    .with_context(|| format!("failed to open log file {}", log_file.display()))?;

  fern::Dispatch::new()
    .format(|out, _message, record| {
      let timestamp = chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S,%3f")
        .to_string();
      out.finish(format_args!("{}", format_record(&timestamp, record)))
    })
    .level(level_filter(verbosity))
    .chain(Box::new(file) as Box<dyn Write + Send>)
    .apply()?;

  Ok(())
}
