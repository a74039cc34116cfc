use std::path::{
  Path,
  PathBuf,
};

use anyhow::{
  Context,
  Result,
};
use serde::Deserialize;

pub const DEFAULT_PYTHON: &str = "/usr/local/bin/python";

/// The log file is truncated once it would grow past this size.
pub const DEFAULT_LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// User settings read from `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub base_path:     Option<PathBuf>,
  /// Interpreter queried by `ShowSysPath` outside a virtualenv.
  pub python:        Option<PathBuf>,
  pub log_max_bytes: Option<u64>,
}

impl Config {
  /// Load `path`, falling back to defaults when it does not exist.
  pub fn load(path: &Path) -> Result<Self> {
    let source = match std::fs::read_to_string(path) {
      Ok(source) => source,
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
      Err(err) => {
        return Err(err).with_context(|| format!("failed to read {}", path.display()));
      },
    };
    Self::parse(&source).with_context(|| format!("failed to parse {}", path.display()))
  }

  pub fn parse(source: &str) -> Result<Self> {
    Ok(toml::from_str(source)?)
  }

  pub fn python(&self) -> PathBuf {
    self
      .python
      .clone()
      .unwrap_or_else(|| PathBuf::from(DEFAULT_PYTHON))
  }

  pub fn log_max_bytes(&self) -> u64 {
    self.log_max_bytes.unwrap_or(DEFAULT_LOG_MAX_BYTES)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.python(), Path::new(DEFAULT_PYTHON));
    assert_eq!(config.log_max_bytes(), 5 * 1024 * 1024);
  }

  #[test]
  fn test_parse_keys() {
    let config = Config::parse(
      r#"
      base_path = "~/src/misc.nvim"
      python = "/opt/python/bin/python3"
      log_max_bytes = 1024
      "#,
    )
    .unwrap();
    assert_eq!(config.base_path, Some(PathBuf::from("~/src/misc.nvim")));
    assert_eq!(config.python(), Path::new("/opt/python/bin/python3"));
    assert_eq!(config.log_max_bytes(), 1024);
  }

  #[test]
  fn test_unknown_key_is_an_error() {
    assert!(Config::parse("colour = \"red\"").is_err());
  }

  #[test]
  fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("config.toml")).unwrap();
    assert_eq!(config, Config::default());
  }

  #[test]
  fn test_malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "base_path = [").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("failed to parse"));
  }
}
