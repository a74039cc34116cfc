pub mod config;

use std::{
  borrow::Cow,
  ffi::OsStr,
  path::{
    Path,
    PathBuf,
  },
};

use anyhow::{
  Context,
  Result,
};
use etcetera::base_strategy::{
  BaseStrategy,
  choose_base_strategy,
};

pub use crate::config::Config;

/// Directory name used under the user config dir.
const APP_DIR: &str = "misc.nvim";

/// Files and directories the plugin works with, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
  /// Where the plugin is installed.
  pub base:        PathBuf,
  pub module:      PathBuf,
  pub log_file:    PathBuf,
  pub config_file: PathBuf,
}

impl Paths {
  /// Resolve every path from the loaded `config`.
  ///
  /// The base path comes from, in order: `MISC_NVIM_BASE_PATH`, the
  /// `base_path` config key, the default plugin install location. The log
  /// file defaults to `debug.log` in the base path.
  pub fn resolve(
    config: &Config,
    config_file: PathBuf,
    log_file: Option<PathBuf>,
  ) -> Result<Self> {
    let base = match std::env::var_os("MISC_NVIM_BASE_PATH") {
      Some(dir) => expand_tilde(Cow::Owned(PathBuf::from(dir))).into_owned(),
      None => {
        match &config.base_path {
          Some(dir) => expand_tilde(Cow::Borrowed(dir.as_path())).into_owned(),
          None => default_base_path()?,
        }
      },
    };

    let log_file = log_file.unwrap_or_else(|| base.join("debug.log"));
    ensure_parent_dir(&log_file);

    Ok(Self {
      module: base.join("rplugin").join("python3").join("misc"),
      base,
      log_file,
      config_file,
    })
  }

  /// Directories the plugin knows about, highest priority first.
  ///
  /// Postcondition: returns at least one path (it might not exist).
  pub fn search_paths(&self) -> Vec<PathBuf> {
    let mut dirs = vec![self.module.clone(), self.base.clone()];

    if let Ok(dir) = config_dir() {
      dirs.push(dir);
    }

    // canonicalize the path in case the executable is symlinked
    if let Some(exe_dir) = std::env::current_exe()
      .ok()
      .and_then(|path| std::fs::canonicalize(path).ok())
      .and_then(|path| path.parent().map(Path::to_path_buf))
    {
      dirs.push(exe_dir);
    }

    dirs.dedup();
    dirs
  }
}

pub fn config_dir() -> Result<PathBuf> {
  if let Some(dir) = std::env::var_os("MISC_NVIM_CONFIG_DIR") {
    return Ok(expand_tilde(Cow::Owned(PathBuf::from(dir))).into_owned());
  }
  let strategy = choose_base_strategy().context("unable to find the config directory")?;
  let mut path = strategy.config_dir();
  path.push(APP_DIR);
  Ok(path)
}

pub fn default_config_file() -> Result<PathBuf> {
  Ok(config_dir()?.join("config.toml"))
}

/// Where the plugin manager installs the plugin:
/// `~/.local/share/nvim/plugged/misc.nvim` on most systems.
pub fn default_base_path() -> Result<PathBuf> {
  let strategy = choose_base_strategy().context("unable to find the data directory")?;
  Ok(
    strategy
      .data_dir()
      .join("nvim")
      .join("plugged")
      .join(APP_DIR),
  )
}

/// Replace a leading `~` component with the home directory.
pub fn expand_tilde(path: Cow<'_, Path>) -> Cow<'_, Path> {
  let mut components = path.components();
  if let Some(std::path::Component::Normal(first)) = components.next()
    && first == OsStr::new("~")
    && let Ok(home) = etcetera::home_dir()
  {
    return Cow::Owned(home.join(components.as_path()));
  }
  path
}

fn ensure_parent_dir(path: &Path) {
  if let Some(parent) = path.parent()
    && !parent.exists()
  {
    if let Err(err) = std::fs::create_dir_all(parent) {
      log::warn!("failed to create {}: {err}", parent.display());
    }
  }
}
