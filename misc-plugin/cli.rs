use std::path::PathBuf;

use anyhow::Result;
use clap::{
  ArgAction,
  Parser,
};
use misc_core::LineRange;

/// What the process was started to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
  /// Answer the editor over stdio.
  Serve,
  Health,
  Exec(ExecOptions),
}

/// Run one command over files (or stdin) without an editor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecOptions {
  pub command: String,
  pub range:   Option<LineRange>,
  pub args:    Vec<String>,
  pub files:   Vec<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct CliOptions {
  pub mode:        Mode,
  pub verbosity:   u8,
  pub log_file:    Option<PathBuf>,
  pub config_file: Option<PathBuf>,
}

impl CliOptions {
  pub fn parse() -> Result<Self> {
    let raw = RawCli::parse();
    raw.try_into()
  }

  pub fn parse_from<I, T>(args: I) -> Result<Self>
  where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
  {
    let raw = RawCli::try_parse_from(args)?;
    raw.try_into()
  }
}

#[derive(Parser, Debug)]
#[command(name = "misc-plugin", about, long_about = None, version)]
struct RawCli {
  /// Increase logging verbosity (repeat for more detail)
  #[arg(short = 'v', action = ArgAction::Count)]
  verbosity: u8,

  /// Save logs to a specific file
  #[arg(long = "log", value_name = "FILE")]
  log_file: Option<PathBuf>,

  /// Load configuration from a specific file
  #[arg(short = 'c', long = "config", value_name = "FILE")]
  config_file: Option<PathBuf>,

  /// Print the resolved paths and exit
  #[arg(long = "health", conflicts_with = "exec")]
  health: bool,

  /// Run a single command over FILES (stdin when none are given)
  #[arg(long = "exec", value_name = "COMMAND")]
  exec: Option<String>,

  /// Line range for ranged commands, 1-indexed and inclusive
  #[arg(long = "range", value_name = "START,END", value_parser = parse_range, requires = "exec")]
  range: Option<LineRange>,

  /// Positional argument passed to the command (repeatable)
  #[arg(
    long = "arg",
    value_name = "ARG",
    allow_hyphen_values = true,
    requires = "exec"
  )]
  args: Vec<String>,

  /// Files to edit in place
  #[arg(value_name = "FILES", requires = "exec")]
  files: Vec<PathBuf>,
}

impl TryFrom<RawCli> for CliOptions {
  type Error = anyhow::Error;

  fn try_from(raw: RawCli) -> Result<Self> {
    let mode = match raw.exec {
      Some(command) => {
        Mode::Exec(ExecOptions {
          command,
          range: raw.range,
          args: raw.args,
          files: raw.files,
        })
      },
      None if raw.health => Mode::Health,
      None => Mode::Serve,
    };

    Ok(Self {
      mode,
      verbosity: raw.verbosity,
      log_file: raw.log_file,
      config_file: raw.config_file,
    })
  }
}

/// `START,END` or a single line number.
fn parse_range(value: &str) -> std::result::Result<LineRange, String> {
  let (start, end) = value.split_once(',').unwrap_or((value, value));
  let parse = |part: &str| {
    part
      .trim()
      .parse::<usize>()
      .map_err(|_| format!("'{part}' is not a line number"))
  };
  LineRange::new(parse(start)?, parse(end)?).map_err(|err| err.to_string())
}
