//! Running a single command over files, without an editor.

use std::{
  fs,
  io::{
    self,
    Read,
    Write,
  },
  path::Path,
};

use anyhow::{
  Context as _,
  Result,
};
use misc_core::ScratchHost;
use misc_default::{
  Arg,
  Args,
  CommandError,
  CommandRegistry,
  Context,
  Settings,
};

use crate::cli::ExecOptions;

/// What running a command over one buffer produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
  /// The buffer afterwards, newline terminated.
  pub text:    String,
  pub changed: bool,
  pub output:  String,
  pub errors:  String,
}

pub fn args(exec: &ExecOptions) -> Args {
  let args = Args::new(exec.args.iter().cloned().map(Arg::Str).collect());
  match exec.range {
    Some(range) => args.with_range(range),
    None => args,
  }
}

/// Run `command` over `source` with the cursor on the first line.
pub fn run_text(
  registry: &CommandRegistry,
  settings: &Settings,
  command: &str,
  args: &Args,
  source: &str,
) -> Result<Outcome, CommandError> {
  let mut host = ScratchHost::from_text(source);
  let before = host.buffer().to_vec();

  let mut ctx = Context::new(&mut host, settings);
  registry.execute(&mut ctx, command, args)?;

  Ok(Outcome {
    changed: host.buffer() != before.as_slice(),
    text:    host.text(),
    output:  host.output().to_string(),
    errors:  host.errors().to_string(),
  })
}

/// Run the command over each file in place, or over stdin to stdout when no
/// files are given. Returns the process exit code.
pub fn run(registry: &CommandRegistry, settings: &Settings, exec: &ExecOptions) -> Result<i32> {
  let args = args(exec);
  let stdout = io::stdout();
  let mut stdout = stdout.lock();
  let stderr = io::stderr();
  let mut stderr = stderr.lock();

  if exec.files.is_empty() {
    let mut source = String::new();
    io::stdin()
      .read_to_string(&mut source)
      .context("failed to read stdin")?;
    return match run_text(registry, settings, &exec.command, &args, &source) {
      Ok(outcome) => {
        stdout.write_all(outcome.text.as_bytes())?;
        stderr.write_all(outcome.output.as_bytes())?;
        stderr.write_all(outcome.errors.as_bytes())?;
        Ok(0)
      },
      Err(err) => {
        writeln!(stderr, "{}: {err}", exec.command)?;
        Ok(1)
      },
    };
  }

  let mut failed = false;
  for path in &exec.files {
    match run_file(registry, settings, &exec.command, &args, path) {
      Ok(outcome) => {
        stdout.write_all(outcome.output.as_bytes())?;
        stderr.write_all(outcome.errors.as_bytes())?;
      },
      Err(err) => {
        log::error!("{}: {err:#}", path.display());
        writeln!(stderr, "{}: {err:#}", path.display())?;
        failed = true;
      },
    }
  }
  Ok(if failed { 1 } else { 0 })
}

/// Run the command over `path`, writing the file back only if the buffer
/// changed.
pub fn run_file(
  registry: &CommandRegistry,
  settings: &Settings,
  command: &str,
  args: &Args,
  path: &Path,
) -> Result<Outcome> {
  let source =
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
  let outcome = run_text(registry, settings, command, args, &source)?;
  if outcome.changed {
    fs::write(path, &outcome.text)
      .with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("{command}: updated {}", path.display());
  } else {
    log::debug!("{command}: {} unchanged", path.display());
  }
  Ok(outcome)
}

#[cfg(test)]
mod test {
  use std::path::PathBuf;

  use misc_core::LineRange;

  use super::*;

  fn settings() -> Settings {
    Settings {
      python: PathBuf::from("/usr/local/bin/python"),
    }
  }

  #[test]
  fn test_args_from_options() {
    let exec = ExecOptions {
      command: "MoveTabpage".into(),
      range:   Some(LineRange::new(1, 2).unwrap()),
      args:    vec!["+1".into()],
      files:   Vec::new(),
    };
    let args = args(&exec);
    assert_eq!(args.first(), Some(&Arg::Str("+1".into())));
    assert_eq!(args.range(), exec.range);
  }

  #[test]
  fn test_run_text() {
    let registry = CommandRegistry::new();
    let outcome = run_text(
      &registry,
      &settings(),
      "DeleteEmptyLines",
      &Args::default(),
      "a\n\nb\n",
    )
    .unwrap();
    assert_eq!(outcome.text, "a\nb\n");
    assert!(outcome.changed);

    let outcome = run_text(
      &registry,
      &settings(),
      "ShowCurrentLineLength",
      &Args::default(),
      "  four  ",
    )
    .unwrap();
    assert!(!outcome.changed);
    assert_eq!(outcome.output, "4\n");
  }
}
