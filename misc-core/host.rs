//! What the commands may ask of the editor they run in.
//!
//! Commands never own the buffer. They read and replace lines, inspect the
//! cursor and tab page, and write messages through a [`Host`]. The RPC crate
//! provides a host backed by a running editor; [`ScratchHost`] keeps
//! everything in memory and backs batch mode and the tests.

use std::{
  collections::HashMap,
  ops::Range,
  process::Command,
};

use thiserror::Error;

/// Contiguous span of buffer lines, 1-indexed and inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRange {
  start: usize,
  end:   usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RangeError {
  #[error("line numbers start at 1")]
  ZeroLine,
  #[error("range start {start} is after its end {end}")]
  Reversed { start: usize, end: usize },
}

impl LineRange {
  pub fn new(start: usize, end: usize) -> Result<Self, RangeError> {
    if start == 0 {
      return Err(RangeError::ZeroLine);
    }
    if start > end {
      return Err(RangeError::Reversed { start, end });
    }
    Ok(Self { start, end })
  }

  /// The single line `row`.
  pub fn line(row: usize) -> Result<Self, RangeError> {
    Self::new(row, row)
  }

  pub fn start(&self) -> usize {
    self.start
  }

  pub fn end(&self) -> usize {
    self.end
  }

  /// 0-indexed, end-exclusive indices into a line vector.
  pub fn indices(&self) -> Range<usize> {
    self.start - 1..self.end
  }
}

/// Cursor position: `row` is 1-indexed, `col` is a 0-indexed byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
  pub row: usize,
  pub col: usize,
}

impl Cursor {
  pub fn new(row: usize, col: usize) -> Self {
    Self { row, col }
  }
}

/// Where to move the current tab page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabMove {
  Next,
  Previous,
  First,
  Last,
}

impl TabMove {
  /// The ex command performing this move.
  pub fn as_command(&self) -> &'static str {
    match self {
      Self::Next => "tabmove +1",
      Self::Previous => "tabmove -1",
      Self::First => "tabmove 0",
      Self::Last => "tabmove $",
    }
  }
}

#[derive(Debug, Error)]
pub enum HostError {
  #[error(transparent)]
  Range(#[from] RangeError),
  #[error("line {line} is outside the buffer ({len} lines)")]
  OutOfBounds { line: usize, len: usize },
  #[error("{method} failed: {message}")]
  Request { method: String, message: String },
  #[error("unexpected reply to {method}: {message}")]
  Decode { method: String, message: String },
  #[error("lost connection to the editor: {0}")]
  Transport(String),
}

/// Capabilities the editor exposes to a command.
pub trait Host {
  /// Every line of the current buffer.
  fn buffer_lines(&mut self) -> Result<Vec<String>, HostError>;

  /// Replace the whole current buffer.
  fn set_buffer_lines(&mut self, lines: Vec<String>) -> Result<(), HostError>;

  fn lines(&mut self, range: LineRange) -> Result<Vec<String>, HostError>;

  /// Replace the lines in `range` with `lines`, which may differ in count.
  fn set_lines(&mut self, range: LineRange, lines: Vec<String>) -> Result<(), HostError>;

  fn cursor(&mut self) -> Result<Cursor, HostError>;

  /// The line under the cursor.
  fn current_line(&mut self) -> Result<String, HostError> {
    let cursor = self.cursor()?;
    let mut lines = self.lines(LineRange::line(cursor.row)?)?;
    Ok(lines.pop().unwrap_or_default())
  }

  fn out_write(&mut self, text: &str) -> Result<(), HostError>;

  fn err_write(&mut self, text: &str) -> Result<(), HostError>;

  /// 1-indexed number of the current tab page.
  fn tabpage_number(&mut self) -> Result<usize, HostError>;

  fn tabpage_count(&mut self) -> Result<usize, HostError>;

  fn move_tabpage(&mut self, to: TabMove) -> Result<(), HostError>;

  /// Run an ex command and capture what it prints.
  fn command_output(&mut self, command: &str) -> Result<String, HostError>;
}

/// In-memory host: a single buffer, a row of tab pages and captured output.
///
/// `:!cmd` commands without a canned output are run through `sh -c`.
#[derive(Debug, Clone)]
pub struct ScratchHost {
  lines:           Vec<String>,
  cursor:          Cursor,
  tabs:            Vec<usize>,
  current_tab:     usize,
  output:          String,
  errors:          String,
  command_outputs: HashMap<String, String>,
}

impl ScratchHost {
  pub fn new(lines: Vec<String>) -> Self {
    let mut host = Self {
      lines:           Vec::new(),
      cursor:          Cursor::new(1, 0),
      tabs:            vec![1],
      current_tab:     0,
      output:          String::new(),
      errors:          String::new(),
      command_outputs: HashMap::new(),
    };
    host.replace_all(lines);
    host
  }

  /// Split `text` into lines the way an editor loads a file: one trailing
  /// newline does not start an extra line.
  pub fn from_text(text: &str) -> Self {
    let text = text.strip_suffix('\n').unwrap_or(text);
    let lines = text
      .split('\n')
      .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
      .collect();
    Self::new(lines)
  }

  pub fn with_cursor(mut self, row: usize, col: usize) -> Self {
    self.cursor = Cursor::new(row, col);
    self
  }

  /// Open `count` tab pages numbered `1..=count` and focus tab `current`
  /// (1-indexed).
  pub fn with_tabs(mut self, count: usize, current: usize) -> Self {
    self.tabs = (1..=count.max(1)).collect();
    self.current_tab = current.clamp(1, self.tabs.len()) - 1;
    self
  }

  pub fn with_command_output(mut self, command: impl Into<String>, output: impl Into<String>) -> Self {
    self.command_outputs.insert(command.into(), output.into());
    self
  }

  pub fn text(&self) -> String {
    let mut text = self.lines.join("\n");
    text.push('\n');
    text
  }

  pub fn buffer(&self) -> &[String] {
    &self.lines
  }

  /// Tab page ids in display order.
  pub fn tabs(&self) -> &[usize] {
    &self.tabs
  }

  pub fn current_tab_id(&self) -> usize {
    self.tabs[self.current_tab]
  }

  pub fn output(&self) -> &str {
    &self.output
  }

  pub fn errors(&self) -> &str {
    &self.errors
  }

  fn replace_all(&mut self, lines: Vec<String>) {
    self.lines = lines;
    if self.lines.is_empty() {
      self.lines.push(String::new());
    }
  }

  fn check_range(&self, range: LineRange) -> Result<(), HostError> {
    if range.end() > self.lines.len() {
      return Err(HostError::OutOfBounds {
        line: range.end(),
        len:  self.lines.len(),
      });
    }
    Ok(())
  }

  fn run_shell(&self, command: &str) -> Result<String, HostError> {
    log::debug!("running shell command: {command}");
    let output = Command::new("sh")
      .arg("-c")
      .arg(command)
      .output()
      .map_err(|err| {
        HostError::Request {
          method:  "command_output".into(),
          message: format!("failed to run `{command}`: {err}"),
        }
      })?;
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(format!(":!{command}\n{text}"))
  }
}

impl Default for ScratchHost {
  fn default() -> Self {
    Self::new(Vec::new())
  }
}

impl Host for ScratchHost {
  fn buffer_lines(&mut self) -> Result<Vec<String>, HostError> {
    Ok(self.lines.clone())
  }

  fn set_buffer_lines(&mut self, lines: Vec<String>) -> Result<(), HostError> {
    self.replace_all(lines);
    self.cursor.row = self.cursor.row.min(self.lines.len());
    Ok(())
  }

  fn lines(&mut self, range: LineRange) -> Result<Vec<String>, HostError> {
    self.check_range(range)?;
    Ok(self.lines[range.indices()].to_vec())
  }

  fn set_lines(&mut self, range: LineRange, lines: Vec<String>) -> Result<(), HostError> {
    self.check_range(range)?;
    self.lines.splice(range.indices(), lines);
    if self.lines.is_empty() {
      self.lines.push(String::new());
    }
    self.cursor.row = self.cursor.row.min(self.lines.len());
    Ok(())
  }

  fn cursor(&mut self) -> Result<Cursor, HostError> {
    Ok(self.cursor)
  }

  fn out_write(&mut self, text: &str) -> Result<(), HostError> {
    self.output.push_str(text);
    Ok(())
  }

  fn err_write(&mut self, text: &str) -> Result<(), HostError> {
    self.errors.push_str(text);
    Ok(())
  }

  fn tabpage_number(&mut self) -> Result<usize, HostError> {
    Ok(self.current_tab + 1)
  }

  fn tabpage_count(&mut self) -> Result<usize, HostError> {
    Ok(self.tabs.len())
  }

  fn move_tabpage(&mut self, to: TabMove) -> Result<(), HostError> {
    let last = self.tabs.len() - 1;
    let target = match to {
      TabMove::Next => (self.current_tab + 1).min(last),
      TabMove::Previous => self.current_tab.saturating_sub(1),
      TabMove::First => 0,
      TabMove::Last => last,
    };
    let tab = self.tabs.remove(self.current_tab);
    self.tabs.insert(target, tab);
    self.current_tab = target;
    Ok(())
  }

  fn command_output(&mut self, command: &str) -> Result<String, HostError> {
    if let Some(output) = self.command_outputs.get(command) {
      return Ok(output.clone());
    }
    match command.strip_prefix('!') {
      Some(shell) => self.run_shell(shell),
      None => {
        Err(HostError::Request {
          method:  "command_output".into(),
          message: format!("unsupported command `{command}`"),
        })
      },
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
  }

  #[test]
  fn test_line_range() {
    let range = LineRange::new(2, 4).unwrap();
    assert_eq!((range.start(), range.end()), (2, 4));
    assert_eq!(range.indices(), 1..4);
    assert_eq!(LineRange::new(0, 1), Err(RangeError::ZeroLine));
    assert_eq!(
      LineRange::new(3, 2),
      Err(RangeError::Reversed { start: 3, end: 2 })
    );
  }

  #[test]
  fn test_from_text_drops_final_newline() {
    let host = ScratchHost::from_text("a\r\nb\n");
    assert_eq!(host.buffer(), lines(&["a", "b"]).as_slice());
    assert_eq!(host.text(), "a\nb\n");

    let empty = ScratchHost::from_text("");
    assert_eq!(empty.buffer(), lines(&[""]).as_slice());
  }

  #[test]
  fn test_set_lines_splices_range() {
    let mut host = ScratchHost::new(lines(&["a", "b", "c"]));
    host
      .set_lines(LineRange::line(2).unwrap(), lines(&["x", "y"]))
      .unwrap();
    assert_eq!(host.buffer(), lines(&["a", "x", "y", "c"]).as_slice());

    let err = host
      .lines(LineRange::new(3, 9).unwrap())
      .unwrap_err();
    assert!(matches!(err, HostError::OutOfBounds { line: 9, len: 4 }));
  }

  #[test]
  fn test_current_line_follows_cursor() {
    let mut host = ScratchHost::new(lines(&["a", "b"])).with_cursor(2, 0);
    assert_eq!(host.current_line().unwrap(), "b");
  }

  #[test]
  fn test_move_tabpage() {
    let mut host = ScratchHost::default().with_tabs(3, 2);
    host.move_tabpage(TabMove::Next).unwrap();
    assert_eq!(host.tabs(), &[1, 3, 2]);
    assert_eq!(host.tabpage_number().unwrap(), 3);

    host.move_tabpage(TabMove::First).unwrap();
    assert_eq!(host.tabs(), &[2, 1, 3]);
    assert_eq!(host.current_tab_id(), 2);

    host.move_tabpage(TabMove::Last).unwrap();
    assert_eq!(host.tabs(), &[1, 3, 2]);
    assert_eq!(host.tabpage_number().unwrap(), 3);
  }

  #[test]
  fn test_canned_command_output() {
    let mut host = ScratchHost::default().with_command_output("!true", "done");
    assert_eq!(host.command_output("!true").unwrap(), "done");
    assert!(host.command_output("version").is_err());
  }
}
