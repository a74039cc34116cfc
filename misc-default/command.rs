use std::path::PathBuf;

use misc_core::{
  LineRange,
  TabMove,
  text::{
    self,
    content_length,
    duplicate_in_line,
    parse_python_list,
    reverse_content,
    split_delimited,
    split_leading_spaces,
  },
};

use crate::command_registry::{
  Arg,
  Args,
  CommandError,
  CommandResult,
  Context,
};

/// Direction to move a tab page in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Left,
  Right,
}

/// Move one tab page in `direction`, jumping to the other end when already
/// at the edge. `current` is 1-indexed.
pub fn tab_move(direction: Direction, current: usize, total: usize) -> TabMove {
  match direction {
    Direction::Right if current >= total => TabMove::First,
    Direction::Right => TabMove::Next,
    Direction::Left if current <= 1 => TabMove::Last,
    Direction::Left => TabMove::Previous,
  }
}

/// The range the user gave, or the cursor line.
fn target_range(ctx: &mut Context<'_>, args: &Args) -> Result<LineRange, CommandError> {
  match args.range() {
    Some(range) => Ok(range),
    None => Ok(LineRange::line(ctx.host.cursor()?.row)?),
  }
}

fn map_range(ctx: &mut Context<'_>, args: &Args, f: impl Fn(&str) -> String) -> CommandResult {
  let range = target_range(ctx, args)?;
  let lines = ctx.host.lines(range)?;
  let lines = lines.iter().map(|line| f(line)).collect();
  ctx.host.set_lines(range, lines)?;
  Ok(())
}

/// Replace the whole buffer, skipping the write when nothing changed.
fn update_buffer(ctx: &mut Context<'_>, before: &[String], after: Vec<String>) -> CommandResult {
  if before != after.as_slice() {
    ctx.host.set_buffer_lines(after)?;
  }
  Ok(())
}

pub(crate) fn delete_empty_lines(ctx: &mut Context<'_>, _args: &Args) -> CommandResult {
  let lines = ctx.host.buffer_lines()?;
  let kept = lines
    .iter()
    .filter(|line| !line.is_empty())
    .cloned()
    .collect();
  update_buffer(ctx, &lines, kept)
}

pub(crate) fn reverse_line(ctx: &mut Context<'_>, _args: &Args) -> CommandResult {
  let line = ctx.host.current_line()?;
  let (_, content) = split_leading_spaces(&line);
  if content.is_empty() {
    return Ok(());
  }

  let row = ctx.host.cursor()?.row;
  ctx
    .host
    .set_lines(LineRange::line(row)?, vec![reverse_content(&line)])?;
  Ok(())
}

pub(crate) fn split_line(ctx: &mut Context<'_>, _args: &Args) -> CommandResult {
  let line = ctx.host.current_line()?;
  let (prefix, content) = split_leading_spaces(&line);
  let items = split_delimited(content);
  if items.is_empty() {
    return Ok(());
  }

  let lines = items
    .iter()
    .map(|item| format!("{prefix}{item},"))
    .collect();
  let row = ctx.host.cursor()?.row;
  ctx.host.set_lines(LineRange::line(row)?, lines)?;
  Ok(())
}

pub(crate) fn range_duplicate_in_line(ctx: &mut Context<'_>, args: &Args) -> CommandResult {
  map_range(ctx, args, duplicate_in_line)
}

pub(crate) fn range_reverse_lines(ctx: &mut Context<'_>, args: &Args) -> CommandResult {
  map_range(ctx, args, reverse_content)
}

pub(crate) fn trim_trailing_spaces(ctx: &mut Context<'_>, _args: &Args) -> CommandResult {
  let lines = ctx.host.buffer_lines()?;
  let trimmed = lines
    .iter()
    .map(|line| text::trim_trailing(line).to_string())
    .collect();
  update_buffer(ctx, &lines, trimmed)
}

pub(crate) fn range_trim_trailing_spaces(ctx: &mut Context<'_>, args: &Args) -> CommandResult {
  map_range(ctx, args, |line| text::trim_trailing(line).to_string())
}

pub(crate) fn show_current_line_length(ctx: &mut Context<'_>, _args: &Args) -> CommandResult {
  let line = ctx.host.current_line()?;
  ctx
    .host
    .out_write(&format!("{}\n", content_length(&line)))?;
  Ok(())
}

pub(crate) fn format_xml(ctx: &mut Context<'_>, _args: &Args) -> CommandResult {
  let lines = ctx.host.buffer_lines()?;
  let formatted = misc_core::format_xml(&lines)?;
  update_buffer(ctx, &lines, formatted)
}

fn move_tab(ctx: &mut Context<'_>, direction: Direction) -> CommandResult {
  let current = ctx.host.tabpage_number()?;
  let total = ctx.host.tabpage_count()?;
  let to = tab_move(direction, current, total);
  log::debug!("moving tab page {current}/{total}: {}", to.as_command());
  ctx.host.move_tabpage(to)?;
  Ok(())
}

/// `:MoveTabpage +1` / `:MoveTabpage -1`. Anything else is reported on the
/// error stream and leaves the tabs alone.
pub(crate) fn move_tabpage(ctx: &mut Context<'_>, args: &Args) -> CommandResult {
  let direction = match args.first() {
    Some(Arg::Str(arg)) if arg == "+1" => Some(Direction::Right),
    Some(Arg::Str(arg)) if arg == "-1" => Some(Direction::Left),
    _ => None,
  };

  match direction {
    Some(direction) => move_tab(ctx, direction),
    None => {
      log::warn!("MoveTabpage: invalid direction {:?}", args.first());
      ctx.host.err_write("need to be +1 or -1\n")?;
      Ok(())
    },
  }
}

/// `FuncMoveTabpage(1)` / `FuncMoveTabpage(-1)`.
pub(crate) fn func_move_tabpage(ctx: &mut Context<'_>, args: &Args) -> CommandResult {
  let value = match args.first() {
    Some(Arg::Int(value)) => Some(*value),
    Some(Arg::Str(value)) => value.trim().parse::<i64>().ok(),
    None => None,
  };

  match value {
    Some(1) => move_tab(ctx, Direction::Right),
    Some(-1) => move_tab(ctx, Direction::Left),
    _ => {
      log::warn!("FuncMoveTabpage: invalid direction {:?}", args.first());
      ctx.host.err_write("need to be 1 or -1\n")?;
      Ok(())
    },
  }
}

/// The interpreter whose search path `ShowSysPath` prints: the active
/// virtualenv's, or the configured one.
fn python_interpreter(ctx: &Context<'_>) -> PathBuf {
  match std::env::var_os("VIRTUAL_ENV") {
    Some(venv) if !venv.is_empty() => PathBuf::from(venv).join("bin").join("python"),
    _ => ctx.python().to_path_buf(),
  }
}

pub(crate) fn show_sys_path(ctx: &mut Context<'_>, _args: &Args) -> CommandResult {
  let python = python_interpreter(ctx);
  let command = format!(
    "!{} -c \"import sys;print(sys.path)\"",
    python.display()
  );
  let output = ctx.host.command_output(&command)?;
  log::info!("{output}");

  let listing = output
    .lines()
    .rev()
    .find(|line| !line.trim().is_empty())
    .unwrap_or_default();
  let paths = parse_python_list(listing).ok_or_else(|| {
    CommandError::new(format!(
      "unexpected output from {}: {listing}",
      python.display()
    ))
  })?;

  for path in paths {
    log::info!("{path}");
    ctx.host.out_write(&format!("{path}\n"))?;
  }
  Ok(())
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_tab_move_wraps() {
    assert_eq!(tab_move(Direction::Right, 1, 3), TabMove::Next);
    assert_eq!(tab_move(Direction::Right, 3, 3), TabMove::First);
    assert_eq!(tab_move(Direction::Left, 2, 3), TabMove::Previous);
    assert_eq!(tab_move(Direction::Left, 1, 3), TabMove::Last);
    assert_eq!(tab_move(Direction::Right, 1, 1), TabMove::First);
  }
}
