use std::path::PathBuf;

use misc_core::{
  LineRange,
  ScratchHost,
};
use misc_default::{
  Arg,
  Args,
  CommandRegistry,
  CommandResult,
  Context,
  Settings,
};

fn settings() -> Settings {
  Settings {
    python: PathBuf::from("/usr/local/bin/python"),
  }
}

fn host(lines: &[&str]) -> ScratchHost {
  ScratchHost::new(lines.iter().map(|line| line.to_string()).collect())
}

fn run(host: &mut ScratchHost, name: &str, args: Args) -> CommandResult {
  let registry = CommandRegistry::new();
  let settings = settings();
  let mut ctx = Context::new(host, &settings);
  registry.execute(&mut ctx, name, &args)
}

fn run_ok(host: &mut ScratchHost, name: &str) {
  run(host, name, Args::default()).unwrap();
}

fn ranged(start: usize, end: usize) -> Args {
  Args::default().with_range(LineRange::new(start, end).unwrap())
}

fn str_arg(value: &str) -> Args {
  Args::new(vec![Arg::Str(value.to_string())])
}

#[test]
fn test_delete_empty_lines() {
  let mut host = host(&["a", "", "  ", "b", ""]);
  run_ok(&mut host, "DeleteEmptyLines");
  assert_eq!(host.buffer(), ["a", "  ", "b"]);

  // idempotent
  run_ok(&mut host, "DeleteEmptyLines");
  assert_eq!(host.buffer(), ["a", "  ", "b"]);
}

#[test]
fn test_delete_empty_lines_of_blank_buffer() {
  let mut host = host(&["", ""]);
  run_ok(&mut host, "DeleteEmptyLines");
  assert_eq!(host.buffer(), [""]);
}

#[test]
fn test_reverse_line() {
  let mut host = host(&["first", "  abc  ", "last"]).with_cursor(2, 0);
  run_ok(&mut host, "ReverseLine");
  assert_eq!(host.buffer(), ["first", "  cba", "last"]);
}

#[test]
fn test_reverse_blank_line_is_a_noop() {
  let mut host = host(&["   "]);
  run_ok(&mut host, "ReverseLine");
  assert_eq!(host.buffer(), ["   "]);
}

#[test]
fn test_split_line() {
  let mut host = host(&["before", "  1,2,3", "after"]).with_cursor(2, 4);
  run_ok(&mut host, "SplitLine");
  assert_eq!(
    host.buffer(),
    ["before", "  1,", "  2,", "  3,", "after"]
  );
}

#[test]
fn test_split_line_mixed_delimiters() {
  let mut host = host(&["a； b ，c; d"]);
  run_ok(&mut host, "SplitLine");
  assert_eq!(host.buffer(), ["a,", "b,", "c,", "d,"]);
}

#[test]
fn test_split_line_without_items_is_a_noop() {
  let mut host = host(&["  ", ",;"]);
  run_ok(&mut host, "SplitLine");
  assert_eq!(host.buffer(), ["  ", ",;"]);

  let mut host = host.with_cursor(2, 0);
  run_ok(&mut host, "SplitLine");
  assert_eq!(host.buffer(), ["  ", ",;"]);
}

#[test]
fn test_range_duplicate_in_line() {
  let mut host = host(&["x", "y", "z"]);
  run(&mut host, "RangeDuplicateInLine", ranged(1, 2)).unwrap();
  assert_eq!(host.buffer(), ["x x", "y y", "z"]);

  // not idempotent: the duplicated line is duplicated again
  run(&mut host, "RangeDuplicateInLine", ranged(1, 1)).unwrap();
  assert_eq!(host.buffer(), ["x x x x", "y y", "z"]);
}

#[test]
fn test_duplicate_in_line_defaults_to_cursor_line() {
  let mut host = host(&["x", "y"]).with_cursor(2, 0);
  run_ok(&mut host, "DuplicateInLine");
  assert_eq!(host.buffer(), ["x", "y y"]);
}

#[test]
fn test_range_reverse_lines() {
  let mut host = host(&["  ab", "cd", "   ", "ef"]);
  run(&mut host, "RangeReverseLines", ranged(1, 3)).unwrap();
  assert_eq!(host.buffer(), ["  ba", "dc", "   ", "ef"]);
}

#[test]
fn test_range_outside_buffer_fails() {
  let mut host = host(&["a"]);
  let err = run(&mut host, "RangeReverseLines", ranged(1, 5)).unwrap_err();
  assert_eq!(err.to_string(), "line 5 is outside the buffer (1 lines)");
  assert_eq!(host.buffer(), ["a"]);
}

#[test]
fn test_trim_trailing_spaces() {
  let mut host = host(&["a  ", "  b\t", "c"]);
  run_ok(&mut host, "TrimTrailingSpaces");
  assert_eq!(host.buffer(), ["a", "  b", "c"]);

  run_ok(&mut host, "TrimTrailingSpaces");
  assert_eq!(host.buffer(), ["a", "  b", "c"]);
}

#[test]
fn test_range_trim_trailing_spaces() {
  let mut host = host(&["a  ", "b  ", "c  "]);
  run(&mut host, "RangeTrimTrailingSpaces", ranged(2, 3)).unwrap();
  assert_eq!(host.buffer(), ["a  ", "b", "c"]);
}

#[test]
fn test_show_current_line_length() {
  let mut host = host(&["x", "  héllo wörld  "]).with_cursor(2, 0);
  run_ok(&mut host, "ShowCurrentLineLength");
  assert_eq!(host.output(), "11\n");
  assert_eq!(host.buffer(), ["x", "  héllo wörld  "]);
}

#[test]
fn test_format_xml() {
  let mut host = host(&[
    r#"<?xml version="1.0"?>"#,
    "<config>",
    r#"    <entry key="a"/>"#,
    "<entry key=\"b\">value</entry></config>",
  ]);
  run_ok(&mut host, "FormatXML");
  let formatted = host.buffer().to_vec();
  assert_eq!(
    formatted,
    [
      r#"<?xml version="1.0"?>"#,
      "<config>",
      r#"  <entry key="a" />"#,
      r#"  <entry key="b">value</entry>"#,
      "</config>",
    ]
  );

  // a second run changes nothing
  run_ok(&mut host, "FormatXML");
  assert_eq!(host.buffer(), formatted.as_slice());
}

#[test]
fn test_format_malformed_xml_leaves_buffer_alone() {
  let mut host = host(&["<a>", "<b>", "</a>"]);
  let err = run(&mut host, "FormatXML", Args::default()).unwrap_err();
  assert!(err.to_string().starts_with("invalid XML"));
  assert_eq!(host.buffer(), ["<a>", "<b>", "</a>"]);
}

#[test]
fn test_move_tabpage() {
  let mut host = ScratchHost::default().with_tabs(3, 1);
  run(&mut host, "MoveTabpage", str_arg("+1")).unwrap();
  assert_eq!(host.tabs(), &[2, 1, 3]);

  run(&mut host, "MoveTabpage", str_arg("-1")).unwrap();
  assert_eq!(host.tabs(), &[1, 2, 3]);

  // wraps from the first position to the end
  run(&mut host, "MoveTabpage", str_arg("-1")).unwrap();
  assert_eq!(host.tabs(), &[2, 3, 1]);

  // and from the last back to the start
  run(&mut host, "MoveTabpage", str_arg("+1")).unwrap();
  assert_eq!(host.tabs(), &[1, 2, 3]);
  assert!(host.errors().is_empty());
}

#[test]
fn test_move_tabpage_rejects_other_directions() {
  let mut host = ScratchHost::default().with_tabs(3, 2);
  for arg in ["0", "1", "+2", "right"] {
    run(&mut host, "MoveTabpage", str_arg(arg)).unwrap();
  }
  assert_eq!(host.tabs(), &[1, 2, 3]);
  assert_eq!(host.current_tab_id(), 2);
  assert_eq!(host.errors(), "need to be +1 or -1\n".repeat(4));
}

#[test]
fn test_func_move_tabpage() {
  let mut host = ScratchHost::default().with_tabs(2, 2);
  run(&mut host, "FuncMoveTabpage", Args::new(vec![Arg::Int(1)])).unwrap();
  assert_eq!(host.tabs(), &[2, 1]);

  run(&mut host, "FuncMoveTabpage", Args::new(vec![Arg::Int(-1)])).unwrap();
  assert_eq!(host.tabs(), &[1, 2]);

  run(&mut host, "FuncMoveTabpage", Args::new(vec![Arg::Int(0)])).unwrap();
  assert_eq!(host.tabs(), &[1, 2]);
  assert_eq!(host.errors(), "need to be 1 or -1\n");
}

#[test]
fn test_show_sys_path() {
  if std::env::var_os("VIRTUAL_ENV").is_some() {
    return;
  }
  let command = r#"!/usr/local/bin/python -c "import sys;print(sys.path)""#;
  let mut host = ScratchHost::default().with_command_output(
    command,
    format!("\n:{command}\n['', '/usr/lib/python312.zip', '/usr/lib/python3.12']\n"),
  );
  run_ok(&mut host, "ShowSysPath");
  assert_eq!(
    host.output(),
    "\n/usr/lib/python312.zip\n/usr/lib/python3.12\n"
  );
}

#[test]
fn test_show_sys_path_with_garbage_output() {
  if std::env::var_os("VIRTUAL_ENV").is_some() {
    return;
  }
  let command = r#"!/usr/local/bin/python -c "import sys;print(sys.path)""#;
  let mut host = ScratchHost::default()
    .with_command_output(command, "sh: /usr/local/bin/python: not found\n");
  let err = run(&mut host, "ShowSysPath", Args::default()).unwrap_err();
  assert!(err.to_string().starts_with("unexpected output from"));
  assert!(host.output().is_empty());
}
