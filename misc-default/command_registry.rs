use std::{
  collections::{
    HashMap,
    HashSet,
  },
  fmt,
  path::{
    Path,
    PathBuf,
  },
  sync::Arc,
};

use misc_core::{
  Host,
  HostError,
  LineRange,
  RangeError,
  XmlError,
};

use crate::command;

pub type CommandFn = fn(&mut Context<'_>, &Args) -> CommandResult;

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, Clone)]
pub struct CommandError {
  pub message: String,
}

impl fmt::Display for CommandError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.message)
  }
}

impl std::error::Error for CommandError {}

impl CommandError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

impl From<HostError> for CommandError {
  fn from(err: HostError) -> Self {
    Self::new(err.to_string())
  }
}

impl From<RangeError> for CommandError {
  fn from(err: RangeError) -> Self {
    Self::new(err.to_string())
  }
}

impl From<XmlError> for CommandError {
  fn from(err: XmlError) -> Self {
    Self::new(format!("invalid XML: {err}"))
  }
}

/// Settings handlers read besides the editor state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
  /// Interpreter queried by `ShowSysPath` outside a virtualenv.
  pub python: PathBuf,
}

/// Everything a handler gets to work with during one invocation.
pub struct Context<'a> {
  pub host:     &'a mut dyn Host,
  pub settings: &'a Settings,
}

impl<'a> Context<'a> {
  pub fn new(host: &'a mut dyn Host, settings: &'a Settings) -> Self {
    Self { host, settings }
  }

  pub fn python(&self) -> &Path {
    &self.settings.python
  }
}

/// A positional argument as the editor sends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
  Int(i64),
  Str(String),
}

impl fmt::Display for Arg {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Int(value) => write!(f, "{value}"),
      Self::Str(value) => write!(f, "{value}"),
    }
  }
}

/// Arguments of one invocation: the positionals and, for ranged commands,
/// the line range the user gave.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
  positionals: Vec<Arg>,
  range:       Option<LineRange>,
}

impl Args {
  pub fn new(positionals: Vec<Arg>) -> Self {
    Self {
      positionals,
      range: None,
    }
  }

  pub fn with_range(mut self, range: LineRange) -> Self {
    self.range = Some(range);
    self
  }

  pub fn len(&self) -> usize {
    self.positionals.len()
  }

  pub fn is_empty(&self) -> bool {
    self.positionals.is_empty()
  }

  pub fn first(&self) -> Option<&Arg> {
    self.positionals.first()
  }

  pub fn get(&self, index: usize) -> Option<&Arg> {
    self.positionals.get(index)
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Arg> {
    self.positionals.iter()
  }

  pub fn range(&self) -> Option<LineRange> {
    self.range
  }
}

/// How the editor exposes a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
  /// An ex command, `:Name`.
  Command,
  /// A function, `Name(...)`.
  Function,
}

impl CommandKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Command => "command",
      Self::Function => "function",
    }
  }
}

/// The arguments a handler accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
  /// The minimum and (optionally) maximum number of positional arguments.
  pub positionals: (usize, Option<usize>),
  /// Whether the handler works on a line range. Ranged handlers fall back to
  /// the cursor line when no range is given.
  pub range:       bool,
}

impl Signature {
  pub const DEFAULT: Self = Self {
    positionals: (0, Some(0)),
    range:       false,
  };

  fn check_positionals(&self, name: &str, count: usize) -> CommandResult {
    let (min, max) = self.positionals;
    let expected = match max {
      Some(max) if min == max => format!("exactly {min}"),
      Some(max) => format!("{min} to {max}"),
      None => format!("at least {min}"),
    };
    if count < min || max.is_some_and(|max| count > max) {
      return Err(CommandError::new(format!(
        "{name} takes {expected} argument(s), got {count}"
      )));
    }
    Ok(())
  }
}

#[derive(Clone)]
pub struct TypableCommand {
  pub name:      &'static str,
  pub aliases:   &'static [&'static str],
  pub doc:       &'static str,
  pub kind:      CommandKind,
  pub fun:       CommandFn,
  pub signature: Signature,
}

impl TypableCommand {
  pub const fn new(
    name: &'static str,
    aliases: &'static [&'static str],
    doc: &'static str,
    kind: CommandKind,
    fun: CommandFn,
    signature: Signature,
  ) -> Self {
    Self {
      name,
      aliases,
      doc,
      kind,
      fun,
      signature,
    }
  }

  pub fn execute(&self, ctx: &mut Context<'_>, args: &Args) -> CommandResult {
    (self.fun)(ctx, args)
  }

  /// `nargs` as the editor spells it: `0`, `1`, `?`, `*` or `+`.
  pub fn nargs(&self) -> &'static str {
    match self.signature.positionals {
      (0, Some(0)) => "0",
      (1, Some(1)) => "1",
      (0, Some(1)) => "?",
      (0, _) => "*",
      _ => "+",
    }
  }

  pub fn generate_doc(&self) -> String {
    use std::fmt::Write;

    let mut doc = String::new();
    let prefix = match self.kind {
      CommandKind::Command => ":",
      CommandKind::Function => "",
    };

    writeln!(doc, "{prefix}{} - {}", self.name, self.doc).unwrap();
    if !self.aliases.is_empty() {
      writeln!(doc, "Aliases: {}", self.aliases.join(", ")).unwrap();
    }
    if self.signature.range {
      writeln!(doc, "Range: defaults to the cursor line").unwrap();
    }
    match self.signature.positionals {
      (0, Some(0)) => {},
      (1, Some(1)) => writeln!(doc, "Arguments: <arg> (required)").unwrap(),
      (min, Some(max)) => writeln!(doc, "Arguments: {min}-{max}").unwrap(),
      (min, None) => writeln!(doc, "Arguments: {min} or more").unwrap(),
    }

    doc
  }
}

impl fmt::Debug for TypableCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TypableCommand")
      .field("name", &self.name)
      .field("aliases", &self.aliases)
      .field("kind", &self.kind)
      .field("signature", &self.signature)
      .finish()
  }
}

/// How a registered name is declared to the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
  pub kind:  CommandKind,
  pub name:  String,
  /// Whether the editor waits for the handler to finish.
  pub sync:  bool,
  pub range: bool,
  pub nargs: &'static str,
}

/// Name → handler table, filled with every built-in at construction.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
  commands: HashMap<String, Arc<TypableCommand>>,
}

impl Default for CommandRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl CommandRegistry {
  pub fn new() -> Self {
    let mut registry = Self::empty();
    registry.register_builtin_commands();
    registry
  }

  pub fn empty() -> Self {
    Self {
      commands: HashMap::new(),
    }
  }

  pub fn register(&mut self, command: TypableCommand) {
    let cmd = Arc::new(command);
    self.commands.insert(cmd.name.to_string(), cmd.clone());
    for alias in cmd.aliases {
      self.commands.insert(alias.to_string(), cmd.clone());
    }
  }

  pub fn get(&self, name: &str) -> Option<&TypableCommand> {
    self.commands.get(name).map(|cmd| cmd.as_ref())
  }

  /// Check `args` against the command's signature and run it.
  pub fn execute(&self, ctx: &mut Context<'_>, name: &str, args: &Args) -> CommandResult {
    let Some(command) = self.get(name) else {
      return Err(CommandError::new(format!("command not found: {name}")));
    };

    command.signature.check_positionals(name, args.len())?;
    if args.range().is_some() && !command.signature.range {
      return Err(CommandError::new(format!("{name} does not accept a range")));
    }

    log::debug!("running {name} with {args:?}");
    command.execute(ctx, args)
  }

  /// Every registered name, aliases included, sorted.
  pub fn command_names(&self) -> Vec<&str> {
    let mut names: Vec<_> = self.commands.keys().map(String::as_str).collect();
    names.sort();
    names
  }

  /// One registration entry per name, aliases included, for the editor to
  /// declare the commands with.
  pub fn specs(&self) -> Vec<CommandSpec> {
    self
      .command_names()
      .into_iter()
      .filter_map(|name| {
        let command = self.get(name)?;
        Some(CommandSpec {
          kind:  command.kind,
          name:  name.to_string(),
          sync:  true,
          range: command.signature.range,
          nargs: command.nargs(),
        })
      })
      .collect()
  }

  pub fn all_commands(&self) -> Vec<Arc<TypableCommand>> {
    let mut seen = HashSet::new();
    let mut commands: Vec<_> = self
      .commands
      .values()
      .filter(|cmd| seen.insert(cmd.name))
      .cloned()
      .collect();
    commands.sort_by(|a, b| a.name.cmp(b.name));
    commands
  }

  fn register_builtin_commands(&mut self) {
    const RANGED: Signature = Signature {
      range: true,
      ..Signature::DEFAULT
    };
    const ONE_ARG: Signature = Signature {
      positionals: (1, Some(1)),
      ..Signature::DEFAULT
    };

    self.register(TypableCommand::new(
      "DeleteEmptyLines",
      &[],
      "Delete every empty line of the buffer",
      CommandKind::Command,
      command::delete_empty_lines,
      Signature::DEFAULT,
    ));

    self.register(TypableCommand::new(
      "ReverseLine",
      &[],
      "Reverse the content of the cursor line, keeping its indentation",
      CommandKind::Command,
      command::reverse_line,
      Signature::DEFAULT,
    ));

    self.register(TypableCommand::new(
      "SplitLine",
      &[],
      "Split the cursor line on commas and semicolons, one item per line",
      CommandKind::Command,
      command::split_line,
      Signature::DEFAULT,
    ));

    self.register(TypableCommand::new(
      "RangeDuplicateInLine",
      &["DuplicateInLine"],
      "Repeat each line of the range after itself, separated by a space",
      CommandKind::Command,
      command::range_duplicate_in_line,
      RANGED,
    ));

    self.register(TypableCommand::new(
      "RangeReverseLines",
      &[],
      "Reverse the content of each line in the range",
      CommandKind::Command,
      command::range_reverse_lines,
      RANGED,
    ));

    self.register(TypableCommand::new(
      "TrimTrailingSpaces",
      &[],
      "Strip trailing whitespace from every line of the buffer",
      CommandKind::Command,
      command::trim_trailing_spaces,
      Signature::DEFAULT,
    ));

    self.register(TypableCommand::new(
      "RangeTrimTrailingSpaces",
      &[],
      "Strip trailing whitespace from each line in the range",
      CommandKind::Command,
      command::range_trim_trailing_spaces,
      RANGED,
    ));

    self.register(TypableCommand::new(
      "ShowCurrentLineLength",
      &[],
      "Print the length of the cursor line without surrounding whitespace",
      CommandKind::Command,
      command::show_current_line_length,
      Signature::DEFAULT,
    ));

    self.register(TypableCommand::new(
      "FormatXML",
      &[],
      "Pretty-print the buffer as XML with two-space indentation",
      CommandKind::Command,
      command::format_xml,
      Signature::DEFAULT,
    ));

    self.register(TypableCommand::new(
      "MoveTabpage",
      &[],
      "Move the current tab page by +1 or -1, wrapping around",
      CommandKind::Command,
      command::move_tabpage,
      ONE_ARG,
    ));

    self.register(TypableCommand::new(
      "FuncMoveTabpage",
      &[],
      "Move the current tab page by 1 or -1, wrapping around",
      CommandKind::Function,
      command::func_move_tabpage,
      ONE_ARG,
    ));

    self.register(TypableCommand::new(
      "ShowSysPath",
      &[],
      "Print the module search path of the Python interpreter",
      CommandKind::Command,
      command::show_sys_path,
      Signature::DEFAULT,
    ));
  }
}

#[cfg(test)]
mod test {
  use misc_core::ScratchHost;

  use super::*;

  fn settings() -> Settings {
    Settings {
      python: PathBuf::from("/usr/bin/python3"),
    }
  }

  #[test]
  fn test_builtin_names() {
    let registry = CommandRegistry::new();
    assert_eq!(
      registry.command_names(),
      [
        "DeleteEmptyLines",
        "DuplicateInLine",
        "FormatXML",
        "FuncMoveTabpage",
        "MoveTabpage",
        "RangeDuplicateInLine",
        "RangeReverseLines",
        "RangeTrimTrailingSpaces",
        "ReverseLine",
        "ShowCurrentLineLength",
        "ShowSysPath",
        "SplitLine",
        "TrimTrailingSpaces",
      ]
    );
    assert_eq!(registry.all_commands().len(), 12);
    assert_eq!(
      registry.get("DuplicateInLine").unwrap().name,
      "RangeDuplicateInLine"
    );
  }

  #[test]
  fn test_signatures() {
    let registry = CommandRegistry::new();
    let move_tab = registry.get("MoveTabpage").unwrap();
    assert_eq!(move_tab.nargs(), "1");
    assert!(!move_tab.signature.range);
    assert_eq!(
      registry.get("FuncMoveTabpage").unwrap().kind,
      CommandKind::Function
    );
    assert!(registry.get("RangeReverseLines").unwrap().signature.range);
    assert_eq!(registry.get("FormatXML").unwrap().nargs(), "0");
  }

  #[test]
  fn test_unknown_command() {
    let registry = CommandRegistry::new();
    let settings = settings();
    let mut host = ScratchHost::default();
    let mut ctx = Context::new(&mut host, &settings);
    let err = registry
      .execute(&mut ctx, "NoSuchThing", &Args::default())
      .unwrap_err();
    assert_eq!(err.to_string(), "command not found: NoSuchThing");
  }

  #[test]
  fn test_argument_count_is_checked() {
    let registry = CommandRegistry::new();
    let settings = settings();
    let mut host = ScratchHost::default().with_tabs(3, 1);
    let mut ctx = Context::new(&mut host, &settings);

    let err = registry
      .execute(&mut ctx, "MoveTabpage", &Args::default())
      .unwrap_err();
    assert_eq!(
      err.to_string(),
      "MoveTabpage takes exactly 1 argument(s), got 0"
    );

    let err = registry
      .execute(
        &mut ctx,
        "TrimTrailingSpaces",
        &Args::new(vec![Arg::Str("x".into())]),
      )
      .unwrap_err();
    assert_eq!(
      err.to_string(),
      "TrimTrailingSpaces takes exactly 0 argument(s), got 1"
    );
  }

  #[test]
  fn test_range_only_for_ranged_commands() {
    let registry = CommandRegistry::new();
    let settings = settings();
    let mut host = ScratchHost::default();
    let mut ctx = Context::new(&mut host, &settings);
    let args = Args::default().with_range(LineRange::line(1).unwrap());
    assert!(registry.execute(&mut ctx, "ReverseLine", &args).is_err());
    assert!(registry.execute(&mut ctx, "RangeReverseLines", &args).is_ok());
  }

  #[test]
  fn test_specs_cover_aliases() {
    let registry = CommandRegistry::new();
    let specs = registry.specs();
    assert_eq!(specs.len(), 13);

    let alias = specs
      .iter()
      .find(|spec| spec.name == "DuplicateInLine")
      .unwrap();
    assert!(alias.range);
    assert_eq!(alias.nargs, "0");

    let func = specs
      .iter()
      .find(|spec| spec.name == "FuncMoveTabpage")
      .unwrap();
    assert_eq!(func.kind, CommandKind::Function);
    assert_eq!(func.nargs, "1");
  }

  #[test]
  fn test_generate_doc() {
    let registry = CommandRegistry::new();
    let doc = registry.get("RangeDuplicateInLine").unwrap().generate_doc();
    assert!(doc.starts_with(":RangeDuplicateInLine - "));
    assert!(doc.contains("Aliases: DuplicateInLine"));
    assert!(doc.contains("Range: defaults to the cursor line"));

    let doc = registry.get("FuncMoveTabpage").unwrap().generate_doc();
    assert!(doc.starts_with("FuncMoveTabpage - "));
    assert!(doc.contains("Arguments: <arg> (required)"));
  }
}
