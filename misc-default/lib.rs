//! The editor commands and the table that maps their names to handlers.
//!
//! Handlers only see the editor through [`misc_core::Host`], so the same
//! registry serves a live editor over RPC and files edited in batch mode.

mod command;
mod command_registry;

pub use command::{
  Direction,
  tab_move,
};
pub use command_registry::{
  Arg,
  Args,
  CommandError,
  CommandFn,
  CommandKind,
  CommandRegistry,
  CommandResult,
  CommandSpec,
  Context,
  Settings,
  Signature,
  TypableCommand,
};
