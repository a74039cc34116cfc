//! Line and string transformations shared by the editor commands, plus the
//! capability interface the commands use to talk to the editor.

pub mod host;
pub mod text;
pub mod xml;

pub use host::{
  Cursor,
  Host,
  HostError,
  LineRange,
  RangeError,
  ScratchHost,
  TabMove,
};
pub use xml::{
  XmlError,
  format_xml,
};
