//! Pretty-printing of XML buffers.
//!
//! The document is parsed into a small tree and written back one node per
//! line with two-space indentation. Elements holding a single text node stay
//! on one line, empty elements self-close.

use std::borrow::Cow;

use quick_xml::{
  Reader,
  events::{
    BytesStart,
    Event,
  },
};
use thiserror::Error;

use crate::text::normalize_self_closing_tag;

const INDENT: &str = "  ";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum XmlError {
  #[error("buffer is empty")]
  EmptyDocument,
  #[error("no element found")]
  MissingRoot,
  #[error("junk after document element at byte {position}")]
  TrailingContent { position: u64 },
  #[error("text outside of the document element at byte {position}")]
  TextOutsideRoot { position: u64 },
  #[error("unclosed element <{name}>")]
  Unclosed { name: String },
  #[error("syntax error at byte {position}: {message}")]
  Syntax { position: u64, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
  Element(Element),
  Text(String),
  CData(String),
  Comment(String),
  Instruction(String),
  DocType(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Element {
  name:       String,
  attributes: Vec<(String, String)>,
  children:   Vec<Node>,
}

/// Format the lines of an XML buffer.
///
/// Lines are trimmed first and whitespace between tags is dropped; text
/// inside an element is kept as written. A leading `<?xml` line and a following
/// `<!DOCTYPE` line are kept verbatim; the rest is joined, parsed and
/// re-indented. Nothing is returned unless the whole document parses.
pub fn format_xml<S: AsRef<str>>(lines: &[S]) -> Result<Vec<String>, XmlError> {
  if lines.is_empty() {
    return Err(XmlError::EmptyDocument);
  }

  let mut rest: Vec<&str> = lines.iter().map(|line| line.as_ref().trim()).collect();
  let mut preserved = Vec::new();
  if rest
    .first()
    .is_some_and(|line| line.to_lowercase().contains("<?xml"))
  {
    preserved.push(rest.remove(0).to_string());
  }
  if rest
    .first()
    .is_some_and(|line| line.to_uppercase().contains("<!DOCTYPE"))
  {
    preserved.push(rest.remove(0).to_string());
  }

  let nodes = parse(&rest.concat())?;
  let mut formatted = Vec::new();
  for node in &nodes {
    write_node(node, 0, &mut formatted);
  }
  while formatted.last().is_some_and(|line| line.trim().is_empty()) {
    formatted.pop();
  }

  preserved.extend(
    formatted
      .iter()
      .map(|line| normalize_self_closing_tag(line).into_owned()),
  );
  Ok(preserved)
}

fn syntax_error(reader: &Reader<&[u8]>, err: impl ToString) -> XmlError {
  XmlError::Syntax {
    position: reader.buffer_position() as u64,
    message:  err.to_string(),
  }
}

fn decode<'a>(reader: &Reader<&[u8]>, bytes: &'a [u8]) -> Result<&'a str, XmlError> {
  std::str::from_utf8(bytes).map_err(|err| syntax_error(reader, err))
}

fn element(reader: &Reader<&[u8]>, start: &BytesStart) -> Result<Element, XmlError> {
  let name = decode(reader, start.name().as_ref())?.to_string();
  let mut attributes = Vec::new();
  for attribute in start.attributes() {
    let attribute = attribute.map_err(|err| syntax_error(reader, err))?;
    let key = decode(reader, attribute.key.as_ref())?.to_string();
    let value = attribute
      .unescape_value()
      .map_err(|err| syntax_error(reader, err))?
      .into_owned();
    attributes.push((key, value));
  }
  Ok(Element {
    name,
    attributes,
    children: Vec::new(),
  })
}

/// Parse a whole document into its top-level nodes, exactly one of which is
/// an element.
fn parse(source: &str) -> Result<Vec<Node>, XmlError> {
  let mut reader = Reader::from_str(source);
  reader.config_mut().check_end_names = false;

  let mut top_level = Vec::new();
  let mut open: Vec<Element> = Vec::new();
  let mut seen_root = false;

  loop {
    let position = reader.buffer_position() as u64;
    let event = reader
      .read_event()
      .map_err(|err| syntax_error(&reader, err))?;

    let node = match event {
      Event::Eof => break,
      Event::Decl(_) => {
        if seen_root || !top_level.is_empty() {
          return Err(XmlError::Syntax {
            position,
            message: "XML declaration not at start of document".into(),
          });
        }
        continue;
      },
      Event::Start(start) => {
        if open.is_empty() && seen_root {
          return Err(XmlError::TrailingContent { position });
        }
        open.push(element(&reader, &start)?);
        continue;
      },
      Event::End(end) => {
        let end_name = end.name();
        let name = decode(&reader, end_name.as_ref())?;
        let Some(element) = open.pop() else {
          return Err(XmlError::Syntax {
            position,
            message: format!("unexpected closing tag </{name}>"),
          });
        };
        if element.name != name {
          return Err(XmlError::Syntax {
            position,
            message: format!("expected </{}>, found </{name}>", element.name),
          });
        }
        Node::Element(element)
      },
      Event::Empty(start) => {
        if open.is_empty() && seen_root {
          return Err(XmlError::TrailingContent { position });
        }
        Node::Element(element(&reader, &start)?)
      },
      Event::Text(text) => {
        let text = text
          .unescape()
          .map_err(|err| syntax_error(&reader, err))?;
        // whitespace between tags is layout, not content
        if text.trim().is_empty() {
          continue;
        }
        if open.is_empty() {
          return Err(XmlError::TextOutsideRoot { position });
        }
        Node::Text(text.into_owned())
      },
      Event::CData(data) => {
        if open.is_empty() {
          return Err(XmlError::TextOutsideRoot { position });
        }
        Node::CData(decode(&reader, &data)?.to_string())
      },
      Event::Comment(comment) => Node::Comment(decode(&reader, &comment)?.to_string()),
      Event::PI(instruction) => Node::Instruction(decode(&reader, &instruction)?.to_string()),
      Event::DocType(doctype) => {
        if seen_root || !open.is_empty() {
          return Err(XmlError::Syntax {
            position,
            message: "document type declaration inside the document".into(),
          });
        }
        Node::DocType(decode(&reader, &doctype)?.trim().to_string())
      },
    };

    match open.last_mut() {
      Some(parent) => parent.children.push(node),
      None => {
        if matches!(node, Node::Element(_)) {
          seen_root = true;
        }
        top_level.push(node);
      },
    }
  }

  if let Some(element) = open.pop() {
    return Err(XmlError::Unclosed { name: element.name });
  }
  if !seen_root {
    return Err(XmlError::MissingRoot);
  }
  Ok(top_level)
}

/// Escape markup characters, and line breaks and tabs as character
/// references so a value never spans lines.
fn escape(text: &str) -> Cow<'_, str> {
  if !text.contains(['&', '<', '>', '"', '\n', '\r', '\t']) {
    return Cow::Borrowed(text);
  }
  let mut escaped = String::with_capacity(text.len() + 8);
  for ch in text.chars() {
    match ch {
      '&' => escaped.push_str("&amp;"),
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      '"' => escaped.push_str("&quot;"),
      '\n' => escaped.push_str("&#10;"),
      '\r' => escaped.push_str("&#13;"),
      '\t' => escaped.push_str("&#9;"),
      ch => escaped.push(ch),
    }
  }
  Cow::Owned(escaped)
}

fn inline(node: &Node) -> Option<String> {
  match node {
    Node::Text(text) => Some(escape(text).into_owned()),
    Node::CData(data) => Some(format!("<![CDATA[{data}]]>")),
    _ => None,
  }
}

fn open_tag(element: &Element) -> String {
  let mut tag = format!("<{}", element.name);
  for (key, value) in &element.attributes {
    tag.push_str(&format!(" {key}=\"{}\"", escape(value)));
  }
  tag
}

fn write_node(node: &Node, depth: usize, out: &mut Vec<String>) {
  let indent = INDENT.repeat(depth);
  match node {
    Node::Element(element) => {
      let tag = open_tag(element);
      match element.children.as_slice() {
        [] => out.push(format!("{indent}{tag}/>")),
        [only] if inline(only).is_some() => {
          let body = inline(only).unwrap_or_default();
          out.push(format!("{indent}{tag}>{body}</{}>", element.name));
        },
        children => {
          out.push(format!("{indent}{tag}>"));
          for child in children {
            write_node(child, depth + 1, out);
          }
          out.push(format!("{indent}</{}>", element.name));
        },
      }
    },
    Node::Text(text) => out.push(format!("{indent}{}", escape(text.trim()))),
    Node::CData(data) => out.push(format!("{indent}<![CDATA[{data}]]>")),
    Node::Comment(comment) => out.push(format!("{indent}<!--{comment}-->")),
    Node::Instruction(instruction) => out.push(format!("{indent}<?{instruction}?>")),
    Node::DocType(doctype) => out.push(format!("{indent}<!DOCTYPE {doctype}>")),
  }
}
