use std::io::{
  BufRead,
  Write,
};

use thiserror::Error;

use crate::jsonrpc;

/// Both ends of a `Content-Length` framed JSON-RPC stream.
pub struct Transport<R, W> {
  reader: R,
  writer: W,
  line:   String,
  body:   Vec<u8>,
}

impl<R: BufRead, W: Write> Transport<R, W> {
  pub fn new(reader: R, writer: W) -> Self {
    Self {
      reader,
      writer,
      line: String::new(),
      body: Vec::new(),
    }
  }

  /// The next message, or `None` once the peer closed its end.
  pub fn recv(&mut self) -> Result<Option<jsonrpc::Message>, TransportError> {
    let message = read_frame(&mut self.reader, &mut self.line, &mut self.body)?;
    if let Some(message) = &message {
      log::trace!("<- {message:?}");
    }
    Ok(message)
  }

  pub fn send(&mut self, message: &jsonrpc::Message) -> Result<(), TransportError> {
    log::trace!("-> {message:?}");
    write_frame(&mut self.writer, message)
  }

  pub fn into_parts(self) -> (R, W) {
    (self.reader, self.writer)
  }
}

/// Consume header lines through the blank separator and return the body
/// length. Header names are matched case-insensitively; blank lines before
/// the first header are skipped.
fn read_header<R: BufRead>(reader: &mut R, line: &mut String) -> Result<Option<usize>, TransportError> {
  let mut content_length = None;
  loop {
    line.clear();
    if reader.read_line(line).map_err(TransportError::Read)? == 0 {
      return match content_length {
        None => Ok(None),
        Some(_) => Err(TransportError::TruncatedHeader),
      };
    }

    let header = line.trim_end_matches(['\r', '\n']);
    if header.is_empty() {
      match content_length {
        Some(length) => return Ok(Some(length)),
        None => continue,
      }
    }

    let Some((name, value)) = header.split_once(':') else {
      return Err(TransportError::MalformedHeader(header.to_string()));
    };
    if name.trim().eq_ignore_ascii_case("content-length") {
      let value = value.trim();
      let length = value
        .parse::<usize>()
        .map_err(|_| TransportError::InvalidContentLength(value.to_string()))?;
      content_length = Some(length);
    }
  }
}

/// Read one framed message. `line` and `body` are scratch space kept
/// between calls.
pub fn read_frame<R: BufRead>(
  reader: &mut R,
  line: &mut String,
  body: &mut Vec<u8>,
) -> Result<Option<jsonrpc::Message>, TransportError> {
  let Some(length) = read_header(reader, line)? else {
    return Ok(None);
  };
  body.resize(length, 0);
  reader.read_exact(body).map_err(TransportError::ReadBody)?;
  serde_json::from_slice(body)
    .map(Some)
    .map_err(TransportError::ParseJson)
}

/// Write `message` as a single frame and flush it.
pub fn write_frame<W: Write>(writer: &mut W, message: &jsonrpc::Message) -> Result<(), TransportError> {
  let body = serde_json::to_string(message).map_err(TransportError::SerializeJson)?;
  let frame = format!("Content-Length: {}\r\n\r\n{body}", body.len());
  writer
    .write_all(frame.as_bytes())
    .and_then(|()| writer.flush())
    .map_err(TransportError::Write)
}

#[derive(Debug, Error)]
pub enum TransportError {
  #[error("failed to read frame header: {0}")]
  Read(std::io::Error),
  #[error("malformed frame header: {0:?}")]
  MalformedHeader(String),
  #[error("invalid content-length header value: {0}")]
  InvalidContentLength(String),
  #[error("stream ended inside a frame header")]
  TruncatedHeader,
  #[error("failed to read frame body: {0}")]
  ReadBody(std::io::Error),
  #[error("failed to parse json-rpc message: {0}")]
  ParseJson(serde_json::Error),
  #[error("failed to serialize json-rpc message: {0}")]
  SerializeJson(serde_json::Error),
  #[error("failed to write frame: {0}")]
  Write(std::io::Error),
}
