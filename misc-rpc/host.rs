use std::{
  collections::VecDeque,
  io::{
    BufRead,
    Write,
  },
};

use misc_core::{
  Cursor,
  Host,
  HostError,
  LineRange,
  TabMove,
};
use serde::de::DeserializeOwned;
use serde_json::{
  Value,
  json,
};

use crate::{
  jsonrpc::{
    Id,
    Message,
  },
  transport::{
    Transport,
    TransportError,
  },
};

/// A [`Host`] answered by the editor on the other end of the transport.
///
/// Every call sends a request and blocks until the response with the same id
/// comes back. Requests and notifications the editor sends in the meantime
/// are queued and handed out by [`RpcHost::next_message`] afterwards.
pub struct RpcHost<R, W> {
  transport: Transport<R, W>,
  pending:   VecDeque<Message>,
  next_id:   u64,
}

impl<R: BufRead, W: Write> RpcHost<R, W> {
  pub fn new(transport: Transport<R, W>) -> Self {
    Self {
      transport,
      pending: VecDeque::new(),
      next_id: 1,
    }
  }

  /// Queued messages first, then whatever arrives next.
  pub fn next_message(&mut self) -> Result<Option<Message>, TransportError> {
    if let Some(message) = self.pending.pop_front() {
      return Ok(Some(message));
    }
    self.transport.recv()
  }

  pub fn send(&mut self, message: &Message) -> Result<(), TransportError> {
    self.transport.send(message)
  }

  pub fn pending(&self) -> usize {
    self.pending.len()
  }

  pub fn into_transport(self) -> Transport<R, W> {
    self.transport
  }

  fn call(&mut self, method: &str, params: Value) -> Result<Value, HostError> {
    let id = self.next_id;
    self.next_id += 1;
    self
      .transport
      .send(&Message::request(id, method, Some(params)))
      .map_err(transport_error)?;

    loop {
      let Some(message) = self.transport.recv().map_err(transport_error)? else {
        return Err(HostError::Transport(format!(
          "editor closed the connection while waiting for {method}"
        )));
      };
      match message {
        Message::Response(response) if response.id == Id::Number(id) => {
          return response.into_result().map_err(|error| {
            HostError::Request {
              method:  method.to_string(),
              message: error.message,
            }
          });
        },
        Message::Response(response) => {
          log::warn!("dropping response {} while waiting for {method}", response.id);
        },
        other => self.pending.push_back(other),
      }
    }
  }

  fn call_as<T: DeserializeOwned>(&mut self, method: &str, params: Value) -> Result<T, HostError> {
    let value = self.call(method, params)?;
    serde_json::from_value(value).map_err(|err| {
      HostError::Decode {
        method:  method.to_string(),
        message: err.to_string(),
      }
    })
  }

  fn call_unit(&mut self, method: &str, params: Value) -> Result<(), HostError> {
    self.call(method, params).map(|_| ())
  }
}

fn transport_error(err: TransportError) -> HostError {
  HostError::Transport(err.to_string())
}

impl<R: BufRead, W: Write> Host for RpcHost<R, W> {
  fn buffer_lines(&mut self) -> Result<Vec<String>, HostError> {
    self.call_as("nvim_buf_get_lines", json!([0, 0, -1, false]))
  }

  fn set_buffer_lines(&mut self, lines: Vec<String>) -> Result<(), HostError> {
    self.call_unit("nvim_buf_set_lines", json!([0, 0, -1, false, lines]))
  }

  fn lines(&mut self, range: LineRange) -> Result<Vec<String>, HostError> {
    self.call_as(
      "nvim_buf_get_lines",
      json!([0, range.start() - 1, range.end(), true]),
    )
  }

  fn set_lines(&mut self, range: LineRange, lines: Vec<String>) -> Result<(), HostError> {
    self.call_unit(
      "nvim_buf_set_lines",
      json!([0, range.start() - 1, range.end(), true, lines]),
    )
  }

  fn cursor(&mut self) -> Result<Cursor, HostError> {
    let (row, col): (usize, usize) = self.call_as("nvim_win_get_cursor", json!([0]))?;
    Ok(Cursor::new(row, col))
  }

  fn current_line(&mut self) -> Result<String, HostError> {
    self.call_as("nvim_get_current_line", json!([]))
  }

  fn out_write(&mut self, text: &str) -> Result<(), HostError> {
    self.call_unit("nvim_out_write", json!([text]))
  }

  fn err_write(&mut self, text: &str) -> Result<(), HostError> {
    self.call_unit("nvim_err_write", json!([text]))
  }

  fn tabpage_number(&mut self) -> Result<usize, HostError> {
    self.call_as("nvim_call_function", json!(["tabpagenr", []]))
  }

  fn tabpage_count(&mut self) -> Result<usize, HostError> {
    self.call_as("nvim_call_function", json!(["tabpagenr", ["$"]]))
  }

  fn move_tabpage(&mut self, to: TabMove) -> Result<(), HostError> {
    self.call_unit("nvim_command", json!([to.as_command()]))
  }

  fn command_output(&mut self, command: &str) -> Result<String, HostError> {
    self.call_as("nvim_command_output", json!([command]))
  }
}
