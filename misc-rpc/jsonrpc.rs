//! JSON-RPC 2.0 messages exchanged with the editor.

use std::fmt;

use serde::{
  Deserialize,
  Serialize,
};
use serde_json::Value;
use thiserror::Error;

/// A handler ran and failed.
pub const COMMAND_FAILED: i64 = -32000;
pub const INVALID_PARAMS: i64 = -32602;
pub const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Version {
  #[default]
  #[serde(rename = "2.0")]
  V2,
}

/// Request ids are echoed back verbatim, whichever form the editor picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
  Number(u64),
  String(String),
}

impl fmt::Display for Id {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Number(id) => write!(f, "#{id}"),
      Self::String(id) => write!(f, "{id:?}"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
  #[serde(default)]
  pub jsonrpc: Version,
  pub id:      Id,
  pub method:  String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub params:  Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
  #[serde(default)]
  pub jsonrpc: Version,
  pub method:  String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub params:  Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ResponseError {
  pub code:    i64,
  pub message: String,
}

impl ResponseError {
  pub fn new(code: i64, message: impl Into<String>) -> Self {
    Self {
      code,
      message: message.into(),
    }
  }

  pub fn method_not_found(method: &str) -> Self {
    Self::new(METHOD_NOT_FOUND, format!("method not found: {method}"))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
  #[serde(default)]
  pub jsonrpc: Version,
  pub id:      Id,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub result:  Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error:   Option<ResponseError>,
}

impl Response {
  pub fn is_error(&self) -> bool {
    self.error.is_some()
  }

  /// A missing result reads as `null`, which is what a unit call returns.
  pub fn into_result(self) -> Result<Value, ResponseError> {
    match self.error {
      Some(error) => Err(error),
      None => Ok(self.result.unwrap_or(Value::Null)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
  Request(Request),
  Notification(Notification),
  Response(Response),
}

impl Message {
  pub fn request(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
    Self::Request(Request {
      jsonrpc: Version::V2,
      id:      Id::Number(id),
      method:  method.into(),
      params,
    })
  }

  pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
    Self::Notification(Notification {
      jsonrpc: Version::V2,
      method:  method.into(),
      params,
    })
  }

  pub fn reply(id: Id, outcome: Result<Value, ResponseError>) -> Self {
    let (result, error) = match outcome {
      Ok(value) => (Some(value), None),
      Err(error) => (None, Some(error)),
    };
    Self::Response(Response {
      jsonrpc: Version::V2,
      id,
      result,
      error,
    })
  }

  pub fn id(&self) -> Option<&Id> {
    match self {
      Self::Request(request) => Some(&request.id),
      Self::Response(response) => Some(&response.id),
      Self::Notification(_) => None,
    }
  }
}
