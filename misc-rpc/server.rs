use std::io::{
  BufRead,
  Write,
};

use misc_core::{
  Host,
  LineRange,
};
use misc_default::{
  Arg,
  Args,
  CommandRegistry,
  Settings,
};
use serde::Deserialize;
use serde_json::{
  Value,
  json,
};
use thiserror::Error;

use crate::{
  host::RpcHost,
  jsonrpc::{
    self,
    Message,
    Notification,
    Request,
    ResponseError,
  },
  transport::TransportError,
};

#[derive(Debug, Error)]
pub enum RpcError {
  #[error(transparent)]
  Transport(#[from] TransportError),
  #[error("invalid params: {0}")]
  InvalidParams(String),
}

/// What the editor sends along with a command invocation.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CommandParams {
  args:  Vec<Value>,
  range: Option<(usize, usize)>,
}

impl CommandParams {
  fn parse(params: Option<Value>) -> Result<Args, RpcError> {
    let params: Self = match params {
      None | Some(Value::Null) => Self::default(),
      Some(Value::Array(args)) => Self { args, range: None },
      Some(value) => {
        serde_json::from_value(value).map_err(|err| RpcError::InvalidParams(err.to_string()))?
      },
    };

    let positionals = params
      .args
      .into_iter()
      .map(|arg| {
        match arg {
          Value::String(value) => Ok(Arg::Str(value)),
          Value::Number(number) => {
            number
              .as_i64()
              .map(Arg::Int)
              .ok_or_else(|| RpcError::InvalidParams(format!("{number} is not an integer")))
          },
          other => Err(RpcError::InvalidParams(format!("unsupported argument {other}"))),
        }
      })
      .collect::<Result<Vec<_>, _>>()?;

    let mut args = Args::new(positionals);
    if let Some((start, end)) = params.range {
      let range =
        LineRange::new(start, end).map_err(|err| RpcError::InvalidParams(err.to_string()))?;
      args = args.with_range(range);
    }
    Ok(args)
  }
}

/// Serves command invocations from the editor until it hangs up.
pub struct Server<R, W> {
  host:     RpcHost<R, W>,
  registry: CommandRegistry,
  settings: Settings,
}

impl<R: BufRead, W: Write> Server<R, W> {
  pub fn new(host: RpcHost<R, W>, registry: CommandRegistry, settings: Settings) -> Self {
    Self {
      host,
      registry,
      settings,
    }
  }

  /// The registration manifest answered to `specs`.
  pub fn specs(&self) -> Value {
    let specs: Vec<Value> = self
      .registry
      .specs()
      .into_iter()
      .map(|spec| {
        let mut opts = serde_json::Map::new();
        if spec.range {
          opts.insert("range".into(), json!(""));
        }
        if spec.nargs != "0" {
          opts.insert("nargs".into(), json!(spec.nargs));
        }
        json!({
          "type": spec.kind.as_str(),
          "name": spec.name,
          "sync": spec.sync,
          "opts": opts,
        })
      })
      .collect();
    Value::Array(specs)
  }

  /// Handle messages until the editor closes the stream or sends `shutdown`.
  pub fn run(&mut self) -> Result<(), RpcError> {
    log::info!("serving {} commands", self.registry.all_commands().len());
    loop {
      let Some(message) = self.host.next_message()? else {
        log::info!("editor closed the connection");
        return Ok(());
      };

      match message {
        Message::Request(request) => {
          let response = self.handle_request(request);
          self.host.send(&response)?;
        },
        Message::Notification(notification) if notification.method == "shutdown" => {
          log::info!("shutdown requested");
          return Ok(());
        },
        Message::Notification(notification) => self.handle_notification(notification),
        Message::Response(response) => {
          log::warn!("ignoring unsolicited response {}", response.id);
        },
      }
    }
  }

  pub fn into_host(self) -> RpcHost<R, W> {
    self.host
  }

  fn handle_request(&mut self, request: Request) -> Message {
    let Request {
      id, method, params, ..
    } = request;
    let outcome = match method.as_str() {
      "specs" => Ok(self.specs()),
      "poll" => Ok(json!("ok")),
      _ if self.registry.get(&method).is_none() => {
        log::warn!("unknown method {method}");
        Err(ResponseError::method_not_found(&method))
      },
      _ => self.run_command(&method, params).map(|()| Value::Null),
    };
    Message::reply(id, outcome)
  }

  /// Notifications have nobody waiting for a reply, so failures go to the
  /// editor's error stream instead.
  fn handle_notification(&mut self, notification: Notification) {
    let Notification { method, params, .. } = notification;
    if self.registry.get(&method).is_none() {
      log::warn!("ignoring notification {method}");
      return;
    }
    if let Err(failure) = self.run_command(&method, params)
      && let Err(err) = self.host.err_write(&format!("{failure}\n"))
    {
      log::error!("failed to report error of {method}: {err}");
    }
  }

  fn run_command(&mut self, name: &str, params: Option<Value>) -> Result<(), ResponseError> {
    let args = CommandParams::parse(params).map_err(|err| {
      log::error!("{name}: {err}");
      ResponseError::new(jsonrpc::INVALID_PARAMS, err.to_string())
    })?;

    let mut ctx = misc_default::Context::new(&mut self.host, &self.settings);
    self
      .registry
      .execute(&mut ctx, name, &args)
      .map_err(|err| {
        log::error!("{name} failed: {err}");
        ResponseError::new(jsonrpc::COMMAND_FAILED, err.message)
      })
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_params() {
    let args = CommandParams::parse(Some(json!({"args": ["+1"], "range": [2, 4]}))).unwrap();
    assert_eq!(args.first(), Some(&Arg::Str("+1".into())));
    assert_eq!(args.range(), Some(LineRange::new(2, 4).unwrap()));

    let args = CommandParams::parse(Some(json!([-1]))).unwrap();
    assert_eq!(args.first(), Some(&Arg::Int(-1)));
    assert_eq!(args.range(), None);

    assert!(CommandParams::parse(None).unwrap().is_empty());
  }

  #[test]
  fn test_bad_params() {
    for params in [
      json!({"range": [3, 1]}),
      json!({"args": [1.5]}),
      json!({"args": [[]]}),
      json!({"bang": true}),
      json!("SplitLine"),
    ] {
      assert!(
        matches!(
          CommandParams::parse(Some(params.clone())),
          Err(RpcError::InvalidParams(_))
        ),
        "{params}"
      );
    }
  }
}
