//! JSON-RPC plumbing between the editor and the command registry.
//!
//! Messages travel over stdio in `Content-Length` frames. The editor sends
//! one request per command invocation; while a handler runs, [`RpcHost`]
//! calls back into the editor over the same pipe.

pub mod host;
pub mod jsonrpc;
pub mod server;
pub mod transport;

pub use host::RpcHost;
pub use server::{
  RpcError,
  Server,
};
pub use transport::{
  Transport,
  TransportError,
};
