//! tcp_to_http - HTTP/1.1 built directly on TCP streams
//!
//! A small HTTP/1.1 server written from the byte stream up: an incremental
//! request parser, a response writer with chunked framing and trailers, a
//! method and path router, and a connection server that runs every
//! connection in its own task.
//!
//! # Protocol Support
//!
//! - **HTTP/1.1** requests with `Content-Length` bodies
//! - Fixed-length and chunked responses, with trailer fields
//! - One request per connection: every response is followed by a close
//!
//! # Components
//!
//! - [`Headers`] - case-insensitive header collection, parsed incrementally
//! - [`Request`] - request parser state machine, fed from any
//!   [`AsyncRead`](tokio::io::AsyncRead)
//! - [`Response`] - response writer
//! - [`Router`] - `(method, pattern)` routing table with `:wildcard` segments
//! - [`Server`] - accepts connections and dispatches them to [`Handler`]s
//!
//! # Examples
//!
//! Quick start:
//! ```no_run
//! use tcp_to_http::{default_headers, HandlerResult, Request, Response, Server, StatusCode};
//!
//! fn hello(resp: &mut Response, _: &Request) -> HandlerResult {
//!     resp.write_status_line(StatusCode::OK)
//!         .write_headers(&default_headers(12))
//!         .write_body("Hello World!");
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let server = Server::new(42069);
//!     server.get("/", hello);
//!     server.serve().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.close().await
//! }
//! ```
//! Wildcards, handler errors and streaming:
//! ```no_run
//! use tcp_to_http::{
//!     default_headers, Handler, HandlerError, HandlerResult, Headers, Request, Response, Server,
//!     StatusCode,
//! };
//!
//! struct Countdown;
//!
//! impl Handler for Countdown {
//!     async fn handle(&self, resp: &mut Response, req: &Request) -> HandlerResult {
//!         let from: u32 = req
//!             .param("from")
//!             .and_then(|n| n.parse().ok())
//!             .ok_or_else(|| HandlerError::bad_request("from must be a number\n"))?;
//!
//!         let mut headers = default_headers(0);
//!         headers.remove("Content-Length");
//!         headers.replace("Transfer-Encoding", "chunked");
//!
//!         resp.write_status_line(StatusCode::OK).write_headers(&headers);
//!         for n in (0..=from).rev() {
//!             resp.write_chunk(format!("{n}\n"));
//!         }
//!         resp.write_chunked_body_done().write_trailers(&Headers::new());
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let server = Server::new(42069);
//!     server.get("/countdown/:from", Countdown);
//!     server.serve().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.close().await
//! }
//! ```
//! Advanced configuration:
//! ```no_run
//! use tcp_to_http::{Server, limits::{ConnLimits, ReqLimits, ServerLimits}};
//! use std::time::Duration;
//!
//! let server = Server::builder()
//!     .address("127.0.0.1:8080".parse().unwrap())
//!     .server_limits(ServerLimits {
//!         backlog: 4096,
//!         ..ServerLimits::default()
//!     })
//!     .connection_limits(ConnLimits {
//!         socket_read_timeout: Some(Duration::from_secs(5)),
//!         ..ConnLimits::default()
//!     })
//!     .request_limits(ReqLimits {
//!         max_buffer_size: 16 * 1024, // Longest accepted line
//!         ..ReqLimits::default()
//!     })
//!     .build();
//! ```
//!
//! # Logging
//!
//! The crate reports through [`tracing`]: route registration and listener
//! start/stop at `info`, accept failures at `error`, per-connection events at
//! `debug`. Install a subscriber to see them.

pub(crate) mod http {
    pub(crate) mod headers;
    pub(crate) mod request;
    pub(crate) mod response;
    pub(crate) mod types;
}
pub(crate) mod server {
    pub(crate) mod connection;
    pub(crate) mod router;
    pub(crate) mod server_impl;
}
pub(crate) mod errors;
pub mod limits;

pub use crate::{
    errors::{ErrorKind, IoError},
    http::{
        headers::Headers,
        request::{ParserState, Request, RequestLine},
        response::{default_headers, Response},
        types::StatusCode,
    },
    server::{
        router::{Resolved, Route, Router},
        server_impl::{Handler, HandlerError, HandlerResult, Server, ServerBuilder},
    },
};
