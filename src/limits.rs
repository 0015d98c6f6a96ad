//! Server configuration: listener socket, connection timeouts and request
//! buffer sizes.
//!
//! Every structure has conservative defaults and is meant to be overridden
//! with struct update syntax.
//!
//! # Examples
//!
//! ```no_run
//! use tcp_to_http::{Server, limits::{ConnLimits, ReqLimits, ServerLimits}};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> std::io::Result<()> {
//! let server = Server::builder()
//!     .port(42069)
//!     .server_limits(ServerLimits {
//!         backlog: 4096,
//!         ..ServerLimits::default()
//!     })
//!     .connection_limits(ConnLimits {
//!         socket_read_timeout: Some(Duration::from_secs(5)),
//!         ..ConnLimits::default()
//!     })
//!     .request_limits(ReqLimits {
//!         max_buffer_size: 16 * 1024,
//!         ..ReqLimits::default()
//!     })
//!     .build();
//!
//! server.serve().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

/// Listener socket options.
///
/// The listening socket is created with [`socket2`] so that these options
/// are applied before `listen(2)`.
#[derive(Debug, Clone)]
pub struct ServerLimits {
    /// Maximum length of the pending connection queue (default: `1024`).
    pub backlog: u32,

    /// Sets `SO_REUSEADDR` on the listening socket (default: `true`).
    ///
    /// Lets the server rebind a port that still has connections in
    /// `TIME_WAIT` after a restart.
    pub reuse_address: bool,

    /// Sets `TCP_NODELAY` on every accepted connection (default: `true`).
    pub nodelay: bool,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            backlog: 1024,
            reuse_address: true,
            nodelay: true,

            _priv: (),
        }
    }
}

/// Per-connection timeouts.
///
/// Both are disabled by default: a connection task waits on its peer for as
/// long as the peer keeps the socket open. An expired timeout aborts the
/// connection as a transport error, without a response.
#[derive(Debug, Clone, Default)]
pub struct ConnLimits {
    /// Maximum time a single socket read may wait for data (default: `None`).
    pub socket_read_timeout: Option<Duration>,

    /// Maximum time the response write may take (default: `None`).
    pub socket_write_timeout: Option<Duration>,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

/// Request read buffer sizing and request size limits.
///
/// The parser consumes complete lines and body bytes as they arrive, so the
/// buffer only ever holds one partial line (or partial body segment) plus
/// whatever the last read delivered. It starts at `buffer_size` bytes and
/// doubles whenever it fills up with unconsumed data, up to
/// `max_buffer_size`. A line that does not fit is rejected with
/// `400 Bad Request`.
///
/// What the parser keeps is bounded separately: the number of distinct
/// header fields, the length of each (merged) field value, and the declared
/// body length. Exceeding a header limit is answered with
/// `431 Request Header Fields Too Large`, an oversized body with
/// `413 Payload Too Large`.
#[derive(Debug, Clone)]
pub struct ReqLimits {
    /// Initial read buffer capacity in bytes (default: `1024 B`).
    pub buffer_size: usize,

    /// Upper bound for the read buffer in bytes (default: `64 KB`).
    pub max_buffer_size: usize,

    /// Maximum number of distinct header fields (default: `64`).
    ///
    /// Repeated fields are merged and count once.
    pub header_count: usize,

    /// Maximum length of a header value in bytes, after merging repeated
    /// fields (default: `8 KB`).
    pub header_value_size: usize,

    /// Maximum `Content-Length` accepted (default: `1 MB`).
    ///
    /// Checked against the declared length, before any body byte is read.
    pub body_size: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ReqLimits {
    fn default() -> Self {
        Self {
            buffer_size: 1024,
            max_buffer_size: 64 * 1024,

            header_count: 64,
            header_value_size: 8 * 1024,
            body_size: 1024 * 1024,

            _priv: (),
        }
    }
}

impl ReqLimits {
    // A zero-sized buffer would never make progress.
    #[inline]
    pub(crate) fn normalized(mut self) -> Self {
        self.buffer_size = self.buffer_size.max(1);
        self.max_buffer_size = self.max_buffer_size.max(self.buffer_size);
        self
    }
}
