use crate::{
    http::{
        request::Request,
        response::{default_headers, Response},
        types::StatusCode,
    },
    limits::{ConnLimits, ReqLimits, ServerLimits},
    server::{connection, router::Router},
};
use socket2::{Domain, Protocol, Socket, Type};
use std::{
    future::Future,
    io,
    net::{Ipv4Addr, SocketAddr},
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
};
use thiserror::Error;
use tokio::{net::TcpListener, sync::Notify, task::JoinHandle};

/// A trait for handling HTTP requests.
///
/// A handler receives an empty [`Response`] and the parsed [`Request`]. It
/// either writes a complete response and returns `Ok(())`, or returns a
/// [`HandlerError`]; in that case everything it wrote is discarded and the
/// client gets a plain-text response with the error's status and message.
///
/// Plain functions and closures with the signature
/// `Fn(&mut Response, &Request) -> HandlerResult` are handlers too.
///
/// # Examples
///
/// ```
/// use tcp_to_http::{default_headers, Handler, HandlerError, Request, Response, StatusCode};
///
/// struct Echo;
///
/// impl Handler for Echo {
///     async fn handle(&self, resp: &mut Response, req: &Request) -> Result<(), HandlerError> {
///         if req.body().is_empty() {
///             return Err(HandlerError::bad_request("nothing to echo"));
///         }
///
///         resp.write_status_line(StatusCode::OK)
///             .write_headers(&default_headers(req.body().len()))
///             .write_body(req.body());
///         Ok(())
///     }
/// }
/// ```
pub trait Handler
where
    Self: Sync + Send + 'static,
{
    /// Processes a request, writing the response into `response`.
    ///
    /// # Errors
    ///
    /// A returned [`HandlerError`] replaces whatever was written to
    /// `response`. Panics terminate the connection without a response.
    fn handle(
        &self,
        response: &mut Response,
        request: &Request,
    ) -> impl Future<Output = HandlerResult> + Send;
}

impl<F> Handler for F
where
    F: Fn(&mut Response, &Request) -> HandlerResult + Sync + Send + 'static,
{
    #[inline]
    fn handle(
        &self,
        response: &mut Response,
        request: &Request,
    ) -> impl Future<Output = HandlerResult> + Send {
        std::future::ready(self(response, request))
    }
}

/// Return type of [`Handler::handle`].
pub type HandlerResult = Result<(), HandlerError>;

type HandlerFuture<'a> = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'a>>;

// Object-safe form of `Handler`, so routes can store different handler types.
pub(crate) trait ErasedHandler: Sync + Send + 'static {
    fn call<'a>(&'a self, response: &'a mut Response, request: &'a Request) -> HandlerFuture<'a>;
}

impl<H: Handler> ErasedHandler for H {
    #[inline]
    fn call<'a>(&'a self, response: &'a mut Response, request: &'a Request) -> HandlerFuture<'a> {
        Box::pin(self.handle(response, request))
    }
}

/// A handler failure, sent to the client as a plain-text response.
///
/// # Examples
/// ```
/// use tcp_to_http::{HandlerError, StatusCode};
///
/// let err = HandlerError::new(StatusCode::INTERNAL_SERVER_ERROR, "Woopsie, my bad\n");
/// assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
/// assert_eq!(err.to_string(), "500 Internal Server Error: Woopsie, my bad\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {message}")]
pub struct HandlerError {
    pub status: StatusCode,
    pub message: String,
}

impl HandlerError {
    #[inline]
    pub fn new<M: Into<String>>(status: StatusCode, message: M) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    #[inline]
    pub fn bad_request<M: Into<String>>(message: M) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    #[inline]
    pub fn not_found<M: Into<String>>(message: M) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    #[inline]
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Writes the error as a complete response: status line,
    /// [`default_headers`] and the message as the body.
    #[track_caller]
    pub fn write_to(&self, response: &mut Response) {
        response
            .write_status_line(self.status)
            .write_headers(&default_headers(self.message.len()))
            .write_body(&self.message);
    }
}

//

/// A routed HTTP/1.1 server.
///
/// Every accepted connection runs in its own task and serves exactly one
/// request: parse, route, call the handler, write the response, close.
/// Malformed requests get `400 Bad Request` with the parse error as the
/// body, unknown paths `404 Not Found` and known paths with the wrong method
/// `405 Method Not Allowed`.
///
/// # Examples
///
/// ```no_run
/// use tcp_to_http::{default_headers, HandlerResult, Request, Response, Server, StatusCode};
///
/// fn hello(resp: &mut Response, _: &Request) -> HandlerResult {
///     resp.write_status_line(StatusCode::OK)
///         .write_headers(&default_headers(12))
///         .write_body("Hello World!");
///     Ok(())
/// }
///
/// #[tokio::main]
/// async fn main() -> std::io::Result<()> {
///     let server = Server::new(42069);
///     server.get("/", hello);
///
///     let addr = server.serve().await?;
///     println!("listening on {addr}");
///
///     tokio::signal::ctrl_c().await?;
///     server.close().await
/// }
/// ```
pub struct Server {
    shared: Arc<Shared>,
    address: SocketAddr,
    running: Mutex<Option<Running>>,
}

pub(crate) struct Shared {
    pub(crate) router: Router,
    pub(crate) closed: AtomicBool,

    pub(crate) server_limits: ServerLimits,
    pub(crate) conn_limits: ConnLimits,
    pub(crate) req_limits: ReqLimits,
}

struct Running {
    local_addr: SocketAddr,
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl Server {
    /// A server listening on all interfaces at `port`, with default limits.
    #[inline]
    pub fn new(port: u16) -> Self {
        Self::builder().port(port).build()
    }

    /// Creates a new builder for configuring the server instance.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tcp_to_http::{Server, limits::ServerLimits};
    ///
    /// let server = Server::builder()
    ///     .address("127.0.0.1:8080".parse().unwrap())
    ///     .server_limits(ServerLimits {
    ///         backlog: 4096,
    ///         ..ServerLimits::default() // Required line
    ///     })
    ///     .build();
    /// ```
    #[inline]
    pub fn builder() -> ServerBuilder {
        ServerBuilder {
            address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            server_limits: None,
            connection_limits: None,
            request_limits: None,
        }
    }

    /// Registers `handler` for `method` requests matching `pattern`.
    ///
    /// See [`Router`] for the pattern syntax. Routes may be added while the
    /// server is running.
    #[inline]
    pub fn register_route<H: Handler>(&self, method: &str, pattern: &str, handler: H) {
        self.shared.router.register(method, pattern, handler);
    }

    #[inline]
    pub fn get<H: Handler>(&self, pattern: &str, handler: H) {
        self.register_route("GET", pattern, handler);
    }

    #[inline]
    pub fn post<H: Handler>(&self, pattern: &str, handler: H) {
        self.register_route("POST", pattern, handler);
    }

    #[inline]
    pub fn router(&self) -> &Router {
        &self.shared.router
    }

    /// Address the server is bound to, once [`serve`](Server::serve) has
    /// succeeded and until [`close`](Server::close).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|running| running.local_addr)
    }

    /// Binds the listening socket and starts accepting connections in a
    /// background task. Returns the bound address without waiting for any
    /// connection.
    ///
    /// # Errors
    ///
    /// Fails if the socket cannot be bound, or with
    /// [`io::ErrorKind::AlreadyExists`] if the server is already serving.
    pub async fn serve(&self) -> io::Result<SocketAddr> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "server is already serving",
            ));
        }

        let listener = bind(self.address, &self.shared.server_limits)?;
        let local_addr = listener.local_addr()?;
        let shutdown = Arc::new(Notify::new());

        self.shared.closed.store(false, Ordering::Release);
        let task = tokio::spawn(accept_loop(
            listener,
            self.shared.clone(),
            shutdown.clone(),
        ));

        tracing::info!(address = %local_addr, routes = self.shared.router.len(), "Server listening");

        *running = Some(Running {
            local_addr,
            shutdown,
            task,
        });
        Ok(local_addr)
    }

    /// Stops accepting connections and closes the listening socket.
    ///
    /// Waits for the accept loop to finish; connections already accepted are
    /// left to complete on their own. Does nothing if the server is not
    /// serving.
    pub async fn close(&self) -> io::Result<()> {
        self.shared.closed.store(true, Ordering::Release);

        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(running) = running else {
            return Ok(());
        };

        running.shutdown.notify_one();
        running.task.await.map_err(io::Error::other)?;

        tracing::info!(address = %running.local_addr, "Server stopped");
        Ok(())
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

fn bind(address: SocketAddr, limits: &ServerLimits) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))?;

    socket.set_reuse_address(limits.reuse_address)?;
    socket.set_nonblocking(true)?;
    socket.bind(&address.into())?;
    socket.listen(i32::try_from(limits.backlog).unwrap_or(i32::MAX))?;

    TcpListener::from_std(socket.into())
}

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>, shutdown: Arc<Notify>) {
    loop {
        let accepted = tokio::select! {
            biased;

            _ = shutdown.notified() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer)) => {
                if shared.server_limits.nodelay {
                    if let Err(err) = stream.set_nodelay(true) {
                        tracing::debug!(peer = %peer, error = %err, "Failed to set TCP_NODELAY");
                    }
                }

                tokio::spawn(connection::run(stream, peer, shared.clone()));
            }
            Err(_) if shared.closed.load(Ordering::Acquire) => break,
            Err(err) => tracing::error!(error = %err, "Error accepting connection"),
        }
    }
}

//

/// Builder for configuring and creating [`Server`] instances.
#[derive(Debug, Clone)]
pub struct ServerBuilder {
    address: SocketAddr,

    server_limits: Option<ServerLimits>,
    connection_limits: Option<ConnLimits>,
    request_limits: Option<ReqLimits>,
}

impl ServerBuilder {
    /// Sets the address to listen on (default: `0.0.0.0:0`).
    ///
    /// Port `0` picks a free port; [`Server::serve`] returns the one chosen.
    #[inline(always)]
    pub fn address(mut self, address: SocketAddr) -> Self {
        self.address = address;
        self
    }

    /// Sets only the port, keeping the address's IP.
    #[inline(always)]
    pub fn port(mut self, port: u16) -> Self {
        self.address.set_port(port);
        self
    }

    /// Configures the listening socket.
    #[inline(always)]
    pub fn server_limits(mut self, limits: ServerLimits) -> Self {
        self.server_limits = Some(limits);
        self
    }

    /// Configures per-connection timeouts.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tcp_to_http::{Server, limits::ConnLimits};
    /// use std::time::Duration;
    ///
    /// let server = Server::builder()
    ///     .port(8080)
    ///     .connection_limits(ConnLimits {
    ///         socket_read_timeout: Some(Duration::from_secs(5)),
    ///         socket_write_timeout: Some(Duration::from_secs(2)),
    ///         ..ConnLimits::default() // Required line
    ///     })
    ///     .build();
    /// ```
    #[inline(always)]
    pub fn connection_limits(mut self, limits: ConnLimits) -> Self {
        self.connection_limits = Some(limits);
        self
    }

    /// Configures the request read buffer.
    #[inline(always)]
    pub fn request_limits(mut self, limits: ReqLimits) -> Self {
        self.request_limits = Some(limits);
        self
    }

    /// Finalizes the builder. The socket is not bound until
    /// [`Server::serve`].
    #[inline]
    pub fn build(self) -> Server {
        Server {
            shared: Arc::new(Shared {
                router: Router::new(),
                closed: AtomicBool::new(false),

                server_limits: self.server_limits.unwrap_or_default(),
                conn_limits: self.connection_limits.unwrap_or_default(),
                req_limits: self.request_limits.unwrap_or_default().normalized(),
            }),
            address: self.address,
            running: Mutex::new(None),
        }
    }
}

#[cfg(test)]
mod handler_tests {
    use super::*;
    use crate::tools::*;

    struct Teapot;

    impl Handler for Teapot {
        async fn handle(&self, resp: &mut Response, _: &Request) -> HandlerResult {
            tokio::task::yield_now().await;
            resp.write_status_line(StatusCode::IM_A_TEAPOT)
                .write_headers(&default_headers(0));
            Ok(())
        }
    }

    fn failing(resp: &mut Response, _: &Request) -> HandlerResult {
        resp.write_status_line(StatusCode::OK);
        Err(HandlerError::internal("Woopsie, my bad\n"))
    }

    #[tokio::test]
    async fn erased() {
        let handlers: [(Arc<dyn ErasedHandler>, &str); 3] = [
            (Arc::new(Teapot), "HTTP/1.1 418 I'm a teapot\r\n"),
            (Arc::new(failing), "HTTP/1.1 200 OK\r\n"),
            (
                Arc::new(|resp: &mut Response, req: &Request| -> HandlerResult {
                    resp.write_status_line(StatusCode::from_u16(req.body().len() as u16));
                    Ok(())
                }),
                "HTTP/1.1 0 Unknown Status\r\n",
            ),
        ];

        for (handler, start) in handlers {
            let mut resp = Response::new();
            let _ = handler.call(&mut resp, &Request::new()).await;
            assert!(str_op(resp.as_bytes()).starts_with(start));
        }
    }

    #[test]
    fn error_write_to() {
        #[rustfmt::skip]
        let cases = [
            (HandlerError::bad_request("no count \n"),    "HTTP/1.1 400 Bad Request\r\n",           "no count \n"),
            (HandlerError::not_found(""),                 "HTTP/1.1 404 Not Found\r\n",             ""),
            (HandlerError::internal("Woopsie, my bad\n"), "HTTP/1.1 500 Internal Server Error\r\n", "Woopsie, my bad\n"),
        ];

        for (err, line, body) in cases {
            let mut resp = Response::new();
            err.write_to(&mut resp);

            assert_eq!(
                str_op(resp.as_bytes()),
                format!(
                    "{line}content-length: {}\r\nconnection: close\r\ncontent-type: text/plain\r\n\r\n{body}",
                    body.len()
                )
            );
        }
    }
}
