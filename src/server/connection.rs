use crate::{
    errors::ErrorKind,
    http::{
        request::Request,
        response::{default_headers, Response},
        types::StatusCode,
    },
    server::{router::Resolved, server_impl::Shared},
    HandlerError,
};
use std::{io, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};

// Time spent discarding unread input after an early error response, so that
// closing the socket does not reset the connection before the client has
// read the response.
const LINGER: Duration = Duration::from_millis(250);

/// Serves the single request of an accepted connection, then closes it.
pub(crate) async fn run(mut stream: TcpStream, peer: SocketAddr, shared: Arc<Shared>) {
    let limits = &shared.conn_limits;

    let request =
        Request::read_from(&mut stream, &shared.req_limits, limits.socket_read_timeout).await;

    let (response, linger) = match request {
        Ok(mut request) => (dispatch(&shared, &mut request, peer).await, false),
        Err(err) if err.is_transport() => {
            tracing::debug!(peer = %peer, error = %err, "Connection aborted");
            return;
        }
        Err(err) => {
            tracing::debug!(peer = %peer, error = %err, "Malformed request");
            (parse_error(&err), true)
        }
    };

    let written =
        write_response(&mut stream, response.as_bytes(), limits.socket_write_timeout).await;

    if let Err(err) = written {
        tracing::debug!(peer = %peer, error = %err, "Failed to write response");
        return;
    }

    if linger {
        let mut scratch = [0; 1024];
        let _ = timeout(LINGER, async {
            while let Ok(n) = stream.read(&mut scratch).await {
                if n == 0 {
                    break;
                }
            }
        })
        .await;
    }
}

async fn dispatch(shared: &Shared, request: &mut Request, peer: SocketAddr) -> Response {
    let mut response = Response::new();

    let route = match shared.router.resolve(request.method(), request.path()) {
        Resolved::Found(route) => route,
        Resolved::NotFound => {
            tracing::debug!(
                peer = %peer,
                method = request.method(),
                target = request.target(),
                "No route matched"
            );
            status_only(StatusCode::NOT_FOUND).write_to(&mut response);
            return response;
        }
        Resolved::MethodNotAllowed(allowed) => {
            tracing::debug!(
                peer = %peer,
                method = request.method(),
                target = request.target(),
                "Method not allowed"
            );
            method_not_allowed(&mut response, &allowed);
            return response;
        }
    };

    request.route = Some(route.pattern_arc());

    match route.call(&mut response, request).await {
        Ok(()) if response.is_empty() => {
            tracing::warn!(route = route.pattern(), "Handler returned without writing a response");
            status_only(StatusCode::INTERNAL_SERVER_ERROR).write_to(&mut response);
        }
        Ok(()) => response.finish(),
        Err(err) => {
            tracing::debug!(route = route.pattern(), error = %err, "Handler failed");
            response.clear();
            err.write_to(&mut response);
        }
    }

    tracing::debug!(
        peer = %peer,
        method = request.method(),
        target = request.target(),
        status = response.status().map(|s| s.as_u16()),
        "Request handled"
    );
    response
}

#[inline]
fn parse_error(err: &ErrorKind) -> Response {
    let mut response = Response::new();
    HandlerError::new(err.status(), err.to_string()).write_to(&mut response);
    response
}

#[inline]
fn status_only(status: StatusCode) -> HandlerError {
    HandlerError::new(status, status.reason())
}

fn method_not_allowed(response: &mut Response, allowed: &[String]) {
    let message = StatusCode::METHOD_NOT_ALLOWED.reason();
    let mut headers = default_headers(message.len());
    headers.append("Allow", allowed.join(", "));

    response
        .write_status_line(StatusCode::METHOD_NOT_ALLOWED)
        .write_headers(&headers)
        .write_body(message);
}

async fn write_response(
    stream: &mut TcpStream,
    bytes: &[u8],
    write_timeout: Option<Duration>,
) -> io::Result<()> {
    let write = async {
        stream.write_all(bytes).await?;
        stream.shutdown().await
    };

    match write_timeout {
        Some(time) => timeout(time, write)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "write timeout"))?,
        None => write.await,
    }
}
