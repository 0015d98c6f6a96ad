//! Demo server.
//!
//! ```text
//! cargo run --example httpserver -- --port 42069 --video assets/vim.mp4
//! curl -v --raw http://localhost:42069/stream/5
//! ```

use clap::Parser;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tcp_to_http::{
    default_headers, Handler, HandlerError, HandlerResult, Headers, Request, Response, Server,
    StatusCode,
};
use tokio::io::AsyncReadExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "httpserver")]
#[command(about = "HTTP/1.1 demo server built on tcp_to_http", long_about = None)]
struct Cli {
    #[arg(short, long, default_value_t = 42069)]
    port: u16,

    /// File served by `GET /video`
    #[arg(long, default_value = "assets/vim.mp4")]
    video: PathBuf,
}

const SUCCESS: &str = "<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>
";

const MAX_STREAM_LINES: usize = 100;

// Responses are buffered whole before they are sent
const MAX_VIDEO_SIZE: u64 = 64 * 1024 * 1024;

fn chunked_headers(content_type: &str) -> Headers {
    let mut headers = default_headers(0);
    headers.remove("Content-Length");
    headers.replace("Transfer-Encoding", "chunked");
    headers.replace("Content-Type", content_type);
    headers
}

fn index(resp: &mut Response, _: &Request) -> HandlerResult {
    let mut headers = default_headers(SUCCESS.len());
    headers.replace("Content-Type", "text/html");

    resp.write_status_line(StatusCode::OK)
        .write_headers(&headers)
        .write_body(SUCCESS);
    Ok(())
}

fn your_problem(_: &mut Response, _: &Request) -> HandlerResult {
    Err(HandlerError::bad_request("Your problem is not my problem\n"))
}

fn my_problem(_: &mut Response, _: &Request) -> HandlerResult {
    Err(HandlerError::internal("Woopsie, my bad\n"))
}

fn echo(resp: &mut Response, req: &Request) -> HandlerResult {
    if req.body().is_empty() {
        return Err(HandlerError::bad_request("nothing to echo\n"));
    }

    let mut headers = default_headers(req.body().len());
    if let Some(content_type) = req.header("content-type") {
        headers.replace("Content-Type", content_type);
    }

    resp.write_status_line(StatusCode::OK)
        .write_headers(&headers)
        .write_body(req.body());
    Ok(())
}

/// `count` JSON lines as chunked body, with a SHA-256 and length trailer
/// computed over the streamed bytes.
fn stream(resp: &mut Response, req: &Request) -> HandlerResult {
    let count: usize = req
        .param("count")
        .and_then(|count| count.parse().ok())
        .ok_or_else(|| HandlerError::bad_request("no count\n"))?;

    if count > MAX_STREAM_LINES {
        return Err(HandlerError::bad_request(format!(
            "count must be at most {MAX_STREAM_LINES}\n"
        )));
    }

    let mut headers = chunked_headers("application/json");
    headers.append("Trailer", "X-Content-SHA256");
    headers.append("Trailer", "X-Content-Length");

    resp.write_status_line(StatusCode::OK).write_headers(&headers);

    let mut hasher = Sha256::new();
    let mut length = 0;

    for id in 0..count {
        let line = format!(
            "{{\"id\": {id}, \"url\": \"http://localhost{}\", \"args\": {{}}}}\n",
            req.path()
        );

        hasher.update(line.as_bytes());
        length += line.len();
        resp.write_chunk(line);
    }

    let mut trailers = Headers::new();
    trailers.append("X-Content-SHA256", format!("{:x}", hasher.finalize()));
    trailers.append("X-Content-Length", length.to_string());

    resp.write_chunked_body_done().write_trailers(&trailers);
    Ok(())
}

/// Streams a file as a chunked `video/mp4` body.
///
/// The whole file is read into the response before anything is sent, so
/// files above `max_size` bytes are refused.
struct Video {
    path: PathBuf,
    max_size: u64,
}

impl Handler for Video {
    async fn handle(&self, resp: &mut Response, _: &Request) -> HandlerResult {
        let mut file = tokio::fs::File::open(&self.path).await.map_err(|err| {
            tracing::warn!(path = %self.path.display(), error = %err, "Cannot open video");
            HandlerError::internal("error reading video\n")
        })?;

        let size = file.metadata().await.map(|meta| meta.len()).map_err(|err| {
            tracing::warn!(path = %self.path.display(), error = %err, "Cannot stat video");
            HandlerError::internal("error reading video\n")
        })?;

        if size > self.max_size {
            tracing::warn!(path = %self.path.display(), size, "Video too large to buffer");
            return Err(HandlerError::internal("video too large\n"));
        }

        let mut headers = chunked_headers("video/mp4");
        headers.replace("Accept-Ranges", "none");

        resp.write_status_line(StatusCode::OK).write_headers(&headers);

        let mut buffer = vec![0; 1024 * 1024];
        let mut total = 0;
        loop {
            let n = file.read(&mut buffer).await.map_err(|err| {
                tracing::warn!(path = %self.path.display(), error = %err, "Error reading video");
                HandlerError::internal("error reading video\n")
            })?;

            if n == 0 {
                break;
            }

            // The file may have grown since it was opened
            total += n as u64;
            if total > self.max_size {
                return Err(HandlerError::internal("video too large\n"));
            }
            resp.write_chunk(&buffer[..n]);
        }

        resp.write_chunked_body_done().write_trailers(&Headers::new());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "httpserver=info,tcp_to_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let server = Server::new(cli.port);

    server.get("/", index);
    server.get("/yourproblem", your_problem);
    server.get("/myproblem", my_problem);
    server.post("/echo", echo);
    server.get("/stream/:count", stream);
    server.get(
        "/video",
        Video {
            path: cli.video,
            max_size: MAX_VIDEO_SIZE,
        },
    );

    server.serve().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    server.close().await?;
    tracing::info!("Server gracefully stopped");
    Ok(())
}
