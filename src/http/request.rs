use crate::{
    errors::ErrorKind,
    http::{
        headers::Headers,
        types::{is_token, CRLF},
    },
    limits::ReqLimits,
};
use memchr::memmem;
use std::{io, sync::Arc, time::Duration};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Parsed HTTP/1.1 request.
///
/// A request is built incrementally from a byte stream: the parser state
/// machine is fed whatever bytes are available and consumes complete
/// protocol elements only, so the input may be split at any byte boundary.
///
/// # Input data requirements
///
/// #### General designations
/// - `SP`: ASCII space (0x20)
/// - `CRLF`: Carriage return + line feed (`"\r\n"`), exactly this sequence
///
/// ## Request line
/// ```text
/// [METHOD] SP [TARGET] SP "HTTP/1.1" CRLF
/// ```
/// The line must be valid `UTF-8` with exactly three fields. `[METHOD]` is
/// any token (case-sensitive, not restricted to the registered methods).
/// Any version other than `1.1` is rejected.
///
/// ## Headers
/// ```text
/// [NAME] ":" [OWS] [VALUE] [OWS] CRLF
/// ```
/// See [`Headers::parse`]. The block ends with an empty line.
///
/// ## Body
///
/// Exactly `Content-Length` bytes (none when the header is absent or not a
/// number). Receiving more bytes than declared is an error;
/// `Transfer-Encoding: chunked` request bodies are not supported.
///
/// # Limits
///
/// The header count, header value length and body length are bounded by
/// [`ReqLimits`]; [`Request::new`] uses the defaults and
/// [`Request::with_limits`] takes them from a configuration.
///
/// # Examples
/// ```
/// use tcp_to_http::Request;
///
/// let mut req = Request::new();
/// let data = b"POST /coffee HTTP/1.1\r\nContent-Length: 3\r\n\r\nhot";
///
/// assert_eq!(req.parse(&data[..10]), Ok(0));
/// assert_eq!(req.parse(data), Ok(data.len()));
/// assert!(req.is_done());
/// assert_eq!(req.method(), "POST");
/// assert_eq!(req.body(), b"hot");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    line: RequestLine,
    headers: Headers,
    body: Vec<u8>,
    state: ParserState,
    bounds: Bounds,

    pub(crate) route: Option<Arc<str>>,
}

// The parts of `ReqLimits` the state machine enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bounds {
    header_count: usize,
    header_value_size: usize,
    body_size: usize,
}

impl From<&ReqLimits> for Bounds {
    fn from(limits: &ReqLimits) -> Self {
        Self {
            header_count: limits.header_count,
            header_value_size: limits.header_value_size,
            body_size: limits.body_size,
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::from(&ReqLimits::default())
    }
}

/// `METHOD TARGET HTTP/VERSION`, with the `HTTP/` prefix stripped from the
/// version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLine {
    method: String,
    target: String,
    version: String,
}

impl RequestLine {
    #[inline]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[inline]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[inline]
    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Position of the request parser.
///
/// `Init -> Headers -> Body -> Done`, or `Error` from any state. `Done` and
/// `Error` are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParserState {
    #[default]
    Init,
    Headers,
    Body,
    Done,
    Error,
}

impl Request {
    /// An empty request in the [`ParserState::Init`] state.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty request enforcing the size limits of `limits`.
    #[inline]
    pub fn with_limits(limits: &ReqLimits) -> Self {
        Self {
            bounds: Bounds::from(limits),
            ..Self::default()
        }
    }

    /// Reads and parses a complete request from `reader`.
    ///
    /// Reads stop as soon as the request is complete, so bytes after the
    /// declared body are left unread. A stream that ends before that is an
    /// [`io::ErrorKind::UnexpectedEof`] transport error.
    pub async fn from_reader<R: AsyncRead + Unpin>(
        reader: &mut R,
        limits: &ReqLimits,
    ) -> Result<Self, ErrorKind> {
        Self::read_from(reader, limits, None).await
    }

    pub(crate) async fn read_from<R: AsyncRead + Unpin>(
        reader: &mut R,
        limits: &ReqLimits,
        read_timeout: Option<Duration>,
    ) -> Result<Self, ErrorKind> {
        let mut request = Request::with_limits(limits);
        let mut parser = Parser::new(limits);

        while !request.is_done() {
            parser.fill_buffer(reader, read_timeout).await?;

            let n = request.parse(parser.filled())?;
            parser.consume(n);
        }

        Ok(request)
    }

    /// Feeds `data` to the state machine and returns how many bytes were
    /// consumed from its front.
    ///
    /// Unconsumed bytes (an incomplete line, usually) must be passed again,
    /// followed by new data, on the next call. Any error moves the request to
    /// [`ParserState::Error`], after which every call fails with
    /// [`ErrorKind::RequestInErrorState`].
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ErrorKind> {
        let mut read = 0;

        loop {
            let state = self.state;
            let n = match self.step(&data[read..]) {
                Ok(n) => n,
                Err(err) => {
                    self.state = ParserState::Error;
                    return Err(err);
                }
            };

            read += n;

            if n == 0 && state == self.state {
                return Ok(read);
            }
        }
    }

    fn step(&mut self, data: &[u8]) -> Result<usize, ErrorKind> {
        match self.state {
            ParserState::Init => {
                let Some((line, n)) = parse_request_line(data)? else {
                    return Ok(0);
                };

                self.line = line;
                self.state = ParserState::Headers;
                Ok(n)
            }
            ParserState::Headers => {
                let (n, done) = self.headers.parse_bounded(
                    data,
                    self.bounds.header_count,
                    self.bounds.header_value_size,
                )?;
                if !done {
                    return Ok(n);
                }

                self.state = ParserState::Body;
                Ok(n + CRLF.len())
            }
            ParserState::Body => {
                let expected = self.content_length();
                if expected == 0 {
                    self.state = ParserState::Done;
                    return Ok(0);
                }

                if expected > self.bounds.body_size {
                    return Err(ErrorKind::BodyTooLarge {
                        length: expected,
                        limit: self.bounds.body_size,
                    });
                }

                let needed = expected - self.body.len();

                if data.len() > needed {
                    return Err(ErrorKind::BodyLengthMismatch {
                        expected,
                        available: self.body.len() + data.len(),
                    });
                }

                self.body.extend_from_slice(data);
                if self.body.len() == expected {
                    self.state = ParserState::Done;
                }
                Ok(data.len())
            }
            ParserState::Done => Ok(0),
            ParserState::Error => Err(ErrorKind::RequestInErrorState),
        }
    }
}

fn parse_request_line(data: &[u8]) -> Result<Option<(RequestLine, usize)>, ErrorKind> {
    let Some(idx) = memmem::find(data, CRLF) else {
        return Ok(None);
    };

    let line =
        simdutf8::basic::from_utf8(&data[..idx]).map_err(|_| ErrorKind::MalformedRequestLine)?;

    let mut parts = line.split(' ');
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ErrorKind::MalformedRequestLine);
    };

    if !is_token(method.as_bytes()) || target.is_empty() {
        return Err(ErrorKind::MalformedRequestLine);
    }

    let version = version
        .strip_prefix("HTTP/")
        .ok_or(ErrorKind::MalformedRequestLine)?;

    if version != "1.1" {
        return Err(ErrorKind::UnsupportedVersion(version.to_owned()));
    }

    let line = RequestLine {
        method: method.to_owned(),
        target: target.to_owned(),
        version: version.to_owned(),
    };

    Ok(Some((line, idx + CRLF.len())))
}

impl Request {
    #[inline]
    pub const fn state(&self) -> ParserState {
        self.state
    }

    /// `true` once the full body has been received.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.state == ParserState::Done
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.state == ParserState::Error
    }

    #[inline]
    pub const fn request_line(&self) -> &RequestLine {
        &self.line
    }

    #[inline]
    pub fn method(&self) -> &str {
        &self.line.method
    }

    /// The raw request target, query string included.
    #[inline]
    pub fn target(&self) -> &str {
        &self.line.target
    }

    #[inline]
    pub fn version(&self) -> &str {
        &self.line.version
    }

    /// The target up to the first `?`.
    ///
    /// # Examples
    /// ```
    /// use tcp_to_http::Request;
    ///
    /// let mut req = Request::new();
    /// req.parse(b"GET /search?q=rust HTTP/1.1\r\n\r\n").unwrap();
    ///
    /// assert_eq!(req.path(), "/search");
    /// assert_eq!(req.query(), Some("q=rust"));
    /// ```
    #[inline]
    pub fn path(&self) -> &str {
        let target = self.target();
        target.split_once('?').map_or(target, |(path, _)| path)
    }

    #[inline]
    pub fn query(&self) -> Option<&str> {
        self.target().split_once('?').map(|(_, query)| query)
    }

    /// Path segments, without the leading `/`.
    ///
    /// `/a/1` yields `["a", "1"]`, `/` yields `[""]`.
    #[inline]
    pub fn path_segments(&self) -> impl Iterator<Item = &str> {
        split_path(self.path())
    }

    #[inline]
    pub fn path_segment(&self, index: usize) -> Option<&str> {
        self.path_segments().nth(index)
    }

    /// The pattern of the route that matched this request, if it was routed.
    #[inline]
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// The path segment captured by the `:name` wildcard of the matched
    /// route.
    ///
    /// # Examples
    /// ```
    /// use tcp_to_http::{HandlerError, HandlerResult, Request, Response, Server};
    ///
    /// fn stream(resp: &mut Response, req: &Request) -> HandlerResult {
    ///     let count: usize = req
    ///         .param("count")
    ///         .and_then(|c| c.parse().ok())
    ///         .ok_or_else(|| HandlerError::bad_request("count must be a number"))?;
    ///     # let _ = (resp, count);
    ///     Ok(())
    /// }
    ///
    /// let server = Server::new(0);
    /// server.get("/stream/:count", stream);
    /// ```
    pub fn param(&self, name: &str) -> Option<&str> {
        let index = split_path(self.route()?).position(|segment| {
            segment
                .strip_prefix(':')
                .is_some_and(|wildcard| wildcard == name)
        })?;

        self.path_segment(index)
    }

    #[inline]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Declared body length, `0` when absent or invalid.
    #[inline]
    pub fn content_length(&self) -> usize {
        self.headers.get_int("content-length", 0)
    }

    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[inline]
pub(crate) fn split_path(path: &str) -> std::str::Split<'_, char> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

// Read buffer

#[derive(Debug)]
struct Parser {
    len: usize,
    buffer: Vec<u8>,
    max_size: usize,
}

impl Parser {
    #[inline]
    fn new(limits: &ReqLimits) -> Self {
        let limits = limits.clone().normalized();

        Parser {
            len: 0,
            buffer: vec![0; limits.buffer_size],
            max_size: limits.max_buffer_size,
        }
    }

    #[inline]
    fn filled(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    #[inline]
    fn consume(&mut self, n: usize) {
        self.buffer.copy_within(n..self.len, 0);
        self.len -= n;
    }

    async fn fill_buffer<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut R,
        read_timeout: Option<Duration>,
    ) -> Result<usize, ErrorKind> {
        if self.len == self.buffer.len() {
            if self.buffer.len() >= self.max_size {
                return Err(ErrorKind::LineTooLong(self.max_size));
            }

            let size = (self.buffer.len() * 2).min(self.max_size);
            self.buffer.resize(size, 0);
        }

        loop {
            let read = reader.read(&mut self.buffer[self.len..]);

            let result = match read_timeout {
                Some(time) => tokio::time::timeout(time, read)
                    .await
                    .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "read timeout"))?,
                None => read.await,
            };

            match result {
                Ok(0) => {
                    return Err(ErrorKind::from(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "stream closed before the request was complete",
                    )))
                }
                Ok(n) => {
                    self.len += n;
                    return Ok(n);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }
}

#[cfg(test)]
mod parse_tests {
    use super::*;

    #[test]
    fn request_line() {
        #[rustfmt::skip]
        let cases = [
            ("GET / HTTP/1.1\r\n",                ("GET", "/", "1.1")),
            ("POST /coffee HTTP/1.1\r\n",         ("POST", "/coffee", "1.1")),
            ("PURGE /a/b?c=d HTTP/1.1\r\n",       ("PURGE", "/a/b?c=d", "1.1")),
            ("get * HTTP/1.1\r\n",                ("get", "*", "1.1")),
        ];

        for (data, (method, target, version)) in cases {
            let mut req = Request::new();

            assert_eq!(req.parse(data.as_bytes()), Ok(data.len()), "{data:?}");
            assert_eq!(req.state(), ParserState::Headers);
            assert_eq!(req.method(), method);
            assert_eq!(req.target(), target);
            assert_eq!(req.version(), version);
        }
    }

    #[test]
    fn request_line_errors() {
        #[rustfmt::skip]
        let cases = [
            ("GET /\r\n",                   ErrorKind::MalformedRequestLine),
            ("GET / HTTP/1.1 x\r\n",        ErrorKind::MalformedRequestLine),
            ("GET  / HTTP/1.1\r\n",         ErrorKind::MalformedRequestLine),
            ("GET  HTTP/1.1\r\n",           ErrorKind::MalformedRequestLine),
            ("G(T / HTTP/1.1\r\n",          ErrorKind::MalformedRequestLine),
            ("GET / FTP/1.1\r\n",           ErrorKind::MalformedRequestLine),
            ("\r\n",                        ErrorKind::MalformedRequestLine),
            ("GET / HTTP/1.0\r\n",          ErrorKind::UnsupportedVersion("1.0".into())),
            ("GET / HTTP/2\r\n",            ErrorKind::UnsupportedVersion("2".into())),
        ];

        for (data, err) in cases {
            let mut req = Request::new();

            assert_eq!(req.parse(data.as_bytes()), Err(err), "{data:?}");
            assert_eq!(req.state(), ParserState::Error);
            assert_eq!(req.parse(b"GET / HTTP/1.1\r\n"), Err(ErrorKind::RequestInErrorState));
        }

        let mut req = Request::new();
        assert_eq!(
            req.parse(b"GET /\xff HTTP/1.1\r\n"),
            Err(ErrorKind::MalformedRequestLine)
        );
    }

    #[test]
    fn waits_for_complete_lines() {
        let mut req = Request::new();

        assert_eq!(req.parse(b""), Ok(0));
        assert_eq!(req.parse(b"GET / HTTP/1.1\r"), Ok(0));
        assert_eq!(req.state(), ParserState::Init);

        assert_eq!(req.parse(b"GET / HTTP/1.1\r\nHost: loc"), Ok(16));
        assert_eq!(req.state(), ParserState::Headers);

        assert_eq!(req.parse(b"Host: localhost\r\n\r"), Ok(17));
        assert_eq!(req.state(), ParserState::Headers);

        assert_eq!(req.parse(b"\r\n"), Ok(2));
        assert!(req.is_done());
        assert_eq!(req.header("host"), Some("localhost"));
        assert_eq!(req.body(), b"");

        assert_eq!(req.parse(b"anything"), Ok(0));
    }

    #[test]
    fn body() {
        let mut req = Request::new();
        let head = b"POST /submit HTTP/1.1\r\nContent-Length: 13\r\n\r\n";

        assert_eq!(req.parse(head), Ok(head.len()));
        assert_eq!(req.state(), ParserState::Body);

        assert_eq!(req.parse(b"hello "), Ok(6));
        assert_eq!(req.state(), ParserState::Body);

        assert_eq!(req.parse(b"world!\n"), Ok(7));
        assert!(req.is_done());
        assert_eq!(req.body(), b"hello world!\n");
        assert_eq!(req.content_length(), 13);
    }

    #[test]
    fn body_length_mismatch() {
        let mut req = Request::new();
        let data = b"POST /submit HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello!!";

        assert_eq!(
            req.parse(data),
            Err(ErrorKind::BodyLengthMismatch {
                expected: 5,
                available: 7
            })
        );
        assert!(req.is_error());
        assert_eq!(req.body(), b"");
    }

    #[test]
    fn no_body() {
        #[rustfmt::skip]
        let cases = [
            "GET / HTTP/1.1\r\n\r\n",
            "GET / HTTP/1.1\r\nContent-Length: 0\r\n\r\n",
            "GET / HTTP/1.1\r\nContent-Length: nope\r\n\r\n",
        ];

        for data in cases {
            let mut req = Request::new();

            assert_eq!(req.parse(data.as_bytes()), Ok(data.len()), "{data:?}");
            assert!(req.is_done());
            assert_eq!(req.body(), b"");
        }
    }

    #[test]
    fn path_and_query() {
        #[rustfmt::skip]
        let cases = [
            ("/",               "/",        None,           vec![""]),
            ("/a/1",            "/a/1",     None,           vec!["a", "1"]),
            ("/a/1/",           "/a/1/",    None,           vec!["a", "1", ""]),
            ("/search?q=x&y",   "/search",  Some("q=x&y"),  vec!["search"]),
            ("/?",              "/",        Some(""),       vec![""]),
            ("*",               "*",        None,           vec!["*"]),
        ];

        for (target, path, query, segments) in cases {
            let mut req = Request::new();
            req.parse(format!("GET {target} HTTP/1.1\r\n\r\n").as_bytes())
                .unwrap();

            assert_eq!(req.path(), path);
            assert_eq!(req.query(), query);
            assert_eq!(req.path_segments().collect::<Vec<_>>(), segments);
        }
    }

    #[test]
    fn param() {
        let mut req = Request::new();
        req.parse(b"GET /httpbin/stream/42?x=1 HTTP/1.1\r\n\r\n")
            .unwrap();

        assert_eq!(req.param("count"), None);

        req.route = Some(Arc::from("/httpbin/stream/:count"));
        assert_eq!(req.route(), Some("/httpbin/stream/:count"));
        assert_eq!(req.param("count"), Some("42"));
        assert_eq!(req.param("stream"), None);
        assert_eq!(req.path_segment(0), Some("httpbin"));
        assert_eq!(req.path_segment(3), None);
    }
}

#[cfg(test)]
mod reader_tests {
    use super::*;
    use crate::tools::ChunkReader;

    const FULL: &str = "POST /coffee HTTP/1.1\r\n\
                        Host: localhost:42069\r\n\
                        User-Agent: curl/7.81.0\r\n\
                        Accept: */*\r\n\
                        Content-Length: 22\r\n\
                        \r\n\
                        {\"type\": \"dark mode\"}\n";

    #[tokio::test]
    async fn any_chunk_size() {
        for chunk in 1..=FULL.len() {
            let mut reader = ChunkReader::new(FULL, chunk);
            let req = Request::from_reader(&mut reader, &ReqLimits::default())
                .await
                .unwrap();

            assert_eq!(req.method(), "POST", "chunk size {chunk}");
            assert_eq!(req.target(), "/coffee");
            assert_eq!(req.version(), "1.1");
            assert_eq!(req.header("Host"), Some("localhost:42069"));
            assert_eq!(req.header("user-agent"), Some("curl/7.81.0"));
            assert_eq!(req.header("accept"), Some("*/*"));
            assert_eq!(req.body(), b"{\"type\": \"dark mode\"}\n");
        }
    }

    #[tokio::test]
    async fn small_growing_buffer() {
        let limits = ReqLimits {
            buffer_size: 2,
            max_buffer_size: 64,
            ..ReqLimits::default()
        };

        for chunk in [1, 3, 8, FULL.len()] {
            let mut reader = ChunkReader::new(FULL, chunk);
            let req = Request::from_reader(&mut reader, &limits).await.unwrap();

            assert_eq!(req.header("content-length"), Some("22"));
            assert_eq!(req.body().len(), 22);
        }
    }

    #[tokio::test]
    async fn errors() {
        let eof = || ErrorKind::from(io::Error::from(io::ErrorKind::UnexpectedEof));

        #[rustfmt::skip]
        let cases = [
            ("POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nhello",   1,    eof()),
            ("POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nhello",   1024, eof()),
            ("GET / HTTP/1.1\r\nHost: localhost\r\n",                  3,    eof()),
            ("",                                                       1,    eof()),
            ("POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello!!",  1024,
                ErrorKind::BodyLengthMismatch { expected: 5, available: 7 }),
            ("GET / HTTP/1.0\r\n\r\n",                                 1,    ErrorKind::UnsupportedVersion("1.0".into())),
            ("GET /\r\n\r\n",                                          1,    ErrorKind::MalformedRequestLine),
            ("GET / HTTP/1.1\r\nHost : localhost\r\n\r\n",             5,    ErrorKind::MalformedFieldName),
        ];

        for (data, chunk, err) in cases {
            let mut reader = ChunkReader::new(data, chunk);
            let result = Request::from_reader(&mut reader, &ReqLimits::default()).await;

            assert_eq!(result, Err(err), "{data:?}");
        }
    }

    #[tokio::test]
    async fn line_too_long() {
        let limits = ReqLimits {
            buffer_size: 8,
            max_buffer_size: 32,
            ..ReqLimits::default()
        };
        let data = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(64));

        let mut reader = ChunkReader::new(&data, 5);
        let result = Request::from_reader(&mut reader, &limits).await;

        assert_eq!(result, Err(ErrorKind::LineTooLong(32)));
    }

    #[tokio::test]
    async fn size_limits() {
        let limits = ReqLimits {
            header_count: 8,
            header_value_size: 32,
            body_size: 16,
            ..ReqLimits::default()
        };

        let many: String = (0..40_000).map(|i| format!("X-{i}: v\r\n")).collect();
        let repeated = "Person: Tom\r\n".repeat(10);

        #[rustfmt::skip]
        let cases = [
            (format!("GET / HTTP/1.1\r\n{many}\r\n"),                  ErrorKind::TooManyHeaders(8)),
            (format!("GET / HTTP/1.1\r\n{repeated}\r\n"),              ErrorKind::HeaderTooLarge(32)),
            (format!("GET / HTTP/1.1\r\nA: {}\r\n\r\n", "a".repeat(33)), ErrorKind::HeaderTooLarge(32)),
            ("POST / HTTP/1.1\r\nContent-Length: 8388608\r\n\r\nx".to_owned(),
                ErrorKind::BodyTooLarge { length: 8_388_608, limit: 16 }),
        ];

        for (data, err) in cases {
            let mut reader = ChunkReader::new(&data, 4096);
            let result = Request::from_reader(&mut reader, &limits).await;

            assert_eq!(result, Err(err), "{:?}", &data[..data.len().min(48)]);
        }

        let data = "POST / HTTP/1.1\r\nContent-Length: 16\r\n\r\n0123456789abcdef";
        let mut reader = ChunkReader::new(data, 7);
        let req = Request::from_reader(&mut reader, &limits).await.unwrap();
        assert_eq!(req.body(), b"0123456789abcdef");
    }

    #[test]
    fn default_limits() {
        let mut req = Request::new();
        let data = format!(
            "POST / HTTP/1.1\r\nContent-Length: {}\r\n\r\n",
            ReqLimits::default().body_size + 1
        );

        assert_eq!(
            req.parse(data.as_bytes()),
            Err(ErrorKind::BodyTooLarge {
                length: 1024 * 1024 + 1,
                limit: 1024 * 1024,
            })
        );
        assert!(req.is_error());
    }

    #[tokio::test]
    async fn read_timeout() {
        let (mut client, mut server) = tokio::io::duplex(64);
        tokio::io::AsyncWriteExt::write_all(&mut client, b"GET / HTTP/1.1\r\n")
            .await
            .unwrap();

        let result = Request::read_from(
            &mut server,
            &ReqLimits::default(),
            Some(Duration::from_millis(20)),
        )
        .await;

        assert_eq!(
            result,
            Err(ErrorKind::from(io::Error::from(io::ErrorKind::TimedOut)))
        );
        drop(client);
    }
}
