//! Buffered HTTP/1.1 response writer with chunked framing and trailers.

use crate::http::{headers::Headers, types::StatusCode, types::CRLF};

/// HTTP response builder.
///
/// Handlers write into an in-memory buffer that the server sends once the
/// handler returns successfully. A response is built in strict order:
///
/// - fixed length: [`write_status_line`](Response::write_status_line) ->
///   [`write_headers`](Response::write_headers) ->
///   [`write_body`](Response::write_body) (any number of times)
/// - chunked (`Transfer-Encoding: chunked` in the headers):
///   [`write_status_line`](Response::write_status_line) ->
///   [`write_headers`](Response::write_headers) ->
///   [`write_chunk`](Response::write_chunk) (any number of times) ->
///   [`write_chunked_body_done`](Response::write_chunked_body_done) ->
///   [`write_trailers`](Response::write_trailers)
///
/// # Examples
/// ```
/// use tcp_to_http::{default_headers, Response, StatusCode};
///
/// let body = "<h1>Success!</h1>";
/// let mut headers = default_headers(body.len());
/// headers.replace("Content-Type", "text/html");
///
/// let mut resp = Response::new();
/// resp.write_status_line(StatusCode::OK)
///     .write_headers(&headers)
///     .write_body(body);
///
/// assert!(resp.as_bytes().starts_with(b"HTTP/1.1 200 OK\r\ncontent-length: 17\r\n"));
/// ```
///
/// # Panics
/// All methods check the call order in `debug` mode and panic on violations.
/// In `release` mode these checks are omitted, which may produce invalid
/// HTTP responses.
#[derive(Debug, Default)]
pub struct Response {
    buffer: Vec<u8>,
    status: Option<StatusCode>,
    chunked: bool,
    trailers: Vec<String>,
    state: ResponseState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum ResponseState {
    #[default]
    Clean,
    Headers,
    Body,
    Chunks,
    Trailers,
    Complete,
}

/// Headers for a plain-text response of `content_len` bytes:
///
/// ```text
/// content-length: <content_len>
/// connection: close
/// content-type: text/plain
/// ```
///
/// For a chunked response, remove `Content-Length` and set
/// `Transfer-Encoding: chunked`.
pub fn default_headers(content_len: usize) -> Headers {
    let mut headers = Headers::new();
    headers.append("Content-Length", content_len.to_string());
    headers.append("Connection", "close");
    headers.append("Content-Type", "text/plain");
    headers
}

impl Response {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// The serialized response written so far.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Status passed to [`write_status_line`](Response::write_status_line),
    /// if it was called.
    #[inline]
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    #[inline]
    pub const fn is_chunked(&self) -> bool {
        self.chunked
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    /// Terminates a chunked body the handler left open.
    pub(crate) fn finish(&mut self) {
        match self.state {
            ResponseState::Chunks => {
                self.buffer.extend_from_slice(b"0\r\n\r\n");
                self.state = ResponseState::Complete;
            }
            ResponseState::Trailers => {
                self.buffer.extend_from_slice(CRLF);
                self.state = ResponseState::Complete;
            }
            _ => {}
        }
    }
}

impl Response {
    /// Writes `HTTP/1.1 <code> <reason>\r\n`.
    ///
    /// # Panics
    /// Error message: `Must be first and called only once`
    #[inline]
    #[track_caller]
    pub fn write_status_line(&mut self, status: StatusCode) -> &mut Self {
        debug_assert!(
            self.state == ResponseState::Clean,
            "Must be first and called only once"
        );

        self.buffer
            .extend_from_slice(format!("HTTP/1.1 {status}\r\n").as_bytes());
        self.status = Some(status);
        self.state = ResponseState::Headers;
        self
    }

    /// Writes every field as `name: value\r\n`, then the blank line ending
    /// the header block.
    ///
    /// `Transfer-Encoding: chunked` switches the response to chunked
    /// framing; names listed in `Trailer` are the fields
    /// [`write_trailers`](Response::write_trailers) may send.
    ///
    /// # Panics
    /// Error messages:
    /// - `Must be called after write_status_line() and only once`
    /// - `A chunked response must not carry Content-Length`
    #[inline]
    #[track_caller]
    pub fn write_headers(&mut self, headers: &Headers) -> &mut Self {
        debug_assert!(
            self.state == ResponseState::Headers,
            "Must be called after write_status_line() and only once"
        );

        let chunked = headers
            .get("transfer-encoding")
            .is_some_and(|value| has_token(value, "chunked"));

        debug_assert!(
            !(chunked && headers.contains("content-length")),
            "A chunked response must not carry Content-Length"
        );

        self.buffer.extend_from_slice(headers.to_string().as_bytes());
        self.buffer.extend_from_slice(CRLF);

        self.chunked = chunked;
        if chunked {
            self.trailers = headers
                .get("trailer")
                .map(|value| {
                    value
                        .split(',')
                        .map(|name| name.trim().to_ascii_lowercase())
                        .filter(|name| !name.is_empty())
                        .collect()
                })
                .unwrap_or_default();
            self.state = ResponseState::Chunks;
        } else {
            self.state = ResponseState::Body;
        }
        self
    }

    /// Appends raw body bytes. May be called repeatedly.
    ///
    /// # Panics
    /// Error message: `Must be called after write_headers() on a non-chunked response`
    #[inline]
    #[track_caller]
    pub fn write_body<T: AsRef<[u8]>>(&mut self, data: T) -> &mut Self {
        debug_assert!(
            self.state == ResponseState::Body,
            "Must be called after write_headers() on a non-chunked response"
        );

        self.buffer.extend_from_slice(data.as_ref());
        self
    }

    /// Writes one chunk as `<hex length>\r\n<data>\r\n`.
    ///
    /// Empty data writes nothing, since a zero-length chunk would end the
    /// body.
    ///
    /// # Panics
    /// Error message: `Must be called after write_headers() on a chunked response`
    #[inline]
    #[track_caller]
    pub fn write_chunk<T: AsRef<[u8]>>(&mut self, data: T) -> &mut Self {
        debug_assert!(
            self.state == ResponseState::Chunks,
            "Must be called after write_headers() on a chunked response"
        );

        let data = data.as_ref();
        if data.is_empty() {
            return self;
        }

        self.buffer
            .extend_from_slice(format!("{:x}\r\n", data.len()).as_bytes());
        self.buffer.extend_from_slice(data);
        self.buffer.extend_from_slice(CRLF);
        self
    }

    /// Writes the terminal `0\r\n` chunk.
    ///
    /// # Panics
    /// Error message: `Must be called after write_headers() on a chunked response`
    #[inline]
    #[track_caller]
    pub fn write_chunked_body_done(&mut self) -> &mut Self {
        debug_assert!(
            self.state == ResponseState::Chunks,
            "Must be called after write_headers() on a chunked response"
        );

        self.buffer.extend_from_slice(b"0\r\n");
        self.state = ResponseState::Trailers;
        self
    }

    /// Writes the trailer fields followed by the blank line ending the
    /// message. An empty collection writes only the blank line.
    ///
    /// # Panics
    /// Error messages:
    /// - `Must be called once after write_chunked_body_done()`
    /// - `Trailer fields must be declared in the Trailer header`
    #[inline]
    #[track_caller]
    pub fn write_trailers(&mut self, trailers: &Headers) -> &mut Self {
        debug_assert!(
            self.state == ResponseState::Trailers,
            "Must be called once after write_chunked_body_done()"
        );
        debug_assert!(
            trailers
                .iter()
                .all(|(name, _)| self.trailers.iter().any(|declared| declared == name)),
            "Trailer fields must be declared in the Trailer header"
        );

        self.buffer.extend_from_slice(trailers.to_string().as_bytes());
        self.buffer.extend_from_slice(CRLF);
        self.state = ResponseState::Complete;
        self
    }
}

#[inline]
fn has_token(list: &str, token: &str) -> bool {
    list.split(',')
        .any(|item| item.trim().eq_ignore_ascii_case(token))
}

#[cfg(test)]
mod status_tests {
    use super::*;
    use crate::tools::*;

    #[test]
    fn basic() {
        #[rustfmt::skip]
        let cases = [
            (StatusCode::OK,                     "HTTP/1.1 200 OK\r\n"),
            (StatusCode::BAD_REQUEST,            "HTTP/1.1 400 Bad Request\r\n"),
            (StatusCode::NOT_FOUND,              "HTTP/1.1 404 Not Found\r\n"),
            (StatusCode::INTERNAL_SERVER_ERROR,  "HTTP/1.1 500 Internal Server Error\r\n"),
            (StatusCode::from_u16(299),          "HTTP/1.1 299 Unknown Status\r\n"),
        ];

        for (status, line) in cases {
            let mut resp = Response::new();
            assert!(resp.is_empty());
            assert_eq!(resp.status(), None);

            resp.write_status_line(status);
            assert_eq!(str_op(resp.as_bytes()), line);
            assert_eq!(resp.status(), Some(status));
            assert_eq!(resp.state, ResponseState::Headers);
        }
    }

    #[test]
    #[should_panic(expected = "Must be first and called only once")]
    fn double_call() {
        let mut resp = Response::new();
        resp.write_status_line(StatusCode::OK);
        resp.write_status_line(StatusCode::OK);
    }
}

#[cfg(test)]
mod header_tests {
    use super::*;
    use crate::tools::*;

    #[test]
    fn default() {
        let headers = default_headers(42);

        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            [
                ("content-length", "42"),
                ("connection", "close"),
                ("content-type", "text/plain"),
            ]
        );
    }

    #[test]
    fn basic() {
        #[rustfmt::skip]
        let cases = [
            (default_headers(0),  "content-length: 0\r\nconnection: close\r\ncontent-type: text/plain\r\n\r\n"),
            (Headers::new(),      "\r\n"),
            (
                [("Content-Type", "text/html"), ("X-Tags", "a"), ("x-tags", "b")].into_iter().collect(),
                "content-type: text/html\r\nx-tags: a, b\r\n\r\n",
            ),
        ];

        for (headers, expected) in cases {
            let mut resp = Response::new();
            resp.write_status_line(StatusCode::OK).write_headers(&headers);

            assert_eq!(
                str_op(resp.as_bytes()),
                format!("HTTP/1.1 200 OK\r\n{expected}")
            );
            assert_eq!(resp.state, ResponseState::Body);
        }
    }

    #[test]
    fn chunked_switch() {
        #[rustfmt::skip]
        let cases = [
            ("chunked",       true),
            ("Chunked",       true),
            ("gzip, chunked", true),
            ("gzip",          false),
        ];

        for (value, chunked) in cases {
            let mut headers = Headers::new();
            headers.replace("Transfer-Encoding", value);

            let mut resp = Response::new();
            resp.write_status_line(StatusCode::OK).write_headers(&headers);

            assert_eq!(resp.is_chunked(), chunked, "{value}");
        }
    }

    #[test]
    #[should_panic(expected = "Must be called after write_status_line() and only once")]
    fn before_status() {
        let mut resp = Response::new();
        resp.write_headers(&Headers::new());
    }

    #[test]
    #[should_panic(expected = "Must be called after write_status_line() and only once")]
    fn double_call() {
        let mut resp = Response::new();
        resp.write_status_line(StatusCode::OK)
            .write_headers(&Headers::new())
            .write_headers(&Headers::new());
    }

    #[test]
    #[should_panic(expected = "A chunked response must not carry Content-Length")]
    fn chunked_with_content_length() {
        let mut headers = default_headers(10);
        headers.replace("Transfer-Encoding", "chunked");

        let mut resp = Response::new();
        resp.write_status_line(StatusCode::OK).write_headers(&headers);
    }
}

#[cfg(test)]
mod body_tests {
    use super::*;
    use crate::tools::*;

    #[test]
    fn basic() {
        let mut resp = Response::new();
        resp.write_status_line(StatusCode::OK)
            .write_headers(&default_headers(11))
            .write_body("Sample")
            .write_body(b" body")
            .write_body(Vec::new());

        assert_eq!(
            str_op(resp.as_bytes()),
            "HTTP/1.1 200 OK\r\n\
             content-length: 11\r\nconnection: close\r\ncontent-type: text/plain\r\n\
             \r\n\
             Sample body"
        );
        assert!(!resp.is_chunked());
    }

    #[test]
    #[should_panic(expected = "Must be called after write_headers() on a non-chunked response")]
    fn before_headers() {
        let mut resp = Response::new();
        resp.write_status_line(StatusCode::OK).write_body("body");
    }

    #[test]
    #[should_panic(expected = "Must be called after write_headers() on a non-chunked response")]
    fn on_chunked() {
        let mut headers = Headers::new();
        headers.replace("Transfer-Encoding", "chunked");

        let mut resp = Response::new();
        resp.write_status_line(StatusCode::OK)
            .write_headers(&headers)
            .write_body("body");
    }
}
