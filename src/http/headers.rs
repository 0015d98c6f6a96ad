//! Case-insensitive header collection shared by requests and responses.

use crate::{
    errors::ErrorKind,
    http::types::{is_token, slice_to_usize, CRLF},
};
use memchr::memmem;
use std::fmt;

/// Header fields keyed by lower-cased name.
///
/// Every name maps to a single value. Repeated fields are folded into one
/// comma-separated value, in the order they were seen:
///
/// ```
/// use tcp_to_http::Headers;
///
/// let mut headers = Headers::new();
/// headers.append("Person", "Tom");
/// headers.append("person", "Jax");
///
/// assert_eq!(headers.get("PERSON"), Some("Tom, Jax"));
/// ```
///
/// Iteration yields fields in insertion order, which is also the order in
/// which [`Response::write_headers`](crate::Response::write_headers) puts
/// them on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses as many complete field lines from `data` as it can.
    ///
    /// Returns the number of bytes consumed and whether the blank line ending
    /// the header block was reached. The blank line itself is never counted
    /// in the consumed bytes, and an incomplete trailing line is left for the
    /// next call. `Ok((0, false))` only means more data is needed.
    ///
    /// On error nothing is reported as consumed; fields parsed earlier in the
    /// same call stay in the collection.
    ///
    /// ```
    /// use tcp_to_http::Headers;
    ///
    /// let mut headers = Headers::new();
    /// let data = b"Host: localhost:42069\r\n\r\n";
    ///
    /// assert_eq!(headers.parse(data), Ok((23, true)));
    /// assert_eq!(headers.get("host"), Some("localhost:42069"));
    /// ```
    pub fn parse(&mut self, data: &[u8]) -> Result<(usize, bool), ErrorKind> {
        self.parse_bounded(data, usize::MAX, usize::MAX)
    }

    /// [`parse`](Self::parse), failing as soon as the collection holds more
    /// than `max_count` fields or a value grows past `max_value` bytes.
    pub(crate) fn parse_bounded(
        &mut self,
        data: &[u8],
        max_count: usize,
        max_value: usize,
    ) -> Result<(usize, bool), ErrorKind> {
        let finder = memmem::Finder::new(CRLF);
        let mut read = 0;

        while let Some(idx) = finder.find(&data[read..]) {
            if idx == 0 {
                return Ok((read, true));
            }

            let (name, value) = Self::parse_field_line(&data[read..read + idx])?;
            let i = self.insert(name, value);

            if self.entries.len() > max_count {
                return Err(ErrorKind::TooManyHeaders(max_count));
            }
            if self.entries[i].1.len() > max_value {
                return Err(ErrorKind::HeaderTooLarge(max_value));
            }

            read += idx + CRLF.len();
        }

        Ok((read, false))
    }

    fn parse_field_line(line: &[u8]) -> Result<(&str, &str), ErrorKind> {
        let colon = memchr::memchr(b':', line).ok_or(ErrorKind::MalformedFieldLine)?;
        let (name, value) = (&line[..colon], &line[colon + 1..]);

        // `is_token` also rejects the space in `Host : value`
        if !is_token(name) {
            return Err(ErrorKind::MalformedFieldName);
        }

        let value = simdutf8::basic::from_utf8(trim(value))
            .map_err(|_| ErrorKind::MalformedFieldLine)?;

        // Token bytes are ASCII
        let name = std::str::from_utf8(name).map_err(|_| ErrorKind::MalformedFieldName)?;

        Ok((name, value))
    }

    /// Case-insensitive lookup.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.entries[i].1.as_str())
    }

    /// Returns the value of `name` parsed as a base-10 integer, or `default`
    /// when it is absent or not a valid number.
    #[inline]
    pub fn get_int(&self, name: &str, default: usize) -> usize {
        self.get(name)
            .and_then(|value| slice_to_usize(value.as_bytes()))
            .unwrap_or(default)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Adds a field, joining it to an existing value with `", "`.
    #[inline]
    pub fn append<N: AsRef<str>, V: AsRef<str>>(&mut self, name: N, value: V) {
        self.insert(name.as_ref(), value.as_ref());
    }

    // Returns the position of the field
    fn insert(&mut self, name: &str, value: &str) -> usize {
        match self.position(name) {
            Some(i) if !self.entries[i].1.is_empty() => {
                let current = &mut self.entries[i].1;
                current.push_str(", ");
                current.push_str(value);
                i
            }
            Some(i) => {
                self.entries[i].1 = value.to_owned();
                i
            }
            None => {
                self.entries
                    .push((name.to_ascii_lowercase(), value.to_owned()));
                self.entries.len() - 1
            }
        }
    }

    /// Sets a field, discarding any previous value. The field keeps its
    /// original position.
    pub fn replace<N: AsRef<str>, V: AsRef<str>>(&mut self, name: N, value: V) {
        let (name, value) = (name.as_ref(), value.as_ref());

        match self.position(name) {
            Some(i) => self.entries[i].1 = value.to_owned(),
            None => self
                .entries
                .push((name.to_ascii_lowercase(), value.to_owned())),
        }
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let i = self.position(name)?;
        Some(self.entries.remove(i).1)
    }

    /// Iterates over `(name, value)` pairs in insertion order. Names are
    /// lower-cased.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

impl<N: AsRef<str>, V: AsRef<str>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

#[inline]
fn trim(mut value: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = value {
        value = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = value {
        value = rest;
    }
    value
}
