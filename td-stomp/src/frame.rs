//! STOMP 1.2 frame codec.
//!
//! A frame is a command line, header lines, a blank line, then a body
//! terminated by NUL. Lines end in LF with optional preceding CR. Header
//! names and values are escaped (`\\`, `\n`, `\r`, `\c`) except on
//! CONNECT/CONNECTED frames, which predate the escaping rules.

use crate::{Result, StompError};

/// One STOMP frame. Headers keep wire order; the first occurrence of a
/// repeated header wins on lookup, per the specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn new(command: impl Into<String>) -> Self {
        Frame {
            command: command.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Builder-style header append.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First value for a header name, if present.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Body as text. The feeds carry JSON, so lossy conversion is fine.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Serialize for the wire, NUL terminator included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let escaped = escaped_command(&self.command);
        let mut out = Vec::with_capacity(64 + self.body.len());
        out.extend_from_slice(self.command.as_bytes());
        out.push(b'\n');
        for (name, value) in &self.headers {
            if escaped {
                out.extend_from_slice(escape(name).as_bytes());
                out.push(b':');
                out.extend_from_slice(escape(value).as_bytes());
            } else {
                out.extend_from_slice(name.as_bytes());
                out.push(b':');
                out.extend_from_slice(value.as_bytes());
            }
            out.push(b'\n');
        }
        out.push(b'\n');
        out.extend_from_slice(&self.body);
        out.push(0);
        out
    }
}

/// CONNECT and CONNECTED headers are passed through verbatim.
fn escaped_command(command: &str) -> bool {
    command != "CONNECT" && command != "CONNECTED"
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            other => {
                return Err(StompError::BadFrame(format!(
                    "invalid header escape \\{}",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}

/// Number of leading EOL bytes (server heartbeats between frames). The
/// caller drains these before attempting a parse.
pub fn leading_eol_len(buf: &[u8]) -> usize {
    buf.iter()
        .take_while(|&&b| b == b'\n' || b == b'\r')
        .count()
}

/// Try to parse one complete frame from the start of `buf`.
///
/// Returns the frame plus the number of bytes consumed, or `None` when the
/// buffer does not yet hold a complete frame. Errors only on data that can
/// never become a valid frame.
pub fn parse_frame(buf: &[u8]) -> Result<Option<(Frame, usize)>> {
    let command_end = match find_line_end(buf, 0) {
        Some(end) => end,
        None => return Ok(None),
    };
    let command = line_str(buf, 0, command_end)?;
    if command.is_empty() {
        return Err(StompError::BadFrame("empty command line".into()));
    }
    let escaped = escaped_command(command);

    // Header lines until the blank line
    let mut headers = Vec::new();
    let mut pos = command_end + 1;
    let body_start = loop {
        let line_end = match find_line_end(buf, pos) {
            Some(end) => end,
            None => return Ok(None),
        };
        let line = line_str(buf, pos, line_end)?;
        pos = line_end + 1;
        if line.is_empty() {
            break pos;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| StompError::BadFrame(format!("header without colon: {line}")))?;
        if escaped {
            headers.push((unescape(name)?, unescape(value)?));
        } else {
            headers.push((name.to_string(), value.to_string()));
        }
    };
    let command = command.to_string();

    // Body: sized by content-length when present, NUL-scanned otherwise
    let content_length = headers
        .iter()
        .find(|(n, _)| n == "content-length")
        .map(|(_, v)| {
            v.parse::<usize>()
                .map_err(|_| StompError::BadFrame(format!("bad content-length: {v}")))
        })
        .transpose()?;

    match content_length {
        Some(len) => {
            let terminator = body_start + len;
            if buf.len() <= terminator {
                return Ok(None);
            }
            if buf[terminator] != 0 {
                return Err(StompError::BadFrame(
                    "missing NUL after sized body".into(),
                ));
            }
            let body = buf[body_start..terminator].to_vec();
            Ok(Some((
                Frame {
                    command,
                    headers,
                    body,
                },
                terminator + 1,
            )))
        }
        None => {
            let terminator = match buf[body_start..].iter().position(|&b| b == 0) {
                Some(offset) => body_start + offset,
                None => return Ok(None),
            };
            let body = buf[body_start..terminator].to_vec();
            Ok(Some((
                Frame {
                    command,
                    headers,
                    body,
                },
                terminator + 1,
            )))
        }
    }
}

/// Offset of the LF ending the line starting at `from`, excluding an
/// optional CR before it.
fn find_line_end(buf: &[u8], from: usize) -> Option<usize> {
    buf[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|offset| from + offset)
}

fn line_str(buf: &[u8], start: usize, line_end: usize) -> Result<&str> {
    let mut end = line_end;
    if end > start && buf[end - 1] == b'\r' {
        end -= 1;
    }
    std::str::from_utf8(&buf[start..end])
        .map_err(|_| StompError::BadFrame("non-UTF-8 frame line".into()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(bytes: &[u8]) -> (Frame, usize) {
        parse_frame(bytes).unwrap().expect("complete frame")
    }

    #[test]
    fn test_serialize_subscribe() {
        let frame = Frame::new("SUBSCRIBE")
            .header("destination", "/topic/TD_ALL_SIG_AREA")
            .header("id", "1")
            .header("ack", "auto");
        assert_eq!(
            frame.to_bytes(),
            b"SUBSCRIBE\ndestination:/topic/TD_ALL_SIG_AREA\nid:1\nack:auto\n\n\0"
        );
    }

    #[test]
    fn test_roundtrip() {
        let frame = Frame::new("SEND")
            .header("destination", "/queue/x")
            .header("custom", "plain value");
        let bytes = frame.to_bytes();
        let (parsed, consumed) = parse_all(&bytes);
        assert_eq!(parsed, frame);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn test_header_escaping_roundtrip() {
        let frame = Frame::new("SEND").header("weird:name", "line\none\\two\rthree:");
        let (parsed, _) = parse_all(&frame.to_bytes());
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_connect_headers_not_escaped() {
        let frame = Frame::new("CONNECT").header("login", "user:name");
        let bytes = frame.to_bytes();
        assert!(bytes.windows(15).any(|w| w == &b"login:user:name"[..]));
        let (parsed, _) = parse_all(&bytes);
        assert_eq!(parsed.get_header("login"), Some("user:name"));
    }

    #[test]
    fn test_parse_message_with_body() {
        let bytes = b"MESSAGE\ndestination:/topic/TD_ALL_SIG_AREA\nack:a1\n\n[{\"CA_MSG\":{}}]\0";
        let (frame, consumed) = parse_all(bytes);
        assert_eq!(frame.command, "MESSAGE");
        assert_eq!(frame.get_header("ack"), Some("a1"));
        assert_eq!(frame.body_text(), "[{\"CA_MSG\":{}}]");
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn test_parse_crlf_lines() {
        let bytes = b"CONNECTED\r\nversion:1.2\r\n\r\n\0";
        let (frame, _) = parse_all(bytes);
        assert_eq!(frame.command, "CONNECTED");
        assert_eq!(frame.get_header("version"), Some("1.2"));
    }

    #[test]
    fn test_content_length_body_may_contain_nul() {
        let mut bytes = b"MESSAGE\ncontent-length:5\n\n".to_vec();
        bytes.extend_from_slice(b"a\0b\0c\0");
        let (frame, consumed) = parse_all(&bytes);
        assert_eq!(frame.body, b"a\0b\0c");
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn test_content_length_missing_nul_is_error() {
        let bytes = b"MESSAGE\ncontent-length:2\n\nabX";
        assert!(matches!(
            parse_frame(bytes),
            Err(StompError::BadFrame(_))
        ));
    }

    #[test]
    fn test_incomplete_frames() {
        assert!(parse_frame(b"MESS").unwrap().is_none());
        assert!(parse_frame(b"MESSAGE\ndest").unwrap().is_none());
        assert!(parse_frame(b"MESSAGE\nack:a1\n\nbody so far").unwrap().is_none());
        assert!(parse_frame(b"MESSAGE\ncontent-length:10\n\nshort").unwrap().is_none());
    }

    #[test]
    fn test_first_repeated_header_wins() {
        let bytes = b"MESSAGE\nfoo:first\nfoo:second\n\n\0";
        let (frame, _) = parse_all(bytes);
        assert_eq!(frame.get_header("foo"), Some("first"));
    }

    #[test]
    fn test_header_without_colon_is_error() {
        assert!(matches!(
            parse_frame(b"MESSAGE\nnocolon\n\n\0"),
            Err(StompError::BadFrame(_))
        ));
    }

    #[test]
    fn test_leading_eol_len() {
        assert_eq!(leading_eol_len(b""), 0);
        assert_eq!(leading_eol_len(b"\n\nMESSAGE"), 2);
        assert_eq!(leading_eol_len(b"\r\nMESSAGE"), 2);
        assert_eq!(leading_eol_len(b"MESSAGE\n"), 0);
    }

    #[test]
    fn test_trailing_bytes_left_for_next_parse() {
        let bytes = b"RECEIPT\nreceipt-id:1\n\n\0MESSAGE\n\n\0";
        let (frame, consumed) = parse_all(bytes);
        assert_eq!(frame.command, "RECEIPT");
        let (next, _) = parse_all(&bytes[consumed..]);
        assert_eq!(next.command, "MESSAGE");
    }
}
