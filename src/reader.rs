//! Assembly of raw transport bytes into complete POP3 responses.

const CRLF: &[u8] = b"\r\n";
const MULTILINE_TERMINATOR: &[u8] = b"\r\n.\r\n";

/// How a response is terminated on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResponseKind {
    /// One status line ending in CRLF (USER, PASS, STAT, QUIT).
    SingleLine,
    /// A status line plus payload lines, ended by a lone-dot line
    /// (LIST without an argument, RETR).
    MultiLine,
}

/// Accumulates bytes as they arrive and yields a response only once its
/// terminator has been seen, so responses fragmented across several
/// transport reads come out identical to a single delivery.
pub struct ResponseBuffer {
    buf: Vec<u8>,
}

impl ResponseBuffer {
    pub fn new() -> ResponseBuffer {
        ResponseBuffer { buf: Vec::new() }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Removes and returns the next complete response, or `None` if its
    /// terminator has not arrived yet.
    ///
    /// An ERR status collapses a multi-line response to its status line,
    /// since the server sends no payload after a rejection. The lone-dot
    /// terminator line is not part of the message and is dropped.
    pub fn take_response(&mut self, kind: ResponseKind) -> Option<String> {
        let line_end = find(&self.buf, CRLF)? + CRLF.len();
        match kind {
            ResponseKind::SingleLine => Some(self.drain_text(line_end)),
            ResponseKind::MultiLine => {
                if !self.buf.starts_with(b"+OK") {
                    return Some(self.drain_text(line_end));
                }
                let terminator = find(&self.buf, MULTILINE_TERMINATOR)?;
                let text = self.drain_text(terminator + CRLF.len());
                self.buf.drain(..MULTILINE_TERMINATOR.len() - CRLF.len());
                Some(text)
            }
        }
    }

    /// Drains whatever is buffered, terminated or not. Used once the
    /// transport reports end-of-stream mid-response.
    pub fn take_remainder(&mut self) -> String {
        let len = self.buf.len();
        self.drain_text(len)
    }

    fn drain_text(&mut self, n: usize) -> String {
        let bytes: Vec<u8> = self.buf.drain(..n).collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
