//! POP3 response classification.

/// Outcome of a response's status indicator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    Ok,
    Err,
}

/// A single server response: the classified status plus the text exactly
/// as it came off the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct POP3Response {
    pub status: Status,
    pub raw: String,
}

impl POP3Response {
    /// Classification is purely textual: a response is OK iff it starts
    /// with the literal `+OK`. Anything else, including an empty or
    /// garbled read, is ERR. The protocol has no numeric status codes.
    pub fn classify(raw: String) -> POP3Response {
        let status = if raw.starts_with("+OK") {
            Status::Ok
        } else {
            Status::Err
        };
        POP3Response { status, raw }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_prefix() {
        assert!(POP3Response::classify("+OK".to_string()).is_ok());
        assert!(POP3Response::classify("+OK 2 320\r\n".to_string()).is_ok());
        assert!(POP3Response::classify("+OK\r\nSubject: x\r\n".to_string()).is_ok());
    }

    #[test]
    fn test_everything_else_is_err() {
        for raw in ["-ERR no\r\n", "", " +OK", "+ok lowercase", "OK", "+", "garbage"] {
            let response = POP3Response::classify(raw.to_string());
            assert_eq!(response.status, Status::Err, "input: {:?}", raw);
        }
    }

    #[test]
    fn test_raw_text_is_preserved() {
        let response = POP3Response::classify("-ERR invalid password\r\n".to_string());
        assert_eq!(response.status, Status::Err);
        assert_eq!(response.raw, "-ERR invalid password\r\n");
    }
}
