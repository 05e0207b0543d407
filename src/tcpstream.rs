use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

use openssl::ssl::{SslConnector, SslMethod, SslStream};

use crate::errors::*;

/// A duplex byte stream a POP3 session can run on.
///
/// `close_write` shuts down only the write side, leaving the read side
/// open so a final response can still be collected (half-open operation).
/// `close` releases the whole stream.
pub trait Transport: Read + Write {
    fn close_write(&mut self) -> io::Result<()>;
    fn close(&mut self) -> io::Result<()>;
}

/// The real network transport: a TCP connection, optionally TLS-wrapped.
#[derive(Debug)]
pub enum POP3Stream {
    Plain(TcpStream),
    Ssl(SslStream<TcpStream>),
}

/// Connects to `host:port` and returns a ready transport. With `secure`
/// set, the stream is wrapped in TLS with certificate and hostname
/// verification.
pub fn open(host: &str, port: u16, secure: bool) -> Result<POP3Stream> {
    debug!("Connecting to {}:{} (secure: {})", host, port, secure);
    let tcp_stream = TcpStream::connect((host, port))?;
    if secure {
        let connector = SslConnector::builder(SslMethod::tls())?.build();
        let stream = connector.connect(host, tcp_stream)?;
        Ok(POP3Stream::Ssl(stream))
    } else {
        Ok(POP3Stream::Plain(tcp_stream))
    }
}

impl Read for POP3Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match *self {
            POP3Stream::Plain(ref mut stream) => stream.read(buf),
            POP3Stream::Ssl(ref mut stream) => stream.read(buf),
        }
    }
}

impl Write for POP3Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match *self {
            POP3Stream::Plain(ref mut stream) => stream.write(buf),
            POP3Stream::Ssl(ref mut stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match *self {
            POP3Stream::Plain(ref mut stream) => stream.flush(),
            POP3Stream::Ssl(ref mut stream) => stream.flush(),
        }
    }
}

impl Transport for POP3Stream {
    fn close_write(&mut self) -> io::Result<()> {
        match *self {
            POP3Stream::Plain(ref stream) => stream.shutdown(Shutdown::Write),
            POP3Stream::Ssl(ref mut stream) => {
                // close_notify first, then the TCP half-close
                stream
                    .shutdown()
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
                stream.get_ref().shutdown(Shutdown::Write)
            }
        }
    }

    fn close(&mut self) -> io::Result<()> {
        match *self {
            POP3Stream::Plain(ref stream) => stream.shutdown(Shutdown::Both),
            POP3Stream::Ssl(ref mut stream) => {
                let _ = stream.shutdown();
                stream.get_ref().shutdown(Shutdown::Both)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_open_plain_supports_half_open() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            // read_to_end returns once the client closes its write side
            sock.read_to_end(&mut received).unwrap();
            sock.write_all(b"pong\r\n").unwrap();
            received
        });

        let mut stream = open("127.0.0.1", port, false).unwrap();
        stream.write_all(b"ping\r\n").unwrap();
        stream.flush().unwrap();
        stream.close_write().unwrap();

        // the read side must survive the write-side shutdown
        let mut response = Vec::new();
        stream.read_to_end(&mut response).unwrap();
        assert_eq!(response, b"pong\r\n");
        assert_eq!(server.join().unwrap(), b"ping\r\n");

        let _ = stream.close();
    }

    #[test]
    fn test_open_refused_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        assert!(open("127.0.0.1", port, false).is_err());
    }
}
