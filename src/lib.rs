//! A minimal POP3 client that logs in, checks the mailbox and fetches the
//! first message, decoding an RFC 2047 encoded Subject line if one is
//! present. Built for one-shot "fetch my mail" requests rather than full
//! mailbox management.

#[macro_use]
extern crate log;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;

pub mod errors {
    error_chain! {
        foreign_links {
            Io(::std::io::Error);
            SslStack(::openssl::error::ErrorStack);
            SslHandshake(::openssl::ssl::HandshakeError<::std::net::TcpStream>);
            Json(::serde_json::Error);
        }

        errors {
            Protocol(response: String) {
                description("POP3 server returned an error response")
                display("server error: {}", response.trim_end())
            }
        }
    }
}

mod config;
mod handler;
mod message;
mod reader;
mod response;
mod session;
mod tcpstream;

pub use crate::config::AccountConfig;
pub use crate::handler::{fetch_mail, ServiceResponse};
pub use crate::message::{
    decode_subject, find_encoded_word, parse_headers, split_message, EncodedWord, ParsedEmail,
    WordEncoding,
};
pub use crate::response::{POP3Response, Status};
pub use crate::session::{POP3Session, SessionState};
pub use crate::tcpstream::{open, POP3Stream, Transport};
