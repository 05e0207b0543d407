//! The service boundary: run the whole fetch script for one account and
//! shape the outcome for the caller.

use serde::Serialize;

use crate::config::AccountConfig;
use crate::errors::*;
use crate::message::ParsedEmail;
use crate::session::POP3Session;
use crate::tcpstream::open;

/// Caller-visible outcome of a fetch request.
///
/// A protocol failure deliberately carries the server's own ERR text
/// verbatim, with no envelope around it. Transport failures never reach
/// this type; they propagate as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceResponse {
    /// JSON success envelope.
    Success { body: String },
    /// Raw ERR response text from the first rejected command.
    ProtocolFailure(String),
}

impl ServiceResponse {
    pub fn body(&self) -> &str {
        match *self {
            ServiceResponse::Success { ref body } => body,
            ServiceResponse::ProtocolFailure(ref raw) => raw,
        }
    }

    pub fn content_type(&self) -> Option<&'static str> {
        match *self {
            ServiceResponse::Success { .. } => Some("application/json"),
            ServiceResponse::ProtocolFailure(_) => None,
        }
    }
}

#[derive(Serialize)]
struct SuccessEnvelope<'a> {
    status: &'a str,
    message: &'a str,
    data: &'a str,
}

/// Opens a transport for the account, runs the fetch script and returns
/// the shaped response. The decoded Subject and the body's
/// Content-Transfer-Encoding verdict are logged, not returned; the
/// envelope's `data` field stays the raw RETR text.
pub fn fetch_mail(account: &AccountConfig) -> Result<ServiceResponse> {
    let transport = open(&account.host, account.port, account.secure)?;
    let mut session = POP3Session::new(account.clone(), transport);

    let raw = match session.fetch() {
        Ok(raw) => raw,
        Err(Error(ErrorKind::Protocol(response), _)) => {
            return Ok(ServiceResponse::ProtocolFailure(response));
        }
        Err(e) => return Err(e),
    };

    let email = ParsedEmail::parse(&raw);
    if let Some(subject) = email.decoded_subject() {
        info!("Subject: {}", subject);
    }
    debug!("base64-encoded body: {}", email.is_base64_body());

    let body = serde_json::to_string(&SuccessEnvelope {
        status: "success",
        message: "Mail fetched successfully",
        data: &raw,
    })?;
    Ok(ServiceResponse::Success { body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    /// One-connection scripted POP3 server: sends the greeting, then
    /// answers each incoming command line with the next canned reply.
    /// Returns every command line it saw, including any the client
    /// should not have sent.
    fn mock_server(
        greeting: &'static str,
        replies: Vec<&'static str>,
    ) -> (u16, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (sock, _) = listener.accept().unwrap();
            let mut writer = sock.try_clone().unwrap();
            let mut reader = BufReader::new(sock);
            writer.write_all(greeting.as_bytes()).unwrap();

            let mut commands = Vec::new();
            for reply in replies {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 {
                    break;
                }
                commands.push(line);
                writer.write_all(reply.as_bytes()).unwrap();
            }
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 {
                commands.push(line.clone());
                line.clear();
            }
            commands
        });
        (port, handle)
    }

    fn account(port: u16) -> AccountConfig {
        AccountConfig {
            host: "127.0.0.1".to_string(),
            port,
            username: "jane".to_string(),
            password: "hunter2".to_string(),
            secure: false,
            send_quit: false,
        }
    }

    #[test]
    fn test_fetch_mail_success_envelope() {
        let (port, server) = mock_server(
            "+OK ready\r\n",
            vec![
                "+OK\r\n",
                "+OK logged in\r\n",
                "+OK 1 120\r\n",
                "+OK 1 messages\r\n1 120\r\n.\r\n",
                "+OK\r\nSubject: =?UTF-8?B?SGk=?=\r\n\r\nHi there\r\n.\r\n",
            ],
        );

        let response = fetch_mail(&account(port)).unwrap();
        assert_eq!(response.content_type(), Some("application/json"));

        let envelope: serde_json::Value = serde_json::from_str(response.body()).unwrap();
        assert_eq!(envelope["status"], "success");
        assert_eq!(envelope["message"], "Mail fetched successfully");
        let data = envelope["data"].as_str().unwrap();
        assert_eq!(data, "+OK\r\nSubject: =?UTF-8?B?SGk=?=\r\n\r\nHi there\r\n");

        // the decoded subject is computed (and logged) from the raw text
        let email = ParsedEmail::parse(data);
        assert_eq!(email.decoded_subject().unwrap(), "Hi");

        let commands = server.join().unwrap();
        assert_eq!(
            commands,
            vec![
                "USER jane\r\n",
                "PASS hunter2\r\n",
                "STAT\r\n",
                "LIST\r\n",
                "RETR 1\r\n"
            ]
        );
    }

    #[test]
    fn test_fetch_mail_short_circuits_on_err() {
        let (port, server) = mock_server(
            "+OK ready\r\n",
            vec!["+OK\r\n", "-ERR invalid password\r\n"],
        );

        let response = fetch_mail(&account(port)).unwrap();
        assert_eq!(
            response,
            ServiceResponse::ProtocolFailure("-ERR invalid password\r\n".to_string())
        );
        assert_eq!(response.body(), "-ERR invalid password\r\n");
        assert_eq!(response.content_type(), None);

        // no command after the rejected PASS was issued
        let commands = server.join().unwrap();
        assert_eq!(commands, vec!["USER jane\r\n", "PASS hunter2\r\n"]);
    }

    #[test]
    fn test_fetch_mail_sends_quit_when_configured() {
        let (port, server) = mock_server(
            "+OK ready\r\n",
            vec![
                "+OK\r\n",
                "+OK logged in\r\n",
                "+OK 1 120\r\n",
                "+OK 1 messages\r\n1 120\r\n.\r\n",
                "+OK\r\nSubject: Hi\r\n\r\nHi there\r\n.\r\n",
                "+OK bye\r\n",
            ],
        );

        let mut config = account(port);
        config.send_quit = true;
        let response = fetch_mail(&config).unwrap();
        assert_eq!(response.content_type(), Some("application/json"));

        let commands = server.join().unwrap();
        assert_eq!(commands.last().unwrap(), "QUIT\r\n");
    }

    #[test]
    fn test_fetch_mail_propagates_transport_errors() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = fetch_mail(&account(port)).unwrap_err();
        match err.kind() {
            ErrorKind::Protocol(_) => panic!("refused connection is not a protocol failure"),
            _ => {}
        }
    }
}
