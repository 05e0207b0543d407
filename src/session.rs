//! The POP3 session engine: drives the fixed fetch script
//! USER → PASS → STAT → LIST → RETR over a transport, advancing an
//! explicit session state and halting on the first non-OK response.

use std::io::{Read, Write};

use crate::config::AccountConfig;
use crate::errors::*;
use crate::reader::{ResponseBuffer, ResponseKind};
use crate::response::{POP3Response, Status};
use crate::tcpstream::Transport;

/// Where a session currently stands. Each state has exactly one
/// transition in the fetch script, so extending the script means adding
/// a state rather than reshuffling control flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionState {
    /// Transport is up, greeting not yet consumed.
    Connected,
    /// USER accepted, PASS outstanding.
    Authenticating,
    /// Credentials accepted.
    Authenticated,
    /// Mailbox transaction commands (STAT accepted, LIST/RETR next).
    Transacting,
    /// Transport released. Terminal.
    Closed,
    /// A response classified ERR or the transport failed. The session
    /// still moves to Closed once the transport is released.
    Failed,
}

/// One POP3 connection attempt. Owns its transport exclusively and
/// releases it on every exit path, success or failure.
pub struct POP3Session<T: Transport> {
    account: AccountConfig,
    transport: T,
    buffer: ResponseBuffer,
    state: SessionState,
}

impl<T: Transport> POP3Session<T> {
    pub fn new(account: AccountConfig, transport: T) -> POP3Session<T> {
        trace!(
            "Starting POP3 session for {}@{}",
            account.username,
            account.host
        );
        let session = POP3Session {
            account,
            transport,
            buffer: ResponseBuffer::new(),
            state: SessionState::Connected,
        };
        debug!("SessionState::{:?}", session.state);
        session
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs the whole fetch script and returns the raw RETR response
    /// text. The first ERR-classified response aborts the remaining
    /// script with no cleanup commands; the transport is closed before
    /// returning either way.
    pub fn fetch(&mut self) -> Result<String> {
        assert!(self.state == SessionState::Connected);
        let result = self.run_script();
        if result.is_err() {
            self.state = SessionState::Failed;
            debug!("SessionState::{:?}", self.state);
        }
        self.close();
        result
    }

    fn run_script(&mut self) -> Result<String> {
        // The server speaks first; the script is misaligned by one
        // response unless the banner is consumed before USER.
        self.read_greeting()?;
        loop {
            match self.state {
                SessionState::Connected => self.user()?,
                SessionState::Authenticating => self.pass()?,
                SessionState::Authenticated => {
                    self.stat()?;
                }
                SessionState::Transacting => {
                    self.list()?;
                    let message = self.retr(1)?;
                    if self.account.send_quit {
                        self.quit();
                    }
                    return Ok(message.raw);
                }
                SessionState::Closed | SessionState::Failed => {
                    unreachable!("fetch only drives an open session")
                }
            }
        }
    }

    pub fn user(&mut self) -> Result<()> {
        assert!(self.state == SessionState::Connected);
        trace!("Cmd: USER");
        let username = self.account.username.clone();
        self.send_command("USER", Some(&username), false)?;
        self.state = SessionState::Authenticating;
        debug!("SessionState::{:?}", self.state);
        Ok(())
    }

    pub fn pass(&mut self) -> Result<()> {
        assert!(self.state == SessionState::Authenticating);
        trace!("Cmd: PASS");
        let password = self.account.password.clone();
        self.send_command("PASS", Some(&password), false)?;
        self.state = SessionState::Authenticated;
        debug!("SessionState::{:?}", self.state);
        Ok(())
    }

    /// STAT's message count and total size are not parsed further; only
    /// the OK/ERR gate matters for the fetch script.
    pub fn stat(&mut self) -> Result<POP3Response> {
        assert!(self.state == SessionState::Authenticated);
        trace!("Cmd: STAT");
        let response = self.send_command("STAT", None, false)?;
        self.state = SessionState::Transacting;
        debug!("SessionState::{:?}", self.state);
        Ok(response)
    }

    pub fn list(&mut self) -> Result<POP3Response> {
        assert!(self.state == SessionState::Transacting);
        trace!("Cmd: LIST");
        self.send_command("LIST", None, false)
    }

    pub fn retr(&mut self, msgnum: u32) -> Result<POP3Response> {
        assert!(self.state == SessionState::Transacting);
        trace!("Cmd: RETR");
        self.send_command("RETR", Some(&msgnum.to_string()), false)
    }

    /// Optional goodbye after a successful RETR. The write side is
    /// closed behind the command, so the transport's half-open support
    /// lets the response still be read. Never sent on failure paths,
    /// and a failure here does not fail the fetch.
    fn quit(&mut self) {
        trace!("Cmd: QUIT");
        if let Err(e) = self.send_command("QUIT", None, true) {
            warn!("QUIT after a successful RETR failed: {}", e);
        }
    }

    fn read_greeting(&mut self) -> Result<()> {
        trace!("Reading greeting from server");
        let greeting = self.read_response(ResponseKind::SingleLine)?;
        if greeting.status == Status::Err {
            return Err(ErrorKind::Protocol(greeting.raw).into());
        }
        Ok(())
    }

    /// Writes one command line and reads its classified response. An
    /// ERR response comes back as `ErrorKind::Protocol` carrying the
    /// raw server text. `close_after` shuts the write side down after
    /// flushing and is only ever used for the final command.
    fn send_command(
        &mut self,
        command: &str,
        param: Option<&str>,
        close_after: bool,
    ) -> Result<POP3Response> {
        let kind = match command {
            "LIST" if param.is_none() => ResponseKind::MultiLine,
            "RETR" => ResponseKind::MultiLine,
            _ => ResponseKind::SingleLine,
        };

        let line = match param {
            Some(param) => format!("{} {}\r\n", command, param),
            None => format!("{}\r\n", command),
        };

        if command == "PASS" {
            info!("C: PASS ******");
        } else {
            info!("C: {}", line.trim_end());
        }
        self.transport.write_all(line.as_bytes())?;
        self.transport.flush()?;
        if close_after {
            self.transport.close_write()?;
        }

        let response = self.read_response(kind)?;
        if response.status == Status::Err {
            return Err(ErrorKind::Protocol(response.raw).into());
        }
        Ok(response)
    }

    /// Reads transport bytes into the buffer until a complete response
    /// is available. End-of-stream mid-response yields whatever has
    /// accumulated (possibly nothing) and leaves the verdict to
    /// classification.
    fn read_response(&mut self, kind: ResponseKind) -> Result<POP3Response> {
        let raw = loop {
            if let Some(text) = self.buffer.take_response(kind) {
                break text;
            }
            let mut chunk = [0u8; 1024];
            let n = self.transport.read(&mut chunk)?;
            if n == 0 {
                break self.buffer.take_remainder();
            }
            self.buffer.extend(&chunk[..n]);
        };
        info!("S: {}", raw.trim_end());
        Ok(POP3Response::classify(raw))
    }

    fn close(&mut self) {
        if let Err(e) = self.transport.close() {
            debug!("Error releasing transport: {}", e);
        }
        self.state = SessionState::Closed;
        debug!("SessionState::{:?}", self.state);
    }
}
