use std::env;

use serde::{Deserialize, Serialize};

use crate::errors::*;

/// Connection settings for one POP3 account.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AccountConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Wrap the connection in TLS (on by default).
    #[serde(default = "default_secure")]
    pub secure: bool,
    /// Send QUIT after a successful RETR before closing. Off by default:
    /// the session otherwise ends by dropping the connection.
    #[serde(default)]
    pub send_quit: bool,
}

fn default_secure() -> bool {
    true
}

impl AccountConfig {
    /// Builds a config from `MAIL_HOST`, `MAIL_PORT`, `MAIL_USER` and
    /// `MAIL_PASS`. The port is the only value that gets validated, and
    /// only as far as parsing it into a number.
    pub fn from_env() -> Result<AccountConfig> {
        let port = env::var("MAIL_PORT").chain_err(|| "MAIL_PORT is not set")?;
        Ok(AccountConfig {
            host: env::var("MAIL_HOST").chain_err(|| "MAIL_HOST is not set")?,
            port: port
                .parse::<u16>()
                .chain_err(|| "MAIL_PORT is not a valid port number")?,
            username: env::var("MAIL_USER").chain_err(|| "MAIL_USER is not set")?,
            password: env::var("MAIL_PASS").chain_err(|| "MAIL_PASS is not set")?,
            secure: true,
            send_quit: false,
        })
    }
}
