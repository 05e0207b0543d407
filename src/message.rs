//! Splitting a retrieved message into headers and body, and decoding an
//! RFC 2047 encoded-word found in the Subject header.
//!
//! Only the subset the fetch path needs is implemented: the first
//! encoded-word in the value is located, and only base64 ("B") words are
//! transformed. Quoted-printable ("Q") words are recognized and left
//! as-is.

use std::collections::HashMap;

use base64::Engine;
use regex::Regex;

lazy_static! {
    static ref ENCODED_WORD: Regex = Regex::new(r"(?i)=\?([^?]+)\?([BQ])\?([^?]*)\?=").unwrap();
}

const BLANK_LINE: &str = "\r\n\r\n";

/// A message split into its header mapping and body text.
///
/// Header names are matched case-sensitively and the last occurrence of
/// a duplicated name wins. A line without a `": "` separator is kept
/// whole as a name with an empty value.
#[derive(Debug)]
pub struct ParsedEmail {
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl ParsedEmail {
    pub fn parse(raw: &str) -> ParsedEmail {
        let (header_block, body) = split_message(raw);
        ParsedEmail {
            headers: parse_headers(header_block),
            body: body.to_string(),
        }
    }

    pub fn subject(&self) -> Option<&str> {
        self.headers.get("Subject").map(|value| value.as_str())
    }

    /// The Subject with a leading encoded-word decoded, or the raw value
    /// when there is nothing to decode or decoding fails.
    pub fn decoded_subject(&self) -> Option<String> {
        self.subject().map(decode_subject)
    }

    /// Whether the body claims to be base64-encoded.
    pub fn is_base64_body(&self) -> bool {
        self.headers
            .get("Content-Transfer-Encoding")
            .map_or(false, |value| value == "base64")
    }
}

/// Splits at the first blank line. Everything after it is body, kept
/// verbatim even when it contains further blank lines. A message without
/// a blank line is all headers and no body.
pub fn split_message(raw: &str) -> (&str, &str) {
    match raw.split_once(BLANK_LINE) {
        Some((header_block, body)) => (header_block, body),
        None => (raw, ""),
    }
}

pub fn parse_headers(header_block: &str) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for line in header_block.split("\r\n") {
        match line.split_once(": ") {
            Some((name, value)) => headers.insert(name.to_string(), value.to_string()),
            None => headers.insert(line.to_string(), String::new()),
        };
    }
    headers
}

/// Transfer encoding of an RFC 2047 encoded-word.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WordEncoding {
    Base64,
    QuotedPrintable,
}

/// One `=?charset?encoding?text?=` fragment of a header value.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedWord {
    pub charset: String,
    pub encoding: WordEncoding,
    pub text: String,
}

impl EncodedWord {
    /// Decodes a base64 word, treating the payload as UTF-8 (invalid
    /// sequences are replaced, not fatal). Returns `None` for
    /// quoted-printable words and for payloads that are not valid
    /// base64, leaving the fallback to the caller.
    pub fn decode(&self) -> Option<String> {
        match self.encoding {
            WordEncoding::Base64 => base64::engine::general_purpose::STANDARD
                .decode(self.text.as_bytes())
                .ok()
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
            WordEncoding::QuotedPrintable => None,
        }
    }
}

/// Finds the first encoded-word anywhere in a header value. The encoding
/// letter matches case-insensitively.
pub fn find_encoded_word(value: &str) -> Option<EncodedWord> {
    let captures = ENCODED_WORD.captures(value)?;
    let encoding = if captures[2].eq_ignore_ascii_case("B") {
        WordEncoding::Base64
    } else {
        WordEncoding::QuotedPrintable
    };
    Some(EncodedWord {
        charset: captures[1].to_string(),
        encoding,
        text: captures[3].to_string(),
    })
}

/// Decodes a Subject value: the first base64 encoded-word becomes the
/// whole subject; anything else comes back unchanged.
pub fn decode_subject(value: &str) -> String {
    match find_encoded_word(value).and_then(|word| word.decode()) {
        Some(decoded) => decoded,
        None => value.to_string(),
    }
}
