use std::fmt;
use std::str::FromStr;

use crate::error::{EnvelopeError, Result};

/// A location in the configuration tree, e.g. `interface dataplane dp0s3 mtu`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigPath {
    tokens: Vec<String>,
}

impl ConfigPath {
    /// Parse a space-separated path. Runs of spaces and leading or trailing
    /// spaces produce empty tokens and are rejected.
    pub fn parse(path: &str) -> Result<Self> {
        Self::from_tokens(path.split(' '))
    }

    /// Build a path from individual tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        let invalid = |tokens: &[String], reason| EnvelopeError::InvalidPath {
            path: tokens.join(" "),
            reason,
        };

        if tokens.is_empty() || (tokens.len() == 1 && tokens[0].is_empty()) {
            return Err(invalid(&tokens, "path is empty"));
        }
        if tokens.iter().any(String::is_empty) {
            return Err(invalid(&tokens, "path has an empty token"));
        }
        if tokens.iter().any(|t| t.contains(' ')) {
            return Err(invalid(&tokens, "token contains a space"));
        }
        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The envelope key: tokens joined by single spaces.
    pub fn key(&self) -> String {
        self.tokens.join(" ")
    }

    /// Append a token, returning the longer path.
    pub fn join(&self, token: impl Into<String>) -> Result<Self> {
        let mut tokens = self.tokens.clone();
        tokens.push(token.into());
        Self::from_tokens(tokens)
    }
}

impl FromStr for ConfigPath {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
