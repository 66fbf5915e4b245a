// This file is part of oxide64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::error;
use std::fmt;

/// Errors surfaced on configuration and loading calls. The core itself
/// never unwinds across step boundaries.
#[derive(Debug)]
pub enum Error {
    Config(String),
    Decode(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
            Error::Decode(msg) => write!(f, "decode error: {}", msg),
        }
    }
}

impl error::Error for Error {}
