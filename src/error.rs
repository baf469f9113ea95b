/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure or a non-success HTTP status. The body is never decoded.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Malformed upstream input. The message carries the offending fragment.
    #[error("parse error: {0}")]
    Parse(String),

    /// An internal invariant did not hold, e.g. bracketing profiles of different sizes.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        match err.url() {
            Some(url) => Error::Fetch(format!("{}: {}", url, err)),
            None => Error::Fetch(err.to_string()),
        }
    }
}
