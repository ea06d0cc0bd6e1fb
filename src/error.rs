use std::error::Error as StdError;
use std::io;

use rusoto_core::RusotoError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Only found {found} files, expected at least {expected}")]
    Validation { found: usize, expected: usize },
    #[error("storage request failed: {0}")]
    Storage(String),
    #[error("no {0} in storage response")]
    MissingField(&'static str),
    #[error(transparent)]
    Args(#[from] clap::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl<E> From<RusotoError<E>> for Error
where
    E: StdError + 'static,
{
    fn from(e: RusotoError<E>) -> Self {
        Self::Storage(format!("{}", e))
    }
}
