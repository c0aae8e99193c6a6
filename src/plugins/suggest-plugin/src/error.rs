use playtally_core::{LibraryError, QueryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SuggestError {
    #[error("network error: {message}")]
    Network { message: String },
    #[error("authentication failed: {message}")]
    Authentication { message: String },
    #[error("Last.fm error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("unexpected HTTP status {status}")]
    Http { status: u16 },
    #[error("could not decode response: {message}")]
    Decode { message: String },
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error("could not write suggestions: {0}")]
    Output(#[from] std::io::Error),
}

pub type SuggestResult<T> = Result<T, SuggestError>;
