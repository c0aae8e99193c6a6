use playtally_core::LibraryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MpcError {
    #[error("i/o error talking to the daemon: {0}")]
    Io(#[from] std::io::Error),
    #[error("daemon closed the connection")]
    Closed,
    #[error("not connected to the daemon")]
    NotConnected,
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("daemon rejected {command}: {message} (code {code}@{index})")]
    Ack {
        code: u32,
        index: u32,
        command: String,
        message: String,
    },
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("failed to re-connect to the daemon after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
    #[error("stopped")]
    Stopped,
    #[error("library error: {0}")]
    Library(#[from] LibraryError),
}

impl MpcError {
    /// Errors worth a reconnect: the link is gone, the daemon is still there.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            MpcError::Io(_) | MpcError::Closed | MpcError::NotConnected
        )
    }
}

pub type MpcResult<T> = Result<T, MpcError>;
