use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Channel closed: no receiver is listening")]
    ChannelClosed,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Worker task failed: {0}")]
    TaskFailed(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MonitorError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MonitorError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
