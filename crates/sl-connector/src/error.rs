//! Connector errors

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Failed to send to the driver queue")]
    SendFailed,

    #[error("Driver is not running")]
    DriverStopped,
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;
