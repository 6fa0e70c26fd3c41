/// Result alias that carries the custom [`VisualiserError`] type.
pub type Result<T> = std::result::Result<T, VisualiserError>;

/// Common error type for the core crate.
///
/// Every failure propagates synchronously to the action that triggered it;
/// the core never retries on its own.
#[derive(Debug, thiserror::Error)]
pub enum VisualiserError {
    /// Access to the capture device was refused. Terminal for the start
    /// attempt that triggered it; the session reverts to idle.
    #[error("capture device access was denied")]
    PermissionDenied,
    /// No usable capture device is present or the device went away.
    #[error("no capture device is available")]
    DeviceUnavailable,
    /// Invalid analyzer or session parameters, detected at construction.
    #[error("invalid configuration: {0}")]
    ConfigurationError(String),
    /// A start/stop request against the control plane was rejected.
    #[error("control request failed: {0}")]
    ControlRequestFailed(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl VisualiserError {
    /// Creates a [`VisualiserError::ConfigurationError`] from any message.
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Creates a [`VisualiserError::ControlRequestFailed`] from any message.
    pub fn control<T: Into<String>>(msg: T) -> Self {
        Self::ControlRequestFailed(msg.into())
    }
}
