//! Bridge error types

use std::io;
use thiserror::Error;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors that can occur in the streaming bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Failed to open the DMA stream or register device
    #[error("Failed to open device {path}: {source}")]
    DeviceOpen {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Device read/write failed mid-stream
    #[error("Device I/O failed: {0}")]
    DeviceIo(#[from] io::Error),

    /// Stream bytes can no longer be trusted: the frame marker was not
    /// found where the protocol requires it
    #[error("Stream desynchronized: {0}")]
    Desync(String),

    /// Datagram transmission failed for one DDC channel
    #[error("Send failed on DDC {channel}: {source}")]
    Send {
        channel: usize,
        #[source]
        source: io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    /// Session-fatal errors tear down the current streaming session but
    /// leave the worker able to start a fresh one. Everything else is a
    /// startup resource failure that ends the worker.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::Desync(_) | BridgeError::Send { .. } | BridgeError::DeviceIo(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_fatal_classification() {
        let desync = BridgeError::Desync("marker missing".to_string());
        assert!(desync.is_session_fatal());

        let send = BridgeError::Send {
            channel: 2,
            source: io::Error::new(io::ErrorKind::Other, "unreachable"),
        };
        assert!(send.is_session_fatal());

        let open = BridgeError::DeviceOpen {
            path: "/dev/xdma0_c2h_0".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such device"),
        };
        assert!(!open.is_session_fatal());
    }
}
