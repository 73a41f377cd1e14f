//! TLS error domain
//!
//! Maps native engine failures to a uniform error type. Engine-backed
//! errors come in two categories: configuration/crypto failures raised
//! while installing credential material (`Engine`), and failures on an
//! in-progress connection reported by a stream collaborator (`Stream`).
//! Both carry the engine's own formatted message.

use openssl::error::ErrorStack;

/// TLS configuration and credential errors
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    /// The engine rejected configuration or credential material
    #[error("TLS engine error: {}", engine_message(.0))]
    Engine(#[from] ErrorStack),

    /// The engine reported a failure on an in-progress connection
    #[error("TLS stream error: {}", engine_message(.0))]
    Stream(ErrorStack),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A private key was supplied before its paired certificate
    #[error("private key installed before certificate")]
    KeyWithoutCertificate,

    /// Material parsed but unusable (e.g. a CA buffer with no certificates)
    #[error("certificate error: {0}")]
    Certificate(String),

    /// The credential store was already handed to a connection
    #[error("credentials already finalized for handshake use")]
    Finalized,

    #[error("invalid method encoding: {0:#06x}")]
    InvalidMethod(u32),
}

impl TlsError {
    /// Wrap an engine failure from the connection/stream layer.
    ///
    /// Used by stream collaborators so handshake and record-layer
    /// failures stay distinguishable from configuration failures.
    pub fn stream(stack: ErrorStack) -> Self {
        TlsError::Stream(stack)
    }

    /// True for engine rejections during configuration
    pub fn is_engine(&self) -> bool {
        matches!(self, TlsError::Engine(_))
    }

    /// True for engine failures on an in-progress connection
    pub fn is_stream(&self) -> bool {
        matches!(self, TlsError::Stream(_))
    }
}

/// Format an engine error stack, falling back to a generic message when
/// the engine has nothing to say.
fn engine_message(stack: &ErrorStack) -> String {
    let msg = stack.to_string();
    if msg.is_empty() {
        "unknown TLS engine error".to_string()
    } else {
        msg
    }
}
