//! TLS context and credential management over OpenSSL
//!
//! This crate provides the configuration side of a TLS stack: a uniform,
//! role-agnostic API for trust and identity material (certificates,
//! private keys, CA stores, passphrase-protected keys), negotiation
//! policy (role, protocol version, verification mode), and
//! handshake-time extensibility (SNI and verification callbacks). The
//! handshake itself, record I/O, and X.509 parsing stay with the engine
//! and the connection layer built on top.
//!
//! # Architecture
//!
//! 1. [`TlsContext`] is the movable configuration handle
//! 2. [`CredentialStore`] owns the native engine handle and all material;
//!    it is reference-counted so connections outlive the context
//! 3. A connection/stream layer calls
//!    [`CredentialStore::handshake_context`] to obtain the finalized
//!    engine context and drive the handshake
//!
//! Certificate/key pairs install eagerly (the engine wants the pair in
//! one step, so the certificate is staged until its key arrives), while
//! verification mode and the two callbacks stay stored until a
//! connection finalizes the store.
//!
//! # Examples
//!
//! ```no_run
//! use tlsctx::{FileFormat, Method, TlsContext, VerifyMode};
//!
//! let mut ctx = TlsContext::new(Method::TLS_SERVER);
//! ctx.use_certificate_file("server.pem", FileFormat::Pem).unwrap();
//! ctx.use_private_key_file("server-key.pem", FileFormat::Pem).unwrap();
//! ctx.set_verify_mode(VerifyMode::PEER).unwrap();
//! ctx.set_servername_callback(|_ssl, name| name == "example.com").unwrap();
//!
//! // A connection layer takes over from here:
//! let engine_ctx = ctx.handshake_context().unwrap();
//! # let _ = engine_ctx;
//! ```

pub mod cert;
pub mod context;
pub mod error;
pub mod method;
pub mod options;
pub mod store;
pub mod verify;

pub use cert::{CertInfo, FileFormat};
pub use context::{ContextId, TlsContext};
pub use error::TlsError;
pub use method::{Method, Role, TlsVersion, VersionConstraint};
pub use options::TlsOptions;
pub use store::CredentialStore;
pub use verify::{ServernameCallback, VerifyCallback, VerifyContext, VerifyMode};

/// Result type for TLS configuration operations
pub type Result<T> = std::result::Result<T, TlsError>;
