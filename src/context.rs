//! TLS context handle
//!
//! `TlsContext` is the public configuration handle: a thin proxy over a
//! shared [`CredentialStore`]. The handle is movable and non-copyable;
//! the store it owns is reference-counted, so stream collaborators that
//! took a [`TlsContext::credentials`] reference keep the credential
//! material (and the native engine handle) alive after the context is
//! dropped.

use std::num::NonZeroU64;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use openssl::ssl::{SslContext, SslRef};

use crate::cert::FileFormat;
use crate::method::Method;
use crate::options::TlsOptions;
use crate::store::CredentialStore;
use crate::verify::{ServernameCallback, VerifyCallback, VerifyContext, VerifyMode};
use crate::Result;

/// Process-unique identity of a context handle.
///
/// The credential store records the id of its owning context instead of
/// a pointer: the id travels with the context value across moves, and a
/// stale id can never be dereferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(NonZeroU64);

impl ContextId {
    fn next() -> ContextId {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        let id = NEXT.fetch_add(1, Ordering::Relaxed);
        ContextId(NonZeroU64::new(id).expect("context id counter wrapped"))
    }
}

/// TLS configuration and credential handle
///
/// Construct with a [`Method`], configure trust and identity material,
/// then hand [`TlsContext::credentials`] (or the finalized engine
/// context) to a connection. Configuration takes `&mut self`: a context
/// is meant to be fully configured before it is shared.
pub struct TlsContext {
    store: Arc<CredentialStore>,
    id: ContextId,
}

impl TlsContext {
    /// Create a context for the given negotiation method.
    ///
    /// # Panics
    ///
    /// Panics if the engine cannot allocate a credential handle.
    pub fn new(method: Method) -> TlsContext {
        let id = ContextId::next();
        TlsContext {
            store: CredentialStore::new(method, id),
            id,
        }
    }

    /// This handle's identity, as recorded in the store's owner field
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// The role/version method fixed at construction
    pub fn method(&self) -> Method {
        self.store.method()
    }

    /// Shared reference to the credential store.
    ///
    /// Stream collaborators retain the store through this; the store
    /// outlives the context while any reference is held.
    pub fn credentials(&self) -> Arc<CredentialStore> {
        Arc::clone(&self.store)
    }

    /// Raw engine handle; see [`CredentialStore::native_handle`]
    pub fn native_handle(&self) -> *mut openssl_sys::SSL_CTX {
        self.store.native_handle()
    }

    /// Finalize and return the engine context a connection is created
    /// from; see [`CredentialStore::handshake_context`]
    pub fn handshake_context(&self) -> Result<SslContext> {
        self.store.handshake_context()
    }

    /// Set the peer verification mode
    pub fn set_verify_mode(&mut self, mode: VerifyMode) -> Result<()> {
        self.store.set_verify_mode(mode)
    }

    /// Set the legacy options bit-set
    pub fn set_options(&mut self, options: TlsOptions) -> Result<()> {
        self.store.set_options(options)
    }

    /// Reset the options bit-set to empty
    pub fn clear_options(&mut self) -> Result<()> {
        self.store.clear_options()
    }

    /// Load the platform's system trust anchors
    pub fn set_default_verify_paths(&mut self) -> Result<()> {
        self.store.set_default_verify_paths()
    }

    /// Set the per-certificate verification predicate
    pub fn set_verify_callback<F>(&mut self, callback: F) -> Result<()>
    where
        F: Fn(bool, &mut VerifyContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.store.set_verify_callback(callback)
    }

    /// Set the server-name-indication predicate
    pub fn set_servername_callback<F>(&mut self, callback: F) -> Result<()>
    where
        F: Fn(&mut SslRef, &str) -> bool + Send + Sync + 'static,
    {
        self.store.set_servername_callback(callback)
    }

    /// Set the passphrase for subsequently installed private keys
    pub fn use_passphrase(&mut self, passphrase: impl Into<String>) -> Result<()> {
        self.store.use_passphrase(passphrase)
    }

    /// Stage a certificate file for the next private key installation
    pub fn use_certificate_file(
        &mut self,
        path: impl AsRef<Path>,
        format: FileFormat,
    ) -> Result<()> {
        self.store.use_certificate_file(path, format)
    }

    /// Stage an in-memory certificate for the next private key
    /// installation
    pub fn use_certificate(&mut self, certificate: &[u8], format: FileFormat) -> Result<()> {
        self.store.use_certificate(certificate, format)
    }

    /// Install the staged certificate file and this private key file
    pub fn use_private_key_file(
        &mut self,
        path: impl AsRef<Path>,
        format: FileFormat,
    ) -> Result<()> {
        self.store.use_private_key_file(path, format)
    }

    /// Install the staged certificate buffer and this private key buffer
    pub fn use_private_key(&mut self, key: &[u8], format: FileFormat) -> Result<()> {
        self.store.use_private_key(key, format)
    }

    /// Accepted and ignored; the engine negotiates DH parameters itself
    pub fn use_tmp_dh(&mut self, dh: &[u8]) -> Result<()> {
        self.store.use_tmp_dh(dh)
    }

    /// Accepted and ignored; the engine negotiates DH parameters itself
    pub fn use_tmp_dh_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.store.use_tmp_dh_file(path)
    }

    /// Install CA certificates from memory into the trust store
    pub fn set_verify_trust(&mut self, certificate: &[u8], format: FileFormat) -> Result<()> {
        self.store.set_verify_trust(certificate, format)
    }

    /// The configured verification predicate, if any
    pub fn verify_callback(&self) -> Option<Arc<VerifyCallback>> {
        self.store.verify_callback()
    }

    /// The configured SNI predicate, if any
    pub fn servername_callback(&self) -> Option<Arc<ServernameCallback>> {
        self.store.servername_callback()
    }

    /// The stored verification mode
    pub fn verify_mode(&self) -> VerifyMode {
        self.store.verify_mode()
    }

    /// The stored options bit-set
    pub fn options(&self) -> TlsOptions {
        self.store.options()
    }
}

impl Drop for TlsContext {
    fn drop(&mut self) {
        // Clears only the back-reference; the store lives on while any
        // other holder keeps a reference.
        self.store.clear_owner(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construct_and_native_handle() {
        let ctx = TlsContext::new(Method::TLS_CLIENT);
        assert!(!ctx.native_handle().is_null());
        assert_eq!(ctx.method(), Method::TLS_CLIENT);
    }

    #[test]
    fn test_store_records_owner() {
        let ctx = TlsContext::new(Method::TLS);
        let store = ctx.credentials();
        assert_eq!(store.owner(), Some(ctx.id()));
    }

    #[test]
    fn test_drop_clears_owner_but_store_survives() {
        let ctx = TlsContext::new(Method::TLS_SERVER);
        let store = ctx.credentials();
        let handle = ctx.native_handle();
        drop(ctx);
        assert_eq!(store.owner(), None);
        // The retained reference keeps the native handle alive.
        assert_eq!(store.native_handle(), handle);
    }

    #[test]
    fn test_move_keeps_handle_and_identity() {
        let ctx = TlsContext::new(Method::TLSV1_2_CLIENT);
        let handle = ctx.native_handle();
        let id = ctx.id();
        let moved = ctx;
        assert_eq!(moved.native_handle(), handle);
        assert_eq!(moved.id(), id);
        assert_eq!(moved.credentials().owner(), Some(id));
    }

    #[test]
    fn test_each_context_gets_distinct_id() {
        let a = TlsContext::new(Method::TLS);
        let b = TlsContext::new(Method::TLS);
        assert_ne!(a.id(), b.id());
    }
}
