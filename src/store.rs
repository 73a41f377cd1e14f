//! Credential store
//!
//! Owns the native engine credential handle and every piece of installed
//! or deferred configuration. Shared by reference count: the owning
//! `TlsContext` holds one reference, and stream collaborators may retain
//! further references that keep the store (and the native handle) alive
//! after the context is gone.
//!
//! The engine splits its context type into a mutable builder and an
//! immutable, reference-counted handshake context. The store starts in
//! the building state; the first `handshake_context()` call translates
//! the deferred settings onto the handle, finalizes it, and from then on
//! hands out clones. The raw handle pointer is stable across that
//! transition.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use foreign_types::ForeignType;
use openssl::ssl::{
    NameType, SniError, SslContext, SslContextBuilder, SslOptions, SslRef, SslVersion,
};
use openssl::x509::X509StoreContextRef;

use crate::cert::{self, FileFormat};
use crate::context::ContextId;
use crate::error::TlsError;
use crate::method::{Method, VersionConstraint};
use crate::options::TlsOptions;
use crate::verify::{ServernameCallback, VerifyCallback, VerifyContext, VerifyMode};
use crate::Result;

/// Shared credential store backing one `TlsContext`
pub struct CredentialStore {
    method: Method,
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    /// Mutable engine handle; `None` once finalized
    builder: Option<SslContextBuilder>,
    /// Finalized engine handle; `Some` once a handshake collaborator
    /// snapshots the store
    ready: Option<SslContext>,
    verify_mode: VerifyMode,
    options: TlsOptions,
    passphrase: Option<String>,
    certificate_file: Option<(PathBuf, FileFormat)>,
    certificate: Option<(Vec<u8>, FileFormat)>,
    verify_callback: Option<Arc<VerifyCallback>>,
    servername_callback: Option<Arc<ServernameCallback>>,
    owner: Option<ContextId>,
}

impl StoreInner {
    fn builder_mut(&mut self) -> Result<&mut SslContextBuilder> {
        self.builder.as_mut().ok_or(TlsError::Finalized)
    }

    fn ensure_building(&self) -> Result<()> {
        if self.builder.is_some() {
            Ok(())
        } else {
            Err(TlsError::Finalized)
        }
    }
}

impl CredentialStore {
    /// Allocate a fresh engine credential handle for the given method.
    ///
    /// # Panics
    ///
    /// Panics if the engine cannot allocate the handle. Allocation
    /// failure is resource exhaustion, not a recoverable configuration
    /// error, and there is no valid store to return.
    pub(crate) fn new(method: Method, owner: ContextId) -> Arc<CredentialStore> {
        let mut builder = SslContextBuilder::new(method.role().to_ssl_method())
            .expect("failed to allocate TLS credential handle");

        match method.version_constraint() {
            VersionConstraint::Any => {}
            VersionConstraint::Exact(v) => {
                let version = v.to_openssl_version();
                builder
                    .set_min_proto_version(Some(version))
                    .expect("failed to pin minimum protocol version");
                builder
                    .set_max_proto_version(Some(version))
                    .expect("failed to pin maximum protocol version");
            }
            VersionConstraint::Sslv3Floor => {
                // Engines built without SSLv3 refuse the floor; fall
                // back to their default minimum.
                if builder.set_min_proto_version(Some(SslVersion::SSL3)).is_err() {
                    builder
                        .set_min_proto_version(None)
                        .expect("failed to clear protocol floor");
                }
            }
        }

        Arc::new(CredentialStore {
            method,
            inner: Mutex::new(StoreInner {
                builder: Some(builder),
                ready: None,
                verify_mode: VerifyMode::NONE,
                options: TlsOptions::empty(),
                passphrase: None,
                certificate_file: None,
                certificate: None,
                verify_callback: None,
                servername_callback: None,
                owner: Some(owner),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().expect("credential store lock poisoned")
    }

    /// The role/version method fixed at construction
    pub fn method(&self) -> Method {
        self.method
    }

    /// The context handle currently owning this store, if any.
    ///
    /// Never used to extend the context's lifetime; a store can outlive
    /// its owner when stream collaborators still hold references.
    pub fn owner(&self) -> Option<ContextId> {
        self.lock().owner
    }

    pub(crate) fn clear_owner(&self, id: ContextId) {
        let mut inner = self.lock();
        if inner.owner == Some(id) {
            inner.owner = None;
        }
    }

    /// Raw engine handle, stable for the life of the store.
    ///
    /// Escape hatch for collaborators that talk to the engine directly;
    /// ownership stays with the store.
    pub fn native_handle(&self) -> *mut openssl_sys::SSL_CTX {
        let inner = self.lock();
        match (&inner.builder, &inner.ready) {
            (Some(builder), _) => builder.as_ptr(),
            (None, Some(ctx)) => ctx.as_ptr(),
            (None, None) => unreachable!("credential store without engine handle"),
        }
    }

    /// Store the verification mode for handshake-time use
    pub fn set_verify_mode(&self, mode: VerifyMode) -> Result<()> {
        let mut inner = self.lock();
        inner.ensure_building()?;
        inner.verify_mode = mode;
        Ok(())
    }

    pub fn verify_mode(&self) -> VerifyMode {
        self.lock().verify_mode
    }

    /// Store the legacy options bit-set
    pub fn set_options(&self, options: TlsOptions) -> Result<()> {
        let mut inner = self.lock();
        inner.ensure_building()?;
        inner.options = options;
        Ok(())
    }

    /// Reset the options bit-set to empty
    pub fn clear_options(&self) -> Result<()> {
        self.set_options(TlsOptions::empty())
    }

    pub fn options(&self) -> TlsOptions {
        self.lock().options
    }

    /// Load the platform's system trust anchors into the engine handle
    pub fn set_default_verify_paths(&self) -> Result<()> {
        let mut inner = self.lock();
        inner.builder_mut()?.set_default_verify_paths()?;
        Ok(())
    }

    /// Store a verification predicate, consulted once per chain
    /// certificate during the handshake
    pub fn set_verify_callback<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(bool, &mut VerifyContext<'_>) -> bool + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        inner.ensure_building()?;
        inner.verify_callback = Some(Arc::new(callback));
        Ok(())
    }

    /// The configured verification predicate, if any
    pub fn verify_callback(&self) -> Option<Arc<VerifyCallback>> {
        self.lock().verify_callback.clone()
    }

    /// Store an SNI predicate, consulted when a client presents a name
    /// during a server-role handshake
    pub fn set_servername_callback<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&mut SslRef, &str) -> bool + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        inner.ensure_building()?;
        inner.servername_callback = Some(Arc::new(callback));
        Ok(())
    }

    /// The configured SNI predicate, if any
    pub fn servername_callback(&self) -> Option<Arc<ServernameCallback>> {
        self.lock().servername_callback.clone()
    }

    /// Store the passphrase used to decrypt subsequently installed
    /// private keys
    pub fn use_passphrase(&self, passphrase: impl Into<String>) -> Result<()> {
        let mut inner = self.lock();
        inner.ensure_building()?;
        inner.passphrase = Some(passphrase.into());
        Ok(())
    }

    /// Store a certificate file path; installation is deferred until the
    /// paired private key arrives
    pub fn use_certificate_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let mut inner = self.lock();
        inner.ensure_building()?;
        inner.certificate_file = Some((path.as_ref().to_path_buf(), format));
        Ok(())
    }

    /// Store in-memory certificate material; installation is deferred
    /// until the paired private key arrives
    pub fn use_certificate(&self, certificate: &[u8], format: FileFormat) -> Result<()> {
        let mut inner = self.lock();
        inner.ensure_building()?;
        inner.certificate = Some((certificate.to_vec(), format));
        Ok(())
    }

    /// Install the stored certificate file together with this private
    /// key file into the engine handle.
    ///
    /// Fails with [`TlsError::KeyWithoutCertificate`] when no certificate
    /// file was stored first; the engine handle is left untouched.
    pub fn use_private_key_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let mut inner = self.lock();
        let (cert_path, cert_format) = match &inner.certificate_file {
            Some(stored) => stored.clone(),
            None => return Err(TlsError::KeyWithoutCertificate),
        };
        let cert_data = fs::read(&cert_path)?;
        let key_data = fs::read(path.as_ref())?;
        let passphrase = inner.passphrase.clone();
        install_key_pair(
            inner.builder_mut()?,
            &cert_data,
            cert_format,
            &key_data,
            format,
            passphrase.as_deref(),
        )
    }

    /// Install the stored certificate buffer together with this private
    /// key buffer into the engine handle.
    ///
    /// Fails with [`TlsError::KeyWithoutCertificate`] when no certificate
    /// buffer was stored first; the engine handle is left untouched.
    pub fn use_private_key(&self, key: &[u8], format: FileFormat) -> Result<()> {
        let mut inner = self.lock();
        let (cert_data, cert_format) = match &inner.certificate {
            Some(stored) => stored.clone(),
            None => return Err(TlsError::KeyWithoutCertificate),
        };
        let passphrase = inner.passphrase.clone();
        install_key_pair(
            inner.builder_mut()?,
            &cert_data,
            cert_format,
            key,
            format,
            passphrase.as_deref(),
        )
    }

    /// Accepted for source compatibility; the engine negotiates DH
    /// parameters itself (RFC 7919), so this never fails and installs
    /// nothing.
    pub fn use_tmp_dh(&self, _dh: &[u8]) -> Result<()> {
        Ok(())
    }

    /// See [`CredentialStore::use_tmp_dh`]
    pub fn use_tmp_dh_file(&self, _path: impl AsRef<Path>) -> Result<()> {
        Ok(())
    }

    /// Install one or more CA certificates from memory into the engine
    /// handle's trust store
    pub fn set_verify_trust(&self, certificate: &[u8], format: FileFormat) -> Result<()> {
        let mut inner = self.lock();
        let builder = inner.builder_mut()?;
        let cas = cert::parse_cert_chain(certificate, format)?;
        if cas.is_empty() {
            return Err(TlsError::Certificate(
                "no CA certificates in buffer".to_string(),
            ));
        }
        let store = builder.cert_store_mut();
        for ca in cas {
            store.add_cert(ca)?;
        }
        Ok(())
    }

    /// Finalize the store for handshake use and return the engine
    /// context a connection is created from.
    ///
    /// The first call translates the deferred settings (verify mode,
    /// legacy options, verification and SNI predicates) onto the handle
    /// and seals it; later calls return clones of the same engine
    /// context. After finalization, mutators report
    /// [`TlsError::Finalized`].
    pub fn handshake_context(&self) -> Result<SslContext> {
        let mut inner = self.lock();
        if let Some(ctx) = &inner.ready {
            return Ok(ctx.clone());
        }

        let verify_mode = inner.verify_mode;
        let options = inner.options;
        let verify_callback = inner.verify_callback.clone();
        let servername_callback = inner.servername_callback.clone();

        let mut builder = inner.builder.take().ok_or(TlsError::Finalized)?;
        match verify_callback {
            Some(callback) => {
                builder.set_verify_callback(
                    verify_mode.to_native(),
                    move |preverified, store_ctx: &mut X509StoreContextRef| {
                        let mut ctx = VerifyContext::new(store_ctx);
                        callback(preverified, &mut ctx)
                    },
                );
            }
            None => builder.set_verify(verify_mode.to_native()),
        }
        if let Some(callback) = servername_callback {
            builder.set_servername_callback(move |ssl, _alert| {
                let name = match ssl.servername(NameType::HOST_NAME) {
                    Some(name) => name.to_owned(),
                    None => return Ok(()),
                };
                if callback(ssl, &name) {
                    Ok(())
                } else {
                    Err(SniError::ALERT_FATAL)
                }
            });
        }
        if options.contains(TlsOptions::NO_SSLV3) {
            builder.set_options(SslOptions::NO_SSLV3);
        }

        let ctx = builder.build();
        inner.ready = Some(ctx.clone());
        Ok(ctx)
    }
}

/// Install a certificate chain and its private key into the engine
/// handle as one operation, mirroring the engine's requirement that the
/// pair arrives together.
fn install_key_pair(
    builder: &mut SslContextBuilder,
    cert_data: &[u8],
    cert_format: FileFormat,
    key_data: &[u8],
    key_format: FileFormat,
    passphrase: Option<&str>,
) -> Result<()> {
    let chain = cert::parse_cert_chain(cert_data, cert_format)?;
    let key = cert::parse_private_key(key_data, key_format, passphrase)?;

    let mut chain = chain.into_iter();
    let leaf = chain.next().ok_or_else(|| {
        TlsError::Certificate("certificate material holds no certificates".to_string())
    })?;
    builder.set_certificate(&leaf)?;
    for intermediate in chain {
        builder.add_extra_chain_cert(intermediate)?;
    }
    builder.set_private_key(&key)?;
    builder.check_private_key()?;
    Ok(())
}
