//! Peer verification policy and handshake-time callbacks
//!
//! The verify mode is stored, not installed: a stream collaborator picks
//! it up (translated to the engine's own mode bits) when it finalizes the
//! credential store for a handshake. The two callback types are stored as
//! capability-typed closures and invoked lazily by the engine.

use openssl::ssl::{SslRef, SslVerifyMode};
use openssl::x509::{X509Ref, X509StoreContextRef, X509VerifyResult};

use crate::cert::CertInfo;

bitflags::bitflags! {
    /// Peer certificate verification mode bit-set
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct VerifyMode: u32 {
        /// No verification
        const NONE = 0x00;
        /// Verify the peer's certificate; on servers, request one
        const PEER = 0x01;
        /// Abort a server handshake if the client sent no certificate
        const FAIL_IF_NO_PEER_CERT = 0x02;
        /// Only request a client certificate on the initial handshake (ignored)
        const CLIENT_ONCE = 0x04;
    }
}

impl VerifyMode {
    /// Translate to the engine's verification mode.
    ///
    /// `CLIENT_ONCE` has no engine counterpart and is dropped.
    pub(crate) fn to_native(self) -> SslVerifyMode {
        let mut mode = SslVerifyMode::NONE;
        if self.contains(VerifyMode::PEER) {
            mode |= SslVerifyMode::PEER;
        }
        if self.contains(VerifyMode::FAIL_IF_NO_PEER_CERT) {
            mode |= SslVerifyMode::FAIL_IF_NO_PEER_CERT;
        }
        mode
    }
}

/// Read-only view of one certificate in a chain under validation.
///
/// Passed to the verify callback once per certificate during the
/// handshake, wrapping the engine's store context.
pub struct VerifyContext<'a> {
    inner: &'a mut X509StoreContextRef,
}

impl<'a> VerifyContext<'a> {
    pub(crate) fn new(inner: &'a mut X509StoreContextRef) -> VerifyContext<'a> {
        VerifyContext { inner }
    }

    /// The certificate currently under validation
    pub fn current_cert(&self) -> Option<&X509Ref> {
        self.inner.current_cert()
    }

    /// Parsed subject/issuer/SAN information for the current certificate
    pub fn current_cert_info(&self) -> Option<CertInfo> {
        self.inner.current_cert().map(CertInfo::from_x509_ref)
    }

    /// The engine's verification verdict for the current certificate
    pub fn error(&self) -> X509VerifyResult {
        self.inner.error()
    }

    /// Depth of the current certificate in the chain (0 = leaf)
    pub fn depth(&self) -> u32 {
        self.inner.error_depth()
    }
}

/// Verification predicate: `(preverified, context) -> accept?`
///
/// `preverified` reports whether the engine's built-in validation already
/// accepted the current certificate.
pub type VerifyCallback = dyn Fn(bool, &mut VerifyContext<'_>) -> bool + Send + Sync;

/// SNI predicate: `(in-progress connection, requested name) -> accept?`
///
/// Consulted at most once per server-role handshake, and only when the
/// client actually presented a name.
pub type ServernameCallback = dyn Fn(&mut SslRef, &str) -> bool + Send + Sync;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_translates_to_engine_none() {
        assert_eq!(VerifyMode::NONE.to_native(), SslVerifyMode::NONE);
        assert_eq!(VerifyMode::empty().to_native(), SslVerifyMode::NONE);
    }

    #[test]
    fn test_peer_bits_translate() {
        let mode = VerifyMode::PEER | VerifyMode::FAIL_IF_NO_PEER_CERT;
        let native = mode.to_native();
        assert!(native.contains(SslVerifyMode::PEER));
        assert!(native.contains(SslVerifyMode::FAIL_IF_NO_PEER_CERT));
    }

    #[test]
    fn test_client_once_is_dropped() {
        let mode = VerifyMode::PEER | VerifyMode::CLIENT_ONCE;
        assert_eq!(mode.to_native(), SslVerifyMode::PEER);
    }

    #[test]
    fn test_mode_bits_match_classic_constants() {
        assert_eq!(VerifyMode::PEER.bits(), 0x01);
        assert_eq!(VerifyMode::FAIL_IF_NO_PEER_CERT.bits(), 0x02);
        assert_eq!(VerifyMode::CLIENT_ONCE.bits(), 0x04);
    }
}
