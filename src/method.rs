//! Negotiation role and protocol version selection
//!
//! A `Method` fixes, at context construction, whether the context
//! negotiates as a client, a server, or either, and whether a single
//! protocol version is forced. The set is closed: only the named
//! constants (or their packed encodings via `from_raw`) are valid.

use openssl::ssl::{SslMethod, SslVersion};

use crate::error::TlsError;

/// TLS protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    /// SSL 3.0 (deprecated, rarely used)
    Ssl3,
    /// TLS 1.0
    Tls10,
    /// TLS 1.1
    Tls11,
    /// TLS 1.2
    Tls12,
    /// TLS 1.3
    Tls13,
}

impl TlsVersion {
    /// Get OpenSSL protocol version constant
    pub fn to_openssl_version(&self) -> SslVersion {
        match self {
            TlsVersion::Ssl3 => SslVersion::SSL3,
            TlsVersion::Tls10 => SslVersion::TLS1,
            TlsVersion::Tls11 => SslVersion::TLS1_1,
            TlsVersion::Tls12 => SslVersion::TLS1_2,
            TlsVersion::Tls13 => SslVersion::TLS1_3,
        }
    }

    /// Get version as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsVersion::Ssl3 => "SSLv3",
            TlsVersion::Tls10 => "TLSv1.0",
            TlsVersion::Tls11 => "TLSv1.1",
            TlsVersion::Tls12 => "TLSv1.2",
            TlsVersion::Tls13 => "TLSv1.3",
        }
    }

    /// Byte used in the packed method encoding (major/minor nibbles)
    fn version_byte(self) -> u32 {
        match self {
            TlsVersion::Ssl3 => 0x03,
            TlsVersion::Tls10 => 0x10,
            TlsVersion::Tls11 => 0x11,
            TlsVersion::Tls12 => 0x12,
            TlsVersion::Tls13 => 0x13,
        }
    }

    fn from_version_byte(byte: u32) -> Option<TlsVersion> {
        match byte {
            0x10 => Some(TlsVersion::Tls10),
            0x11 => Some(TlsVersion::Tls11),
            0x12 => Some(TlsVersion::Tls12),
            0x13 => Some(TlsVersion::Tls13),
            _ => None,
        }
    }
}

/// Negotiation role of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Negotiate as either side
    Any,
    Client,
    Server,
}

impl Role {
    fn raw(self) -> u32 {
        match self {
            Role::Any => 0,
            Role::Client => 1,
            Role::Server => 2,
        }
    }

    fn from_raw(raw: u32) -> Option<Role> {
        match raw {
            0 => Some(Role::Any),
            1 => Some(Role::Client),
            2 => Some(Role::Server),
            _ => None,
        }
    }

    pub(crate) fn to_ssl_method(self) -> SslMethod {
        match self {
            Role::Any => SslMethod::tls(),
            Role::Client => SslMethod::tls_client(),
            Role::Server => SslMethod::tls_server(),
        }
    }
}

/// Protocol version constraint carried by a `Method`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionConstraint {
    /// Engine default: any modern version
    Any,
    /// Pin the negotiated version exactly
    Exact(TlsVersion),
    /// Legacy "SSLv3 and newer" compatibility selection
    Sslv3Floor,
}

/// Negotiation method: role plus optional forced protocol version.
///
/// Construct only from the named constants or via [`Method::from_raw`];
/// the enumeration is closed and other combinations are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Method {
    role: Role,
    version: VersionConstraint,
}

impl Method {
    /// Any TLS version, either role
    pub const TLS: Method = Method::of(Role::Any, VersionConstraint::Any);
    pub const TLS_CLIENT: Method = Method::of(Role::Client, VersionConstraint::Any);
    pub const TLS_SERVER: Method = Method::of(Role::Server, VersionConstraint::Any);

    /// TLS 1.0 only
    pub const TLSV1: Method = Method::exact(Role::Any, TlsVersion::Tls10);
    pub const TLSV1_CLIENT: Method = Method::exact(Role::Client, TlsVersion::Tls10);
    pub const TLSV1_SERVER: Method = Method::exact(Role::Server, TlsVersion::Tls10);

    /// TLS 1.1 only
    pub const TLSV1_1: Method = Method::exact(Role::Any, TlsVersion::Tls11);
    pub const TLSV1_1_CLIENT: Method = Method::exact(Role::Client, TlsVersion::Tls11);
    pub const TLSV1_1_SERVER: Method = Method::exact(Role::Server, TlsVersion::Tls11);

    /// TLS 1.2 only
    pub const TLSV1_2: Method = Method::exact(Role::Any, TlsVersion::Tls12);
    pub const TLSV1_2_CLIENT: Method = Method::exact(Role::Client, TlsVersion::Tls12);
    pub const TLSV1_2_SERVER: Method = Method::exact(Role::Server, TlsVersion::Tls12);

    /// TLS 1.3 only
    pub const TLSV1_3: Method = Method::exact(Role::Any, TlsVersion::Tls13);
    pub const TLSV1_3_CLIENT: Method = Method::exact(Role::Client, TlsVersion::Tls13);
    pub const TLSV1_3_SERVER: Method = Method::exact(Role::Server, TlsVersion::Tls13);

    /// SSLv3 and newer (compatibility only)
    pub const SSLV23: Method = Method::of(Role::Any, VersionConstraint::Sslv3Floor);
    pub const SSLV23_CLIENT: Method = Method::of(Role::Client, VersionConstraint::Sslv3Floor);
    pub const SSLV23_SERVER: Method = Method::of(Role::Server, VersionConstraint::Sslv3Floor);

    const fn of(role: Role, version: VersionConstraint) -> Method {
        Method { role, version }
    }

    const fn exact(role: Role, version: TlsVersion) -> Method {
        Method { role, version: VersionConstraint::Exact(version) }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// True when the context negotiates as a server
    pub fn is_server(&self) -> bool {
        self.role == Role::Server
    }

    /// The forced protocol version, if the method pins one
    pub fn forced_version(&self) -> Option<TlsVersion> {
        match self.version {
            VersionConstraint::Exact(v) => Some(v),
            _ => None,
        }
    }

    pub fn version_constraint(&self) -> VersionConstraint {
        self.version
    }

    /// Packed integral encoding: low byte is the role (0 = either,
    /// 1 = client, 2 = server), bits 8.. the version's major/minor
    /// nibble pair (0 = unconstrained, 0x03 = the legacy SSLv3 floor).
    pub fn as_raw(&self) -> u32 {
        let version = match self.version {
            VersionConstraint::Any => 0,
            VersionConstraint::Exact(v) => v.version_byte(),
            VersionConstraint::Sslv3Floor => 0x03,
        };
        (version << 8) | self.role.raw()
    }

    /// Decode a packed value, validating against the closed constant set
    pub fn from_raw(raw: u32) -> Result<Method, TlsError> {
        let role = Role::from_raw(raw & 0xff).ok_or(TlsError::InvalidMethod(raw))?;
        let version = match raw >> 8 {
            0 => VersionConstraint::Any,
            0x03 => VersionConstraint::Sslv3Floor,
            byte => VersionConstraint::Exact(
                TlsVersion::from_version_byte(byte).ok_or(TlsError::InvalidMethod(raw))?,
            ),
        };
        Ok(Method { role, version })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METHODS: [Method; 18] = [
        Method::TLS,
        Method::TLS_CLIENT,
        Method::TLS_SERVER,
        Method::TLSV1,
        Method::TLSV1_CLIENT,
        Method::TLSV1_SERVER,
        Method::TLSV1_1,
        Method::TLSV1_1_CLIENT,
        Method::TLSV1_1_SERVER,
        Method::TLSV1_2,
        Method::TLSV1_2_CLIENT,
        Method::TLSV1_2_SERVER,
        Method::TLSV1_3,
        Method::TLSV1_3_CLIENT,
        Method::TLSV1_3_SERVER,
        Method::SSLV23,
        Method::SSLV23_CLIENT,
        Method::SSLV23_SERVER,
    ];

    #[test]
    fn test_raw_round_trip_all_constants() {
        for m in ALL_METHODS {
            assert_eq!(Method::from_raw(m.as_raw()).unwrap(), m);
        }
    }

    #[test]
    fn test_known_packed_values() {
        assert_eq!(Method::TLS.as_raw(), 0x0000);
        assert_eq!(Method::TLS_CLIENT.as_raw(), 0x0001);
        assert_eq!(Method::TLS_SERVER.as_raw(), 0x0002);
        assert_eq!(Method::TLSV1_2.as_raw(), 0x1200);
        assert_eq!(Method::TLSV1_2_CLIENT.as_raw(), 0x1201);
        assert_eq!(Method::TLSV1_3_SERVER.as_raw(), 0x1302);
        assert_eq!(Method::SSLV23_SERVER.as_raw(), 0x0302);
    }

    #[test]
    fn test_from_raw_rejects_unknown_patterns() {
        for raw in [0x0003, 0x1203, 0x0400, 0x2000, 0xff00, 0x1210] {
            assert!(matches!(
                Method::from_raw(raw),
                Err(TlsError::InvalidMethod(r)) if r == raw
            ));
        }
    }

    #[test]
    fn test_role_accessors() {
        assert!(Method::TLSV1_2_SERVER.is_server());
        assert!(!Method::TLSV1_2_CLIENT.is_server());
        assert!(!Method::TLS.is_server());
        assert_eq!(Method::TLS_CLIENT.role(), Role::Client);
    }

    #[test]
    fn test_forced_version() {
        assert_eq!(Method::TLSV1_2_CLIENT.forced_version(), Some(TlsVersion::Tls12));
        assert_eq!(Method::TLS.forced_version(), None);
        // The legacy floor is a range, not a pinned version
        assert_eq!(Method::SSLV23.forced_version(), None);
    }

    #[test]
    fn test_version_strings() {
        assert_eq!(TlsVersion::Tls12.as_str(), "TLSv1.2");
        assert_eq!(TlsVersion::Ssl3.as_str(), "SSLv3");
    }
}
