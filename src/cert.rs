//! Certificate and key material handling
//!
//! Parsing of PEM/DER credential material into engine objects, plus
//! extraction of human-facing certificate information for verification
//! callbacks.

use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::x509::{X509, X509NameRef, X509Ref};

use crate::Result;

/// Encoding of certificate and key material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Base64 PEM with armor lines; may hold a whole chain
    Pem,
    /// Binary DER; holds a single object
    Der,
}

/// Parse certificate material into a chain, leaf first.
///
/// PEM material may carry any number of certificates; DER exactly one.
pub(crate) fn parse_cert_chain(data: &[u8], format: FileFormat) -> Result<Vec<X509>> {
    match format {
        FileFormat::Pem => Ok(X509::stack_from_pem(data)?),
        FileFormat::Der => Ok(vec![X509::from_der(data)?]),
    }
}

/// Parse a private key, decrypting PEM material with the passphrase when
/// one is given. DER keys are expected unencrypted.
pub(crate) fn parse_private_key(
    data: &[u8],
    format: FileFormat,
    passphrase: Option<&str>,
) -> Result<PKey<Private>> {
    let key = match format {
        FileFormat::Pem => {
            // A missing passphrase becomes the empty string: without a
            // passphrase callback the engine prompts on the terminal
            // for encrypted keys instead of failing.
            let pass = passphrase.unwrap_or("");
            PKey::private_key_from_pem_passphrase(data, pass.as_bytes())?
        }
        FileFormat::Der => PKey::private_key_from_der(data)?,
    };
    Ok(key)
}

/// Certificate information exposed to verification callbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertInfo {
    /// Subject Common Name
    pub subject: String,
    /// Issuer Common Name
    pub issuer: String,
    /// Subject Alternative Names (DNS names and IP addresses)
    pub subject_alt_names: Vec<String>,
}

impl CertInfo {
    /// Extract information from an X.509 certificate
    pub fn from_x509_ref(cert: &X509Ref) -> Self {
        CertInfo {
            subject: cn_of(cert.subject_name()),
            issuer: cn_of(cert.issuer_name()),
            subject_alt_names: alt_names_of(cert),
        }
    }
}

fn cn_of(name: &X509NameRef) -> String {
    name.entries_by_nid(Nid::COMMONNAME)
        .next()
        .and_then(|entry| entry.data().as_utf8().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "<undef>".to_string())
}

fn alt_names_of(cert: &X509Ref) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(sans) = cert.subject_alt_names() {
        for name in sans {
            if let Some(dns) = name.dnsname() {
                names.push(format!("DNS:{}", dns));
            } else if let Some(ip) = name.ipaddress() {
                if ip.len() == 4 {
                    names.push(format!("IP:{}.{}.{}.{}", ip[0], ip[1], ip[2], ip[3]));
                } else if ip.len() == 16 {
                    let groups: Vec<String> = ip
                        .chunks(2)
                        .map(|pair| format!("{:02x}{:02x}", pair[0], pair[1]))
                        .collect();
                    names.push(format!("IP:{}", groups.join(":")));
                }
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER_CERT: &[u8] = include_bytes!("../tests/certs/server.pem");
    const SERVER_KEY: &[u8] = include_bytes!("../tests/certs/server-key.pem");
    const SERVER_KEY_ENCRYPTED: &[u8] = include_bytes!("../tests/certs/server-key-encrypted.pem");
    const SERVER_CERT_DER: &[u8] = include_bytes!("../tests/certs/server.der");
    const SERVER_KEY_DER: &[u8] = include_bytes!("../tests/certs/server-key.der");

    #[test]
    fn test_parse_pem_chain() {
        let chain = parse_cert_chain(SERVER_CERT, FileFormat::Pem).unwrap();
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_parse_der_cert() {
        let chain = parse_cert_chain(SERVER_CERT_DER, FileFormat::Der).unwrap();
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_parse_junk_material() {
        // PEM material without armor lines parses as an empty chain;
        // callers treat the empty chain as an error.
        let chain = parse_cert_chain(b"not a certificate", FileFormat::Pem).unwrap();
        assert!(chain.is_empty());
        // DER parsing fails outright.
        assert!(parse_cert_chain(b"not a certificate", FileFormat::Der).is_err());
    }

    #[test]
    fn test_parse_plain_key() {
        parse_private_key(SERVER_KEY, FileFormat::Pem, None).unwrap();
        parse_private_key(SERVER_KEY_DER, FileFormat::Der, None).unwrap();
    }

    #[test]
    fn test_parse_encrypted_key_with_passphrase() {
        parse_private_key(SERVER_KEY_ENCRYPTED, FileFormat::Pem, Some("letmein")).unwrap();
    }

    #[test]
    fn test_parse_encrypted_key_wrong_passphrase_fails() {
        assert!(parse_private_key(SERVER_KEY_ENCRYPTED, FileFormat::Pem, Some("wrong")).is_err());
    }

    #[test]
    fn test_cert_info_from_server_cert() {
        let chain = parse_cert_chain(SERVER_CERT, FileFormat::Pem).unwrap();
        let info = CertInfo::from_x509_ref(&chain[0]);
        assert_eq!(info.subject, "example.com");
        assert_eq!(info.issuer, "Example Test CA");
        assert!(info.subject_alt_names.contains(&"DNS:example.com".to_string()));
        assert!(info.subject_alt_names.contains(&"DNS:*.example.com".to_string()));
    }
}
