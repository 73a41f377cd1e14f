//! Legacy protocol-disabling options
//!
//! Retained for source compatibility with configuration code written
//! against engines that needed these switches. Only `NO_SSLV3` still
//! changes behavior; the rest are stored and ignored.

bitflags::bitflags! {
    /// Context options bit-set
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TlsOptions: u32 {
        /// Enable workarounds for legacy peer bugs (ignored)
        const DEFAULT_WORKAROUNDS = 0x01;
        /// Regenerate ephemeral DH keys per connection (ignored)
        const SINGLE_DH_USE = 0x02;
        /// Disable SSLv2 (ignored, never negotiated)
        const NO_SSLV2 = 0x04;
        /// Disable SSLv3
        const NO_SSLV3 = 0x08;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        assert!(TlsOptions::default().is_empty());
    }

    #[test]
    fn test_bit_values_match_classic_constants() {
        assert_eq!(TlsOptions::DEFAULT_WORKAROUNDS.bits(), 0x01);
        assert_eq!(TlsOptions::SINGLE_DH_USE.bits(), 0x02);
        assert_eq!(TlsOptions::NO_SSLV2.bits(), 0x04);
        assert_eq!(TlsOptions::NO_SSLV3.bits(), 0x08);
    }

    #[test]
    fn test_combination() {
        let opts = TlsOptions::NO_SSLV2 | TlsOptions::NO_SSLV3;
        assert!(opts.contains(TlsOptions::NO_SSLV3));
        assert!(!opts.contains(TlsOptions::SINGLE_DH_USE));
    }
}
