//! Validation of the TLS certificate and key parameters.
//!
//! Certificate and key are only meaningful as a pair. This module checks that both or neither are
//! given; it does not look at the referenced files. Loading and parsing them is left to the TLS
//! acceptor when the listener is started.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Checks that the certificate and key are given together.
///
/// Empty strings count as absent. Returns `Ok(true)` if TLS is enabled, `Ok(false)` if both are
/// empty, and [`ConfigError::PartialTlsPair`] if exactly one is set.
pub fn validate_tls_pair(cert: &str, key: &str) -> Result<bool, ConfigError> {
    match (cert.is_empty(), key.is_empty()) {
        (true, true) => Ok(false),
        (false, false) => Ok(true),
        _ => Err(ConfigError::PartialTlsPair {
            cert: cert.to_owned(),
            key: key.to_owned(),
        }),
    }
}

/// Certificate and private key files for a TLS listener.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TlsPaths {
    cert: PathBuf,
    key: PathBuf,
}

impl TlsPaths {
    /// Builds the pair from raw parameters, or `None` if TLS is disabled.
    pub fn from_pair(cert: &str, key: &str) -> Result<Option<Self>, ConfigError> {
        let enabled = validate_tls_pair(cert, key)?;
        Ok(enabled.then(|| Self {
            cert: cert.into(),
            key: key.into(),
        }))
    }

    /// Path to the PEM encoded certificate chain.
    pub fn cert(&self) -> &Path {
        &self.cert
    }

    /// Path to the PEM encoded private key.
    pub fn key(&self) -> &Path {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_empty_disables_tls() {
        assert_eq!(validate_tls_pair("", ""), Ok(false));
        assert_eq!(TlsPaths::from_pair("", ""), Ok(None));
    }

    #[test]
    fn both_present_enables_tls() {
        assert_eq!(validate_tls_pair("cert.pem", "key.pem"), Ok(true));

        let paths = TlsPaths::from_pair("cert.pem", "key.pem").unwrap().unwrap();
        assert_eq!(paths.cert(), Path::new("cert.pem"));
        assert_eq!(paths.key(), Path::new("key.pem"));
    }

    #[test]
    fn partial_pair_is_fatal() {
        let err = validate_tls_pair("cert.pem", "").unwrap_err();
        assert_eq!(
            err,
            ConfigError::PartialTlsPair {
                cert: "cert.pem".into(),
                key: "".into(),
            }
        );

        assert!(validate_tls_pair("", "key.pem").is_err());
        assert!(TlsPaths::from_pair("", "key.pem").is_err());
    }

    #[test]
    fn files_are_not_checked() {
        let result = validate_tls_pair("/does/not/exist.pem", "/neither/does/this.pem");
        assert_eq!(result, Ok(true));
    }
}
