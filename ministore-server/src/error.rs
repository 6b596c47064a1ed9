//! Error types for the bootstrap layer.

use thiserror::Error;

/// Fatal errors in the startup configuration.
///
/// These reflect an invalid invocation rather than a transient fault. The server must not start
/// when one of them is returned, and retrying with the same parameters will fail again.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Only one of the TLS certificate and private key was provided.
    #[error("both certificate and key must be provided to enable https (cert: {cert:?}, key: {key:?})")]
    PartialTlsPair {
        /// The certificate path as given, possibly empty.
        cert: String,
        /// The private key path as given, possibly empty.
        key: String,
    },
}
