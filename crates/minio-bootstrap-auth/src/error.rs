//! Error types for SigV4 signing.

/// Errors that can occur while turning a signature into HTTP headers.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A computed header value contains bytes not allowed in HTTP headers.
    ///
    /// This happens when an access key contains control characters.
    #[error("invalid value for header {name}")]
    InvalidHeaderValue {
        /// The header that could not be built.
        name: &'static str,
    },
}
