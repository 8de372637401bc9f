//! Typed failures surfaced by the portal session.

use thiserror::Error;

/// Errors raised while talking to the distributor portal.
#[derive(Debug, Error)]
pub enum PortalError {
    /// Credentials were required but not supplied.
    #[error(
        "Credentials must be provided via --email/--password or \
         CENTURY21_EMAIL/CENTURY21_PASSWORD env vars"
    )]
    MissingCredentials,

    /// The portal rejected the credentials or the account lacks access.
    #[error("Login failed: {0}")]
    Authentication(String),

    /// Transport failure, non-success status, or an unreadable response.
    #[error("Request failed: {0}")]
    RequestFailed(String),
}
