use thiserror::Error;

use crate::grant::Grant;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrantError {
    /// A comma-separated segment matched no known grant name.
    #[error("unknown grant '{0}'")]
    UnknownGrant(String),

    #[error("too many custom grants: {count} given, at most {max} allowed")]
    TooManyCustomGrants { count: usize, max: usize },

    #[error("invalid custom grant name '{0}'")]
    InvalidCustomGrantName(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    #[error("grant claim is missing")]
    ClaimMissing,

    #[error("grant claim is malformed: {0}")]
    ClaimParse(#[source] GrantError),

    #[error("request does not match grant (required {required:#x}, granted {granted:#x})")]
    GrantMismatch { required: Grant, granted: Grant },
}
