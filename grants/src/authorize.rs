use tracing::debug;

use crate::error::AuthzError;
use crate::grant::Grant;
use crate::table::GrantTable;

/// A verified token payload that may carry a grant claim.
///
/// Implemented by the verifier's output type so the check never has to
/// inspect untyped claim values.
pub trait GrantClaim {
    /// The raw grant claim, or `None` when it is absent or not a string.
    fn grant_claim(&self) -> Option<&str>;
}

impl GrantClaim for str {
    fn grant_claim(&self) -> Option<&str> {
        Some(self)
    }
}

impl GrantClaim for String {
    fn grant_claim(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl<T: GrantClaim + ?Sized> GrantClaim for Option<&T> {
    fn grant_claim(&self) -> Option<&str> {
        self.and_then(|c| c.grant_claim())
    }
}

/// Succeeds iff the claim parses and grants every bit of `required`.
///
/// Must be called after signature and expiry verification.
pub fn contains_grant<C: GrantClaim + ?Sized>(
    table: &GrantTable,
    required: Grant,
    claims: &C,
) -> Result<Grant, AuthzError> {
    let raw = claims.grant_claim().ok_or(AuthzError::ClaimMissing)?;
    let granted = table.parse(raw).map_err(AuthzError::ClaimParse)?;

    if !granted.contains(required) {
        debug!(
            required = ?required,
            granted = ?granted,
            "grant check denied"
        );
        return Err(AuthzError::GrantMismatch { required, granted });
    }

    Ok(granted)
}
