/*
 * Responsibility
 * - Access grant bitmask, its string codec and the custom grant registry
 * - No I/O; every operation is synchronous
 */
pub mod authorize;
pub mod error;
pub mod grant;
pub mod registry;
pub mod table;

pub use authorize::{GrantClaim, contains_grant};
pub use error::{AuthzError, GrantError};
pub use grant::Grant;
pub use registry::CustomGrantRegistry;
pub use table::GrantTable;
