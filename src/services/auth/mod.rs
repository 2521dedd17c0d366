pub mod factory;
pub mod jwt;
pub mod token_issuer;
pub mod token_service;

pub use factory::build_token_service;
pub use jwt::{JwtSigner, JwtVerifier, TokenError, VerifiedToken};
pub use token_issuer::{IssuedTokens, TokenIssuer, TokenOptions};
pub use token_service::{AccessToken, TokenService};
