/*
 * Responsibility
 * - Scoped access credentials for a user-authentication service
 * - HTTP routing, the user store, password hashing and TOTP live outside this crate;
 *   handlers call into services::auth::TokenService and translate AppError into responses
 */
pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;

pub use grants;
