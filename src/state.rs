/*
 * Responsibility
 * - Shared context handed to request handlers (AppState)
 * - Clone is cheap (everything behind Arc)
 */
use std::sync::Arc;

use grants::CustomGrantRegistry;

use crate::services::auth::TokenService;

#[derive(Clone, Debug)]
pub struct AppState {
    pub grants: Arc<CustomGrantRegistry>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(grants: Arc<CustomGrantRegistry>, tokens: Arc<TokenService>) -> Self {
        Self { grants, tokens }
    }
}
