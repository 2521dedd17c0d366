/*
 * Responsibility
 * - The principal record read from the user store (read-only here)
 * - The lookup contract the user store fulfils for refresh
 */
use std::{future::Future, pin::Pin};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// An authenticated user as supplied by the user store.
///
/// Only the fields that end up in token claims, plus the two-factor flag that
/// drives the login policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub user_type: String,
    #[serde(default)]
    pub totp_enabled: bool,
}

impl Principal {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            email: String::new(),
            username: String::new(),
            user_type: String::new(),
            totp_enabled: false,
        }
    }
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read-only principal lookup backed by the user store.
pub trait UserDirectory: Send + Sync {
    fn find_by_id(&self, user_id: Uuid) -> BoxFuture<'_, Result<Option<Principal>, AppError>>;
}
