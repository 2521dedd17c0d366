/*
 * Responsibility
 * - Process-wide custom grant registry behind an ArcSwap<GrantTable>
 * - Readers load a snapshot without locking; writers publish a complete replacement
 * - A reader never observes a partially assigned custom range
 */
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

use crate::error::GrantError;
use crate::grant::Grant;
use crate::table::GrantTable;

pub struct CustomGrantRegistry {
    table: ArcSwap<GrantTable>,
}

impl std::fmt::Debug for CustomGrantRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomGrantRegistry")
            .field("custom", &self.table.load().custom_mask())
            .finish()
    }
}

impl Default for CustomGrantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomGrantRegistry {
    /// Registry with no custom grants.
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(GrantTable::builtin()),
        }
    }

    /// Registry initialised from the configured custom grant names.
    pub fn with_custom_grants<S: AsRef<str>>(names: &[S]) -> Result<Self, GrantError> {
        let registry = Self::new();
        registry.set_custom_grants(names)?;
        Ok(registry)
    }

    /// Replace the entire custom set.
    ///
    /// Previously assigned custom bits are dropped and `names` are assigned
    /// from bit 16 upward in order. On error the current set is left as is.
    pub fn set_custom_grants<S: AsRef<str>>(&self, names: &[S]) -> Result<(), GrantError> {
        let table = GrantTable::with_custom(names)?;
        let assigned = table.custom_mask();
        self.table.store(Arc::new(table));

        info!(
            requested = names.len(),
            assigned = assigned.bits().count_ones(),
            mask = ?assigned,
            "custom grants replaced"
        );
        Ok(())
    }

    /// Consistent view of the current vocabulary.
    pub fn snapshot(&self) -> Arc<GrantTable> {
        self.table.load_full()
    }

    /// Union of assigned custom bits, optionally restricted to `filter` names.
    pub fn custom_grant<S: AsRef<str>>(&self, filter: &[S]) -> Grant {
        self.table.load().custom_grant(filter)
    }

    pub fn is_custom_grants_set(&self) -> bool {
        self.table.load().has_custom()
    }

    pub fn clean(&self, grant: Grant) -> Grant {
        self.table.load().clean(grant)
    }

    pub fn to_grant(&self, s: &str) -> Result<Grant, GrantError> {
        self.table.load().parse(s)
    }

    pub fn to_long_string(&self, grant: Grant) -> String {
        self.table.load().to_long_string(grant)
    }

    pub fn to_short_string(&self, grant: Grant) -> String {
        self.table.load().to_short_string(grant)
    }
}
