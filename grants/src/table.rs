/*
 * Responsibility
 * - Immutable name <-> bit vocabulary (built-in names plus assigned custom names)
 * - String codec: parse, long form (bit scan), short form (composite names first)
 */
use std::borrow::Cow;

use tracing::warn;

use crate::error::GrantError;
use crate::grant::Grant;

const BUILTIN_NAMES: &[(Grant, &str)] = &[
    (Grant::UNKNOWN, "unknown"),
    (Grant::NONE, "none"),
    (Grant::SET_OTP, "otp"),
    (Grant::OTP_VALIDATE, "otp-validate"),
    (Grant::OTP_QR, "otp-qr"),
    (Grant::USERS_REFRESH, "users-refresh"),
    // composites
    (Grant::OTP, "otp-all"),
    (Grant::AUTHENTICATED, "authenticated"),
];

/// Label used when a grant has no recognised bit.
pub const UNKNOWN_LABEL: &str = "unknown";

#[derive(Clone, Debug)]
pub struct GrantTable {
    // Single-bit entries in ascending bit order: built-in atoms, then custom.
    atoms: Vec<(Grant, Cow<'static, str>)>,
    custom: Grant,
}

impl Default for GrantTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl GrantTable {
    /// Table holding only the built-in vocabulary.
    pub fn builtin() -> Self {
        let atoms = BUILTIN_NAMES
            .iter()
            .filter(|(g, _)| g.is_atomic())
            .map(|(g, name)| (*g, Cow::Borrowed(*name)))
            .collect();

        Self {
            atoms,
            custom: Grant::UNKNOWN,
        }
    }

    /// Built-in vocabulary extended with `names`, assigned densely from bit 16
    /// in input order.
    ///
    /// Names already known (built-in or earlier in the list, compared
    /// case-insensitively) are skipped and do not consume a slot.
    ///
    /// Fails with `TooManyCustomGrants` when more than eight names are given,
    /// and with `InvalidCustomGrantName` for an empty name or one containing
    /// `,`, since neither could be parsed back from a token claim.
    pub fn with_custom<S: AsRef<str>>(names: &[S]) -> Result<Self, GrantError> {
        if names.len() > Grant::MAX_CUSTOM_GRANTS {
            return Err(GrantError::TooManyCustomGrants {
                count: names.len(),
                max: Grant::MAX_CUSTOM_GRANTS,
            });
        }

        let mut table = Self::builtin();
        let mut slot = 0;
        for raw in names {
            let name = raw.as_ref().trim();
            if name.is_empty() || name.contains(',') {
                return Err(GrantError::InvalidCustomGrantName(raw.as_ref().to_string()));
            }
            if table.lookup(name).is_some() {
                warn!(grant = name, "custom grant name already in use; skipped");
                continue;
            }
            let bit = Grant::custom_slot(slot).ok_or(GrantError::TooManyCustomGrants {
                count: names.len(),
                max: Grant::MAX_CUSTOM_GRANTS,
            })?;
            table.atoms.push((bit, Cow::Owned(name.to_string())));
            table.custom |= bit;
            slot += 1;
        }

        Ok(table)
    }

    /// Union of every assigned custom bit.
    pub fn custom_mask(&self) -> Grant {
        self.custom
    }

    pub fn has_custom(&self) -> bool {
        !self.custom.is_unknown()
    }

    /// Union of the custom bits whose names match `filter`; all custom bits
    /// when `filter` is empty. Unmatched filter entries are ignored.
    pub fn custom_grant<S: AsRef<str>>(&self, filter: &[S]) -> Grant {
        if filter.is_empty() {
            return self.custom;
        }
        self.custom_entries()
            .filter(|(_, name)| filter.iter().any(|f| names_match(f.as_ref(), name)))
            .fold(Grant::UNKNOWN, |acc, (g, _)| acc | g)
    }

    /// Resolve a single name (built-in, composite or custom).
    pub fn lookup(&self, name: &str) -> Option<Grant> {
        builtin_entries()
            .chain(self.custom_entries())
            .find(|(_, n)| names_match(name, n))
            .map(|(g, _)| g)
    }

    /// Full vocabulary listing: built-in names (atoms and composites) then
    /// custom names in bit order.
    pub fn entries(&self) -> Vec<(Grant, &str)> {
        builtin_entries().chain(self.custom_entries()).collect()
    }

    /// Canonicalize `grant` against this table's custom assignments.
    pub fn clean(&self, grant: Grant) -> Grant {
        grant.clean_with(self.has_custom())
    }

    /// Parse a comma-separated list of grant names.
    ///
    /// Segments are trimmed and matched case-insensitively. Parsing stops at
    /// the first unknown segment, which is returned verbatim in the error.
    pub fn parse(&self, s: &str) -> Result<Grant, GrantError> {
        s.split(',').map(str::trim).try_fold(Grant::UNKNOWN, |acc, seg| {
            self.lookup(seg)
                .map(|g| acc | g)
                .ok_or_else(|| GrantError::UnknownGrant(seg.to_string()))
        })
    }

    /// Exhaustive form: one name per recognised set bit, ascending.
    /// Composite names are never emitted.
    pub fn to_long_string(&self, grant: Grant) -> String {
        let names = self.atom_names(grant);
        if names.is_empty() {
            return UNKNOWN_LABEL.to_string();
        }
        names.join(",")
    }

    /// Compact form embedded into tokens.
    ///
    /// The non-custom part is written as a single composite name when it is
    /// exactly one (e.g. `authenticated`), otherwise in the exhaustive form.
    /// Assigned custom names follow, or stand alone when nothing else is set.
    pub fn to_short_string(&self, grant: Grant) -> String {
        let base = grant.without(Grant::CUSTOM_RANGE | Grant::RESERVED_RANGE);
        let custom = self.atom_names(grant & self.custom);

        if base.is_unknown() && !custom.is_empty() {
            return custom.join(",");
        }

        let mut out = match builtin_name(base) {
            Some(name) => name.to_string(),
            None => self.to_long_string(base),
        };
        if !custom.is_empty() {
            out.push(',');
            out.push_str(&custom.join(","));
        }
        out
    }

    fn atom_names(&self, grant: Grant) -> Vec<&str> {
        self.atoms
            .iter()
            .filter(|(g, _)| grant.contains(*g))
            .map(|(_, name)| name.as_ref())
            .collect()
    }

    fn custom_entries(&self) -> impl Iterator<Item = (Grant, &str)> {
        self.atoms
            .iter()
            .filter(|(g, _)| Grant::CUSTOM_RANGE.contains(*g))
            .map(|(g, name)| (*g, name.as_ref()))
    }
}

fn builtin_entries<'a>() -> impl Iterator<Item = (Grant, &'a str)> {
    BUILTIN_NAMES.iter().map(|(g, n)| (*g, *n))
}

fn builtin_name(grant: Grant) -> Option<&'static str> {
    BUILTIN_NAMES
        .iter()
        .find(|(g, _)| *g == grant)
        .map(|(_, name)| *name)
}

fn names_match(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn custom_table() -> GrantTable {
        GrantTable::with_custom(&["this", "that", "those"]).unwrap()
    }

    #[test]
    fn parse_builtin_names() {
        let table = GrantTable::builtin();
        let cases = [
            ("unknown", Grant::UNKNOWN),
            ("none", Grant::NONE),
            ("authenticated", Grant::AUTHENTICATED),
            ("otp", Grant::SET_OTP),
            ("otp-validate", Grant::OTP_VALIDATE),
            ("otp-qr", Grant::OTP_QR),
            ("users-refresh", Grant::USERS_REFRESH),
            ("otp-all", Grant::OTP),
            ("otp,unknown,otp-qr", Grant::SET_OTP | Grant::OTP_QR),
            (
                "otp,otp-validate,otp-qr,users-refresh",
                Grant::AUTHENTICATED,
            ),
            ("otp, otp-qr", Grant::SET_OTP | Grant::OTP_QR),
            (
                "otp-validate,users-refresh",
                Grant::USERS_REFRESH | Grant::OTP_VALIDATE,
            ),
            (" Users-Refresh ", Grant::USERS_REFRESH),
        ];
        for (s, expected) in cases {
            assert_eq!(table.parse(s), Ok(expected), "{s}");
        }
    }

    #[test]
    fn parse_reports_first_unknown_segment() {
        let table = GrantTable::builtin();
        let cases = [
            ("abc", "abc"),
            ("abc,def", "abc"),
            ("otp,abc,users-refresh", "abc"),
            ("otp,,otp-qr", ""),
            ("", ""),
        ];
        for (s, bad) in cases {
            assert_eq!(
                table.parse(s),
                Err(GrantError::UnknownGrant(bad.to_string())),
                "{s}"
            );
        }
    }

    #[test]
    fn long_form_enumerates_atoms() {
        let table = GrantTable::builtin();
        assert_eq!(table.to_long_string(Grant::UNKNOWN), "unknown");
        assert_eq!(
            table.to_long_string(Grant::AUTHENTICATED),
            "otp,otp-validate,otp-qr,users-refresh"
        );
        assert_eq!(table.to_long_string(Grant::NONE | Grant::OTP_QR), "none,otp-qr");
        // Unnamed bits are skipped.
        assert_eq!(table.to_long_string(Grant::from_bits(0x1000_0010)), "unknown");
        assert_eq!(
            table.to_long_string(Grant::FULL),
            "otp,otp-validate,otp-qr,users-refresh"
        );
    }

    #[test]
    fn short_form_prefers_composites() {
        let table = GrantTable::builtin();
        let cases = [
            (Grant::UNKNOWN, "unknown"),
            (Grant::NONE, "none"),
            (Grant::SET_OTP, "otp"),
            (Grant::OTP_VALIDATE, "otp-validate"),
            (Grant::OTP_QR, "otp-qr"),
            (Grant::USERS_REFRESH, "users-refresh"),
            (Grant::OTP, "otp-all"),
            (Grant::AUTHENTICATED, "authenticated"),
            (Grant::SET_OTP | Grant::OTP_QR, "otp,otp-qr"),
            (
                Grant::USERS_REFRESH | Grant::OTP_VALIDATE,
                "otp-validate,users-refresh",
            ),
        ];
        for (grant, expected) in cases {
            assert_eq!(table.to_short_string(grant), expected, "{grant:?}");
        }
    }

    #[test]
    fn custom_names_are_assigned_densely() {
        let table = custom_table();
        assert_eq!(table.lookup("this"), Grant::bit(16));
        assert_eq!(table.lookup("that"), Grant::bit(17));
        assert_eq!(table.lookup("THOSE"), Grant::bit(18));
        assert_eq!(table.custom_mask(), Grant::from_bits(0x0007_0000));
        assert!(table.has_custom());
        assert!(!GrantTable::builtin().has_custom());
    }

    #[test]
    fn custom_grant_filters_by_name() {
        let table = custom_table();
        assert_eq!(
            table.custom_grant(&["this", "those"]),
            Grant::from_bits((1 << 16) | (1 << 18))
        );
        assert_eq!(table.custom_grant(&["This", "nope"]), Grant::from_bits(1 << 16));
        assert_eq!(table.custom_grant::<&str>(&[]), table.custom_mask());
        assert_eq!(table.custom_grant(&["nope"]), Grant::UNKNOWN);
    }

    #[test]
    fn short_form_with_custom_grants() {
        let table = custom_table();
        let this_those = Grant::from_bits((1 << 16) | (1 << 18));
        assert_eq!(table.to_short_string(this_those), "this,those");
        assert_eq!(
            table.to_short_string(Grant::AUTHENTICATED | table.custom_mask()),
            "authenticated,this,that,those"
        );
        assert_eq!(
            table.to_short_string(Grant::SET_OTP | Grant::OTP_QR | Grant::from_bits(1 << 17)),
            "otp,otp-qr,that"
        );
        assert_eq!(
            table.to_long_string(Grant::USERS_REFRESH | this_those),
            "users-refresh,this,those"
        );
        assert_eq!(
            table.parse("authenticated,this,that,those"),
            Ok(Grant::AUTHENTICATED | table.custom_mask())
        );
    }

    #[test]
    fn colliding_and_duplicate_names_do_not_consume_slots() {
        let table = GrantTable::with_custom(&["OTP", "reports", "none", "Reports", "audit"]).unwrap();
        assert_eq!(table.lookup("reports"), Grant::bit(16));
        assert_eq!(table.lookup("audit"), Grant::bit(17));
        assert_eq!(table.lookup("otp"), Some(Grant::SET_OTP));
        assert_eq!(table.custom_mask(), Grant::from_bits(0x0003_0000));
    }

    #[test]
    fn invalid_custom_lists_are_rejected() {
        let nine: Vec<String> = (0..9).map(|i| format!("scope{i}")).collect();
        assert_eq!(
            GrantTable::with_custom(&nine).unwrap_err(),
            GrantError::TooManyCustomGrants { count: 9, max: 8 }
        );
        assert!(matches!(
            GrantTable::with_custom(&["a,b"]),
            Err(GrantError::InvalidCustomGrantName(_))
        ));
        assert!(matches!(
            GrantTable::with_custom(&["  "]),
            Err(GrantError::InvalidCustomGrantName(_))
        ));
    }

    #[test]
    fn eight_custom_names_fill_the_range() {
        let eight: Vec<String> = (0..8).map(|i| format!("scope{i}")).collect();
        let table = GrantTable::with_custom(&eight).unwrap();
        for (i, name) in eight.iter().enumerate() {
            assert_eq!(table.lookup(name), Grant::bit(16 + i as u32));
        }
        assert_eq!(table.custom_mask(), Grant::CUSTOM_RANGE);
    }

    #[test]
    fn clean_masks_custom_range_only_when_custom_grants_are_set() {
        let builtin = GrantTable::builtin();
        assert_eq!(builtin.clean(Grant::FULL), Grant::AUTHENTICATED);
        assert_eq!(builtin.clean(Grant::from_bits(1 << 17)), Grant::UNKNOWN);

        let table = GrantTable::with_custom(&["this"]).unwrap();
        assert_eq!(table.clean(Grant::from_bits(1 << 17)), Grant::from_bits(1 << 17));
        assert_eq!(
            table.clean(Grant::FULL),
            Grant::AUTHENTICATED | Grant::CUSTOM_RANGE
        );
        assert_eq!(table.clean(Grant::MAX), Grant::NONE);
        // unassigned custom bits have no name, so neither string form shows them
        assert_eq!(table.to_short_string(Grant::from_bits(0x0003_0000)), "this");
    }

    #[test]
    fn builtin_names_round_trip_through_long_form() {
        let table = custom_table();
        for (grant, name) in table.entries() {
            let parsed = table.parse(name).unwrap();
            assert_eq!(parsed, grant);
            if grant.is_atomic() {
                let long = table.to_long_string(parsed);
                assert!(long.split(',').any(|n| n == name), "{name} -> {long}");
            }
        }
    }

    proptest! {
        #[test]
        fn long_and_short_forms_parse_back(bits in any::<u32>()) {
            let table = custom_table();
            let named = Grant::NONE | Grant::AUTHENTICATED | table.custom_mask();
            let g = table.clean(Grant::from_bits(bits) & named);
            prop_assert_eq!(table.parse(&table.to_long_string(g)).unwrap(), g);
            prop_assert_eq!(table.parse(&table.to_short_string(g)).unwrap(), g);
        }
    }
}
