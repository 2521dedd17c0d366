use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};

/// Access grant bitmask.
///
/// Bit layout:
/// - bit 0: `NONE` (self-terminating, dominates every other bit)
/// - bits 1..=7: OTP section
/// - bits 8..=15: user management
/// - bits 16..=23: operator-defined custom grants
/// - bits 24..=31: reserved, never named
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Grant(u32);

impl Grant {
    pub const UNKNOWN: Grant = Grant(0x0000_0000);
    pub const NONE: Grant = Grant(0x0000_0001);

    pub const SET_OTP: Grant = Grant(0x0000_0002);
    pub const OTP_VALIDATE: Grant = Grant(0x0000_0004);
    pub const OTP_QR: Grant = Grant(0x0000_0008);
    pub const OTP: Grant = Grant(Self::SET_OTP.0 | Self::OTP_VALIDATE.0 | Self::OTP_QR.0);

    pub const USERS_REFRESH: Grant = Grant(0x0000_0100);

    /// The "fully logged in" scope.
    pub const AUTHENTICATED: Grant = Grant(Self::OTP.0 | Self::USERS_REFRESH.0);

    pub const CUSTOM_RANGE: Grant = Grant(0x00FF_0000);
    pub const RESERVED_RANGE: Grant = Grant(0xFF00_0000);

    // Input-clamping sentinels; never issued.
    pub const FULL: Grant = Grant(0xFFFF_FFFE);
    pub const MAX: Grant = Grant(0xFFFF_FFFF);

    pub const CUSTOM_FIRST_BIT: u32 = 16;
    pub const MAX_CUSTOM_GRANTS: usize = 8;

    pub const fn from_bits(bits: u32) -> Self {
        Grant(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Single-bit grant at `position`, or `None` past bit 31.
    pub fn bit(position: u32) -> Option<Self> {
        1u32.checked_shl(position).map(Grant)
    }

    /// Custom-range grant for the `index`-th custom slot (0-based).
    pub fn custom_slot(index: usize) -> Option<Self> {
        if index >= Self::MAX_CUSTOM_GRANTS {
            return None;
        }
        Self::bit(Self::CUSTOM_FIRST_BIT + index as u32)
    }

    pub const fn is_unknown(self) -> bool {
        self.0 == 0
    }

    /// Whether exactly one bit is set.
    pub const fn is_atomic(self) -> bool {
        self.0.is_power_of_two()
    }

    /// `self` grants `other` iff it is a bitwise superset of it.
    pub const fn contains(self, other: Grant) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Grant) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn without(self, other: Grant) -> Grant {
        Grant(self.0 & !other.0)
    }

    /// Canonical form.
    ///
    /// Collapses to `NONE` when bit 0 is present; otherwise keeps only
    /// `AUTHENTICATED` bits, plus the custom range when `custom_set` is true.
    /// Reserved bits are always dropped. Never adds a bit that was not already set.
    pub const fn clean_with(self, custom_set: bool) -> Grant {
        if self.0 & Self::NONE.0 != 0 {
            return Self::NONE;
        }
        let mask = if custom_set {
            Self::AUTHENTICATED.0 | Self::CUSTOM_RANGE.0
        } else {
            Self::AUTHENTICATED.0
        };
        Grant(self.0 & mask)
    }

    /// Iterate the set bits as single-bit grants, lowest first.
    pub fn atoms(self) -> impl Iterator<Item = Grant> {
        (0..u32::BITS)
            .map(|i| Grant(1 << i))
            .filter(move |b| self.intersects(*b))
    }
}

impl fmt::Debug for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grant({:#010x})", self.0)
    }
}

impl fmt::LowerHex for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl BitOr for Grant {
    type Output = Grant;

    fn bitor(self, rhs: Grant) -> Grant {
        Grant(self.0 | rhs.0)
    }
}

impl BitOrAssign for Grant {
    fn bitor_assign(&mut self, rhs: Grant) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Grant {
    type Output = Grant;

    fn bitand(self, rhs: Grant) -> Grant {
        Grant(self.0 & rhs.0)
    }
}

impl BitAndAssign for Grant {
    fn bitand_assign(&mut self, rhs: Grant) {
        self.0 &= rhs.0;
    }
}
