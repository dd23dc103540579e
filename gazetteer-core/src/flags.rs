//! The closed flag vocabulary used by style rules.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bitmask of style categories attached to a matched tag.
///
/// Only fourteen bits carry meaning. [`StyleFlags::BOUNDARY`] is internal: it
/// steers `place` handling for administrative boundaries and never reaches a
/// place row.
///
/// # Examples
/// ```
/// use gazetteer_core::StyleFlags;
///
/// let flags = StyleFlags::parse_list("main,main_named").expect("known names");
/// assert!(flags.contains(StyleFlags::MAIN_NAMED));
/// assert!(!flags.contains(StyleFlags::NAME));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StyleFlags(u16);

impl StyleFlags {
    /// No category.
    pub const NONE: Self = Self(0);
    /// The tag yields a `(class, type)` main pair.
    pub const MAIN: Self = Self(1 << 0);
    /// The main pair needs the entity to carry a name.
    pub const MAIN_NAMED: Self = Self(1 << 1);
    /// The main pair needs a `<class>:name` tag when the entity is unnamed.
    pub const MAIN_NAMED_KEY: Self = Self(1 << 2);
    /// The main pair is kept as a last resort.
    pub const MAIN_FALLBACK: Self = Self(1 << 3);
    /// The main pair takes the value of the `operator` tag.
    pub const MAIN_OPERATOR: Self = Self(1 << 4);
    /// Name tag.
    pub const NAME: Self = Self(1 << 5);
    /// Reference designation, stored with the names.
    pub const REF: Self = Self(1 << 6);
    /// Address part.
    pub const ADDRESS: Self = Self(1 << 7);
    /// Address part that makes the entity an address point.
    pub const ADDRESS_POINT: Self = Self(1 << 8);
    /// Postcode.
    pub const POSTCODE: Self = Self(1 << 9);
    /// Two-letter country code.
    pub const COUNTRY: Self = Self(1 << 10);
    /// Extra tag copied verbatim.
    pub const EXTRA: Self = Self(1 << 11);
    /// House number interpolation line.
    pub const INTERPOLATION: Self = Self(1 << 12);
    /// Internal marker for boundary handling.
    pub const BOUNDARY: Self = Self(1 << 13);

    const VOCABULARY: [(&'static str, Self); 14] = [
        ("main", Self::MAIN),
        ("main_named", Self::MAIN_NAMED),
        ("main_named_key", Self::MAIN_NAMED_KEY),
        ("main_fallback", Self::MAIN_FALLBACK),
        ("main_operator", Self::MAIN_OPERATOR),
        ("name", Self::NAME),
        ("ref", Self::REF),
        ("address", Self::ADDRESS),
        ("address_point", Self::ADDRESS_POINT),
        ("postcode", Self::POSTCODE),
        ("country", Self::COUNTRY),
        ("extra", Self::EXTRA),
        ("interpolation", Self::INTERPOLATION),
        ("boundary", Self::BOUNDARY),
    ];

    /// Raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// True when every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when at least one bit of `other` is set.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// True when no bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Look up a single flag by its style-file name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::VOCABULARY
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, flag)| *flag)
    }

    /// Parse a comma or pipe separated list of flag names.
    ///
    /// Empty tokens are skipped. On failure the offending token is returned.
    pub fn parse_list(list: &str) -> Result<Self, String> {
        let mut flags = Self::NONE;
        for token in list.split([',', '|']).map(str::trim) {
            if token.is_empty() {
                continue;
            }
            flags |= Self::from_name(token).ok_or_else(|| token.to_owned())?;
        }
        Ok(flags)
    }
}

impl BitOr for StyleFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for StyleFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for StyleFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, flag) in Self::VOCABULARY {
            if self.contains(flag) {
                if !first {
                    f.write_str(",")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}
