//! Style rules: the ordered `(key, value) -> flags` matcher.
//!
//! Responsibilities:
//! - Parse the line-oriented style file into an immutable [`Style`].
//! - Answer which [`StyleFlags`] apply to a tag.
//!
//! Invariants:
//! - Rules keep file order and the first compatible rule wins. A more
//!   specific rule further down never overrides an earlier, broader one.
//! - Matching is a pure function of the style and the tag.

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use thiserror::Error;

use crate::entity::{MetadataField, MetadataFields};
use crate::flags::StyleFlags;

/// Highest (and default) administrative level.
pub const MAX_ADMIN_LEVEL: u8 = 15;

/// How a rule compares against a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    /// Exact key and value.
    Full,
    /// Exact key, any value.
    Key,
    /// Exact key, value starting with a prefix.
    Prefix,
    /// Exact key, value ending with a suffix.
    Suffix,
    /// Any key, exact value.
    Value,
}

/// A single style rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    kind: MatcherKind,
    key: String,
    value: String,
    flags: StyleFlags,
}

impl StyleRule {
    /// Build a rule. `key` is ignored for [`MatcherKind::Value`] and `value`
    /// for [`MatcherKind::Key`]; for prefix and suffix rules `value` holds the
    /// affix without the `*`.
    pub fn new(
        kind: MatcherKind,
        key: impl Into<String>,
        value: impl Into<String>,
        flags: StyleFlags,
    ) -> Self {
        Self {
            kind,
            key: key.into(),
            value: value.into(),
            flags,
        }
    }

    /// Matcher kind.
    #[must_use]
    pub const fn kind(&self) -> MatcherKind {
        self.kind
    }

    /// Flags assigned by the rule.
    #[must_use]
    pub const fn flags(&self) -> StyleFlags {
        self.flags
    }

    /// True when the rule is compatible with the tag.
    #[must_use]
    pub fn matches(&self, key: &str, value: &str) -> bool {
        match self.kind {
            MatcherKind::Full => self.key == key && self.value == value,
            MatcherKind::Key => self.key == key,
            MatcherKind::Prefix => self.key == key && value.starts_with(self.value.as_str()),
            MatcherKind::Suffix => self.key == key && value.ends_with(self.value.as_str()),
            MatcherKind::Value => self.value == value,
        }
    }
}

/// Errors raised while loading a style. All of them abort start-up.
#[derive(Debug, Error)]
pub enum StyleError {
    /// The style file could not be read.
    #[error("failed to read style file {path:?}")]
    Read {
        /// Location of the style file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A flag list contained a name outside the vocabulary.
    #[error("line {line}: unknown style flag '{token}'")]
    UnknownFlag {
        /// 1-based line number.
        line: usize,
        /// Offending token.
        token: String,
    },
    /// A rule line carried no flags.
    #[error("line {line}: rule '{pattern}' has no flags")]
    MissingFlags {
        /// 1-based line number.
        line: usize,
        /// Pattern of the rule.
        pattern: String,
    },
    /// The pattern could not be understood.
    #[error("line {line}: invalid pattern '{pattern}'")]
    InvalidPattern {
        /// 1-based line number.
        line: usize,
        /// Offending pattern.
        pattern: String,
    },
}

/// The loaded style: ordered rules plus defaults.
///
/// # Examples
/// ```
/// use gazetteer_core::{Style, StyleFlags};
///
/// let style: Style = "amenity=restaurant main,main_named\n* extra"
///     .parse()
///     .expect("valid style");
/// assert!(style.find_flags("amenity", "restaurant").contains(StyleFlags::MAIN_NAMED));
/// assert_eq!(style.find_flags("cuisine", "pizza"), StyleFlags::EXTRA);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Style {
    rules: Vec<StyleRule>,
    default_flags: StyleFlags,
    any_operator_matches: bool,
    metadata_fields: MetadataFields,
}

impl Style {
    /// Load and parse a style file.
    pub fn load(path: &Utf8Path) -> Result<Self, StyleError> {
        let source = gazetteer_fs::read_utf8_file(path).map_err(|source| StyleError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let style = Self::parse(&source)?;
        debug!(
            "loaded style {path}: {} rules, default flags [{}]",
            style.rules.len(),
            style.default_flags
        );
        Ok(style)
    }

    /// Parse style text.
    ///
    /// Text after `#` is a comment. Each remaining non-blank line is
    /// `pattern flags` or a lone flag list setting the default. Patterns: `key`, `key=*`, `key=value`,
    /// `key=prefix*`, `key=*suffix`, `*=value`; `*` sets the default. A lone
    /// metadata key such as `osm_version` requests that metadata column.
    pub fn parse(source: &str) -> Result<Self, StyleError> {
        let mut style = Self::default();
        for (index, raw) in source.lines().enumerate() {
            let line = raw.split_once('#').map_or(raw, |(content, _)| content).trim();
            if line.is_empty() {
                continue;
            }
            style.parse_line(index + 1, line)?;
        }
        Ok(style)
    }

    fn parse_line(&mut self, line_no: usize, line: &str) -> Result<(), StyleError> {
        let (pattern, flag_list) = match line.split_once(char::is_whitespace) {
            Some((pattern, rest)) => (pattern, rest.trim()),
            None => (line, ""),
        };

        if let Some(field) = MetadataField::from_key(pattern) {
            self.metadata_fields.insert(field);
            return Ok(());
        }

        let parse_flags = |list: &str| {
            StyleFlags::parse_list(list)
                .map_err(|token| StyleError::UnknownFlag { line: line_no, token })
        };

        if flag_list.is_empty() && pattern == "*" {
            return Err(StyleError::MissingFlags {
                line: line_no,
                pattern: pattern.to_owned(),
            });
        }
        if flag_list.is_empty() {
            // A lone token is a default flag list.
            self.default_flags = parse_flags(pattern)?;
            return Ok(());
        }
        if pattern == "*" {
            self.default_flags = parse_flags(flag_list)?;
            return Ok(());
        }

        let flags = parse_flags(flag_list)?;
        if flags.is_empty() {
            return Err(StyleError::MissingFlags {
                line: line_no,
                pattern: pattern.to_owned(),
            });
        }
        let rule = parse_pattern(pattern, flags).ok_or_else(|| StyleError::InvalidPattern {
            line: line_no,
            pattern: pattern.to_owned(),
        })?;
        if flags.contains(StyleFlags::MAIN_OPERATOR) {
            self.any_operator_matches = true;
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Flags for a tag: those of the first compatible rule, else the default.
    #[must_use]
    pub fn find_flags(&self, key: &str, value: &str) -> StyleFlags {
        self.rules
            .iter()
            .find(|rule| rule.matches(key, value))
            .map_or(self.default_flags, StyleRule::flags)
    }

    /// Rules in file order.
    #[must_use]
    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    /// Flags applied when no rule matches.
    #[must_use]
    pub const fn default_flags(&self) -> StyleFlags {
        self.default_flags
    }

    /// True when any rule carries `main_operator`.
    #[must_use]
    pub const fn any_operator_matches(&self) -> bool {
        self.any_operator_matches
    }

    /// Metadata columns requested by the style.
    #[must_use]
    pub const fn metadata_fields(&self) -> MetadataFields {
        self.metadata_fields
    }
}

impl std::str::FromStr for Style {
    type Err = StyleError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::parse(source)
    }
}

fn parse_pattern(pattern: &str, flags: StyleFlags) -> Option<StyleRule> {
    let Some((key, value)) = pattern.split_once('=') else {
        return valid_part(pattern).then(|| StyleRule::new(MatcherKind::Key, pattern, "", flags));
    };
    if key == "*" {
        return valid_part(value).then(|| StyleRule::new(MatcherKind::Value, "", value, flags));
    }
    if !valid_part(key) || value.is_empty() {
        return None;
    }
    if value == "*" {
        return Some(StyleRule::new(MatcherKind::Key, key, "", flags));
    }
    if let Some(suffix) = value.strip_prefix('*') {
        return valid_part(suffix).then(|| StyleRule::new(MatcherKind::Suffix, key, suffix, flags));
    }
    if let Some(prefix) = value.strip_suffix('*') {
        return valid_part(prefix).then(|| StyleRule::new(MatcherKind::Prefix, key, prefix, flags));
    }
    valid_part(value).then(|| StyleRule::new(MatcherKind::Full, key, value, flags))
}

fn valid_part(part: &str) -> bool {
    !part.is_empty() && !part.contains('*')
}
