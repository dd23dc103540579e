//! Tag classification against a [`Style`].
//!
//! [`classify`] turns one entity's tags into a fresh [`Classification`]. The
//! result borrows from the tags it was built from, so it cannot outlive the
//! entity or leak into the next one.

use crate::flags::StyleFlags;
use crate::style::{MAX_ADMIN_LEVEL, Style};

/// Borrowed `(key, value)` pair.
pub type TagRef<'a> = (&'a str, &'a str);

/// A `(class, type)` unit that becomes one place row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MainTag<'a> {
    /// Row class, usually the tag key.
    pub class: &'a str,
    /// Row type, usually the tag value.
    pub kind: &'a str,
    /// Flags of the rule that produced the pair.
    pub flags: StyleFlags,
}

impl<'a> MainTag<'a> {
    const fn new(class: &'a str, kind: &'a str, flags: StyleFlags) -> Self {
        Self { class, kind, flags }
    }
}

/// Per-entity classification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification<'a> {
    main: Vec<MainTag<'a>>,
    names: Vec<TagRef<'a>>,
    address: Vec<TagRef<'a>>,
    extra: Vec<TagRef<'a>>,
    operator: Option<&'a str>,
    admin_level: u8,
    is_named: bool,
}

impl<'a> Classification<'a> {
    /// True when at least one main pair survived, i.e. the entity produces rows.
    #[must_use]
    pub fn has_data(&self) -> bool {
        !self.main.is_empty()
    }

    /// Surviving main pairs in emission order.
    #[must_use]
    pub fn main_tags(&self) -> &[MainTag<'a>] {
        &self.main
    }

    /// Name and reference tags.
    #[must_use]
    pub fn names(&self) -> &[TagRef<'a>] {
        &self.names
    }

    /// Address parts with `addr:`/`is_in:` stripped; postcode and country last.
    #[must_use]
    pub fn address(&self) -> &[TagRef<'a>] {
        &self.address
    }

    /// Extra tags.
    #[must_use]
    pub fn extra(&self) -> &[TagRef<'a>] {
        &self.extra
    }

    /// Value of the `operator` tag when a surviving main pair asks for it.
    #[must_use]
    pub const fn operator(&self) -> Option<&'a str> {
        self.operator
    }

    /// Administrative level in `[1, 15]`.
    #[must_use]
    pub const fn admin_level(&self) -> u8 {
        self.admin_level
    }

    /// True when the name set is non-empty.
    #[must_use]
    pub const fn is_named(&self) -> bool {
        self.is_named
    }

    /// Comma-joined classes of the surviving main pairs, in emission order.
    ///
    /// This is the selector handed to the delete buffer for stale-row removal.
    #[must_use]
    pub fn class_list(&self) -> String {
        let classes: Vec<&str> = self.main.iter().map(|tag| tag.class).collect();
        classes.join(",")
    }
}

/// Scratch state collected while walking the tags.
#[derive(Default)]
struct Scan<'a> {
    main: Vec<MainTag<'a>>,
    names: Vec<TagRef<'a>>,
    address: Vec<TagRef<'a>>,
    extra: Vec<TagRef<'a>>,
    operator: Option<&'a str>,
    admin_level: Option<u8>,
    place: Option<(&'a str, StyleFlags)>,
    postcode: Option<&'a str>,
    country: Option<&'a str>,
    postcode_fallback: bool,
    address_point: bool,
    interpolation: bool,
    admin_boundary: bool,
}

/// Classify an entity's tags.
///
/// # Examples
/// ```
/// use gazetteer_core::{Style, classify};
///
/// let style = Style::parse("amenity main,main_named\nname name").expect("style");
/// let named = classify(&style, [("amenity", "cafe"), ("name", "Blue")]);
/// assert_eq!(named.class_list(), "amenity");
///
/// let unnamed = classify(&style, [("amenity", "cafe")]);
/// assert!(!unnamed.has_data());
/// ```
pub fn classify<'a, I>(style: &Style, tags: I) -> Classification<'a>
where
    I: IntoIterator<Item = TagRef<'a>>,
{
    let tags: Vec<TagRef<'a>> = tags.into_iter().collect();
    let mut scan = Scan::default();
    for &(key, value) in &tags {
        scan.visit(style, key, value);
    }
    scan.finish(&tags)
}

impl<'a> Scan<'a> {
    fn visit(&mut self, style: &Style, key: &'a str, value: &'a str) {
        if key == "admin_level" {
            self.admin_level = Some(parse_admin_level(value));
            return;
        }
        if style.any_operator_matches() && key == "operator" {
            self.operator = Some(value);
        }

        let flags = style.find_flags(key, value);
        if flags.is_empty() {
            return;
        }

        if flags.contains(StyleFlags::MAIN) {
            if key == "place" {
                self.place = Some((value, flags));
            } else {
                self.main.push(MainTag::new(key, value, flags));
                if flags.contains(StyleFlags::BOUNDARY) && value == "administrative" {
                    self.admin_boundary = true;
                }
            }
        }
        if flags.intersects(StyleFlags::NAME | StyleFlags::REF) {
            self.names.push((key, value));
        }
        // Must precede address bucketing, which also fills the postcode slot.
        if flags.contains(StyleFlags::POSTCODE) && self.postcode.is_none() {
            self.postcode = Some(value);
            self.postcode_fallback = flags.contains(StyleFlags::MAIN_FALLBACK);
        }
        if flags.intersects(StyleFlags::ADDRESS | StyleFlags::ADDRESS_POINT) {
            self.add_address(strip_address_prefix(key), value);
        }
        if flags.contains(StyleFlags::ADDRESS_POINT) {
            self.address_point = true;
        }
        if flags.contains(StyleFlags::COUNTRY) {
            self.set_country(value);
        }
        if flags.contains(StyleFlags::EXTRA) {
            self.extra.push((key, value));
        }
        if flags.contains(StyleFlags::INTERPOLATION) {
            self.main
                .push(MainTag::new("place", "houses", StyleFlags::MAIN));
            self.interpolation = true;
        }
    }

    fn add_address(&mut self, key: &'a str, value: &'a str) {
        match key {
            "postcode" => {
                if self.postcode.is_none() {
                    self.postcode = Some(value);
                }
            }
            "country" => self.set_country(value),
            _ => {
                if self.address.iter().all(|(existing, _)| *existing != key) {
                    self.address.push((key, value));
                }
            }
        }
    }

    fn set_country(&mut self, value: &'a str) {
        if self.country.is_none() && value.chars().count() == 2 {
            self.country = Some(value);
        }
    }

    fn finish(mut self, tags: &[TagRef<'a>]) -> Classification<'a> {
        if let Some(postcode) = self.postcode {
            self.address.push(("postcode", postcode));
        }
        if let Some(country) = self.country {
            self.address.push(("country", country));
        }
        if let Some((place, flags)) = self.place {
            let demoted = self.interpolation || (self.admin_boundary && !place.starts_with("isl"));
            if demoted {
                self.extra.push(("place", place));
            } else {
                self.main.push(MainTag::new("place", place, flags));
            }
        }

        let is_named = !self.names.is_empty();
        filter_main_tags(&mut self.main, is_named, tags);

        if self.main.is_empty() {
            let fallback = StyleFlags::MAIN | StyleFlags::MAIN_FALLBACK;
            if self.address_point {
                self.main.push(MainTag::new("place", "house", fallback));
            } else if self.postcode_fallback && self.postcode.is_some() {
                self.main.push(MainTag::new("place", "postcode", fallback));
            }
        }

        let operator = self.operator.filter(|_| {
            self.main
                .iter()
                .any(|tag| tag.flags.contains(StyleFlags::MAIN_OPERATOR))
        });

        Classification {
            main: self.main,
            names: self.names,
            address: self.address,
            extra: self.extra,
            operator,
            admin_level: self.admin_level.unwrap_or(MAX_ADMIN_LEVEL),
            is_named,
        }
    }
}

/// Drop main pairs that need a name the entity lacks.
///
/// Named entities keep every candidate. Unnamed ones lose `main_named`
/// candidates, and `main_named_key` candidates without a `<class>:name` tag.
/// When that empties the list, the dropped candidates carrying
/// `main_fallback` come back in their original order.
fn filter_main_tags<'a>(main: &mut Vec<MainTag<'a>>, is_named: bool, tags: &[TagRef<'a>]) {
    if is_named {
        return;
    }
    let mut fallbacks = Vec::new();
    main.retain(|tag| {
        let keep = if tag.flags.contains(StyleFlags::MAIN_NAMED) {
            false
        } else if tag.flags.contains(StyleFlags::MAIN_NAMED_KEY) {
            has_name_key(tags, tag.class)
        } else {
            true
        };
        if !keep && tag.flags.contains(StyleFlags::MAIN_FALLBACK) {
            fallbacks.push(*tag);
        }
        keep
    });
    if main.is_empty() {
        *main = fallbacks;
    }
}

/// True when a `<class>:name` or `<class>:name:*` tag exists.
fn has_name_key(tags: &[TagRef<'_>], class: &str) -> bool {
    tags.iter().any(|(key, _)| {
        key.strip_prefix(class)
            .and_then(|rest| rest.strip_prefix(":name"))
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(':'))
    })
}

fn strip_address_prefix(key: &str) -> &str {
    key.strip_prefix("addr:")
        .or_else(|| key.strip_prefix("is_in:"))
        .unwrap_or(key)
}

/// Parse like C `atoi`; anything outside `[1, 15]` becomes 15.
fn parse_admin_level(value: &str) -> u8 {
    let trimmed = value.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, trimmed.get(1..).unwrap_or("")),
        Some(b'+') => (false, trimmed.get(1..).unwrap_or("")),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(digits.len());
    let parsed = digits.get(..end).and_then(|number| number.parse::<u8>().ok());
    match parsed {
        Some(level) if !negative && (1..=MAX_ADMIN_LEVEL).contains(&level) => level,
        _ => MAX_ADMIN_LEVEL,
    }
}
