//! Ordered content-type sets.
//!
//! A [`ContentTypeSet`] keeps content types in the order they were first
//! seen (client or caller preference) and never holds duplicates. It carries
//! a single forward-only cursor used while negotiating.

use std::fmt;

use crate::content_type::ContentType;

static EMPTY: ContentType = ContentType::NONE;

/// An ordered, duplicate-free sequence of [`ContentType`] with a cursor.
///
/// The cursor starts before the first element. [`advance`](Self::advance)
/// moves it forward; [`current`](Self::current) clamps into range so a
/// caller that ignores `advance`'s return value still gets a sane type.
///
/// ```
/// use render_axum_core::{ContentType, ContentTypeSet};
///
/// let mut set = ContentTypeSet::from_accept_header("application/json, text/html;q=0.9, application/json");
/// assert_eq!(set.types(), &[ContentType::JSON, ContentType::HTML]);
///
/// assert!(set.advance());
/// assert_eq!(set.current(), &ContentType::JSON);
/// assert!(set.advance());
/// assert_eq!(set.current(), &ContentType::HTML);
/// assert!(!set.advance());
/// assert_eq!(set.current(), &ContentType::HTML);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentTypeSet {
    types: Vec<ContentType>,
    /// Number of `advance` calls, capped at `types.len() + 1`.
    /// 0 means "before the first element".
    cursor: usize,
}

impl ContentTypeSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from an `Accept` header value.
    ///
    /// Fields are split on commas and parsed as media types. Quality values
    /// and other parameters are ignored, malformed fields are dropped, and
    /// duplicates keep their first position. An empty or unparseable header
    /// yields an empty set.
    pub fn from_accept_header(value: &str) -> Self {
        Self::parse_all(value.split(','))
    }

    /// Parse every string as a media type, dropping the ones that fail.
    pub fn parse_all<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        values
            .into_iter()
            .filter_map(|v| ContentType::parse(v).ok())
            .collect()
    }

    /// Build a set from types that are already canonical.
    ///
    /// Used when configuration or middleware forces specific types
    /// regardless of what the client asked for.
    pub fn from_types<I>(types: I) -> Self
    where
        I: IntoIterator<Item = ContentType>,
    {
        types.into_iter().collect()
    }

    fn insert(&mut self, content_type: ContentType) {
        if !self.types.contains(&content_type) {
            self.types.push(content_type);
        }
    }

    /// Membership test, independent of the cursor.
    pub fn has(&self, content_type: &ContentType) -> bool {
        self.types.contains(content_type)
    }

    /// Advance the cursor; returns whether it now points at an element.
    ///
    /// Past the end this keeps returning `false`.
    pub fn advance(&mut self) -> bool {
        if self.cursor <= self.types.len() {
            self.cursor += 1;
        }
        self.cursor <= self.types.len()
    }

    /// The element at the cursor, clamped into range.
    ///
    /// Before the first `advance` this is the first element; past the end it
    /// is the last one. An empty set returns [`ContentType::NONE`].
    pub fn current(&self) -> &ContentType {
        if self.types.is_empty() {
            return &EMPTY;
        }
        let idx = self.cursor.saturating_sub(1).min(self.types.len() - 1);
        &self.types[idx]
    }

    /// Rewind the cursor to its initial, pre-iteration position.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// The content types in preference order.
    pub fn types(&self) -> &[ContentType] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate over the types in order without touching the cursor.
    pub fn iter(&self) -> std::slice::Iter<'_, ContentType> {
        self.types.iter()
    }
}

impl FromIterator<ContentType> for ContentTypeSet {
    fn from_iter<I: IntoIterator<Item = ContentType>>(iter: I) -> Self {
        let mut set = ContentTypeSet::new();
        for content_type in iter {
            set.insert(content_type);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ContentTypeSet {
    type Item = &'a ContentType;
    type IntoIter = std::slice::Iter<'a, ContentType>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for ContentTypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, content_type) in self.types.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            f.write_str(content_type.as_str())?;
        }
        Ok(())
    }
}
