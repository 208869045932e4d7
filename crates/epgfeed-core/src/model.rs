//! Canonical schedule document model.
//!
//! Built fresh on every regeneration run and discarded after encoding.
//! Programme timestamps are normalized to Europe/Vienna at build time so
//! the encoder emits one fixed format and zone throughout.

use chrono::DateTime;
use chrono_tz::Tz;

/// Timezone all programme timestamps are normalized to.
pub const FEED_TZ: Tz = chrono_tz::Europe::Vienna;

/// A text value with an optional language tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedText {
    /// Text content.
    pub value: String,
    /// BCP 47-ish language tag (`de` throughout this feed).
    pub lang: Option<String>,
}

impl LocalizedText {
    /// Creates a text value with a language tag.
    pub fn with_lang(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            lang: Some(lang.into()),
        }
    }

    /// Creates an untagged text value.
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            lang: None,
        }
    }
}

/// One channel of the guide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// Station identifier; the provider's native id unless remapped.
    pub id: String,
    /// Display names, primary first.
    pub display_names: Vec<LocalizedText>,
    /// Icon URLs.
    pub icons: Vec<String>,
}

impl Channel {
    /// The primary display name, if any.
    #[must_use]
    pub fn primary_display_name(&self) -> Option<&str> {
        self.display_names.first().map(|n| n.value.as_str())
    }
}

/// One programme entry.
///
/// Invariant: `start < end`, and `channel` references a channel id present
/// in the owning document (preserved across remapping).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Programme {
    /// Channel id this programme belongs to.
    pub channel: String,
    /// Start time, Vienna-normalized.
    pub start: DateTime<Tz>,
    /// End time, Vienna-normalized.
    pub end: DateTime<Tz>,
    /// Titles.
    pub titles: Vec<LocalizedText>,
    /// Release year, omitted when the upstream reports zero.
    pub date: Option<u16>,
    /// Genre categories.
    pub categories: Vec<LocalizedText>,
}

/// Root aggregate: channels plus programmes for one feed generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleDocument {
    /// Source info URL emitted on the `<tv>` element.
    pub source_url: String,
    /// Source info name emitted on the `<tv>` element.
    pub source_name: String,
    /// Channels, in upstream order (order only matters for readability).
    pub channels: Vec<Channel>,
    /// Programmes; insertion order is not significant.
    pub programmes: Vec<Programme>,
}

impl ScheduleDocument {
    /// Creates an empty document for the given source.
    pub fn new(source_url: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            source_name: source_name.into(),
            channels: Vec::new(),
            programmes: Vec::new(),
        }
    }
}
