//! Channel-id remapping to the A1 numbering scheme.
//!
//! A static display-name → numeric-id table translates the provider's
//! native station ids into A1's tvg ids. The table is configuration data,
//! shipped as a TOML resource and swappable without touching the pipeline.
//!
//! The pass is a single full-document rewrite and must run exactly once per
//! run, after all channels and programmes are populated: re-applying it to
//! an already-remapped document is only safe while no target id collides
//! with a table key, which is not guaranteed.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{FeedError, Result};
use crate::model::ScheduleDocument;

/// Bundled A1 table.
const A1_CHANNELS_TOML: &str = include_str!("../data/a1_channels.toml");

/// Static display-name → numeric-id remap table. Read-only at runtime.
#[derive(Debug, Clone)]
pub struct ChannelIdRemapTable {
    map: HashMap<String, u32>,
}

impl ChannelIdRemapTable {
    /// Loads the bundled A1 channel table.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled resource is malformed.
    pub fn bundled() -> Result<Self> {
        Self::from_toml_str(A1_CHANNELS_TOML)
    }

    /// Loads a table from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Parses a table from TOML text (`"display name" = id` pairs).
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a flat string → integer table.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let map: HashMap<String, u32> = toml::from_str(raw)
            .map_err(|e| FeedError::InvalidResponseShape(format!("remap table: {e}")))?;
        Ok(Self { map })
    }

    /// Looks up the target id for a display name.
    #[must_use]
    pub fn lookup(&self, display_name: &str) -> Option<u32> {
        self.map.get(display_name).copied()
    }

    /// Number of table entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Rewrites channel ids through the table and propagates the rewrite into
/// every programme's channel reference.
///
/// Channels whose primary display name is absent from the table keep their
/// id. The old → new mapping is recorded over the whole channel set first,
/// then applied to programmes, so lookups stay consistent regardless of
/// ordering.
pub fn remap_channel_ids(document: &mut ScheduleDocument, table: &ChannelIdRemapTable) {
    let mut id_map: HashMap<String, String> = HashMap::new();

    for channel in &mut document.channels {
        let new_id = channel
            .primary_display_name()
            .and_then(|name| table.lookup(name))
            .map_or_else(|| channel.id.clone(), |id| id.to_string());
        id_map.insert(channel.id.clone(), new_id.clone());
        channel.id = new_id;
    }

    let mut remapped = 0usize;
    for programme in &mut document.programmes {
        if let Some(new_id) = id_map.get(&programme.channel)
            && *new_id != programme.channel
        {
            programme.channel.clone_from(new_id);
            remapped = remapped.saturating_add(1);
        }
    }

    tracing::debug!(
        channels = document.channels.len(),
        programmes_remapped = remapped,
        "channel ids remapped"
    );
}
