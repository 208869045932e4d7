//! Upstream JSON to canonical model transform.
//!
//! Decodes the provider's channel-list and schedule-window payloads into
//! [`Channel`] and [`Programme`] records, normalizing timestamps to the
//! feed timezone on the way in.

use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{FeedError, Result};
use crate::model::{Channel, FEED_TZ, LocalizedText, Programme};

/// Language tag applied to titles and categories.
const LANG: &str = "de";

/// Display-name prefix of channels excluded from programme fetching.
///
/// Sky channels are listed in the channel lineup but their schedules are
/// not served by this endpoint; the channel records stay in the document,
/// no schedule windows are requested for them.
const EXCLUDED_PREFIX: &str = "Sky";

/// Channel-list response shape.
#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    channels: Vec<ChannelInfo>,
}

/// One channel row of the channel-list response.
#[derive(Debug, Deserialize)]
struct ChannelInfo {
    station_id: String,
    title: String,
    #[serde(default)]
    channel_logo: Option<String>,
}

/// Schedule-window response shape. `channels` is normally a map keyed by
/// station id, but the upstream emits an empty array when a window has no
/// data at all, so the value is inspected manually.
#[derive(Debug, Deserialize)]
struct ScheduleWindowResponse {
    channels: Value,
}

/// One programme row of a schedule window. Entries can be null or nearly
/// empty; all fields are defaulted and rows without timestamps are skipped.
#[derive(Debug, Deserialize)]
struct ProgrammeInfo {
    #[serde(default)]
    start_time: String,
    #[serde(default)]
    end_time: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    release_year: u16,
    #[serde(default)]
    genres: Vec<GenreInfo>,
}

/// One genre tag.
#[derive(Debug, Deserialize)]
struct GenreInfo {
    #[serde(default)]
    name: String,
}

/// Returns whether a channel is excluded from programme fetching.
#[must_use]
pub fn is_excluded(channel: &Channel) -> bool {
    channel
        .primary_display_name()
        .is_some_and(|name| name.starts_with(EXCLUDED_PREFIX))
}

/// Parses the channel-list payload into channel records.
///
/// # Errors
///
/// Returns [`FeedError::InvalidResponseShape`] if the payload is not JSON
/// with a top-level `channels` array of channel rows.
pub fn parse_channels(raw: &str) -> Result<Vec<Channel>> {
    let response: ChannelListResponse = serde_json::from_str(raw)
        .map_err(|e| FeedError::InvalidResponseShape(format!("channel list: {e}")))?;

    Ok(response
        .channels
        .into_iter()
        .map(|info| Channel {
            id: info.station_id,
            display_names: vec![LocalizedText::plain(info.title)],
            icons: info.channel_logo.into_iter().collect(),
        })
        .collect())
}

/// Parses one schedule-window payload into programme records for one station.
///
/// A window with no entry for the station (absent key, null, or empty list)
/// yields an empty vec; that is normal for quiet windows, not an error.
///
/// # Errors
///
/// Returns [`FeedError::InvalidResponseShape`] if the payload lacks the
/// top-level `channels` key or a timestamp cannot be parsed.
pub fn parse_programmes(raw: &str, station_id: &str) -> Result<Vec<Programme>> {
    let response: ScheduleWindowResponse = serde_json::from_str(raw)
        .map_err(|e| FeedError::InvalidResponseShape(format!("schedule window: {e}")))?;

    let entries = match &response.channels {
        Value::Object(map) => match map.get(station_id) {
            Some(Value::Array(entries)) => entries.as_slice(),
            Some(Value::Null) | None => &[],
            Some(other) => {
                return Err(FeedError::InvalidResponseShape(format!(
                    "schedule window: entry for station {station_id} is {}",
                    type_name(other)
                )));
            }
        },
        // Empty windows come back as `"channels": []`.
        Value::Array(_) => &[],
        other => {
            return Err(FeedError::InvalidResponseShape(format!(
                "schedule window: channels is {}",
                type_name(other)
            )));
        }
    };

    let mut programmes = Vec::new();
    for entry in entries {
        if entry.is_null() {
            continue;
        }
        let info: ProgrammeInfo = serde_json::from_value(entry.clone())
            .map_err(|e| FeedError::InvalidResponseShape(format!("programme entry: {e}")))?;
        if info.start_time.is_empty() && info.end_time.is_empty() {
            continue;
        }
        if let Some(programme) = build_programme(info, station_id)? {
            programmes.push(programme);
        }
    }

    Ok(programmes)
}

/// Builds one programme record, or `None` for rows violating `start < end`.
fn build_programme(info: ProgrammeInfo, station_id: &str) -> Result<Option<Programme>> {
    let start = parse_timestamp(&info.start_time)?;
    let end = parse_timestamp(&info.end_time)?;

    if start >= end {
        tracing::warn!(
            station_id,
            start = %info.start_time,
            end = %info.end_time,
            "skipping programme with non-positive duration"
        );
        return Ok(None);
    }

    Ok(Some(Programme {
        channel: String::from(station_id),
        start,
        end,
        titles: vec![LocalizedText::with_lang(info.description, LANG)],
        date: (info.release_year != 0).then_some(info.release_year),
        categories: info
            .genres
            .into_iter()
            .filter(|g| !g.name.is_empty())
            .map(|g| LocalizedText::with_lang(g.name, LANG))
            .collect(),
    }))
}

/// Parses an upstream RFC3339 timestamp and normalizes it to the feed
/// timezone.
fn parse_timestamp(raw: &str) -> Result<chrono::DateTime<chrono_tz::Tz>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&FEED_TZ))
        .map_err(|e| FeedError::InvalidResponseShape(format!("timestamp {raw:?}: {e}")))
}

/// JSON value type name for error messages.
const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]

    use super::*;

    #[test]
    fn test_parse_channels_from_fixture() {
        // Arrange
        let raw = include_str!("../../../fixtures/magenta/channel_list.json");

        // Act
        let channels = parse_channels(raw).unwrap();

        // Assert
        assert_eq!(channels.len(), 4);
        assert_eq!(channels[0].id, "14");
        assert_eq!(channels[0].primary_display_name(), Some("ORF 1"));
        assert_eq!(
            channels[0].icons,
            vec![String::from(
                "https://static.tv.magenta.at/logos/orf1.png"
            )]
        );
        // Null logo yields no icon
        assert_eq!(channels[3].primary_display_name(), Some("Schau TV"));
        assert!(channels[3].icons.is_empty());
    }

    #[test]
    fn test_parse_channels_missing_key_fails() {
        // Arrange
        let raw = r#"{"stations":[]}"#;

        // Act
        let result = parse_channels(raw);

        // Assert
        assert!(matches!(result, Err(FeedError::InvalidResponseShape(_))));
    }

    #[test]
    fn test_parse_channels_not_json_fails() {
        // Act & Assert
        assert!(matches!(
            parse_channels("<html>bad gateway</html>"),
            Err(FeedError::InvalidResponseShape(_))
        ));
    }

    #[test]
    fn test_parse_programmes_from_fixture() {
        // Arrange
        let raw = include_str!("../../../fixtures/magenta/schedule_window_14.json");

        // Act
        let programmes = parse_programmes(raw, "14").unwrap();

        // Assert
        assert_eq!(programmes.len(), 2);

        let news = &programmes[0];
        assert_eq!(news.channel, "14");
        assert_eq!(news.titles[0].value, "News");
        assert_eq!(news.titles[0].lang.as_deref(), Some("de"));
        // 20:00 UTC on 2024-01-01 is 21:00 in Vienna (CET)
        assert_eq!(
            news.start.format("%Y%m%d%H%M%S %z").to_string(),
            "20240101210000 +0100"
        );
        assert_eq!(
            news.end.format("%Y%m%d%H%M%S %z").to_string(),
            "20240101220000 +0100"
        );
        // release_year 0 is omitted
        assert_eq!(news.date, None);
        assert_eq!(news.categories.len(), 1);
        assert_eq!(news.categories[0].value, "News");

        let film = &programmes[1];
        assert_eq!(film.date, Some(1949));
        assert_eq!(film.categories.len(), 2);
        assert_eq!(film.categories[1].value, "Klassiker");
    }

    #[test]
    fn test_parse_programmes_empty_window() {
        // Arrange
        let raw = include_str!("../../../fixtures/magenta/schedule_window_empty.json");

        // Act & Assert
        assert!(parse_programmes(raw, "14").unwrap().is_empty());
    }

    #[test]
    fn test_parse_programmes_empty_array_form() {
        // Arrange: upstream emits an empty array instead of a map
        let raw = r#"{"channels":[]}"#;

        // Act & Assert
        assert!(parse_programmes(raw, "14").unwrap().is_empty());
    }

    #[test]
    fn test_parse_programmes_skips_null_and_empty_entries() {
        // Arrange
        let raw = include_str!("../../../fixtures/magenta/schedule_window_sparse.json");

        // Act
        let programmes = parse_programmes(raw, "14").unwrap();

        // Assert
        assert_eq!(programmes.len(), 1);
        assert_eq!(programmes[0].titles[0].value, "Guten Morgen Österreich");
    }

    #[test]
    fn test_parse_programmes_missing_channels_key_fails() {
        // Arrange
        let raw = r#"{"schedule":{}}"#;

        // Act & Assert
        assert!(matches!(
            parse_programmes(raw, "14"),
            Err(FeedError::InvalidResponseShape(_))
        ));
    }

    #[test]
    fn test_parse_programmes_null_entry_list() {
        // Arrange
        let raw = r#"{"channels":{"14":null}}"#;

        // Act & Assert
        assert!(parse_programmes(raw, "14").unwrap().is_empty());
    }

    #[test]
    fn test_parse_programmes_bad_timestamp_fails() {
        // Arrange
        let raw = r#"{"channels":{"14":[{"start_time":"yesterday","end_time":"2024-01-01T21:00:00Z","description":"x"}]}}"#;

        // Act & Assert
        assert!(matches!(
            parse_programmes(raw, "14"),
            Err(FeedError::InvalidResponseShape(_))
        ));
    }

    #[test]
    fn test_parse_programmes_skips_inverted_interval() {
        // Arrange
        let raw = r#"{"channels":{"14":[{"start_time":"2024-01-01T22:00:00Z","end_time":"2024-01-01T21:00:00Z","description":"x"}]}}"#;

        // Act & Assert
        assert!(parse_programmes(raw, "14").unwrap().is_empty());
    }

    #[test]
    fn test_sky_channels_are_excluded() {
        // Arrange
        let raw = include_str!("../../../fixtures/magenta/channel_list.json");
        let channels = parse_channels(raw).unwrap();

        // Act
        let excluded: Vec<&str> = channels
            .iter()
            .filter(|c| is_excluded(c))
            .filter_map(Channel::primary_display_name)
            .collect();

        // Assert
        assert_eq!(excluded, vec!["Sky Cinema Premieren"]);
    }
}
