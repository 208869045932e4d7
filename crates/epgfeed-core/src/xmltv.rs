//! XMLTV encoding and gzip packaging.
//!
//! Serializes a [`ScheduleDocument`] into the XMLTV wire format consumed by
//! EPG readers, and gzips the result at maximum ratio. Both steps are pure.

use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;

use crate::error::{FeedError, Result};
use crate::model::{Channel, LocalizedText, Programme, ScheduleDocument};

/// `generator-info-name` attribute value.
const GENERATOR: &str = concat!("epgfeed/", env!("CARGO_PKG_VERSION"));

/// XMLTV timestamp format (`20240101210000 +0100`).
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S %z";

/// Document prologue; quick-xml serializes the element tree only.
const PROLOGUE: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE tv SYSTEM \"xmltv.dtd\">\n";

#[derive(Debug, Serialize)]
#[serde(rename = "tv")]
struct TvElement<'a> {
    #[serde(rename = "@source-info-url")]
    source_info_url: &'a str,
    #[serde(rename = "@source-info-name")]
    source_info_name: &'a str,
    #[serde(rename = "@generator-info-name")]
    generator_info_name: &'a str,
    channel: Vec<ChannelElement<'a>>,
    programme: Vec<ProgrammeElement<'a>>,
}

#[derive(Debug, Serialize)]
struct ChannelElement<'a> {
    #[serde(rename = "@id")]
    id: &'a str,
    #[serde(rename = "display-name")]
    display_names: Vec<TextElement<'a>>,
    #[serde(rename = "icon")]
    icons: Vec<IconElement<'a>>,
}

#[derive(Debug, Serialize)]
struct ProgrammeElement<'a> {
    #[serde(rename = "@start")]
    start: String,
    #[serde(rename = "@stop")]
    stop: String,
    #[serde(rename = "@channel")]
    channel: &'a str,
    #[serde(rename = "title")]
    titles: Vec<TextElement<'a>>,
    #[serde(rename = "date", skip_serializing_if = "Option::is_none")]
    date: Option<u16>,
    #[serde(rename = "category")]
    categories: Vec<TextElement<'a>>,
}

#[derive(Debug, Serialize)]
struct TextElement<'a> {
    #[serde(rename = "@lang", skip_serializing_if = "Option::is_none")]
    lang: Option<&'a str>,
    #[serde(rename = "$text")]
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct IconElement<'a> {
    #[serde(rename = "@src")]
    src: &'a str,
}

impl<'a> From<&'a LocalizedText> for TextElement<'a> {
    fn from(text: &'a LocalizedText) -> Self {
        Self {
            lang: text.lang.as_deref(),
            value: &text.value,
        }
    }
}

impl<'a> From<&'a Channel> for ChannelElement<'a> {
    fn from(channel: &'a Channel) -> Self {
        Self {
            id: &channel.id,
            display_names: channel.display_names.iter().map(Into::into).collect(),
            icons: channel
                .icons
                .iter()
                .map(|src| IconElement { src })
                .collect(),
        }
    }
}

impl<'a> From<&'a Programme> for ProgrammeElement<'a> {
    fn from(programme: &'a Programme) -> Self {
        Self {
            start: programme.start.format(TIMESTAMP_FORMAT).to_string(),
            stop: programme.end.format(TIMESTAMP_FORMAT).to_string(),
            channel: &programme.channel,
            titles: programme.titles.iter().map(Into::into).collect(),
            date: programme.date,
            categories: programme.categories.iter().map(Into::into).collect(),
        }
    }
}

/// Encodes a schedule document as XMLTV.
///
/// # Errors
///
/// Returns [`FeedError::Encode`] if serialization fails.
pub fn encode(document: &ScheduleDocument) -> Result<String> {
    let tv = TvElement {
        source_info_url: &document.source_url,
        source_info_name: &document.source_name,
        generator_info_name: GENERATOR,
        channel: document.channels.iter().map(Into::into).collect(),
        programme: document.programmes.iter().map(Into::into).collect(),
    };

    let mut body = String::new();
    let mut serializer = quick_xml::se::Serializer::new(&mut body);
    serializer.indent(' ', 2);
    tv.serialize(serializer)
        .map_err(|e| FeedError::Encode(e.to_string()))?;

    let mut out = String::with_capacity(PROLOGUE.len().saturating_add(body.len()).saturating_add(1));
    out.push_str(PROLOGUE);
    out.push_str(&body);
    out.push('\n');
    Ok(out)
}

/// Gzips encoded feed bytes at maximum compression ratio.
///
/// # Errors
///
/// Returns [`FeedError::Encode`] if compression fails.
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(bytes)
        .and_then(|()| encoder.finish())
        .map_err(|e| FeedError::Encode(format!("gzip: {e}")))
}
