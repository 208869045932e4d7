//! Staleness-driven, single-flight feed regeneration.
//!
//! The controller owns the response cache, the regeneration lease and the
//! feed artifacts on disk. [`RegenerationController::run_if_needed`] is the
//! request-path entry point: it regenerates only when the published feed is
//! older than the staleness threshold and no other regeneration holds the
//! lease.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use epgfeed_api::magenta::{MagentaApi, MagentaSession};
use futures::StreamExt;
use futures::TryStreamExt;
use futures::stream;
use tracing::{debug, info, instrument, warn};

use crate::builder;
use crate::cache::{self, ResponseCache};
use crate::error::Result;
use crate::lock::RegenLease;
use crate::model::{Channel, FEED_TZ, Programme, ScheduleDocument};
use crate::remap::{self, ChannelIdRemapTable};
use crate::xmltv;

/// `source-info-url` attribute of the published feed.
const SOURCE_INFO_URL: &str = "https://tv.magenta.at/epg";
/// `source-info-name` attribute of the published feed.
const SOURCE_INFO_NAME: &str = "Magenta";

/// Published gzipped feed file name.
pub const FEED_GZ_NAME: &str = "epg.xml.gz";
/// Uncompressed feed copy file name.
pub const FEED_XML_NAME: &str = "epg.xml";
/// Regeneration lease file name.
const LEASE_NAME: &str = "epg.lock";
/// Response cache directory name under the data directory.
const CACHE_DIR_NAME: &str = "cache";

/// Days of schedule fetched per channel (today and tomorrow).
const SCHEDULE_DAYS: u64 = 2;
/// Hours covered by one schedule window.
const WINDOW_HOURS: u8 = 3;

/// Regeneration tuning knobs.
#[derive(Debug)]
pub struct RegenerationOptions {
    /// Feed age beyond which a request triggers regeneration.
    pub staleness: Duration,
    /// Lease lifetime bounding a single regeneration run.
    pub lease_ttl: Duration,
    /// Response cache entry TTL.
    pub cache_ttl: Duration,
    /// Upper bound on concurrent upstream fetches.
    pub fetch_concurrency: usize,
    /// Channel-id remap table, applied once after document assembly.
    pub remap: Option<ChannelIdRemapTable>,
}

impl Default for RegenerationOptions {
    fn default() -> Self {
        Self {
            staleness: Duration::hours(12),
            lease_ttl: RegenLease::default_ttl(),
            cache_ttl: ResponseCache::default_ttl(),
            fetch_concurrency: 4,
            remap: None,
        }
    }
}

/// What a regeneration attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Feed was fresh enough; nothing ran.
    Fresh,
    /// Another regeneration holds the lease; nothing ran.
    InProgress,
    /// A new feed was generated and published.
    Regenerated,
}

/// Whether a feed generated at `generated_at` is stale at `now`.
///
/// Age strictly greater than the threshold is stale; age equal to the
/// threshold is still fresh.
#[must_use]
pub fn is_stale(generated_at: DateTime<Utc>, now: DateTime<Utc>, threshold: Duration) -> bool {
    now.signed_duration_since(generated_at) > threshold
}

/// The 16 `(date, hour_offset)` schedule windows for a run starting `today`.
///
/// Two days, eight 3-hour offsets each. A day that would overflow the
/// calendar is skipped.
#[must_use]
pub fn schedule_windows(today: NaiveDate) -> Vec<(NaiveDate, u8)> {
    (0..SCHEDULE_DAYS)
        .filter_map(|d| today.checked_add_days(Days::new(d)))
        .flat_map(|date| {
            (0..24)
                .step_by(usize::from(WINDOW_HOURS))
                .map(move |offset| (date, offset))
        })
        .collect()
}

/// Feed regeneration controller.
pub struct RegenerationController<A> {
    /// Upstream API implementation.
    api: A,
    cache: ResponseCache,
    lease: RegenLease,
    feed_gz_path: PathBuf,
    feed_xml_path: PathBuf,
    options: RegenerationOptions,
}

impl<A> std::fmt::Debug for RegenerationController<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegenerationController")
            .field("feed_gz_path", &self.feed_gz_path)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<A: MagentaApi + Sync> RegenerationController<A> {
    /// Creates a controller rooted at `data_dir`.
    ///
    /// The directory holds the published artifacts, the lease file and the
    /// `cache/` subdirectory; it is created if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the data or cache directory cannot be created.
    pub fn new(api: A, data_dir: impl Into<PathBuf>, options: RegenerationOptions) -> io::Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        let cache = ResponseCache::open(data_dir.join(CACHE_DIR_NAME), options.cache_ttl)?;
        let lease = RegenLease::new(data_dir.join(LEASE_NAME), options.lease_ttl);
        Ok(Self {
            api,
            cache,
            lease,
            feed_gz_path: data_dir.join(FEED_GZ_NAME),
            feed_xml_path: data_dir.join(FEED_XML_NAME),
            options,
        })
    }

    /// Path of the published gzipped feed.
    #[must_use]
    pub fn feed_path(&self) -> &Path {
        &self.feed_gz_path
    }

    /// The response cache backing this controller.
    #[must_use]
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Whether the published feed is missing or older than the staleness
    /// threshold.
    #[must_use]
    pub fn feed_is_stale(&self) -> bool {
        let Ok(metadata) = fs::metadata(&self.feed_gz_path) else {
            return true;
        };
        match metadata.modified() {
            Ok(modified) => is_stale(modified.into(), Utc::now(), self.options.staleness),
            Err(_) => true,
        }
    }

    /// Regenerates the feed if it is stale and no other run holds the lease.
    ///
    /// # Errors
    ///
    /// Returns an error if the lease file cannot be created, an upstream
    /// fetch fails, a payload cannot be parsed, or the artifacts cannot be
    /// written. A failed run leaves the published artifacts untouched.
    #[instrument(skip_all)]
    pub async fn run_if_needed(&self) -> Result<RunOutcome> {
        self.lease.sweep_stale();
        if !self.feed_is_stale() {
            debug!("feed is fresh, skipping regeneration");
            return Ok(RunOutcome::Fresh);
        }
        self.run_guarded().await
    }

    /// Regenerates the feed regardless of its age, still honoring the lease.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::run_if_needed`].
    #[instrument(skip_all)]
    pub async fn run_now(&self) -> Result<RunOutcome> {
        self.lease.sweep_stale();
        self.run_guarded().await
    }

    async fn run_guarded(&self) -> Result<RunOutcome> {
        let Some(_guard) = self.lease.try_acquire()? else {
            info!("regeneration already in progress, skipping");
            return Ok(RunOutcome::InProgress);
        };
        self.regenerate().await?;
        Ok(RunOutcome::Regenerated)
    }

    /// Runs the full pipeline and atomically publishes both artifacts.
    #[instrument(skip_all)]
    async fn regenerate(&self) -> Result<()> {
        let session = self.api.bootstrap_session().await?;
        let channels = self.load_channels(&session).await?;

        let today = Utc::now().with_timezone(&FEED_TZ).date_naive();
        let windows = schedule_windows(today);

        let mut tasks = Vec::new();
        for channel in channels.iter().filter(|c| !builder::is_excluded(c)) {
            for &(date, hour_offset) in &windows {
                tasks.push(self.load_window(&session, channel.id.clone(), date, hour_offset));
            }
        }
        let concurrency = self.options.fetch_concurrency.max(1);
        let batches: Vec<Vec<Programme>> = stream::iter(tasks)
            .buffered(concurrency)
            .try_collect()
            .await?;

        let mut document = ScheduleDocument::new(SOURCE_INFO_URL, SOURCE_INFO_NAME);
        document.channels = channels;
        document.programmes = batches.into_iter().flatten().collect();

        if let Some(table) = &self.options.remap {
            remap::remap_channel_ids(&mut document, table);
        }

        info!(
            channels = document.channels.len(),
            programmes = document.programmes.len(),
            "publishing feed"
        );
        let xml = xmltv::encode(&document)?;
        let gz = xmltv::compress(xml.as_bytes())?;
        atomic_write(&self.feed_xml_path, xml.as_bytes())?;
        atomic_write(&self.feed_gz_path, &gz)?;
        Ok(())
    }

    async fn load_channels(&self, session: &MagentaSession) -> Result<Vec<Channel>> {
        if let Some(raw) = self.cache.get(cache::CHANNELS_KEY) {
            return builder::parse_channels(&raw);
        }
        let raw = self.api.fetch_channel_list(session).await?;
        let channels = builder::parse_channels(&raw)?;
        self.cache.set(cache::CHANNELS_KEY, &raw);
        Ok(channels)
    }

    async fn load_window(
        &self,
        session: &MagentaSession,
        station_id: String,
        date: NaiveDate,
        hour_offset: u8,
    ) -> Result<Vec<Programme>> {
        let key = cache::window_key(date, hour_offset, &station_id);
        if let Some(raw) = self.cache.get(&key) {
            return builder::parse_programmes(&raw, &station_id);
        }
        let raw = self
            .api
            .fetch_schedule_window(session, &station_id, date, hour_offset)
            .await?;
        let programmes = builder::parse_programmes(&raw, &station_id)?;
        self.cache.set(&key, &raw);
        Ok(programmes)
    }
}

/// Writes `bytes` to `path` through a sibling temp file and rename.
fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        if let Err(cleanup) = fs::remove_file(&tmp) {
            warn!(path = %tmp.display(), error = %cleanup, "failed to remove temp artifact");
        }
        return Err(e);
    }
    Ok(())
}
