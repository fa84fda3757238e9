// Device view - the controller behind one open device page
use crate::application::export::ExportPipeline;
use crate::application::live_poller::{LivePoller, PollState, PollTarget};
use crate::application::telemetry_client::{Clock, TelemetryClient};
use crate::domain::axis::{ChartAnnotation, annotate};
use crate::domain::device::DeviceInfo;
use crate::domain::error::TelemetryError;
use crate::domain::export::ExportArtifact;
use crate::domain::normalize::{merge_latest, normalize};
use crate::domain::telemetry::SeriesSet;
use crate::domain::time_range::{RangeSelection, TimeRange, resolve, resolve_or_default};
use async_trait::async_trait;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct ViewSettings {
    pub default_hours: u32,
    pub utc_offset: FixedOffset,
    pub cadence: Duration,
    /// Declared display units by telemetry key
    pub units: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveMode {
    /// Refetch the whole window every tick and replace the data.
    #[default]
    History,
    /// Fetch only the newest reading of each key and merge it in.
    Latest,
}

/// Immutable state of a view at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub device: DeviceInfo,
    pub range: TimeRange,
    pub live: PollState,
    pub live_mode: Option<LiveMode>,
    pub series: Arc<SeriesSet>,
    pub fetched_at: Option<i64>,
    pub no_data: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct Selection {
    range: RangeSelection,
    keys: Option<Vec<String>>,
}

/// Outcome of one backend call, tagged with the ticket it was issued under.
#[derive(Debug)]
pub struct Fetched {
    ticket: u64,
    range: TimeRange,
    window: Option<TimeRange>,
    kind: FetchKind,
}

#[derive(Debug)]
enum FetchKind {
    History(SeriesSet),
    Latest(SeriesSet),
}

struct ViewInner {
    client: Arc<dyn TelemetryClient>,
    clock: Arc<dyn Clock>,
    settings: ViewSettings,
    device: DeviceInfo,
    selection: Mutex<Selection>,
    snapshot: watch::Sender<Arc<ViewSnapshot>>,
    next_ticket: AtomicU64,
    applied_ticket: Mutex<u64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ViewInner {
    fn issue_ticket(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn selection(&self) -> Selection {
        lock(&self.selection).clone()
    }

    fn resolve_range(&self, selection: &RangeSelection) -> Result<TimeRange, TelemetryError> {
        Ok(resolve(
            selection,
            self.clock.now_ms(),
            self.settings.default_hours,
            self.settings.utc_offset,
        )?)
    }

    async fn fetch(&self, ticket: u64, mode: LiveMode) -> Result<Fetched, TelemetryError> {
        let selection = self.selection();
        let range = self.resolve_range(&selection.range)?;
        let keys = selection.keys.as_deref();

        let kind = match mode {
            LiveMode::History => {
                let raw = self.client.fetch_history(&self.device.id, keys, &range).await?;
                FetchKind::History(normalize(raw))
            }
            LiveMode::Latest => {
                let raw = self.client.fetch_latest(&self.device.id, keys).await?;
                FetchKind::Latest(normalize(raw))
            }
        };

        Ok(Fetched {
            ticket,
            range,
            window: selection.range.is_rolling().then_some(range),
            kind,
        })
    }

    /// Replaces the data unless a newer ticket was applied already.
    fn apply(&self, fetched: Fetched) -> bool {
        let mut applied = lock(&self.applied_ticket);
        if fetched.ticket < *applied {
            tracing::debug!(
                device_id = %self.device.id,
                ticket = fetched.ticket,
                applied = *applied,
                "Dropping stale telemetry result"
            );
            return false;
        }
        *applied = fetched.ticket;

        let fetched_at = self.clock.now_ms();
        self.snapshot.send_modify(|current| {
            let series = match fetched.kind {
                FetchKind::History(set) => set,
                FetchKind::Latest(set) => merge_latest(&current.series, set, fetched.window),
            };
            *current = Arc::new(ViewSnapshot {
                range: fetched.range,
                no_data: series.is_empty(),
                series: Arc::new(series),
                fetched_at: Some(fetched_at),
                last_error: None,
                ..(**current).clone()
            });
        });
        true
    }

    /// Records a failed fetch. Data stays as it was.
    fn record_failure(&self, ticket: Option<u64>, error: &TelemetryError) {
        let superseded = match ticket {
            Some(ticket) => ticket < *lock(&self.applied_ticket),
            None => false,
        };
        if superseded {
            return;
        }
        let message = error.to_string();
        self.snapshot.send_modify(|current| {
            *current = Arc::new(ViewSnapshot {
                last_error: Some(message),
                ..(**current).clone()
            });
        });
    }

    fn set_live(&self, live: PollState, mode: Option<LiveMode>) {
        self.snapshot.send_modify(|current| {
            *current = Arc::new(ViewSnapshot {
                live,
                live_mode: mode,
                ..(**current).clone()
            });
        });
    }
}

/// Feeds live poll ticks into a view.
struct LiveFeed {
    inner: Arc<ViewInner>,
    mode: LiveMode,
}

#[async_trait]
impl PollTarget for LiveFeed {
    type Reading = Fetched;

    async fn poll(&self) -> Result<Fetched, TelemetryError> {
        let ticket = self.inner.issue_ticket();
        self.inner.fetch(ticket, self.mode).await
    }

    fn apply(&self, reading: Fetched) {
        self.inner.apply(reading);
    }

    fn report(&self, error: &TelemetryError) {
        self.inner.record_failure(None, error);
    }
}

/// One open device. Owns its live poller; dropping the view stops polling.
pub struct DeviceView {
    inner: Arc<ViewInner>,
    poller: LivePoller,
}

impl DeviceView {
    pub fn new(
        device: DeviceInfo,
        client: Arc<dyn TelemetryClient>,
        clock: Arc<dyn Clock>,
        settings: ViewSettings,
    ) -> Self {
        let (range, _) = resolve_or_default(
            &RangeSelection::default(),
            clock.now_ms(),
            settings.default_hours,
            settings.utc_offset,
        );
        let initial = ViewSnapshot {
            device: device.clone(),
            range,
            live: PollState::Idle,
            live_mode: None,
            series: Arc::new(SeriesSet::new()),
            fetched_at: None,
            no_data: false,
            last_error: None,
        };
        let (snapshot, _) = watch::channel(Arc::new(initial));
        let poller = LivePoller::new(device.id.clone(), settings.cadence);

        Self {
            inner: Arc::new(ViewInner {
                client,
                clock,
                settings,
                device,
                selection: Mutex::new(Selection::default()),
                snapshot,
                next_ticket: AtomicU64::new(0),
                applied_ticket: Mutex::new(0),
            }),
            poller,
        }
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.inner.device
    }

    pub fn snapshot(&self) -> Arc<ViewSnapshot> {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ViewSnapshot>> {
        self.inner.snapshot.subscribe()
    }

    /// Sets the window for the next fetch. An invalid selection falls back to
    /// the default rolling window and the validation error is returned.
    pub fn set_range(&self, selection: RangeSelection) -> Result<TimeRange, TelemetryError> {
        let settings = &self.inner.settings;
        let (range, error) = resolve_or_default(
            &selection,
            self.inner.clock.now_ms(),
            settings.default_hours,
            settings.utc_offset,
        );

        lock(&self.inner.selection).range = match error {
            Some(_) => RangeSelection::hours(settings.default_hours),
            None => selection,
        };

        let message = error.as_ref().map(ToString::to_string);
        self.inner.snapshot.send_modify(|current| {
            *current = Arc::new(ViewSnapshot {
                range,
                last_error: message,
                ..(**current).clone()
            });
        });

        match error {
            Some(err) => {
                tracing::warn!(device_id = %self.inner.device.id, error = %err, "Rejected time range");
                Err(err.into())
            }
            None => Ok(range),
        }
    }

    /// Restricts fetches to `keys`; `None` or an empty list means all keys.
    pub fn set_keys(&self, keys: Option<Vec<String>>) {
        let keys = keys
            .map(|keys| {
                keys.into_iter()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|keys| !keys.is_empty());
        lock(&self.inner.selection).keys = keys;
    }

    pub fn keys(&self) -> Option<Vec<String>> {
        self.inner.selection().keys
    }

    /// One-shot historical fetch. On failure the current data is kept.
    pub async fn fetch_history(&self) -> Result<Arc<ViewSnapshot>, TelemetryError> {
        let ticket = self.inner.issue_ticket();
        match self.inner.fetch(ticket, LiveMode::History).await {
            Ok(fetched) => {
                let (keys, samples) = match &fetched.kind {
                    FetchKind::History(set) | FetchKind::Latest(set) => (set.len(), set.sample_count()),
                };
                self.inner.apply(fetched);
                tracing::debug!(device_id = %self.inner.device.id, keys, samples, "Fetched telemetry history");
                Ok(self.snapshot())
            }
            Err(err) => {
                if !err.is_validation() {
                    tracing::warn!(device_id = %self.inner.device.id, error = %err, "Telemetry fetch failed");
                }
                self.inner.record_failure(Some(ticket), &err);
                Err(err)
            }
        }
    }

    pub fn start_live(&self, mode: LiveMode) -> bool {
        let feed = Arc::new(LiveFeed {
            inner: self.inner.clone(),
            mode,
        });
        let started = self.poller.start(feed);
        if started {
            self.inner.set_live(PollState::Polling, Some(mode));
        }
        started
    }

    pub fn stop_live(&self) -> bool {
        let stopped = self.poller.stop();
        if stopped {
            self.inner.set_live(PollState::Idle, None);
        }
        stopped
    }

    pub fn is_live(&self) -> bool {
        self.poller.state() == PollState::Polling
    }

    pub fn chart(&self) -> Vec<ChartAnnotation> {
        let snapshot = self.snapshot();
        let settings = &self.inner.settings;
        snapshot
            .series
            .iter()
            .map(|series| {
                let declared = settings.units.get(&series.key).map(String::as_str);
                annotate(series, &snapshot.range, settings.utc_offset, declared)
            })
            .collect()
    }

    pub fn export_csv(&self) -> Result<Option<ExportArtifact>, TelemetryError> {
        let snapshot = self.snapshot();
        ExportPipeline::csv(&snapshot.device, &snapshot.range, &snapshot.series)
    }

    pub fn export_pdf(&self) -> Result<Option<ExportArtifact>, TelemetryError> {
        let snapshot = self.snapshot();
        ExportPipeline::pdf(&snapshot.device, &snapshot.range, &snapshot.series)
    }
}

impl Drop for DeviceView {
    fn drop(&mut self) {
        if self.poller.stop() {
            tracing::debug!(device_id = %self.inner.device.id, "Stopped live polling on view teardown");
        }
    }
}
