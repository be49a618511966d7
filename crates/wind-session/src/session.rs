//! The refresh-cycle orchestrator.
//!
//! One `Session` owns everything a single overlay instance needs:
//! settings, the bounds cache, the density cap, the active-fetch
//! marker, the last derived vector set, and the rendered frame. The
//! host feeds it viewport snapshots through a [`ViewportSource`] and
//! receives [`UiState`] snapshots over a channel.
//!
//! Locking discipline: all session state lives behind one async
//! mutex, and the guard is always released before awaiting the fetch
//! client. A generation counter gates cache writes so a superseded
//! cycle can never publish its result.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wind_common::time::forecast_readout;
use wind_common::{GeoMode, OverlaySettings, StatusLevel, UiEmitter, UiState};
use wind_fetch::{FetchError, HttpTransport, OpenMeteoClient, RateGovernor};
use wind_geo::GeoContext;
use wind_grid::{build_sample_points, DensityController};
use wind_cache::{BoundsCache, CacheEntry};
use wind_render::{create_png, draw_vectors, PixelSurface};

use crate::config::OverlayConfig;
use crate::derive::{derive_at_offset, DerivedSet};

const STATUS_OFF: &str = "Wind overlay is off.";
const STATUS_WAITING: &str = "Waiting for map viewport...";
const STATUS_INITIALIZING: &str = "Initializing wind overlay...";
const STATUS_LOADING: &str = "Loading wind data...";
const STATUS_REFRESHING: &str = "Refreshing wind data...";
const STATUS_ACTIVE: &str = "Wind overlay active.";
const STATUS_APPROX_3D: &str = "3D view fallback mode: wind directions are approximate.";
const STATUS_MOVED: &str = "Map moved. Press Refresh to load wind for this area.";
const STATUS_PROMPT: &str = "Press Refresh to load wind data for this area.";
const STATUS_DAILY_STALE: &str = "Daily request limit reached. Showing recent cached wind.";
const STATUS_RATE_STALE: &str = "Rate limited. Showing recent cached wind.";
const STATUS_GENERIC_STALE: &str = "Using recent cached wind data.";
const STATUS_DAILY_KEEP: &str = "Daily request limit reached. Keeping last loaded wind.";
const STATUS_RATE_KEEP: &str = "Rate limited. Keeping last loaded wind.";
const STATUS_DAILY_ERROR: &str = "Daily request limit reached. Please try again tomorrow.";
const STATUS_RATE_ERROR: &str = "Rate limited. Try again in a moment.";
const STATUS_FETCH_ERROR: &str = "Could not load wind data for this map area.";

/// Where the session gets the current viewport geometry. Hosts wrap
/// their map adapter or descriptor plumbing behind this; tests and
/// the CLI use [`FixedViewport`].
pub trait ViewportSource: Send + Sync {
    fn resolve(&self) -> Option<GeoContext>;
}

/// A viewport that never changes.
pub struct FixedViewport(pub GeoContext);

impl ViewportSource for FixedViewport {
    fn resolve(&self) -> Option<GeoContext> {
        Some(self.0.clone())
    }
}

/// How a refresh request should treat cache and network.
#[derive(Debug, Clone, Copy)]
pub struct RefreshOptions {
    /// User-initiated; applies the manual freshness window to cache
    /// hits.
    pub manual: bool,
    pub allow_cache: bool,
    pub allow_network: bool,
    pub force_network: bool,
    /// Skip the debounce delay.
    pub immediate: bool,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            manual: false,
            allow_cache: true,
            allow_network: true,
            force_network: false,
            immediate: false,
        }
    }
}

impl RefreshOptions {
    /// A user pressing the refresh control.
    pub fn manual_refresh() -> Self {
        Self {
            manual: true,
            immediate: true,
            ..Self::default()
        }
    }

    /// Re-derive from cache only, e.g. after a settings change.
    pub fn cache_only() -> Self {
        Self {
            allow_network: false,
            immediate: true,
            ..Self::default()
        }
    }
}

/// Partial settings update; unset fields keep their current value.
/// Numeric fields are raw and get normalized on application.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsPatch {
    pub enabled: Option<bool>,
    pub offset_hours: Option<f64>,
    pub density_level: Option<f64>,
}

struct SessionState {
    settings: OverlaySettings,
    cache: BoundsCache,
    density: DensityController,
    emitter: UiEmitter,

    status_text: String,
    status_level: StatusLevel,
    forecast_text: String,
    last_error: Option<String>,
    last_error_daily_limit: bool,

    last_derived: Option<DerivedSet>,
    last_derived_mode: Option<GeoMode>,
    last_fetched_key: Option<String>,
    area_dirty: bool,

    active_request_key: Option<String>,
    active_cancel: Option<CancellationToken>,
    generation: u64,
    debounce_nonce: u64,

    frame: Option<PixelSurface>,
    listeners: Vec<UnboundedSender<UiState>>,
}

impl SessionState {
    fn new(config: &OverlayConfig) -> Self {
        Self {
            settings: OverlaySettings::default(),
            cache: BoundsCache::new(config.cache.clone()),
            density: DensityController::new(config.density.clone()),
            emitter: UiEmitter::new(),
            status_text: STATUS_OFF.to_string(),
            status_level: StatusLevel::Off,
            forecast_text: forecast_readout(None),
            last_error: None,
            last_error_daily_limit: false,
            last_derived: None,
            last_derived_mode: None,
            last_fetched_key: None,
            area_dirty: false,
            active_request_key: None,
            active_cancel: None,
            generation: 0,
            debounce_nonce: 0,
            frame: None,
            listeners: Vec::new(),
        }
    }

    fn ui_state(&mut self) -> UiState {
        let requested = self.settings.density_level;
        let effective = self.density.effective_level(requested);
        UiState {
            enabled: self.settings.enabled,
            status_text: self.status_text.clone(),
            status_level: self.status_level,
            forecast_text: self.forecast_text.clone(),
            offset_hours: self.settings.offset_hours,
            density_level: requested,
            effective_density_level: effective,
            last_error: self.last_error.clone(),
        }
    }

    fn emit(&mut self) {
        let state = self.ui_state();
        if let Some(changed) = self.emitter.push(&state) {
            self.listeners
                .retain(|listener| listener.send(changed.clone()).is_ok());
        }
    }

    fn set_status(&mut self, text: &str, level: StatusLevel) {
        if self.status_text != text || self.status_level != level {
            self.status_text = text.to_string();
            self.status_level = level;
        }
        self.emit();
    }

    fn set_forecast(&mut self, time: Option<chrono::DateTime<Utc>>) {
        self.forecast_text = forecast_readout(time);
        self.emit();
    }

    fn record_error(&mut self, error: &FetchError) {
        self.last_error = Some(error.to_string());
        self.last_error_daily_limit = error.is_daily_limit();
    }

    fn clear_frame(&mut self) {
        self.frame = None;
    }

    fn draw(&mut self, context: &GeoContext, vectors: &[wind_common::WindVector]) {
        let mut surface = PixelSurface::new(context.width as usize, context.height as usize);
        draw_vectors(&mut surface, vectors, context);
        self.frame = Some(surface);
    }

    fn clear_latest_derived(&mut self) {
        self.last_derived = None;
        self.last_derived_mode = None;
    }

    fn remember_derived(&mut self, derived: DerivedSet, mode: GeoMode) {
        self.last_derived = Some(derived);
        self.last_derived_mode = Some(mode);
    }

    fn has_derived(&self) -> bool {
        self.last_derived
            .as_ref()
            .is_some_and(|derived| !derived.vectors.is_empty())
    }

    /// Dirty means the live area key no longer matches the last
    /// fetched one.
    fn sync_area_dirty(&mut self, context: &GeoContext) {
        if !self.settings.enabled {
            self.area_dirty = false;
            return;
        }
        if let Some(last) = &self.last_fetched_key {
            self.area_dirty = context.area_key() != *last;
        }
    }

    fn cancel_active_fetch(&mut self) {
        if let Some(token) = self.active_cancel.take() {
            token.cancel();
        }
        self.active_request_key = None;
    }

    fn apply_disabled(&mut self) {
        self.cancel_active_fetch();
        self.clear_latest_derived();
        self.clear_frame();
        self.forecast_text = forecast_readout(None);
        self.area_dirty = false;
        self.set_status(STATUS_OFF, StatusLevel::Off);
    }

    fn active_status(&mut self, context: &GeoContext) {
        if context.mode == GeoMode::Derived && context.tilt.request_3d {
            self.set_status(STATUS_APPROX_3D, StatusLevel::Warn);
        } else {
            self.set_status(STATUS_ACTIVE, StatusLevel::Ok);
        }
    }
}

struct SessionInner {
    config: OverlayConfig,
    viewport: Arc<dyn ViewportSource>,
    client: OpenMeteoClient,
    state: Mutex<SessionState>,
}

/// Handle to one overlay session; cheap to clone.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub fn new(
        config: OverlayConfig,
        viewport: Arc<dyn ViewportSource>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let governor = Arc::new(RateGovernor::new(Duration::from_millis(
            config.fetch.min_fetch_interval_ms,
        )));
        let client = OpenMeteoClient::new(config.fetch.clone(), transport, governor);
        let state = SessionState::new(&config);
        Self {
            inner: Arc::new(SessionInner {
                config,
                viewport,
                client,
                state: Mutex::new(state),
            }),
        }
    }

    /// Receive every UI-state change. Emission is de-duplicated by
    /// serialized content.
    pub async fn subscribe(&self) -> UnboundedReceiver<UiState> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.inner.state.lock().await;
        state.listeners.push(tx);
        rx
    }

    pub async fn settings(&self) -> OverlaySettings {
        self.inner.state.lock().await.settings
    }

    pub async fn ui_state(&self) -> UiState {
        self.inner.state.lock().await.ui_state()
    }

    /// Encode the most recently rendered frame as a PNG.
    pub async fn frame_png(&self) -> Option<Vec<u8>> {
        let state = self.inner.state.lock().await;
        let surface = state.frame.as_ref()?;
        match create_png(surface.pixels(), surface.width(), surface.height()) {
            Ok(png) => Some(png),
            Err(error) => {
                warn!(%error, "failed to encode overlay frame");
                None
            }
        }
    }

    /// Apply a settings patch, then act on the transition: disabling
    /// tears the overlay down, enabling triggers an immediate
    /// refresh, and offset/density changes re-derive from cache
    /// without touching the network.
    pub async fn apply_settings(&self, patch: SettingsPatch) {
        let action = {
            let mut state = self.inner.state.lock().await;
            let previous = state.settings;
            let next = OverlaySettings::normalized(
                patch.enabled.unwrap_or(previous.enabled),
                patch
                    .offset_hours
                    .unwrap_or(previous.offset_hours as f64),
                patch
                    .density_level
                    .unwrap_or(previous.density_level as f64),
            );
            state.settings = next;
            debug!(?next, "applied settings");
            state.emit();

            if next == previous {
                None
            } else if !next.enabled {
                state.apply_disabled();
                None
            } else if !previous.enabled {
                state.area_dirty = false;
                state.set_status(STATUS_INITIALIZING, StatusLevel::Loading);
                Some(RefreshOptions {
                    immediate: true,
                    ..RefreshOptions::default()
                })
            } else {
                Some(RefreshOptions::cache_only())
            }
        };

        if let Some(options) = action {
            self.refresh(options).await;
        }
    }

    /// Schedule a refresh. Non-immediate requests wait out the
    /// debounce window and are superseded by any newer request.
    pub async fn request_refresh(&self, options: RefreshOptions) {
        let nonce = {
            let mut state = self.inner.state.lock().await;
            state.debounce_nonce += 1;
            state.debounce_nonce
        };

        if options.immediate {
            self.refresh(options).await;
            return;
        }

        let session = self.clone();
        let delay = Duration::from_millis(self.inner.config.refresh_debounce_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let superseded = {
                let state = session.inner.state.lock().await;
                state.debounce_nonce != nonce
            };
            if !superseded {
                session.refresh(options).await;
            }
        });
    }

    /// Run one refresh cycle to completion. Never returns an error;
    /// failures surface through status and `last_error`.
    pub async fn refresh(&self, options: RefreshOptions) {
        let prepared = {
            let mut state = self.inner.state.lock().await;

            if !state.settings.enabled {
                state.apply_disabled();
                return;
            }

            let Some(context) = self.inner.viewport.resolve() else {
                state.clear_frame();
                state.set_forecast(None);
                state.set_status(STATUS_WAITING, StatusLevel::Loading);
                return;
            };

            let key = context.area_key();
            let now = Instant::now();
            let cached_fresh_for_manual = state
                .cache
                .get(&key)
                .is_some_and(|entry| {
                    entry.fresh_for_manual_refresh(now, self.inner.config_cache())
                });
            let can_use_cache = state.cache.get(&key).is_some()
                && options.allow_cache
                && !options.force_network
                && (!options.manual || cached_fresh_for_manual);

            if !can_use_cache && !options.allow_network {
                state.area_dirty = true;
                if state.has_derived() {
                    self.redraw_remembered(&mut state, &context);
                } else {
                    state.clear_frame();
                    state.set_forecast(None);
                }
                state.set_status(STATUS_MOVED, StatusLevel::Warn);
                debug!(key, "skipped network refresh");
                return;
            }

            if can_use_cache {
                self.finish_with_entry(&mut state, &context, &key);
                return;
            }

            // A fetch for this exact area is already running.
            if state.active_cancel.is_some() && state.active_request_key.as_deref() == Some(&key)
            {
                let text = if options.manual {
                    STATUS_REFRESHING
                } else {
                    STATUS_LOADING
                };
                state.set_status(text, StatusLevel::Loading);
                return;
            }

            state.cancel_active_fetch();

            let token = CancellationToken::new();
            state.active_cancel = Some(token.clone());
            state.active_request_key = Some(key.clone());
            state.generation += 1;
            let generation = state.generation;

            let text = if options.manual {
                STATUS_REFRESHING
            } else {
                STATUS_LOADING
            };
            state.set_status(text, StatusLevel::Loading);

            let fetch_grid = state.density.fetch_grid();
            let samples = build_sample_points(&context.bounds, fetch_grid.rows, fetch_grid.cols);
            info!(
                key,
                mode = %context.mode,
                rows = fetch_grid.rows,
                cols = fetch_grid.cols,
                "fetching wind data"
            );
            (context, key, token, generation, fetch_grid, samples)
        };

        let (context, key, token, generation, fetch_grid, samples) = prepared;
        let outcome = self.inner.client.fetch_series(&samples, &token).await;

        let mut state = self.inner.state.lock().await;
        if state.generation != generation {
            // Superseded while in flight; the newer cycle owns the
            // session now.
            return;
        }
        // No newer fetch started, so any active marker is ours.
        state.active_cancel = None;
        state.active_request_key = None;

        if !state.settings.enabled || token.is_cancelled() {
            return;
        }

        match outcome {
            Ok(series) => {
                let entry = CacheEntry {
                    key: key.clone(),
                    mode: context.mode,
                    bounds: context.bounds,
                    grid: fetch_grid,
                    samples,
                    series,
                    fetched_at: Instant::now(),
                };
                state.cache.put(entry);
                self.finish_with_entry(&mut state, &context, &key);
            }
            Err(FetchError::Aborted) => {}
            Err(error) => self.handle_fetch_failure(&mut state, &context, &key, error),
        }
    }

    /// Passive status resync after a viewport event that needs no
    /// data work, e.g. pan/zoom while data is current.
    pub async fn sync_view_state(&self) {
        let mut state = self.inner.state.lock().await;

        if !state.settings.enabled {
            state.clear_latest_derived();
            state.clear_frame();
            state.forecast_text = forecast_readout(None);
            state.area_dirty = false;
            state.set_status(STATUS_OFF, StatusLevel::Off);
            return;
        }

        let Some(context) = self.inner.viewport.resolve() else {
            if state.active_cancel.is_none() {
                state.set_status(STATUS_WAITING, StatusLevel::Loading);
            }
            return;
        };
        state.sync_area_dirty(&context);

        let has_derived = state.has_derived();
        if has_derived {
            self.redraw_remembered(&mut state, &context);
        }

        if state.active_cancel.is_some() {
            state.set_status(STATUS_REFRESHING, StatusLevel::Loading);
            return;
        }

        if !has_derived && state.last_error_daily_limit {
            state.set_status(STATUS_DAILY_ERROR, StatusLevel::Error);
            return;
        }

        if state.area_dirty {
            state.set_status(STATUS_MOVED, StatusLevel::Warn);
            return;
        }

        if has_derived {
            state.active_status(&context);
            return;
        }

        if state.last_fetched_key.is_none() {
            state.set_status(STATUS_PROMPT, StatusLevel::Idle);
            return;
        }

        state.set_status(STATUS_MOVED, StatusLevel::Warn);
    }

    /// Redraw the remembered vectors against the current viewport
    /// without touching cache or network. For high-frequency
    /// viewport events.
    pub async fn redraw_from_latest(&self) {
        let mut state = self.inner.state.lock().await;
        if !state.settings.enabled || !state.has_derived() {
            return;
        }
        let Some(context) = self.inner.viewport.resolve() else {
            return;
        };

        state.sync_area_dirty(&context);
        self.redraw_remembered(&mut state, &context);
        if state.active_cancel.is_some() {
            state.set_status(STATUS_REFRESHING, StatusLevel::Loading);
            return;
        }
        if state.area_dirty {
            state.set_status(STATUS_MOVED, StatusLevel::Warn);
            return;
        }
        state.active_status(&context);
    }

    fn redraw_remembered(&self, state: &mut SessionState, context: &GeoContext) {
        if let Some(derived) = state.last_derived.clone() {
            state.draw(context, &derived.vectors);
            state.set_forecast(derived.forecast_time);
        }
    }

    /// Derive, draw, and settle bookkeeping from a cache entry that
    /// matches `key`. Runs for both cache hits and fresh fetches.
    fn finish_with_entry(&self, state: &mut SessionState, context: &GeoContext, key: &str) {
        let Some(entry) = state.cache.get(key).cloned() else {
            return;
        };

        let offset_hours = state.settings.offset_hours;
        let requested = state.settings.density_level;
        let effective = state.density.effective_level(requested);
        let target_grid = state.density.grid_for_level(effective);
        let derived = derive_at_offset(&entry, offset_hours, target_grid, Utc::now());

        // The viewport may have moved while the fetch was in flight;
        // draw against the freshest geometry available.
        let draw_context = self.inner.viewport.resolve().unwrap_or_else(|| context.clone());
        state.remember_derived(derived.clone(), draw_context.mode);
        state.draw(&draw_context, &derived.vectors);
        state.set_forecast(derived.forecast_time);

        state.last_fetched_key = Some(key.to_string());
        state.area_dirty = draw_context.area_key() != key;

        if state.area_dirty {
            state.set_status(STATUS_MOVED, StatusLevel::Warn);
        } else {
            state.active_status(&draw_context);
        }
        state.last_error = None;
        state.last_error_daily_limit = false;
        state.emit();
        debug!(key, "refresh complete");
    }

    /// Failure ladder: register a rate-limit cap, then best-stale
    /// cache, then the remembered vectors, then a cleared overlay
    /// with an error status.
    fn handle_fetch_failure(
        &self,
        state: &mut SessionState,
        context: &GeoContext,
        key: &str,
        error: FetchError,
    ) {
        warn!(%error, key, "wind fetch failed");
        let rate_limited = error.is_rate_limited() || error.is_daily_limit();
        if rate_limited {
            let requested = state.settings.density_level;
            state.density.register_rate_limit(requested);
        }

        let now = Instant::now();
        if let Some(stale) = state.cache.best_stale(context.mode, now).cloned() {
            let text = if error.is_daily_limit() {
                STATUS_DAILY_STALE
            } else if error.is_rate_limited() {
                STATUS_RATE_STALE
            } else {
                STATUS_GENERIC_STALE
            };
            state.set_status(text, StatusLevel::Warn);

            let offset_hours = state.settings.offset_hours;
            let requested = state.settings.density_level;
            let effective = state.density.effective_level(requested);
            let target_grid = state.density.grid_for_level(effective);
            let derived = derive_at_offset(&stale, offset_hours, target_grid, Utc::now());

            let draw_context = self.inner.viewport.resolve().unwrap_or_else(|| context.clone());
            state.remember_derived(derived.clone(), draw_context.mode);
            state.draw(&draw_context, &derived.vectors);
            state.set_forecast(derived.forecast_time);

            if stale.key == key {
                state.last_fetched_key = Some(key.to_string());
                state.area_dirty = false;
            } else {
                state.area_dirty = true;
            }
            state.record_error(&error);
            state.emit();
            return;
        }

        state.clear_frame();
        if rate_limited && state.has_derived() {
            self.redraw_remembered(state, context);
            let text = if error.is_daily_limit() {
                STATUS_DAILY_KEEP
            } else {
                STATUS_RATE_KEEP
            };
            state.set_status(text, StatusLevel::Warn);
            state.area_dirty = true;
            state.record_error(&error);
            state.emit();
            return;
        }

        state.clear_latest_derived();
        let text = if error.is_daily_limit() {
            STATUS_DAILY_ERROR
        } else if error.is_rate_limited() {
            STATUS_RATE_ERROR
        } else {
            STATUS_FETCH_ERROR
        };
        state.set_status(text, StatusLevel::Error);
        state.area_dirty = true;
        state.record_error(&error);
        state.emit();
    }
}

impl SessionInner {
    fn config_cache(&self) -> &wind_cache::CacheConfig {
        &self.config.cache
    }
}
