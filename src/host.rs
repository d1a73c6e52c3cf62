use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::TimelineError;
use crate::model::{BlendMode, EffectKind, EffectParams, FixtureId, Show, TimeRange};
use crate::selection::EffectKey;

pub type HostResult<T> = Result<T, TimelineError>;

/// Transport and edit state reported by the show engine. Refreshed after
/// every transport or edit operation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlaybackInfo {
    pub playing: bool,
    pub current_time: f64,
    pub duration: f64,
    pub sequence_index: usize,
    /// Optional playback region (start, end) in seconds.
    pub region: Option<(f64, f64)>,
    /// Whether playback should loop within the region.
    pub looping: bool,
}

/// Returned by `tick`: the engine's virtual clock after advancing by dt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TickUpdate {
    pub current_time: f64,
    pub playing: bool,
}

/// Everything the detail panel shows for one effect.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EffectDetail {
    pub kind: EffectKind,
    pub params: EffectParams,
    pub time_range: TimeRange,
    pub track_name: String,
    pub blend_mode: BlendMode,
    pub opacity: f64,
}

/// A pre-rendered effect preview: RGBA rows, `time_samples` wide.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Thumbnail {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

/// The show-engine collaborator. Every call crosses an async IPC boundary
/// and may fail or arrive late; the core treats each call site as
/// fire-and-observe (optimistic local state, reconciled on response) and
/// never assumes a response will come back for the context that issued it.
pub trait ShowHost: Send + Sync {
    fn get_show(&self) -> BoxFuture<'_, HostResult<Show>>;
    fn get_playback(&self) -> BoxFuture<'_, HostResult<PlaybackInfo>>;
    fn get_effect_detail(
        &self,
        sequence: usize,
        track: usize,
        effect: usize,
    ) -> BoxFuture<'_, HostResult<EffectDetail>>;

    fn play(&self) -> BoxFuture<'_, HostResult<()>>;
    fn pause(&self) -> BoxFuture<'_, HostResult<()>>;
    fn seek(&self, time: f64) -> BoxFuture<'_, HostResult<()>>;
    /// Advance the engine's virtual clock. `None` when the engine is not playing.
    fn tick(&self, dt: f64) -> BoxFuture<'_, HostResult<Option<TickUpdate>>>;
    fn set_region(&self, region: Option<(f64, f64)>) -> BoxFuture<'_, HostResult<()>>;
    fn set_looping(&self, looping: bool) -> BoxFuture<'_, HostResult<()>>;

    /// Create a track targeting a single fixture. Returns the new track index.
    fn add_track(&self, name: String, fixture: FixtureId) -> BoxFuture<'_, HostResult<usize>>;
    /// Returns the new effect's index within the track.
    fn add_effect(
        &self,
        track: usize,
        kind: EffectKind,
        start: f64,
        end: f64,
    ) -> BoxFuture<'_, HostResult<usize>>;
    fn update_effect_time_range(
        &self,
        track: usize,
        effect: usize,
        start: f64,
        end: f64,
    ) -> BoxFuture<'_, HostResult<()>>;
    /// Returns the effect's index within the destination track.
    fn move_effect_to_track(
        &self,
        from_track: usize,
        effect: usize,
        to_track: usize,
    ) -> BoxFuture<'_, HostResult<usize>>;
    fn delete_effects(&self, keys: Vec<EffectKey>) -> BoxFuture<'_, HostResult<()>>;

    fn render_effect_thumbnail(
        &self,
        sequence: usize,
        track: usize,
        effect: usize,
        time_samples: usize,
        pixel_rows: usize,
    ) -> BoxFuture<'_, HostResult<Option<Thumbnail>>>;
}

/// The audio-element-like collaborator. Calls are synchronous and cheap;
/// `current_time` returns `None` until the element has loaded metadata.
pub trait AudioTransport {
    fn ready(&self) -> bool;
    fn playing(&self) -> bool;
    fn current_time(&self) -> Option<f64>;
    fn ended(&self) -> bool;
    fn play(&self);
    fn pause(&self);
    fn seek(&self, time: f64);
}
