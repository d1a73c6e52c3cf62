use std::sync::Arc;
use std::time::Instant;

use crate::commits::{CommitDriver, CommitOutcome, CommitRequest};
use crate::error::TimelineError;
use crate::gesture::{
    GestureCtx, GestureEngine, GestureOutcome, HitTarget, Modifiers, Point, ToolMode,
    MIN_EFFECT_DURATION,
};
use crate::host::{AudioTransport, EffectDetail, PlaybackInfo, ShowHost, Thumbnail};
use crate::layout::LayoutPass;
use crate::model::{EffectKind, Show};
use crate::playback::ClockArbiter;
use crate::selection::{EffectKey, Selection};
use crate::thumbs::{ThumbKey, ThumbnailCache};
use crate::viewport::Viewport;

/// Composes the timeline: one show snapshot, the layout pass derived from
/// it, the viewport, the gesture engine, the playback arbiter, and the
/// thumbnail cache. Owns all cross-frame state explicitly, so correctness
/// never depends on how often the embedding view function runs.
pub struct TimelineController {
    host: Arc<dyn ShowHost>,
    driver: CommitDriver,
    show: Show,
    sequence_index: usize,
    pass: LayoutPass,
    viewport: Viewport,
    gestures: GestureEngine,
    arbiter: ClockArbiter,
    thumbnails: ThumbnailCache,
    playback: PlaybackInfo,
    mode: ToolMode,
}

impl TimelineController {
    pub fn new(host: Arc<dyn ShowHost>) -> Self {
        Self {
            driver: CommitDriver::new(Arc::clone(&host)),
            host,
            show: Show::empty(),
            sequence_index: 0,
            pass: LayoutPass::default(),
            viewport: Viewport::new(0.0),
            gestures: GestureEngine::new(),
            arbiter: ClockArbiter::new(),
            thumbnails: ThumbnailCache::with_defaults(),
            playback: PlaybackInfo {
                playing: false,
                current_time: 0.0,
                duration: 0.0,
                sequence_index: 0,
                region: None,
                looping: false,
            },
            mode: ToolMode::Select,
        }
    }

    // ── Snapshot & layout ───────────────────────────────────────────

    /// Re-fetch the show and playback state and rebuild the layout pass.
    /// Called at startup and after every committed edit; also invalidates
    /// any commit still in flight for the previous snapshot.
    pub async fn refresh(&mut self) -> Result<(), TimelineError> {
        self.driver.invalidate();
        self.show = self.host.get_show().await?;
        self.refresh_playback().await?;
        self.pass = LayoutPass::build(&self.show, self.sequence_index);
        Ok(())
    }

    /// Re-fetch playback state only (transport ops don't change layout).
    pub async fn refresh_playback(&mut self) -> Result<(), TimelineError> {
        self.playback = self.host.get_playback().await?;
        self.sequence_index = self.playback.sequence_index;
        self.viewport.set_duration(self.playback.duration);
        self.arbiter.sync(&self.playback);
        Ok(())
    }

    pub fn show(&self) -> &Show {
        &self.show
    }

    pub fn pass(&self) -> &LayoutPass {
        &self.pass
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn playback(&self) -> &PlaybackInfo {
        &self.playback
    }

    pub fn selection(&self) -> &Selection {
        self.gestures.selection()
    }

    pub fn tool_mode(&self) -> ToolMode {
        self.mode
    }

    pub fn set_tool_mode(&mut self, mode: ToolMode) {
        self.mode = mode;
    }

    // ── Pointer events ──────────────────────────────────────────────

    /// Forward a pointer-down. Returns whether a gesture actually started.
    pub fn pointer_down(&mut self, hit: HitTarget, pos: Point, mods: Modifiers) -> bool {
        let ctx = GestureCtx {
            pass: &self.pass,
            viewport: &self.viewport,
        };
        let started = self.gestures.pointer_down(hit, pos, mods, self.mode, ctx);
        if started {
            // A new gesture owns the context now; anything still pending
            // for the previous one must not apply.
            self.driver.invalidate();
        }
        started
    }

    pub fn pointer_move(&mut self, pos: Point) {
        let ctx = GestureCtx {
            pass: &self.pass,
            viewport: &self.viewport,
        };
        self.gestures.pointer_move(pos, ctx);
    }

    /// Finish the active gesture and run its commit, if any. On an edit
    /// commit the show is re-fetched and the layout rebuilt, and the
    /// selection is re-derived from the commit result (indices shift).
    pub async fn pointer_up(&mut self, pos: Point) -> Result<(), TimelineError> {
        let ctx = GestureCtx {
            pass: &self.pass,
            viewport: &self.viewport,
        };
        match self.gestures.pointer_up(pos, ctx) {
            GestureOutcome::None | GestureOutcome::SelectionChanged => Ok(()),
            GestureOutcome::Commit(request) => self.commit(request).await,
        }
    }

    /// Abandon the active gesture (Escape / pointer capture lost). The
    /// optimistic preview disappears; nothing is committed.
    pub fn cancel_gesture(&mut self) {
        self.gestures.cancel();
    }

    async fn commit(&mut self, request: CommitRequest) -> Result<(), TimelineError> {
        let token = self.driver.token();
        match self.driver.execute(token, request, &self.show).await? {
            CommitOutcome::Edited { select } => {
                self.refresh().await?;
                if let Some(key) = select {
                    self.gestures.selection_mut().replace(key);
                }
                Ok(())
            }
            CommitOutcome::Transport => self.refresh_playback().await,
        }
    }

    // ── Toolbar operations ──────────────────────────────────────────

    /// Detail for the effect inspector panel.
    pub async fn effect_detail(&self, key: EffectKey) -> Result<EffectDetail, TimelineError> {
        self.host
            .get_effect_detail(self.sequence_index, key.track, key.effect)
            .await
    }

    /// Place a new effect on a track (palette drop / double-click),
    /// clamped into the sequence before the host ever sees it.
    pub async fn add_effect(
        &mut self,
        track: usize,
        kind: EffectKind,
        start: f64,
        end: f64,
    ) -> Result<(), TimelineError> {
        let duration = self.viewport.duration();
        let start = start.clamp(0.0, (duration - MIN_EFFECT_DURATION).max(0.0));
        let end = end.clamp(start + MIN_EFFECT_DURATION, duration.max(start + MIN_EFFECT_DURATION));
        self.commit(CommitRequest::AddEffect {
            track,
            kind,
            start,
            end,
        })
        .await
    }

    /// Delete every selected effect in one host call.
    pub async fn delete_selected(&mut self) -> Result<(), TimelineError> {
        if self.gestures.selection().is_empty() {
            return Ok(());
        }
        let keys = self.gestures.selection().iter().collect();
        self.gestures.selection_mut().clear();
        self.commit(CommitRequest::DeleteEffects { keys }).await
    }

    pub async fn play(&mut self) -> Result<(), TimelineError> {
        self.host.play().await?;
        self.refresh_playback().await
    }

    pub async fn pause(&mut self) -> Result<(), TimelineError> {
        self.host.pause().await?;
        self.refresh_playback().await
    }

    pub async fn set_looping(&mut self, looping: bool) -> Result<(), TimelineError> {
        self.host.set_looping(looping).await?;
        self.refresh_playback().await
    }

    // ── Per-frame ───────────────────────────────────────────────────

    /// One animation frame: reconcile the audio clock (or software tick)
    /// into the displayed playhead.
    pub async fn on_frame<A: AudioTransport + ?Sized>(
        &mut self,
        now: Instant,
        audio: Option<&A>,
    ) -> Result<(), TimelineError> {
        self.arbiter
            .advance(now, audio, self.host.as_ref(), &self.playback)
            .await
    }

    /// The playhead position to draw this frame.
    pub fn displayed_time(&self) -> f64 {
        self.arbiter.displayed_time()
    }

    pub fn displayed_playing(&self) -> bool {
        self.arbiter.displayed_playing()
    }

    // ── Thumbnails ──────────────────────────────────────────────────

    /// Fetch a thumbnail for a visible effect segment. Callers drop the
    /// future when the segment scrolls away.
    pub async fn thumbnail(
        &self,
        key: ThumbKey,
        time_samples: usize,
        pixel_rows: usize,
    ) -> Result<Option<Arc<Thumbnail>>, TimelineError> {
        self.thumbnails
            .fetch(self.host.as_ref(), key, time_samples, pixel_rows)
            .await
    }
}
