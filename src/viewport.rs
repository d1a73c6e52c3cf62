/// Lower zoom bound: a whole minute fits in ~120px.
pub const MIN_PX_PER_SEC: f64 = 2.0;
/// Upper zoom bound: 0.1s ticks are 40px apart.
pub const MAX_PX_PER_SEC: f64 = 400.0;
/// Multiplicative factor applied by the zoom in/out actions.
pub const ZOOM_STEP: f64 = 1.25;
/// Ideal on-screen spacing between ruler ticks.
pub const RULER_TARGET_PX: f64 = 80.0;

/// Tick spacings that read as "round" times, ascending.
const NICE_STEPS: [f64; 10] = [0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 15.0, 30.0, 60.0];

/// Maps between wall-clock seconds and screen pixels under the current
/// zoom, pan, and ambient visual scale. The single source of truth for
/// where things draw on the time axis.
#[derive(Debug, Clone)]
pub struct Viewport {
    px_per_sec: f64,
    pub scroll_left: f64,
    pub scroll_top: f64,
    /// Measured container size. `None` until the first layout measurement.
    viewport_width: Option<f64>,
    viewport_height: Option<f64>,
    /// CSS transform scale applied by the embedding UI (window zoom).
    visual_scale: f64,
    duration: f64,
}

impl Viewport {
    pub fn new(duration: f64) -> Self {
        Self {
            px_per_sec: 40.0,
            scroll_left: 0.0,
            scroll_top: 0.0,
            viewport_width: None,
            viewport_height: None,
            visual_scale: 1.0,
            duration: duration.max(0.0),
        }
    }

    pub fn px_per_sec(&self) -> f64 {
        self.px_per_sec
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration.max(0.0);
    }

    pub fn viewport_width(&self) -> Option<f64> {
        self.viewport_width
    }

    pub fn viewport_height(&self) -> Option<f64> {
        self.viewport_height
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport_width = (width > 0.0).then_some(width);
        self.viewport_height = (height > 0.0).then_some(height);
    }

    pub fn set_visual_scale(&mut self, scale: f64) {
        if scale > 0.0 {
            self.visual_scale = scale;
        }
    }

    // ── Time ↔ pixel ────────────────────────────────────────────────

    /// Content-space x of a time. Pure linear map; no clamping.
    pub fn time_to_px(&self, t: f64) -> f64 {
        t * self.px_per_sec
    }

    /// Time at a content-space x. Pure inverse of `time_to_px`.
    pub fn px_to_time(&self, x: f64) -> f64 {
        x / self.px_per_sec
    }

    /// Time under a pointer, given the pointer's client x and the
    /// container's client origin. Undoes the ambient visual scale, adds the
    /// horizontal scroll, and clamps into the sequence.
    pub fn time_at_pointer(&self, client_x: f64, origin_x: f64) -> f64 {
        let content_x = (client_x - origin_x) / self.visual_scale + self.scroll_left;
        self.px_to_time(content_x).clamp(0.0, self.duration)
    }

    /// Content-space y under a pointer, given the pointer's client y and
    /// the top of the row area (below any sticky headers).
    pub fn content_y_at_pointer(&self, client_y: f64, origin_y: f64) -> f64 {
        (client_y - origin_y) / self.visual_scale + self.scroll_top
    }

    // ── Zoom ────────────────────────────────────────────────────────

    /// Zoom in one step, keeping the time under `anchor_x` (viewport-local
    /// pixels) stationary on screen.
    pub fn zoom_in(&mut self, anchor_x: f64) {
        self.zoom_about(self.px_per_sec * ZOOM_STEP, anchor_x);
    }

    /// Zoom out one step, anchored like `zoom_in`.
    pub fn zoom_out(&mut self, anchor_x: f64) {
        self.zoom_about(self.px_per_sec / ZOOM_STEP, anchor_x);
    }

    fn zoom_about(&mut self, px_per_sec: f64, anchor_x: f64) {
        let anchor_time = self.px_to_time(self.scroll_left + anchor_x);
        self.px_per_sec = px_per_sec.clamp(MIN_PX_PER_SEC, MAX_PX_PER_SEC);
        self.scroll_left = (self.time_to_px(anchor_time) - anchor_x).max(0.0);
    }

    /// Fit the whole sequence into the measured viewport width. No-op until
    /// the viewport has been measured or while the sequence has no duration.
    pub fn zoom_to_fit(&mut self) {
        let Some(width) = self.viewport_width else {
            return;
        };
        if self.duration <= 0.0 {
            return;
        }
        self.px_per_sec = (width / self.duration).clamp(MIN_PX_PER_SEC, MAX_PX_PER_SEC);
        self.scroll_left = 0.0;
    }

    // ── Ruler ───────────────────────────────────────────────────────

    /// Tick spacing in seconds: the smallest "nice" step that keeps ticks
    /// at least `RULER_TARGET_PX` apart at the current zoom.
    pub fn ruler_step(&self) -> f64 {
        let ideal = RULER_TARGET_PX / self.px_per_sec;
        NICE_STEPS
            .iter()
            .copied()
            .find(|&step| step >= ideal)
            .unwrap_or(60.0)
    }
}
