use indexmap::IndexSet;

use crate::commits::CommitRequest;
use crate::layout::LayoutPass;
use crate::model::FixtureId;
use crate::selection::{EffectKey, Selection};
use crate::viewport::Viewport;

/// Pointer travel below this is a click, not a drag.
pub const DRAG_THRESHOLD_PX: f64 = 3.0;
/// Resizing can never shrink an effect below this duration.
pub const MIN_EFFECT_DURATION: f64 = 0.1;

/// Pointer position in content space: x along the time axis, y down the
/// fixture rows. The viewport has already removed container offset, visual
/// scale, and scroll before events reach the gesture engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modifiers {
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        alt: false,
    };
}

/// Which editing tool is armed. Select is the default arrow tool; Swipe
/// paints selection across everything the pointer touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolMode {
    Select,
    Swipe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeEdge {
    Start,
    End,
}

/// What the embedding UI found under the pointer at pointer-down. Edge
/// handles are only rendered on selected effects, so an `EffectEdge` hit
/// implies the effect was selected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitTarget {
    EffectEdge { key: EffectKey, edge: ResizeEdge },
    EffectBody { key: EffectKey },
    Background,
    Ruler,
}

/// The one active drag. All fields are live-preview state derived from the
/// pointer; the underlying effects are untouched until the commit on
/// pointer-up.
#[derive(Debug, Clone)]
pub enum DragState {
    Resize {
        key: EffectKey,
        edge: ResizeEdge,
        /// Bounds at pointer-down.
        original: (f64, f64),
        grab_time: f64,
        /// Clamped live bounds shown while dragging.
        preview: (f64, f64),
    },
    Move {
        key: EffectKey,
        origin: Point,
        grab_time: f64,
        original_start: f64,
        duration: f64,
        source_fixture: FixtureId,
        shift: bool,
        /// Clamped live start; end is `preview_start + duration`.
        preview_start: f64,
        /// Fixture row currently under the pointer.
        target_fixture: FixtureId,
        last: Point,
    },
    Marquee {
        origin: Point,
        current: Point,
        /// Selection snapshot at pointer-down; shift unions against this.
        base: IndexSet<EffectKey>,
        additive: bool,
    },
    Swipe {
        /// Alt-swipe removes instead of adds.
        removing: bool,
        /// Keys already toggled this gesture; never toggled twice.
        touched: IndexSet<EffectKey>,
        /// The effect under the pointer at pointer-down, for the click fallback.
        pressed: Option<EffectKey>,
        shift: bool,
    },
    Region {
        origin: Point,
        current: Point,
    },
}

/// What a finished gesture asks the embedding to do. Selection updates have
/// already been applied to the engine's own selection by the time this is
/// returned.
#[derive(Debug, Clone)]
pub enum GestureOutcome {
    /// Nothing to do (gesture target vanished, or no-op release).
    None,
    /// Only the selection changed.
    SelectionChanged,
    /// Issue this commit through the driver.
    Commit(CommitRequest),
}

/// Read-only per-pass context for hit-testing and coordinate mapping.
/// Rebuilt data is passed in by reference each event; the engine never
/// holds onto a stale pass.
#[derive(Clone, Copy)]
pub struct GestureCtx<'a> {
    pub pass: &'a LayoutPass,
    pub viewport: &'a Viewport,
}

impl GestureCtx<'_> {
    fn time_at(&self, pos: Point) -> f64 {
        self.viewport
            .px_to_time(pos.x)
            .clamp(0.0, self.viewport.duration())
    }
}

/// Owns the one-active-gesture invariant and the selection. Pointer events
/// flow in; selection changes apply immediately (marquee and swipe are
/// live), and commits come out exactly once, on pointer-up.
#[derive(Debug, Default)]
pub struct GestureEngine {
    drag: Option<DragState>,
    selection: Selection,
}

impl GestureEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drag(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    /// Abandon the active gesture without committing (Escape, unmount,
    /// window blur). The preview simply disappears.
    pub fn cancel(&mut self) {
        self.drag = None;
    }

    /// Begin a gesture. Returns false if one is already active (the prior
    /// pointer-up has not been processed yet) or the hit target no longer
    /// exists; no state changes in either case.
    pub fn pointer_down(
        &mut self,
        hit: HitTarget,
        pos: Point,
        mods: Modifiers,
        mode: ToolMode,
        ctx: GestureCtx<'_>,
    ) -> bool {
        if self.drag.is_some() {
            return false;
        }

        // The ruler is a region/seek surface in every tool mode.
        if matches!(hit, HitTarget::Ruler) {
            self.drag = Some(DragState::Region {
                origin: pos,
                current: pos,
            });
            return true;
        }

        if mode == ToolMode::Swipe {
            let pressed = match hit {
                HitTarget::EffectBody { key } | HitTarget::EffectEdge { key, .. } => Some(key),
                HitTarget::Background => None,
                HitTarget::Ruler => return false,
            };
            self.drag = Some(DragState::Swipe {
                removing: mods.alt,
                touched: IndexSet::new(),
                pressed,
                shift: mods.shift,
            });
            return true;
        }

        match hit {
            HitTarget::EffectEdge { key, edge } => {
                let Some((_, placed)) = ctx.pass.find(key) else {
                    return false;
                };
                let original = (placed.start_sec, placed.start_sec + placed.duration_sec);
                self.drag = Some(DragState::Resize {
                    key,
                    edge,
                    original,
                    grab_time: ctx.time_at(pos),
                    preview: original,
                });
                true
            }
            HitTarget::EffectBody { key } => {
                let Some((row_index, placed)) = ctx.pass.find(key) else {
                    return false;
                };
                let Some(fixture) = ctx.pass.fixture_at_row(row_index) else {
                    return false;
                };
                self.drag = Some(DragState::Move {
                    key,
                    origin: pos,
                    grab_time: ctx.time_at(pos),
                    original_start: placed.start_sec,
                    duration: placed.duration_sec,
                    source_fixture: fixture,
                    shift: mods.shift,
                    preview_start: placed.start_sec,
                    target_fixture: fixture,
                    last: pos,
                });
                true
            }
            HitTarget::Background => {
                self.drag = Some(DragState::Marquee {
                    origin: pos,
                    current: pos,
                    base: self.selection.snapshot(),
                    additive: mods.shift,
                });
                true
            }
            HitTarget::Ruler => false,
        }
    }

    /// Update the live preview. Selection-style gestures (marquee, swipe)
    /// apply their selection immediately; resize/move only recompute their
    /// preview fields.
    pub fn pointer_move(&mut self, pos: Point, ctx: GestureCtx<'_>) {
        let t = ctx.time_at(pos);
        match &mut self.drag {
            None => {}

            Some(DragState::Resize {
                edge,
                original,
                grab_time,
                preview,
                ..
            }) => {
                let delta = t - *grab_time;
                let duration = ctx.viewport.duration();
                match edge {
                    ResizeEdge::Start => {
                        let max_start = original.1 - MIN_EFFECT_DURATION;
                        preview.0 = (original.0 + delta).clamp(0.0, max_start.max(0.0));
                    }
                    ResizeEdge::End => {
                        let min_end = original.0 + MIN_EFFECT_DURATION;
                        preview.1 = (original.1 + delta).clamp(min_end, duration.max(min_end));
                    }
                }
            }

            Some(DragState::Move {
                grab_time,
                original_start,
                duration,
                preview_start,
                target_fixture,
                last,
                ..
            }) => {
                let delta = t - *grab_time;
                let max_start = (ctx.viewport.duration() - *duration).max(0.0);
                *preview_start = (*original_start + delta).clamp(0.0, max_start);
                if let Some(fixture) = ctx
                    .pass
                    .row_at_y(pos.y)
                    .and_then(|row| ctx.pass.fixture_at_row(row))
                {
                    *target_fixture = fixture;
                }
                *last = pos;
            }

            Some(DragState::Marquee {
                origin,
                current,
                base,
                additive,
            }) => {
                *current = pos;
                let t0 = ctx.time_at(*origin);
                let hits = ctx.pass.keys_in_rect(t0, t, origin.y, pos.y);
                if *additive {
                    self.selection
                        .set_all(base.iter().copied().chain(hits));
                } else {
                    self.selection.set_all(hits);
                }
            }

            Some(DragState::Swipe {
                removing, touched, ..
            }) => {
                if let Some(effect) = ctx.pass.effect_at(t, pos.y) {
                    if touched.insert(effect.key) {
                        if *removing {
                            self.selection.remove(effect.key);
                        } else {
                            self.selection.insert(effect.key);
                        }
                    }
                }
            }

            Some(DragState::Region { current, .. }) => {
                *current = pos;
            }
        }
    }

    /// Finish the gesture. Always consumes the drag, so a new gesture can
    /// begin afterwards regardless of outcome.
    pub fn pointer_up(&mut self, pos: Point, ctx: GestureCtx<'_>) -> GestureOutcome {
        let Some(drag) = self.drag.take() else {
            return GestureOutcome::None;
        };

        match drag {
            DragState::Resize { key, preview, .. } => {
                // The effect may have been deleted out from under the drag.
                if ctx.pass.find(key).is_none() {
                    return GestureOutcome::None;
                }
                GestureOutcome::Commit(CommitRequest::UpdateEffectTimeRange {
                    key,
                    start: preview.0,
                    end: preview.1,
                })
            }

            DragState::Move {
                key,
                origin,
                duration,
                source_fixture,
                shift,
                preview_start,
                target_fixture,
                ..
            } => {
                if ctx.pass.find(key).is_none() {
                    return GestureOutcome::None;
                }
                if pos.distance(origin) < DRAG_THRESHOLD_PX {
                    // Click, not drag.
                    if shift {
                        self.selection.toggle(key);
                    } else {
                        self.selection.replace(key);
                    }
                    return GestureOutcome::SelectionChanged;
                }
                let start = preview_start;
                let end = start + duration;
                if target_fixture == source_fixture {
                    GestureOutcome::Commit(CommitRequest::UpdateEffectTimeRange {
                        key,
                        start,
                        end,
                    })
                } else {
                    GestureOutcome::Commit(CommitRequest::MoveEffect {
                        key,
                        dest_fixture: target_fixture,
                        start,
                        end,
                    })
                }
            }

            DragState::Marquee { origin, .. } => {
                if pos.distance(origin) < DRAG_THRESHOLD_PX {
                    // Background click: deselect and move the playhead.
                    self.selection.clear();
                    GestureOutcome::Commit(CommitRequest::Seek {
                        time: ctx.time_at(pos),
                    })
                } else {
                    // Selection is already live.
                    GestureOutcome::SelectionChanged
                }
            }

            DragState::Swipe {
                touched,
                pressed,
                shift,
                ..
            } => {
                if !touched.is_empty() {
                    return GestureOutcome::SelectionChanged;
                }
                // Nothing swiped: behave like a plain click.
                match pressed {
                    Some(key) => {
                        if shift {
                            self.selection.toggle(key);
                        } else {
                            self.selection.replace(key);
                        }
                        GestureOutcome::SelectionChanged
                    }
                    None => {
                        self.selection.clear();
                        GestureOutcome::Commit(CommitRequest::Seek {
                            time: ctx.time_at(pos),
                        })
                    }
                }
            }

            DragState::Region { origin, .. } => {
                let t0 = ctx.time_at(origin);
                let t1 = ctx.time_at(pos);
                if (pos.x - origin.x).abs() >= DRAG_THRESHOLD_PX {
                    GestureOutcome::Commit(CommitRequest::SetRegion {
                        region: Some((t0.min(t1), t0.max(t1))),
                    })
                } else {
                    GestureOutcome::Commit(CommitRequest::ClearRegionAndSeek { time: t1 })
                }
            }
        }
    }
}
