pub mod lanes;
pub mod window;

pub use lanes::{stack_row, PlacedEffect, StackedRow};
pub use window::RowOffsets;

use crate::index::TrackIndex;
use crate::model::{FixtureId, Show};
use crate::selection::EffectKey;

/// Height of one effect lane within a fixture row, in pixels.
pub const LANE_HEIGHT: f64 = 28.0;
/// Vertical padding above and below the lanes of a row.
pub const ROW_PADDING: f64 = 4.0;
/// Rows never collapse below this height, even with no effects.
pub const MIN_ROW_HEIGHT: f64 = 40.0;
/// Extra rows rendered above and below the viewport.
pub const OVERSCAN_ROWS: usize = 5;

/// One full layout computation: every fixture row stacked into lanes, plus
/// the cumulative row offsets the windower and hit-testing read.
///
/// Purely derived from a show snapshot. Rebuilt after every committed edit
/// or show refresh and discarded; nothing in here is identity that survives
/// a rebuild.
#[derive(Debug, Clone, Default)]
pub struct LayoutPass {
    rows: Vec<StackedRow>,
    offsets: RowOffsets,
}

impl LayoutPass {
    /// Lay out every fixture row for the given sequence. A missing sequence
    /// index yields an empty pass (nothing to render), not an error.
    pub fn build(show: &Show, sequence_index: usize) -> Self {
        let Some(sequence) = show.sequence(sequence_index) else {
            return Self::default();
        };

        let index = TrackIndex::build(show, sequence);
        let rows: Vec<StackedRow> = show
            .fixtures
            .iter()
            .map(|fixture| stack_row(fixture.id, index.tracks_for(fixture.id), sequence))
            .collect();
        let offsets = RowOffsets::from_heights(rows.iter().map(|r| r.row_height));

        Self { rows, offsets }
    }

    pub fn rows(&self) -> &[StackedRow] {
        self.rows.as_slice()
    }

    pub fn offsets(&self) -> &RowOffsets {
        &self.offsets
    }

    pub fn row(&self, index: usize) -> Option<&StackedRow> {
        self.rows.get(index)
    }

    /// Row index of a fixture, following show fixture order.
    pub fn row_index_of(&self, fixture: FixtureId) -> Option<usize> {
        self.rows.iter().position(|r| r.fixture_id == fixture)
    }

    /// Fixture shown at the given row index.
    pub fn fixture_at_row(&self, row: usize) -> Option<FixtureId> {
        self.rows.get(row).map(|r| r.fixture_id)
    }

    /// The fixture row containing content-space `y`, clamped to the nearest
    /// boundary row.
    pub fn row_at_y(&self, y: f64) -> Option<usize> {
        self.offsets.row_at_y(y)
    }

    /// Locate a placed effect by key, along with its row index. Keys are
    /// positional, so this returns `None` after any structural edit until
    /// the pass is rebuilt.
    pub fn find(&self, key: EffectKey) -> Option<(usize, &PlacedEffect)> {
        self.rows.iter().enumerate().find_map(|(row_index, row)| {
            row.effects
                .iter()
                .find(|e| e.key == key)
                .map(|e| (row_index, e))
        })
    }

    /// The effect under a content-space point, if any. `t` is the time at
    /// the pointer's x position. Pointing at row padding between lanes
    /// misses.
    pub fn effect_at(&self, t: f64, y: f64) -> Option<&PlacedEffect> {
        let row_index = self.offsets.row_at_y(y)?;
        let (top, _) = self.offsets.span(row_index)?;
        let row = self.rows.get(row_index)?;

        let local = y - top - ROW_PADDING;
        if local < 0.0 {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let lane = (local / LANE_HEIGHT) as usize;
        if lane >= row.lane_count {
            return None;
        }

        row.effects
            .iter()
            .find(|e| e.lane == lane && t >= e.start_sec && t < e.start_sec + e.duration_sec)
    }

    /// Keys of all effects inside a marquee rectangle: every effect whose
    /// row intersects `[y0, y1]` and whose time range overlaps `[t0, t1]`.
    /// Rows are matched whole; lane position within the row is irrelevant.
    pub fn keys_in_rect(&self, t0: f64, t1: f64, y0: f64, y1: f64) -> Vec<EffectKey> {
        let (t0, t1) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        let (y0, y1) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };

        let mut keys = Vec::new();
        for (index, row) in self.rows.iter().enumerate() {
            let Some((top, bottom)) = self.offsets.span(index) else {
                continue;
            };
            if bottom <= y0 || top > y1 {
                continue;
            }
            for effect in &row.effects {
                if effect.start_sec < t1 && t0 < effect.start_sec + effect.duration_sec {
                    keys.push(effect.key);
                }
            }
        }
        keys
    }
}
