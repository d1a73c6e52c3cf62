use serde::Serialize;
use ts_rs::TS;

use super::{LANE_HEIGHT, MIN_ROW_HEIGHT, ROW_PADDING};
use crate::model::{FixtureId, Sequence};
use crate::selection::EffectKey;

/// One effect placed in a fixture row: source indices plus the lane the
/// packing algorithm assigned. Derived per layout pass; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct PlacedEffect {
    #[ts(type = "string")]
    pub key: EffectKey,
    pub track_index: usize,
    pub effect_index: usize,
    pub start_sec: f64,
    pub duration_sec: f64,
    pub lane: usize,
}

/// A fixture row with its effects packed into stacked lanes.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct StackedRow {
    pub fixture_id: FixtureId,
    pub effects: Vec<PlacedEffect>,
    pub lane_count: usize,
    pub row_height: f64,
}

/// Pack one fixture's effects into the minimum number of stacked lanes.
///
/// Effects from all contributing tracks are flattened, stable-sorted by
/// start time (ties keep track order, then effect order), and assigned
/// greedily: the first lane whose last effect has ended by this effect's
/// start, or a new lane. With the earliest-start ordering this first-fit
/// scan is lane-count-optimal for interval graphs; a best-fit heuristic is
/// NOT equivalent and can inflate the lane count (and with it the row
/// height and total scroll extent).
#[allow(clippy::cast_precision_loss)]
pub fn stack_row(
    fixture_id: FixtureId,
    track_indices: &[usize],
    sequence: &Sequence,
) -> StackedRow {
    let mut effects: Vec<PlacedEffect> = Vec::new();
    for &track_index in track_indices {
        let Some(track) = sequence.tracks.get(track_index) else {
            continue;
        };
        for (effect_index, effect) in track.effects.iter().enumerate() {
            // Clamp display bounds to the sequence; skip anything that ends
            // up outside it entirely.
            let start = effect.time_range.start().clamp(0.0, sequence.duration);
            let end = effect.time_range.end().clamp(0.0, sequence.duration);
            if end <= start {
                continue;
            }
            effects.push(PlacedEffect {
                key: EffectKey::new(track_index, effect_index),
                track_index,
                effect_index,
                start_sec: start,
                duration_sec: end - start,
                lane: 0,
            });
        }
    }

    // Stable sort: equal starts keep encounter order for deterministic output.
    effects.sort_by(|a, b| {
        a.start_sec
            .partial_cmp(&b.start_sec)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut lane_ends: Vec<f64> = Vec::new();
    for effect in &mut effects {
        let end = effect.start_sec + effect.duration_sec;
        match lane_ends
            .iter()
            .position(|&lane_end| lane_end <= effect.start_sec)
        {
            Some(lane) => {
                effect.lane = lane;
                if let Some(slot) = lane_ends.get_mut(lane) {
                    *slot = end;
                }
            }
            None => {
                effect.lane = lane_ends.len();
                lane_ends.push(end);
            }
        }
    }

    let lane_count = lane_ends.len();
    let row_height =
        (lane_count as f64 * LANE_HEIGHT + 2.0 * ROW_PADDING).max(MIN_ROW_HEIGHT);

    StackedRow {
        fixture_id,
        effects,
        lane_count,
        row_height,
    }
}
