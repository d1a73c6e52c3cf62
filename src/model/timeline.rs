use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use super::color::Color;
use super::fixture::EffectTarget;

/// A time range within a sequence. Start must be < end, both in seconds.
/// Constructed via `TimeRange::new` which enforces this invariant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS)]
#[serde(try_from = "TimeRangeRaw")]
#[ts(export)]
pub struct TimeRange {
    start: f64,
    end: f64,
}

#[derive(Deserialize)]
struct TimeRangeRaw {
    start: f64,
    end: f64,
}

impl TryFrom<TimeRangeRaw> for TimeRange {
    type Error = String;
    fn try_from(raw: TimeRangeRaw) -> Result<Self, String> {
        TimeRange::new(raw.start, raw.end)
            .ok_or_else(|| format!("Invalid TimeRange: start={}, end={}", raw.start, raw.end))
    }
}

impl TimeRange {
    /// Create a time range. Returns None if start >= end or either is negative.
    pub fn new(start: f64, end: f64) -> Option<Self> {
        if start >= 0.0 && end > start {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Returns true if the given time falls within this range (inclusive start, exclusive end).
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }

    /// Returns true if this range and `[start, end)` share any time.
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.start < end && start < self.end
    }
}

/// How multiple effect layers combine their output. Blending itself happens
/// in the show engine; the timeline only carries and displays the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum BlendMode {
    /// Top layer fully replaces the layer below.
    Override,
    /// Additive blend (clamped at 255 per channel).
    Add,
    /// Multiplicative blend.
    Multiply,
    /// Per-channel maximum.
    Max,
    /// Alpha composite (foreground over background).
    Alpha,
}

/// Effect parameter keys surfaced in the timeline's detail panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ParamKey {
    Color,
    Speed,
    PulseWidth,
    BackgroundLevel,
    Reverse,
    Spread,
    Saturation,
    Brightness,
    Rate,
    Density,
    Offset,
    Direction,
}

/// Type-safe parameter values for effects.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ParamValue {
    Float(f64),
    Int(i32),
    Bool(bool),
    Color(Color),
    Text(String),
}

impl ParamValue {
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            ParamValue::Color(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// Named, typed parameters for an effect instance.
/// Serializes as a flat JSON object (transparent over the inner HashMap).
#[derive(Debug, Clone, Serialize, Deserialize, Default, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct EffectParams(HashMap<ParamKey, ParamValue>);

impl EffectParams {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn set(mut self, key: ParamKey, value: ParamValue) -> Self {
        self.0.insert(key, value);
        self
    }

    pub fn get(&self, key: ParamKey) -> Option<&ParamValue> {
        self.0.get(&key)
    }

    /// Get a float param with a default fallback.
    pub fn float_or(&self, key: ParamKey, default: f64) -> f64 {
        self.get(key).and_then(|v| v.as_float()).unwrap_or(default)
    }

    /// Get a color param with a default fallback.
    pub fn color_or(&self, key: ParamKey, default: Color) -> Color {
        self.get(key).and_then(|v| v.as_color()).unwrap_or(default)
    }

    /// Get a bool param with a default fallback.
    pub fn bool_or(&self, key: ParamKey, default: bool) -> bool {
        self.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
    }
}

/// Which built-in effect type an instance uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum EffectKind {
    Solid,
    Chase,
    Rainbow,
    Strobe,
    Gradient,
    Twinkle,
    Fade,
    Wipe,
}

/// A placed effect on the timeline. Fully describes what happens, when, and to what.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EffectInstance {
    pub kind: EffectKind,
    pub params: EffectParams,
    pub time_range: TimeRange,
    pub blend_mode: BlendMode,
    /// Opacity multiplier (0.0 = transparent, 1.0 = fully opaque).
    pub opacity: f64,
}

/// A track targets a set of fixtures and contains a list of effect instances.
/// Tracks are layered bottom-to-top; blend mode lives on each EffectInstance.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Track {
    pub name: String,
    pub target: EffectTarget,
    pub effects: Vec<EffectInstance>,
}

/// A sequence is the top-level timeline container. One sequence per song/show.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sequence {
    pub name: String,
    /// Duration in seconds.
    pub duration: f64,
    /// Target frames per second for evaluation.
    pub frame_rate: f64,
    /// Audio file path, if any.
    pub audio_file: Option<String>,
    /// Tracks layered bottom (index 0) to top.
    pub tracks: Vec<Track>,
}

#[cfg(test)]
#[allow(clippy::float_cmp, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn time_range_rejects_inverted() {
        assert!(TimeRange::new(2.0, 1.0).is_none());
        assert!(TimeRange::new(1.0, 1.0).is_none());
        assert!(TimeRange::new(-0.5, 1.0).is_none());
    }

    #[test]
    fn time_range_contains_is_half_open() {
        let r = TimeRange::new(1.0, 3.0).unwrap();
        assert!(r.contains(1.0));
        assert!(r.contains(2.9));
        assert!(!r.contains(3.0));
    }

    #[test]
    fn overlap_excludes_touching_ranges() {
        let r = TimeRange::new(1.0, 3.0).unwrap();
        assert!(r.overlaps(2.0, 4.0));
        assert!(r.overlaps(0.0, 1.5));
        // Touching end-to-start is not an overlap.
        assert!(!r.overlaps(3.0, 5.0));
        assert!(!r.overlaps(0.0, 1.0));
    }

    #[test]
    fn params_typed_accessors() {
        let params = EffectParams::new()
            .set(ParamKey::Speed, ParamValue::Float(2.0))
            .set(ParamKey::Reverse, ParamValue::Bool(true));
        assert_eq!(params.float_or(ParamKey::Speed, 1.0), 2.0);
        assert!(params.bool_or(ParamKey::Reverse, false));
        assert_eq!(params.float_or(ParamKey::Rate, 5.0), 5.0);
        let p = EffectParams::new().set(ParamKey::Density, ParamValue::Int(3));
        assert_eq!(p.float_or(ParamKey::Density, 0.0), 3.0);
    }
}
