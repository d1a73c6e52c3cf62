use std::fmt;
use std::str::FromStr;

use indexmap::IndexSet;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// UI identity of an effect: its `(track, effect)` index pair within the
/// current sequence. Serialized as the string `"track:effect"`.
///
/// This key is NOT stable across structural edits — inserting or deleting
/// effects shifts indices. Callers must re-derive keys from a fresh show
/// snapshot after any committed mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectKey {
    pub track: usize,
    pub effect: usize,
}

impl EffectKey {
    pub const fn new(track: usize, effect: usize) -> Self {
        Self { track, effect }
    }
}

impl fmt::Display for EffectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.track, self.effect)
    }
}

impl FromStr for EffectKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (track, effect) = s
            .split_once(':')
            .ok_or_else(|| format!("Malformed effect key: {s:?}"))?;
        let track = track
            .parse()
            .map_err(|_| format!("Malformed effect key: {s:?}"))?;
        let effect = effect
            .parse()
            .map_err(|_| format!("Malformed effect key: {s:?}"))?;
        Ok(Self { track, effect })
    }
}

impl Serialize for EffectKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EffectKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// The set of currently selected effects. Insertion-ordered so the UI lists
/// selected effects in the order the user picked them.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    keys: IndexSet<EffectKey>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: EffectKey) -> bool {
        self.keys.contains(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = EffectKey> + '_ {
        self.keys.iter().copied()
    }

    /// Replace the whole selection with a single key.
    pub fn replace(&mut self, key: EffectKey) {
        self.keys.clear();
        self.keys.insert(key);
    }

    /// Shift-click behavior: add if absent, remove if present.
    pub fn toggle(&mut self, key: EffectKey) {
        if !self.keys.shift_remove(&key) {
            self.keys.insert(key);
        }
    }

    pub fn insert(&mut self, key: EffectKey) {
        self.keys.insert(key);
    }

    pub fn remove(&mut self, key: EffectKey) {
        self.keys.shift_remove(&key);
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Overwrite the selection with the given keys, preserving their order.
    pub fn set_all<I: IntoIterator<Item = EffectKey>>(&mut self, keys: I) {
        self.keys = keys.into_iter().collect();
    }

    /// Snapshot of the current keys, used as the base set for marquee and
    /// swipe gestures.
    pub fn snapshot(&self) -> IndexSet<EffectKey> {
        self.keys.clone()
    }
}
