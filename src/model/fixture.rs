use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Newtype for fixture identity. Prevents mixing up fixture IDs with other integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct FixtureId(pub u32);

/// Newtype for group identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct GroupId(pub u32);

/// A fixture definition. Represents a logical light or string of lights.
/// Patching and output routing live in the show engine; the timeline only
/// needs identity, a display name, and the pixel count for thumbnails.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FixtureDef {
    pub id: FixtureId,
    pub name: String,
    /// Number of individually addressable pixels. 1 for simple fixtures.
    pub pixel_count: u32,
}

/// A member of a group: either a direct fixture or a nested sub-group.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum GroupMember {
    Fixture(FixtureId),
    Group(GroupId),
}

/// A named group of fixtures for targeting effects. Supports hierarchical
/// nesting; membership cycles are possible and resolved by `GroupResolver`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FixtureGroup {
    pub id: GroupId,
    pub name: String,
    pub members: Vec<GroupMember>,
}

/// What a track targets: a specific set of fixtures, a named group, or everything.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum EffectTarget {
    Group(GroupId),
    Fixtures(Vec<FixtureId>),
    All,
}
