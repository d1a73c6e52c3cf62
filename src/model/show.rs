use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::fixture::{FixtureDef, FixtureGroup, FixtureId, GroupId};
use super::timeline::Sequence;

/// Read-only snapshot of the show as the timeline sees it. Owned by the
/// external show engine; refreshed wholesale after every committed edit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Show {
    pub name: String,
    pub fixtures: Vec<FixtureDef>,
    pub groups: Vec<FixtureGroup>,
    pub sequences: Vec<Sequence>,
}

impl Show {
    /// Create an empty show with no fixtures or sequences.
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            fixtures: Vec::new(),
            groups: Vec::new(),
            sequences: Vec::new(),
        }
    }

    pub fn fixture(&self, id: FixtureId) -> Option<&FixtureDef> {
        self.fixtures.iter().find(|f| f.id == id)
    }

    pub fn group(&self, id: GroupId) -> Option<&FixtureGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn sequence(&self, index: usize) -> Option<&Sequence> {
        self.sequences.get(index)
    }
}
