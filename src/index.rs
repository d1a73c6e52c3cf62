use std::collections::HashMap;

use crate::groups::GroupResolver;
use crate::model::{EffectTarget, FixtureId, Sequence, Show};

/// Maps each fixture to the tracks that contribute effects to its row.
///
/// Built in one pass over the tracks: each track's target is resolved to a
/// fixture-ID set exactly once (group resolution is memoized across tracks),
/// and the track index is appended to every listed fixture. This keeps the
/// build O(tracks + groups) rather than walking groups per fixture.
#[derive(Debug, Default)]
pub struct TrackIndex {
    by_fixture: HashMap<FixtureId, Vec<usize>>,
}

impl TrackIndex {
    pub fn build(show: &Show, sequence: &Sequence) -> Self {
        let mut resolver = GroupResolver::new(&show.groups);
        let mut by_fixture: HashMap<FixtureId, Vec<usize>> = HashMap::new();

        // Tracks are visited in index order, so each fixture's track list is
        // ascending by construction; the last-entry check dedupes repeated
        // fixture references within a single target.
        fn add(map: &mut HashMap<FixtureId, Vec<usize>>, id: FixtureId, track: usize) {
            let slot = map.entry(id).or_default();
            if slot.last() != Some(&track) {
                slot.push(track);
            }
        }

        for (track_idx, track) in sequence.tracks.iter().enumerate() {
            match &track.target {
                EffectTarget::All => {
                    for fixture in &show.fixtures {
                        add(&mut by_fixture, fixture.id, track_idx);
                    }
                }
                EffectTarget::Fixtures(ids) => {
                    for id in ids {
                        add(&mut by_fixture, *id, track_idx);
                    }
                }
                EffectTarget::Group(gid) => {
                    for id in resolver.resolve(*gid).iter() {
                        add(&mut by_fixture, *id, track_idx);
                    }
                }
            }
        }

        Self { by_fixture }
    }

    /// Track indices contributing to this fixture's row, ascending.
    pub fn tracks_for(&self, fixture: FixtureId) -> &[usize] {
        self.by_fixture
            .get(&fixture)
            .map_or(&[], Vec::as_slice)
    }
}
