use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::model::{FixtureGroup, FixtureId, GroupId, GroupMember};

/// Resolves group references to flattened fixture-ID sets, memoized for the
/// lifetime of one layout pass (groups are immutable within a pass).
///
/// Uses an explicit worklist with a visited set instead of recursion, so
/// membership cycles terminate: a group reachable from itself contributes
/// only the fixtures discovered before the cycle closed, and the re-entrant
/// branch contributes nothing. This is deliberate behavior, not an error.
pub struct GroupResolver<'a> {
    by_id: HashMap<GroupId, &'a FixtureGroup>,
    cache: HashMap<GroupId, Arc<HashSet<FixtureId>>>,
}

impl<'a> GroupResolver<'a> {
    pub fn new(groups: &'a [FixtureGroup]) -> Self {
        Self {
            by_id: groups.iter().map(|g| (g.id, g)).collect(),
            cache: HashMap::new(),
        }
    }

    /// The transitive closure of fixture IDs reachable from `id`.
    /// Unknown group IDs resolve to the empty set.
    pub fn resolve(&mut self, id: GroupId) -> Arc<HashSet<FixtureId>> {
        if let Some(hit) = self.cache.get(&id) {
            return Arc::clone(hit);
        }

        let mut result = HashSet::new();
        let mut visited: HashSet<GroupId> = HashSet::from([id]);
        let mut work: Vec<GroupId> = vec![id];

        while let Some(gid) = work.pop() {
            let Some(group) = self.by_id.get(&gid) else {
                continue;
            };
            for member in &group.members {
                match member {
                    GroupMember::Fixture(fid) => {
                        result.insert(*fid);
                    }
                    GroupMember::Group(sub) => {
                        if visited.insert(*sub) {
                            // A sub-group resolved earlier in this pass is final.
                            if let Some(cached) = self.cache.get(sub) {
                                result.extend(cached.iter().copied());
                            } else {
                                work.push(*sub);
                            }
                        }
                    }
                }
            }
        }

        let resolved = Arc::new(result);
        self.cache.insert(id, Arc::clone(&resolved));
        resolved
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn group(id: u32, members: Vec<GroupMember>) -> FixtureGroup {
        FixtureGroup {
            id: GroupId(id),
            name: format!("group {id}"),
            members,
        }
    }

    fn fids(resolved: &HashSet<FixtureId>) -> Vec<u32> {
        let mut ids: Vec<u32> = resolved.iter().map(|f| f.0).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn flat_group() {
        let groups = [group(
            1,
            vec![
                GroupMember::Fixture(FixtureId(10)),
                GroupMember::Fixture(FixtureId(11)),
            ],
        )];
        let mut resolver = GroupResolver::new(&groups);
        assert_eq!(fids(&resolver.resolve(GroupId(1))), vec![10, 11]);
    }

    #[test]
    fn nested_groups_flatten() {
        let groups = [
            group(
                1,
                vec![
                    GroupMember::Fixture(FixtureId(1)),
                    GroupMember::Group(GroupId(2)),
                ],
            ),
            group(2, vec![GroupMember::Fixture(FixtureId(2))]),
        ];
        let mut resolver = GroupResolver::new(&groups);
        assert_eq!(fids(&resolver.resolve(GroupId(1))), vec![1, 2]);
    }

    #[test]
    fn cycle_terminates_with_fixtures_found_before_reentry() {
        // 1 -> 2 -> 1: the re-entrant branch adds nothing.
        let groups = [
            group(
                1,
                vec![
                    GroupMember::Fixture(FixtureId(1)),
                    GroupMember::Group(GroupId(2)),
                ],
            ),
            group(
                2,
                vec![
                    GroupMember::Fixture(FixtureId(2)),
                    GroupMember::Group(GroupId(1)),
                ],
            ),
        ];
        let mut resolver = GroupResolver::new(&groups);
        assert_eq!(fids(&resolver.resolve(GroupId(1))), vec![1, 2]);
        assert_eq!(fids(&resolver.resolve(GroupId(2))), vec![1, 2]);
    }

    #[test]
    fn self_cycle_resolves_to_own_fixtures() {
        let groups = [group(
            1,
            vec![
                GroupMember::Group(GroupId(1)),
                GroupMember::Fixture(FixtureId(7)),
            ],
        )];
        let mut resolver = GroupResolver::new(&groups);
        assert_eq!(fids(&resolver.resolve(GroupId(1))), vec![7]);
    }

    #[test]
    fn unknown_group_is_empty() {
        let mut resolver = GroupResolver::new(&[]);
        assert!(resolver.resolve(GroupId(99)).is_empty());
    }

    #[test]
    fn cache_returns_same_set() {
        let groups = [group(1, vec![GroupMember::Fixture(FixtureId(1))])];
        let mut resolver = GroupResolver::new(&groups);
        let first = resolver.resolve(GroupId(1));
        let second = resolver.resolve(GroupId(1));
        assert!(Arc::ptr_eq(&first, &second));
    }
}
