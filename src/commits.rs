use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::error::TimelineError;
use crate::host::ShowHost;
use crate::model::{EffectKind, EffectTarget, FixtureId, Show};
use crate::selection::EffectKey;

/// A mutation or transport operation produced by a finished gesture.
/// Each variant corresponds to one user action; the driver translates it
/// into the host call sequence.
#[derive(Debug, Clone, Serialize)]
pub enum CommitRequest {
    UpdateEffectTimeRange {
        key: EffectKey,
        start: f64,
        end: f64,
    },
    /// Cross-fixture move: retarget the effect onto `dest_fixture`'s track
    /// (created on demand) and set its final time range.
    MoveEffect {
        key: EffectKey,
        dest_fixture: FixtureId,
        start: f64,
        end: f64,
    },
    AddEffect {
        track: usize,
        kind: EffectKind,
        start: f64,
        end: f64,
    },
    DeleteEffects {
        keys: Vec<EffectKey>,
    },
    SetRegion {
        region: Option<(f64, f64)>,
    },
    ClearRegionAndSeek {
        time: f64,
    },
    Seek {
        time: f64,
    },
}

/// What a committed request produced. `select` carries the key the UI
/// should select once the show snapshot is refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Edited { select: Option<EffectKey> },
    Transport,
}

/// Generation token captured when a gesture commits. A token from before
/// the most recent `invalidate` is stale: its request is not issued, and a
/// response that straddles an invalidation is discarded instead of applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitToken(u64);

/// Executes commit requests against the host, exactly once each, guarded
/// by a generation counter so responses for an outdated context are never
/// applied. Host failures are logged and surfaced, never retried: the user
/// repeats the gesture.
pub struct CommitDriver {
    host: Arc<dyn ShowHost>,
    generation: AtomicU64,
}

impl CommitDriver {
    pub fn new(host: Arc<dyn ShowHost>) -> Self {
        Self {
            host,
            generation: AtomicU64::new(0),
        }
    }

    pub fn host(&self) -> &Arc<dyn ShowHost> {
        &self.host
    }

    /// Capture the current generation. Done at pointer-up, alongside the
    /// final gesture values.
    pub fn token(&self) -> CommitToken {
        CommitToken(self.generation.load(Ordering::SeqCst))
    }

    /// Invalidate all outstanding tokens. Called whenever a new gesture
    /// begins or the show is reloaded out from under the editor.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn check(&self, token: CommitToken, what: &str) -> Result<(), TimelineError> {
        if self.generation.load(Ordering::SeqCst) == token.0 {
            Ok(())
        } else {
            log::debug!("discarding stale {what} commit");
            Err(TimelineError::Stale { what: what.into() })
        }
    }

    /// Run one commit to completion. The host mutation sequence, once
    /// started, is never abandoned halfway (a half-applied move would
    /// corrupt the show); staleness is re-checked only before starting and
    /// before the outcome is handed back to be applied.
    pub async fn execute(
        &self,
        token: CommitToken,
        request: CommitRequest,
        show: &Show,
    ) -> Result<CommitOutcome, TimelineError> {
        self.check(token, "unissued")?;

        let result = self.run(request, show).await;
        match result {
            Ok(outcome) => {
                self.check(token, "completed")?;
                Ok(outcome)
            }
            Err(err) => {
                log::warn!("commit failed: {err}");
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        request: CommitRequest,
        show: &Show,
    ) -> Result<CommitOutcome, TimelineError> {
        match request {
            CommitRequest::UpdateEffectTimeRange { key, start, end } => {
                self.host
                    .update_effect_time_range(key.track, key.effect, start, end)
                    .await?;
                Ok(CommitOutcome::Edited { select: None })
            }

            CommitRequest::MoveEffect {
                key,
                dest_fixture,
                start,
                end,
            } => {
                let dest_track = match find_fixture_track(show, dest_fixture) {
                    Some(track) => track,
                    None => {
                        let name = show
                            .fixture(dest_fixture)
                            .map_or_else(|| format!("Fixture {}", dest_fixture.0), |f| f.name.clone());
                        self.host.add_track(name, dest_fixture).await?
                    }
                };
                let new_index = self
                    .host
                    .move_effect_to_track(key.track, key.effect, dest_track)
                    .await?;
                self.host
                    .update_effect_time_range(dest_track, new_index, start, end)
                    .await?;
                Ok(CommitOutcome::Edited {
                    select: Some(EffectKey::new(dest_track, new_index)),
                })
            }

            CommitRequest::AddEffect {
                track,
                kind,
                start,
                end,
            } => {
                let index = self.host.add_effect(track, kind, start, end).await?;
                Ok(CommitOutcome::Edited {
                    select: Some(EffectKey::new(track, index)),
                })
            }

            CommitRequest::DeleteEffects { keys } => {
                self.host.delete_effects(keys).await?;
                Ok(CommitOutcome::Edited { select: None })
            }

            CommitRequest::SetRegion { region } => {
                self.host.set_region(region).await?;
                Ok(CommitOutcome::Transport)
            }

            CommitRequest::ClearRegionAndSeek { time } => {
                self.host.set_region(None).await?;
                self.host.seek(time).await?;
                Ok(CommitOutcome::Transport)
            }

            CommitRequest::Seek { time } => {
                self.host.seek(time).await?;
                Ok(CommitOutcome::Transport)
            }
        }
    }
}

/// The track a cross-fixture move lands on: the first track targeting
/// exactly that single fixture. Broader targets (All, groups, multi-fixture
/// lists) are never auto-selected — dropping an effect on one fixture must
/// not light up others.
fn find_fixture_track(show: &Show, fixture: FixtureId) -> Option<usize> {
    let sequence = show.sequences.first()?;
    sequence.tracks.iter().position(|track| {
        matches!(&track.target, EffectTarget::Fixtures(ids) if ids.as_slice() == [fixture])
    })
}
