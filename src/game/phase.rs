//! Match phase state machine and end-of-round scoring

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use super::territory::Territory;
use super::world::GameWorld;

/// Countdown before a round starts (milliseconds)
pub const COUNTDOWN_MS: u64 = 5_000;
/// Length of a round (milliseconds)
pub const MATCH_MS: u64 = 45_000;
/// Results screen after a round (milliseconds)
pub const POST_MATCH_MS: u64 = 5_000;

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Nobody connected
    Lobby,
    /// Round about to start
    Countdown,
    /// Territories can be captured
    InMatch,
    /// Showing the winner
    PostMatch,
}

/// Wins accumulated over the server's lifetime
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scoreboard {
    pub players: BTreeMap<Uuid, u32>,
    pub colors: BTreeMap<String, u32>,
}

/// Match metadata shared with every client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMetadata {
    pub phase: MatchPhase,
    /// `None` exactly when in the lobby
    pub round_ends_at: Option<u64>,
    pub winning_player_id: Option<Uuid>,
    pub winning_color: Option<String>,
    pub scoreboard: Scoreboard,
}

impl Default for MatchMetadata {
    fn default() -> Self {
        Self {
            phase: MatchPhase::Lobby,
            round_ends_at: None,
            winning_player_id: None,
            winning_color: None,
            scoreboard: Scoreboard::default(),
        }
    }
}

/// Result of one `advance` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: MatchPhase,
    pub to: MatchPhase,
    /// Force fields removed by a round reset during this transition
    pub cleared_force_fields: usize,
}

/// Drives lobby → countdown → in_match → post_match → countdown ...
#[derive(Debug, Clone, Default)]
pub struct MatchPhaseController {
    meta: MatchMetadata,
}

impl MatchPhaseController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata(&self) -> &MatchMetadata {
        &self.meta
    }

    pub fn phase(&self) -> MatchPhase {
        self.meta.phase
    }

    /// Evaluate at most one transition for `now`
    pub fn advance(&mut self, world: &mut GameWorld, now: u64) -> Option<PhaseTransition> {
        let from = self.meta.phase;

        if world.player_count() == 0 {
            let changed = from != MatchPhase::Lobby
                || self.meta.round_ends_at.is_some()
                || self.meta.winning_player_id.is_some()
                || self.meta.winning_color.is_some();

            self.meta.phase = MatchPhase::Lobby;
            self.meta.round_ends_at = None;
            self.meta.winning_player_id = None;
            self.meta.winning_color = None;

            return changed.then_some(PhaseTransition {
                from,
                to: MatchPhase::Lobby,
                cleared_force_fields: 0,
            });
        }

        if from == MatchPhase::Lobby {
            let cleared = world.reset_round();
            self.enter(MatchPhase::Countdown, now + COUNTDOWN_MS);
            return Some(PhaseTransition {
                from,
                to: MatchPhase::Countdown,
                cleared_force_fields: cleared,
            });
        }

        if self.meta.round_ends_at.is_some_and(|ends_at| now < ends_at) {
            return None;
        }

        let (to, cleared) = match from {
            MatchPhase::Countdown => {
                self.enter(MatchPhase::InMatch, now + MATCH_MS);
                (MatchPhase::InMatch, 0)
            }
            MatchPhase::InMatch => {
                self.end_match(world);
                self.enter(MatchPhase::PostMatch, now + POST_MATCH_MS);
                (MatchPhase::PostMatch, 0)
            }
            MatchPhase::PostMatch => {
                let cleared = world.reset_round();
                self.enter(MatchPhase::Countdown, now + COUNTDOWN_MS);
                (MatchPhase::Countdown, cleared)
            }
            MatchPhase::Lobby => return None,
        };

        Some(PhaseTransition {
            from,
            to,
            cleared_force_fields: cleared,
        })
    }

    fn enter(&mut self, phase: MatchPhase, ends_at: u64) {
        self.meta.phase = phase;
        self.meta.round_ends_at = Some(ends_at);
    }

    /// Score the round and record the winner on the scoreboard
    fn end_match(&mut self, world: &GameWorld) {
        let winning_color = decide_winning_color(world.territories());
        let winning_player_id = winning_color.as_deref().and_then(|color| {
            world
                .players()
                .find(|p| p.color == color)
                .map(|p| p.id)
        });

        if let Some(color) = &winning_color {
            *self.meta.scoreboard.colors.entry(color.clone()).or_insert(0) += 1;
        }
        if let Some(id) = winning_player_id {
            *self.meta.scoreboard.players.entry(id).or_insert(0) += 1;
        }

        self.meta.winning_color = winning_color;
        self.meta.winning_player_id = winning_player_id;
    }
}

/// Color with the most territories, then the most points.
///
/// Remaining ties go to whichever color appears first when walking
/// `territories` in order. That choice is arbitrary but deterministic.
pub fn decide_winning_color(territories: &[Territory]) -> Option<String> {
    // (color, territory count, points sum) in first-seen order
    let mut tally: Vec<(&str, u32, f64)> = Vec::new();

    for territory in territories {
        let Some(color) = territory.controlling_color.as_deref() else {
            continue;
        };
        match tally.iter_mut().find(|(c, _, _)| *c == color) {
            Some(entry) => {
                entry.1 += 1;
                entry.2 += territory.points;
            }
            None => tally.push((color, 1, territory.points)),
        }
    }

    let mut best: Option<(&str, u32, f64)> = None;
    for candidate in tally {
        let beats = match best {
            None => true,
            Some((_, count, points)) => {
                candidate.1 > count || (candidate.1 == count && candidate.2 > points)
            }
        };
        if beats {
            best = Some(candidate);
        }
    }

    best.map(|(color, _, _)| color.to_string())
}
