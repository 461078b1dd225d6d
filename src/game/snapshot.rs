//! Sync payload building with differential force field lists

use crate::ws::protocol::ServerMsg;

use super::phase::MatchMetadata;
use super::world::GameWorld;

/// Builds the periodic `sync` message
#[derive(Debug, Default)]
pub struct SyncBuilder {
    /// Force field list changed since the last sync
    force_fields_dirty: bool,
}

impl SyncBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include the force field list in the next sync
    pub fn mark_force_fields_dirty(&mut self) {
        self.force_fields_dirty = true;
    }

    /// Build a sync message, consuming the dirty flag
    pub fn build(&mut self, world: &GameWorld, match_state: &MatchMetadata) -> ServerMsg {
        let players = world
            .players()
            .filter(|p| p.position.is_some())
            .cloned()
            .collect();

        let force_fields = std::mem::take(&mut self.force_fields_dirty)
            .then(|| world.force_fields().to_vec());

        ServerMsg::Sync {
            players,
            territories: world.territories().to_vec(),
            match_state: match_state.clone(),
            force_fields,
        }
    }
}
