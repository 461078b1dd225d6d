//! Authoritative world state: players, force fields and territories

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::ws::protocol::Vector3;

use super::force_field::ForceField;
use super::territory::Territory;

/// A connected player
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: Uuid,
    pub color: String,
    /// `None` until the first cursor report
    pub position: Option<Vector3>,
    pub last_update: u64,
}

impl Player {
    pub fn new(id: Uuid, color: String, now: u64) -> Self {
        Self {
            id,
            color,
            position: None,
            last_update: now,
        }
    }
}

/// Owns every keyed collection of the game.
///
/// Players iterate in join order and territories in registration order; the
/// end-of-match winner selection relies on both being stable.
#[derive(Debug, Clone)]
pub struct GameWorld {
    players: HashMap<Uuid, Player>,
    join_order: Vec<Uuid>,
    force_fields: Vec<ForceField>,
    territories: Vec<Territory>,
}

impl GameWorld {
    pub fn new(territories: Vec<Territory>) -> Self {
        Self {
            players: HashMap::new(),
            join_order: Vec::new(),
            force_fields: Vec::new(),
            territories,
        }
    }

    // Players

    pub fn insert_player(&mut self, player: Player) {
        let id = player.id;
        if self.players.insert(id, player).is_none() {
            self.join_order.push(id);
        }
    }

    pub fn remove_player(&mut self, id: &Uuid) -> Option<Player> {
        let player = self.players.remove(id)?;
        self.join_order.retain(|joined| joined != id);
        Some(player)
    }

    pub fn player(&self, id: &Uuid) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn contains_player(&self, id: &Uuid) -> bool {
        self.players.contains_key(id)
    }

    /// Players in join order
    pub fn players(&self) -> impl Iterator<Item = &Player> + '_ {
        self.join_order.iter().filter_map(|id| self.players.get(id))
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Record a cursor report. Returns false for unknown players.
    pub fn update_cursor(&mut self, id: &Uuid, position: Vector3, now: u64) -> bool {
        match self.players.get_mut(id) {
            Some(player) => {
                player.position = Some(position);
                player.last_update = now;
                true
            }
            None => false,
        }
    }

    // Force fields

    pub fn add_force_field(&mut self, field: ForceField) {
        self.force_fields.push(field);
    }

    pub fn force_fields(&self) -> &[ForceField] {
        &self.force_fields
    }

    pub fn force_fields_owned_by(&self, owner: &Uuid) -> usize {
        self.force_fields
            .iter()
            .filter(|f| f.owner_id == *owner)
            .count()
    }

    /// Drop every force field placed by `owner`, returning how many went
    pub fn remove_force_fields_owned_by(&mut self, owner: &Uuid) -> usize {
        self.remove_force_fields_where(|f| f.owner_id == *owner)
    }

    /// Drop every force field past its TTL, returning how many went
    pub fn expire_force_fields(&mut self, now: u64) -> usize {
        self.remove_force_fields_where(|f| f.is_expired(now))
    }

    pub fn clear_force_fields(&mut self) -> usize {
        let removed = self.force_fields.len();
        self.force_fields.clear();
        removed
    }

    fn remove_force_fields_where(&mut self, doomed: impl Fn(&ForceField) -> bool) -> usize {
        let before = self.force_fields.len();
        self.force_fields.retain(|f| !doomed(f));
        before - self.force_fields.len()
    }

    // Territories

    /// Territories in registration order
    pub fn territories(&self) -> &[Territory] {
        &self.territories
    }

    pub fn territory_mut(&mut self, id: &str) -> Option<&mut Territory> {
        self.territories.iter_mut().find(|t| t.id == id)
    }

    /// Neutralize every territory and clear force fields for a fresh round.
    /// Returns how many force fields were cleared.
    pub fn reset_round(&mut self) -> usize {
        for territory in &mut self.territories {
            territory.reset();
        }
        self.clear_force_fields()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::force_field::FORCE_FIELD_TTL_MS;
    use crate::game::territory::default_layout;
    use crate::ws::protocol::ForceKind;

    fn world_with_players(n: usize) -> (GameWorld, Vec<Uuid>) {
        let mut world = GameWorld::new(default_layout());
        let ids: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
        for (i, id) in ids.iter().enumerate() {
            world.insert_player(Player::new(*id, format!("color-{i}"), 0));
        }
        (world, ids)
    }

    fn field(owner: Uuid, now: u64) -> ForceField {
        ForceField::new(
            owner,
            Vector3::new(1.0, 2.0, 3.0),
            ForceKind::Repulsor,
            "#ffffff".to_string(),
            now,
        )
    }

    #[test]
    fn players_iterate_in_join_order() {
        let (mut world, ids) = world_with_players(4);
        world.remove_player(&ids[1]);

        let order: Vec<Uuid> = world.players().map(|p| p.id).collect();
        assert_eq!(order, vec![ids[0], ids[2], ids[3]]);
        assert_eq!(world.player_count(), 3);
    }

    #[test]
    fn cursor_updates_position_and_timestamp() {
        let (mut world, ids) = world_with_players(1);
        assert!(world.update_cursor(&ids[0], Vector3::new(4.0, 5.0, 6.0), 1_234));

        let player = world.player(&ids[0]).unwrap();
        assert_eq!(player.position, Some(Vector3::new(4.0, 5.0, 6.0)));
        assert_eq!(player.last_update, 1_234);

        assert!(!world.update_cursor(&Uuid::new_v4(), Vector3::new(0.0, 0.0, 0.0), 1));
    }

    #[test]
    fn owner_cascade_removes_only_their_fields() {
        let (mut world, ids) = world_with_players(2);
        world.add_force_field(field(ids[0], 0));
        world.add_force_field(field(ids[1], 0));
        world.add_force_field(field(ids[0], 0));

        assert_eq!(world.force_fields_owned_by(&ids[0]), 2);
        assert_eq!(world.remove_force_fields_owned_by(&ids[0]), 2);
        assert_eq!(world.force_fields().len(), 1);
        assert_eq!(world.force_fields()[0].owner_id, ids[1]);
    }

    #[test]
    fn expiry_respects_ttl() {
        let (mut world, ids) = world_with_players(1);
        world.add_force_field(field(ids[0], 0));
        world.add_force_field(field(ids[0], 5_000));

        assert_eq!(world.expire_force_fields(10_000), 0);
        assert_eq!(world.expire_force_fields(FORCE_FIELD_TTL_MS + 1), 1);
        assert_eq!(world.force_fields().len(), 1);
        assert_eq!(world.expire_force_fields(16_000), 1);
        assert!(world.force_fields().is_empty());
    }

    #[test]
    fn reset_round_neutralizes_everything() {
        let (mut world, ids) = world_with_players(1);
        world.add_force_field(field(ids[0], 0));
        let territory = world.territory_mut("territory-1").unwrap();
        territory.points = 60.0;
        territory.controlling_color = Some("color-0".to_string());

        assert_eq!(world.reset_round(), 1);
        assert!(world.force_fields().is_empty());
        assert!(world
            .territories()
            .iter()
            .all(|t| t.points == 0.0 && t.controlling_color.is_none()));
    }

    #[test]
    fn unknown_territory_lookup_is_none() {
        let (mut world, _) = world_with_players(0);
        assert!(world.territory_mut("nowhere").is_none());
    }
}
