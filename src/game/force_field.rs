//! Force field creation and time-based expiry

use serde::Serialize;
use uuid::Uuid;

use crate::ws::protocol::{ForceKind, Vector3};

/// How long a force field lives (milliseconds)
pub const FORCE_FIELD_TTL_MS: u64 = 10_500;

/// A transient attractor/repulsor placed by a player
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceField {
    pub id: Uuid,
    pub position: Vector3,
    pub kind: ForceKind,
    /// Owning player, by value only
    pub owner_id: Uuid,
    pub created_at: u64,
    pub color: String,
}

impl ForceField {
    pub fn new(
        owner_id: Uuid,
        position: Vector3,
        kind: ForceKind,
        color: String,
        now: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            kind,
            owner_id,
            created_at: now,
            color,
        }
    }

    /// Milliseconds since creation; a clock step backwards reads as zero
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.age(now) > FORCE_FIELD_TTL_MS
    }
}
