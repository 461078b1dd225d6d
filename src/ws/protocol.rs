//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::game::{ForceField, MatchMetadata, Player, Territory};

/// A point in the shared 3D scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Force field behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForceKind {
    /// Pulls particles in
    Attractor,
    /// Pushes particles away
    Repulsor,
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMsg {
    /// Pointer position in world space
    Cursor { position: Vector3 },

    /// Place a force field
    AddForce {
        position: Vector3,
        force_type: ForceKind,
        color: String,
    },

    /// Particle collisions against a territory since the last report
    HitTerritory { territory_id: String, amount: f64 },
}

impl ClientMsg {
    /// Every `type` tag this server understands
    pub const KNOWN_TYPES: [&'static str; 3] = ["cursor", "add_force", "hit_territory"];
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMsg {
    /// Full world state, sent once right after accept
    Init {
        id: Uuid,
        color: String,
        players: Vec<Player>,
        force_fields: Vec<ForceField>,
        territories: Vec<Territory>,
        #[serde(rename = "match")]
        match_state: MatchMetadata,
    },

    /// Another player connected
    PlayerJoined { player: Player },

    /// A player disconnected
    PlayerLeft { id: Uuid },

    /// A force field was placed
    ForceAdded { force: ForceField },

    /// Periodic state sync
    Sync {
        /// Only players that have reported a position
        players: Vec<Player>,
        territories: Vec<Territory>,
        #[serde(rename = "match")]
        match_state: MatchMetadata,
        /// Present only when the force field list changed this tick
        #[serde(skip_serializing_if = "Option::is_none")]
        force_fields: Option<Vec<ForceField>>,
    },
}

/// Encoded outbound text frame, shared between every recipient of a broadcast
pub type Frame = Arc<str>;

/// Protocol errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Message has no string `type` field")]
    MissingType,

    #[error("Failed to encode message: {0}")]
    Encode(serde_json::Error),
}

/// Decode a client text frame.
///
/// Returns `Ok(None)` for a well-formed message whose `type` is not part of
/// the vocabulary; those are ignored rather than treated as malformed.
pub fn decode_client_msg(text: &str) -> Result<Option<ClientMsg>, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;

    if !ClientMsg::KNOWN_TYPES.contains(&kind) {
        return Ok(None);
    }

    Ok(Some(serde_json::from_value(value)?))
}

/// Encode a server message into a shareable frame
pub fn encode_server_msg(msg: &ServerMsg) -> Result<Frame, ProtocolError> {
    serde_json::to_string(msg)
        .map(Frame::from)
        .map_err(ProtocolError::Encode)
}
