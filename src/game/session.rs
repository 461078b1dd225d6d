//! The session actor: single owner of all authoritative state
//!
//! Every inbound client message and every broadcast tick is handled to
//! completion by one task, one event at a time. Nothing else holds a
//! reference to the world, so no locking is needed and no handler can
//! observe a half-applied mutation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::util::time::{tick_duration, unix_millis};
use crate::ws::protocol::{ClientMsg, ForceKind, ServerMsg, Vector3};

use super::capture::{apply_hit, CaptureOutcome};
use super::force_field::ForceField;
use super::palette::ColorAllocator;
use super::phase::{MatchPhase, MatchPhaseController};
use super::registry::{ConnectionRegistry, Outbound};
use super::snapshot::SyncBuilder;
use super::territory::default_layout;
use super::world::{GameWorld, Player};

/// Inbound command queue depth
const COMMAND_BUFFER: usize = 256;

/// Events delivered to the session actor
#[derive(Debug)]
pub enum SessionCommand {
    /// A socket was accepted; reply with the assigned player id
    Connect {
        outbound: Outbound,
        reply: oneshot::Sender<Uuid>,
    },
    /// A decoded message from a connected client
    Client { player_id: Uuid, msg: ClientMsg },
    /// The socket closed
    Disconnect { player_id: Uuid },
}

/// Session tunables
#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    /// Live force fields a single player may own; `None` is unlimited
    pub max_force_fields_per_player: Option<usize>,
}

/// Session errors surfaced to connection tasks
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session actor is not running")]
    Closed,
}

/// Cloneable handle used by connection tasks and HTTP routes
#[derive(Clone, Debug)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    player_count: Arc<AtomicUsize>,
}

impl SessionHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    /// Register a connection and wait for its player id
    pub async fn connect(&self, outbound: Outbound) -> Result<Uuid, SessionError> {
        let (reply, id) = oneshot::channel();
        self.send(SessionCommand::Connect { outbound, reply }).await?;
        id.await.map_err(|_| SessionError::Closed)
    }

    pub async fn client_msg(&self, player_id: Uuid, msg: ClientMsg) -> Result<(), SessionError> {
        self.send(SessionCommand::Client { player_id, msg }).await
    }

    pub async fn disconnect(&self, player_id: Uuid) -> Result<(), SessionError> {
        self.send(SessionCommand::Disconnect { player_id }).await
    }

    async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }
}

/// Authoritative game session
pub struct GameSession {
    world: GameWorld,
    phase: MatchPhaseController,
    connections: ConnectionRegistry,
    colors: ColorAllocator,
    sync: SyncBuilder,
    rng: ChaCha8Rng,
    settings: SessionSettings,
    player_count: Arc<AtomicUsize>,
}

impl GameSession {
    /// Create the session and a handle to reach it, along with its command queue
    pub fn new(settings: SessionSettings) -> (Self, SessionHandle, mpsc::Receiver<SessionCommand>) {
        Self::with_rng(settings, ChaCha8Rng::from_entropy())
    }

    fn with_rng(
        settings: SessionSettings,
        rng: ChaCha8Rng,
    ) -> (Self, SessionHandle, mpsc::Receiver<SessionCommand>) {
        let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = SessionHandle {
            commands,
            player_count: player_count.clone(),
        };

        let session = Self {
            world: GameWorld::new(default_layout()),
            phase: MatchPhaseController::new(),
            connections: ConnectionRegistry::new(),
            colors: ColorAllocator::new(),
            sync: SyncBuilder::new(),
            rng,
            settings,
            player_count,
        };

        (session, handle, command_rx)
    }

    /// Run the actor until every handle is dropped
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        info!(
            territories = self.world.territories().len(),
            "Game session started"
        );

        let mut tick_interval = interval(tick_duration());
        // A late tick runs once; missed ticks are not replayed
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command, unix_millis()),
                    None => break,
                },
                _ = tick_interval.tick() => self.tick(unix_millis()),
            }
        }

        info!("Game session stopped");
    }

    fn handle_command(&mut self, command: SessionCommand, now: u64) {
        match command {
            SessionCommand::Connect { outbound, reply } => {
                let id = self.connect(outbound, now);
                if reply.send(id).is_err() {
                    // Socket task went away before learning its id
                    self.disconnect(id);
                }
            }
            SessionCommand::Client { player_id, msg } => {
                self.handle_client_msg(player_id, msg, now)
            }
            SessionCommand::Disconnect { player_id } => self.disconnect(player_id),
        }
    }

    /// Register a new player, send it `init` and announce it to everyone else
    pub fn connect(&mut self, outbound: Outbound, now: u64) -> Uuid {
        let id = Uuid::new_v4();
        let color = self.colors.acquire(&mut self.rng);
        let player = Player::new(id, color.clone(), now);

        self.world.insert_player(player.clone());
        self.connections.insert(id, outbound);
        self.update_player_count();

        self.connections.send_to(
            &id,
            &ServerMsg::Init {
                id,
                color: color.clone(),
                players: self.world.players().cloned().collect(),
                force_fields: self.world.force_fields().to_vec(),
                territories: self.world.territories().to_vec(),
                match_state: self.phase.metadata().clone(),
            },
        );
        self.connections
            .broadcast_except(&id, &ServerMsg::PlayerJoined { player });

        info!(
            player_id = %id,
            color = %color,
            player_count = self.world.player_count(),
            free_colors = self.colors.free().count(),
            "Player connected"
        );
        id
    }

    /// Remove a player and its force fields, then announce the departure
    pub fn disconnect(&mut self, id: Uuid) {
        self.connections.remove(&id);

        let Some(player) = self.world.remove_player(&id) else {
            debug!(player_id = %id, "Disconnect for unknown player");
            return;
        };
        self.colors.release(&player.color);
        let removed = self.world.remove_force_fields_owned_by(&id);
        self.update_player_count();

        self.connections.broadcast(&ServerMsg::PlayerLeft { id });

        info!(
            player_id = %id,
            force_fields_removed = removed,
            player_count = self.world.player_count(),
            "Player disconnected"
        );
    }

    /// Apply one client message; anything invalid is a silent no-op
    pub fn handle_client_msg(&mut self, id: Uuid, msg: ClientMsg, now: u64) {
        if !self.world.contains_player(&id) {
            debug!(player_id = %id, "Message from unknown player ignored");
            return;
        }

        match msg {
            ClientMsg::Cursor { position } => {
                self.world.update_cursor(&id, position, now);
            }
            ClientMsg::AddForce {
                position,
                force_type,
                color,
            } => self.add_force(id, position, force_type, color, now),
            ClientMsg::HitTerritory {
                territory_id,
                amount,
            } => self.hit_territory(id, &territory_id, amount),
        }
    }

    fn add_force(
        &mut self,
        owner: Uuid,
        position: Vector3,
        kind: ForceKind,
        color: String,
        now: u64,
    ) {
        if let Some(cap) = self.settings.max_force_fields_per_player {
            if self.world.force_fields_owned_by(&owner) >= cap {
                debug!(player_id = %owner, cap, "Force field cap reached, dropping");
                return;
            }
        }

        let force = ForceField::new(owner, position, kind, color, now);
        debug!(player_id = %owner, force_id = %force.id, "Force field added");
        self.world.add_force_field(force.clone());
        self.connections.broadcast(&ServerMsg::ForceAdded { force });
    }

    fn hit_territory(&mut self, id: Uuid, territory_id: &str, amount: f64) {
        if self.phase.phase() != MatchPhase::InMatch {
            debug!(player_id = %id, phase = ?self.phase.phase(), "Hit outside match dropped");
            return;
        }

        let Some(color) = self.world.player(&id).map(|p| p.color.clone()) else {
            return;
        };
        let Some(territory) = self.world.territory_mut(territory_id) else {
            debug!(player_id = %id, territory_id, "Hit on unknown territory");
            return;
        };

        match apply_hit(territory, &color, amount) {
            CaptureOutcome::Captured { points } => {
                debug!(territory_id, color = %color, points, "Territory captured");
            }
            CaptureOutcome::Reinforced { points } | CaptureOutcome::Contested { points } => {
                trace!(territory_id, color = %color, points, "Territory hit");
            }
            CaptureOutcome::Ignored => {
                debug!(player_id = %id, amount, "Hit with unusable amount ignored");
            }
        }
    }

    /// One broadcast tick: phase transitions, expiry, then sync
    pub fn tick(&mut self, now: u64) {
        if let Some(transition) = self.phase.advance(&mut self.world, now) {
            info!(
                from = ?transition.from,
                to = ?transition.to,
                "Match phase changed"
            );
            if transition.to == MatchPhase::PostMatch {
                let meta = self.phase.metadata();
                info!(
                    winning_color = ?meta.winning_color,
                    winning_player_id = ?meta.winning_player_id,
                    "Round finished"
                );
            }
            if transition.cleared_force_fields > 0 {
                self.sync.mark_force_fields_dirty();
            }
        }

        if self.world.expire_force_fields(now) > 0 {
            self.sync.mark_force_fields_dirty();
        }

        if self.connections.is_empty() {
            return;
        }
        let sync = self.sync.build(&self.world, self.phase.metadata());
        self.connections.broadcast(&sync);
    }

    fn update_player_count(&self) {
        self.player_count
            .store(self.world.player_count(), Ordering::Relaxed);
    }
}
