// Wire protocol DTOs and conversions for public game server messages.
// Internal service-to-service DTOs should live outside this module.

use crate::domain::{InputFrame, PickupSnapshot, PlayerSnapshot};
use crate::use_cases::{SessionEvent, SessionState, WorldUpdate};
use crate::use_cases::session::display_name;
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned identity for the connection after Join is accepted.
    Identity {
        player_id: String,
        display_name: String,
    },
    // Snapshot of the world for a given tick.
    WorldUpdate(WorldUpdateDto),
    // Session lifecycle transitions (idle, active, terminated).
    GameState(SessionStateDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    Input(InputDto),
}

/// Packed input for one tick.
#[derive(Debug, Clone, Deserialize)]
pub struct InputDto {
    // Tick this frame is meant for; untagged frames apply to the next tick.
    #[serde(default)]
    pub tick: Option<u64>,
    // InputFrame bits: MoveLeft = 1, MoveRight = 2, Jump = 4.
    #[serde(default)]
    pub buttons: u8,
}

impl InputDto {
    pub fn frame(&self) -> InputFrame {
        InputFrame::from_bits(self.buttons)
    }
}

/// Snapshot of the world sent to clients on each tick.
#[derive(Debug, Clone, Serialize)]
pub struct WorldUpdateDto {
    pub seq: u64,
    pub tick: u64,
    pub players: Vec<PlayerStateDto>,
    pub pickups: Vec<PickupStateDto>,
    pub total_collected: u64,
    pub events: Vec<SessionEventDto>,
}

impl From<WorldUpdate> for WorldUpdateDto {
    fn from(update: WorldUpdate) -> Self {
        Self {
            seq: update.seq,
            tick: update.tick,
            players: update.players.iter().map(PlayerStateDto::from).collect(),
            pickups: update.pickups.iter().map(PickupStateDto::from).collect(),
            total_collected: update.total_collected,
            events: update.events.into_iter().map(SessionEventDto::from).collect(),
        }
    }
}

/// Flattened player state for wire transmission in world updates.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerStateDto {
    pub id: String,
    pub display_name: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub vx: f32,
    pub vy: f32,
    pub grounded: bool,
    pub score: u32,
}

impl From<&PlayerSnapshot> for PlayerStateDto {
    fn from(player: &PlayerSnapshot) -> Self {
        Self {
            id: player.id.to_string(),
            display_name: display_name(player.id),
            x: player.x,
            y: player.y,
            z: player.z,
            vx: player.vx,
            vy: player.vy,
            grounded: player.grounded,
            score: player.score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PickupStateDto {
    pub id: String,
    pub x: f32,
    pub y: f32,
}

impl From<&PickupSnapshot> for PickupStateDto {
    fn from(pickup: &PickupSnapshot) -> Self {
        Self {
            id: pickup.id.to_string(),
            x: pickup.x,
            y: pickup.y,
        }
    }
}

/// Session notifications attached to the world update of the tick that produced them.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEventDto {
    PlayerJoined {
        player_id: String,
        display_name: String,
    },
    PlayerLeft {
        player_id: String,
        display_name: String,
    },
    PickupCollected {
        player_id: String,
        pickup_id: String,
        tick: u64,
    },
    ScoreChanged {
        player_id: String,
        score: u32,
        total_collected: u64,
    },
    SessionTerminated,
}

impl From<SessionEvent> for SessionEventDto {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::PlayerJoined {
                player_id,
                display_name,
            } => Self::PlayerJoined {
                player_id: player_id.to_string(),
                display_name,
            },
            SessionEvent::PlayerLeft {
                player_id,
                display_name,
            } => Self::PlayerLeft {
                player_id: player_id.to_string(),
                display_name,
            },
            SessionEvent::PickupCollected {
                player_id,
                pickup_id,
                tick,
            } => Self::PickupCollected {
                player_id: player_id.to_string(),
                pickup_id: pickup_id.to_string(),
                tick,
            },
            SessionEvent::ScoreChanged {
                player_id,
                score,
                total_collected,
            } => Self::ScoreChanged {
                player_id: player_id.to_string(),
                score,
                total_collected,
            },
            SessionEvent::SessionTerminated => Self::SessionTerminated,
        }
    }
}

/// Session lifecycle state sent to clients for UI flow.
#[derive(Debug, Clone, Serialize)]
pub enum SessionStateDto {
    Idle,
    Active,
    Terminated,
}

impl From<SessionState> for SessionStateDto {
    fn from(state: SessionState) -> Self {
        match state {
            SessionState::Idle => SessionStateDto::Idle,
            SessionState::Active => SessionStateDto::Active,
            SessionState::Terminated => SessionStateDto::Terminated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Intent;
    use serde_json::json;

    #[test]
    fn when_input_message_is_parsed_then_buttons_map_to_intents() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"Input","data":{"tick":7,"buttons":6}}"#)
                .expect("valid input");
        let ClientMessage::Input(input) = msg;
        assert_eq!(input.tick, Some(7));
        assert!(input.frame().contains(Intent::MoveRight));
        assert!(input.frame().contains(Intent::Jump));
        assert!(!input.frame().contains(Intent::MoveLeft));
    }

    #[test]
    fn when_input_omits_fields_then_it_is_an_untagged_idle_frame() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"Input","data":{}}"#).expect("valid input");
        let ClientMessage::Input(input) = msg;
        assert_eq!(input.tick, None);
        assert!(input.frame().is_idle());
    }

    #[test]
    fn when_world_update_is_serialized_then_events_are_tagged_by_kind() {
        let update = WorldUpdate {
            seq: 4,
            tick: 3,
            players: vec![PlayerSnapshot {
                id: 9,
                x: 1.0,
                y: 0.5,
                z: 0.0,
                vx: 5.0,
                vy: 0.0,
                grounded: true,
                score: 1,
            }],
            pickups: vec![],
            total_collected: 1,
            events: vec![SessionEvent::ScoreChanged {
                player_id: 9,
                score: 1,
                total_collected: 1,
            }],
        };

        let value = serde_json::to_value(ServerMessage::WorldUpdate(update.into()))
            .expect("serializable");
        assert_eq!(value["type"], "WorldUpdate");
        assert_eq!(value["data"]["seq"], 4);
        assert_eq!(value["data"]["players"][0]["id"], "9");
        assert_eq!(value["data"]["players"][0]["display_name"], "Player_9");
        assert_eq!(
            value["data"]["events"][0],
            json!({"kind": "score_changed", "player_id": "9", "score": 1, "total_collected": 1})
        );
    }
}
