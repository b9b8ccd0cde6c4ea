//! Protocol module - JSON message types for the adapter
//!
//! One JSON object per line. Client messages carry a `type` and a `seq`
//! that must increase per connection; server messages carry a `type` and a
//! wall-clock `ts` in milliseconds.

use serde::{Deserialize, Serialize};

use crate::core::snapshot::SessionSnapshot;
use crate::types::{GameEvent, ItemKind};

pub const PROTOCOL_VERSION: &str = "1.0.0";

// ============== Client -> Game Messages ==============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Hello {
        seq: u64,
        #[serde(default)]
        client: Option<String>,
        /// The client animates goal collections and will send
        /// `goal_animation_complete` for each one.
        #[serde(default)]
        presentation: bool,
    },
    Tap {
        seq: u64,
        x: i32,
        y: i32,
    },
    Restart {
        seq: u64,
    },
    NextLevel {
        seq: u64,
    },
    GoalAnimationComplete {
        seq: u64,
        /// Item token, e.g. `"du"`.
        kind: String,
        x: i32,
        y: i32,
    },
}

impl ClientMessage {
    pub fn seq(&self) -> u64 {
        match self {
            ClientMessage::Hello { seq, .. }
            | ClientMessage::Tap { seq, .. }
            | ClientMessage::Restart { seq }
            | ClientMessage::NextLevel { seq }
            | ClientMessage::GoalAnimationComplete { seq, .. } => *seq,
        }
    }
}

// ============== Game -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WelcomeType {
    #[serde(rename = "welcome")]
    Welcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckType {
    #[serde(rename = "ack")]
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "event")]
    Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapshotType {
    #[serde(rename = "snapshot")]
    Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    HandshakeRequired,
    InvalidCommand,
    StaleSeq,
    Backpressure,
    LevelError,
}

/// Response to hello
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    pub msg_type: WelcomeType,
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    pub client_id: usize,
    pub game_id: String,
}

/// Result of a command once the game loop has applied it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub msg_type: AckType,
    pub seq: u64,
    pub ts: u64,
    pub accepted: bool,
    pub outcome: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub ts: u64,
    pub code: ErrorCode,
    pub message: String,
}

/// One core event, streamed to every handshaken client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub msg_type: EventType,
    pub ts: u64,
    pub event: WireEvent,
}

/// Core events with item kinds and directions as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum WireEvent {
    ItemSpawned {
        kind: String,
        x: i32,
        y: i32,
    },
    ItemDestroyed {
        kind: String,
        x: i32,
        y: i32,
    },
    ItemFell {
        kind: String,
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
        distance: u32,
    },
    MatchFound {
        kind: String,
        size: usize,
    },
    MatchProcessed {
        kind: String,
        size: usize,
        rocket_created: bool,
    },
    RocketCreated {
        kind: String,
        x: i32,
        y: i32,
    },
    RocketExploded {
        kind: String,
        x: i32,
        y: i32,
        is_combo: bool,
    },
    ProjectileLaunched {
        x: i32,
        y: i32,
        direction: String,
    },
    ProjectileFinished {
        x: i32,
        y: i32,
        direction: String,
    },
    ObstacleDamaged {
        kind: String,
        x: i32,
        y: i32,
        health: u8,
    },
    ObstacleDestroyed {
        kind: String,
        x: i32,
        y: i32,
    },
    GravityStarted,
    GravityCompleted,
    GridUpdated,
    GoalUpdated {
        kind: String,
        remaining: u32,
    },
    MovesChanged {
        remaining: u32,
    },
    GameStateChanged {
        from: String,
        to: String,
    },
    LevelStarted {
        level: u32,
    },
    LevelWon {
        level: u32,
    },
    LevelLost {
        level: u32,
    },
}

impl From<&GameEvent> for WireEvent {
    fn from(event: &GameEvent) -> Self {
        let k = |kind: ItemKind| kind.token().to_string();
        match *event {
            GameEvent::ItemSpawned { kind, x, y } => WireEvent::ItemSpawned { kind: k(kind), x, y },
            GameEvent::ItemDestroyed { kind, x, y } => {
                WireEvent::ItemDestroyed { kind: k(kind), x, y }
            }
            GameEvent::ItemFell {
                kind,
                from_x,
                from_y,
                to_x,
                to_y,
                distance,
            } => WireEvent::ItemFell {
                kind: k(kind),
                from_x,
                from_y,
                to_x,
                to_y,
                distance,
            },
            GameEvent::MatchFound { kind, size } => WireEvent::MatchFound { kind: k(kind), size },
            GameEvent::MatchProcessed {
                kind,
                size,
                rocket_created,
            } => WireEvent::MatchProcessed {
                kind: k(kind),
                size,
                rocket_created,
            },
            GameEvent::RocketCreated { kind, x, y } => {
                WireEvent::RocketCreated { kind: k(kind), x, y }
            }
            GameEvent::RocketExploded {
                kind,
                x,
                y,
                is_combo,
            } => WireEvent::RocketExploded {
                kind: k(kind),
                x,
                y,
                is_combo,
            },
            GameEvent::ProjectileLaunched { x, y, direction } => WireEvent::ProjectileLaunched {
                x,
                y,
                direction: direction.as_str().to_string(),
            },
            GameEvent::ProjectileFinished { x, y, direction } => WireEvent::ProjectileFinished {
                x,
                y,
                direction: direction.as_str().to_string(),
            },
            GameEvent::ObstacleDamaged { kind, x, y, health } => WireEvent::ObstacleDamaged {
                kind: k(kind),
                x,
                y,
                health,
            },
            GameEvent::ObstacleDestroyed { kind, x, y } => {
                WireEvent::ObstacleDestroyed { kind: k(kind), x, y }
            }
            GameEvent::GravityStarted => WireEvent::GravityStarted,
            GameEvent::GravityCompleted => WireEvent::GravityCompleted,
            GameEvent::GridUpdated => WireEvent::GridUpdated,
            GameEvent::GoalUpdated { kind, remaining } => WireEvent::GoalUpdated {
                kind: k(kind),
                remaining,
            },
            GameEvent::MovesChanged { remaining } => WireEvent::MovesChanged { remaining },
            GameEvent::GameStateChanged { from, to } => WireEvent::GameStateChanged {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            },
            GameEvent::LevelStarted { level } => WireEvent::LevelStarted { level },
            GameEvent::LevelWon { level } => WireEvent::LevelWon { level },
            GameEvent::LevelLost { level } => WireEvent::LevelLost { level },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireGoal {
    pub kind: String,
    pub target: u32,
    pub remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireProjectile {
    pub x: i32,
    pub y: i32,
    pub direction: String,
}

/// Full session state, sent after hello and on request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMessage {
    #[serde(rename = "type")]
    pub msg_type: SnapshotType,
    pub ts: u64,
    pub state: String,
    pub level: Option<u32>,
    pub moves: u32,
    pub busy: bool,
    pub width: u8,
    pub height: u8,
    /// Item tokens, top row first; `""` for empty cells.
    pub rows: Vec<Vec<String>>,
    pub goals: Vec<WireGoal>,
    pub projectiles: Vec<WireProjectile>,
}

// ============== Message Parsing ==============

/// Parsed incoming line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedMessage {
    Client(ClientMessage),
    Unknown(UnknownMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
}

const KNOWN_TYPES: [&str; 5] = ["hello", "tap", "restart", "next_level", "goal_animation_complete"];

/// Parse a JSON message from a string
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    match serde_json::from_str::<ClientMessage>(json) {
        Ok(m) => Ok(ParsedMessage::Client(m)),
        Err(e) => {
            // Unknown message type is not a hard parse error for the protocol.
            #[derive(Debug, Deserialize)]
            struct TypeOnly<'a> {
                #[serde(rename = "type")]
                msg_type: Option<&'a str>,
            }
            let msg_type = serde_json::from_str::<TypeOnly>(json)?
                .msg_type
                .unwrap_or("unknown");
            if !KNOWN_TYPES.contains(&msg_type) {
                #[derive(Debug, Deserialize)]
                struct SeqOnly {
                    seq: Option<u64>,
                }
                let seq = serde_json::from_str::<SeqOnly>(json)?.seq.unwrap_or(0);
                return Ok(ParsedMessage::Unknown(UnknownMessage { seq }));
            }
            Err(e)
        }
    }
}

/// Pull `"seq": N` out of a line that failed to parse, for error replies.
pub fn extract_seq_best_effort(s: &str) -> Option<u64> {
    let start = s.find("\"seq\"")?;
    let after_key = &s[start + 5..];
    let colon = after_key.find(':')?;
    let rest = after_key[colon + 1..].trim_start();
    let end = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    if end == 0 {
        return None;
    }
    rest[..end].parse::<u64>().ok()
}

// ============== Utility Functions ==============

pub fn create_welcome(seq: u64, client_id: usize) -> WelcomeMessage {
    WelcomeMessage {
        msg_type: WelcomeType::Welcome,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        client_id,
        game_id: "cube-blast".to_string(),
    }
}

pub fn create_ack(seq: u64, accepted: bool, outcome: &str) -> AckMessage {
    AckMessage {
        msg_type: AckType::Ack,
        seq,
        ts: current_timestamp_ms(),
        accepted,
        outcome: outcome.to_string(),
    }
}

pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        ts: current_timestamp_ms(),
        code,
        message: message.to_string(),
    }
}

pub fn create_event(event: &GameEvent) -> EventMessage {
    EventMessage {
        msg_type: EventType::Event,
        ts: current_timestamp_ms(),
        event: WireEvent::from(event),
    }
}

pub fn create_snapshot(snap: &SessionSnapshot) -> SnapshotMessage {
    let width = snap.width as usize;
    let rows = if width == 0 {
        Vec::new()
    } else {
        snap.cells
            .chunks(width)
            .map(|row| {
                row.iter()
                    .map(|cell| cell.map(|k| k.token().to_string()).unwrap_or_default())
                    .collect()
            })
            .collect()
    };
    SnapshotMessage {
        msg_type: SnapshotType::Snapshot,
        ts: current_timestamp_ms(),
        state: snap.state.as_str().to_string(),
        level: snap.level,
        moves: snap.moves,
        busy: snap.busy,
        width: snap.width,
        height: snap.height,
        rows,
        goals: snap
            .goals
            .iter()
            .map(|g| WireGoal {
                kind: g.kind.token().to_string(),
                target: g.target,
                remaining: g.remaining,
            })
            .collect(),
        projectiles: snap
            .projectiles
            .iter()
            .map(|p| WireProjectile {
                x: p.x,
                y: p.y,
                direction: p.direction.as_str().to_string(),
            })
            .collect(),
    }
}

/// Serialize one message as a line (without the trailing newline).
pub fn to_line<T: Serialize>(msg: &T) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(line) => Some(line),
        Err(e) => {
            log::error!("failed to encode message: {}", e);
            None
        }
    }
}

/// Get current timestamp in milliseconds
fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, SessionState};

    #[test]
    fn test_parse_tap() {
        let parsed = parse_message(r#"{"type":"tap","seq":4,"x":1,"y":2}"#).unwrap();
        assert_eq!(
            parsed,
            ParsedMessage::Client(ClientMessage::Tap { seq: 4, x: 1, y: 2 })
        );
    }

    #[test]
    fn test_parse_hello_without_client_name() {
        let parsed = parse_message(r#"{"type":"hello","seq":1}"#).unwrap();
        assert_eq!(
            parsed,
            ParsedMessage::Client(ClientMessage::Hello {
                seq: 1,
                client: None,
                presentation: false,
            })
        );
    }

    #[test]
    fn test_parse_hello_as_presentation() {
        let parsed =
            parse_message(r#"{"type":"hello","seq":1,"client":"ui","presentation":true}"#).unwrap();
        assert_eq!(
            parsed,
            ParsedMessage::Client(ClientMessage::Hello {
                seq: 1,
                client: Some("ui".to_string()),
                presentation: true,
            })
        );
    }

    #[test]
    fn test_unknown_type_is_not_hard_error() {
        let parsed = parse_message(r#"{"type":"dance","seq":9}"#).unwrap();
        assert_eq!(parsed, ParsedMessage::Unknown(UnknownMessage { seq: 9 }));
    }

    #[test]
    fn test_known_type_with_bad_fields_is_error() {
        assert!(parse_message(r#"{"type":"tap","seq":3,"x":"a"}"#).is_err());
        assert!(parse_message("not json").is_err());
    }

    #[test]
    fn test_extract_seq_best_effort() {
        assert_eq!(extract_seq_best_effort(r#"{"seq": 42, "x":"#), Some(42));
        assert_eq!(extract_seq_best_effort(r#"{"x":1}"#), None);
    }

    #[test]
    fn test_wire_event_names_match_core_names() {
        let events = [
            GameEvent::GravityStarted,
            GameEvent::ProjectileLaunched {
                x: 1,
                y: 2,
                direction: Direction::Left,
            },
            GameEvent::GameStateChanged {
                from: SessionState::Playing,
                to: SessionState::GameWon,
            },
            GameEvent::ObstacleDestroyed {
                kind: ItemKind::Duck,
                x: 0,
                y: 5,
            },
        ];
        for event in &events {
            let value = serde_json::to_value(create_event(event)).unwrap();
            assert_eq!(value["type"], "event");
            assert_eq!(value["event"]["name"], event.name());
        }
        let value = serde_json::to_value(create_event(&events[3])).unwrap();
        assert_eq!(value["event"]["kind"], "du");
    }

    #[test]
    fn test_snapshot_rows_are_tokens() {
        let snap = SessionSnapshot {
            width: 2,
            height: 1,
            cells: vec![Some(ItemKind::Red), None],
            ..SessionSnapshot::default()
        };
        let msg = create_snapshot(&snap);
        assert_eq!(msg.rows, vec![vec!["r".to_string(), String::new()]]);
        assert_eq!(msg.state, "main_menu");
    }

    #[test]
    fn test_error_code_serialization() {
        let err = create_error(7, ErrorCode::StaleSeq, "seq must increase");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["code"], "stale_seq");
        assert_eq!(value["seq"], 7);
    }
}
