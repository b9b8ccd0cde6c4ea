//! Adapter runtime integration.
//!
//! Bridges the sync game loop with the async TCP server. The game loop owns
//! the [`Session`]; the server only ever sees serialized lines.

use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::core::{LevelError, Session, SubscriptionId, TapOutcome};
use crate::protocol::{create_ack, create_error, create_event, create_snapshot, to_line, ErrorCode};
use crate::server::{run_server, ServerConfig, ServerState};
use crate::types::{InputEvent, ItemKind};

/// Command delivered to the game loop.
#[derive(Debug, Clone)]
pub struct InboundCommand {
    pub client_id: usize,
    pub seq: u64,
    pub command: ClientCommand,
}

/// Command payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Queued after a handshake; answered with a snapshot. A presentation
    /// client takes over goal collection timing.
    Handshake {
        presentation: bool,
    },
    /// The last presentation client went away. Not answered.
    PresentationDetached,
    Tap {
        x: i32,
        y: i32,
    },
    Restart,
    NextLevel,
    GoalAnimationComplete {
        kind: ItemKind,
        x: i32,
        y: i32,
    },
}

/// Outbound message to be delivered by the server.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    ToClient { client_id: usize, line: String },
    /// Sent to every handshaken client.
    Broadcast { line: String },
}

/// What a command did to the session.
#[derive(Debug)]
pub enum CommandOutcome {
    Snapshot,
    Detached,
    Input(TapOutcome),
    Level(Result<(), LevelError>),
}

pub fn apply_command(session: &mut Session, command: &ClientCommand) -> CommandOutcome {
    match *command {
        ClientCommand::Handshake { presentation } => {
            if presentation {
                session.set_presentation_attached(true);
            }
            CommandOutcome::Snapshot
        }
        ClientCommand::PresentationDetached => {
            session.set_presentation_attached(false);
            CommandOutcome::Detached
        }
        ClientCommand::Tap { x, y } => CommandOutcome::Input(session.tap(x, y)),
        ClientCommand::Restart => CommandOutcome::Level(session.restart_level()),
        ClientCommand::NextLevel => CommandOutcome::Level(session.next_level()),
        ClientCommand::GoalAnimationComplete { kind, x, y } => CommandOutcome::Input(
            session.handle_input(InputEvent::GoalCollectionAnimationComplete { kind, x, y }),
        ),
    }
}

/// Apply one inbound command and build the reply line for its sender.
pub fn serve_command(session: &mut Session, inbound: &InboundCommand) -> Option<String> {
    match apply_command(session, &inbound.command) {
        CommandOutcome::Snapshot => to_line(&create_snapshot(&session.snapshot())),
        CommandOutcome::Detached => None,
        CommandOutcome::Input(outcome) => to_line(&create_ack(
            inbound.seq,
            outcome.is_accepted(),
            outcome.as_str(),
        )),
        CommandOutcome::Level(Ok(())) => to_line(&create_ack(
            inbound.seq,
            true,
            TapOutcome::Accepted.as_str(),
        )),
        CommandOutcome::Level(Err(e)) => {
            log::warn!("client {} level command failed: {}", inbound.client_id, e);
            to_line(&create_error(inbound.seq, ErrorCode::LevelError, &e.to_string()))
        }
    }
}

/// Forward every session event as a broadcast `event` line.
pub fn stream_events(
    session: &mut Session,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
) -> SubscriptionId {
    session.subscribe(move |event| {
        if let Some(line) = to_line(&create_event(event)) {
            let _ = out_tx.send(OutboundMessage::Broadcast { line });
        }
    })
}

/// Running adapter instance.
pub struct Adapter {
    _rt: Runtime,
    cmd_rx: mpsc::Receiver<InboundCommand>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl Adapter {
    /// Start the adapter from environment variables.
    ///
    /// Returns None if `CUBE_BLAST_AI_DISABLED` is set or the runtime
    /// cannot be created.
    pub fn start_from_env() -> Option<Self> {
        if ServerState::is_disabled() {
            log::info!("adapter disabled via CUBE_BLAST_AI_DISABLED");
            return None;
        }
        Self::start(ServerConfig::from_env())
    }

    pub fn start(config: ServerConfig) -> Option<Self> {
        let max_pending = config.max_pending_commands.max(1);
        let (cmd_tx, cmd_rx) = mpsc::channel::<InboundCommand>(max_pending);
        let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();

        let rt = match Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                log::error!("failed to create tokio runtime: {}", e);
                return None;
            }
        };
        rt.spawn(async move {
            if let Err(e) = run_server(config, cmd_tx, out_rx, None).await {
                log::error!("adapter server stopped: {}", e);
            }
        });

        Some(Self {
            _rt: rt,
            cmd_rx,
            out_tx,
        })
    }

    pub fn try_recv(&mut self) -> Option<InboundCommand> {
        self.cmd_rx.try_recv().ok()
    }

    pub fn send(&self, msg: OutboundMessage) {
        let _ = self.out_tx.send(msg);
    }

    /// Stream the session's events to connected clients.
    pub fn attach(&self, session: &mut Session) -> SubscriptionId {
        stream_events(session, self.out_tx.clone())
    }

    /// Apply every queued command and reply to each sender. Returns the
    /// number of commands served.
    pub fn serve_pending(&mut self, session: &mut Session) -> usize {
        let mut served = 0;
        while let Some(inbound) = self.try_recv() {
            if let Some(line) = serve_command(session, &inbound) {
                self.send(OutboundMessage::ToClient {
                    client_id: inbound.client_id,
                    line,
                });
            }
            served += 1;
        }
        served
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LevelCatalog, LevelData, Rules};
    use crate::types::SessionState;

    fn session() -> Session {
        let level = LevelData::from_rows(
            1,
            5,
            &["r r g", "b y g"],
            &[(ItemKind::Red, 2)],
        );
        let mut session =
            Session::new(Rules::instant(), LevelCatalog::from_levels([level])).unwrap();
        session.start_level(1).unwrap();
        session
    }

    fn inbound(seq: u64, command: ClientCommand) -> InboundCommand {
        InboundCommand {
            client_id: 1,
            seq,
            command,
        }
    }

    #[test]
    fn test_tap_is_acked_with_outcome() {
        let mut session = session();
        let line = serve_command(&mut session, &inbound(2, ClientCommand::Tap { x: 2, y: 0 }))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "ack");
        assert_eq!(value["seq"], 2);
        assert_eq!(value["accepted"], true);
        assert_eq!(value["outcome"], "accepted");
    }

    #[test]
    fn test_single_cube_tap_is_rejected() {
        let mut session = session();
        let line = serve_command(&mut session, &inbound(3, ClientCommand::Tap { x: 1, y: 1 }))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["accepted"], false);
        assert_eq!(value["outcome"], "no_match");
    }

    #[test]
    fn test_snapshot_command_returns_board() {
        let mut session = session();
        let handshake = ClientCommand::Handshake {
            presentation: false,
        };
        let line = serve_command(&mut session, &inbound(1, handshake)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "snapshot");
        assert_eq!(value["state"], "playing");
        assert_eq!(value["rows"][0][0], "r");
        assert_eq!(value["moves"], 5);
    }

    #[test]
    fn test_events_are_broadcast() {
        let mut session = session();
        let (tx, mut rx) = mpsc::unbounded_channel();
        stream_events(&mut session, tx);
        session.restart_level().unwrap();

        let mut names = Vec::new();
        while let Ok(OutboundMessage::Broadcast { line }) = rx.try_recv() {
            let value: serde_json::Value = serde_json::from_str(&line).unwrap();
            names.push(value["event"]["name"].as_str().unwrap().to_string());
        }
        assert!(names.iter().any(|n| n == "level_started"));
        assert!(names.iter().any(|n| n == "grid_updated"));
    }

    #[test]
    fn test_goal_animation_without_presentation_has_no_effect() {
        let mut session = session();
        let outcome = apply_command(
            &mut session,
            &ClientCommand::GoalAnimationComplete {
                kind: ItemKind::Red,
                x: 0,
                y: 0,
            },
        );
        assert!(matches!(outcome, CommandOutcome::Input(TapOutcome::NoEffect)));
    }

    #[test]
    fn test_presentation_handshake_defers_goals_until_animation() {
        let mut session = session();
        serve_command(
            &mut session,
            &inbound(1, ClientCommand::Handshake { presentation: true }),
        );
        assert!(session.is_presentation_attached());

        serve_command(&mut session, &inbound(2, ClientCommand::Tap { x: 0, y: 0 }));
        for _ in 0..100 {
            session.tick(crate::types::TICK_MS);
        }
        assert_eq!(session.goals().remaining(ItemKind::Red), Some(2));
        assert!(session.is_busy());

        let collected = ClientCommand::GoalAnimationComplete {
            kind: ItemKind::Red,
            x: 0,
            y: 0,
        };
        for seq in 3..5 {
            let line = serve_command(&mut session, &inbound(seq, collected.clone())).unwrap();
            let value: serde_json::Value = serde_json::from_str(&line).unwrap();
            assert_eq!(value["outcome"], "accepted");
        }
        assert_eq!(session.goals().remaining(ItemKind::Red), Some(0));
        assert!(!session.is_busy());
        assert_eq!(session.state(), SessionState::Finished);
    }

    #[test]
    fn test_presentation_detach_releases_pending_goals() {
        let mut session = session();
        apply_command(&mut session, &ClientCommand::Handshake { presentation: true });
        apply_command(&mut session, &ClientCommand::Tap { x: 0, y: 0 });
        assert_eq!(session.goals().pending_animations(), 2);

        let detached = inbound(0, ClientCommand::PresentationDetached);
        let reply = serve_command(&mut session, &detached);
        assert!(reply.is_none());
        assert!(!session.is_presentation_attached());
        assert_eq!(session.goals().remaining(ItemKind::Red), Some(0));
    }

    #[test]
    fn test_next_level_while_playing_is_level_error() {
        let mut session = session();
        let line = serve_command(&mut session, &inbound(2, ClientCommand::NextLevel)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["code"], "level_error");
        assert_eq!(session.state(), SessionState::Playing);
        assert_eq!(session.level(), Some(1));
    }
}
