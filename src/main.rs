//! Terminal Cube Blast runner (default binary).
//!
//! Loads the level catalog, optionally starts the TCP adapter, and drives a
//! [`Session`] at a fixed timestep while drawing it with the framebuffer
//! renderer.

mod logging;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use crossterm::event::{self, Event, KeyEventKind};

use cube_blast::adapter::{Adapter, ServerConfig};
use cube_blast::core::{LevelCatalog, LevelError, Rules, Session, SessionSnapshot};
use cube_blast::input::{handle_key_event, should_quit, Cursor, UiCommand};
use cube_blast::term::{AdapterStatusView, FrameBuffer, GameView, Hud, TerminalRenderer, Viewport};
use cube_blast::types::{SessionState, TICK_MS};

fn main() -> Result<()> {
    logging::init_from_env()?;

    let dir = std::env::var("CUBE_BLAST_LEVELS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("levels"));
    let catalog = LevelCatalog::load_dir(&dir)
        .with_context(|| format!("loading levels from {}", dir.display()))?;
    if catalog.is_empty() {
        bail!("no levels found in {}", dir.display());
    }

    let mut session = Session::new(Rules::from_env(), catalog)?;

    let mut adapter = Adapter::start_from_env();
    let adapter_status = adapter.as_ref().map(|a| {
        a.attach(&mut session);
        AdapterStatusView {
            port: ServerConfig::from_env().port,
        }
    });

    let mut term = TerminalRenderer::new();
    term.enter()?;

    let result = run(&mut term, &mut session, adapter.as_mut(), adapter_status);

    // Always try to restore terminal state.
    let _ = term.exit();
    log::logger().flush();
    result
}

fn run(
    term: &mut TerminalRenderer,
    session: &mut Session,
    mut adapter: Option<&mut Adapter>,
    adapter_status: Option<AdapterStatusView>,
) -> Result<()> {
    let view = GameView::default();
    let mut fb = FrameBuffer::new(0, 0);
    let mut snap = SessionSnapshot::default();
    let mut cursor = Cursor::new(0, 0);

    let tick_duration = Duration::from_millis(TICK_MS as u64);
    let mut last_tick = Instant::now();

    loop {
        // Render.
        session.snapshot_into(&mut snap);
        cursor.fit(snap.width, snap.height);
        let hud = Hud {
            cursor: (snap.state == SessionState::Playing).then(|| cursor.position()),
            adapter: adapter_status,
        };
        let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
        view.render_into(&snap, &hud, Viewport::new(w, h), &mut fb);
        term.present(&fb)?;

        // Input with timeout until next tick.
        let timeout = tick_duration
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if should_quit(key) {
                        return Ok(());
                    }
                    if let Some(command) = handle_key_event(key) {
                        apply_ui_command(session, &mut cursor, command);
                    }
                }
                Event::Resize(..) => term.invalidate(),
                _ => {}
            }
        }

        // Tick.
        if last_tick.elapsed() >= tick_duration {
            last_tick = Instant::now();
            if let Some(adapter) = adapter.as_deref_mut() {
                adapter.serve_pending(session);
            }
            session.tick(TICK_MS);
        }
    }
}

fn apply_ui_command(session: &mut Session, cursor: &mut Cursor, command: UiCommand) {
    match command {
        UiCommand::MoveCursor(direction) => {
            cursor.step(direction);
        }
        UiCommand::Tap => {
            let (x, y) = cursor.position();
            let outcome = session.tap(x, y);
            log::debug!("tap ({}, {}): {}", x, y, outcome.as_str());
        }
        UiCommand::Pause => {
            if !session.pause() {
                session.resume();
            }
        }
        UiCommand::Restart => report(session.restart_level()),
        UiCommand::NextLevel => match session.state() {
            SessionState::GameWon => report(session.next_level()),
            SessionState::MainMenu | SessionState::Finished => {
                // Resume at the first level not yet won.
                let catalog = session.catalog();
                let start = catalog
                    .numbers()
                    .find(|n| !session.is_completed(*n))
                    .or_else(|| catalog.first());
                if let Some(number) = start {
                    report(session.start_level(number));
                }
            }
            _ => {}
        },
        UiCommand::MainMenu => session.return_to_main_menu(),
    }
}

fn report(result: Result<(), LevelError>) {
    if let Err(e) = result {
        log::warn!("level change failed: {}", e);
    }
}
