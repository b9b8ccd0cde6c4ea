//! GameView: maps a [`SessionSnapshot`] into a terminal framebuffer.
//!
//! This module is pure (no I/O). It can be unit-tested.

use crate::core::snapshot::SessionSnapshot;
use crate::fb::{CellStyle, FrameBuffer, Rgb};
use crate::types::{ItemKind, SessionState};

/// Terminal viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterStatusView {
    pub port: u16,
}

/// Front-end state drawn on top of the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hud {
    /// Visible cell under the keyboard cursor.
    pub cursor: Option<(i32, i32)>,
    pub adapter: Option<AdapterStatusView>,
}

const BOARD_BG: Rgb = Rgb::new(28, 28, 38);
const PANEL_BG: Rgb = Rgb::new(0, 0, 0);
const CURSOR_BG: Rgb = Rgb::new(90, 90, 120);

/// A lightweight terminal renderer for the cube-blast board.
pub struct GameView {
    /// Board cell width in terminal columns.
    cell_w: u16,
}

impl Default for GameView {
    fn default() -> Self {
        // 2 columns per cell roughly squares the glyph aspect ratio.
        Self { cell_w: 2 }
    }
}

impl GameView {
    pub fn new(cell_w: u16) -> Self {
        Self {
            cell_w: cell_w.max(1),
        }
    }

    /// Render into an existing framebuffer, resizing it to the viewport.
    pub fn render_into(&self, snap: &SessionSnapshot, hud: &Hud, viewport: Viewport, fb: &mut FrameBuffer) {
        fb.resize(viewport.width, viewport.height);
        fb.clear(CellStyle::default().cell(' '));

        if snap.state == SessionState::MainMenu || snap.width == 0 {
            self.draw_menu(fb, snap, hud, viewport);
            return;
        }

        let frame_w = snap.width as u16 * self.cell_w + 2;
        let frame_h = snap.height as u16 + 2;
        let start_x = viewport.width.saturating_sub(frame_w + PANEL_W) / 2;
        let start_y = viewport.height.saturating_sub(frame_h) / 2;

        let border = CellStyle::fg(Rgb::new(200, 200, 200), PANEL_BG);
        fb.draw_box(start_x, start_y, frame_w, frame_h, border);

        for y in 0..snap.height as i32 {
            for x in 0..snap.width as i32 {
                let (glyph, mut style) = match snap.cell(x, y) {
                    Some(kind) => item_glyph(kind),
                    None => ("· ", CellStyle::fg(Rgb::new(80, 80, 95), BOARD_BG).dim()),
                };
                if hud.cursor == Some((x, y)) {
                    style.bg = CURSOR_BG;
                }
                self.put_cell(fb, start_x, start_y, x, y, glyph, style);
            }
        }

        for p in &snap.projectiles {
            if p.x >= 0 && p.y >= 0 && p.x < snap.width as i32 && p.y < snap.height as i32 {
                let style = CellStyle::fg(Rgb::new(255, 240, 150), BOARD_BG).bold();
                self.put_cell(fb, start_x, start_y, p.x, p.y, "**", style);
            }
        }

        self.draw_side_panel(fb, snap, hud, start_x + frame_w + 2, start_y, viewport);

        if let Some(text) = overlay_text(snap.state) {
            let style = CellStyle::fg(Rgb::new(255, 255, 255), PANEL_BG).bold();
            let mid_y = start_y + frame_h / 2;
            fb.put_str_centered(start_x, frame_w, mid_y, text, style);
            if let Some(hint) = overlay_hint(snap.state) {
                let dim = CellStyle::fg(Rgb::new(200, 200, 200), PANEL_BG);
                fb.put_str_centered(start_x, frame_w, mid_y + 1, hint, dim);
            }
        }
    }

    /// Convenience helper that allocates a new framebuffer.
    pub fn render(&self, snap: &SessionSnapshot, hud: &Hud, viewport: Viewport) -> FrameBuffer {
        let mut fb = FrameBuffer::new(viewport.width, viewport.height);
        self.render_into(snap, hud, viewport, &mut fb);
        fb
    }

    /// Screen position of the left column of visible cell `(x, y)`.
    pub fn cell_origin(&self, snap: &SessionSnapshot, viewport: Viewport, x: i32, y: i32) -> (u16, u16) {
        let frame_w = snap.width as u16 * self.cell_w + 2;
        let frame_h = snap.height as u16 + 2;
        let start_x = viewport.width.saturating_sub(frame_w + PANEL_W) / 2;
        let start_y = viewport.height.saturating_sub(frame_h) / 2;
        (
            start_x + 1 + x as u16 * self.cell_w,
            start_y + 1 + y as u16,
        )
    }

    fn put_cell(&self, fb: &mut FrameBuffer, start_x: u16, start_y: u16, x: i32, y: i32, glyph: &str, style: CellStyle) {
        let px = start_x + 1 + x as u16 * self.cell_w;
        let py = start_y + 1 + y as u16;
        fb.fill_rect(px, py, self.cell_w, 1, ' ', style);
        for (i, ch) in glyph.chars().take(self.cell_w as usize).enumerate() {
            fb.put_char(px + i as u16, py, ch, style);
        }
    }

    fn draw_side_panel(
        &self,
        fb: &mut FrameBuffer,
        snap: &SessionSnapshot,
        hud: &Hud,
        panel_x: u16,
        start_y: u16,
        viewport: Viewport,
    ) {
        if panel_x >= viewport.width {
            return;
        }
        let label = CellStyle::fg(Rgb::new(220, 220, 220), PANEL_BG).bold();
        let value = CellStyle::fg(Rgb::new(200, 200, 200), PANEL_BG);

        let mut y = start_y;
        fb.put_str(panel_x, y, "LEVEL", label);
        y += 1;
        match snap.level {
            Some(level) => fb.put_u32(panel_x, y, level, value),
            None => fb.put_str(panel_x, y, "-", value),
        };
        y += 2;

        fb.put_str(panel_x, y, "MOVES", label);
        y += 1;
        fb.put_u32(panel_x, y, snap.moves, value);
        y += 2;

        fb.put_str(panel_x, y, "GOALS", label);
        y += 1;
        for goal in &snap.goals {
            let (glyph, style) = item_glyph(goal.kind);
            let x = fb.put_str(panel_x, y, glyph, CellStyle { bg: PANEL_BG, ..style });
            let x = fb.put_str(x + 1, y, goal.kind.as_str(), value);
            let done = goal.remaining == 0;
            if done {
                fb.put_str(x + 1, y, "ok", value.dim());
            } else {
                fb.put_u32(x + 1, y, goal.remaining, value);
            }
            y += 1;
        }
        y += 1;

        fb.put_str(panel_x, y, "AI", label);
        y += 1;
        match hud.adapter {
            Some(status) => {
                let x = fb.put_str(panel_x, y, "ON :", value);
                fb.put_u32(x, y, status.port as u32, value);
            }
            None => {
                fb.put_str(panel_x, y, "OFF", value);
            }
        }
        y += 2;

        if snap.busy {
            fb.put_str(panel_x, y, "...", value.dim());
        }
    }

    fn draw_menu(&self, fb: &mut FrameBuffer, snap: &SessionSnapshot, hud: &Hud, viewport: Viewport) {
        let title = CellStyle::fg(Rgb::new(255, 200, 80), PANEL_BG).bold();
        let text = CellStyle::default();
        let mid = viewport.height / 2;
        let heading = if snap.state == SessionState::Finished {
            "ALL LEVELS COMPLETE"
        } else {
            "CUBE BLAST"
        };
        fb.put_str_centered(0, viewport.width, mid.saturating_sub(2), heading, title);
        fb.put_str_centered(0, viewport.width, mid, "n: play   q: quit", text);
        if let Some(status) = hud.adapter {
            let mut line = String::from("AI on port ");
            line.push_str(&status.port.to_string());
            fb.put_str_centered(0, viewport.width, mid + 2, &line, text.dim());
        }
    }
}

/// Width of the side panel, used when centering the board.
const PANEL_W: u16 = 22;

fn item_glyph(kind: ItemKind) -> (&'static str, CellStyle) {
    let (glyph, fg) = match kind {
        ItemKind::Red => ("██", Rgb::new(220, 70, 70)),
        ItemKind::Green => ("██", Rgb::new(90, 200, 100)),
        ItemKind::Blue => ("██", Rgb::new(80, 130, 230)),
        ItemKind::Yellow => ("██", Rgb::new(240, 210, 70)),
        ItemKind::Purple => ("██", Rgb::new(170, 100, 220)),
        ItemKind::HorizontalRocket => ("◀▶", Rgb::new(255, 150, 40)),
        ItemKind::VerticalRocket => ("▲▼", Rgb::new(255, 150, 40)),
        ItemKind::Balloon => ("()", Rgb::new(240, 120, 200)),
        ItemKind::Duck => ("d>", Rgb::new(250, 230, 90)),
    };
    (glyph, CellStyle::fg(fg, BOARD_BG).bold())
}

fn overlay_text(state: SessionState) -> Option<&'static str> {
    match state {
        SessionState::Paused => Some("PAUSED"),
        SessionState::GameWon => Some("LEVEL COMPLETE"),
        SessionState::GameLost => Some("OUT OF MOVES"),
        SessionState::Finished => Some("ALL LEVELS COMPLETE"),
        SessionState::MainMenu | SessionState::Playing => None,
    }
}

fn overlay_hint(state: SessionState) -> Option<&'static str> {
    match state {
        SessionState::Paused => Some("p: resume"),
        SessionState::GameWon => Some("n: next"),
        SessionState::GameLost => Some("r: retry"),
        _ => None,
    }
}
