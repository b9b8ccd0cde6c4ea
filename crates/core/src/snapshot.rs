use crate::types::{Direction, ItemKind, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GoalSnapshot {
    pub kind: ItemKind,
    pub target: u32,
    pub remaining: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProjectileSnapshot {
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
}

/// Read-only view of a session for renderers and the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub level: Option<u32>,
    pub moves: u32,
    pub busy: bool,
    pub width: u8,
    pub height: u8,
    /// Visible cells, row-major from the top row.
    pub cells: Vec<Option<ItemKind>>,
    pub goals: Vec<GoalSnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
    pub now_ms: u64,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            state: SessionState::MainMenu,
            level: None,
            moves: 0,
            busy: false,
            width: 0,
            height: 0,
            cells: Vec::new(),
            goals: Vec::new(),
            projectiles: Vec::new(),
            now_ms: 0,
        }
    }
}

impl SessionSnapshot {
    pub fn clear(&mut self) {
        self.state = SessionState::MainMenu;
        self.level = None;
        self.moves = 0;
        self.busy = false;
        self.width = 0;
        self.height = 0;
        self.cells.clear();
        self.goals.clear();
        self.projectiles.clear();
        self.now_ms = 0;
    }

    pub fn cell(&self, x: i32, y: i32) -> Option<ItemKind> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        self.cells
            .get(y as usize * self.width as usize + x as usize)
            .copied()
            .flatten()
    }

    /// Taps would currently be accepted.
    pub fn playable(&self) -> bool {
        self.state == SessionState::Playing && !self.busy
    }
}
