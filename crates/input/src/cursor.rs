//! Board cursor for keyboard play.
//!
//! Stays inside the visible grid. Resizing the grid (a new level) clamps it
//! instead of resetting it.

use crate::types::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

impl Cursor {
    pub fn new(width: u8, height: u8) -> Self {
        let mut cursor = Self {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
        cursor.resize(width, height);
        // Start on the bottom row, where matches usually are.
        cursor.y = cursor.height - 1;
        cursor.x = (cursor.width - 1) / 2;
        cursor
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Move one cell. Returns false at an edge.
    pub fn step(&mut self, direction: Direction) -> bool {
        let (dx, dy) = direction.delta();
        let (nx, ny) = (self.x + dx, self.y + dy);
        if nx < 0 || ny < 0 || nx >= self.width || ny >= self.height {
            return false;
        }
        self.x = nx;
        self.y = ny;
        true
    }

    pub fn resize(&mut self, width: u8, height: u8) {
        self.width = (width as i32).max(1);
        self.height = (height as i32).max(1);
        self.x = self.x.clamp(0, self.width - 1);
        self.y = self.y.clamp(0, self.height - 1);
    }

    /// Resize only when the dimensions differ.
    pub fn fit(&mut self, width: u8, height: u8) {
        if self.width != (width as i32).max(1) || self.height != (height as i32).max(1) {
            self.resize(width, height);
        }
    }
}
