//! Grid module - item storage and cell bookkeeping
//!
//! The grid is `width` columns by `buffer_rows + height + collection_rows`
//! rows. Public coordinates are visible coordinates: buffer rows have negative
//! `y`, collection rows have `y >= height`.
//!
//! Items live in a generational arena. A cell stores an [`ItemId`]; the item
//! stores its current cell. Both links are only ever changed together, so a
//! destroyed item can never be reached through a stale cell and a stale id
//! never resolves to a newer item occupying the same slot.

use arrayvec::ArrayVec;

use crate::types::ItemKind;

/// A cell position in visible coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellPos {
    pub x: i32,
    pub y: i32,
}

impl CellPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Stable handle to an item. Invalidated when the item is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub kind: ItemKind,
    pub health: u8,
    /// Current cell, `None` while detached (mid-move or about to be destroyed).
    pub cell: Option<CellPos>,
    /// Session time at creation; gates buffer-row falls.
    pub spawned_at_ms: u64,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    item: Option<Item>,
}

#[derive(Debug, Clone)]
pub struct Grid {
    width: u8,
    height: u8,
    buffer_rows: u8,
    collection_rows: u8,
    /// Row-major over all rows, buffer rows first.
    cells: Vec<Option<ItemId>>,
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Grid {
    pub fn new(width: u8, height: u8, buffer_rows: u8, collection_rows: u8) -> Self {
        let rows = buffer_rows as usize + height as usize + collection_rows as usize;
        Self {
            width,
            height,
            buffer_rows,
            collection_rows,
            cells: vec![None; width as usize * rows],
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Drop every item and resize the visible area.
    pub fn reinitialize(&mut self, width: u8, height: u8) {
        *self = Self::new(width, height, self.buffer_rows, self.collection_rows);
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn buffer_rows(&self) -> u8 {
        self.buffer_rows
    }

    pub fn collection_rows(&self) -> u8 {
        self.collection_rows
    }

    /// Smallest valid `y` (top buffer row).
    pub fn top_y(&self) -> i32 {
        -(self.buffer_rows as i32)
    }

    /// Largest valid `y` (bottom collection row).
    pub fn bottom_y(&self) -> i32 {
        self.height as i32 + self.collection_rows as i32 - 1
    }

    #[inline(always)]
    fn index(&self, pos: CellPos) -> Option<usize> {
        if !self.contains(pos) {
            return None;
        }
        let row = (pos.y + self.buffer_rows as i32) as usize;
        Some(row * self.width as usize + pos.x as usize)
    }

    /// Any row, buffer and collection included.
    pub fn contains(&self, pos: CellPos) -> bool {
        pos.x >= 0 && pos.x < self.width as i32 && pos.y >= self.top_y() && pos.y <= self.bottom_y()
    }

    pub fn is_visible(&self, pos: CellPos) -> bool {
        pos.x >= 0 && pos.x < self.width as i32 && pos.y >= 0 && pos.y < self.height as i32
    }

    pub fn is_buffer_row(&self, y: i32) -> bool {
        y < 0 && y >= self.top_y()
    }

    pub fn is_collection_row(&self, y: i32) -> bool {
        y >= self.height as i32 && y <= self.bottom_y()
    }

    pub fn item_at(&self, pos: CellPos) -> Option<ItemId> {
        self.index(pos).and_then(|idx| self.cells[idx])
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.item.as_ref())
    }

    pub(crate) fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.item.as_mut())
    }

    pub fn kind_at(&self, pos: CellPos) -> Option<ItemKind> {
        self.item_at(pos)
            .and_then(|id| self.item(id))
            .map(|item| item.kind)
    }

    /// In bounds and unoccupied.
    pub fn is_empty(&self, pos: CellPos) -> bool {
        matches!(self.index(pos), Some(idx) if self.cells[idx].is_none())
    }

    /// Whether `kind` may rest at `pos`. Collection rows only hold ducks.
    pub fn accepts(&self, pos: CellPos, kind: ItemKind) -> bool {
        self.contains(pos) && (!self.is_collection_row(pos.y) || kind.is_duck())
    }

    /// Create an item and place it. Returns `None` if the cell is out of
    /// bounds, occupied, or does not accept the kind.
    pub fn spawn(&mut self, kind: ItemKind, pos: CellPos, now_ms: u64) -> Option<ItemId> {
        if !self.is_empty(pos) || !self.accepts(pos, kind) {
            return None;
        }
        let item = Item {
            kind,
            health: kind.max_health(),
            cell: None,
            spawned_at_ms: now_ms,
        };
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.item = Some(item);
                ItemId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    item: Some(item),
                });
                ItemId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };
        self.set_item(pos, id);
        Some(id)
    }

    /// Attach a live item to an empty cell, detaching it from its previous
    /// cell first. Returns false (and changes nothing) if the item is gone
    /// or the cell cannot take it.
    pub fn set_item(&mut self, pos: CellPos, id: ItemId) -> bool {
        let Some(kind) = self.item(id).map(|item| item.kind) else {
            return false;
        };
        if !self.is_empty(pos) || !self.accepts(pos, kind) {
            return false;
        }
        self.detach(id);
        if let Some(idx) = self.index(pos) {
            self.cells[idx] = Some(id);
        }
        if let Some(item) = self.item_mut(id) {
            item.cell = Some(pos);
        }
        true
    }

    /// Clear a cell, leaving its item alive but detached.
    pub fn take_item(&mut self, pos: CellPos) -> Option<ItemId> {
        let idx = self.index(pos)?;
        let id = self.cells[idx].take()?;
        if let Some(item) = self.item_mut(id) {
            item.cell = None;
        }
        Some(id)
    }

    /// Move the item at `from` to the empty cell `to`.
    pub fn move_item(&mut self, from: CellPos, to: CellPos) -> bool {
        match self.item_at(from) {
            Some(id) => self.set_item(to, id),
            None => false,
        }
    }

    /// Remove an item from the grid and the arena. Returns the final state
    /// (with `cell` still naming where it was), or `None` for stale ids.
    pub fn destroy(&mut self, id: ItemId) -> Option<Item> {
        let cell = self.item(id)?.cell;
        self.detach(id);
        let slot = self.slots.get_mut(id.index as usize)?;
        let mut item = slot.item.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        item.cell = cell;
        Some(item)
    }

    pub fn remove_at(&mut self, pos: CellPos) -> Option<Item> {
        let id = self.item_at(pos)?;
        self.destroy(id)
    }

    fn detach(&mut self, id: ItemId) {
        let Some(old) = self.item(id).and_then(|item| item.cell) else {
            return;
        };
        if let Some(idx) = self.index(old) {
            if self.cells[idx] == Some(id) {
                self.cells[idx] = None;
            }
        }
        if let Some(item) = self.item_mut(id) {
            item.cell = None;
        }
    }

    /// Orthogonal visible neighbours of a cell.
    pub fn adjacent(&self, pos: CellPos) -> ArrayVec<CellPos, 4> {
        let mut out = ArrayVec::new();
        for (dx, dy) in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
            let next = pos.offset(dx, dy);
            if self.is_visible(next) {
                out.push(next);
            }
        }
        out
    }

    /// Visible cells, row by row from the top.
    pub fn visible_cells(&self) -> impl Iterator<Item = CellPos> + '_ {
        (0..self.height as i32)
            .flat_map(move |y| (0..self.width as i32).map(move |x| CellPos::new(x, y)))
    }

    /// Number of live items, detached ones included.
    pub fn item_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.item.is_some()).count()
    }

    /// Every occupied cell points at a live item that points back, and every
    /// attached item is referenced by exactly its own cell.
    pub fn links_consistent(&self) -> bool {
        let width = self.width as i32;
        for (idx, cell) in self.cells.iter().enumerate() {
            let Some(id) = cell else { continue };
            let pos = CellPos::new(
                idx as i32 % width,
                idx as i32 / width - self.buffer_rows as i32,
            );
            match self.item(*id) {
                Some(item) if item.cell == Some(pos) => {}
                _ => return false,
            }
        }
        self.slots.iter().enumerate().all(|(index, slot)| {
            match slot.item.as_ref().and_then(|item| item.cell) {
                Some(pos) => {
                    self.item_at(pos)
                        == Some(ItemId {
                            index: index as u32,
                            generation: slot.generation,
                        })
                }
                None => true,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid {
        Grid::new(4, 3, 1, 1)
    }

    #[test]
    fn test_row_classification() {
        let g = grid();
        assert_eq!(g.top_y(), -1);
        assert_eq!(g.bottom_y(), 3);
        assert!(g.is_buffer_row(-1));
        assert!(!g.is_buffer_row(0));
        assert!(g.is_collection_row(3));
        assert!(!g.is_collection_row(2));
        assert!(g.contains(CellPos::new(0, -1)));
        assert!(!g.contains(CellPos::new(0, -2)));
        assert!(!g.is_visible(CellPos::new(0, 3)));
    }

    #[test]
    fn test_spawn_and_destroy_keep_links() {
        let mut g = grid();
        let pos = CellPos::new(1, 1);
        let id = g.spawn(ItemKind::Red, pos, 0).unwrap();
        assert_eq!(g.kind_at(pos), Some(ItemKind::Red));
        assert!(g.links_consistent());

        let item = g.destroy(id).unwrap();
        assert_eq!(item.cell, Some(pos));
        assert!(g.is_empty(pos));
        assert!(g.item(id).is_none());
        assert!(g.links_consistent());
    }

    #[test]
    fn test_stale_id_does_not_alias_reused_slot() {
        let mut g = grid();
        let old = g.spawn(ItemKind::Red, CellPos::new(0, 0), 0).unwrap();
        g.destroy(old);
        let new = g.spawn(ItemKind::Blue, CellPos::new(0, 0), 0).unwrap();
        assert_ne!(old, new);
        assert!(g.item(old).is_none());
        assert!(g.destroy(old).is_none());
        assert_eq!(g.kind_at(CellPos::new(0, 0)), Some(ItemKind::Blue));
    }

    #[test]
    fn test_occupied_and_out_of_bounds_are_no_ops() {
        let mut g = grid();
        assert!(g.spawn(ItemKind::Red, CellPos::new(0, 0), 0).is_some());
        assert!(g.spawn(ItemKind::Blue, CellPos::new(0, 0), 0).is_none());
        assert!(g.spawn(ItemKind::Blue, CellPos::new(9, 0), 0).is_none());
        assert!(g.take_item(CellPos::new(-1, 0)).is_none());
        assert!(g.remove_at(CellPos::new(2, 2)).is_none());
    }

    #[test]
    fn test_collection_row_only_takes_ducks() {
        let mut g = grid();
        assert!(g.spawn(ItemKind::Red, CellPos::new(0, 3), 0).is_none());
        assert!(g.spawn(ItemKind::Duck, CellPos::new(0, 3), 0).is_some());
    }

    #[test]
    fn test_move_item_updates_both_links() {
        let mut g = grid();
        let id = g.spawn(ItemKind::Green, CellPos::new(2, -1), 0).unwrap();
        assert!(g.move_item(CellPos::new(2, -1), CellPos::new(2, 2)));
        assert!(g.is_empty(CellPos::new(2, -1)));
        assert_eq!(g.item(id).unwrap().cell, Some(CellPos::new(2, 2)));
        assert!(g.links_consistent());
    }

    #[test]
    fn test_adjacent_is_visible_only() {
        let g = grid();
        let corner = g.adjacent(CellPos::new(0, 0));
        assert_eq!(corner.len(), 2);
        let middle = g.adjacent(CellPos::new(1, 1));
        assert_eq!(middle.len(), 4);
        let bottom = g.adjacent(CellPos::new(1, 2));
        assert!(!bottom.contains(&CellPos::new(1, 3)));
    }

    #[test]
    fn test_reinitialize_clears_everything() {
        let mut g = grid();
        g.spawn(ItemKind::Red, CellPos::new(0, 0), 0);
        g.reinitialize(6, 5);
        assert_eq!(g.width(), 6);
        assert_eq!(g.height(), 5);
        assert_eq!(g.item_count(), 0);
        assert_eq!(g.visible_cells().count(), 30);
    }
}
