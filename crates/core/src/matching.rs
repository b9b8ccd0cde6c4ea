//! Match resolver - flood fill, clearing and rocket creation
//!
//! A tap on a cube clears its 4-connected same-colour group when the group is
//! at least `min_match_size` cubes. Groups of `rocket_match_size` or more leave
//! a rocket of random orientation in the tapped cell. Obstacles bordering the
//! group take one `AdjacentBlast` hit each, however many group cells touch them.

use std::collections::VecDeque;

use crate::config::Rules;
use crate::damage::hit_cell;
use crate::grid::{CellPos, Grid};
use crate::rng::BlastRng;
use crate::types::{DamageSource, GameEvent, ItemKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub kind: ItemKind,
    pub size: usize,
    /// Kind of rocket created at the tapped cell, if any.
    pub rocket: Option<ItemKind>,
}

#[derive(Debug, Clone)]
pub struct MatchResolver {
    min_match_size: usize,
    rocket_match_size: usize,
}

impl MatchResolver {
    pub fn new(rules: &Rules) -> Self {
        Self {
            min_match_size: rules.min_match_size,
            rocket_match_size: rules.rocket_match_size,
        }
    }

    pub fn min_match_size(&self) -> usize {
        self.min_match_size
    }

    /// Visible cells 4-connected to `origin` holding the same cube colour,
    /// in breadth-first order starting with `origin`. Empty for non-cubes.
    pub fn find_group(&self, grid: &Grid, origin: CellPos) -> Vec<CellPos> {
        let mut group = Vec::new();
        if !grid.is_visible(origin) {
            return group;
        }
        let Some(kind) = grid.kind_at(origin).filter(|k| k.is_cube()) else {
            return group;
        };

        let width = grid.width() as usize;
        let mut visited = vec![false; width * grid.height() as usize];
        let slot = |p: CellPos| p.y as usize * width + p.x as usize;

        let mut queue = VecDeque::new();
        visited[slot(origin)] = true;
        queue.push_back(origin);
        while let Some(pos) = queue.pop_front() {
            group.push(pos);
            for next in grid.adjacent(pos) {
                if visited[slot(next)] || grid.kind_at(next) != Some(kind) {
                    continue;
                }
                visited[slot(next)] = true;
                queue.push_back(next);
            }
        }
        group
    }

    /// Resolve a tap on `origin`. Returns `None` (and touches nothing) when
    /// the cell holds no cube or its group is below the match threshold.
    pub fn resolve(
        &self,
        grid: &mut Grid,
        origin: CellPos,
        rng: &mut BlastRng,
        now_ms: u64,
        events: &mut Vec<GameEvent>,
    ) -> Option<MatchResult> {
        let kind = grid.kind_at(origin).filter(|k| k.is_cube())?;
        let group = self.find_group(grid, origin);
        if group.len() < self.min_match_size {
            return None;
        }
        let size = group.len();
        events.push(GameEvent::MatchFound { kind, size });

        let mut obstacles: Vec<CellPos> = Vec::new();
        for pos in &group {
            for next in grid.adjacent(*pos) {
                let is_obstacle = grid.kind_at(next).is_some_and(|k| k.is_obstacle());
                if is_obstacle && !obstacles.contains(&next) {
                    obstacles.push(next);
                }
            }
        }

        for pos in &group {
            if let Some(item) = grid.remove_at(*pos) {
                events.push(GameEvent::ItemDestroyed {
                    kind: item.kind,
                    x: pos.x,
                    y: pos.y,
                });
            }
        }

        let mut rocket = None;
        if size >= self.rocket_match_size {
            let rocket_kind = ItemKind::rocket(rng.axis());
            if grid.spawn(rocket_kind, origin, now_ms).is_some() {
                events.push(GameEvent::ItemSpawned {
                    kind: rocket_kind,
                    x: origin.x,
                    y: origin.y,
                });
                events.push(GameEvent::RocketCreated {
                    kind: rocket_kind,
                    x: origin.x,
                    y: origin.y,
                });
                rocket = Some(rocket_kind);
            }
        }

        for pos in obstacles {
            hit_cell(grid, pos, DamageSource::AdjacentBlast, events);
        }

        log::debug!(
            "match {} x{} at ({}, {}) rocket={:?}",
            kind.as_str(),
            size,
            origin.x,
            origin.y,
            rocket
        );
        events.push(GameEvent::MatchProcessed {
            kind,
            size,
            rocket_created: rocket.is_some(),
        });
        Some(MatchResult { kind, size, rocket })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(grid: &mut Grid, rows: &[&str]) {
        for (y, row) in rows.iter().enumerate() {
            for (x, token) in row.split_whitespace().enumerate() {
                if let Some(kind) = ItemKind::from_token(token) {
                    grid.spawn(kind, CellPos::new(x as i32, y as i32), 0);
                }
            }
        }
    }

    fn destroyed(events: &[GameEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, GameEvent::ItemDestroyed { .. }))
            .count()
    }

    #[test]
    fn test_flood_fill_is_orthogonal_only() {
        let mut grid = Grid::new(3, 3, 1, 1);
        fill(&mut grid, &["r g r", "g r g", "r g r"]);
        let resolver = MatchResolver::new(&Rules::default());
        assert_eq!(resolver.find_group(&grid, CellPos::new(1, 1)).len(), 1);
        assert_eq!(resolver.find_group(&grid, CellPos::new(1, 0)).len(), 1);
    }

    #[test]
    fn test_below_threshold_changes_nothing() {
        let mut grid = Grid::new(3, 1, 1, 1);
        fill(&mut grid, &["r g b"]);
        let resolver = MatchResolver::new(&Rules::default());
        let mut rng = BlastRng::new(1);
        let mut events = Vec::new();

        let out = resolver.resolve(&mut grid, CellPos::new(0, 0), &mut rng, 0, &mut events);
        assert!(out.is_none());
        assert!(events.is_empty());
        assert_eq!(grid.item_count(), 3);
    }

    #[test]
    fn test_pair_clears_without_rocket() {
        let mut grid = Grid::new(3, 1, 1, 1);
        fill(&mut grid, &["b b g"]);
        let resolver = MatchResolver::new(&Rules::default());
        let mut rng = BlastRng::new(1);
        let mut events = Vec::new();

        let out = resolver
            .resolve(&mut grid, CellPos::new(1, 0), &mut rng, 0, &mut events)
            .unwrap();
        assert_eq!(out.size, 2);
        assert_eq!(out.rocket, None);
        assert_eq!(destroyed(&events), 2);
        assert_eq!(grid.item_count(), 1);
        assert!(matches!(
            events.last(),
            Some(GameEvent::MatchProcessed {
                rocket_created: false,
                ..
            })
        ));
    }

    #[test]
    fn test_four_group_leaves_rocket_at_tap() {
        let mut grid = Grid::new(2, 2, 1, 1);
        fill(&mut grid, &["y y", "y y"]);
        let resolver = MatchResolver::new(&Rules::default());
        let mut rng = BlastRng::new(9);
        let mut events = Vec::new();

        let tap = CellPos::new(1, 1);
        let out = resolver
            .resolve(&mut grid, tap, &mut rng, 0, &mut events)
            .unwrap();
        let rocket = out.rocket.unwrap();
        assert!(rocket.is_rocket());
        assert_eq!(grid.kind_at(tap), Some(rocket));
        assert_eq!(grid.item_count(), 1);
        assert_eq!(destroyed(&events), 4);
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::RocketCreated { x: 1, y: 1, .. })));
    }

    #[test]
    fn test_adjacent_balloon_hit_once() {
        let mut grid = Grid::new(3, 2, 1, 1);
        fill(&mut grid, &["r r r", "g ba g"]);
        let resolver = MatchResolver::new(&Rules::default());
        let mut rng = BlastRng::new(1);
        let mut events = Vec::new();

        resolver.resolve(&mut grid, CellPos::new(0, 0), &mut rng, 0, &mut events);
        let popped = events
            .iter()
            .filter(|e| matches!(e, GameEvent::ObstacleDestroyed { .. }))
            .count();
        assert_eq!(popped, 1);
        assert!(grid.is_empty(CellPos::new(1, 1)));
        assert!(grid.links_consistent());
    }

    #[test]
    fn test_duck_ignores_adjacent_blast() {
        let mut grid = Grid::new(3, 2, 1, 1);
        fill(&mut grid, &["r r r", "g du g"]);
        let resolver = MatchResolver::new(&Rules::default());
        let mut rng = BlastRng::new(1);
        let mut events = Vec::new();

        resolver.resolve(&mut grid, CellPos::new(2, 0), &mut rng, 0, &mut events);
        assert_eq!(grid.kind_at(CellPos::new(1, 1)), Some(ItemKind::Duck));
    }

    #[test]
    fn test_tapping_non_cube_is_rejected() {
        let mut grid = Grid::new(2, 1, 1, 1);
        fill(&mut grid, &["ba ba"]);
        let resolver = MatchResolver::new(&Rules::default());
        let mut rng = BlastRng::new(1);
        let mut events = Vec::new();
        assert!(resolver
            .resolve(&mut grid, CellPos::new(0, 0), &mut rng, 0, &mut events)
            .is_none());
        assert!(resolver
            .resolve(&mut grid, CellPos::new(0, 5), &mut rng, 0, &mut events)
            .is_none());
    }
}
