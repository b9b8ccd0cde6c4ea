//! Damage application shared by the match and explosion resolvers.

use crate::grid::{CellPos, Grid, ItemId};
use crate::types::{DamageSource, GameEvent, ItemKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    Empty,
    Destroyed(ItemKind),
    Damaged { kind: ItemKind, health: u8 },
    /// The item ignores this source.
    Immune(ItemKind),
    /// A rocket was hit; the caller decides how to detonate it.
    Rocket(ItemId),
}

/// Apply one hit from `source` to whatever occupies `pos`.
pub fn hit_cell(
    grid: &mut Grid,
    pos: CellPos,
    source: DamageSource,
    events: &mut Vec<GameEvent>,
) -> HitOutcome {
    let Some(id) = grid.item_at(pos) else {
        return HitOutcome::Empty;
    };
    let Some(kind) = grid.item(id).map(|item| item.kind) else {
        return HitOutcome::Empty;
    };

    if kind.is_rocket() {
        return match source {
            DamageSource::Rocket => HitOutcome::Rocket(id),
            DamageSource::AdjacentBlast => HitOutcome::Immune(kind),
        };
    }

    if kind.is_cube() {
        if source != DamageSource::Rocket {
            return HitOutcome::Immune(kind);
        }
        grid.destroy(id);
        events.push(GameEvent::ItemDestroyed {
            kind,
            x: pos.x,
            y: pos.y,
        });
        return HitOutcome::Destroyed(kind);
    }

    if !kind.can_take_damage_from(source) {
        return HitOutcome::Immune(kind);
    }
    damage_obstacle(grid, id, pos, kind, events)
}

fn damage_obstacle(
    grid: &mut Grid,
    id: ItemId,
    pos: CellPos,
    kind: ItemKind,
    events: &mut Vec<GameEvent>,
) -> HitOutcome {
    let health = match grid.item_mut(id) {
        Some(item) => {
            item.health = item.health.saturating_sub(1);
            item.health
        }
        None => return HitOutcome::Empty,
    };
    if health > 0 {
        events.push(GameEvent::ObstacleDamaged {
            kind,
            x: pos.x,
            y: pos.y,
            health,
        });
        return HitOutcome::Damaged { kind, health };
    }
    grid.destroy(id);
    events.push(GameEvent::ObstacleDestroyed {
        kind,
        x: pos.x,
        y: pos.y,
    });
    HitOutcome::Destroyed(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rocket_hit_destroys_cube() {
        let mut grid = Grid::new(3, 3, 1, 1);
        let pos = CellPos::new(1, 1);
        grid.spawn(ItemKind::Yellow, pos, 0);
        let mut events = Vec::new();

        let out = hit_cell(&mut grid, pos, DamageSource::Rocket, &mut events);
        assert_eq!(out, HitOutcome::Destroyed(ItemKind::Yellow));
        assert!(grid.is_empty(pos));
        assert_eq!(
            events,
            vec![GameEvent::ItemDestroyed {
                kind: ItemKind::Yellow,
                x: 1,
                y: 1
            }]
        );
    }

    #[test]
    fn test_balloon_pops_from_adjacent_blast() {
        let mut grid = Grid::new(3, 3, 1, 1);
        let pos = CellPos::new(0, 2);
        grid.spawn(ItemKind::Balloon, pos, 0);
        let mut events = Vec::new();

        let out = hit_cell(&mut grid, pos, DamageSource::AdjacentBlast, &mut events);
        assert_eq!(out, HitOutcome::Destroyed(ItemKind::Balloon));
        assert!(matches!(
            events[0],
            GameEvent::ObstacleDestroyed {
                kind: ItemKind::Balloon,
                ..
            }
        ));
    }

    #[test]
    fn test_duck_and_rocket_are_not_consumed() {
        let mut grid = Grid::new(3, 3, 1, 1);
        grid.spawn(ItemKind::Duck, CellPos::new(0, 0), 0);
        let rocket = grid
            .spawn(ItemKind::HorizontalRocket, CellPos::new(1, 0), 0)
            .unwrap();
        let mut events = Vec::new();

        assert_eq!(
            hit_cell(&mut grid, CellPos::new(0, 0), DamageSource::Rocket, &mut events),
            HitOutcome::Immune(ItemKind::Duck)
        );
        assert_eq!(
            hit_cell(&mut grid, CellPos::new(1, 0), DamageSource::Rocket, &mut events),
            HitOutcome::Rocket(rocket)
        );
        assert_eq!(
            hit_cell(&mut grid, CellPos::new(2, 2), DamageSource::Rocket, &mut events),
            HitOutcome::Empty
        );
        assert!(events.is_empty());
        assert_eq!(grid.item_count(), 2);
    }
}
