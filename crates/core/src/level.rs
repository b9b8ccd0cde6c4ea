//! Level data - JSON level files and the level catalog
//!
//! ```json
//! {
//!   "level_number": 1,
//!   "grid_width": 3,
//!   "grid_height": 2,
//!   "move_count": 10,
//!   "grid": ["r", "r", "du", "b", "rand", "g"],
//!   "cube_goals": [{ "cube_type": "r", "count": 4 }]
//! }
//! ```
//!
//! `grid` lists rows bottom-first: token `i` sits at visible
//! `x = i % width`, `y = height - 1 - i / width`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::CellPos;
use crate::types::{ItemKind, SessionState};

/// Largest accepted width or height.
pub const MAX_DIMENSION: u32 = 64;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid level json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid grid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("grid has {actual} cells, expected {expected}")]
    GridSizeMismatch { expected: usize, actual: usize },
    #[error("unknown item token {token:?} at index {index}")]
    UnknownToken { index: usize, token: String },
    #[error("cube goal names a non-cube item {token:?}")]
    InvalidCubeGoal { token: String },
    #[error("level has no goals")]
    MissingGoals,
    #[error("move count must be positive")]
    InvalidMoveCount,
    #[error("no level numbered {0}")]
    UnknownLevel(u32),
    #[error("next level is not available while {}", .0.as_str())]
    NextLevelUnavailable(SessionState),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CubeGoalEntry {
    pub cube_type: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelData {
    pub level_number: u32,
    pub grid_width: u32,
    pub grid_height: u32,
    pub move_count: i64,
    pub grid: Vec<String>,
    #[serde(default)]
    pub cube_goals: Vec<CubeGoalEntry>,
}

/// What a level token places in a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Empty,
    Item(ItemKind),
    /// A cube of random colour, chosen at load.
    RandomCube,
}

impl Tile {
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() || token.eq_ignore_ascii_case("empty") {
            return Some(Tile::Empty);
        }
        if token.eq_ignore_ascii_case("rand") {
            return Some(Tile::RandomCube);
        }
        ItemKind::from_token(token).map(Tile::Item)
    }
}

impl LevelData {
    /// Parse and validate.
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let level: LevelData = serde_json::from_str(json)?;
        level.validate()?;
        Ok(level)
    }

    /// Build a level from rows written top-first, tokens separated by
    /// whitespace (`.` for an empty cell). Not validated here;
    /// `Session::start_level` refuses an invalid level.
    ///
    /// ```
    /// use cube_blast_core::level::LevelData;
    /// use cube_blast_core::types::ItemKind;
    ///
    /// let level = LevelData::from_rows(1, 5, &["r r", "du b"], &[(ItemKind::Red, 2)]);
    /// assert_eq!(level.grid, vec!["du", "b", "r", "r"]);
    /// assert!(level.validate().is_ok());
    /// ```
    pub fn from_rows(
        level_number: u32,
        move_count: i64,
        rows: &[&str],
        cube_goals: &[(ItemKind, u32)],
    ) -> Self {
        let parsed: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                row.split_whitespace()
                    .map(|t| if t == "." { String::new() } else { t.to_string() })
                    .collect()
            })
            .collect();
        let width = parsed.first().map_or(0, |row| row.len()) as u32;
        Self {
            level_number,
            grid_width: width,
            grid_height: parsed.len() as u32,
            move_count,
            grid: parsed.into_iter().rev().flatten().collect(),
            cube_goals: cube_goals
                .iter()
                .map(|(kind, count)| CubeGoalEntry {
                    cube_type: kind.token().to_string(),
                    count: *count,
                })
                .collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let json = fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), LevelError> {
        let (width, height) = (self.grid_width, self.grid_height);
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(LevelError::InvalidDimensions { width, height });
        }
        let expected = (width * height) as usize;
        if self.grid.len() != expected {
            return Err(LevelError::GridSizeMismatch {
                expected,
                actual: self.grid.len(),
            });
        }
        if self.move_count <= 0 {
            return Err(LevelError::InvalidMoveCount);
        }
        for (index, token) in self.grid.iter().enumerate() {
            if Tile::parse(token).is_none() {
                return Err(LevelError::UnknownToken {
                    index,
                    token: token.clone(),
                });
            }
        }
        for entry in &self.cube_goals {
            if !ItemKind::from_token(&entry.cube_type).is_some_and(|k| k.is_cube()) {
                return Err(LevelError::InvalidCubeGoal {
                    token: entry.cube_type.clone(),
                });
            }
        }
        if self.obstacle_goals().is_empty() && self.cube_goals().is_empty() {
            return Err(LevelError::MissingGoals);
        }
        Ok(())
    }

    pub fn width(&self) -> u8 {
        self.grid_width.min(MAX_DIMENSION) as u8
    }

    pub fn height(&self) -> u8 {
        self.grid_height.min(MAX_DIMENSION) as u8
    }

    pub fn moves(&self) -> u32 {
        self.move_count.clamp(0, u32::MAX as i64) as u32
    }

    /// Every cell with its tile, in file order.
    pub fn tiles(&self) -> impl Iterator<Item = (CellPos, Tile)> + '_ {
        let width = self.grid_width.max(1) as usize;
        let height = self.grid_height as i32;
        self.grid.iter().enumerate().map(move |(i, token)| {
            let pos = CellPos::new((i % width) as i32, height - 1 - (i / width) as i32);
            (pos, Tile::parse(token).unwrap_or(Tile::Empty))
        })
    }

    /// Balloons and ducks placed in the grid.
    pub fn obstacle_goals(&self) -> BTreeMap<ItemKind, u32> {
        let mut goals = BTreeMap::new();
        for (_, tile) in self.tiles() {
            if let Tile::Item(kind) = tile {
                if kind.is_obstacle() {
                    *goals.entry(kind).or_insert(0) += 1;
                }
            }
        }
        goals
    }

    /// Cube goals with a positive count. A repeated colour keeps its last entry.
    pub fn cube_goals(&self) -> BTreeMap<ItemKind, u32> {
        let mut goals = BTreeMap::new();
        for entry in &self.cube_goals {
            if let Some(kind) = ItemKind::from_token(&entry.cube_type).filter(|k| k.is_cube()) {
                goals.insert(kind, entry.count);
            }
        }
        goals.retain(|_, count| *count > 0);
        goals
    }
}

/// Levels indexed by number.
#[derive(Debug, Clone, Default)]
pub struct LevelCatalog {
    levels: BTreeMap<u32, LevelData>,
}

impl LevelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_levels(levels: impl IntoIterator<Item = LevelData>) -> Self {
        let mut catalog = Self::new();
        for level in levels {
            catalog.insert(level);
        }
        catalog
    }

    /// Load every `*.json` file in `dir`. Files that fail to parse or
    /// validate are skipped with a warning.
    pub fn load_dir(dir: &Path) -> Result<Self, LevelError> {
        let io_err = |source| LevelError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(io_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut catalog = Self::new();
        for path in paths {
            match LevelData::load(&path) {
                Ok(level) => {
                    log::debug!("loaded level {} from {}", level.level_number, path.display());
                    if let Some(old) = catalog.insert(level) {
                        log::warn!(
                            "level {} defined twice; {} wins",
                            old.level_number,
                            path.display()
                        );
                    }
                }
                Err(err) => log::warn!("skipping {}: {}", path.display(), err),
            }
        }
        log::info!("loaded {} levels from {}", catalog.len(), dir.display());
        Ok(catalog)
    }

    /// Returns the level previously stored under the same number.
    pub fn insert(&mut self, level: LevelData) -> Option<LevelData> {
        self.levels.insert(level.level_number, level)
    }

    pub fn get(&self, number: u32) -> Option<&LevelData> {
        self.levels.get(&number)
    }

    pub fn first(&self) -> Option<u32> {
        self.levels.keys().next().copied()
    }

    pub fn next_after(&self, number: u32) -> Option<u32> {
        self.levels
            .range(number.saturating_add(1)..)
            .next()
            .map(|(n, _)| *n)
            .filter(|n| *n > number)
    }

    pub fn numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.levels.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}
