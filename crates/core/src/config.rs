//! Rule configuration
//!
//! Every tunable of the resolution engine lives in [`Rules`]. Defaults match
//! the shipped game; `from_env` overlays `CUBE_BLAST_*` variables the same way
//! the adapter reads its server settings.

use thiserror::Error;

use crate::types::{
    DEFAULT_BUFFER_ROWS, DEFAULT_COLLECTION_ROWS, DEFAULT_MIN_MATCH, DEFAULT_ROCKET_MATCH,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("min_match_size must be at least 2 (got {0})")]
    MinMatchTooSmall(usize),
    #[error("rocket_match_size {rocket} is below min_match_size {min}")]
    RocketBelowMinMatch { rocket: usize, min: usize },
    #[error("buffer_rows must be at least 1")]
    NoBufferRows,
    #[error("collection_rows must be at least 1")]
    NoCollectionRows,
    #[error("max_gravity_passes must be at least 1")]
    NoGravityPasses,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rules {
    pub min_match_size: usize,
    pub rocket_match_size: usize,
    pub buffer_rows: u8,
    pub collection_rows: u8,
    /// Minimum dwell of a freshly spawned buffer item before it may fall.
    pub buffer_settle_ms: u32,
    /// Time a projectile spends on each cell.
    pub projectile_step_ms: u32,
    /// Quiet period after the last projectile before gravity runs.
    pub projectile_settle_ms: u32,
    pub combo_projectile_delay_ms: u32,
    /// Pause between a match and the rest of the move.
    pub match_settle_ms: u32,
    /// Cap on gravity passes that still move something.
    pub max_gravity_passes: u32,
    /// Cap on cascades restarted because the top row is still open.
    pub max_gravity_restarts: u32,
    pub seed: u64,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            min_match_size: DEFAULT_MIN_MATCH,
            rocket_match_size: DEFAULT_ROCKET_MATCH,
            buffer_rows: DEFAULT_BUFFER_ROWS,
            collection_rows: DEFAULT_COLLECTION_ROWS,
            buffer_settle_ms: 200,
            projectile_step_ms: 150,
            projectile_settle_ms: 50,
            combo_projectile_delay_ms: 100,
            match_settle_ms: 200,
            max_gravity_passes: 20,
            max_gravity_restarts: 3,
            seed: 0x5eed,
        }
    }
}

impl Rules {
    /// Defaults overlaid with environment variables. Unparsable values are ignored.
    pub fn from_env() -> Self {
        use std::env;

        fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
            env::var(key).ok().and_then(|s| s.trim().parse().ok())
        }

        let mut rules = Self::default();
        if let Some(v) = parsed("CUBE_BLAST_MIN_MATCH") {
            rules.min_match_size = v;
        }
        if let Some(v) = parsed("CUBE_BLAST_ROCKET_MATCH") {
            rules.rocket_match_size = v;
        }
        if let Some(v) = parsed("CUBE_BLAST_SEED") {
            rules.seed = v;
        }
        if let Some(v) = parsed("CUBE_BLAST_SETTLE_MS") {
            rules.buffer_settle_ms = v;
        }
        if let Some(v) = parsed("CUBE_BLAST_PROJECTILE_STEP_MS") {
            rules.projectile_step_ms = v;
        }
        rules
    }

    /// Zero-delay variant used by tests and benchmarks.
    pub fn instant() -> Self {
        Self {
            buffer_settle_ms: 0,
            projectile_step_ms: 0,
            projectile_settle_ms: 0,
            combo_projectile_delay_ms: 0,
            match_settle_ms: 0,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_match_size < 2 {
            return Err(ConfigError::MinMatchTooSmall(self.min_match_size));
        }
        if self.rocket_match_size < self.min_match_size {
            return Err(ConfigError::RocketBelowMinMatch {
                rocket: self.rocket_match_size,
                min: self.min_match_size,
            });
        }
        if self.buffer_rows == 0 {
            return Err(ConfigError::NoBufferRows);
        }
        if self.collection_rows == 0 {
            return Err(ConfigError::NoCollectionRows);
        }
        if self.max_gravity_passes == 0 {
            return Err(ConfigError::NoGravityPasses);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let rules = Rules::default();
        assert_eq!(rules.min_match_size, 2);
        assert_eq!(rules.rocket_match_size, 4);
        assert_eq!(rules.max_gravity_passes, 20);
        assert!(rules.validate().is_ok());
        assert!(Rules::instant().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_thresholds() {
        let rules = Rules {
            min_match_size: 1,
            ..Rules::default()
        };
        assert_eq!(rules.validate(), Err(ConfigError::MinMatchTooSmall(1)));

        let rules = Rules {
            min_match_size: 3,
            rocket_match_size: 2,
            ..Rules::default()
        };
        assert!(matches!(
            rules.validate(),
            Err(ConfigError::RocketBelowMinMatch { rocket: 2, min: 3 })
        ));

        let rules = Rules {
            collection_rows: 0,
            ..Rules::default()
        };
        assert_eq!(rules.validate(), Err(ConfigError::NoCollectionRows));
    }
}
