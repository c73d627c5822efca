//! Level table: one entry per game scenario

use serde::{Deserialize, Serialize};
use std::path::Path;

use vizrl_core::{MultiDiscreteSpace, RLError, Result};

/// Length of the full engine action vector
pub const NUM_ACTIONS: usize = 43;

/// Engine buttons in action-vector order
pub const BUTTON_NAMES: [&str; NUM_ACTIONS] = [
    "ATTACK",
    "USE",
    "JUMP",
    "CROUCH",
    "TURN180",
    "ALTATTACK",
    "RELOAD",
    "ZOOM",
    "SPEED",
    "STRAFE",
    "MOVE_RIGHT",
    "MOVE_LEFT",
    "MOVE_BACKWARD",
    "MOVE_FORWARD",
    "TURN_RIGHT",
    "TURN_LEFT",
    "LOOK_UP",
    "LOOK_DOWN",
    "MOVE_UP",
    "MOVE_DOWN",
    "LAND",
    "SELECT_WEAPON1",
    "SELECT_WEAPON2",
    "SELECT_WEAPON3",
    "SELECT_WEAPON4",
    "SELECT_WEAPON5",
    "SELECT_WEAPON6",
    "SELECT_WEAPON7",
    "SELECT_WEAPON8",
    "SELECT_WEAPON9",
    "SELECT_WEAPON0",
    "SELECT_NEXT_WEAPON",
    "SELECT_PREV_WEAPON",
    "DROP_SELECTED_WEAPON",
    "ACTIVATE_SELECTED_ITEM",
    "SELECT_NEXT_ITEM",
    "SELECT_PREV_ITEM",
    "DROP_SELECTED_ITEM",
    "LOOK_UP_DOWN_DELTA",
    "TURN_LEFT_RIGHT_DELTA",
    "MOVE_FORWARD_BACKWARD_DELTA",
    "MOVE_LEFT_RIGHT_DELTA",
    "MOVE_UP_DOWN_DELTA",
];

/// Action space over the full vector: 38 binary buttons, two small deltas
/// and three large deltas.
#[must_use]
pub fn doom_action_space() -> MultiDiscreteSpace {
    let mut ranges = vec![(0, 1); 38];
    ranges.extend([(-10, 10); 2]);
    ranges.extend([(-100, 100); 3]);
    MultiDiscreteSpace { ranges }
}

/// One scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Display name
    pub name: String,
    /// Engine configuration file under `assets/`
    pub config: String,
    /// Scenario asset under `scenarios/`
    pub scenario: String,
    /// Map inside the scenario; empty keeps the engine default
    #[serde(default)]
    pub map: String,
    /// Engine skill level
    pub difficulty: u8,
    /// Indices of the action vector this level accepts
    pub actions: Vec<usize>,
    /// Raw episode reward mapped to 0
    pub min_score: f64,
    /// Raw episode reward mapped to the 99th percentile
    pub target_score: f64,
}

impl LevelConfig {
    #[allow(clippy::too_many_arguments)]
    fn builtin(
        name: &str,
        config: &str,
        scenario: &str,
        map: &str,
        difficulty: u8,
        actions: Vec<usize>,
        min_score: f64,
        target_score: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            config: config.to_string(),
            scenario: scenario.to_string(),
            map: map.to_string(),
            difficulty,
            actions,
            min_score,
            target_score,
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.min_score.is_finite() || !self.target_score.is_finite() {
            return Err(RLError::Config(format!(
                "level {}: scores must be finite (min {}, target {})",
                self.name, self.min_score, self.target_score
            )));
        }
        if self.target_score <= self.min_score {
            return Err(RLError::Config(format!(
                "level {}: target score {} must exceed min score {}",
                self.name, self.target_score, self.min_score
            )));
        }
        if let Some(bad) = self.actions.iter().find(|&&a| a >= NUM_ACTIONS) {
            return Err(RLError::Config(format!(
                "level {}: action index {bad} out of range (max {})",
                self.name,
                NUM_ACTIONS - 1
            )));
        }
        Ok(())
    }
}

/// Ordered list of levels; the order is the curriculum order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelTable {
    /// Levels in curriculum order
    #[serde(rename = "level")]
    pub levels: Vec<LevelConfig>,
}

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            levels: vec![
                LevelConfig::builtin(
                    "Basic",
                    "basic.cfg",
                    "basic.wad",
                    "map01",
                    5,
                    vec![0, 10, 11],
                    -485.0,
                    10.0,
                ),
                LevelConfig::builtin(
                    "Corridor",
                    "deadly_corridor.cfg",
                    "deadly_corridor.wad",
                    "",
                    1,
                    vec![0, 10, 11, 13, 14, 15],
                    -120.0,
                    1000.0,
                ),
                LevelConfig::builtin(
                    "DefendCenter",
                    "defend_the_center.cfg",
                    "defend_the_center.wad",
                    "",
                    5,
                    vec![0, 14, 15],
                    -1.0,
                    10.0,
                ),
                LevelConfig::builtin(
                    "DefendLine",
                    "defend_the_line.cfg",
                    "defend_the_line.wad",
                    "",
                    5,
                    vec![0, 14, 15],
                    -1.0,
                    15.0,
                ),
                LevelConfig::builtin(
                    "HealthGathering",
                    "health_gathering.cfg",
                    "health_gathering.wad",
                    "map01",
                    5,
                    vec![13, 14, 15],
                    0.0,
                    1000.0,
                ),
                LevelConfig::builtin(
                    "MyWayHome",
                    "my_way_home.cfg",
                    "my_way_home.wad",
                    "",
                    5,
                    vec![13, 14, 15],
                    -0.22,
                    0.5,
                ),
                LevelConfig::builtin(
                    "PredictPosition",
                    "predict_position.cfg",
                    "predict_position.wad",
                    "map01",
                    3,
                    vec![0, 14, 15],
                    -0.075,
                    0.5,
                ),
                LevelConfig::builtin(
                    "TakeCover",
                    "take_cover.cfg",
                    "take_cover.wad",
                    "map01",
                    5,
                    vec![10, 11],
                    0.0,
                    750.0,
                ),
                LevelConfig::builtin(
                    "Deathmatch",
                    "deathmatch.cfg",
                    "deathmatch.wad",
                    "",
                    5,
                    (0..NUM_ACTIONS).filter(|&a| a != 33).collect(),
                    0.0,
                    20.0,
                ),
            ],
        }
    }
}

impl LevelTable {
    /// Parse and validate a TOML level table
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let table: LevelTable = toml::from_str(source)?;
        table.validate()?;
        Ok(table)
    }

    /// Load and validate a TOML level table from disk
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Check every level
    pub fn validate(&self) -> Result<()> {
        if self.levels.is_empty() {
            return Err(RLError::Config("level table is empty".into()));
        }
        self.levels.iter().try_for_each(LevelConfig::validate)
    }

    /// Number of levels
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether the table has no levels
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Level at `index`
    pub fn get(&self, index: usize) -> Result<&LevelConfig> {
        self.levels.get(index).ok_or(RLError::UnknownLevel {
            index,
            count: self.levels.len(),
        })
    }

    /// Index of the level called `name`, ignoring case
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.levels
            .iter()
            .position(|level| level.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_is_valid() {
        let table = LevelTable::default();
        table.validate().unwrap();
        assert_eq!(table.len(), 9);
        assert_eq!(table.position("deathmatch"), Some(8));
        let deathmatch = table.get(8).unwrap();
        assert_eq!(deathmatch.actions.len(), NUM_ACTIONS - 1);
        assert!(!deathmatch.actions.contains(&33));
        assert!(table.get(9).is_err());
    }

    #[test]
    fn test_action_space_covers_vector() {
        let space = doom_action_space();
        assert_eq!(space.ranges.len(), NUM_ACTIONS);
        assert_eq!(space.ranges[38], (-10, 10));
        assert_eq!(space.ranges[42], (-100, 100));
        assert_eq!(BUTTON_NAMES[33], "DROP_SELECTED_WEAPON");
    }

    #[test]
    fn test_toml_table_roundtrip_and_validation() {
        let source = r#"
            [[level]]
            name = "Basic"
            config = "basic.cfg"
            scenario = "basic.wad"
            map = "map01"
            difficulty = 5
            actions = [0, 10, 11]
            min_score = -485.0
            target_score = 10.0

            [[level]]
            name = "Corridor"
            config = "deadly_corridor.cfg"
            scenario = "deadly_corridor.wad"
            difficulty = 1
            actions = [0, 13]
            min_score = -120.0
            target_score = 1000.0
        "#;
        let table = LevelTable::from_toml_str(source).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.levels[1].map, "");

        let inverted = source.replace("target_score = 10.0", "target_score = -600.0");
        assert!(matches!(LevelTable::from_toml_str(&inverted), Err(RLError::Config(_))));

        let nan_min = source.replace("min_score = -485.0", "min_score = nan");
        assert!(matches!(LevelTable::from_toml_str(&nan_min), Err(RLError::Config(_))));
        let infinite_target = source.replace("target_score = 1000.0", "target_score = inf");
        assert!(matches!(LevelTable::from_toml_str(&infinite_target), Err(RLError::Config(_))));

        let bad_action = source.replace("[0, 13]", "[0, 43]");
        assert!(LevelTable::from_toml_str(&bad_action).is_err());

        assert!(LevelTable::from_toml_str("level = []").is_err());
    }
}
