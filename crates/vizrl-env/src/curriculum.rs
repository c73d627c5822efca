//! Curriculum bookkeeping: reward normalization, per-level score windows and
//! the level unlock policy.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use vizrl_core::{round4, RLError, Result};

use crate::levels::LevelConfig;

/// Upper end of the standardized score scale
pub const MAX_STANDARD_SCORE: f64 = 1000.0;

/// Map a raw episode reward onto the 0-1000 scale.
///
/// `target_score` lands on the 99th percentile, so reaching the target gives
/// 990 and only rewards beyond it approach 1000. The result is clamped.
#[must_use]
pub fn standardize_reward(level: &LevelConfig, episode_reward: f64) -> f64 {
    let min_score = level.min_score;
    let max_score = min_score + (level.target_score - min_score) / 0.99;
    let scaled =
        round4(MAX_STANDARD_SCORE * (episode_reward - min_score) / (max_score - min_score));
    scaled.clamp(0.0, MAX_STANDARD_SCORE)
}

/// Tunables of the curriculum
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurriculumConfig {
    /// Upper bound on the number of scores averaged per level
    pub average_over: usize,
    /// Average a level needs before the next one unlocks
    pub passing_grade: f64,
    /// Window capacity; a fresh level starts with this many zero scores
    pub min_tries_for_avg: usize,
    /// Average that counts a level as completed
    pub completion_threshold: f64,
    /// Bonus per level once every level is completed
    pub completion_bonus_per_level: f64,
}

impl Default for CurriculumConfig {
    fn default() -> Self {
        Self {
            average_over: 10,
            passing_grade: 600.0,
            min_tries_for_avg: 5,
            completion_threshold: 990.0,
            completion_bonus_per_level: 50.0,
        }
    }
}

/// Rolling windows of standardized scores, newest first
#[derive(Debug, Clone)]
pub struct ScoreTracker {
    windows: Vec<VecDeque<f64>>,
    capacity: usize,
    average_over: usize,
    completion_threshold: f64,
    completion_bonus_per_level: f64,
}

impl ScoreTracker {
    /// Tracker for `level_count` levels
    #[must_use]
    pub fn new(level_count: usize, config: &CurriculumConfig) -> Self {
        let capacity = config.min_tries_for_avg.max(1);
        Self {
            windows: vec![VecDeque::with_capacity(capacity); level_count],
            capacity,
            average_over: config.average_over.max(1),
            completion_threshold: config.completion_threshold,
            completion_bonus_per_level: config.completion_bonus_per_level,
        }
    }

    fn window_mut(&mut self, level: usize) -> Result<&mut VecDeque<f64>> {
        let count = self.windows.len();
        self.windows
            .get_mut(level)
            .ok_or(RLError::UnknownLevel { index: level, count })
    }

    /// Open a zero slot for the episode that is starting on `level`.
    ///
    /// A level's first episode fills its whole window with zeros, so early
    /// lucky runs cannot unlock the next level on their own.
    pub fn begin_episode(&mut self, level: usize) -> Result<()> {
        let capacity = self.capacity;
        let window = self.window_mut(level)?;
        if window.is_empty() {
            window.extend(std::iter::repeat(0.0).take(capacity));
        } else {
            window.push_front(0.0);
            window.truncate(capacity);
        }
        Ok(())
    }

    /// Store the current episode's standardized score in the newest slot
    pub fn record(&mut self, level: usize, score: f64) -> Result<()> {
        if self.windows.get(level).is_some_and(VecDeque::is_empty) {
            self.begin_episode(level)?;
        }
        let window = self.window_mut(level)?;
        if let Some(newest) = window.front_mut() {
            *newest = score;
        }
        Ok(())
    }

    /// Scores of one level, newest first
    #[must_use]
    pub fn window(&self, level: usize) -> Option<&VecDeque<f64>> {
        self.windows.get(level)
    }

    fn raw_average(&self, window: &VecDeque<f64>) -> Option<f64> {
        let count = window.len().min(self.average_over);
        if count == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let average = window.iter().take(count).sum::<f64>() / count as f64;
        Some(average)
    }

    /// Per-level rolling averages, 0 for levels never played
    #[must_use]
    pub fn averages(&self) -> Vec<f64> {
        self.windows
            .iter()
            .map(|w| self.raw_average(w).map_or(0.0, round4))
            .collect()
    }

    /// Sum of the per-level averages, plus the completion bonus once every
    /// level is at or above the completion threshold
    #[must_use]
    pub fn total(&self) -> f64 {
        let mut total = 0.0;
        let mut completed = 0;
        for average in self.windows.iter().filter_map(|w| self.raw_average(w)) {
            if average >= self.completion_threshold {
                completed += 1;
            }
            total += average;
        }
        if completed == self.windows.len() {
            #[allow(clippy::cast_precision_loss)]
            let bonus = self.completion_bonus_per_level * self.windows.len() as f64;
            total += bonus;
        }
        round4(total)
    }

    /// Number of tracked levels
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.windows.len()
    }
}

/// Lock state per level. Levels unlock in curriculum order and never re-lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelLocks {
    locked: Vec<bool>,
}

impl LevelLocks {
    /// Every level locked except the first
    #[must_use]
    pub fn new(level_count: usize) -> Self {
        let mut locked = vec![true; level_count];
        if let Some(first) = locked.first_mut() {
            *first = false;
        }
        Self { locked }
    }

    /// Whether `level` is still locked; unknown levels count as locked
    #[must_use]
    pub fn is_locked(&self, level: usize) -> bool {
        self.locked.get(level).copied().unwrap_or(true)
    }

    /// Lock flags in level order
    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.locked
    }

    /// Unlock every level whose predecessor's average reached
    /// `passing_grade`; returns the levels unlocked by this call
    pub fn unlock(&mut self, averages: &[f64], passing_grade: f64) -> Vec<usize> {
        let mut unlocked = Vec::new();
        for next in 1..self.locked.len() {
            let passed = averages.get(next - 1).is_some_and(|&avg| avg >= passing_grade);
            if self.locked[next] && passed {
                self.locked[next] = false;
                unlocked.push(next);
            }
        }
        unlocked
    }

    /// The unlocked level with the lowest average; ties go to the lowest
    /// index and level 0 is the fallback
    #[must_use]
    pub fn next_level(&self, averages: &[f64]) -> usize {
        let mut lowest_level = 0;
        let mut lowest_score = MAX_STANDARD_SCORE + 1.0;
        for (level, &average) in averages.iter().enumerate() {
            if !self.is_locked(level) && average < lowest_score {
                lowest_level = level;
                lowest_score = average;
            }
        }
        lowest_level
    }
}

/// Everything the meta-environment tracks between episodes
#[derive(Debug, Clone)]
pub struct Curriculum {
    config: CurriculumConfig,
    tracker: ScoreTracker,
    locks: LevelLocks,
    total_reward: f64,
    is_new_episode: bool,
}

impl Curriculum {
    /// Fresh curriculum over `level_count` levels
    #[must_use]
    pub fn new(level_count: usize, config: CurriculumConfig) -> Self {
        let mut curriculum = Self {
            tracker: ScoreTracker::new(level_count, &config),
            locks: LevelLocks::new(level_count),
            config,
            total_reward: 0.0,
            is_new_episode: false,
        };
        curriculum.unlock_levels();
        curriculum
    }

    /// Called whenever an episode starts on `level`
    pub fn episode_started(&mut self, level: usize) -> Result<()> {
        self.tracker.begin_episode(level)?;
        self.is_new_episode = true;
        Ok(())
    }

    /// Score the running episode and return `(reward, new_total)`.
    ///
    /// The reward is how much the curriculum total moved since
    /// `previous_total`. The new total is also remembered.
    pub fn calculate_reward(
        &mut self,
        level: usize,
        level_config: &LevelConfig,
        episode_reward: f64,
        previous_total: f64,
    ) -> Result<(f64, f64)> {
        let standardized = standardize_reward(level_config, episode_reward);
        self.tracker.record(level, standardized)?;
        let total = self.tracker.total();
        self.total_reward = total;
        Ok((total - previous_total, total))
    }

    /// Run the unlock pass over the current averages
    pub fn unlock_levels(&mut self) -> Vec<usize> {
        let averages = self.tracker.averages();
        self.locks.unlock(&averages, self.config.passing_grade)
    }

    /// Level the curriculum wants played next
    #[must_use]
    pub fn next_level(&self) -> usize {
        self.locks.next_level(&self.tracker.averages())
    }

    /// Clear the new-episode flag, returning its previous value
    pub fn take_new_episode(&mut self) -> bool {
        std::mem::take(&mut self.is_new_episode)
    }

    /// Per-level rolling averages
    #[must_use]
    pub fn scores(&self) -> Vec<f64> {
        self.tracker.averages()
    }

    /// Curriculum total after the last scored step
    #[must_use]
    pub fn total_reward(&self) -> f64 {
        self.total_reward
    }

    /// Lock state
    #[must_use]
    pub fn locks(&self) -> &LevelLocks {
        &self.locks
    }

    /// Score windows
    #[must_use]
    pub fn tracker(&self) -> &ScoreTracker {
        &self.tracker
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &CurriculumConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::LevelTable;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn basic() -> LevelConfig {
        LevelTable::default().levels[0].clone()
    }

    fn config(min_tries: usize, average_over: usize) -> CurriculumConfig {
        CurriculumConfig {
            min_tries_for_avg: min_tries,
            average_over,
            ..CurriculumConfig::default()
        }
    }

    #[test]
    fn test_standardize_worked_example() {
        let level = basic();
        assert_relative_eq!(standardize_reward(&level, -485.0), 0.0);
        assert_relative_eq!(standardize_reward(&level, -237.5), 495.0);
        assert_relative_eq!(standardize_reward(&level, 10.0), 990.0);
        assert_relative_eq!(standardize_reward(&level, 15.0), 1000.0);
        assert_relative_eq!(standardize_reward(&level, 400.0), 1000.0);
        assert_relative_eq!(standardize_reward(&level, -10_000.0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_standardize_is_clamped(raw in -1e6f64..1e6) {
            for level in &LevelTable::default().levels {
                let score = standardize_reward(level, raw);
                prop_assert!((0.0..=MAX_STANDARD_SCORE).contains(&score));
            }
        }

        #[test]
        fn prop_standardize_is_monotonic(a in -2000f64..2000.0, b in -2000f64..2000.0) {
            let level = basic();
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(standardize_reward(&level, low) <= standardize_reward(&level, high));
        }

        #[test]
        fn prop_window_never_exceeds_capacity(
            scores in proptest::collection::vec(0f64..1000.0, 1..40)
        ) {
            let mut tracker = ScoreTracker::new(1, &config(5, 10));
            for score in &scores {
                tracker.begin_episode(0).unwrap();
                tracker.record(0, *score).unwrap();
                prop_assert!(tracker.window(0).unwrap().len() <= 5);
            }
        }
    }

    #[test]
    fn test_first_episode_fills_window_with_zeros() {
        let mut tracker = ScoreTracker::new(2, &config(5, 10));
        tracker.begin_episode(0).unwrap();
        tracker.record(0, 1000.0).unwrap();
        assert_eq!(tracker.window(0).unwrap().len(), 5);
        assert_eq!(tracker.averages(), vec![200.0, 0.0]);
    }

    #[test]
    fn test_average_uses_only_recent_scores() {
        let mut tracker = ScoreTracker::new(1, &config(4, 2));
        for score in [100.0, 200.0, 300.0, 500.0] {
            tracker.begin_episode(0).unwrap();
            tracker.record(0, score).unwrap();
        }
        // Window holds four, but only the newest two are averaged.
        assert_eq!(tracker.window(0).unwrap().len(), 4);
        assert_eq!(tracker.averages(), vec![400.0]);

        tracker.begin_episode(0).unwrap();
        tracker.record(0, 900.0).unwrap();
        assert_eq!(
            tracker.window(0).unwrap().iter().copied().collect::<Vec<_>>(),
            vec![900.0, 500.0, 300.0, 200.0]
        );
    }

    #[test]
    fn test_record_without_begin_opens_slot() {
        let mut tracker = ScoreTracker::new(1, &config(2, 10));
        tracker.record(0, 600.0).unwrap();
        assert_eq!(tracker.averages(), vec![300.0]);
        assert!(tracker.record(3, 1.0).is_err());
        assert!(tracker.begin_episode(3).is_err());
    }

    #[test]
    fn test_total_adds_completion_bonus_only_when_all_levels_complete() {
        let mut tracker = ScoreTracker::new(2, &config(1, 10));
        tracker.record(0, 995.0).unwrap();
        assert_relative_eq!(tracker.total(), 995.0);

        tracker.record(1, 980.0).unwrap();
        assert_relative_eq!(tracker.total(), 1975.0);

        tracker.record(1, 990.0).unwrap();
        assert_relative_eq!(tracker.total(), 995.0 + 990.0 + 100.0);
    }

    #[test]
    fn test_unlock_requires_passing_predecessor() {
        let mut locks = LevelLocks::new(3);
        assert_eq!(locks.as_slice(), &[false, true, true]);

        assert!(locks.unlock(&[599.9, 0.0, 0.0], 600.0).is_empty());
        assert!(locks.is_locked(1));

        assert_eq!(locks.unlock(&[600.0, 0.0, 0.0], 600.0), vec![1]);
        assert!(!locks.is_locked(1));
        assert!(locks.is_locked(2));

        // Dropping below the grade never re-locks.
        assert!(locks.unlock(&[0.0, 0.0, 0.0], 600.0).is_empty());
        assert!(!locks.is_locked(1));
    }

    #[test]
    fn test_next_level_prefers_lowest_unlocked_average() {
        let mut locks = LevelLocks::new(4);
        locks.unlock(&[700.0, 650.0, 100.0, 0.0], 600.0);
        assert_eq!(locks.as_slice(), &[false, false, false, true]);
        assert_eq!(locks.next_level(&[700.0, 650.0, 100.0, 0.0]), 2);
        assert_eq!(locks.next_level(&[300.0, 300.0, 300.0, 0.0]), 0);
        assert_eq!(locks.next_level(&[1000.0, 1000.0, 1000.0, 0.0]), 0);
    }

    #[test]
    fn test_curriculum_reward_is_delta_of_total() {
        let table = LevelTable::default();
        let mut curriculum = Curriculum::new(table.len(), CurriculumConfig::default());
        curriculum.episode_started(0).unwrap();
        assert!(curriculum.take_new_episode());
        assert!(!curriculum.take_new_episode());

        // 990 standardized, averaged over five slots.
        let (reward, total) = curriculum.calculate_reward(0, &table.levels[0], 10.0, 0.0).unwrap();
        assert_relative_eq!(total, 198.0);
        assert_relative_eq!(reward, 198.0);

        let (reward, total) =
            curriculum.calculate_reward(0, &table.levels[0], -237.5, total).unwrap();
        assert_relative_eq!(total, 99.0);
        assert_relative_eq!(reward, -99.0);
        assert_relative_eq!(curriculum.total_reward(), 99.0);
    }
}
