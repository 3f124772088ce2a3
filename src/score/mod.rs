#![allow(dead_code)]

pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::ScoreConfig;

pub use self::store::{PrefsStore, StoreError};

const HIGH_SCORES_KEY: &str = "high_scores";
const LAST_SCORE_KEY: &str = "last_score";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub player_name: String,
    pub score: i32,
    #[serde(default)]
    pub recorded_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct ScoreList {
    items: Vec<ScoreEntry>,
}

/// Running score plus the ranked, capacity-bounded high-score table.
pub struct ScoreLedger {
    entries: Vec<ScoreEntry>,
    capacity: usize,
    default_name: String,
    current: i32,
    store: PrefsStore,
}

impl ScoreLedger {
    pub fn new(config: &ScoreConfig, store: PrefsStore) -> Self {
        let mut ledger = Self {
            entries: Vec::new(),
            capacity: config.capacity.max(1),
            default_name: config.default_name.clone(),
            current: 0,
            store,
        };
        ledger.load();
        ledger
    }

    fn load(&mut self) {
        let Some(json) = self.store.get_string(HIGH_SCORES_KEY) else {
            return;
        };
        match serde_json::from_str::<ScoreList>(json) {
            Ok(list) => {
                self.entries = list.items;
                self.entries.sort_by(|a, b| b.score.cmp(&a.score));
                self.entries.truncate(self.capacity);
            }
            Err(err) => log::warn!("discarding unreadable high scores: {err}"),
        }
    }

    /// The world's session owns the running total. The host adds the points
    /// earned each frame and settles the final figure with [`Self::set_score`].
    pub fn add_score(&mut self, points: i32) {
        self.current += points;
    }

    pub fn set_score(&mut self, score: i32) {
        self.current = score;
    }

    pub fn current_score(&self) -> i32 {
        self.current
    }

    pub fn reset_current_score(&mut self) {
        self.current = 0;
    }

    pub fn high_scores(&self) -> &[ScoreEntry] {
        &self.entries
    }

    pub fn top(&self, limit: usize) -> &[ScoreEntry] {
        &self.entries[..self.entries.len().min(limit)]
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn store(&self) -> &PrefsStore {
        &self.store
    }

    pub fn is_high_score(&self, score: i32) -> bool {
        match self.entries.last() {
            Some(lowest) if self.entries.len() >= self.capacity => score > lowest.score,
            _ => true,
        }
    }

    /// Records the running total under `name` and persists the table. Returns
    /// the zero-based rank when the entry survived truncation. Equal scores
    /// keep their arrival order.
    pub fn save_score(&mut self, name: &str) -> Result<Option<usize>, StoreError> {
        let name = name.trim();
        let player_name = if name.is_empty() {
            self.default_name.clone()
        } else {
            name.to_string()
        };
        let entry = ScoreEntry {
            player_name,
            score: self.current,
            recorded_at: Utc::now(),
        };
        let rank = self
            .entries
            .partition_point(|existing| existing.score >= entry.score);
        self.entries.insert(rank, entry);
        self.entries.truncate(self.capacity);

        let json = serde_json::to_string(&ScoreList {
            items: self.entries.clone(),
        })?;
        self.store.set_string(HIGH_SCORES_KEY, json);
        self.store.set_int(LAST_SCORE_KEY, self.current);
        self.store.flush()?;
        log::info!("saved score {} at rank {}", self.current, rank + 1);
        Ok((rank < self.capacity).then_some(rank))
    }

    pub fn record_last_score(&mut self, score: i32) -> Result<(), StoreError> {
        self.current = score;
        self.store.set_int(LAST_SCORE_KEY, score);
        self.store.flush()
    }

    pub fn last_score(&self) -> i32 {
        self.store.get_int(LAST_SCORE_KEY, 0)
    }

    pub fn clear_all(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        self.store.delete_key(HIGH_SCORES_KEY);
        self.store.delete_key(LAST_SCORE_KEY);
        self.store.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(capacity: usize) -> ScoreLedger {
        let config = ScoreConfig {
            capacity,
            ..ScoreConfig::default()
        };
        ScoreLedger::new(&config, PrefsStore::in_memory())
    }

    fn save(ledger: &mut ScoreLedger, name: &str, score: i32) -> Option<usize> {
        ledger.set_score(score);
        ledger.save_score(name).unwrap()
    }

    fn ranking(ledger: &ScoreLedger) -> Vec<(String, i32)> {
        ledger
            .high_scores()
            .iter()
            .map(|entry| (entry.player_name.clone(), entry.score))
            .collect()
    }

    #[test]
    fn higher_score_ranks_first() {
        let mut ledger = ledger(10);
        save(&mut ledger, "Ann", 500);
        save(&mut ledger, "Bob", 700);
        assert_eq!(
            ranking(&ledger),
            vec![("Bob".to_string(), 700), ("Ann".to_string(), 500)]
        );
    }

    #[test]
    fn capacity_and_order_hold_after_every_save() {
        let mut ledger = ledger(3);
        for (idx, score) in [40, 90, 10, 70, 90, 5, 100, 60].into_iter().enumerate() {
            save(&mut ledger, &format!("P{idx}"), score);
            assert!(ledger.high_scores().len() <= 3);
            assert!(
                ledger
                    .high_scores()
                    .windows(2)
                    .all(|pair| pair[0].score >= pair[1].score)
            );
        }
        assert_eq!(
            ranking(&ledger),
            vec![
                ("P6".to_string(), 100),
                ("P1".to_string(), 90),
                ("P4".to_string(), 90)
            ]
        );
    }

    #[test]
    fn evicted_entry_reports_no_rank() {
        let mut ledger = ledger(2);
        save(&mut ledger, "A", 50);
        save(&mut ledger, "B", 40);
        assert_eq!(save(&mut ledger, "C", 10), None);
        assert_eq!(save(&mut ledger, "D", 60), Some(0));
    }

    #[test]
    fn high_score_check_uses_free_capacity_then_minimum() {
        let mut ledger = ledger(2);
        assert!(ledger.is_high_score(0));
        save(&mut ledger, "A", 50);
        assert!(ledger.is_high_score(1));
        save(&mut ledger, "B", 30);
        assert!(!ledger.is_high_score(30));
        assert!(ledger.is_high_score(31));
    }

    #[test]
    fn blank_name_becomes_anonymous() {
        let mut ledger = ledger(5);
        save(&mut ledger, "   ", 12);
        assert_eq!(ledger.high_scores()[0].player_name, "Anonymous");
    }

    #[test]
    fn table_survives_reload() {
        let mut ledger = ledger(5);
        save(&mut ledger, "Ann", 500);
        save(&mut ledger, "Bob", 700);
        let reloaded = ScoreLedger::new(&ScoreConfig::default(), ledger.store().clone());
        assert_eq!(ranking(&reloaded), ranking(&ledger));
        assert_eq!(reloaded.last_score(), 700);
        assert_eq!(reloaded.current_score(), 0);
    }

    #[test]
    fn running_total_mutators() {
        let mut ledger = ledger(5);
        ledger.add_score(10);
        ledger.add_score(100);
        assert_eq!(ledger.current_score(), 110);
        ledger.set_score(70);
        assert_eq!(ledger.current_score(), 70);
        ledger.reset_current_score();
        assert_eq!(ledger.current_score(), 0);
    }

    #[test]
    fn save_records_points_added_during_the_run() {
        let mut ledger = ledger(5);
        for _ in 0..3 {
            ledger.add_score(10);
        }
        ledger.add_score(100);
        assert_eq!(ledger.save_score("Ann").unwrap(), Some(0));
        assert_eq!(ranking(&ledger), vec![("Ann".to_string(), 130)]);
        assert_eq!(ledger.last_score(), 130);
    }

    #[test]
    fn clear_all_forgets_table_and_last_score() {
        let mut ledger = ledger(5);
        save(&mut ledger, "Ann", 500);
        ledger.clear_all().unwrap();
        assert!(ledger.high_scores().is_empty());
        assert_eq!(ledger.last_score(), 0);
    }
}
