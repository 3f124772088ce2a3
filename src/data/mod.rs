#![allow(dead_code)]

pub mod enemies;

use std::{fs, path::Path};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Every tunable of the game. Each section falls back to its defaults field by
/// field, so an override file only needs the values it changes.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub arena: ArenaConfig,
    pub player: PlayerConfig,
    pub enemy: EnemyConfig,
    pub boss: BossConfig,
    pub companion: CompanionConfig,
    pub asteroids: AsteroidConfig,
    pub levels: LevelConfig,
    pub scores: ScoreConfig,
}

const BUILTIN_TUNING: &str = include_str!("../../assets/tuning.json");

impl GameConfig {
    /// The tuning shipped with the game.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json(BUILTIN_TUNING)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_json(&text).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: display,
                source,
            },
            other => other,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.boss.leg_count == 0 {
            return Err(ConfigError::Invalid("boss.leg_count must be at least 1".into()));
        }
        if self.boss.bullets_per_wave == 0 {
            return Err(ConfigError::Invalid(
                "boss.bullets_per_wave must be at least 1".into(),
            ));
        }
        if self.scores.capacity == 0 {
            return Err(ConfigError::Invalid("scores.capacity must be at least 1".into()));
        }
        if self.levels.stages.is_empty() {
            return Err(ConfigError::Invalid("levels.stages is empty".into()));
        }
        let c = &self.companion;
        if c.critical_health_threshold > c.low_health_threshold {
            return Err(ConfigError::Invalid(format!(
                "companion critical threshold {} exceeds low threshold {}",
                c.critical_health_threshold, c.low_health_threshold
            )));
        }
        if self.player.max_health <= 0 {
            return Err(ConfigError::Invalid("player.max_health must be positive".into()));
        }
        let e = &self.enemy;
        if e.min_health < 1 || e.min_health > e.max_health {
            return Err(ConfigError::Invalid(format!(
                "enemy health range {}..={} is empty or non-positive",
                e.min_health, e.max_health
            )));
        }
        let a = &self.asteroids;
        if a.min_spawn_interval > a.max_spawn_interval || a.min_speed > a.max_speed {
            return Err(ConfigError::Invalid(
                "asteroid spawn interval and speed ranges must have min <= max".into(),
            ));
        }
        if a.small_chance < 0.0 || a.medium_chance < 0.0 || a.small_chance + a.medium_chance > 1.0
        {
            return Err(ConfigError::Invalid(
                "asteroid size chances must be non-negative and sum to at most 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub half_width: f32,
    pub half_height: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            half_width: 9.0,
            half_height: 5.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub max_health: i32,
    pub move_speed: f32,
    /// How long one movement key press drives the ship.
    pub input_step_seconds: f32,
    pub laser_speed: f32,
    pub laser_damage: i32,
    pub laser_lifetime: f32,
    pub invincibility_seconds: f32,
    pub hit_radius: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_health: 5,
            move_speed: 5.0,
            input_step_seconds: 0.12,
            laser_speed: 10.0,
            laser_damage: 1,
            laser_lifetime: 2.0,
            invincibility_seconds: 1.0,
            hit_radius: 0.4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    pub speed: f32,
    pub stopping_distance: f32,
    pub retreat_distance: f32,
    pub shot_interval: f32,
    pub laser_speed: f32,
    pub max_alive: u32,
    pub spawn_warmup: f32,
    pub spawn_interval: f32,
    pub min_health: i32,
    pub max_health: i32,
    pub despawn_distance: f32,
    pub hit_radius: f32,
    pub score_value: i32,
    /// Asteroids closer than this push the ship aside.
    pub asteroid_detection_radius: f32,
    pub avoidance_force: f32,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            speed: 3.0,
            stopping_distance: 5.0,
            retreat_distance: 3.0,
            shot_interval: 2.0,
            laser_speed: 6.0,
            max_alive: 3,
            spawn_warmup: 2.0,
            spawn_interval: 3.0,
            min_health: 1,
            max_health: 5,
            despawn_distance: 20.0,
            hit_radius: 0.5,
            score_value: 10,
            asteroid_detection_radius: 3.0,
            avoidance_force: 5.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BossConfig {
    pub body_health: i32,
    pub leg_count: usize,
    pub leg_health: i32,
    pub bullets_per_wave: usize,
    pub bullet_speed: f32,
    pub bullet_lifetime: f32,
    /// Width of the aimed cone while legs remain. 360 or more fires a full ring.
    pub wave_spread_degrees: f32,
    pub descend_speed: f32,
    pub spawn_height_offset: f32,
    pub optimal_distance: f32,
    pub too_close_distance: f32,
    pub too_far_distance: f32,
    pub distance_move_speed: f32,
    pub distance_tolerance: f32,
    pub interval_all_legs: f32,
    pub interval_no_legs: f32,
    pub close_interval_factor: f32,
    pub jitter_chance: f32,
    pub jitter_radius: f32,
    pub enrage_multiplier: f32,
    pub body_radius: f32,
    pub leg_reach: f32,
    pub weak_point_offset: f32,
    pub weak_point_radius: f32,
    pub leg_fall_seconds: f32,
    pub leg_fall_gravity: f32,
    pub score_value: i32,
    pub victory_delay: f32,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            body_health: 10,
            leg_count: 4,
            leg_health: 10,
            bullets_per_wave: 8,
            bullet_speed: 3.0,
            bullet_lifetime: 5.0,
            wave_spread_degrees: 120.0,
            descend_speed: 2.0,
            spawn_height_offset: 3.0,
            optimal_distance: 5.0,
            too_close_distance: 3.0,
            too_far_distance: 7.0,
            distance_move_speed: 1.5,
            distance_tolerance: 0.5,
            interval_all_legs: 3.0,
            interval_no_legs: 1.5,
            close_interval_factor: 0.7,
            jitter_chance: 0.02,
            jitter_radius: 0.3,
            enrage_multiplier: 1.5,
            body_radius: 1.0,
            leg_reach: 1.6,
            weak_point_offset: 0.5,
            weak_point_radius: 0.5,
            leg_fall_seconds: 2.0,
            leg_fall_gravity: 2.0,
            score_value: 100,
            victory_delay: 2.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    pub normal_follow_distance: f32,
    pub scared_follow_distance: f32,
    pub aggressive_follow_distance: f32,
    /// Slack around the follow distance before the companion repositions.
    pub follow_tolerance: f32,
    pub move_speed: f32,
    pub healing_distance: f32,
    pub calm_shot_interval: f32,
    pub aggressive_shot_interval: f32,
    pub scared_shot_interval: f32,
    pub detection_radius: f32,
    pub bullet_speed: f32,
    pub bullet_lifetime: f32,
    pub low_health_threshold: f32,
    pub critical_health_threshold: f32,
    pub good_health_threshold: f32,
    pub many_enemies_threshold: usize,
    pub heal_amount: i32,
    pub heal_cooldown: f32,
    pub heal_windup: f32,
    pub mood_poll_interval: f32,
    pub supportive_speed_factor: f32,
    pub dodge_chance: f32,
    pub dodge_radius: f32,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            normal_follow_distance: 2.0,
            scared_follow_distance: 4.0,
            aggressive_follow_distance: 1.5,
            follow_tolerance: 0.5,
            move_speed: 4.0,
            healing_distance: 0.5,
            calm_shot_interval: 5.0,
            aggressive_shot_interval: 1.0,
            scared_shot_interval: 3.0,
            detection_radius: 8.0,
            bullet_speed: 10.0,
            bullet_lifetime: 3.0,
            low_health_threshold: 0.3,
            critical_health_threshold: 0.2,
            good_health_threshold: 0.7,
            many_enemies_threshold: 3,
            heal_amount: 1,
            heal_cooldown: 10.0,
            heal_windup: 0.2,
            mood_poll_interval: 0.5,
            supportive_speed_factor: 1.5,
            dodge_chance: 0.02,
            dodge_radius: 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AsteroidSize {
    Small,
    Medium,
    Large,
}

/// Drifting rocks on the timed stages. They hurt the player on contact and
/// ignore everything else.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AsteroidConfig {
    pub min_spawn_interval: f32,
    pub max_spawn_interval: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    pub small_chance: f32,
    pub medium_chance: f32,
    pub small_damage: i32,
    pub medium_damage: i32,
    pub large_damage: i32,
    pub medium_radius: f32,
    /// Heading wobble either side of the entry direction.
    pub angle_variation_degrees: f32,
    pub spawn_margin: f32,
    pub cull_margin: f32,
}

impl AsteroidConfig {
    pub fn damage(&self, size: AsteroidSize) -> i32 {
        match size {
            AsteroidSize::Small => self.small_damage,
            AsteroidSize::Medium => self.medium_damage,
            AsteroidSize::Large => self.large_damage,
        }
    }

    pub fn radius(&self, size: AsteroidSize) -> f32 {
        let scale = match size {
            AsteroidSize::Small => 0.7,
            AsteroidSize::Medium => 1.0,
            AsteroidSize::Large => 1.3,
        };
        self.medium_radius * scale
    }

    /// Maps a roll in `0..1` onto the size distribution.
    pub fn size_for_roll(&self, roll: f32) -> AsteroidSize {
        if roll < self.small_chance {
            AsteroidSize::Small
        } else if roll < self.small_chance + self.medium_chance {
            AsteroidSize::Medium
        } else {
            AsteroidSize::Large
        }
    }
}

impl Default for AsteroidConfig {
    fn default() -> Self {
        Self {
            min_spawn_interval: 2.0,
            max_spawn_interval: 5.0,
            min_speed: 2.0,
            max_speed: 6.0,
            small_chance: 0.5,
            medium_chance: 0.35,
            small_damage: 1,
            medium_damage: 2,
            large_damage: 3,
            medium_radius: 0.5,
            angle_variation_degrees: 15.0,
            spawn_margin: 2.0,
            cull_margin: 3.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageKind {
    Timed { duration: f32 },
    Boss,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StageSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: StageKind,
}

impl StageSpec {
    pub fn timed(name: &str, duration: f32) -> Self {
        Self {
            name: name.to_string(),
            kind: StageKind::Timed { duration },
        }
    }

    pub fn boss(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: StageKind::Boss,
        }
    }

    pub fn is_boss(&self) -> bool {
        matches!(self.kind, StageKind::Boss)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub warning_seconds: f32,
    pub caution_seconds: f32,
    /// Delay between the player's death and the game over screen.
    pub death_sequence_seconds: f32,
    pub stages: Vec<StageSpec>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            warning_seconds: 10.0,
            caution_seconds: 30.0,
            death_sequence_seconds: 3.0,
            stages: vec![
                StageSpec::timed("Level1", 60.0),
                StageSpec::timed("Level2", 60.0),
                StageSpec::boss("Level3"),
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    pub capacity: usize,
    pub display_limit: usize,
    pub default_name: String,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            display_limit: 10,
            default_name: "Anonymous".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_tuning_matches_builtin_defaults() {
        let shipped = GameConfig::builtin().unwrap();
        assert_eq!(shipped, GameConfig::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = GameConfig::from_json(r#"{ "boss": { "leg_count": 6 } }"#).unwrap();
        assert_eq!(config.boss.leg_count, 6);
        assert_eq!(config.boss.body_health, 10);
        assert_eq!(config.companion, CompanionConfig::default());
    }

    #[test]
    fn boss_stage_parses_without_duration() {
        let config = GameConfig::from_json(
            r#"{ "levels": { "stages": [ { "name": "Arena", "kind": "boss" } ] } }"#,
        )
        .unwrap();
        assert_eq!(config.levels.stages, vec![StageSpec::boss("Arena")]);
        assert_eq!(config.levels.warning_seconds, 10.0);
    }

    #[test]
    fn zero_legs_is_rejected() {
        let err = GameConfig::from_json(r#"{ "boss": { "leg_count": 0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn inverted_enemy_health_range_is_rejected() {
        let err = GameConfig::from_json(r#"{ "enemy": { "min_health": 6, "max_health": 2 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(GameConfig::from_json(r#"{ "enemy": { "min_health": 3, "max_health": 3 } }"#).is_ok());
    }

    #[test]
    fn asteroid_sizes_follow_the_distribution() {
        let rocks = AsteroidConfig::default();
        assert_eq!(rocks.size_for_roll(0.0), AsteroidSize::Small);
        assert_eq!(rocks.size_for_roll(0.49), AsteroidSize::Small);
        assert_eq!(rocks.size_for_roll(0.5), AsteroidSize::Medium);
        assert_eq!(rocks.size_for_roll(0.84), AsteroidSize::Medium);
        assert_eq!(rocks.size_for_roll(0.9), AsteroidSize::Large);
        assert_eq!(rocks.damage(AsteroidSize::Large), 3);
        assert!(rocks.radius(AsteroidSize::Small) < rocks.radius(AsteroidSize::Large));
    }

    #[test]
    fn malformed_json_reports_parse_error() {
        let err = GameConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
