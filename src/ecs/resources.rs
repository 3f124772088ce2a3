#![allow(dead_code)]

use bracket_random::prelude::RandomNumberGenerator;
use glam::Vec2;

use crate::data::ArenaConfig;

/// Playfield extents in world units, centred on the origin.
#[derive(Clone, Copy, Debug)]
pub struct Arena {
    pub half_extents: Vec2,
}

impl Arena {
    pub fn from_config(config: &ArenaConfig) -> Self {
        Self {
            half_extents: Vec2::new(config.half_width, config.half_height),
        }
    }

    pub fn clamp(&self, point: Vec2) -> Vec2 {
        point.clamp(-self.half_extents, self.half_extents)
    }

    pub fn contains(&self, point: Vec2, margin: f32) -> bool {
        let limit = self.half_extents + Vec2::splat(margin);
        point.x.abs() <= limit.x && point.y.abs() <= limit.y
    }

    /// A point just beyond a random arena edge.
    pub fn random_edge_point(&self, rng: &mut RandomNumberGenerator, margin: f32) -> Vec2 {
        let outer = self.half_extents + Vec2::splat(margin);
        let along = rng.range(-1.0f32, 1.0);
        match rng.range(0, 4) {
            0 => Vec2::new(along * outer.x, outer.y),
            1 => Vec2::new(along * outer.x, -outer.y),
            2 => Vec2::new(-outer.x, along * outer.y),
            _ => Vec2::new(outer.x, along * outer.y),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SimClock {
    pub now: f64,
    pub dt: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageOutcome {
    Victory,
    Defeat,
}

/// Run-wide health and score for the stage in play.
#[derive(Clone, Debug)]
pub struct Session {
    pub health: i32,
    pub max_health: i32,
    pub score: i32,
    pub game_over: bool,
    pub enemies_alive: u32,
    pub boss_defeated: bool,
    pub outcome: Option<StageOutcome>,
}

impl Session {
    pub fn new(max_health: i32) -> Self {
        Self {
            health: max_health,
            max_health,
            score: 0,
            game_over: false,
            enemies_alive: 0,
            boss_defeated: false,
            outcome: None,
        }
    }

    pub fn health_ratio(&self) -> f32 {
        if self.max_health <= 0 {
            return 0.0;
        }
        self.health as f32 / self.max_health as f32
    }

    /// Returns `true` on the hit that ends the run.
    pub fn player_take_damage(&mut self, amount: i32) -> bool {
        if self.game_over || amount <= 0 {
            return false;
        }
        self.health = (self.health - amount).max(0);
        if self.health == 0 {
            self.game_over = true;
            return true;
        }
        false
    }

    /// Returns the health actually restored.
    pub fn heal_player(&mut self, amount: i32) -> i32 {
        if self.game_over || amount <= 0 {
            return 0;
        }
        let before = self.health;
        self.health = (self.health + amount).min(self.max_health);
        self.health - before
    }

    pub fn enemy_destroyed(&mut self, points: i32) {
        self.enemies_alive = self.enemies_alive.saturating_sub(1);
        self.score += points;
    }

    pub fn enemy_escaped(&mut self) {
        self.enemies_alive = self.enemies_alive.saturating_sub(1);
    }

    pub fn boss_destroyed(&mut self, points: i32) {
        if self.boss_defeated {
            return;
        }
        self.boss_defeated = true;
        self.score += points;
    }
}

#[derive(Default)]
pub struct CombatLog {
    pub entries: Vec<String>,
}

impl CombatLog {
    pub fn push<S: Into<String>>(&mut self, entry: S) {
        self.entries.push(entry.into());
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioCue {
    PlayerShoot,
    EnemyShoot,
    PlayerHit,
    EnemyHit,
    EnemyDestroyed,
    LegDestroyed,
    BossRoar,
    Heal,
    Victory,
    GameOver,
}

/// Cues raised during a frame. The host drains them after each advance.
#[derive(Default)]
pub struct SoundQueue {
    pub cues: Vec<AudioCue>,
}

impl SoundQueue {
    pub fn play(&mut self, cue: AudioCue) {
        self.cues.push(cue);
    }
}
