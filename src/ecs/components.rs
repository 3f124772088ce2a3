#![allow(dead_code)]

use bracket_terminal::prelude::RGB;
use glam::Vec2;
use specs::prelude::{Component, Entity, NullStorage, VecStorage};

use crate::{
    ai::{Mood, MoodEngine},
    boss::{BossController, LegId},
    data::AsteroidSize,
};

#[derive(Clone, Debug)]
pub struct Position {
    pub pos: Vec2,
}

impl Component for Position {
    type Storage = VecStorage<Self>;
}

#[derive(Clone, Debug, Default)]
pub struct Velocity {
    pub linear: Vec2,
}

impl Component for Velocity {
    type Storage = VecStorage<Self>;
}

#[derive(Clone, Debug)]
pub struct Renderable {
    pub glyph: u16,
    pub color: RGB,
    /// Colour restored after a hit flash.
    pub base_color: RGB,
    pub order: i32,
}

impl Renderable {
    pub fn new(glyph: char, color: RGB, order: i32) -> Self {
        Self {
            glyph: glyph as u16,
            color,
            base_color: color,
            order,
        }
    }
}

impl Component for Renderable {
    type Storage = VecStorage<Self>;
}

#[derive(Clone, Debug)]
pub struct Collider {
    pub radius: f32,
}

impl Component for Collider {
    type Storage = VecStorage<Self>;
}

#[derive(Clone, Debug)]
pub struct IntentStep {
    pub direction: Vec2,
    pub remaining: f32,
}

impl Component for IntentStep {
    type Storage = VecStorage<Self>;
}

#[derive(Default)]
pub struct PlayerTag;

impl Component for PlayerTag {
    type Storage = NullStorage<Self>;
}

/// Counted by the companion's threat scan and hurts the player on contact.
#[derive(Default)]
pub struct Hostile;

impl Component for Hostile {
    type Storage = NullStorage<Self>;
}

#[derive(Default)]
pub struct Invulnerable;

impl Component for Invulnerable {
    type Storage = NullStorage<Self>;
}

#[derive(Clone, Debug)]
pub struct CombatStats {
    pub max_hp: i32,
    pub hp: i32,
}

impl Component for CombatStats {
    type Storage = VecStorage<Self>;
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub name: String,
    pub next_shot_at: f64,
}

impl Component for Enemy {
    type Storage = VecStorage<Self>;
}

impl Component for BossController {
    type Storage = VecStorage<Self>;
}

#[derive(Clone, Debug)]
pub struct LegPart {
    pub boss: Entity,
    pub leg: LegId,
}

impl Component for LegPart {
    type Storage = VecStorage<Self>;
}

/// Keeps an entity pinned to its parent's position.
#[derive(Clone, Debug)]
pub struct Attached {
    pub parent: Entity,
    pub offset: Vec2,
}

impl Component for Attached {
    type Storage = VecStorage<Self>;
}

#[derive(Clone, Debug)]
pub struct Falling {
    pub gravity: f32,
}

impl Component for Falling {
    type Storage = VecStorage<Self>;
}

/// A drifting rock. Breaks on the player and nothing else.
#[derive(Clone, Debug)]
pub struct Asteroid {
    pub size: AsteroidSize,
    pub damage: i32,
}

impl Component for Asteroid {
    type Storage = VecStorage<Self>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Faction {
    Player,
    Companion,
    Enemy,
    Boss,
}

impl Faction {
    pub fn hurts_player(&self) -> bool {
        matches!(self, Faction::Enemy | Faction::Boss)
    }
}

#[derive(Clone, Debug)]
pub struct Projectile {
    pub faction: Faction,
    pub damage: i32,
    pub expires_at: f64,
    /// Aimed shots stop at the point they were fired at.
    pub destination: Option<Vec2>,
}

impl Component for Projectile {
    type Storage = VecStorage<Self>;
}

#[derive(Clone, Debug)]
pub struct Companion {
    pub engine: MoodEngine,
    pub next_shot_at: f64,
    pub next_heal_at: f64,
    pub healing: bool,
    pub nearby_enemies: usize,
}

impl Companion {
    pub fn mood(&self) -> Mood {
        self.engine.mood()
    }
}

impl Component for Companion {
    type Storage = VecStorage<Self>;
}
