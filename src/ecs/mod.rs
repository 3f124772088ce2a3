#![allow(dead_code)]

pub mod components;
pub mod resources;
pub mod scheduler;
pub mod systems;

use std::f32::consts::PI;

use bracket_random::prelude::RandomNumberGenerator;
use bracket_terminal::prelude::{DARK_GRAY, GRAY, RED, RGB, WHITE};
use glam::Vec2;
use specs::prelude::{
    Builder, Dispatcher, DispatcherBuilder, Entity, Join, World as SpecsWorld, WorldExt,
};

use crate::{
    ai::{Mood, MoodChange, MoodEngine, MoodSignals, MoodThresholds, chat::GameContext},
    boss::{BossController, BossState, LegId, random_in_circle},
    data::{AsteroidSize, GameConfig, StageSpec, enemies::EnemyTemplate},
    level::CarriedStats,
};

use self::{
    components::{
        Asteroid, Attached, Collider, CombatStats, Companion, Enemy, Falling, Hostile, IntentStep,
        Invulnerable, LegPart, PlayerTag, Position, Projectile, Renderable, Velocity,
    },
    resources::{Arena, AudioCue, CombatLog, Session, SimClock, SoundQueue, StageOutcome},
    scheduler::{Scheduler, TimedEvent},
    systems::{
        AttachSystem, BossSystem, CollisionSystem, CompanionSystem, EnemyAiSystem, LifetimeSystem,
        MovementSystem, PlayerControlSystem, boss_bullet, player_laser,
    },
};

const BOSS_COLOR: RGB = RGB {
    r: 0.6,
    g: 0.2,
    b: 0.8,
};
const DEATH_SHAKE_STEPS: u8 = 20;
const DEATH_SHAKE_INTERVAL: f32 = 0.1;
const DEATH_SHAKE_START: f32 = 0.5;
const DEATH_FADE_SECONDS: f32 = 1.0;
const ENRAGE_FLASH_INTERVAL: f32 = 0.2;
const SPAWN_MARGIN: f32 = 1.0;

/// HUD view of the boss.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BossStatus {
    pub state: BossState,
    pub legs_remaining: usize,
    pub leg_count: usize,
    pub body_hit_points: i32,
    pub vulnerable: bool,
    pub enraged: bool,
}

pub struct EcsWorld {
    specs_world: SpecsWorld,
    dispatcher: Dispatcher<'static, 'static>,
    config: GameConfig,
    player: Entity,
    companion: Entity,
    boss_stage: bool,
    pub tick: u64,
}

impl EcsWorld {
    pub fn new(
        config: &GameConfig,
        stage: &StageSpec,
        carried: Option<CarriedStats>,
        seed: u64,
    ) -> Self {
        let mut specs_world = SpecsWorld::new();
        Self::register_components(&mut specs_world);

        let mut session = Session::new(config.player.max_health);
        if let Some(carried) = carried {
            session.score = carried.score;
            session.max_health = carried.max_health;
            session.health = carried.health.min(carried.max_health);
        }

        specs_world.insert(RandomNumberGenerator::seeded(seed));
        specs_world.insert(CombatLog::default());
        specs_world.insert(SoundQueue::default());
        specs_world.insert(Scheduler::default());
        specs_world.insert(SimClock::default());
        specs_world.insert(Arena::from_config(&config.arena));
        specs_world.insert(session);
        specs_world.insert(config.clone());

        let arena = Arena::from_config(&config.arena);
        let start = Vec2::new(0.0, -arena.half_extents.y + 1.0);
        let player = Self::spawn_player(&mut specs_world, start);
        let companion = Self::spawn_companion(&mut specs_world, config, start + Vec2::new(-1.5, 0.0));

        let dispatcher = DispatcherBuilder::new()
            .with(PlayerControlSystem, "player", &[])
            .with(EnemyAiSystem, "enemy_ai", &["player"])
            .with(BossSystem, "boss", &["player"])
            .with(CompanionSystem, "companion", &["player"])
            .with(AttachSystem, "attach", &["boss"])
            .with(
                MovementSystem,
                "movement",
                &["enemy_ai", "companion", "attach"],
            )
            .with(CollisionSystem, "collision", &["movement"])
            .with(LifetimeSystem, "lifetime", &["collision"])
            .build();

        let mut world = Self {
            specs_world,
            dispatcher,
            config: config.clone(),
            player,
            companion,
            boss_stage: stage.is_boss(),
            tick: 0,
        };

        {
            let mut scheduler = world.specs_world.write_resource::<Scheduler>();
            scheduler.schedule(
                config.companion.mood_poll_interval,
                Some(companion),
                TimedEvent::MoodPoll,
            );
            if !world.boss_stage {
                scheduler.schedule(
                    config.enemy.spawn_warmup + config.enemy.spawn_interval,
                    None,
                    TimedEvent::EnemySpawn,
                );
            }
        }
        if !world.boss_stage {
            let delay = world.asteroid_delay();
            world.schedule(delay, None, TimedEvent::AsteroidSpawn);
        }
        if world.boss_stage {
            world.spawn_boss();
        }
        log::info!("stage {} ready", stage.name);
        world
    }

    fn register_components(world: &mut SpecsWorld) {
        world.register::<Position>();
        world.register::<Velocity>();
        world.register::<Renderable>();
        world.register::<Collider>();
        world.register::<IntentStep>();
        world.register::<PlayerTag>();
        world.register::<Hostile>();
        world.register::<Invulnerable>();
        world.register::<CombatStats>();
        world.register::<Enemy>();
        world.register::<BossController>();
        world.register::<LegPart>();
        world.register::<Attached>();
        world.register::<Falling>();
        world.register::<Projectile>();
        world.register::<Companion>();
        world.register::<Asteroid>();
    }

    fn spawn_player(world: &mut SpecsWorld, start: Vec2) -> Entity {
        world
            .create_entity()
            .with(Position { pos: start })
            .with(Renderable::new('A', RGB::named(WHITE), 3))
            .with(PlayerTag)
            .build()
    }

    fn spawn_companion(world: &mut SpecsWorld, config: &GameConfig, start: Vec2) -> Entity {
        world
            .create_entity()
            .with(Position { pos: start })
            .with(Renderable::new('b', Mood::Calm.color(), 3))
            .with(Companion {
                engine: MoodEngine::new(MoodThresholds::from_config(&config.companion)),
                next_shot_at: 0.0,
                next_heal_at: 0.0,
                healing: false,
                nearby_enemies: 0,
            })
            .build()
    }

    /// Body above the arena with its legs fanned out underneath.
    fn spawn_boss(&mut self) {
        let tuning = &self.config.boss;
        let arena = Arena::from_config(&self.config.arena);
        let start = Vec2::new(0.0, arena.half_extents.y + tuning.spawn_height_offset);
        let controller = BossController::new(tuning, Vec2::ZERO);
        let leg_count = controller.legs().len();
        let boss = self
            .specs_world
            .create_entity()
            .with(Position { pos: start })
            .with(Renderable::new('M', BOSS_COLOR, 2))
            .with(Collider {
                radius: tuning.body_radius,
            })
            .with(controller)
            .build();

        for idx in 0..leg_count {
            let angle = PI + PI * (idx as f32 + 0.5) / leg_count as f32;
            let offset = Vec2::from_angle(angle) * tuning.leg_reach;
            let glyph = if offset.x < 0.0 { '/' } else { '\\' };
            self.specs_world
                .create_entity()
                .with(Position {
                    pos: start + offset,
                })
                .with(Renderable::new(glyph, BOSS_COLOR, 2))
                .with(Collider {
                    radius: tuning.weak_point_radius,
                })
                .with(LegPart {
                    boss,
                    leg: LegId(idx as u32),
                })
                .with(Attached {
                    parent: boss,
                    offset,
                })
                .build();
        }
        log::info!("spider boss spawned with {leg_count} legs");
    }

    pub fn spawn_enemy_at(&mut self, position: Vec2, hp: i32) -> Entity {
        let tuning = &self.config.enemy;
        let template = EnemyTemplate::rolled(hp, tuning.max_health);
        let now = self.now();
        let enemy = self
            .specs_world
            .create_entity()
            .with(Position { pos: position })
            .with(Renderable::new(template.glyph, template.color, 2))
            .with(Collider {
                radius: tuning.hit_radius,
            })
            .with(CombatStats {
                max_hp: template.hp,
                hp: template.hp,
            })
            .with(Enemy {
                name: template.name.to_string(),
                next_shot_at: now + f64::from(tuning.shot_interval),
            })
            .with(Hostile)
            .build();
        self.specs_world.write_resource::<Session>().enemies_alive += 1;
        log::debug!("spawned {} with {} hp", template.name, template.hp);
        enemy
    }

    pub fn spawn_asteroid_at(
        &mut self,
        position: Vec2,
        velocity: Vec2,
        size: AsteroidSize,
    ) -> Entity {
        let tuning = &self.config.asteroids;
        let glyph = match size {
            AsteroidSize::Small => 'o',
            AsteroidSize::Medium => 'O',
            AsteroidSize::Large => '@',
        };
        self.specs_world
            .create_entity()
            .with(Position { pos: position })
            .with(Velocity { linear: velocity })
            .with(Renderable::new(glyph, RGB::named(GRAY), 0))
            .with(Collider {
                radius: tuning.radius(size),
            })
            .with(Asteroid {
                size,
                damage: tuning.damage(size),
            })
            .build()
    }

    fn asteroid_delay(&self) -> f32 {
        let tuning = &self.config.asteroids;
        let mut rng = self.specs_world.write_resource::<RandomNumberGenerator>();
        roll_between(&mut rng, tuning.min_spawn_interval, tuning.max_spawn_interval)
    }

    /// Picks an entry edge (top, right or left), a heading across the arena
    /// with some wobble, a speed and a size.
    fn roll_asteroid(&self) -> (Vec2, Vec2, AsteroidSize) {
        let tuning = &self.config.asteroids;
        let mut rng = self.specs_world.write_resource::<RandomNumberGenerator>();
        let half = self.specs_world.read_resource::<Arena>().half_extents;
        let outer = half + Vec2::splat(tuning.spawn_margin);
        let along = rng.range(-1.0f32, 1.0);
        let (origin, heading) = match rng.range(0, 3) {
            0 => (Vec2::new(along * half.x, outer.y), Vec2::NEG_Y),
            1 => (Vec2::new(outer.x, along * half.y), Vec2::NEG_X),
            _ => (Vec2::new(-outer.x, along * half.y), Vec2::X),
        };
        let spread = tuning.angle_variation_degrees;
        let wobble = roll_between(&mut rng, -spread, spread).to_radians();
        let speed = roll_between(&mut rng, tuning.min_speed, tuning.max_speed);
        let size = tuning.size_for_roll(rng.range(0.0f32, 1.0));
        (origin, Vec2::from_angle(wobble).rotate(heading) * speed, size)
    }

    pub fn advance(&mut self, dt: f32) {
        let now = {
            let mut clock = self.specs_world.write_resource::<SimClock>();
            clock.dt = dt;
            clock.now += f64::from(dt);
            clock.now
        };
        self.specs_world.write_resource::<Scheduler>().set_now(now);
        self.dispatcher.dispatch(&mut self.specs_world);
        self.specs_world.maintain();
        self.run_timers(now);
        self.specs_world.maintain();
        self.tick = self.tick.wrapping_add(1);
    }

    fn run_timers(&mut self, now: f64) {
        let due = self.specs_world.write_resource::<Scheduler>().drain_due(now);
        for scheduled in due {
            match scheduled.owner {
                Some(owner) if !self.specs_world.is_alive(owner) => continue,
                _ => self.handle_timer(scheduled.owner, scheduled.event, now),
            }
        }
    }

    fn schedule(&mut self, delay: f32, owner: Option<Entity>, event: TimedEvent) {
        self.specs_world
            .write_resource::<Scheduler>()
            .schedule(delay, owner, event);
    }

    fn handle_timer(&mut self, owner: Option<Entity>, event: TimedEvent, now: f64) {
        match (event, owner) {
            (TimedEvent::MoodPoll, Some(companion)) => {
                self.poll_mood(companion);
                self.schedule(
                    self.config.companion.mood_poll_interval,
                    Some(companion),
                    TimedEvent::MoodPoll,
                );
            }
            (TimedEvent::HealApply, Some(companion)) => self.finish_heal(companion, now),
            (TimedEvent::EnemySpawn, _) => {
                let spawn = {
                    let session = self.specs_world.read_resource::<Session>();
                    !session.game_over && session.enemies_alive < self.config.enemy.max_alive
                };
                if spawn {
                    let (position, hp) = {
                        let mut rng = self.specs_world.write_resource::<RandomNumberGenerator>();
                        let arena = self.specs_world.read_resource::<Arena>();
                        let position = arena.random_edge_point(&mut rng, SPAWN_MARGIN);
                        let hp = rng.range(
                            self.config.enemy.min_health,
                            self.config.enemy.max_health + 1,
                        );
                        (position, hp)
                    };
                    self.spawn_enemy_at(position, hp);
                }
                self.schedule(self.config.enemy.spawn_interval, None, TimedEvent::EnemySpawn);
            }
            (TimedEvent::AsteroidSpawn, _) => {
                let game_over = self.specs_world.read_resource::<Session>().game_over;
                if !game_over {
                    let (position, velocity, size) = self.roll_asteroid();
                    self.spawn_asteroid_at(position, velocity, size);
                    log::debug!("{size:?} asteroid entering at {position:?}");
                }
                let delay = self.asteroid_delay();
                self.schedule(delay, None, TimedEvent::AsteroidSpawn);
            }
            (TimedEvent::BossVolley, Some(boss)) => self.fire_boss_volley(boss, now),
            (TimedEvent::EnrageFlash { remaining }, Some(boss)) => {
                let mut renderables = self.specs_world.write_component::<Renderable>();
                if let Some(render) = renderables.get_mut(boss) {
                    if remaining <= 1 {
                        render.base_color = RGB::named(RED);
                        render.color = render.base_color;
                    } else {
                        render.color = if remaining % 2 == 0 {
                            RGB::named(RED)
                        } else {
                            BOSS_COLOR
                        };
                    }
                }
                drop(renderables);
                if remaining > 1 {
                    self.schedule(
                        ENRAGE_FLASH_INTERVAL,
                        Some(boss),
                        TimedEvent::EnrageFlash {
                            remaining: remaining - 1,
                        },
                    );
                }
            }
            (TimedEvent::FlashEnd, Some(entity)) => {
                let mut renderables = self.specs_world.write_component::<Renderable>();
                if let Some(render) = renderables.get_mut(entity) {
                    render.color = render.base_color;
                }
            }
            (TimedEvent::InvulnerabilityEnd, Some(entity)) => {
                self.specs_world
                    .write_component::<Invulnerable>()
                    .remove(entity);
            }
            (TimedEvent::BossDeathShake { step }, Some(boss)) => self.shake_boss(boss, step),
            (TimedEvent::Despawn, Some(entity)) => self.despawn(entity),
            (TimedEvent::VictoryReady, _) => {
                let mut session = self.specs_world.write_resource::<Session>();
                if session.outcome.is_none() && !session.game_over {
                    session.outcome = Some(StageOutcome::Victory);
                    log::info!("stage cleared with {} points", session.score);
                }
            }
            (TimedEvent::PlayerLost, _) => {
                let mut session = self.specs_world.write_resource::<Session>();
                session.outcome = Some(StageOutcome::Defeat);
            }
            (event, None) => log::warn!("timer {event:?} fired without an owner"),
        }
    }

    fn poll_mood(&mut self, companion: Entity) {
        let health_ratio = self.specs_world.read_resource::<Session>().health_ratio();
        let change = {
            let mut companions = self.specs_world.write_component::<Companion>();
            companions.get_mut(companion).and_then(|state| {
                state.engine.poll(MoodSignals {
                    health_ratio,
                    nearby_enemies: state.nearby_enemies,
                })
            })
        };
        if let Some(change) = change {
            self.show_mood_change(change);
        }
    }

    fn show_mood_change(&mut self, change: MoodChange) {
        {
            let mut renderables = self.specs_world.write_component::<Renderable>();
            if let Some(render) = renderables.get_mut(self.companion) {
                render.base_color = change.to.color();
                render.color = render.base_color;
            }
        }
        self.specs_world
            .write_resource::<CombatLog>()
            .push(format!("Budy feels {}.", change.to.as_str()));
        log::debug!(
            "companion mood {} -> {}",
            change.from.as_str(),
            change.to.as_str()
        );
    }

    fn finish_heal(&mut self, companion: Entity, now: f64) {
        let healed = self
            .specs_world
            .write_resource::<Session>()
            .heal_player(self.config.companion.heal_amount);
        {
            let mut companions = self.specs_world.write_component::<Companion>();
            if let Some(state) = companions.get_mut(companion) {
                state.healing = false;
                state.next_heal_at = now + f64::from(self.config.companion.heal_cooldown);
            }
            let mut renderables = self.specs_world.write_component::<Renderable>();
            if let Some(render) = renderables.get_mut(companion) {
                render.color = render.base_color;
            }
        }
        if healed > 0 {
            self.specs_world
                .write_resource::<CombatLog>()
                .push(format!("Budy patches your hull (+{healed})."));
            self.specs_world
                .write_resource::<SoundQueue>()
                .play(AudioCue::Heal);
            log::debug!("companion healed {healed}");
        }
    }

    fn fire_boss_volley(&mut self, boss: Entity, now: f64) {
        let player_pos = self.player_position();
        let volley = {
            let positions = self.specs_world.read_component::<Position>();
            let bosses = self.specs_world.read_component::<BossController>();
            match (positions.get(boss), bosses.get(boss)) {
                (Some(pos), Some(controller)) if controller.state() == BossState::Fighting => {
                    let distance = pos.pos.distance(player_pos);
                    Some((
                        pos.pos,
                        controller.volley_directions(player_pos - pos.pos),
                        controller.attack_interval(Some(distance)),
                    ))
                }
                _ => None,
            }
        };
        let Some((origin, directions, interval)) = volley else {
            return;
        };
        let game_over = self.specs_world.read_resource::<Session>().game_over;
        if !game_over {
            for direction in directions {
                boss_bullet(&self.config, origin, direction, now)
                    .build(self.specs_world.create_entity());
            }
            self.specs_world
                .write_resource::<SoundQueue>()
                .play(AudioCue::EnemyShoot);
        }
        self.schedule(interval, Some(boss), TimedEvent::BossVolley);
    }

    fn shake_boss(&mut self, boss: Entity, step: u8) {
        if step >= DEATH_SHAKE_STEPS {
            if let Some(render) = self.specs_world.write_component::<Renderable>().get_mut(boss) {
                render.color = RGB::named(DARK_GRAY);
                render.base_color = render.color;
            }
            self.schedule(DEATH_FADE_SECONDS, Some(boss), TimedEvent::Despawn);
            return;
        }
        let twitch = {
            let mut rng = self.specs_world.write_resource::<RandomNumberGenerator>();
            random_in_circle(&mut rng) * DEATH_SHAKE_START * 0.9f32.powi(i32::from(step))
        };
        {
            let anchor = self
                .specs_world
                .read_component::<BossController>()
                .get(boss)
                .map(BossController::target_position);
            let mut positions = self.specs_world.write_component::<Position>();
            if let (Some(anchor), Some(pos)) = (anchor, positions.get_mut(boss)) {
                pos.pos = anchor + twitch;
            }
            let mut renderables = self.specs_world.write_component::<Renderable>();
            if let Some(render) = renderables.get_mut(boss) {
                render.color = if step % 2 == 0 {
                    RGB::named(WHITE)
                } else {
                    RGB::named(RED)
                };
            }
        }
        self.schedule(
            DEATH_SHAKE_INTERVAL,
            Some(boss),
            TimedEvent::BossDeathShake { step: step + 1 },
        );
    }

    /// Deletes `entity` along with any pending timers it owns.
    pub fn despawn(&mut self, entity: Entity) {
        self.specs_world
            .write_resource::<Scheduler>()
            .cancel_owner(entity);
        if let Err(err) = self.specs_world.delete_entity(entity) {
            log::debug!("despawn skipped: {err}");
        }
    }

    pub fn queue_player_step(&mut self, direction: Vec2) {
        let mut intents = self.specs_world.write_component::<IntentStep>();
        let _ = intents.insert(
            self.player,
            IntentStep {
                direction,
                remaining: self.config.player.input_step_seconds,
            },
        );
    }

    pub fn clear_player_intent(&mut self) {
        let mut intents = self.specs_world.write_component::<IntentStep>();
        let _ = intents.remove(self.player);
    }

    /// Returns `false` once the run is over.
    pub fn fire_laser(&mut self) -> bool {
        if self.specs_world.read_resource::<Session>().game_over {
            return false;
        }
        let origin = self.player_position() + Vec2::new(0.0, 0.5);
        player_laser(&self.config, origin, self.now()).build(self.specs_world.create_entity());
        self.specs_world
            .write_resource::<SoundQueue>()
            .play(AudioCue::PlayerShoot);
        true
    }

    /// Feeds a chat line to the companion's keyword scan.
    pub fn companion_hear(&mut self, text: &str) -> Option<MoodChange> {
        let change = {
            let mut companions = self.specs_world.write_component::<Companion>();
            companions
                .get_mut(self.companion)
                .and_then(|state| state.engine.apply_chat(text))
        };
        if let Some(change) = change {
            self.show_mood_change(change);
        }
        change
    }

    pub fn companion_mood(&self) -> Mood {
        self.specs_world
            .read_component::<Companion>()
            .get(self.companion)
            .map(Companion::mood)
            .unwrap_or_default()
    }

    pub fn session(&self) -> Session {
        (*self.specs_world.read_resource::<Session>()).clone()
    }

    pub fn carried_stats(&self) -> CarriedStats {
        let session = self.specs_world.read_resource::<Session>();
        CarriedStats {
            score: session.score,
            health: session.health,
            max_health: session.max_health,
        }
    }

    pub fn chat_context(&self) -> GameContext {
        let session = self.specs_world.read_resource::<Session>();
        GameContext {
            health: session.health,
            max_health: session.max_health,
            game_over: session.game_over,
            boss_level: self.boss_stage,
            mood: self.companion_mood(),
        }
    }

    pub fn take_outcome(&mut self) -> Option<StageOutcome> {
        self.specs_world.write_resource::<Session>().outcome.take()
    }

    pub fn is_boss_stage(&self) -> bool {
        self.boss_stage
    }

    pub fn boss_status(&self) -> Option<BossStatus> {
        let bosses = self.specs_world.read_component::<BossController>();
        bosses.join().next().map(|boss| BossStatus {
            state: boss.state(),
            legs_remaining: boss.legs_remaining(),
            leg_count: boss.legs().len(),
            body_hit_points: boss.body_hit_points(),
            vulnerable: boss.body_vulnerable(),
            enraged: boss.is_enraged(),
        })
    }

    pub fn drain_combat_log(&mut self) -> Vec<String> {
        let mut log = self.specs_world.write_resource::<CombatLog>();
        std::mem::take(&mut log.entries)
    }

    pub fn drain_sound_cues(&mut self) -> Vec<AudioCue> {
        let mut sounds = self.specs_world.write_resource::<SoundQueue>();
        std::mem::take(&mut sounds.cues)
    }

    /// Drawables in paint order.
    pub fn renderables(&self) -> Vec<(Vec2, Renderable)> {
        let positions = self.specs_world.read_component::<Position>();
        let renderables = self.specs_world.read_component::<Renderable>();
        let mut drawn: Vec<(Vec2, Renderable)> = (&positions, &renderables)
            .join()
            .map(|(pos, render)| (pos.pos, render.clone()))
            .collect();
        drawn.sort_by_key(|(_, render)| render.order);
        drawn
    }

    pub fn player_position(&self) -> Vec2 {
        self.specs_world
            .read_component::<Position>()
            .get(self.player)
            .map(|pos| pos.pos)
            .unwrap_or(Vec2::ZERO)
    }

    pub fn player_entity(&self) -> Entity {
        self.player
    }

    pub fn now(&self) -> f64 {
        self.specs_world.read_resource::<SimClock>().now
    }

    pub fn arena(&self) -> Arena {
        *self.specs_world.read_resource::<Arena>()
    }
}

/// Uniform roll that tolerates an empty range.
fn roll_between(rng: &mut RandomNumberGenerator, low: f32, high: f32) -> f32 {
    if high > low { rng.range(low, high) } else { low }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{components::Faction, systems::ShotSpec};

    const DT: f32 = 1.0 / 60.0;

    fn calm_config() -> GameConfig {
        let mut config = GameConfig::default();
        config.boss.jitter_chance = 0.0;
        config.companion.dodge_chance = 0.0;
        config
    }

    fn run_for(world: &mut EcsWorld, seconds: f32) {
        let frames = (seconds / DT).ceil() as usize;
        for _ in 0..frames {
            world.advance(DT);
        }
    }

    fn shield_player(world: &mut EcsWorld) {
        let player = world.player;
        let _ = world
            .specs_world
            .write_component::<Invulnerable>()
            .insert(player, Invulnerable);
    }

    fn place_shot(world: &mut EcsWorld, at: Vec2, faction: Faction) {
        let now = world.now();
        ShotSpec {
            origin: at,
            velocity: Vec2::ZERO,
            projectile: Projectile {
                faction,
                damage: 1,
                expires_at: now + 1.0,
                destination: None,
            },
            glyph: '|',
            color: RGB::named(WHITE),
        }
        .build(world.specs_world.create_entity());
    }

    fn live_weak_points(world: &EcsWorld) -> Vec<Vec2> {
        let offset = Vec2::new(0.0, world.config.boss.weak_point_offset);
        let positions = world.specs_world.read_component::<Position>();
        let parts = world.specs_world.read_component::<LegPart>();
        let attached = world.specs_world.read_component::<Attached>();
        (&positions, &parts, &attached)
            .join()
            .map(|(pos, _, _)| pos.pos + offset)
            .collect()
    }

    fn boss_position(world: &EcsWorld) -> Vec2 {
        let positions = world.specs_world.read_component::<Position>();
        let bosses = world.specs_world.read_component::<BossController>();
        (&positions, &bosses)
            .join()
            .next()
            .map(|(pos, _)| pos.pos)
            .unwrap()
    }

    fn boss_entity(world: &EcsWorld) -> Entity {
        let entities = world.specs_world.entities();
        let bosses = world.specs_world.read_component::<BossController>();
        (&entities, &bosses).join().next().map(|(e, _)| e).unwrap()
    }

    fn companion_distance(world: &EcsWorld) -> f32 {
        let positions = world.specs_world.read_component::<Position>();
        let companion = positions.get(world.companion).map(|pos| pos.pos).unwrap();
        companion.distance(world.player_position())
    }

    fn asteroid_count(world: &EcsWorld) -> usize {
        world.specs_world.read_component::<Asteroid>().join().count()
    }

    fn boss_world() -> EcsWorld {
        let mut world = EcsWorld::new(&calm_config(), &StageSpec::boss("Level3"), None, 11);
        shield_player(&mut world);
        world
    }

    #[test]
    fn boss_descends_then_arms_its_volley_once() {
        let mut world = boss_world();
        assert_eq!(world.boss_status().unwrap().state, BossState::Descending);
        run_for(&mut world, 5.0);
        let boss = boss_entity(&world);
        assert_eq!(world.boss_status().unwrap().state, BossState::Fighting);
        let scheduler = world.specs_world.read_resource::<Scheduler>();
        assert_eq!(scheduler.count_pending(boss, TimedEvent::BossVolley), 1);
    }

    #[test]
    fn four_leg_fight_ends_in_victory() {
        let mut world = boss_world();
        run_for(&mut world, 5.0);

        for expected_remaining in (0..4).rev() {
            let target = live_weak_points(&world)[0];
            for _ in 0..world.config.boss.leg_health {
                place_shot(&mut world, target, Faction::Player);
                world.advance(DT);
            }
            let status = world.boss_status().unwrap();
            assert_eq!(status.legs_remaining, expected_remaining);
            assert_eq!(status.vulnerable, expected_remaining == 0);
        }
        let status = world.boss_status().unwrap();
        assert!(status.enraged);
        assert!(live_weak_points(&world).is_empty());

        let boss = boss_entity(&world);
        for _ in 0..world.config.boss.body_health {
            let at = boss_position(&world);
            place_shot(&mut world, at, Faction::Player);
            world.advance(DT);
        }
        assert_eq!(world.boss_status().unwrap().state, BossState::Defeated);
        assert_eq!(world.session().score, 100);
        assert!(
            !world
                .specs_world
                .read_resource::<Scheduler>()
                .has_pending(boss, TimedEvent::BossVolley)
        );

        run_for(&mut world, 2.1);
        assert_eq!(world.take_outcome(), Some(StageOutcome::Victory));
        run_for(&mut world, 1.5);
        assert!(world.boss_status().is_none());
        assert_eq!(world.session().score, 100);
    }

    #[test]
    fn companion_bullets_leave_boss_legs_alone() {
        let mut world = boss_world();
        run_for(&mut world, 5.0);
        let target = live_weak_points(&world)[0];
        place_shot(&mut world, target, Faction::Companion);
        world.advance(DT);
        let boss = world.boss_status().unwrap();
        assert_eq!(boss.legs_remaining, 4);
    }

    #[test]
    fn supportive_companion_heals_the_player() {
        let config = calm_config();
        let mut world = EcsWorld::new(&config, &StageSpec::timed("Level1", 60.0), None, 5);
        shield_player(&mut world);
        world.specs_world.write_resource::<Session>().health = 1;

        run_for(&mut world, 0.6);
        assert_eq!(world.companion_mood(), Mood::Supportive);
        run_for(&mut world, 1.0);
        assert_eq!(world.session().health, 2);
        run_for(&mut world, 0.6);
        assert_eq!(world.companion_mood(), Mood::Calm);
    }

    #[test]
    fn heal_cooldown_allows_one_patch_per_window() {
        let mut config = calm_config();
        config.companion.critical_health_threshold = 0.9;
        config.companion.low_health_threshold = 0.95;
        config.companion.detection_radius = 0.0;
        let mut world = EcsWorld::new(&config, &StageSpec::timed("Level1", 60.0), None, 5);
        shield_player(&mut world);
        world.specs_world.write_resource::<Session>().health = 1;

        run_for(&mut world, 2.0);
        assert_eq!(world.companion_mood(), Mood::Supportive);
        assert_eq!(world.session().health, 2);
        run_for(&mut world, 5.0);
        assert_eq!(world.session().health, 2);
        run_for(&mut world, 6.0);
        assert_eq!(world.session().health, 3);
    }

    #[test]
    fn scared_companion_backs_off_to_its_follow_distance() {
        let mut config = calm_config();
        config.companion.low_health_threshold = 0.45;
        config.companion.detection_radius = 0.0;
        let mut world = EcsWorld::new(&config, &StageSpec::timed("Level1", 60.0), None, 5);
        shield_player(&mut world);
        world.specs_world.write_resource::<Session>().health = 2;

        run_for(&mut world, 5.6);
        assert_eq!(world.companion_mood(), Mood::Scared);
        let distance = companion_distance(&world);
        assert!((distance - 4.0).abs() <= 0.6, "companion at {distance}");
    }

    #[test]
    fn calm_companion_holds_inside_the_follow_band() {
        let mut config = calm_config();
        config.companion.detection_radius = 0.0;
        let mut world = EcsWorld::new(&config, &StageSpec::timed("Level1", 60.0), None, 5);
        shield_player(&mut world);
        run_for(&mut world, 1.0);
        assert_eq!(world.companion_mood(), Mood::Calm);
        assert!((companion_distance(&world) - 1.5).abs() < 1e-4);

        let player = world.player;
        if let Some(pos) = world.specs_world.write_component::<Position>().get_mut(player) {
            pos.pos.x += 3.0;
        }
        run_for(&mut world, 1.0);
        let distance = companion_distance(&world);
        assert!((distance - 2.0).abs() < 0.01, "companion at {distance}");
    }

    #[test]
    fn asteroid_breaks_on_the_player_for_its_size() {
        let mut world = EcsWorld::new(&calm_config(), &StageSpec::timed("Level1", 60.0), None, 3);
        let at = world.player_position();
        world.spawn_asteroid_at(at, Vec2::ZERO, AsteroidSize::Large);
        world.advance(DT);
        assert_eq!(world.session().health, 2);
        assert_eq!(asteroid_count(&world), 0);
        assert!(
            world
                .specs_world
                .read_component::<Invulnerable>()
                .contains(world.player)
        );
    }

    #[test]
    fn asteroid_leaving_the_arena_is_culled() {
        let mut world = EcsWorld::new(&calm_config(), &StageSpec::timed("Level1", 60.0), None, 3);
        let top = world.arena().half_extents.y;
        world.spawn_asteroid_at(
            Vec2::new(0.0, top + 2.5),
            Vec2::new(0.0, 5.0),
            AsteroidSize::Small,
        );
        world.advance(DT);
        assert_eq!(asteroid_count(&world), 1);
        run_for(&mut world, 0.2);
        assert_eq!(asteroid_count(&world), 0);
    }

    #[test]
    fn asteroids_drift_in_on_timed_stages_only() {
        let mut world = EcsWorld::new(&calm_config(), &StageSpec::timed("Level1", 60.0), None, 9);
        shield_player(&mut world);
        let mut seen = false;
        for _ in 0..(5.1 / DT) as usize {
            world.advance(DT);
            seen |= asteroid_count(&world) > 0;
        }
        assert!(seen);

        let mut world = boss_world();
        for _ in 0..(6.0 / DT) as usize {
            world.advance(DT);
            assert_eq!(asteroid_count(&world), 0);
        }
    }

    #[test]
    fn asteroid_spawner_idles_after_game_over() {
        let mut world = EcsWorld::new(&calm_config(), &StageSpec::timed("Level1", 60.0), None, 9);
        world.specs_world.write_resource::<Session>().game_over = true;
        for _ in 0..(12.0 / DT) as usize {
            world.advance(DT);
            assert_eq!(asteroid_count(&world), 0);
        }
    }

    #[test]
    fn enemies_steer_around_nearby_asteroids() {
        let mut config = calm_config();
        config.companion.detection_radius = 0.0;
        let mut world = EcsWorld::new(&config, &StageSpec::timed("Level1", 60.0), None, 3);
        let post = world.player_position() + Vec2::new(0.0, 4.0);
        let enemy = world.spawn_enemy_at(post, 3);
        world.spawn_asteroid_at(post + Vec2::new(1.0, 0.0), Vec2::ZERO, AsteroidSize::Medium);
        run_for(&mut world, 0.1);
        let positions = world.specs_world.read_component::<Position>();
        let moved = positions.get(enemy).map(|pos| pos.pos - post).unwrap();
        assert!(moved.x < -0.2, "enemy moved {moved:?}");
        assert!(moved.y.abs() < 0.05);
    }

    #[test]
    fn chat_override_holds_until_the_next_poll() {
        let mut world = EcsWorld::new(&calm_config(), &StageSpec::timed("Level1", 60.0), None, 5);
        let change = world.companion_hear("attack them!").unwrap();
        assert_eq!(change.to, Mood::Aggressive);
        world.advance(DT);
        assert_eq!(world.companion_mood(), Mood::Aggressive);
        run_for(&mut world, 0.6);
        assert_eq!(world.companion_mood(), Mood::Calm);
    }

    #[test]
    fn spawner_waits_then_caps_live_enemies() {
        let mut config = calm_config();
        config.companion.detection_radius = 0.0;
        let mut world = EcsWorld::new(&config, &StageSpec::timed("Level1", 60.0), None, 3);
        shield_player(&mut world);
        run_for(&mut world, 4.9);
        assert_eq!(world.session().enemies_alive, 0);
        run_for(&mut world, 0.3);
        assert_eq!(world.session().enemies_alive, 1);
        for _ in 0..1200 {
            world.advance(DT);
            assert!(world.session().enemies_alive <= 3);
        }
    }

    #[test]
    fn laser_kill_scores_ten() {
        let mut world = EcsWorld::new(&calm_config(), &StageSpec::timed("Level1", 60.0), None, 3);
        let above = world.player_position() + Vec2::new(0.0, 4.0);
        world.spawn_enemy_at(above, 1);
        assert!(world.fire_laser());
        run_for(&mut world, 0.6);
        let session = world.session();
        assert_eq!(session.score, 10);
        assert_eq!(session.enemies_alive, 0);
    }

    #[test]
    fn hit_grants_invulnerability_then_wears_off() {
        let mut world = EcsWorld::new(&calm_config(), &StageSpec::timed("Level1", 60.0), None, 3);
        let at = world.player_position();
        place_shot(&mut world, at, Faction::Boss);
        place_shot(&mut world, at + Vec2::new(0.1, 0.0), Faction::Enemy);
        world.advance(DT);
        assert_eq!(world.session().health, 4);
        assert!(
            world
                .specs_world
                .read_component::<Invulnerable>()
                .contains(world.player)
        );
        run_for(&mut world, 1.1);
        let at = world.player_position();
        place_shot(&mut world, at, Faction::Enemy);
        world.advance(DT);
        assert_eq!(world.session().health, 3);
    }

    #[test]
    fn lethal_hit_reports_defeat_after_the_death_sequence() {
        let mut world = EcsWorld::new(&calm_config(), &StageSpec::timed("Level1", 60.0), None, 3);
        world.specs_world.write_resource::<Session>().health = 1;
        let at = world.player_position();
        place_shot(&mut world, at, Faction::Enemy);
        world.advance(DT);
        let session = world.session();
        assert!(session.game_over);
        assert!(!world.fire_laser());
        run_for(&mut world, 2.5);
        assert_eq!(world.take_outcome(), None);
        run_for(&mut world, 0.6);
        assert_eq!(world.take_outcome(), Some(StageOutcome::Defeat));
    }

    #[test]
    fn carried_stats_seed_the_session() {
        let carried = CarriedStats {
            score: 70,
            health: 2,
            max_health: 5,
        };
        let world = EcsWorld::new(&calm_config(), &StageSpec::boss("Level3"), Some(carried), 1);
        assert_eq!(world.carried_stats(), carried);
        assert!(world.chat_context().boss_level);
    }
}
