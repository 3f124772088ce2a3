#![allow(dead_code)]

use bracket_random::prelude::RandomNumberGenerator;
use bracket_terminal::prelude::{DARK_GRAY, LIGHT_BLUE, ORANGE, RED, RGB, WHITE};
use glam::Vec2;
use specs::{prelude::*, storage::MaskedStorage};
use std::ops::Deref;

use crate::{
    ai::MoodProfile,
    boss::{BodyHit, BossController, BossState, Leg, LegHit, random_in_circle},
    data::GameConfig,
};

use super::{
    components::{
        Asteroid, Attached, Collider, CombatStats, Companion, Enemy, Faction, Falling, Hostile,
        IntentStep, Invulnerable, LegPart, PlayerTag, Position, Projectile, Renderable, Velocity,
    },
    resources::{Arena, AudioCue, CombatLog, Session, SimClock, SoundQueue},
    scheduler::{Scheduler, TimedEvent},
};

pub const SHOT_RADIUS: f32 = 0.2;
const OFFSCREEN_MARGIN: f32 = 3.0;
const FLASH_SECONDS: f32 = 0.1;
const HEAL_REACH_SLACK: f32 = 0.05;

/// Everything needed to put one projectile in flight.
#[derive(Clone, Debug)]
pub struct ShotSpec {
    pub origin: Vec2,
    pub velocity: Vec2,
    pub projectile: Projectile,
    pub glyph: char,
    pub color: RGB,
}

impl ShotSpec {
    pub fn build<B: Builder>(self, builder: B) -> Entity {
        builder
            .with(Position { pos: self.origin })
            .with(Velocity {
                linear: self.velocity,
            })
            .with(Renderable::new(self.glyph, self.color, 1))
            .with(Collider {
                radius: SHOT_RADIUS,
            })
            .with(self.projectile)
            .build()
    }
}

pub fn player_laser(config: &GameConfig, origin: Vec2, now: f64) -> ShotSpec {
    ShotSpec {
        origin,
        velocity: Vec2::Y * config.player.laser_speed,
        projectile: Projectile {
            faction: Faction::Player,
            damage: config.player.laser_damage,
            expires_at: now + f64::from(config.player.laser_lifetime),
            destination: None,
        },
        glyph: '|',
        color: RGB::named(LIGHT_BLUE),
    }
}

pub fn boss_bullet(config: &GameConfig, origin: Vec2, direction: Vec2, now: f64) -> ShotSpec {
    ShotSpec {
        origin,
        velocity: direction * config.boss.bullet_speed,
        projectile: Projectile {
            faction: Faction::Boss,
            damage: 1,
            expires_at: now + f64::from(config.boss.bullet_lifetime),
            destination: None,
        },
        glyph: 'o',
        color: RGB::named(ORANGE),
    }
}

/// Push away from every rock inside `radius`, weighted by closeness and
/// scaled to `force`.
pub fn asteroid_avoidance(at: Vec2, rocks: &[Vec2], radius: f32, force: f32) -> Vec2 {
    let push: Vec2 = rocks
        .iter()
        .filter_map(|rock| {
            let away = at - *rock;
            let distance = away.length();
            (distance > 0.0 && distance < radius)
                .then(|| away / distance * (1.0 - distance / radius))
        })
        .sum();
    push.normalize_or_zero() * force
}

fn player_snapshot<D>(
    entities: &Entities,
    positions: &Storage<Position, D>,
    players: &ReadStorage<PlayerTag>,
) -> Option<(Entity, Vec2)>
where
    D: Deref<Target = MaskedStorage<Position>>,
{
    (entities, positions, players)
        .join()
        .next()
        .map(|(entity, pos, _)| (entity, pos.pos))
}

fn flash(
    renderables: &mut WriteStorage<Renderable>,
    scheduler: &mut Scheduler,
    entity: Entity,
    color: RGB,
) {
    if let Some(render) = renderables.get_mut(entity) {
        render.color = color;
        scheduler.schedule(FLASH_SECONDS, Some(entity), TimedEvent::FlashEnd);
    }
}

#[derive(Default)]
pub struct PlayerControlSystem;

impl<'a> System<'a> for PlayerControlSystem {
    type SystemData = (
        Entities<'a>,
        WriteStorage<'a, Position>,
        WriteStorage<'a, IntentStep>,
        ReadStorage<'a, PlayerTag>,
        ReadExpect<'a, Arena>,
        ReadExpect<'a, SimClock>,
        ReadExpect<'a, GameConfig>,
        ReadExpect<'a, Session>,
    );

    fn run(
        &mut self,
        (entities, mut positions, mut intents, players, arena, clock, config, session): Self::SystemData,
    ) {
        let mut finished = Vec::new();
        for (entity, pos, intent, _) in (&entities, &mut positions, &mut intents, &players).join() {
            if session.game_over {
                finished.push(entity);
                continue;
            }
            let step = clock.dt.min(intent.remaining).max(0.0);
            let travel = intent.direction.normalize_or_zero() * config.player.move_speed * step;
            pos.pos = arena.clamp(pos.pos + travel);
            intent.remaining -= clock.dt;
            if intent.remaining <= 0.0 {
                finished.push(entity);
            }
        }
        for entity in finished {
            intents.remove(entity);
        }
    }
}

#[derive(Default)]
pub struct EnemyAiSystem;

impl<'a> System<'a> for EnemyAiSystem {
    type SystemData = (
        Entities<'a>,
        WriteStorage<'a, Position>,
        WriteStorage<'a, Enemy>,
        ReadStorage<'a, PlayerTag>,
        ReadStorage<'a, Asteroid>,
        ReadExpect<'a, SimClock>,
        ReadExpect<'a, GameConfig>,
        WriteExpect<'a, Session>,
        WriteExpect<'a, SoundQueue>,
        Read<'a, LazyUpdate>,
    );

    fn run(
        &mut self,
        (
            entities,
            mut positions,
            mut enemies,
            players,
            asteroids,
            clock,
            config,
            mut session,
            mut sounds,
            lazy,
        ): Self::SystemData,
    ) {
        let Some((_, target)) = player_snapshot(&entities, &positions, &players) else {
            return;
        };
        let rocks: Vec<Vec2> = (&positions, &asteroids)
            .join()
            .map(|(pos, _)| pos.pos)
            .collect();
        let tuning = &config.enemy;
        let mut shots = Vec::new();
        for (entity, pos, enemy) in (&entities, &mut positions, &mut enemies).join() {
            let offset = target - pos.pos;
            let distance = offset.length();
            if distance > tuning.despawn_distance {
                let _ = entities.delete(entity);
                session.enemy_escaped();
                log::debug!("{} drifted out of range", enemy.name);
                continue;
            }
            let toward = offset.normalize_or_zero();
            let base = if distance > tuning.stopping_distance {
                toward
            } else if distance < tuning.retreat_distance {
                -toward
            } else {
                Vec2::ZERO
            };
            let avoidance = asteroid_avoidance(
                pos.pos,
                &rocks,
                tuning.asteroid_detection_radius,
                tuning.avoidance_force,
            );
            pos.pos += (base + avoidance).normalize_or_zero() * tuning.speed * clock.dt;

            if !session.game_over && clock.now >= enemy.next_shot_at {
                enemy.next_shot_at = clock.now + f64::from(tuning.shot_interval);
                let flight = distance / tuning.laser_speed.max(f32::EPSILON);
                shots.push(ShotSpec {
                    origin: pos.pos,
                    velocity: toward * tuning.laser_speed,
                    projectile: Projectile {
                        faction: Faction::Enemy,
                        damage: 1,
                        expires_at: clock.now + f64::from(flight) + 1.0,
                        destination: Some(target),
                    },
                    glyph: '!',
                    color: RGB::named(RED),
                });
            }
        }
        for shot in shots {
            shot.build(lazy.create_entity(&entities));
            sounds.play(AudioCue::EnemyShoot);
        }
    }
}

#[derive(Default)]
pub struct BossSystem;

impl<'a> System<'a> for BossSystem {
    type SystemData = (
        Entities<'a>,
        WriteStorage<'a, Position>,
        WriteStorage<'a, BossController>,
        ReadStorage<'a, PlayerTag>,
        ReadExpect<'a, SimClock>,
        ReadExpect<'a, Arena>,
        WriteExpect<'a, RandomNumberGenerator>,
        WriteExpect<'a, Scheduler>,
        WriteExpect<'a, CombatLog>,
        WriteExpect<'a, SoundQueue>,
    );

    fn run(
        &mut self,
        (
            entities,
            mut positions,
            mut bosses,
            players,
            clock,
            arena,
            mut rng,
            mut scheduler,
            mut combat_log,
            mut sounds,
        ): Self::SystemData,
    ) {
        let player = player_snapshot(&entities, &positions, &players).map(|(_, pos)| pos);
        for (entity, pos, boss) in (&entities, &mut positions, &mut bosses).join() {
            match boss.state() {
                BossState::Descending => {
                    let (next, started) = boss.descend(pos.pos, clock.dt);
                    pos.pos = next;
                    if started {
                        let distance = player.map(|target| target.distance(pos.pos));
                        scheduler.schedule(
                            boss.attack_interval(distance),
                            Some(entity),
                            TimedEvent::BossVolley,
                        );
                        combat_log.push("The spider boss is ready to fight!");
                        sounds.play(AudioCue::BossRoar);
                        log::info!("boss reached the arena at {:?}", pos.pos);
                    }
                }
                BossState::Fighting => {
                    let Some(target) = player else {
                        continue;
                    };
                    let mut next = pos.pos + boss.standoff_velocity(pos.pos, target) * clock.dt;
                    if let Some(twitch) = boss.jitter(&mut rng) {
                        next += twitch;
                    }
                    pos.pos = arena.clamp(next);
                }
                BossState::Defeated => {}
            }
        }
    }
}

/// Pins attached parts to their parent; parts whose parent is gone go too.
#[derive(Default)]
pub struct AttachSystem;

impl<'a> System<'a> for AttachSystem {
    type SystemData = (
        Entities<'a>,
        WriteStorage<'a, Position>,
        ReadStorage<'a, Attached>,
    );

    fn run(&mut self, (entities, mut positions, attached): Self::SystemData) {
        let pinned: Vec<(Entity, Option<Vec2>)> = (&entities, &attached)
            .join()
            .map(|(entity, link)| {
                let anchor = entities
                    .is_alive(link.parent)
                    .then(|| positions.get(link.parent).map(|pos| pos.pos + link.offset))
                    .flatten();
                (entity, anchor)
            })
            .collect();
        for (entity, anchor) in pinned {
            match anchor {
                Some(point) => {
                    if let Some(pos) = positions.get_mut(entity) {
                        pos.pos = point;
                    }
                }
                None => {
                    let _ = entities.delete(entity);
                }
            }
        }
    }
}

#[derive(Default)]
pub struct CompanionSystem;

impl<'a> System<'a> for CompanionSystem {
    type SystemData = (
        Entities<'a>,
        WriteStorage<'a, Position>,
        WriteStorage<'a, Companion>,
        WriteStorage<'a, Renderable>,
        ReadStorage<'a, PlayerTag>,
        ReadStorage<'a, Hostile>,
        ReadExpect<'a, SimClock>,
        ReadExpect<'a, GameConfig>,
        ReadExpect<'a, Arena>,
        ReadExpect<'a, Session>,
        WriteExpect<'a, RandomNumberGenerator>,
        WriteExpect<'a, Scheduler>,
        Read<'a, LazyUpdate>,
    );

    fn run(
        &mut self,
        (
            entities,
            mut positions,
            mut companions,
            mut renderables,
            players,
            hostiles,
            clock,
            config,
            arena,
            session,
            mut rng,
            mut scheduler,
            lazy,
        ): Self::SystemData,
    ) {
        let Some((_, player_pos)) = player_snapshot(&entities, &positions, &players) else {
            return;
        };
        let threats: Vec<Vec2> = (&positions, &hostiles)
            .join()
            .map(|(pos, _)| pos.pos)
            .collect();
        let tuning = &config.companion;
        let mut shots = Vec::new();

        for (entity, pos, companion) in (&entities, &mut positions, &mut companions).join() {
            let in_range: Vec<Vec2> = threats
                .iter()
                .copied()
                .filter(|threat| threat.distance(pos.pos) <= tuning.detection_radius)
                .collect();
            companion.nearby_enemies = in_range.len();
            if session.game_over {
                continue;
            }

            let profile = MoodProfile::for_mood(companion.mood(), tuning);
            let offset = player_pos - pos.pos;
            let gap = offset.length() - profile.follow_distance;
            let toward = offset.normalize_or_zero();
            // Supportive closes in all the way; other moods hold a band.
            let band = if profile.backs_off {
                tuning.follow_tolerance
            } else {
                0.0
            };
            if gap > band {
                pos.pos += toward * (profile.move_speed * clock.dt).min(gap);
            } else if profile.backs_off && gap < -band {
                let away = if toward == Vec2::ZERO { Vec2::NEG_Y } else { -toward };
                pos.pos += away * (profile.move_speed * clock.dt).min(-gap);
            }
            if profile.dodges && rng.range(0.0f32, 1.0) < tuning.dodge_chance {
                pos.pos += random_in_circle(&mut rng) * tuning.dodge_radius;
            }
            pos.pos = arena.clamp(pos.pos);

            match profile.shot_interval {
                Some(interval) => {
                    if clock.now < companion.next_shot_at {
                        continue;
                    }
                    let nearest = in_range.iter().copied().min_by(|a, b| {
                        a.distance_squared(pos.pos)
                            .total_cmp(&b.distance_squared(pos.pos))
                    });
                    if let Some(target) = nearest {
                        companion.next_shot_at = clock.now + f64::from(interval);
                        shots.push(ShotSpec {
                            origin: pos.pos,
                            velocity: (target - pos.pos).normalize_or_zero() * tuning.bullet_speed,
                            projectile: Projectile {
                                faction: Faction::Companion,
                                damage: 1,
                                expires_at: clock.now + f64::from(tuning.bullet_lifetime),
                                destination: None,
                            },
                            glyph: '*',
                            color: companion.mood().color(),
                        });
                    }
                }
                None => {
                    let close_enough = pos.pos.distance(player_pos)
                        <= tuning.healing_distance + HEAL_REACH_SLACK;
                    if close_enough
                        && !companion.healing
                        && clock.now >= companion.next_heal_at
                        && session.health < session.max_health
                    {
                        companion.healing = true;
                        if let Some(render) = renderables.get_mut(entity) {
                            render.color = RGB::named(WHITE);
                        }
                        scheduler.schedule(tuning.heal_windup, Some(entity), TimedEvent::HealApply);
                    }
                }
            }
        }

        for shot in shots {
            shot.build(lazy.create_entity(&entities));
        }
    }
}

#[derive(Default)]
pub struct MovementSystem;

impl<'a> System<'a> for MovementSystem {
    type SystemData = (
        WriteStorage<'a, Position>,
        WriteStorage<'a, Velocity>,
        ReadStorage<'a, Falling>,
        ReadExpect<'a, SimClock>,
    );

    fn run(&mut self, (mut positions, mut velocities, falling, clock): Self::SystemData) {
        for (vel, fall) in (&mut velocities, &falling).join() {
            vel.linear.y -= fall.gravity * clock.dt;
        }
        for (pos, vel) in (&mut positions, &velocities).join() {
            pos.pos += vel.linear * clock.dt;
        }
    }
}

/// Shared sinks for anything a collision can set off.
struct Feedback<'s> {
    config: &'s GameConfig,
    session: &'s mut Session,
    scheduler: &'s mut Scheduler,
    combat_log: &'s mut CombatLog,
    sounds: &'s mut SoundQueue,
}

impl Feedback<'_> {
    fn damage_player(
        &mut self,
        player: Entity,
        amount: i32,
        invulnerable: &mut WriteStorage<Invulnerable>,
        renderables: &mut WriteStorage<Renderable>,
    ) -> bool {
        if invulnerable.contains(player) || self.session.game_over {
            return false;
        }
        let destroyed = self.session.player_take_damage(amount);
        self.sounds.play(AudioCue::PlayerHit);
        if destroyed {
            self.combat_log.push("Your ship breaks apart!");
            self.sounds.play(AudioCue::GameOver);
            self.scheduler.schedule(
                self.config.levels.death_sequence_seconds,
                None,
                TimedEvent::PlayerLost,
            );
            if let Some(render) = renderables.get_mut(player) {
                render.color = RGB::named(DARK_GRAY);
                render.base_color = render.color;
            }
            log::info!("player destroyed with {} points", self.session.score);
        } else {
            self.combat_log.push(format!(
                "Hull hit! {}/{} remaining.",
                self.session.health, self.session.max_health
            ));
            let _ = invulnerable.insert(player, Invulnerable);
            self.scheduler.schedule(
                self.config.player.invincibility_seconds,
                Some(player),
                TimedEvent::InvulnerabilityEnd,
            );
            flash(renderables, self.scheduler, player, RGB::named(RED));
        }
        true
    }
}

#[derive(Default)]
pub struct CollisionSystem;

impl<'a> System<'a> for CollisionSystem {
    type SystemData = (
        Entities<'a>,
        ReadStorage<'a, Position>,
        ReadStorage<'a, Projectile>,
        ReadStorage<'a, Collider>,
        ReadStorage<'a, PlayerTag>,
        ReadStorage<'a, Hostile>,
        ReadStorage<'a, Enemy>,
        ReadStorage<'a, Asteroid>,
        WriteStorage<'a, CombatStats>,
        ReadStorage<'a, LegPart>,
        WriteStorage<'a, BossController>,
        WriteStorage<'a, Attached>,
        WriteStorage<'a, Falling>,
        WriteStorage<'a, Velocity>,
        WriteStorage<'a, Renderable>,
        WriteStorage<'a, Invulnerable>,
        ReadExpect<'a, GameConfig>,
        WriteExpect<'a, Session>,
        WriteExpect<'a, Scheduler>,
        WriteExpect<'a, CombatLog>,
        WriteExpect<'a, SoundQueue>,
    );

    fn run(
        &mut self,
        (
            entities,
            positions,
            projectiles,
            colliders,
            players,
            hostiles,
            enemies,
            asteroids,
            mut stats,
            leg_parts,
            mut bosses,
            mut attached,
            mut falling,
            mut velocities,
            mut renderables,
            mut invulnerable,
            config,
            mut session,
            mut scheduler,
            mut combat_log,
            mut sounds,
        ): Self::SystemData,
    ) {
        let mut feedback = Feedback {
            config: &config,
            session: &mut *session,
            scheduler: &mut *scheduler,
            combat_log: &mut *combat_log,
            sounds: &mut *sounds,
        };
        let player = player_snapshot(&entities, &positions, &players);
        let shots: Vec<(Entity, Vec2, Projectile)> = (&entities, &positions, &projectiles)
            .join()
            .map(|(entity, pos, projectile)| (entity, pos.pos, projectile.clone()))
            .collect();
        let mut destroyed: Vec<Entity> = Vec::new();

        for (shot, at, projectile) in shots {
            let consumed = if projectile.faction.hurts_player() {
                match player {
                    Some((player_entity, player_pos))
                        if at.distance(player_pos) <= config.player.hit_radius + SHOT_RADIUS =>
                    {
                        feedback.damage_player(
                            player_entity,
                            projectile.damage,
                            &mut invulnerable,
                            &mut renderables,
                        );
                        true
                    }
                    _ => false,
                }
            } else {
                let struck_enemy = {
                    let reach = config.enemy.hit_radius + SHOT_RADIUS;
                    let target = (&entities, &positions, &enemies)
                        .join()
                        .find(|(entity, pos, _)| {
                            !destroyed.contains(entity) && pos.pos.distance(at) <= reach
                        })
                        .map(|(entity, _, enemy)| (entity, enemy.name.clone()));
                    match target {
                        Some((enemy, name)) => {
                            if let Some(enemy_stats) = stats.get_mut(enemy) {
                                enemy_stats.hp -= projectile.damage;
                                if enemy_stats.hp <= 0 {
                                    let _ = entities.delete(enemy);
                                    destroyed.push(enemy);
                                    feedback.session.enemy_destroyed(config.enemy.score_value);
                                    feedback.combat_log.push(format!(
                                        "{name} destroyed! +{}",
                                        config.enemy.score_value
                                    ));
                                    feedback.sounds.play(AudioCue::EnemyDestroyed);
                                } else {
                                    feedback.sounds.play(AudioCue::EnemyHit);
                                    flash(
                                        &mut renderables,
                                        feedback.scheduler,
                                        enemy,
                                        RGB::named(WHITE),
                                    );
                                }
                            }
                            true
                        }
                        None => false,
                    }
                };
                struck_enemy
                    || (projectile.faction == Faction::Player
                        && (self.strike_leg(
                            at,
                            &entities,
                            &positions,
                            &leg_parts,
                            &mut bosses,
                            &mut attached,
                            &mut falling,
                            &mut velocities,
                            &mut renderables,
                            &mut feedback,
                        ) || self.strike_body(
                            at,
                            projectile.damage,
                            &entities,
                            &positions,
                            &mut bosses,
                            &mut renderables,
                            &mut feedback,
                        )))
            };
            if consumed {
                let _ = entities.delete(shot);
            }
        }

        if let Some((player_entity, player_pos)) = player {
            let rammed = (&entities, &positions, &hostiles, &colliders)
                .join()
                .any(|(entity, pos, _, collider)| {
                    !destroyed.contains(&entity)
                        && pos.pos.distance(player_pos) <= collider.radius + config.player.hit_radius
                });
            if rammed {
                feedback.damage_player(player_entity, 1, &mut invulnerable, &mut renderables);
            }

            if !feedback.session.game_over {
                let reach = config.player.hit_radius;
                let struck: Vec<(Entity, Asteroid)> =
                    (&entities, &positions, &asteroids, &colliders)
                        .join()
                        .filter(|(_, pos, _, collider)| {
                            pos.pos.distance(player_pos) <= collider.radius + reach
                        })
                        .map(|(entity, _, rock, _)| (entity, rock.clone()))
                        .collect();
                for (rock, asteroid) in struck {
                    feedback.damage_player(
                        player_entity,
                        asteroid.damage,
                        &mut invulnerable,
                        &mut renderables,
                    );
                    let _ = entities.delete(rock);
                    log::debug!("{:?} asteroid broke on the hull", asteroid.size);
                }
            }
        }
    }
}

impl CollisionSystem {
    /// Player lasers only. A dead leg's weak point lets the laser pass.
    #[allow(clippy::too_many_arguments)]
    fn strike_leg(
        &self,
        at: Vec2,
        entities: &Entities,
        positions: &ReadStorage<Position>,
        leg_parts: &ReadStorage<LegPart>,
        bosses: &mut WriteStorage<BossController>,
        attached: &mut WriteStorage<Attached>,
        falling: &mut WriteStorage<Falling>,
        velocities: &mut WriteStorage<Velocity>,
        renderables: &mut WriteStorage<Renderable>,
        feedback: &mut Feedback,
    ) -> bool {
        let config = feedback.config;
        let tuning = &config.boss;
        let weak_point = Vec2::new(0.0, tuning.weak_point_offset);
        let reach = tuning.weak_point_radius + SHOT_RADIUS;
        let target = (entities, positions, leg_parts)
            .join()
            .find(|(_, pos, part)| {
                let alive = bosses
                    .get(part.boss)
                    .and_then(|boss| boss.leg(part.leg))
                    .is_some_and(Leg::accepts_hits);
                alive && (pos.pos + weak_point).distance(at) <= reach
            })
            .map(|(entity, _, part)| (entity, part.clone()));
        let Some((leg_entity, part)) = target else {
            return false;
        };
        let Some(boss) = bosses.get_mut(part.boss) else {
            return false;
        };

        let report = boss.hit_leg(part.leg);
        match report.hit {
            LegHit::Ignored => return false,
            LegHit::Damaged { hit_points } => {
                feedback.sounds.play(AudioCue::EnemyHit);
                flash(renderables, feedback.scheduler, leg_entity, RGB::named(WHITE));
                log::debug!("leg {} down to {hit_points}", part.leg.0);
            }
            LegHit::Destroyed => {
                attached.remove(leg_entity);
                let _ = velocities.insert(leg_entity, Velocity::default());
                let _ = falling.insert(
                    leg_entity,
                    Falling {
                        gravity: tuning.leg_fall_gravity,
                    },
                );
                if let Some(render) = renderables.get_mut(leg_entity) {
                    render.color = RGB::named(DARK_GRAY);
                    render.base_color = render.color;
                }
                feedback.scheduler.cancel_owner(leg_entity);
                feedback
                    .scheduler
                    .schedule(tuning.leg_fall_seconds, Some(leg_entity), TimedEvent::Despawn);
                feedback.combat_log.push(format!(
                    "A leg snaps off! {} remaining.",
                    boss.legs_remaining()
                ));
                feedback.sounds.play(AudioCue::LegDestroyed);
                log::info!(
                    "boss leg {} destroyed, {} remaining",
                    part.leg.0,
                    boss.legs_remaining()
                );
                if report.enraged {
                    feedback
                        .combat_log
                        .push("The spider is enraged! Its body is exposed.");
                    feedback.sounds.play(AudioCue::BossRoar);
                    feedback.scheduler.schedule(
                        0.0,
                        Some(part.boss),
                        TimedEvent::EnrageFlash { remaining: 6 },
                    );
                    log::info!("boss enraged");
                }
            }
        }
        true
    }

    /// Player lasers only. The body collider exists only while exposed.
    #[allow(clippy::too_many_arguments)]
    fn strike_body(
        &self,
        at: Vec2,
        damage: i32,
        entities: &Entities,
        positions: &ReadStorage<Position>,
        bosses: &mut WriteStorage<BossController>,
        renderables: &mut WriteStorage<Renderable>,
        feedback: &mut Feedback,
    ) -> bool {
        let config = feedback.config;
        let tuning = &config.boss;
        let reach = tuning.body_radius + SHOT_RADIUS;
        let Some((boss_entity, boss_pos, boss)) = (entities, positions, &mut *bosses)
            .join()
            .find(|(_, pos, boss)| {
                boss.body_vulnerable() && !boss.is_defeated() && pos.pos.distance(at) <= reach
            })
            .map(|(entity, pos, boss)| (entity, pos.pos, boss))
        else {
            return false;
        };

        match boss.take_body_damage(damage) {
            BodyHit::Ignored => {}
            BodyHit::Damaged { hit_points } => {
                feedback.sounds.play(AudioCue::EnemyHit);
                flash(renderables, feedback.scheduler, boss_entity, RGB::named(WHITE));
                log::debug!("boss body down to {hit_points}");
            }
            BodyHit::Defeated => {
                boss.set_target_position(boss_pos);
                feedback.session.boss_destroyed(tuning.score_value);
                let cancelled = feedback.scheduler.cancel_owner(boss_entity);
                feedback.scheduler.schedule(
                    0.0,
                    Some(boss_entity),
                    TimedEvent::BossDeathShake { step: 0 },
                );
                feedback
                    .scheduler
                    .schedule(tuning.victory_delay, None, TimedEvent::VictoryReady);
                feedback.combat_log.push(format!(
                    "The spider boss is destroyed! +{}",
                    tuning.score_value
                ));
                feedback.sounds.play(AudioCue::Victory);
                log::info!("boss defeated, {cancelled} pending timers cancelled");
            }
        }
        true
    }
}

/// Removes projectiles that expired, left the arena, or reached their mark,
/// and asteroids that drifted off the far side.
#[derive(Default)]
pub struct LifetimeSystem;

impl<'a> System<'a> for LifetimeSystem {
    type SystemData = (
        Entities<'a>,
        ReadStorage<'a, Position>,
        ReadStorage<'a, Velocity>,
        ReadStorage<'a, Projectile>,
        ReadStorage<'a, Asteroid>,
        ReadExpect<'a, SimClock>,
        ReadExpect<'a, Arena>,
        ReadExpect<'a, GameConfig>,
    );

    fn run(
        &mut self,
        (entities, positions, velocities, projectiles, asteroids, clock, arena, config): Self::SystemData,
    ) {
        for (entity, pos, _) in (&entities, &positions, &asteroids).join() {
            if !arena.contains(pos.pos, config.asteroids.cull_margin) {
                let _ = entities.delete(entity);
            }
        }
        for (entity, pos, vel, projectile) in
            (&entities, &positions, &velocities, &projectiles).join()
        {
            let arrived = projectile
                .destination
                .is_some_and(|mark| (mark - pos.pos).dot(vel.linear) <= 0.0);
            if arrived
                || clock.now >= projectile.expires_at
                || !arena.contains(pos.pos, OFFSCREEN_MARGIN)
            {
                let _ = entities.delete(entity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avoidance_pushes_away_from_close_rocks_only() {
        let push = asteroid_avoidance(Vec2::ZERO, &[Vec2::new(1.0, 0.0)], 3.0, 5.0);
        assert!((push - Vec2::new(-5.0, 0.0)).length() < 1e-5);

        let far = asteroid_avoidance(Vec2::ZERO, &[Vec2::new(0.0, 3.5)], 3.0, 5.0);
        assert_eq!(far, Vec2::ZERO);

        let closer_wins =
            asteroid_avoidance(Vec2::ZERO, &[Vec2::new(1.0, 0.0), Vec2::new(-2.5, 0.0)], 3.0, 5.0);
        assert!(closer_wins.x < 0.0);
    }
}
