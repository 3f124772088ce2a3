//! The spider boss encounter: a body guarded by destructible legs.
//!
//! `BossController` is plain state with no ECS access; the boss systems feed it
//! positions and elapsed time and act on the events it returns.

pub mod leg;

use std::f32::consts::{FRAC_PI_2, TAU};

use bracket_random::prelude::RandomNumberGenerator;
use glam::Vec2;
use smallvec::SmallVec;

use crate::data::BossConfig;

pub use self::leg::{Leg, LegHit, LegId};

pub type Volley = SmallVec<[Vec2; 16]>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum BossState {
    Descending,
    Fighting,
    Defeated,
}

impl BossState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BossState::Descending => "descending",
            BossState::Fighting => "fighting",
            BossState::Defeated => "defeated",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyHit {
    Ignored,
    Damaged { hit_points: i32 },
    Defeated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LegHitReport {
    pub hit: LegHit,
    /// Set on the hit that took the last leg.
    pub enraged: bool,
}

#[derive(Clone, Debug)]
pub struct BossController {
    state: BossState,
    body_hit_points: i32,
    legs: Vec<Leg>,
    target_position: Vec2,
    enraged: bool,
    speed_multiplier: f32,
    tuning: BossConfig,
}

impl BossController {
    pub fn new(tuning: &BossConfig, target_position: Vec2) -> Self {
        let legs = (0..tuning.leg_count)
            .map(|idx| Leg::new(LegId(idx as u32), tuning.leg_health))
            .collect();
        Self {
            state: BossState::Descending,
            body_hit_points: tuning.body_health,
            legs,
            target_position,
            enraged: false,
            speed_multiplier: 1.0,
            tuning: tuning.clone(),
        }
    }

    pub fn state(&self) -> BossState {
        self.state
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn leg(&self, id: LegId) -> Option<&Leg> {
        self.legs.iter().find(|leg| leg.id == id)
    }

    pub fn body_hit_points(&self) -> i32 {
        self.body_hit_points
    }

    pub fn target_position(&self) -> Vec2 {
        self.target_position
    }

    pub fn set_target_position(&mut self, target: Vec2) {
        self.target_position = target;
    }

    pub fn legs_remaining(&self) -> usize {
        self.legs.iter().filter(|leg| !leg.is_destroyed()).count()
    }

    pub fn leg_fraction(&self) -> f32 {
        if self.legs.is_empty() {
            return 0.0;
        }
        self.legs_remaining() as f32 / self.legs.len() as f32
    }

    pub fn body_vulnerable(&self) -> bool {
        self.legs_remaining() == 0
    }

    pub fn is_enraged(&self) -> bool {
        self.enraged
    }

    pub fn is_defeated(&self) -> bool {
        self.state == BossState::Defeated
    }

    pub fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    /// Moves straight down toward the arena centre line. Returns the new
    /// position and `true` on the frame the fight begins.
    pub fn descend(&mut self, position: Vec2, dt: f32) -> (Vec2, bool) {
        if self.state != BossState::Descending {
            return (position, false);
        }
        if position.y > self.target_position.y {
            let y = (position.y - self.tuning.descend_speed * dt).max(self.target_position.y);
            return (Vec2::new(position.x, y), false);
        }
        self.state = BossState::Fighting;
        (position, true)
    }

    pub fn hit_leg(&mut self, id: LegId) -> LegHitReport {
        if self.is_defeated() {
            return LegHitReport {
                hit: LegHit::Ignored,
                enraged: false,
            };
        }
        let hit = match self.legs.iter_mut().find(|leg| leg.id == id) {
            Some(leg) => leg.take_hit(),
            None => LegHit::Ignored,
        };
        let enraged = hit == LegHit::Destroyed && self.on_leg_destroyed(id);
        LegHitReport { hit, enraged }
    }

    /// Records a leg loss. Repeat notifications for the same leg change
    /// nothing. Returns `true` when this loss exposed the body.
    pub fn on_leg_destroyed(&mut self, id: LegId) -> bool {
        if let Some(leg) = self.legs.iter_mut().find(|leg| leg.id == id) {
            leg.mark_destroyed();
        }
        if self.body_vulnerable() && !self.enraged {
            self.enraged = true;
            self.speed_multiplier *= self.tuning.enrage_multiplier;
            return true;
        }
        false
    }

    pub fn take_body_damage(&mut self, amount: i32) -> BodyHit {
        if amount <= 0 || !self.body_vulnerable() || self.state != BossState::Fighting {
            return BodyHit::Ignored;
        }
        self.body_hit_points -= amount;
        if self.body_hit_points <= 0 {
            self.state = BossState::Defeated;
            BodyHit::Defeated
        } else {
            BodyHit::Damaged {
                hit_points: self.body_hit_points,
            }
        }
    }

    /// Seconds until the next volley. Shrinks as legs are lost and again when
    /// the target crowds the boss.
    pub fn attack_interval(&self, distance_to_target: Option<f32>) -> f32 {
        let fraction = self.leg_fraction();
        let mut interval = self.tuning.interval_no_legs
            + (self.tuning.interval_all_legs - self.tuning.interval_no_legs) * fraction;
        if let Some(distance) = distance_to_target {
            if distance < self.tuning.too_close_distance {
                interval *= self.tuning.close_interval_factor;
            }
        }
        interval
    }

    /// Unit directions for one volley. `to_target` is the offset from the boss
    /// to its target; a zero offset aims straight down.
    pub fn volley_directions(&self, to_target: Vec2) -> Volley {
        let count = self.tuning.bullets_per_wave;
        let mut volley = Volley::new();
        if count == 0 {
            return volley;
        }
        let bearing = if to_target.length_squared() > f32::EPSILON {
            to_target.y.atan2(to_target.x)
        } else {
            -FRAC_PI_2
        };
        let spread = self.tuning.wave_spread_degrees.to_radians();
        let (start, step) = if self.body_vulnerable() || spread >= TAU {
            (bearing, TAU / count as f32)
        } else if count == 1 {
            (bearing, 0.0)
        } else {
            (bearing - spread / 2.0, spread / (count - 1) as f32)
        };
        for idx in 0..count {
            volley.push(Vec2::from_angle(start + step * idx as f32));
        }
        volley
    }

    /// Velocity that keeps the boss inside its stand-off band around `target`.
    pub fn standoff_velocity(&self, position: Vec2, target: Vec2) -> Vec2 {
        if self.state != BossState::Fighting {
            return Vec2::ZERO;
        }
        let offset = target - position;
        let distance = offset.length();
        let toward = offset.normalize_or_zero();
        let speed = self.tuning.distance_move_speed;
        let push = if distance < self.tuning.too_close_distance {
            -toward * speed
        } else if distance > self.tuning.too_far_distance {
            toward * speed
        } else if (distance - self.tuning.optimal_distance).abs() > self.tuning.distance_tolerance
        {
            if distance < self.tuning.optimal_distance {
                -toward * speed * 0.5
            } else {
                toward * speed * 0.5
            }
        } else {
            Vec2::ZERO
        };
        let leg_modifier = 1.0 + 0.5 * (1.0 - self.leg_fraction());
        push * leg_modifier * self.speed_multiplier
    }

    /// Occasional twitch layered on top of the stand-off movement.
    pub fn jitter(&self, rng: &mut RandomNumberGenerator) -> Option<Vec2> {
        if rng.range(0.0f32, 1.0) >= self.tuning.jitter_chance {
            return None;
        }
        Some(random_in_circle(rng) * self.tuning.jitter_radius)
    }
}

pub fn random_in_circle(rng: &mut RandomNumberGenerator) -> Vec2 {
    let angle = rng.range(0.0f32, TAU);
    let radius = rng.range(0.0f32, 1.0).sqrt();
    Vec2::from_angle(angle) * radius
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> BossController {
        BossController::new(&BossConfig::default(), Vec2::ZERO)
    }

    fn fighting() -> BossController {
        let mut boss = controller();
        let (_, started) = boss.descend(Vec2::ZERO, 0.016);
        assert!(started);
        boss
    }

    fn strip_leg(boss: &mut BossController, id: LegId) -> LegHitReport {
        let mut report = boss.hit_leg(id);
        while report.hit != LegHit::Destroyed {
            report = boss.hit_leg(id);
        }
        report
    }

    #[test]
    fn body_becomes_vulnerable_only_with_last_leg() {
        let mut boss = fighting();
        for idx in 0..3 {
            let report = strip_leg(&mut boss, LegId(idx));
            assert!(!report.enraged);
            assert!(!boss.body_vulnerable());
        }
        let report = strip_leg(&mut boss, LegId(3));
        assert!(report.enraged);
        assert!(boss.body_vulnerable());
        assert_eq!(boss.legs_remaining(), 0);
    }

    #[test]
    fn any_destruction_order_exposes_body_on_last_leg() {
        for order in [[3, 1, 0, 2], [0, 2, 3, 1], [2, 3, 1, 0]] {
            let mut boss = fighting();
            for (step, id) in order.iter().enumerate() {
                assert!(!boss.body_vulnerable());
                boss.on_leg_destroyed(LegId(*id));
                assert_eq!(boss.legs_remaining(), 3 - step);
            }
            assert!(boss.body_vulnerable());
        }
    }

    #[test]
    fn repeated_leg_notification_is_idempotent() {
        let mut boss = fighting();
        assert!(!boss.on_leg_destroyed(LegId(1)));
        assert!(!boss.on_leg_destroyed(LegId(1)));
        assert_eq!(boss.legs_remaining(), 3);
        assert_eq!(boss.hit_leg(LegId(1)).hit, LegHit::Ignored);
    }

    #[test]
    fn enrage_applies_once() {
        let mut boss = fighting();
        for idx in 0..4 {
            boss.on_leg_destroyed(LegId(idx));
        }
        assert!(boss.is_enraged());
        assert_eq!(boss.speed_multiplier(), 1.5);
        assert!(!boss.on_leg_destroyed(LegId(0)));
        assert_eq!(boss.speed_multiplier(), 1.5);
    }

    #[test]
    fn body_damage_ignored_while_legs_remain() {
        let mut boss = fighting();
        assert_eq!(boss.take_body_damage(1), BodyHit::Ignored);
        assert_eq!(boss.body_hit_points(), 10);
    }

    #[test]
    fn body_damage_ignored_while_descending() {
        let mut boss = controller();
        for idx in 0..4 {
            boss.on_leg_destroyed(LegId(idx));
        }
        assert!(boss.body_vulnerable());
        assert_eq!(boss.take_body_damage(1), BodyHit::Ignored);
        assert_eq!(boss.state(), BossState::Descending);
    }

    #[test]
    fn exposed_body_takes_damage_until_defeat() {
        let mut boss = fighting();
        for idx in 0..4 {
            boss.on_leg_destroyed(LegId(idx));
        }
        assert_eq!(boss.take_body_damage(4), BodyHit::Damaged { hit_points: 6 });
        assert_eq!(boss.take_body_damage(6), BodyHit::Defeated);
        assert!(boss.is_defeated());
        assert_eq!(boss.take_body_damage(1), BodyHit::Ignored);
        assert_eq!(boss.hit_leg(LegId(0)).hit, LegHit::Ignored);
    }

    #[test]
    fn descent_stops_on_target_line_then_fights_once() {
        let mut boss = BossController::new(&BossConfig::default(), Vec2::new(0.0, 0.0));
        let (pos, started) = boss.descend(Vec2::new(1.0, 1.5), 0.5);
        assert!(!started);
        assert_eq!(pos, Vec2::new(1.0, 0.5));
        let (pos, started) = boss.descend(pos, 0.5);
        assert!(!started);
        assert_eq!(pos.y, 0.0);
        let (_, started) = boss.descend(pos, 0.5);
        assert!(started);
        assert_eq!(boss.state(), BossState::Fighting);
        let (_, again) = boss.descend(pos, 0.5);
        assert!(!again);
    }

    #[test]
    fn attack_interval_shrinks_with_lost_legs() {
        let mut boss = fighting();
        assert_eq!(boss.attack_interval(None), 3.0);
        boss.on_leg_destroyed(LegId(0));
        boss.on_leg_destroyed(LegId(1));
        assert!((boss.attack_interval(None) - 2.25).abs() < 1e-5);
        boss.on_leg_destroyed(LegId(2));
        boss.on_leg_destroyed(LegId(3));
        assert_eq!(boss.attack_interval(Some(10.0)), 1.5);
        assert!((boss.attack_interval(Some(1.0)) - 1.05).abs() < 1e-5);
    }

    #[test]
    fn volley_is_aimed_cone_while_legs_remain() {
        let boss = fighting();
        let to_target = Vec2::new(0.0, -4.0);
        let volley = boss.volley_directions(to_target);
        assert_eq!(volley.len(), 8);
        let half_spread = 60.0f32.to_radians();
        for dir in &volley {
            assert!(dir.dot(Vec2::NEG_Y) >= half_spread.cos() - 1e-4);
        }
        let sum: Vec2 = volley.iter().copied().sum();
        assert!(sum.x.abs() < 1e-4);
        assert!(sum.y < 0.0);
    }

    #[test]
    fn volley_is_full_ring_after_last_leg() {
        let mut boss = fighting();
        for idx in 0..4 {
            boss.on_leg_destroyed(LegId(idx));
        }
        let volley = boss.volley_directions(Vec2::new(3.0, 0.0));
        assert_eq!(volley.len(), 8);
        let sum: Vec2 = volley.iter().copied().sum();
        assert!(sum.length() < 1e-4);
        assert!(volley.iter().any(|dir| dir.dot(Vec2::NEG_X) > 0.99));
    }

    #[test]
    fn standoff_pushes_away_when_crowded_and_closes_when_far() {
        let boss = fighting();
        let close = boss.standoff_velocity(Vec2::ZERO, Vec2::new(0.0, -1.0));
        assert!(close.y > 0.0);
        let far = boss.standoff_velocity(Vec2::ZERO, Vec2::new(0.0, -9.0));
        assert!(far.y < 0.0);
        let settled = boss.standoff_velocity(Vec2::ZERO, Vec2::new(0.0, -5.2));
        assert_eq!(settled, Vec2::ZERO);
        let drifting = boss.standoff_velocity(Vec2::ZERO, Vec2::new(0.0, -6.0));
        assert!((drifting.length() - 0.75).abs() < 1e-5);
    }

    #[test]
    fn standoff_speeds_up_as_legs_fall() {
        let mut boss = fighting();
        let target = Vec2::new(0.0, -1.0);
        let healthy = boss.standoff_velocity(Vec2::ZERO, target).length();
        boss.on_leg_destroyed(LegId(0));
        boss.on_leg_destroyed(LegId(1));
        let wounded = boss.standoff_velocity(Vec2::ZERO, target).length();
        assert!(wounded > healthy);
        boss.on_leg_destroyed(LegId(2));
        boss.on_leg_destroyed(LegId(3));
        let enraged = boss.standoff_velocity(Vec2::ZERO, target).length();
        assert!((enraged - 1.5 * 1.5 * 1.5).abs() < 1e-5);
    }

    #[test]
    fn jitter_stays_inside_radius() {
        let boss = fighting();
        let mut rng = RandomNumberGenerator::seeded(7);
        let mut seen = 0;
        for _ in 0..2_000 {
            if let Some(offset) = boss.jitter(&mut rng) {
                assert!(offset.length() <= 0.3 + 1e-5);
                seen += 1;
            }
        }
        assert!(seen > 0 && seen < 200);
    }
}
