#![allow(dead_code)]

use bracket_terminal::prelude::{GREEN, RED, RGB};

#[derive(Clone, Debug)]
pub struct EnemyTemplate {
    pub name: &'static str,
    pub glyph: char,
    pub color: RGB,
    pub hp: i32,
}

impl EnemyTemplate {
    /// Tougher drones are drawn redder; `hp` is clamped into `1..=max_hp`.
    pub fn rolled(hp: i32, max_hp: i32) -> Self {
        let max_hp = max_hp.max(1);
        let hp = hp.clamp(1, max_hp);
        let ratio = hp as f32 / max_hp as f32;
        let (name, glyph) = match hp {
            1 => ("Scout Drone", 'v'),
            2 | 3 => ("Raider", 'w'),
            _ => ("Gunship", 'W'),
        };
        Self {
            name,
            glyph,
            color: RGB::named(GREEN).lerp(RGB::named(RED), ratio),
            hp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_is_clamped_into_range() {
        assert_eq!(EnemyTemplate::rolled(0, 5).hp, 1);
        assert_eq!(EnemyTemplate::rolled(9, 5).hp, 5);
    }

    #[test]
    fn toughest_roll_is_fully_red() {
        let template = EnemyTemplate::rolled(5, 5);
        assert_eq!(template.name, "Gunship");
        assert_eq!(template.color, RGB::named(RED));
    }
}
