#![allow(dead_code)]

pub mod chat;

use bracket_terminal::prelude::{CYAN, GREEN, RED, RGB, YELLOW};

use crate::data::CompanionConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Mood {
    #[default]
    Calm,
    Aggressive,
    Scared,
    Supportive,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Calm => "Calm",
            Mood::Aggressive => "Aggressive",
            Mood::Scared => "Scared",
            Mood::Supportive => "Supportive",
        }
    }

    pub fn color(&self) -> RGB {
        match self {
            Mood::Calm => RGB::named(GREEN),
            Mood::Aggressive => RGB::named(RED),
            Mood::Scared => RGB::named(YELLOW),
            Mood::Supportive => RGB::named(CYAN),
        }
    }
}

/// The two signals the companion reads on every poll.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoodSignals {
    pub health_ratio: f32,
    pub nearby_enemies: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoodThresholds {
    pub critical: f32,
    pub low: f32,
    pub good: f32,
    pub many_enemies: usize,
}

impl MoodThresholds {
    pub fn from_config(config: &CompanionConfig) -> Self {
        Self {
            critical: config.critical_health_threshold,
            low: config.low_health_threshold,
            good: config.good_health_threshold,
            many_enemies: config.many_enemies_threshold,
        }
    }

    pub fn evaluate(&self, signals: MoodSignals) -> Mood {
        if signals.health_ratio <= self.critical {
            Mood::Supportive
        } else if signals.health_ratio <= self.low {
            Mood::Scared
        } else if signals.nearby_enemies >= self.many_enemies && signals.health_ratio >= self.good
        {
            Mood::Aggressive
        } else {
            Mood::Calm
        }
    }
}

impl Default for MoodThresholds {
    fn default() -> Self {
        Self::from_config(&CompanionConfig::default())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoodChange {
    pub from: Mood,
    pub to: Mood,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoodSource {
    Poll,
    Chat,
}

#[derive(Clone, Debug)]
pub struct MoodEngine {
    mood: Mood,
    thresholds: MoodThresholds,
    last_source: MoodSource,
}

impl MoodEngine {
    pub fn new(thresholds: MoodThresholds) -> Self {
        Self {
            mood: Mood::Calm,
            thresholds,
            last_source: MoodSource::Poll,
        }
    }

    pub fn mood(&self) -> Mood {
        self.mood
    }

    pub fn last_source(&self) -> MoodSource {
        self.last_source
    }

    /// Scheduled recompute. Overwrites any chat override.
    pub fn poll(&mut self, signals: MoodSignals) -> Option<MoodChange> {
        let next = self.thresholds.evaluate(signals);
        self.set(next, MoodSource::Poll)
    }

    pub fn force(&mut self, mood: Mood) -> Option<MoodChange> {
        self.set(mood, MoodSource::Chat)
    }

    /// Applies the first mood keyword found in `text`, if any.
    pub fn apply_chat(&mut self, text: &str) -> Option<MoodChange> {
        mood_from_chat(text).and_then(|mood| self.force(mood))
    }

    fn set(&mut self, mood: Mood, source: MoodSource) -> Option<MoodChange> {
        self.last_source = source;
        if mood == self.mood {
            return None;
        }
        let change = MoodChange {
            from: self.mood,
            to: mood,
        };
        self.mood = mood;
        Some(change)
    }
}

const AGGRESSIVE_WORDS: &[&str] = &[
    "attack", "fight", "destroy", "kill", "shoot", "get them", "blast", "fire",
];
const SUPPORTIVE_WORDS: &[&str] = &[
    "heal",
    "support",
    "help me",
    "dying",
    "low health",
    "need health",
];
const SCARED_WORDS: &[&str] = &[
    "scared", "fear", "help", "run", "hide", "danger", "terrified", "afraid",
];
const CALM_WORDS: &[&str] = &[
    "calm",
    "relax",
    "good job",
    "amazing",
    "great",
    "peaceful",
    "nice",
    "well done",
    "it's ok",
];

/// Keyword scan used on both the player's chat lines and the companion's
/// replies. Aggressive words win, then scared, supportive and calm. "help"
/// is a scared word, so "help me" alone never reaches the supportive group.
pub fn mood_from_chat(text: &str) -> Option<Mood> {
    let lowered = text.to_lowercase();
    let contains_any = |words: &[&str]| words.iter().any(|word| lowered.contains(word));
    if contains_any(AGGRESSIVE_WORDS) {
        Some(Mood::Aggressive)
    } else if contains_any(SCARED_WORDS) {
        Some(Mood::Scared)
    } else if contains_any(SUPPORTIVE_WORDS) {
        Some(Mood::Supportive)
    } else if contains_any(CALM_WORDS) {
        Some(Mood::Calm)
    } else {
        None
    }
}

/// Per-mood movement and fire cadence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoodProfile {
    pub follow_distance: f32,
    pub move_speed: f32,
    /// `None` while the companion is busy healing instead of shooting.
    pub shot_interval: Option<f32>,
    pub dodges: bool,
    /// Whether the companion retreats when closer than `follow_distance`.
    pub backs_off: bool,
}

impl MoodProfile {
    pub fn for_mood(mood: Mood, config: &CompanionConfig) -> Self {
        match mood {
            Mood::Calm => Self {
                follow_distance: config.normal_follow_distance,
                move_speed: config.move_speed,
                shot_interval: Some(config.calm_shot_interval),
                dodges: false,
                backs_off: true,
            },
            Mood::Aggressive => Self {
                follow_distance: config.aggressive_follow_distance,
                move_speed: config.move_speed,
                shot_interval: Some(config.aggressive_shot_interval),
                dodges: false,
                backs_off: true,
            },
            Mood::Scared => Self {
                follow_distance: config.scared_follow_distance,
                move_speed: config.move_speed,
                shot_interval: Some(config.scared_shot_interval),
                dodges: true,
                backs_off: true,
            },
            Mood::Supportive => Self {
                follow_distance: config.healing_distance,
                move_speed: config.move_speed * config.supportive_speed_factor,
                shot_interval: None,
                dodges: false,
                backs_off: false,
            },
        }
    }
}
