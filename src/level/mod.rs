#![allow(dead_code)]

use crate::data::{LevelConfig, StageKind, StageSpec};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scene {
    MainMenu,
    Stage(usize),
    GameOver,
    HighScores,
}

/// Score and health handed from one stage to the next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CarriedStats {
    pub score: i32,
    pub health: i32,
    pub max_health: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    Warning,
    Expired,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerTone {
    Normal,
    Caution,
    Critical,
}

pub struct LevelFlow {
    stages: Vec<StageSpec>,
    index: usize,
    time_remaining: f32,
    timer_active: bool,
    transitioning: bool,
    warned: bool,
    carried: Option<CarriedStats>,
    warning_seconds: f32,
    caution_seconds: f32,
}

impl LevelFlow {
    pub fn new(config: &LevelConfig) -> Self {
        let mut flow = Self {
            stages: config.stages.clone(),
            index: 0,
            time_remaining: 0.0,
            timer_active: false,
            transitioning: false,
            warned: false,
            carried: None,
            warning_seconds: config.warning_seconds,
            caution_seconds: config.caution_seconds,
        };
        flow.enter(0);
        flow
    }

    fn enter(&mut self, index: usize) {
        self.index = index;
        self.warned = false;
        match self.stages.get(index).map(|stage| &stage.kind) {
            Some(StageKind::Timed { duration }) => {
                self.time_remaining = *duration;
                self.timer_active = true;
            }
            _ => {
                self.time_remaining = 0.0;
                self.timer_active = false;
            }
        }
    }

    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&StageSpec> {
        self.stages.get(self.index)
    }

    pub fn is_boss_stage(&self) -> bool {
        self.current().is_some_and(StageSpec::is_boss)
    }

    pub fn time_remaining(&self) -> f32 {
        self.time_remaining
    }

    pub fn timer_active(&self) -> bool {
        self.timer_active
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    pub fn stop_timer(&mut self) {
        self.timer_active = false;
    }

    pub fn tick(&mut self, dt: f32) -> Option<TimerEvent> {
        if !self.timer_active || self.transitioning {
            return None;
        }
        self.time_remaining = (self.time_remaining - dt).max(0.0);
        if self.time_remaining <= 0.0 {
            self.timer_active = false;
            return Some(TimerEvent::Expired);
        }
        if self.time_remaining <= self.warning_seconds && !self.warned {
            self.warned = true;
            return Some(TimerEvent::Warning);
        }
        None
    }

    pub fn timer_tone(&self) -> TimerTone {
        if self.time_remaining <= self.warning_seconds {
            TimerTone::Critical
        } else if self.time_remaining <= self.caution_seconds {
            TimerTone::Caution
        } else {
            TimerTone::Normal
        }
    }

    /// Leaves the current stage. Returns `None` while a transition is already
    /// under way.
    pub fn begin_transition(&mut self, carried: CarriedStats) -> Option<Scene> {
        if self.transitioning {
            return None;
        }
        self.transitioning = true;
        self.timer_active = false;
        self.carried = Some(carried);
        let next = self.index + 1;
        if next < self.stages.len() {
            log::info!("advancing to stage {}", self.stages[next].name);
            Some(Scene::Stage(next))
        } else {
            log::info!("all stages complete");
            Some(Scene::GameOver)
        }
    }

    /// Called once the next stage has been loaded.
    pub fn finish_transition(&mut self, scene: Scene) -> Option<CarriedStats> {
        self.transitioning = false;
        if let Scene::Stage(index) = scene {
            self.enter(index);
        }
        self.carried.take()
    }

    pub fn restart(&mut self) {
        self.transitioning = false;
        self.carried = None;
        self.enter(0);
    }
}

pub fn format_time(seconds: f32) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor() as u32;
    let secs = (seconds % 60.0).floor() as u32;
    format!("{minutes:02}:{secs:02}")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PauseReason {
    Manual,
    Chat,
}

#[derive(Clone, Debug, Default)]
pub struct PauseState {
    reasons: Vec<PauseReason>,
}

impl PauseState {
    pub fn pause(&mut self, reason: PauseReason) {
        if !self.reasons.contains(&reason) {
            self.reasons.push(reason);
        }
    }

    pub fn resume(&mut self, reason: PauseReason) {
        self.reasons.retain(|held| *held != reason);
    }

    /// Manual toggling is locked out while the chat holds the pause.
    pub fn toggle_manual(&mut self) {
        if self.reasons.contains(&PauseReason::Chat) {
            return;
        }
        if self.reasons.contains(&PauseReason::Manual) {
            self.resume(PauseReason::Manual);
        } else {
            self.pause(PauseReason::Manual);
        }
    }

    pub fn is_paused(&self) -> bool {
        !self.reasons.is_empty()
    }

    pub fn is_held_by(&self, reason: PauseReason) -> bool {
        self.reasons.contains(&reason)
    }

    pub fn clear(&mut self) {
        self.reasons.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carried() -> CarriedStats {
        CarriedStats {
            score: 120,
            health: 3,
            max_health: 5,
        }
    }

    #[test]
    fn timed_stage_warns_once_then_expires() {
        let mut flow = LevelFlow::new(&LevelConfig::default());
        assert!(flow.timer_active());
        assert_eq!(flow.tick(45.0), None);
        assert_eq!(flow.timer_tone(), TimerTone::Caution);
        assert_eq!(flow.tick(6.0), Some(TimerEvent::Warning));
        assert_eq!(flow.timer_tone(), TimerTone::Critical);
        assert_eq!(flow.tick(1.0), None);
        assert_eq!(flow.tick(20.0), Some(TimerEvent::Expired));
        assert_eq!(flow.time_remaining(), 0.0);
        assert_eq!(flow.tick(1.0), None);
    }

    #[test]
    fn transition_carries_stats_into_next_stage() {
        let mut flow = LevelFlow::new(&LevelConfig::default());
        let scene = flow.begin_transition(carried()).unwrap();
        assert_eq!(scene, Scene::Stage(1));
        assert_eq!(flow.begin_transition(carried()), None);
        assert_eq!(flow.tick(100.0), None);
        assert_eq!(flow.finish_transition(scene), Some(carried()));
        assert_eq!(flow.current().unwrap().name, "Level2");
        assert_eq!(flow.time_remaining(), 60.0);
    }

    #[test]
    fn boss_stage_is_untimed_and_last() {
        let mut flow = LevelFlow::new(&LevelConfig::default());
        for expected in [Scene::Stage(1), Scene::Stage(2)] {
            let scene = flow.begin_transition(carried()).unwrap();
            assert_eq!(scene, expected);
            flow.finish_transition(scene);
        }
        assert!(flow.is_boss_stage());
        assert!(!flow.timer_active());
        assert_eq!(flow.tick(500.0), None);
        assert_eq!(flow.begin_transition(carried()), Some(Scene::GameOver));
    }

    #[test]
    fn time_formats_as_minutes_and_seconds() {
        assert_eq!(format_time(60.0), "01:00");
        assert_eq!(format_time(9.7), "00:09");
        assert_eq!(format_time(-3.0), "00:00");
    }

    #[test]
    fn chat_pause_locks_manual_toggle() {
        let mut pause = PauseState::default();
        pause.toggle_manual();
        assert!(pause.is_paused());
        pause.toggle_manual();
        assert!(!pause.is_paused());
        pause.pause(PauseReason::Chat);
        pause.toggle_manual();
        assert!(!pause.is_held_by(PauseReason::Manual));
        pause.resume(PauseReason::Chat);
        assert!(!pause.is_paused());
    }
}
