use std::{cmp::Ordering, collections::BinaryHeap};

use specs::prelude::Entity;

/// Deferred work. Each variant is resumed by `EcsWorld::run_timers`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimedEvent {
    MoodPoll,
    HealApply,
    EnemySpawn,
    AsteroidSpawn,
    BossVolley,
    EnrageFlash { remaining: u8 },
    FlashEnd,
    InvulnerabilityEnd,
    BossDeathShake { step: u8 },
    Despawn,
    VictoryReady,
    PlayerLost,
}

#[derive(Clone, Copy, Debug)]
pub struct ScheduledEvent {
    pub wake_at: f64,
    pub owner: Option<Entity>,
    pub event: TimedEvent,
    seq: u64,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    // Reversed so the max-heap pops the earliest wake time, FIFO among equals.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .wake_at
            .total_cmp(&self.wake_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Timer queue keyed by simulation time.
#[derive(Default)]
pub struct Scheduler {
    now: f64,
    next_seq: u64,
    queue: BinaryHeap<ScheduledEvent>,
}

impl Scheduler {
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn set_now(&mut self, now: f64) {
        self.now = now;
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn schedule(&mut self, delay: f32, owner: Option<Entity>, event: TimedEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(ScheduledEvent {
            wake_at: self.now + f64::from(delay.max(0.0)),
            owner,
            event,
            seq,
        });
    }

    /// Drops every pending event owned by `owner`.
    pub fn cancel_owner(&mut self, owner: Entity) -> usize {
        let before = self.queue.len();
        self.queue.retain(|scheduled| scheduled.owner != Some(owner));
        before - self.queue.len()
    }

    pub fn count_pending(&self, owner: Entity, event: TimedEvent) -> usize {
        self.queue
            .iter()
            .filter(|scheduled| scheduled.owner == Some(owner) && scheduled.event == event)
            .count()
    }

    pub fn has_pending(&self, owner: Entity, event: TimedEvent) -> bool {
        self.count_pending(owner, event) > 0
    }

    /// Advances the clock to `now` and removes every event due by then, in
    /// wake order. Events scheduled while handling the batch wait for the
    /// next drain.
    pub fn drain_due(&mut self, now: f64) -> Vec<ScheduledEvent> {
        self.now = self.now.max(now);
        let mut due = Vec::new();
        while self
            .queue
            .peek()
            .is_some_and(|next| next.wake_at <= self.now)
        {
            if let Some(event) = self.queue.pop() {
                due.push(event);
            }
        }
        due
    }
}
