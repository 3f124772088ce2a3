#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LegId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LegHit {
    /// The leg was already gone; the weak point no longer takes hits.
    Ignored,
    Damaged { hit_points: i32 },
    Destroyed,
}

#[derive(Clone, Debug)]
pub struct Leg {
    pub id: LegId,
    pub hit_points: i32,
    destroyed: bool,
}

impl Leg {
    pub fn new(id: LegId, hit_points: i32) -> Self {
        Self {
            id,
            hit_points,
            destroyed: false,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn accepts_hits(&self) -> bool {
        !self.destroyed
    }

    pub fn take_hit(&mut self) -> LegHit {
        if self.destroyed {
            return LegHit::Ignored;
        }
        self.hit_points -= 1;
        if self.hit_points <= 0 {
            self.mark_destroyed()
        } else {
            LegHit::Damaged {
                hit_points: self.hit_points,
            }
        }
    }

    /// Returns `Destroyed` only on the first call.
    pub(crate) fn mark_destroyed(&mut self) -> LegHit {
        if self.destroyed {
            return LegHit::Ignored;
        }
        self.destroyed = true;
        self.hit_points = self.hit_points.max(0);
        LegHit::Destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_hit_destroys_exactly_once() {
        let mut leg = Leg::new(LegId(2), 2);
        assert_eq!(leg.take_hit(), LegHit::Damaged { hit_points: 1 });
        assert_eq!(leg.take_hit(), LegHit::Destroyed);
        assert!(leg.is_destroyed());
        assert_eq!(leg.take_hit(), LegHit::Ignored);
        assert_eq!(leg.hit_points, 0);
    }

    #[test]
    fn dead_leg_rejects_weak_point_hits() {
        let mut leg = Leg::new(LegId(0), 1);
        assert!(leg.accepts_hits());
        leg.take_hit();
        assert!(!leg.accepts_hits());
    }
}
