
use crate::Outcome;

/// Parameters for a [SaturatingCounter].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaturatingCounterConfig {
    /// Width of the counter [in bits]
    pub bits: u32,
}
impl SaturatingCounterConfig {
    pub fn new(bits: u32) -> Self {
        assert!(bits >= 1 && bits <= 8);
        Self { bits }
    }

    pub fn storage_bits(&self) -> usize { self.bits as usize }

    /// Smallest representable value.
    pub fn min_value(&self) -> i8 {
        (-(1i16 << (self.bits - 1))) as i8
    }

    /// Largest representable value.
    pub fn max_value(&self) -> i8 {
        ((1i16 << (self.bits - 1)) - 1) as i8
    }

    /// A counter in the weakest state predicting 'outcome'.
    pub fn weak(&self, outcome: Outcome) -> SaturatingCounter {
        match outcome {
            Outcome::T => SaturatingCounter(0),
            Outcome::N => SaturatingCounter(-1),
        }
    }
}

/// A signed 'n'-bit saturating counter used to follow the behavior of a
/// branch.
///
/// The counter predicts [Outcome::T] when its value is non-negative. The
/// width is not stored in the counter itself: tables hold millions of these
/// and share one [SaturatingCounterConfig].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct SaturatingCounter(pub i8);
impl SaturatingCounter {
    /// Return the current predicted direction.
    pub fn predict(&self) -> Outcome {
        Outcome::from_bool(self.0 >= 0)
    }

    pub fn value(&self) -> i8 { self.0 }

    /// Return the value offset by the midpoint, in `[0, 2^bits - 1]`.
    pub fn unsigned(&self, cfg: SaturatingCounterConfig) -> u8 {
        (self.0 as i16 - cfg.min_value() as i16) as u8
    }

    pub fn is_saturated(&self, cfg: SaturatingCounterConfig) -> bool {
        self.0 == cfg.min_value() || self.0 == cfg.max_value()
    }

    /// Move the counter toward 'outcome'.
    ///
    /// Returns 'true' when the counter was saturated before the update and
    /// is still saturated afterwards (the update carried no information).
    pub fn update(&mut self, outcome: Outcome, cfg: SaturatingCounterConfig)
        -> bool
    {
        let was_saturated = self.is_saturated(cfg);
        match outcome {
            Outcome::T => if self.0 < cfg.max_value() { self.0 += 1; },
            Outcome::N => if self.0 > cfg.min_value() { self.0 -= 1; },
        }
        was_saturated && self.is_saturated(cfg)
    }
}
