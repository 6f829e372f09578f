//! The COLT combiner: a table of counters indexed by the branch address and
//! the set of votes from each component predictor.

use bitvec::prelude::*;

use crate::Outcome;
use crate::predictor::*;

/// Number of component predictions combined by a [ColtTable].
pub const NPRED: usize = 6;

/// The direction predicted by each component, in component order.
///
/// When used as an index, the vote from component 0 is the most-significant
/// bit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Votes(BitArr!(for NPRED, in u8, Msb0));
impl Votes {
    pub fn new() -> Self { Self::default() }

    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        assert_eq!(outcomes.len(), NPRED);
        let mut res = Self::new();
        for (i, o) in outcomes.iter().enumerate() {
            res.set(i, *o);
        }
        res
    }

    pub fn set(&mut self, component: usize, outcome: Outcome) {
        self.0.set(component, outcome.is_taken());
    }

    pub fn get(&self, component: usize) -> Outcome {
        Outcome::from_bool(self.0[component])
    }

    /// Pack the votes into an integer.
    pub fn as_index(&self) -> usize {
        self.0[..NPRED].iter().by_vals()
            .fold(0, |acc, taken| (acc << 1) | taken as usize)
    }
}

impl std::fmt::Display for Votes {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for i in 0..NPRED {
            write!(f, "{:?}", self.get(i))?;
        }
        Ok(())
    }
}

/// A table of COLT rows, each with one counter for every combination of
/// [Votes].
#[derive(Clone, Debug)]
pub struct ColtTable {
    data: Vec<SaturatingCounter>,
    ctr: SaturatingCounterConfig,
    log_rows: u32,
}
impl ColtTable {
    pub const ROW_SIZE: usize = 1 << NPRED;

    pub fn new(log_rows: u32, ctr_bits: u32) -> Self {
        assert!(ctr_bits >= 2);
        let ctr = SaturatingCounterConfig::new(ctr_bits);

        // Initially follow component 0
        let row: Vec<SaturatingCounter> = (0..Self::ROW_SIZE).map(|i| {
            if (i >> (NPRED - 1)) & 1 == 1 {
                SaturatingCounter(1)
            } else {
                SaturatingCounter(-2)
            }
        }).collect();
        let data = row.iter().copied().cycle()
            .take(Self::ROW_SIZE << log_rows)
            .collect();
        Self { data, ctr, log_rows }
    }

    pub fn num_rows(&self) -> usize { 1 << self.log_rows }

    pub fn counter_config(&self) -> SaturatingCounterConfig { self.ctr }

    /// Return the counter selected for a branch.
    pub fn ctr(&self, pc: u64, votes: Votes) -> SaturatingCounter {
        *self.get_entry(self.get_index((pc, votes)))
    }

    pub fn predict(&self, pc: u64, votes: Votes) -> Outcome {
        self.ctr(pc, votes).predict()
    }

    /// Train the counter selected for a branch toward 'outcome'.
    pub fn update(&mut self, pc: u64, votes: Votes, outcome: Outcome) {
        let cfg = self.ctr;
        let idx = self.get_index((pc, votes));
        self.get_entry_mut(idx).update(outcome, cfg);
    }

    pub fn iter(&self) -> impl Iterator<Item = &SaturatingCounter> {
        self.data.iter()
    }

    pub fn storage_bits(&self) -> usize {
        self.data.len() * self.ctr.storage_bits()
    }
}
impl PredictorTable for ColtTable {
    type Input<'a> = (u64, Votes);
    type Entry = SaturatingCounter;

    fn size(&self) -> usize { self.data.len() }

    fn get_index<'a>(&self, input: Self::Input<'a>) -> usize {
        let (pc, votes) = input;
        let row = (pc as usize) & (self.num_rows() - 1);
        (row << NPRED) | votes.as_index()
    }

    fn get_entry(&self, idx: usize) -> &SaturatingCounter {
        debug_assert!(idx < self.size());
        &self.data[idx]
    }

    fn get_entry_mut(&mut self, idx: usize) -> &mut SaturatingCounter {
        debug_assert!(idx < self.size());
        &mut self.data[idx]
    }
}
