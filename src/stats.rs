//! Helpers for collecting statistics while replaying a trace.

use std::collections::*;
use crate::branch::*;
use bitvec::prelude::*;
use itertools::*;

/// Container for recording prediction statistics over a trace.
#[derive(Default)]
pub struct BranchStats {
    /// Per-branch statistics (indexed by program counter value).
    pub data: BTreeMap<u64, BranchData>,

    /// Number of correct predictions
    pub global_hits: usize,

    /// Number of conditional branches that were predicted
    pub global_brns: usize,

    /// Number of other control-flow instructions that were observed
    pub global_other: usize,
}
impl BranchStats {
    pub fn new() -> Self { Self::default() }

    /// Return the global hit rate.
    pub fn hit_rate(&self) -> f64 {
        if self.global_brns == 0 {
            return 0.0;
        }
        self.global_hits as f64 / self.global_brns as f64
    }

    /// Return the global miss count.
    pub fn global_miss(&self) -> usize { self.global_brns - self.global_hits }

    /// Return mispredictions per thousand conditional branches.
    pub fn mpkb(&self) -> f64 {
        if self.global_brns == 0 {
            return 0.0;
        }
        self.global_miss() as f64 * 1000.0 / self.global_brns as f64
    }

    /// Record the prediction made for a conditional branch.
    pub fn update(&mut self, record: &BranchRecord, predicted: Outcome) {
        let hit = predicted == record.outcome;
        self.global_brns += 1;
        if hit { self.global_hits += 1; }

        let data = self.get_mut(record.pc);
        data.occ += 1;
        data.pat.push(record.outcome.is_taken());
        if hit { data.hits += 1; }
    }

    /// Record a control-flow instruction that was not predicted.
    pub fn update_other(&mut self) {
        self.global_other += 1;
    }

    pub fn get(&self, pc: u64) -> Option<&BranchData> {
        self.data.get(&pc)
    }

    /// Returns a mutable reference to data collected for a particular branch.
    /// Creates a new entry if one doesn't already exist.
    pub fn get_mut(&mut self, pc: u64) -> &mut BranchData {
        self.data.entry(pc).or_default()
    }

    /// Returns the number of unique observed branch instructions.
    pub fn num_unique_branches(&self) -> usize {
        self.data.len()
    }

    /// Returns the 'n' most frequently executed branches.
    pub fn get_common_branches(&self, n: usize) -> Vec<(u64, &BranchData)> {
        self.data.iter()
            .sorted_by(|x, y| x.1.occ.cmp(&y.1.occ))
            .rev()
            .take(n)
            .map(|(pc, s)| (*pc, s))
            .collect()
    }

    /// Returns up to 'n' frequently executed branches which are predicted
    /// no better than a coin flip.
    pub fn get_low_rate_branches(&self, n: usize) -> Vec<(u64, &BranchData)> {
        self.data.iter()
            .filter(|(_, s)| s.occ > 100 && s.hit_rate() <= 0.55)
            .sorted_by(|x, y| x.1.occ.cmp(&y.1.occ))
            .rev()
            .take(n)
            .map(|(pc, s)| (*pc, s))
            .collect()
    }
}

/// Container for per-branch statistics.
#[derive(Default)]
pub struct BranchData {
    /// Number of times this branch was encountered.
    pub occ: usize,

    /// Number of correct predictions for this branch.
    pub hits: usize,

    /// Record of all observed outcomes for this branch.
    pub pat: BitVec,
}
impl BranchData {
    /// Return the hit rate for this branch.
    pub fn hit_rate(&self) -> f64 {
        if self.occ == 0 {
            return 0.0;
        }
        self.hits as f64 / self.occ as f64
    }

    pub fn times_taken(&self) -> usize {
        self.pat.count_ones()
    }

    pub fn is_always_taken(&self) -> bool {
        self.pat.count_ones() == self.pat.len()
    }

    pub fn is_never_taken(&self) -> bool {
        self.pat.count_zeros() == self.pat.len()
    }
}


#[cfg(test)]
mod test {
    use super::*;

    fn record(pc: u64, outcome: Outcome) -> BranchRecord {
        BranchRecord::new(pc, pc + 0x40, OpType::JmpDirectCond, outcome)
    }

    #[test]
    fn global_and_per_branch_counts() {
        let mut stats = BranchStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
        for i in 0..10 {
            stats.update(&record(0x100, Outcome::T), Outcome::T);
            let o = Outcome::from_bool(i % 2 == 0);
            stats.update(&record(0x200, o), Outcome::T);
        }
        stats.update_other();

        assert_eq!(stats.global_brns, 20);
        assert_eq!(stats.global_hits, 15);
        assert_eq!(stats.global_miss(), 5);
        assert_eq!(stats.global_other, 1);
        assert!((stats.mpkb() - 250.0).abs() < 1e-9);
        assert_eq!(stats.num_unique_branches(), 2);

        let a = stats.get(0x100).unwrap();
        assert!(a.is_always_taken());
        assert_eq!(a.hit_rate(), 1.0);
        let b = stats.get(0x200).unwrap();
        assert_eq!(b.times_taken(), 5);
        assert!(!b.is_never_taken());
    }

    #[test]
    fn low_rate_branches_are_sorted_by_occurrence() {
        let mut stats = BranchStats::new();
        for i in 0..300 {
            let o = Outcome::from_bool(i % 2 == 0);
            stats.update(&record(0x100, o), Outcome::T);
            if i < 200 {
                stats.update(&record(0x200, o), Outcome::N);
            }
            stats.update(&record(0x300, Outcome::T), Outcome::T);
        }
        let low = stats.get_low_rate_branches(4);
        assert_eq!(low.iter().map(|(pc, _)| *pc).collect::<Vec<_>>(),
            vec![0x100, 0x200]);

        let common = stats.get_common_branches(1);
        assert_eq!(common.len(), 1);
        assert_eq!(common[0].1.occ, 300);
    }
}
