//! Synthetic workloads, and a loop for driving a [BranchPredictor] over a
//! stream of [BranchRecord]s.

use rand::prelude::*;

use crate::branch::*;
use crate::predictor::BranchPredictor;
use crate::stats::BranchStats;

/// Builds a stream of [BranchRecord]s for some synthetic program.
pub struct TraceBuilder {
    data: Vec<BranchRecord>,
}
impl TraceBuilder {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn len(&self) -> usize { self.data.len() }
    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    /// Number of conditional branches emitted so far.
    pub fn num_conditional(&self) -> usize {
        self.data.iter().filter(|r| r.is_conditional()).count()
    }

    pub fn branch(&mut self, pc: u64, tgt: u64, outcome: Outcome) {
        self.data.push(BranchRecord::new(pc, tgt, OpType::JmpDirectCond,
            outcome));
    }

    pub fn jump(&mut self, pc: u64, tgt: u64) {
        self.data.push(BranchRecord::new(pc, tgt, OpType::JmpDirectUncond,
            Outcome::T));
    }

    pub fn call(&mut self, pc: u64, tgt: u64) {
        self.data.push(BranchRecord::new(pc, tgt, OpType::CallDirect,
            Outcome::T));
    }

    pub fn ret(&mut self, pc: u64, tgt: u64) {
        self.data.push(BranchRecord::new(pc, tgt, OpType::Return,
            Outcome::T));
    }

    pub fn finish(self) -> Vec<BranchRecord> { self.data }
}
impl Default for TraceBuilder {
    fn default() -> Self { Self::new() }
}

/// A backward loop branch at 'pc' which is taken 'period - 1' times and then
/// falls through, repeated until 'n' records are emitted.
///
/// The loop body is 0x40 bytes; the target wraps around for 'pc' below that.
pub fn periodic_loop(pc: u64, period: usize, n: usize) -> Vec<BranchRecord> {
    let mut b = TraceBuilder::new();
    for i in 0..n {
        let taken = (i + 1) % period != 0;
        b.branch(pc, pc.wrapping_sub(0x40), Outcome::from_bool(taken));
    }
    b.finish()
}

/// A single branch at 'pc' with uniformly random outcomes.
pub fn random_branch(seed: u64, pc: u64, n: usize) -> Vec<BranchRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut b = TraceBuilder::new();
    for _ in 0..n {
        b.branch(pc, pc + 0x80, Outcome::from_bool(rng.gen()));
    }
    b.finish()
}

/// An outer loop which calls into a function containing an inner loop nest,
/// a data-dependent branch, and a branch that repeats the outcome of the
/// data-dependent branch. 'iterations' is the trip count of the outer loop.
pub fn mixed_program(seed: u64, iterations: usize) -> Vec<BranchRecord> {
    const MAIN: u64 = 0x0040_1000;
    const FUNC: u64 = 0x0040_8000;
    const INNER_TRIPS: usize = 4;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut b = TraceBuilder::new();
    for i in 0..iterations {
        b.call(MAIN + 0x10, FUNC);

        for j in 0..INNER_TRIPS {
            let taken = j + 1 != INNER_TRIPS;
            b.branch(FUNC + 0x30, FUNC + 0x08, Outcome::from_bool(taken));
        }

        let data: bool = rng.gen();
        b.branch(FUNC + 0x40, FUNC + 0x60, Outcome::from_bool(data));
        if !data {
            b.jump(FUNC + 0x58, FUNC + 0x60);
        }
        b.branch(FUNC + 0x68, FUNC + 0x90, Outcome::from_bool(data));

        b.ret(FUNC + 0xa0, MAIN + 0x14);

        let taken = i + 1 != iterations;
        b.branch(MAIN + 0x20, MAIN, Outcome::from_bool(taken));
    }
    b.finish()
}

/// Drive 'pred' over 'records'.
///
/// Conditional branches are predicted and then resolved; other control-flow
/// instructions only update path history. When 'limit' is given, evaluation
/// stops after that many conditional branches.
pub fn run_trace(pred: &mut dyn BranchPredictor, records: &[BranchRecord],
    limit: Option<usize>) -> BranchStats
{
    let mut stats = BranchStats::new();
    for record in records {
        if limit.is_some_and(|n| stats.global_brns >= n) {
            break;
        }
        if record.is_conditional() {
            let p = pred.predict(record.pc);
            stats.update(record, p);
            pred.update(record.pc, record.kind, record.outcome, p, record.tgt);
        } else if record.kind.is_control_flow() {
            pred.track_other_inst(record.pc, record.kind, record.outcome,
                record.tgt);
            stats.update_other();
        }
    }
    stats
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::predictor::MTageConfig;

    #[test]
    fn periodic_loop_shape() {
        let t = periodic_loop(0x1000, 4, 12);
        let pat: Vec<bool> = t.iter().map(|r| r.outcome.is_taken()).collect();
        assert_eq!(pat, [true, true, true, false].repeat(3));
        assert!(t.iter().all(|r| r.is_backward()));
    }

    #[test]
    fn periodic_loop_near_zero_wraps() {
        let t = periodic_loop(0x10, 3, 3);
        assert_eq!(t[0].tgt, 0x10u64.wrapping_sub(0x40));
        assert!(!t[0].is_backward());
    }

    #[test]
    fn builder_counts_conditional_branches() {
        let mut b = TraceBuilder::new();
        assert!(b.is_empty());
        b.call(0x100, 0x800);
        b.branch(0x810, 0x800, Outcome::T);
        b.branch(0x810, 0x800, Outcome::N);
        b.ret(0x820, 0x104);
        assert_eq!(b.len(), 4);
        assert_eq!(b.num_conditional(), 2);
    }

    #[test]
    fn random_branch_is_seeded() {
        assert_eq!(random_branch(7, 0x1000, 64), random_branch(7, 0x1000, 64));
        assert_ne!(random_branch(7, 0x1000, 64), random_branch(8, 0x1000, 64));
    }

    #[test]
    fn mixed_program_calls_are_balanced() {
        let t = mixed_program(1, 100);
        let calls = t.iter().filter(|r| r.kind.is_call()).count();
        let rets = t.iter().filter(|r| r.kind.is_return()).count();
        assert_eq!(calls, 100);
        assert_eq!(rets, 100);
        assert_eq!(t.iter().filter(|r| r.is_conditional()).count(), 700);
        assert!(!t.last().unwrap().outcome.is_taken());
    }

    #[test]
    fn limit_stops_evaluation() {
        let mut p = MTageConfig::small().build().unwrap();
        let t = mixed_program(2, 100);
        let stats = run_trace(&mut p, &t, Some(50));
        assert_eq!(stats.global_brns, 50);
    }

    #[test]
    fn mixed_program_is_mostly_predicted() {
        let mut p = MTageConfig::small().build().unwrap();
        let t = mixed_program(3, 20_000);
        let stats = run_trace(&mut p, &t, None);
        assert_eq!(stats.global_brns, 140_000);
        assert!((40_000..=60_000).contains(&stats.global_other));
        assert!(stats.hit_rate() > 0.8, "hit rate {}", stats.hit_rate());

        // The data-dependent branch stays near a coin flip.
        let data = stats.get(0x0040_8040).unwrap();
        assert!(data.hit_rate() < 0.6);
    }
}
