//! Implementation of a "TAgged GEometric history length" (TAGE) predictor.
//!
//! A [TaggedTable] holds the tables; the path history used to index them
//! lives in a separate [Subpath] so that several streams of history can
//! share the same tables.

pub mod component;
pub mod config;
pub mod stat;
pub mod subpath;

pub use component::*;
pub use config::*;
pub use stat::*;
pub use subpath::*;

use crate::Outcome;
use crate::predictor::*;

/// Identifies a particular component in a [`TaggedTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TageProvider {
    /// The base component
    Base,

    /// A tagged bank
    Tagged(usize),
}
impl TageProvider {
    /// A small integer identifying the provider (0 for the base component).
    pub fn code(&self) -> u64 {
        match self {
            Self::Base => 0,
            Self::Tagged(bank) => *bank as u64 + 1,
        }
    }
}

/// Container for output from [`TaggedTable::predict`], including the
/// predicted outcome and everything needed to update the tables afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagePrediction {
    /// The final predicted direction (from the post-predictor)
    pub outcome: Outcome,

    /// The component providing the primary prediction
    pub provider: TageProvider,

    /// Direction predicted by the primary component
    pub tage_outcome: Outcome,

    /// Alternate component
    pub alt_provider: TageProvider,

    /// Direction predicted by the alternate component
    pub alt_outcome: Outcome,

    /// Banks with a matching tag, longest history first
    pub hits: Vec<usize>,

    /// Index computed for each tagged bank
    pub indices: Vec<usize>,

    /// Tag computed for each tagged bank
    pub tags: Vec<u16>,

    /// Index into the base component
    pub base_idx: usize,

    /// Index into the post-predictor
    pub postp_idx: usize,
}
impl TagePrediction {
    /// Returns 'true' if the primary and alternate components disagree.
    pub fn disagrees(&self) -> bool {
        self.tage_outcome != self.alt_outcome
    }
}

/// The "TAgged GEometric history length" predictor.
///
/// See the following:
///  - "A case for (partially) TAgged GEometric history length branch
///  prediction" (Seznec, 2006).
///  - "A 64 Kbytes ISL-TAGE branch predictor" (Seznec, 2011).
///
/// A prediction is made in two levels: the longest matching bank provides a
/// counter, and a small post-predictor indexed by that counter (and the
/// alternate counter) provides the final direction.
pub struct TaggedTable {
    /// The configuration used to create this object
    pub cfg: TageConfig,

    pub stat: TageStats,

    /// Base component
    pub base: BimodalTable,

    /// Tagged banks
    pub banks: Vec<TaggedBank>,

    /// Post-predictor counters
    postp: Vec<SaturatingCounter>,

    ctr: SaturatingCounterConfig,
    postp_ctr: SaturatingCounterConfig,

    /// Consecutive failed allocations
    alloc_fail: u32,

    /// Number of mispredictions
    nmisp: u64,
}
impl TaggedTable {
    /// Create a new table. Callers are expected to go through
    /// [`TageConfig::build`], which validates the configuration first.
    fn new(cfg: TageConfig) -> Self {
        let ctr = SaturatingCounterConfig::new(cfg.ctr_bits);
        let postp_ctr = SaturatingCounterConfig::new(cfg.postp_bits);
        let init_entry = TaggedEntry {
            tag: 0,
            ctr: ctr.weak(Outcome::N),
            useful: 0,
        };
        let banks: Vec<TaggedBank> = cfg.history_lengths().iter()
            .enumerate()
            .map(|(id, len)| {
                TaggedBank::new(id, *len, cfg.tagged_size(), cfg.tag_bits,
                    init_entry)
            }).collect();
        let base = BimodalTable::new(cfg.base_size(), ctr.weak(Outcome::N));

        // Each post-predictor entry starts out following the sign of the
        // primary counter selected by its index.
        let field_mask = (1usize << cfg.postp_ctr_field_bits()) - 1;
        let postp = (0..cfg.postp_size()).map(|i| {
            let sign = ((i & field_mask) >> 1) >> (cfg.ctr_bits - 1) & 1;
            postp_ctr.weak(Outcome::from_bool(sign == 0))
        }).collect();

        tracing::debug!(name = %cfg.name, lengths = ?cfg.history_lengths(),
            "tagged table history lengths");

        Self {
            stat: TageStats::new(banks.len()),
            base,
            banks,
            postp,
            ctr,
            postp_ctr,
            alloc_fail: 0,
            nmisp: 0,
            cfg,
        }
    }

    pub fn name(&self) -> &str { &self.cfg.name }

    /// Return the number of tagged banks.
    pub fn num_tagged(&self) -> usize { self.banks.len() }

    /// Return the history length associated with each bank (longest first).
    pub fn history_lengths(&self) -> Vec<usize> {
        self.banks.iter().map(|b| b.hist_len()).collect()
    }

    /// Number of mispredictions observed so far.
    pub fn mispredictions(&self) -> u64 { self.nmisp }

    /// Returns 'true' while the aggressive (ramp-up) update policy is used.
    pub fn in_rampup(&self) -> bool { self.nmisp < self.cfg.rampup }

    pub fn alloc_fail(&self) -> u32 { self.alloc_fail }

    pub fn counter_config(&self) -> SaturatingCounterConfig { self.ctr }

    pub fn postp_counter_config(&self) -> SaturatingCounterConfig {
        self.postp_ctr
    }

    pub fn postp_entries(&self) -> &[SaturatingCounter] { &self.postp }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize { self.cfg.storage_bits() }

    /// Create an empty [Subpath] suitable for indexing this table.
    pub fn new_subpath(&self) -> Subpath {
        Subpath::new(&self.cfg)
    }

    fn provider_entry(&self, pred: &TagePrediction, nth: usize)
        -> SaturatingCounter
    {
        match pred.hits.get(nth) {
            Some(&bank) => self.banks[bank].get_entry(pred.indices[bank]).ctr,
            None => *self.base.get_entry(pred.base_idx),
        }
    }

    /// Compute the post-predictor index for a prediction.
    ///
    /// The low bits hold the alternate counter, the primary counter, and
    /// whether the primary entry is useful. The high bits (if any) hold a
    /// hash of the program counter and the providing bank.
    fn postp_index(&self, pc: u64, pred: &TagePrediction) -> usize {
        let mask = (1u64 << self.cfg.ctr_bits) - 1;
        let primary = self.provider_entry(pred, 0).value() as u64 & mask;
        let alt = self.provider_entry(pred, 1).value() as u64 & mask;
        let u0 = match pred.hits.first() {
            Some(&bank) => {
                self.banks[bank].get_entry(pred.indices[bank]).useful > 0
            },
            None => true,
        };
        let field = (((alt << self.cfg.ctr_bits) | primary) << 1)
            | u0 as u64;

        let ctx_bits = self.cfg.postp_ctx_bits;
        let ctx = if ctx_bits == 0 { 0 } else {
            let agree = !pred.disagrees() as u64;
            let h = pc ^ (pc >> ctx_bits)
                ^ (pred.provider.code() << 1) ^ agree;
            h & ((1u64 << ctx_bits) - 1)
        };
        let idx = (ctx << self.cfg.postp_ctr_field_bits()) | field;
        debug_assert!((idx as usize) < self.postp.len());
        idx as usize
    }

    /// Predict the direction of the branch at 'pc' using the history in
    /// 'subpath'.
    pub fn predict(&self, pc: u64, subpath: &Subpath) -> TagePrediction {
        debug_assert_eq!(subpath.num_banks(), self.num_tagged());

        let base_idx = self.base.get_index(pc);
        let mut indices = Vec::with_capacity(self.num_tagged());
        let mut tags = Vec::with_capacity(self.num_tagged());
        let mut hits = Vec::new();
        for bank in self.banks.iter() {
            let idx = bank.get_index((pc, subpath));
            let tag = bank.get_tag((pc, subpath));
            if bank.get_entry(idx).tag == tag {
                hits.push(bank.id());
            }
            indices.push(idx);
            tags.push(tag);
        }

        let base_outcome = self.base.get_entry(base_idx).predict();
        let (provider, tage_outcome) = match hits.first() {
            Some(&b) => (TageProvider::Tagged(b),
                self.banks[b].get_entry(indices[b]).predict()),
            None => (TageProvider::Base, base_outcome),
        };
        let (alt_provider, alt_outcome) = match hits.get(1) {
            Some(&b) => (TageProvider::Tagged(b),
                self.banks[b].get_entry(indices[b]).predict()),
            None => (TageProvider::Base, base_outcome),
        };

        let mut res = TagePrediction {
            outcome: tage_outcome,
            provider,
            tage_outcome,
            alt_provider,
            alt_outcome,
            hits,
            indices,
            tags,
            base_idx,
            postp_idx: 0,
        };
        res.postp_idx = self.postp_index(pc, &res);
        res.outcome = self.postp[res.postp_idx].predict();
        res
    }

    fn update_base(&mut self, idx: usize, outcome: Outcome) -> bool {
        let cfg = self.ctr;
        self.base.get_entry_mut(idx).update(outcome, cfg)
    }

    fn update_bank(&mut self, bank: usize, idx: usize, outcome: Outcome)
        -> bool
    {
        let cfg = self.ctr;
        self.banks[bank].get_entry_mut(idx).ctr.update(outcome, cfg)
    }

    fn bank_entry(&self, pred: &TagePrediction, bank: usize) -> &TaggedEntry {
        self.banks[bank].get_entry(pred.indices[bank])
    }

    /// (Re)allocate the entry selected by 'pred' in 'bank'.
    fn alloc(&mut self, pred: &TagePrediction, bank: usize, outcome: Outcome) {
        let weak = self.ctr.weak(outcome);
        let entry = self.banks[bank].get_entry_mut(pred.indices[bank]);
        entry.tag = pred.tags[bank];
        entry.ctr = weak;
        entry.useful = 0;
        self.stat.allocs += 1;
    }

    /// Clear the 'useful' counter of every tagged entry.
    pub fn clear_useful(&mut self) {
        for bank in self.banks.iter_mut() {
            for entry in bank.iter_mut() {
                entry.useful = 0;
            }
        }
        self.stat.resets += 1;
        tracing::debug!(name = %self.cfg.name, resets = self.stat.resets,
            "cleared useful counters");
    }

    /// Update policy used during ramp-up.
    ///
    /// Counters of every hit agreeing with the primary prediction are
    /// trained, and every longer bank whose entry is not useful is
    /// reallocated on each update.
    fn aggressive_update(&mut self, pred: &TagePrediction, outcome: Outcome) {
        let mut allsat = true;
        let hits = &pred.hits;

        if let Some(&first) = hits.first() {
            let inter = self.bank_entry(pred, first).predict();
            allsat &= self.update_bank(first, pred.indices[first], outcome);

            let mut start = 1;
            let mut done = false;
            let mut stop = false;
            if self.bank_entry(pred, first).useful == 0 {
                if let Some(&second) = hits.get(1) {
                    if self.bank_entry(pred, second).predict() != inter {
                        stop = true;
                    }
                    start = 2;
                    allsat &= self.update_bank(second, pred.indices[second],
                        outcome);
                } else {
                    done = true;
                    allsat &= self.update_base(pred.base_idx, outcome);
                }
            }

            if !stop {
                for &bank in hits.iter().skip(start) {
                    if self.bank_entry(pred, bank).predict() == inter {
                        allsat &= self.update_bank(bank, pred.indices[bank],
                            outcome);
                    } else {
                        done = true;
                        break;
                    }
                }
            }
            if !done && self.base.get_entry(pred.base_idx).predict() == inter {
                allsat &= self.update_base(pred.base_idx, outcome);
            }
        } else {
            self.update_base(pred.base_idx, outcome);
        }

        let first = hits.first().copied().unwrap_or(self.num_tagged());
        for bank in (0..first).rev() {
            if self.bank_entry(pred, bank).useful != 0 {
                continue;
            }
            if !allsat || self.banks[bank].hist_len() <= self.cfg.caphist {
                self.alloc(pred, bank, outcome);
            }
        }
    }

    /// Update policy used after ramp-up (from ISL-TAGE).
    fn careful_update(&mut self, pred: &TagePrediction, outcome: Outcome,
        mispredicted: bool)
    {
        match pred.hits.first() {
            Some(&first) => {
                self.update_bank(first, pred.indices[first], outcome);
                if self.bank_entry(pred, first).useful == 0 {
                    match pred.hits.get(1) {
                        Some(&second) => {
                            self.update_bank(second, pred.indices[second],
                                outcome);
                        },
                        None => { self.update_base(pred.base_idx, outcome); },
                    }
                }
            },
            None => { self.update_base(pred.base_idx, outcome); },
        }

        if !mispredicted {
            return;
        }

        // Scan from the bank just longer than the provider toward the bank
        // with the longest history.
        let first = pred.hits.first().copied().unwrap_or(self.num_tagged());
        let mut nalloc = 0;
        let mut bank = first;
        while bank > 0 {
            bank -= 1;
            if self.bank_entry(pred, bank).useful == 0 {
                self.alloc(pred, bank, outcome);
                self.alloc_fail = 0;
                nalloc += 1;
                if nalloc == self.cfg.max_alloc {
                    break;
                }
                // NOTE: Skip the adjacent bank.
                bank = bank.saturating_sub(1);
            } else {
                self.stat.failed_allocs += 1;
                self.alloc_fail += 1;
                if self.alloc_fail > self.cfg.alloc_fail_max {
                    self.clear_useful();
                    self.alloc_fail = 0;
                }
            }
        }
    }

    /// Given a particular prediction and the resolved outcome, update the
    /// state of the predictor.
    ///
    /// Returns 'true' if the final prediction was wrong.
    pub fn update(&mut self, outcome: Outcome, pred: &TagePrediction) -> bool {
        let mispredicted = pred.outcome != outcome;

        self.stat.updates += 1;
        match pred.provider {
            TageProvider::Base => {
                self.stat.base_hits += 1;
                if pred.tage_outcome != outcome { self.stat.base_miss += 1; }
            },
            TageProvider::Tagged(bank) => {
                self.stat.bank_hits[bank] += 1;
                if pred.tage_outcome != outcome {
                    self.stat.bank_miss[bank] += 1;
                }
            },
        }
        if mispredicted {
            self.nmisp += 1;
            self.stat.mispredictions += 1;
        }

        let resets = self.stat.resets;
        if self.in_rampup() {
            self.aggressive_update(pred, outcome);
        } else {
            self.careful_update(pred, outcome, mispredicted);
        }

        // The primary entry is only useful when it disagrees with the
        // alternate prediction. Useful counters stay clear for the rest of
        // an update that cleared them.
        if pred.disagrees() && self.stat.resets == resets {
            if let Some(&first) = pred.hits.first() {
                let entry = self.banks[first].get_entry_mut(pred.indices[first]);
                if pred.tage_outcome == outcome {
                    entry.increment_useful();
                } else {
                    entry.decrement_useful();
                }
            }
        }

        let cfg = self.postp_ctr;
        self.postp[pred.postp_idx].update(outcome, cfg);

        mispredicted
    }
}


#[cfg(test)]
mod test {
    use super::*;

    fn small_cfg() -> TageConfig {
        let mut cfg = TageConfig::unlimited("test", 4, 8, 8, 40, 4);
        cfg.tag_bits = 10;
        cfg.hash_param = 2;
        cfg.rampup = 0;
        cfg.alloc_fail_max = 15;
        cfg
    }

    #[test]
    fn empty_table_uses_the_base_component() {
        let t = small_cfg().build().unwrap();
        let sp = t.new_subpath();
        // Tags are initialized to zero; pick a pc whose tags never match
        let pc = (1..1000u64).find(|pc| {
            t.banks.iter().all(|b| b.get_tag((*pc, &sp)) != 0)
        }).unwrap();
        let p = t.predict(pc, &sp);
        assert_eq!(p.provider, TageProvider::Base);
        assert_eq!(p.alt_provider, TageProvider::Base);
        assert!(p.hits.is_empty());
        assert_eq!(p.tage_outcome, Outcome::N);
        // Post-predictor entries follow the sign of the primary counter
        assert_eq!(p.outcome, Outcome::N);
    }

    #[test]
    fn longest_matching_bank_provides() {
        let mut t = small_cfg().build().unwrap();
        let mut sp = t.new_subpath();
        for i in 0..50u64 {
            sp.update(0x1000 + i * 4, Outcome::from_bool(i % 3 == 0));
        }
        let pc = 0x4242;
        let idx1 = t.banks[1].get_index((pc, &sp));
        let tag1 = t.banks[1].get_tag((pc, &sp));
        let idx3 = t.banks[3].get_index((pc, &sp));
        let tag3 = t.banks[3].get_tag((pc, &sp));

        // Make sure nothing else matches
        for bank in [0, 2] {
            let idx = t.banks[bank].get_index((pc, &sp));
            let tag = t.banks[bank].get_tag((pc, &sp));
            t.banks[bank].get_entry_mut(idx).tag = !tag;
        }

        *t.banks[1].get_entry_mut(idx1) = TaggedEntry {
            tag: tag1, ctr: SaturatingCounter(3), useful: 0
        };
        *t.banks[3].get_entry_mut(idx3) = TaggedEntry {
            tag: tag3, ctr: SaturatingCounter(-4), useful: 0
        };

        let p = t.predict(pc, &sp);
        assert_eq!(p.hits, vec![1, 3]);
        assert_eq!(p.provider, TageProvider::Tagged(1));
        assert_eq!(p.tage_outcome, Outcome::T);
        assert_eq!(p.alt_provider, TageProvider::Tagged(3));
        assert_eq!(p.alt_outcome, Outcome::N);
    }

    #[test]
    fn misprediction_allocates_longer_banks() {
        let mut t = small_cfg().build().unwrap();
        let sp = t.new_subpath();
        let pc = (1..1000u64).find(|pc| {
            t.banks.iter().all(|b| b.get_tag((*pc, &sp)) != 0)
        }).unwrap();
        let p = t.predict(pc, &sp);
        assert_eq!(p.outcome, Outcome::N);
        assert!(t.update(Outcome::T, &p));
        assert_eq!(t.mispredictions(), 1);
        assert_eq!(t.stat.miss_rate(), 1.0);

        // Banks 3 and 1 (skipping the adjacent banks)
        assert_eq!(t.stat.allocs, 2);
        let p = t.predict(pc, &sp);
        assert_eq!(p.hits, vec![1, 3]);
        assert_eq!(p.tage_outcome, Outcome::T);
    }

    #[test]
    fn useful_counters_decay_after_failed_allocations() {
        let mut t = small_cfg().build().unwrap();
        let max = t.cfg.alloc_fail_max;
        let sp = t.new_subpath();
        for bank in t.banks.iter_mut() {
            for entry in bank.iter_mut() {
                entry.tag = u16::MAX;
                entry.useful = 1;
            }
        }

        // Every update mispredicts and every candidate is still useful
        let mut failures = 0;
        let mut i = 0u64;
        while t.stat.resets == 0 {
            let p = t.predict(0x100 + i, &sp);
            assert!(p.hits.is_empty());
            t.update(!p.outcome, &p);
            failures += t.num_tagged();
            i += 1;
        }
        assert!(failures as u32 > max);
        assert_eq!(t.alloc_fail(), 0);
        assert!(t.banks.iter().all(|b| b.iter().all(|e| e.useful == 0)));
    }

    #[test]
    fn useful_counters_stay_clear_after_reset() {
        let mut t = small_cfg().build().unwrap();
        let mut sp = t.new_subpath();
        for i in 0..20u64 {
            sp.update(i * 8, Outcome::T);
        }
        for bank in t.banks.iter_mut() {
            for entry in bank.iter_mut() {
                entry.tag = u16::MAX;
                entry.useful = 1;
            }
        }
        let pc = 0x99;
        let idx = t.banks[3].get_index((pc, &sp));
        let tag = t.banks[3].get_tag((pc, &sp));
        *t.banks[3].get_entry_mut(idx) = TaggedEntry {
            tag, ctr: SaturatingCounter(2), useful: 1
        };
        let bidx = t.base.get_index(pc);
        *t.base.get_entry_mut(bidx) = SaturatingCounter(-4);
        t.alloc_fail = t.cfg.alloc_fail_max;

        // The post-predictor overrides a correct primary prediction
        let p = t.predict(pc, &sp);
        t.postp[p.postp_idx] = SaturatingCounter(-1);
        let p = t.predict(pc, &sp);
        assert_eq!(p.hits, vec![3]);
        assert_eq!(p.tage_outcome, Outcome::T);
        assert_eq!(p.outcome, Outcome::N);
        assert!(p.disagrees());

        assert!(t.update(Outcome::T, &p));
        assert_eq!(t.stat.resets, 1);
        for bank in t.banks.iter() {
            assert!(bank.iter().all(|e| e.useful == 0), "bank {}", bank.id());
        }
    }

    #[test]
    fn useful_tracks_primary_correctness() {
        let mut t = small_cfg().build().unwrap();
        let mut sp = t.new_subpath();
        for i in 0..20u64 {
            sp.update(i * 8, Outcome::T);
        }
        let pc = 0x77;
        let idx = t.banks[2].get_index((pc, &sp));
        let tag = t.banks[2].get_tag((pc, &sp));
        for bank in [0, 1, 3] {
            let idx = t.banks[bank].get_index((pc, &sp));
            let tag = t.banks[bank].get_tag((pc, &sp));
            t.banks[bank].get_entry_mut(idx).tag = !tag;
            t.banks[bank].get_entry_mut(idx).useful = 3;
        }
        *t.banks[2].get_entry_mut(idx) = TaggedEntry {
            tag, ctr: SaturatingCounter(2), useful: 0
        };
        let bidx = t.base.get_index(pc);
        *t.base.get_entry_mut(bidx) = SaturatingCounter(-4);

        // Primary (taken) disagrees with the base (not-taken)
        let p = t.predict(pc, &sp);
        assert!(p.disagrees());
        t.update(Outcome::T, &p);
        assert_eq!(t.banks[2].get_entry(idx).useful, 1);

        let p = t.predict(pc, &sp);
        t.update(Outcome::N, &p);
        assert_eq!(t.banks[2].get_entry(idx).useful, 0);
    }

    #[test]
    fn counters_stay_in_range() {
        let mut t = small_cfg().build().unwrap();
        let mut sp = t.new_subpath();
        let ctr = t.counter_config();
        let postp = t.postp_counter_config();
        for i in 0..5000u64 {
            let pc = 0x400 + (i % 7) * 4;
            let outcome = Outcome::from_bool((i * 2654435761) >> 7 & 1 == 1);
            let p = t.predict(pc, &sp);
            t.update(outcome, &p);
            sp.update(pc + 64, outcome);
        }
        for bank in t.banks.iter() {
            for e in bank.iter() {
                assert!(e.ctr.value() >= ctr.min_value());
                assert!(e.ctr.value() <= ctr.max_value());
                assert!(e.useful <= TaggedEntry::USEFUL_MAX);
            }
        }
        assert!(t.base.iter().all(|c| c.value() >= ctr.min_value()
            && c.value() <= ctr.max_value()));
        assert!(t.postp_entries().iter().all(|c| c.value() >= postp.min_value()
            && c.value() <= postp.max_value()));
    }
}
