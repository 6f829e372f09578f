//! The MTAGE+COLT predictor: several [TaggedTable]s, each following a
//! different kind of path history, combined by a [ColtTable].
//!
//! See "Multiple TAGE predictors (MTAGE) + COLT" (Seznec, CBP 2016).

pub mod config;
pub mod stat;

pub use config::*;
pub use stat::*;

use crate::branch::OpType;
use crate::error::ConfigError;
use crate::Outcome;
use crate::predictor::*;

/// One component of an [MTage] predictor: a [TaggedTable] along with the
/// subpaths used to index it.
pub struct Component {
    pub selector: SubpathSelector,
    pub filter: HistoryFilter,
    pub table: TaggedTable,
    pub spectrum: Spectrum,
}
impl Component {
    fn new(cfg: ComponentConfig) -> Result<Self, ConfigError> {
        let spectrum = Spectrum::new(&cfg.tage, cfg.spectrum_size);
        let table = cfg.tage.build()?;
        Ok(Self {
            selector: cfg.selector,
            filter: cfg.filter,
            table,
            spectrum,
        })
    }

    pub fn name(&self) -> &str { self.table.name() }

    /// Select the subpath used for the branch at 'pc'.
    pub fn select(&self, pc: u64, bin: usize) -> usize {
        self.selector.select(pc, self.spectrum.len(), bin)
    }
}

/// Container for output from [MTage::peek].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MTagePrediction {
    /// Program counter of the predicted branch
    pub pc: u64,

    /// The final predicted direction
    pub outcome: Outcome,

    /// Direction predicted by each component
    pub votes: Votes,

    /// Subpath selected in each component
    pub subpaths: [usize; NPRED],

    /// Output from each component
    pub components: Vec<TagePrediction>,
}

/// The MTAGE+COLT predictor.
pub struct MTage {
    /// The configuration used to create this object
    pub cfg: MTageConfig,

    pub stat: MTageStats,

    pub components: Vec<Component>,

    pub colt: ColtTable,

    pub bft: BranchFrequencyTable,

    pub bins: FrequencyBins,

    /// The most recent prediction, waiting for the branch to resolve
    pending: Option<MTagePrediction>,
}
impl MTage {
    pub(crate) fn new(cfg: MTageConfig) -> Result<Self, ConfigError> {
        let components = cfg.components.iter().cloned()
            .map(Component::new)
            .collect::<Result<Vec<_>, _>>()?;
        let colt = ColtTable::new(cfg.colt.log_size, cfg.colt.ctr_bits);
        let bft = BranchFrequencyTable::new(1 << cfg.frequency.log_size,
            cfg.frequency.max_freq);
        let bins = FrequencyBins::new(cfg.frequency.num_bins,
            cfg.frequency.ratio_bits);

        tracing::info!(
            storage_kib = cfg.storage_bits() / 8 / 1024,
            components = ?components.iter().map(|c| c.name()).collect::<Vec<_>>(),
            "built MTAGE predictor"
        );

        Ok(Self {
            cfg,
            stat: MTageStats::default(),
            components,
            colt,
            bft,
            bins,
            pending: None,
        })
    }

    /// Return the frequency bin currently assigned to the branch at 'pc'.
    pub fn frequency_bin(&self, pc: u64) -> usize {
        self.bins.find(self.bft.get_freq(pc))
    }

    /// Compute a prediction for the branch at 'pc' without changing any
    /// state.
    pub fn peek(&self, pc: u64) -> MTagePrediction {
        let bin = self.frequency_bin(pc);
        let mut subpaths = [0; NPRED];
        let mut votes = Votes::new();
        let mut components = Vec::with_capacity(NPRED);
        for (i, comp) in self.components.iter().enumerate() {
            let sp = comp.select(pc, bin);
            let p = comp.table.predict(pc, comp.spectrum.get(sp));
            votes.set(i, p.outcome);
            subpaths[i] = sp;
            components.push(p);
        }
        let outcome = self.colt.predict(pc, votes);
        MTagePrediction { pc, outcome, votes, subpaths, components }
    }

    /// The prediction waiting for its branch to resolve, if any.
    pub fn pending(&self) -> Option<&MTagePrediction> {
        self.pending.as_ref()
    }

    /// Train every component, the frequency table, and the combiner with
    /// the resolved outcome of a conditional branch.
    fn update_conditional(&mut self, pred: MTagePrediction, outcome: Outcome,
        target: u64)
    {
        let pc = pred.pc;
        self.stat.conditional += 1;
        if pred.outcome != outcome {
            self.stat.colt_miss += 1;
        }

        for (i, comp) in self.components.iter_mut().enumerate() {
            let p = &pred.components[i];
            if p.outcome != outcome {
                self.stat.component_miss[i] += 1;
            }
            comp.table.update(outcome, p);
        }
        self.update_history(&pred, outcome, target);

        let freq = self.bft.get_freq(pc);
        self.bins.update(freq);
        self.bft.increment(pc);

        self.colt.update(pc, pred.votes, outcome);
    }

    /// Record a resolved conditional branch in the subpath each component
    /// selected for it.
    fn update_history(&mut self, pred: &MTagePrediction, outcome: Outcome,
        target: u64)
    {
        let pc = pred.pc;
        let for_update = if outcome.is_taken() { (target << 1) ^ pc } else { pc };
        let backward = target < pc;
        for (i, comp) in self.components.iter_mut().enumerate() {
            let sp = comp.spectrum.get_mut(pred.subpaths[i]);
            match comp.filter {
                HistoryFilter::All => sp.update(for_update, outcome),
                HistoryFilter::BackwardTaken => if backward {
                    sp.update(for_update, outcome);
                },
            }
        }
    }
}

impl BranchPredictor for MTage {
    fn name(&self) -> &str { "mtage" }

    fn predict(&mut self, pc: u64) -> Outcome {
        let pred = self.peek(pc);
        let outcome = pred.outcome;
        self.pending = Some(pred);
        outcome
    }

    fn update(&mut self,
        pc: u64,
        kind: OpType,
        outcome: Outcome,
        predicted: Outcome,
        target: u64,
    )
    {
        if !kind.is_conditional() {
            tracing::warn!(pc = format_args!("{:#x}", pc), ?kind,
                "update for a non-conditional instruction");
            self.track_other_inst(pc, kind, outcome, target);
            return;
        }

        let pred = match self.pending.take() {
            Some(p) if p.pc == pc => p,
            other => {
                tracing::warn!(pc = format_args!("{:#x}", pc),
                    pending = ?other.map(|p| p.pc),
                    "update without a matching prediction");
                self.stat.unmatched_updates += 1;
                self.peek(pc)
            },
        };
        if pred.outcome != predicted {
            tracing::debug!(pc = format_args!("{:#x}", pc), ?predicted,
                ours = ?pred.outcome, "caller reported a different prediction");
        }
        self.update_conditional(pred, outcome, target);
    }

    fn track_other_inst(&mut self,
        pc: u64,
        kind: OpType,
        outcome: Outcome,
        target: u64,
    )
    {
        if kind.is_conditional() {
            tracing::warn!(pc = format_args!("{:#x}", pc), ?kind,
                "conditional branch recorded as another instruction");
        }

        let p0 = pc ^ (pc >> 2);
        let t0 = target ^ (target >> 2);
        let for_update = (t0 << 1) ^ p0;
        let bin = self.frequency_bin(pc);
        for comp in self.components.iter_mut() {
            let idx = comp.select(pc, bin);
            comp.spectrum.get_mut(idx).update(for_update, outcome);
        }
        self.stat.other += 1;
    }

    fn storage_bits(&self) -> usize { self.cfg.storage_bits() }
}
