//! A set of predictors, one per simulated core.

use crate::branch::BranchRecord;
use crate::error::CoreError;
use crate::predictor::BranchPredictor;
use crate::Outcome;

/// Creates the predictor for a particular core.
pub type PredictorFactory = Box<dyn Fn(usize) -> Box<dyn BranchPredictor>>;

/// Owns one [BranchPredictor] for each simulated core and routes calls to
/// them by core index.
///
/// Predictors are created lazily by [CorePredictors::init].
pub struct CorePredictors {
    num_cores: usize,
    factory: PredictorFactory,
    cores: Vec<Box<dyn BranchPredictor>>,
}
impl CorePredictors {
    pub fn new(num_cores: usize, factory: PredictorFactory) -> Self {
        Self { num_cores, factory, cores: Vec::new() }
    }

    pub fn num_cores(&self) -> usize { self.num_cores }

    pub fn is_initialized(&self) -> bool {
        self.cores.len() == self.num_cores
    }

    /// Create the predictor for each core. Calling this more than once has
    /// no further effect.
    pub fn init(&mut self) {
        if self.is_initialized() {
            return;
        }
        self.cores = (0..self.num_cores).map(|id| (self.factory)(id)).collect();
        tracing::info!(num_cores = self.num_cores, "initialized core predictors");
    }

    pub fn get(&self, proc_id: usize) -> Result<&dyn BranchPredictor, CoreError> {
        self.cores.get(proc_id).map(|p| &**p)
            .ok_or(CoreError::UnknownCore { proc_id, num_cores: self.cores.len() })
    }

    fn get_mut(&mut self, proc_id: usize)
        -> Result<&mut Box<dyn BranchPredictor>, CoreError>
    {
        let num_cores = self.cores.len();
        self.cores.get_mut(proc_id)
            .ok_or(CoreError::UnknownCore { proc_id, num_cores })
    }

    /// Predict a conditional branch on core 'proc_id'.
    ///
    /// Branches on the wrong path are always predicted not-taken and never
    /// reach the predictor.
    pub fn predict(&mut self, proc_id: usize, pc: u64, off_path: bool)
        -> Result<Outcome, CoreError>
    {
        let pred = self.get_mut(proc_id)?;
        if off_path {
            return Ok(Outcome::N);
        }
        Ok(pred.predict(pc))
    }

    /// Report a retired control-flow instruction on core 'proc_id'.
    ///
    /// Conditional branches train the predictor; other control-flow
    /// instructions are only recorded in path history. Instructions on the
    /// wrong path are ignored.
    pub fn retire(&mut self, proc_id: usize, record: &BranchRecord,
        predicted: Outcome, off_path: bool) -> Result<(), CoreError>
    {
        let pred = self.get_mut(proc_id)?;
        if off_path || !record.kind.is_control_flow() {
            return Ok(());
        }
        if record.is_conditional() {
            pred.update(record.pc, record.kind, record.outcome, predicted,
                record.tgt);
        } else {
            pred.track_other_inst(record.pc, record.kind, record.outcome,
                record.tgt);
        }
        Ok(())
    }
}
