
pub mod counter;
pub mod tage;
pub mod colt;
pub mod frequency;
pub mod mtage;

pub use counter::*;
pub use tage::*;
pub use colt::*;
pub use frequency::*;
pub use mtage::*;

use crate::branch::OpType;
use crate::Outcome;

/// Interface to a conditional branch direction predictor as seen by a
/// simulated core.
///
/// Calls for a particular predictor must be made in the order in which the
/// corresponding instructions retire.
pub trait BranchPredictor {
    /// A short name for this predictor.
    fn name(&self) -> &str;

    /// Predict the direction of the conditional branch at 'pc'.
    fn predict(&mut self, pc: u64) -> Outcome;

    /// Train the predictor with the resolved direction of the conditional
    /// branch at 'pc'.
    fn update(&mut self,
        pc: u64,
        kind: OpType,
        outcome: Outcome,
        predicted: Outcome,
        target: u64,
    );

    /// Record a control-flow instruction that is not a conditional branch.
    fn track_other_inst(&mut self,
        pc: u64,
        kind: OpType,
        outcome: Outcome,
        target: u64,
    );

    /// Get the [approximate] number of storage bits.
    fn storage_bits(&self) -> usize;
}

/// Interface to a table of predictors.
pub trait PredictorTable {
    /// The type of input to the table used to form an index.
    type Input<'a>;

    /// The type of entry in the table.
    type Entry;

    /// Returns the number of entries in the table.
    fn size(&self) -> usize;

    /// Given some input, return the corresponding index into the table.
    fn get_index<'a>(&self, input: Self::Input<'a>) -> usize;

    /// Returns a reference to an entry in the table.
    fn get_entry(&self, idx: usize) -> &Self::Entry;

    /// Returns a mutable reference to an entry in the table.
    fn get_entry_mut(&mut self, idx: usize) -> &mut Self::Entry;

    /// Returns a mask corresponding to the number of entries in the table.
    fn index_mask(&self) -> usize {
        debug_assert!(self.size().is_power_of_two());
        self.size() - 1
    }
}

/// Interface to a *tagged* table of predictors.
pub trait TaggedPredictorTable: PredictorTable {
    fn get_tag<'a>(&self, input: Self::Input<'a>) -> u16;
}
