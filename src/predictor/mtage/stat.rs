
use crate::predictor::NPRED;

/// Container for [MTage] runtime stats.
///
/// [MTage]: super::MTage
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MTageStats {
    /// Resolved conditional branches
    pub conditional: usize,

    /// Other control-flow instructions recorded in path history
    pub other: usize,

    /// Mispredictions made by each component
    pub component_miss: [usize; NPRED],

    /// Mispredictions made by the COLT combiner (the final prediction)
    pub colt_miss: usize,

    /// Updates that did not follow a prediction for the same branch
    pub unmatched_updates: usize,
}
impl MTageStats {
    /// Final mispredictions per thousand conditional branches.
    pub fn mpkb(&self) -> f64 {
        if self.conditional == 0 {
            return 0.0;
        }
        self.colt_miss as f64 * 1000.0 / self.conditional as f64
    }
}
