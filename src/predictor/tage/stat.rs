
/// Container for [TaggedTable] runtime stats.
///
/// [TaggedTable]: super::TaggedTable
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TageStats {
    /// Successful allocations
    pub allocs: usize,

    /// Failed allocations (candidate entry was still useful)
    pub failed_allocs: usize,

    /// Number of times all 'useful' counters were cleared
    pub resets: usize,

    /// Updates where the base component provided the prediction
    pub base_hits: usize,

    /// Mispredictions where the base component provided the prediction
    pub base_miss: usize,

    /// Updates where each tagged bank provided the prediction
    pub bank_hits: Vec<usize>,

    /// Mispredictions where each tagged bank provided the prediction
    pub bank_miss: Vec<usize>,

    /// Number of updates
    pub updates: usize,

    /// Number of updates where the final output was wrong
    pub mispredictions: usize,
}
impl TageStats {
    pub fn new(num_banks: usize) -> Self {
        Self {
            bank_hits: vec![0; num_banks],
            bank_miss: vec![0; num_banks],
            ..Default::default()
        }
    }

    /// Fraction of updates that were mispredicted.
    pub fn miss_rate(&self) -> f64 {
        if self.updates == 0 {
            return 0.0;
        }
        self.mispredictions as f64 / self.updates as f64
    }
}
