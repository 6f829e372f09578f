//! Tracking how often each branch executes.

use crate::predictor::*;

/// A direct-mapped table counting the executions of each branch.
///
/// Branches that map to the same entry share a count.
#[derive(Clone, Debug)]
pub struct BranchFrequencyTable {
    data: Vec<u32>,
    max_freq: u32,
}
impl BranchFrequencyTable {
    pub fn new(size: usize, max_freq: u32) -> Self {
        assert!(size > 0);
        Self { data: vec![0; size], max_freq }
    }

    /// Return the execution count for 'pc'.
    pub fn get_freq(&self, pc: u64) -> u32 {
        *self.get_entry(self.get_index(pc))
    }

    /// Count one more execution of 'pc'.
    pub fn increment(&mut self, pc: u64) {
        let max = self.max_freq;
        let idx = self.get_index(pc);
        let f = self.get_entry_mut(idx);
        if *f < max {
            *f += 1;
        }
    }

    pub fn storage_bits(&self) -> usize {
        self.data.len() * (u32::BITS - self.max_freq.leading_zeros()) as usize
    }
}
impl PredictorTable for BranchFrequencyTable {
    type Input<'a> = u64;
    type Entry = u32;

    fn size(&self) -> usize { self.data.len() }

    // NOTE: The table size need not be a power of two.
    fn get_index<'a>(&self, pc: Self::Input<'a>) -> usize {
        (pc % self.data.len() as u64) as usize
    }

    fn get_entry(&self, idx: usize) -> &u32 {
        &self.data[idx]
    }

    fn get_entry_mut(&mut self, idx: usize) -> &mut u32 {
        &mut self.data[idx]
    }
}

/// Buckets branch execution counts relative to the largest count seen.
///
/// Bin 0 holds the most frequent branches (at least `max / 2^r`, where 'r'
/// is the ratio in bits); each following bin covers counts another factor
/// of `2^r` lower. The last bin also holds everything below that.
#[derive(Clone, Debug)]
pub struct FrequencyBins {
    num_bins: usize,
    ratio_bits: u32,
    max_freq: u32,
}
impl FrequencyBins {
    pub fn new(num_bins: usize, ratio_bits: u32) -> Self {
        assert!(num_bins > 0);
        assert!(ratio_bits > 0 && ratio_bits < 32);
        Self { num_bins, ratio_bits, max_freq: 0 }
    }

    pub fn num_bins(&self) -> usize { self.num_bins }

    pub fn max_freq(&self) -> u32 { self.max_freq }

    /// Find the bin for a branch with execution count 'freq'.
    pub fn find(&self, freq: u32) -> usize {
        let mut threshold = self.max_freq;
        for bin in 0..self.num_bins {
            threshold >>= self.ratio_bits;
            if freq >= threshold {
                return bin;
            }
        }
        self.num_bins - 1
    }

    /// Account for a branch with execution count 'freq'.
    pub fn update(&mut self, freq: u32) {
        self.max_freq = self.max_freq.max(freq);
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn frequency_table_counts_and_saturates() {
        let mut bft = BranchFrequencyTable::new(16, 3);
        for _ in 0..5 {
            bft.increment(0x21);
        }
        assert_eq!(bft.get_freq(0x21), 3);
        // 0x21 and 0x11 share an entry
        assert_eq!(bft.get_freq(0x11), 3);
        assert_eq!(bft.get_freq(0x22), 0);
    }

    #[test]
    fn bins_halve_with_ratio_one() {
        let mut bins = FrequencyBins::new(4, 1);
        assert_eq!(bins.find(0), 0);
        bins.update(100);
        assert_eq!(bins.max_freq(), 100);
        assert_eq!(bins.find(100), 0);
        assert_eq!(bins.find(50), 0);
        assert_eq!(bins.find(49), 1);
        assert_eq!(bins.find(25), 1);
        assert_eq!(bins.find(12), 2);
        assert_eq!(bins.find(6), 3);
        assert_eq!(bins.find(0), 3);
        bins.update(10);
        assert_eq!(bins.max_freq(), 100);
    }
}
