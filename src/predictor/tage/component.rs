
use crate::Outcome;
use crate::predictor::*;
use super::Subpath;

/// The tagless "base" component of a [TaggedTable].
#[derive(Clone, Debug)]
pub struct BimodalTable {
    /// A table of saturating counters
    data: Vec<SaturatingCounter>,
}
impl BimodalTable {
    pub fn new(size: usize, init: SaturatingCounter) -> Self {
        assert!(size.is_power_of_two());
        Self { data: vec![init; size] }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SaturatingCounter> {
        self.data.iter()
    }
}
impl PredictorTable for BimodalTable {
    type Input<'a> = u64;
    type Entry = SaturatingCounter;

    fn size(&self) -> usize { self.data.len() }

    fn get_index<'a>(&self, pc: Self::Input<'a>) -> usize {
        (pc as usize) & self.index_mask()
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


/// An entry in some [TaggedBank].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TaggedEntry {
    /// Partial tag
    pub tag: u16,

    /// Direction counter
    pub ctr: SaturatingCounter,

    /// 2-bit 'useful' counter
    pub useful: u8,
}
impl TaggedEntry {
    pub const USEFUL_MAX: u8 = 3;

    pub fn predict(&self) -> Outcome {
        self.ctr.predict()
    }

    pub fn increment_useful(&mut self) {
        if self.useful < Self::USEFUL_MAX {
            self.useful += 1;
        }
    }

    pub fn decrement_useful(&mut self) {
        self.useful = self.useful.saturating_sub(1);
    }
}


/// A tagged component in a [TaggedTable].
#[derive(Clone, Debug)]
pub struct TaggedBank {
    /// Position of this bank (0 is the longest history)
    id: usize,

    /// Number of path history fragments used to index this bank
    hist_len: usize,

    /// Mask for partial tags
    tag_mask: u64,

    /// Table of entries
    data: Vec<TaggedEntry>,
}
impl TaggedBank {
    pub fn new(id: usize, hist_len: usize, size: usize, tag_bits: u32,
        init: TaggedEntry) -> Self
    {
        assert!(size.is_power_of_two());
        assert!(tag_bits > 0 && tag_bits <= 16);
        Self {
            id,
            hist_len,
            tag_mask: (1u64 << tag_bits) - 1,
            data: vec![init; size],
        }
    }

    pub fn id(&self) -> usize { self.id }
    pub fn hist_len(&self) -> usize { self.hist_len }

    pub fn iter(&self) -> impl Iterator<Item = &TaggedEntry> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TaggedEntry> {
        self.data.iter_mut()
    }
}
impl PredictorTable for TaggedBank {
    type Input<'a> = (u64, &'a Subpath);
    type Entry = TaggedEntry;

    fn size(&self) -> usize { self.data.len() }

    fn get_index<'a>(&self, input: Self::Input<'a>) -> usize {
        let (pc, subpath) = input;
        let hash = pc ^ subpath.index_bits(self.id);
        (hash as usize) & self.index_mask()
    }

    fn get_entry(&self, idx: usize) -> &TaggedEntry {
        debug_assert!(idx < self.size());
        &self.data[idx]
    }

    fn get_entry_mut(&mut self, idx: usize) -> &mut TaggedEntry {
        debug_assert!(idx < self.size());
        &mut self.data[idx]
    }
}
impl TaggedPredictorTable for TaggedBank {
    fn get_tag<'a>(&self, input: Self::Input<'a>) -> u16 {
        let (pc, subpath) = input;
        ((pc ^ subpath.tag_bits(self.id)) & self.tag_mask) as u16
    }
}
