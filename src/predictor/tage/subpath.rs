//! Path history and folded history state used to index a [TaggedTable].
//!
//! The tables of a [TaggedTable] can be shared between several independent
//! streams of path history ("subpaths"). The set of subpaths available to a
//! table is its [Spectrum].

use crate::history::*;
use crate::Outcome;
use super::TageConfig;

/// One stream of path history along with the folded histories for each
/// tagged bank.
///
/// Bank 0 is associated with the longest history length.
#[derive(Clone, Debug)]
pub struct Subpath {
    /// Raw path history
    path: PathHistoryRegister,

    /// Folded history used to form an index
    chg: Vec<FoldedHistoryRegister>,

    /// Secondary (shorter) folded history used to form an index
    chgg: Vec<FoldedHistoryRegister>,

    /// Folded history used to form a tag
    cht: Vec<FoldedHistoryRegister>,

    /// Secondary (shorter) folded history used to form a tag
    chtt: Vec<FoldedHistoryRegister>,
}
impl Subpath {
    /// Create a subpath for the tagged banks described by 'cfg'.
    pub fn new(cfg: &TageConfig) -> Self {
        let lens = cfg.history_lengths();
        Self::with_lengths(&lens, cfg.log_tagged_size, cfg.tag_bits,
            cfg.path_bits, cfg.hash_param
        )
    }

    /// Create a subpath given the history length for each bank (longest
    /// first).
    pub fn with_lengths(lens: &[usize], log_tagged_size: u32, tag_bits: u32,
        path_bits: u32, hash_param: u32) -> Self
    {
        assert!(!lens.is_empty());
        let fold = |clen| -> Vec<FoldedHistoryRegister> {
            lens.iter().map(|len| {
                FoldedHistoryRegister::new(*len, clen, path_bits)
            }).collect()
        };
        Self {
            path: PathHistoryRegister::new(lens[0] + 1),
            chg: fold(log_tagged_size),
            chgg: fold(log_tagged_size - hash_param),
            cht: fold(tag_bits),
            chtt: fold(tag_bits - 1),
        }
    }

    pub fn path(&self) -> &PathHistoryRegister { &self.path }

    pub fn num_banks(&self) -> usize { self.chg.len() }

    /// Return the history length folded for a particular bank.
    pub fn history_length(&self, bank: usize) -> usize {
        self.chg[bank].original_length()
    }

    /// Record a branch in this subpath.
    pub fn update(&mut self, target: u64, outcome: Outcome) {
        let fragment = ((target << 1) | outcome as u64) as u32;
        self.insert(fragment);
    }

    /// Record a raw path fragment in this subpath.
    pub fn insert(&mut self, fragment: u32) {
        self.path.insert(fragment);
        for bank in 0..self.num_banks() {
            self.chg[bank].update(&self.path);
            self.chgg[bank].update(&self.path);
            self.cht[bank].update(&self.path);
            self.chtt[bank].update(&self.path);
        }
    }

    /// Folded history bits used to form the index for 'bank'.
    pub fn index_bits(&self, bank: usize) -> u64 {
        let shift = self.chg[bank].compressed_length()
            - self.chgg[bank].compressed_length();
        self.chg[bank].output() as u64
            ^ ((self.chgg[bank].output() as u64) << shift)
    }

    /// Folded history bits used to form the tag for 'bank'.
    pub fn tag_bits(&self, bank: usize) -> u64 {
        let shift = self.cht[bank].compressed_length()
            - self.chtt[bank].compressed_length();
        self.cht[bank].output() as u64
            ^ ((self.chtt[bank].output() as u64) << shift)
    }
}

/// A set of independent [Subpath]s sharing the tables of one [TaggedTable].
#[derive(Clone, Debug)]
pub struct Spectrum {
    subpaths: Vec<Subpath>,
}
impl Spectrum {
    pub fn new(cfg: &TageConfig, size: usize) -> Self {
        assert!(size > 0);
        // NOTE: Every subpath starts out empty, so cloning is equivalent to
        // building each one from scratch.
        let proto = Subpath::new(cfg);
        Self { subpaths: vec![proto; size] }
    }

    pub fn len(&self) -> usize { self.subpaths.len() }

    pub fn get(&self, idx: usize) -> &Subpath {
        &self.subpaths[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut Subpath {
        &mut self.subpaths[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subpath> {
        self.subpaths.iter()
    }
}
