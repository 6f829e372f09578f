
use serde::{ Deserialize, Serialize };

use crate::error::ConfigError;
use crate::history::*;
use crate::predictor::*;

/// Configuration for a [`TaggedTable`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TageConfig {
    /// Name used when reporting on this table
    pub name: String,

    /// Number of tagged banks
    pub num_tagged: usize,

    /// Number of entries in the base component [log2]
    pub log_base_size: u32,

    /// Number of entries in each tagged bank [log2]
    pub log_tagged_size: u32,

    /// History length associated with the shortest bank
    pub min_hist: usize,

    /// History length associated with the longest bank
    pub max_hist: usize,

    /// Shift applied to the secondary index fold
    pub hash_param: u32,

    /// Number of mispredictions before switching to careful updates
    pub rampup: u64,

    /// Number of bits in a partial tag
    pub tag_bits: u32,

    /// Number of bits in the base and tagged direction counters
    pub ctr_bits: u32,

    /// Number of bits in the post-predictor counters
    pub postp_bits: u32,

    /// Number of bits of (pc, provider) context in the post-predictor index.
    /// With 0 the index holds only the counter field.
    pub postp_ctx_bits: u32,

    /// Number of low-order bits of each path fragment folded into history
    pub path_bits: u32,

    /// During ramp-up, banks with history longer than this are not
    /// reallocated when the update carried no information
    pub caphist: usize,

    /// Number of failed allocations tolerated before all 'useful' counters
    /// are cleared
    pub alloc_fail_max: u32,

    /// Maximum number of allocations after a misprediction
    pub max_alloc: usize,
}
impl TageConfig {
    /// A configuration using the common parameters of the "unlimited"
    /// predictor, given the table geometry.
    ///
    /// The "unlimited" post-predictor is indexed by the counter field alone
    /// ('postp_ctx_bits' is 0); the scaled-down presets add a 4-bit hash of
    /// pc, providing bank and primary/alternate agreement.
    pub fn unlimited(name: &str, num_tagged: usize, log_base_size: u32,
        log_tagged_size: u32, max_hist: usize, min_hist: usize) -> Self
    {
        Self {
            name: name.to_string(),
            num_tagged,
            log_base_size,
            log_tagged_size,
            min_hist,
            max_hist,
            hash_param: 3,
            rampup: 100_000,
            tag_bits: 15,
            ctr_bits: 3,
            postp_bits: 5,
            postp_ctx_bits: 0,
            path_bits: 6,
            caphist: 200,
            alloc_fail_max: 511,
            max_alloc: 3,
        }
    }

    /// Check that every parameter can be represented by the tables.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let err = |detail: String| Err(ConfigError::invalid(&self.name, detail));

        if self.num_tagged < 2 {
            return err(format!("num_tagged ({}) must be at least 2",
                self.num_tagged));
        }
        if !(1..=28).contains(&self.log_base_size) {
            return err(format!("log_base_size ({}) must be in 1..=28",
                self.log_base_size));
        }
        if !(1..=28).contains(&self.log_tagged_size) {
            return err(format!("log_tagged_size ({}) must be in 1..=28",
                self.log_tagged_size));
        }
        if !(1..=16).contains(&self.tag_bits) {
            return err(format!("tag_bits ({}) must be in 1..=16",
                self.tag_bits));
        }
        if !(1..=8).contains(&self.ctr_bits) {
            return err(format!("ctr_bits ({}) must be in 1..=8",
                self.ctr_bits));
        }
        if !(1..=8).contains(&self.postp_bits) {
            return err(format!("postp_bits ({}) must be in 1..=8",
                self.postp_bits));
        }
        if self.path_bits == 0 {
            return err("path_bits must be non-zero".to_string());
        }
        if self.hash_param >= self.log_tagged_size
            || self.log_tagged_size - self.hash_param < self.path_bits
        {
            return err(format!(
                "log_tagged_size - hash_param ({} - {}) must be at least \
                path_bits ({})",
                self.log_tagged_size, self.hash_param, self.path_bits));
        }
        if self.tag_bits - 1 < self.path_bits {
            return err(format!(
                "tag_bits - 1 ({}) must be at least path_bits ({})",
                self.tag_bits - 1, self.path_bits));
        }
        if self.postp_index_bits() > 28 {
            return err(format!("post-predictor index is too wide ({} bits)",
                self.postp_index_bits()));
        }
        if self.min_hist == 0 || self.max_hist < self.min_hist
            || self.max_hist - self.min_hist + 1 < self.num_tagged
        {
            return err(format!(
                "history range {}..={} cannot hold {} distinct lengths",
                self.min_hist, self.max_hist, self.num_tagged));
        }
        if self.max_alloc == 0 {
            return err("max_alloc must be non-zero".to_string());
        }
        Ok(())
    }

    /// History length for each tagged bank, longest first.
    pub fn history_lengths(&self) -> Vec<usize> {
        let mut lens = geometric_lengths(self.min_hist, self.max_hist,
            self.num_tagged);
        lens.reverse();
        lens
    }

    /// Width of the counter field of the post-predictor index.
    pub fn postp_ctr_field_bits(&self) -> u32 {
        2 * self.ctr_bits + 1
    }

    /// Width of the post-predictor index.
    pub fn postp_index_bits(&self) -> u32 {
        self.postp_ctx_bits + self.postp_ctr_field_bits()
    }

    pub fn base_size(&self) -> usize { 1 << self.log_base_size }
    pub fn tagged_size(&self) -> usize { 1 << self.log_tagged_size }
    pub fn postp_size(&self) -> usize { 1 << self.postp_index_bits() }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        let entry = self.tag_bits as usize + self.ctr_bits as usize + 2;
        let base = self.base_size() * self.ctr_bits as usize;
        let tagged = self.num_tagged * self.tagged_size() * entry;
        let postp = self.postp_size() * self.postp_bits as usize;
        base + tagged + postp
    }

    /// Use this configuration to create a new [`TaggedTable`].
    pub fn build(self) -> Result<TaggedTable, ConfigError> {
        self.validate()?;
        Ok(TaggedTable::new(self))
    }
}


#[cfg(test)]
mod test {
    use super::*;

    fn cfg() -> TageConfig {
        let mut cfg = TageConfig::unlimited("t", 8, 10, 10, 200, 5);
        cfg.tag_bits = 12;
        cfg
    }

    #[test]
    fn unlimited_parameters_are_valid() {
        let cfg = TageConfig::unlimited("P0", 25, 21, 21, 5000, 7);
        assert!(cfg.validate().is_ok());
        let lens = cfg.history_lengths();
        assert_eq!(lens.len(), 25);
        assert_eq!(lens[0], 5000);
        assert_eq!(lens[24], 7);
    }

    #[test]
    fn unlimited_post_predictor_has_no_context() {
        let cfg = TageConfig::unlimited("P0", 25, 21, 21, 5000, 7);
        assert_eq!(cfg.postp_ctx_bits, 0);
        assert_eq!(cfg.postp_index_bits(), cfg.postp_ctr_field_bits());
        assert_eq!(cfg.postp_size(), 1 << 7);
    }

    #[test]
    fn narrow_secondary_fold_is_rejected() {
        let mut c = cfg();
        c.hash_param = 5;
        assert!(matches!(c.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn narrow_tag_is_rejected() {
        let mut c = cfg();
        c.tag_bits = 6;
        assert!(c.validate().is_err());
        c.tag_bits = 17;
        assert!(c.validate().is_err());
    }

    #[test]
    fn crowded_history_range_is_rejected() {
        let mut c = cfg();
        c.min_hist = 10;
        c.max_hist = 14;
        assert!(c.validate().is_err());
    }

    #[test]
    fn json_roundtrip() {
        let c = cfg();
        let s = serde_json::to_string(&c).unwrap();
        let d: TageConfig = serde_json::from_str(&s).unwrap();
        assert_eq!(c, d);
    }
}
