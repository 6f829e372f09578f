
use std::path::Path;

use serde::{ Deserialize, Serialize };

use crate::error::ConfigError;
use crate::predictor::*;

/// Strategy for choosing which [Subpath] of a component's [Spectrum] is
/// used for a particular branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubpathSelector {
    /// A single global path
    Global,

    /// One path per branch address (modulo the spectrum size)
    PerAddress,

    /// One path per set of branch addresses
    PerSet { shift: u32 },

    /// One path per frequency bin (see [FrequencyBins])
    Frequency,
}
impl SubpathSelector {
    /// Select a subpath for the branch at 'pc' given the spectrum size and
    /// the frequency bin of the branch.
    pub fn select(&self, pc: u64, size: usize, bin: usize) -> usize {
        let res = match self {
            Self::Global => 0,
            Self::PerAddress => (pc % size as u64) as usize,
            Self::PerSet { shift } => ((pc >> shift) % size as u64) as usize,
            Self::Frequency => bin,
        };
        debug_assert!(res < size);
        res
    }
}

/// Which resolved conditional branches are recorded in a component's path
/// history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryFilter {
    /// Every conditional branch
    All,

    /// Only backward conditional branches (recording whether they were
    /// taken)
    BackwardTaken,
}

/// Configuration for one component of an [MTage] predictor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentConfig {
    pub tage: TageConfig,

    /// Number of subpaths
    pub spectrum_size: usize,

    pub selector: SubpathSelector,

    pub filter: HistoryFilter,
}

/// Configuration for a [ColtTable].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColtConfig {
    /// Number of rows [log2]
    pub log_size: u32,

    /// Number of bits in each counter
    pub ctr_bits: u32,
}

/// Configuration for the [BranchFrequencyTable] and [FrequencyBins].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrequencyConfig {
    /// Number of frequency table entries [log2]
    pub log_size: u32,

    /// Ratio between neighboring bins [log2]
    pub ratio_bits: u32,

    /// Saturation value for execution counts
    pub max_freq: u32,

    /// Number of frequency bins
    pub num_bins: usize,
}

/// Configuration for an [MTage] predictor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MTageConfig {
    pub components: Vec<ComponentConfig>,
    pub colt: ColtConfig,
    pub frequency: FrequencyConfig,
}

impl Default for MTageConfig {
    /// A configuration with the structure of [MTageConfig::unlimited],
    /// scaled down to a few MiB of tables.
    fn default() -> Self {
        let comp = |name, numg, logb, logg, max, min| -> TageConfig {
            let mut cfg = TageConfig::unlimited(name, numg, logb, logg,
                max, min);
            cfg.tag_bits = 12;
            cfg.rampup = 10_000;
            cfg.postp_ctx_bits = 4;
            cfg
        };
        Self::with_components([
            comp("P0", 15, 14, 12, 2000, 6),
            comp("P1", 12, 13, 11, 500, 5),
            comp("P2", 12, 13, 11, 300, 5),
            comp("P3", 12, 13, 11, 300, 5),
            comp("P4", 12, 13, 11, 300, 5),
            comp("P5", 12, 13, 11, 300, 5),
        ], [1, 1024, 64, 16, 8, 1],
        ColtConfig { log_size: 16, ctr_bits: 5 },
        FrequencyConfig {
            log_size: 16, ratio_bits: 1, max_freq: u32::MAX, num_bins: 8
        })
    }
}

impl MTageConfig {
    /// Assemble a configuration with the usual component roles: a global
    /// path, a per-address path, two per-set paths, a per-frequency path,
    /// and a global path of backward branches.
    fn with_components(tage: [TageConfig; NPRED], sizes: [usize; NPRED],
        colt: ColtConfig, frequency: FrequencyConfig) -> Self
    {
        let roles = [
            (SubpathSelector::Global, HistoryFilter::All),
            (SubpathSelector::PerAddress, HistoryFilter::All),
            (SubpathSelector::PerSet { shift: 7 }, HistoryFilter::All),
            (SubpathSelector::PerSet { shift: 4 }, HistoryFilter::All),
            (SubpathSelector::Frequency, HistoryFilter::All),
            (SubpathSelector::Global, HistoryFilter::BackwardTaken),
        ];
        let components = tage.into_iter().zip(sizes).zip(roles)
            .map(|((tage, spectrum_size), (selector, filter))| {
                ComponentConfig { tage, spectrum_size, selector, filter }
            }).collect();
        Self { components, colt, frequency }
    }

    /// The "unlimited" configuration (hundreds of MiB of tables).
    pub fn unlimited() -> Self {
        Self::with_components([
            TageConfig::unlimited("P0", 25, 21, 21, 5000, 7),
            TageConfig::unlimited("P1", 22, 20, 20, 2000, 5),
            TageConfig::unlimited("P2", 21, 20, 20, 500, 5),
            TageConfig::unlimited("P3", 20, 20, 20, 500, 5),
            TageConfig::unlimited("P4", 20, 20, 20, 500, 5),
            TageConfig::unlimited("P5", 20, 20, 20, 400, 5),
        ], [1, 4096, 64, 16, 8, 1],
        ColtConfig { log_size: 20, ctr_bits: 5 },
        FrequencyConfig {
            log_size: 20, ratio_bits: 1, max_freq: u32::MAX, num_bins: 8
        })
    }

    /// A small configuration that builds quickly.
    pub fn small() -> Self {
        let comp = |name, numg, logb, logg, max, min| -> TageConfig {
            let mut cfg = TageConfig::unlimited(name, numg, logb, logg,
                max, min);
            cfg.tag_bits = 11;
            cfg.rampup = 2_000;
            cfg.postp_ctx_bits = 4;
            cfg.alloc_fail_max = 255;
            cfg
        };
        Self::with_components([
            comp("P0", 8, 10, 10, 200, 5),
            comp("P1", 6, 9, 9, 100, 4),
            comp("P2", 6, 9, 9, 100, 4),
            comp("P3", 6, 9, 9, 100, 4),
            comp("P4", 6, 9, 9, 100, 4),
            comp("P5", 6, 9, 9, 80, 4),
        ], [1, 64, 16, 8, 4, 1],
        ColtConfig { log_size: 10, ctr_bits: 5 },
        FrequencyConfig {
            log_size: 10, ratio_bits: 1, max_freq: u32::MAX, num_bins: 4
        })
    }

    /// Look up a preset configuration by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "unlimited" => Some(Self::unlimited()),
            "default" => Some(Self::default()),
            "small" => Some(Self::small()),
            _ => None,
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::Io { path: path.to_path_buf(), source }
        })?;
        Self::from_json_str(&s)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.components.len() != NPRED {
            return Err(ConfigError::ComponentCount {
                expected: NPRED,
                found: self.components.len(),
            });
        }
        for c in self.components.iter() {
            c.tage.validate()?;
            let name = &c.tage.name;
            if c.spectrum_size == 0 {
                return Err(ConfigError::invalid(name,
                    "spectrum_size must be non-zero"));
            }
            match c.selector {
                SubpathSelector::Frequency => {
                    if c.spectrum_size != self.frequency.num_bins {
                        return Err(ConfigError::invalid(name, format!(
                            "spectrum_size ({}) must match the number of \
                            frequency bins ({})",
                            c.spectrum_size, self.frequency.num_bins)));
                    }
                },
                SubpathSelector::PerSet { shift } if shift >= 64 => {
                    return Err(ConfigError::invalid(name, format!(
                        "subpath shift ({}) must be less than 64", shift)));
                },
                _ => {},
            }
        }
        if !(1..=24).contains(&self.colt.log_size) {
            return Err(ConfigError::invalid("colt", format!(
                "log_size ({}) must be in 1..=24", self.colt.log_size)));
        }
        if !(2..=8).contains(&self.colt.ctr_bits) {
            return Err(ConfigError::invalid("colt", format!(
                "ctr_bits ({}) must be in 2..=8", self.colt.ctr_bits)));
        }
        let f = &self.frequency;
        if f.log_size > 28 || f.num_bins == 0
            || !(1..32).contains(&f.ratio_bits)
        {
            return Err(ConfigError::invalid("frequency", format!(
                "log_size {}, ratio_bits {}, num_bins {} out of range",
                f.log_size, f.ratio_bits, f.num_bins)));
        }
        Ok(())
    }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        let tables: usize = self.components.iter()
            .map(|c| c.tage.storage_bits()).sum();
        let colt = (ColtTable::ROW_SIZE << self.colt.log_size)
            * self.colt.ctr_bits as usize;
        let freq_bits = u32::BITS - self.frequency.max_freq.leading_zeros();
        let bft = (1usize << self.frequency.log_size) * freq_bits as usize;
        tables + colt + bft
    }

    /// Use this configuration to create a new [`MTage`] predictor.
    pub fn build(self) -> Result<MTage, ConfigError> {
        self.validate()?;
        MTage::new(self)
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for name in ["unlimited", "default", "small"] {
            let cfg = MTageConfig::preset(name).unwrap();
            assert!(cfg.validate().is_ok(), "{}", name);
        }
        assert!(MTageConfig::preset("huge").is_none());
    }

    #[test]
    fn unlimited_matches_reference_geometry() {
        let cfg = MTageConfig::unlimited();
        let numg: Vec<usize> = cfg.components.iter()
            .map(|c| c.tage.num_tagged).collect();
        assert_eq!(numg, vec![25, 22, 21, 20, 20, 20]);
        let sizes: Vec<usize> = cfg.components.iter()
            .map(|c| c.spectrum_size).collect();
        assert_eq!(sizes, vec![1, 4096, 64, 16, 8, 1]);
        assert_eq!(cfg.components[2].selector,
            SubpathSelector::PerSet { shift: 7 });
        assert_eq!(cfg.components[5].filter, HistoryFilter::BackwardTaken);
    }

    #[test]
    fn json_roundtrip_and_validation() {
        let cfg = MTageConfig::small();
        let s = cfg.to_json_pretty().unwrap();
        assert!(s.contains("\"kind\": \"per_set\""));
        assert_eq!(MTageConfig::from_json_str(&s).unwrap(), cfg);

        let mut bad = cfg.clone();
        bad.components.pop();
        let s = serde_json::to_string(&bad).unwrap();
        assert!(matches!(MTageConfig::from_json_str(&s),
            Err(ConfigError::ComponentCount { expected: 6, found: 5 })));

        let mut bad = cfg.clone();
        bad.components[4].spectrum_size = 3;
        assert!(bad.validate().is_err());

        assert!(matches!(MTageConfig::from_json_str("{"),
            Err(ConfigError::Json(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let res = MTageConfig::from_file("/nonexistent/mtage.json");
        assert!(matches!(res, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn selectors() {
        assert_eq!(SubpathSelector::Global.select(0x1234, 1, 0), 0);
        assert_eq!(SubpathSelector::PerAddress.select(0x1234, 16, 0), 4);
        assert_eq!(SubpathSelector::PerSet { shift: 4 }.select(0x1234, 16, 0),
            3);
        assert_eq!(SubpathSelector::Frequency.select(0x1234, 8, 5), 5);
    }
}
