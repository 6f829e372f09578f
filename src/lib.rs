//! A model of the MTAGE+COLT conditional branch predictor: several TAGE
//! predictors indexed with different kinds of path history, combined by a
//! table of counters indexed by their votes.

pub mod branch;
pub mod error;
pub mod history;
pub mod predictor;
pub mod cores;
pub mod trace;
pub mod sim;
pub mod stats;

pub use branch::*;
pub use error::*;
pub use history::*;
pub use predictor::*;
pub use cores::*;
pub use trace::*;
pub use stats::*;
