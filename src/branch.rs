//! Types for representing branches and branch outcomes.

use crate::error::TraceError;

/// A branch outcome.
#[repr(u32)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Outcome {
    /// Not taken
    N = 0,
    /// Taken
    T = 1
}

impl Outcome {
    pub fn from_bool(b: bool) -> Self {
        match b {
            true => Self::T,
            false => Self::N,
        }
    }

    /// Returns 'true' if this outcome is [Outcome::T].
    pub fn is_taken(self) -> bool {
        matches!(self, Self::T)
    }
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Self::T => "t",
            Self::N => "n",
        };
        write!(f, "{}", s)
    }
}

impl std::ops::Not for Outcome {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            Self::N => Self::T,
            Self::T => Self::N,
        }
    }
}

impl From<bool> for Outcome {
    fn from(x: bool) -> Self {
        Self::from_bool(x)
    }
}
impl From<Outcome> for bool {
    fn from(x: Outcome) -> Self {
        x.is_taken()
    }
}

/// The kind of instruction reported to a predictor.
///
/// Only [OpType::JmpDirectCond] and [OpType::JmpIndirectCond] are ever
/// predicted; everything else is only used to keep path history in sync
/// with the executed program.
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpType {
    /// A direct unconditional jump.
    JmpDirectUncond,
    /// An indirect unconditional jump.
    JmpIndirectUncond,
    /// A direct conditional branch.
    JmpDirectCond,
    /// An indirect conditional branch.
    JmpIndirectCond,
    /// A direct procedure call.
    CallDirect,
    /// An indirect procedure call.
    CallIndirect,
    /// A procedure return.
    Return,
    /// Anything else.
    Other,
}
impl OpType {
    /// Returns 'true' for conditional branches.
    pub fn is_conditional(&self) -> bool {
        matches!(self, Self::JmpDirectCond | Self::JmpIndirectCond)
    }

    /// Returns 'true' for any kind of control-flow instruction.
    pub fn is_control_flow(&self) -> bool {
        !matches!(self, Self::Other)
    }

    /// Returns 'true' if the target is not encoded in the instruction.
    pub fn is_indirect(&self) -> bool {
        matches!(self,
            Self::JmpIndirectUncond | Self::JmpIndirectCond |
            Self::CallIndirect | Self::Return
        )
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Self::CallDirect | Self::CallIndirect)
    }

    pub fn is_return(&self) -> bool {
        matches!(self, Self::Return)
    }
}

/// Flag bits describing a [BranchRecord] in a binary trace.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct BranchFlags(pub u32);
impl BranchFlags {
    pub const BRN_FLAG: u32   = 1 << 0;
    pub const JMP_FLAG: u32   = 1 << 1;
    pub const CALL_FLAG: u32  = 1 << 2;
    pub const RET_FLAG: u32   = 1 << 3;
    pub const IND_FLAG: u32   = 1 << 4;
    pub const TAKEN_FLAG: u32 = 1 << 5;

    const KIND_MASK: u32 = 0b01_1111;

    pub fn is_taken(&self) -> bool { self.0 & Self::TAKEN_FLAG != 0 }

    /// Decode the kind of instruction described by these flags.
    pub fn kind(&self) -> Result<OpType, TraceError> {
        let kbits = self.0 & Self::KIND_MASK;
        let ind = kbits & Self::IND_FLAG != 0;
        let res = match kbits & !Self::IND_FLAG {
            0 if !ind          => OpType::Other,
            Self::BRN_FLAG     => if ind {
                OpType::JmpIndirectCond
            } else {
                OpType::JmpDirectCond
            },
            Self::JMP_FLAG     => if ind {
                OpType::JmpIndirectUncond
            } else {
                OpType::JmpDirectUncond
            },
            Self::CALL_FLAG    => if ind {
                OpType::CallIndirect
            } else {
                OpType::CallDirect
            },
            Self::RET_FLAG     => OpType::Return,
            _ => return Err(TraceError::InvalidFlags { flags: self.0 }),
        };
        Ok(res)
    }

    pub fn new(kind: OpType, outcome: Outcome) -> Self {
        let kbits = match kind {
            OpType::JmpDirectUncond   => Self::JMP_FLAG,
            OpType::JmpIndirectUncond => Self::JMP_FLAG | Self::IND_FLAG,
            OpType::JmpDirectCond     => Self::BRN_FLAG,
            OpType::JmpIndirectCond   => Self::BRN_FLAG | Self::IND_FLAG,
            OpType::CallDirect        => Self::CALL_FLAG,
            OpType::CallIndirect      => Self::CALL_FLAG | Self::IND_FLAG,
            OpType::Return            => Self::RET_FLAG | Self::IND_FLAG,
            OpType::Other             => 0,
        };
        let tbits = if outcome.is_taken() { Self::TAKEN_FLAG } else { 0 };
        Self(kbits | tbits)
    }
}


/// A record of branch execution.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BranchRecord {
    /// The program counter value for this branch
    pub pc: u64,

    /// The target address evaluated for this branch
    pub tgt: u64,

    /// The type/kind of branch
    pub kind: OpType,

    /// The outcome evaluated for this branch
    pub outcome: Outcome,
}
impl BranchRecord {
    pub fn new(pc: u64, tgt: u64, kind: OpType, outcome: Outcome) -> Self {
        Self { pc, tgt, kind, outcome }
    }

    /// Returns 'true' if this is a conditional instruction.
    pub fn is_conditional(&self) -> bool {
        self.kind.is_conditional()
    }

    /// Returns 'true' if the target lies behind the branch.
    pub fn is_backward(&self) -> bool {
        self.tgt < self.pc
    }

    pub fn flags(&self) -> BranchFlags {
        BranchFlags::new(self.kind, self.outcome)
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flags_roundtrip_every_kind() {
        let kinds = [
            OpType::JmpDirectUncond, OpType::JmpIndirectUncond,
            OpType::JmpDirectCond, OpType::JmpIndirectCond,
            OpType::CallDirect, OpType::CallIndirect,
            OpType::Return, OpType::Other,
        ];
        for kind in kinds {
            for outcome in [Outcome::N, Outcome::T] {
                let flags = BranchFlags::new(kind, outcome);
                assert_eq!(flags.kind().ok(), Some(kind));
                assert_eq!(flags.is_taken(), outcome.is_taken());
            }
        }
    }

    #[test]
    fn invalid_flags_are_rejected() {
        let flags = BranchFlags(BranchFlags::BRN_FLAG | BranchFlags::CALL_FLAG);
        assert!(flags.kind().is_err());
        assert!(BranchFlags(BranchFlags::IND_FLAG).kind().is_err());
    }

    #[test]
    fn only_conditional_kinds_are_predicted() {
        assert!(OpType::JmpDirectCond.is_conditional());
        assert!(OpType::JmpIndirectCond.is_conditional());
        assert!(!OpType::Return.is_conditional());
        assert!(!OpType::Other.is_control_flow());
        assert!(OpType::Return.is_indirect());
        assert!(!OpType::CallDirect.is_indirect());
        assert_eq!(!Outcome::T, Outcome::N);
        assert!(bool::from(Outcome::T));
    }
}
