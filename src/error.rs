use thiserror::Error;

/// Reasons a single decode call can fail.
///
/// Both kinds are fatal only to the call that produced them. A caller walking
/// a code region typically treats `TruncatedInstruction` as the end of
/// disassemblable bytes and `IllegalOpcode` as data it can skip over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer ends before the format or addressing modes say it should.
    #[error("truncated instruction at {address:#06x}: need {needed} bytes, have {available}")]
    TruncatedInstruction {
        address: u64,
        needed: usize,
        available: usize,
    },

    /// Reserved or undefined bit pattern.
    #[error("illegal opcode {word:#06x} at {address:#06x}")]
    IllegalOpcode { address: u64, word: u16 },
}

impl DecodeError {
    pub fn address(&self) -> u64 {
        match self {
            Self::TruncatedInstruction { address, .. } => *address,
            Self::IllegalOpcode { address, .. } => *address,
        }
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
