use std::borrow::Cow;
use std::convert::TryFrom;
use std::fmt;

/// The sixteen MSP430 core registers, numbered the way the instruction
/// encoding numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Register {
    Pc,
    Sp,
    Sr,
    Cg,
    R4,
    R5,
    R6,
    R7,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

pub const ALL_REGISTERS: [Register; 16] = [
    Register::Pc,
    Register::Sp,
    Register::Sr,
    Register::Cg,
    Register::R4,
    Register::R5,
    Register::R6,
    Register::R7,
    Register::R8,
    Register::R9,
    Register::R10,
    Register::R11,
    Register::R12,
    Register::R13,
    Register::R14,
    Register::R15,
];

impl Register {
    /// Register named by a 4-bit encoding field. Bits above the low nibble
    /// are ignored.
    pub fn from_field(field: u8) -> Register {
        ALL_REGISTERS[(field & 0xf) as usize]
    }

    pub fn name(&self) -> Cow<'static, str> {
        match self {
            Self::Pc => "pc".into(),
            Self::Sp => "sp".into(),
            Self::Sr => "sr".into(),
            Self::Cg => "cg".into(),
            _ => format!("r{}", self.id()).into(),
        }
    }

    pub fn id(&self) -> u32 {
        *self as u32
    }

    /// Storage size in bytes as seen by the host.
    pub fn size(&self) -> usize {
        2
    }

    /// True for R4-R15, the registers with no special hardware role.
    pub fn is_general_purpose(&self) -> bool {
        self.id() >= 4
    }
}

impl TryFrom<u32> for Register {
    type Error = ();

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        match id {
            0..=15 => Ok(ALL_REGISTERS[id as usize]),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_numbering() {
        for (i, reg) in ALL_REGISTERS.iter().enumerate() {
            assert_eq!(reg.id(), i as u32);
            assert_eq!(Register::try_from(i as u32), Ok(*reg));
            assert_eq!(Register::from_field(i as u8), *reg);
        }
        assert!(Register::try_from(16).is_err());
    }

    #[test]
    fn names() {
        assert_eq!(Register::Pc.name(), "pc");
        assert_eq!(Register::Sp.name(), "sp");
        assert_eq!(Register::Sr.name(), "sr");
        assert_eq!(Register::Cg.name(), "cg");
        assert_eq!(Register::R12.to_string(), "r12");
        assert!(!Register::Cg.is_general_purpose());
        assert!(Register::R4.is_general_purpose());
    }
}
