use crate::flag::Flag;
use crate::llil::{Expr, Lifter};

/// The eight conditions of the jump format, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// JNE / JNZ
    NotZero,
    /// JEQ / JZ
    Zero,
    /// JNC / JLO
    NoCarry,
    /// JC / JHS
    Carry,
    Negative,
    GreaterEqual,
    Less,
    Always,
}

const CONDITIONS: [Condition; 8] = [
    Condition::NotZero,
    Condition::Zero,
    Condition::NoCarry,
    Condition::Carry,
    Condition::Negative,
    Condition::GreaterEqual,
    Condition::Less,
    Condition::Always,
];

/// Flag conditions a host understands natively.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagCondition {
    LLFC_E,
    LLFC_NE,
    LLFC_ULT,
    LLFC_UGE,
    LLFC_SLT,
    LLFC_SGE,
    LLFC_NEG,
    LLFC_POS,
}

impl FlagCondition {
    pub fn flags_required(&self) -> Vec<Flag> {
        match self {
            Self::LLFC_UGE | Self::LLFC_ULT => vec![Flag::C],
            Self::LLFC_SGE | Self::LLFC_SLT => vec![Flag::N, Flag::V],
            Self::LLFC_E | Self::LLFC_NE => vec![Flag::Z],
            Self::LLFC_NEG | Self::LLFC_POS => vec![Flag::N],
        }
    }
}

impl Condition {
    /// Condition for the 3-bit field in bits 12:10 of a jump.
    pub fn from_bits(bits: u16) -> Condition {
        CONDITIONS[(bits & 0x7) as usize]
    }

    pub fn bits(&self) -> u16 {
        *self as u16
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::NotZero => "jnz",
            Self::Zero => "jz",
            Self::NoCarry => "jlo",
            Self::Carry => "jhs",
            Self::Negative => "jn",
            Self::GreaterEqual => "jge",
            Self::Less => "jl",
            Self::Always => "jmp",
        }
    }

    pub fn is_unconditional(&self) -> bool {
        *self == Self::Always
    }

    /// The host-native flag condition this jump corresponds to, if any.
    pub fn flag_condition(&self) -> Option<FlagCondition> {
        match self {
            Self::NotZero => Some(FlagCondition::LLFC_NE),
            Self::Zero => Some(FlagCondition::LLFC_E),
            Self::NoCarry => Some(FlagCondition::LLFC_ULT),
            Self::Carry => Some(FlagCondition::LLFC_UGE),
            Self::Negative => Some(FlagCondition::LLFC_NEG),
            Self::GreaterEqual => Some(FlagCondition::LLFC_SGE),
            Self::Less => Some(FlagCondition::LLFC_SLT),
            Self::Always => None,
        }
    }

    pub fn flags_required(&self) -> Vec<Flag> {
        self.flag_condition()
            .map(|cond| cond.flags_required())
            .unwrap_or_default()
    }
}

/// Boolean IL expression over the four flags that is true when the jump is
/// taken.
pub fn condition_to_expression(il: &Lifter, condition: Condition) -> Expr {
    match condition {
        Condition::NotZero => il.bool_not(il.flag(Flag::Z)),
        Condition::Zero => il.flag(Flag::Z),
        Condition::NoCarry => il.bool_not(il.flag(Flag::C)),
        Condition::Carry => il.flag(Flag::C),
        Condition::Negative => il.flag(Flag::N),
        Condition::GreaterEqual => il.bool_not(il.bool_xor(il.flag(Flag::N), il.flag(Flag::V))),
        Condition::Less => il.bool_xor(il.flag(Flag::N), il.flag(Flag::V)),
        Condition::Always => il.bool(true),
    }
}

/// Evaluate a condition against concrete flag values.
pub fn condition_holds(condition: Condition, c: bool, z: bool, n: bool, v: bool) -> bool {
    match condition {
        Condition::NotZero => !z,
        Condition::Zero => z,
        Condition::NoCarry => !c,
        Condition::Carry => c,
        Condition::Negative => n,
        Condition::GreaterEqual => n == v,
        Condition::Less => n != v,
        Condition::Always => true,
    }
}
