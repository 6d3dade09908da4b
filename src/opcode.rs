use crate::condition::Condition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // single operand
    Rrc,
    Swpb,
    Rra,
    Sxt,
    Push,
    Call,
    Reti,

    Jump(Condition),

    // double operand
    Mov,
    Add,
    Addc,
    Subc,
    Sub,
    Cmp,
    Dadd,
    Bit,
    Bic,
    Bis,
    Xor,
    And,

    // MSP430X
    Calla,
    Pushm,
    Popm,
    Mova,
    Cmpa,
    Adda,
    Suba,
    Rrcm,
    Rram,
    Rlam,
    Rrum,
}

/// Encoding families, one per top-level decode path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    SingleOperand,
    Jump,
    DoubleOperand,
    /// PUSHM/POPM.
    Multiple,
    /// MSP430X address instructions in `0x0000..=0x0fff`, and CALLA.
    Address,
}

/// Bits 9:7 of a `0x1000..=0x13ff` word. Slot 6 is RETI only for `0x1300`
/// and slot 7 is CALLA territory.
pub(crate) const SINGLE_OPERAND: [Opcode; 7] = [
    Opcode::Rrc,
    Opcode::Swpb,
    Opcode::Rra,
    Opcode::Sxt,
    Opcode::Push,
    Opcode::Call,
    Opcode::Reti,
];

/// Top nibble minus 4.
pub(crate) const DOUBLE_OPERAND: [Opcode; 12] = [
    Opcode::Mov,
    Opcode::Add,
    Opcode::Addc,
    Opcode::Subc,
    Opcode::Sub,
    Opcode::Cmp,
    Opcode::Dadd,
    Opcode::Bit,
    Opcode::Bic,
    Opcode::Bis,
    Opcode::Xor,
    Opcode::And,
];

/// Bits 9:8 of RRxM.
pub(crate) const MULTI_BIT_SHIFT: [Opcode; 4] =
    [Opcode::Rrcm, Opcode::Rram, Opcode::Rlam, Opcode::Rrum];

/// Bits 5:4 of the immediate and register forms of the address arithmetic.
pub(crate) const ADDRESS_ARITHMETIC: [Opcode; 4] =
    [Opcode::Mova, Opcode::Cmpa, Opcode::Adda, Opcode::Suba];

impl Opcode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Rrc => "rrc",
            Self::Swpb => "swpb",
            Self::Rra => "rra",
            Self::Sxt => "sxt",
            Self::Push => "push",
            Self::Call => "call",
            Self::Reti => "reti",
            Self::Jump(cond) => cond.mnemonic(),
            Self::Mov => "mov",
            Self::Add => "add",
            Self::Addc => "addc",
            Self::Subc => "subc",
            Self::Sub => "sub",
            Self::Cmp => "cmp",
            Self::Dadd => "dadd",
            Self::Bit => "bit",
            Self::Bic => "bic",
            Self::Bis => "bis",
            Self::Xor => "xor",
            Self::And => "and",
            Self::Calla => "calla",
            Self::Pushm => "pushm",
            Self::Popm => "popm",
            Self::Mova => "mova",
            Self::Cmpa => "cmpa",
            Self::Adda => "adda",
            Self::Suba => "suba",
            Self::Rrcm => "rrcm",
            Self::Rram => "rram",
            Self::Rlam => "rlam",
            Self::Rrum => "rrum",
        }
    }

    pub fn format(&self) -> Format {
        match self {
            Self::Rrc | Self::Swpb | Self::Rra | Self::Sxt | Self::Push | Self::Call | Self::Reti => {
                Format::SingleOperand
            }
            Self::Jump(_) => Format::Jump,
            Self::Mov
            | Self::Add
            | Self::Addc
            | Self::Subc
            | Self::Sub
            | Self::Cmp
            | Self::Dadd
            | Self::Bit
            | Self::Bic
            | Self::Bis
            | Self::Xor
            | Self::And => Format::DoubleOperand,
            Self::Pushm | Self::Popm => Format::Multiple,
            Self::Calla
            | Self::Mova
            | Self::Cmpa
            | Self::Adda
            | Self::Suba
            | Self::Rrcm
            | Self::Rram
            | Self::Rlam
            | Self::Rrum => Format::Address,
        }
    }

    /// Writes its result back to the destination (or, for single-operand
    /// instructions, to the operand).
    pub fn writes_destination(&self) -> bool {
        !matches!(
            self,
            Self::Cmp
                | Self::Bit
                | Self::Cmpa
                | Self::Push
                | Self::Call
                | Self::Calla
                | Self::Reti
                | Self::Jump(_)
                | Self::Pushm
        )
    }
}

/// Conventional names for common encodings of core instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emulated {
    Adc,
    Br,
    Bra,
    Clr,
    Clrc,
    Clrn,
    Clrz,
    Dadc,
    Dec,
    Decd,
    Dint,
    Eint,
    Inc,
    Incd,
    Inv,
    Nop,
    Pop,
    Ret,
    Reta,
    Rla,
    Rlc,
    Sbc,
    Setc,
    Setn,
    Setz,
    Tst,
}

/// Which of the underlying instruction's operands an emulated mnemonic shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmulatedOperand {
    None,
    Source,
    Destination,
}

impl Emulated {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Adc => "adc",
            Self::Br => "br",
            Self::Bra => "bra",
            Self::Clr => "clr",
            Self::Clrc => "clrc",
            Self::Clrn => "clrn",
            Self::Clrz => "clrz",
            Self::Dadc => "dadc",
            Self::Dec => "dec",
            Self::Decd => "decd",
            Self::Dint => "dint",
            Self::Eint => "eint",
            Self::Inc => "inc",
            Self::Incd => "incd",
            Self::Inv => "inv",
            Self::Nop => "nop",
            Self::Pop => "pop",
            Self::Ret => "ret",
            Self::Reta => "reta",
            Self::Rla => "rla",
            Self::Rlc => "rlc",
            Self::Sbc => "sbc",
            Self::Setc => "setc",
            Self::Setn => "setn",
            Self::Setz => "setz",
            Self::Tst => "tst",
        }
    }

    pub fn operand(&self) -> EmulatedOperand {
        match self {
            Self::Clrc
            | Self::Clrn
            | Self::Clrz
            | Self::Dint
            | Self::Eint
            | Self::Nop
            | Self::Ret
            | Self::Reta
            | Self::Setc
            | Self::Setn
            | Self::Setz => EmulatedOperand::None,
            Self::Br | Self::Bra => EmulatedOperand::Source,
            Self::Adc
            | Self::Clr
            | Self::Dadc
            | Self::Dec
            | Self::Decd
            | Self::Inc
            | Self::Incd
            | Self::Inv
            | Self::Pop
            | Self::Rla
            | Self::Rlc
            | Self::Sbc
            | Self::Tst => EmulatedOperand::Destination,
        }
    }

    /// Mnemonics that never take a width suffix.
    pub fn is_widthless(&self) -> bool {
        matches!(
            self,
            Self::Br
                | Self::Bra
                | Self::Clrc
                | Self::Clrn
                | Self::Clrz
                | Self::Dint
                | Self::Eint
                | Self::Nop
                | Self::Ret
                | Self::Reta
                | Self::Setc
                | Self::Setn
                | Self::Setz
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_follow_encoding_order() {
        assert_eq!(SINGLE_OPERAND[(0x1280u16 >> 7 & 0x7) as usize], Opcode::Call);
        assert_eq!(DOUBLE_OPERAND[(0x9000u16 >> 12) as usize - 4], Opcode::Cmp);
        assert_eq!(DOUBLE_OPERAND[11], Opcode::And);
        assert_eq!(MULTI_BIT_SHIFT[3].mnemonic(), "rrum");
        assert_eq!(ADDRESS_ARITHMETIC[2], Opcode::Adda);
    }

    #[test]
    fn formats() {
        assert_eq!(Opcode::Reti.format(), Format::SingleOperand);
        assert_eq!(Opcode::Jump(Condition::Always).format(), Format::Jump);
        assert_eq!(Opcode::Jump(Condition::Carry).mnemonic(), "jhs");
        assert_eq!(Opcode::Popm.format(), Format::Multiple);
        assert_eq!(Opcode::Calla.format(), Format::Address);
        assert!(!Opcode::Cmp.writes_destination());
        assert!(Opcode::Bic.writes_destination());
    }

    #[test]
    fn emulated_operands() {
        assert_eq!(Emulated::Br.operand(), EmulatedOperand::Source);
        assert_eq!(Emulated::Pop.operand(), EmulatedOperand::Destination);
        assert_eq!(Emulated::Ret.operand(), EmulatedOperand::None);
        assert!(Emulated::Setc.is_widthless());
        assert!(!Emulated::Clr.is_widthless());
    }
}
