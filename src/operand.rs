//! Addressing-mode resolution.
//!
//! The 2-bit mode field and 4-bit register field of an operand only mean
//! what they say for R4-R15. PC turns indexed and auto-increment modes into
//! symbolic and immediate operands, SR and CG double as constant generators,
//! and SR in indexed mode is absolute addressing.

use crate::cursor::Cursor;
use crate::error::Result;
use crate::register::Register;

use log::trace;
use std::fmt;

/// Operation size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    Byte,
    Word,
    /// 20-bit MSP430X address-word operations.
    Address,
}

impl Width {
    /// Width selected by the B/W bit of a classic instruction.
    pub fn from_byte_flag(byte: bool) -> Width {
        if byte {
            Width::Byte
        } else {
            Width::Word
        }
    }

    pub fn bits(&self) -> u32 {
        match self {
            Width::Byte => 8,
            Width::Word => 16,
            Width::Address => 20,
        }
    }

    pub fn mask(&self) -> u64 {
        (1 << self.bits()) - 1
    }

    pub fn sign_bit(&self) -> u64 {
        1 << (self.bits() - 1)
    }

    /// Mnemonic suffix.
    pub fn suffix(&self) -> &'static str {
        match self {
            Width::Byte => "b",
            Width::Word => "w",
            Width::Address => "a",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    Register,
    Indexed,
    Indirect,
    IndirectAutoIncrement,
}

impl AddressingMode {
    /// Mode for a 2-bit As field (or a 1-bit Ad field).
    pub fn from_bits(bits: u16) -> AddressingMode {
        match bits & 0x3 {
            0 => AddressingMode::Register,
            1 => AddressingMode::Indexed,
            2 => AddressingMode::Indirect,
            _ => AddressingMode::IndirectAutoIncrement,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    RegisterDirect(Register),
    RegisterIndirect(Register),
    RegisterIndirectAutoIncrement { register: Register, step: u8 },
    Indexed { register: Register, offset: i32 },
    Absolute(u32),
    /// PC-relative memory operand. `target` is PC plus `offset`, wrapped to
    /// the address space the instruction runs in.
    Symbolic { offset: i32, target: u32 },
    Immediate(u32),
    /// A value baked into the opcode word: constant-generator values and the
    /// counts of MSP430X multi-bit shifts and PUSHM/POPM.
    Constant(i32),
}

impl Operand {
    pub fn extension_words(&self) -> usize {
        match self {
            Operand::Indexed { .. }
            | Operand::Absolute(_)
            | Operand::Symbolic { .. }
            | Operand::Immediate(_) => 1,
            Operand::RegisterDirect(_)
            | Operand::RegisterIndirect(_)
            | Operand::RegisterIndirectAutoIncrement { .. }
            | Operand::Constant(_) => 0,
        }
    }

    pub fn register(&self) -> Option<Register> {
        match self {
            Operand::RegisterDirect(r)
            | Operand::RegisterIndirect(r)
            | Operand::RegisterIndirectAutoIncrement { register: r, .. }
            | Operand::Indexed { register: r, .. } => Some(*r),
            _ => None,
        }
    }

    pub fn is_register_direct(&self) -> bool {
        matches!(self, Operand::RegisterDirect(_))
    }

    pub fn is_register(&self, register: Register) -> bool {
        *self == Operand::RegisterDirect(register)
    }

    /// Immediate or constant value, truncated to `width`.
    pub fn value(&self, width: Width) -> Option<u64> {
        match self {
            Operand::Immediate(v) => Some(*v as u64 & width.mask()),
            Operand::Constant(v) => Some(*v as i64 as u64 & width.mask()),
            _ => None,
        }
    }

    /// Statically known memory address this operand refers to.
    pub fn memory_address(&self) -> Option<u64> {
        match self {
            Operand::Absolute(a) | Operand::Symbolic { target: a, .. } => Some(*a as u64),
            _ => None,
        }
    }
}

/// Context the decoder passes along with the raw fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Resolve PC-relative memory operands to absolute addresses.
    pub prefer_absolute: bool,
    /// The field is a destination; destinations never use the constant
    /// generator.
    pub destination: bool,
    /// Bits 19:16 from an MSP430X extension word; extension words become
    /// 20-bit values when present.
    pub extension_bits: Option<u8>,
}

/// Extension words an operand with these fields consumes, known before any
/// byte is read.
pub fn extension_words_for(mode: AddressingMode, register: Register, options: ResolveOptions) -> usize {
    match (mode, register) {
        (AddressingMode::Register, _) => 0,
        (AddressingMode::Indexed, Register::Cg) if !options.destination => 0,
        (AddressingMode::Indexed, _) => 1,
        (AddressingMode::IndirectAutoIncrement, Register::Pc) => 1,
        (AddressingMode::Indirect, _) | (AddressingMode::IndirectAutoIncrement, _) => 0,
    }
}

/// Resolve one operand field, consuming its extension word from `cursor`.
///
/// Returns the operand and the number of extension words consumed. Either
/// the whole operand is consumed or nothing is.
pub fn resolve(
    mode: AddressingMode,
    register: u8,
    width: Width,
    cursor: &mut Cursor<'_>,
    options: ResolveOptions,
) -> Result<(Operand, usize)> {
    let register = Register::from_field(register);
    let words = extension_words_for(mode, register, options);
    cursor.ensure(words * 2)?;

    let operand = match (mode, register) {
        (AddressingMode::Register, Register::Cg) if !options.destination => Operand::Constant(0),
        (AddressingMode::Register, r) => Operand::RegisterDirect(r),

        (AddressingMode::Indexed, Register::Cg) if !options.destination => Operand::Constant(1),
        (AddressingMode::Indexed, Register::Sr) => {
            let word = cursor.read_u16()?;
            Operand::Absolute(extend_unsigned(word, options.extension_bits))
        }
        (AddressingMode::Indexed, Register::Pc) => {
            let offset = extend_signed(cursor.read_u16()?, options.extension_bits);
            let pc = cursor.address() & pc_mask(options);
            let target = (pc as i64 + offset as i64) as u64 & pc_mask(options);
            if options.prefer_absolute {
                Operand::Absolute(target as u32)
            } else {
                Operand::Symbolic {
                    offset,
                    target: target as u32,
                }
            }
        }
        (AddressingMode::Indexed, r) => {
            let offset = extend_signed(cursor.read_u16()?, options.extension_bits);
            Operand::Indexed { register: r, offset }
        }

        (AddressingMode::Indirect, Register::Sr) if !options.destination => Operand::Constant(4),
        (AddressingMode::Indirect, Register::Cg) if !options.destination => Operand::Constant(2),
        (AddressingMode::Indirect, r) => Operand::RegisterIndirect(r),

        (AddressingMode::IndirectAutoIncrement, Register::Sr) if !options.destination => {
            Operand::Constant(8)
        }
        (AddressingMode::IndirectAutoIncrement, Register::Cg) if !options.destination => {
            Operand::Constant(-1)
        }
        (AddressingMode::IndirectAutoIncrement, Register::Pc) => {
            let word = cursor.read_u16()?;
            let value = extend_unsigned(word, options.extension_bits) as u64 & width.mask();
            Operand::Immediate(value as u32)
        }
        (AddressingMode::IndirectAutoIncrement, r) => Operand::RegisterIndirectAutoIncrement {
            register: r,
            step: auto_increment_step(r, width),
        },
    };

    debug_assert_eq!(operand.extension_words(), words);
    trace!("resolved {:?}/{} as {}", mode, register, operand);

    Ok((operand, words))
}

/// Amount `@Rn+` advances the register by.
pub fn auto_increment_step(register: Register, width: Width) -> u8 {
    match width {
        Width::Address => 4,
        Width::Byte if register.is_general_purpose() => 1,
        _ => 2,
    }
}

fn pc_mask(options: ResolveOptions) -> u64 {
    if options.extension_bits.is_some() {
        Width::Address.mask()
    } else {
        Width::Word.mask()
    }
}

fn extend_unsigned(word: u16, high: Option<u8>) -> u32 {
    match high {
        Some(bits) => ((bits as u32 & 0xf) << 16) | word as u32,
        None => word as u32,
    }
}

fn extend_signed(word: u16, high: Option<u8>) -> i32 {
    match high {
        Some(_) => {
            let value = extend_unsigned(word, high);
            // sign-extend from bit 19
            ((value << 12) as i32) >> 12
        }
        None => word as i16 as i32,
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::RegisterDirect(r) => write!(f, "{}", r),
            Operand::RegisterIndirect(r) => write!(f, "@{}", r),
            Operand::RegisterIndirectAutoIncrement { register, .. } => write!(f, "@{}+", register),
            Operand::Indexed { register, offset } => {
                if *offset < 0 {
                    write!(f, "-{:#x}({})", -(*offset as i64), register)
                } else {
                    write!(f, "{:#x}({})", offset, register)
                }
            }
            Operand::Absolute(a) => write!(f, "&{:#x}", a),
            Operand::Symbolic { target, .. } => write!(f, "{:#x}", target),
            Operand::Immediate(v) => write!(f, "#{:#x}", v),
            Operand::Constant(v) => write!(f, "#{}", v),
        }
    }
}
