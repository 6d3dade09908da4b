//! Instruction decoding.
//!
//! [`Decoder::decode`] turns the bytes at an address into one [`Instruction`].
//! The first word selects the family; the number of extension words is worked
//! out from the mode fields before any of them is read, so a short buffer
//! fails as a whole instead of yielding a partial instruction.

use crate::condition::Condition;
use crate::cursor::Cursor;
use crate::error::{DecodeError, Result};
use crate::opcode::{
    Emulated, EmulatedOperand, Format, Opcode, ADDRESS_ARITHMETIC, DOUBLE_OPERAND, MULTI_BIT_SHIFT,
    SINGLE_OPERAND,
};
use crate::operand::{
    extension_words_for, resolve, AddressingMode, Operand, ResolveOptions, Width,
};
use crate::register::Register;

use log::trace;
use std::fmt;

/// Instruction set the decoder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variant {
    /// The original 16-bit CPU.
    Msp430,
    /// The 20-bit CPUX: address instructions, PUSHM/POPM, CALLA and the
    /// extension prefix word.
    #[default]
    Msp430X,
}

/// Iteration count of an extended register-mode instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Repeat {
    /// Fixed count, 1-16.
    Count(u8),
    /// Bits 3:0 of the register plus one.
    Register(Register),
}

/// Decoded MSP430X prefix word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extension {
    pub repeat: Repeat,
    /// Carry is forced to zero before each iteration.
    pub zero_carry: bool,
}

impl Extension {
    pub fn is_repeated(&self) -> bool {
        self.repeat != Repeat::Count(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    address: u64,
    opcode: Opcode,
    emulated: Option<Emulated>,
    width: Width,
    source: Option<Operand>,
    destination: Option<Operand>,
    jump_offset: Option<i16>,
    extension: Option<Extension>,
    length: usize,
}

impl Instruction {
    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn emulated(&self) -> Option<Emulated> {
        self.emulated
    }

    pub fn format(&self) -> Format {
        self.opcode.format()
    }

    pub fn width(&self) -> Width {
        self.width
    }

    /// The source operand, which is also the only operand of single-operand
    /// instructions.
    pub fn source(&self) -> Option<&Operand> {
        self.source.as_ref()
    }

    pub fn destination(&self) -> Option<&Operand> {
        self.destination.as_ref()
    }

    /// Signed word displacement of a jump.
    pub fn jump_offset(&self) -> Option<i16> {
        self.jump_offset
    }

    /// Absolute jump target: the address after the jump plus twice the
    /// displacement, wrapping inside the 16-bit space (20-bit above it).
    pub fn jump_target(&self) -> Option<u64> {
        let offset = self.jump_offset? as i64;
        let mask = if self.address > 0xffff { 0xfffff } else { 0xffff };
        Some((self.address as i64 + 2 + 2 * offset) as u64 & mask)
    }

    pub fn condition(&self) -> Option<Condition> {
        match self.opcode {
            Opcode::Jump(cond) => Some(cond),
            _ => None,
        }
    }

    pub fn extension(&self) -> Option<&Extension> {
        self.extension.as_ref()
    }

    pub fn is_extended(&self) -> bool {
        self.extension.is_some()
    }

    /// Total length in bytes, prefix and extension words included.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Address of the next sequential instruction.
    pub fn next_address(&self) -> u64 {
        self.address.wrapping_add(self.length as u64)
    }

    /// Mnemonic as displayed: emulated name when there is one, `x` for
    /// extended instructions and a width suffix where one is meaningful.
    pub fn mnemonic(&self) -> String {
        let mut text = String::from(match self.emulated {
            Some(emulated) => emulated.mnemonic(),
            None => self.opcode.mnemonic(),
        });
        if self.is_extended() {
            text.push('x');
        }

        let widthless = self.emulated.map_or(false, |e| e.is_widthless());
        let suffix = match (self.width, self.opcode) {
            _ if widthless => None,
            (_, Opcode::Jump(_)) => None,
            (Width::Byte, _) => Some(self.width.suffix()),
            (_, Opcode::Pushm | Opcode::Popm)
            | (_, Opcode::Rrcm | Opcode::Rram | Opcode::Rlam | Opcode::Rrum) => {
                Some(self.width.suffix())
            }
            (Width::Address, _) if self.is_extended() => Some(self.width.suffix()),
            _ => None,
        };
        if let Some(suffix) = suffix {
            text.push('.');
            text.push_str(suffix);
        }
        text
    }

    /// Operands shown for this instruction, in display order.
    pub fn displayed_operands(&self) -> Vec<&Operand> {
        let shown = match self.emulated.map(|e| e.operand()) {
            Some(EmulatedOperand::None) => vec![],
            Some(EmulatedOperand::Source) => vec![self.source.as_ref()],
            Some(EmulatedOperand::Destination) => vec![self.destination.as_ref()],
            None => vec![self.source.as_ref(), self.destination.as_ref()],
        };
        shown.into_iter().flatten().collect()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.mnemonic();
        if let Some(target) = self.jump_target() {
            return write!(f, "{} {:#x}", mnemonic, target);
        }
        let operands = self.displayed_operands();
        if operands.is_empty() {
            return f.write_str(&mnemonic);
        }
        write!(f, "{}", mnemonic)?;
        for (i, operand) in operands.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}", sep, operand)?;
        }
        Ok(())
    }
}

/// Fields of an MSP430X prefix word.
#[derive(Debug, Clone, Copy)]
struct Prefix(u16);

impl Prefix {
    fn address_low(&self) -> bool {
        self.0 & 0x40 != 0
    }

    fn source_bits(&self) -> u8 {
        (self.0 >> 7 & 0xf) as u8
    }

    fn destination_bits(&self) -> u8 {
        (self.0 & 0xf) as u8
    }

    fn register_form(&self) -> Extension {
        let repeat = if self.0 & 0x80 != 0 {
            Repeat::Register(Register::from_field(self.0 as u8))
        } else {
            Repeat::Count((self.0 & 0xf) as u8 + 1)
        };
        Extension {
            repeat,
            zero_carry: self.0 & 0x100 != 0,
        }
    }

    fn memory_form(&self) -> Extension {
        Extension {
            repeat: Repeat::Count(1),
            zero_carry: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    variant: Variant,
}

impl Decoder {
    pub fn new(variant: Variant) -> Self {
        Decoder { variant }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    fn extended(&self) -> bool {
        self.variant == Variant::Msp430X
    }

    pub fn decode(&self, data: &[u8], address: u64) -> Result<Instruction> {
        let mut cursor = Cursor::new(data, address);
        let word = cursor.read_u16()?;

        let mut inst = match word {
            0x0000..=0x0fff if self.extended() => self.decode_address(word, &mut cursor)?,
            0x1000..=0x13ff => self.decode_single(word, &mut cursor, None)?,
            0x1400..=0x17ff if self.extended() => self.decode_multiple(word, &cursor)?,
            0x1800..=0x1fff if self.extended() => self.decode_extended(word, &mut cursor)?,
            0x2000..=0x3fff => decode_jump(word, &cursor),
            0x4000..=0xffff => self.decode_double(word, &mut cursor, None)?,
            _ => return Err(illegal(&cursor, word)),
        };
        inst.length = cursor.position();
        inst.emulated = recognise_emulated(&inst);

        trace!("{:#07x}: {} ({} bytes)", address, inst, inst.length);

        Ok(inst)
    }

    fn decode_extended(&self, prefix: u16, cursor: &mut Cursor<'_>) -> Result<Instruction> {
        let prefix = Prefix(prefix);
        let word = cursor.read_u16()?;
        match word {
            0x1000..=0x12ff => self.decode_single(word, cursor, Some(prefix)),
            0x4000..=0xffff => self.decode_double(word, cursor, Some(prefix)),
            _ => Err(illegal(cursor, word)),
        }
    }

    fn decode_single(
        &self,
        word: u16,
        cursor: &mut Cursor<'_>,
        prefix: Option<Prefix>,
    ) -> Result<Instruction> {
        let slot = (word >> 7 & 0x7) as usize;
        let opcode = match slot {
            6 if word == 0x1300 => {
                return Ok(Instruction::new(cursor, Opcode::Reti, Width::Word));
            }
            6 | 7 if word >= 0x1340 && self.extended() && prefix.is_none() => {
                return self.decode_calla(word, cursor);
            }
            5 if prefix.is_some() => return Err(illegal(cursor, word)),
            0..=5 => SINGLE_OPERAND[slot],
            _ => return Err(illegal(cursor, word)),
        };

        let byte = word & 0x40 != 0;
        if byte && matches!(opcode, Opcode::Swpb | Opcode::Sxt | Opcode::Call) {
            return Err(illegal(cursor, word));
        }
        let width = match prefix {
            None => Width::from_byte_flag(byte),
            Some(p) => {
                extended_width(opcode, p.address_low(), byte).ok_or_else(|| illegal(cursor, word))?
            }
        };

        let mode = AddressingMode::from_bits(word >> 4);
        let register = (word & 0xf) as u8;
        let extension = prefix.map(|p| {
            if mode == AddressingMode::Register {
                p.register_form()
            } else {
                p.memory_form()
            }
        });
        let options = ResolveOptions {
            prefer_absolute: opcode == Opcode::Call,
            destination: false,
            extension_bits: match (prefix, mode) {
                (Some(p), m) if m != AddressingMode::Register => Some(p.destination_bits()),
                _ => None,
            },
        };

        let words = extension_words_for(mode, Register::from_field(register), options);
        cursor.ensure(words * 2)?;
        let (operand, _) = resolve(mode, register, width, cursor, options)?;

        let mut inst = Instruction::new(cursor, opcode, width);
        inst.source = Some(operand);
        inst.extension = extension;
        Ok(inst)
    }

    fn decode_double(
        &self,
        word: u16,
        cursor: &mut Cursor<'_>,
        prefix: Option<Prefix>,
    ) -> Result<Instruction> {
        let opcode = DOUBLE_OPERAND[(word >> 12) as usize - 4];
        let byte = word & 0x40 != 0;
        let width = match prefix {
            None => Width::from_byte_flag(byte),
            Some(p) => {
                extended_width(opcode, p.address_low(), byte).ok_or_else(|| illegal(cursor, word))?
            }
        };

        let src_mode = AddressingMode::from_bits(word >> 4);
        let src_reg = (word >> 8 & 0xf) as u8;
        let dst_mode = AddressingMode::from_bits(word >> 7 & 0x1);
        let dst_reg = (word & 0xf) as u8;
        let register_form =
            src_mode == AddressingMode::Register && dst_mode == AddressingMode::Register;

        let extension = prefix.map(|p| {
            if register_form {
                p.register_form()
            } else {
                p.memory_form()
            }
        });
        let memory_prefix = prefix.filter(|_| !register_form);

        let src_options = ResolveOptions {
            prefer_absolute: opcode == Opcode::Mov
                && dst_mode == AddressingMode::Register
                && Register::from_field(dst_reg) == Register::Pc,
            destination: false,
            extension_bits: memory_prefix.map(|p| p.source_bits()),
        };
        let dst_options = ResolveOptions {
            prefer_absolute: false,
            destination: true,
            extension_bits: memory_prefix.map(|p| p.destination_bits()),
        };

        let words = extension_words_for(src_mode, Register::from_field(src_reg), src_options)
            + extension_words_for(dst_mode, Register::from_field(dst_reg), dst_options);
        cursor.ensure(words * 2)?;

        let (source, _) = resolve(src_mode, src_reg, width, cursor, src_options)?;
        let (destination, _) = resolve(dst_mode, dst_reg, width, cursor, dst_options)?;

        let mut inst = Instruction::new(cursor, opcode, width);
        inst.source = Some(source);
        inst.destination = Some(destination);
        inst.extension = extension;
        Ok(inst)
    }

    /// PUSHM/POPM. The destination is always the highest register of the
    /// range, although POPM encodes the lowest.
    fn decode_multiple(&self, word: u16, cursor: &Cursor<'_>) -> Result<Instruction> {
        let count = (word >> 4 & 0xf) as u8 + 1;
        let field = (word & 0xf) as u8;
        let (opcode, width) = match word >> 8 & 0x3 {
            0 => (Opcode::Pushm, Width::Address),
            1 => (Opcode::Pushm, Width::Word),
            2 => (Opcode::Popm, Width::Address),
            _ => (Opcode::Popm, Width::Word),
        };
        let highest = match opcode {
            Opcode::Pushm if field + 1 >= count => field,
            Opcode::Popm if field + count - 1 <= 15 => field + count - 1,
            _ => return Err(illegal(cursor, word)),
        };

        let mut inst = Instruction::new(cursor, opcode, width);
        inst.source = Some(Operand::Constant(count as i32));
        inst.destination = Some(Operand::RegisterDirect(Register::from_field(highest)));
        Ok(inst)
    }

    fn decode_calla(&self, word: u16, cursor: &mut Cursor<'_>) -> Result<Instruction> {
        let field = (word & 0xf) as u8;
        let register = Register::from_field(field);
        let operand = match word >> 4 & 0xf {
            0x4 => Operand::RegisterDirect(register),
            0x5 => indexed(register, None, cursor, true)?,
            0x6 => Operand::RegisterIndirect(register),
            0x7 => Operand::RegisterIndirectAutoIncrement { register, step: 4 },
            0x8 => Operand::Absolute(address20(field, cursor)?),
            0x9 => indexed(Register::Pc, Some(field), cursor, true)?,
            0xb => Operand::Immediate(address20(field, cursor)?),
            _ => return Err(illegal(cursor, word)),
        };

        let mut inst = Instruction::new(cursor, Opcode::Calla, Width::Address);
        inst.source = Some(operand);
        Ok(inst)
    }

    fn decode_address(&self, word: u16, cursor: &mut Cursor<'_>) -> Result<Instruction> {
        let src_field = (word >> 8 & 0xf) as u8;
        let dst_field = (word & 0xf) as u8;
        let src = Register::from_field(src_field);
        let dst = Register::from_field(dst_field);

        let (opcode, width, source, destination) = match word >> 4 & 0xf {
            0x0 => (Opcode::Mova, Width::Address, Operand::RegisterIndirect(src), Operand::RegisterDirect(dst)),
            0x1 => (
                Opcode::Mova,
                Width::Address,
                Operand::RegisterIndirectAutoIncrement { register: src, step: 4 },
                Operand::RegisterDirect(dst),
            ),
            0x2 => (
                Opcode::Mova,
                Width::Address,
                Operand::Absolute(address20(src_field, cursor)?),
                Operand::RegisterDirect(dst),
            ),
            0x3 => (
                Opcode::Mova,
                Width::Address,
                indexed(src, None, cursor, false)?,
                Operand::RegisterDirect(dst),
            ),
            nibble @ (0x4 | 0x5) => {
                let count = (word >> 10 & 0x3) as i32 + 1;
                let width = if nibble == 0x4 { Width::Address } else { Width::Word };
                (
                    MULTI_BIT_SHIFT[(word >> 8 & 0x3) as usize],
                    width,
                    Operand::Constant(count),
                    Operand::RegisterDirect(dst),
                )
            }
            0x6 => (
                Opcode::Mova,
                Width::Address,
                Operand::RegisterDirect(src),
                Operand::Absolute(address20(dst_field, cursor)?),
            ),
            0x7 => (
                Opcode::Mova,
                Width::Address,
                Operand::RegisterDirect(src),
                indexed(dst, None, cursor, false)?,
            ),
            nibble @ 0x8..=0xb => (
                ADDRESS_ARITHMETIC[(nibble & 0x3) as usize],
                Width::Address,
                Operand::Immediate(address20(src_field, cursor)?),
                Operand::RegisterDirect(dst),
            ),
            nibble => (
                ADDRESS_ARITHMETIC[(nibble & 0x3) as usize],
                Width::Address,
                Operand::RegisterDirect(src),
                Operand::RegisterDirect(dst),
            ),
        };

        let mut inst = Instruction::new(cursor, opcode, width);
        inst.source = Some(source);
        inst.destination = Some(destination);
        Ok(inst)
    }
}

impl Instruction {
    fn new(cursor: &Cursor<'_>, opcode: Opcode, width: Width) -> Self {
        Instruction {
            address: cursor.base_address(),
            opcode,
            emulated: None,
            width,
            source: None,
            destination: None,
            jump_offset: None,
            extension: None,
            length: cursor.position(),
        }
    }
}

/// Decode one instruction with the default (MSP430X) decoder.
pub fn decode(data: &[u8], address: u64) -> Result<Instruction> {
    Decoder::default().decode(data, address)
}

fn decode_jump(word: u16, cursor: &Cursor<'_>) -> Instruction {
    let condition = Condition::from_bits(word >> 10);
    // sign-extend the 10-bit field
    let offset = ((word & 0x3ff) << 6) as i16 >> 6;

    let mut inst = Instruction::new(cursor, Opcode::Jump(condition), Width::Word);
    inst.jump_offset = Some(offset);
    inst
}

fn illegal(cursor: &Cursor<'_>, word: u16) -> DecodeError {
    DecodeError::IllegalOpcode {
        address: cursor.base_address(),
        word,
    }
}

/// Width of an extended instruction from the prefix A/L bit and the
/// instruction B/W bit.
fn extended_width(opcode: Opcode, address_low: bool, byte: bool) -> Option<Width> {
    match (address_low, byte) {
        (true, false) => Some(Width::Word),
        (true, true) => Some(Width::Byte),
        (false, true) => Some(Width::Address),
        (false, false) if matches!(opcode, Opcode::Swpb | Opcode::Sxt) => Some(Width::Address),
        (false, false) => None,
    }
}

/// 20-bit value: `high` supplies bits 19:16, the next word bits 15:0.
fn address20(high: u8, cursor: &mut Cursor<'_>) -> Result<u32> {
    let low = cursor.read_u16()?;
    Ok(((high as u32 & 0xf) << 16) | low as u32)
}

/// `x(Rn)` with a 16-bit offset, or a 20-bit one when `high` is given.
/// Indexing off PC yields a symbolic operand.
fn indexed(
    register: Register,
    high: Option<u8>,
    cursor: &mut Cursor<'_>,
    prefer_absolute: bool,
) -> Result<Operand> {
    let low = cursor.read_u16()?;
    let offset = match high {
        Some(high) => {
            let value = ((high as u32 & 0xf) << 16) | low as u32;
            ((value << 12) as i32) >> 12
        }
        None => low as i16 as i32,
    };
    if register != Register::Pc {
        return Ok(Operand::Indexed { register, offset });
    }

    let pc = cursor.address() & 0xfffff;
    let target = ((pc as i64 + offset as i64) as u64 & 0xfffff) as u32;
    if prefer_absolute {
        Ok(Operand::Absolute(target))
    } else {
        Ok(Operand::Symbolic { offset, target })
    }
}

fn same_location(a: &Operand, b: &Operand) -> bool {
    match (a, b) {
        (Operand::Symbolic { .. }, Operand::Symbolic { .. }) => {
            a.memory_address() == b.memory_address()
        }
        (Operand::RegisterDirect(_), _) | (Operand::Indexed { .. }, _) | (Operand::Absolute(_), _) => {
            a == b
        }
        _ => false,
    }
}

fn recognise_emulated(inst: &Instruction) -> Option<Emulated> {
    let (src, dst) = (inst.source.as_ref()?, inst.destination.as_ref()?);
    let width = inst.width;
    let constant = src.value(width);
    let classic = !inst.is_extended();
    let pop_source = matches!(
        src,
        Operand::RegisterIndirectAutoIncrement {
            register: Register::Sp,
            ..
        }
    );
    let to_pc = dst.is_register(Register::Pc);
    let to_sr = dst.is_register(Register::Sr);

    let emulated = match inst.opcode {
        Opcode::Mov if classic && width == Width::Word && pop_source && to_pc => Emulated::Ret,
        Opcode::Mov if classic && width == Width::Word && to_pc => Emulated::Br,
        Opcode::Mov if pop_source => Emulated::Pop,
        Opcode::Mov if classic && constant == Some(0) && dst.is_register(Register::Cg) => {
            Emulated::Nop
        }
        Opcode::Mov if constant == Some(0) => Emulated::Clr,
        Opcode::Mova if pop_source && to_pc => Emulated::Reta,
        Opcode::Mova if to_pc => Emulated::Bra,
        Opcode::Add if constant == Some(1) => Emulated::Inc,
        Opcode::Add if constant == Some(2) => Emulated::Incd,
        Opcode::Add if same_location(src, dst) => Emulated::Rla,
        Opcode::Addc if constant == Some(0) => Emulated::Adc,
        Opcode::Addc if same_location(src, dst) => Emulated::Rlc,
        Opcode::Sub if constant == Some(1) => Emulated::Dec,
        Opcode::Sub if constant == Some(2) => Emulated::Decd,
        Opcode::Subc if constant == Some(0) => Emulated::Sbc,
        Opcode::Dadd if constant == Some(0) => Emulated::Dadc,
        Opcode::Cmp if constant == Some(0) => Emulated::Tst,
        Opcode::Xor if constant == Some(width.mask()) => Emulated::Inv,
        Opcode::Bic if classic && to_sr => match constant? {
            1 => Emulated::Clrc,
            2 => Emulated::Clrz,
            4 => Emulated::Clrn,
            8 => Emulated::Dint,
            _ => return None,
        },
        Opcode::Bis if classic && to_sr => match constant? {
            1 => Emulated::Setc,
            2 => Emulated::Setz,
            4 => Emulated::Setn,
            8 => Emulated::Eint,
            _ => return None,
        },
        _ => return None,
    };
    Some(emulated)
}
