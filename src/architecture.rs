//! The entry points a disassembly host drives: instruction info, text and IL
//! for the bytes at an address, plus register and flag metadata.

use crate::condition::FlagCondition;
use crate::error::DecodeError;
use crate::flag::{Flag, FlagWrite, ALL_FLAGS};
use crate::instruction::{Decoder, Instruction, Variant};
use crate::lifter::{lift_with, LiftOptions};
use crate::llil::Lifter;
use crate::opcode::{Emulated, Opcode};
use crate::operand::Operand;
use crate::register::{Register, ALL_REGISTERS};
use crate::text::{generate_tokens, Token};

use log::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    LittleEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchInfo {
    True(u64),
    False(u64),
    Unconditional(u64),
    Call(u64),
    FunctionReturn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionInfo {
    length: usize,
    branch_delay: bool,
    branches: Vec<BranchInfo>,
}

impl InstructionInfo {
    pub fn new(length: usize, branch_delay: bool) -> Self {
        InstructionInfo {
            length,
            branch_delay,
            branches: Vec::new(),
        }
    }

    pub fn add_branch(&mut self, branch: BranchInfo) {
        self.branches.push(branch);
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn branch_delay(&self) -> bool {
        self.branch_delay
    }

    pub fn branches(&self) -> &[BranchInfo] {
        &self.branches
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallingConvention {
    pub int_arg_registers: Vec<Register>,
    pub return_int_reg: Register,
    pub return_hi_int_reg: Register,
}

/// What a host needs from an architecture plugin.
pub trait Architecture {
    type Register;
    type Flag;
    type FlagWrite;
    type InstructionTextContainer;

    fn endianness(&self) -> Endianness;
    fn address_size(&self) -> usize;
    fn default_integer_size(&self) -> usize;
    fn instruction_alignment(&self) -> usize;
    fn max_instr_len(&self) -> usize;

    fn opcode_display_len(&self) -> usize {
        self.max_instr_len()
    }

    fn instruction_info(&self, data: &[u8], addr: u64) -> Option<InstructionInfo>;
    fn instruction_text(
        &self,
        data: &[u8],
        addr: u64,
    ) -> Option<(usize, Self::InstructionTextContainer)>;
    /// Appends the IL for one instruction. Returns its length and whether
    /// lifting should continue.
    fn instruction_llil(&self, data: &[u8], addr: u64, il: &mut Lifter) -> Option<(usize, bool)>;

    fn flags_required_for_flag_condition(&self, condition: FlagCondition) -> Vec<Self::Flag>;

    fn registers_all(&self) -> Vec<Self::Register>;
    fn registers_full_width(&self) -> Vec<Self::Register>;
    fn registers_global(&self) -> Vec<Self::Register>;
    fn flags(&self) -> Vec<Self::Flag>;
    fn flag_write_types(&self) -> Vec<Self::FlagWrite>;
    fn stack_pointer_reg(&self) -> Option<Self::Register>;
    fn link_reg(&self) -> Option<Self::Register>;

    fn register_from_id(&self, id: u32) -> Option<Self::Register>;
    fn flag_from_id(&self, id: u32) -> Option<Self::Flag>;
    fn flag_write_from_id(&self, id: u32) -> Option<Self::FlagWrite>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Msp430 {
    decoder: Decoder,
    options: LiftOptions,
}

impl Msp430 {
    pub fn new(variant: Variant) -> Self {
        Msp430 {
            decoder: Decoder::new(variant),
            options: LiftOptions::default(),
        }
    }

    pub fn with_options(variant: Variant, options: LiftOptions) -> Self {
        Msp430 {
            decoder: Decoder::new(variant),
            options,
        }
    }

    pub fn variant(&self) -> Variant {
        self.decoder.variant()
    }

    pub fn options(&self) -> LiftOptions {
        self.options
    }

    pub fn calling_convention(&self) -> CallingConvention {
        CallingConvention {
            int_arg_registers: vec![Register::R15, Register::R14, Register::R13, Register::R12],
            return_int_reg: Register::R15,
            return_hi_int_reg: Register::R14,
        }
    }

    fn decode(&self, data: &[u8], addr: u64) -> Option<Instruction> {
        match self.decoder.decode(data, addr) {
            Ok(inst) => Some(inst),
            Err(err @ DecodeError::TruncatedInstruction { .. }) => {
                debug!("{}", err);
                None
            }
            Err(err) => {
                warn!("{}", err);
                None
            }
        }
    }
}

impl Architecture for Msp430 {
    type Register = Register;
    type Flag = Flag;
    type FlagWrite = FlagWrite;
    type InstructionTextContainer = Vec<Token>;

    fn endianness(&self) -> Endianness {
        Endianness::LittleEndian
    }

    fn address_size(&self) -> usize {
        2 // 16 bit
    }

    fn default_integer_size(&self) -> usize {
        2 // 16 bit integers
    }

    fn instruction_alignment(&self) -> usize {
        2
    }

    fn max_instr_len(&self) -> usize {
        match self.variant() {
            Variant::Msp430 => 6,
            // prefix word
            Variant::Msp430X => 8,
        }
    }

    fn instruction_info(&self, data: &[u8], addr: u64) -> Option<InstructionInfo> {
        let inst = self.decode(data, addr)?;
        let mut info = InstructionInfo::new(inst.length(), false);

        if let Some(target) = inst.jump_target() {
            if inst.condition().map_or(false, |c| c.is_unconditional()) {
                info.add_branch(BranchInfo::Unconditional(target));
            } else {
                info.add_branch(BranchInfo::True(target));
                info.add_branch(BranchInfo::False(inst.next_address()));
            }
            return Some(info);
        }

        match (inst.emulated(), inst.opcode()) {
            (Some(Emulated::Br | Emulated::Bra), _) => {
                if let Some(Operand::Immediate(target)) = inst.source() {
                    info.add_branch(BranchInfo::Unconditional(*target as u64));
                }
            }
            (Some(Emulated::Ret | Emulated::Reta), _) | (_, Opcode::Reti) => {
                info.add_branch(BranchInfo::FunctionReturn);
            }
            (_, Opcode::Call | Opcode::Calla) => {
                if let Some(Operand::Immediate(target)) = inst.source() {
                    info.add_branch(BranchInfo::Call(*target as u64));
                }
            }
            _ => {}
        }

        Some(info)
    }

    fn instruction_text(
        &self,
        data: &[u8],
        addr: u64,
    ) -> Option<(usize, Self::InstructionTextContainer)> {
        let inst = self.decode(data, addr)?;
        let tokens = generate_tokens(&inst);
        if tokens.is_empty() {
            None
        } else {
            Some((inst.length(), tokens))
        }
    }

    fn instruction_llil(&self, data: &[u8], addr: u64, il: &mut Lifter) -> Option<(usize, bool)> {
        let inst = self.decode(data, addr)?;
        lift_with(&inst, il, self.options);
        Some((inst.length(), true))
    }

    fn flags_required_for_flag_condition(&self, condition: FlagCondition) -> Vec<Self::Flag> {
        condition.flags_required()
    }

    fn registers_all(&self) -> Vec<Self::Register> {
        ALL_REGISTERS.to_vec()
    }

    fn registers_full_width(&self) -> Vec<Self::Register> {
        ALL_REGISTERS.to_vec()
    }

    fn registers_global(&self) -> Vec<Self::Register> {
        vec![Register::Sr]
    }

    fn flags(&self) -> Vec<Self::Flag> {
        ALL_FLAGS.to_vec()
    }

    fn flag_write_types(&self) -> Vec<Self::FlagWrite> {
        vec![FlagWrite::All, FlagWrite::Cnz]
    }

    fn stack_pointer_reg(&self) -> Option<Self::Register> {
        Some(Register::Sp)
    }

    fn link_reg(&self) -> Option<Self::Register> {
        None
    }

    fn register_from_id(&self, id: u32) -> Option<Self::Register> {
        match id.try_into() {
            Ok(register) => Some(register),
            Err(_) => {
                error!("invalid register id {}", id);
                None
            }
        }
    }

    fn flag_from_id(&self, id: u32) -> Option<Self::Flag> {
        match id.try_into() {
            Ok(flag) => Some(flag),
            Err(_) => {
                error!("invalid flag id {}", id);
                None
            }
        }
    }

    fn flag_write_from_id(&self, id: u32) -> Option<Self::FlagWrite> {
        match id.try_into() {
            Ok(flag_write) => Some(flag_write),
            Err(_) => {
                error!("invalid flag write id {}", id);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(words: &[u16]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn conditional_jump_has_both_edges() {
        let arch = Msp430::default();
        // jnz $+4
        let info = arch.instruction_info(&bytes(&[0x2001]), 0x4400).unwrap();
        assert_eq!(info.len(), 2);
        assert_eq!(
            info.branches(),
            &[BranchInfo::True(0x4404), BranchInfo::False(0x4402)]
        );
    }

    #[test]
    fn jmp_is_unconditional() {
        let arch = Msp430::default();
        let info = arch.instruction_info(&bytes(&[0x3fff]), 0x4400).unwrap();
        assert_eq!(info.branches(), &[BranchInfo::Unconditional(0x4400)]);
    }

    #[test]
    fn calls_and_returns() {
        let arch = Msp430::default();
        let info = arch.instruction_info(&bytes(&[0x12b0, 0x4500]), 0x4400).unwrap();
        assert_eq!(info.len(), 4);
        assert_eq!(info.branches(), &[BranchInfo::Call(0x4500)]);

        // call r5 has no static target
        let info = arch.instruction_info(&bytes(&[0x1285]), 0x4400).unwrap();
        assert!(info.branches().is_empty());

        for word in [0x4130, 0x1300] {
            let info = arch.instruction_info(&bytes(&[word]), 0x4400).unwrap();
            assert_eq!(info.branches(), &[BranchInfo::FunctionReturn]);
        }
    }

    #[test]
    fn br_immediate() {
        let arch = Msp430::default();
        let info = arch.instruction_info(&bytes(&[0x4030, 0x4500]), 0x4400).unwrap();
        assert_eq!(info.branches(), &[BranchInfo::Unconditional(0x4500)]);
    }

    #[test]
    fn undecodable_bytes_are_none() {
        let arch = Msp430::default();
        assert!(arch.instruction_info(&[0x30], 0).is_none());
        assert!(arch.instruction_text(&bytes(&[0x4030]), 0).is_none());
        let mut il = Lifter::new(0);
        assert!(arch.instruction_llil(&[], 0, &mut il).is_none());
        assert!(il.is_empty());
    }

    #[test]
    fn llil_reports_length() {
        let arch = Msp430::default();
        let mut il = Lifter::new(0x4400);
        let res = arch.instruction_llil(&bytes(&[0x5036, 0x0010]), 0x4400, &mut il);
        assert_eq!(res, Some((4, true)));
        assert!(!il.is_empty());
    }

    #[test]
    fn metadata() {
        let arch = Msp430::new(Variant::Msp430);
        assert_eq!(arch.endianness(), Endianness::LittleEndian);
        assert_eq!(arch.max_instr_len(), 6);
        assert_eq!(Msp430::default().max_instr_len(), 8);
        assert_eq!(arch.registers_all().len(), 16);
        assert_eq!(arch.registers_global(), vec![Register::Sr]);
        assert_eq!(arch.stack_pointer_reg(), Some(Register::Sp));
        assert_eq!(arch.link_reg(), None);
        assert_eq!(
            arch.flags_required_for_flag_condition(FlagCondition::LLFC_SGE),
            vec![Flag::N, Flag::V]
        );
    }

    #[test]
    fn ids_round_trip() {
        let arch = Msp430::default();
        for reg in arch.registers_all() {
            assert_eq!(arch.register_from_id(reg.id()), Some(reg));
        }
        for flag in arch.flags() {
            assert_eq!(arch.flag_from_id(flag.id()), Some(flag));
        }
        for write in arch.flag_write_types() {
            assert_eq!(arch.flag_write_from_id(write.id()), Some(write));
        }
        assert_eq!(arch.register_from_id(16), None);
        assert_eq!(arch.flag_from_id(3), None);
        assert_eq!(arch.flag_write_from_id(9), None);
    }

    #[test]
    fn calling_convention() {
        let cc = Msp430::default().calling_convention();
        assert_eq!(cc.int_arg_registers[0], Register::R15);
        assert_eq!(cc.return_int_reg, Register::R15);
        assert_eq!(cc.return_hi_int_reg, Register::R14);
    }
}
