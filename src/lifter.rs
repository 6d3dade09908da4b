//! Instruction semantics as IL.
//!
//! Operands that are read more than once are copied into temporaries first,
//! the result is computed into a temporary, flags are set from those
//! temporaries and only then is the destination written. Auto-increment
//! side effects come last.

use crate::condition::{condition_to_expression, Condition};
use crate::flag::{Flag, FlagOp, ALL_FLAGS};
use crate::instruction::{Instruction, Repeat};
use crate::llil::{Expr, Lifter, Op};
use crate::opcode::{Emulated, Format, Opcode};
use crate::operand::{Operand, Width};
use crate::register::Register;

use log::debug;

/// Lifter switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiftOptions {
    /// Lift `mov #imm, sp` as a nop. Startup code re-seeds the stack this way
    /// and hosts that track stack offsets lose them across it.
    pub skip_stack_reseed: bool,
}

/// Append the IL for `inst` to `il`.
pub fn lift(inst: &Instruction, il: &mut Lifter) {
    lift_with(inst, il, LiftOptions::default())
}

pub fn lift_with(inst: &Instruction, il: &mut Lifter, options: LiftOptions) {
    il.set_current_address(inst.address());
    let mut emitter = Emitter::new(inst, il, options);

    match inst.extension() {
        Some(ext) if ext.is_repeated() || ext.zero_carry => {
            emitter.repeated(ext.repeat, ext.zero_carry)
        }
        _ => emitter.instruction(),
    }
}

struct Emitter<'a> {
    inst: &'a Instruction,
    il: &'a mut Lifter,
    options: LiftOptions,
    address_width: Width,
}

impl<'a> Emitter<'a> {
    fn new(inst: &'a Instruction, il: &'a mut Lifter, options: LiftOptions) -> Self {
        let address_width = if inst.is_extended()
            || inst.width() == Width::Address
            || inst.format() == Format::Address
        {
            Width::Address
        } else {
            Width::Word
        };
        Emitter {
            inst,
            il,
            options,
            address_width,
        }
    }

    fn emit(&mut self, op: Op) {
        self.il.append(op);
    }

    fn unimplemented(&mut self, reason: &str) {
        debug!(
            "{:#07x}: `{}` lifted as unimplemented: {}",
            self.inst.address(),
            self.inst,
            reason
        );
        self.emit(Op::Unimplemented);
    }

    /// Literal counts unroll; register counts become a counted loop.
    fn repeated(&mut self, repeat: Repeat, zero_carry: bool) {
        match repeat {
            Repeat::Count(count) => {
                for _ in 0..count {
                    if zero_carry {
                        self.il.append(self.il.set_flag(Flag::C, self.il.bool(false)));
                    }
                    self.instruction();
                }
            }
            Repeat::Register(register) => {
                let w = Width::Word;
                let counter = self.il.new_temp();
                let count = self.il.add(
                    w,
                    self.il.and(w, self.il.reg(w, register), self.il.const_int(w, 0xf)),
                    self.il.const_int(w, 1),
                );
                self.il.append(self.il.set_temp(w, counter, count));

                let body = self.il.new_label();
                let done = self.il.new_label();
                self.il.mark_label(body);
                if zero_carry {
                    self.il.append(self.il.set_flag(Flag::C, self.il.bool(false)));
                }
                self.instruction();

                let next = self.il.sub(w, self.il.temp(w, counter), self.il.const_int(w, 1));
                self.il.append(self.il.set_temp(w, counter, next));
                let more = self.il.cmp_ne(w, self.il.temp(w, counter), self.il.const_int(w, 0));
                self.il.append(self.il.if_expr(more, body, done));
                self.il.mark_label(done);
            }
        }
    }

    fn instruction(&mut self) {
        let inst = self.inst;

        if inst.opcode().writes_destination() {
            let written = match inst.format() {
                Format::SingleOperand => inst.source(),
                _ => inst.destination(),
            };
            if let Some(Operand::Immediate(_) | Operand::Constant(_)) = written {
                return self.unimplemented("destination is not writable");
            }
        }

        match inst.emulated() {
            Some(Emulated::Ret) => return self.ret(Width::Word),
            Some(Emulated::Reta) => return self.ret(Width::Address),
            Some(Emulated::Nop) => return self.emit(Op::Nop),
            Some(Emulated::Clrc) => return self.set_flag(Flag::C, false),
            Some(Emulated::Clrz) => return self.set_flag(Flag::Z, false),
            Some(Emulated::Clrn) => return self.set_flag(Flag::N, false),
            Some(Emulated::Setc) => return self.set_flag(Flag::C, true),
            Some(Emulated::Setz) => return self.set_flag(Flag::Z, true),
            Some(Emulated::Setn) => return self.set_flag(Flag::N, true),
            _ => {}
        }

        match inst.opcode() {
            Opcode::Jump(condition) => self.jump(condition),

            Opcode::Mov | Opcode::Mova => self.mov(),
            Opcode::Add | Opcode::Adda => self.arithmetic(FlagOp::Add, true),
            Opcode::Addc => self.arithmetic(FlagOp::Addc, true),
            Opcode::Sub | Opcode::Suba => self.arithmetic(FlagOp::Sub, true),
            Opcode::Subc => self.arithmetic(FlagOp::Subc, true),
            Opcode::Cmp | Opcode::Cmpa => self.arithmetic(FlagOp::Sub, false),
            Opcode::And => self.arithmetic(FlagOp::And, true),
            Opcode::Bit => self.arithmetic(FlagOp::And, false),
            Opcode::Xor => self.arithmetic(FlagOp::Xor, true),
            Opcode::Bic | Opcode::Bis => self.bit_set_clear(),
            Opcode::Dadd => self.unimplemented("decimal arithmetic"),

            Opcode::Rrc => self.shift(FlagOp::Rrc(1)),
            Opcode::Rra => self.shift(FlagOp::Rra(1)),
            Opcode::Swpb => self.swpb(),
            Opcode::Sxt => self.sxt(),
            Opcode::Push => self.push_operand(),
            Opcode::Call | Opcode::Calla => self.call(),
            Opcode::Reti => self.reti(),

            Opcode::Pushm => self.pushm(),
            Opcode::Popm => self.popm(),
            Opcode::Rrcm | Opcode::Rram | Opcode::Rlam | Opcode::Rrum => self.multi_bit_shift(),
        }
    }

    fn set_flag(&mut self, flag: Flag, value: bool) {
        self.il.append(self.il.set_flag(flag, self.il.bool(value)));
    }

    /// Copy `expr` into a temporary unless reading it twice is free.
    fn snapshot(&mut self, width: Width, expr: Expr) -> Expr {
        if expr.is_pure_leaf() {
            return expr;
        }
        self.save_temp(width, expr)
    }

    fn save_temp(&mut self, width: Width, expr: Expr) -> Expr {
        let index = self.il.new_temp();
        self.il.append(self.il.set_temp(width, index, expr));
        self.il.temp(width, index)
    }

    fn code_pointer(&self, address: u64) -> Expr {
        let width = if address > 0xffff {
            Width::Address
        } else {
            Width::Word
        };
        self.il.const_ptr(width, address)
    }

    fn memory_address(&self, operand: &Operand) -> Option<Expr> {
        let aw = self.address_width;
        let il = &*self.il;
        match *operand {
            Operand::RegisterIndirect(register)
            | Operand::RegisterIndirectAutoIncrement { register, .. } => Some(il.reg(aw, register)),
            Operand::Indexed { register, offset } => Some(il.add(
                aw,
                il.reg(aw, register),
                il.const_int(aw, offset as i64 as u64),
            )),
            Operand::Absolute(_) | Operand::Symbolic { .. } => {
                operand.memory_address().map(|a| il.const_ptr(aw, a))
            }
            Operand::RegisterDirect(_) | Operand::Immediate(_) | Operand::Constant(_) => None,
        }
    }

    fn read(&self, operand: &Operand, width: Width) -> Expr {
        let il = &*self.il;
        match operand {
            // PC reads as the address of the following word
            Operand::RegisterDirect(Register::Pc) => {
                il.const_ptr(width, self.inst.address().wrapping_add(2))
            }
            Operand::RegisterDirect(Register::Cg) => il.const_int(width, 0),
            Operand::RegisterDirect(Register::Sr) => self.status_register(width),
            Operand::RegisterDirect(register) => il.reg(width, *register),
            Operand::Immediate(_) | Operand::Constant(_) => {
                il.const_int(width, operand.value(width).unwrap_or_default())
            }
            _ => match self.memory_address(operand) {
                Some(address) => il.load(width, address),
                None => il.const_int(width, 0),
            },
        }
    }

    /// SR with its C, Z, N and V bits taken from the live flags.
    fn status_register(&self, width: Width) -> Expr {
        let il = &*self.il;
        let status_mask = ALL_FLAGS.iter().fold(0u64, |mask, flag| mask | flag.sr_mask());
        let rest = il.and(width, il.reg(width, Register::Sr), il.const_int(width, !status_mask));
        ALL_FLAGS.iter().fold(rest, |value, &flag| {
            let bit = il.lsl(
                width,
                il.bool_to_int(width, il.flag(flag)),
                il.const_int(width, flag.id() as u64),
            );
            il.or(width, value, bit)
        })
    }

    fn write(&mut self, operand: &Operand, width: Width, value: Expr) {
        match operand {
            Operand::RegisterDirect(Register::Pc) => self.branch_to(value),
            Operand::RegisterDirect(Register::Cg) => self.emit(Op::Nop),
            Operand::RegisterDirect(register) => {
                let value = match width {
                    Width::Byte => self.il.zx(Width::Word, value),
                    _ => value,
                };
                let reg_width = if width == Width::Address {
                    Width::Address
                } else {
                    Width::Word
                };
                self.il.append(self.il.set_reg(reg_width, *register, value));
                if *register == Register::Sr {
                    self.flags_from_sr();
                }
            }
            Operand::Immediate(_) | Operand::Constant(_) => {
                self.unimplemented("destination is not writable")
            }
            _ => match self.memory_address(operand) {
                Some(address) => self.il.append(self.il.store(width, address, value)),
                None => self.unimplemented("no address for destination"),
            },
        }
    }

    fn flags_from_sr(&mut self) {
        let w = Width::Word;
        for flag in ALL_FLAGS {
            let bit = self.il.and(w, self.il.reg(w, Register::Sr), self.il.const_int(w, flag.sr_mask()));
            let value = self.il.cmp_ne(w, bit, self.il.const_int(w, 0));
            self.il.append(self.il.set_flag(flag, value));
        }
    }

    fn post_increment(&mut self, operand: Option<&Operand>) {
        if let Some(Operand::RegisterIndirectAutoIncrement { register, step }) = operand {
            self.add_to_register(*register, *step as i64);
        }
    }

    fn add_to_register(&mut self, register: Register, amount: i64) {
        let w = if amount.abs() == 4 {
            Width::Address
        } else {
            Width::Word
        };
        let value = if amount < 0 {
            self.il.sub(w, self.il.reg(w, register), self.il.const_int(w, amount.unsigned_abs()))
        } else {
            self.il.add(w, self.il.reg(w, register), self.il.const_int(w, amount as u64))
        };
        self.il.append(self.il.set_reg(w, register, value));
    }

    /// `goto` when the target is a known label, `jump` otherwise.
    fn branch_to(&mut self, target: Expr) {
        if let Some(label) = target.constant().and_then(|a| self.il.label_for_address(a)) {
            return self.emit(Op::Goto(label));
        }
        self.il.append(self.il.jump(target));
    }

    fn jump(&mut self, condition: Condition) {
        let target = match self.inst.jump_target() {
            Some(target) => target,
            None => return self.unimplemented("jump without target"),
        };
        if condition.is_unconditional() {
            return self.branch_to(self.code_pointer(target));
        }

        let cond = condition_to_expression(self.il, condition);
        let known_true = self.il.label_for_address(target);
        let known_false = self.il.label_for_address(self.inst.next_address());
        let t = known_true.unwrap_or_else(|| self.il.new_label());
        let f = known_false.unwrap_or_else(|| self.il.new_label());

        self.il.append(self.il.if_expr(cond, t, f));
        if known_true.is_none() {
            self.il.mark_label(t);
            self.il.append(self.il.jump(self.code_pointer(target)));
        }
        if known_false.is_none() {
            self.il.mark_label(f);
        }
    }

    fn operands(&self) -> Option<(&'a Operand, &'a Operand)> {
        Some((self.inst.source()?, self.inst.destination()?))
    }

    fn mov(&mut self) {
        let (src, dst) = match self.operands() {
            Some(ops) => ops,
            None => return self.unimplemented("missing operand"),
        };
        let width = self.inst.width();

        if self.options.skip_stack_reseed
            && matches!(src, Operand::Immediate(_))
            && dst.is_register(Register::Sp)
        {
            return self.emit(Op::Nop);
        }

        if dst.is_register(Register::Pc) {
            // br @rN+ increments before control leaves
            let target = match src {
                Operand::Immediate(address) => self.code_pointer(*address as u64),
                Operand::RegisterIndirectAutoIncrement { .. } => {
                    let target = self.read(src, width);
                    self.save_temp(width, target)
                }
                _ => self.read(src, width),
            };
            self.post_increment(Some(src));
            return self.branch_to(target);
        }

        let value = self.read(src, width);
        self.write(dst, width, value);
        self.post_increment(Some(src));
    }

    fn arithmetic(&mut self, op: FlagOp, store: bool) {
        let (src, dst) = match self.operands() {
            Some(ops) => ops,
            None => return self.unimplemented("missing operand"),
        };
        let width = self.inst.width();

        let b = self.read(src, width);
        let b = self.snapshot(width, b);
        let a = self.read(dst, width);
        let a = self.snapshot(width, a);
        let carry = self.il.flag(Flag::C);

        let il = &*self.il;
        let value = match op {
            FlagOp::Add => il.add(width, a.clone(), b.clone()),
            FlagOp::Addc => il.adc(width, a.clone(), b.clone(), carry.clone()),
            FlagOp::Sub => il.sub(width, a.clone(), b.clone()),
            FlagOp::Subc => il.adc(width, a.clone(), il.not(width, b.clone()), carry.clone()),
            FlagOp::And => il.and(width, a.clone(), b.clone()),
            FlagOp::Xor => il.xor(width, a.clone(), b.clone()),
            _ => return self.unimplemented("not a two-operand flag rule"),
        };
        let result = self.save_temp(width, value);

        for (flag, value) in op.flag_exprs(self.il, width, &a, &b, &carry, &result) {
            self.il.append(self.il.set_flag(flag, value));
        }
        if store {
            self.write(dst, width, result);
        }
        self.post_increment(Some(src));
    }

    fn bit_set_clear(&mut self) {
        let (src, dst) = match self.operands() {
            Some(ops) => ops,
            None => return self.unimplemented("missing operand"),
        };
        let width = self.inst.width();

        let mask = self.read(src, width);
        let current = self.read(dst, width);
        let value = match self.inst.opcode() {
            Opcode::Bic => self.il.and(width, current, self.il.not(width, mask)),
            _ => self.il.or(width, current, mask),
        };
        self.write(dst, width, value);
        self.post_increment(Some(src));
    }

    /// Single-bit RRC and RRA; the operand is both source and destination.
    fn shift(&mut self, op: FlagOp) {
        let operand = match self.inst.source() {
            Some(operand) => operand,
            None => return self.unimplemented("missing operand"),
        };
        let width = self.inst.width();

        let a = self.read(operand, width);
        let a = self.snapshot(width, a);
        let carry = self.il.flag(Flag::C);
        let one = self.il.const_int(width, 1);
        let value = match op {
            FlagOp::Rrc(_) => self.il.rrc(width, a.clone(), carry.clone()),
            _ => self.il.asr(width, a.clone(), one),
        };
        let result = self.save_temp(width, value);

        for (flag, value) in op.flag_exprs(self.il, width, &a, &a, &carry, &result) {
            self.il.append(self.il.set_flag(flag, value));
        }
        self.write(operand, width, result);
        self.post_increment(Some(operand));
    }

    fn swpb(&mut self) {
        let operand = match self.inst.source() {
            Some(operand) => operand,
            None => return self.unimplemented("missing operand"),
        };
        let width = self.inst.width();
        let w = Width::Word;

        let value = self.read(operand, width);
        let il = &*self.il;
        let swapped = match width {
            Width::Address => il.zx(
                Width::Address,
                il.rol(w, il.low_part(w, value), il.const_int(w, 8)),
            ),
            _ => il.rol(w, value, il.const_int(w, 8)),
        };
        self.write(operand, width, swapped);
        self.post_increment(Some(operand));
    }

    fn sxt(&mut self) {
        let operand = match self.inst.source() {
            Some(operand) => operand,
            None => return self.unimplemented("missing operand"),
        };
        let width = self.inst.width();

        let a = self.read(operand, width);
        let a = self.snapshot(width, a);
        let value = self.il.sx(width, self.il.low_part(Width::Byte, a.clone()));
        let result = self.save_temp(width, value);

        let carry = self.il.flag(Flag::C);
        for (flag, value) in FlagOp::Sxt.flag_exprs(self.il, width, &a, &a, &carry, &result) {
            self.il.append(self.il.set_flag(flag, value));
        }
        self.write(operand, width, result);
        self.post_increment(Some(operand));
    }

    fn stack_step(width: Width) -> i64 {
        match width {
            Width::Address => 4,
            _ => 2,
        }
    }

    /// SP -= 2 (4 for address width), then store.
    fn push(&mut self, width: Width, value: Expr) {
        self.add_to_register(Register::Sp, -Self::stack_step(width));
        let sp = self.il.reg(self.stack_width(width), Register::Sp);
        self.il.append(self.il.store(width, sp, value));
    }

    /// Load from SP into a temporary, then SP += 2 (4 for address width).
    fn pop(&mut self, width: Width) -> Expr {
        let sp = self.il.reg(self.stack_width(width), Register::Sp);
        let value = self.il.load(width, sp);
        let value = self.save_temp(width, value);
        self.add_to_register(Register::Sp, Self::stack_step(width));
        value
    }

    fn stack_width(&self, width: Width) -> Width {
        if width == Width::Address {
            Width::Address
        } else {
            self.address_width
        }
    }

    fn push_operand(&mut self) {
        let operand = match self.inst.source() {
            Some(operand) => operand,
            None => return self.unimplemented("missing operand"),
        };
        let width = self.inst.width();

        // read before SP moves, `push sp` pushes the old value
        let value = self.read(operand, width);
        let value = match value.constant() {
            Some(_) => value,
            None => self.save_temp(width, value),
        };
        self.push(width, value);
        self.post_increment(Some(operand));
    }

    fn call(&mut self) {
        let operand = match self.inst.source() {
            Some(operand) => operand,
            None => return self.unimplemented("missing operand"),
        };
        let width = self.inst.width();

        let target = match operand {
            Operand::RegisterIndirectAutoIncrement { register, step } => {
                let saved = self.save_temp(self.address_width, self.il.reg(self.address_width, *register));
                self.add_to_register(*register, *step as i64);
                self.il.load(width, saved)
            }
            Operand::Immediate(address) => self.code_pointer(*address as u64),
            _ => self.read(operand, width),
        };
        self.il.append(self.il.call(target));
    }

    fn ret(&mut self, width: Width) {
        let target = self.pop(width);
        self.il.append(self.il.ret(target));
    }

    fn reti(&mut self) {
        let sr = self.pop(Width::Word);
        self.il.append(self.il.set_reg(Width::Word, Register::Sr, sr));
        self.flags_from_sr();
        self.ret(Width::Word);
    }

    fn register_range(&self) -> Option<(u32, u32)> {
        let (count, highest) = match self.operands()? {
            (Operand::Constant(count), Operand::RegisterDirect(highest)) => (*count as u32, *highest),
            _ => return None,
        };
        let lowest = highest.id().checked_sub(count.checked_sub(1)?)?;
        Some((lowest, highest.id()))
    }

    fn pushm(&mut self) {
        let (lowest, highest) = match self.register_range() {
            Some(range) => range,
            None => return self.unimplemented("bad register range"),
        };
        let width = self.inst.width();
        for id in (lowest..=highest).rev() {
            let register = Register::from_field(id as u8);
            let value = self.il.reg(width, register);
            self.push(width, value);
        }
    }

    fn popm(&mut self) {
        let (lowest, highest) = match self.register_range() {
            Some(range) => range,
            None => return self.unimplemented("bad register range"),
        };
        let width = self.inst.width();
        for id in lowest..=highest {
            let register = Register::from_field(id as u8);
            let sp = self.il.reg(self.stack_width(width), Register::Sp);
            let value = self.il.load(width, sp);
            self.il.append(self.il.set_reg(width, register, value));
            self.add_to_register(Register::Sp, Self::stack_step(width));
        }
    }

    fn multi_bit_shift(&mut self) {
        let (count, operand) = match self.operands() {
            Some((Operand::Constant(count), operand)) => (*count as u8, operand),
            _ => return self.unimplemented("missing operand"),
        };
        let width = self.inst.width();
        let bits = width.bits() as u64;
        let n = count as u64;

        let a = self.read(operand, width);
        let a = self.snapshot(width, a);
        let carry = self.il.flag(Flag::C);
        let il = &*self.il;
        let shift = il.const_int(width, n);
        let (op, value) = match self.inst.opcode() {
            Opcode::Rram => (FlagOp::Rra(count), il.asr(width, a.clone(), shift)),
            Opcode::Rlam => (FlagOp::Rla(count), il.lsl(width, a.clone(), shift)),
            Opcode::Rrum => (FlagOp::Rru(count), il.lsr(width, a.clone(), shift)),
            // rotate through carry by n: a >> n | c << (bits - n) | a << (bits - n + 1)
            _ => (
                FlagOp::Rrc(count),
                il.or(
                    width,
                    il.or(
                        width,
                        il.lsr(width, a.clone(), shift),
                        il.lsl(
                            width,
                            il.bool_to_int(width, carry.clone()),
                            il.const_int(width, bits - n),
                        ),
                    ),
                    il.lsl(width, a.clone(), il.const_int(width, bits - n + 1)),
                ),
            ),
        };
        let result = self.save_temp(width, value);

        for (flag, value) in op.flag_exprs(self.il, width, &a, &a, &carry, &result) {
            self.il.append(self.il.set_flag(flag, value));
        }
        self.write(operand, width, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::decode;

    fn lift_words(words: &[u16], address: u64) -> Vec<Op> {
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        let inst = decode(&bytes, address).unwrap();
        let mut il = Lifter::new(address);
        lift(&inst, &mut il);
        il.into_ops()
    }

    #[test]
    fn mov_register_is_a_single_set() {
        let ops = lift_words(&[0x4405], 0x4400);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].to_string(), "r5.w = r4.w");
    }

    #[test]
    fn byte_write_to_register_zero_extends() {
        // mov.b @r4, r5
        let ops = lift_words(&[0x4465], 0);
        assert_eq!(ops[0].to_string(), "r5.w = ZeroExtend.w([r4.w].b)");
    }

    #[test]
    fn cmp_sets_flags_without_storing() {
        // cmp #5, r4 (#5 is an immediate)
        let ops = lift_words(&[0x9034, 0x0005], 0);
        assert!(ops
            .iter()
            .all(|op| !matches!(op, Op::SetReg { .. } | Op::Store { .. })));
        let flags: Vec<Flag> = ops
            .iter()
            .filter_map(|op| match op {
                Op::SetFlag { flag, .. } => Some(*flag),
                _ => None,
            })
            .collect();
        assert_eq!(flags, vec![Flag::C, Flag::Z, Flag::N, Flag::V]);
    }

    #[test]
    fn auto_increment_comes_last() {
        // add @r4+, r5
        let ops = lift_words(&[0x5435], 0);
        assert_eq!(ops.last().unwrap().to_string(), "r4.w = Add.w(r4.w, 0x2)");
        // mov.b @r4+, r5 steps by one
        let ops = lift_words(&[0x4475], 0);
        assert_eq!(ops.last().unwrap().to_string(), "r4.w = Add.w(r4.w, 0x1)");
    }

    #[test]
    fn unwritable_destination_is_unimplemented() {
        // rrc #1
        let ops = lift_words(&[0x1013], 0);
        assert_eq!(ops, vec![Op::Unimplemented]);
    }

    #[test]
    fn dadd_is_unimplemented() {
        let ops = lift_words(&[0xa405], 0);
        assert_eq!(ops, vec![Op::Unimplemented]);
    }

    #[test]
    fn stack_reseed_option() {
        let bytes: Vec<u8> = [0x4031u16, 0x4400].iter().flat_map(|w| w.to_le_bytes()).collect();
        let inst = decode(&bytes, 0x4400).unwrap();

        let mut il = Lifter::new(0x4400);
        lift(&inst, &mut il);
        assert_eq!(il.ops()[0].to_string(), "sp.w = 0x4400");

        let mut il = Lifter::new(0x4400);
        lift_with(
            &inst,
            &mut il,
            LiftOptions {
                skip_stack_reseed: true,
            },
        );
        assert_eq!(il.ops(), &[Op::Nop]);
    }

    #[test]
    fn repeated_rra_unrolls() {
        // rpt #3 { rrax.w r5 }
        let ops = lift_words(&[0x1842, 0x1105], 0);
        let writes = ops
            .iter()
            .filter(|op| matches!(op, Op::SetReg { reg: Register::R5, .. }))
            .count();
        assert_eq!(writes, 3);
    }

    #[test]
    fn register_repeat_is_a_loop() {
        // rpt r9 { rlax.w r5 } with zero carry
        let ops = lift_words(&[0x19c9, 0x5505], 0);
        assert!(matches!(ops[0], Op::SetTemp { .. }));
        assert!(matches!(ops[1], Op::Label(_)));
        assert!(matches!(ops[2], Op::SetFlag { flag: Flag::C, value: Expr::Bool(false) }));
        assert!(matches!(ops[ops.len() - 2], Op::If { .. }));
        assert!(matches!(ops[ops.len() - 1], Op::Label(_)));
    }
}
