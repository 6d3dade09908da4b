#![allow(dead_code)]

use msp430_lift::flag::Flag;
use msp430_lift::llil::{BinaryOp, CompareOp, Expr, LogicOp, Op, UnaryOp};
use msp430_lift::{decode, lift, Lifter, Register, Width};

use std::collections::HashMap;

pub fn bytes(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

pub fn lift_words(words: &[u16], address: u64) -> Vec<Op> {
    let inst = decode(&bytes(words), address).unwrap();
    let mut il = Lifter::new(address);
    lift(&inst, &mut il);
    il.into_ops()
}

pub fn render(ops: &[Op]) -> Vec<String> {
    ops.iter().map(|op| op.to_string()).collect()
}

/// How a run left the lifted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Jump(u64),
    Call(u64),
    Ret(u64),
    /// Branch to a label that is not in the buffer.
    Label(u32),
    Unimplemented,
}

/// Straight-line interpreter for lifted IL, enough to check what an
/// instruction computes.
#[derive(Debug, Default)]
pub struct Machine {
    pub regs: HashMap<Register, u64>,
    pub flags: HashMap<Flag, bool>,
    pub memory: HashMap<u64, u8>,
    temps: HashMap<u32, u64>,
    pub exit: Option<Exit>,
}

impl Machine {
    pub fn new() -> Self {
        Machine::default()
    }

    pub fn with_regs(regs: &[(Register, u64)]) -> Self {
        let mut m = Machine::new();
        for (reg, value) in regs {
            m.regs.insert(*reg, *value);
        }
        m
    }

    pub fn reg(&self, reg: Register) -> u64 {
        self.regs.get(&reg).copied().unwrap_or(0)
    }

    pub fn flag(&self, flag: Flag) -> bool {
        self.flags.get(&flag).copied().unwrap_or(false)
    }

    pub fn read(&self, address: u64, width: Width) -> u64 {
        let mut value = 0;
        for i in 0..byte_count(width) {
            let byte = self.memory.get(&(address + i)).copied().unwrap_or(0);
            value |= (byte as u64) << (8 * i);
        }
        value & width.mask()
    }

    pub fn write(&mut self, address: u64, width: Width, value: u64) {
        let value = value & width.mask();
        for i in 0..byte_count(width) {
            self.memory.insert(address + i, (value >> (8 * i)) as u8);
        }
    }

    pub fn run(&mut self, ops: &[Op]) {
        let mut pc = 0;
        let mut budget = 10_000;
        while pc < ops.len() && budget > 0 {
            budget -= 1;
            let target = match &ops[pc] {
                Op::SetReg { width, reg, value } => {
                    let v = self.value(value) & width.mask();
                    self.regs.insert(*reg, v);
                    None
                }
                Op::SetTemp {
                    width,
                    index,
                    value,
                } => {
                    let v = self.value(value) & width.mask();
                    self.temps.insert(*index, v);
                    None
                }
                Op::SetFlag { flag, value } => {
                    let v = self.truth(value);
                    self.flags.insert(*flag, v);
                    None
                }
                Op::Store {
                    width,
                    address,
                    value,
                } => {
                    let (a, v) = (self.value(address), self.value(value));
                    self.write(a, *width, v);
                    None
                }
                Op::Jump(t) => return self.leave(Exit::Jump(self.value(t))),
                Op::Call(t) => return self.leave(Exit::Call(self.value(t))),
                Op::Ret(t) => return self.leave(Exit::Ret(self.value(t))),
                Op::Goto(label) => Some(*label),
                Op::If {
                    condition,
                    true_label,
                    false_label,
                } => Some(if self.truth(condition) {
                    *true_label
                } else {
                    *false_label
                }),
                Op::Nop | Op::Label(_) => None,
                Op::Unimplemented => return self.leave(Exit::Unimplemented),
            };

            match target {
                None => pc += 1,
                Some(label) => match ops.iter().position(|op| *op == Op::Label(label)) {
                    Some(position) => pc = position,
                    None => return self.leave(Exit::Label(label.id())),
                },
            }
        }
    }

    fn leave(&mut self, exit: Exit) {
        self.exit = Some(exit);
    }

    pub fn value(&self, expr: &Expr) -> u64 {
        match expr {
            Expr::Reg { width, reg } => self.reg(*reg) & width.mask(),
            Expr::Temp { width, index } => {
                self.temps.get(index).copied().unwrap_or(0) & width.mask()
            }
            Expr::Const { value, .. } | Expr::ConstPtr { value, .. } => *value,
            Expr::Load { width, address } => self.read(self.value(address), *width),
            Expr::Binary {
                op,
                width,
                left,
                right,
            } => {
                let m = width.mask();
                let bits = width.bits() as u64;
                let l = self.value(left) & m;
                let r = self.value(right);
                let v = match op {
                    BinaryOp::Add => l.wrapping_add(r),
                    BinaryOp::Sub => l.wrapping_sub(r),
                    BinaryOp::And => l & r,
                    BinaryOp::Or => l | r,
                    BinaryOp::Xor => l ^ r,
                    BinaryOp::Lsl if r >= 64 => 0,
                    BinaryOp::Lsl => l << r,
                    BinaryOp::Lsr if r >= 64 => 0,
                    BinaryOp::Lsr => l >> r,
                    BinaryOp::Asr => (signed(l, *width) >> r.min(63)) as u64,
                    BinaryOp::Rol => {
                        let r = r % bits;
                        if r == 0 {
                            l
                        } else {
                            (l << r) | (l >> (bits - r))
                        }
                    }
                };
                v & m
            }
            Expr::AddCarry {
                width,
                left,
                right,
                carry,
            } => {
                let c = self.truth(carry) as u64;
                (self.value(left) + self.value(right) + c) & width.mask()
            }
            Expr::RotateRightCarry {
                width,
                value,
                carry,
            } => {
                let c = self.truth(carry) as u64;
                ((self.value(value) >> 1) | (c << (width.bits() - 1))) & width.mask()
            }
            Expr::Unary { op, width, operand } => {
                let m = width.mask();
                let v = self.value(operand);
                match op {
                    UnaryOp::Not => !v & m,
                    UnaryOp::SignExtend => {
                        let from = operand.width().unwrap_or(Width::Byte);
                        let v = v & from.mask();
                        if v & from.sign_bit() != 0 {
                            (v | !from.mask()) & m
                        } else {
                            v
                        }
                    }
                    UnaryOp::ZeroExtend | UnaryOp::LowPart => v & m,
                }
            }
            Expr::BoolToInt { width, value } => self.truth(value) as u64 & width.mask(),
            Expr::Flag(_)
            | Expr::Bool(_)
            | Expr::Compare { .. }
            | Expr::Logic { .. }
            | Expr::BoolNot(_) => self.truth(expr) as u64,
        }
    }

    pub fn truth(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Flag(flag) => self.flag(*flag),
            Expr::Bool(b) => *b,
            Expr::Compare {
                op,
                width,
                left,
                right,
            } => {
                let l = self.value(left) & width.mask();
                let r = self.value(right) & width.mask();
                match op {
                    CompareOp::Equal => l == r,
                    CompareOp::NotEqual => l != r,
                    CompareOp::SignedLessThan => signed(l, *width) < signed(r, *width),
                    CompareOp::UnsignedLessThan => l < r,
                    CompareOp::UnsignedGreaterEqual => l >= r,
                    CompareOp::UnsignedGreaterThan => l > r,
                }
            }
            Expr::Logic { op, left, right } => {
                let (l, r) = (self.truth(left), self.truth(right));
                match op {
                    LogicOp::And => l && r,
                    LogicOp::Or => l || r,
                    LogicOp::Xor => l != r,
                }
            }
            Expr::BoolNot(value) => !self.truth(value),
            _ => self.value(expr) != 0,
        }
    }
}

fn byte_count(width: Width) -> u64 {
    match width {
        Width::Byte => 1,
        Width::Word => 2,
        // 20-bit values occupy two words in memory
        Width::Address => 4,
    }
}

fn signed(value: u64, width: Width) -> i64 {
    let value = value & width.mask();
    if value & width.sign_bit() != 0 {
        value as i64 - (1i64 << width.bits())
    } else {
        value as i64
    }
}
