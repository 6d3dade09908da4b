//! A small low-level IL in the shape hosts such as Binary Ninja consume.
//!
//! Expressions are trees of owned values; operations are appended to a
//! [`Lifter`] buffer that belongs to the caller for the duration of one
//! lifting pass. Every value expression carries its width explicitly, flag
//! and comparison expressions are single-bit booleans.

use crate::flag::Flag;
use crate::operand::Width;
use crate::register::Register;

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(u32);

impl Label {
    pub fn id(&self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    And,
    Or,
    Xor,
    Lsl,
    Lsr,
    Asr,
    Rol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    /// Sign-extend the operand to the expression width.
    SignExtend,
    /// Zero-extend the operand to the expression width.
    ZeroExtend,
    /// Truncate the operand to the expression width.
    LowPart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    SignedLessThan,
    UnsignedLessThan,
    UnsignedGreaterEqual,
    UnsignedGreaterThan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Reg {
        width: Width,
        reg: Register,
    },
    Temp {
        width: Width,
        index: u32,
    },
    Const {
        width: Width,
        value: u64,
    },
    ConstPtr {
        width: Width,
        value: u64,
    },
    Flag(Flag),
    Bool(bool),
    Load {
        width: Width,
        address: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        width: Width,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `left + right + carry`, carry being a boolean.
    AddCarry {
        width: Width,
        left: Box<Expr>,
        right: Box<Expr>,
        carry: Box<Expr>,
    },
    /// Rotate right by one bit through `carry`: the carry enters at the top.
    RotateRightCarry {
        width: Width,
        value: Box<Expr>,
        carry: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        width: Width,
        operand: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        width: Width,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logic {
        op: LogicOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    BoolNot(Box<Expr>),
    BoolToInt {
        width: Width,
        value: Box<Expr>,
    },
}

impl Expr {
    /// Width of a value expression, `None` for booleans.
    pub fn width(&self) -> Option<Width> {
        match self {
            Expr::Reg { width, .. }
            | Expr::Temp { width, .. }
            | Expr::Const { width, .. }
            | Expr::ConstPtr { width, .. }
            | Expr::Load { width, .. }
            | Expr::Binary { width, .. }
            | Expr::AddCarry { width, .. }
            | Expr::RotateRightCarry { width, .. }
            | Expr::Unary { width, .. }
            | Expr::BoolToInt { width, .. } => Some(*width),
            Expr::Flag(_)
            | Expr::Bool(_)
            | Expr::Compare { .. }
            | Expr::Logic { .. }
            | Expr::BoolNot(_) => None,
        }
    }

    /// Constant value, if this is a constant or constant pointer.
    pub fn constant(&self) -> Option<u64> {
        match self {
            Expr::Const { value, .. } | Expr::ConstPtr { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Reading this expression has no side effect and costs nothing to repeat.
    pub fn is_pure_leaf(&self) -> bool {
        matches!(
            self,
            Expr::Reg { .. }
                | Expr::Temp { .. }
                | Expr::Const { .. }
                | Expr::ConstPtr { .. }
                | Expr::Flag(_)
                | Expr::Bool(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    SetReg {
        width: Width,
        reg: Register,
        value: Expr,
    },
    SetTemp {
        width: Width,
        index: u32,
        value: Expr,
    },
    SetFlag {
        flag: Flag,
        value: Expr,
    },
    Store {
        width: Width,
        address: Expr,
        value: Expr,
    },
    Jump(Expr),
    Goto(Label),
    If {
        condition: Expr,
        true_label: Label,
        false_label: Label,
    },
    Call(Expr),
    Ret(Expr),
    Nop,
    Label(Label),
    Unimplemented,
}

/// Caller-owned IL buffer for one lifting pass.
///
/// The host can seed it with labels for addresses it already knows belong to
/// the function being lifted; branches to those addresses become `goto`s,
/// branches elsewhere become `jump`s.
#[derive(Debug, Default)]
pub struct Lifter {
    address: u64,
    ops: Vec<Op>,
    labels: HashMap<u64, Label>,
    next_label: u32,
    next_temp: u32,
}

impl Lifter {
    pub fn new(address: u64) -> Self {
        Lifter {
            address,
            ..Default::default()
        }
    }

    /// Buffer that knows a label for each of `addresses`.
    pub fn with_labels(address: u64, addresses: impl IntoIterator<Item = u64>) -> Self {
        let mut il = Lifter::new(address);
        for addr in addresses {
            let label = il.new_label();
            il.labels.insert(addr, label);
        }
        il
    }

    pub fn current_address(&self) -> u64 {
        self.address
    }

    /// Move to the next instruction. Temporaries are instruction-local, so
    /// their numbering restarts.
    pub fn set_current_address(&mut self, address: u64) {
        self.address = address;
        self.next_temp = 0;
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<Op> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn append(&mut self, op: Op) {
        self.ops.push(op);
    }

    pub fn label_for_address(&self, address: u64) -> Option<Label> {
        self.labels.get(&address).copied()
    }

    pub fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    pub fn mark_label(&mut self, label: Label) {
        self.ops.push(Op::Label(label));
    }

    pub fn new_temp(&mut self) -> u32 {
        let temp = self.next_temp;
        self.next_temp += 1;
        temp
    }

    pub fn reg(&self, width: Width, reg: Register) -> Expr {
        Expr::Reg { width, reg }
    }

    pub fn temp(&self, width: Width, index: u32) -> Expr {
        Expr::Temp { width, index }
    }

    /// Integer constant, truncated to `width`.
    pub fn const_int(&self, width: Width, value: u64) -> Expr {
        Expr::Const {
            width,
            value: value & width.mask(),
        }
    }

    pub fn const_ptr(&self, width: Width, value: u64) -> Expr {
        Expr::ConstPtr {
            width,
            value: value & width.mask(),
        }
    }

    pub fn flag(&self, flag: Flag) -> Expr {
        Expr::Flag(flag)
    }

    pub fn bool(&self, value: bool) -> Expr {
        Expr::Bool(value)
    }

    pub fn load(&self, width: Width, address: Expr) -> Expr {
        Expr::Load {
            width,
            address: Box::new(address),
        }
    }

    fn binary(&self, op: BinaryOp, width: Width, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            width,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn add(&self, width: Width, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Add, width, left, right)
    }

    pub fn sub(&self, width: Width, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Sub, width, left, right)
    }

    pub fn and(&self, width: Width, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::And, width, left, right)
    }

    pub fn or(&self, width: Width, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Or, width, left, right)
    }

    pub fn xor(&self, width: Width, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Xor, width, left, right)
    }

    pub fn lsl(&self, width: Width, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Lsl, width, left, right)
    }

    pub fn lsr(&self, width: Width, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Lsr, width, left, right)
    }

    pub fn asr(&self, width: Width, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Asr, width, left, right)
    }

    pub fn rol(&self, width: Width, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Rol, width, left, right)
    }

    pub fn adc(&self, width: Width, left: Expr, right: Expr, carry: Expr) -> Expr {
        Expr::AddCarry {
            width,
            left: Box::new(left),
            right: Box::new(right),
            carry: Box::new(carry),
        }
    }

    pub fn rrc(&self, width: Width, value: Expr, carry: Expr) -> Expr {
        Expr::RotateRightCarry {
            width,
            value: Box::new(value),
            carry: Box::new(carry),
        }
    }

    fn unary(&self, op: UnaryOp, width: Width, operand: Expr) -> Expr {
        Expr::Unary {
            op,
            width,
            operand: Box::new(operand),
        }
    }

    pub fn not(&self, width: Width, operand: Expr) -> Expr {
        self.unary(UnaryOp::Not, width, operand)
    }

    pub fn sx(&self, width: Width, operand: Expr) -> Expr {
        self.unary(UnaryOp::SignExtend, width, operand)
    }

    pub fn zx(&self, width: Width, operand: Expr) -> Expr {
        self.unary(UnaryOp::ZeroExtend, width, operand)
    }

    pub fn low_part(&self, width: Width, operand: Expr) -> Expr {
        self.unary(UnaryOp::LowPart, width, operand)
    }

    fn compare(&self, op: CompareOp, width: Width, left: Expr, right: Expr) -> Expr {
        Expr::Compare {
            op,
            width,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn cmp_e(&self, width: Width, left: Expr, right: Expr) -> Expr {
        self.compare(CompareOp::Equal, width, left, right)
    }

    pub fn cmp_ne(&self, width: Width, left: Expr, right: Expr) -> Expr {
        self.compare(CompareOp::NotEqual, width, left, right)
    }

    pub fn cmp_slt(&self, width: Width, left: Expr, right: Expr) -> Expr {
        self.compare(CompareOp::SignedLessThan, width, left, right)
    }

    pub fn cmp_ult(&self, width: Width, left: Expr, right: Expr) -> Expr {
        self.compare(CompareOp::UnsignedLessThan, width, left, right)
    }

    pub fn cmp_uge(&self, width: Width, left: Expr, right: Expr) -> Expr {
        self.compare(CompareOp::UnsignedGreaterEqual, width, left, right)
    }

    pub fn cmp_ugt(&self, width: Width, left: Expr, right: Expr) -> Expr {
        self.compare(CompareOp::UnsignedGreaterThan, width, left, right)
    }

    fn logic(&self, op: LogicOp, left: Expr, right: Expr) -> Expr {
        Expr::Logic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn bool_and(&self, left: Expr, right: Expr) -> Expr {
        self.logic(LogicOp::And, left, right)
    }

    pub fn bool_or(&self, left: Expr, right: Expr) -> Expr {
        self.logic(LogicOp::Or, left, right)
    }

    pub fn bool_xor(&self, left: Expr, right: Expr) -> Expr {
        self.logic(LogicOp::Xor, left, right)
    }

    pub fn bool_not(&self, value: Expr) -> Expr {
        Expr::BoolNot(Box::new(value))
    }

    pub fn bool_to_int(&self, width: Width, value: Expr) -> Expr {
        Expr::BoolToInt {
            width,
            value: Box::new(value),
        }
    }

    pub fn set_reg(&self, width: Width, reg: Register, value: Expr) -> Op {
        Op::SetReg { width, reg, value }
    }

    pub fn set_temp(&self, width: Width, index: u32, value: Expr) -> Op {
        Op::SetTemp {
            width,
            index,
            value,
        }
    }

    pub fn set_flag(&self, flag: Flag, value: Expr) -> Op {
        Op::SetFlag { flag, value }
    }

    pub fn store(&self, width: Width, address: Expr, value: Expr) -> Op {
        Op::Store {
            width,
            address,
            value,
        }
    }

    pub fn jump(&self, target: Expr) -> Op {
        Op::Jump(target)
    }

    pub fn if_expr(&self, condition: Expr, true_label: Label, false_label: Label) -> Op {
        Op::If {
            condition,
            true_label,
            false_label,
        }
    }

    pub fn call(&self, target: Expr) -> Op {
        Op::Call(target)
    }

    pub fn ret(&self, target: Expr) -> Op {
        Op::Ret(target)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Reg { width, reg } => write!(f, "{}.{}", reg, width.suffix()),
            Expr::Temp { width, index } => write!(f, "temp{}.{}", index, width.suffix()),
            Expr::Const { value, .. } => write!(f, "{:#x}", value),
            Expr::ConstPtr { value, .. } => write!(f, "&{:#x}", value),
            Expr::Flag(flag) => write!(f, "{}", flag.name()),
            Expr::Bool(value) => write!(f, "{}", value),
            Expr::Load { width, address } => write!(f, "[{}].{}", address, width.suffix()),
            Expr::Binary {
                op,
                width,
                left,
                right,
            } => write!(f, "{:?}.{}({}, {})", op, width.suffix(), left, right),
            Expr::AddCarry {
                width,
                left,
                right,
                carry,
            } => write!(f, "adc.{}({}, {}, {})", width.suffix(), left, right, carry),
            Expr::RotateRightCarry {
                width,
                value,
                carry,
            } => write!(f, "rrc.{}({}, {})", width.suffix(), value, carry),
            Expr::Unary { op, width, operand } => {
                write!(f, "{:?}.{}({})", op, width.suffix(), operand)
            }
            Expr::Compare {
                op,
                width,
                left,
                right,
            } => write!(f, "{:?}.{}({}, {})", op, width.suffix(), left, right),
            Expr::Logic { op, left, right } => write!(f, "{:?}({}, {})", op, left, right),
            Expr::BoolNot(value) => write!(f, "!{}", value),
            Expr::BoolToInt { width, value } => write!(f, "int.{}({})", width.suffix(), value),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::SetReg { width, reg, value } => write!(f, "{}.{} = {}", reg, width.suffix(), value),
            Op::SetTemp {
                width,
                index,
                value,
            } => write!(f, "temp{}.{} = {}", index, width.suffix(), value),
            Op::SetFlag { flag, value } => write!(f, "{} = {}", flag.name(), value),
            Op::Store {
                width,
                address,
                value,
            } => write!(f, "[{}].{} = {}", address, width.suffix(), value),
            Op::Jump(target) => write!(f, "jump({})", target),
            Op::Goto(label) => write!(f, "goto {}", label.0),
            Op::If {
                condition,
                true_label,
                false_label,
            } => write!(
                f,
                "if ({}) then {} else {}",
                condition, true_label.0, false_label.0
            ),
            Op::Call(target) => write!(f, "call({})", target),
            Op::Ret(target) => write!(f, "return {}", target),
            Op::Nop => f.write_str("nop"),
            Op::Label(label) => write!(f, "{}:", label.0),
            Op::Unimplemented => f.write_str("unimplemented"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_truncated_to_width() {
        let il = Lifter::new(0);
        assert_eq!(il.const_int(Width::Byte, 0x1ff).constant(), Some(0xff));
        assert_eq!(il.const_int(Width::Word, u64::MAX).constant(), Some(0xffff));
        assert_eq!(
            il.const_ptr(Width::Address, 0x123456).constant(),
            Some(0x23456)
        );
    }

    #[test]
    fn known_labels_are_returned() {
        let mut il = Lifter::with_labels(0x4400, [0x4400, 0x4410]);
        let a = il.label_for_address(0x4400).unwrap();
        let b = il.label_for_address(0x4410).unwrap();
        assert_ne!(a, b);
        assert!(il.label_for_address(0x4402).is_none());
        let fresh = il.new_label();
        assert_ne!(fresh, a);
        assert_ne!(fresh, b);
    }

    #[test]
    fn temps_restart_per_instruction() {
        let mut il = Lifter::new(0);
        assert_eq!(il.new_temp(), 0);
        assert_eq!(il.new_temp(), 1);
        il.set_current_address(2);
        assert_eq!(il.new_temp(), 0);
        assert_eq!(il.current_address(), 2);
    }

    #[test]
    fn display_is_readable() {
        let mut il = Lifter::new(0);
        let op = il.set_reg(
            Width::Word,
            Register::R5,
            il.add(
                Width::Word,
                il.reg(Width::Word, Register::R5),
                il.const_int(Width::Word, 2),
            ),
        );
        il.append(op);
        assert_eq!(il.ops()[0].to_string(), "r5.w = Add.w(r5.w, 0x2)");
        assert_eq!(il.reg(Width::Word, Register::Sp).width(), Some(Width::Word));
        assert_eq!(il.flag(Flag::C).width(), None);
    }
}
