//! Status flags and the rules each operation uses to update them.
//!
//! Every rule exists twice: as a concrete function over integers
//! ([`FlagOp::evaluate`]) and as the IL expression the lifter emits
//! ([`FlagOp::flag_exprs`]). The two are kept side by side so they can be
//! checked against each other.
//!
//! Subtraction on the MSP430 is `dst + !src + 1`, so the carry flag after a
//! subtract or compare is set when *no* borrow occurred.

use crate::llil::{Expr, Lifter};
use crate::operand::Width;

use std::borrow::Cow;
use std::convert::TryFrom;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    C,
    Z,
    N,
    V,
}

pub const ALL_FLAGS: [Flag; 4] = [Flag::C, Flag::Z, Flag::N, Flag::V];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagRole {
    Carry,
    Zero,
    NegativeSign,
    Overflow,
}

impl Flag {
    pub fn name(&self) -> Cow<'static, str> {
        match self {
            Self::C => "c".into(),
            Self::Z => "z".into(),
            Self::N => "n".into(),
            Self::V => "v".into(),
        }
    }

    pub fn role(&self) -> FlagRole {
        match self {
            Self::C => FlagRole::Carry,
            Self::Z => FlagRole::Zero,
            Self::N => FlagRole::NegativeSign,
            Self::V => FlagRole::Overflow,
        }
    }

    /// Bit position of the flag inside SR, which doubles as its id.
    pub fn id(&self) -> u32 {
        match self {
            Self::C => 0,
            Self::Z => 1,
            Self::N => 2,
            Self::V => 8,
        }
    }

    pub fn sr_mask(&self) -> u64 {
        1 << self.id()
    }
}

impl TryFrom<u32> for Flag {
    type Error = ();
    fn try_from(flag: u32) -> Result<Self, Self::Error> {
        match flag {
            0 => Ok(Self::C),
            1 => Ok(Self::Z),
            2 => Ok(Self::N),
            8 => Ok(Self::V),
            _ => Err(()),
        }
    }
}

/// Groups of flags an operation writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagWrite {
    None,
    All,
    Cnz,
}

impl FlagWrite {
    pub fn name(&self) -> Cow<'static, str> {
        match self {
            Self::None => "".into(),
            Self::All => "*".into(),
            Self::Cnz => "cnz".into(),
        }
    }

    pub fn id(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::All => 1,
            Self::Cnz => 2,
        }
    }

    pub fn flags_written(&self) -> Vec<Flag> {
        match self {
            Self::None => vec![],
            Self::All => vec![Flag::C, Flag::Z, Flag::N, Flag::V],
            Self::Cnz => vec![Flag::C, Flag::N, Flag::Z],
        }
    }
}

impl TryFrom<u32> for FlagWrite {
    type Error = ();
    fn try_from(id: u32) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Self::None),
            1 => Ok(Self::All),
            2 => Ok(Self::Cnz),
            _ => Err(()),
        }
    }
}

pub fn zero(result: u64, width: Width) -> bool {
    result & width.mask() == 0
}

pub fn negative(result: u64, width: Width) -> bool {
    result & width.sign_bit() != 0
}

pub fn carry_after_add(a: u64, b: u64, width: Width) -> bool {
    carry_after_addc(a, b, false, width)
}

pub fn carry_after_addc(a: u64, b: u64, carry: bool, width: Width) -> bool {
    let mask = width.mask();
    (a & mask) + (b & mask) + carry as u64 > mask
}

pub fn overflow_after_add(a: u64, b: u64, result: u64, width: Width) -> bool {
    (a ^ result) & (b ^ result) & width.sign_bit() != 0
}

/// Carry after `a - b`: set when no borrow occurred, i.e. `a >= b` unsigned.
pub fn carry_after_sub(a: u64, b: u64, width: Width) -> bool {
    carry_after_subc(a, b, true, width)
}

/// Carry after `a + !b + carry`.
pub fn carry_after_subc(a: u64, b: u64, carry: bool, width: Width) -> bool {
    carry_after_addc(a, !b, carry, width)
}

pub fn overflow_after_sub(a: u64, b: u64, result: u64, width: Width) -> bool {
    (a ^ b) & (a ^ result) & width.sign_bit() != 0
}

/// Flag rule families. Binary operations take the destination as `a` and the
/// source as `b`; single-operand operations only look at `a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagOp {
    Add,
    Addc,
    Sub,
    Subc,
    And,
    Xor,
    /// Arithmetic shift right by `count` bits.
    Rra(u8),
    /// Rotate right through carry `count` times.
    Rrc(u8),
    /// Logical shift right by `count` bits.
    Rru(u8),
    /// Shift left by `count` bits.
    Rla(u8),
    Sxt,
}

/// Result of [`FlagOp::evaluate`]; flags the operation leaves alone are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlagOutcome {
    pub value: u64,
    pub carry: Option<bool>,
    pub zero: Option<bool>,
    pub negative: Option<bool>,
    pub overflow: Option<bool>,
}

impl FlagOutcome {
    pub fn get(&self, flag: Flag) -> Option<bool> {
        match flag {
            Flag::C => self.carry,
            Flag::Z => self.zero,
            Flag::N => self.negative,
            Flag::V => self.overflow,
        }
    }
}

impl FlagOp {
    pub fn flag_write(&self) -> FlagWrite {
        match self {
            // multi-bit shifts leave V undefined; single-bit ones reset it
            Self::Rra(n) | Self::Rrc(n) | Self::Rru(n) | Self::Rla(n) if *n > 1 => FlagWrite::Cnz,
            _ => FlagWrite::All,
        }
    }

    /// Concrete result and flags. Inputs are truncated to `width` first.
    pub fn evaluate(&self, a: u64, b: u64, carry_in: bool, width: Width) -> FlagOutcome {
        let mask = width.mask();
        let bits = width.bits();
        let a = a & mask;
        let b = b & mask;

        let (value, carry, overflow) = match *self {
            Self::Add => {
                let r = (a + b) & mask;
                (r, carry_after_add(a, b, width), overflow_after_add(a, b, r, width))
            }
            Self::Addc => {
                let r = (a + b + carry_in as u64) & mask;
                (
                    r,
                    carry_after_addc(a, b, carry_in, width),
                    overflow_after_add(a, b, r, width),
                )
            }
            Self::Sub => {
                let r = a.wrapping_sub(b) & mask;
                (r, carry_after_sub(a, b, width), overflow_after_sub(a, b, r, width))
            }
            Self::Subc => {
                let r = (a + (!b & mask) + carry_in as u64) & mask;
                (
                    r,
                    carry_after_subc(a, b, carry_in, width),
                    overflow_after_sub(a, b, r, width),
                )
            }
            Self::And => {
                let r = a & b;
                (r, r != 0, false)
            }
            Self::Xor => {
                let r = a ^ b;
                (
                    r,
                    r != 0,
                    negative(a, width) && negative(b, width),
                )
            }
            Self::Rra(n) => {
                let mut r = a;
                for _ in 0..n {
                    r = (r >> 1) | (r & width.sign_bit());
                }
                (r, shifted_out_right(a, n), false)
            }
            Self::Rrc(n) => {
                let mut r = a;
                let mut c = carry_in;
                for _ in 0..n {
                    let out = r & 1 != 0;
                    r = (r >> 1) | ((c as u64) << (bits - 1));
                    c = out;
                }
                (r, c, false)
            }
            Self::Rru(n) => (a >> n, shifted_out_right(a, n), false),
            Self::Rla(n) => {
                let r = (a << n) & mask;
                let c = n > 0 && (a >> (bits - n as u32)) & 1 != 0;
                (r, c, false)
            }
            Self::Sxt => {
                let r = sign_extend_byte(a, width);
                (r, r != 0, false)
            }
        };

        let write = self.flag_write().flags_written();
        let keep = |flag: Flag, value: bool| write.contains(&flag).then(|| value);

        FlagOutcome {
            value,
            carry: keep(Flag::C, carry),
            zero: keep(Flag::Z, zero(value, width)),
            negative: keep(Flag::N, negative(value, width)),
            overflow: keep(Flag::V, overflow),
        }
    }

    /// IL expression for every flag this operation writes.
    ///
    /// `a`, `b` and `result` must be side-effect free (registers, temps or
    /// constants) since they are referenced more than once. `carry_in` is the
    /// boolean carry entering the operation.
    pub fn flag_exprs(
        &self,
        il: &Lifter,
        width: Width,
        a: &Expr,
        b: &Expr,
        carry_in: &Expr,
        result: &Expr,
    ) -> Vec<(Flag, Expr)> {
        let zero_const = || il.const_int(width, 0);
        let bit_set = |value: &Expr, bit: u32| {
            il.cmp_ne(
                width,
                il.and(width, value.clone(), il.const_int(width, 1u64 << bit)),
                zero_const(),
            )
        };
        let is_negative = |value: &Expr| il.cmp_slt(width, value.clone(), zero_const());
        let nonzero_result = || il.cmp_ne(width, result.clone(), zero_const());

        let (carry, overflow) = match *self {
            Self::Add => (
                il.cmp_ult(width, result.clone(), a.clone()),
                add_overflow(il, width, a, b, result),
            ),
            Self::Addc => (
                il.bool_or(
                    il.cmp_ult(width, result.clone(), a.clone()),
                    il.bool_and(carry_in.clone(), il.cmp_e(width, result.clone(), a.clone())),
                ),
                add_overflow(il, width, a, b, result),
            ),
            Self::Sub => (
                il.cmp_uge(width, a.clone(), b.clone()),
                sub_overflow(il, width, a, b, result),
            ),
            Self::Subc => (
                il.bool_or(
                    il.cmp_ugt(width, a.clone(), b.clone()),
                    il.bool_and(carry_in.clone(), il.cmp_e(width, a.clone(), b.clone())),
                ),
                sub_overflow(il, width, a, b, result),
            ),
            Self::And | Self::Sxt => (nonzero_result(), il.bool(false)),
            Self::Xor => (
                nonzero_result(),
                il.bool_and(is_negative(a), is_negative(b)),
            ),
            Self::Rra(n) | Self::Rrc(n) | Self::Rru(n) => {
                (bit_set(a, n.max(1) as u32 - 1), il.bool(false))
            }
            Self::Rla(n) => (bit_set(a, width.bits() - n.max(1) as u32), il.bool(false)),
        };

        let mut exprs = Vec::with_capacity(4);
        for flag in self.flag_write().flags_written() {
            let value = match flag {
                Flag::C => carry.clone(),
                Flag::Z => il.cmp_e(width, result.clone(), zero_const()),
                Flag::N => is_negative(result),
                Flag::V => overflow.clone(),
            };
            exprs.push((flag, value));
        }
        exprs
    }
}

fn add_overflow(il: &Lifter, width: Width, a: &Expr, b: &Expr, result: &Expr) -> Expr {
    il.cmp_slt(
        width,
        il.and(
            width,
            il.xor(width, a.clone(), result.clone()),
            il.xor(width, b.clone(), result.clone()),
        ),
        il.const_int(width, 0),
    )
}

fn sub_overflow(il: &Lifter, width: Width, a: &Expr, b: &Expr, result: &Expr) -> Expr {
    il.cmp_slt(
        width,
        il.and(
            width,
            il.xor(width, a.clone(), b.clone()),
            il.xor(width, a.clone(), result.clone()),
        ),
        il.const_int(width, 0),
    )
}

fn shifted_out_right(a: u64, n: u8) -> bool {
    n > 0 && (a >> (n - 1)) & 1 != 0
}

/// Sign-extend the low byte of `value` to `width`.
pub fn sign_extend_byte(value: u64, width: Width) -> u64 {
    let byte = value & 0xff;
    if byte & 0x80 != 0 {
        (byte | !0xff) & width.mask()
    } else {
        byte
    }
}
