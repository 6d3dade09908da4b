//! MSP430 and MSP430X disassembler and low-level IL lifter.
//!
//! ```
//! use msp430_lift::{decode, lift, Lifter};
//!
//! // add #0x10, r6
//! let inst = decode(&[0x36, 0x50, 0x10, 0x00], 0x4400).unwrap();
//! assert_eq!(inst.to_string(), "add #0x10, r6");
//!
//! let mut il = Lifter::new(inst.address());
//! lift(&inst, &mut il);
//! assert!(!il.is_empty());
//! ```

pub mod architecture;
pub mod condition;
pub mod cursor;
pub mod error;
pub mod flag;
pub mod instruction;
pub mod lifter;
pub mod llil;
pub mod opcode;
pub mod operand;
pub mod register;
pub mod text;

pub use architecture::{Architecture, BranchInfo, InstructionInfo, Msp430};
pub use error::DecodeError;
pub use instruction::{decode, Decoder, Instruction, Variant};
pub use lifter::{lift, lift_with, LiftOptions};
pub use llil::Lifter;
pub use operand::{Operand, Width};
pub use register::Register;
