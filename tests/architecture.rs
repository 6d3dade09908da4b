mod common;

use common::{bytes, Exit, Machine};
use msp430_lift::llil::Op;
use msp430_lift::text::{render, TokenKind};
use msp430_lift::{Architecture, BranchInfo, LiftOptions, Lifter, Msp430, Register, Variant};
use pretty_assertions::assert_eq;

/// Lift every instruction of `program` into one buffer, the way a host lifts
/// a basic block.
fn lift_block(arch: &Msp430, program: &[u8], base: u64) -> Lifter {
    let mut il = Lifter::new(base);
    let mut offset = 0;
    while offset < program.len() {
        let (len, more) = arch
            .instruction_llil(&program[offset..], base + offset as u64, &mut il)
            .unwrap();
        assert!(more);
        offset += len;
    }
    il
}

#[test]
fn lifted_function_computes_its_result() {
    let program = bytes(&[
        0x403f, 0x0005, // mov #5, r15
        0x5e0f, // add r14, r15
        0x4130, // ret
    ]);
    let il = lift_block(&Msp430::default(), &program, 0x4400);

    let mut m = Machine::with_regs(&[(Register::R14, 3), (Register::Sp, 0x3fe)]);
    m.write(0x3fe, msp430_lift::Width::Word, 0x4420);
    m.run(il.ops());
    assert_eq!(m.reg(Register::R15), 8);
    assert_eq!(m.exit, Some(Exit::Ret(0x4420)));
}

#[test]
fn text_tokens() {
    let arch = Msp430::default();
    let (len, tokens) = arch
        .instruction_text(&bytes(&[0x403f, 0x0005]), 0x4400)
        .unwrap();
    assert_eq!(len, 4);
    assert_eq!(render(&tokens), "mov      #0x5, r15");

    let (_, tokens) = arch.instruction_text(&bytes(&[0x4130]), 0x4400).unwrap();
    assert_eq!(render(&tokens), "ret");
}

#[test]
fn symbolic_text_and_il_agree() {
    // mov 0x20(pc), r5 at 0xfff0
    let arch = Msp430::default();
    let program = bytes(&[0x4015, 0x0020]);
    let (_, tokens) = arch.instruction_text(&program, 0xfff0).unwrap();
    assert_eq!(render(&tokens), "mov      0x14, r5");
    assert!(tokens
        .iter()
        .any(|t| t.kind == TokenKind::CodeRelativeAddress(0x14)));

    let il = lift_block(&arch, &program, 0xfff0);
    assert_eq!(il.ops()[0].to_string(), "r5.w = [&0x14].w");
}

#[test]
fn branch_info_for_a_sequence() {
    let arch = Msp430::default();
    let program = bytes(&[
        0x2402, // jz $+6
        0x12b0, 0x4500, // call #0x4500
        0x4030, 0x4600, // br #0x4600
    ]);

    let info = arch.instruction_info(&program, 0x4400).unwrap();
    assert_eq!(
        info.branches(),
        &[BranchInfo::True(0x4406), BranchInfo::False(0x4402)]
    );
    let info = arch.instruction_info(&program[2..], 0x4402).unwrap();
    assert_eq!(info.branches(), &[BranchInfo::Call(0x4500)]);
    let info = arch.instruction_info(&program[6..], 0x4406).unwrap();
    assert_eq!(info.branches(), &[BranchInfo::Unconditional(0x4600)]);
}

#[test]
fn msp430x_returns_and_calls() {
    let arch = Msp430::default();
    // reta
    let info = arch.instruction_info(&bytes(&[0x0110]), 0x10000).unwrap();
    assert_eq!(info.branches(), &[BranchInfo::FunctionReturn]);
    // calla #0x12345
    let info = arch.instruction_info(&bytes(&[0x13b1, 0x2345]), 0x10000).unwrap();
    assert_eq!(info.branches(), &[BranchInfo::Call(0x12345)]);
}

#[test]
fn classic_variant_drops_cpux_encodings() {
    let arch = Msp430::new(Variant::Msp430);
    // pushm.w #4, r10
    assert!(arch.instruction_info(&bytes(&[0x153a]), 0).is_none());
    let mut il = Lifter::new(0);
    assert!(arch.instruction_llil(&bytes(&[0x153a]), 0, &mut il).is_none());
    assert!(il.is_empty());
}

#[test]
fn stack_reseed_option() {
    let arch = Msp430::with_options(
        Variant::Msp430X,
        LiftOptions {
            skip_stack_reseed: true,
        },
    );
    // mov #0x4400, sp
    let il = lift_block(&arch, &bytes(&[0x4031, 0x4400]), 0x4400);
    assert_eq!(il.ops(), &[Op::Nop]);

    let il = lift_block(&Msp430::default(), &bytes(&[0x4031, 0x4400]), 0x4400);
    assert_eq!(il.ops().len(), 1);
    assert_ne!(il.ops()[0], Op::Nop);
}
