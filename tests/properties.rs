mod common;

use common::{bytes, lift_words, Exit, Machine};
use msp430_lift::flag::{Flag, FlagOp};
use msp430_lift::{decode, lift, DecodeError, Decoder, Lifter, Register, Variant, Width};
use proptest::prelude::*;

fn any_variant() -> impl Strategy<Value = Variant> {
    prop_oneof![Just(Variant::Msp430), Just(Variant::Msp430X)]
}

proptest! {
    #[test]
    fn decode_never_panics(
        data in proptest::collection::vec(any::<u8>(), 0..12),
        address in (0u64..0x8000).prop_map(|a| a * 2),
        variant in any_variant(),
    ) {
        match Decoder::new(variant).decode(&data, address) {
            Ok(inst) => {
                prop_assert!(inst.length() >= 2);
                prop_assert!(inst.length() <= data.len());
                prop_assert_eq!(inst.length() % 2, 0);
                prop_assert_eq!(inst.address(), address);

                let mut il = Lifter::new(address);
                lift(&inst, &mut il);
                prop_assert!(!il.is_empty());
            }
            Err(err) => {
                prop_assert_eq!(err.address(), address);
            }
        }
    }

    #[test]
    fn short_buffers_are_truncated(words in proptest::collection::vec(any::<u16>(), 4)) {
        let data = bytes(&words);
        if let Ok(inst) = decode(&data, 0x4400) {
            for len in 0..inst.length() {
                let err = decode(&data[..len], 0x4400).unwrap_err();
                let truncated = matches!(
                    err,
                    DecodeError::TruncatedInstruction { needed, available, .. }
                        if available == len && needed > len
                );
                prop_assert!(truncated, "{:?} for {} bytes", err, len);
            }
        }
    }

    #[test]
    fn one_byte_is_never_enough(byte in any::<u8>(), variant in any_variant()) {
        let truncated = matches!(
            Decoder::new(variant).decode(&[byte], 0),
            Err(DecodeError::TruncatedInstruction { needed: 2, available: 1, .. })
        );
        prop_assert!(truncated);
    }

    #[test]
    fn jump_targets(field in 0u16..0x400, condition in 0u16..8, address in (0u64..0x8000).prop_map(|a| a * 2)) {
        let word = 0x2000 | condition << 10 | field;
        let inst = decode(&bytes(&[word]), address).unwrap();
        let offset = if field & 0x200 != 0 { field as i64 - 0x400 } else { field as i64 };
        prop_assert_eq!(inst.jump_offset(), Some(offset as i16));
        prop_assert_eq!(
            inst.jump_target(),
            Some((address as i64 + 2 + 2 * offset) as u64 & 0xffff)
        );
    }

    #[test]
    fn lifted_flags_match_the_flag_rules(
        a in any::<u16>(),
        b in any::<u16>(),
        carry in any::<bool>(),
        byte in any::<bool>(),
    ) {
        let width = if byte { Width::Byte } else { Width::Word };
        // <op> r5, r4
        let cases = [
            (0x5504u16, FlagOp::Add),
            (0x6504, FlagOp::Addc),
            (0x7504, FlagOp::Subc),
            (0x8504, FlagOp::Sub),
            (0x9504, FlagOp::Sub),
            (0xe504, FlagOp::Xor),
            (0xf504, FlagOp::And),
        ];
        for (word, op) in cases {
            let word = if byte { word | 0x40 } else { word };
            let mut m = Machine::with_regs(&[(Register::R4, a as u64), (Register::R5, b as u64)]);
            m.flags.insert(Flag::C, carry);
            m.run(&lift_words(&[word], 0x4400));

            let expected = op.evaluate(a as u64, b as u64, carry, width);
            for flag in [Flag::C, Flag::Z, Flag::N, Flag::V] {
                prop_assert_eq!(
                    Some(m.flag(flag)),
                    expected.get(flag),
                    "{:?} {:?} a={:#x} b={:#x}", op, flag, a, b
                );
            }
            if word & 0xf000 != 0x9000 {
                prop_assert_eq!(m.reg(Register::R4), expected.value);
            }
            prop_assert_eq!(m.exit, None::<Exit>);
        }
    }

    #[test]
    fn sxt_copies_bit_seven(value in any::<u16>()) {
        let mut m = Machine::with_regs(&[(Register::R5, value as u64)]);
        m.run(&lift_words(&[0x1185], 0));
        let result = m.reg(Register::R5);
        prop_assert_eq!(result & 0xff, value as u64 & 0xff);
        let high = if value & 0x80 != 0 { 0xff00 } else { 0 };
        prop_assert_eq!(result & 0xff00, high);
    }
}
