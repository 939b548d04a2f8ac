use proptest::prelude::*;
use stackcode_asm::prelude::*;

/// Any non-jump, non-prefix opcode.
fn opcode() -> impl Strategy<Value = Opcode> {
    let ops: Vec<Opcode> = Opcode::all().filter(|op| !op.is_jump() && !op.is_extended_arg()).collect();
    prop::sample::select(ops)
}

fn argument() -> impl Strategy<Value = u32> {
    prop_oneof![3 => 0u32..=0xFFFF, 1 => 0x1_0000u32..=ARG_MAX]
}

/// Straight-line code with an explicit, gently drifting line per instruction.
fn straight_line() -> impl Strategy<Value = Vec<ConcreteInstr>> {
    prop::collection::vec((opcode(), argument(), -3i64..=20), 1..64).prop_map(|parts| {
        let mut line = 500i64;
        parts
            .into_iter()
            .map(|(op, arg, step)| {
                line += step;
                let arg = op.has_arg().then_some(arg);
                let line = u32::try_from(line).unwrap();
                ConcreteInstr::new(op, arg, Some(line)).unwrap()
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn straight_line_code_survives_encoding(instrs in straight_line()) {
        let mut bc = ConcreteBytecode::new(CodeMeta { first_lineno: 500, ..CodeMeta::default() });
        bc.instrs = instrs;
        let raw = bc.to_raw();
        prop_assert_eq!(raw.code.len() as u32, bc.code_size());

        let back = ConcreteBytecode::from_raw(&raw, &DisassembleOptions::default()).unwrap();
        prop_assert_eq!(back.instrs, bc.instrs);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn forward_jumps_over_padding(pads in prop::collection::vec(0usize..70_000, 1..3)) {
        // JUMP_FORWARD over each block of NOPs; big blocks need an extended jump
        let mut bc = Bytecode::default();
        for pad in &pads {
            let label = Label::new();
            bc.emit("JUMP_FORWARD", label.into()).unwrap();
            for _ in 0..*pad {
                bc.emit("NOP", Operand::None).unwrap();
            }
            bc.push(label);
        }
        bc.emit("RETURN_VALUE", Operand::None).unwrap();

        let concrete = bc.to_concrete(&AssembleOptions::default()).unwrap();
        let args: Vec<u32> = concrete.instrs.iter().filter(|i| i.opcode().is_jump()).filter_map(ConcreteInstr::arg).collect();
        let expected: Vec<u32> = pads.iter().map(|p| u32::try_from(*p).unwrap()).collect();
        prop_assert_eq!(args, expected);

        let raw = concrete.to_raw();
        let again = Bytecode::from_raw(&raw, &DisassembleOptions::default()).unwrap();
        prop_assert_eq!(again.to_raw(&AssembleOptions::default()).unwrap(), raw);
    }
}
