use tarn_vm::{Op, disassemble, make, read_operands, read_u8, read_u16};

#[test]
fn make_encodes_operands_big_endian() {
    assert_eq!(make(Op::LoadConst, &[65534]), vec![Op::LoadConst as u8, 0xFF, 0xFE]);
    assert_eq!(make(Op::LoadLocal, &[255]), vec![Op::LoadLocal as u8, 0xFF]);
    assert_eq!(make(Op::Add, &[]), vec![Op::Add as u8]);
    assert_eq!(
        make(Op::MakeClosure, &[65534, 255]),
        vec![Op::MakeClosure as u8, 0xFF, 0xFE, 0xFF]
    );
}

#[test]
fn read_operands_inverts_make() {
    let cases: Vec<(Op, Vec<usize>, usize)> = vec![
        (Op::LoadConst, vec![65535], 2),
        (Op::StoreLocal, vec![200], 1),
        (Op::MakeClosure, vec![1000, 7], 3),
        (Op::Destructure, vec![3], 1),
        (Op::GreaterThan, vec![], 0),
    ];
    for (op, operands, width) in cases {
        let instruction = make(op, &operands);
        let (decoded, read) = read_operands(op, &instruction[1..]);
        assert_eq!(decoded, operands, "op {:?}", op);
        assert_eq!(read, width, "op {:?}", op);
    }
}

#[test]
fn read_helpers() {
    assert_eq!(read_u16(&[0x12, 0x34]), 0x1234);
    assert_eq!(read_u8(&[0x7F]), 0x7F);
}

#[test]
fn every_opcode_round_trips_through_from_byte() {
    for byte in 0..=0x21u8 {
        let op = Op::from_byte(byte).expect("all opcodes in range decode");
        assert_eq!(op as u8, byte);
    }
    assert!(Op::from_byte(0x22).is_none());
    assert!(Op::from_byte(0xFF).is_none());
}

#[test]
fn disassemble_renders_offsets_and_operands() {
    let instructions = [
        make(Op::LoadConst, &[1]),
        make(Op::LoadConst, &[2]),
        make(Op::Add, &[]),
        make(Op::MakeClosure, &[2, 1]),
        make(Op::Pop, &[]),
    ]
    .concat();
    let expected = "\
0000 load_const 1
0003 load_const 2
0006 add
0007 make_closure 2 1
0011 pop
";
    assert_eq!(disassemble(&instructions), expected);
}

#[test]
fn disassemble_flags_unknown_bytes() {
    let text = disassemble(&[0xEE]);
    assert!(text.contains("??"));
}
