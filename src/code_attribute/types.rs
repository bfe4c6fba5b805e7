use std::io::Cursor;

use binrw::{binrw, BinRead, BinResult, BinWrite};

/// The slice of the JVM instruction set that generated classes use.
#[derive(Clone, Debug, Eq, PartialEq)]
#[binrw]
#[brw(big)]
pub enum Instruction {
    #[brw(magic = 0x01u8)]
    AconstNull,
    #[brw(magic = 0x03u8)]
    Iconst0,
    #[brw(magic = 0x09u8)]
    Lconst0,
    #[brw(magic = 0x0bu8)]
    Fconst0,
    #[brw(magic = 0x0eu8)]
    Dconst0,
    #[brw(magic = 0x2au8)]
    Aload0,
    #[brw(magic = 0x2bu8)]
    Aload1,
    #[brw(magic = 0x1bu8)]
    Iload1,
    #[brw(magic = 0x1fu8)]
    Lload1,
    #[brw(magic = 0x23u8)]
    Fload1,
    #[brw(magic = 0x27u8)]
    Dload1,
    #[brw(magic = 0xb4u8)]
    Getfield(u16),
    #[brw(magic = 0xb5u8)]
    Putfield(u16),
    #[brw(magic = 0xc0u8)]
    Checkcast(u16),
    #[brw(magic = 0xbbu8)]
    New(u16),
    #[brw(magic = 0x59u8)]
    Dup,
    #[brw(magic = 0x12u8)]
    Ldc(u8),
    #[brw(magic = 0x13u8)]
    LdcW(u16),
    #[brw(magic = 0xb7u8)]
    Invokespecial(u16),
    #[brw(magic = 0xbfu8)]
    Athrow,
    #[brw(magic = 0xacu8)]
    Ireturn,
    #[brw(magic = 0xadu8)]
    Lreturn,
    #[brw(magic = 0xaeu8)]
    Freturn,
    #[brw(magic = 0xafu8)]
    Dreturn,
    #[brw(magic = 0xb0u8)]
    Areturn,
    #[brw(magic = 0xb1u8)]
    Return,
}

impl Instruction {
    /// Encoded size in bytes, opcode included.
    pub fn byte_size(&self) -> u32 {
        match self {
            Instruction::Ldc(_) => 2,
            Instruction::Getfield(_)
            | Instruction::Putfield(_)
            | Instruction::Checkcast(_)
            | Instruction::New(_)
            | Instruction::LdcW(_)
            | Instruction::Invokespecial(_) => 3,
            _ => 1,
        }
    }
}

/// Encode an instruction stream into the bytes of a `Code` attribute.
pub fn encode_instructions(instructions: &[Instruction]) -> BinResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    for instr in instructions {
        instr.write(&mut out)?;
    }
    Ok(out.into_inner())
}

/// Decode a whole `Code` byte array.
pub fn decode_instructions(code: &[u8]) -> BinResult<Vec<Instruction>> {
    let mut cursor = Cursor::new(code);
    let mut instructions = Vec::new();
    while (cursor.position() as usize) < code.len() {
        instructions.push(Instruction::read(&mut cursor)?);
    }
    Ok(instructions)
}
