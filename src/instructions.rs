// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! SIC/XE instruction table, register table, and directive set.

/// Instruction formats. The numeric value of a format is also its size in
/// bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
}

impl Format {
    pub fn size(self) -> u32 {
        self as u32
    }
}

/// An instruction table entry: mnemonic, opcode byte (low 2 bits clear),
/// and the permitted formats in the order they are tried.
pub struct OpDesc {
    pub mnemonic: &'static str,
    pub opcode: u8,
    pub formats: &'static [Format],
}

const F1: &[Format] = &[Format::One];
const F2: &[Format] = &[Format::Two];
const F34: &[Format] = &[Format::Three, Format::Four];

pub static INSTRUCTION_TABLE: &[OpDesc] = &[
    OpDesc { mnemonic: "ADD", opcode: 0x18, formats: F34 },
    OpDesc { mnemonic: "ADDF", opcode: 0x58, formats: F34 },
    OpDesc { mnemonic: "ADDR", opcode: 0x90, formats: F2 },
    OpDesc { mnemonic: "AND", opcode: 0x40, formats: F34 },
    OpDesc { mnemonic: "CLEAR", opcode: 0xB4, formats: F2 },
    OpDesc { mnemonic: "COMP", opcode: 0x28, formats: F34 },
    OpDesc { mnemonic: "COMPF", opcode: 0x88, formats: F34 },
    OpDesc { mnemonic: "COMPR", opcode: 0xA0, formats: F2 },
    OpDesc { mnemonic: "DIV", opcode: 0x24, formats: F34 },
    OpDesc { mnemonic: "DIVF", opcode: 0x64, formats: F34 },
    OpDesc { mnemonic: "DIVR", opcode: 0x9C, formats: F2 },
    OpDesc { mnemonic: "FIX", opcode: 0xC4, formats: F1 },
    OpDesc { mnemonic: "FLOAT", opcode: 0xC0, formats: F1 },
    OpDesc { mnemonic: "HIO", opcode: 0xF4, formats: F1 },
    OpDesc { mnemonic: "J", opcode: 0x3C, formats: F34 },
    OpDesc { mnemonic: "JEQ", opcode: 0x30, formats: F34 },
    OpDesc { mnemonic: "JGT", opcode: 0x34, formats: F34 },
    OpDesc { mnemonic: "JLT", opcode: 0x38, formats: F34 },
    OpDesc { mnemonic: "JSUB", opcode: 0x48, formats: F34 },
    OpDesc { mnemonic: "LDA", opcode: 0x00, formats: F34 },
    OpDesc { mnemonic: "LDB", opcode: 0x68, formats: F34 },
    OpDesc { mnemonic: "LDCH", opcode: 0x50, formats: F34 },
    OpDesc { mnemonic: "LDF", opcode: 0x70, formats: F34 },
    OpDesc { mnemonic: "LDL", opcode: 0x08, formats: F34 },
    OpDesc { mnemonic: "LDS", opcode: 0x6C, formats: F34 },
    OpDesc { mnemonic: "LDT", opcode: 0x74, formats: F34 },
    OpDesc { mnemonic: "LDX", opcode: 0x04, formats: F34 },
    OpDesc { mnemonic: "LPS", opcode: 0xD0, formats: F34 },
    OpDesc { mnemonic: "MUL", opcode: 0x20, formats: F34 },
    OpDesc { mnemonic: "MULF", opcode: 0x60, formats: F34 },
    OpDesc { mnemonic: "MULR", opcode: 0x98, formats: F2 },
    OpDesc { mnemonic: "NORM", opcode: 0xC8, formats: F1 },
    OpDesc { mnemonic: "OR", opcode: 0x44, formats: F34 },
    OpDesc { mnemonic: "RD", opcode: 0xD8, formats: F34 },
    OpDesc { mnemonic: "RMO", opcode: 0xAC, formats: F2 },
    OpDesc { mnemonic: "RSUB", opcode: 0x4C, formats: F34 },
    OpDesc { mnemonic: "SHIFTL", opcode: 0xA4, formats: F2 },
    OpDesc { mnemonic: "SHIFTR", opcode: 0xA8, formats: F2 },
    OpDesc { mnemonic: "SIO", opcode: 0xF0, formats: F1 },
    OpDesc { mnemonic: "SSK", opcode: 0xEC, formats: F34 },
    OpDesc { mnemonic: "STA", opcode: 0x0C, formats: F34 },
    OpDesc { mnemonic: "STB", opcode: 0x78, formats: F34 },
    OpDesc { mnemonic: "STCH", opcode: 0x54, formats: F34 },
    OpDesc { mnemonic: "STF", opcode: 0x80, formats: F34 },
    OpDesc { mnemonic: "STI", opcode: 0xD4, formats: F34 },
    OpDesc { mnemonic: "STL", opcode: 0x14, formats: F34 },
    OpDesc { mnemonic: "STS", opcode: 0x7C, formats: F34 },
    OpDesc { mnemonic: "STSW", opcode: 0xE8, formats: F34 },
    OpDesc { mnemonic: "STT", opcode: 0x84, formats: F34 },
    OpDesc { mnemonic: "STX", opcode: 0x10, formats: F34 },
    OpDesc { mnemonic: "SUB", opcode: 0x1C, formats: F34 },
    OpDesc { mnemonic: "SUBF", opcode: 0x5C, formats: F34 },
    OpDesc { mnemonic: "SUBR", opcode: 0x94, formats: F2 },
    OpDesc { mnemonic: "SVC", opcode: 0xB0, formats: F2 },
    OpDesc { mnemonic: "TD", opcode: 0xE0, formats: F34 },
    OpDesc { mnemonic: "TIO", opcode: 0xF8, formats: F1 },
    OpDesc { mnemonic: "TIX", opcode: 0x2C, formats: F34 },
    OpDesc { mnemonic: "TIXR", opcode: 0xB8, formats: F2 },
    OpDesc { mnemonic: "WD", opcode: 0xDC, formats: F34 },
];

pub fn lookup_mnemonic(mnemonic: &str) -> Option<&'static OpDesc> {
    INSTRUCTION_TABLE
        .iter()
        .find(|entry| entry.mnemonic.eq_ignore_ascii_case(mnemonic))
}

pub fn has_mnemonic(mnemonic: &str) -> bool {
    lookup_mnemonic(mnemonic).is_some()
}

/// A register table entry: name and 4-bit code.
pub struct RegDesc {
    pub name: &'static str,
    pub code: u8,
}

pub static REGISTER_TABLE: &[RegDesc] = &[
    RegDesc { name: "A", code: 0 },
    RegDesc { name: "X", code: 1 },
    RegDesc { name: "L", code: 2 },
    RegDesc { name: "B", code: 3 },
    RegDesc { name: "S", code: 4 },
    RegDesc { name: "T", code: 5 },
    RegDesc { name: "F", code: 6 },
    RegDesc { name: "PC", code: 8 },
    RegDesc { name: "SW", code: 9 },
];

/// The register whose presence as a second operand sets the `x` flag.
pub const INDEX_REGISTER: &str = "X";

pub fn register_code(name: &str) -> Option<u8> {
    REGISTER_TABLE
        .iter()
        .find(|entry| entry.name.eq_ignore_ascii_case(name))
        .map(|entry| entry.code)
}

/// Storage and control directives. Anything else that fails instruction
/// lookup is an error.
pub static DIRECTIVES: &[&str] = &["BYTE", "WORD", "RESB", "RESW", "START", "END"];

pub fn is_directive(mnemonic: &str) -> bool {
    DIRECTIVES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(mnemonic))
}
