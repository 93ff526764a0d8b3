// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Format selection, line sizing, and instruction/directive encoding.
//!
//! Format selection is the pass-structure hinge: pass 1 must predict each
//! line's size before symbols are known, and pass 2 must emit exactly the
//! predicted bytes. Unresolved symbols therefore resolve to the current
//! address, which keeps every symbolic operand reachable while sizing.

use crate::assembler::AsmState;
use crate::instructions::{self, Format, OpDesc};
use crate::parser::{AddressMode, Line, Operand, Value};

/// Choose the first of the mnemonic's permitted formats whose operand
/// shape validates. Does not move the location counter.
pub fn select_format(state: &AsmState, line: &Line) -> Option<Format> {
    let desc = instructions::lookup_mnemonic(&line.mnemonic)?;
    desc.formats
        .iter()
        .copied()
        .find(|format| format_fits(state, line, *format))
}

fn format_fits(state: &AsmState, line: &Line, format: Format) -> bool {
    match format {
        Format::One => line.operands.is_empty(),
        Format::Two => {
            matches!(line.operands.len(), 1 | 2)
                && line.operands.iter().all(|op| register_field(op).is_some())
        }
        Format::Three => {
            if line.extended {
                return false;
            }
            match line.operands.first() {
                Some(op) if is_absolute(op) => true,
                op => {
                    let target = op
                        .map(|op| operand_address(state, op))
                        .unwrap_or_else(|| state.address());
                    let disp = state.address().wrapping_sub(target) as i32;
                    disp >= -2048 || disp < 4096
                }
            }
        }
        Format::Four => true,
    }
}

/// Predict the line's emitted byte count and advance the location counter
/// by it. Instructions are tried before directives; `None` means the line
/// cannot be sized at all.
pub fn size_of_line(state: &mut AsmState, line: &Line) -> Option<u32> {
    let size = match select_format(state, line) {
        Some(format) => format.size(),
        None => directive_size(line)?,
    };
    state.advance(size);
    Some(size)
}

/// Encode one line and advance the location counter by the emitted byte
/// count. Directives emit their storage bytes; `END` emits nothing.
pub fn encode_line(state: &mut AsmState, line: &Line) -> Option<Vec<u8>> {
    if let Some(desc) = instructions::lookup_mnemonic(&line.mnemonic) {
        let format = select_format(state, line)?;
        return Some(encode_instruction(state, line, desc, format));
    }
    encode_directive(state, line)
}

fn encode_instruction(state: &mut AsmState, line: &Line, desc: &OpDesc, format: Format) -> Vec<u8> {
    match format {
        Format::One => {
            let bytes = vec![desc.opcode];
            state.advance(1);
            bytes
        }
        Format::Two => {
            let r1 = line.operands.first().and_then(register_field).unwrap_or(0);
            let r2 = line.operands.get(1).and_then(register_field).unwrap_or(0);
            let bytes = vec![desc.opcode, (r1 << 4) | r2];
            state.advance(2);
            bytes
        }
        Format::Three => encode_format3(state, line, desc),
        Format::Four => encode_format4(state, line, desc),
    }
}

fn encode_format3(state: &mut AsmState, line: &Line, desc: &OpDesc) -> Vec<u8> {
    let Some(op) = line.operands.first() else {
        // RSUB-style: n=i=1, everything else zero.
        let bytes = pack_format3(desc.opcode, true, true, false, false, false, 0);
        state.advance(3);
        return bytes;
    };

    let (n, i) = mode_flags(op);
    let x = indexed(line);

    let (b, p, field) = if is_absolute(op) {
        (false, false, operand_address(state, op) & 0xFFF)
    } else {
        let target = operand_address(state, op);
        let disp = target.wrapping_sub(state.address().wrapping_add(3)) as i32;
        let p = (-2048..2048).contains(&disp);
        let b = !p && (0..4096).contains(&disp);
        if !p && !b {
            // Out of reach of both displacement forms: re-encode extended,
            // one byte longer than pass 1 predicted.
            return encode_format4(state, line, desc);
        }
        (b, p, disp as u32 & 0xFFF)
    };

    let bytes = pack_format3(desc.opcode, n, i, x, b, p, field);
    state.advance(3);
    bytes
}

fn encode_format4(state: &mut AsmState, line: &Line, desc: &OpDesc) -> Vec<u8> {
    let (n, i, x, addr) = match line.operands.first() {
        None => (true, true, false, 0),
        Some(op) => {
            let (n, i) = mode_flags(op);
            (n, i, indexed(line), operand_address(state, op) & 0xF_FFFF)
        }
    };

    let mut bits = to_bits(u32::from(desc.opcode) >> 2, 6);
    bits.extend([n, i, x, false, false, true]);
    bits.extend(to_bits(addr, 20));
    let bytes = pack_bits(&bits);
    state.advance(4);
    bytes
}

fn pack_format3(opcode: u8, n: bool, i: bool, x: bool, b: bool, p: bool, field: u32) -> Vec<u8> {
    let mut bits = to_bits(u32::from(opcode) >> 2, 6);
    bits.extend([n, i, x, b, p, false]);
    bits.extend(to_bits(field, 12));
    pack_bits(&bits)
}

/// `n` is set for indirect and simple operands, `i` for immediate and
/// simple ones.
fn mode_flags(op: &Operand) -> (bool, bool) {
    let n = matches!(op.mode, AddressMode::Indirect | AddressMode::Simple);
    let i = matches!(op.mode, AddressMode::Immediate | AddressMode::Simple);
    (n, i)
}

/// Indexed addressing: a simple first operand plus the indexing register,
/// in simple mode, as the second.
fn indexed(line: &Line) -> bool {
    if line.operands.len() != 2 {
        return false;
    }
    let first = &line.operands[0];
    let second = &line.operands[1];
    first.mode == AddressMode::Simple
        && second.mode == AddressMode::Simple
        && matches!(
            &second.value,
            Value::Symbol(name) if name.eq_ignore_ascii_case(instructions::INDEX_REGISTER)
        )
}

/// A literal integer in immediate mode encodes its value directly in the
/// 12-bit field instead of a displacement.
fn is_absolute(op: &Operand) -> bool {
    matches!(op.value, Value::Literal(_)) && op.mode == AddressMode::Immediate
}

/// Resolve an operand to an address: literals stand for themselves,
/// symbols resolve through the table, and unresolved symbols behave as the
/// current address so pass-1 sizing stays stable.
fn operand_address(state: &AsmState, op: &Operand) -> u32 {
    match &op.value {
        Value::Literal(value) => *value as u32,
        Value::Symbol(name) => state.lookup_symbol(name).unwrap_or_else(|| state.address()),
    }
}

/// A format-2 register field: a register name's code, or a literal cast to
/// its low 4 bits.
fn register_field(op: &Operand) -> Option<u8> {
    match &op.value {
        Value::Symbol(name) => instructions::register_code(name),
        Value::Literal(value) => Some(*value as u8 & 0x0F),
    }
}

fn directive_size(line: &Line) -> Option<u32> {
    let name = line.mnemonic.as_str();
    if name.eq_ignore_ascii_case("BYTE") {
        let value = immediate_literal(line)?;
        return Some(min_be_bytes(value).len() as u32);
    }
    if name.eq_ignore_ascii_case("WORD") {
        simple_literal(line)?;
        return Some(3);
    }
    if name.eq_ignore_ascii_case("RESB") || name.eq_ignore_ascii_case("START") {
        return reservation_count(line);
    }
    if name.eq_ignore_ascii_case("RESW") {
        return reservation_count(line).map(|count| 3 * count);
    }
    if name.eq_ignore_ascii_case("END") {
        return Some(0);
    }
    None
}

fn encode_directive(state: &mut AsmState, line: &Line) -> Option<Vec<u8>> {
    let size = directive_size(line)?;
    let bytes = if line.mnemonic.eq_ignore_ascii_case("BYTE") {
        min_be_bytes(immediate_literal(line)?)
    } else if line.mnemonic.eq_ignore_ascii_case("WORD") {
        let word = simple_literal(line)? as u32 & 0xFF_FFFF;
        pack_bits(&to_bits(word, 24))
    } else {
        vec![0; size as usize]
    };
    state.advance(size);
    Some(bytes)
}

fn immediate_literal(line: &Line) -> Option<i64> {
    match line.operands.as_slice() {
        [Operand {
            value: Value::Literal(value),
            mode: AddressMode::Immediate,
        }] => Some(*value),
        _ => None,
    }
}

fn simple_literal(line: &Line) -> Option<i64> {
    match line.operands.as_slice() {
        [Operand {
            value: Value::Literal(value),
            mode: AddressMode::Simple,
        }] => Some(*value),
        _ => None,
    }
}

fn reservation_count(line: &Line) -> Option<u32> {
    u32::try_from(simple_literal(line)?).ok()
}

/// Shortest big-endian byte string whose unsigned value equals `value`;
/// zero is one zero byte.
fn min_be_bytes(value: i64) -> Vec<u8> {
    let value = value as u32;
    let width = (32 - value.leading_zeros()).div_ceil(8).max(1) * 8;
    pack_bits(&to_bits(value, width as usize))
}

/// The low `width` bits of `value`, most significant first.
pub fn to_bits(value: u32, width: usize) -> Vec<bool> {
    (0..width)
        .rev()
        .map(|bit| value >> bit & 1 == 1)
        .collect()
}

/// Pack bits (MSB first) into big-endian bytes. The bit count must be a
/// multiple of eight.
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    debug_assert_eq!(bits.len() % 8, 0);
    bits.chunks(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &bit| acc << 1 | u8::from(bit)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;

    fn line(src: &str) -> Line {
        parse_line(src).unwrap().unwrap()
    }

    fn state_at(addr: u32) -> AsmState {
        let mut state = AsmState::new();
        state.set_address(addr);
        state
    }

    #[test]
    fn bits_round_trip_through_bytes() {
        assert_eq!(to_bits(0b1011, 4), vec![true, false, true, true]);
        assert_eq!(pack_bits(&to_bits(0xA5, 8)), vec![0xA5]);
        assert_eq!(pack_bits(&to_bits(0x012345, 24)), vec![0x01, 0x23, 0x45]);
    }

    #[test]
    fn minimal_byte_string_is_shortest_unsigned() {
        assert_eq!(min_be_bytes(0), vec![0x00]);
        assert_eq!(min_be_bytes(0x41), vec![0x41]);
        assert_eq!(min_be_bytes(0x414243), vec![0x41, 0x42, 0x43]);
        assert_eq!(min_be_bytes(0x01000000), vec![0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn pc_relative_load_matches_the_reference_encoding() {
        // LDA FIVE with FIVE at 0x006, instruction at 0x000.
        let mut state = state_at(0);
        state.define_symbol("FIVE", 6);
        let bytes = encode_line(&mut state, &line("  LDA FIVE")).unwrap();
        assert_eq!(bytes, vec![0x03, 0x20, 0x03]);
        assert_eq!(state.address(), 3);
    }

    #[test]
    fn immediate_literal_is_absolute() {
        let mut state = state_at(0);
        let bytes = encode_line(&mut state, &line("  LDA #5")).unwrap();
        assert_eq!(bytes, vec![0x01, 0x00, 0x05]);

        // The absolute field ignores the instruction's own address.
        let mut state = state_at(0x500);
        let bytes = encode_line(&mut state, &line("  LDA #5")).unwrap();
        assert_eq!(bytes, vec![0x01, 0x00, 0x05]);
    }

    #[test]
    fn extended_instruction_encodes_format4() {
        let mut state = state_at(0);
        state.define_symbol("FIVE", 0x00ABCD);
        let bytes = encode_line(&mut state, &line("  +LDA FIVE")).unwrap();
        assert_eq!(bytes, vec![0x03, 0x10, 0xAB, 0xCD]);
        assert_eq!(state.address(), 4);
    }

    #[test]
    fn bare_rsub_is_format3_with_empty_operand_bits() {
        let mut state = state_at(0);
        let bytes = encode_line(&mut state, &line("  RSUB")).unwrap();
        // opcode 0x4C with n=i=1 in the low two bits.
        assert_eq!(bytes, vec![0x4F, 0x00, 0x00]);
    }

    #[test]
    fn format2_registers_pack_into_one_byte() {
        let mut state = state_at(0);
        let bytes = encode_line(&mut state, &line("  CLEAR A")).unwrap();
        assert_eq!(bytes, vec![0xB4, 0x00]);

        let mut state = state_at(0);
        let bytes = encode_line(&mut state, &line("  COMPR A,X")).unwrap();
        assert_eq!(bytes, vec![0xA0, 0x01]);

        let mut state = state_at(0);
        let bytes = encode_line(&mut state, &line("  SHIFTL A,2")).unwrap();
        assert_eq!(bytes, vec![0xA4, 0x02]);
    }

    #[test]
    fn indexed_operand_sets_the_x_bit() {
        let mut state = state_at(3);
        state.define_symbol("STR", 19);
        let bytes = encode_line(&mut state, &line("  LDCH STR,X")).unwrap();
        assert_eq!(bytes, vec![0x53, 0xA0, 0x0D]);
    }

    #[test]
    fn immediate_first_operand_defeats_indexing() {
        let mut state = state_at(0);
        let bytes = encode_line(&mut state, &line("  LDA #9,X")).unwrap();
        // x stays clear because the first operand is not simple.
        assert_eq!(bytes[1] & 0x80, 0);
    }

    #[test]
    fn mode_flips_only_n_and_i() {
        let mut simple_state = state_at(0);
        simple_state.define_symbol("V", 100);
        let simple = encode_line(&mut simple_state, &line("  LDA V")).unwrap();

        let mut indirect_state = state_at(0);
        indirect_state.define_symbol("V", 100);
        let indirect = encode_line(&mut indirect_state, &line("  LDA @V")).unwrap();

        assert_eq!(simple[0] & 0x03, 0x03);
        assert_eq!(indirect[0] & 0x03, 0x02);
        assert_eq!(simple[1..], indirect[1..]);
    }

    #[test]
    fn negative_displacement_uses_twos_complement() {
        // JLT LOOP at 13 with LOOP at 3: disp = 3 - 16 = -13 = 0xFF3.
        let mut state = state_at(13);
        state.define_symbol("LOOP", 3);
        let bytes = encode_line(&mut state, &line("  JLT LOOP")).unwrap();
        assert_eq!(bytes, vec![0x3B, 0x2F, 0xF3]);
    }

    #[test]
    fn forward_reach_beyond_pc_range_selects_base_form() {
        // disp = 3000, outside [-2048, 2048) but inside [0, 4096): b=1.
        let mut state = state_at(0);
        state.define_symbol("FWD", 3003);
        let bytes = encode_line(&mut state, &line("  LDA FWD")).unwrap();
        assert_eq!(bytes, vec![0x03, 0x4B, 0xB8]);
    }

    #[test]
    fn unreachable_displacement_upgrades_to_format4() {
        let mut state = state_at(0);
        state.define_symbol("FAR", 8195);
        let bytes = encode_line(&mut state, &line("  LDA FAR")).unwrap();
        assert_eq!(bytes, vec![0x03, 0x10, 0x20, 0x03]);
        assert_eq!(state.address(), 4, "upgrade advances by four");
    }

    #[test]
    fn size_oracle_advances_by_the_predicted_size() {
        let mut state = state_at(0x100);
        let size = size_of_line(&mut state, &line("  RESW 2")).unwrap();
        assert_eq!(size, 6);
        assert_eq!(state.address(), 0x106);

        let mut state = state_at(0);
        assert_eq!(size_of_line(&mut state, &line("  +LDA FIVE")), Some(4));
        assert_eq!(size_of_line(&mut state, &line("  CLEAR A")), Some(2));
        assert_eq!(size_of_line(&mut state, &line("  FIX")), Some(1));
        assert_eq!(state.address(), 7);
    }

    #[test]
    fn unknown_symbols_size_as_format3() {
        // Pass 1 must not depend on resolved symbols.
        let mut state = state_at(0);
        assert_eq!(size_of_line(&mut state, &line("  LDA NOWHERE")), Some(3));
    }

    #[test]
    fn directives_emit_their_storage_bytes() {
        let mut state = state_at(0);
        let bytes = encode_line(&mut state, &line("  BYTE 0x414243")).unwrap();
        assert_eq!(bytes, vec![0x41, 0x42, 0x43]);
        assert_eq!(state.address(), 3);

        let mut state = state_at(0);
        let bytes = encode_line(&mut state, &line("  WORD 10")).unwrap();
        assert_eq!(bytes, vec![0x00, 0x00, 0x0A]);

        let mut state = state_at(0);
        let bytes = encode_line(&mut state, &line("  RESB 4")).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0]);

        let mut state = state_at(0);
        let bytes = encode_line(&mut state, &line("  RESW 2")).unwrap();
        assert_eq!(bytes, vec![0; 6]);

        let mut state = state_at(0);
        let bytes = encode_line(&mut state, &line("PROG START 2")).unwrap();
        assert_eq!(bytes, vec![0, 0]);

        let mut state = state_at(0);
        let bytes = encode_line(&mut state, &line("  END")).unwrap();
        assert!(bytes.is_empty());
        assert_eq!(state.address(), 0);
    }

    #[test]
    fn word_keeps_the_low_24_bits() {
        let mut state = state_at(0);
        let bytes = encode_line(&mut state, &line("  WORD 0x1FFFFFE")).unwrap();
        assert_eq!(bytes, vec![0xFF, 0xFF, 0xFE]);

        let mut state = state_at(0);
        let bytes = encode_line(&mut state, &line("  WORD -1")).unwrap();
        assert_eq!(bytes, vec![0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn malformed_directive_operands_fail() {
        let mut state = state_at(0);
        // WORD requires a simple literal.
        assert!(encode_line(&mut state, &line("  WORD #10")).is_none());
        // RESB rejects negative counts.
        assert!(encode_line(&mut state, &line("  RESB -1")).is_none());
        // BYTE requires an immediate literal.
        assert!(encode_line(&mut state, &line("  BYTE LABEL")).is_none());
    }

    #[test]
    fn unknown_mnemonic_fails() {
        let mut state = state_at(0);
        assert!(encode_line(&mut state, &line("  FROB 1")).is_none());
        assert_eq!(size_of_line(&mut state, &line("  FROB 1")), None);
    }

    #[test]
    fn format2_needs_register_shaped_operands() {
        let mut state = state_at(0);
        assert!(encode_line(&mut state, &line("  CLEAR TOTAL")).is_none());
        assert!(encode_line(&mut state, &line("  CLEAR")).is_none());
    }
}
