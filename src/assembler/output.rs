// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Object record, binary image, and labels file generation.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde_json::json;

use crate::error::{AsmError, AsmErrorKind};
use crate::symbol_table::SymbolTable;

/// Data bytes per text record.
const TEXT_RECORD_BYTES: usize = 30;

/// Write the textual object program: a header record naming the program
/// and its length, text records of up to 30 bytes, and an end record with
/// the entry address.
pub fn write_object_records<W: Write>(out: &mut W, name: &str, image: &[u8]) -> io::Result<()> {
    let length = image.len() as u32 & 0xFF_FFFF;
    writeln!(out, "H{:<6.6}{:06X}{:06X}", name, 0, length)?;
    for (index, chunk) in image.chunks(TEXT_RECORD_BYTES).enumerate() {
        let addr = (index * TEXT_RECORD_BYTES) as u32 & 0xFF_FFFF;
        write!(out, "T{:06X}{:02X}", addr, chunk.len())?;
        for byte in chunk {
            write!(out, "{byte:02X}")?;
        }
        writeln!(out)?;
    }
    writeln!(out, "E{:06X}", 0)
}

/// Write the raw image: the concatenation of every line's output.
pub fn write_binary<W: Write>(out: &mut W, image: &[u8]) -> io::Result<()> {
    out.write_all(image)
}

/// Emit the labels file: `NAME = $HEX` lines, or a JSON object when the
/// JSON output format is selected.
pub fn emit_labels_file(path: &Path, json_format: bool, symbols: &SymbolTable) -> Result<(), AsmError> {
    let entries = symbols.entries();
    let output = if json_format {
        let labels: Vec<serde_json::Value> = entries
            .iter()
            .map(|entry| {
                json!({
                    "name": entry.name,
                    "address": format!("{:06X}", entry.val),
                    "value": entry.val,
                })
            })
            .collect();
        json!({ "labels": labels }).to_string()
    } else {
        let mut output = String::new();
        for entry in &entries {
            output.push_str(&format!("{} = ${:06X}\n", entry.name, entry.val));
        }
        output
    };

    fs::write(path, output).map_err(|err| {
        AsmError::new(
            AsmErrorKind::Io,
            &format!("Error writing labels file: {err}"),
            Some(path.to_string_lossy().as_ref()),
        )
    })
}
