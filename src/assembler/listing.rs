// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Listing file generation.

use std::io::{self, Write};

use crate::symbol_table::SymbolTable;

/// Bytes shown per listing line before the output is elided.
const LISTING_BYTES: usize = 8;

pub struct ListingLine<'a> {
    pub addr: u32,
    pub bytes: &'a [u8],
    pub line_num: u32,
    pub source: &'a str,
}

pub struct ListingWriter<W: Write> {
    out: W,
}

impl<W: Write> ListingWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn header(&mut self, title: &str) -> io::Result<()> {
        writeln!(self.out, "{title}")?;
        writeln!(self.out)?;
        writeln!(self.out, "LINE  ADDR    CODE              SOURCE")
    }

    pub fn write_line(&mut self, line: ListingLine<'_>) -> io::Result<()> {
        let mut code = String::with_capacity(2 * LISTING_BYTES);
        for byte in line.bytes.iter().take(LISTING_BYTES) {
            code.push_str(&format!("{byte:02X}"));
        }
        if line.bytes.len() > LISTING_BYTES {
            code.push_str("..");
        }
        writeln!(
            self.out,
            "{:>4}  {:06X}  {:<16}  {}",
            line.line_num, line.addr, code, line.source
        )
    }

    pub fn footer(&mut self, symbols: &SymbolTable) -> io::Result<()> {
        if symbols.is_empty() {
            return Ok(());
        }
        writeln!(self.out)?;
        writeln!(self.out, "Symbols")?;
        for entry in symbols.entries() {
            writeln!(self.out, "{:<12} = {:06X}", entry.name, entry.val)?;
        }
        Ok(())
    }
}
