// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Driver around the core passes: parsing, diagnostics, and the output
//! image.

use std::io::Write;

use super::AsmState;
use crate::encoder;
use crate::error::{AsmError, AsmErrorKind, Diagnostic, PassCounts, Severity};
use crate::instructions::{self, Format};
use crate::parser::{self, Line, Operand, Value};
use crate::symbol_table::SymbolTable;

use super::listing::{ListingLine, ListingWriter};

pub struct Assembler {
    state: AsmState,
    parsed: Vec<Option<Line>>,
    diagnostics: Vec<Diagnostic>,
    image: Vec<u8>,
    program_name: Option<String>,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self {
            state: AsmState::new(),
            parsed: Vec::new(),
            diagnostics: Vec::new(),
            image: Vec::new(),
            program_name: None,
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        self.state.symbols()
    }

    /// The concatenated per-line outputs. Only meaningful after a clean
    /// pass 2.
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// Program name for the object header: the `START` line's label when
    /// there is one.
    pub fn program_name(&self) -> Option<&str> {
        self.program_name.as_deref()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Pass 1: parse every source line, bind labels, and advance by
    /// predicted sizes. Unlike the core's silent truncation, unsized and
    /// unparsable lines become error diagnostics and processing continues
    /// so one run reports every problem.
    pub fn pass1(&mut self, lines: &[String]) -> PassCounts {
        self.state = AsmState::new();
        self.parsed.clear();
        self.program_name = None;
        let mut counts = PassCounts::new();

        for (idx, src) in lines.iter().enumerate() {
            let line_num = idx as u32 + 1;
            let line = match parser::parse_line(src) {
                Ok(line) => line,
                Err(err) => {
                    self.diagnostics.push(
                        Diagnostic::new(
                            line_num,
                            Severity::Error,
                            AsmError::new(AsmErrorKind::Parser, &err.message, None),
                        )
                        .with_column(err.column),
                    );
                    counts.errors += 1;
                    self.parsed.push(None);
                    continue;
                }
            };
            let Some(line) = line else {
                self.parsed.push(None);
                continue;
            };

            if let Some(label) = &line.label {
                if line.mnemonic.eq_ignore_ascii_case("START") {
                    self.program_name = Some(label.clone());
                }
                if self.state.define_symbol(label, self.state.address()).is_some() {
                    self.diagnostics.push(Diagnostic::new(
                        line_num,
                        Severity::Warning,
                        AsmError::new(AsmErrorKind::Symbol, "Label redefined", Some(label)),
                    ));
                    counts.warnings += 1;
                }
            }

            if encoder::size_of_line(&mut self.state, &line).is_some() {
                self.parsed.push(Some(line));
            } else {
                self.diagnostics.push(Diagnostic::new(
                    line_num,
                    Severity::Error,
                    unsized_line_error(&line),
                ));
                counts.errors += 1;
                self.parsed.push(None);
            }
        }

        counts.lines = lines.len() as u32;
        counts
    }

    /// Pass 2: encode every parsed line, write the listing, and build the
    /// output image.
    pub fn pass2<W: Write>(
        &mut self,
        lines: &[String],
        listing: &mut ListingWriter<W>,
    ) -> std::io::Result<PassCounts> {
        self.state.reset_address();
        self.image.clear();
        let mut counts = PassCounts::new();

        for (idx, src) in lines.iter().enumerate() {
            let line_num = idx as u32 + 1;
            let addr = self.state.address();
            let Some(line) = self.parsed.get(idx).cloned().flatten() else {
                listing.write_line(ListingLine {
                    addr,
                    bytes: &[],
                    line_num,
                    source: src,
                })?;
                continue;
            };

            if let Some(name) = self.undefined_operand_symbol(&line) {
                self.diagnostics.push(Diagnostic::new(
                    line_num,
                    Severity::Warning,
                    AsmError::new(
                        AsmErrorKind::Symbol,
                        "Undefined symbol encoded as the current address",
                        Some(&name),
                    ),
                ));
                counts.warnings += 1;
            }

            match encoder::encode_line(&mut self.state, &line) {
                Some(bytes) => {
                    listing.write_line(ListingLine {
                        addr,
                        bytes: &bytes,
                        line_num,
                        source: src,
                    })?;
                    self.image.extend_from_slice(&bytes);
                }
                None => {
                    listing.write_line(ListingLine {
                        addr,
                        bytes: &[],
                        line_num,
                        source: src,
                    })?;
                    self.diagnostics.push(Diagnostic::new(
                        line_num,
                        Severity::Error,
                        unsized_line_error(&line),
                    ));
                    counts.errors += 1;
                }
            }
        }

        counts.lines = lines.len() as u32;
        Ok(counts)
    }

    /// A symbolic format-3/4 operand with no binding encodes as the
    /// current address; worth a warning before it happens.
    fn undefined_operand_symbol(&self, line: &Line) -> Option<String> {
        match encoder::select_format(&self.state, line) {
            Some(Format::Three | Format::Four) => match line.operands.first() {
                Some(Operand {
                    value: Value::Symbol(name),
                    ..
                }) if self.state.lookup_symbol(name).is_none() => Some(name.clone()),
                _ => None,
            },
            _ => None,
        }
    }
}

fn unsized_line_error(line: &Line) -> AsmError {
    if instructions::has_mnemonic(&line.mnemonic) {
        AsmError::new(
            AsmErrorKind::Instruction,
            "Operands do not fit any permitted format",
            Some(&line.mnemonic),
        )
    } else if instructions::is_directive(&line.mnemonic) {
        AsmError::new(
            AsmErrorKind::Directive,
            "Malformed directive operands",
            Some(&line.mnemonic),
        )
    } else {
        AsmError::new(
            AsmErrorKind::Instruction,
            "Unknown mnemonic",
            Some(&line.mnemonic),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Severity;

    fn source(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|line| line.to_string()).collect()
    }

    fn run_both_passes(lines: &[&str]) -> (Assembler, PassCounts, PassCounts) {
        let lines = source(lines);
        let mut assembler = Assembler::new();
        let pass1 = assembler.pass1(&lines);
        let mut sink = Vec::new();
        let mut listing = ListingWriter::new(&mut sink);
        let pass2 = assembler
            .pass2(&lines, &mut listing)
            .expect("listing writes to memory");
        (assembler, pass1, pass2)
    }

    #[test]
    fn clean_program_produces_an_image() {
        let (assembler, pass1, pass2) = run_both_passes(&[
            "PROG START 0",
            "FIRST LDA FIVE",
            "      STA RESULT",
            "      RSUB",
            "FIVE  WORD 5",
            "RESULT RESW 1",
            "      END FIRST",
        ]);
        assert_eq!(pass1.errors, 0);
        assert_eq!(pass2.errors, 0);
        assert_eq!(assembler.program_name(), Some("PROG"));
        assert_eq!(assembler.symbols().lookup("FIVE"), Some(9));
        assert_eq!(assembler.image().len(), 15);
        assert_eq!(&assembler.image()[..3], &[0x03, 0x20, 0x06]);
    }

    #[test]
    fn unknown_mnemonic_is_an_error_diagnostic() {
        let (assembler, pass1, _) = run_both_passes(&["  FROB 1", "  RSUB"]);
        assert_eq!(pass1.errors, 1);
        let diag = &assembler.diagnostics()[0];
        assert_eq!(diag.severity(), Severity::Error);
        assert!(diag.message().contains("Unknown mnemonic: FROB"));
        assert_eq!(diag.line(), 1);
    }

    #[test]
    fn pass1_keeps_going_past_a_bad_line() {
        let (assembler, pass1, _) =
            run_both_passes(&["  FROB 1", "LATER RSUB"]);
        assert_eq!(pass1.errors, 1);
        // The driver still binds labels after the failure so every
        // problem surfaces in one run.
        assert_eq!(assembler.symbols().lookup("LATER"), Some(0));
    }

    #[test]
    fn duplicate_label_warns_and_overwrites() {
        let (assembler, pass1, _) = run_both_passes(&["TWICE RSUB", "TWICE RSUB"]);
        assert_eq!(pass1.warnings, 1);
        assert_eq!(pass1.errors, 0);
        assert_eq!(assembler.symbols().lookup("TWICE"), Some(3));
        assert!(assembler.diagnostics()[0]
            .message()
            .contains("Label redefined: TWICE"));
    }

    #[test]
    fn undefined_symbol_warns_in_pass2() {
        let (assembler, _, pass2) = run_both_passes(&["  J NOWHERE"]);
        assert_eq!(pass2.warnings, 1);
        assert_eq!(pass2.errors, 0);
        assert!(assembler.diagnostics()[0]
            .message()
            .contains("Undefined symbol"));
    }

    #[test]
    fn register_operands_do_not_warn_as_undefined() {
        let (assembler, _, pass2) = run_both_passes(&["  CLEAR A", "  COMPR A,X"]);
        assert_eq!(pass2.warnings, 0);
        assert!(assembler.diagnostics().is_empty());
    }

    #[test]
    fn malformed_directive_is_reported_per_line() {
        let (assembler, pass1, _) = run_both_passes(&["  WORD FIVE,SIX"]);
        assert_eq!(pass1.errors, 1);
        assert!(assembler.diagnostics()[0]
            .message()
            .contains("Malformed directive operands: WORD"));
    }
}
