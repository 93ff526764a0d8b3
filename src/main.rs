// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for sicforge.

use sicforge::assembler::cli;

fn main() {
    match cli::run() {
        Ok(report) => {
            for diag in report.diagnostics() {
                eprintln!("{}", diag.format_with_context(Some(report.source_lines())));
            }
            let warnings = report.warning_count();
            if warnings > 0 {
                eprintln!("{warnings} warning(s)");
            }
        }
        Err(err) => {
            for diag in err.diagnostics() {
                eprintln!("{}", diag.format_with_context(Some(err.source_lines())));
            }
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
