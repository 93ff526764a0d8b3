// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line surface and run flow.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Parser;

use super::listing::ListingWriter;
use super::{output, Assembler};
use crate::error::{AsmError, AsmErrorKind, AsmRunError, AsmRunReport, PassCounts};

pub const VERSION: &str = "1.0";
const LONG_ABOUT: &str = "SIC/XE Assembler with listing, object record and binary outputs.

Outputs are opt-in: specify at least one of -l/--list, -x/--obj, -b/--bin,
or --labels. Use -o/--outfile to set the output base name when filenames
are omitted.";

#[derive(Parser, Debug)]
#[command(
    name = "sicforge",
    version = VERSION,
    about = "SIC/XE Assembler with listing, object record and binary outputs",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    #[arg(
        short = 'l',
        long = "list",
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = "",
        long_help = "Emit a listing file. FILE is optional; when omitted, the output base is used and a .lst extension is added."
    )]
    pub list_name: Option<String>,
    #[arg(
        short = 'x',
        long = "obj",
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = "",
        long_help = "Emit a textual object program (H/T/E records). FILE is optional; when omitted, the output base is used and a .obj extension is added."
    )]
    pub obj_name: Option<String>,
    #[arg(
        short = 'b',
        long = "bin",
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = "",
        long_help = "Emit the raw binary image. FILE is optional; when omitted, the output base is used and a .bin extension is added."
    )]
    pub bin_name: Option<String>,
    #[arg(
        short = 'o',
        long = "outfile",
        value_name = "BASE",
        long_help = "Output filename base when -l/-x/-b omit filenames. Defaults to the input base."
    )]
    pub outfile: Option<String>,
    #[arg(
        long = "labels",
        value_name = "FILE",
        long_help = "Emit a labels file with every symbol and its address."
    )]
    pub labels_name: Option<String>,
    #[arg(
        long = "json",
        long_help = "Write the labels file as JSON instead of NAME = $HEX lines."
    )]
    pub json: bool,
    #[arg(
        short = 'i',
        long = "infile",
        value_name = "FILE",
        long_help = "Input assembly file. Must end with .asm."
    )]
    pub infile: Option<PathBuf>,
}

/// Validated CLI configuration with resolved output paths.
#[derive(Debug)]
pub struct CliConfig {
    pub input: PathBuf,
    pub list_path: Option<PathBuf>,
    pub obj_path: Option<PathBuf>,
    pub bin_path: Option<PathBuf>,
    pub labels_path: Option<PathBuf>,
    pub json: bool,
}

fn cli_error(msg: &str) -> AsmRunError {
    AsmRunError::new(
        AsmError::new(AsmErrorKind::Cli, msg, None),
        Vec::new(),
        Vec::new(),
    )
}

pub fn validate_cli(cli: &Cli) -> Result<CliConfig, AsmRunError> {
    let Some(input) = cli.infile.clone() else {
        return Err(cli_error("No input file specified. Use -i/--infile"));
    };
    let input_str = input.to_string_lossy();
    let Some(base) = input_str.strip_suffix(".asm") else {
        return Err(cli_error("Input file must end with .asm"));
    };

    if cli.list_name.is_none()
        && cli.obj_name.is_none()
        && cli.bin_name.is_none()
        && cli.labels_name.is_none()
    {
        return Err(cli_error(
            "No outputs selected. Specify at least one of -l/--list, -x/--obj, -b/--bin, or --labels",
        ));
    }
    if cli.json && cli.labels_name.is_none() {
        return Err(cli_error("--json requires a labels output (--labels)"));
    }

    let base = cli.outfile.clone().unwrap_or_else(|| base.to_string());
    Ok(CliConfig {
        input,
        list_path: resolve_output_path(&base, cli.list_name.as_deref(), "lst"),
        obj_path: resolve_output_path(&base, cli.obj_name.as_deref(), "obj"),
        bin_path: resolve_output_path(&base, cli.bin_name.as_deref(), "bin"),
        labels_path: cli.labels_name.as_deref().map(PathBuf::from),
        json: cli.json,
    })
}

fn resolve_output_path(base: &str, name: Option<&str>, ext: &str) -> Option<PathBuf> {
    match name {
        None => None,
        Some("") => Some(PathBuf::from(format!("{base}.{ext}"))),
        Some(name) => Some(PathBuf::from(name)),
    }
}

/// Run the assembler with command-line arguments.
pub fn run() -> Result<AsmRunReport, AsmRunError> {
    let cli = Cli::parse();
    run_with_cli(&cli)
}

pub fn run_with_cli(cli: &Cli) -> Result<AsmRunReport, AsmRunError> {
    let config = validate_cli(cli)?;

    let source = fs::read_to_string(&config.input).map_err(|err| {
        AsmRunError::new(
            AsmError::new(
                AsmErrorKind::Io,
                &format!("Error reading input file: {err}"),
                Some(config.input.to_string_lossy().as_ref()),
            ),
            Vec::new(),
            Vec::new(),
        )
    })?;
    let lines: Vec<String> = source.lines().map(|line| line.to_string()).collect();

    let mut assembler = Assembler::new();
    let pass1 = assembler.pass1(&lines);

    let mut list_out: Box<dyn Write> = match &config.list_path {
        Some(path) => Box::new(File::create(path).map_err(|_| {
            open_failure(path, assembler.take_diagnostics(), &lines)
        })?),
        None => Box::new(io::sink()),
    };
    let mut listing = ListingWriter::new(&mut list_out);
    let pass2 = write_listing_and_encode(&mut assembler, &lines, &mut listing)
        .map_err(|err| io_failure(&err, assembler.take_diagnostics(), &lines))?;

    if pass1.errors > 0 || pass2.errors > 0 {
        return Err(AsmRunError::new(
            AsmError::new(
                AsmErrorKind::Assembler,
                "Errors detected in source. No output files created.",
                None,
            ),
            assembler.take_diagnostics(),
            lines,
        ));
    }

    if let Some(path) = &config.obj_path {
        let name = assembler.program_name().unwrap_or("OBJ").to_string();
        let mut file = File::create(path)
            .map_err(|_| open_failure(path, assembler.take_diagnostics(), &lines))?;
        output::write_object_records(&mut file, &name, assembler.image())
            .map_err(|err| io_failure(&err, assembler.take_diagnostics(), &lines))?;
    }

    if let Some(path) = &config.bin_path {
        let mut file = File::create(path)
            .map_err(|_| open_failure(path, assembler.take_diagnostics(), &lines))?;
        output::write_binary(&mut file, assembler.image())
            .map_err(|err| io_failure(&err, assembler.take_diagnostics(), &lines))?;
    }

    if let Some(path) = &config.labels_path {
        output::emit_labels_file(path, config.json, assembler.symbols()).map_err(|err| {
            AsmRunError::new(err, assembler.take_diagnostics(), lines.clone())
        })?;
    }

    Ok(AsmRunReport::new(assembler.take_diagnostics(), lines))
}

fn write_listing_and_encode<W: Write>(
    assembler: &mut Assembler,
    lines: &[String],
    listing: &mut ListingWriter<W>,
) -> io::Result<PassCounts> {
    listing.header(&format!("sicforge Assembler v{VERSION}"))?;
    let counts = assembler.pass2(lines, listing)?;
    listing.footer(assembler.symbols())?;
    Ok(counts)
}

fn open_failure(
    path: &Path,
    diagnostics: Vec<crate::error::Diagnostic>,
    lines: &[String],
) -> AsmRunError {
    AsmRunError::new(
        AsmError::new(
            AsmErrorKind::Io,
            "Error opening file for write",
            Some(path.to_string_lossy().as_ref()),
        ),
        diagnostics,
        lines.to_vec(),
    )
}

fn io_failure(
    err: &io::Error,
    diagnostics: Vec<crate::error::Diagnostic>,
    lines: &[String],
) -> AsmRunError {
    AsmRunError::new(
        AsmError::new(AsmErrorKind::Io, &err.to_string(), None),
        diagnostics,
        lines.to_vec(),
    )
}
