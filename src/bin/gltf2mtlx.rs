//! glTF to MaterialX conversion CLI tool.
//!
//! Converts the materials of a `.gltf` or `.glb` file to a MaterialX
//! document, validates it and writes it next to the input. When given a
//! directory, every glTF file below it is converted in parallel.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;

use materialxgltf::batch::{collect_files, output_path, run_batch};
use materialxgltf::gltf2mtlx::{GltfToMtlxOptions, GltfToMtlxReader};

const OUTPUT_SUFFIX: &str = "_converted.mtlx";

/// Convert glTF materials to MaterialX.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// glTF file or directory of glTF files to convert.
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// Name of the MaterialX output file. Defaults to the input name with a
    /// `_converted.mtlx` suffix. Ignored for directories.
    #[arg(long)]
    mtlx_file_name: Option<PathBuf>,

    /// Create a look with material assignments.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
    create_assignments: bool,

    /// Add all definition inputs to generated shader nodes.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = false)]
    add_all_inputs: bool,

    /// Skip files matching these patterns (can be specified multiple times).
    #[arg(long = "skip", short = 'x')]
    skip_patterns: Vec<String>,

    /// Show detailed output for each file.
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// Convert one file, returning the written MaterialX path.
///
/// The document is written even when validation fails so it can be
/// inspected, but the conversion is reported as failed.
fn convert_file(input: &Path, output: &Path, options: &GltfToMtlxOptions) -> Result<PathBuf> {
    let mut reader = GltfToMtlxReader::new(options.clone());
    let doc = reader.convert_file(input)?;
    doc.write_file(output)?;

    let errors = doc.validate();
    if !errors.is_empty() {
        anyhow::bail!("Validation errors in {}: {}", output.display(), errors.join("; "));
    }
    Ok(output.to_path_buf())
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if !args.path.exists() {
        eprintln!("Cannot find input file: {}", args.path.display());
        std::process::exit(1);
    }

    let options = GltfToMtlxOptions {
        create_assignments: args.create_assignments,
        add_all_inputs: args.add_all_inputs,
        debug_output: args.verbose,
    };

    if args.path.is_file() {
        let output = args
            .mtlx_file_name
            .clone()
            .unwrap_or_else(|| output_path(&args.path, OUTPUT_SUFFIX));
        match convert_file(&args.path, &output, &options) {
            Ok(written) => {
                println!(
                    "Converted glTF file {} to MaterialX file: {}. Status: true.",
                    args.path.display(),
                    written.display()
                );
            }
            Err(err) => {
                println!(
                    "Converted glTF file {} to MaterialX file: {}. Status: false.",
                    args.path.display(),
                    output.display()
                );
                eprintln!("- Error: {:#}", err);
                std::process::exit(1);
            }
        }
        return;
    }

    let files = collect_files(&args.path, &["gltf", "glb"], &args.skip_patterns);
    if files.is_empty() {
        eprintln!("No glTF files found in: {}", args.path.display());
        std::process::exit(1);
    }
    println!("Converting {} glTF files...\n", files.len());

    let summary = run_batch(&files, !args.verbose, |file| {
        convert_file(file, &output_path(file, OUTPUT_SUFFIX), &options)
    });
    summary.print(&args.path, args.verbose);

    if !summary.is_success() {
        std::process::exit(1);
    }
}
