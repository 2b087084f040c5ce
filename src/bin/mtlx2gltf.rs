//! MaterialX to glTF conversion CLI tool.
//!
//! Writes the `gltf_pbr` materials of a MaterialX document as glTF,
//! optionally embedding preview geometry and packaging a GLB file.
//! When given a directory, every `.mtlx` file below it is converted in
//! parallel.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use materialxgltf::batch::{collect_files, output_path, run_batch};
use materialxgltf::mtlx::parse_mtlx_file;
use materialxgltf::mtlx2gltf::{MtlxToGltfOptions, MtlxToGltfWriter};

const OUTPUT_SUFFIX: &str = ".gltf";

/// Convert MaterialX materials to glTF.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// MaterialX file or directory of MaterialX files to convert.
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// Name of the glTF output file. Defaults to the input name with a
    /// `.gltf` suffix. Ignored for directories.
    #[arg(long)]
    gltf_file_name: Option<PathBuf>,

    /// glTF or GLB file whose geometry is embedded in the output.
    #[arg(long)]
    gltf_geom_file_name: Option<PathBuf>,

    /// Create a copy of the geometry for every material.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = false)]
    prims_per_material: bool,

    /// Also write a binary GLB file next to the glTF file.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = false)]
    package_binary: bool,

    /// Translate standard_surface shaders to gltf_pbr first.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = false)]
    translate_shaders: bool,

    /// Bind materials to geometry using the look material assignments.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = false)]
    assign_from_looks: bool,

    /// Export node graph textures as KHR_procedurals.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = false)]
    create_procedurals: bool,

    /// Additional directories searched for images (can be specified multiple times).
    #[arg(long = "search-path", short = 'p')]
    search_paths: Vec<PathBuf>,

    /// Skip files matching these patterns (can be specified multiple times).
    #[arg(long = "skip", short = 'x')]
    skip_patterns: Vec<String>,

    /// Show detailed output for each file.
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// Convert one file, returning the last path written.
fn convert_file(input: &Path, output: &Path, options: &MtlxToGltfOptions) -> Result<PathBuf> {
    let mut doc = parse_mtlx_file(input)?;

    let mut options = options.clone();
    if let Some(dir) = input.parent() {
        options.search_path.append(dir);
    }
    let mut writer = MtlxToGltfWriter::new(options);

    if writer.options().translate_shaders {
        let translated = writer.translate_shaders(&mut doc);
        log::info!("- Translated {} shaders", translated);
    }

    let json = writer.convert(&doc)?;
    std::fs::write(output, json).with_context(|| format!("Failed to write glTF file: {}", output.display()))?;
    log::info!("> Wrote glTF to: {}", output.display());

    if writer.options().package_binary {
        let glb = output.with_extension("glb");
        let report = writer.package_glb(output, &glb)?;
        for image in &report.images {
            log::info!("  - Embedded image: {}", image);
        }
        for buffer in &report.buffers {
            log::info!("  - Embedded buffer: {}", buffer);
        }
        return Ok(glb);
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

    let mut options = MtlxToGltfOptions {
        translate_shaders: args.translate_shaders,
        package_binary: args.package_binary,
        geometry_file: args.gltf_geom_file_name.clone(),
        prims_per_material: args.prims_per_material,
        assign_from_looks: args.assign_from_looks,
        debug_output: args.verbose,
        create_procedural_textures: args.create_procedurals,
        ..Default::default()
    };
    for path in &args.search_paths {
        options.search_path.append(path);
    }

    if args.path.is_file() {
        let output = args
            .gltf_file_name
            .clone()
            .unwrap_or_else(|| output_path(&args.path, OUTPUT_SUFFIX));
        match convert_file(&args.path, &output, &options) {
            Ok(written) => {
                println!(
                    "Converted MaterialX file {} to glTF file: {}. Status: true.",
                    args.path.display(),
                    written.display()
                );
            }
            Err(err) => {
                println!(
                    "Converted MaterialX file {} to glTF file: {}. Status: false.",
                    args.path.display(),
                    output.display()
                );
                eprintln!("- Error: {:#}", err);
                std::process::exit(1);
            }
        }
        return;
    }

    let files = collect_files(&args.path, &["mtlx"], &args.skip_patterns);
    if files.is_empty() {
        eprintln!("No MaterialX files found in: {}", args.path.display());
        std::process::exit(1);
    }
    println!("Converting {} MaterialX files...\n", files.len());

    let summary = run_batch(&files, !args.verbose, |file| {
        convert_file(file, &output_path(file, OUTPUT_SUFFIX), &options)
    });
    summary.print(&args.path, args.verbose);

    if !summary.is_success() {
        std::process::exit(1);
    }
}
