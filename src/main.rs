// src/main.rs
// ============================================================================
// STABLELM-QUANTIZE CLI
// ============================================================================
//
// Uso:
//   stablelm-quantize models/stablelm/ggml-model-f16.bin models/stablelm/ggml-model-q4_0.bin q4_0
//
// Con política propia:
//   stablelm-quantize in.bin out.bin q5_1 --policy policy.json
//
// Código de salida: 0 si todo fue bien, 1 ante cualquier fallo.
//
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;

use stablelm_quantize::{quantize_model, FType, QuantizationPolicy};

#[derive(Parser, Debug)]
#[command(name = "stablelm-quantize")]
#[command(about = "Quantize a GGML StableLM model (f32/f16) to Q4/Q5/Q8 block formats")]
#[command(version = "0.1.0")]
struct Args {
    /// Input model (f32 or f16 GGML file)
    #[arg(value_name = "MODEL")]
    input: PathBuf,

    /// Output quantized model
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Target encoding: q4_0, q4_1, q5_0, q5_1, q8_0 (or its numeric id)
    #[arg(value_name = "TYPE")]
    ftype: String,

    /// JSON policy file: {"eligible": [...], "excluded": [...], "only_2d": true}
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn usage_error(err: clap::Error) -> ExitCode {
    let _ = err.print();
    eprint!("\nsupported types:\n{}", FType::usage());
    ExitCode::from(1)
}

fn run(args: Args) -> Result<()> {
    let main_start = Instant::now();

    // Se valida todo antes de tocar ficheros
    let ftype: FType = args.ftype.parse()?;

    let policy = match &args.policy {
        Some(path) => QuantizationPolicy::from_file(path)
            .with_context(|| format!("Failed to load policy {}", path.display()))?,
        None => QuantizationPolicy::stablelm(),
    };

    println!("═══════════════════════════════════════════════════════════════");
    println!("  STABLELM QUANTIZE v0.1.0");
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Input:   {}", args.input.display());
    println!("  Output:  {}", args.output.display());
    println!("  Type:    {} ({})", ftype, ftype.id());
    println!("  2D only: {}", if policy.only_2d() { "ON" } else { "OFF" });
    println!("═══════════════════════════════════════════════════════════════");

    let quantize_start = Instant::now();
    let report = quantize_model(&args.input, &args.output, ftype, &policy, !args.no_progress)
        .with_context(|| format!("failed to quantize model from '{}'", args.input.display()))?;
    let quantize_ms = quantize_start.elapsed().as_secs_f64() * 1000.0;

    let stats = &report.stats;
    println!("\n═══════════════════════════════════════════════════════════════");
    println!("  QUANTIZATION COMPLETE");
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Dialect:    {}", report.header.dialect());
    println!("  Vocab:      {} tokens", report.vocab_size);
    println!("  Tensors:    {} (quantized: {}, copied: {})",
        stats.total_tensors(), stats.quantized_count, stats.copied_count);
    println!("  Model size: {:8.2} MB", stats.total_size_org as f64 / 1024.0 / 1024.0);
    println!("  Quant size: {:8.2} MB", stats.total_size_new as f64 / 1024.0 / 1024.0);
    println!("  quantize time = {:8.2} ms", quantize_ms);
    println!("     total time = {:8.2} ms", main_start.elapsed().as_secs_f64() * 1000.0);
    println!("═══════════════════════════════════════════════════════════════");

    Ok(())
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => return usage_error(e),
    };

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .target(env_logger::Target::Stdout)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
