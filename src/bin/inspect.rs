// src/bin/inspect.rs
// ============================================================================
// GGML INSPECTOR - Inspecciona estructura de modelos GGML (StableLM)
// ============================================================================
//
// Uso: stablelm-inspect ggml-model-q4_0.bin
//
// ============================================================================

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use stablelm_quantize::ggml::hparams::HPARAMS_SIZE;
use stablelm_quantize::ggml::{copy_vocab, read_header, read_hparams, read_tensor_header, skip_payload};
use stablelm_quantize::FType;

#[derive(Parser)]
#[command(name = "stablelm-inspect")]
#[command(about = "Inspect GGML StableLM model structure")]
struct Args {
    /// GGML model file to inspect
    file: PathBuf,

    /// Only print the header and hyperparameters
    #[arg(long)]
    no_tensors: bool,
}

fn format_size(size: u64) -> String {
    if size == 0 {
        "vacío".to_string()
    } else if size < 1024 {
        format!("{} B", size)
    } else if size < 1024 * 1024 {
        format!("{:.1} KB", size as f64 / 1024.0)
    } else if size < 1024 * 1024 * 1024 {
        format!("{:.1} MB", size as f64 / 1024.0 / 1024.0)
    } else {
        format!("{:.2} GB", size as f64 / 1024.0 / 1024.0 / 1024.0)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let file_size = std::fs::metadata(&args.file)
        .with_context(|| format!("Cannot stat {}", args.file.display()))?
        .len();
    let f = File::open(&args.file)
        .with_context(|| format!("Cannot open {}", args.file.display()))?;
    let mut r = BufReader::new(f);

    let header = read_header(&mut r)?;
    let hparams = read_hparams(&mut r)?;
    // El vocab se valida pero no se imprime
    let vocab = copy_vocab(&mut r, &mut io::sink(), hparams.n_vocab)?;

    let ftype = FType::from_id(hparams.ftype)
        .map(|t| t.name().to_string())
        .unwrap_or_else(|| format!("desconocido ({})", hparams.ftype));

    println!();
    println!("════════════════════════════════════════════════════════════════════════════════");
    println!("  GGML INSPECTOR");
    println!("════════════════════════════════════════════════════════════════════════════════");
    println!("  Archivo:      {}", args.file.display());
    println!("  Tamaño real:  {}", format_size(file_size));
    println!();
    println!("┌──────────────────────────────────────────────────────────────────────────────┐");
    println!("│ HEADER                                                                       │");
    println!("├──────────────────────────────────────────────────────────────────────────────┤");
    println!("│  Magic:          0x{:08x} ({})", header.magic, header.dialect());
    if let Some(version) = header.version {
        println!("│  Versión:        {}", version);
    }
    println!("│  Vocab offset:   0x{:X}", header.size() + HPARAMS_SIZE);
    println!("│  n_vocab:        {}", hparams.n_vocab);
    println!("│  n_ctx:          {}", hparams.n_ctx);
    println!("│  n_embd:         {}", hparams.n_embd);
    println!("│  n_head:         {}", hparams.n_head);
    println!("│  n_layer:        {}", hparams.n_layer);
    println!("│  n_rot:          {}", hparams.n_rot);
    println!("│  par_res:        {}", hparams.use_parallel_residual);
    println!("│  ftype:          {}", ftype);
    println!("│  vocab leído:    {} tokens únicos", vocab.len());
    println!("└──────────────────────────────────────────────────────────────────────────────┘");
    println!();

    if args.no_tensors {
        return Ok(());
    }

    println!("┌──────────────────────────────────────────────────────────────────────────────┐");
    println!("│ TENSORES                                                                     │");
    println!("├──────────────────────────────────────────────────────────────────────────────┤");

    let mut by_type: BTreeMap<&'static str, (usize, u64)> = BTreeMap::new();
    let mut count = 0usize;
    let mut quantized_bytes = 0u64;

    while let Some(t) = read_tensor_header(&mut r)? {
        let size = t.payload_size()?;
        skip_payload(&mut r, size)?;

        let [ne0, ne1, ne2] = t.ne3();
        println!(
            "│  {:48} [{:5}, {:5}, {:5}] {:>5} {:>10}",
            t.name_str(),
            ne0,
            ne1,
            ne2,
            t.ttype,
            format_size(size as u64)
        );

        let entry = by_type.entry(t.ttype.name()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += size as u64;
        count += 1;
        if t.ttype.is_quantized() {
            quantized_bytes += size as u64;
        }
    }

    println!("├──────────────────────────────────────────────────────────────────────────────┤");
    for (name, (n, bytes)) in &by_type {
        println!("│  {:6} {:5} tensores  {:>12}", name, n, format_size(*bytes));
    }
    println!("│  total  {:5} tensores", count);
    println!("│  cuantizado      {:>12}", format_size(quantized_bytes));
    println!("└──────────────────────────────────────────────────────────────────────────────┘");
    println!();

    Ok(())
}
