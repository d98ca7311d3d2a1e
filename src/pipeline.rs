// src/pipeline.rs
// ============================================================================
// PIPELINE - header -> hparams -> vocab -> tensores
// ============================================================================
//
// Recursos con ámbito:
// - NumericTables: se liberan al salir, con éxito o con error
// - OutputGuard:   borra el fichero de salida salvo que se haga commit
//
// ============================================================================

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use crate::driver::{process_tensors, ConvertStats};
use crate::error::{Error, IoResultExt, Result};
use crate::ggml::{copy_vocab, read_header, read_hparams, write_header, write_hparams};
use crate::ggml::{ContainerHeader, Hyperparameters};
use crate::policy::QuantizationPolicy;
use crate::quant::{BlockQuantizer, FType, NumericTables, TensorQuantizer};

/// Resumen de una conversión completa
#[derive(Debug, Clone)]
pub struct ConvertReport {
    pub header: ContainerHeader,
    pub hparams: Hyperparameters,
    pub vocab_size: usize,
    pub stats: ConvertStats,
}

/// Borra el fichero de salida en Drop salvo que se llame a `commit`.
pub struct OutputGuard {
    path: PathBuf,
    armed: bool,
}

impl OutputGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), armed: true }
    }

    pub fn commit(mut self) {
        self.armed = false;
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => log::warn!("removed incomplete output '{}'", self.path.display()),
            Err(e) => log::warn!("could not remove incomplete output '{}': {}", self.path.display(), e),
        }
    }
}

/// Conversión sobre streams ya abiertos.
pub fn convert<R, W, Q>(
    r: &mut R,
    w: &mut W,
    target: FType,
    policy: &QuantizationPolicy,
    quantizer: &Q,
) -> Result<ConvertReport>
where
    R: Read,
    W: Write,
    Q: TensorQuantizer + ?Sized,
{
    let header = read_header(r)?;
    write_header(w, &header)?;
    log::debug!("container dialect: {}", header.dialect());

    let hparams = read_hparams(r)?;
    hparams.log();
    write_hparams(w, &hparams, target)?;

    let vocab = copy_vocab(r, w, hparams.n_vocab)?;

    let stats = process_tensors(r, w, target, policy, quantizer)?;

    Ok(ConvertReport {
        header,
        hparams,
        vocab_size: vocab.len(),
        stats,
    })
}

fn progress_bar(total: u64, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::with_template(
        "  [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
    ) {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

/// Cuantiza `input` en `output`. Si algo falla, `output` no queda en disco.
pub fn quantize_model(
    input: &Path,
    output: &Path,
    target: FType,
    policy: &QuantizationPolicy,
    show_progress: bool,
) -> Result<ConvertReport> {
    log::info!("loading model from '{}'", input.display());

    let fin = File::open(input)
        .map_err(|e| Error::io(format!("failed to open '{}' for reading", input.display()), e))?;
    let input_len = fin.metadata().map(|m| m.len()).unwrap_or(0);

    let fout = File::create(output)
        .map_err(|e| Error::io(format!("failed to open '{}' for writing", output.display()), e))?;

    // Orden de declaración = orden inverso de Drop: writer se cierra antes que guard
    let guard = OutputGuard::new(output);
    let tables = NumericTables::init();
    let quantizer = BlockQuantizer::new(&tables);

    let pb = progress_bar(input_len, show_progress);
    let mut reader = BufReader::new(pb.wrap_read(fin));
    let mut writer = BufWriter::new(fout);

    let report = convert(&mut reader, &mut writer, target, policy, &quantizer)?;

    writer.flush().section("output")?;
    drop(writer);
    pb.finish_and_clear();

    guard.commit();
    Ok(report)
}
