// src/lib.rs
// ============================================================================
// STABLELM-QUANTIZE - Cuantizador de modelos GGML (f32/f16 -> Q4/Q5/Q8)
// ============================================================================

pub mod driver;
pub mod error;
pub mod ggml;
pub mod pipeline;
pub mod policy;
pub mod quant;

// Re-exports principales
pub use driver::{process_tensors, ConvertStats};
pub use error::{Error, Result};
pub use ggml::{ContainerHeader, GgmlType, Hyperparameters, TensorHeader, Vocab};
pub use pipeline::{convert, quantize_model, ConvertReport, OutputGuard};
pub use policy::QuantizationPolicy;
pub use quant::{quantize_tensor_block, BlockQuantizer, FType, NumericTables, TensorQuantizer};
