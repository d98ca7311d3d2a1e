// src/ggml/mod.rs
// ============================================================================
// GGML - Contenedor binario (header, hparams, vocab, tensores)
// ============================================================================

pub mod header;
pub mod hparams;
pub mod tensor;
pub mod vocab;

pub use header::{read_header, write_header, ContainerHeader, MAGIC_UNVERSIONED, MAGIC_VERSIONED};
pub use hparams::{read_hparams, write_hparams, Hyperparameters};
pub use tensor::{
    copy_payload, read_payload, read_tensor_header, skip_payload, write_tensor_header, GgmlType,
    TensorHeader, QK,
};
pub use vocab::{copy_vocab, Vocab};
