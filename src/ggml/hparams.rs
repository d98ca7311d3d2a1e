// src/ggml/hparams.rs
// ============================================================================
// HPARAMS - Bloque fijo de 8 × i32 (StableLM / GPT-NeoX)
// ============================================================================
//
// Layout (orden = contrato de wire):
//   [0:4]   n_vocab
//   [4:8]   n_ctx
//   [8:12]  n_embd
//   [12:16] n_head
//   [16:20] n_layer
//   [20:24] n_rot
//   [24:28] use_parallel_residual
//   [28:32] ftype
//
// ============================================================================

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{IoResultExt, Result};
use crate::quant::FType;

pub const HPARAMS_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hyperparameters {
    pub n_vocab: i32,
    pub n_ctx: i32,
    pub n_embd: i32,
    pub n_head: i32,
    pub n_layer: i32,
    pub n_rot: i32,
    pub use_parallel_residual: i32,
    pub ftype: i32,
}

/// Defaults de StableLM 3B
impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            n_vocab: 50257,
            n_ctx: 4096,
            n_embd: 4096,
            n_head: 32,
            n_layer: 16,
            n_rot: 32,
            use_parallel_residual: 1,
            ftype: 1,
        }
    }
}

impl Hyperparameters {
    fn fields(&self) -> [(&'static str, i32); 8] {
        [
            ("n_vocab", self.n_vocab),
            ("n_ctx", self.n_ctx),
            ("n_embd", self.n_embd),
            ("n_head", self.n_head),
            ("n_layer", self.n_layer),
            ("n_rot", self.n_rot),
            ("use_parallel_residual", self.use_parallel_residual),
            ("ftype", self.ftype),
        ]
    }

    /// Vuelca los campos al log (el "colaborador de observabilidad")
    pub fn log(&self) {
        for (name, value) in self.fields() {
            log::info!("{:<21} = {}", name, value);
        }
    }
}

pub fn read_hparams<R: Read>(r: &mut R) -> Result<Hyperparameters> {
    let mut next = || r.read_i32::<LittleEndian>().section("hparams");

    Ok(Hyperparameters {
        n_vocab: next()?,
        n_ctx: next()?,
        n_embd: next()?,
        n_head: next()?,
        n_layer: next()?,
        n_rot: next()?,
        use_parallel_residual: next()?,
        ftype: next()?,
    })
}

/// Escribe los hparams sustituyendo `ftype` por el encoding destino.
pub fn write_hparams<W: Write>(w: &mut W, hparams: &Hyperparameters, target: FType) -> Result<()> {
    let patched = Hyperparameters {
        ftype: target.id(),
        ..*hparams
    };

    for (_, value) in patched.fields() {
        w.write_i32::<LittleEndian>(value).section("hparams")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Cursor;

    fn sample_bytes() -> Vec<u8> {
        [10i32, 2048, 64, 4, 2, 16, 1, 0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect()
    }

    #[test]
    fn test_read_order() {
        let hp = read_hparams(&mut Cursor::new(sample_bytes())).unwrap();
        assert_eq!(hp.n_vocab, 10);
        assert_eq!(hp.n_ctx, 2048);
        assert_eq!(hp.n_embd, 64);
        assert_eq!(hp.n_head, 4);
        assert_eq!(hp.n_layer, 2);
        assert_eq!(hp.n_rot, 16);
        assert_eq!(hp.use_parallel_residual, 1);
        assert_eq!(hp.ftype, 0);
    }

    #[test]
    fn test_ftype_patched_rest_passthrough() {
        let input = sample_bytes();
        let hp = read_hparams(&mut Cursor::new(&input)).unwrap();

        let mut out = Vec::new();
        write_hparams(&mut out, &hp, FType::MostlyQ5_1).unwrap();

        assert_eq!(out.len(), HPARAMS_SIZE);
        assert_eq!(&out[..28], &input[..28]);
        assert_eq!(i32::from_le_bytes(out[28..32].try_into().unwrap()), 9);
    }

    #[test]
    fn test_negative_values_pass_through() {
        let hp = Hyperparameters { n_ctx: -1, n_rot: 0, ..Default::default() };
        let mut out = Vec::new();
        write_hparams(&mut out, &hp, FType::MostlyQ4_0).unwrap();
        let back = read_hparams(&mut Cursor::new(out)).unwrap();
        assert_eq!(back.n_ctx, -1);
        assert_eq!(back.n_rot, 0);
        assert_eq!(back.ftype, 2);
    }

    #[test]
    fn test_short_block() {
        let bytes = &sample_bytes()[..20];
        assert!(matches!(
            read_hparams(&mut Cursor::new(bytes)),
            Err(Error::TruncatedStream { section: "hparams" })
        ));
    }
}
