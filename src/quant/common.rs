// src/quant/common.rs
// ============================================================================
// QUANT COMMON - Bloques de 32 elementos, histograma, helpers
// ============================================================================

use half::f16;
use rayon::prelude::*;

use crate::ggml::QK;

pub const HIST_BUCKETS: usize = 16;

/// Histograma de valores cuantizados (16 cubetas)
pub type Histogram = [i64; HIST_BUCKETS];

pub fn merge_hist(mut a: Histogram, b: Histogram) -> Histogram {
    for (x, y) in a.iter_mut().zip(b.iter()) {
        *x += y;
    }
    a
}

/// (|max|, valor con signo que lo alcanza)
#[inline]
pub fn signed_abs_max(block: &[f32]) -> (f32, f32) {
    let mut amax = 0.0f32;
    let mut max = 0.0f32;
    for &v in block {
        if amax < v.abs() {
            amax = v.abs();
            max = v;
        }
    }
    (amax, max)
}

#[inline]
pub fn min_max(block: &[f32]) -> (f32, f32) {
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for &v in block {
        if v < min { min = v; }
        if v > max { max = v; }
    }
    (min, max)
}

#[inline]
pub fn inverse(d: f32) -> f32 {
    if d != 0.0 { 1.0 / d } else { 0.0 }
}

#[inline]
pub fn put_f16(out: &mut [u8], offset: usize, v: f32) {
    out[offset..offset + 2].copy_from_slice(&f16::from_f32(v).to_le_bytes());
}

#[inline]
pub fn get_f16(data: &[u8], offset: usize) -> f32 {
    f16::from_le_bytes([data[offset], data[offset + 1]]).to_f32()
}

/// Codifica `src` bloque a bloque (en paralelo) y acumula el histograma.
/// `src.len()` debe ser múltiplo de QK.
pub fn encode_blocks<F>(src: &[f32], block_bytes: usize, encode: F) -> (Vec<u8>, Histogram)
where
    F: Fn(&[f32], &mut [u8]) -> Histogram + Sync,
{
    debug_assert_eq!(src.len() % QK, 0);

    let mut out = vec![0u8; src.len() / QK * block_bytes];
    let hist = src
        .par_chunks_exact(QK)
        .zip(out.par_chunks_exact_mut(block_bytes))
        .map(|(x, y)| encode(x, y))
        .reduce(|| [0; HIST_BUCKETS], merge_hist);

    (out, hist)
}

/// Decodifica bloque a bloque (sólo tests/benches)
pub fn decode_blocks<F>(data: &[u8], block_bytes: usize, decode: F) -> Vec<f32>
where
    F: Fn(&[u8], &mut [f32]),
{
    let mut out = vec![0.0f32; data.len() / block_bytes * QK];
    for (y, x) in data.chunks_exact(block_bytes).zip(out.chunks_exact_mut(QK)) {
        decode(y, x);
    }
    out
}
