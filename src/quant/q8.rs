// src/quant/q8.rs
// ============================================================================
// Q8_0 - 8 bits por peso, bloques de 32 (34 bytes): f16 d | i8 qs[32]
// ============================================================================

use crate::ggml::QK;
use super::common::*;

pub const Q8_0_BLOCK_BYTES: usize = 34;

fn encode_q8_0(x: &[f32], y: &mut [u8]) -> Histogram {
    let (amax, _) = signed_abs_max(x);
    let d = amax / 127.0;
    let id = inverse(d);

    put_f16(y, 0, d);

    let mut hist = [0; HIST_BUCKETS];
    for j in 0..QK {
        let vi = (x[j] * id).round() as i8;
        y[2 + j] = vi as u8;
        hist[(vi as i32 / 16 + 8) as usize] += 1;
    }
    hist
}

pub fn quantize_q8_0(src: &[f32]) -> (Vec<u8>, Histogram) {
    encode_blocks(src, Q8_0_BLOCK_BYTES, encode_q8_0)
}

pub fn dequantize_q8_0(data: &[u8]) -> Vec<f32> {
    decode_blocks(data, Q8_0_BLOCK_BYTES, |y, x| {
        let d = get_f16(y, 0);
        for j in 0..QK {
            x[j] = (y[2 + j] as i8) as f32 * d;
        }
    })
}
