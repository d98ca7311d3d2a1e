// src/quant/q5.rs
// ============================================================================
// Q5_0 / Q5_1 - 5 bits por peso, bloques de 32
// ============================================================================
//
// Q5_0 (22 bytes): f16 d | u32 qh | u8 qs[16]          x = (q - 16) * d
// Q5_1 (24 bytes): f16 d | f16 m | u32 qh | u8 qs[16]  x = q * d + m
//
// Los 4 bits bajos van en qs (como Q4), el bit 5 de cada peso en qh.
//
// ============================================================================

use crate::ggml::QK;
use super::common::*;

pub const Q5_0_BLOCK_BYTES: usize = 22;
pub const Q5_1_BLOCK_BYTES: usize = 24;

/// Empaqueta 32 valores de 5 bits en qh (4 bytes) + qs (16 bytes)
fn pack5(q: &[u8; QK], y: &mut [u8], qh_offset: usize) -> Histogram {
    let qs_offset = qh_offset + 4;
    let mut qh: u32 = 0;
    let mut hist = [0; HIST_BUCKETS];

    for j in 0..QK / 2 {
        let xi0 = q[j];
        let xi1 = q[j + QK / 2];

        y[qs_offset + j] = (xi0 & 0x0F) | ((xi1 & 0x0F) << 4);
        qh |= (((xi0 & 0x10) >> 4) as u32) << j;
        qh |= (((xi1 & 0x10) >> 4) as u32) << (j + QK / 2);

        hist[(xi0 / 2) as usize] += 1;
        hist[(xi1 / 2) as usize] += 1;
    }

    y[qh_offset..qh_offset + 4].copy_from_slice(&qh.to_le_bytes());
    hist
}

fn unpack5(y: &[u8], qh_offset: usize) -> [u8; QK] {
    let qs_offset = qh_offset + 4;
    let qh = u32::from_le_bytes([y[qh_offset], y[qh_offset + 1], y[qh_offset + 2], y[qh_offset + 3]]);
    let mut q = [0u8; QK];

    for j in 0..QK / 2 {
        let xh0 = (((qh >> j) & 1) << 4) as u8;
        let xh1 = (((qh >> (j + QK / 2)) & 1) << 4) as u8;
        q[j] = (y[qs_offset + j] & 0x0F) | xh0;
        q[j + QK / 2] = (y[qs_offset + j] >> 4) | xh1;
    }
    q
}

fn encode_q5_0(x: &[f32], y: &mut [u8]) -> Histogram {
    let (_, max) = signed_abs_max(x);
    let d = max / -16.0;
    let id = inverse(d);

    put_f16(y, 0, d);

    let mut q = [0u8; QK];
    for (qi, &v) in q.iter_mut().zip(x) {
        *qi = ((v * id + 16.5) as i8).min(31) as u8;
    }
    pack5(&q, y, 2)
}

fn encode_q5_1(x: &[f32], y: &mut [u8]) -> Histogram {
    let (min, max) = min_max(x);
    let d = (max - min) / 31.0;
    let id = inverse(d);

    put_f16(y, 0, d);
    put_f16(y, 2, min);

    let mut q = [0u8; QK];
    for (qi, &v) in q.iter_mut().zip(x) {
        *qi = (((v - min) * id + 0.5) as u8).min(31);
    }
    pack5(&q, y, 4)
}

pub fn quantize_q5_0(src: &[f32]) -> (Vec<u8>, Histogram) {
    encode_blocks(src, Q5_0_BLOCK_BYTES, encode_q5_0)
}

pub fn quantize_q5_1(src: &[f32]) -> (Vec<u8>, Histogram) {
    encode_blocks(src, Q5_1_BLOCK_BYTES, encode_q5_1)
}

pub fn dequantize_q5_0(data: &[u8]) -> Vec<f32> {
    decode_blocks(data, Q5_0_BLOCK_BYTES, |y, x| {
        let d = get_f16(y, 0);
        for (xi, q) in x.iter_mut().zip(unpack5(y, 2)) {
            *xi = (q as i32 - 16) as f32 * d;
        }
    })
}

pub fn dequantize_q5_1(data: &[u8]) -> Vec<f32> {
    decode_blocks(data, Q5_1_BLOCK_BYTES, |y, x| {
        let d = get_f16(y, 0);
        let m = get_f16(y, 2);
        for (xi, q) in x.iter_mut().zip(unpack5(y, 4)) {
            *xi = q as f32 * d + m;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn random(n: usize) -> Vec<f32> {
        let mut rng = rand::thread_rng();
        (0..n).map(|_| rng.gen_range(-2.0..2.0)).collect()
    }

    #[test]
    fn test_pack_unpack() {
        let mut q = [0u8; QK];
        for (i, v) in q.iter_mut().enumerate() {
            *v = (i as u8 * 7) % 32;
        }
        let mut y = [0u8; Q5_0_BLOCK_BYTES];
        pack5(&q, &mut y, 2);
        assert_eq!(unpack5(&y, 2), q);
    }

    #[test]
    fn test_q5_0_error_bound() {
        let src = random(QK * 64);
        let (data, hist) = quantize_q5_0(&src);
        assert_eq!(data.len(), 64 * Q5_0_BLOCK_BYTES);
        assert_eq!(hist.iter().sum::<i64>(), src.len() as i64);

        let back = dequantize_q5_0(&data);
        let err = src.iter().zip(&back).map(|(a, b)| (a - b).abs()).fold(0.0, f32::max);
        // |d| = amax / 16 <= 0.125
        assert!(err < 0.13, "max error {}", err);
    }

    #[test]
    fn test_q5_1_error_bound() {
        let src = random(QK * 64);
        let (data, _) = quantize_q5_1(&src);
        assert_eq!(data.len(), 64 * Q5_1_BLOCK_BYTES);

        let back = dequantize_q5_1(&data);
        let err = src.iter().zip(&back).map(|(a, b)| (a - b).abs()).fold(0.0, f32::max);
        // d = rango / 31 <= 4/31 -> error <= d/2 (+ redondeo f16)
        assert!(err < 0.08, "max error {}", err);
    }
}
