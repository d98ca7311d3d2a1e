// src/quant/q4.rs
// ============================================================================
// Q4_0 / Q4_1 - 4 bits por peso, bloques de 32
// ============================================================================
//
// Q4_0 (18 bytes): f16 d | u8 qs[16]            x = (q - 8) * d
// Q4_1 (20 bytes): f16 d | f16 m | u8 qs[16]    x = q * d + m
//
// qs[j] = q[j] | q[j + 16] << 4
//
// ============================================================================

use crate::ggml::QK;
use super::common::*;

pub const Q4_0_BLOCK_BYTES: usize = 18;
pub const Q4_1_BLOCK_BYTES: usize = 20;

fn encode_q4_0(x: &[f32], y: &mut [u8]) -> Histogram {
    let (_, max) = signed_abs_max(x);
    let d = max / -8.0;
    let id = inverse(d);

    put_f16(y, 0, d);

    let mut hist = [0; HIST_BUCKETS];
    for j in 0..QK / 2 {
        let xi0 = ((x[j] * id + 8.5) as i8).min(15) as u8;
        let xi1 = ((x[j + QK / 2] * id + 8.5) as i8).min(15) as u8;
        y[2 + j] = xi0 | (xi1 << 4);
        hist[xi0 as usize] += 1;
        hist[xi1 as usize] += 1;
    }
    hist
}

fn encode_q4_1(x: &[f32], y: &mut [u8]) -> Histogram {
    let (min, max) = min_max(x);
    let d = (max - min) / 15.0;
    let id = inverse(d);

    put_f16(y, 0, d);
    put_f16(y, 2, min);

    let mut hist = [0; HIST_BUCKETS];
    for j in 0..QK / 2 {
        let xi0 = (((x[j] - min) * id + 0.5) as i8).min(15) as u8;
        let xi1 = (((x[j + QK / 2] - min) * id + 0.5) as i8).min(15) as u8;
        y[4 + j] = xi0 | (xi1 << 4);
        hist[xi0 as usize] += 1;
        hist[xi1 as usize] += 1;
    }
    hist
}

pub fn quantize_q4_0(src: &[f32]) -> (Vec<u8>, Histogram) {
    encode_blocks(src, Q4_0_BLOCK_BYTES, encode_q4_0)
}

pub fn quantize_q4_1(src: &[f32]) -> (Vec<u8>, Histogram) {
    encode_blocks(src, Q4_1_BLOCK_BYTES, encode_q4_1)
}

pub fn dequantize_q4_0(data: &[u8]) -> Vec<f32> {
    decode_blocks(data, Q4_0_BLOCK_BYTES, |y, x| {
        let d = get_f16(y, 0);
        for j in 0..QK / 2 {
            x[j] = ((y[2 + j] & 0x0F) as i32 - 8) as f32 * d;
            x[j + QK / 2] = ((y[2 + j] >> 4) as i32 - 8) as f32 * d;
        }
    })
}

pub fn dequantize_q4_1(data: &[u8]) -> Vec<f32> {
    decode_blocks(data, Q4_1_BLOCK_BYTES, |y, x| {
        let d = get_f16(y, 0);
        let m = get_f16(y, 2);
        for j in 0..QK / 2 {
            x[j] = (y[4 + j] & 0x0F) as f32 * d + m;
            x[j + QK / 2] = (y[4 + j] >> 4) as f32 * d + m;
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

    fn max_abs_err(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f32::max)
    }

    #[test]
    fn test_q4_0_sizes_and_hist() {
        let src = random(QK * 8);
        let (data, hist) = quantize_q4_0(&src);
        assert_eq!(data.len(), 8 * Q4_0_BLOCK_BYTES);
        assert_eq!(hist.iter().sum::<i64>(), src.len() as i64);
    }

    #[test]
    fn test_q4_0_error_bound() {
        let src = random(QK * 64);
        let (data, _) = quantize_q4_0(&src);
        let back = dequantize_q4_0(&data);
        assert_eq!(back.len(), src.len());

        // |d| = amax / 8 <= 0.25 -> error <= |d| (con margen por f16)
        assert!(max_abs_err(&src, &back) < 0.26);
    }

    #[test]
    fn test_q4_1_error_bound() {
        let src = random(QK * 64);
        let (data, hist) = quantize_q4_1(&src);
        assert_eq!(data.len(), 64 * Q4_1_BLOCK_BYTES);
        assert_eq!(hist.iter().sum::<i64>(), src.len() as i64);

        let back = dequantize_q4_1(&data);
        // d = rango / 15 <= 4/15 -> error <= d/2 (+ redondeo f16)
        assert!(max_abs_err(&src, &back) < 0.16);
    }

    #[test]
    fn test_q4_0_zero_block() {
        let src = vec![0.0f32; QK];
        let (data, hist) = quantize_q4_0(&src);
        // d = 0 / -8 (puede ser -0.0)
        assert_eq!(get_f16(&data, 0), 0.0);
        // 0 * id + 8.5 -> 8 en todas las posiciones
        assert_eq!(hist[8], QK as i64);
        assert!(dequantize_q4_0(&data).iter().all(|&v| v == 0.0));
    }
}
