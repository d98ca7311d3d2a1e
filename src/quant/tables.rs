// src/quant/tables.rs
// ============================================================================
// NUMERIC TABLES - Tabla fp16 -> fp32 precomputada
// ============================================================================
//
// Recurso con ámbito: se adquiere al inicio del pipeline y se libera en
// Drop, también cuando la conversión falla a mitad.
//
// ============================================================================

use half::f16;

const TABLE_LEN: usize = 1 << 16;

pub struct NumericTables {
    fp16_to_fp32: Box<[f32]>,
}

impl NumericTables {
    pub fn init() -> Self {
        let fp16_to_fp32: Box<[f32]> = (0..TABLE_LEN)
            .map(|bits| f16::from_bits(bits as u16).to_f32())
            .collect();

        log::debug!("numeric tables initialized ({} fp16 entries)", TABLE_LEN);
        Self { fp16_to_fp32 }
    }

    #[inline]
    pub fn fp16_to_fp32(&self, bits: u16) -> f32 {
        self.fp16_to_fp32[bits as usize]
    }

    /// Convierte un payload F16 little-endian a f32
    pub fn convert_f16(&self, payload: &[u8]) -> Vec<f32> {
        payload
            .chunks_exact(2)
            .map(|b| self.fp16_to_fp32(u16::from_le_bytes([b[0], b[1]])))
            .collect()
    }
}

impl Drop for NumericTables {
    fn drop(&mut self) {
        log::debug!("numeric tables released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_half() {
        let tables = NumericTables::init();
        for v in [0.0f32, 1.0, -2.5, 65504.0, 0.000061035156] {
            let bits = f16::from_f32(v).to_bits();
            assert_eq!(tables.fp16_to_fp32(bits), f16::from_bits(bits).to_f32());
        }
    }

    #[test]
    fn test_convert_payload() {
        let tables = NumericTables::init();
        let payload: Vec<u8> = [1.5f32, -0.25]
            .iter()
            .flat_map(|&v| f16::from_f32(v).to_le_bytes())
            .collect();
        assert_eq!(tables.convert_f16(&payload), vec![1.5, -0.25]);
    }
}
