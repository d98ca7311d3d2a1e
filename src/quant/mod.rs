// src/quant/mod.rs
// ============================================================================
// QUANT - Servicio de cuantización por bloques (Q4/Q5/Q8 legacy)
// ============================================================================
//
// El driver sólo ve `TensorQuantizer`: recibe cabecera + payload crudo y
// devuelve la nueva cabecera + payload comprimido. Los kernels son internos.
//
// ============================================================================

pub mod common;
pub mod q4;
pub mod q5;
pub mod q8;
pub mod tables;

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::ggml::{GgmlType, TensorHeader, QK};

pub use common::{Histogram, HIST_BUCKETS};
pub use q4::{dequantize_q4_0, dequantize_q4_1, quantize_q4_0, quantize_q4_1};
pub use q5::{dequantize_q5_0, dequantize_q5_1, quantize_q5_0, quantize_q5_1};
pub use q8::{dequantize_q8_0, quantize_q8_0};
pub use tables::NumericTables;

/// Encoding a nivel de fichero (campo `ftype` de los hparams)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FType {
    AllF32,
    MostlyF16,
    MostlyQ4_0,
    MostlyQ4_1,
    MostlyQ4_1SomeF16,
    MostlyQ8_0,
    MostlyQ5_0,
    MostlyQ5_1,
}

impl FType {
    /// Encodings aceptados como destino, en el orden en que se listan al usuario
    pub const TARGETS: [FType; 5] = [
        Self::MostlyQ4_0,
        Self::MostlyQ4_1,
        Self::MostlyQ5_0,
        Self::MostlyQ5_1,
        Self::MostlyQ8_0,
    ];

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(Self::AllF32),
            1 => Some(Self::MostlyF16),
            2 => Some(Self::MostlyQ4_0),
            3 => Some(Self::MostlyQ4_1),
            4 => Some(Self::MostlyQ4_1SomeF16),
            7 => Some(Self::MostlyQ8_0),
            8 => Some(Self::MostlyQ5_0),
            9 => Some(Self::MostlyQ5_1),
            _ => None,
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            Self::AllF32 => 0,
            Self::MostlyF16 => 1,
            Self::MostlyQ4_0 => 2,
            Self::MostlyQ4_1 => 3,
            Self::MostlyQ4_1SomeF16 => 4,
            Self::MostlyQ8_0 => 7,
            Self::MostlyQ5_0 => 8,
            Self::MostlyQ5_1 => 9,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AllF32 => "f32",
            Self::MostlyF16 => "f16",
            Self::MostlyQ4_0 => "q4_0",
            Self::MostlyQ4_1 => "q4_1",
            Self::MostlyQ4_1SomeF16 => "q4_1_some_f16",
            Self::MostlyQ8_0 => "q8_0",
            Self::MostlyQ5_0 => "q5_0",
            Self::MostlyQ5_1 => "q5_1",
        }
    }

    /// Tipo de tensor al que se cuantizan los pesos elegibles
    pub fn quant_type(&self) -> Option<GgmlType> {
        match self {
            Self::MostlyQ4_0 => Some(GgmlType::Q4_0),
            Self::MostlyQ4_1 => Some(GgmlType::Q4_1),
            Self::MostlyQ5_0 => Some(GgmlType::Q5_0),
            Self::MostlyQ5_1 => Some(GgmlType::Q5_1),
            Self::MostlyQ8_0 => Some(GgmlType::Q8_0),
            _ => None,
        }
    }

    /// Lista "  type = "q4_0" or 2" para el mensaje de uso
    pub fn usage() -> String {
        Self::TARGETS
            .iter()
            .map(|t| format!("  type = \"{}\" or {}\n", t.name(), t.id()))
            .collect()
    }
}

impl FromStr for FType {
    type Err = Error;

    /// Acepta el nombre ("q5_1") o el id numérico ("9"). Sólo destinos cuantizados.
    fn from_str(s: &str) -> Result<Self> {
        let parsed = Self::TARGETS
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .or_else(|| s.parse::<i32>().ok().and_then(Self::from_id));

        match parsed {
            Some(t) if t.quant_type().is_some() => Ok(t),
            Some(t) => Err(Error::InvalidArguments(format!(
                "'{}' ({}) is not a quantized encoding",
                s,
                t.name()
            ))),
            None => Err(Error::InvalidArguments(format!("unknown encoding type '{}'", s))),
        }
    }
}

impl fmt::Display for FType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Resultado de cuantizar un bloque de datos
#[derive(Debug, Clone)]
pub struct QuantizedBlocks {
    pub ttype: GgmlType,
    pub data: Vec<u8>,
    pub hist: Histogram,
}

/// Cuantiza `src` (longitud múltiplo de 32) al tipo que corresponde a `ftype`.
pub fn quantize_tensor_block(src: &[f32], ftype: FType) -> Result<QuantizedBlocks> {
    let ttype = ftype
        .quant_type()
        .ok_or_else(|| Error::Quantize(format!("unsupported quantization type {}", ftype)))?;

    if src.len() % QK != 0 {
        return Err(Error::Quantize(format!(
            "{} elements is not a multiple of the block size {}",
            src.len(),
            QK
        )));
    }

    let (data, hist) = match ttype {
        GgmlType::Q4_0 => quantize_q4_0(src),
        GgmlType::Q4_1 => quantize_q4_1(src),
        GgmlType::Q5_0 => quantize_q5_0(src),
        GgmlType::Q5_1 => quantize_q5_1(src),
        GgmlType::Q8_0 => quantize_q8_0(src),
        other => return Err(Error::Quantize(format!("unsupported quantization type {}", other))),
    };

    Ok(QuantizedBlocks { ttype, data, hist })
}

/// Dequantiza (sólo para tests y benches; no hay carga de modelos cuantizados)
pub fn dequantize(data: &[u8], ttype: GgmlType) -> Result<Vec<f32>> {
    match ttype {
        GgmlType::Q4_0 => Ok(dequantize_q4_0(data)),
        GgmlType::Q4_1 => Ok(dequantize_q4_1(data)),
        GgmlType::Q5_0 => Ok(dequantize_q5_0(data)),
        GgmlType::Q5_1 => Ok(dequantize_q5_1(data)),
        GgmlType::Q8_0 => Ok(dequantize_q8_0(data)),
        other => Err(Error::Quantize(format!("cannot dequantize {}", other))),
    }
}

// ============================================================================
// SERVICIO
// ============================================================================

/// Tensor ya cuantizado, listo para escribirse
#[derive(Debug, Clone)]
pub struct QuantizedTensor {
    pub header: TensorHeader,
    pub data: Vec<u8>,
    pub hist: Histogram,
}

/// Frontera entre el driver y los kernels numéricos
pub trait TensorQuantizer {
    fn quantize(&self, header: &TensorHeader, payload: &[u8], target: FType) -> Result<QuantizedTensor>;
}

/// Implementación por defecto: F32/F16 -> bloques legacy
pub struct BlockQuantizer<'t> {
    tables: &'t NumericTables,
}

impl<'t> BlockQuantizer<'t> {
    pub fn new(tables: &'t NumericTables) -> Self {
        Self { tables }
    }

    fn to_f32(&self, header: &TensorHeader, payload: &[u8]) -> Result<Vec<f32>> {
        match header.ttype {
            GgmlType::F32 => Ok(payload
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()),
            GgmlType::F16 => Ok(self.tables.convert_f16(payload)),
            other => Err(Error::Quantize(format!(
                "unsupported ttype {} ({}) for integer quantization of '{}'",
                other.id(),
                other,
                header.name_str()
            ))),
        }
    }
}

impl TensorQuantizer for BlockQuantizer<'_> {
    fn quantize(&self, header: &TensorHeader, payload: &[u8], target: FType) -> Result<QuantizedTensor> {
        if header.ne0() % QK != 0 {
            return Err(Error::Quantize(format!(
                "tensor '{}' has ne[0] = {}, not a multiple of {}",
                header.name_str(),
                header.ne0(),
                QK
            )));
        }

        let src = self.to_f32(header, payload)?;
        if src.len() != header.nelements() {
            return Err(Error::Quantize(format!(
                "tensor '{}': payload holds {} elements, header declares {}",
                header.name_str(),
                src.len(),
                header.nelements()
            )));
        }

        let blocks = quantize_tensor_block(&src, target)?;

        Ok(QuantizedTensor {
            header: TensorHeader {
                ttype: blocks.ttype,
                ..header.clone()
            },
            data: blocks.data,
            hist: blocks.hist,
        })
    }
}
