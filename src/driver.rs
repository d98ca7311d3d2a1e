// src/driver.rs
// ============================================================================
// DRIVER - Recorre la tabla de tensores: cuantiza o copia
// ============================================================================
//
// El driver es TONTO:
// - NO decide qué cuantizar (lo decide la QuantizationPolicy)
// - NO sabe cuantizar (lo hace el TensorQuantizer)
// - Solo lee, decide con la política, escribe
//
// Los tensores copiados conservan su tipo original (norms y biases siguen
// en f32/f16). Cualquier error aborta: el formato no permite reanudar.
//
// ============================================================================

use std::io::{Read, Write};

use crate::error::{IoResultExt, Result};
use crate::ggml::{copy_payload, read_payload, read_tensor_header, write_tensor_header};
use crate::policy::QuantizationPolicy;
use crate::quant::{common::merge_hist, FType, Histogram, TensorQuantizer, HIST_BUCKETS};

const MB: f64 = 1024.0 * 1024.0;

/// Estadísticas de conversión
#[derive(Debug, Default, Clone)]
pub struct ConvertStats {
    pub quantized_count: usize,
    pub copied_count: usize,
    /// Tamaño de referencia: elementos × 4 bytes (como f32)
    pub total_size_org: usize,
    pub total_size_new: usize,
    pub hist: Histogram,
}

impl ConvertStats {
    pub fn total_tensors(&self) -> usize {
        self.quantized_count + self.copied_count
    }

    fn record_quantized(&mut self, nelements: usize, size: usize, hist: &Histogram) {
        self.quantized_count += 1;
        self.total_size_org += nelements * 4;
        self.total_size_new += size;
        self.hist = merge_hist(self.hist, *hist);
    }

    fn record_copied(&mut self, nelements: usize, size: usize) {
        self.copied_count += 1;
        self.total_size_org += nelements * 4;
        self.total_size_new += size;
    }

    /// Histograma normalizado (suma 1.0 si hubo algún tensor cuantizado)
    pub fn hist_normalized(&self) -> [f32; HIST_BUCKETS] {
        normalize(&self.hist)
    }

    pub fn log_summary(&self) {
        log::info!("model size  = {:8.2} MB", self.total_size_org as f64 / MB);
        log::info!("quant size  = {:8.2} MB", self.total_size_new as f64 / MB);
        log::info!("hist: {}", format_hist(&self.hist_normalized()));
    }
}

fn normalize(hist: &Histogram) -> [f32; HIST_BUCKETS] {
    let total: i64 = hist.iter().sum();
    let mut out = [0.0f32; HIST_BUCKETS];
    if total > 0 {
        for (o, &h) in out.iter_mut().zip(hist.iter()) {
            *o = h as f32 / total as f32;
        }
    }
    out
}

fn format_hist(hist: &[f32; HIST_BUCKETS]) -> String {
    hist.iter()
        .map(|h| format!("{:5.3}", h))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Procesa tensores hasta EOF limpio en frontera de registro.
pub fn process_tensors<R, W, Q>(
    r: &mut R,
    w: &mut W,
    target: FType,
    policy: &QuantizationPolicy,
    quantizer: &Q,
) -> Result<ConvertStats>
where
    R: Read,
    W: Write,
    Q: TensorQuantizer + ?Sized,
{
    let mut stats = ConvertStats::default();

    while let Some(header) = read_tensor_header(r)? {
        let payload_size = header.payload_size()?;
        let nelements = header.nelements();
        let [ne0, ne1, ne2] = header.ne3();

        if policy.should_quantize(&header) {
            let payload = read_payload(r, payload_size)?;
            let quantized = quantizer.quantize(&header, &payload, target)?;

            write_tensor_header(w, &quantized.header)?;
            w.write_all(&quantized.data).section("tensor data")?;

            log::info!(
                "{:>48} - [{:5}, {:5}, {:5}], type = {:>6} size = {:8.2} MB -> {:8.2} MB | hist: {}",
                header.name_str(),
                ne0,
                ne1,
                ne2,
                header.ttype,
                (nelements * 4) as f64 / MB,
                quantized.data.len() as f64 / MB,
                format_hist(&normalize(&quantized.hist)),
            );

            stats.record_quantized(nelements, quantized.data.len(), &quantized.hist);
        } else {
            write_tensor_header(w, &header)?;
            copy_payload(r, w, payload_size)?;

            log::info!(
                "{:>48} - [{:5}, {:5}, {:5}], type = {:>6} size = {:8.3} MB",
                header.name_str(),
                ne0,
                ne1,
                ne2,
                header.ttype,
                payload_size as f64 / MB,
            );

            stats.record_copied(nelements, payload_size);
        }
    }

    stats.log_summary();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::ggml::{GgmlType, TensorHeader};
    use crate::quant::QuantizedTensor;
    use std::cell::RefCell;
    use std::io::Cursor;

    /// Servicio falso: registra llamadas y devuelve bytes reconocibles
    struct FakeQuantizer {
        calls: RefCell<Vec<(String, FType)>>,
    }

    impl FakeQuantizer {
        fn new() -> Self {
            Self { calls: RefCell::new(Vec::new()) }
        }
    }

    impl TensorQuantizer for FakeQuantizer {
        fn quantize(&self, header: &TensorHeader, _payload: &[u8], target: FType) -> Result<QuantizedTensor> {
            self.calls.borrow_mut().push((header.name_str().into_owned(), target));
            let ttype = target.quant_type().unwrap();
            let size = header.nelements() / 32 * ttype.block_bytes();
            let mut hist = [0; HIST_BUCKETS];
            hist[0] = header.nelements() as i64;
            Ok(QuantizedTensor {
                header: TensorHeader { ttype, ..header.clone() },
                data: vec![0xAB; size],
                hist,
            })
        }
    }

    struct FailingQuantizer;

    impl TensorQuantizer for FailingQuantizer {
        fn quantize(&self, _: &TensorHeader, _: &[u8], _: FType) -> Result<QuantizedTensor> {
            Err(Error::Quantize("rejected".into()))
        }
    }

    fn record(name: &str, ttype: GgmlType, dims: &[usize], fill: u8) -> Vec<u8> {
        let header = TensorHeader::new(name, ttype, dims);
        let mut buf = Vec::new();
        write_tensor_header(&mut buf, &header).unwrap();
        buf.extend(std::iter::repeat(fill).take(header.payload_size().unwrap()));
        buf
    }

    #[test]
    fn test_selective_quantization() {
        let mut input = record("layer.weight", GgmlType::F32, &[32, 2], 0x11);
        let bias = record("layer.bias", GgmlType::F32, &[2], 0x22);
        input.extend_from_slice(&bias);

        let fake = FakeQuantizer::new();
        let mut out = Vec::new();
        let stats = process_tensors(
            &mut Cursor::new(&input),
            &mut out,
            FType::MostlyQ4_1,
            &QuantizationPolicy::stablelm(),
            &fake,
        )
        .unwrap();

        assert_eq!(stats.quantized_count, 1);
        assert_eq!(stats.copied_count, 1);
        assert_eq!(*fake.calls.borrow(), vec![("layer.weight".to_string(), FType::MostlyQ4_1)]);

        let mut cursor = Cursor::new(&out);
        let w = read_tensor_header(&mut cursor).unwrap().unwrap();
        assert_eq!(w.ttype, GgmlType::Q4_1);
        let data = read_payload(&mut cursor, w.payload_size().unwrap()).unwrap();
        assert!(data.iter().all(|&b| b == 0xAB));

        // El bias sale idéntico, bytes incluidos
        let rest = &out[cursor.position() as usize..];
        assert_eq!(rest, &bias[..]);
    }

    #[test]
    fn test_empty_table() {
        let mut out = Vec::new();
        let stats = process_tensors(
            &mut Cursor::new(Vec::new()),
            &mut out,
            FType::MostlyQ4_0,
            &QuantizationPolicy::stablelm(),
            &FakeQuantizer::new(),
        )
        .unwrap();
        assert_eq!(stats.total_tensors(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_truncated_payload() {
        let mut input = record("x.bias", GgmlType::F32, &[8], 0);
        input.truncate(input.len() - 3);
        let err = process_tensors(
            &mut Cursor::new(&input),
            &mut Vec::new(),
            FType::MostlyQ4_0,
            &QuantizationPolicy::stablelm(),
            &FakeQuantizer::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::TruncatedStream { section: "tensor data" }));
    }

    #[test]
    fn test_overflowing_dims_are_malformed() {
        let mut input = Vec::new();
        for v in [4i32, 1, 0, i32::MAX, i32::MAX, i32::MAX, i32::MAX] {
            input.extend_from_slice(&v.to_le_bytes());
        }
        input.push(b'x');

        let fake = FakeQuantizer::new();
        let err = process_tensors(
            &mut Cursor::new(&input),
            &mut Vec::new(),
            FType::MostlyQ4_0,
            &QuantizationPolicy::stablelm(),
            &fake,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
        assert!(fake.calls.borrow().is_empty());
    }

    #[test]
    fn test_service_error_aborts() {
        let mut input = record("a.weight", GgmlType::F32, &[32, 1], 0);
        input.extend(record("b.bias", GgmlType::F32, &[4], 0));
        let err = process_tensors(
            &mut Cursor::new(&input),
            &mut Vec::new(),
            FType::MostlyQ4_0,
            &QuantizationPolicy::stablelm(),
            &FailingQuantizer,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Quantize(_)));
    }

    #[test]
    fn test_hist_normalized() {
        let mut stats = ConvertStats::default();
        let mut h = [0; HIST_BUCKETS];
        h[1] = 3;
        h[2] = 1;
        stats.record_quantized(4, 10, &h);
        let n = stats.hist_normalized();
        assert!((n[1] - 0.75).abs() < 1e-6);
        assert!((n.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert_eq!(stats.total_size_org, 16);
    }
}
