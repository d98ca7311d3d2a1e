// src/ggml/tensor.rs
// ============================================================================
// TENSOR RECORDS - Tabla de tensores hasta EOF
// ============================================================================
//
// Layout por tensor:
//   i32           n_dims
//   i32           name_len
//   i32           ttype
//   i32[n_dims]   ne[0..n_dims]   (ne[0] = dimensión contigua)
//   u8[name_len]  name
//   u8[...]       payload (tamaño derivado de ttype y ne)
//
// ============================================================================

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, IoResultExt, Result};
use super::vocab::read_bytes;

pub const MAX_DIMS: usize = 4;

/// Elementos por bloque en los formatos cuantizados legacy
pub const QK: usize = 32;

/// Tipo de almacenamiento de un tensor (ids de wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GgmlType {
    F32,
    F16,
    Q4_0,
    Q4_1,
    Q5_0,
    Q5_1,
    Q8_0,
    Q8_1,
    I8,
    I16,
    I32,
}

impl GgmlType {
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(Self::F32),
            1 => Some(Self::F16),
            2 => Some(Self::Q4_0),
            3 => Some(Self::Q4_1),
            6 => Some(Self::Q5_0),
            7 => Some(Self::Q5_1),
            8 => Some(Self::Q8_0),
            9 => Some(Self::Q8_1),
            16 => Some(Self::I8),
            17 => Some(Self::I16),
            18 => Some(Self::I32),
            _ => None,
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            Self::F32 => 0,
            Self::F16 => 1,
            Self::Q4_0 => 2,
            Self::Q4_1 => 3,
            Self::Q5_0 => 6,
            Self::Q5_1 => 7,
            Self::Q8_0 => 8,
            Self::Q8_1 => 9,
            Self::I8 => 16,
            Self::I16 => 17,
            Self::I32 => 18,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F16 => "f16",
            Self::Q4_0 => "q4_0",
            Self::Q4_1 => "q4_1",
            Self::Q5_0 => "q5_0",
            Self::Q5_1 => "q5_1",
            Self::Q8_0 => "q8_0",
            Self::Q8_1 => "q8_1",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
        }
    }

    /// Elementos por bloque
    pub fn block_len(&self) -> usize {
        match self {
            Self::Q4_0 | Self::Q4_1 | Self::Q5_0 | Self::Q5_1 | Self::Q8_0 | Self::Q8_1 => QK,
            _ => 1,
        }
    }

    /// Bytes por bloque
    pub fn block_bytes(&self) -> usize {
        match self {
            Self::F32 | Self::I32 => 4,
            Self::F16 | Self::I16 => 2,
            Self::I8 => 1,
            Self::Q4_0 => 18,
            Self::Q4_1 => 20,
            Self::Q5_0 => 22,
            Self::Q5_1 => 24,
            Self::Q8_0 => 34,
            Self::Q8_1 => 36,
        }
    }

    pub fn is_quantized(&self) -> bool {
        self.block_len() > 1
    }

    /// Bytes de una fila de `ne0` elementos (None si ne0 no es múltiplo del bloque o desborda)
    pub fn row_size(&self, ne0: usize) -> Option<usize> {
        if ne0 % self.block_len() != 0 {
            return None;
        }
        (ne0 / self.block_len()).checked_mul(self.block_bytes())
    }
}

impl fmt::Display for GgmlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Metadatos de un tensor (todo lo que precede al payload)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorHeader {
    pub ttype: GgmlType,
    pub dims: Vec<usize>,
    pub name: Vec<u8>,
}

impl TensorHeader {
    pub fn new(name: impl Into<Vec<u8>>, ttype: GgmlType, dims: &[usize]) -> Self {
        Self {
            ttype,
            dims: dims.to_vec(),
            name: name.into(),
        }
    }

    pub fn n_dims(&self) -> usize {
        self.dims.len()
    }

    /// Nombre para matching y logs (bytes inválidos -> U+FFFD)
    pub fn name_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    pub fn ne0(&self) -> usize {
        self.dims.first().copied().unwrap_or(1)
    }

    /// Satura en usize::MAX; los registros leídos ya vienen validados
    pub fn nelements(&self) -> usize {
        self.dims.iter().fold(1usize, |acc, &d| acc.saturating_mul(d))
    }

    pub fn nrows(&self) -> usize {
        self.dims.iter().skip(1).fold(1usize, |acc, &d| acc.saturating_mul(d))
    }

    /// ne[0..3] rellenado con 1 (formato de los logs)
    pub fn ne3(&self) -> [usize; 3] {
        let mut ne = [1usize; 3];
        for (slot, &d) in ne.iter_mut().zip(self.dims.iter()) {
            *slot = d;
        }
        ne
    }

    /// Tamaño del payload en bytes según ttype y dims
    pub fn payload_size(&self) -> Result<usize> {
        let row = self.ttype.row_size(self.ne0()).ok_or_else(|| {
            Error::Malformed(format!(
                "tensor '{}': ne[0] = {} does not fit the {} block size {}",
                self.name_str(),
                self.ne0(),
                self.ttype,
                self.ttype.block_len()
            ))
        })?;
        row.checked_mul(self.nrows()).ok_or_else(|| {
            Error::Malformed(format!("tensor '{}': payload size overflows", self.name_str()))
        })
    }
}

/// Lee el primer i32 del registro. `None` = EOF limpio en frontera de registro.
fn read_record_start<R: Read>(r: &mut R) -> Result<Option<i32>> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::io("I/O error in tensor header", e)),
        }
    }
    match filled {
        0 => Ok(None),
        4 => Ok(Some(i32::from_le_bytes(buf))),
        _ => Err(Error::TruncatedStream { section: "tensor header" }),
    }
}

/// Lee la cabecera del siguiente tensor, o `None` al final del stream.
pub fn read_tensor_header<R: Read>(r: &mut R) -> Result<Option<TensorHeader>> {
    let n_dims = match read_record_start(r)? {
        Some(n) => n,
        None => return Ok(None),
    };
    let name_len = r.read_i32::<LittleEndian>().section("tensor header")?;
    let ttype_id = r.read_i32::<LittleEndian>().section("tensor header")?;

    if n_dims < 1 || n_dims as usize > MAX_DIMS {
        return Err(Error::Malformed(format!("tensor n_dims = {} (expected 1..={})", n_dims, MAX_DIMS)));
    }
    if name_len < 0 {
        return Err(Error::Malformed(format!("negative tensor name length {}", name_len)));
    }
    let ttype = GgmlType::from_id(ttype_id)
        .ok_or_else(|| Error::Malformed(format!("unknown tensor type {}", ttype_id)))?;

    let mut dims = Vec::with_capacity(n_dims as usize);
    for _ in 0..n_dims {
        let d = r.read_i32::<LittleEndian>().section("tensor header")?;
        if d < 0 {
            return Err(Error::Malformed(format!("negative tensor dimension {}", d)));
        }
        dims.push(d as usize);
    }

    let name = read_bytes(r, name_len as u64, "tensor name")?;

    // nelements × 4 (tamaño f32 de referencia) debe caber en usize
    let fits = dims
        .iter()
        .try_fold(4usize, |acc, &d| acc.checked_mul(d))
        .is_some();
    if !fits {
        return Err(Error::Malformed(format!(
            "tensor '{}': element count overflows (dims = {:?})",
            String::from_utf8_lossy(&name),
            dims
        )));
    }

    Ok(Some(TensorHeader { ttype, dims, name }))
}

pub fn write_tensor_header<W: Write>(w: &mut W, header: &TensorHeader) -> Result<()> {
    let mut put = |v: i32| w.write_i32::<LittleEndian>(v).section("tensor header");

    put(header.dims.len() as i32)?;
    put(header.name.len() as i32)?;
    put(header.ttype.id())?;
    for &d in &header.dims {
        put(d as i32)?;
    }
    w.write_all(&header.name).section("tensor header")?;
    Ok(())
}

/// Lee el payload completo en memoria (para cuantizar)
pub fn read_payload<R: Read>(r: &mut R, len: usize) -> Result<Vec<u8>> {
    read_bytes(r, len as u64, "tensor data")
}

/// Copia `len` bytes de payload sin cargarlos enteros en memoria
pub fn copy_payload<R: Read, W: Write>(r: &mut R, w: &mut W, len: usize) -> Result<()> {
    let copied = io::copy(&mut r.by_ref().take(len as u64), w).section("tensor data")?;
    if copied < len as u64 {
        return Err(Error::TruncatedStream { section: "tensor data" });
    }
    Ok(())
}

/// Salta el payload (inspector)
pub fn skip_payload<R: Read>(r: &mut R, len: usize) -> Result<()> {
    copy_payload(r, &mut io::sink(), len)
}
