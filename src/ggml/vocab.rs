// src/ggml/vocab.rs
// ============================================================================
// VOCAB - Tabla de tokens con prefijo de longitud
// ============================================================================
//
// Layout (repetido n_vocab veces):
//   u32      token_length
//   u8[len]  token_bytes   (bytes crudos, no necesariamente UTF-8)
//
// ============================================================================

use std::collections::HashMap;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, IoResultExt, Result};

/// Mapa bidireccional token <-> id construido durante la copia
#[derive(Debug, Default, Clone)]
pub struct Vocab {
    pub token_to_id: HashMap<Vec<u8>, i32>,
    pub id_to_token: HashMap<i32, Vec<u8>>,
}

impl Vocab {
    pub fn len(&self) -> usize {
        self.id_to_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_token.is_empty()
    }

    pub fn id(&self, token: &[u8]) -> Option<i32> {
        self.token_to_id.get(token).copied()
    }

    pub fn token(&self, id: i32) -> Option<&[u8]> {
        self.id_to_token.get(&id).map(|t| t.as_slice())
    }

    /// Tokens repetidos: gana el último id (semántica de mapa)
    fn insert(&mut self, id: i32, token: Vec<u8>) {
        self.token_to_id.insert(token.clone(), id);
        self.id_to_token.insert(id, token);
    }
}

/// Lee exactamente `len` bytes sin reservar `len` por adelantado.
pub(crate) fn read_bytes<R: Read>(r: &mut R, len: u64, section: &'static str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    r.by_ref().take(len).read_to_end(&mut buf).section(section)?;
    if (buf.len() as u64) < len {
        return Err(Error::TruncatedStream { section });
    }
    Ok(buf)
}

/// Copia el vocabulario byte a byte y devuelve el mapa construido.
pub fn copy_vocab<R: Read, W: Write>(r: &mut R, w: &mut W, n_vocab: i32) -> Result<Vocab> {
    if n_vocab < 0 {
        return Err(Error::Malformed(format!("negative vocabulary size {}", n_vocab)));
    }

    let mut vocab = Vocab::default();

    for id in 0..n_vocab {
        let len = r.read_u32::<LittleEndian>().section("vocab")?;
        w.write_u32::<LittleEndian>(len).section("vocab")?;

        let token = read_bytes(r, len as u64, "vocab")?;
        w.write_all(&token).section("vocab")?;

        vocab.insert(id, token);
    }

    log::debug!("vocab: copied {} tokens", n_vocab);
    Ok(vocab)
}
