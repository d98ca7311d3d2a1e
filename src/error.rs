// src/error.rs
// ============================================================================
// ERRORES - Taxonomía de fallos de la conversión
// ============================================================================
//
// Ningún error se recupera: cualquiera aborta la conversión completa.
//
// ============================================================================

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Los primeros 4 bytes no son ningún magic GGML conocido
    #[error("invalid model file (bad magic 0x{0:08x})")]
    InvalidMagic(u32),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// El stream terminó antes de lo declarado
    #[error("unexpected end of stream while reading {section}")]
    TruncatedStream { section: &'static str },

    #[error("quantization failed: {0}")]
    Quantize(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Campo estructuralmente imposible (conteos negativos, n_dims fuera de rango...)
    #[error("malformed model file: {0}")]
    Malformed(String),
}

impl Error {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Extensión para `io::Result`: EOF inesperado -> TruncatedStream, resto -> Io.
pub trait IoResultExt<T> {
    fn section(self, section: &'static str) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn section(self, section: &'static str) -> Result<T> {
        self.map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::TruncatedStream { section }
            } else {
                Error::io(format!("I/O error in {}", section), e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eof_maps_to_truncated() {
        let r: io::Result<()> = Err(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
        match r.section("vocab") {
            Err(Error::TruncatedStream { section }) => assert_eq!(section, "vocab"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_other_io_maps_to_io() {
        let r: io::Result<()> = Err(io::Error::new(io::ErrorKind::PermissionDenied, "nope"));
        assert!(matches!(r.section("hparams"), Err(Error::Io { .. })));
    }

    #[test]
    fn test_magic_message() {
        let msg = Error::InvalidMagic(0xdeadbeef).to_string();
        assert!(msg.contains("0xdeadbeef"));
    }
}
