// src/ggml/header.rs
// ============================================================================
// GGML HEADER - Magic + versión opcional
// ============================================================================
//
// Dos dialectos:
//   "ggml" (0x67676d6c) -> sin versión
//   "ggmf" (0x67676d66) -> seguido de u32 version
//
// ============================================================================

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, IoResultExt, Result};

/// Magic sin versión ("ggml")
pub const MAGIC_UNVERSIONED: u32 = 0x67676d6c;

/// Magic versionado ("ggmf")
pub const MAGIC_VERSIONED: u32 = 0x67676d66;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub magic: u32,
    pub version: Option<u32>,
}

impl ContainerHeader {
    pub fn unversioned() -> Self {
        Self { magic: MAGIC_UNVERSIONED, version: None }
    }

    pub fn versioned(version: u32) -> Self {
        Self { magic: MAGIC_VERSIONED, version: Some(version) }
    }

    pub fn dialect(&self) -> &'static str {
        match self.version {
            Some(_) => "ggmf",
            None => "ggml",
        }
    }

    /// Tamaño en disco (4 u 8 bytes)
    pub fn size(&self) -> usize {
        if self.version.is_some() { 8 } else { 4 }
    }
}

/// Lee el magic y, si es el dialecto versionado, el campo de versión.
pub fn read_header<R: Read>(r: &mut R) -> Result<ContainerHeader> {
    let magic = r.read_u32::<LittleEndian>().section("header")?;

    match magic {
        MAGIC_UNVERSIONED => Ok(ContainerHeader::unversioned()),
        MAGIC_VERSIONED => {
            let version = r.read_u32::<LittleEndian>().section("header")?;
            Ok(ContainerHeader::versioned(version))
        }
        other => Err(Error::InvalidMagic(other)),
    }
}

/// Reescribe el header en el mismo dialecto en que se leyó.
pub fn write_header<W: Write>(w: &mut W, header: &ContainerHeader) -> Result<()> {
    w.write_u32::<LittleEndian>(header.magic).section("header")?;
    if let Some(version) = header.version {
        w.write_u32::<LittleEndian>(version).section("header")?;
    }
    Ok(())
}
