// src/policy/mod.rs
// ============================================================================
// POLICY - Qué tensores se cuantizan y cuáles se copian tal cual
// ============================================================================
//
// Regla: cuantizar <=> nombre casa con algún patrón elegible
//                      && no casa con ningún patrón excluido
//                      && (only_2d => n_dims == 2)
//
// Los patrones son regex anclados a nombre completo (".*weight" casa con
// "layer.weight" pero no con "layer.weight_g").
//
// ============================================================================

use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::ggml::TensorHeader;

/// Patrones elegibles para StableLM: todas las matrices de pesos
pub const STABLELM_QUANTIZE: &[&str] = &[".*weight"];

/// Sin exclusiones por defecto
pub const STABLELM_SKIP: &[&str] = &[];

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{})$", pattern))
        .map_err(|e| Error::InvalidArguments(format!("invalid tensor pattern '{}': {}", pattern, e)))
}

/// Formato del fichero JSON de política (`--policy`)
#[derive(Debug, Deserialize)]
struct PolicyFile {
    eligible: Vec<String>,
    #[serde(default)]
    excluded: Vec<String>,
    #[serde(default = "default_only_2d")]
    only_2d: bool,
}

fn default_only_2d() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct QuantizationPolicy {
    eligible: Vec<Regex>,
    excluded: Vec<Regex>,
    only_2d: bool,
}

impl QuantizationPolicy {
    /// Política sin restricción de dimensiones
    pub fn new<S: AsRef<str>>(eligible: &[S], excluded: &[S]) -> Result<Self> {
        Ok(Self {
            eligible: eligible.iter().map(|p| compile(p.as_ref())).collect::<Result<_>>()?,
            excluded: excluded.iter().map(|p| compile(p.as_ref())).collect::<Result<_>>()?,
            only_2d: false,
        })
    }

    /// Preset StableLM: ".*weight", sólo tensores 2D
    pub fn stablelm() -> Self {
        Self::new(STABLELM_QUANTIZE, STABLELM_SKIP)
            .expect("stablelm preset patterns are valid")
            .with_only_2d(true)
    }

    pub fn with_only_2d(mut self, only_2d: bool) -> Self {
        self.only_2d = only_2d;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: PolicyFile = serde_json::from_str(json)
            .map_err(|e| Error::InvalidArguments(format!("invalid policy file: {}", e)))?;
        Ok(Self::new(&file.eligible[..], &file.excluded[..])?.with_only_2d(file.only_2d))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| Error::io(format!("failed to read policy '{}'", path.display()), e))?;
        Self::from_json_str(&json)
    }

    pub fn is_eligible(&self, name: &str) -> bool {
        self.eligible.iter().any(|re| re.is_match(name))
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.iter().any(|re| re.is_match(name))
    }

    pub fn only_2d(&self) -> bool {
        self.only_2d
    }

    pub fn should_quantize(&self, header: &TensorHeader) -> bool {
        let name = header.name_str();
        self.is_eligible(&name)
            && !self.is_excluded(&name)
            && (!self.only_2d || header.n_dims() == 2)
    }
}

impl Default for QuantizationPolicy {
    fn default() -> Self {
        Self::stablelm()
    }
}
