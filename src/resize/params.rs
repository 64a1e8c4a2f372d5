//! # Parámetros de Redimensionado
//! src/resize/params.rs
//!
//! Política de combinaciones válidas: `scale` solo, `width` solo, `height`
//! solo, o `width` + `height`. Cualquier otra combinación se rechaza antes
//! de crear el job.

use serde::{Deserialize, Serialize};

/// Mensaje que recibe el cliente ante una combinación inválida
pub const INVALID_COMBINATION: &str =
    "Please select correct arguments combination: 1)scale 2)height 3)width 4)height and width";

/// Límites de `scale`
pub const MIN_SCALE: u32 = 1;
pub const MAX_SCALE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{}", INVALID_COMBINATION)]
    InvalidCombination,

    #[error("scale must be between {min} and {max}, got {0}", min = MIN_SCALE, max = MAX_SCALE)]
    ScaleOutOfRange(u32),
}

/// Parámetros tal como llegan del cliente
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub scale: Option<u32>,
}

/// Modo de redimensionado ya validado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    /// Dimensiones exactas
    Exact { width: u32, height: u32 },
    /// Ancho fijo, alto proporcional
    Width(u32),
    /// Alto fijo, ancho proporcional
    Height(u32),
    /// Divide ambas dimensiones por el factor
    Scale(u32),
}

impl ResizeParams {
    pub fn new(width: Option<u32>, height: Option<u32>, scale: Option<u32>) -> Self {
        Self { width, height, scale }
    }

    /// Trata `0` como "no indicado"
    pub fn normalized(self) -> Self {
        let keep = |v: Option<u32>| v.filter(|&n| n > 0);
        Self {
            width: keep(self.width),
            height: keep(self.height),
            scale: keep(self.scale),
        }
    }

    /// Valida la combinación y la convierte en un modo
    pub fn into_mode(self) -> Result<ResizeMode, ValidationError> {
        let p = self.normalized();

        match (p.width, p.height, p.scale) {
            (Some(width), Some(height), None) => Ok(ResizeMode::Exact { width, height }),
            (Some(width), None, None) => Ok(ResizeMode::Width(width)),
            (None, Some(height), None) => Ok(ResizeMode::Height(height)),
            (None, None, Some(scale)) => {
                if scale > MAX_SCALE {
                    Err(ValidationError::ScaleOutOfRange(scale))
                } else {
                    Ok(ResizeMode::Scale(scale))
                }
            }
            _ => Err(ValidationError::InvalidCombination),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.into_mode().map(|_| ())
    }
}
