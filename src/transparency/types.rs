//! Transparency processing types

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How signature backgrounds are removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransparencyMode {
    /// In-process threshold pass
    #[default]
    Local,
    /// External background-removal service
    Remote,
    /// Keep images as uploaded
    Disabled,
}

impl FromStr for TransparencyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            "disabled" | "off" | "none" => Ok(Self::Disabled),
            other => Err(format!("unknown transparency mode: {}", other)),
        }
    }
}

/// Threshold pass parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdOptions {
    /// Max per-channel distance from the background colour
    pub tolerance: u8,
    /// Pixels with alpha below this count as background
    pub alpha_floor: u8,
}

impl Default for ThresholdOptions {
    fn default() -> Self {
        Self {
            tolerance: 30,
            alpha_floor: 20,
        }
    }
}

/// Transparency service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TransparencyConfig {
    pub mode: TransparencyMode,
    pub threshold: ThresholdOptions,
    /// Run drawn signatures through the provider when they are saved
    pub process_drawn: bool,
    /// Endpoint for [`TransparencyMode::Remote`]
    pub remote_url: Option<String>,
}

impl Default for TransparencyConfig {
    fn default() -> Self {
        Self {
            mode: TransparencyMode::Local,
            threshold: ThresholdOptions::default(),
            process_drawn: true,
            remote_url: None,
        }
    }
}
