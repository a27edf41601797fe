//! Configuration management for the PDF signing server

use std::env;
use std::str::FromStr;

use anyhow::{anyhow, bail};
use serde::Serialize;

use crate::assembler::DEFAULT_ROTATED_PAGE_SCALE;
use crate::transparency::{ThresholdOptions, TransparencyConfig, TransparencyMode};

/// Largest accepted request body (PDF plus signature images)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub editor: EditorConfig,
    pub assembly: AssemblyConfig,
    pub transparency: TransparencyConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

/// Placement editor defaults
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    pub default_zoom: f32,
    /// Smallest width/height a signature box can be resized to, in pixels
    pub min_box_size: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_zoom: 1.5,
            min_box_size: 20.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    /// Raster scale for rotated pages
    pub rotated_page_scale: f32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            editor: EditorConfig::default(),
            assembly: AssemblyConfig {
                rotated_page_scale: DEFAULT_ROTATED_PAGE_SCALE,
            },
            transparency: TransparencyConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; unset or unparseable values use defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Config::default();

        let mode = match lookup("TRANSPARENCY_MODE") {
            Some(raw) => TransparencyMode::from_str(&raw).map_err(|e| anyhow!(e))?,
            None => defaults.transparency.mode,
        };
        let remote_url = lookup("TRANSPARENCY_REMOTE_URL").filter(|u| !u.trim().is_empty());
        if mode == TransparencyMode::Remote && remote_url.is_none() {
            bail!("TRANSPARENCY_MODE=remote requires TRANSPARENCY_REMOTE_URL");
        }

        let rotated_page_scale = parse_or(
            lookup("ROTATED_PAGE_SCALE"),
            defaults.assembly.rotated_page_scale,
        );
        let default_zoom = parse_or(lookup("DEFAULT_ZOOM"), defaults.editor.default_zoom);
        let min_box_size = parse_or(lookup("MIN_BOX_SIZE"), defaults.editor.min_box_size);

        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_or(lookup("SERVER_PORT"), defaults.server.port),
                max_upload_bytes: parse_or(
                    lookup("MAX_UPLOAD_BYTES"),
                    defaults.server.max_upload_bytes,
                ),
            },
            editor: EditorConfig {
                default_zoom: positive_or(default_zoom, defaults.editor.default_zoom),
                min_box_size: positive_or(min_box_size, defaults.editor.min_box_size),
            },
            assembly: AssemblyConfig {
                rotated_page_scale: positive_or(
                    rotated_page_scale,
                    defaults.assembly.rotated_page_scale,
                ),
            },
            transparency: TransparencyConfig {
                mode,
                threshold: ThresholdOptions {
                    tolerance: parse_or(
                        lookup("TRANSPARENCY_TOLERANCE"),
                        defaults.transparency.threshold.tolerance,
                    ),
                    alpha_floor: parse_or(
                        lookup("TRANSPARENCY_ALPHA_FLOOR"),
                        defaults.transparency.threshold.alpha_floor,
                    ),
                },
                process_drawn: parse_or(
                    lookup("TRANSPARENCY_PROCESS_DRAWN"),
                    defaults.transparency.process_drawn,
                ),
                remote_url,
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn positive_or<T: PartialOrd + Default>(value: T, default: T) -> T {
    if value > T::default() {
        value
    } else {
        default
    }
}
