//! PDF Sign Server Library
//!
//! Places signature images over rendered PDF pages and stamps them into the
//! document. The server binary is in main.rs; everything it serves is built
//! from the modules below.
//!
//! # Modules
//!
//! - `geometry`: rendered-pixel to PDF-point coordinate transform
//! - `placement`: per-session signature assets and committed placements
//! - `interaction`: drag/resize state machine for the active signature box
//! - `render`: rasterization collaborator and page render session
//! - `pdf`: lopdf page tree access and the production PDF mutator
//! - `assembler`: writes every placement into the output PDF
//! - `transparency`: signature background removal
//! - `routes`, `state`, `config`: the HTTP service

pub mod assembler;
pub mod config;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod pdf;
pub mod placement;
pub mod render;
pub mod routes;
pub mod state;
pub mod transparency;

pub use error::{AppError, SignError, SignResult};
