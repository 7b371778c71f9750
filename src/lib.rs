//! # Barra - Barcode Generation Core
//!
//! Barra is a Rust library that turns a payload (bytes plus optional
//! encoding hints) and a chosen symbology into a finished symbol: a
//! module grid with row heights, total dimensions and a human-readable
//! transcription. It provides:
//!
//! - **Linear encoders**: Code 128/GS1-128, Code 39/93/11, the 2-of-5
//!   family, MSI and UK Plessey, Channel Code, PZN, VIN
//! - **Matrix encoders**: Data Matrix ECC 200, PDF417/MicroPDF417,
//!   QR Code, Micro QR, Aztec, MaxiCode, DotCode
//! - **GS1 support**: bracketed AI validation and FNC1 reduction
//! - **Reed-Solomon**: byte-wide, wide-field and prime-field codecs
//!
//! Rendering (raster or vector), readers and CLI wrappers are out of
//! scope: callers consume the finished module grid.
//!
//! ## Quick Start
//!
//! ```
//! use barra::{Symbol, Symbology};
//!
//! let mut symbol = Symbol::new(Symbology::DataMatrix);
//! symbol.encode(b"123456")?;
//!
//! for row in 0..symbol.rows {
//!     let line: String = (0..symbol.width)
//!         .map(|col| if symbol.module_is_set(row, col) { '#' } else { ' ' })
//!         .collect();
//!     println!("{line}");
//! }
//! # Ok::<(), barra::Error>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`symbol`] | The `Symbol` model, options and dispatch |
//! | [`linear`] | One-dimensional encoders |
//! | [`matrix`] | Two-dimensional encoders |
//! | [`gs1`] | GS1 AI validation and reduction |
//! | [`reedsol`] | Reed-Solomon codecs |
//! | [`common`] | Character classes and shared plumbing |
//! | [`error`] | Error and warning types |

pub mod common;
pub mod error;
pub mod gs1;
pub mod linear;
pub mod matrix;
pub mod reedsol;
pub mod symbol;

// Re-exports for convenience
pub use error::{Error, WarnLevel, Warning};
pub use symbol::{BaseMode, InputMode, OutputOptions, Segment, StructApp, Symbol, Symbology};
