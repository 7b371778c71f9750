//! # Matrix (two-dimensional) Symbology Encoders
//!
//! Each encoder reduces the payload to a codeword stream, appends
//! Reed-Solomon check codewords, and places bits module-by-module into the
//! symbol grid, applying whatever masking its standard calls for.

pub mod aztec;
pub mod datamatrix;
pub mod dotcode;
pub mod maxicode;
pub mod microqr;
pub mod pdf417;
pub mod qr;
