//! # Symbol Model and Dispatch
//!
//! [`Symbol`] is both the configuration surface and the result container:
//! callers pick a [`Symbology`], set options, call [`Symbol::encode`] (or
//! [`Symbol::encode_segs`] for multi-ECI payloads) and read back the module
//! grid, row heights and human-readable text.
//!
//! ## Example
//!
//! ```
//! use barra::{Symbol, Symbology};
//!
//! let mut symbol = Symbol::new(Symbology::Code128);
//! symbol.encode(b"Rust").unwrap();
//! assert_eq!(symbol.rows, 1);
//! assert!(symbol.width > 0);
//! ```

use crate::common::{self, escape};
use crate::error::{Error, WarnLevel, Warning, worse};
use crate::{gs1, linear, matrix};

/// Widest supported symbol in modules.
pub const MAX_WIDTH: usize = 1152;
const ROW_BYTES: usize = MAX_WIDTH / 8;

/// Human-readable text buffer limit in bytes (UTF-8).
const MAX_HRT: usize = 199;

/// Maximum number of input segments per encode.
const MAX_SEGS: usize = 256;

/// The supported symbologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Symbology {
    /// Code 11 (USD-8)
    Code11,
    /// Code 2 of 5 Standard (Matrix)
    C25Standard,
    /// Code 2 of 5 Industrial
    C25Industrial,
    /// Code 2 of 5 IATA
    C25Iata,
    /// Code 2 of 5 Data Logic
    C25Logic,
    /// Code 2 of 5 Interleaved
    C25Interleaved,
    /// ITF-14 (GS1 shipping container)
    Itf14,
    /// Deutsche Post Leitcode
    DpLeitcode,
    /// Deutsche Post Identcode
    DpIdentcode,
    /// Code 39 (ISO 16388)
    Code39,
    /// Extended Code 39 (full ASCII)
    ExtCode39,
    /// Code 93
    Code93,
    /// Pharmazentralnummer
    Pzn,
    /// Vehicle Identification Number
    Vin,
    /// MSI Plessey
    MsiPlessey,
    /// UK Plessey
    Plessey,
    /// Channel Code
    Channel,
    /// Code 128 (ISO 15417)
    Code128,
    /// GS1-128 (EAN-128)
    Gs1_128,
    /// EAN-14 (GS1-128 with AI 01)
    Ean14,
    /// NVE-18 (GS1-128 with AI 00)
    Nve18,
    /// PDF417 (ISO 15438)
    Pdf417,
    /// Compact (truncated) PDF417
    Pdf417Comp,
    /// MicroPDF417 (ISO 24728)
    MicroPdf417,
    /// Data Matrix ECC 200 (ISO 16022)
    DataMatrix,
    /// QR Code model 2 (ISO 18004)
    QrCode,
    /// Micro QR Code (ISO 18004)
    MicroQr,
    /// Aztec Code (ISO 24778)
    Aztec,
    /// MaxiCode (ISO 16023)
    MaxiCode,
    /// DotCode (AIM ISS DotCode)
    DotCode,
    /// Han Xin Code (ISO 20830). Dispatched but unsupported: its version
    /// tables are not carried by this library (see DESIGN.md).
    HanXin,
    /// Grid Matrix (AIM ITS/04-023). Dispatched but unsupported: its
    /// version tables are not carried by this library (see DESIGN.md).
    GridMatrix,
    /// Rectangular Micro QR (ISO 23941). Dispatched but unsupported: its
    /// version tables are not carried by this library (see DESIGN.md).
    Rmqr,
}

impl Symbology {
    /// Whether the symbology can embed ECI designators.
    pub fn supports_eci(self) -> bool {
        matches!(
            self,
            Symbology::Pdf417
                | Symbology::Pdf417Comp
                | Symbology::MicroPdf417
                | Symbology::DataMatrix
                | Symbology::QrCode
                | Symbology::Aztec
                | Symbology::MaxiCode
                | Symbology::DotCode
                | Symbology::HanXin
                | Symbology::GridMatrix
        )
    }

    /// Whether the symbology accepts GS1 (bracketed AI) input.
    pub fn supports_gs1(self) -> bool {
        matches!(
            self,
            Symbology::Gs1_128
                | Symbology::Ean14
                | Symbology::Nve18
                | Symbology::DataMatrix
                | Symbology::QrCode
                | Symbology::Aztec
                | Symbology::DotCode
                | Symbology::Rmqr
        )
    }

    /// Whether more than one input segment is accepted.
    fn supports_segs(self) -> bool {
        matches!(
            self,
            Symbology::Pdf417 | Symbology::Pdf417Comp | Symbology::MicroPdf417 | Symbology::QrCode
        )
    }
}

/// Base interpretation of the input bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BaseMode {
    /// Raw bytes, passed to the encoder untouched.
    #[default]
    Data,
    /// UTF-8 text; validated and down-converted where the target needs it.
    Unicode,
    /// GS1 element string with bracketed AIs.
    Gs1,
}

/// Input interpretation flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputMode {
    pub base: BaseMode,
    /// Process backslash escape sequences before anything else.
    pub escape: bool,
    /// GS1 AIs are bracketed `(..)` instead of `[..]`.
    pub gs1_parens: bool,
    /// Skip AI content checks (structure is still enforced).
    pub gs1_nocheck: bool,
    /// Treat `Symbol::height` as a per-row height.
    pub height_per_row: bool,
    /// Prefer speed over optimal compaction where a symbology offers the
    /// trade-off.
    pub fast: bool,
    /// Enable `\^A`/`\^B`/`\^C` manual code-set control (Code 128 only).
    pub extra_escape: bool,
}

/// Presentation flags; the core only reads the subset that changes
/// encoding or dimension checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputOptions {
    /// Encode a reader-initialisation/programming codeword.
    pub reader_init: bool,
    /// Use GS (0x1D) instead of FNC1 as the GS1 separator (Data Matrix).
    pub gs1_gs_separator: bool,
    /// Enforce standard-compliant height checks.
    pub compliant_height: bool,
    pub barcode_box: bool,
    pub barcode_bind: bool,
    pub barcode_bind_top: bool,
}

/// Structured Append: one logical message split over several symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StructApp {
    /// 1-based position of this symbol, `1..=count`.
    pub index: i32,
    /// Total number of symbols, `2..=max` (symbology-dependent max).
    pub count: i32,
    /// Optional file identification.
    pub id: String,
}

/// One payload segment: bytes plus the ECI they are to be interpreted in
/// (0 = default).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment {
    pub source: Vec<u8>,
    pub eci: u32,
}

impl Segment {
    pub fn new(source: impl Into<Vec<u8>>, eci: u32) -> Self {
        Segment { source: source.into(), eci }
    }
}

/// A barcode symbol: encoder configuration plus, after a successful
/// [`encode`](Symbol::encode), the finished module grid.
///
/// Output fields (`encoded_data`, `rows`, `width`, `row_height`, `height`,
/// `text`) are owned by the encode call; treat them as read-only.
#[derive(Clone)]
pub struct Symbol {
    pub symbology: Symbology,
    pub input_mode: InputMode,
    /// Extended Channel Interpretation; 0 means unset/default.
    pub eci: u32,
    /// Symbology-specific: usually the error-correction level or mode.
    pub option_1: i32,
    /// Symbology-specific: usually columns, width variant or version.
    pub option_2: i32,
    /// Symbology-specific: low byte flags, high byte user mask + 1.
    pub option_3: i32,
    pub output_options: OutputOptions,
    /// Border width in X units for box/bind output (0 = symbology default).
    pub border_width: i32,
    pub structapp: Option<StructApp>,
    /// Secondary payload (MaxiCode primary message).
    pub primary: String,
    pub warn_level: WarnLevel,
    /// Route verbose encoder traces to the `log` facade.
    pub debug: bool,

    /// Module bitmap, indexed `[row][col >> 3] >> (col & 7)`.
    pub encoded_data: Vec<[u8; ROW_BYTES]>,
    pub rows: usize,
    pub width: usize,
    /// Per-row height in X units; 0 means "use default".
    pub row_height: Vec<f32>,
    /// Total height in X units. May be set by the caller as a request
    /// before encoding; holds the resulting height afterwards.
    pub height: f32,
    /// Human-readable transcription (UTF-8).
    pub text: String,
    /// Last diagnostic message (warning or error).
    pub errtxt: String,

    /// Bracketed GS1 input formatted for display, kept for the encoders
    /// that print an HRT.
    pub(crate) gs1_hrt: Option<String>,
}

impl Symbol {
    pub fn new(symbology: Symbology) -> Self {
        Symbol {
            symbology,
            input_mode: InputMode::default(),
            eci: 0,
            option_1: -1,
            option_2: 0,
            option_3: 0,
            output_options: OutputOptions::default(),
            border_width: 0,
            structapp: None,
            primary: String::new(),
            warn_level: WarnLevel::default(),
            debug: false,
            encoded_data: Vec::new(),
            rows: 0,
            width: 0,
            row_height: Vec::new(),
            height: 0.0,
            text: String::new(),
            errtxt: String::new(),
            gs1_hrt: None,
        }
    }

    /* ---- Module grid ---- */

    /// Whether the module at (`row`, `col`) is dark.
    pub fn module_is_set(&self, row: usize, col: usize) -> bool {
        self.encoded_data
            .get(row)
            .is_some_and(|r| r[col >> 3] >> (col & 7) & 1 != 0)
    }

    /// Sets the module at (`row`, `col`) dark, growing the grid as needed.
    pub(crate) fn set_module(&mut self, row: usize, col: usize) {
        debug_assert!(col < MAX_WIDTH);
        if row >= self.encoded_data.len() {
            self.encoded_data.resize(row + 1, [0u8; ROW_BYTES]);
        }
        self.encoded_data[row][col >> 3] |= 1 << (col & 7);
    }

    /// Sets a dark module back to light.
    #[allow(dead_code)]
    pub(crate) fn unset_module(&mut self, row: usize, col: usize) {
        if let Some(r) = self.encoded_data.get_mut(row) {
            r[col >> 3] &= !(1 << (col & 7));
        }
    }

    /// Records a fixed height for `row`, growing the table as needed.
    pub(crate) fn set_row_height(&mut self, row: usize, height: f32) {
        if row >= self.row_height.len() {
            self.row_height.resize(row + 1, 0.0);
        }
        self.row_height[row] = height;
    }

    /* ---- Diagnostics ---- */

    /// Records `e` in `errtxt` and hands it back for returning.
    pub(crate) fn err(&mut self, e: Error) -> Error {
        self.errtxt = e.to_string();
        e
    }

    /// Records a warning message, returning the warning for propagation.
    pub(crate) fn warn(&mut self, w: Warning, msg: impl Into<String>) -> Option<Warning> {
        self.errtxt = msg.into();
        Some(w)
    }

    /// Copies `source` (treated as ISO 8859-1) into the human-readable
    /// text, converting to UTF-8. Control characters and the 0x80-0x9F
    /// range are replaced with spaces. Returns a warning on truncation.
    pub(crate) fn set_hrt_latin1(&mut self, source: &[u8]) -> Option<Warning> {
        let mut out = String::with_capacity(source.len());
        let mut truncated = false;
        for &b in source {
            let ch = match b {
                0x20..=0x7E => b as char,
                0xA0..=0xFF => b as char, // Latin-1 maps to the same scalar
                _ => ' ',
            };
            if out.len() + ch.len_utf8() > MAX_HRT {
                truncated = true;
                break;
            }
            out.push(ch);
        }
        self.text = out;
        if truncated {
            self.warn(Warning::HrtTruncated, "human-readable text truncated")
        } else {
            None
        }
    }

    /* ---- Encoding ---- */

    /// Encodes `source` under the configured symbology and options.
    ///
    /// Returns the worst warning raised, if any. On error the output
    /// fields are cleared except for `errtxt`.
    pub fn encode(&mut self, source: &[u8]) -> Result<Option<Warning>, Error> {
        let eci = self.eci;
        self.encode_segs(vec![Segment::new(source, eci)])
    }

    /// Encodes a multi-segment payload (one ECI per segment). Only
    /// ECI-capable symbologies accept more than one segment.
    pub fn encode_segs(
        &mut self,
        segs: impl Into<Vec<Segment>>,
    ) -> Result<Option<Warning>, Error> {
        self.reset_output();
        let result = self.encode_segs_inner(segs.into());
        match result {
            Ok(warning) => {
                if self.warn_level == WarnLevel::FailAll {
                    if let Some(w) = warning {
                        let e = w.promote(self.errtxt.clone());
                        self.reset_output();
                        return Err(self.err(e));
                    }
                }
                debug_assert!(self.rows > 0 && self.width > 0);
                Ok(warning)
            }
            Err(e) => {
                // No partial output on failure.
                let msg = self.errtxt.clone();
                self.reset_output();
                self.errtxt = msg;
                Err(e)
            }
        }
    }

    fn reset_output(&mut self) {
        self.encoded_data.clear();
        self.rows = 0;
        self.width = 0;
        self.row_height.clear();
        self.text.clear();
        self.errtxt.clear();
        self.gs1_hrt = None;
    }

    fn encode_segs_inner(&mut self, mut segs: Vec<Segment>) -> Result<Option<Warning>, Error> {
        if segs.is_empty() || segs.iter().all(|s| s.source.is_empty()) {
            return Err(self.err(Error::InvalidData("no input data".into())));
        }
        if segs.len() > MAX_SEGS {
            return Err(self.err(Error::TooLong(format!(
                "too many segments (maximum {MAX_SEGS})"
            ))));
        }
        if segs.len() > 1 && !self.symbology.supports_segs() {
            return Err(self.err(Error::InvalidOption(
                "multiple segments not supported for this symbology".into(),
            )));
        }
        for seg in &segs {
            if seg.source.is_empty() {
                return Err(self.err(Error::InvalidData("empty segment".into())));
            }
            if seg.eci > 999999 {
                return Err(self.err(Error::InvalidOption(format!(
                    "ECI value {} out of range (0 to 999999)",
                    seg.eci
                ))));
            }
            if seg.eci != 0 && !self.symbology.supports_eci() {
                return Err(self.err(Error::InvalidOption(
                    "symbology does not support ECI".into(),
                )));
            }
        }

        let mut warning: Option<Warning> = None;

        // Escape sequences come first so every later stage sees real bytes.
        if self.input_mode.escape {
            let keep_caret =
                self.input_mode.extra_escape && self.symbology == Symbology::Code128;
            for seg in &mut segs {
                seg.source = escape::unescape(&seg.source, keep_caret)
                    .map_err(|e| self.err(e))?;
            }
        }

        // GS1-128 input is always a GS1 element string; EAN-14/NVE-18 take
        // plain digits and build their element string themselves.
        let gs1_processing = (self.input_mode.base == BaseMode::Gs1
            || self.symbology == Symbology::Gs1_128)
            && !matches!(self.symbology, Symbology::Ean14 | Symbology::Nve18);

        match self.input_mode.base {
            BaseMode::Unicode if !gs1_processing => {
                for i in 0..segs.len() {
                    warning = worse(warning, self.prepare_unicode_seg(&mut segs[i])?);
                }
            }
            BaseMode::Gs1 if !self.symbology.supports_gs1() => {
                return Err(self.err(Error::InvalidOption(
                    "GS1 mode not supported for this symbology".into(),
                )));
            }
            _ => {}
        }

        if gs1_processing {
            if self.output_options.reader_init {
                return Err(self.err(Error::InvalidOption(
                    "cannot use Reader Initialisation in GS1 mode".into(),
                )));
            }
            let source = segs[0].source.clone();
            let (reduced, w) = gs1::verify(self, &source)?;
            warning = worse(warning, w);
            let (ob, cb) = if self.input_mode.gs1_parens {
                (b'(', b')')
            } else {
                (b'[', b']')
            };
            self.gs1_hrt = Some(
                source
                    .iter()
                    .map(|&c| {
                        if c == ob {
                            '('
                        } else if c == cb {
                            ')'
                        } else {
                            c as char
                        }
                    })
                    .collect(),
            );
            segs[0].source = reduced;
        }

        // A segment with no explicit ECI following one with a non-default
        // ECI reverts to the symbology's default interpretation.
        let default_eci = if self.symbology == Symbology::GridMatrix { 29 } else { 3 };
        for i in 1..segs.len() {
            if segs[i].eci == 0 && segs[i - 1].eci != 0 && segs[i - 1].eci != default_eci {
                segs[i].eci = default_eci;
            }
        }

        let encoder_warning = match self.symbology {
            Symbology::Code11 => linear::code11::encode(self, &segs[0].source.clone())?,
            Symbology::C25Standard
            | Symbology::C25Industrial
            | Symbology::C25Iata
            | Symbology::C25Logic
            | Symbology::C25Interleaved
            | Symbology::Itf14
            | Symbology::DpLeitcode
            | Symbology::DpIdentcode => {
                linear::two_of_five::encode(self, &segs[0].source.clone())?
            }
            Symbology::Code39 => linear::code39::code39(self, &segs[0].source.clone())?,
            Symbology::ExtCode39 => linear::code39::ext_code39(self, &segs[0].source.clone())?,
            Symbology::Code93 => linear::code39::code93(self, &segs[0].source.clone())?,
            Symbology::Pzn => linear::code39::pzn(self, &segs[0].source.clone())?,
            Symbology::Vin => linear::code39::vin(self, &segs[0].source.clone())?,
            Symbology::MsiPlessey => linear::plessey::msi_plessey(self, &segs[0].source.clone())?,
            Symbology::Plessey => linear::plessey::plessey(self, &segs[0].source.clone())?,
            Symbology::Channel => linear::channel::encode(self, &segs[0].source.clone())?,
            Symbology::Code128 | Symbology::Gs1_128 | Symbology::Ean14 | Symbology::Nve18 => {
                linear::code128::encode(self, &segs[0].source.clone())?
            }
            Symbology::Pdf417 | Symbology::Pdf417Comp => matrix::pdf417::pdf417(self, &segs)?,
            Symbology::MicroPdf417 => matrix::pdf417::micropdf417(self, &segs)?,
            Symbology::DataMatrix => matrix::datamatrix::encode(self, &segs)?,
            Symbology::QrCode => matrix::qr::encode(self, &segs)?,
            Symbology::MicroQr => matrix::microqr::encode(self, &segs)?,
            Symbology::Aztec => matrix::aztec::encode(self, &segs)?,
            Symbology::MaxiCode => matrix::maxicode::encode(self, &segs)?,
            Symbology::DotCode => matrix::dotcode::encode(self, &segs)?,
            Symbology::HanXin | Symbology::GridMatrix | Symbology::Rmqr => {
                // Dispatched for completeness of the symbology surface;
                // their per-version codeword tables are not carried by
                // this library (see DESIGN.md).
                return Err(self.err(Error::InvalidOption(format!(
                    "{:?} is not supported: its symbology tables are not included in this library",
                    self.symbology
                ))));
            }
        };

        Ok(worse(warning, encoder_warning))
    }

    /// UTF-8 validation plus Latin-1 down-conversion / ECI 26 fallback.
    fn prepare_unicode_seg(&mut self, seg: &mut Segment) -> Result<Option<Warning>, Error> {
        if !common::is_valid_utf8(&seg.source) {
            return Err(self.err(Error::InvalidData("invalid UTF-8 in input data".into())));
        }
        if seg.eci != 0 {
            // Interpretation is pinned; bytes pass through (transcoding to
            // non-Unicode ECIs is the caller's collaborator).
            return Ok(None);
        }
        if seg.source.iter().all(|&b| b < 0x80) {
            return Ok(None);
        }
        // Try ISO 8859-1.
        let text = std::str::from_utf8(&seg.source).expect("validated above");
        if text.chars().all(|c| (c as u32) < 0x100) {
            seg.source = text.chars().map(|c| c as u32 as u8).collect();
            return Ok(None);
        }
        if self.symbology.supports_eci() {
            seg.eci = 26;
            return Ok(self.warn(
                Warning::UsesEci,
                "data not encodable in Latin-1, using ECI 26 (UTF-8)",
            ));
        }
        Err(self.err(Error::InvalidData(
            "input data cannot be represented in ISO 8859-1".into(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_rejected() {
        let mut symbol = Symbol::new(Symbology::Code128);
        let err = symbol.encode(b"").unwrap_err();
        assert_eq!(err.code(), 6);
        assert!(!symbol.errtxt.is_empty());
    }

    #[test]
    fn test_module_bit_addressing() {
        let mut symbol = Symbol::new(Symbology::Code128);
        symbol.set_module(2, 17);
        assert!(symbol.module_is_set(2, 17));
        assert!(!symbol.module_is_set(2, 16));
        assert!(!symbol.module_is_set(1, 17));
        assert_eq!(symbol.encoded_data[2][2], 0x02);
        symbol.unset_module(2, 17);
        assert!(!symbol.module_is_set(2, 17));
    }

    #[test]
    fn test_multiple_segments_need_capable_symbology() {
        let mut symbol = Symbol::new(Symbology::Code39);
        let segs = vec![Segment::new(&b"AB"[..], 0), Segment::new(&b"CD"[..], 7)];
        let err = symbol.encode_segs(segs).unwrap_err();
        assert_eq!(err.code(), 8);
    }

    #[test]
    fn test_eci_requires_capable_symbology() {
        let mut symbol = Symbol::new(Symbology::Code39);
        symbol.eci = 7;
        assert_eq!(symbol.encode(b"AB").unwrap_err().code(), 8);
    }

    #[test]
    fn test_default_eci_inherited_between_segments() {
        let mut symbol = Symbol::new(Symbology::Pdf417);
        let segs = vec![Segment::new(&b"AB"[..], 7), Segment::new(&b"CD"[..], 0)];
        // Should encode without error; the second segment reverts to the
        // default interpretation explicitly.
        symbol.encode_segs(segs).unwrap();
        assert!(symbol.rows >= 3);
    }

    #[test]
    fn test_unicode_latin1_downconversion() {
        let mut symbol = Symbol::new(Symbology::Code128);
        symbol.input_mode.base = BaseMode::Unicode;
        symbol.encode("é".as_bytes()).unwrap();
        assert_eq!(symbol.rows, 1);
    }

    #[test]
    fn test_unicode_invalid_utf8_rejected() {
        let mut symbol = Symbol::new(Symbology::Code128);
        symbol.input_mode.base = BaseMode::Unicode;
        assert_eq!(symbol.encode(&[0xC3]).unwrap_err().code(), 6);
    }

    #[test]
    fn test_unicode_non_latin1_needs_eci() {
        let mut symbol = Symbol::new(Symbology::Code128);
        symbol.input_mode.base = BaseMode::Unicode;
        assert_eq!(symbol.encode("Ω".as_bytes()).unwrap_err().code(), 6);

        let mut symbol = Symbol::new(Symbology::DataMatrix);
        symbol.input_mode.base = BaseMode::Unicode;
        let warning = symbol.encode("Ω".as_bytes()).unwrap();
        assert_eq!(warning, Some(Warning::UsesEci));
    }

    #[test]
    fn test_fail_all_promotes_warnings() {
        let mut symbol = Symbol::new(Symbology::DataMatrix);
        symbol.input_mode.base = BaseMode::Unicode;
        symbol.warn_level = WarnLevel::FailAll;
        let err = symbol.encode("Ω".as_bytes()).unwrap_err();
        assert_eq!(err.code(), 6);
        assert_eq!(symbol.rows, 0); // no partial output
    }

    #[test]
    fn test_gs1_mode_needs_capable_symbology() {
        let mut symbol = Symbol::new(Symbology::Code39);
        symbol.input_mode.base = BaseMode::Gs1;
        assert_eq!(symbol.encode(b"[01]12345678901231").unwrap_err().code(), 8);
    }

    #[test]
    fn test_gs1_with_reader_init_rejected() {
        let mut symbol = Symbol::new(Symbology::DataMatrix);
        symbol.input_mode.base = BaseMode::Gs1;
        symbol.output_options.reader_init = true;
        assert_eq!(symbol.encode(b"[01]12345678901231").unwrap_err().code(), 8);
    }

    #[test]
    fn test_output_cleared_on_error() {
        let mut symbol = Symbol::new(Symbology::Code128);
        symbol.encode(b"ok").unwrap();
        assert!(symbol.rows > 0);
        symbol.encode(b"").unwrap_err();
        assert_eq!(symbol.rows, 0);
        assert_eq!(symbol.width, 0);
        assert!(symbol.encoded_data.is_empty());
    }
}
