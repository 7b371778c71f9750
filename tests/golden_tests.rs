//! # Golden Tests
//!
//! End-to-end scenarios pinning each encoder's observable output: symbol
//! dimensions, human-readable text, leading bar patterns and the
//! cross-cutting invariants every successful encode upholds.

use barra::{BaseMode, Segment, Symbol, Symbology, WarnLevel, Warning};
use pretty_assertions::assert_eq;

/// Reads the first `n` run lengths out of row 0 of a linear symbol.
fn leading_runs(symbol: &Symbol, n: usize) -> Vec<usize> {
    let mut runs = Vec::new();
    let mut latch = symbol.module_is_set(0, 0);
    let mut run = 0;
    for col in 0..symbol.width {
        if symbol.module_is_set(0, col) == latch {
            run += 1;
        } else {
            runs.push(run);
            if runs.len() == n {
                return runs;
            }
            latch = !latch;
            run = 1;
        }
    }
    runs.push(run);
    runs
}

fn count_dark(symbol: &Symbol) -> usize {
    let mut count = 0;
    for row in 0..symbol.rows {
        for col in 0..symbol.width {
            if symbol.module_is_set(row, col) {
                count += 1;
            }
        }
    }
    count
}

// ============================================================================
// SEED SCENARIOS
// ============================================================================

#[test]
fn test_code128_text() {
    let mut symbol = Symbol::new(Symbology::Code128);
    symbol.encode(b"Rust").unwrap();
    assert_eq!(symbol.rows, 1);
    assert_eq!(symbol.text, "Rust");
    // Start B + 4 data characters + check digit at 11 modules each, stop 13.
    assert_eq!(symbol.width, 79);
    // The row leads with the start-B pattern.
    assert_eq!(leading_runs(&symbol, 6), vec![2, 1, 1, 2, 1, 4]);
}

#[test]
fn test_itf14_check_digit() {
    let mut symbol = Symbol::new(Symbology::Itf14);
    symbol.encode(b"1234567890123").unwrap();
    assert_eq!(symbol.text, "12345678901231");
    // Start 4 + 7 interleaved digit pairs at 18 + stop 5.
    assert_eq!(symbol.width, 135);
    assert_eq!(symbol.rows, 1);
}

#[test]
fn test_datamatrix_digits() {
    let mut symbol = Symbol::new(Symbology::DataMatrix);
    symbol.encode(b"123456").unwrap();
    assert_eq!((symbol.rows, symbol.width), (10, 10));
    // The solid L finder along the bottom and left.
    assert!((0..10).all(|x| symbol.module_is_set(9, x)));
    assert!((0..10).all(|y| symbol.module_is_set(y, 0)));
}

#[test]
fn test_pdf417_digits() {
    let mut symbol = Symbol::new(Symbology::Pdf417);
    symbol.option_1 = 2;
    symbol.option_2 = 4;
    symbol.encode(&[b'1'; 40]).unwrap();
    // 16 data codewords (descriptor + 902 + 14) + 8 check codewords fill
    // 4 columns x 6 rows exactly; pad count = 24 - 16 - 8 = 0.
    assert_eq!(symbol.rows, 6);
    assert_eq!(symbol.width, 17 + 17 + 4 * 17 + 17 + 18);
}

#[test]
fn test_maxicode_mode2() {
    let mut symbol = Symbol::new(Symbology::MaxiCode);
    symbol.option_1 = 2;
    symbol.primary = "123456840001".into();
    symbol.encode(b"abc").unwrap();
    assert_eq!((symbol.rows, symbol.width), (33, 30));
}

#[test]
fn test_dotcode_size_parity() {
    let mut symbol = Symbol::new(Symbology::DotCode);
    symbol.encode(b"A1B2C3").unwrap();
    assert_eq!((symbol.rows + symbol.width) % 2, 1);
}

// ============================================================================
// CROSS-CUTTING INVARIANTS
// ============================================================================

#[test]
fn test_every_symbology_produces_modules() {
    let cases: Vec<(Symbology, &[u8])> = vec![
        (Symbology::Code11, b"123-45"),
        (Symbology::C25Standard, b"1234"),
        (Symbology::C25Industrial, b"1234"),
        (Symbology::C25Iata, b"1234"),
        (Symbology::C25Logic, b"1234"),
        (Symbology::C25Interleaved, b"1234"),
        (Symbology::Itf14, b"1234567890123"),
        (Symbology::DpLeitcode, b"2134807501640"),
        (Symbology::DpIdentcode, b"80420000001"),
        (Symbology::Code39, b"CODE-39"),
        (Symbology::ExtCode39, b"mixed Case"),
        (Symbology::Code93, b"CODE 93"),
        (Symbology::Pzn, b"123456"),
        (Symbology::Vin, b"2GCEC19Z0S1282684"),
        (Symbology::MsiPlessey, b"1234567"),
        (Symbology::Plessey, b"1A3F"),
        (Symbology::Channel, b"12"),
        (Symbology::Code128, b"Code 128!"),
        (Symbology::Ean14, b"1234567890123"),
        (Symbology::Nve18, b"12345678901234567"),
        (Symbology::Pdf417, b"pdf417 data"),
        (Symbology::Pdf417Comp, b"compact"),
        (Symbology::MicroPdf417, b"micro"),
        (Symbology::DataMatrix, b"Data Matrix"),
        (Symbology::QrCode, b"QR CODE"),
        (Symbology::MicroQr, b"01234"),
        (Symbology::Aztec, b"AZTEC 124"),
        (Symbology::MaxiCode, b"maxicode data"),
        (Symbology::DotCode, b"dotcode"),
    ];
    for (symbology, data) in cases {
        let mut symbol = Symbol::new(symbology);
        let result = symbol.encode(data);
        assert!(result.is_ok(), "{symbology:?}: {result:?}");
        assert!(symbol.rows > 0, "{symbology:?} produced no rows");
        assert!(symbol.width > 0, "{symbology:?} produced no width");
        assert!(count_dark(&symbol) > 0, "{symbology:?} produced an empty grid");
    }
}

#[test]
fn test_microqr_and_aztec_dimensions() {
    let mut symbol = Symbol::new(Symbology::MicroQr);
    symbol.encode(b"12345").unwrap();
    assert_eq!((symbol.rows, symbol.width), (11, 11));

    let mut symbol = Symbol::new(Symbology::Aztec);
    symbol.encode(b"AZTEC").unwrap();
    assert_eq!((symbol.rows, symbol.width), (15, 15));
    // Bullseye centre module.
    assert!(symbol.module_is_set(7, 7));
}

#[test]
fn test_unsupported_symbologies_are_dispatched() {
    // The dispatcher acknowledges these symbologies but their version
    // tables are not carried; the error is documented, not a panic.
    for symbology in [Symbology::HanXin, Symbology::GridMatrix, Symbology::Rmqr] {
        let mut symbol = Symbol::new(symbology);
        let err = symbol.encode(b"data").unwrap_err();
        assert_eq!(err.code(), 8, "{symbology:?}");
        assert!(symbol.errtxt.contains("not supported"), "{symbology:?}");
    }
}

#[test]
fn test_gs1_128_symbology() {
    let mut symbol = Symbol::new(Symbology::Gs1_128);
    // GS1-128 input is always an element string, without needing the
    // input-mode flag.
    symbol.encode(b"[01]98898765432106[3202]012345[15]991231").unwrap();
    assert_eq!(symbol.rows, 1);
    assert_eq!(symbol.text, "(01)98898765432106(3202)012345(15)991231");
}

#[test]
fn test_gs1_content_warning_promoted_under_fail_all() {
    let mut relaxed = Symbol::new(Symbology::Gs1_128);
    let warning = relaxed.encode(b"[01]12345678901234").unwrap();
    assert_eq!(warning, Some(Warning::NonCompliant));

    let mut strict = Symbol::new(Symbology::Gs1_128);
    strict.warn_level = WarnLevel::FailAll;
    let err = strict.encode(b"[01]12345678901234").unwrap_err();
    assert_eq!(err.code(), 6);
    assert_eq!(strict.rows, 0);
}

#[test]
fn test_check_digit_carriers_recompute() {
    // For each check-digit symbology, re-encoding the HRT (which includes
    // the computed digit) reproduces the same bars.
    let mut first = Symbol::new(Symbology::Itf14);
    first.encode(b"1234567890123").unwrap();
    let text = first.text.clone();
    let mut second = Symbol::new(Symbology::C25Interleaved);
    second.encode(text.as_bytes()).unwrap();
    assert_eq!(first.encoded_data, second.encoded_data);
}

#[test]
fn test_multi_segment_eci_payloads() {
    let segs = vec![
        Segment::new(&b"ASCII part "[..], 0),
        Segment::new("Ωμέγα".as_bytes(), 26),
    ];
    for symbology in [Symbology::Pdf417, Symbology::MicroPdf417, Symbology::QrCode] {
        let mut symbol = Symbol::new(symbology);
        symbol.encode_segs(segs.clone()).unwrap();
        assert!(symbol.rows > 0, "{symbology:?}");
    }
}

#[test]
fn test_escape_processing() {
    let mut escaped = Symbol::new(Symbology::Code128);
    escaped.input_mode.escape = true;
    escaped.encode(b"AB\\x43D").unwrap();

    let mut plain = Symbol::new(Symbology::Code128);
    plain.encode(b"ABCD").unwrap();
    assert_eq!(escaped.encoded_data, plain.encoded_data);
}

// ============================================================================
// BOUNDARY BEHAVIOUR
// ============================================================================

#[test]
fn test_code128_empty_rejected() {
    let mut symbol = Symbol::new(Symbology::Code128);
    assert_eq!(symbol.encode(b"").unwrap_err().code(), 6);
}

#[test]
fn test_datamatrix_capacity_boundary() {
    // 3116 digits pair-compact into exactly the 144x144 symbol's 1558
    // data codewords; two more digits won't fit.
    let mut symbol = Symbol::new(Symbology::DataMatrix);
    symbol.encode(&vec![b'9'; 3116]).unwrap();
    assert_eq!(symbol.rows, 144);

    let mut symbol = Symbol::new(Symbology::DataMatrix);
    assert_eq!(symbol.encode(&vec![b'9'; 3118]).unwrap_err().code(), 5);
}

#[test]
fn test_dotcode_minimum_dimensions() {
    let mut symbol = Symbol::new(Symbology::DotCode);
    symbol.option_2 = 5;
    symbol.encode(b"x").unwrap();
    assert_eq!(symbol.width, 5);

    let mut symbol = Symbol::new(Symbology::DotCode);
    symbol.option_2 = 4;
    assert_eq!(symbol.encode(b"x").unwrap_err().code(), 8);
}

#[test]
fn test_gs1_bracket_only_rejected() {
    let mut symbol = Symbol::new(Symbology::Gs1_128);
    symbol.input_mode.gs1_parens = true;
    assert_eq!(symbol.encode(b"()").unwrap_err().code(), 6);
}

#[test]
fn test_compliant_height_warnings() {
    let mut symbol = Symbol::new(Symbology::Itf14);
    symbol.output_options.compliant_height = true;
    symbol.height = 2.0; // far below the 5.7X minimum
    let warning = symbol.encode(b"1234567890123").unwrap();
    assert_eq!(warning, Some(Warning::NonCompliant));
}

#[test]
fn test_height_per_row_mode() {
    let mut symbol = Symbol::new(Symbology::Pdf417);
    symbol.input_mode.height_per_row = true;
    symbol.height = 4.0;
    symbol.encode(b"tall rows").unwrap();
    assert_eq!(symbol.height, 4.0 * symbol.rows as f32);
}

#[test]
fn test_unicode_mode_matrix_fallback_to_eci() {
    let mut symbol = Symbol::new(Symbology::QrCode);
    symbol.input_mode.base = BaseMode::Unicode;
    let warning = symbol.encode("日本語".as_bytes()).unwrap();
    assert_eq!(warning, Some(Warning::UsesEci));
}
