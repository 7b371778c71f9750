//! # GS1 Validator and Reducer
//!
//! Parses a bracketed Application Identifier stream, validates AI
//! structure and content, and emits the "reduced" stream where AI
//! boundaries are marked with a literal `[` standing in for FNC1 (safe
//! because `[` is never a valid GS1 payload byte). The marker is omitted
//! after AIs whose length is predefined by the GS1 General Specifications.
//!
//! The content linter built in here covers the common AI table; a fuller
//! rule set can replace [`lint`] without touching the reducer.

use crate::common::{chr_cnt, ctoi, itoc, to_int};
use crate::error::{Error, Warning};
use crate::symbol::Symbol;

/// Standard GS1 check digit: mod-10 with weights 3/1 alternating from the
/// right.
pub fn check_digit(source: &[u8]) -> u8 {
    let mut factor = if source.len() & 1 == 1 { 3 } else { 1 };
    let mut count = 0;
    for &c in source {
        count += factor * ctoi(c);
        factor = if factor == 1 { 3 } else { 1 };
    }
    itoc((10 - count % 10) % 10)
}

/// AI content checks for the built-in linter.
#[derive(Debug, Clone, Copy)]
enum AiCheck {
    Numeric { min: usize, max: usize },
    /// Fixed-length numeric whose last digit is a GS1 check digit.
    NumericCsum { len: usize },
    Cset82 { min: usize, max: usize },
    Cset39 { min: usize, max: usize },
    /// YYMMDD with a zero day permitted ("end of month").
    DateYymmd0,
    /// Fixed numeric part with check digit, then optional CSET 82 serial.
    NumericCsumThenC82 { fixed: usize, max_extra: usize },
    /// Fixed numeric prefix then CSET 82 payload.
    NumericThenC82 { fixed: usize, max_extra: usize },
}

/// (first AI, last AI, check). Ranges are inclusive and the table is
/// searched in order.
#[rustfmt::skip]
static AI_TABLE: &[(u16, u16, AiCheck)] = &[
    (0, 0, AiCheck::NumericCsum { len: 18 }),
    (1, 2, AiCheck::NumericCsum { len: 14 }),
    (10, 10, AiCheck::Cset82 { min: 1, max: 20 }),
    (11, 13, AiCheck::DateYymmd0),
    (15, 17, AiCheck::DateYymmd0),
    (20, 20, AiCheck::Numeric { min: 2, max: 2 }),
    (21, 22, AiCheck::Cset82 { min: 1, max: 20 }),
    (30, 30, AiCheck::Numeric { min: 1, max: 8 }),
    (37, 37, AiCheck::Numeric { min: 1, max: 8 }),
    (90, 90, AiCheck::Cset82 { min: 1, max: 30 }),
    (91, 99, AiCheck::Cset82 { min: 1, max: 90 }),
    (235, 235, AiCheck::Cset82 { min: 1, max: 28 }),
    (240, 241, AiCheck::Cset82 { min: 1, max: 30 }),
    (242, 242, AiCheck::Numeric { min: 1, max: 6 }),
    (243, 243, AiCheck::Cset82 { min: 1, max: 20 }),
    (250, 251, AiCheck::Cset82 { min: 1, max: 30 }),
    (253, 253, AiCheck::NumericCsumThenC82 { fixed: 13, max_extra: 17 }),
    (254, 254, AiCheck::Cset82 { min: 1, max: 20 }),
    (255, 255, AiCheck::NumericCsumThenC82 { fixed: 13, max_extra: 12 }),
    (400, 401, AiCheck::Cset82 { min: 1, max: 30 }),
    (402, 402, AiCheck::NumericCsum { len: 17 }),
    (403, 403, AiCheck::Cset82 { min: 1, max: 30 }),
    (410, 417, AiCheck::NumericCsum { len: 13 }),
    (420, 420, AiCheck::Cset82 { min: 1, max: 20 }),
    (421, 421, AiCheck::NumericThenC82 { fixed: 3, max_extra: 9 }),
    (422, 422, AiCheck::Numeric { min: 3, max: 3 }),
    (423, 423, AiCheck::Numeric { min: 3, max: 15 }),
    (424, 424, AiCheck::Numeric { min: 3, max: 3 }),
    (425, 425, AiCheck::Numeric { min: 3, max: 15 }),
    (426, 426, AiCheck::Numeric { min: 3, max: 3 }),
    (427, 427, AiCheck::Cset82 { min: 1, max: 3 }),
    (3100, 3699, AiCheck::Numeric { min: 6, max: 6 }),
    (3900, 3909, AiCheck::Numeric { min: 1, max: 15 }),
    (3910, 3919, AiCheck::NumericThenC82 { fixed: 3, max_extra: 15 }),
    (3920, 3929, AiCheck::Numeric { min: 1, max: 15 }),
    (3930, 3939, AiCheck::NumericThenC82 { fixed: 3, max_extra: 15 }),
    (3940, 3949, AiCheck::Numeric { min: 4, max: 4 }),
    (7001, 7001, AiCheck::Numeric { min: 13, max: 13 }),
    (7002, 7002, AiCheck::Cset82 { min: 1, max: 30 }),
    (7003, 7003, AiCheck::Numeric { min: 10, max: 10 }),
    (7004, 7004, AiCheck::Numeric { min: 1, max: 4 }),
    (7005, 7005, AiCheck::Cset82 { min: 1, max: 12 }),
    (7006, 7006, AiCheck::DateYymmd0),
    (7007, 7007, AiCheck::Numeric { min: 6, max: 12 }),
    (7008, 7008, AiCheck::Cset82 { min: 1, max: 3 }),
    (7009, 7009, AiCheck::Cset82 { min: 1, max: 10 }),
    (7010, 7010, AiCheck::Cset82 { min: 1, max: 2 }),
    (7020, 7023, AiCheck::Cset82 { min: 1, max: 20 }),
    (7030, 7039, AiCheck::NumericThenC82 { fixed: 3, max_extra: 27 }),
    (7040, 7040, AiCheck::Cset82 { min: 4, max: 4 }),
    (710, 716, AiCheck::Cset82 { min: 1, max: 20 }),
    (723, 723, AiCheck::Cset82 { min: 2, max: 30 }),
    (8001, 8001, AiCheck::Numeric { min: 14, max: 14 }),
    (8002, 8002, AiCheck::Cset82 { min: 1, max: 20 }),
    (8003, 8003, AiCheck::NumericCsumThenC82 { fixed: 14, max_extra: 16 }),
    (8004, 8004, AiCheck::Cset82 { min: 1, max: 30 }),
    (8005, 8005, AiCheck::Numeric { min: 6, max: 6 }),
    (8006, 8006, AiCheck::NumericThenC82 { fixed: 18, max_extra: 0 }),
    (8007, 8007, AiCheck::Cset82 { min: 5, max: 34 }),
    (8008, 8008, AiCheck::Numeric { min: 8, max: 12 }),
    (8010, 8010, AiCheck::Cset39 { min: 1, max: 30 }),
    (8011, 8011, AiCheck::Numeric { min: 1, max: 12 }),
    (8012, 8012, AiCheck::Cset82 { min: 1, max: 20 }),
    (8013, 8013, AiCheck::Cset82 { min: 1, max: 25 }),
    (8017, 8018, AiCheck::NumericCsum { len: 18 }),
    (8019, 8019, AiCheck::Numeric { min: 1, max: 10 }),
    (8020, 8020, AiCheck::Cset82 { min: 1, max: 25 }),
    (8026, 8026, AiCheck::NumericThenC82 { fixed: 18, max_extra: 0 }),
    (8110, 8110, AiCheck::Numeric { min: 1, max: 70 }),
    (8111, 8111, AiCheck::Numeric { min: 4, max: 4 }),
    (8112, 8112, AiCheck::Numeric { min: 1, max: 70 }),
    (8200, 8200, AiCheck::Cset82 { min: 1, max: 70 }),
];

/// Linter verdicts, mirroring the collaborator interface: unknown AI and
/// bad length are fatal; content problems are warnings.
#[derive(Debug, PartialEq, Eq)]
pub enum LintError {
    UnknownAi,
    BadLength,
    /// 1-based position and description of a content problem.
    Content(usize, String),
}

fn in_cset82(c: u8) -> bool {
    matches!(c,
        b'!' | b'"' | b'%'..=b'?' | b'A'..=b'Z' | b'_' | b'a'..=b'z')
}

fn in_cset39(c: u8) -> bool {
    matches!(c, b'#' | b'-' | b'/' | b'0'..=b'9' | b'A'..=b'Z')
}

fn check_numeric(data: &[u8], offset: usize) -> Result<(), LintError> {
    for (i, &c) in data.iter().enumerate() {
        if !c.is_ascii_digit() {
            return Err(LintError::Content(
                offset + i + 1,
                format!("non-numeric character '{}'", c as char),
            ));
        }
    }
    Ok(())
}

fn check_cset(data: &[u8], offset: usize, test: fn(u8) -> bool, name: &str) -> Result<(), LintError> {
    for (i, &c) in data.iter().enumerate() {
        if !test(c) {
            return Err(LintError::Content(
                offset + i + 1,
                format!("invalid {} character '{}'", name, c as char),
            ));
        }
    }
    Ok(())
}

fn check_csum(data: &[u8]) -> Result<(), LintError> {
    let expected = check_digit(&data[..data.len() - 1]);
    let got = data[data.len() - 1];
    if got != expected {
        return Err(LintError::Content(
            data.len(),
            format!("bad checksum '{}', expected '{}'", got as char, expected as char),
        ));
    }
    Ok(())
}

fn check_date_yymmd0(data: &[u8]) -> Result<(), LintError> {
    static DAYS_IN_MONTH: [i32; 13] = [0, 31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    if data.len() != 6 {
        return Err(LintError::BadLength);
    }
    check_numeric(data, 0)?;
    let month = to_int(&data[2..4]);
    if month == 0 || month > 12 {
        return Err(LintError::Content(3, format!("invalid month '{}{}'", data[2] as char, data[3] as char)));
    }
    let day = to_int(&data[4..6]);
    if day > DAYS_IN_MONTH[month as usize] {
        return Err(LintError::Content(5, format!("invalid day '{}{}'", data[4] as char, data[5] as char)));
    }
    if month == 2 && day == 29 {
        let year = to_int(&data[0..2]);
        if year & 3 != 0 {
            return Err(LintError::Content(5, "invalid day '29'".into()));
        }
    }
    Ok(())
}

/// Validates one AI's data. The collaborator seam: swap this out for a
/// complete rule table without touching the reducer.
pub fn lint(ai: u16, data: &[u8]) -> Result<(), LintError> {
    let check = AI_TABLE
        .iter()
        .find(|&&(lo, hi, _)| ai >= lo && ai <= hi)
        .map(|&(_, _, c)| c)
        .ok_or(LintError::UnknownAi)?;

    match check {
        AiCheck::Numeric { min, max } => {
            if data.len() < min || data.len() > max {
                return Err(LintError::BadLength);
            }
            check_numeric(data, 0)
        }
        AiCheck::NumericCsum { len } => {
            if data.len() != len {
                return Err(LintError::BadLength);
            }
            check_numeric(data, 0)?;
            check_csum(data)
        }
        AiCheck::Cset82 { min, max } => {
            if data.len() < min || data.len() > max {
                return Err(LintError::BadLength);
            }
            check_cset(data, 0, in_cset82, "CSET 82")
        }
        AiCheck::Cset39 { min, max } => {
            if data.len() < min || data.len() > max {
                return Err(LintError::BadLength);
            }
            check_cset(data, 0, in_cset39, "CSET 39")
        }
        AiCheck::DateYymmd0 => check_date_yymmd0(data),
        AiCheck::NumericCsumThenC82 { fixed, max_extra } => {
            if data.len() < fixed || data.len() > fixed + max_extra {
                return Err(LintError::BadLength);
            }
            check_numeric(&data[..fixed], 0)?;
            check_csum(&data[..fixed])?;
            check_cset(&data[fixed..], fixed, in_cset82, "CSET 82")
        }
        AiCheck::NumericThenC82 { fixed, max_extra } => {
            if data.len() < fixed || data.len() > fixed + max_extra {
                return Err(LintError::BadLength);
            }
            check_numeric(&data[..fixed], 0)?;
            check_cset(&data[fixed..], fixed, in_cset82, "CSET 82")
        }
    }
}

/// AIs whose data length is predefined: no FNC1 separator is needed after
/// them (GS1 General Specifications figure of predefined-length element
/// strings, keyed on the first two digits).
fn ai_fixed_length(first_two: i32) -> bool {
    matches!(first_two, 0..=4 | 11..=20 | 23 | 31..=36 | 41)
}

/// Verifies a GS1 element string and produces the reduced form.
pub fn verify(symbol: &mut Symbol, source: &[u8]) -> Result<(Vec<u8>, Option<Warning>), Error> {
    let (obracket, cbracket) = if symbol.input_mode.gs1_parens {
        (b'(', b')')
    } else {
        (b'[', b']')
    };
    let mut warning = None;

    for &c in source {
        if c >= 128 {
            return Err(symbol.err(Error::InvalidData(
                "extended ASCII characters are not supported by GS1".into(),
            )));
        }
        if c == 0 {
            return Err(symbol.err(Error::InvalidData(
                "NUL characters not permitted in GS1 mode".into(),
            )));
        }
        if c < 32 {
            return Err(symbol.err(Error::InvalidData(
                "control characters are not supported by GS1".into(),
            )));
        }
        if c == 127 {
            return Err(symbol.err(Error::InvalidData(
                "DEL characters are not supported by GS1".into(),
            )));
        }
    }

    if source[0] != obracket {
        return Err(symbol.err(Error::InvalidData("data does not start with an AI".into())));
    }

    // Bracket structure sweep.
    let mut bracket_level = 0i32;
    let mut max_bracket_level = 0i32;
    let mut ai_length = 0i32;
    let mut max_ai_length = 0i32;
    let mut min_ai_length = 5i32;
    let mut in_ai = 0i32;
    let mut non_numeric_ai = false;
    for &c in source {
        ai_length += in_ai;
        if in_ai == 1 && c != cbracket && !c.is_ascii_digit() {
            non_numeric_ai = true;
        }
        if c == obracket {
            bracket_level += 1;
            in_ai = 1;
        }
        if c == cbracket {
            bracket_level -= 1;
            if ai_length < min_ai_length {
                min_ai_length = ai_length;
            }
            in_ai = 0;
            ai_length = 0;
        }
        max_bracket_level = max_bracket_level.max(bracket_level);
        max_ai_length = max_ai_length.max(ai_length);
    }
    min_ai_length -= 1;

    if bracket_level != 0 {
        return Err(symbol.err(Error::InvalidData(
            "malformed AI in input data (brackets don't match)".into(),
        )));
    }
    if max_bracket_level > 1 {
        return Err(symbol.err(Error::InvalidData("found nested brackets in input data".into())));
    }
    if max_ai_length > 4 {
        return Err(symbol.err(Error::InvalidData("invalid AI in input data (AI too long)".into())));
    }
    if min_ai_length <= 1 {
        return Err(symbol.err(Error::InvalidData("invalid AI in input data (AI too short)".into())));
    }
    if non_numeric_ai {
        return Err(symbol.err(Error::InvalidData(
            "invalid AI in input data (non-numeric characters in AI)".into(),
        )));
    }

    // Collect AI values and their data fields.
    let ai_max = chr_cnt(source, obracket);
    let mut ai_value = Vec::with_capacity(ai_max);
    let mut data_location = Vec::with_capacity(ai_max);
    let mut data_length = Vec::with_capacity(ai_max);
    let mut i = 1;
    while i < source.len() {
        if source[i - 1] == obracket {
            let mut j = i;
            while source[j] != cbracket {
                j += 1;
            }
            ai_value.push(to_int(&source[i..j]) as u16);
            let data_loc = j + 1;
            let mut len = 0;
            while data_loc + len < source.len() && source[data_loc + len] != obracket {
                len += 1;
            }
            if len == 0 {
                return Err(symbol.err(Error::InvalidData("empty data field in input data".into())));
            }
            data_location.push(data_loc);
            data_length.push(len);
            i = data_loc;
        } else {
            i += 1;
        }
    }

    if !symbol.input_mode.gs1_nocheck {
        for k in 0..ai_value.len() {
            let data = &source[data_location[k]..data_location[k] + data_length[k]];
            match lint(ai_value[k], data) {
                Ok(()) => {}
                Err(LintError::UnknownAi) => {
                    return Err(symbol.err(Error::InvalidData(format!(
                        "invalid AI ({:02})",
                        ai_value[k]
                    ))));
                }
                Err(LintError::BadLength) => {
                    return Err(symbol.err(Error::InvalidData(format!(
                        "invalid data length for AI ({:02})",
                        ai_value[k]
                    ))));
                }
                Err(LintError::Content(posn, msg)) => {
                    warning = symbol.warn(
                        Warning::NonCompliant,
                        format!("AI ({:02}) position {}: {}", ai_value[k], posn, msg),
                    );
                }
            }
        }
    }

    // Resolve AI data into the reduced string.
    let mut reduced = Vec::with_capacity(source.len());
    let mut ai_latch = true;
    let mut i = 0;
    while i < source.len() {
        let c = source[i];
        if c != obracket && c != cbracket {
            reduced.push(c);
        }
        if c == obracket {
            // Start of an AI string.
            if !ai_latch {
                reduced.push(b'[');
            }
            let last_ai = to_int(&source[i + 1..i + 3]);
            // Predefined-length AIs are not followed by FNC1.
            ai_latch = ai_fixed_length(last_ai);
        }
        // The closing bracket is simply dropped.
        i += 1;
    }

    Ok((reduced, warning))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{Symbol, Symbology};

    fn symbol() -> Symbol {
        Symbol::new(Symbology::Gs1_128)
    }

    #[test]
    fn test_check_digit() {
        assert_eq!(check_digit(b"1234567890123"), b'1');
        assert_eq!(check_digit(b"629104150021"), b'3');
        assert_eq!(check_digit(b"00000000000"), b'0');
    }

    #[test]
    fn test_reduction_marks_variable_ais() {
        let mut s = symbol();
        // (01) is predefined-length: no separator before (10); (10) is
        // variable: separator before (21).
        let (reduced, warning) =
            verify(&mut s, b"[01]12345678901231[10]ABC123[21]456").unwrap();
        assert_eq!(reduced, b"011234567890123110ABC123[21456");
        assert_eq!(warning, None);
    }

    #[test]
    fn test_parens_mode() {
        let mut s = symbol();
        s.input_mode.gs1_parens = true;
        let (reduced, _) = verify(&mut s, b"(01)12345678901231").unwrap();
        assert_eq!(reduced, b"0112345678901231");
    }

    #[test]
    fn test_structure_errors() {
        assert_eq!(verify(&mut symbol(), b"01]12").unwrap_err().code(), 6);
        assert_eq!(verify(&mut symbol(), b"[01[10]]12").unwrap_err().code(), 6);
        assert_eq!(verify(&mut symbol(), b"[01]").unwrap_err().code(), 6); // empty field
        assert_eq!(verify(&mut symbol(), b"[1]2").unwrap_err().code(), 6); // AI too short
        assert_eq!(verify(&mut symbol(), b"[12345]6").unwrap_err().code(), 6); // AI too long
        assert_eq!(verify(&mut symbol(), b"[1x]23").unwrap_err().code(), 6); // non-numeric AI
        assert_eq!(verify(&mut symbol(), b"[99]\x07").unwrap_err().code(), 6); // control char
    }

    #[test]
    fn test_unknown_ai_fatal() {
        assert_eq!(verify(&mut symbol(), b"[05]123").unwrap_err().code(), 6);
    }

    #[test]
    fn test_bad_length_fatal() {
        assert_eq!(
            verify(&mut symbol(), b"[01]123456789012312").unwrap_err().code(),
            6
        );
    }

    #[test]
    fn test_bad_check_digit_warns() {
        let mut s = symbol();
        let (_, warning) = verify(&mut s, b"[01]12345678901234").unwrap();
        assert_eq!(warning, Some(Warning::NonCompliant));
        assert!(s.errtxt.contains("checksum"));
    }

    #[test]
    fn test_nocheck_skips_content_lint() {
        let mut s = symbol();
        s.input_mode.gs1_nocheck = true;
        let (_, warning) = verify(&mut s, b"[01]12345678901234").unwrap();
        assert_eq!(warning, None);
    }

    #[test]
    fn test_date_lint() {
        assert!(lint(17, b"991200").is_ok()); // zero day allowed
        assert!(lint(17, b"991301").is_err()); // month 13
        assert!(lint(17, b"990229").is_err()); // 99 not a leap year
        assert!(lint(17, b"960229").is_ok()); // 96 is
    }

    #[test]
    fn test_lint_positions_are_one_based() {
        match lint(10, b"AB\x19C") {
            Err(LintError::Content(pos, _)) => assert_eq!(pos, 3),
            other => panic!("expected content error, got {other:?}"),
        }
    }
}
