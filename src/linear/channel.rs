//! Channel Code (ANSI/AIM BC12).
//!
//! A value 0..=max(channels) is represented by one of the
//! lexicographically ordered (space, bar) width tuples satisfying the
//! sliding-window constraints of the standard. The enumeration visits
//! tuples in increasing value order; the encoder walks it until the
//! target value is reached.

use crate::common::{NEON, expand, itoc, not_sane, set_height};
use crate::error::{Error, Warning, worse};
use crate::symbol::Symbol;

/// Highest encodable value per channel count (index = channels).
static MAX_RANGES: [i64; 9] = [-1, -1, -1, 26, 292, 3493, 44072, 576688, 7742862];

struct Enumerator {
    s: [i32; 8],
    b: [i32; 8],
    value: i64,
    target: i64,
}

impl Enumerator {
    /// Whether the bar loop at position `i` must skip width 1 (a window of
    /// all-ones would otherwise arise).
    fn guard(&self, i: usize) -> bool {
        match i {
            0 => self.s[0] == 1,
            1 => self.s[0] + self.b[0] + self.s[1] == 3,
            _ => self.b[i - 2] + self.s[i - 1] + self.b[i - 1] + self.s[i] == 4,
        }
    }

    /// Depth-first walk over positions `i..=6`; positions 7 are forced by
    /// the remaining width. Returns true when the target tuple is found.
    fn descend(&mut self, i: usize, smax: i32, bmax: i32) -> bool {
        if i == 6 {
            for s6 in 1..=smax {
                self.s[6] = s6;
                self.s[7] = smax + 1 - s6;
                let b_start = if self.guard(6) { 2 } else { 1 };
                for b6 in b_start..=bmax {
                    self.b[6] = b6;
                    self.b[7] = bmax + 1 - b6;
                    if self.b[5] + self.s[6] + self.b[6] + self.s[7] + self.b[7] == 5 {
                        continue;
                    }
                    if self.value == self.target {
                        return true;
                    }
                    self.value += 1;
                }
            }
            return false;
        }
        for si in 1..=smax {
            self.s[i] = si;
            let b_start = if self.guard(i) { 2 } else { 1 };
            for bi in b_start..=bmax {
                self.b[i] = bi;
                if self.descend(i + 1, smax + 1 - si, bmax + 1 - bi) {
                    return true;
                }
            }
        }
        false
    }
}

/// Finds the (S, B) widths encoding `target` for the given channel count.
fn channel_pattern(channels: usize, target: i64) -> ([i32; 8], [i32; 8]) {
    let mut e = Enumerator {
        s: [1; 8],
        b: [1; 8],
        value: 0,
        target,
    };
    // Positions ahead of the active channels stay at single modules; at
    // the first active position both width budgets equal the channel
    // count.
    let found = e.descend(8 - channels, channels as i32, channels as i32);
    debug_assert!(found, "target within the verified range");
    (e.s, e.b)
}

pub fn encode(symbol: &mut Symbol, source: &[u8]) -> Result<Option<Warning>, Error> {
    if source.len() > 7 {
        return Err(symbol.err(Error::TooLong(format!(
            "input length {} too long (maximum 7)",
            source.len()
        ))));
    }
    if let Some(i) = not_sane(NEON, source) {
        return Err(symbol.err(Error::InvalidData(format!(
            "invalid character at position {i} in input (digits only)"
        ))));
    }

    let mut channels = if (3..=8).contains(&symbol.option_2) {
        symbol.option_2 as usize
    } else {
        0
    };

    let mut target: i64 = 0;
    for &c in source {
        target = target * 10 + (c - b'0') as i64;
    }

    if channels == 0 {
        channels = source.len() + 1;
        if target > 576688 && channels < 8 {
            channels = 8;
        } else if target > 44072 && channels < 7 {
            channels = 7;
        } else if target > 3493 && channels < 6 {
            channels = 6;
        } else if target > 292 && channels < 5 {
            channels = 5;
        } else if target > 26 && channels < 4 {
            channels = 4;
        }
    }
    if channels == 2 {
        channels = 3;
    }

    if target > MAX_RANGES[channels] {
        return Err(symbol.err(Error::InvalidData(format!(
            "value out of range (0 to {}) for {} channels",
            MAX_RANGES[channels], channels
        ))));
    }

    let (s, b) = channel_pattern(channels, target);

    let mut pattern: Vec<u8> = Vec::with_capacity(30);
    pattern.extend_from_slice(b"111111111"); // finder
    for i in 8 - channels..8 {
        pattern.push(itoc(s[i]));
        pattern.push(itoc(b[i]));
    }

    // HRT zero-padded to the value capacity of the channel count.
    let zeroes = (channels - 1).saturating_sub(source.len());
    let mut hrt: Vec<u8> = vec![b'0'; zeroes];
    hrt.extend_from_slice(source);
    let hrt_warning = symbol.set_hrt_latin1(&hrt);

    expand(symbol, &pattern);

    let height_warning = if symbol.output_options.compliant_height {
        // ANSI/AIM BC12: min 5mm or 15% of length; X is application
        // defined so use length = (12 + 4 * channels - 2)X.
        let height = (10 + 4 * channels) as f32 * 0.15;
        set_height(symbol, height.max(50.0), height, 0.0, false)
    } else {
        set_height(symbol, 0.0, 50.0, 0.0, true)
    };

    Ok(worse(height_warning, hrt_warning))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbology;

    #[test]
    fn test_value_zero_three_channels() {
        // The first tuple for 3 channels: S = 1,1,3 / B = 2,1,2 over the
        // active positions.
        let (s, b) = channel_pattern(3, 0);
        assert_eq!(&s[5..], &[1, 1, 3]);
        assert_eq!(&b[5..], &[2, 1, 2]);
    }

    #[test]
    fn test_enumeration_is_dense() {
        // Every value up to the 3-channel maximum must be reachable, and
        // the enumeration of 27 values exhausts the space.
        for target in 0..=26 {
            let (s, b) = channel_pattern(3, target);
            let total: i32 = s[5..].iter().sum::<i32>() + b[5..].iter().sum::<i32>();
            assert_eq!(total, 10, "module count for value {target}");
        }
    }

    #[test]
    fn test_max_values_encode() {
        for channels in 3..=6usize {
            let max = MAX_RANGES[channels];
            let (s, b) = channel_pattern(channels, max);
            assert!(s[8 - channels..].iter().all(|&v| v >= 1));
            assert!(b[8 - channels..].iter().all(|&v| v >= 1));
        }
    }

    #[test]
    fn test_encode_sets_hrt_and_width() {
        let mut symbol = Symbol::new(Symbology::Channel);
        encode(&mut symbol, b"0").unwrap();
        assert_eq!(symbol.text, "00");
        // finder 9 + channel runs (4 * channels - 2 = 10 for 3 channels)
        assert_eq!(symbol.width, 19);
    }

    #[test]
    fn test_channels_grow_with_value() {
        let mut symbol = Symbol::new(Symbology::Channel);
        encode(&mut symbol, b"1234").unwrap();
        // 1234 needs 5 channels; HRT padded to 4 digits.
        assert_eq!(symbol.text, "1234");
    }

    #[test]
    fn test_value_out_of_range_for_fixed_channels() {
        let mut symbol = Symbol::new(Symbology::Channel);
        symbol.option_2 = 3;
        assert_eq!(encode(&mut symbol, b"27").unwrap_err().code(), 6);
    }

    #[test]
    fn test_distinct_values_distinct_patterns() {
        let mut seen = std::collections::HashSet::new();
        for target in 0..=26 {
            let (s, b) = channel_pattern(3, target);
            assert!(seen.insert((s, b)), "duplicate pattern for {target}");
        }
    }
}
