//! # Reed-Solomon Codecs
//!
//! Three parameterizations share the same systematic-division shape:
//!
//! - [`RsCode`]: byte-wide fields (degree <= 8) over a fixed set of prime
//!   polynomials, with log/antilog tables evaluated at compile time.
//! - [`RsUint`]: wider binary fields (9..=30 bits) with heap-allocated
//!   tables owned per instance and released on drop.
//! - [`Rs929`]: the prime field GF(929) used by the stacked symbologies,
//!   with generator roots 3^1, 3^2, ...
//!
//! The binary-field encoders return the residual with `res[i]` holding the
//! coefficient of `x^i`, i.e. reversed relative to transmission order;
//! callers append it back-to-front. [`Rs929`] returns its check codewords
//! already in transmission order.

/// Log/antilog tables for one byte-wide Galois field.
///
/// `alog` is doubled so products of two logs never need a modulo.
pub struct Gf {
    logmod: usize,
    logt: [u16; 256],
    alog: [u16; 512],
}

const fn gf_tables(prime_poly: u32) -> Gf {
    // Field size from the highest bit of the characteristic polynomial.
    let mut b = 1u32;
    while b <= prime_poly {
        b <<= 1;
    }
    b >>= 1;
    let logmod = (b - 1) as usize;

    let mut logt = [0u16; 256];
    let mut alog = [0u16; 512];
    let mut p = 1u32;
    let mut v = 0;
    while v < logmod {
        alog[v] = p as u16;
        alog[logmod + v] = p as u16;
        logt[p as usize] = v as u16;
        p <<= 1;
        if p & b != 0 {
            p ^= prime_poly;
        }
        v += 1;
    }
    Gf { logmod, logt, alog }
}

static GF_0X13: Gf = gf_tables(0x13);
static GF_0X25: Gf = gf_tables(0x25);
static GF_0X43: Gf = gf_tables(0x43);
static GF_0X89: Gf = gf_tables(0x89);
static GF_0X11D: Gf = gf_tables(0x11d);
static GF_0X12D: Gf = gf_tables(0x12d);
static GF_0X163: Gf = gf_tables(0x163);

fn byte_gf(prime_poly: u32) -> &'static Gf {
    match prime_poly {
        0x13 => &GF_0X13,
        0x25 => &GF_0X25,
        0x43 => &GF_0X43,
        0x89 => &GF_0X89,
        0x11d => &GF_0X11D,
        0x12d => &GF_0X12D,
        0x163 => &GF_0X163,
        _ => panic!("unsupported prime polynomial"),
    }
}

/// Byte-wide Reed-Solomon encoder.
pub struct RsCode {
    gf: &'static Gf,
    nsym: usize,
    rspoly: Vec<u16>,
}

impl RsCode {
    /// Builds the generator polynomial
    /// `(x - a^index)(x - a^(index+1))...` of `nsym` terms over the field
    /// selected by `prime_poly`.
    pub fn new(prime_poly: u32, nsym: usize, index: usize) -> Self {
        let gf = byte_gf(prime_poly);
        let mut rspoly = vec![0u16; nsym + 1];
        let mut index = index;

        rspoly[0] = 1;
        for i in 1..=nsym {
            rspoly[i] = 1;
            for k in (1..i).rev() {
                if rspoly[k] != 0 {
                    rspoly[k] = gf.alog[(gf.logt[rspoly[k] as usize] as usize + index) % (2 * gf.logmod)];
                }
                rspoly[k] ^= rspoly[k - 1];
            }
            rspoly[0] = gf.alog[(gf.logt[rspoly[0] as usize] as usize + index) % (2 * gf.logmod)];
            index += 1;
        }

        RsCode { gf, nsym, rspoly }
    }

    /// Systematic division; `res[i]` is the remainder coefficient of
    /// `x^i`, so transmission order is back-to-front.
    pub fn encode(&self, data: &[u8]) -> Vec<u8> {
        let gf = self.gf;
        let nsym = self.nsym;
        let mut res = vec![0u8; nsym];

        for &d in data {
            let m = res[nsym - 1] ^ d;
            if m != 0 {
                let log_m = gf.logt[m as usize] as usize;
                for k in (1..nsym).rev() {
                    res[k] = if self.rspoly[k] != 0 {
                        res[k - 1]
                            ^ gf.alog[log_m + gf.logt[self.rspoly[k] as usize] as usize] as u8
                    } else {
                        res[k - 1]
                    };
                }
                // rspoly[0] can't be zero
                res[0] = gf.alog[log_m + gf.logt[self.rspoly[0] as usize] as usize] as u8;
            } else {
                res.copy_within(0..nsym - 1, 1);
                res[0] = 0;
            }
        }
        res
    }
}

/// Reed-Solomon over GF(2^k) for 9 <= k <= 30. Tables are heap-owned per
/// instance, sized by `logmod = 2^k - 1`.
pub struct RsUint {
    logmod: usize,
    logt: Vec<u32>,
    alog: Vec<u32>,
    nsym: usize,
    rspoly: Vec<u32>,
}

impl RsUint {
    /// Builds the field tables and generator polynomial. Allocation
    /// failure surfaces as `None` (callers map it to a memory error).
    pub fn new(prime_poly: u32, logmod: usize, nsym: usize, index: usize) -> Option<Self> {
        let b = logmod + 1;
        let mut logt = Vec::new();
        logt.try_reserve_exact(b).ok()?;
        logt.resize(b, 0u32);
        let mut alog = Vec::new();
        alog.try_reserve_exact(b * 2).ok()?;
        alog.resize(b * 2, 0u32);

        let mut p = 1u32;
        for v in 0..logmod {
            alog[v] = p;
            alog[logmod + v] = p; // doubled, avoids a modulo
            logt[p as usize] = v as u32;
            p <<= 1;
            if p & b as u32 != 0 {
                p ^= prime_poly;
            }
        }

        let mut rspoly = vec![0u32; nsym + 1];
        let mut index = index;
        rspoly[0] = 1;
        for i in 1..=nsym {
            rspoly[i] = 1;
            for k in (1..i).rev() {
                if rspoly[k] != 0 {
                    rspoly[k] = alog[(logt[rspoly[k] as usize] as usize + index) % (2 * logmod)];
                }
                rspoly[k] ^= rspoly[k - 1];
            }
            rspoly[0] = alog[(logt[rspoly[0] as usize] as usize + index) % (2 * logmod)];
            index += 1;
        }

        Some(RsUint { logmod, logt, alog, nsym, rspoly })
    }

    /// As [`RsCode::encode`], for wide symbols.
    pub fn encode(&self, data: &[u32]) -> Vec<u32> {
        let nsym = self.nsym;
        let mut res = vec![0u32; nsym];

        for &d in data {
            let m = res[nsym - 1] ^ d;
            if m != 0 {
                let log_m = self.logt[m as usize] as usize;
                for k in (1..nsym).rev() {
                    res[k] = if self.rspoly[k] != 0 {
                        res[k - 1] ^ self.alog[log_m + self.logt[self.rspoly[k] as usize] as usize]
                    } else {
                        res[k - 1]
                    };
                }
                res[0] = self.alog[log_m + self.logt[self.rspoly[0] as usize] as usize];
            } else {
                res.copy_within(0..nsym - 1, 1);
                res[0] = 0;
            }
        }
        res
    }
}

/// Reed-Solomon over the prime field GF(929), generator roots 3^1..3^nsym.
pub struct Rs929 {
    nsym: usize,
    /// Coefficient of x^j of the generator polynomial, leading term
    /// excluded.
    coeffs: Vec<u32>,
}

impl Rs929 {
    pub fn new(nsym: usize) -> Self {
        // g(x) = (x - 3)(x - 3^2)...(x - 3^nsym) mod 929
        let mut coeffs = vec![0u32; nsym + 1];
        coeffs[0] = 1;
        let mut root = 1u64;
        for i in 1..=nsym {
            root = root * 3 % 929;
            for j in (0..=i).rev() {
                let prev = if j > 0 { coeffs[j - 1] as u64 } else { 0 };
                coeffs[j] = ((prev + 929 * root - coeffs[j] as u64 * root % 929) % 929) as u32;
            }
        }
        coeffs.truncate(nsym);
        Rs929 { nsym, coeffs }
    }

    /// Check codewords in transmission order (append as returned).
    pub fn encode(&self, data: &[u16]) -> Vec<u16> {
        let k = self.nsym;
        let mut mc = vec![0u32; k];
        for &cw in data {
            let total = (cw as u32 + mc[k - 1]) % 929;
            for j in (1..k).rev() {
                mc[j] = (mc[j - 1] + 929 - total * self.coeffs[j] % 929) % 929;
            }
            mc[0] = (929 - total * self.coeffs[0] % 929) % 929;
        }
        mc.iter()
            .rev()
            .map(|&c| if c != 0 { (929 - c) as u16 } else { 0 })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Field multiply via the log tables, for the decode-side checks below.
    fn gf_mul(gf: &Gf, a: u16, b: u16) -> u16 {
        if a == 0 || b == 0 {
            return 0;
        }
        gf.alog[gf.logt[a as usize] as usize + gf.logt[b as usize] as usize]
    }

    fn poly_eval(gf: &Gf, poly: &[u8], x: u16) -> u16 {
        // Horner, highest degree first.
        let mut acc = 0u16;
        for &c in poly {
            acc = gf_mul(gf, acc, x) ^ c as u16;
        }
        acc
    }

    #[test]
    fn test_tables_invertible() {
        let gf = byte_gf(0x12d);
        for v in 1..=255u16 {
            assert_eq!(gf.alog[gf.logt[v as usize] as usize], v);
        }
        let gf = byte_gf(0x43);
        for v in 1..=63u16 {
            assert_eq!(gf.alog[gf.logt[v as usize] as usize], v);
        }
    }

    #[test]
    fn test_codeword_polynomial_has_generator_roots() {
        // data || residual read highest-degree-first must vanish at every
        // root a^1..a^nsym of the generator.
        let rs = RsCode::new(0x12d, 5, 1);
        let data = [10u8, 20, 30, 40, 50, 60];
        let res = rs.encode(&data);
        let mut full: Vec<u8> = data.to_vec();
        full.extend(res.iter().rev().copied()); // highest remainder degree first
        let gf = byte_gf(0x12d);
        for i in 1..=5usize {
            let root = gf.alog[i];
            assert_eq!(poly_eval(gf, &full, root), 0, "root a^{i}");
        }
    }

    #[test]
    fn test_zero_top_coefficient_path() {
        // All-zero data exercises the pure-shift branch.
        let rs = RsCode::new(0x12d, 4, 1);
        assert_eq!(rs.encode(&[0, 0, 0]), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_wide_field_matches_byte_field() {
        // GF(2^8)/0x11d exists in both engines; they must agree.
        let narrow = RsCode::new(0x11d, 7, 0);
        let wide = RsUint::new(0x11d, 255, 7, 0).unwrap();
        let data = [0x12u8, 0x34, 0x56, 0x78, 0x9a];
        let data_u32: Vec<u32> = data.iter().map(|&d| d as u32).collect();
        let a: Vec<u32> = narrow.encode(&data).iter().map(|&d| d as u32).collect();
        assert_eq!(a, wide.encode(&data_u32));
    }

    #[test]
    fn test_wide_field_large() {
        // A 12-bit field as used by the largest matrix alphabets.
        let rs = RsUint::new(0x1069, 4095, 6, 1).unwrap();
        let res = rs.encode(&[100, 200, 300, 4000]);
        assert_eq!(res.len(), 6);
        assert!(res.iter().all(|&r| r < 4096));
    }

    #[test]
    fn test_gf929_generator_level_zero() {
        // g(x) = (x-3)(x-9) = x^2 + 917x + 27 mod 929.
        let rs = Rs929::new(2);
        assert_eq!(rs.coeffs, vec![27, 917]);
    }

    #[test]
    fn test_gf929_residual_vanishes_at_roots() {
        let rs = Rs929::new(8);
        let data = [821u16, 1, 2, 3, 900];
        let ecc = rs.encode(&data);
        assert_eq!(ecc.len(), 8);

        // Evaluate data || ecc at each root 3^i (Horner over GF(929)).
        let mut full: Vec<u64> = data.iter().map(|&d| d as u64).collect();
        full.extend(ecc.iter().map(|&e| e as u64));
        let mut root = 1u64;
        for _ in 0..8 {
            root = root * 3 % 929;
            let mut acc = 0u64;
            for &c in &full {
                acc = (acc * root + c) % 929;
            }
            assert_eq!(acc, 0);
        }
    }
}
