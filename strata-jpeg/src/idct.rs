//! Accurate integer inverse DCT
//!
//! Separable 8x8 IDCT using the Loeffler/Ligtenberg/Moschytz factorization
//! with 13-bit constants, the same arithmetic as libjpeg's "islow" method.
//! Arithmetic wraps so corrupt coefficients can never trap; they only
//! produce garbage pixels.

const CONST_BITS: u32 = 13;
const PASS1_BITS: u32 = 2;

const FIX_0_298631336: i32 = 2446;
const FIX_0_390180644: i32 = 3196;
const FIX_0_541196100: i32 = 4433;
const FIX_0_765366865: i32 = 6270;
const FIX_0_899976223: i32 = 7373;
const FIX_1_175875602: i32 = 9633;
const FIX_1_501321110: i32 = 12299;
const FIX_1_847759065: i32 = 15137;
const FIX_1_961570560: i32 = 16069;
const FIX_2_053119869: i32 = 16819;
const FIX_2_562915447: i32 = 20995;
const FIX_3_072711026: i32 = 25172;

#[inline]
fn descale(x: i32, n: u32) -> i32 {
    x.wrapping_add(1 << (n - 1)) >> n
}

#[inline]
fn mul(a: i32, b: i32) -> i32 {
    a.wrapping_mul(b)
}

/// One 1-D pass over 8 values spaced `stride` apart in `input`.
///
/// Returns the 8 outputs before descaling.
#[inline]
fn idct_1d(input: &[i32; 64], base: usize, stride: usize) -> [i32; 8] {
    let at = |i: usize| input[base + i * stride];

    // Even part
    let z2 = at(2);
    let z3 = at(6);
    let z1 = mul(z2.wrapping_add(z3), FIX_0_541196100);
    let tmp2 = z1.wrapping_add(mul(z3, -FIX_1_847759065));
    let tmp3 = z1.wrapping_add(mul(z2, FIX_0_765366865));

    let z2 = at(0);
    let z3 = at(4);
    let tmp0 = z2.wrapping_add(z3).wrapping_shl(CONST_BITS);
    let tmp1 = z2.wrapping_sub(z3).wrapping_shl(CONST_BITS);

    let tmp10 = tmp0.wrapping_add(tmp3);
    let tmp13 = tmp0.wrapping_sub(tmp3);
    let tmp11 = tmp1.wrapping_add(tmp2);
    let tmp12 = tmp1.wrapping_sub(tmp2);

    // Odd part
    let t0 = at(7);
    let t1 = at(5);
    let t2 = at(3);
    let t3 = at(1);

    let z1 = t0.wrapping_add(t3);
    let z2 = t1.wrapping_add(t2);
    let z3 = t0.wrapping_add(t2);
    let z4 = t1.wrapping_add(t3);
    let z5 = mul(z3.wrapping_add(z4), FIX_1_175875602);

    let t0 = mul(t0, FIX_0_298631336);
    let t1 = mul(t1, FIX_2_053119869);
    let t2 = mul(t2, FIX_3_072711026);
    let t3 = mul(t3, FIX_1_501321110);
    let z1 = mul(z1, -FIX_0_899976223);
    let z2 = mul(z2, -FIX_2_562915447);
    let z3 = mul(z3, -FIX_1_961570560).wrapping_add(z5);
    let z4 = mul(z4, -FIX_0_390180644).wrapping_add(z5);

    let t0 = t0.wrapping_add(z1).wrapping_add(z3);
    let t1 = t1.wrapping_add(z2).wrapping_add(z4);
    let t2 = t2.wrapping_add(z2).wrapping_add(z3);
    let t3 = t3.wrapping_add(z1).wrapping_add(z4);

    [
        tmp10.wrapping_add(t3),
        tmp11.wrapping_add(t2),
        tmp12.wrapping_add(t1),
        tmp13.wrapping_add(t0),
        tmp13.wrapping_sub(t0),
        tmp12.wrapping_sub(t1),
        tmp11.wrapping_sub(t2),
        tmp10.wrapping_sub(t3),
    ]
}

/// Inverse-transform dequantized coefficients (natural order) into
/// level-shifted 8-bit samples.
pub(crate) fn idct_8x8(coef: &[i32; 64], out: &mut [u8; 64]) {
    let mut ws = [0i32; 64];

    // Pass 1: columns
    for col in 0..8 {
        let ac_zero = (1..8).all(|row| coef[row * 8 + col] == 0);
        if ac_zero {
            let dc = coef[col].wrapping_shl(PASS1_BITS);
            for row in 0..8 {
                ws[row * 8 + col] = dc;
            }
            continue;
        }
        let v = idct_1d(coef, col, 8);
        for (row, value) in v.iter().enumerate() {
            ws[row * 8 + col] = descale(*value, CONST_BITS - PASS1_BITS);
        }
    }

    // Pass 2: rows
    for row in 0..8 {
        let base = row * 8;
        let ac_zero = ws[base + 1..base + 8].iter().all(|&v| v == 0);
        if ac_zero {
            let v = level_shift(descale(ws[base], PASS1_BITS + 3));
            out[base..base + 8].fill(v);
            continue;
        }
        let v = idct_1d(&ws, base, 1);
        for (col, value) in v.iter().enumerate() {
            out[base + col] = level_shift(descale(*value, CONST_BITS + PASS1_BITS + 3));
        }
    }
}

#[inline]
fn level_shift(v: i32) -> u8 {
    v.wrapping_add(128).clamp(0, 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dc_only_block_is_flat() {
        let mut coef = [0i32; 64];
        coef[0] = 576; // (200 - 128) * 8
        let mut out = [0u8; 64];
        idct_8x8(&coef, &mut out);
        assert!(out.iter().all(|&v| v == 200));

        coef[0] = -576;
        idct_8x8(&coef, &mut out);
        assert!(out.iter().all(|&v| v == 56));
    }

    #[test]
    fn test_zero_block_is_mid_gray() {
        let coef = [0i32; 64];
        let mut out = [0u8; 64];
        idct_8x8(&coef, &mut out);
        assert!(out.iter().all(|&v| v == 128));
    }

    #[test]
    fn test_horizontal_frequency_varies_across_columns() {
        let mut coef = [0i32; 64];
        coef[1] = 200;
        let mut out = [0u8; 64];
        idct_8x8(&coef, &mut out);
        // Every row identical, left brighter than right
        for row in 1..8 {
            assert_eq!(out[row * 8..row * 8 + 8], out[0..8]);
        }
        assert!(out[0] > out[7]);
    }

    #[test]
    fn test_extreme_coefficients_do_not_trap() {
        let coef = [i32::MAX / 3; 64];
        let mut out = [0u8; 64];
        idct_8x8(&coef, &mut out);
    }
}
