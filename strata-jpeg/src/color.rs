//! JFIF YCbCr to RGB conversion (16.16 fixed point)

const CR_R: i32 = 91_881; // 1.402
const CB_G: i32 = 22_554; // 0.344136
const CR_G: i32 = 46_802; // 0.714136
const CB_B: i32 = 116_130; // 1.772
const HALF: i32 = 1 << 15;

#[inline]
fn clamp(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Convert one YCbCr sample triple to RGB888
///
/// Neutral chroma (`cb == cr == 128`) maps exactly to `(y, y, y)`.
#[inline]
pub fn ycc_to_rgb(y: u8, cb: u8, cr: u8) -> (u8, u8, u8) {
    let y = y as i32;
    let cb = cb as i32 - 128;
    let cr = cr as i32 - 128;
    let r = y + ((CR_R * cr + HALF) >> 16);
    let g = y - ((CB_G * cb + CR_G * cr + HALF) >> 16);
    let b = y + ((CB_B * cb + HALF) >> 16);
    (clamp(r), clamp(g), clamp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_chroma_is_gray() {
        for y in [0u8, 1, 77, 128, 200, 255] {
            assert_eq!(ycc_to_rgb(y, 128, 128), (y, y, y));
        }
    }

    #[test]
    fn test_saturated_colors_clamp() {
        let (r, _, b) = ycc_to_rgb(255, 255, 255);
        assert_eq!(r, 255);
        assert_eq!(b, 255);
        let (r, g, b) = ycc_to_rgb(0, 0, 0);
        assert_eq!(r, 0);
        assert_eq!(b, 0);
        assert!(g > 0);
    }

    #[test]
    fn test_red_dominant() {
        let (r, g, b) = ycc_to_rgb(76, 85, 255);
        assert!(r > 240);
        assert!(g < 10);
        assert!(b < 10);
    }
}
