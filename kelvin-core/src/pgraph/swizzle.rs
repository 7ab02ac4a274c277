//! Conversion between linear and swizzled (Z-ordered) pixel layouts.
//!
//! Width, height and depth must be powers of two.

/// Bit masks of the swizzled offset belonging to each linear dimension.
///
/// For an 8x32 2D image, x needs 3 bits and y 5, interleaved as `yyyxyxyx`.
fn generate_swizzle_masks(width: u32, height: u32, depth: u32) -> (u32, u32, u32) {
    let (mut x, mut y, mut z) = (0, 0, 0);
    let mut bit = 1;
    let mut mask_bit = 1;
    loop {
        let mut done = true;
        if bit < width {
            x |= mask_bit;
            mask_bit <<= 1;
            done = false;
        }
        if bit < height {
            y |= mask_bit;
            mask_bit <<= 1;
            done = false;
        }
        if bit < depth {
            z |= mask_bit;
            mask_bit <<= 1;
            done = false;
        }
        bit <<= 1;
        if done {
            break;
        }
    }
    debug_assert_eq!(x ^ y ^ z, mask_bit - 1);
    (x, y, z)
}

#[allow(clippy::too_many_arguments)]
pub fn swizzle_box(
    src: &[u8],
    width: u32,
    height: u32,
    depth: u32,
    dst: &mut [u8],
    row_pitch: usize,
    slice_pitch: usize,
    bytes_per_pixel: usize,
) {
    let (mask_x, mask_y, mask_z) = generate_swizzle_masks(width, height, depth);

    let mut off_z = 0u32;
    for z in 0..depth as usize {
        let mut off_y = 0u32;
        for y in 0..height as usize {
            let mut off_x = 0u32;
            let src_row = z * slice_pitch + y * row_pitch;
            let dst_base = (off_y + off_z) as usize;
            for x in 0..width as usize {
                let s = src_row + x * bytes_per_pixel;
                let d = (dst_base + off_x as usize) * bytes_per_pixel;
                dst[d..d + bytes_per_pixel].copy_from_slice(&src[s..s + bytes_per_pixel]);
                // ripple the increment through the bits not in the mask
                off_x = off_x.wrapping_sub(mask_x) & mask_x;
            }
            off_y = off_y.wrapping_sub(mask_y) & mask_y;
        }
        off_z = off_z.wrapping_sub(mask_z) & mask_z;
    }
}

#[allow(clippy::too_many_arguments)]
pub fn unswizzle_box(
    src: &[u8],
    width: u32,
    height: u32,
    depth: u32,
    dst: &mut [u8],
    row_pitch: usize,
    slice_pitch: usize,
    bytes_per_pixel: usize,
) {
    let (mask_x, mask_y, mask_z) = generate_swizzle_masks(width, height, depth);

    let mut off_z = 0u32;
    for z in 0..depth as usize {
        let mut off_y = 0u32;
        for y in 0..height as usize {
            let mut off_x = 0u32;
            let src_base = (off_y + off_z) as usize;
            let dst_row = z * slice_pitch + y * row_pitch;
            for x in 0..width as usize {
                let s = (src_base + off_x as usize) * bytes_per_pixel;
                let d = dst_row + x * bytes_per_pixel;
                dst[d..d + bytes_per_pixel].copy_from_slice(&src[s..s + bytes_per_pixel]);
                off_x = off_x.wrapping_sub(mask_x) & mask_x;
            }
            off_y = off_y.wrapping_sub(mask_y) & mask_y;
        }
        off_z = off_z.wrapping_sub(mask_z) & mask_z;
    }
}

pub fn swizzle_rect(
    src: &[u8],
    width: u32,
    height: u32,
    dst: &mut [u8],
    pitch: usize,
    bytes_per_pixel: usize,
) {
    swizzle_box(src, width, height, 1, dst, pitch, 0, bytes_per_pixel);
}

pub fn unswizzle_rect(
    src: &[u8],
    width: u32,
    height: u32,
    dst: &mut [u8],
    pitch: usize,
    bytes_per_pixel: usize,
) {
    unswizzle_box(src, width, height, 1, dst, pitch, 0, bytes_per_pixel);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_interleave() {
        assert_eq!(
            generate_swizzle_masks(8, 32, 1),
            (0b00010101, 0b11101010, 0)
        );
        assert_eq!(generate_swizzle_masks(2, 2, 2), (0b001, 0b010, 0b100));
    }

    #[test]
    fn swizzle_4x4_layout() {
        // linear index as pixel value
        let linear: Vec<u8> = (0..16).collect();
        let mut swizzled = vec![0; 16];
        swizzle_rect(&linear, 4, 4, &mut swizzled, 4, 1);

        // Z-order: first 2x2 block is (0,0) (1,0) (0,1) (1,1)
        assert_eq!(&swizzled[..4], &[0, 1, 4, 5]);
        assert_eq!(&swizzled[4..8], &[2, 3, 6, 7]);

        let mut back = vec![0; 16];
        unswizzle_rect(&swizzled, 4, 4, &mut back, 4, 1);
        assert_eq!(back, linear);
    }

    #[test]
    fn unswizzle_respects_pitch_and_bpp() {
        let width = 4;
        let height = 2;
        let bpp = 2;
        let pitch = 12;
        let mut linear = vec![0u8; pitch * height as usize];
        for y in 0..height as usize {
            for x in 0..width as usize {
                linear[y * pitch + x * bpp] = (y * 10 + x) as u8;
                linear[y * pitch + x * bpp + 1] = 0xEE;
            }
        }

        let mut swizzled = vec![0; (width * height) as usize * bpp];
        swizzle_rect(&linear, width, height, &mut swizzled, pitch, bpp);
        let mut back = vec![0; pitch * height as usize];
        unswizzle_rect(&swizzled, width, height, &mut back, pitch, bpp);

        for y in 0..height as usize {
            let row = y * pitch;
            assert_eq!(&back[row..row + 8], &linear[row..row + 8]);
        }
    }

    #[test]
    fn box_with_depth() {
        let linear: Vec<u8> = (0..8).collect();
        let mut swizzled = vec![0; 8];
        swizzle_box(&linear, 2, 2, 2, &mut swizzled, 2, 4, 1);
        // x, y and z each take one bit, in that order
        assert_eq!(swizzled, linear);

        let linear: Vec<u8> = (0..16).collect();
        let mut swizzled = vec![0; 16];
        swizzle_box(&linear, 4, 2, 2, &mut swizzled, 4, 8, 1);
        let mut back = vec![0; 16];
        unswizzle_box(&swizzled, 4, 2, 2, &mut back, 4, 8, 1);
        assert_eq!(back, linear);
    }
}
