use crate::error::{CardpressError, CardpressResult};

pub type PremulRgba8 = [u8; 4];

pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

/// Paint `src` over `dst` with its top-left corner at (x, y). Parts of `src`
/// falling outside `dst` are dropped.
#[allow(clippy::too_many_arguments)]
pub fn blit_over(
    dst: &mut [u8],
    dst_w: u32,
    dst_h: u32,
    src: &[u8],
    src_w: u32,
    src_h: u32,
    x: u32,
    y: u32,
) -> CardpressResult<()> {
    check_buffer(dst.len(), dst_w, dst_h, "blit destination")?;
    check_buffer(src.len(), src_w, src_h, "blit source")?;
    if x >= dst_w || y >= dst_h {
        return Ok(());
    }
    let cols = (src_w.min(dst_w - x)) as usize;
    let rows = (src_h.min(dst_h - y)) as usize;
    for row in 0..rows {
        let s0 = row * (src_w as usize) * 4;
        let d0 = ((y as usize + row) * (dst_w as usize) + x as usize) * 4;
        let dst_row = &mut dst[d0..d0 + cols * 4];
        let src_row = &src[s0..s0 + cols * 4];
        for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
            let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], 1.0);
            d.copy_from_slice(&out);
        }
    }
    Ok(())
}

/// Fill an axis-aligned rect, clamped to the buffer bounds.
#[allow(clippy::too_many_arguments)]
pub fn fill_rect(
    dst: &mut [u8],
    dst_w: u32,
    dst_h: u32,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    color: PremulRgba8,
) -> CardpressResult<()> {
    check_buffer(dst.len(), dst_w, dst_h, "fill destination")?;
    if x >= dst_w || y >= dst_h {
        return Ok(());
    }
    let cols = (w.min(dst_w - x)) as usize;
    let rows = (h.min(dst_h - y)) as usize;
    for row in 0..rows {
        let d0 = ((y as usize + row) * (dst_w as usize) + x as usize) * 4;
        for d in dst[d0..d0 + cols * 4].chunks_exact_mut(4) {
            let out = over([d[0], d[1], d[2], d[3]], color, 1.0);
            d.copy_from_slice(&out);
        }
    }
    Ok(())
}

/// Stroke a rect outline with bars of the given thickness, inset into the
/// rect so the outline never exceeds its bounds.
#[allow(clippy::too_many_arguments)]
pub fn stroke_rect(
    dst: &mut [u8],
    dst_w: u32,
    dst_h: u32,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    thickness: u32,
    color: PremulRgba8,
) -> CardpressResult<()> {
    if thickness == 0 || w == 0 || h == 0 {
        return Ok(());
    }
    let t = thickness.min(w).min(h);
    fill_rect(dst, dst_w, dst_h, x, y, w, t, color)?;
    fill_rect(dst, dst_w, dst_h, x, y + h - t, w, t, color)?;
    fill_rect(dst, dst_w, dst_h, x, y, t, h, color)?;
    fill_rect(dst, dst_w, dst_h, x + w - t, y, t, h, color)?;
    Ok(())
}

/// Convert premultiplied RGBA8 back to straight alpha for file export.
pub fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

fn check_buffer(len: usize, w: u32, h: u32, what: &str) -> CardpressResult<()> {
    if len != (w as usize) * (h as usize) * 4 {
        return Err(CardpressError::render(format!(
            "{what} buffer length mismatch"
        )));
    }
    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_opacity_0_is_noop() {
        let dst = [1, 2, 3, 4];
        let src = [200, 200, 200, 200];
        assert_eq!(over(dst, src, 0.0), dst);
    }

    #[test]
    fn over_src_alpha_0_is_noop() {
        let dst = [10, 20, 30, 40];
        let src = [255, 255, 255, 0];
        assert_eq!(over(dst, src, 1.0), dst);
    }

    #[test]
    fn over_src_opaque_replaces_dst() {
        let dst = [0, 0, 0, 255];
        let src = [255, 0, 0, 255];
        assert_eq!(over(dst, src, 1.0), src);
    }

    #[test]
    fn blit_clamps_to_the_destination_edge() {
        let mut dst = vec![0u8; 4 * 4 * 4];
        let src = vec![255u8; 3 * 3 * 4];
        blit_over(&mut dst, 4, 4, &src, 3, 3, 2, 2).unwrap();
        // Pixels (2,2)..(3,3) painted, the rest untouched.
        let idx = |x: usize, y: usize| (y * 4 + x) * 4;
        assert_eq!(&dst[idx(2, 2)..idx(2, 2) + 4], &[255, 255, 255, 255]);
        assert_eq!(&dst[idx(3, 3)..idx(3, 3) + 4], &[255, 255, 255, 255]);
        assert_eq!(&dst[idx(1, 2)..idx(1, 2) + 4], &[0, 0, 0, 0]);
    }

    #[test]
    fn blit_fully_outside_is_noop() {
        let mut dst = vec![7u8; 2 * 2 * 4];
        let src = vec![255u8; 2 * 2 * 4];
        blit_over(&mut dst, 2, 2, &src, 2, 2, 5, 0).unwrap();
        assert!(dst.iter().all(|&b| b == 7));
    }

    #[test]
    fn stroke_leaves_the_interior_untouched() {
        let mut dst = vec![0u8; 8 * 8 * 4];
        stroke_rect(&mut dst, 8, 8, 1, 1, 6, 6, 1, [9, 9, 9, 255]).unwrap();
        let idx = |x: usize, y: usize| (y * 8 + x) * 4;
        assert_eq!(dst[idx(1, 1)], 9);
        assert_eq!(dst[idx(6, 6)], 9);
        assert_eq!(dst[idx(3, 3)], 0);
        assert_eq!(dst[idx(0, 0)], 0);
    }

    #[test]
    fn unpremultiply_restores_straight_channels() {
        // 50% gray at 50% alpha, premultiplied.
        let mut px = [64u8, 64, 64, 128];
        unpremultiply_rgba8_in_place(&mut px);
        assert_eq!(px[3], 128);
        assert!((i16::from(px[0]) - 128).abs() <= 1);
    }

    #[test]
    fn buffer_length_mismatch_is_rejected() {
        let mut dst = vec![0u8; 10];
        let src = vec![0u8; 16];
        assert!(blit_over(&mut dst, 2, 2, &src, 2, 2, 0, 0).is_err());
    }
}
