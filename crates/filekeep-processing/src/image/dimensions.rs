/// Compute the output size for a resize to `target_height`, preserving aspect ratio.
///
/// The width is `width / height * target_height`, truncated. Sources no taller
/// than the target keep their original size.
pub fn target_dimensions(src_w: u32, src_h: u32, target_height: u32) -> (u32, u32) {
    if src_w == 0 || src_h == 0 || target_height == 0 || target_height >= src_h {
        return (src_w, src_h);
    }

    let width = (src_w as f64 / src_h as f64 * target_height as f64) as u32;

    (width.max(1), target_height)
}

/// Scale factor needed to fit `src` inside `bounds` without enlarging (at most 1.0).
pub fn fit_scale(src_w: u32, src_h: u32, max_w: u32, max_h: u32) -> f64 {
    if src_w == 0 || src_h == 0 {
        return 1.0;
    }
    let scale_w = max_w as f64 / src_w as f64;
    let scale_h = max_h as f64 / src_h as f64;

    scale_w.min(scale_h).min(1.0)
}
