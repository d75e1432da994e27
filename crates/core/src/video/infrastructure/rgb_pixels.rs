use ffmpeg_next::util::frame::video::Video;

/// Copies an RGB24 ffmpeg frame into a tightly packed buffer, dropping the
/// per-row stride padding.
pub(crate) fn unpack_rgb(rgb_frame: &Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_len = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_len]);
    }
    pixels
}

/// Copies a tightly packed RGB buffer into an RGB24 ffmpeg frame.
pub(crate) fn pack_rgb(pixels: &[u8], rgb_frame: &mut Video, width: u32, height: u32) {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data_mut(0);
    let row_len = width as usize * 3;

    for row in 0..height as usize {
        let src = row * row_len;
        let dst = row * stride;
        data[dst..dst + row_len].copy_from_slice(&pixels[src..src + row_len]);
    }
}
