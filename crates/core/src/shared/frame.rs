use image::RgbImage;
use ndarray::ArrayView3;

/// A single video/image frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only. Detection reads the
/// pixels through [`Frame::as_ndarray`]; annotation borrows them as an
/// [`RgbImage`] and hands them back.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

impl Frame {
    pub const CHANNELS: usize = 3;

    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * Self::CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    /// A frame filled with a single RGB color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], index: usize) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * Self::CHANNELS)
            .collect();
        Self::new(data, width, height, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ])
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (
                self.height as usize,
                self.width as usize,
                Self::CHANNELS,
            ),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }

    /// Runs `f` over the pixels as an [`RgbImage`] without copying them.
    pub fn with_rgb_image<R>(&mut self, f: impl FnOnce(&mut RgbImage) -> R) -> R {
        let data = std::mem::take(&mut self.data);
        let mut img = RgbImage::from_raw(self.width, self.height, data)
            .expect("Frame data length must match dimensions");
        let out = f(&mut img);
        self.data = img.into_raw();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 5);
        assert_eq!(frame.size(), (2, 2));
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * 3")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 0);
    }

    #[test]
    fn test_filled_sets_every_pixel() {
        let frame = Frame::filled(3, 2, [10, 20, 30], 0);
        assert_eq!(frame.data().len(), 18);
        assert_eq!(frame.pixel(0, 0), Some([10, 20, 30]));
        assert_eq!(frame.pixel(2, 1), Some([10, 20, 30]));
    }

    #[test]
    fn test_pixel_out_of_bounds() {
        let frame = Frame::filled(2, 2, [0, 0, 0], 0);
        assert_eq!(frame.pixel(2, 0), None);
        assert_eq!(frame.pixel(0, 2), None);
    }

    #[test]
    fn test_as_ndarray_is_height_width_channels() {
        let mut data = vec![0u8; 24]; // 4 wide, 2 high
        data[(4 + 1) * 3] = 255; // row=1, col=1, R
        let frame = Frame::new(data, 4, 2, 0);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 4, 3]);
        assert_eq!(arr[[1, 1, 0]], 255);
    }

    #[test]
    fn test_with_rgb_image_writes_back() {
        let mut frame = Frame::filled(4, 4, [0, 0, 0], 0);
        frame.with_rgb_image(|img| img.put_pixel(3, 2, image::Rgb([1, 2, 3])));
        assert_eq!(frame.pixel(3, 2), Some([1, 2, 3]));
        assert_eq!(frame.data().len(), 48);
    }
}
