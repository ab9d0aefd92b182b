use ndarray::{ArrayView3, ArrayViewMut3};

use crate::shared::bounding_box::BoundingBox;
use crate::shared::glyphs::{self, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};

/// A single decoded video frame: contiguous RGB bytes in row-major order.
///
/// `index` is the zero-based position of the frame in its source.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
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

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels inside `bbox` into a new frame.
    ///
    /// The box is clamped to the frame first; returns `None` when nothing
    /// of it lies inside the frame.
    pub fn crop(&self, bbox: &BoundingBox) -> Option<Frame> {
        let b = bbox.clamped(self.width, self.height)?;
        let (x1, y1) = (b.x as usize, b.y as usize);
        let (w, h) = (b.width as usize, b.height as usize);
        let channels = self.channels as usize;
        let row_len = self.width as usize * channels;

        let mut data = Vec::with_capacity(w * h * channels);
        for row in y1..y1 + h {
            let start = row * row_len + x1 * channels;
            data.extend_from_slice(&self.data[start..start + w * channels]);
        }
        Some(Frame::new(data, w as u32, h as u32, self.channels, self.index))
    }

    /// Draws an unfilled rectangle of the given color and line thickness.
    pub fn draw_rectangle(&mut self, bbox: &BoundingBox, color: [u8; 3], thickness: u32) {
        let Some(b) = bbox.clamped(self.width, self.height) else {
            return;
        };
        let channels = (self.channels as usize).min(3);
        let t = thickness.max(1) as i32;
        let (left, top) = (b.x, b.y);
        let (right, bottom) = (b.right() - 1, b.bottom() - 1);

        let mut view = self.as_ndarray_mut();
        for y in top..=bottom {
            for x in left..=right {
                let on_edge = x - left < t || right - x < t || y - top < t || bottom - y < t;
                if on_edge {
                    for c in 0..channels {
                        view[[y as usize, x as usize, c]] = color[c];
                    }
                }
            }
        }
    }

    /// Renders `text` with its top-left corner at (`x`, `y`), each glyph
    /// pixel drawn as a `scale x scale` block. Pixels outside the frame
    /// are clipped.
    pub fn draw_text(&mut self, x: i32, y: i32, text: &str, color: [u8; 3], scale: u32) {
        let scale = scale.max(1);
        let channels = (self.channels as usize).min(3);
        let (width, height) = (self.width as i64, self.height as i64);

        let mut view = self.as_ndarray_mut();
        for (i, c) in text.chars().enumerate() {
            let origin_x = x as i64 + (i as i64) * (GLYPH_ADVANCE * scale) as i64;
            for row in 0..GLYPH_HEIGHT {
                for col in 0..GLYPH_WIDTH {
                    if !glyphs::is_set(c, col, row) {
                        continue;
                    }
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let px = origin_x + (col * scale + dx) as i64;
                            let py = y as i64 + (row * scale + dy) as i64;
                            if px < 0 || py < 0 || px >= width || py >= height {
                                continue;
                            }
                            for ch in 0..channels {
                                view[[py as usize, px as usize, ch]] = color[ch];
                            }
                        }
                    }
                }
            }
        }
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
