//! In-memory pixel buffers shared between decode and composite stages.

/// An 8-bit interleaved pixel buffer (row-major, `channels` samples per pixel).
///
/// Chunk buffers are published read-only behind an `Arc` once decoded; the
/// compositor builds tile buffers by blitting rectangles between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Samples per pixel (1 = gray, 3 = RGB, 4 = RGBA)
    pub channels: u8,

    /// Interleaved sample data, `width * height * channels` bytes
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a zero-filled buffer. Zero is the padding value for every
    /// supported pixel type.
    pub fn zeroed(width: u32, height: u32, channels: u8) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![0u8; width as usize * height as usize * channels as usize],
        }
    }

    /// Byte length of one row.
    fn row_bytes(&self) -> usize {
        self.width as usize * self.channels as usize
    }

    /// Copy a `w x h` rectangle from `src` at (`src_x`, `src_y`) into this
    /// buffer at (`dst_x`, `dst_y`). Pixels are copied verbatim.
    ///
    /// Panics if the rectangle is out of bounds on either side or the channel
    /// counts differ; callers are expected to have clamped already.
    pub fn blit(
        &mut self,
        dst_x: u32,
        dst_y: u32,
        src: &PixelBuffer,
        src_x: u32,
        src_y: u32,
        w: u32,
        h: u32,
    ) {
        assert_eq!(self.channels, src.channels, "channel count mismatch");
        assert!(dst_x + w <= self.width && dst_y + h <= self.height);
        assert!(src_x + w <= src.width && src_y + h <= src.height);

        let ch = self.channels as usize;
        let copy_bytes = w as usize * ch;
        let dst_stride = self.row_bytes();
        let src_stride = src.row_bytes();

        for row in 0..h as usize {
            let dst_off = (dst_y as usize + row) * dst_stride + dst_x as usize * ch;
            let src_off = (src_y as usize + row) * src_stride + src_x as usize * ch;
            self.data[dst_off..dst_off + copy_bytes]
                .copy_from_slice(&src.data[src_off..src_off + copy_bytes]);
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        let mut buf = PixelBuffer::zeroed(width, height, 3);
        for y in 0..height {
            for x in 0..width {
                let off = (y as usize * width as usize + x as usize) * 3;
                buf.data[off] = x as u8;
                buf.data[off + 1] = y as u8;
                buf.data[off + 2] = (x ^ y) as u8;
            }
        }
        buf
    }

    #[test]
    fn test_zeroed_dimensions() {
        let buf = PixelBuffer::zeroed(10, 4, 3);
        assert_eq!(buf.data.len(), 10 * 4 * 3);
        assert!(buf.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_blit_roundtrip() {
        let src = gradient(16, 16);
        let mut dst = PixelBuffer::zeroed(8, 8, 3);
        dst.blit(2, 3, &src, 4, 5, 4, 4);

        // Pixel (2,3) of dst should equal pixel (4,5) of src
        let d = (3 * 8 + 2) * 3;
        let s = (5 * 16 + 4) * 3;
        assert_eq!(&dst.data[d..d + 3], &src.data[s..s + 3]);

        // Untouched region stays zero
        assert_eq!(&dst.data[0..3], &[0, 0, 0]);
    }

    #[test]
    #[should_panic]
    fn test_blit_out_of_bounds_panics() {
        let src = gradient(4, 4);
        let mut dst = PixelBuffer::zeroed(4, 4, 3);
        dst.blit(2, 2, &src, 0, 0, 4, 4);
    }
}
