use super::error::DomainError;

/// Byte order of the three channels stored for every pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    /// Bitmap memory layout, the order produced by the decoder.
    Bgr,
    Rgb,
}

/// A decoded 3-channel, 8-bit image with row padding.
///
/// Rows are `stride` bytes apart; only the first `width * 3` bytes of a row
/// carry pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    stride: usize,
    order: ChannelOrder,
    data: Vec<u8>,
}

impl Image {
    pub fn new(
        width: u32,
        height: u32,
        stride: usize,
        order: ChannelOrder,
        data: Vec<u8>,
    ) -> Result<Self, DomainError> {
        if width == 0 || height == 0 {
            return Err(DomainError::InvalidImage(format!(
                "dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        let row_bytes = width as usize * 3;
        if stride < row_bytes {
            return Err(DomainError::InvalidImage(format!(
                "stride {} is shorter than a row of {} bytes",
                stride, row_bytes
            )));
        }
        let required = stride * (height as usize - 1) + row_bytes;
        if data.len() < required {
            return Err(DomainError::InvalidImage(format!(
                "pixel buffer holds {} bytes, {}x{} with stride {} needs {}",
                data.len(),
                width,
                height,
                stride,
                required
            )));
        }
        Ok(Self {
            width,
            height,
            stride,
            order,
            data,
        })
    }

    /// Builds an image whose rows are tightly packed (`stride == width * 3`).
    pub fn packed(
        width: u32,
        height: u32,
        order: ChannelOrder,
        data: Vec<u8>,
    ) -> Result<Self, DomainError> {
        Self::new(width, height, width as usize * 3, order, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    /// Pixel bytes of row `y`, padding excluded.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * 3]
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let offset = x as usize * 3;
        let row = self.row(y);
        [row[offset], row[offset + 1], row[offset + 2]]
    }

    /// Copies the pixels into a tightly packed buffer in stored channel order.
    pub fn to_packed(&self) -> Vec<u8> {
        if self.stride == self.width as usize * 3 {
            let len = self.stride * self.height as usize;
            return self.data[..len].to_vec();
        }
        (0..self.height).flat_map(|y| self.row(y).iter().copied()).collect()
    }

    /// Packed pixels in R,G,B order regardless of the stored order.
    pub fn to_rgb_packed(&self) -> Vec<u8> {
        let mut packed = self.to_packed();
        if self.order == ChannelOrder::Bgr {
            for px in packed.chunks_exact_mut(3) {
                px.swap(0, 2);
            }
        }
        packed
    }
}
