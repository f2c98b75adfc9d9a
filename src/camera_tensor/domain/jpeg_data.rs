/// An encoded JPEG stream and the dimensions it was encoded at.
#[derive(Debug, Clone, PartialEq)]
pub struct JpegData {
    pub raw: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl JpegData {
    pub fn new(raw: Vec<u8>, width: u32, height: u32) -> Self {
        Self { raw, width, height }
    }
}
