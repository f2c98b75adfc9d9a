use std::str::FromStr;

use super::error::DomainError;

pub const CHANNELS: usize = 3;

/// Element type of a destination tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Float32,
    UInt8,
}

impl ElementType {
    pub fn size_in_bytes(self) -> usize {
        match self {
            ElementType::Float32 => std::mem::size_of::<f32>(),
            ElementType::UInt8 => std::mem::size_of::<u8>(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ElementType::Float32 => "float32",
            ElementType::UInt8 => "uint8",
        }
    }
}

impl FromStr for ElementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "float32" | "f32" | "float" => Ok(ElementType::Float32),
            "uint8" | "u8" | "byte" => Ok(ElementType::UInt8),
            _ => Err(DomainError::UnsupportedType(s.to_string())),
        }
    }
}

/// How a normalized sample is narrowed into an 8-bit element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegerCast {
    /// Truncate toward zero and clamp to `0..=255`. NaN becomes 0.
    #[default]
    Saturate,
    /// Truncate to a 32-bit integer and keep the low byte.
    Wrap,
}

impl IntegerCast {
    pub fn apply(self, value: f32) -> u8 {
        match self {
            IntegerCast::Saturate => value as u8,
            IntegerCast::Wrap => (value as i32) as u8,
        }
    }
}

impl FromStr for IntegerCast {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "saturate" | "clamp" => Ok(IntegerCast::Saturate),
            "wrap" | "truncate" => Ok(IntegerCast::Wrap),
            _ => Err(DomainError::InvalidParameters(format!(
                "unknown integer cast '{}'",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeFilter {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl FromStr for ResizeFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nearest" => Ok(ResizeFilter::Nearest),
            "triangle" | "bilinear" => Ok(ResizeFilter::Triangle),
            "catmullrom" | "catmull-rom" | "bicubic" => Ok(ResizeFilter::CatmullRom),
            "gaussian" => Ok(ResizeFilter::Gaussian),
            "lanczos3" | "lanczos" => Ok(ResizeFilter::Lanczos3),
            _ => Err(DomainError::InvalidParameters(format!(
                "unknown resize filter '{}'",
                s
            ))),
        }
    }
}

/// Parameters of an image to tensor conversion.
///
/// A target dimension `<= 0` keeps the source dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionParameters {
    pub target_width: i32,
    pub target_height: i32,
    pub mean: f32,
    pub scale: f32,
    pub flip_vertical: bool,
    pub swap_red_blue: bool,
    pub integer_cast: IntegerCast,
    pub resize_filter: ResizeFilter,
}

impl Default for ConversionParameters {
    fn default() -> Self {
        Self {
            target_width: -1,
            target_height: -1,
            mean: 0.0,
            scale: 1.0,
            flip_vertical: false,
            swap_red_blue: false,
            integer_cast: IntegerCast::default(),
            resize_filter: ResizeFilter::default(),
        }
    }
}

impl ConversionParameters {
    pub fn output_dimensions(&self, source_width: u32, source_height: u32) -> (u32, u32) {
        let pick = |target: i32, source: u32| if target > 0 { target as u32 } else { source };
        (
            pick(self.target_width, source_width),
            pick(self.target_height, source_height),
        )
    }

    pub fn normalize(&self, value: u8) -> f32 {
        (f32::from(value) - self.mean) * self.scale
    }
}

/// Number of elements a `width x height` tensor occupies.
pub fn element_count(width: u32, height: u32) -> Result<usize, DomainError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(CHANNELS))
        .ok_or_else(|| {
            DomainError::InvalidParameters(format!("{}x{} tensor is too large", width, height))
        })
}

/// Number of bytes a `width x height` tensor of `element_type` occupies.
pub fn byte_len(width: u32, height: u32, element_type: ElementType) -> Result<usize, DomainError> {
    element_count(width, height)?
        .checked_mul(element_type.size_in_bytes())
        .ok_or_else(|| {
            DomainError::InvalidParameters(format!("{}x{} tensor is too large", width, height))
        })
}

/// Caller-owned destination of a conversion.
#[derive(Debug)]
pub enum TensorBuffer<'a> {
    Float32(&'a mut [f32]),
    UInt8(&'a mut [u8]),
}

impl TensorBuffer<'_> {
    pub fn element_type(&self) -> ElementType {
        match self {
            TensorBuffer::Float32(_) => ElementType::Float32,
            TensorBuffer::UInt8(_) => ElementType::UInt8,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TensorBuffer::Float32(buf) => buf.len(),
            TensorBuffer::UInt8(buf) => buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An owned NHWC tensor stored as native-endian bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub width: u32,
    pub height: u32,
    pub element_type: ElementType,
    pub bytes: Vec<u8>,
}

impl Tensor {
    pub fn shape(&self) -> [usize; 4] {
        [1, self.height as usize, self.width as usize, CHANNELS]
    }
}
