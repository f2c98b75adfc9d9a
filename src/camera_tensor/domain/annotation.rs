use serde::Deserialize;

/// Rectangle given as fractions of the image width and height.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct NormalizedRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl NormalizedRect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn to_pixels(&self, image_width: u32, image_height: u32) -> PixelRect {
        let w = image_width as f32;
        let h = image_height as f32;
        PixelRect {
            left: self.left * w,
            top: self.top * h,
            right: self.right * w,
            bottom: self.bottom * h,
        }
    }
}

impl PixelRect {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub rect: Option<NormalizedRect>,
    #[serde(default)]
    pub label: Option<String>,
}

impl Annotation {
    pub fn new(rect: NormalizedRect, label: Option<String>) -> Self {
        Self {
            rect: Some(rect),
            label,
        }
    }
}
