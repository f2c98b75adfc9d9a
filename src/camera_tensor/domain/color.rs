#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const RED: Color = Color::new(255, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#RRGGBB` or `#RRGGBBAA`. Anything else yields red.
    pub fn from_hex(hex_str: &str) -> Color {
        let hex = hex_str.trim_start_matches('#');
        let channel = |range: std::ops::Range<usize>| {
            hex.get(range).and_then(|s| u8::from_str_radix(s, 16).ok())
        };

        let alpha = match hex.len() {
            6 => Some(255),
            8 => channel(6..8),
            _ => return Color::RED,
        };
        match (channel(0..2), channel(2..4), channel(4..6), alpha) {
            (Some(r), Some(g), Some(b), Some(a)) => Color::new(r, g, b, a),
            _ => Color::RED,
        }
    }
}
