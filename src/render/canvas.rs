/// Packed 32-bit ARGB color used by every canvas call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color(0xFF00_0000);
    pub const WHITE: Color = Color(0xFFFF_FFFF);

    pub fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Color(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Builds a color from [0, 1] channel values, clamped.
    pub fn from_unit_rgb(r: f64, g: f64, b: f64) -> Self {
        let to_byte = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::argb(0xFF, to_byte(r), to_byte(g), to_byte(b))
    }

    pub fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(self) -> u8 {
        self.0 as u8
    }

    /// Per-channel lerp toward `other`; `t` in [0, 1]. Used by surfaces
    /// implementing the frame-blend factor.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color::argb(
            mix(self.alpha(), other.alpha()),
            mix(self.red(), other.red()),
            mix(self.green(), other.green()),
            mix(self.blue(), other.blue()),
        )
    }
}

/// Drawing surface consumed by plugins. Implemented by the embedding
/// application; this crate only issues calls against it.
pub trait Canvas {
    fn width(&self) -> f32;
    fn height(&self) -> f32;

    fn clear(&mut self, color: Color);
    fn line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Color);
    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color);
    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color);
    fn circle(&mut self, cx: f32, cy: f32, radius: f32, color: Color);
    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Color);
    fn point(&mut self, x: f32, y: f32, color: Color);
    fn polyline(&mut self, points: &[(f32, f32)], color: Color);
    fn polygon(&mut self, points: &[(f32, f32)], color: Color);
    fn text(&mut self, x: f32, y: f32, text: &str, color: Color);
}

/// Canvas that records draw calls, for tests and headless runs.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub width: f32,
    pub height: f32,
    pub calls: Vec<DrawCall>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Clear(Color),
    Line(f32, f32, f32, f32, Color),
    Rect(f32, f32, f32, f32, Color),
    FillRect(f32, f32, f32, f32, Color),
    Circle(f32, f32, f32, Color),
    FillCircle(f32, f32, f32, Color),
    Point(f32, f32, Color),
    Polyline(Vec<(f32, f32)>, Color),
    Polygon(Vec<(f32, f32)>, Color),
    Text(f32, f32, String, Color),
}

impl RecordingCanvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            calls: Vec::new(),
        }
    }
}

impl Canvas for RecordingCanvas {
    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn clear(&mut self, color: Color) {
        self.calls.push(DrawCall::Clear(color));
    }

    fn line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Color) {
        self.calls.push(DrawCall::Line(x0, y0, x1, y1, color));
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.calls.push(DrawCall::Rect(x, y, w, h, color));
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.calls.push(DrawCall::FillRect(x, y, w, h, color));
    }

    fn circle(&mut self, cx: f32, cy: f32, radius: f32, color: Color) {
        self.calls.push(DrawCall::Circle(cx, cy, radius, color));
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Color) {
        self.calls.push(DrawCall::FillCircle(cx, cy, radius, color));
    }

    fn point(&mut self, x: f32, y: f32, color: Color) {
        self.calls.push(DrawCall::Point(x, y, color));
    }

    fn polyline(&mut self, points: &[(f32, f32)], color: Color) {
        self.calls.push(DrawCall::Polyline(points.to_vec(), color));
    }

    fn polygon(&mut self, points: &[(f32, f32)], color: Color) {
        self.calls.push(DrawCall::Polygon(points.to_vec(), color));
    }

    fn text(&mut self, x: f32, y: f32, text: &str, color: Color) {
        self.calls.push(DrawCall::Text(x, y, text.to_string(), color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_and_unpack_channels() {
        let c = Color::argb(0x80, 0x11, 0x22, 0x33);
        assert_eq!(c.0, 0x8011_2233);
        assert_eq!(c.alpha(), 0x80);
        assert_eq!(c.red(), 0x11);
        assert_eq!(c.green(), 0x22);
        assert_eq!(c.blue(), 0x33);
    }

    #[test]
    fn unit_rgb_clamps() {
        let c = Color::from_unit_rgb(2.0, -1.0, 0.5);
        assert_eq!(c.red(), 255);
        assert_eq!(c.green(), 0);
        assert_eq!(c.blue(), 128);
        assert_eq!(c.alpha(), 255);
    }

    #[test]
    fn lerp_endpoints() {
        let a = Color::BLACK;
        let b = Color::WHITE;
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        let mid = a.lerp(b, 0.5);
        assert!((mid.red() as i32 - 128).abs() <= 1);
    }
}
