use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageError, Rgb, RgbImage};
use rand::Rng;

use super::glyphs::{self, GLYPH_HEIGHT, GLYPH_WIDTH};

const BACKGROUND: [u8; 3] = [236, 254, 255];
const INK: [u8; 3] = [15, 23, 42];
const LINE_NOISE: [u8; 3] = [6, 182, 212];
const DOT_NOISE: [u8; 3] = [100, 116, 139];

/// Draws challenge text onto a small noisy surface. Dimensions and glyph
/// scale are never below one pixel.
#[derive(Debug, Clone)]
pub struct CaptchaRenderer {
    width: u32,
    height: u32,
    padding: f32,
    scale_x: u32,
    scale_y: u32,
    noise_lines: usize,
    noise_dots: usize,
    max_rotation: f32,
    max_jitter: f32,
}

impl Default for CaptchaRenderer {
    fn default() -> Self {
        Self {
            width: 140,
            height: 56,
            padding: 15.0,
            scale_x: 2,
            scale_y: 3,
            noise_lines: 7,
            noise_dots: 30,
            max_rotation: 0.15,
            max_jitter: 2.0,
        }
    }
}

impl CaptchaRenderer {
    /// Default styling on a `width` x `height` surface; zero becomes one.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            ..Self::default()
        }
    }

    /// Pixels per glyph cell along each axis; zero becomes one.
    pub fn with_scale(mut self, scale_x: u32, scale_y: u32) -> Self {
        self.scale_x = scale_x.max(1);
        self.scale_y = scale_y.max(1);
        self
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn render<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> RgbImage {
        let mut image = RgbImage::from_pixel(self.width, self.height, Rgb(BACKGROUND));

        for _ in 0..self.noise_lines {
            let from = (
                rng.gen_range(0.0..self.width as f32),
                rng.gen_range(0.0..self.height as f32),
            );
            let to = (
                rng.gen_range(0.0..self.width as f32),
                rng.gen_range(0.0..self.height as f32),
            );
            let alpha = rng.gen_range(0.0..0.5);
            draw_line(&mut image, from, to, LINE_NOISE, alpha);
        }

        let chars: Vec<char> = text.chars().collect();
        if !chars.is_empty() {
            let available = self.width as f32 - self.padding * 2.0;
            let spacing = available / (chars.len() as f32 - 0.5).max(1.0);
            for (index, ch) in chars.iter().enumerate() {
                let x = self.padding + index as f32 * spacing;
                let y = self.height as f32 / 2.0
                    + rng.gen_range(-self.max_jitter..=self.max_jitter);
                let angle = rng.gen_range(-self.max_rotation..=self.max_rotation);
                if let Some(glyph) = glyphs::glyph(*ch) {
                    self.draw_glyph(&mut image, glyph, (x, y), angle);
                }
            }
        }

        for _ in 0..self.noise_dots {
            let cx = rng.gen_range(0..self.width) as i64;
            let cy = rng.gen_range(0..self.height) as i64;
            let alpha = rng.gen_range(0.0..0.5);
            for (dx, dy) in [(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)] {
                blend(&mut image, cx + dx, cy + dy, DOT_NOISE, alpha);
            }
        }

        image
    }

    pub fn render_png<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Result<Vec<u8>, ImageError> {
        let image = self.render(text, rng);
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes).write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )?;
        Ok(bytes)
    }

    /// The glyph's left edge sits at `origin.0`, vertically centred on
    /// `origin.1`, and is rotated about that point.
    fn draw_glyph(&self, image: &mut RgbImage, glyph: &[u8; 7], origin: (f32, f32), angle: f32) {
        let glyph_w = (GLYPH_WIDTH * self.scale_x) as f32;
        let glyph_h = (GLYPH_HEIGHT * self.scale_y) as f32;
        let reach = (glyph_w.powi(2) + glyph_h.powi(2)).sqrt().ceil() as i64;
        let (sin, cos) = (-angle).sin_cos();
        let (ox, oy) = (origin.0.round() as i64, origin.1.round() as i64);

        for py in (oy - reach)..=(oy + reach) {
            for px in (ox - reach)..=(ox + reach) {
                let dx = (px - ox) as f32 + 0.5;
                let dy = (py - oy) as f32 + 0.5;
                let u = dx * cos - dy * sin;
                let v = dx * sin + dy * cos + glyph_h / 2.0;
                if u < 0.0 || v < 0.0 || u >= glyph_w || v >= glyph_h {
                    continue;
                }
                let column = u as u32 / self.scale_x;
                let row = v as u32 / self.scale_y;
                if glyphs::is_set(glyph, column, row) {
                    blend(image, px, py, INK, 1.0);
                }
            }
        }
    }
}

fn draw_line(image: &mut RgbImage, from: (f32, f32), to: (f32, f32), color: [u8; 3], alpha: f32) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as u32;
    for step in 0..=steps {
        let t = step as f32 / steps as f32;
        let x = (from.0 + dx * t).round() as i64;
        let y = (from.1 + dy * t).round() as i64;
        blend(image, x, y, color, alpha);
    }
}

fn blend(image: &mut RgbImage, x: i64, y: i64, color: [u8; 3], alpha: f32) {
    if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
        return;
    }
    let alpha = alpha.clamp(0.0, 1.0);
    let pixel = image.get_pixel_mut(x as u32, y as u32);
    for (channel, target) in pixel.0.iter_mut().zip(color) {
        let mixed = f32::from(*channel) * (1.0 - alpha) + f32::from(target) * alpha;
        *channel = mixed.round().clamp(0.0, 255.0) as u8;
    }
}
