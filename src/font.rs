use crate::error::BobinaError;
use crate::types::Color;
use rustybuzz::{Face as HbFace, UnicodeBuffer};
use std::sync::Arc;
use tiny_skia::{FillRule, Paint, Path, PathBuilder, Pixmap, Transform};
use ttf_parser::{GlyphId, OutlineBuilder};

// Approximation constants applied when no face data is available: average
// advance of 0.6em per character and a 0.7em cap height.
const FALLBACK_ADVANCE_FACTOR: f32 = 0.6;
const FALLBACK_CAP_FACTOR: f32 = 0.7;
const FALLBACK_LINE_FACTOR: f32 = 1.2;

/// Measured extent of a piece of text at a given font and size, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    pub width: f32,
    pub height: f32,
    pub cap_height: f32,
}

#[derive(Debug, Clone, Copy)]
struct FaceMetrics {
    units_per_em: f32,
    ascent: f32,
    descent: f32,
    line_gap: f32,
    cap_height: f32,
}

/// A sized font handle. Cloning shares the underlying face data.
#[derive(Debug, Clone)]
pub struct Font {
    data: Option<Arc<Vec<u8>>>,
    size: f32,
    metrics: FaceMetrics,
}

impl Font {
    /// Parses TrueType/OpenType face data and binds it to a pixel size.
    pub fn from_bytes(data: Vec<u8>, size: f32) -> Result<Font, BobinaError> {
        let face = ttf_parser::Face::parse(&data, 0).map_err(|err| {
            BobinaError::InvalidConfiguration(format!("invalid font data: {err}"))
        })?;
        let units_per_em = face.units_per_em().max(1) as f32;
        let ascent = face.ascender() as f32;
        let metrics = FaceMetrics {
            units_per_em,
            ascent,
            descent: face.descender() as f32,
            line_gap: face.line_gap() as f32,
            cap_height: face
                .capital_height()
                .map(|value| value as f32)
                .unwrap_or(ascent),
        };
        Ok(Font {
            data: Some(Arc::new(data)),
            size,
            metrics,
        })
    }

    /// A metrics-only font with no face data. Measurement uses fixed
    /// approximation factors; drawing with it is a logged no-op.
    pub fn fallback(size: f32) -> Font {
        Font {
            data: None,
            size,
            metrics: FaceMetrics {
                units_per_em: 1.0,
                ascent: FALLBACK_LINE_FACTOR - 0.4,
                descent: -0.4,
                line_gap: 0.0,
                cap_height: FALLBACK_CAP_FACTOR,
            },
        }
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    /// The same face at a different pixel size; face data is shared.
    pub fn with_size(&self, size: f32) -> Font {
        Font {
            data: self.data.clone(),
            size,
            metrics: self.metrics,
        }
    }

    fn scale(&self) -> f32 {
        self.size / self.metrics.units_per_em
    }

    pub(crate) fn cap_height(&self) -> f32 {
        self.metrics.cap_height * self.scale()
    }

    pub(crate) fn line_height(&self) -> f32 {
        let units = self.metrics.ascent - self.metrics.descent + self.metrics.line_gap;
        units * self.scale()
    }

    /// Measures `text` at this font. Lines split on `\n`; the width is the
    /// widest line. Empty text measures to zero.
    pub fn measure(&self, text: &str) -> TextMetrics {
        if text.is_empty() {
            return TextMetrics {
                width: 0.0,
                height: 0.0,
                cap_height: 0.0,
            };
        }
        let width = text
            .split('\n')
            .map(|line| self.line_width(line))
            .fold(0.0f32, f32::max);
        TextMetrics {
            width,
            height: self.line_height(),
            cap_height: self.cap_height(),
        }
    }

    fn line_width(&self, line: &str) -> f32 {
        let Some(data) = self.data.as_deref() else {
            let char_width = (self.size * FALLBACK_ADVANCE_FACTOR).max(1.0);
            return char_width * line.chars().count() as f32;
        };
        shaped_line_width(data, self.size, line)
            .unwrap_or_else(|| unshaped_line_width(data, self.size, line))
    }

    /// Draws `text` with its first baseline at `(x, baseline_y)`. Each `\n`
    /// starts a new line one line height further down.
    pub(crate) fn draw_text(
        &self,
        pixmap: &mut Pixmap,
        x: f32,
        baseline_y: f32,
        text: &str,
        color: Color,
    ) {
        let Some(data) = self.data.as_deref() else {
            log::debug!("skipping text draw for metrics-only font: {:?}", text);
            return;
        };
        let Ok(face) = ttf_parser::Face::parse(data, 0) else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color(color.to_sk());
        paint.anti_alias = true;

        let mut baseline = baseline_y;
        for line in text.split('\n') {
            for placement in layout_line_glyphs(data, line, self.size, x, baseline) {
                let mut builder =
                    GlyphPathBuilder::new(placement.origin_x, placement.origin_y, placement.scale);
                if face
                    .outline_glyph(GlyphId(placement.glyph_id), &mut builder)
                    .is_none()
                {
                    continue;
                }
                let Some(path) = builder.finish() else {
                    continue;
                };
                pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
            }
            baseline += self.line_height();
        }
    }
}

struct GlyphPlacement {
    glyph_id: u16,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

fn layout_line_glyphs(
    font_data: &[u8],
    text: &str,
    font_size: f32,
    baseline_x: f32,
    baseline_y: f32,
) -> Vec<GlyphPlacement> {
    let Some(face) = HbFace::from_slice(font_data, 0) else {
        return layout_line_glyphs_unshaped(font_data, text, font_size, baseline_x, baseline_y);
    };
    let units = face.units_per_em().max(1) as f32;
    let scale = font_size / units;
    let mut buffer = UnicodeBuffer::new();
    buffer.push_str(text);
    let output = rustybuzz::shape(&face, &[], buffer);
    let infos = output.glyph_infos();
    let positions = output.glyph_positions();
    if infos.is_empty() || infos.len() != positions.len() {
        return layout_line_glyphs_unshaped(font_data, text, font_size, baseline_x, baseline_y);
    }

    let mut out = Vec::with_capacity(infos.len());
    let mut pen_x = 0.0f32;
    for (info, pos) in infos.iter().zip(positions.iter()) {
        let gid = info.glyph_id as u16;
        if gid == 0 {
            pen_x += (pos.x_advance as f32 / units) * font_size;
            continue;
        }
        let x_off = (pos.x_offset as f32 / units) * font_size;
        let y_off = (pos.y_offset as f32 / units) * font_size;
        out.push(GlyphPlacement {
            glyph_id: gid,
            origin_x: baseline_x + pen_x + x_off,
            origin_y: baseline_y - y_off,
            scale,
        });
        pen_x += (pos.x_advance as f32 / units) * font_size;
    }
    out
}

fn layout_line_glyphs_unshaped(
    font_data: &[u8],
    text: &str,
    font_size: f32,
    baseline_x: f32,
    baseline_y: f32,
) -> Vec<GlyphPlacement> {
    let Ok(face) = ttf_parser::Face::parse(font_data, 0) else {
        return Vec::new();
    };
    let units = face.units_per_em().max(1) as f32;
    let scale = font_size / units;

    let mut out = Vec::new();
    let mut pen_x = 0.0f32;
    for ch in text.chars() {
        let gid = face.glyph_index(ch).map(|id| id.0).unwrap_or(0);
        if gid == 0 {
            pen_x += font_size * 0.5;
            continue;
        }
        out.push(GlyphPlacement {
            glyph_id: gid,
            origin_x: baseline_x + pen_x,
            origin_y: baseline_y,
            scale,
        });
        let advance_units = face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0) as f32;
        let mut advance = (advance_units / units) * font_size;
        if advance <= 0.0 {
            advance = font_size * 0.5;
        }
        pen_x += advance;
    }
    out
}

fn shaped_line_width(font_data: &[u8], font_size: f32, text: &str) -> Option<f32> {
    let face = HbFace::from_slice(font_data, 0)?;
    let units = face.units_per_em().max(1) as f32;
    let mut buffer = UnicodeBuffer::new();
    buffer.push_str(text);
    let output = rustybuzz::shape(&face, &[], buffer);
    let positions = output.glyph_positions();
    if positions.is_empty() {
        return None;
    }
    let mut total_units = 0.0f32;
    for pos in positions {
        total_units += pos.x_advance as f32;
    }
    Some((total_units / units) * font_size)
}

fn unshaped_line_width(font_data: &[u8], font_size: f32, text: &str) -> f32 {
    let Ok(face) = ttf_parser::Face::parse(font_data, 0) else {
        return 0.0;
    };
    let units = face.units_per_em().max(1) as f32;
    let mut total_units = 0.0f32;
    for ch in text.chars() {
        let advance = face
            .glyph_index(ch)
            .and_then(|id| face.glyph_hor_advance(id))
            .unwrap_or(0);
        total_units += advance as f32;
    }
    (total_units / units) * font_size
}

// Maps font-unit outline coordinates (y up) onto the pixmap (y down),
// anchored at the glyph origin.
struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn finish(self) -> Option<Path> {
        self.builder.finish()
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.builder.move_to(
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.builder.quad_to(
            self.origin_x + x1 * self.scale,
            self.origin_y - y1 * self.scale,
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.builder.cubic_to(
            self.origin_x + x1 * self.scale,
            self.origin_y - y1 * self.scale,
            self.origin_x + x2 * self.scale,
            self.origin_y - y2 * self.scale,
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
