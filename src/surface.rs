use crate::error::BobinaError;
use crate::types::{Color, Rect};
use tiny_skia::{Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform};

/// A raster canvas. Components draw into one shared surface; tables draw
/// into a private surface that is later blitted into the document's.
pub struct Surface {
    pixmap: Pixmap,
}

impl Surface {
    pub(crate) fn new(width: u32, height: u32, background: Color) -> Result<Surface, BobinaError> {
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            BobinaError::InvalidConfiguration(format!("invalid canvas size {width}x{height}"))
        })?;
        pixmap.fill(background.to_sk());
        Ok(Surface { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn clear(&mut self, color: Color) {
        self.pixmap.fill(color.to_sk());
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some(sk_rect) = tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.width, rect.height)
        else {
            return;
        };
        self.pixmap
            .fill_rect(sk_rect, &fill_paint(color), Transform::identity(), None);
    }

    /// Strokes a one-pixel four-sided outline along the rectangle edges.
    pub fn stroke_rect(&mut self, rect: Rect, color: Color) {
        let Some(sk_rect) = tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.width, rect.height)
        else {
            return;
        };
        let path = PathBuilder::from_rect(sk_rect);
        let stroke = Stroke {
            width: 1.0,
            ..Stroke::default()
        };
        self.pixmap.stroke_path(
            &path,
            &fill_paint(color),
            &stroke,
            Transform::identity(),
            None,
        );
    }

    /// Blits `src` with its top-left corner at `(x, y)`.
    pub fn draw_pixmap(&mut self, x: f32, y: f32, src: &Pixmap) {
        self.pixmap.draw_pixmap(
            x as i32,
            y as i32,
            src.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }

    pub(crate) fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub(crate) fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    pub(crate) fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    /// Crops to the top-left `width` x `height` region. Requests larger than
    /// the canvas are clamped to it.
    pub(crate) fn trim(&self, width: u32, height: u32) -> Result<Surface, BobinaError> {
        if width == 0 || height == 0 {
            return Err(BobinaError::InvalidConfiguration(format!(
                "cannot trim canvas to {width}x{height}"
            )));
        }
        let width = width.min(self.width());
        let height = height.min(self.height());
        let mut trimmed = Surface::new(width, height, Color::WHITE)?;
        trimmed.draw_pixmap(0.0, 0.0, &self.pixmap);
        Ok(trimmed)
    }
}

pub(crate) fn fill_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_sk());
    paint.anti_alias = true;
    paint
}
