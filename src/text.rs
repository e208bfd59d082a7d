use crate::component::{Align, Component};
use crate::context::LayoutContext;
use crate::error::BobinaError;
use crate::font::{Font, TextMetrics};
use crate::surface::Surface;
use crate::types::{Color, Rect, SECURITY_MARGIN};

// Horizontal inset from the cell edge for left/right aligned cell text.
const CELL_TEXT_MARGIN: f32 = 2.0;

/// A single run of text drawn at one font, alignment and color.
pub struct Text {
    font: Font,
    content: String,
    align: Align,
    color: Color,
}

impl Text {
    pub fn new(font: Font, content: impl Into<String>, align: Align, color: Color) -> Self {
        Self {
            font,
            content: content.into(),
            align,
            color,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn font(&self) -> &Font {
        &self.font
    }

    // Measured box: shaped width, cap height padded by the security margin.
    fn measure_box(&self) -> TextMetrics {
        let metrics = self.font.measure(&self.content);
        if self.content.is_empty() {
            return metrics;
        }
        TextMetrics {
            width: metrics.width,
            height: metrics.cap_height + SECURITY_MARGIN,
            cap_height: metrics.cap_height,
        }
    }

    // Cap-height baselines differ between font families; this empirical
    // size-proportional correction keeps cell text vertically centered.
    // Changing it moves every table header and body baseline.
    fn cell_baseline_offset(&self, box_height: f32) -> f32 {
        let percent = (30.0 * self.font.size()) / 22.0;
        box_height * (percent / 100.0)
    }
}

impl Component for Text {
    fn draw(&mut self, surface: &mut Surface, ctx: &mut LayoutContext) -> Result<(), BobinaError> {
        let metrics = self.measure_box();
        if !ctx.tolerate_overflow() && metrics.width > ctx.width() {
            return Err(BobinaError::OutOfBounds(format!(
                "text {:.0}px wide exceeds the {:.0}px canvas",
                metrics.width,
                ctx.width()
            )));
        }

        let x = match self.align {
            Align::Left => ctx.left_offset(),
            Align::Center => (ctx.width() - metrics.width) / 2.0,
            Align::Right => ctx.width() - metrics.width,
            Align::Unset => {
                return Err(BobinaError::NonDeterministic(
                    "no alignment was set for the text component".to_string(),
                ));
            }
        };
        let baseline = ctx.top_offset() + ctx.used_height();
        self.font
            .draw_text(surface.pixmap_mut(), x, baseline, &self.content, self.color);
        ctx.advance(metrics.height);
        Ok(())
    }

    fn draw_in_cell(&mut self, surface: &mut Surface, cell: Rect) -> Result<(), BobinaError> {
        let metrics = self.measure_box();
        let x = match self.align {
            Align::Left => cell.x + CELL_TEXT_MARGIN,
            Align::Center => cell.x + (cell.width - metrics.width) / 2.0,
            Align::Right => cell.right() - metrics.width,
            Align::Unset => {
                return Err(BobinaError::NonDeterministic(
                    "no alignment was set for the cell text".to_string(),
                ));
            }
        };
        let baseline =
            cell.y + metrics.height / 2.0 + self.cell_baseline_offset(metrics.height);
        self.font
            .draw_text(surface.pixmap_mut(), x, baseline, &self.content, self.color);
        Ok(())
    }

    fn measured_height(&self) -> f32 {
        self.font.measure(&self.content).cap_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> LayoutContext {
        LayoutContext::new(crate::RollSize::R80x297, false, 0.0, 0.0, 272.0, 1011.0)
    }

    #[test]
    fn draw_advances_by_padded_cap_height() {
        let font = Font::fallback(20.0);
        let mut text = Text::new(font.clone(), "total", Align::Left, Color::BLACK);
        let mut surface = Surface::new(272, 1011, Color::WHITE).unwrap();
        let mut ctx = context();

        text.draw(&mut surface, &mut ctx).unwrap();
        let expected = font.measure("total").cap_height + SECURITY_MARGIN;
        assert_eq!(ctx.used_height(), expected);
    }

    #[test]
    fn oversized_text_fails_and_leaves_cursor_unchanged() {
        let font = Font::fallback(40.0);
        let wide = "a".repeat(100);
        let mut text = Text::new(font, wide, Align::Left, Color::BLACK);
        let mut surface = Surface::new(272, 1011, Color::WHITE).unwrap();
        let mut ctx = context();

        let result = text.draw(&mut surface, &mut ctx);
        assert!(matches!(result, Err(BobinaError::OutOfBounds(_))));
        assert_eq!(ctx.used_height(), 0.0);
    }

    #[test]
    fn oversized_text_is_drawn_when_overflow_is_tolerated() {
        let font = Font::fallback(40.0);
        let wide = "a".repeat(100);
        let mut text = Text::new(font, wide, Align::Left, Color::BLACK);
        let mut surface = Surface::new(272, 1011, Color::WHITE).unwrap();
        let mut ctx =
            LayoutContext::new(crate::RollSize::R80x297, true, 0.0, 0.0, 272.0, 1011.0);

        text.draw(&mut surface, &mut ctx).unwrap();
        assert!(ctx.used_height() > 0.0);
    }

    #[test]
    fn unset_alignment_is_non_deterministic() {
        let mut text = Text::new(Font::fallback(12.0), "x", Align::Unset, Color::BLACK);
        let mut surface = Surface::new(272, 1011, Color::WHITE).unwrap();
        let mut ctx = context();

        assert!(matches!(
            text.draw(&mut surface, &mut ctx),
            Err(BobinaError::NonDeterministic(_))
        ));
        let cell = Rect::from_xywh(0.0, 0.0, 100.0, 30.0);
        assert!(matches!(
            text.draw_in_cell(&mut surface, cell),
            Err(BobinaError::NonDeterministic(_))
        ));
    }

    #[test]
    fn measured_height_is_the_raw_cap_height() {
        let font = Font::fallback(20.0);
        let text = Text::new(font.clone(), "qty", Align::Left, Color::BLACK);
        assert_eq!(text.measured_height(), font.measure("qty").cap_height);
    }
}
