mod component;
mod context;
mod error;
mod font;
mod image;
mod roll;
mod surface;
mod table;
mod text;
mod types;

pub use component::{Align, Component};
pub use context::LayoutContext;
pub use error::BobinaError;
pub use font::{Font, TextMetrics};
pub use image::{Image, RasterImage};
pub use roll::{Resolution, RollSize};
pub use surface::Surface;
pub use table::{CellFill, Columns, Rows, Table, TableCell, TableColumn, TableRow};
pub use text::Text;
pub use types::{Color, Rect, Size};

use types::SECURITY_MARGIN;

/// Output encoding for the final raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpeg { quality: u8 },
}

/// The finished raster of a rendered document, trimmed to the used length.
pub struct RenderedReceipt {
    width: u32,
    height: u32,
    png: Vec<u8>,
    pixmap: tiny_skia::Pixmap,
}

impl RenderedReceipt {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The PNG-encoded raster produced by `render`.
    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn into_png(self) -> Vec<u8> {
        self.png
    }
}

/// A receipt document: one canvas, one layout context, and an ordered list
/// of components. Insertion order is paint order.
///
/// Rendering is single-threaded and runs to completion or fails; a failed
/// pass leaves no cached output. A second `render` call returns the cached
/// result without drawing anything again.
pub struct Receipt {
    surface: Option<Surface>,
    context: LayoutContext,
    components: Vec<Box<dyn Component>>,
    background: Color,
    rendered: Option<RenderedReceipt>,
    disposed: bool,
}

/// Configuration for a [`Receipt`], in the spirit of the roll printer:
/// roll size, print offsets, overflow tolerance and raster resolution.
#[derive(Debug, Clone)]
pub struct ReceiptBuilder {
    roll: RollSize,
    left_offset: f32,
    top_offset: f32,
    tolerate_overflow: bool,
    resolution: Resolution,
    background: Color,
}

impl ReceiptBuilder {
    pub fn new(roll: RollSize) -> Self {
        Self {
            roll,
            left_offset: 0.0,
            top_offset: 0.0,
            tolerate_overflow: false,
            resolution: Resolution::default(),
            background: Color::WHITE,
        }
    }

    pub fn left_offset(mut self, pixels: f32) -> Self {
        self.left_offset = pixels;
        self
    }

    pub fn top_offset(mut self, pixels: f32) -> Self {
        self.top_offset = pixels;
        self
    }

    /// Downgrades fit-check failures to silent, unclipped drawing.
    pub fn tolerate_overflow(mut self, tolerate: bool) -> Self {
        self.tolerate_overflow = tolerate;
        self
    }

    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn build(self) -> Result<Receipt, BobinaError> {
        let (width, height) = self.roll.pixels(self.resolution)?;
        let surface = Surface::new(width, height, self.background)?;
        let context = LayoutContext::new(
            self.roll,
            self.tolerate_overflow,
            self.left_offset,
            self.top_offset,
            width as f32,
            height as f32,
        );
        Ok(Receipt {
            surface: Some(surface),
            context,
            components: Vec::new(),
            background: self.background,
            rendered: None,
            disposed: false,
        })
    }
}

impl Receipt {
    pub fn builder(roll: RollSize) -> ReceiptBuilder {
        ReceiptBuilder::new(roll)
    }

    /// A document with default offsets and resolution.
    pub fn new(roll: RollSize, tolerate_overflow: bool) -> Result<Receipt, BobinaError> {
        ReceiptBuilder::new(roll)
            .tolerate_overflow(tolerate_overflow)
            .build()
    }

    pub fn context(&self) -> &LayoutContext {
        &self.context
    }

    /// Appends a component. Later components paint over earlier ones where
    /// they overlap; there is no z-ordering beyond the sequence.
    pub fn add_component<C: Component + 'static>(
        &mut self,
        component: C,
    ) -> Result<(), BobinaError> {
        if self.disposed {
            return Err(BobinaError::Disposed);
        }
        self.components.push(Box::new(component));
        Ok(())
    }

    /// Renders every component in insertion order, trims the canvas to the
    /// used length and returns the PNG-encoded result.
    ///
    /// Idempotent: a second call returns the cached raster without invoking
    /// any component's draw logic again. Components mutate the shared
    /// context while drawing, so they are never drawn twice.
    pub fn render(&mut self) -> Result<&RenderedReceipt, BobinaError> {
        if self.disposed {
            return Err(BobinaError::Disposed);
        }
        if self.rendered.is_none() {
            let rendered = self.render_pass()?;
            self.rendered = Some(rendered);
        }
        match self.rendered.as_ref() {
            Some(rendered) => Ok(rendered),
            None => Err(BobinaError::Disposed),
        }
    }

    fn render_pass(&mut self) -> Result<RenderedReceipt, BobinaError> {
        let surface = self.surface.as_mut().ok_or(BobinaError::Disposed)?;
        surface.clear(self.background);
        for component in self.components.iter_mut() {
            component.draw(surface, &mut self.context)?;
        }

        let used = self.context.used_height() + self.context.top_offset();
        let trim_height = (used + SECURITY_MARGIN * 3.0).ceil() as u32;
        let trimmed = surface.trim(surface.width(), trim_height)?;
        let png = encode_pixmap(trimmed.pixmap(), ExportFormat::Png)?;

        Ok(RenderedReceipt {
            width: trimmed.width(),
            height: trimmed.height(),
            png,
            pixmap: trimmed.into_pixmap(),
        })
    }

    /// Re-encodes the rendered raster. `render` must have succeeded first.
    pub fn export(&self, format: ExportFormat) -> Result<Vec<u8>, BobinaError> {
        if self.disposed {
            return Err(BobinaError::Disposed);
        }
        let rendered = self.rendered.as_ref().ok_or_else(|| {
            BobinaError::InvalidConfiguration(
                "render() must be called before export".to_string(),
            )
        })?;
        encode_pixmap(&rendered.pixmap, format)
    }

    /// Tears down the canvas, components and cached raster. Every later
    /// operation fails with `Disposed`. Closing twice is a no-op.
    pub fn close(&mut self) {
        self.surface = None;
        self.components.clear();
        self.rendered = None;
        self.disposed = true;
    }
}

fn encode_pixmap(
    pixmap: &tiny_skia::Pixmap,
    format: ExportFormat,
) -> Result<Vec<u8>, BobinaError> {
    use ::image::codecs::jpeg::JpegEncoder;
    use ::image::codecs::png::PngEncoder;
    use ::image::{ExtendedColorType, ImageEncoder};

    let width = pixmap.width();
    let height = pixmap.height();
    let mut out = Vec::new();
    match format {
        ExportFormat::Png => {
            let mut rgba = Vec::with_capacity((width * height * 4) as usize);
            for pixel in pixmap.pixels() {
                let color = pixel.demultiply();
                rgba.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
            }
            PngEncoder::new(&mut out).write_image(&rgba, width, height, ExtendedColorType::Rgba8)?;
        }
        ExportFormat::Jpeg { quality } => {
            let mut rgb = Vec::with_capacity((width * height * 3) as usize);
            for pixel in pixmap.pixels() {
                let color = pixel.demultiply();
                rgb.extend_from_slice(&[color.red(), color.green(), color.blue()]);
            }
            JpegEncoder::new_with_quality(&mut out, quality).write_image(
                &rgb,
                width,
                height,
                ExtendedColorType::Rgb8,
            )?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};
    use std::cell::Cell;
    use std::rc::Rc;

    fn receipt() -> Receipt {
        Receipt::new(RollSize::R80x297, false).unwrap()
    }

    fn black_square(side: u32) -> Image {
        let mut pixmap = tiny_skia::Pixmap::new(side, side).unwrap();
        pixmap.fill(tiny_skia::Color::BLACK);
        Image::new(RasterImage::from_pixmap(pixmap), Align::Center)
    }

    // Counts draw invocations; proves that the cached render result is
    // returned without re-running component logic.
    struct CountingComponent {
        draws: Rc<Cell<u32>>,
    }

    impl Component for CountingComponent {
        fn draw(
            &mut self,
            _surface: &mut Surface,
            ctx: &mut LayoutContext,
        ) -> Result<(), BobinaError> {
            self.draws.set(self.draws.get() + 1);
            ctx.advance(5.0);
            Ok(())
        }

        fn draw_in_cell(&mut self, _surface: &mut Surface, _cell: Rect) -> Result<(), BobinaError> {
            self.draws.set(self.draws.get() + 1);
            Ok(())
        }

        fn measured_height(&self) -> f32 {
            5.0
        }
    }

    #[test]
    fn canvas_matches_the_roll_pixel_size() {
        let doc = receipt();
        assert_eq!(doc.context().width(), 272.0);
        assert_eq!(doc.context().height(), 1011.0);
    }

    #[test]
    fn render_is_idempotent_and_draws_once() {
        let draws = Rc::new(Cell::new(0));
        let mut doc = receipt();
        doc.add_component(CountingComponent {
            draws: draws.clone(),
        })
        .unwrap();

        let first = doc.render().unwrap().png().to_vec();
        let second = doc.render().unwrap().png().to_vec();
        assert_eq!(first, second);
        assert_eq!(draws.get(), 1);
    }

    #[test]
    fn identical_documents_render_identical_bytes() {
        let build = || {
            let mut doc = receipt();
            doc.add_component(Text::new(
                Font::fallback(16.0),
                "market",
                Align::Center,
                Color::BLACK,
            ))
            .unwrap();
            doc.add_component(black_square(24)).unwrap();
            doc.render().unwrap().png().to_vec()
        };

        let digest_a = Sha256::digest(build());
        let digest_b = Sha256::digest(build());
        assert_eq!(digest_a, digest_b);
    }

    #[test]
    fn oversized_text_fails_and_keeps_the_cursor() {
        let mut doc = receipt();
        doc.add_component(Text::new(
            Font::fallback(40.0),
            "x".repeat(120),
            Align::Left,
            Color::BLACK,
        ))
        .unwrap();

        assert!(matches!(doc.render(), Err(BobinaError::OutOfBounds(_))));
        assert_eq!(doc.context().used_height(), 0.0);
    }

    #[test]
    fn end_to_end_layout_height() {
        let mut doc = Receipt::builder(RollSize::R80x297)
            .top_offset(0.0)
            .build()
            .unwrap();

        let text_font = Font::fallback(20.0);
        doc.add_component(Text::new(
            text_font.clone(),
            "A",
            Align::Center,
            Color::BLACK,
        ))
        .unwrap();

        let mut table = Table::new(3, false).unwrap();
        table.set_percentages(&[50.0, 25.0, 25.0]).unwrap();
        for name in ["item", "qty", "price"] {
            table.columns.add(TableColumn::new(name)).unwrap();
        }
        for _ in 0..2 {
            let mut row = table.new_row();
            for _ in 0..3 {
                let mut pixmap = tiny_skia::Pixmap::new(8, 12).unwrap();
                pixmap.fill(tiny_skia::Color::BLACK);
                row.add_cell(TableCell::new(Box::new(Image::new(
                    RasterImage::from_pixmap(pixmap),
                    Align::Left,
                ))))
                .unwrap();
            }
            table.rows.add(row).unwrap();
        }
        let header_height = table.columns.header_font.measure("item").cap_height * 2.0;
        doc.add_component(table).unwrap();

        let text_height = text_font.measure("A").cap_height + 10.0;
        let row_heights = 2.0 * 24.0;
        let expected = (text_height + header_height + row_heights + 30.0).ceil() as u32;

        let rendered = doc.render().unwrap();
        assert_eq!(rendered.width(), 272);
        assert_eq!(rendered.height(), expected);
    }

    #[test]
    fn operations_after_close_fail_disposed() {
        let mut doc = receipt();
        doc.render().unwrap();
        doc.close();

        assert!(matches!(doc.render(), Err(BobinaError::Disposed)));
        assert!(matches!(
            doc.add_component(black_square(4)),
            Err(BobinaError::Disposed)
        ));
        assert!(matches!(
            doc.export(ExportFormat::Png),
            Err(BobinaError::Disposed)
        ));
        // A second close stays quiet.
        doc.close();
    }

    #[test]
    fn export_requires_a_prior_render() {
        let doc = receipt();
        assert!(matches!(
            doc.export(ExportFormat::Jpeg { quality: 90 }),
            Err(BobinaError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn export_reencodes_the_trimmed_raster() {
        let mut doc = receipt();
        doc.add_component(black_square(16)).unwrap();
        doc.render().unwrap();

        let jpeg = doc.export(ExportFormat::Jpeg { quality: 90 }).unwrap();
        let decoded = ::image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), doc.render().unwrap().width());
    }

    #[test]
    fn trim_keeps_the_crop_margin_past_the_last_component() {
        let mut doc = receipt();
        doc.add_component(black_square(40)).unwrap();
        let rendered = doc.render().unwrap();
        assert_eq!(rendered.height(), 40 + 30);
    }
}
