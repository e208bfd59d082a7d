use crate::component::{Align, Component};
use crate::context::LayoutContext;
use crate::error::BobinaError;
use crate::surface::Surface;
use crate::types::Rect;
use std::sync::Arc;
use tiny_skia::Pixmap;

/// A decoded raster image. Cloning shares the pixel buffer.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pixmap: Arc<Pixmap>,
}

impl RasterImage {
    /// Decodes PNG or JPEG bytes into a premultiplied RGBA pixmap.
    pub fn decode(data: &[u8]) -> Result<Self, BobinaError> {
        let decoded = image::load_from_memory(data)?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            BobinaError::InvalidConfiguration(format!("invalid image size {width}x{height}"))
        })?;
        let src = rgba.as_raw();
        let dst = pixmap.data_mut();
        for (src_px, dst_px) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
            let a = src_px[3];
            dst_px[0] = premul_u8(src_px[0], a);
            dst_px[1] = premul_u8(src_px[1], a);
            dst_px[2] = premul_u8(src_px[2], a);
            dst_px[3] = a;
        }
        Ok(Self {
            pixmap: Arc::new(pixmap),
        })
    }

    /// Wraps an already-decoded pixmap.
    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        Self {
            pixmap: Arc::new(pixmap),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub(crate) fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Whether two images share the same backing pixel buffer.
    pub fn shares_buffer(&self, other: &RasterImage) -> bool {
        Arc::ptr_eq(&self.pixmap, &other.pixmap)
    }
}

fn premul_u8(channel: u8, alpha: u8) -> u8 {
    let prod = (channel as u16) * (alpha as u16) + 127;
    ((prod + (prod >> 8)) >> 8) as u8
}

/// An image placement. The image is never scaled: fit checks are validating
/// only. Cloning shares the decoded pixel buffer but resets the placement
/// attachment, so one decoded logo can back many placements.
pub struct Image {
    image: RasterImage,
    align: Align,
    placement: Option<Rect>,
}

impl Image {
    pub fn new(image: RasterImage, align: Align) -> Self {
        Self {
            image,
            align,
            placement: None,
        }
    }

    pub fn image(&self) -> &RasterImage {
        &self.image
    }

    /// Where this component was last drawn, if it has been drawn.
    pub fn placement(&self) -> Option<Rect> {
        self.placement
    }

    pub fn set_placement(&mut self, placement: Option<Rect>) {
        self.placement = placement;
    }

    fn fits(&self, ctx: &LayoutContext) -> bool {
        let available = ctx.available_size();
        self.image.width() as f32 <= available.width
            && self.image.height() as f32 <= available.height
    }
}

impl Clone for Image {
    fn clone(&self) -> Self {
        Self {
            image: self.image.clone(),
            align: self.align,
            placement: None,
        }
    }
}

impl Component for Image {
    fn draw(&mut self, surface: &mut Surface, ctx: &mut LayoutContext) -> Result<(), BobinaError> {
        if !ctx.tolerate_overflow() && !self.fits(ctx) {
            return Err(BobinaError::OutOfBounds(
                "the image does not fit the available area".to_string(),
            ));
        }

        let width = self.image.width() as f32;
        let height = self.image.height() as f32;
        let x = match self.align {
            Align::Left => ctx.left_offset(),
            Align::Center => (ctx.width() - width) / 2.0,
            Align::Right => ctx.width() - width,
            Align::Unset => {
                return Err(BobinaError::NonDeterministic(
                    "no alignment was set for the image component".to_string(),
                ));
            }
        };
        let y = ctx.used_height() + ctx.top_offset();
        surface.draw_pixmap(x, y, self.image.pixmap());
        self.placement = Some(Rect::from_xywh(x, y, width, height));
        ctx.advance(height);
        Ok(())
    }

    fn draw_in_cell(&mut self, surface: &mut Surface, cell: Rect) -> Result<(), BobinaError> {
        let width = self.image.width() as f32;
        let height = self.image.height() as f32;
        if cell.width < width || cell.height < height {
            return Err(BobinaError::OutOfBounds(
                "the cell region is too small for the image".to_string(),
            ));
        }
        surface.draw_pixmap(cell.x, cell.y, self.image.pixmap());
        self.placement = Some(Rect::from_xywh(cell.x, cell.y, width, height));
        Ok(())
    }

    fn measured_height(&self) -> f32 {
        self.image.height() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Color;
    use crate::RollSize;

    fn raster(width: u32, height: u32) -> RasterImage {
        let mut pixmap = Pixmap::new(width, height).unwrap();
        pixmap.fill(tiny_skia::Color::BLACK);
        RasterImage::from_pixmap(pixmap)
    }

    fn context(tolerate: bool) -> LayoutContext {
        LayoutContext::new(RollSize::R80x297, tolerate, 0.0, 0.0, 272.0, 1011.0)
    }

    #[test]
    fn clone_shares_pixels_but_not_placement() {
        let mut logo = Image::new(raster(16, 16), Align::Center);
        let mut surface = Surface::new(272, 1011, Color::WHITE).unwrap();
        let mut ctx = context(false);
        logo.draw(&mut surface, &mut ctx).unwrap();
        assert!(logo.placement().is_some());

        let copy = logo.clone();
        assert!(copy.image().shares_buffer(logo.image()));
        assert_eq!(copy.placement(), None);

        let mut copy = copy;
        copy.set_placement(Some(Rect::from_xywh(1.0, 2.0, 3.0, 4.0)));
        assert!(logo.placement() != copy.placement());
    }

    #[test]
    fn draw_advances_by_image_height() {
        let mut component = Image::new(raster(20, 35), Align::Left);
        let mut surface = Surface::new(272, 1011, Color::WHITE).unwrap();
        let mut ctx = context(false);
        component.draw(&mut surface, &mut ctx).unwrap();
        assert_eq!(ctx.used_height(), 35.0);
    }

    #[test]
    fn oversized_image_fails_out_of_bounds() {
        let mut component = Image::new(raster(300, 10), Align::Left);
        let mut surface = Surface::new(272, 1011, Color::WHITE).unwrap();
        let mut ctx = context(false);
        assert!(matches!(
            component.draw(&mut surface, &mut ctx),
            Err(BobinaError::OutOfBounds(_))
        ));
        assert_eq!(ctx.used_height(), 0.0);
    }

    #[test]
    fn oversized_image_draws_when_overflow_is_tolerated() {
        let mut component = Image::new(raster(300, 10), Align::Left);
        let mut surface = Surface::new(272, 1011, Color::WHITE).unwrap();
        let mut ctx = context(true);
        component.draw(&mut surface, &mut ctx).unwrap();
        assert_eq!(ctx.used_height(), 10.0);
    }

    #[test]
    fn cell_placement_validates_without_scaling() {
        let mut component = Image::new(raster(50, 50), Align::Left);
        let mut surface = Surface::new(272, 1011, Color::WHITE).unwrap();
        let small = Rect::from_xywh(0.0, 0.0, 40.0, 60.0);
        assert!(matches!(
            component.draw_in_cell(&mut surface, small),
            Err(BobinaError::OutOfBounds(_))
        ));

        let roomy = Rect::from_xywh(0.0, 0.0, 60.0, 60.0);
        component.draw_in_cell(&mut surface, roomy).unwrap();
        assert_eq!(
            component.placement(),
            Some(Rect::from_xywh(0.0, 0.0, 50.0, 50.0))
        );
    }

    #[test]
    fn decode_round_trips_through_the_codec() {
        let mut encoded = Vec::new();
        let rgba = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        image::DynamicImage::ImageRgba8(rgba)
            .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Png)
            .unwrap();

        let decoded = RasterImage::decode(&encoded).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
        let px = decoded.pixmap().pixels()[0].demultiply();
        assert_eq!((px.red(), px.green(), px.blue()), (10, 20, 30));
    }

    #[test]
    fn garbage_bytes_fail_with_codec_error() {
        assert!(matches!(
            RasterImage::decode(&[0, 1, 2, 3]),
            Err(BobinaError::Codec(_))
        ));
    }
}
