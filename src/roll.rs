use crate::error::BobinaError;

// Default pixels-per-millimetre factor used by the receipt hardware this
// engine targets. Roughly 86.5 DPI.
pub(crate) const DEFAULT_PIXELS_PER_MM: f32 = 3.405;

const MM_PER_INCH: f32 = 25.4;

/// Enumerated thermal-roll (bobbin) sizes: physical width by maximum length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RollSize {
    /// 58mm x 297mm
    R58x297,
    /// 58mm x 3276mm
    R58x3276,
    /// 80mm x 297mm
    R80x297,
    /// 80mm x 3276mm
    R80x3276,
}

impl RollSize {
    /// Physical dimensions in millimetres.
    pub fn size_mm(self) -> (u32, u32) {
        match self {
            RollSize::R58x297 => (58, 297),
            RollSize::R58x3276 => (58, 3276),
            RollSize::R80x297 => (80, 297),
            RollSize::R80x3276 => (80, 3276),
        }
    }

    /// Pixel dimensions of the roll at the given resolution.
    pub fn pixels(self, resolution: Resolution) -> Result<(u32, u32), BobinaError> {
        let factor = resolution.pixels_per_mm()?;
        let (width_mm, height_mm) = self.size_mm();
        let width = (width_mm as f32 * factor) as u32;
        let height = (height_mm as f32 * factor) as u32;
        Ok((width, height))
    }
}

/// Conversion from physical roll size to canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Fixed pixels-per-millimetre factor.
    PixelsPerMm(f32),
    /// Dots per inch.
    Dpi(u32),
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::PixelsPerMm(DEFAULT_PIXELS_PER_MM)
    }
}

impl Resolution {
    fn pixels_per_mm(self) -> Result<f32, BobinaError> {
        match self {
            Resolution::PixelsPerMm(factor) => {
                if factor.is_finite() && factor > 0.0 {
                    Ok(factor)
                } else {
                    Err(BobinaError::InvalidConfiguration(format!(
                        "pixels-per-mm factor must be positive, got {factor}"
                    )))
                }
            }
            Resolution::Dpi(dpi) => {
                if dpi > 0 {
                    Ok(dpi as f32 / MM_PER_INCH)
                } else {
                    Err(BobinaError::InvalidConfiguration(
                        "dpi must be greater than zero".to_string(),
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_factor_pixel_sizes() {
        let (w, h) = RollSize::R58x297.pixels(Resolution::default()).unwrap();
        assert_eq!((w, h), (197, 1011));

        let (w, h) = RollSize::R80x3276.pixels(Resolution::default()).unwrap();
        assert_eq!((w, h), (272, 11154));
    }

    #[test]
    fn dpi_pixel_sizes() {
        let (w, _) = RollSize::R58x297.pixels(Resolution::Dpi(203)).unwrap();
        assert_eq!(w, (58.0 * 203.0 / 25.4) as u32);
    }

    #[test]
    fn invalid_resolutions_rejected() {
        assert!(matches!(
            RollSize::R58x297.pixels(Resolution::Dpi(0)),
            Err(BobinaError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            RollSize::R58x297.pixels(Resolution::PixelsPerMm(0.0)),
            Err(BobinaError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            RollSize::R58x297.pixels(Resolution::PixelsPerMm(f32::NAN)),
            Err(BobinaError::InvalidConfiguration(_))
        ));
    }
}
