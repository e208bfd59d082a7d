use crate::context::LayoutContext;
use crate::error::BobinaError;
use crate::surface::Surface;
use crate::types::Rect;

/// Horizontal alignment of a component. There is no implicit default:
/// drawing with `Unset` fails with `NonDeterministic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Unset,
    Left,
    Center,
    Right,
}

/// A drawable unit of a receipt document: text, an image, or a table.
///
/// Components are drawn either free-form against the shared layout context
/// or inside a fixed table-cell rectangle. The same component instance must
/// not be drawn twice: drawing mutates the shared context and, for tables,
/// the component's own state.
pub trait Component {
    /// Free placement: consumes vertical space from the shared context.
    fn draw(&mut self, surface: &mut Surface, ctx: &mut LayoutContext) -> Result<(), BobinaError>;

    /// Placement inside a fixed table-cell rectangle.
    fn draw_in_cell(&mut self, surface: &mut Surface, cell: Rect) -> Result<(), BobinaError>;

    /// The vertical extent this component contributes to a table row.
    /// The grid engine sizes rows from this value alone.
    fn measured_height(&self) -> f32;
}
