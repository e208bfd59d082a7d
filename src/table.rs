use crate::component::{Align, Component};
use crate::context::LayoutContext;
use crate::error::BobinaError;
use crate::font::Font;
use crate::surface::Surface;
use crate::text::Text;
use crate::types::{Color, Rect};

const MAX_WIDTH_PERCENTAGE: f32 = 100.0;
const PERCENTAGE_TOLERANCE: f32 = 0.01;
// Width held back from the roll before columns are sized.
const TABLE_SECURITY_MARGIN: f32 = 0.0;

/// Background fill selector for a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellFill {
    #[default]
    None,
    Light,
    Dark,
    Black,
}

impl CellFill {
    fn color(self) -> Color {
        match self {
            CellFill::None => Color::WHITE,
            CellFill::Light => Color::LIGHT_GRAY,
            CellFill::Dark => Color::DARK_GRAY,
            CellFill::Black => Color::BLACK,
        }
    }
}

/// A header column: identifying name, displayed text, and whether the
/// header cell is painted with the columns' fill color.
#[derive(Debug, Clone)]
pub struct TableColumn {
    name: String,
    display_name: String,
    pub draw_background: bool,
}

impl TableColumn {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let display_name = name.clone();
        Self {
            name,
            display_name,
            draw_background: true,
        }
    }

    pub fn with_display_name(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            draw_background: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// One table cell: a drawable component plus a background fill tag.
pub struct TableCell {
    component: Box<dyn Component>,
    pub fill: CellFill,
}

impl TableCell {
    pub fn new(component: Box<dyn Component>) -> Self {
        Self {
            component,
            fill: CellFill::None,
        }
    }

    pub fn with_fill(component: Box<dyn Component>, fill: CellFill) -> Self {
        Self { component, fill }
    }
}

/// A bounded sequence of cells; at most the owning table's column count.
pub struct TableRow {
    cells: Vec<TableCell>,
    capacity: usize,
}

impl TableRow {
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: Vec::new(),
            capacity,
        }
    }

    pub fn add_cell(&mut self, cell: TableCell) -> Result<(), BobinaError> {
        if self.cells.len() >= self.capacity {
            return Err(BobinaError::CapacityExceeded(format!(
                "cannot add another cell; the row is limited to {} cells",
                self.capacity
            )));
        }
        self.cells.push(cell);
        Ok(())
    }

    pub fn remove_cell_at(&mut self, index: usize) -> Result<(), BobinaError> {
        if index >= self.cells.len() {
            return Err(BobinaError::InvalidConfiguration(
                "cell index out of bounds".to_string(),
            ));
        }
        self.cells.remove(index);
        Ok(())
    }

    /// Applies one fill tag to every cell in the row.
    pub fn set_fill(&mut self, fill: CellFill) -> &mut Self {
        for cell in &mut self.cells {
            cell.fill = fill;
        }
        self
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// The header schema of a table: column definitions plus header styling.
pub struct Columns {
    columns: Vec<TableColumn>,
    capacity: usize,
    pub header_font: Font,
    pub fill_color: Color,
    pub text_color: Color,
}

impl Columns {
    fn new(capacity: usize) -> Self {
        Self {
            columns: Vec::new(),
            capacity,
            header_font: Font::fallback(12.0),
            fill_color: Color::LIGHT_GRAY,
            text_color: Color::BLACK,
        }
    }

    pub fn add(&mut self, column: TableColumn) -> Result<(), BobinaError> {
        if self.columns.len() >= self.capacity {
            return Err(BobinaError::CapacityExceeded(format!(
                "cannot add another column; the table is limited to {} columns",
                self.capacity
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn remove_at(&mut self, index: usize) -> Result<(), BobinaError> {
        if index >= self.columns.len() {
            return Err(BobinaError::InvalidConfiguration(
                "column index out of bounds".to_string(),
            ));
        }
        self.columns.remove(index);
        Ok(())
    }

    pub fn get(&self) -> &[TableColumn] {
        &self.columns
    }

    pub fn get_mut(&mut self) -> &mut [TableColumn] {
        &mut self.columns
    }
}

/// The row collection of a table. Rows are validated against the column
/// model when added; a rejected row leaves the collection unchanged.
pub struct Rows {
    rows: Vec<TableRow>,
    column_count: usize,
}

impl Rows {
    fn new(column_count: usize) -> Self {
        Self {
            rows: Vec::new(),
            column_count,
        }
    }

    pub fn add(&mut self, row: TableRow) -> Result<(), BobinaError> {
        if row.cell_count() != self.column_count || row.cell_count() == 0 {
            return Err(BobinaError::RowMismatch(format!(
                "row with {} cells does not match the {}-column table model",
                row.cell_count(),
                self.column_count
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn remove_at(&mut self, index: usize) -> Result<(), BobinaError> {
        if index >= self.rows.len() {
            return Err(BobinaError::InvalidConfiguration(
                "row index out of bounds".to_string(),
            ));
        }
        self.rows.remove(index);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A grid of components: a header row sized from column percentages and
/// data rows whose heights resolve from their cells' measured heights.
///
/// The grid renders into a private sub-canvas sized like the document
/// canvas; the document's final trim discards the unused remainder.
pub struct Table {
    column_count: usize,
    percentages: Vec<f32>,
    pub columns: Columns,
    pub rows: Rows,
    pub row_wrap: bool,
    pub grid_color: Color,
    tolerate_overflow: bool,
    rendered_height: f32,
}

impl Table {
    pub fn new(column_count: usize, tolerate_overflow: bool) -> Result<Self, BobinaError> {
        if column_count < 1 {
            return Err(BobinaError::InvalidSchema(
                "the table must have at least one column".to_string(),
            ));
        }
        let equal_share = MAX_WIDTH_PERCENTAGE / column_count as f32;
        Ok(Self {
            column_count,
            percentages: vec![equal_share; column_count],
            columns: Columns::new(column_count),
            rows: Rows::new(column_count),
            row_wrap: false,
            grid_color: Color::BLACK,
            tolerate_overflow,
            rendered_height: 0.0,
        })
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// A new empty row sized to this table's column model.
    pub fn new_row(&self) -> TableRow {
        TableRow::new(self.column_count)
    }

    /// Sets the per-column width percentages. The vector length must equal
    /// the column count and the values must sum to exactly 100.
    pub fn set_percentages(&mut self, widths: &[f32]) -> Result<(), BobinaError> {
        if widths.len() != self.column_count {
            return Err(BobinaError::InvalidSchema(format!(
                "{} percentage values do not match the {} table columns",
                widths.len(),
                self.column_count
            )));
        }
        let sum: f32 = widths.iter().sum();
        if sum > MAX_WIDTH_PERCENTAGE + PERCENTAGE_TOLERANCE {
            return Err(BobinaError::InvalidSchema(format!(
                "column percentages sum to {sum}, above the 100% maximum"
            )));
        }
        if sum < MAX_WIDTH_PERCENTAGE - PERCENTAGE_TOLERANCE {
            return Err(BobinaError::InvalidSchema(format!(
                "column percentages sum to {sum}, below the 100% minimum"
            )));
        }
        self.percentages = widths.to_vec();
        Ok(())
    }

    pub fn percentages(&self) -> &[f32] {
        &self.percentages
    }

    fn drawable_width(&self, ctx: &LayoutContext) -> f32 {
        ctx.width() - TABLE_SECURITY_MARGIN
    }

    fn column_width(&self, ctx: &LayoutContext, index: usize) -> f32 {
        self.drawable_width(ctx) * self.percentages[index] / MAX_WIDTH_PERCENTAGE
    }

    fn draw_header(
        &mut self,
        grid: &mut Surface,
        ctx: &LayoutContext,
        cursor: &mut GridCursor,
    ) -> Result<(), BobinaError> {
        // An incomplete column schema draws no header at all.
        if self.columns.get().len() != self.column_count {
            return Ok(());
        }

        let font = self.columns.header_font.clone();
        let mut widths = Vec::with_capacity(self.column_count);
        let mut texts = Vec::with_capacity(self.column_count);
        let mut max_height = 0.0f32;

        for (index, column) in self.columns.get().iter().enumerate() {
            let available = self.column_width(ctx, index);
            let mut text = column.display_name().to_string();
            log::debug!(
                "table header column {index} ({:?}): {available:.1}px available",
                column.name()
            );

            if self.row_wrap {
                let measured = font.measure(&text);
                if measured.width > available {
                    text = wrap_header_text(&text, measured.width, available);
                }
            }

            let measured = font.measure(&text);
            if measured.cap_height > max_height {
                max_height = measured.cap_height;
            }
            widths.push(available);
            texts.push(text);
        }

        let header_height = max_height * 2.0;
        for (index, text) in texts.into_iter().enumerate() {
            let region = Rect::from_xywh(cursor.x, cursor.y, widths[index], header_height);
            log::trace!("table header cell {index} at {region:?}");

            if self.columns.get()[index].draw_background {
                grid.fill_rect(region, self.columns.fill_color);
            }
            grid.stroke_rect(region, self.grid_color);

            let mut header_text =
                Text::new(font.clone(), text, Align::Center, self.columns.text_color);
            header_text.draw_in_cell(grid, region)?;

            cursor.x += widths[index];
        }
        cursor.next_row(header_height);
        Ok(())
    }

    fn draw_grid(&mut self, grid: &mut Surface, ctx: &LayoutContext) -> Result<f32, BobinaError> {
        let mut cursor = GridCursor::default();
        self.draw_header(grid, ctx, &mut cursor)?;

        let widths: Vec<f32> = (0..self.column_count)
            .map(|index| self.column_width(ctx, index))
            .collect();
        let grid_height = grid.height() as f32;
        let grid_color = self.grid_color;
        let tolerate_overflow = self.tolerate_overflow;

        for row in &mut self.rows.rows {
            let row_height = row
                .cells
                .iter()
                .map(|cell| cell.component.measured_height())
                .fold(0.0f32, f32::max)
                * 2.0;

            if !tolerate_overflow && row_height > grid_height - cursor.consumed {
                return Err(BobinaError::OutOfBounds(
                    "no remaining roll length for the table row".to_string(),
                ));
            }

            for (index, cell) in row.cells.iter_mut().enumerate() {
                let region = Rect::from_xywh(cursor.x, cursor.y, widths[index], row_height);
                log::trace!("table cell {index} at {region:?}");

                grid.fill_rect(region, cell.fill.color());
                grid.stroke_rect(region, grid_color);
                cell.component.draw_in_cell(grid, region)?;
                cursor.x += widths[index];
            }
            cursor.next_row(row_height);
        }

        Ok(cursor.consumed)
    }
}

#[derive(Default)]
struct GridCursor {
    x: f32,
    y: f32,
    consumed: f32,
}

impl GridCursor {
    fn next_row(&mut self, height: f32) {
        self.x = 0.0;
        self.y += height;
        self.consumed += height;
    }
}

impl Component for Table {
    fn draw(&mut self, surface: &mut Surface, ctx: &mut LayoutContext) -> Result<(), BobinaError> {
        let mut grid = Surface::new(surface.width(), surface.height(), Color::WHITE)?;
        let consumed = self.draw_grid(&mut grid, ctx)?;
        self.rendered_height = consumed;

        surface.draw_pixmap(0.0, ctx.used_height() + ctx.top_offset(), grid.pixmap());
        ctx.advance(consumed + ctx.top_offset());
        Ok(())
    }

    fn draw_in_cell(&mut self, _surface: &mut Surface, _cell: Rect) -> Result<(), BobinaError> {
        Err(BobinaError::NotSupported(
            "rendering a table inside a table cell is not supported".to_string(),
        ))
    }

    fn measured_height(&self) -> f32 {
        self.rendered_height
    }
}

/// Breaks header text that overflows its column into uniform-width lines.
///
/// The break positions assume an average character width
/// (`measured_width / char_count`); proportional fonts therefore break a
/// little early or late. Downstream receipt formats depend on these exact
/// breakpoints, so the heuristic must not be replaced by width-aware
/// wrapping.
fn wrap_header_text(text: &str, measured_width: f32, available_width: f32) -> String {
    let char_count = text.chars().count();
    if char_count == 0 {
        return String::new();
    }
    let unit_width = measured_width / char_count as f32;
    if unit_width < 1.0 {
        return text.to_string();
    }
    let chars_per_line = (available_width as i32 / unit_width as i32) - 1;
    if chars_per_line < 1 {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + char_count);
    for (index, ch) in text.chars().enumerate() {
        if index > 0 && index % chars_per_line as usize == 0 {
            out.push('\n');
        }
        out.push(ch);
    }
    out
}
