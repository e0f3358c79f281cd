use std::io::Write;
use std::path::Path;

use rust_xlsxwriter::{
    Color, ColNum, Format, FormatAlign, FormatBorder, FormatDiagonalBorder, FormatPattern,
    FormatUnderline, Formula, RowNum, Workbook as XlsxWorkbook, Worksheet,
};
use tracing::{debug, instrument};

use crate::reports::tools::error::{Result, ToolError};
use crate::reports::tools::model::{
    Alignment, Border, CellStyle, CellValue, Fill, Font, NumberFormat, Sheet, Workbook,
};

/// Built-in `m/d/yyyy h:mm` format used for dates that arrive without a style.
const DEFAULT_DATETIME_FORMAT: u8 = 22;

/// Writes the provided workbook to `path`.
///
/// The document is rendered in memory, written to a temporary file next to
/// `path` and renamed into place, so a failed or concurrent write never
/// leaves a truncated document under the final name.
#[instrument(level = "debug", skip(workbook), fields(path = %path.display()))]
pub fn write_workbook(path: &Path, workbook: &Workbook) -> Result<()> {
    let buffer = render_workbook(workbook)?.save_to_buffer()?;

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let write_failure = |source: std::io::Error| ToolError::IoWriteFailure {
        path: path.to_path_buf(),
        source,
    };

    let mut staged = tempfile::Builder::new()
        .prefix(".consolidating-")
        .suffix(".partial")
        .tempfile_in(directory)
        .map_err(write_failure)?;
    staged.write_all(&buffer).map_err(write_failure)?;
    staged.as_file().sync_all().map_err(write_failure)?;
    staged.persist(path).map_err(|err| write_failure(err.error))?;

    debug!(bytes = buffer.len(), "workbook persisted");
    Ok(())
}

/// Renders the in-memory workbook into a writer workbook.
pub fn render_workbook(workbook: &Workbook) -> Result<XlsxWorkbook> {
    let mut writer = XlsxWorkbook::new();
    for sheet in &workbook.sheets {
        let worksheet = writer.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        render_sheet(worksheet, sheet)?;
    }
    Ok(writer)
}

fn render_sheet(worksheet: &mut Worksheet, sheet: &Sheet) -> Result<()> {
    for (&(row, col), cell) in &sheet.cells {
        let format = cell_format(cell.style.as_ref(), &cell.value);
        write_value(worksheet, row, col, &cell.value, &format)?;
    }

    // Merging overwrites the anchor with an empty string, so the anchor value
    // is written again once the range exists.
    for range in &sheet.merged_ranges {
        let anchor = sheet.cell(range.first_row, range.first_col);
        let format = anchor
            .map(|cell| cell_format(cell.style.as_ref(), &cell.value))
            .unwrap_or_else(Format::new);
        worksheet.merge_range(
            range.first_row,
            range.first_col,
            range.last_row,
            range.last_col,
            "",
            &format,
        )?;
        if let Some(cell) = anchor {
            write_value(worksheet, range.first_row, range.first_col, &cell.value, &format)?;
        }
    }

    for (&col, &width) in &sheet.column_widths {
        worksheet.set_column_width(col, width)?;
    }
    for (&row, &height) in &sheet.row_heights {
        worksheet.set_row_height(row, height)?;
    }

    Ok(())
}

fn write_value(
    worksheet: &mut Worksheet,
    row: RowNum,
    col: ColNum,
    value: &CellValue,
    format: &Format,
) -> Result<()> {
    match value {
        CellValue::String(text) => {
            worksheet.write_string_with_format(row, col, text, format)?;
        }
        CellValue::Number(number) | CellValue::DateTime(number) => {
            worksheet.write_number_with_format(row, col, *number, format)?;
        }
        CellValue::Boolean(flag) => {
            worksheet.write_boolean_with_format(row, col, *flag, format)?;
        }
        // The writer has no error-cell type, so error literals are kept as
        // their display text.
        CellValue::Error(text) => {
            worksheet.write_string_with_format(row, col, text, format)?;
        }
        CellValue::Formula { text, cached } => {
            let mut formula = Formula::new(text);
            if let Some(result) = cached {
                formula = formula.set_result(result);
            }
            worksheet.write_formula_with_format(row, col, formula, format)?;
        }
        CellValue::Empty => {
            worksheet.write_blank(row, col, format)?;
        }
    }
    Ok(())
}

fn cell_format(style: Option<&CellStyle>, value: &CellValue) -> Format {
    match (style, value) {
        (Some(style), _) => build_format(style),
        (None, CellValue::DateTime(_)) => {
            Format::new().set_num_format_index(DEFAULT_DATETIME_FORMAT)
        }
        (None, _) => Format::new(),
    }
}

/// Converts a cell style into a writer format.
pub fn build_format(style: &CellStyle) -> Format {
    let format = apply_font(Format::new(), &style.font);
    let format = apply_fill(format, &style.fill);
    let format = apply_border(format, &style.border);
    let format = apply_alignment(format, &style.alignment);
    match &style.number_format {
        NumberFormat::General => format,
        NumberFormat::Builtin(index) => format.set_num_format_index(*index),
        NumberFormat::Custom(code) => format.set_num_format(code),
    }
}

fn apply_font(mut format: Format, font: &Font) -> Format {
    if let Some(name) = &font.name {
        format = format.set_font_name(name);
    }
    if let Some(size) = font.size {
        format = format.set_font_size(size);
    }
    if font.bold {
        format = format.set_bold();
    }
    if font.italic {
        format = format.set_italic();
    }
    if let Some(underline) = &font.underline {
        format = format.set_underline(map_underline(underline));
    }
    if font.strikethrough {
        format = format.set_font_strikethrough();
    }
    if let Some(color) = font.color {
        format = format.set_font_color(Color::RGB(color));
    }
    format
}

fn apply_fill(mut format: Format, fill: &Fill) -> Format {
    match fill.pattern.as_deref() {
        None | Some("none") => format,
        Some("solid") => match fill.foreground.or(fill.background) {
            Some(color) => format.set_background_color(Color::RGB(color)),
            None => format.set_pattern(FormatPattern::Solid),
        },
        Some(pattern) => {
            format = format.set_pattern(map_pattern(pattern));
            if let Some(color) = fill.foreground {
                format = format.set_foreground_color(Color::RGB(color));
            }
            if let Some(color) = fill.background {
                format = format.set_background_color(Color::RGB(color));
            }
            format
        }
    }
}

fn apply_border(mut format: Format, border: &Border) -> Format {
    if let Some(edge) = &border.top {
        format = format.set_border_top(map_border_style(&edge.style));
        if let Some(color) = edge.color {
            format = format.set_border_top_color(Color::RGB(color));
        }
    }
    if let Some(edge) = &border.bottom {
        format = format.set_border_bottom(map_border_style(&edge.style));
        if let Some(color) = edge.color {
            format = format.set_border_bottom_color(Color::RGB(color));
        }
    }
    if let Some(edge) = &border.left {
        format = format.set_border_left(map_border_style(&edge.style));
        if let Some(color) = edge.color {
            format = format.set_border_left_color(Color::RGB(color));
        }
    }
    if let Some(edge) = &border.right {
        format = format.set_border_right(map_border_style(&edge.style));
        if let Some(color) = edge.color {
            format = format.set_border_right_color(Color::RGB(color));
        }
    }
    if let Some(edge) = &border.diagonal {
        if border.diagonal_up || border.diagonal_down {
            format = format.set_border_diagonal(map_border_style(&edge.style));
            if let Some(color) = edge.color {
                format = format.set_border_diagonal_color(Color::RGB(color));
            }
            let direction = match (border.diagonal_up, border.diagonal_down) {
                (true, true) => FormatDiagonalBorder::BorderUpDown,
                (true, false) => FormatDiagonalBorder::BorderUp,
                _ => FormatDiagonalBorder::BorderDown,
            };
            format = format.set_border_diagonal_type(direction);
        }
    }
    format
}

fn apply_alignment(mut format: Format, alignment: &Alignment) -> Format {
    if let Some(align) = alignment.horizontal.as_deref().and_then(map_horizontal) {
        format = format.set_align(align);
    }
    if let Some(align) = alignment.vertical.as_deref().and_then(map_vertical) {
        format = format.set_align(align);
    }
    if alignment.wrap_text {
        format = format.set_text_wrap();
    }
    if alignment.shrink_to_fit {
        format = format.set_shrink();
    }
    if let Some(indent) = alignment.indent.filter(|indent| *indent > 0) {
        format = format.set_indent(indent);
    }
    if let Some(rotation) = alignment.rotation.and_then(map_rotation) {
        format = format.set_rotation(rotation);
    }
    format
}

fn map_underline(value: &str) -> FormatUnderline {
    match value {
        "double" => FormatUnderline::Double,
        "singleAccounting" => FormatUnderline::SingleAccounting,
        "doubleAccounting" => FormatUnderline::DoubleAccounting,
        _ => FormatUnderline::Single,
    }
}

fn map_pattern(value: &str) -> FormatPattern {
    match value {
        "mediumGray" => FormatPattern::MediumGray,
        "darkGray" => FormatPattern::DarkGray,
        "lightGray" => FormatPattern::LightGray,
        "darkHorizontal" => FormatPattern::DarkHorizontal,
        "darkVertical" => FormatPattern::DarkVertical,
        "darkDown" => FormatPattern::DarkDown,
        "darkUp" => FormatPattern::DarkUp,
        "darkGrid" => FormatPattern::DarkGrid,
        "darkTrellis" => FormatPattern::DarkTrellis,
        "lightHorizontal" => FormatPattern::LightHorizontal,
        "lightVertical" => FormatPattern::LightVertical,
        "lightDown" => FormatPattern::LightDown,
        "lightUp" => FormatPattern::LightUp,
        "lightGrid" => FormatPattern::LightGrid,
        "lightTrellis" => FormatPattern::LightTrellis,
        "gray125" => FormatPattern::Gray125,
        "gray0625" => FormatPattern::Gray0625,
        _ => FormatPattern::Solid,
    }
}

fn map_border_style(value: &str) -> FormatBorder {
    match value {
        "thin" => FormatBorder::Thin,
        "medium" => FormatBorder::Medium,
        "thick" => FormatBorder::Thick,
        "double" => FormatBorder::Double,
        "dashed" => FormatBorder::Dashed,
        "dotted" => FormatBorder::Dotted,
        "hair" => FormatBorder::Hair,
        "mediumDashed" => FormatBorder::MediumDashed,
        "dashDot" => FormatBorder::DashDot,
        "mediumDashDot" => FormatBorder::MediumDashDot,
        "dashDotDot" => FormatBorder::DashDotDot,
        "mediumDashDotDot" => FormatBorder::MediumDashDotDot,
        "slantDashDot" => FormatBorder::SlantDashDot,
        "none" => FormatBorder::None,
        _ => FormatBorder::Thin,
    }
}

fn map_horizontal(value: &str) -> Option<FormatAlign> {
    match value {
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "centerContinuous" => Some(FormatAlign::CenterAcross),
        "distributed" => Some(FormatAlign::Distributed),
        _ => None,
    }
}

fn map_vertical(value: &str) -> Option<FormatAlign> {
    match value {
        "top" => Some(FormatAlign::Top),
        "center" => Some(FormatAlign::VerticalCenter),
        "bottom" => Some(FormatAlign::Bottom),
        "justify" => Some(FormatAlign::VerticalJustify),
        "distributed" => Some(FormatAlign::VerticalDistributed),
        _ => None,
    }
}

/// Maps `textRotation` (91-180 meaning clockwise) onto signed degrees.
fn map_rotation(value: u16) -> Option<i16> {
    match value {
        0 => None,
        1..=90 => Some(value as i16),
        91..=180 => Some(90 - value as i16),
        255 => Some(270),
        _ => None,
    }
}
