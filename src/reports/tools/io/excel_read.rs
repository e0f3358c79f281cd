use std::collections::HashMap;
use std::path::Path;

use calamine::{DataType, Range, Reader, open_workbook_auto};
use tracing::{debug, instrument};

use crate::reports::tools::error::{Result, ToolError};
use crate::reports::tools::io::layout::{self, SheetLayout};
use crate::reports::tools::model::{Cell, CellValue, ColIndex, RowIndex, Sheet, Workbook};
use crate::reports::tools::validate::has_zip_magic;

type Position = (RowIndex, ColIndex);

/// Reads every sheet of the workbook at `path` into memory.
///
/// Values and formulas come from calamine for both `.xlsx` and `.xls`
/// sources; styles, merges and sizing are only available for ZIP-based
/// documents. Any parse failure is reported as
/// [`ToolError::CorruptWorkbook`]. The file handle is released before the
/// function returns.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn read_workbook(path: &Path) -> Result<Workbook> {
    let mut reader = open_workbook_auto(path).map_err(|err| ToolError::corrupt(path, err))?;

    let layout = if has_zip_magic(path) {
        layout::read_layout(path).map_err(|err| ToolError::corrupt(path, err))?
    } else {
        debug!("source is not a ZIP package, copying values only");
        layout::WorkbookLayout::default()
    };

    let mut sheets = Vec::new();
    for name in reader.sheet_names().to_owned() {
        let range = reader
            .worksheet_range(&name)
            .ok_or_else(|| ToolError::corrupt(path, format!("missing sheet '{name}'")))?
            .map_err(|err| ToolError::corrupt(path, err))?;

        let formulas = match reader.worksheet_formula(&name) {
            Some(Ok(formulas)) => formula_map(&formulas),
            Some(Err(err)) => {
                debug!(sheet = %name, error = %err, "formulas unavailable, keeping cached values");
                HashMap::new()
            }
            None => HashMap::new(),
        };

        let sheet = build_sheet(&name, &range, formulas, layout.sheet(&name));
        debug!(
            sheet = %sheet.name,
            cells = sheet.cells.len(),
            merged = sheet.merged_ranges.len(),
            "sheet loaded"
        );
        sheets.push(sheet);
    }

    Ok(Workbook {
        path: Some(path.to_path_buf()),
        sheets,
    })
}

fn build_sheet(
    name: &str,
    values: &Range<DataType>,
    mut formulas: HashMap<Position, String>,
    layout: Option<&SheetLayout>,
) -> Sheet {
    let mut sheet = Sheet::new(name);
    if let Some(layout) = layout {
        sheet.merged_ranges = layout.merged_ranges.clone();
        sheet.column_widths = layout.column_widths.clone();
        sheet.row_heights = layout.row_heights.clone();
    }

    let (start_row, start_col) = values.start().unwrap_or((0, 0));
    for (row, col, value) in values.cells() {
        let Some(position) = absolute_position(start_row, start_col, row, col) else {
            continue;
        };
        let value = match formulas.remove(&position) {
            Some(text) => CellValue::Formula {
                text,
                cached: cached_result(value),
            },
            None => convert_value(value),
        };
        if !value.is_empty() {
            sheet.set_cell(position.0, position.1, Cell::new(value));
        }
    }

    // Formulas whose cached value calamine reported as empty.
    for ((row, col), text) in formulas {
        let value = CellValue::Formula { text, cached: None };
        sheet.set_cell(row, col, Cell::new(value));
    }

    if let Some(layout) = layout {
        for (&(row, col), style) in &layout.cell_styles {
            sheet
                .cells
                .entry((row, col))
                .or_insert_with(|| Cell::new(CellValue::Empty))
                .style = Some(style.clone());
        }
    }

    sheet
}

fn formula_map(formulas: &Range<String>) -> HashMap<Position, String> {
    let (start_row, start_col) = formulas.start().unwrap_or((0, 0));
    formulas
        .cells()
        .filter(|(_, _, text)| !text.is_empty())
        .filter_map(|(row, col, text)| {
            absolute_position(start_row, start_col, row, col).map(|pos| (pos, text.clone()))
        })
        .collect()
}

fn absolute_position(start_row: u32, start_col: u32, row: usize, col: usize) -> Option<Position> {
    let row = start_row.checked_add(u32::try_from(row).ok()?)?;
    let col = ColIndex::try_from(u64::from(start_col) + col as u64).ok()?;
    Some((row, col))
}

fn convert_value(value: &DataType) -> CellValue {
    match value {
        DataType::Int(number) => CellValue::Number(*number as f64),
        DataType::Float(number) => CellValue::Number(*number),
        DataType::String(text) => CellValue::String(text.clone()),
        DataType::Bool(flag) => CellValue::Boolean(*flag),
        DataType::DateTime(serial) => CellValue::DateTime(*serial),
        DataType::Error(error) => CellValue::Error(error.to_string()),
        DataType::Empty => CellValue::Empty,
        other => CellValue::String(other.to_string()),
    }
}

fn cached_result(value: &DataType) -> Option<String> {
    match value {
        DataType::Empty => None,
        DataType::Bool(flag) => Some(if *flag { "TRUE" } else { "FALSE" }.to_string()),
        other => Some(other.to_string()),
    }
}
