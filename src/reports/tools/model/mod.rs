//! In-memory representation of spreadsheet documents.
//!
//! Coordinates are zero-based (`A1` is row 0, column 0), matching both the
//! reader and the writer crates. Styles are plain values: copying a cell
//! clones its style, so an output workbook never borrows from a source.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub mod style;

pub use style::{Alignment, Border, BorderEdge, CellStyle, Fill, Font, NumberFormat};

/// Zero-based row index.
pub type RowIndex = u32;
/// Zero-based column index.
pub type ColIndex = u16;

/// Scalar content of a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CellValue {
    /// Plain string literal.
    String(String),
    /// Numeric literal.
    Number(f64),
    /// Boolean literal.
    Boolean(bool),
    /// Serial date/time number; the display comes from the number format.
    DateTime(f64),
    /// Error literal such as `#DIV/0!`.
    Error(String),
    /// Formula text without the leading `=`, with the last cached result.
    Formula { text: String, cached: Option<String> },
    /// No value; the cell exists only to carry a style.
    Empty,
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

/// A single cell: its value and an optional explicit style.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: Option<CellStyle>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Self { value, style: None }
    }

    pub fn with_style(value: CellValue, style: CellStyle) -> Self {
        Self {
            value,
            style: Some(style),
        }
    }
}

/// Rectangular block of cells presented as one; only the top-left anchor
/// holds a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MergedRange {
    pub first_row: RowIndex,
    pub first_col: ColIndex,
    pub last_row: RowIndex,
    pub last_col: ColIndex,
}

impl MergedRange {
    /// Creates a range, normalising the corner order.
    pub fn new(row_a: RowIndex, col_a: ColIndex, row_b: RowIndex, col_b: ColIndex) -> Self {
        Self {
            first_row: row_a.min(row_b),
            first_col: col_a.min(col_b),
            last_row: row_a.max(row_b),
            last_col: col_a.max(col_b),
        }
    }

    /// Parses an `A1:B2` style reference.
    pub fn from_a1(reference: &str) -> Option<Self> {
        let (start, end) = reference.split_once(':').unwrap_or((reference, reference));
        let (row_a, col_a) = parse_cell_ref(start)?;
        let (row_b, col_b) = parse_cell_ref(end)?;
        Some(Self::new(row_a, col_a, row_b, col_b))
    }

    pub fn contains(&self, row: RowIndex, col: ColIndex) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }

    pub fn is_anchor(&self, row: RowIndex, col: ColIndex) -> bool {
        row == self.first_row && col == self.first_col
    }

    /// A range covering one cell is not a real merge.
    pub fn is_single_cell(&self) -> bool {
        self.first_row == self.last_row && self.first_col == self.last_col
    }
}

impl fmt::Display for MergedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}{}",
            column_letters(self.first_col),
            self.first_row + 1,
            column_letters(self.last_col),
            self.last_row + 1
        )
    }
}

/// A named grid of cells together with its merges and sizing overrides.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub name: String,
    pub cells: BTreeMap<(RowIndex, ColIndex), Cell>,
    pub merged_ranges: Vec<MergedRange>,
    /// Explicit column widths in character units.
    pub column_widths: BTreeMap<ColIndex, f64>,
    /// Explicit row heights in points.
    pub row_heights: BTreeMap<RowIndex, f64>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn cell(&self, row: RowIndex, col: ColIndex) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn set_cell(&mut self, row: RowIndex, col: ColIndex, cell: Cell) {
        self.cells.insert((row, col), cell);
    }

    /// Returns the merged range covering `(row, col)` when that position is
    /// not the range's anchor.
    pub fn merged_placeholder(&self, row: RowIndex, col: ColIndex) -> Option<&MergedRange> {
        self.merged_ranges
            .iter()
            .find(|range| range.contains(row, col) && !range.is_anchor(row, col))
    }
}

/// An ordered list of sheets, optionally backed by a file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub path: Option<PathBuf>,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }
}

/// Converts a zero-based column index into its letter form (`0` → `A`).
pub fn column_letters(col: ColIndex) -> String {
    let mut n = u32::from(col) + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push(char::from(b'A' + rem));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Parses `B7` (optionally with `$` markers) into zero-based coordinates.
pub fn parse_cell_ref(reference: &str) -> Option<(RowIndex, ColIndex)> {
    let cleaned: String = reference.chars().filter(|ch| *ch != '$').collect();
    let split = cleaned.find(|ch: char| ch.is_ascii_digit())?;
    let (letters, digits) = cleaned.split_at(split);
    if letters.is_empty() || !letters.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return None;
    }

    let mut col: u32 = 0;
    for ch in letters.chars() {
        col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        if col > u32::from(ColIndex::MAX) {
            return None;
        }
    }
    let row: RowIndex = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, (col - 1) as ColIndex))
}
