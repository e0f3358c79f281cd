//! Cell style value types.
//!
//! Enumerated attributes keep the token used in the workbook's `styles.xml`
//! (`thin`, `solid`, `center`, ...); the writer maps them onto its own enums.
//! Colours are `0xRRGGBB`.

/// Font attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Font {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    pub underline: Option<String>,
    pub strikethrough: bool,
    pub color: Option<u32>,
}

/// Pattern fill. For a `solid` pattern the foreground colour is the cell colour.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fill {
    pub pattern: Option<String>,
    pub foreground: Option<u32>,
    pub background: Option<u32>,
}

/// One edge of a cell border.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BorderEdge {
    pub style: String,
    pub color: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Border {
    pub left: Option<BorderEdge>,
    pub right: Option<BorderEdge>,
    pub top: Option<BorderEdge>,
    pub bottom: Option<BorderEdge>,
    pub diagonal: Option<BorderEdge>,
    pub diagonal_up: bool,
    pub diagonal_down: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Alignment {
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    pub wrap_text: bool,
    pub shrink_to_fit: bool,
    pub indent: Option<u8>,
    /// Raw `textRotation`: 0-90 counter-clockwise, 91-180 clockwise, 255 stacked.
    pub rotation: Option<u16>,
}

/// Number format of a cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NumberFormat {
    #[default]
    General,
    /// One of the built-in format ids (below 164).
    Builtin(u8),
    /// A workbook-defined format code.
    Custom(String),
}

/// Complete explicit style of a cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellStyle {
    pub font: Font,
    pub fill: Fill,
    pub border: Border,
    pub alignment: Alignment,
    pub number_format: NumberFormat,
}
