//! Reads the presentation layer of an OOXML workbook: cell styles, merged
//! ranges, column widths and row heights.
//!
//! Cell values come from calamine; this module only walks the parts calamine
//! does not expose (`styles.xml` and the worksheet `cols`, `row`, `c@s` and
//! `mergeCell` markup).

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::reports::tools::model::{
    Alignment, Border, BorderEdge, CellStyle, ColIndex, Fill, Font, MergedRange, NumberFormat,
    RowIndex, parse_cell_ref,
};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const STYLES_PART: &str = "xl/styles.xml";
const FIRST_CUSTOM_NUM_FMT: u32 = 164;
const MAX_COLUMNS: u32 = 16_384;
/// Default font metrics used by spreadsheet applications for column widths.
const MAX_DIGIT_WIDTH: f64 = 7.0;
const CELL_PADDING: f64 = 5.0;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("xml parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),
    #[error("zip error: {0}")]
    Zip(#[from] ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing workbook part {0}")]
    MissingPart(String),
}

/// Presentation data of a single worksheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetLayout {
    /// Explicit styles keyed by zero-based `(row, col)`; cells using the
    /// default style are absent.
    pub cell_styles: BTreeMap<(RowIndex, ColIndex), CellStyle>,
    pub merged_ranges: Vec<MergedRange>,
    pub column_widths: BTreeMap<ColIndex, f64>,
    pub row_heights: BTreeMap<RowIndex, f64>,
}

/// Presentation data of every worksheet, keyed by sheet name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookLayout {
    pub sheets: HashMap<String, SheetLayout>,
}

impl WorkbookLayout {
    pub fn sheet(&self, name: &str) -> Option<&SheetLayout> {
        self.sheets.get(name)
    }
}

/// Reads the layout of the workbook stored at `path`.
pub fn read_layout(path: &Path) -> Result<WorkbookLayout, LayoutError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    read_layout_from_archive(&mut archive)
}

pub fn read_layout_from_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<WorkbookLayout, LayoutError> {
    let workbook_xml = read_part(archive, WORKBOOK_PART)?
        .ok_or_else(|| LayoutError::MissingPart(WORKBOOK_PART.to_string()))?;
    let rels_xml = read_part(archive, WORKBOOK_RELS_PART)?
        .ok_or_else(|| LayoutError::MissingPart(WORKBOOK_RELS_PART.to_string()))?;
    let styles = match read_part(archive, STYLES_PART)? {
        Some(xml) => parse_styles(&xml)?,
        None => Vec::new(),
    };

    let targets = parse_relationships(&rels_xml)?;
    let mut layout = WorkbookLayout::default();

    for (name, rel_id) in parse_sheet_entries(&workbook_xml)? {
        let Some(target) = targets.get(&rel_id) else {
            debug!(sheet = %name, rel_id = %rel_id, "sheet relationship not found");
            continue;
        };
        let part = resolve_target(target);
        let Some(xml) = read_part(archive, &part)? else {
            debug!(sheet = %name, part = %part, "worksheet part not found");
            continue;
        };
        layout.sheets.insert(name, parse_worksheet(&xml, &styles)?);
    }

    Ok(layout)
}

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, LayoutError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

fn attr(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, LayoutError> {
    for attribute in element.attributes().with_checks(false) {
        let attribute = attribute?;
        if attribute.key.local_name().as_ref() == name {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn attr_bool(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<bool>, LayoutError> {
    Ok(attr(element, name)?.map(|value| parse_xml_bool(&value)))
}

/// Boolean toggles such as `<b/>` are on unless `val` says otherwise.
fn toggle(element: &BytesStart<'_>) -> Result<bool, LayoutError> {
    Ok(attr_bool(element, b"val")?.unwrap_or(true))
}

fn parse_xml_bool(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed == "1" || trimmed.eq_ignore_ascii_case("true")
}

/// Parses an `AARRGGBB` or `RRGGBB` colour. Theme and indexed colours are
/// not resolved.
fn color(element: &BytesStart<'_>) -> Result<Option<u32>, LayoutError> {
    let Some(rgb) = attr(element, b"rgb")? else {
        return Ok(None);
    };
    let hex = rgb.trim();
    if !hex.is_ascii() {
        return Ok(None);
    }
    // ARGB: drop the alpha byte.
    let hex = if hex.len() == 8 { hex.get(2..).unwrap_or(hex) } else { hex };
    Ok(u32::from_str_radix(hex, 16).ok())
}

fn parse_sheet_entries(xml: &str) -> Result<Vec<(String, String)>, LayoutError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                if let (Some(name), Some(id)) = (attr(&e, b"name")?, attr(&e, b"id")?) {
                    sheets.push((name, id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, LayoutError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut targets = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(&e, b"Id")?, attr(&e, b"Target")?) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(targets)
}

#[derive(Clone, Copy, Default, PartialEq, Eq)]
enum StyleSection {
    #[default]
    None,
    NumFmts,
    Fonts,
    Fills,
    Borders,
    CellXfs,
}

#[derive(Default)]
struct XfRecord {
    num_fmt_id: u32,
    font_id: usize,
    fill_id: usize,
    border_id: usize,
    alignment: Alignment,
}

#[derive(Default)]
struct StyleTables {
    num_fmts: HashMap<u32, String>,
    fonts: Vec<Font>,
    fills: Vec<Fill>,
    borders: Vec<Border>,
    xfs: Vec<XfRecord>,
}

impl StyleTables {
    fn resolve(&self) -> Vec<CellStyle> {
        self.xfs
            .iter()
            .map(|xf| CellStyle {
                font: self.fonts.get(xf.font_id).cloned().unwrap_or_default(),
                fill: self.fills.get(xf.fill_id).cloned().unwrap_or_default(),
                border: self.borders.get(xf.border_id).cloned().unwrap_or_default(),
                alignment: xf.alignment.clone(),
                number_format: self.number_format(xf.num_fmt_id),
            })
            .collect()
    }

    fn number_format(&self, id: u32) -> NumberFormat {
        if let Some(code) = self.num_fmts.get(&id) {
            return NumberFormat::Custom(code.clone());
        }
        match id {
            0 => NumberFormat::General,
            id if id < FIRST_CUSTOM_NUM_FMT => NumberFormat::Builtin(id as u8),
            _ => NumberFormat::General,
        }
    }
}

/// Parses `styles.xml` into one resolved style per `cellXfs` entry.
fn parse_styles(xml: &str) -> Result<Vec<CellStyle>, LayoutError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut parser = StyleParser::default();

    loop {
        let event = reader.read_event_into(&mut buf)?.into_owned();
        buf.clear();
        match event {
            Event::Start(e) => parser.open(&e, false)?,
            Event::Empty(e) => parser.open(&e, true)?,
            Event::End(e) => parser.close(e.local_name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(parser.tables.resolve())
}

/// Incremental state while walking `styles.xml`.
#[derive(Default)]
struct StyleParser {
    tables: StyleTables,
    section: StyleSection,
    font: Option<Font>,
    fill: Option<Fill>,
    border: Option<Border>,
    edge: Option<(Vec<u8>, BorderEdge)>,
    xf: Option<XfRecord>,
}

impl StyleParser {
    fn open(&mut self, e: &BytesStart<'_>, is_empty: bool) -> Result<(), LayoutError> {
        let name = e.local_name();
        let name = name.as_ref();

        match (self.section, name) {
            (_, b"numFmts") => self.section = StyleSection::NumFmts,
            (_, b"fonts") => self.section = StyleSection::Fonts,
            (_, b"fills") => self.section = StyleSection::Fills,
            (_, b"borders") => self.section = StyleSection::Borders,
            (_, b"cellXfs") => self.section = StyleSection::CellXfs,
            (_, b"cellStyleXfs" | b"cellStyles" | b"dxfs") => self.section = StyleSection::None,

            (StyleSection::NumFmts, b"numFmt") => {
                let id: Option<u32> = parse_attr(e, b"numFmtId")?;
                if let (Some(id), Some(code)) = (id, attr(e, b"formatCode")?) {
                    self.tables.num_fmts.insert(id, code);
                }
            }

            (StyleSection::Fonts, b"font") => {
                self.font = Some(Font::default());
                if is_empty {
                    self.close(name);
                }
            }
            (StyleSection::Fonts, _) => {
                if let Some(font) = self.font.as_mut() {
                    apply_font_property(font, name, e)?;
                }
            }

            (StyleSection::Fills, b"fill") => {
                self.fill = Some(Fill::default());
                if is_empty {
                    self.close(name);
                }
            }
            (StyleSection::Fills, b"patternFill") => {
                if let Some(fill) = self.fill.as_mut() {
                    fill.pattern = attr(e, b"patternType")?;
                }
            }
            (StyleSection::Fills, b"fgColor") => {
                if let Some(fill) = self.fill.as_mut() {
                    fill.foreground = color(e)?;
                }
            }
            (StyleSection::Fills, b"bgColor") => {
                if let Some(fill) = self.fill.as_mut() {
                    fill.background = color(e)?;
                }
            }

            (StyleSection::Borders, b"border") => {
                self.border = Some(Border {
                    diagonal_up: attr_bool(e, b"diagonalUp")?.unwrap_or(false),
                    diagonal_down: attr_bool(e, b"diagonalDown")?.unwrap_or(false),
                    ..Border::default()
                });
                if is_empty {
                    self.close(name);
                }
            }
            (StyleSection::Borders, b"color") => {
                if let Some((_, edge)) = self.edge.as_mut() {
                    edge.color = color(e)?;
                }
            }
            (StyleSection::Borders, _) => {
                if let Some(style) = attr(e, b"style")? {
                    self.edge = Some((name.to_vec(), BorderEdge { style, color: None }));
                    if is_empty {
                        self.close(name);
                    }
                }
            }

            (StyleSection::CellXfs, b"xf") => {
                self.xf = Some(XfRecord {
                    num_fmt_id: parse_attr(e, b"numFmtId")?.unwrap_or(0),
                    font_id: parse_attr(e, b"fontId")?.unwrap_or(0),
                    fill_id: parse_attr(e, b"fillId")?.unwrap_or(0),
                    border_id: parse_attr(e, b"borderId")?.unwrap_or(0),
                    alignment: Alignment::default(),
                });
                if is_empty {
                    self.close(name);
                }
            }
            (StyleSection::CellXfs, b"alignment") => {
                if let Some(xf) = self.xf.as_mut() {
                    xf.alignment = parse_alignment(e)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match (self.section, name) {
            (_, b"numFmts" | b"fonts" | b"fills" | b"borders" | b"cellXfs") => {
                self.section = StyleSection::None;
            }
            (StyleSection::Fonts, b"font") => self.tables.fonts.extend(self.font.take()),
            (StyleSection::Fills, b"fill") => self.tables.fills.extend(self.fill.take()),
            (StyleSection::Borders, b"border") => self.tables.borders.extend(self.border.take()),
            (StyleSection::Borders, _) => {
                let closes_edge = matches!(
                    &self.edge,
                    Some((edge_name, _)) if edge_name.as_slice() == name
                );
                if !closes_edge {
                    return;
                }
                if let (Some((edge_name, edge)), Some(border)) =
                    (self.edge.take(), self.border.as_mut())
                {
                    assign_edge(border, &edge_name, edge);
                }
            }
            (StyleSection::CellXfs, b"xf") => self.tables.xfs.extend(self.xf.take()),
            _ => {}
        }
    }
}

fn parse_attr<T: std::str::FromStr>(
    e: &BytesStart<'_>,
    name: &[u8],
) -> Result<Option<T>, LayoutError> {
    Ok(attr(e, name)?.and_then(|value| value.trim().parse().ok()))
}

fn apply_font_property(
    font: &mut Font,
    name: &[u8],
    e: &BytesStart<'_>,
) -> Result<(), LayoutError> {
    match name {
        b"b" => font.bold = toggle(e)?,
        b"i" => font.italic = toggle(e)?,
        b"strike" => font.strikethrough = toggle(e)?,
        b"u" => {
            let value = attr(e, b"val")?.unwrap_or_else(|| "single".to_string());
            font.underline = (value != "none").then_some(value);
        }
        b"sz" => font.size = parse_attr(e, b"val")?,
        b"name" => font.name = attr(e, b"val")?,
        b"color" => font.color = color(e)?,
        _ => {}
    }
    Ok(())
}

fn assign_edge(border: &mut Border, name: &[u8], edge: BorderEdge) {
    match name {
        b"left" | b"start" => border.left = Some(edge),
        b"right" | b"end" => border.right = Some(edge),
        b"top" => border.top = Some(edge),
        b"bottom" => border.bottom = Some(edge),
        b"diagonal" => border.diagonal = Some(edge),
        _ => {}
    }
}

fn parse_alignment(e: &BytesStart<'_>) -> Result<Alignment, LayoutError> {
    Ok(Alignment {
        horizontal: attr(e, b"horizontal")?,
        vertical: attr(e, b"vertical")?,
        wrap_text: attr_bool(e, b"wrapText")?.unwrap_or(false),
        shrink_to_fit: attr_bool(e, b"shrinkToFit")?.unwrap_or(false),
        indent: parse_attr(e, b"indent")?,
        rotation: parse_attr(e, b"textRotation")?,
    })
}

/// Converts a stored `col@width`, which includes cell padding, back into the
/// character count a user would enter.
fn character_width(stored: f64) -> f64 {
    let pixels = stored * MAX_DIGIT_WIDTH;
    if pixels >= MAX_DIGIT_WIDTH + CELL_PADDING {
        (pixels - CELL_PADDING) / MAX_DIGIT_WIDTH
    } else {
        pixels / (MAX_DIGIT_WIDTH + CELL_PADDING)
    }
}

/// Parses one worksheet part, resolving `c@s` through `styles`.
fn parse_worksheet(xml: &str, styles: &[CellStyle]) -> Result<SheetLayout, LayoutError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut layout = SheetLayout::default();

    let mut current_row: Option<RowIndex> = None;
    let mut next_col: ColIndex = 0;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"col" => {
                    let min: Option<u32> = parse_attr(&e, b"min")?;
                    let max: Option<u32> = parse_attr(&e, b"max")?;
                    let width: Option<f64> = parse_attr(&e, b"width")?;
                    if let (Some(min), Some(width)) = (min, width) {
                        let max = max.unwrap_or(min).min(MAX_COLUMNS);
                        let width = character_width(width);
                        for col in min.max(1)..=max {
                            layout.column_widths.insert((col - 1) as ColIndex, width);
                        }
                    }
                }
                b"row" => {
                    let row = match parse_attr::<u32>(&e, b"r")? {
                        Some(r) if r > 0 => r - 1,
                        _ => current_row.map_or(0, |previous| previous + 1),
                    };
                    current_row = Some(row);
                    next_col = 0;
                    if let Some(height) = parse_attr::<f64>(&e, b"ht")? {
                        layout.row_heights.insert(row, height);
                    }
                }
                b"c" => {
                    let (row, col) = attr(&e, b"r")?
                        .and_then(|r| parse_cell_ref(&r))
                        .unwrap_or((current_row.unwrap_or(0), next_col));
                    next_col = col.saturating_add(1);
                    let style_id: usize = parse_attr(&e, b"s")?.unwrap_or(0);
                    if style_id != 0 {
                        if let Some(style) = styles.get(style_id) {
                            layout.cell_styles.insert((row, col), style.clone());
                        }
                    }
                }
                b"mergeCell" => {
                    if let Some(range) = attr(&e, b"ref")?.and_then(|r| MergedRange::from_a1(&r)) {
                        if !range.is_single_cell() {
                            layout.merged_ranges.push(range);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(layout)
}
