use report_tools::model::{Cell, CellValue, MergedRange, Sheet, column_letters, parse_cell_ref};

#[test]
fn cell_references_are_zero_based() {
    assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
    assert_eq!(parse_cell_ref("AA10"), Some((9, 26)));
    assert_eq!(parse_cell_ref("$C$3"), Some((2, 2)));
    assert_eq!(parse_cell_ref("A0"), None);
    assert_eq!(parse_cell_ref("12"), None);
}

#[test]
fn column_letters_roll_over_after_z() {
    assert_eq!(column_letters(0), "A");
    assert_eq!(column_letters(25), "Z");
    assert_eq!(column_letters(26), "AA");
    assert_eq!(column_letters(701), "ZZ");
    assert_eq!(column_letters(702), "AAA");
}

#[test]
fn merged_ranges_parse_and_display_in_a1_form() {
    let range = MergedRange::from_a1("C3:A1").expect("valid range");
    assert_eq!(range, MergedRange::new(0, 0, 2, 2));
    assert_eq!(range.to_string(), "A1:C3");
    assert!(range.is_anchor(0, 0));
    assert!(range.contains(1, 2));
    assert!(!range.contains(3, 0));
    assert!(MergedRange::from_a1("B2").expect("single cell").is_single_cell());
}

#[test]
fn merged_placeholders_exclude_the_anchor() {
    let mut sheet = Sheet::new("Data");
    sheet.merged_ranges.push(MergedRange::new(0, 0, 0, 2));
    sheet.set_cell(0, 0, Cell::new(CellValue::String("Title".into())));

    assert!(sheet.merged_placeholder(0, 0).is_none());
    assert!(sheet.merged_placeholder(0, 1).is_some());
    assert!(sheet.merged_placeholder(1, 1).is_none());
}
