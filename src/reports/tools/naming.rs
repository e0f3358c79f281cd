//! Name sanitisation for report files and worksheet titles.
//!
//! Everything in this module is a pure string transform apart from
//! [`build_report_filename`], which reads the local clock.

use std::collections::HashSet;

use chrono::{Local, NaiveDateTime};

use crate::reports::tools::error::{Result, ToolError};

/// Maximum length of a worksheet name accepted by spreadsheet applications.
pub const MAX_SHEET_NAME_LEN: usize = 31;
/// Maximum length of a sanitised file name component.
pub const MAX_FILE_NAME_LEN: usize = 100;
/// Upper bound on suffixes tried before giving up on a unique name.
pub const MAX_NAME_ATTEMPTS: usize = 1000;

const INVALID_FILE_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const INVALID_SHEET_CHARS: [char; 7] = ['\\', '/', '*', '?', ':', '[', ']'];
const FALLBACK_SHEET_NAME: &str = "Sheet";
/// Excel reserves this worksheet title.
const RESERVED_SHEET_NAME: &str = "History";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Strips characters that are invalid in file names, turns spaces into
/// underscores, collapses underscore runs, and caps the result at
/// [`MAX_FILE_NAME_LEN`] characters.
pub fn sanitize_file_name(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if INVALID_FILE_CHARS.contains(&ch) {
            continue;
        }
        let ch = if ch == ' ' { '_' } else { ch };
        if ch == '_' && result.ends_with('_') {
            continue;
        }
        result.push(ch);
    }

    truncate_chars(&result, MAX_FILE_NAME_LEN)
}

/// Makes `raw` acceptable as a worksheet title.
///
/// Invalid characters become underscores and the result is capped at
/// [`MAX_SHEET_NAME_LEN`] characters. Worksheet titles may not begin or end
/// with an apostrophe or be blank, so those are trimmed and replaced by
/// `Sheet` respectively. `History` is reserved by Excel and becomes
/// `History_`. Truncation can make distinct inputs collide; use a
/// [`SheetNameRegistry`] to resolve that.
pub fn sanitize_sheet_name(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|ch| if INVALID_SHEET_CHARS.contains(&ch) { '_' } else { ch })
        .collect();

    let truncated = truncate_chars(replaced.trim_matches('\''), MAX_SHEET_NAME_LEN);
    let trimmed = truncated.trim_end_matches('\'');
    if trimmed.is_empty() {
        FALLBACK_SHEET_NAME.to_string()
    } else if trimmed.eq_ignore_ascii_case(RESERVED_SHEET_NAME) {
        format!("{trimmed}_")
    } else {
        trimmed.to_string()
    }
}

/// Builds a timestamped report file name using the local clock.
///
/// Two calls within the same second with identical arguments return the same
/// name.
pub fn build_report_filename(
    report_type: &str,
    tenant_name: &str,
    period: Option<&str>,
    extension: &str,
) -> String {
    build_report_filename_at(
        report_type,
        tenant_name,
        period,
        extension,
        Local::now().naive_local(),
    )
}

/// Same as [`build_report_filename`] with an explicit timestamp.
pub fn build_report_filename_at(
    report_type: &str,
    tenant_name: &str,
    period: Option<&str>,
    extension: &str,
    timestamp: NaiveDateTime,
) -> String {
    let report_name = title_case(&report_type.replace('_', " ")).replace(' ', "_");
    let tenant = sanitize_file_name(tenant_name);
    let stamp = timestamp.format(TIMESTAMP_FORMAT);
    let extension = extension.trim_start_matches('.');

    match period.map(sanitize_file_name).filter(|p| !p.is_empty()) {
        Some(period) => format!("{report_name}_{tenant}_{period}_{stamp}.{extension}"),
        None => format!("{report_name}_{tenant}_{stamp}.{extension}"),
    }
}

/// Tracks worksheet names already present in a workbook and hands out
/// collision-free ones.
///
/// Names are compared case-insensitively because spreadsheet applications
/// reject `Data` and `DATA` in the same workbook.
#[derive(Debug, Default, Clone)]
pub struct SheetNameRegistry {
    used: HashSet<String>,
}

impl SheetNameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `name` is already taken.
    pub fn contains(&self, name: &str) -> bool {
        self.used.contains(&name.to_lowercase())
    }

    /// Number of names handed out so far.
    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    /// Claims `candidate` if free, otherwise the first free `{base}_{n}`
    /// where the base is shortened so the whole name stays within
    /// [`MAX_SHEET_NAME_LEN`] characters.
    pub fn assign(&mut self, candidate: &str) -> Result<String> {
        if !self.contains(candidate) {
            self.claim(candidate);
            return Ok(candidate.to_string());
        }

        for counter in 1..=MAX_NAME_ATTEMPTS {
            let suffix = format!("_{counter}");
            let max_base = MAX_SHEET_NAME_LEN.saturating_sub(suffix.len());
            let name = format!("{}{suffix}", truncate_chars(candidate, max_base));
            if !self.contains(&name) {
                self.claim(&name);
                return Ok(name);
            }
        }

        Err(ToolError::SheetNameCollisionUnresolvable {
            name: candidate.to_string(),
            attempts: MAX_NAME_ATTEMPTS,
        })
    }

    fn claim(&mut self, name: &str) {
        self.used.insert(name.to_lowercase());
    }
}

/// Returns at most `max` leading characters of `value`.
pub(crate) fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((byte_idx, _)) => value[..byte_idx].to_string(),
        None => value.to_string(),
    }
}

/// Upper-cases the first letter of every word and lower-cases the rest,
/// where a word starts after any non-alphabetic character.
fn title_case(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut previous_alpha = false;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if previous_alpha {
                result.extend(ch.to_lowercase());
            } else {
                result.extend(ch.to_uppercase());
            }
            previous_alpha = true;
        } else {
            result.push(ch);
            previous_alpha = false;
        }
    }
    result
}
