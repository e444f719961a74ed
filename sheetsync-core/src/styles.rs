//! Number format codes of xlsx cells.
//!
//! calamine hands us typed values but not the format code each cell is
//! displayed with. For xlsx containers we read `xl/styles.xml` and the
//! style index of every worksheet cell ourselves, then key the codes by
//! sheet name and zero-based (row, column).

use crate::error::ParseError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

/// Format codes of one sheet by zero-based (row, column).
pub(crate) type SheetFormats = HashMap<(u32, u32), String>;

#[derive(Debug, Default)]
pub(crate) struct WorkbookFormats {
    sheets: HashMap<String, SheetFormats>,
}

impl WorkbookFormats {
    pub(crate) fn sheet(&self, name: &str) -> Option<&SheetFormats> {
        self.sheets.get(name)
    }
}

/// Code for a built-in format id, as listed in ECMA-376 part 1, 18.8.30.
///
/// Id 14 is locale dependent; we use the en-US rendering `m/d/yy`.
pub(crate) fn builtin_format_code(id: u32) -> Option<&'static str> {
    let code = match id {
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "m/d/yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    };
    Some(code)
}

/// Reads the format code of every styled cell in an xlsx file.
///
/// A workbook without `xl/styles.xml` has no codes, which is not an error.
pub(crate) fn read_workbook_formats(path: &Path) -> Result<WorkbookFormats, ParseError> {
    let file = File::open(path).map_err(|e| ParseError::io(path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| open_error(path, e))?;

    let Some(styles) = read_entry(&mut archive, path, "xl/styles.xml")? else {
        return Ok(WorkbookFormats::default());
    };
    let xf_codes = parse_styles(&styles).map_err(|e| open_error(path, e))?;

    let workbook = read_entry(&mut archive, path, "xl/workbook.xml")?.unwrap_or_default();
    let rels = read_entry(&mut archive, path, "xl/_rels/workbook.xml.rels")?.unwrap_or_default();
    let targets = parse_relationships(&rels).map_err(|e| open_error(path, e))?;

    let mut sheets = HashMap::new();
    for (name, rel_id) in parse_sheets(&workbook).map_err(|e| open_error(path, e))? {
        let Some(target) = targets.get(&rel_id) else {
            continue;
        };
        let Some(xml) = read_entry(&mut archive, path, target)? else {
            continue;
        };
        let formats = parse_sheet_formats(&xml, &xf_codes).map_err(|e| open_error(path, e))?;
        debug!("sheet [{}] has {} formatted cells", name, formats.len());
        sheets.insert(name, formats);
    }

    Ok(WorkbookFormats { sheets })
}

fn open_error(path: &Path, err: impl std::fmt::Display) -> ParseError {
    ParseError::Open {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn read_entry(
    archive: &mut ZipArchive<File>,
    path: &Path,
    name: &str,
) -> Result<Option<String>, ParseError> {
    let Ok(mut entry) = archive.by_name(name) else {
        return Ok(None);
    };
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| ParseError::io(path, e))?;
    Ok(Some(xml))
}

/// Value of the attribute with the given local name, unescaped.
fn attr(element: &BytesStart, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| {
            let raw = std::str::from_utf8(&a.value).ok()?;
            quick_xml::escape::unescape(raw).ok().map(|s| s.into_owned())
        })
}

/// Format code per `cellXfs` entry, `None` for the general format.
fn parse_styles(xml: &str) -> Result<Vec<Option<String>>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut custom: HashMap<u32, String> = HashMap::new();
    let mut xf_ids = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"numFmt" => {
                    let id = attr(&e, b"numFmtId").and_then(|v| v.parse().ok());
                    if let (Some(id), Some(code)) = (id, attr(&e, b"formatCode")) {
                        custom.insert(id, code);
                    }
                }
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => {
                    let id: u32 = attr(&e, b"numFmtId")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0);
                    xf_ids.push(id);
                }
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(xf_ids
        .into_iter()
        .map(|id| match id {
            0 => None,
            _ => custom
                .get(&id)
                .cloned()
                .or_else(|| builtin_format_code(id).map(str::to_string)),
        })
        .collect())
}

/// Sheet names with their relationship ids, in workbook order.
fn parse_sheets(xml: &str) -> Result<Vec<(String, String)>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                if let (Some(name), Some(id)) = (attr(&e, b"name"), attr(&e, b"id")) {
                    sheets.push((name, id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

/// Relationship id to archive path.
fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(&e, b"Id"), attr(&e, b"Target")) {
                    let target = match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("xl/{}", target),
                    };
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

/// Zero-based (row, column) of an `A1`-style reference.
fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    let row: u32 = digits.parse().ok()?;
    Some((row.checked_sub(1)?, col - 1))
}

fn parse_sheet_formats(
    xml: &str,
    xf_codes: &[Option<String>],
) -> Result<SheetFormats, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut formats = SheetFormats::new();
    let mut row: Option<u32> = None;
    let mut next_col: u32 = 0;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => {
                    let explicit = attr(&e, b"r")
                        .and_then(|r| r.parse::<u32>().ok())
                        .and_then(|r| r.checked_sub(1));
                    row = Some(explicit.unwrap_or_else(|| row.map_or(0, |r| r + 1)));
                    next_col = 0;
                }
                b"c" => {
                    let position = attr(&e, b"r")
                        .and_then(|r| parse_cell_ref(&r))
                        .unwrap_or((row.unwrap_or(0), next_col));
                    next_col = position.1 + 1;

                    let code = attr(&e, b"s")
                        .and_then(|s| s.parse::<usize>().ok())
                        .and_then(|s| xf_codes.get(s))
                        .and_then(Option::as_ref);
                    if let Some(code) = code {
                        formats.insert(position, code.clone());
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(formats)
}
