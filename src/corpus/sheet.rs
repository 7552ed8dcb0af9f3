//! Reads the first worksheet of an `.xlsx` workbook into rows of cell strings.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::package::XlsxPackage;
use crate::error::LoadError;

const FALLBACK_SHEET: &str = "xl/worksheets/sheet1.xml";

/// Zero-based index of `XFD`, the last xlsx column.
const MAX_COLUMN: usize = 16_383;

pub fn read_xlsx_rows(path: &Path) -> Result<Vec<Vec<String>>, LoadError> {
    let pkg = XlsxPackage::read(path)?;
    rows_from_package(&pkg)
}

pub fn rows_from_package(pkg: &XlsxPackage) -> Result<Vec<Vec<String>>, LoadError> {
    let shared = match pkg.part("xl/sharedStrings.xml") {
        Some(xml) => parse_shared_strings(xml)?,
        None => Vec::new(),
    };
    let sheet_name = first_sheet_part(pkg)?;
    let sheet = pkg
        .part(&sheet_name)
        .ok_or_else(|| LoadError::Malformed(format!("worksheet missing: {sheet_name}")))?;
    parse_sheet(sheet, &shared)
}

fn first_sheet_part(pkg: &XlsxPackage) -> Result<String, LoadError> {
    let workbook = pkg
        .part("xl/workbook.xml")
        .ok_or_else(|| LoadError::Malformed("xl/workbook.xml missing".to_string()))?;
    let rid = first_sheet_rel_id(workbook)?;
    if let (Some(rid), Some(rels)) = (rid, pkg.part("xl/_rels/workbook.xml.rels")) {
        if let Some(target) = relationship_target(rels, &rid)? {
            return Ok(resolve_target(&target));
        }
    }
    Ok(FALLBACK_SHEET.to_string())
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(abs) => abs.to_string(),
        None => format!("xl/{target}"),
    }
}

fn first_sheet_rel_id(xml: &[u8]) -> Result<Option<String>, LoadError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Eof => return Ok(None),
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                for a in e.attributes() {
                    let a = a.map_err(quick_xml::Error::from)?;
                    if a.key.local_name().as_ref() == b"id" && a.key.prefix().is_some() {
                        return Ok(Some(a.unescape_value()?.into_owned()));
                    }
                }
            }
            _ => {}
        }
    }
}

fn relationship_target(xml: &[u8], rid: &str) -> Result<Option<String>, LoadError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Eof => return Ok(None),
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = attr_value(&e, b"Id")?;
                if id.as_deref() == Some(rid) {
                    return attr_value(&e, b"Target");
                }
            }
            _ => {}
        }
    }
}

fn attr_value(e: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>, LoadError> {
    for a in e.attributes() {
        let a = a.map_err(quick_xml::Error::from)?;
        if a.key.local_name().as_ref() == local {
            return Ok(Some(a.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

pub fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, LoadError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut phonetic_depth = 0usize;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"rPh" => phonetic_depth += 1,
                b"t" if in_si && phonetic_depth == 0 => in_t = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => out.push(String::new()),
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"si" => {
                    in_si = false;
                    out.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Event::Text(t) if in_t => current.push_str(&t.unescape()?),
            Event::CData(t) if in_t => current.push_str(&String::from_utf8_lossy(&t.into_inner())),
            _ => {}
        }
    }
    Ok(out)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CellKind {
    Shared,
    Bool,
    Plain,
}

struct CellState {
    col: usize,
    kind: CellKind,
    value: String,
}

pub fn parse_sheet(xml: &[u8], shared: &[String]) -> Result<Vec<Vec<String>>, LoadError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Option<Vec<String>> = None;
    let mut cell: Option<CellState> = None;
    let mut in_value = false;
    let mut next_col = 0usize;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    row = Some(Vec::new());
                    next_col = 0;
                }
                b"c" => {
                    let (col, kind) = cell_header(&e, next_col)?;
                    cell = Some(CellState {
                        col,
                        kind,
                        value: String::new(),
                    });
                }
                b"v" | b"t" if cell.is_some() => in_value = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => rows.push(Vec::new()),
                b"c" => {
                    let (col, _) = cell_header(&e, next_col)?;
                    next_col = col + 1;
                }
                _ => {}
            },
            Event::Text(t) if in_value => {
                if let Some(c) = cell.as_mut() {
                    c.value.push_str(&t.unescape()?);
                }
            }
            Event::CData(t) if in_value => {
                if let Some(c) = cell.as_mut() {
                    c.value.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some(c) = cell.take() {
                        let col = c.col;
                        let value = resolve_cell(c, shared)?;
                        if let Some(r) = row.as_mut() {
                            if r.len() <= col {
                                r.resize(col + 1, String::new());
                            }
                            r[col] = value;
                        }
                        next_col = col + 1;
                    }
                }
                b"row" => {
                    if let Some(r) = row.take() {
                        rows.push(r);
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
    Ok(rows)
}

fn cell_header(e: &BytesStart<'_>, next_col: usize) -> Result<(usize, CellKind), LoadError> {
    let col = match attr_value(e, b"r")? {
        Some(r) => column_index(&r)?.unwrap_or(next_col),
        None => next_col,
    };
    if col > MAX_COLUMN {
        return Err(LoadError::Malformed(format!("cell column {} beyond XFD", col + 1)));
    }
    let kind = match attr_value(e, b"t")?.as_deref() {
        Some("s") => CellKind::Shared,
        Some("b") => CellKind::Bool,
        _ => CellKind::Plain,
    };
    Ok((col, kind))
}

fn resolve_cell(cell: CellState, shared: &[String]) -> Result<String, LoadError> {
    match cell.kind {
        CellKind::Shared => {
            let idx: usize = cell.value.trim().parse().map_err(|_| {
                LoadError::Malformed(format!("bad shared string index: {:?}", cell.value))
            })?;
            shared
                .get(idx)
                .cloned()
                .ok_or_else(|| LoadError::Malformed(format!("shared string {idx} out of range")))
        }
        CellKind::Bool => Ok(if cell.value.trim() == "1" {
            "TRUE".to_string()
        } else {
            "FALSE".to_string()
        }),
        CellKind::Plain => Ok(cell.value),
    }
}

/// Zero-based column of an A1-style cell reference (`"C7"` -> 2). `None` when the reference
/// has no letters; references past `XFD` are malformed.
fn column_index(cell_ref: &str) -> Result<Option<usize>, LoadError> {
    let letters: Vec<char> = cell_ref.chars().take_while(char::is_ascii_alphabetic).collect();
    if letters.is_empty() {
        return Ok(None);
    }
    let mut col = 0usize;
    for ch in letters {
        let digit = ch.to_ascii_uppercase() as usize - 'A' as usize + 1;
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add(digit))
            .filter(|&c| c <= MAX_COLUMN + 1)
            .ok_or_else(|| LoadError::Malformed(format!("bad cell reference: {cell_ref:?}")))?;
    }
    Ok(Some(col - 1))
}
