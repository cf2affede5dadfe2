use crate::model::Student;
use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

const NIS_HEADERS: [&str; 3] = ["nis", "nisn", "no induk"];
const NAME_HEADERS: [&str; 3] = ["nama", "nama siswa", "name"];
const CLASS_HEADERS: [&str; 2] = ["kelas", "class"];

pub const TEMPLATE_SHEET: &str = "Daftar Siswa";
const TEMPLATE_HEADERS: [&str; 3] = ["NIS", "Nama", "Kelas"];
const TEMPLATE_ROWS: [[&str; 3]; 4] = [
    ["12345", "Budi Santoso", "10A"],
    ["12346", "Siti Aminah", "10A"],
    ["12347", "Andi Wijaya", "10B"],
    ["12348", "Rina Putri", "10B"],
];

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("unable to read file: {0}")]
    ReadFailed(String),
    #[error("no valid rows found")]
    NoValidRows,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct HeaderMap {
    nis: Option<usize>,
    name: Option<usize>,
    class: Option<usize>,
}

impl HeaderMap {
    fn from_cells<'a, I>(cells: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut m = HeaderMap::default();
        for (idx, raw) in cells.into_iter().enumerate() {
            let h = raw.trim().to_lowercase();
            if m.nis.is_none() && NIS_HEADERS.contains(&h.as_str()) {
                m.nis = Some(idx);
            } else if m.name.is_none() && NAME_HEADERS.contains(&h.as_str()) {
                m.name = Some(idx);
            } else if m.class.is_none() && CLASS_HEADERS.contains(&h.as_str()) {
                m.class = Some(idx);
            }
        }
        m
    }

    fn student(&self, cell: impl Fn(usize) -> String) -> Option<Student> {
        let nis = self.nis.map(&cell).unwrap_or_default();
        let name = self.name.map(&cell).unwrap_or_default();
        if nis.is_empty() || name.is_empty() {
            return None;
        }
        Some(Student {
            id: Uuid::new_v4().to_string(),
            external_id: nis,
            display_name: name,
            class_label: self.class.map(&cell).unwrap_or_default(),
        })
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

/// Reads students from every sheet of a roster file, in sheet order.
///
/// The first row of each sheet is the header. Rows without both a NIS and a
/// name are dropped. Fails with `NoValidRows` if nothing usable is left.
pub fn read_roster_file(path: &Path) -> Result<Vec<Student>, ImportError> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    let students = if is_csv {
        read_csv(path)?
    } else {
        read_workbook(path)?
    };
    if students.is_empty() {
        return Err(ImportError::NoValidRows);
    }
    Ok(students)
}

fn read_workbook(path: &Path) -> Result<Vec<Student>, ImportError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| ImportError::ReadFailed(e.to_string()))?;
    let mut out = Vec::new();
    for sheet_name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ImportError::ReadFailed(e.to_string()))?;
        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            continue;
        };
        let header_text: Vec<String> = header_row.iter().map(cell_text).collect();
        let headers = HeaderMap::from_cells(header_text.iter().map(|s| s.as_str()));
        let before = out.len();
        for row in rows {
            let cell = |idx: usize| row.get(idx).map(cell_text).unwrap_or_default();
            if let Some(s) = headers.student(cell) {
                out.push(s);
            }
        }
        debug!(sheet = %sheet_name, rows = out.len() - before, "roster sheet read");
    }
    Ok(out)
}

fn read_csv(path: &Path) -> Result<Vec<Student>, ImportError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| ImportError::ReadFailed(e.to_string()))?;
    let headers = {
        let h = rdr
            .headers()
            .map_err(|e| ImportError::ReadFailed(e.to_string()))?;
        HeaderMap::from_cells(h.iter().map(|c| c.trim_start_matches('\u{feff}')))
    };
    let mut out = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| ImportError::ReadFailed(e.to_string()))?;
        let cell = |idx: usize| record.get(idx).unwrap_or("").trim().to_string();
        if let Some(s) = headers.student(cell) {
            out.push(s);
        }
    }
    Ok(out)
}

/// Writes a fill-in roster template (csv for `.csv` paths, xlsx otherwise).
pub fn write_roster_template(path: &Path) -> anyhow::Result<()> {
    use anyhow::Context;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    if is_csv {
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create {}", path.to_string_lossy()))?;
        wtr.write_record(TEMPLATE_HEADERS)?;
        for row in TEMPLATE_ROWS {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        return Ok(());
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let ws = workbook.add_worksheet().set_name(TEMPLATE_SHEET)?;
    for (col, h) in TEMPLATE_HEADERS.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, *h, &header_format)?;
    }
    for (idx, row) in TEMPLATE_ROWS.iter().enumerate() {
        for (col, v) in row.iter().enumerate() {
            ws.write_string((idx + 1) as u32, col as u16, *v)?;
        }
    }
    ws.set_column_width(1, 24)?;
    workbook
        .save(path)
        .with_context(|| format!("failed to write {}", path.to_string_lossy()))?;
    Ok(())
}
