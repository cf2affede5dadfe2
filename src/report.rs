use crate::calc::{format_percent, AggregateRow};
use crate::model::Student;
use anyhow::Context;
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Spreadsheet sheet names may not exceed this many characters.
pub const SHEET_NAME_MAX_CHARS: usize = 31;
const SHEET_NAME_RESERVED: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

pub const REPORT_HEADERS: [&str; 9] = [
    "No",
    "NIS",
    "Nama Siswa",
    "Kelas",
    "Hadir",
    "Sakit",
    "Izin",
    "Alpha",
    "Total Kehadiran (%)",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub no: usize,
    pub nis: String,
    pub name: String,
    pub class_label: String,
    pub present: u32,
    pub sick: u32,
    pub excused: u32,
    pub unexcused: u32,
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSheet {
    pub class_label: String,
    pub sheet_name: String,
    pub rows: Vec<ReportRow>,
}

/// Splits aggregate rows into one table per class, ordered by class label.
///
/// Rows whose student is no longer on the roster are dropped; classes with no
/// rows get no sheet.
pub fn format_for_export(rows: &[AggregateRow], roster: &[Student]) -> Vec<ReportSheet> {
    let by_id: HashMap<&str, &Student> = roster.iter().map(|s| (s.id.as_str(), s)).collect();

    let mut by_class: BTreeMap<&str, Vec<ReportRow>> = BTreeMap::new();
    for row in rows {
        let Some(student) = by_id.get(row.student_id.as_str()) else {
            continue;
        };
        let table = by_class.entry(student.class_label.as_str()).or_default();
        table.push(ReportRow {
            no: table.len() + 1,
            nis: student.external_id.clone(),
            name: student.display_name.clone(),
            class_label: student.class_label.clone(),
            present: row.present,
            sick: row.sick,
            excused: row.excused,
            unexcused: row.unexcused,
            percentage: format_percent(row.percentage()),
        });
    }

    let mut taken: HashSet<String> = HashSet::new();
    by_class
        .into_iter()
        .map(|(label, rows)| ReportSheet {
            class_label: label.to_string(),
            sheet_name: unique_sheet_name(&sheet_name_for_class(label), &mut taken),
            rows,
        })
        .collect()
}

/// `Kelas <label>`, cleaned up so a spreadsheet accepts it as a sheet name.
pub fn sheet_name_for_class(class_label: &str) -> String {
    let raw = format!("Kelas {}", class_label.trim());
    let cleaned: String = raw
        .chars()
        .map(|c| if SHEET_NAME_RESERVED.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = cleaned.trim_matches('\'');
    let name: String = trimmed.chars().take(SHEET_NAME_MAX_CHARS).collect();
    let name = name.trim_end().trim_end_matches('\'').to_string();
    if name.is_empty() {
        "Kelas".to_string()
    } else {
        name
    }
}

// Sheet names compare case-insensitively.
fn unique_sheet_name(base: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(base.to_lowercase()) {
        return base.to_string();
    }
    let mut n = 2usize;
    loop {
        let suffix = format!(" ({n})");
        let keep = SHEET_NAME_MAX_CHARS.saturating_sub(suffix.chars().count());
        let head: String = base.chars().take(keep).collect();
        let candidate = format!("{}{}", head.trim_end(), suffix);
        if taken.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}

pub fn write_report_workbook(sheets: &[ReportSheet], out_path: &Path) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for sheet in sheets {
        let ws = workbook
            .add_worksheet()
            .set_name(&sheet.sheet_name)
            .with_context(|| format!("invalid sheet name {}", sheet.sheet_name))?;

        for (col, header) in REPORT_HEADERS.iter().enumerate() {
            ws.write_string_with_format(0, col as u16, *header, &header_format)
                .context("failed to write header row")?;
        }
        for (idx, r) in sheet.rows.iter().enumerate() {
            let row = (idx + 1) as u32;
            ws.write_number(row, 0, r.no as f64)?;
            ws.write_string(row, 1, &r.nis)?;
            ws.write_string(row, 2, &r.name)?;
            ws.write_string(row, 3, &r.class_label)?;
            ws.write_number(row, 4, f64::from(r.present))?;
            ws.write_number(row, 5, f64::from(r.sick))?;
            ws.write_number(row, 6, f64::from(r.excused))?;
            ws.write_number(row, 7, f64::from(r.unexcused))?;
            ws.write_string(row, 8, &r.percentage)?;
        }
        ws.set_column_width(2, 28)?;
        ws.set_column_width(8, 20)?;
    }

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    workbook
        .save(out_path)
        .with_context(|| format!("failed to write {}", out_path.to_string_lossy()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::{aggregate, Window};
    use crate::model::{AttendanceEvent, AttendanceStatus};

    fn student(id: &str, class: &str) -> Student {
        Student {
            id: id.to_string(),
            external_id: format!("N{id}"),
            display_name: format!("Siswa {id}"),
            class_label: class.to_string(),
        }
    }

    fn present(student_id: &str, date: &str) -> AttendanceEvent {
        AttendanceEvent {
            id: format!("{student_id}-{date}"),
            student_id: student_id.to_string(),
            date: date.parse().expect("date"),
            status: AttendanceStatus::Present,
        }
    }

    #[test]
    fn partitions_by_class() {
        let roster = vec![
            student("1", "10B"),
            student("2", "10A"),
            student("3", "10B"),
        ];
        let events = vec![
            present("1", "2024-03-04"),
            present("2", "2024-03-04"),
            present("3", "2024-03-05"),
        ];
        let rows = aggregate(
            &roster,
            &events,
            Window::Month {
                year: 2024,
                month: 3,
            },
            None,
        );
        let sheets = format_for_export(&rows, &roster);

        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].class_label, "10A");
        assert_eq!(sheets[0].sheet_name, "Kelas 10A");
        assert_eq!(sheets[1].class_label, "10B");
        assert!(sheets
            .iter()
            .all(|s| s.rows.iter().all(|r| r.class_label == s.class_label)));
        let total: usize = sheets.iter().map(|s| s.rows.len()).sum();
        assert_eq!(total, roster.len());

        let b = &sheets[1].rows;
        assert_eq!((b[0].no, b[0].nis.as_str()), (1, "N1"));
        assert_eq!((b[1].no, b[1].nis.as_str()), (2, "N3"));
        assert_eq!(b[0].percentage, "100.0%");
    }

    #[test]
    fn zero_total_prints_zero_percent() {
        let roster = vec![student("1", "10A")];
        let rows = vec![AggregateRow {
            student_id: "1".into(),
            ..AggregateRow::default()
        }];
        let sheets = format_for_export(&rows, &roster);
        assert_eq!(sheets[0].rows[0].percentage, "0.0%");
    }

    #[test]
    fn percentage_has_one_decimal() {
        let roster = vec![student("1", "10A")];
        let rows = vec![AggregateRow {
            student_id: "1".into(),
            present: 2,
            sick: 1,
            total: 3,
            ..AggregateRow::default()
        }];
        let sheets = format_for_export(&rows, &roster);
        assert_eq!(sheets[0].rows[0].percentage, "66.7%");
    }

    #[test]
    fn no_rows_no_sheets() {
        assert!(format_for_export(&[], &[student("1", "10A")]).is_empty());
        let orphan = vec![AggregateRow {
            student_id: "gone".into(),
            ..AggregateRow::default()
        }];
        assert!(format_for_export(&orphan, &[]).is_empty());
    }

    #[test]
    fn sheet_names_fit_the_limit() {
        let long = sheet_name_for_class("IPA Unggulan Program Khusus Internasional");
        assert_eq!(long.chars().count(), SHEET_NAME_MAX_CHARS);
        assert!(long.starts_with("Kelas IPA"));

        assert_eq!(sheet_name_for_class("10/A [pagi]"), "Kelas 10_A _pagi_");
        assert_eq!(sheet_name_for_class(""), "Kelas");
    }

    #[test]
    fn colliding_names_get_suffix() {
        let a = "IPA Unggulan Program Khusus Internasional A";
        let b = "IPA Unggulan Program Khusus Internasional B";
        let roster = vec![student("1", a), student("2", b)];
        let rows = vec![
            AggregateRow {
                student_id: "1".into(),
                ..AggregateRow::default()
            },
            AggregateRow {
                student_id: "2".into(),
                ..AggregateRow::default()
            },
        ];
        let sheets = format_for_export(&rows, &roster);
        assert_eq!(sheets.len(), 2);
        assert_ne!(
            sheets[0].sheet_name.to_lowercase(),
            sheets[1].sheet_name.to_lowercase()
        );
        assert!(sheets[1].sheet_name.ends_with(" (2)"));
        assert!(sheets
            .iter()
            .all(|s| s.sheet_name.chars().count() <= SHEET_NAME_MAX_CHARS));
    }
}
