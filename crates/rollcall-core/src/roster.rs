use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{Data, Range, Reader, Xlsx};
use serde::{Deserialize, Serialize};

use crate::error::RollcallError;
use crate::model::{Lot, Student};

/// Lots and students known to the event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub lots: Vec<Lot>,
    #[serde(default)]
    pub students: Vec<Student>,
}

/// Load a roster from a `.json` file or an `.xlsx` workbook.
///
/// Workbooks need a `Lots` sheet and may have a `Students` sheet. Both use
/// their first row as headers; column order does not matter.
pub fn load_roster(path: &Path) -> Result<Roster, RollcallError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let roster = match ext.as_str() {
        "json" => load_json(path)?,
        "xlsx" => load_xlsx(path)?,
        other => {
            return Err(roster_error(
                path,
                format!("unsupported roster format '{other}', expected .json or .xlsx"),
            ))
        }
    };

    tracing::info!(
        path = %path.display(),
        lots = roster.lots.len(),
        students = roster.students.len(),
        "loaded roster"
    );
    Ok(roster)
}

fn load_json(path: &Path) -> Result<Roster, RollcallError> {
    let file = File::open(path).map_err(|e| roster_error(path, e.to_string()))?;
    let mut roster: Roster = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| roster_error(path, e.to_string()))?;
    roster.lots.retain(|l| !l.name.trim().is_empty());
    roster.students.retain(|s| !s.name.trim().is_empty());
    Ok(roster)
}

fn load_xlsx(path: &Path) -> Result<Roster, RollcallError> {
    let mut workbook: Xlsx<_> =
        calamine::open_workbook(path).map_err(|e| roster_error(path, format!("{e}")))?;

    let lots_sheet = workbook
        .worksheet_range("Lots")
        .map_err(|e| roster_error(path, format!("sheet 'Lots' not found: {e}")))?;
    let lots = lots_from_range(&lots_sheet).map_err(|reason| roster_error(path, reason))?;

    let students = if workbook.sheet_names().iter().any(|n| n == "Students") {
        let sheet = workbook
            .worksheet_range("Students")
            .map_err(|e| roster_error(path, format!("sheet 'Students' unreadable: {e}")))?;
        students_from_range(&sheet).map_err(|reason| roster_error(path, reason))?
    } else {
        Vec::new()
    };

    Ok(Roster { lots, students })
}

fn roster_error(path: &Path, reason: impl Into<String>) -> RollcallError {
    RollcallError::RosterLoad {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Column positions looked up from a header row.
struct Columns {
    headers: Vec<String>,
}

impl Columns {
    fn from_range(range: &Range<Data>) -> Option<Self> {
        let first = range.rows().next()?;
        Some(Columns {
            headers: first
                .iter()
                .map(|c| cell_as_string(c).unwrap_or_default().to_lowercase())
                .collect(),
        })
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn require(&self, name: &str, sheet: &str) -> Result<usize, String> {
        self.find(name)
            .ok_or_else(|| format!("sheet '{sheet}' has no '{name}' column"))
    }
}

fn lots_from_range(range: &Range<Data>) -> Result<Vec<Lot>, String> {
    let Some(cols) = Columns::from_range(range) else {
        return Ok(Vec::new());
    };
    let id = cols.require("id", "Lots")?;
    let name = cols.require("name", "Lots")?;
    let zone = cols.find("zone");

    let mut lots = Vec::new();
    for (i, row) in range.rows().enumerate().skip(1) {
        let Some(lot_name) = row.get(name).and_then(cell_as_string) else {
            continue;
        };
        let lot_id = row
            .get(id)
            .and_then(cell_as_string)
            .unwrap_or_else(|| format!("row-{}", i + 1));
        lots.push(Lot {
            id: lot_id,
            name: lot_name,
            zone: optional_cell(row, zone),
        });
    }
    Ok(lots)
}

fn students_from_range(range: &Range<Data>) -> Result<Vec<Student>, String> {
    let Some(cols) = Columns::from_range(range) else {
        return Ok(Vec::new());
    };
    let id = cols.require("id", "Students")?;
    let name = cols.require("name", "Students")?;
    let instrument = cols.find("instrument");
    let section = cols.find("section");

    let mut students = Vec::new();
    for (i, row) in range.rows().enumerate().skip(1) {
        let Some(student_name) = row.get(name).and_then(cell_as_string) else {
            continue;
        };
        students.push(Student {
            id: row
                .get(id)
                .and_then(cell_as_string)
                .unwrap_or_else(|| format!("row-{}", i + 1)),
            name: student_name,
            instrument: optional_cell(row, instrument),
            section: optional_cell(row, section),
        });
    }
    Ok(students)
}

fn optional_cell(row: &[Data], col: Option<usize>) -> Option<String> {
    col.and_then(|c| row.get(c)).and_then(cell_as_string)
}

fn cell_as_string(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Empty => None,
        _ => Some(format!("{cell}")),
    }
}
