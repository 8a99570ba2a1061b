use std::io::Write;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use tracing::debug;

use crate::consts::{
    COL_FOV, COL_I, COL_J, COL_REGION, COL_X_MM, COL_Y_MM, COL_Z_LEVEL, COL_Z_UM,
    REQUIRED_RAW_COLUMNS,
};
use crate::error::{Result, StitchError};

use super::record::{CanonicalCoordinateRecord, CanonicalTable, RawCoordinateRecord};

/// Header of the canonical coordinate CSV.
pub const CANONICAL_COLUMNS: [&str; 6] =
    [COL_REGION, COL_FOV, COL_Z_LEVEL, COL_X_MM, COL_Y_MM, COL_Z_UM];

/// Column positions of the required raw columns inside one CSV header.
struct RawColumns {
    region: usize,
    i: usize,
    j: usize,
    z_level: usize,
    x_mm: usize,
    y_mm: usize,
    z_um: usize,
}

impl RawColumns {
    fn locate(headers: &StringRecord, path: &Path) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h == name);

        let missing: Vec<String> = REQUIRED_RAW_COLUMNS
            .iter()
            .filter(|name| find(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(StitchError::MissingColumns {
                path: path.to_path_buf(),
                columns: missing,
            });
        }

        // All present, checked above.
        let at = |name: &str| find(name).unwrap_or_default();
        Ok(Self {
            region: at(COL_REGION),
            i: at(COL_I),
            j: at(COL_J),
            z_level: at(COL_Z_LEVEL),
            x_mm: at(COL_X_MM),
            y_mm: at(COL_Y_MM),
            z_um: at(COL_Z_UM),
        })
    }
}

/// Read a raw coordinate log.
///
/// Header order is free and unknown columns are ignored. An empty `j` cell
/// reads as 0; every other required cell must hold a value.
pub fn read_raw_table(path: &Path) -> Result<Vec<RawCoordinateRecord>> {
    if !path.is_file() {
        return Err(StitchError::NotFound {
            what: "Coordinates file",
            path: path.to_path_buf(),
        });
    }

    let mut reader = ReaderBuilder::new().trim(Trim::All).from_path(path)?;
    let columns = RawColumns::locate(reader.headers()?, path)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(parse_row(&row, &columns, path)?);
    }

    debug!(path = %path.display(), rows = records.len(), "Read raw coordinates");
    Ok(records)
}

fn parse_row(row: &StringRecord, columns: &RawColumns, path: &Path) -> Result<RawCoordinateRecord> {
    let line = row.position().map(|p| p.line()).unwrap_or_default();
    let cell = |idx: usize| row.get(idx).unwrap_or("");
    let invalid = |column: &'static str, value: &str| StitchError::InvalidValue {
        path: path.to_path_buf(),
        column,
        line,
        value: value.to_string(),
    };

    let index = |column: &'static str, idx: usize| {
        let text = cell(idx);
        parse_index(text).ok_or_else(|| invalid(column, text))
    };
    let float = |column: &'static str, idx: usize| {
        let text = cell(idx);
        text.parse::<f64>().map_err(|_| invalid(column, text))
    };

    let j_text = cell(columns.j);
    let j = if j_text.is_empty() {
        0
    } else {
        parse_index(j_text).ok_or_else(|| invalid(COL_J, j_text))?
    };

    Ok(RawCoordinateRecord {
        region: cell(columns.region).to_string(),
        i: index(COL_I, columns.i)?,
        j,
        z_level: index(COL_Z_LEVEL, columns.z_level)?,
        x_mm: float(COL_X_MM, columns.x_mm)?,
        y_mm: float(COL_Y_MM, columns.y_mm)?,
        z_um: float(COL_Z_UM, columns.z_um)?,
    })
}

/// Parse a non-negative grid index. Float text is truncated toward zero.
fn parse_index(text: &str) -> Option<u32> {
    if let Ok(value) = text.parse::<u32>() {
        return Some(value);
    }
    let value: f64 = text.parse().ok()?;
    if value.is_finite() && value > -1.0 && value < f64::from(u32::MAX) + 1.0 {
        Some(value.trunc() as u32)
    } else {
        None
    }
}

/// Convert raw grid coordinates into row-major FOV numbers.
///
/// `max_j` is taken over the whole table, not per region, so every region of
/// one acquisition shares the same row stride. One output row per input row,
/// in input order.
pub fn normalize(raw: &[RawCoordinateRecord]) -> CanonicalTable {
    let max_j = raw.iter().map(|r| r.j).max().map_or(1, |j| u64::from(j) + 1);

    let records = raw
        .iter()
        .map(|r| CanonicalCoordinateRecord {
            region: r.region.clone(),
            fov: u64::from(r.i) * max_j + u64::from(r.j),
            z_level: r.z_level,
            x_mm: r.x_mm,
            y_mm: r.y_mm,
            z_um: r.z_um,
        })
        .collect();

    CanonicalTable {
        records,
        grid_columns: max_j,
    }
}

/// Write the canonical table as CSV. The header is written even for an empty table.
pub fn write_canonical<W: Write>(table: &CanonicalTable, writer: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(CANONICAL_COLUMNS)?;
    for record in &table.records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a canonical CSV written by [`write_canonical`].
///
/// The grid stride is not stored in the file, so the caller supplies it.
pub fn read_canonical(path: &Path, grid_columns: u64) -> Result<CanonicalTable> {
    if !path.is_file() {
        return Err(StitchError::NotFound {
            what: "Processed coordinates file",
            path: path.to_path_buf(),
        });
    }
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_path(path)?;
    let records = reader
        .deserialize()
        .collect::<std::result::Result<Vec<CanonicalCoordinateRecord>, _>>()?;
    Ok(CanonicalTable {
        records,
        grid_columns,
    })
}
