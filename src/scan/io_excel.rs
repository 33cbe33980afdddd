// Primitives for reading the verified values from the Excel workbook.

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};
use std::collections::BTreeMap;

use form_accuracy::alignment::alignment_score;
use form_accuracy::builder::DatasetBuilder;
use form_accuracy::{normalize_identifier, Dataset, FieldValue, Identifier};

use crate::scan::*;

/// Reads the verified values of every form.
///
/// `columns` are the zero-based indexes of the columns to read, in the order of
/// the fields of the form.
pub fn read_ground_truth(
    path: &Path,
    sheets: &[String],
    id_column: usize,
    columns: &[usize],
) -> ScanResult<Dataset> {
    info!("Attempting to read ground truth file {:?}", path);
    read_keyed_rows(path, sheets, id_column, columns, "ground truth")
}

/// Reads the misalignment ratings and computes the alignment score of every
/// form. Forms without any rating have no score.
pub fn read_alignment_scores(
    path: &Path,
    sheets: &[String],
    id_column: usize,
    columns: &[usize],
) -> ScanResult<BTreeMap<Identifier, Option<f64>>> {
    info!("Attempting to read alignment ratings from {:?}", path);
    let rows = read_keyed_rows(path, sheets, id_column, columns, "alignment ratings")?;
    Ok(rows
        .into_iter()
        .map(|(id, cells)| {
            let score = alignment_score(&cells);
            (id, score)
        })
        .collect())
}

fn read_keyed_rows(
    path: &Path,
    sheets: &[String],
    id_column: usize,
    columns: &[usize],
    source: &str,
) -> ScanResult<Dataset> {
    let path_s = path.display().to_string();
    let mut workbook: Xlsx<_> =
        open_workbook(path).context(OpeningExcelSnafu { path: path_s.clone() })?;

    let mut builder: DatasetBuilder<Vec<FieldValue>> = DatasetBuilder::new(source);
    // Duplicates are tracked across all the sheets.
    for sheet in sheets.iter() {
        let wrange = workbook
            .worksheet_range(sheet)
            .context(MissingSheetSnafu {
                sheet: sheet.clone(),
                path: path_s.clone(),
            })?
            .context(OpeningExcelSnafu {
                path: path_s.clone(),
            })?;
        read_sheet_rows(&wrange, sheet, id_column, columns, &mut builder);
    }
    Ok(builder.build())
}

fn read_sheet_rows(
    wrange: &Range<DataType>,
    sheet: &str,
    id_column: usize,
    columns: &[usize],
    builder: &mut DatasetBuilder<Vec<FieldValue>>,
) {
    // The range starts at the first non-empty cell of the sheet.
    let (first_row, first_col) = wrange
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));
    debug!(
        "read_sheet_rows: sheet: {:?} start: {:?} size: {:?}",
        sheet,
        (first_row, first_col),
        wrange.get_size()
    );

    // The first row holds the header.
    for (idx, row) in wrange.rows().enumerate().skip(1) {
        let lineno = first_row + idx + 1;
        let raw_id = cell_at(row, first_col, id_column).and_then(cell_to_string);
        let id = match normalize_identifier(raw_id.as_deref()) {
            Some(id) if !id.is_empty() => id,
            _ => {
                debug!("read_sheet_rows: {} line {}: no client id", sheet, lineno);
                continue;
            }
        };
        let values: Vec<FieldValue> = columns
            .iter()
            .map(|col| cell_at(row, first_col, *col).and_then(cell_to_string))
            .collect();
        debug!(
            "read_sheet_rows: {} line {}: id: {:?} values: {:?}",
            sheet, lineno, id, values
        );
        builder.add(&id, values);
    }
}

// Columns are absolute in the sheet, rows of a range start at its first column.
fn cell_at(row: &[DataType], first_col: usize, col: usize) -> Option<&DataType> {
    col.checked_sub(first_col).and_then(|c| row.get(c))
}

/// The text of a cell, as it would be typed by the person filling the
/// spreadsheet.
pub fn cell_to_string(cell: &DataType) -> Option<String> {
    match cell {
        DataType::String(s) => Some(s.clone()),
        // Numeric cells hold integers (ages, counts, ids).
        DataType::Float(f) => Some((f.trunc() as i64).to_string()),
        DataType::Int(i) => Some(i.to_string()),
        DataType::Bool(b) => Some(b.to_string()),
        DataType::DateTime(serial) => Some(excel_serial_to_date(*serial)),
        DataType::Empty => None,
        _ => {
            debug!("cell_to_string: ignoring cell {:?}", cell);
            None
        }
    }
}

/// Formats an Excel date serial number as day/month/year.
fn excel_serial_to_date(serial: f64) -> String {
    // Serial 0 is 1899-12-30 for every date after February 1900.
    let days = serial.trunc() as i64 - 25569;
    // Days since 1970-01-01 to a civil date.
    let z = days + 719468;
    let era = z.div_euclid(146097);
    let doe = z.rem_euclid(146097);
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    format!("{:02}/{:02}/{}", day, month, year)
}
