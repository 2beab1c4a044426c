use log::{debug, info};

use crate::pipeline::*;

use calamine::{open_workbook, DataType, Reader, Xlsx};

/// Reads the responses of an exported spreadsheet (`.xlsx`) or CSV file.
///
/// The first row holds the question titles and every other row is one
/// response. Empty cells are left out of the response.
pub fn read_responses(path: &Path, worksheet: Option<&str>) -> PipelineResult<Vec<Response>> {
    let extension = path
        .extension()
        .and_then(|x| x.to_str())
        .map(|x| x.to_lowercase());
    let rows = match extension.as_deref() {
        Some("xlsx") => read_xlsx_rows(path, worksheet)?,
        Some("csv") => read_csv_rows(path)?,
        _ => {
            return UnsupportedExportSnafu {
                path: path.display().to_string(),
            }
            .fail()
        }
    };
    let responses = rows_to_responses(rows).context(EmptyExportSnafu {
        path: path.display().to_string(),
    })?;
    info!("Read {} responses from {:?}", responses.len(), path);
    Ok(responses)
}

/// Pairs every row with the header row. Returns `None` without a header.
pub fn rows_to_responses(rows: Vec<Vec<String>>) -> Option<Vec<Response>> {
    let mut iter = rows.into_iter();
    let header = iter.next()?;
    debug!("rows_to_responses: header: {:?}", header);
    let responses = iter
        .map(|row| {
            header
                .iter()
                .zip(row.into_iter())
                .filter(|(title, value)| !title.trim().is_empty() && !value.trim().is_empty())
                .map(|(title, value)| (title.trim().to_string(), value))
                .collect::<Response>()
        })
        .collect();
    Some(responses)
}

/// The text of a cell. Integral numbers are written without a decimal part.
pub fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        DataType::Float(f) => f.to_string(),
        DataType::Bool(b) => b.to_string(),
        DataType::Empty => "".to_string(),
        x => x.to_string(),
    }
}

fn read_xlsx_rows(path: &Path, worksheet: Option<&str>) -> PipelineResult<Vec<Vec<String>>> {
    let p = path.display().to_string();
    debug!("read_xlsx_rows: path: {:?} worksheet: {:?}", p, worksheet);
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path: p.clone() })?;

    let wrange = match worksheet {
        // A worksheet name was provided, use it.
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu {
                name,
                path: p.clone(),
            })?
            .context(OpeningExcelSnafu { path: p.clone() })?,
        None => match workbook.worksheets().into_iter().next() {
            Some((name, wrange)) => {
                debug!("read_xlsx_rows: using worksheet {:?}", name);
                wrange
            }
            None => return EmptyExportSnafu { path: p }.fail(),
        },
    };

    Ok(wrange
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

fn read_csv_rows(path: &Path) -> PipelineResult<Vec<Vec<String>>> {
    let p = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(ReadingCsvSnafu { path: p.clone() })?;
    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.context(ReadingCsvSnafu { path: p.clone() })?;
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }
    Ok(rows)
}
