//! Sheet writer that lays an indexed frame out as a labelled data block.
//!
//! Layout (zero-based):
//! - row 0, columns `1..=M`: column names
//! - rows `1..=N`, column 0: index labels
//! - rows `1..=N`, columns `1..=M`: values

use chrono::NaiveDate;
use polars::prelude::{AnyValue, TimeUnit};
use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::conf::{C_DATE_HEADER_PARSE, EnumFmtKey, derive_default_plot_formats};
use crate::spec::{
    EnumCellValue, PlotError, SpecCellFormat, SpecIndexedFrame, SpecSheetWriteOptions,
    SpecXlsxValuePolicy,
};
use crate::util::{cast_col_num, cast_row_num};

/// Excel serial day number of 1970-01-01.
const N_SERIAL_UNIX_EPOCH: f64 = 25_569.0;

/// Planned cell contents of one written data block.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecSheetGrid {
    /// Header cells, one per data column.
    pub header: Vec<EnumCellValue>,
    /// Index label per row.
    pub labels: Vec<EnumCellValue>,
    /// Value cells, row-major.
    pub rows: Vec<Vec<EnumCellValue>>,
}

impl SpecSheetGrid {
    /// `(rows including header, columns including label column)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len() + 1, self.header.len() + 1)
    }
}

/// Plan header/label/value cells for `frame`.
pub fn derive_sheet_grid(
    frame: &SpecIndexedFrame,
    options: &SpecSheetWriteOptions,
) -> Result<SpecSheetGrid, PlotError> {
    let l_colnames = frame.column_names();
    let header = derive_header_cells(&l_colnames);

    let n_height = frame.height();
    let l_cols = frame.data.get_columns();

    let mut labels = Vec::with_capacity(n_height);
    let mut rows = Vec::with_capacity(n_height);
    for n_idx_row in 0..n_height {
        labels.push(derive_cell_value_from_any_value(frame.index.get(n_idx_row)?));

        let mut l_row = Vec::with_capacity(l_cols.len());
        for col in l_cols {
            let value_raw = derive_cell_value_from_any_value(col.get(n_idx_row)?);
            l_row.push(convert_cell_value(
                value_raw,
                options.if_keep_missing_values,
                &options.value_policy,
            ));
        }
        rows.push(l_row);
    }

    Ok(SpecSheetGrid {
        header,
        labels,
        rows,
    })
}

/// Add sheet `sheet_name` and write `frame` into it.
///
/// Fails when the sheet name is already used in `workbook`; other name
/// validation is left to `rust_xlsxwriter`.
pub fn write_frame_to_sheet<'a>(
    frame: &SpecIndexedFrame,
    workbook: &'a mut Workbook,
    sheet_name: &str,
    options: &SpecSheetWriteOptions,
) -> Result<&'a mut Worksheet, PlotError> {
    // Excel sheet names are case-insensitive.
    let c_name_lower = sheet_name.to_lowercase();
    if workbook
        .worksheets()
        .iter()
        .any(|worksheet| worksheet.name().to_lowercase() == c_name_lower)
    {
        return Err(PlotError::SheetNameExists(sheet_name.to_string()));
    }

    let grid = derive_sheet_grid(frame, options)?;
    // Validate bounds before touching the workbook.
    cast_row_num(grid.rows.len())?;
    cast_col_num(grid.header.len())?;

    let dict_fmt = derive_default_plot_formats();
    let derive_fmt = |key: EnumFmtKey| -> Format {
        let spec = dict_fmt
            .get(key.as_str())
            .cloned()
            .unwrap_or_default()
            .merge(&options.base_format_patch);
        derive_rust_xlsx_format(&spec)
    };
    let fmt_label = derive_fmt(EnumFmtKey::Label);
    let fmt_date = derive_fmt(EnumFmtKey::Date);
    let fmt_data = derive_fmt(EnumFmtKey::Data);

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (n_idx_col, value) in grid.header.iter().enumerate() {
        let fmt = if matches!(value, EnumCellValue::Date(_)) {
            &fmt_date
        } else {
            &fmt_label
        };
        write_cell_with_format(worksheet, 0, n_idx_col + 1, value, fmt)?;
    }

    for (n_idx_row, (label, l_values)) in grid.labels.iter().zip(&grid.rows).enumerate() {
        let fmt = if matches!(label, EnumCellValue::Date(_)) {
            &fmt_date
        } else {
            &fmt_label
        };
        write_cell_with_format(worksheet, n_idx_row + 1, 0, label, fmt)?;

        for (n_idx_col, value) in l_values.iter().enumerate() {
            let fmt = if matches!(value, EnumCellValue::Date(_)) {
                &fmt_date
            } else {
                &fmt_data
            };
            write_cell_with_format(worksheet, n_idx_row + 1, n_idx_col + 1, value, fmt)?;
        }
    }

    tracing::debug!(
        sheet_name,
        n_rows = grid.rows.len(),
        n_cols = grid.header.len(),
        "wrote frame to sheet"
    );
    Ok(worksheet)
}

/// Header cells: all dates when every name parses as `YYYY-MM-DD`, else text.
fn derive_header_cells(colnames: &[String]) -> Vec<EnumCellValue> {
    let l_dates: Option<Vec<f64>> = colnames
        .iter()
        .map(|name| {
            NaiveDate::parse_from_str(name.trim(), C_DATE_HEADER_PARSE)
                .ok()
                .map(derive_serial_from_date)
        })
        .collect();

    match l_dates {
        Some(l_serials) if !l_serials.is_empty() => {
            l_serials.into_iter().map(EnumCellValue::Date).collect()
        }
        _ => colnames
            .iter()
            .map(|name| EnumCellValue::String(name.clone()))
            .collect(),
    }
}

fn derive_serial_from_date(date: NaiveDate) -> f64 {
    let n_days = date.signed_duration_since(NaiveDate::default()).num_days();
    n_days as f64 + N_SERIAL_UNIX_EPOCH
}

fn derive_serial_from_datetime(value: i64, unit: TimeUnit) -> f64 {
    let n_per_day = match unit {
        TimeUnit::Nanoseconds => 86_400_000_000_000.0,
        TimeUnit::Microseconds => 86_400_000_000.0,
        TimeUnit::Milliseconds => 86_400_000.0,
    };
    value as f64 / n_per_day + N_SERIAL_UNIX_EPOCH
}

/// Normalize a raw polars value.
///
/// Datetimes become serials of their stored UTC instant; a timezone is ignored.
pub fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => {
            EnumCellValue::String(if val { "True" } else { "False" }.to_string())
        }
        AnyValue::UInt8(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt16(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt32(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int8(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int16(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        AnyValue::Date(n_days) => EnumCellValue::Date(n_days as f64 + N_SERIAL_UNIX_EPOCH),
        AnyValue::Datetime(val, unit, _) => {
            EnumCellValue::Date(derive_serial_from_datetime(val, unit))
        }
        AnyValue::DatetimeOwned(val, unit, _) => {
            EnumCellValue::Date(derive_serial_from_datetime(val, unit))
        }
        _ => EnumCellValue::String(value.to_string()),
    }
}

/// Apply missing/NaN/Inf policy to a normalized value.
pub fn convert_cell_value(
    value: EnumCellValue,
    if_keep_missing_values: bool,
    value_policy: &SpecXlsxValuePolicy,
) -> EnumCellValue {
    match value {
        EnumCellValue::None if if_keep_missing_values => {
            EnumCellValue::String(value_policy.missing_value_str.clone())
        }
        EnumCellValue::Number(n) if !n.is_finite() => {
            if !if_keep_missing_values {
                EnumCellValue::None
            } else if n.is_nan() {
                EnumCellValue::String(value_policy.nan_str.clone())
            } else if n.is_sign_positive() {
                EnumCellValue::String(value_policy.posinf_str.clone())
            } else {
                EnumCellValue::String(value_policy.neginf_str.clone())
            }
        }
        other => other,
    }
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), PlotError> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match value {
        EnumCellValue::None => {
            worksheet.write_blank(n_row, n_col, format)?;
        }
        EnumCellValue::String(val) => {
            worksheet.write_string_with_format(n_row, n_col, val, format)?;
        }
        EnumCellValue::Number(val) | EnumCellValue::Date(val) => {
            worksheet.write_number_with_format(n_row, n_col, *val, format)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }
    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }

    format
}
