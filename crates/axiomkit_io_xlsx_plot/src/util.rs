//! Stateless helper utilities used by the plot kernel.

use std::collections::BTreeSet;

use crate::conf::{
    C_SERIES_REFERENCE, N_COL_CHART_LOC_OFFSET, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    N_REFERENCE_PADDING, N_ROW_CHART_LOC_DEFAULT,
};
use crate::spec::{EnumHistogramBins, PlotError, SpecCellRange, SpecScatterPairs};

////////////////////////////////////////////////////////////////////////////////
// #region CellReference

/// Convert zero-based column number to letters (`0 -> A`, `26 -> AA`).
pub fn derive_column_name(col_idx: u16) -> String {
    let mut n_col = col_idx as u32 + 1;
    let mut l_chars = Vec::new();
    while n_col > 0 {
        let n_rem = (n_col - 1) % 26;
        l_chars.push((b'A' + n_rem as u8) as char);
        n_col = (n_col - 1) / 26;
    }
    l_chars.iter().rev().collect()
}

/// Convert zero-based `(row, col)` to an `A1` style reference.
pub fn derive_cell_reference(row_idx: u32, col_idx: u16, if_absolute: bool) -> String {
    let c_dollar = if if_absolute { "$" } else { "" };
    format!(
        "{c_dollar}{}{c_dollar}{}",
        derive_column_name(col_idx),
        row_idx + 1
    )
}

/// Single-quote a sheet name unless it is purely alphanumeric.
pub fn quote_sheet_name(name: &str) -> String {
    if !name.is_empty() && name.chars().all(char::is_alphanumeric) {
        return name.to_string();
    }
    format!("'{}'", name.replace('\'', "''"))
}

/// Build an absolute `=Sheet!$A$1:$A$9` formula for a range.
pub fn derive_range_formula(range: &SpecCellRange) -> String {
    let c_first = derive_cell_reference(range.row_first, range.col_first, true);
    let c_last = derive_cell_reference(range.row_last, range.col_last, true);
    if c_first == c_last {
        return format!("={}!{c_first}", quote_sheet_name(&range.sheet_name));
    }
    format!("={}!{c_first}:{c_last}", quote_sheet_name(&range.sheet_name))
}

/// Resolve chart placement: explicit `loc` verbatim, else beside the data.
pub fn derive_chart_location(
    width_data: usize,
    loc: Option<(u32, u16)>,
) -> Result<(u32, u16), PlotError> {
    if let Some(loc) = loc {
        return Ok(loc);
    }
    Ok((
        N_ROW_CHART_LOC_DEFAULT,
        cast_col_num(width_data + N_COL_CHART_LOC_OFFSET)?,
    ))
}

/// Checked conversion to a worksheet row number.
pub fn cast_row_num(value: usize) -> Result<u32, PlotError> {
    if value >= N_NROWS_EXCEL_MAX {
        return Err(PlotError::IndexOverflow(format!(
            "row index overflow: {value}"
        )));
    }
    u32::try_from(value).map_err(|_| PlotError::IndexOverflow(format!("row index overflow: {value}")))
}

/// Checked conversion to a worksheet column number.
pub fn cast_col_num(value: usize) -> Result<u16, PlotError> {
    if value >= N_NCOLS_EXCEL_MAX {
        return Err(PlotError::IndexOverflow(format!(
            "column index overflow: {value}"
        )));
    }
    u16::try_from(value)
        .map_err(|_| PlotError::IndexOverflow(format!("column index overflow: {value}")))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Sampling

/// `n` evenly spaced values over `[start, stop]`, both ends included.
pub fn derive_linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => {
            let n_step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|idx| {
                    if idx == n - 1 {
                        stop
                    } else {
                        start + n_step * idx as f64
                    }
                })
                .collect()
        }
    }
}

/// Pad `[min, max]` by a fraction of each bound's magnitude.
pub fn derive_reference_bounds(min: f64, max: f64) -> (f64, f64) {
    (
        min - N_REFERENCE_PADDING * min.abs(),
        max + N_REFERENCE_PADDING * max.abs(),
    )
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Histogram

/// Resolve bin edges for `values` (finite values only).
///
/// Equal-width bins span `[min, max]`; an empty input spans `[0, 1]` and a
/// constant input spans `[v - 0.5, v + 0.5]`.
pub fn derive_histogram_edges(
    values: &[f64],
    bins: &EnumHistogramBins,
) -> Result<Vec<f64>, PlotError> {
    match bins {
        EnumHistogramBins::Count(0) => Err(PlotError::InvalidBins(
            "bin count must be >= 1".to_string(),
        )),
        EnumHistogramBins::Count(n_bins) => {
            let (mut n_first, mut n_last) = values
                .iter()
                .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
                    None => Some((v, v)),
                    Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                })
                .unwrap_or((0.0, 1.0));
            if n_first == n_last {
                n_first -= 0.5;
                n_last += 0.5;
            }
            Ok(derive_linspace(n_first, n_last, n_bins + 1))
        }
        EnumHistogramBins::Edges(l_edges) => {
            if l_edges.len() < 2 {
                return Err(PlotError::InvalidBins(
                    "at least two edges are required".to_string(),
                ));
            }
            if l_edges.iter().any(|v| !v.is_finite())
                || l_edges.windows(2).any(|w| w[0] >= w[1])
            {
                return Err(PlotError::InvalidBins(
                    "edges must be finite and strictly increasing".to_string(),
                ));
            }
            Ok(l_edges.clone())
        }
    }
}

/// Count `values` into `edges`; bins are half-open except the last.
///
/// Values outside `[edges[0], edges[last]]` are not counted.
pub fn count_histogram(values: &[f64], edges: &[f64]) -> Vec<u64> {
    let n_bins = edges.len().saturating_sub(1);
    let mut l_counts = vec![0u64; n_bins];
    let (Some(&n_first), Some(&n_last)) = (edges.first(), edges.last()) else {
        return l_counts;
    };
    for &v in values {
        if !(n_first..=n_last).contains(&v) {
            continue;
        }
        let n_idx = if v == n_last {
            n_bins - 1
        } else {
            edges.partition_point(|e| *e <= v) - 1
        };
        l_counts[n_idx] += 1;
    }
    l_counts
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ScatterPairs

/// Pair names in series order: sorted, with the reference series last.
pub fn derive_ordered_pair_names(pairs: &SpecScatterPairs) -> Vec<String> {
    let mut l_names: Vec<String> = pairs
        .keys()
        .filter(|name| name.as_str() != C_SERIES_REFERENCE)
        .cloned()
        .collect();
    if pairs.contains_key(C_SERIES_REFERENCE) {
        l_names.push(C_SERIES_REFERENCE.to_string());
    }
    l_names
}

/// Group y columns by their x column.
///
/// Groups follow first appearance of the x column in pair order; y columns
/// inside a group are sorted and unique.
pub fn group_pairs_by_x(pairs: &SpecScatterPairs) -> Vec<(String, Vec<String>)> {
    let mut l_groups: Vec<(String, Vec<String>)> = Vec::new();
    for name in derive_ordered_pair_names(pairs) {
        let (col_x, col_y) = &pairs[&name];
        match l_groups.iter_mut().find(|(x, _)| x == col_x) {
            Some((_, l_ys)) => {
                if !l_ys.contains(col_y) {
                    l_ys.push(col_y.clone());
                }
            }
            None => l_groups.push((col_x.clone(), vec![col_y.clone()])),
        }
    }
    for (_, l_ys) in &mut l_groups {
        l_ys.sort();
    }
    l_groups
}

/// `name`, or `name_1`, `name_2`, ... for the first variant not in `set_used`.
pub fn derive_unique_name(name: &str, set_used: &BTreeSet<String>) -> String {
    if !set_used.contains(name) {
        return name.to_string();
    }
    (1..)
        .map(|n_suffix| format!("{name}_{n_suffix}"))
        .find(|c_candidate| !set_used.contains(c_candidate))
        .unwrap_or_else(|| name.to_string())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
