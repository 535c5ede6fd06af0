//! Frame transforms that produce the derived tables charts are drawn from.
//!
//! None of these mutate their input; each returns a new frame.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::{
    AnyValue, BooleanChunked, Column, DataFrame, DataType, NewChunkedArray, PlSmallStr,
    SortMultipleOptions,
};

use crate::conf::{
    C_COL_HISTOGRAM_INDEX, C_COL_REFERENCE_X, C_COL_REFERENCE_Y, C_SERIES_REFERENCE,
};
use crate::spec::{
    EnumHistogramBins, PlotError, SpecIndexedFrame, SpecPlotReport, SpecReferenceCurve,
    SpecScatterPairs,
};
use crate::util::{
    count_histogram, derive_histogram_edges, derive_linspace, derive_reference_bounds,
    derive_unique_name, group_pairs_by_x,
};

////////////////////////////////////////////////////////////////////////////////
// #region ColumnValues

/// Read a column as `f64` values (`None` for nulls).
pub fn derive_f64_values(col: &Column) -> Result<Vec<Option<f64>>, PlotError> {
    let series = col.as_materialized_series().cast(&DataType::Float64)?;
    let ca = series.f64()?;
    Ok(ca.into_iter().collect())
}

/// Finite values of a column, nulls/NaN/Inf dropped.
pub fn derive_finite_values(col: &Column) -> Result<Vec<f64>, PlotError> {
    Ok(derive_f64_values(col)?
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .collect())
}

fn if_any_value_missing(value: &AnyValue<'_>) -> bool {
    match value {
        AnyValue::Null => true,
        AnyValue::Float32(v) => v.is_nan(),
        AnyValue::Float64(v) => v.is_nan(),
        _ => false,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Scatter

/// Combine two columns into a two-column scatter frame.
///
/// Rows where either value is null or NaN are dropped; the surviving rows
/// keep their original positions as index labels.
pub fn derive_scatter_frame_from_columns(
    col_x: &Column,
    col_y: &Column,
    report: &mut SpecPlotReport,
) -> Result<SpecIndexedFrame, PlotError> {
    let c_name_x = if col_x.name().is_empty() {
        "0".to_string()
    } else {
        col_x.name().to_string()
    };
    let mut c_name_y = if col_y.name().is_empty() {
        "1".to_string()
    } else {
        col_y.name().to_string()
    };
    if c_name_y == c_name_x {
        c_name_y = format!("{c_name_y}_1");
    }

    let df = DataFrame::new(vec![
        col_x.clone().with_name(PlSmallStr::from(c_name_x.as_str())),
        col_y.clone().with_name(PlSmallStr::from(c_name_y.as_str())),
    ])?;

    let n_height = df.height();
    let mut l_keep = Vec::with_capacity(n_height);
    let mut l_positions = Vec::with_capacity(n_height);
    for n_idx_row in 0..n_height {
        let if_missing = if_any_value_missing(&col_x.get(n_idx_row)?)
            || if_any_value_missing(&col_y.get(n_idx_row)?);
        l_keep.push(!if_missing);
        if !if_missing {
            l_positions.push(n_idx_row as u64);
        }
    }

    let n_dropped = n_height - l_positions.len();
    let df = if n_dropped > 0 {
        report.warn(format!("Dropped {n_dropped} rows due to missing values"));
        tracing::warn!(n_dropped, "dropped scatter rows with missing values");
        df.filter(&BooleanChunked::from_slice("keep".into(), &l_keep))?
    } else {
        df
    };

    SpecIndexedFrame::new(Column::new("index".into(), l_positions), df)
}

/// Sort each x column group ascending and recombine the groups column-wise.
///
/// Every group keeps its own `(x, y...)` rows together; the index is reset to
/// `0..N`. A column used by more than one group is copied into each, later
/// copies renamed `name_1`, `name_2`, ...; the returned pairs point at the
/// columns of their own group. Columns not referenced by any pair are not
/// carried over.
pub fn derive_sorted_frame_on_x(
    frame: &SpecIndexedFrame,
    pairs: &SpecScatterPairs,
) -> Result<(SpecIndexedFrame, SpecScatterPairs), PlotError> {
    let l_groups = group_pairs_by_x(pairs);
    if l_groups.is_empty() {
        return Ok((
            SpecIndexedFrame::from_dataframe(frame.data.clone()),
            pairs.clone(),
        ));
    }

    let mut set_used: BTreeSet<String> = BTreeSet::new();
    let mut l_cols_out: Vec<Column> = Vec::new();
    let mut pairs_out = SpecScatterPairs::new();
    for (col_x, l_ys) in l_groups {
        let l_cols: Vec<String> = std::iter::once(col_x.clone())
            .chain(l_ys.into_iter().filter(|y| *y != col_x))
            .collect();
        let df_group = frame.data.select(l_cols)?.sort(
            vec![PlSmallStr::from(col_x.as_str())],
            SortMultipleOptions::default().with_nulls_last(true),
        )?;

        let mut dict_rename: BTreeMap<String, String> = BTreeMap::new();
        for col in df_group.get_columns() {
            let c_name = col.name().to_string();
            let c_unique = derive_unique_name(&c_name, &set_used);
            set_used.insert(c_unique.clone());
            l_cols_out.push(col.clone().with_name(PlSmallStr::from(c_unique.as_str())));
            dict_rename.insert(c_name, c_unique);
        }

        let derive_renamed = |name: &String| -> Result<String, PlotError> {
            dict_rename
                .get(name)
                .cloned()
                .ok_or_else(|| PlotError::UnknownColumn(name.clone()))
        };
        for (c_pair, (x, y)) in pairs.iter().filter(|(_, (x, _))| *x == col_x) {
            pairs_out.insert(c_pair.clone(), (derive_renamed(x)?, derive_renamed(y)?));
        }
    }

    Ok((
        SpecIndexedFrame::from_dataframe(DataFrame::new(l_cols_out)?),
        pairs_out,
    ))
}

/// Append the sampled reference curve and its pair.
///
/// Fails before building anything when `refx`/`refy` are existing columns or
/// `pairs` already holds a `Reference` entry.
pub fn derive_frame_with_reference(
    frame: &SpecIndexedFrame,
    pairs: &SpecScatterPairs,
    reference: &SpecReferenceCurve,
) -> Result<(SpecIndexedFrame, SpecScatterPairs), PlotError> {
    let l_colnames = frame.column_names();
    for c_reserved in [C_COL_REFERENCE_X, C_COL_REFERENCE_Y] {
        if l_colnames.iter().any(|name| name == c_reserved) {
            return Err(PlotError::ReferenceNameConflict(c_reserved.to_string()));
        }
    }
    if pairs.contains_key(C_SERIES_REFERENCE) {
        return Err(PlotError::ReferenceNameConflict(
            C_SERIES_REFERENCE.to_string(),
        ));
    }

    let mut n_min = f64::INFINITY;
    let mut n_max = f64::NEG_INFINITY;
    for (col_x, _) in pairs.values() {
        let col = frame
            .data
            .column(col_x)
            .map_err(|_| PlotError::UnknownColumn(col_x.clone()))?;
        for v in derive_finite_values(col)? {
            n_min = n_min.min(v);
            n_max = n_max.max(v);
        }
    }
    if !n_min.is_finite() || !n_max.is_finite() {
        return Err(PlotError::InvalidFrame(
            "reference curve needs at least one finite x value".to_string(),
        ));
    }

    let (n_lo, n_hi) = derive_reference_bounds(n_min, n_max);
    let l_x = derive_linspace(n_lo, n_hi, frame.height());
    let l_y: Vec<f64> = l_x.iter().map(|x| reference.eval(*x)).collect();

    let mut df = frame.data.clone();
    df.with_column(Column::new(C_COL_REFERENCE_X.into(), l_x))?;
    df.with_column(Column::new(C_COL_REFERENCE_Y.into(), l_y))?;

    let mut pairs_out = pairs.clone();
    pairs_out.insert(
        C_SERIES_REFERENCE.to_string(),
        (C_COL_REFERENCE_X.to_string(), C_COL_REFERENCE_Y.to_string()),
    );

    Ok((SpecIndexedFrame::new(frame.index.clone(), df)?, pairs_out))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Histogram

/// Bin every numeric column against one shared edge set.
///
/// The result is indexed by bin lower edge and has one count column per
/// numeric input column. Non-numeric columns are skipped with a warning.
pub fn derive_histogram_frame(
    frame: &SpecIndexedFrame,
    bins: &EnumHistogramBins,
    report: &mut SpecPlotReport,
) -> Result<SpecIndexedFrame, PlotError> {
    let mut l_numeric: Vec<(String, Vec<f64>)> = Vec::new();
    for col in frame.data.get_columns() {
        if !col.dtype().is_numeric() {
            report.warn(format!(
                "Skipped non-numeric column {:?} in histogram",
                col.name().as_str()
            ));
            tracing::warn!(column = col.name().as_str(), "skipped non-numeric histogram column");
            continue;
        }
        l_numeric.push((col.name().to_string(), derive_finite_values(col)?));
    }
    if l_numeric.is_empty() {
        return Err(PlotError::InvalidFrame(
            "histogram needs at least one numeric column".to_string(),
        ));
    }

    let l_all: Vec<f64> = l_numeric
        .iter()
        .flat_map(|(_, l_values)| l_values.iter().copied())
        .collect();
    let l_edges = derive_histogram_edges(&l_all, bins)?;

    let l_cols: Vec<Column> = l_numeric
        .iter()
        .map(|(name, l_values)| {
            Column::new(name.as_str().into(), count_histogram(l_values, &l_edges))
        })
        .collect();
    let index = Column::new(
        C_COL_HISTOGRAM_INDEX.into(),
        l_edges[..l_edges.len() - 1].to_vec(),
    );

    SpecIndexedFrame::new(index, DataFrame::new(l_cols)?)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
