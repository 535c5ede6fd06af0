//! Chart-writer facade: write a frame, build a chart over the written cells,
//! and place it on the same sheet.
//!
//! Every renderer is one linear pipeline:
//! plan series -> write frame -> configure chart -> attach series -> insert.
//! Failures from `polars`/`rust_xlsxwriter` are returned unchanged and any
//! partially written sheet is left in the workbook.

use std::collections::BTreeMap;
use std::path::PathBuf;

use polars::prelude::Column;
use rust_xlsxwriter::{
    Chart, ChartFormat, ChartLine, ChartLineDashType, ChartMarker, ChartType, Workbook, Worksheet,
};

use crate::conf::{
    C_SERIES_REFERENCE, C_SERIES_SCATTER_DEFAULT, N_HEIGHT_CHART_BASE, N_SCALE_CHART,
    N_WIDTH_CHART_BASE,
};
use crate::frame::{
    derive_frame_with_reference, derive_histogram_frame, derive_scatter_frame_from_columns,
    derive_sorted_frame_on_x,
};
use crate::spec::{
    EnumChartKind, EnumChartSubtype, EnumSeriesMarker, PlotError, SpecCellRange,
    SpecChartOptions, SpecIndexedFrame, SpecPlotReport, SpecScatterPairs, SpecSeriesPlan,
};
use crate::util::{
    cast_col_num, cast_row_num, derive_chart_location, derive_ordered_pair_names,
    derive_range_formula,
};
use crate::writer::write_frame_to_sheet;

////////////////////////////////////////////////////////////////////////////////
// #region ChartType

/// Resolve the native chart type for `kind` and an optional subtype.
///
/// Line marker/smoothing subtypes have no native line type; they resolve to
/// a plain line chart and are applied per series instead.
pub fn derive_chart_type(
    kind: EnumChartKind,
    subtype: Option<EnumChartSubtype>,
) -> Result<ChartType, PlotError> {
    use EnumChartSubtype as S;

    let chart_type = match (kind, subtype) {
        (EnumChartKind::Bar, None) => ChartType::Bar,
        (EnumChartKind::Bar, Some(S::Stacked)) => ChartType::BarStacked,
        (EnumChartKind::Bar, Some(S::PercentStacked)) => ChartType::BarPercentStacked,

        (EnumChartKind::Column | EnumChartKind::Histogram, None) => ChartType::Column,
        (EnumChartKind::Column | EnumChartKind::Histogram, Some(S::Stacked)) => {
            ChartType::ColumnStacked
        }
        (EnumChartKind::Column | EnumChartKind::Histogram, Some(S::PercentStacked)) => {
            ChartType::ColumnPercentStacked
        }

        (EnumChartKind::Line, Some(S::Stacked)) => ChartType::LineStacked,
        (EnumChartKind::Line, Some(S::PercentStacked)) => ChartType::LinePercentStacked,
        (EnumChartKind::Line, _) => ChartType::Line,

        (EnumChartKind::Scatter, None | Some(S::MarkerOnly)) => ChartType::Scatter,
        (EnumChartKind::Scatter, Some(S::Straight)) => ChartType::ScatterStraight,
        (EnumChartKind::Scatter, Some(S::StraightWithMarkers)) => {
            ChartType::ScatterStraightWithMarkers
        }
        (EnumChartKind::Scatter, Some(S::Smooth)) => ChartType::ScatterSmooth,
        (EnumChartKind::Scatter, Some(S::SmoothWithMarkers)) => {
            ChartType::ScatterSmoothWithMarkers
        }

        (kind, Some(subtype)) => return Err(PlotError::UnsupportedSubtype { kind, subtype }),
    };
    Ok(chart_type)
}

/// Patch a line series to emulate marker/smoothing subtypes.
pub fn apply_line_subtype(plan: &mut SpecSeriesPlan, subtype: EnumChartSubtype) {
    let c_subtype = subtype.as_str();
    if c_subtype.contains("marker") {
        plan.marker = EnumSeriesMarker::Automatic;
    }
    if c_subtype.contains("smooth") {
        plan.if_smooth = true;
    }
    if subtype == EnumChartSubtype::MarkerOnly {
        plan.if_hide_line = true;
    }
}

/// Scatter options with axis titles defaulted from a single pair.
///
/// Explicit titles are kept; with several pairs nothing is filled in.
pub fn derive_scatter_options(
    options: &SpecChartOptions,
    pairs: &SpecScatterPairs,
) -> SpecChartOptions {
    let mut options = options.clone();
    if pairs.len() == 1
        && let Some((col_x, col_y)) = pairs.values().next()
    {
        options.x_title.get_or_insert_with(|| col_x.clone());
        options.y_title.get_or_insert_with(|| col_y.clone());
    }
    options
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SeriesPlanning

fn derive_data_row_bounds(height: usize) -> Result<(u32, u32), PlotError> {
    // An empty frame still gets a one-cell range so the chart stays valid.
    Ok((1, cast_row_num(usize::max(height, 1))?))
}

/// One series per column: categories are the index labels, values the column.
pub fn plan_category_series(
    frame: &SpecIndexedFrame,
    sheet_name: &str,
    options: &SpecChartOptions,
    report: &mut SpecPlotReport,
) -> Result<Vec<SpecSeriesPlan>, PlotError> {
    let l_colnames = frame.column_names();
    for name in &options.secondary_y {
        if !l_colnames.contains(name) {
            report.warn(format!("secondary_y column not found: {name:?}"));
        }
    }

    let (n_row_first, n_row_last) = derive_data_row_bounds(frame.height())?;
    let mut l_series = Vec::with_capacity(l_colnames.len());
    for (n_idx, c_name) in l_colnames.iter().enumerate() {
        let n_col = cast_col_num(n_idx + 1)?;
        let header = SpecCellRange {
            sheet_name: sheet_name.to_string(),
            row_first: 0,
            col_first: n_col,
            row_last: 0,
            col_last: n_col,
        };
        l_series.push(SpecSeriesPlan {
            name: derive_range_formula(&header),
            categories: SpecCellRange {
                sheet_name: sheet_name.to_string(),
                row_first: n_row_first,
                col_first: 0,
                row_last: n_row_last,
                col_last: 0,
            },
            values: SpecCellRange {
                sheet_name: sheet_name.to_string(),
                row_first: n_row_first,
                col_first: n_col,
                row_last: n_row_last,
                col_last: n_col,
            },
            if_secondary_axis: options.secondary_y.contains(c_name),
            gap: options.gap,
            marker: EnumSeriesMarker::Default,
            if_smooth: false,
            if_hide_line: false,
            if_solid_line: false,
        });
    }
    Ok(l_series)
}

/// One series per pair, in pair order, with the reference series styled.
pub fn plan_scatter_series(
    frame: &SpecIndexedFrame,
    pairs: &SpecScatterPairs,
    sheet_name: &str,
) -> Result<Vec<SpecSeriesPlan>, PlotError> {
    let dict_name_to_col: BTreeMap<String, u16> = frame
        .column_names()
        .into_iter()
        .enumerate()
        .map(|(n_idx, name)| -> Result<(String, u16), PlotError> {
            Ok((name, cast_col_num(n_idx + 1)?))
        })
        .collect::<Result<_, _>>()?;
    let derive_col = |name: &str| -> Result<u16, PlotError> {
        dict_name_to_col
            .get(name)
            .copied()
            .ok_or_else(|| PlotError::UnknownColumn(name.to_string()))
    };

    let (n_row_first, n_row_last) = derive_data_row_bounds(frame.height())?;
    let derive_range = |n_col: u16| SpecCellRange {
        sheet_name: sheet_name.to_string(),
        row_first: n_row_first,
        col_first: n_col,
        row_last: n_row_last,
        col_last: n_col,
    };

    let mut l_series = Vec::with_capacity(pairs.len());
    for c_name in derive_ordered_pair_names(pairs) {
        let (col_x, col_y) = &pairs[&c_name];
        let if_reference = c_name == C_SERIES_REFERENCE;
        l_series.push(SpecSeriesPlan {
            categories: derive_range(derive_col(col_x)?),
            values: derive_range(derive_col(col_y)?),
            name: c_name,
            if_secondary_axis: false,
            gap: None,
            marker: if if_reference {
                EnumSeriesMarker::None
            } else {
                EnumSeriesMarker::Default
            },
            if_smooth: if_reference,
            if_hide_line: false,
            if_solid_line: if_reference,
        });
    }
    Ok(l_series)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ChartAssembly

fn derive_range_tuple(range: &SpecCellRange) -> (&str, u32, u16, u32, u16) {
    (
        range.sheet_name.as_str(),
        range.row_first,
        range.col_first,
        range.row_last,
        range.col_last,
    )
}

fn add_series_from_plan(chart: &mut Chart, plan: &SpecSeriesPlan) {
    let series = chart
        .add_series()
        .set_name(plan.name.as_str())
        .set_categories(derive_range_tuple(&plan.categories))
        .set_values(derive_range_tuple(&plan.values));

    if plan.if_secondary_axis {
        series.set_secondary_axis(true);
    }
    if let Some(n_gap) = plan.gap {
        series.set_gap(n_gap);
    }
    match plan.marker {
        EnumSeriesMarker::Default => {}
        EnumSeriesMarker::Automatic => {
            series.set_marker(ChartMarker::new().set_automatic());
        }
        EnumSeriesMarker::None => {
            series.set_marker(ChartMarker::new().set_none());
        }
    }
    if plan.if_smooth {
        series.set_smooth(true);
    }
    if plan.if_hide_line {
        series.set_format(ChartFormat::new().set_no_line());
    } else if plan.if_solid_line {
        series.set_format(
            ChartFormat::new().set_line(ChartLine::new().set_dash_type(ChartLineDashType::Solid)),
        );
    }
}

fn configure_chart(chart: &mut Chart, options: &SpecChartOptions) {
    if let Some(title) = &options.title {
        chart.title().set_name(title);
    }
    if let Some(title) = &options.x_title {
        chart.x_axis().set_name(title);
    }
    if let Some((n_min, n_max)) = options.x_lim {
        chart.x_axis().set_min(n_min).set_max(n_max);
    }
    if let Some(title) = &options.y_title {
        chart.y_axis().set_name(title);
    }
    if let Some((n_min, n_max)) = options.y_lim {
        chart.y_axis().set_min(n_min).set_max(n_max);
    }
}

#[allow(clippy::too_many_arguments)]
fn render_chart<'a>(
    frame: &SpecIndexedFrame,
    workbook: &'a mut Workbook,
    sheet_name: &str,
    kind: EnumChartKind,
    chart_type: ChartType,
    l_series: Vec<SpecSeriesPlan>,
    options: &SpecChartOptions,
    report: &mut SpecPlotReport,
) -> Result<&'a mut Worksheet, PlotError> {
    let loc = derive_chart_location(frame.width(), options.loc)?;
    let worksheet = write_frame_to_sheet(frame, workbook, sheet_name, &options.sheet)?;

    let mut chart = Chart::new(chart_type);
    configure_chart(&mut chart, options);
    for plan in &l_series {
        add_series_from_plan(&mut chart, plan);
    }
    if let Some(n_style) = options.style {
        chart.set_style(n_style);
    }
    chart
        .set_width((N_WIDTH_CHART_BASE as f64 * N_SCALE_CHART) as u32)
        .set_height((N_HEIGHT_CHART_BASE as f64 * N_SCALE_CHART) as u32);

    worksheet.insert_chart(loc.0, loc.1, &chart)?;

    tracing::debug!(
        sheet_name,
        chart = kind.as_str(),
        n_series = l_series.len(),
        row = loc.0,
        col = loc.1,
        "placed chart"
    );

    report.sheet_name = sheet_name.to_string();
    report.chart_kind = Some(kind);
    report.title = options.title.clone();
    report.x_title = options.x_title.clone();
    report.y_title = options.y_title.clone();
    report.x_lim = options.x_lim;
    report.y_lim = options.y_lim;
    report.shape_written = (frame.height() + 1, frame.width() + 1);
    report.series = l_series;
    report.loc = loc;
    Ok(worksheet)
}

fn render_category_chart<'a>(
    frame: &SpecIndexedFrame,
    workbook: &'a mut Workbook,
    sheet_name: &str,
    kind: EnumChartKind,
    options: &SpecChartOptions,
    report: &mut SpecPlotReport,
) -> Result<&'a mut Worksheet, PlotError> {
    let chart_type = derive_chart_type(kind, options.subtype)?;
    let mut l_series = plan_category_series(frame, sheet_name, options, report)?;
    if kind == EnumChartKind::Line
        && let Some(subtype) = options.subtype
    {
        for plan in &mut l_series {
            apply_line_subtype(plan, subtype);
        }
    }
    render_chart(
        frame, workbook, sheet_name, kind, chart_type, l_series, options, report,
    )
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Renderers

/// Bar chart of every column against the index labels.
pub fn plot_bar_chart<'a>(
    frame: &SpecIndexedFrame,
    workbook: &'a mut Workbook,
    sheet_name: &str,
    options: &SpecChartOptions,
    report: &mut SpecPlotReport,
) -> Result<&'a mut Worksheet, PlotError> {
    render_category_chart(frame, workbook, sheet_name, EnumChartKind::Bar, options, report)
}

/// Column chart of every column against the index labels.
pub fn plot_column_chart<'a>(
    frame: &SpecIndexedFrame,
    workbook: &'a mut Workbook,
    sheet_name: &str,
    options: &SpecChartOptions,
    report: &mut SpecPlotReport,
) -> Result<&'a mut Worksheet, PlotError> {
    render_category_chart(
        frame,
        workbook,
        sheet_name,
        EnumChartKind::Column,
        options,
        report,
    )
}

/// Line chart of every column against the index labels.
///
/// `marker_only`, `straight_with_markers`, `straight`, `smooth_with_markers`
/// and `smooth` are applied to each series.
pub fn plot_line_chart<'a>(
    frame: &SpecIndexedFrame,
    workbook: &'a mut Workbook,
    sheet_name: &str,
    options: &SpecChartOptions,
    report: &mut SpecPlotReport,
) -> Result<&'a mut Worksheet, PlotError> {
    render_category_chart(frame, workbook, sheet_name, EnumChartKind::Line, options, report)
}

/// Scatter chart of column pairs.
///
/// With `pairs == None` the frame must be exactly two columns wide and is
/// plotted as one `data` pair. A single pair fills in missing axis titles
/// with its column names.
pub fn plot_scatter_chart<'a>(
    frame: &SpecIndexedFrame,
    pairs: Option<&SpecScatterPairs>,
    workbook: &'a mut Workbook,
    sheet_name: &str,
    options: &SpecChartOptions,
    report: &mut SpecPlotReport,
) -> Result<&'a mut Worksheet, PlotError> {
    let mut pairs = match pairs {
        Some(pairs) => pairs.clone(),
        None => {
            let l_colnames = frame.column_names();
            let [col_x, col_y] = l_colnames.as_slice() else {
                return Err(PlotError::AmbiguousScatterPairs(l_colnames.len()));
            };
            BTreeMap::from([(
                C_SERIES_SCATTER_DEFAULT.to_string(),
                (col_x.clone(), col_y.clone()),
            )])
        }
    };

    let options = derive_scatter_options(options, &pairs);
    let chart_type = derive_chart_type(EnumChartKind::Scatter, options.subtype)?;

    let mut frame_plot = if options.if_sort_on_x {
        let (frame_sorted, pairs_sorted) = derive_sorted_frame_on_x(frame, &pairs)?;
        pairs = pairs_sorted;
        frame_sorted
    } else {
        frame.clone()
    };
    if let Some(reference) = &options.reference {
        (frame_plot, pairs) = derive_frame_with_reference(&frame_plot, &pairs, reference)?;
    }

    let l_series = plan_scatter_series(&frame_plot, &pairs, sheet_name)?;
    render_chart(
        &frame_plot,
        workbook,
        sheet_name,
        EnumChartKind::Scatter,
        chart_type,
        l_series,
        &options,
        report,
    )
}

/// Scatter chart of two columns compared row by row.
///
/// Rows with a missing value on either side are dropped and counted in the
/// report warnings.
pub fn plot_scatter_series<'a>(
    col_x: &Column,
    col_y: &Column,
    workbook: &'a mut Workbook,
    sheet_name: &str,
    options: &SpecChartOptions,
    report: &mut SpecPlotReport,
) -> Result<&'a mut Worksheet, PlotError> {
    let frame = derive_scatter_frame_from_columns(col_x, col_y, report)?;
    plot_scatter_chart(&frame, None, workbook, sheet_name, options, report)
}

/// Histogram of every numeric column over one shared set of bin edges.
///
/// Rendered as a column chart with no gap between bins; `options.gap` is
/// ignored.
pub fn plot_histogram<'a>(
    frame: &SpecIndexedFrame,
    workbook: &'a mut Workbook,
    sheet_name: &str,
    options: &SpecChartOptions,
    report: &mut SpecPlotReport,
) -> Result<&'a mut Worksheet, PlotError> {
    let bins = options.bins.clone().unwrap_or_default();
    let frame_hist = derive_histogram_frame(frame, &bins, report)?;

    let options = SpecChartOptions {
        gap: Some(0),
        ..options.clone()
    };
    render_category_chart(
        &frame_hist,
        workbook,
        sheet_name,
        EnumChartKind::Histogram,
        &options,
        report,
    )
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Writer

/// Stateful workbook owner exposing the renderers.
///
/// The workbook is buffered in memory until [`Self::close`] is called.
pub struct XlsxPlotWriter {
    path_file_out: PathBuf,
    workbook: Workbook,
    l_reports: Vec<SpecPlotReport>,
    if_closed: bool,
}

impl XlsxPlotWriter {
    /// Create writer bound to output path.
    pub fn new(path_file_out: PathBuf) -> Self {
        Self {
            path_file_out,
            workbook: Workbook::new(),
            l_reports: Vec::new(),
            if_closed: false,
        }
    }

    /// Return output file path as string.
    pub fn file_out(&self) -> String {
        self.path_file_out.to_string_lossy().to_string()
    }

    /// Return immutable snapshot of per-call plot reports.
    pub fn report(&self) -> Vec<SpecPlotReport> {
        self.l_reports.clone()
    }

    /// Borrow the underlying workbook, e.g. to add sheets of its own.
    pub fn workbook_mut(&mut self) -> Result<&mut Workbook, PlotError> {
        if self.if_closed {
            return Err(PlotError::WriterClosed);
        }
        Ok(&mut self.workbook)
    }

    /// Flush workbook to disk. Idempotent.
    pub fn close(&mut self) -> Result<(), PlotError> {
        if self.if_closed {
            return Ok(());
        }
        self.workbook.save(&self.path_file_out)?;
        self.if_closed = true;
        Ok(())
    }

    /// See [`plot_bar_chart`].
    pub fn plot_bar_chart(
        &mut self,
        frame: &SpecIndexedFrame,
        sheet_name: &str,
        options: &SpecChartOptions,
    ) -> Result<SpecPlotReport, PlotError> {
        let mut report = SpecPlotReport::default();
        plot_bar_chart(frame, self.workbook_mut()?, sheet_name, options, &mut report)?;
        Ok(self.push_report(report))
    }

    /// See [`plot_column_chart`].
    pub fn plot_column_chart(
        &mut self,
        frame: &SpecIndexedFrame,
        sheet_name: &str,
        options: &SpecChartOptions,
    ) -> Result<SpecPlotReport, PlotError> {
        let mut report = SpecPlotReport::default();
        plot_column_chart(frame, self.workbook_mut()?, sheet_name, options, &mut report)?;
        Ok(self.push_report(report))
    }

    /// See [`plot_line_chart`].
    pub fn plot_line_chart(
        &mut self,
        frame: &SpecIndexedFrame,
        sheet_name: &str,
        options: &SpecChartOptions,
    ) -> Result<SpecPlotReport, PlotError> {
        let mut report = SpecPlotReport::default();
        plot_line_chart(frame, self.workbook_mut()?, sheet_name, options, &mut report)?;
        Ok(self.push_report(report))
    }

    /// See [`plot_scatter_chart`].
    pub fn plot_scatter_chart(
        &mut self,
        frame: &SpecIndexedFrame,
        pairs: Option<&SpecScatterPairs>,
        sheet_name: &str,
        options: &SpecChartOptions,
    ) -> Result<SpecPlotReport, PlotError> {
        let mut report = SpecPlotReport::default();
        plot_scatter_chart(
            frame,
            pairs,
            self.workbook_mut()?,
            sheet_name,
            options,
            &mut report,
        )?;
        Ok(self.push_report(report))
    }

    /// See [`plot_scatter_series`].
    pub fn plot_scatter_series(
        &mut self,
        col_x: &Column,
        col_y: &Column,
        sheet_name: &str,
        options: &SpecChartOptions,
    ) -> Result<SpecPlotReport, PlotError> {
        let mut report = SpecPlotReport::default();
        plot_scatter_series(
            col_x,
            col_y,
            self.workbook_mut()?,
            sheet_name,
            options,
            &mut report,
        )?;
        Ok(self.push_report(report))
    }

    /// See [`plot_histogram`].
    pub fn plot_histogram(
        &mut self,
        frame: &SpecIndexedFrame,
        sheet_name: &str,
        options: &SpecChartOptions,
    ) -> Result<SpecPlotReport, PlotError> {
        let mut report = SpecPlotReport::default();
        plot_histogram(frame, self.workbook_mut()?, sheet_name, options, &mut report)?;
        Ok(self.push_report(report))
    }

    fn push_report(&mut self, report: SpecPlotReport) -> SpecPlotReport {
        self.l_reports.push(report.clone());
        report
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    use polars::prelude::*;

    use super::*;
    use crate::spec::SpecReferenceCurve;

    struct TestDir {
        path: PathBuf,
    }

    impl TestDir {
        fn new() -> Self {
            let n = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos();
            let path = std::env::temp_dir().join(format!("axiomkit_xlsx_plot_test_{n}"));
            std::fs::create_dir_all(&path).expect("create test dir");
            Self { path }
        }

        fn path(&self) -> &Path {
            &self.path
        }
    }

    impl Drop for TestDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }

    fn frame_sales() -> SpecIndexedFrame {
        let df = DataFrame::new(vec![
            Column::new("region".into(), ["north", "south", "east"]),
            Column::new("q1".into(), [10.0, 20.0, 30.0]),
            Column::new("q2".into(), [12.0, 18.0, 33.0]),
        ])
        .unwrap();
        SpecIndexedFrame::with_index_column(df, "region").unwrap()
    }

    fn frame_xy() -> SpecIndexedFrame {
        let df = DataFrame::new(vec![
            Column::new("x".into(), [3.0, 1.0, 2.0, 4.0]),
            Column::new("y".into(), [9.0, 1.0, 4.0, 16.0]),
        ])
        .unwrap();
        SpecIndexedFrame::from_dataframe(df)
    }

    #[test]
    fn test_chart_type_resolution() {
        assert!(matches!(
            derive_chart_type(EnumChartKind::Bar, Some(EnumChartSubtype::Stacked)),
            Ok(ChartType::BarStacked)
        ));
        assert!(matches!(
            derive_chart_type(EnumChartKind::Histogram, None),
            Ok(ChartType::Column)
        ));
        assert!(matches!(
            derive_chart_type(EnumChartKind::Line, Some(EnumChartSubtype::SmoothWithMarkers)),
            Ok(ChartType::Line)
        ));
        assert!(matches!(
            derive_chart_type(EnumChartKind::Scatter, Some(EnumChartSubtype::Smooth)),
            Ok(ChartType::ScatterSmooth)
        ));
        assert!(matches!(
            derive_chart_type(EnumChartKind::Column, Some(EnumChartSubtype::Smooth)),
            Err(PlotError::UnsupportedSubtype { .. })
        ));
        assert!(matches!(
            derive_chart_type(EnumChartKind::Scatter, Some(EnumChartSubtype::Stacked)),
            Err(PlotError::UnsupportedSubtype { .. })
        ));
    }

    #[test]
    fn test_line_subtype_emulation() {
        let frame = frame_sales();
        let mut report = SpecPlotReport::default();
        let mut l_series =
            plan_category_series(&frame, "s", &SpecChartOptions::default(), &mut report).unwrap();

        apply_line_subtype(&mut l_series[0], EnumChartSubtype::MarkerOnly);
        assert_eq!(l_series[0].marker, EnumSeriesMarker::Automatic);
        assert!(l_series[0].if_hide_line);
        assert!(!l_series[0].if_smooth);

        apply_line_subtype(&mut l_series[1], EnumChartSubtype::Smooth);
        assert_eq!(l_series[1].marker, EnumSeriesMarker::Default);
        assert!(l_series[1].if_smooth);
        assert!(!l_series[1].if_hide_line);
    }

    #[test]
    fn test_bar_chart_series_ranges_and_default_location() {
        let mut workbook = Workbook::new();
        let mut report = SpecPlotReport::default();
        let options = SpecChartOptions {
            title: Some("Sales".to_string()),
            secondary_y: ["q2".to_string()].into_iter().collect(),
            gap: Some(50),
            style: Some(42),
            ..Default::default()
        };

        plot_bar_chart(&frame_sales(), &mut workbook, "sales data", &options, &mut report)
            .unwrap();

        assert_eq!(report.chart_kind, Some(EnumChartKind::Bar));
        assert_eq!(report.shape_written, (4, 3));
        assert_eq!(report.loc, (2, 5));
        assert_eq!(report.series.len(), 2);

        let series_q1 = &report.series[0];
        assert_eq!(series_q1.name, "='sales data'!$B$1");
        assert_eq!(
            derive_range_formula(&series_q1.categories),
            "='sales data'!$A$2:$A$4"
        );
        assert_eq!(
            derive_range_formula(&series_q1.values),
            "='sales data'!$B$2:$B$4"
        );
        assert!(!series_q1.if_secondary_axis);
        assert!(report.series[1].if_secondary_axis);
        assert_eq!(series_q1.gap, Some(50));

        assert!(workbook.save_to_buffer().is_ok());
    }

    #[test]
    fn test_explicit_location_is_used_verbatim() {
        let mut workbook = Workbook::new();
        let mut report = SpecPlotReport::default();
        let options = SpecChartOptions {
            loc: Some((20, 1)),
            ..Default::default()
        };
        plot_column_chart(&frame_sales(), &mut workbook, "cols", &options, &mut report).unwrap();
        assert_eq!(report.loc, (20, 1));
    }

    #[test]
    fn test_line_chart_applies_subtype_to_every_series() {
        let mut workbook = Workbook::new();
        let mut report = SpecPlotReport::default();
        let options = SpecChartOptions {
            subtype: Some(EnumChartSubtype::SmoothWithMarkers),
            ..Default::default()
        };
        plot_line_chart(&frame_sales(), &mut workbook, "lines", &options, &mut report).unwrap();
        assert!(report.series.iter().all(|s| s.if_smooth
            && s.marker == EnumSeriesMarker::Automatic
            && !s.if_hide_line));
        assert!(workbook.save_to_buffer().is_ok());
    }

    #[test]
    fn test_unsupported_subtype_writes_nothing() {
        let mut workbook = Workbook::new();
        let mut report = SpecPlotReport::default();
        let options = SpecChartOptions {
            subtype: Some(EnumChartSubtype::MarkerOnly),
            ..Default::default()
        };
        let res = plot_bar_chart(&frame_sales(), &mut workbook, "bars", &options, &mut report);
        assert!(matches!(res, Err(PlotError::UnsupportedSubtype { .. })));
        assert!(workbook.worksheet_from_name("bars").is_err());
    }

    #[test]
    fn test_scatter_single_pair_defaults_axis_titles() {
        let mut workbook = Workbook::new();
        let mut report = SpecPlotReport::default();
        plot_scatter_chart(
            &frame_xy(),
            None,
            &mut workbook,
            "xy",
            &SpecChartOptions::default(),
            &mut report,
        )
        .unwrap();

        assert_eq!(report.x_title.as_deref(), Some("x"));
        assert_eq!(report.y_title.as_deref(), Some("y"));
        assert_eq!(report.series.len(), 1);
        assert_eq!(report.series[0].name, "data");
        assert_eq!(derive_range_formula(&report.series[0].categories), "=xy!$B$2:$B$5");
        assert_eq!(derive_range_formula(&report.series[0].values), "=xy!$C$2:$C$5");
        assert!(workbook.save_to_buffer().is_ok());
    }

    #[test]
    fn test_scatter_options_keep_explicit_titles() {
        let one: SpecScatterPairs =
            BTreeMap::from([("a".to_string(), ("x".to_string(), "y".to_string()))]);
        let options = SpecChartOptions {
            x_title: Some("Height".to_string()),
            ..Default::default()
        };
        let resolved = derive_scatter_options(&options, &one);
        assert_eq!(resolved.x_title.as_deref(), Some("Height"));
        assert_eq!(resolved.y_title.as_deref(), Some("y"));

        let two: SpecScatterPairs = BTreeMap::from([
            ("a".to_string(), ("x".to_string(), "y".to_string())),
            ("b".to_string(), ("t".to_string(), "z".to_string())),
        ]);
        let resolved = derive_scatter_options(&SpecChartOptions::default(), &two);
        assert_eq!(resolved.x_title, None);
        assert_eq!(resolved.y_title, None);
    }

    #[test]
    fn test_chart_titles_and_limits_are_reported() {
        let mut workbook = Workbook::new();
        let mut report = SpecPlotReport::default();
        let options = SpecChartOptions {
            title: Some("Growth".to_string()),
            x_title: Some("Region".to_string()),
            y_title: Some("Sales".to_string()),
            y_lim: Some((0.0, 40.0)),
            ..Default::default()
        };
        plot_line_chart(&frame_sales(), &mut workbook, "growth", &options, &mut report).unwrap();

        assert_eq!(report.title.as_deref(), Some("Growth"));
        assert_eq!(report.x_title.as_deref(), Some("Region"));
        assert_eq!(report.y_title.as_deref(), Some("Sales"));
        assert_eq!(report.x_lim, None);
        assert_eq!(report.y_lim, Some((0.0, 40.0)));
        assert!(workbook.save_to_buffer().is_ok());
    }

    #[test]
    fn test_scatter_sort_on_x_with_shared_column_renders() {
        let df = DataFrame::new(vec![
            Column::new("x".into(), [3.0, 1.0, 2.0]),
            Column::new("y".into(), [30.0, 10.0, 20.0]),
            Column::new("z".into(), [7.0, 5.0, 6.0]),
        ])
        .unwrap();
        let pairs: SpecScatterPairs = BTreeMap::from([
            ("a".to_string(), ("x".to_string(), "y".to_string())),
            ("b".to_string(), ("y".to_string(), "z".to_string())),
        ]);
        let options = SpecChartOptions {
            if_sort_on_x: true,
            ..Default::default()
        };
        let mut workbook = Workbook::new();
        let mut report = SpecPlotReport::default();

        plot_scatter_chart(
            &SpecIndexedFrame::from_dataframe(df),
            Some(&pairs),
            &mut workbook,
            "shared",
            &options,
            &mut report,
        )
        .unwrap();

        // x, y, y_1, z
        assert_eq!(report.shape_written, (4, 5));
        assert_eq!(derive_range_formula(&report.series[1].categories), "=shared!$D$2:$D$4");
        assert_eq!(derive_range_formula(&report.series[1].values), "=shared!$E$2:$E$4");
        assert!(workbook.save_to_buffer().is_ok());
    }

    #[test]
    fn test_scatter_without_pairs_needs_two_columns() {
        let df = DataFrame::new(vec![
            Column::new("a".into(), [1.0]),
            Column::new("b".into(), [1.0]),
            Column::new("c".into(), [1.0]),
        ])
        .unwrap();
        let mut workbook = Workbook::new();
        let mut report = SpecPlotReport::default();
        let res = plot_scatter_chart(
            &SpecIndexedFrame::from_dataframe(df),
            None,
            &mut workbook,
            "xy",
            &SpecChartOptions::default(),
            &mut report,
        );
        assert!(matches!(res, Err(PlotError::AmbiguousScatterPairs(3))));
    }

    #[test]
    fn test_scatter_reference_series_is_last_and_styled() {
        let mut workbook = Workbook::new();
        let mut report = SpecPlotReport::default();
        let pairs: SpecScatterPairs =
            BTreeMap::from([("squares".to_string(), ("x".to_string(), "y".to_string()))]);
        let options = SpecChartOptions {
            if_sort_on_x: true,
            reference: Some(SpecReferenceCurve::new(|x| x * x)),
            ..Default::default()
        };

        plot_scatter_chart(
            &frame_xy(),
            Some(&pairs),
            &mut workbook,
            "fit",
            &options,
            &mut report,
        )
        .unwrap();

        assert_eq!(report.series.len(), 2);
        let reference = &report.series[1];
        assert_eq!(reference.name, "Reference");
        assert_eq!(reference.marker, EnumSeriesMarker::None);
        assert!(reference.if_smooth && reference.if_solid_line);
        assert_eq!(derive_range_formula(&reference.categories), "=fit!$D$2:$D$5");
        assert_eq!(derive_range_formula(&reference.values), "=fit!$E$2:$E$5");
        // x, y, refx, refy written: chart goes 3 columns past them.
        assert_eq!(report.loc, (2, 7));
        assert!(workbook.save_to_buffer().is_ok());
    }

    #[test]
    fn test_scatter_reference_conflict_is_fatal() {
        let mut workbook = Workbook::new();
        let mut report = SpecPlotReport::default();
        let pairs: SpecScatterPairs =
            BTreeMap::from([("Reference".to_string(), ("x".to_string(), "y".to_string()))]);
        let options = SpecChartOptions {
            reference: Some(SpecReferenceCurve::new(|x| x)),
            ..Default::default()
        };
        let res = plot_scatter_chart(
            &frame_xy(),
            Some(&pairs),
            &mut workbook,
            "fit",
            &options,
            &mut report,
        );
        assert!(matches!(res, Err(PlotError::ReferenceNameConflict(_))));
    }

    #[test]
    fn test_scatter_series_reports_dropped_rows() {
        let col_x = Column::new("height".into(), [Some(1.0), None, Some(3.0)]);
        let col_y = Column::new("weight".into(), [Some(2.0), Some(4.0), Some(6.0)]);
        let mut workbook = Workbook::new();
        let mut report = SpecPlotReport::default();

        plot_scatter_series(
            &col_x,
            &col_y,
            &mut workbook,
            "hw",
            &SpecChartOptions::default(),
            &mut report,
        )
        .unwrap();

        assert_eq!(report.warnings, vec!["Dropped 1 rows due to missing values"]);
        assert_eq!(report.shape_written, (3, 3));
    }

    #[test]
    fn test_histogram_renders_zero_gap_columns() {
        let df = DataFrame::new(vec![
            Column::new("a".into(), [1.0, 2.0, 3.0, 4.0]),
            Column::new("b".into(), [2.0, 2.5, 3.5, 5.0]),
        ])
        .unwrap();
        let mut workbook = Workbook::new();
        let mut report = SpecPlotReport::default();
        let options = SpecChartOptions {
            bins: Some(crate::spec::EnumHistogramBins::Count(4)),
            gap: Some(150),
            ..Default::default()
        };

        plot_histogram(
            &SpecIndexedFrame::from_dataframe(df),
            &mut workbook,
            "hist",
            &options,
            &mut report,
        )
        .unwrap();

        assert_eq!(report.chart_kind, Some(EnumChartKind::Histogram));
        assert_eq!(report.shape_written, (5, 3));
        assert!(report.series.iter().all(|s| s.gap == Some(0)));
        assert!(workbook.save_to_buffer().is_ok());
    }

    #[test]
    fn test_plot_writer_close_is_idempotent_and_blocks_writes() {
        let tmp = TestDir::new();
        let path = tmp.path().join("plots.xlsx");
        let mut writer = XlsxPlotWriter::new(path.clone());

        let report = writer
            .plot_bar_chart(&frame_sales(), "bars", &SpecChartOptions::default())
            .unwrap();
        assert_eq!(report.sheet_name, "bars");
        writer
            .plot_scatter_chart(&frame_xy(), None, "xy", &SpecChartOptions::default())
            .unwrap();
        assert_eq!(writer.report().len(), 2);

        writer.close().unwrap();
        writer.close().unwrap();
        assert!(path.exists());

        let res = writer.plot_line_chart(&frame_sales(), "lines", &SpecChartOptions::default());
        assert!(matches!(res, Err(PlotError::WriterClosed)));
    }
}
