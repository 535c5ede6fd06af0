//! Plot specification models, options and top-level error types.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use polars::prelude::{Column, DataFrame, PolarsError};
use rust_xlsxwriter::XlsxError;

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification with overlay semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,
    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,
    /// Font color.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }
}

/// Normalized cell value during conversion/write pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/blank value.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Date/datetime as an Excel serial day number.
    Date(f64),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetWriteOptions

/// Replacement text for missing/NaN/Inf cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxValuePolicy {
    /// Replacement text for missing value when keep-missing is enabled.
    pub missing_value_str: String,
    /// Replacement text for NaN.
    pub nan_str: String,
    /// Replacement text for positive infinity.
    pub posinf_str: String,
    /// Replacement text for negative infinity.
    pub neginf_str: String,
}

impl Default for SpecXlsxValuePolicy {
    fn default() -> Self {
        Self {
            missing_value_str: "NA".to_string(),
            nan_str: "NaN".to_string(),
            posinf_str: "Inf".to_string(),
            neginf_str: "-Inf".to_string(),
        }
    }
}

/// Options for writing the data block of one sheet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecSheetWriteOptions {
    /// Keep missing/NaN/Inf as text instead of blank.
    pub if_keep_missing_values: bool,
    /// Value conversion policy.
    pub value_policy: SpecXlsxValuePolicy,
    /// Patch merged into every preset format before writing.
    pub base_format_patch: SpecCellFormat,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Frame

/// Data frame plus an explicit row index.
///
/// The index values become the row labels in column `A` and the category
/// range of categorical charts.
#[derive(Debug, Clone)]
pub struct SpecIndexedFrame {
    /// Row labels, one per data row.
    pub index: Column,
    /// Named data columns.
    pub data: DataFrame,
}

impl SpecIndexedFrame {
    /// Pair `data` with an explicit `index`.
    pub fn new(index: Column, data: DataFrame) -> Result<Self, PlotError> {
        if index.len() != data.height() {
            return Err(PlotError::InvalidFrame(format!(
                "index length {} does not match frame height {}",
                index.len(),
                data.height()
            )));
        }
        Ok(Self { index, data })
    }

    /// Wrap `data` with a 0-based range index.
    pub fn from_dataframe(data: DataFrame) -> Self {
        let index = derive_range_index(data.height());
        Self { index, data }
    }

    /// Move column `name` out of `data` and use it as the index.
    pub fn with_index_column(mut data: DataFrame, name: &str) -> Result<Self, PlotError> {
        if !data.get_column_names_str().contains(&name) {
            return Err(PlotError::UnknownColumn(name.to_string()));
        }
        let index = data.drop_in_place(name)?;
        Ok(Self { index, data })
    }

    /// Number of data rows.
    pub fn height(&self) -> usize {
        self.data.height()
    }

    /// Number of data columns (index excluded).
    pub fn width(&self) -> usize {
        self.data.width()
    }

    /// Data column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.data
            .get_column_names_str()
            .into_iter()
            .map(ToString::to_string)
            .collect()
    }
}

/// Build a 0-based `u64` range index column named `index`.
pub fn derive_range_index(height: usize) -> Column {
    Column::new("index".into(), (0..height as u64).collect::<Vec<u64>>())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ChartOptions

/// Chart primitive rendered by a plot call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumChartKind {
    /// Horizontal bars.
    Bar,
    /// Vertical columns.
    Column,
    /// Lines over categories.
    Line,
    /// XY scatter.
    Scatter,
    /// Zero-gap column chart of shared-edge bin counts.
    Histogram,
}

impl EnumChartKind {
    /// Lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Column => "column",
            Self::Line => "line",
            Self::Scatter => "scatter",
            Self::Histogram => "histogram",
        }
    }
}

/// Chart subtype requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumChartSubtype {
    /// Stacked bars/columns/lines.
    Stacked,
    /// 100% stacked bars/columns/lines.
    PercentStacked,
    /// Markers without connecting lines.
    MarkerOnly,
    /// Straight lines with markers.
    StraightWithMarkers,
    /// Straight lines only.
    Straight,
    /// Smoothed lines with markers.
    SmoothWithMarkers,
    /// Smoothed lines only.
    Smooth,
}

impl EnumChartSubtype {
    /// Snake-case name as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stacked => "stacked",
            Self::PercentStacked => "percent_stacked",
            Self::MarkerOnly => "marker_only",
            Self::StraightWithMarkers => "straight_with_markers",
            Self::Straight => "straight",
            Self::SmoothWithMarkers => "smooth_with_markers",
            Self::Smooth => "smooth",
        }
    }
}

impl FromStr for EnumChartSubtype {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stacked" => Ok(Self::Stacked),
            "percent_stacked" => Ok(Self::PercentStacked),
            "marker_only" => Ok(Self::MarkerOnly),
            "straight_with_markers" => Ok(Self::StraightWithMarkers),
            "straight" => Ok(Self::Straight),
            "smooth_with_markers" => Ok(Self::SmoothWithMarkers),
            "smooth" => Ok(Self::Smooth),
            _ => Err(PlotError::UnknownSubtype(s.to_string())),
        }
    }
}

impl fmt::Display for EnumChartSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Histogram binning rule.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumHistogramBins {
    /// Equal-width bins over the data range.
    Count(usize),
    /// Explicit monotonically increasing edges.
    Edges(Vec<f64>),
}

impl Default for EnumHistogramBins {
    fn default() -> Self {
        Self::Count(crate::conf::N_BINS_HISTOGRAM_DEFAULT)
    }
}

/// Function sampled to draw the scatter reference curve.
#[derive(Clone)]
pub struct SpecReferenceCurve(Arc<dyn Fn(f64) -> f64 + Send + Sync>);

impl SpecReferenceCurve {
    /// Wrap a sampling function.
    pub fn new(f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Evaluate at `x`.
    pub fn eval(&self, x: f64) -> f64 {
        (self.0)(x)
    }
}

impl fmt::Debug for SpecReferenceCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SpecReferenceCurve(<fn>)")
    }
}

/// Optional chart toggles shared by all plot calls.
#[derive(Debug, Clone, Default)]
pub struct SpecChartOptions {
    /// Chart title.
    pub title: Option<String>,
    /// X axis title.
    pub x_title: Option<String>,
    /// Y axis title.
    pub y_title: Option<String>,
    /// X axis `(min, max)`.
    pub x_lim: Option<(f64, f64)>,
    /// Y axis `(min, max)`.
    pub y_lim: Option<(f64, f64)>,
    /// Chart subtype.
    pub subtype: Option<EnumChartSubtype>,
    /// Built-in Excel chart style, 1..=48.
    pub style: Option<u8>,
    /// Explicit zero-based `(row, col)` placement cell.
    pub loc: Option<(u32, u16)>,
    /// Gap between bar/column clusters, in percent.
    pub gap: Option<u16>,
    /// Columns drawn against the secondary y axis.
    pub secondary_y: BTreeSet<String>,
    /// Sort scatter pairs ascending on their x column before writing.
    pub if_sort_on_x: bool,
    /// Reference curve added to scatter charts.
    pub reference: Option<SpecReferenceCurve>,
    /// Histogram binning rule; defaults to 10 equal-width bins.
    pub bins: Option<EnumHistogramBins>,
    /// Data block write options.
    pub sheet: SpecSheetWriteOptions,
}

/// Scatter pairing: display name -> `(x column, y column)`.
pub type SpecScatterPairs = BTreeMap<String, (String, String)>;

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SeriesAndReport

/// Rectangular cell range on a named sheet (zero-based, inclusive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCellRange {
    /// Sheet the range points into.
    pub sheet_name: String,
    /// First row.
    pub row_first: u32,
    /// First column.
    pub col_first: u16,
    /// Last row.
    pub row_last: u32,
    /// Last column.
    pub col_last: u16,
}

/// Marker rule for one series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumSeriesMarker {
    /// Leave the chart type's default.
    #[default]
    Default,
    /// Excel picks a marker per series.
    Automatic,
    /// No markers.
    None,
}

/// Planned chart series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSeriesPlan {
    /// Literal name, or a `=Sheet!$B$1` formula.
    pub name: String,
    /// Category / x range.
    pub categories: SpecCellRange,
    /// Value / y range.
    pub values: SpecCellRange,
    /// Draw against the secondary y axis.
    pub if_secondary_axis: bool,
    /// Bar/column gap.
    pub gap: Option<u16>,
    /// Marker rule.
    pub marker: EnumSeriesMarker,
    /// Smooth the connecting line.
    pub if_smooth: bool,
    /// Hide the connecting line.
    pub if_hide_line: bool,
    /// Force a solid connecting line.
    pub if_solid_line: bool,
}

/// Per-plot call report.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecPlotReport {
    /// Sheet written by the call.
    pub sheet_name: String,
    /// Rendered chart kind.
    pub chart_kind: Option<EnumChartKind>,
    /// Chart title as rendered.
    pub title: Option<String>,
    /// X axis title as rendered (scatter titles may be defaulted).
    pub x_title: Option<String>,
    /// Y axis title as rendered.
    pub y_title: Option<String>,
    /// X axis limits.
    pub x_lim: Option<(f64, f64)>,
    /// Y axis limits.
    pub y_lim: Option<(f64, f64)>,
    /// Written data block `(rows including header, columns including index)`.
    pub shape_written: (usize, usize),
    /// Series attached to the chart, in order.
    pub series: Vec<SpecSeriesPlan>,
    /// Zero-based chart placement cell.
    pub loc: (u32, u16),
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecPlotReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Top-level plot call failures.
#[derive(Debug)]
pub enum PlotError {
    /// Reference curve columns or series name already taken.
    ReferenceNameConflict(String),
    /// Scatter pairing omitted for a frame that is not two columns wide.
    AmbiguousScatterPairs(usize),
    /// Column referenced by options or pairs does not exist.
    UnknownColumn(String),
    /// Subtype not valid for the chart kind.
    UnsupportedSubtype {
        /// Chart kind being rendered.
        kind: EnumChartKind,
        /// Requested subtype.
        subtype: EnumChartSubtype,
    },
    /// Subtype string did not parse.
    UnknownSubtype(String),
    /// Sheet name already present in the workbook.
    SheetNameExists(String),
    /// Frame shape/content unusable.
    InvalidFrame(String),
    /// Histogram bin rule unusable.
    InvalidBins(String),
    /// Row/column position exceeds Excel limits.
    IndexOverflow(String),
    /// Writer used after `close()`.
    WriterClosed,
    /// Spreadsheet library failure.
    Xlsx(XlsxError),
    /// Table library failure.
    Polars(PolarsError),
}

impl fmt::Display for PlotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReferenceNameConflict(name) => write!(
                f,
                "Unable to add reference columns, name conflict: {name:?}"
            ),
            Self::AmbiguousScatterPairs(width) => write!(
                f,
                "Scatter pairs cannot be omitted for a frame with {width} columns (expected 2)"
            ),
            Self::UnknownColumn(name) => write!(f, "Column not found: {name:?}"),
            Self::UnsupportedSubtype { kind, subtype } => write!(
                f,
                "Subtype {subtype:?} is not supported for {} charts",
                kind.as_str()
            ),
            Self::UnknownSubtype(value) => write!(f, "Unknown chart subtype: {value:?}"),
            Self::SheetNameExists(name) => write!(f, "Sheet already exists: {name:?}"),
            Self::InvalidFrame(msg) => write!(f, "{msg}"),
            Self::InvalidBins(msg) => write!(f, "Invalid histogram bins: {msg}"),
            Self::IndexOverflow(msg) => write!(f, "{msg}"),
            Self::WriterClosed => write!(f, "Cannot write after close()."),
            Self::Xlsx(err) => write!(f, "xlsx write error: {err}"),
            Self::Polars(err) => write!(f, "polars error: {err}"),
        }
    }
}

impl std::error::Error for PlotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Xlsx(err) => Some(err),
            Self::Polars(err) => Some(err),
            _ => None,
        }
    }
}

impl From<XlsxError> for PlotError {
    fn from(err: XlsxError) -> Self {
        Self::Xlsx(err)
    }
}

impl From<PolarsError> for PlotError {
    fn from(err: PolarsError) -> Self {
        Self::Polars(err)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
