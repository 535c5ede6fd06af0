//! `axiomkit_io_xlsx_plot` v1:
//! Write a frame into an XLSX sheet and chart the written cells.
//!
//! Modules:
//! - `conf`   : constants and default presets
//! - `spec`   : specs/models/options and `PlotError`
//! - `util`   : pure helper functions (cell refs, bins, reference bounds)
//! - `frame`  : frame preparation (scatter pairing, sorting, reference, histogram)
//! - `writer` : frame-to-sheet writer
//! - `plot`   : chart renderers and `XlsxPlotWriter`
pub mod conf;
pub mod frame;
pub mod plot;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    C_COL_REFERENCE_X, C_COL_REFERENCE_Y, C_SERIES_REFERENCE, N_BINS_HISTOGRAM_DEFAULT,
    N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
};
pub use plot::{
    XlsxPlotWriter, plot_bar_chart, plot_column_chart, plot_histogram, plot_line_chart,
    plot_scatter_chart, plot_scatter_series,
};
pub use spec::{
    EnumCellValue, EnumChartKind, EnumChartSubtype, EnumHistogramBins, EnumSeriesMarker,
    PlotError, SpecCellFormat, SpecCellRange, SpecChartOptions, SpecIndexedFrame,
    SpecPlotReport, SpecReferenceCurve, SpecScatterPairs, SpecSeriesPlan, SpecSheetWriteOptions,
    SpecXlsxValuePolicy,
};
pub use util::{derive_cell_reference, derive_column_name, derive_range_formula};
pub use writer::write_frame_to_sheet;
