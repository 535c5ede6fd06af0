//! Plot constants and default preset factories.

use std::collections::BTreeMap;

use crate::spec::SpecCellFormat;

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;

/// Default chart placement row (zero-based).
pub const N_ROW_CHART_LOC_DEFAULT: u32 = 2;
/// Default chart placement gap, in columns, to the right of the data block.
pub const N_COL_CHART_LOC_OFFSET: usize = 3;

/// Native chart width in pixels before scaling.
pub const N_WIDTH_CHART_BASE: u32 = 480;
/// Native chart height in pixels before scaling.
pub const N_HEIGHT_CHART_BASE: u32 = 288;
/// Display scale applied to both chart dimensions.
pub const N_SCALE_CHART: f64 = 2.0;

/// Reserved display name of the reference series.
pub const C_SERIES_REFERENCE: &str = "Reference";
/// Reserved derived column holding reference x values.
pub const C_COL_REFERENCE_X: &str = "refx";
/// Reserved derived column holding reference y values.
pub const C_COL_REFERENCE_Y: &str = "refy";
/// Fraction of `|min|`/`|max|` added around the reference x range.
pub const N_REFERENCE_PADDING: f64 = 0.1;

/// Pair name used when the scatter pairing is inferred.
pub const C_SERIES_SCATTER_DEFAULT: &str = "data";

/// Default histogram bin count.
pub const N_BINS_HISTOGRAM_DEFAULT: usize = 10;
/// Index column name of the histogram frame.
pub const C_COL_HISTOGRAM_INDEX: &str = "bin";

/// Number format used for date labels/values.
pub const C_NUM_FORMAT_DATE: &str = "yyyy-mm-dd";
/// Header names are treated as dates when all of them parse with this format.
pub const C_DATE_HEADER_PARSE: &str = "%Y-%m-%d";

/// Canonical format preset keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFmtKey {
    /// Header and index label format.
    Label,
    /// Date format.
    Date,
    /// Plain data cell format.
    Data,
}

impl EnumFmtKey {
    /// Preset map key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Label => "label",
            Self::Date => "date",
            Self::Data => "data",
        }
    }
}

/// Build default named format presets used by [`crate::writer::write_frame_to_sheet`].
pub fn derive_default_plot_formats() -> BTreeMap<String, SpecCellFormat> {
    let mut dict_fmt = BTreeMap::new();
    dict_fmt.insert(EnumFmtKey::Data.as_str().to_string(), SpecCellFormat::default());
    dict_fmt.insert(
        EnumFmtKey::Label.as_str().to_string(),
        SpecCellFormat {
            bold: Some(true),
            ..Default::default()
        },
    );
    dict_fmt.insert(
        EnumFmtKey::Date.as_str().to_string(),
        SpecCellFormat {
            num_format: Some(C_NUM_FORMAT_DATE.to_string()),
            ..Default::default()
        },
    );
    dict_fmt
}
