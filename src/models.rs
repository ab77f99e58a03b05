use clap::ValueEnum;
use serde::Serialize;

/// One pre-aggregated survey observation. `persons <= sample_size` is not
/// guaranteed by the source data.
#[derive(Debug, Clone)]
pub struct SurveyRow {
    pub year: Option<i32>,
    pub location: Option<String>,
    pub class: String,
    pub topic: String,
    pub question: String,
    pub response: Option<String>,
    pub break_out: Option<String>,
    pub break_out_category: String,
    pub sample_size: Option<f64>,
    pub persons: Option<f64>,
}

/// Derived statistics for one group of rows. Fields that cannot be computed
/// are `None`, never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub sample_size: f64,
    pub persons: f64,
    pub proportion: Option<f64>,
    pub data_value: Option<f64>,
    pub confidence_limit_low: Option<f64>,
    pub confidence_limit_high: Option<f64>,
}

impl Estimate {
    pub fn err_plus(&self) -> Option<f64> {
        Some(self.confidence_limit_high? - self.data_value?)
    }

    pub fn err_minus(&self) -> Option<f64> {
        Some(self.data_value? - self.confidence_limit_low?)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PanelRow {
    pub x: String,
    pub group: Option<String>,
    #[serde(flatten)]
    pub estimate: Estimate,
}

/// Render-ready output of one panel. An empty `rows` vector is the explicit
/// "no data" marker; the title and axis labels stay populated so a renderer
/// can draw a labeled empty chart.
#[derive(Debug, Clone, Serialize)]
pub struct PanelTable {
    pub title: String,
    pub x_axis: &'static str,
    pub group_by: Option<&'static str>,
    pub rows: Vec<PanelRow>,
}

impl PanelTable {
    pub fn empty(title: String, x_axis: &'static str, group_by: Option<&'static str>) -> Self {
        PanelTable {
            title,
            x_axis,
            group_by,
            rows: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AgeMode {
    /// Fine age groups (18-24 through 75+).
    More,
    /// Three broad bands (18-34, 35-64, 65+).
    Less,
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub class: String,
    pub topic: String,
    pub question: String,
    pub age_mode: AgeMode,
}
