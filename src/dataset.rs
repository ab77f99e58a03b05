use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use crate::models::{AgeMode, Selection, SurveyRow};

/// Columns the source file must carry. Precomputed estimate columns in the
/// export are ignored; everything derived is recomputed from the counts.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "Year",
    "Locationabbr",
    "Class",
    "Topic",
    "Question",
    "Response",
    "Break_Out",
    "Break_Out_Category",
    "Sample_Size",
    "persons",
];

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Locationabbr")]
    location: Option<String>,
    #[serde(rename = "Class")]
    class: String,
    #[serde(rename = "Topic")]
    topic: String,
    #[serde(rename = "Question")]
    question: String,
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Break_Out")]
    break_out: Option<String>,
    #[serde(rename = "Break_Out_Category")]
    break_out_category: String,
    #[serde(rename = "Sample_Size")]
    sample_size: Option<String>,
    #[serde(rename = "persons")]
    persons: Option<String>,
}

impl RawRow {
    fn into_survey_row(self) -> SurveyRow {
        SurveyRow {
            year: self.year.as_deref().and_then(parse_year),
            location: self.location,
            class: self.class,
            topic: self.topic,
            question: self.question,
            response: self.response,
            break_out: self.break_out,
            break_out_category: self.break_out_category,
            sample_size: self.sample_size.as_deref().and_then(parse_number),
            persons: self.persons.as_deref().and_then(parse_number),
        }
    }
}

/// Lenient numeric coercion: anything that does not parse becomes missing.
fn parse_number(field: &str) -> Option<f64> {
    let value: f64 = field.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

fn parse_year(field: &str) -> Option<i32> {
    let trimmed = field.trim();
    match trimmed.parse::<i32>() {
        Ok(year) => Some(year),
        // Some exports write years as floats ("2019.0").
        Err(_) => parse_number(trimmed).map(|value| value as i32),
    }
}

/// Immutable in-memory survey table, loaded once at startup.
#[derive(Debug)]
pub struct Dataset {
    rows: Vec<SurveyRow>,
}

impl Dataset {
    pub fn load(path: &Path) -> anyhow::Result<Dataset> {
        let file = File::open(path)
            .with_context(|| format!("failed to open dataset {}", path.display()))?;
        let dataset = Dataset::from_reader(file)
            .with_context(|| format!("failed to load dataset {}", path.display()))?;
        info!(rows = dataset.rows.len(), "dataset loaded");
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> anyhow::Result<Dataset> {
        let mut csv_reader = csv::Reader::from_reader(reader);

        let headers = csv_reader
            .headers()
            .context("failed to read csv header row")?
            .clone();
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| !headers.iter().any(|header| header == *column))
            .collect();
        if !missing.is_empty() {
            anyhow::bail!("dataset missing required columns: {}", missing.join(", "));
        }

        let mut rows = Vec::new();
        for result in csv_reader.deserialize::<RawRow>() {
            let raw = result.context("failed to read dataset row")?;
            rows.push(raw.into_survey_row());
        }

        Ok(Dataset { rows })
    }

    pub fn rows(&self) -> &[SurveyRow] {
        &self.rows
    }

    pub fn classes(&self) -> Vec<String> {
        distinct_sorted(self.rows.iter().map(|row| row.class.as_str()))
    }

    pub fn topics(&self, class: &str) -> Vec<String> {
        distinct_sorted(
            self.rows
                .iter()
                .filter(|row| row.class == class)
                .map(|row| row.topic.as_str()),
        )
    }

    pub fn questions(&self, class: &str, topic: &str) -> Vec<String> {
        distinct_sorted(
            self.rows
                .iter()
                .filter(|row| row.class == class && row.topic == topic)
                .map(|row| row.question.as_str()),
        )
    }

    /// First class, first topic under it, first question under both: the
    /// initial state of the cascading selectors.
    pub fn default_selection(&self, age_mode: AgeMode) -> Option<Selection> {
        let class = self.classes().into_iter().next()?;
        let topic = self.topics(&class).into_iter().next()?;
        let question = self.questions(&class, &topic).into_iter().next()?;
        Some(Selection {
            class,
            topic,
            question,
            age_mode,
        })
    }

    pub fn filter(&self, selection: &Selection) -> Vec<SurveyRow> {
        self.rows
            .iter()
            .filter(|row| {
                row.class == selection.class
                    && row.topic == selection.topic
                    && row.question == selection.question
            })
            .cloned()
            .collect()
    }
}

fn distinct_sorted<'a, I>(values: I) -> Vec<String>
where
    I: Iterator<Item = &'a str>,
{
    let mut distinct: Vec<String> = values
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect();
    distinct.sort();
    distinct.dedup();
    distinct
}
