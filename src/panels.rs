use crate::aggregate::aggregate;
use crate::models::{AgeMode, PanelRow, PanelTable, SurveyRow};

pub const BREAKOUT_OVERALL: &str = "Overall";
pub const BREAKOUT_GENDER: &str = "Sex";
pub const BREAKOUT_AGE: &str = "Age Group";
pub const BREAKOUT_EDUCATION: &str = "Education Attained";
pub const BREAKOUT_INCOME: &str = "Household Income";

const EDUCATION_ORDER: [&str; 4] = [
    "Less than H.S.",
    "H.S. or G.E.D.",
    "Some post-H.S.",
    "College graduate",
];

const AGE_FINE_ORDER: [&str; 7] = ["18-24", "25-34", "35-44", "45-54", "55-64", "65-74", "75+"];

const AGE_COARSE_ORDER: [&str; 3] = ["18-34", "35-64", "65+"];

/// Labels outside the fine list have no band; the coarse aggregation drops them.
fn coarse_age_band(break_out: &str) -> Option<&'static str> {
    match break_out {
        "18-24" | "25-34" => Some("18-34"),
        "35-44" | "45-54" | "55-64" => Some("35-64"),
        "65-74" | "75+" => Some("65+"),
        _ => None,
    }
}

/// Unrecognized and missing labels rank after every recognized category;
/// the callers' sort keys break ties among them lexicographically.
fn ordinal_rank(order: &[&str], label: Option<&str>) -> usize {
    label
        .and_then(|value| order.iter().position(|category| *category == value))
        .unwrap_or(order.len())
}

fn cell(value: Option<String>) -> String {
    value.unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Overall,
    Gender,
    Age,
    Education,
    Income,
    Location,
    Year,
}

impl Panel {
    pub const ALL: [Panel; 7] = [
        Panel::Overall,
        Panel::Gender,
        Panel::Age,
        Panel::Education,
        Panel::Income,
        Panel::Location,
        Panel::Year,
    ];

    pub fn build(self, rows: &[SurveyRow], age_mode: AgeMode) -> PanelTable {
        match self {
            Panel::Overall => overall_panel(rows),
            Panel::Gender => breakout_panel(
                rows,
                BREAKOUT_GENDER,
                None,
                "By Gender (Response x Sex)",
                "By Gender (no data)",
            ),
            Panel::Age => age_panel(rows, age_mode),
            Panel::Education => breakout_panel(
                rows,
                BREAKOUT_EDUCATION,
                Some(&EDUCATION_ORDER),
                "By Education (Response x Education)",
                "By Education (no data)",
            ),
            Panel::Income => breakout_panel(
                rows,
                BREAKOUT_INCOME,
                None,
                "By Income (Response x Income)",
                "By Income (no data)",
            ),
            Panel::Location => location_panel(rows),
            Panel::Year => year_panel(rows),
        }
    }
}

/// Recomputes all seven panels from one filtered slice.
pub fn snapshot(rows: &[SurveyRow], age_mode: AgeMode) -> Vec<PanelTable> {
    Panel::ALL
        .iter()
        .map(|panel| panel.build(rows, age_mode))
        .collect()
}

fn subset<'a>(rows: &'a [SurveyRow], category: &str) -> Vec<&'a SurveyRow> {
    rows.iter()
        .filter(|row| row.break_out_category == category)
        .collect()
}

fn overall_panel(rows: &[SurveyRow]) -> PanelTable {
    let sub = subset(rows, BREAKOUT_OVERALL);
    if sub.is_empty() {
        return PanelTable::empty("Overall (no data)".to_string(), "Response", None);
    }

    let mut groups = aggregate(sub.iter().copied(), |row| row.response.clone());
    groups.sort_by(|a, b| a.0.cmp(&b.0));

    PanelTable {
        title: "Overall by Response".to_string(),
        x_axis: "Response",
        group_by: None,
        rows: groups
            .into_iter()
            .map(|(response, estimate)| PanelRow {
                x: cell(response),
                group: None,
                estimate,
            })
            .collect(),
    }
}

/// Shared shape of the gender, education, income, and fine-age panels.
/// Without a fixed `order` the sort is lexicographic so repeated runs stay
/// deterministic.
fn breakout_panel(
    rows: &[SurveyRow],
    category: &str,
    order: Option<&[&str]>,
    title: &str,
    empty_title: &str,
) -> PanelTable {
    let sub = subset(rows, category);
    if sub.is_empty() {
        return PanelTable::empty(empty_title.to_string(), "Response", Some("Break_Out"));
    }

    let mut groups = aggregate(sub.iter().copied(), |row| {
        (row.break_out.clone(), row.response.clone())
    });

    match order {
        Some(order) => groups.sort_by(|a, b| {
            let rank_a = ordinal_rank(order, a.0 .0.as_deref());
            let rank_b = ordinal_rank(order, b.0 .0.as_deref());
            rank_a.cmp(&rank_b).then_with(|| a.0.cmp(&b.0))
        }),
        None => groups.sort_by(|a, b| a.0.cmp(&b.0)),
    }

    PanelTable {
        title: title.to_string(),
        x_axis: "Response",
        group_by: Some("Break_Out"),
        rows: groups
            .into_iter()
            .map(|((break_out, response), estimate)| PanelRow {
                x: cell(response),
                group: Some(cell(break_out)),
                estimate,
            })
            .collect(),
    }
}

fn age_panel(rows: &[SurveyRow], age_mode: AgeMode) -> PanelTable {
    match age_mode {
        AgeMode::More => breakout_panel(
            rows,
            BREAKOUT_AGE,
            Some(&AGE_FINE_ORDER),
            "By Age (More detail: Response x Age group)",
            "By Age (no data)",
        ),
        AgeMode::Less => coarse_age_panel(rows),
    }
}

fn coarse_age_panel(rows: &[SurveyRow]) -> PanelTable {
    let sub = subset(rows, BREAKOUT_AGE);
    if sub.is_empty() {
        return PanelTable::empty("By Age (no data)".to_string(), "Response", Some("Break_Out"));
    }

    // Rows whose label has no coarse band are excluded before aggregation.
    let banded: Vec<&SurveyRow> = sub
        .into_iter()
        .filter(|row| row.break_out.as_deref().and_then(coarse_age_band).is_some())
        .collect();

    if banded.is_empty() {
        return PanelTable::empty(
            "By Age (Less, no data)".to_string(),
            "Response",
            Some("Break_Out"),
        );
    }

    let mut groups = aggregate(banded.iter().copied(), |row| {
        let band = row
            .break_out
            .as_deref()
            .and_then(coarse_age_band)
            .unwrap_or_default();
        (band, row.response.clone())
    });

    groups.sort_by(|a, b| {
        let rank_a = ordinal_rank(&AGE_COARSE_ORDER, Some(a.0 .0));
        let rank_b = ordinal_rank(&AGE_COARSE_ORDER, Some(b.0 .0));
        rank_a.cmp(&rank_b).then_with(|| a.0.cmp(&b.0))
    });

    PanelTable {
        title: "By Age (Less detail: Response x Age group 3)".to_string(),
        x_axis: "Response",
        group_by: Some("Break_Out"),
        rows: groups
            .into_iter()
            .map(|((band, response), estimate)| PanelRow {
                x: cell(response),
                group: Some(band.to_string()),
                estimate,
            })
            .collect(),
    }
}

fn year_panel(rows: &[SurveyRow]) -> PanelTable {
    let sub = subset(rows, BREAKOUT_OVERALL);
    if sub.is_empty() {
        return PanelTable::empty("By Year (no data)".to_string(), "Year", Some("Response"));
    }

    let mut groups = aggregate(sub.iter().copied(), |row| (row.year, row.response.clone()));
    groups.sort_by(|a, b| a.0.cmp(&b.0));

    PanelTable {
        title: "By Year (Overall x Response)".to_string(),
        x_axis: "Year",
        group_by: Some("Response"),
        rows: groups
            .into_iter()
            .map(|((year, response), estimate)| PanelRow {
                x: year.map(|y| y.to_string()).unwrap_or_default(),
                group: Some(cell(response)),
                estimate,
            })
            .collect(),
    }
}

fn location_panel(rows: &[SurveyRow]) -> PanelTable {
    let sub = subset(rows, BREAKOUT_OVERALL);
    if sub.is_empty() {
        return PanelTable::empty("By Location (no data)".to_string(), "Locationabbr", None);
    }

    // One response per map: "Yes" when the slice has it, otherwise the
    // lexicographically-first response present.
    let mut responses: Vec<&str> = sub.iter().filter_map(|row| row.response.as_deref()).collect();
    responses.sort_unstable();
    responses.dedup();

    let target = if responses.iter().any(|response| *response == "Yes") {
        Some("Yes")
    } else {
        responses.first().copied()
    };

    let Some(target) = target else {
        return PanelTable::empty(
            "By Location (no data for selected response)".to_string(),
            "Locationabbr",
            None,
        );
    };

    let matching: Vec<&SurveyRow> = sub
        .into_iter()
        .filter(|row| row.response.as_deref() == Some(target))
        .collect();

    if matching.is_empty() {
        return PanelTable::empty(
            "By Location (no data for selected response)".to_string(),
            "Locationabbr",
            None,
        );
    }

    // Rows without a region code cannot be drawn on the map.
    let located: Vec<&SurveyRow> = matching
        .into_iter()
        .filter(|row| row.location.is_some())
        .collect();

    if located.is_empty() {
        return PanelTable::empty("By Location (no data)".to_string(), "Locationabbr", None);
    }

    let mut groups = aggregate(located.iter().copied(), |row| {
        row.location.clone().unwrap_or_default()
    });
    groups.sort_by(|a, b| a.0.cmp(&b.0));

    PanelTable {
        title: format!("By Location (Response = {target})"),
        x_axis: "Locationabbr",
        group_by: None,
        rows: groups
            .into_iter()
            .map(|(location, estimate)| PanelRow {
                x: location,
                group: None,
                estimate,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(category: &str, break_out: Option<&str>, response: &str, n: f64, persons: f64) -> SurveyRow {
        SurveyRow {
            year: Some(2022),
            location: Some("MA".to_string()),
            class: "Chronic Health Indicators".to_string(),
            topic: "Diabetes".to_string(),
            question: "Ever told you have diabetes?".to_string(),
            response: Some(response.to_string()),
            break_out: break_out.map(str::to_string),
            break_out_category: category.to_string(),
            sample_size: Some(n),
            persons: Some(persons),
        }
    }

    #[test]
    fn overall_panel_sorts_responses_lexicographically() {
        let rows = vec![
            row(BREAKOUT_OVERALL, None, "Yes", 100.0, 40.0),
            row(BREAKOUT_OVERALL, None, "No", 100.0, 60.0),
            row(BREAKOUT_OVERALL, None, "Yes", 50.0, 20.0),
        ];

        let table = Panel::Overall.build(&rows, AgeMode::More);
        assert_eq!(table.x_axis, "Response");
        assert!(table.group_by.is_none());
        let xs: Vec<&str> = table.rows.iter().map(|r| r.x.as_str()).collect();
        assert_eq!(xs, vec!["No", "Yes"]);
        assert_eq!(table.rows[1].estimate.sample_size, 150.0);
    }

    #[test]
    fn overall_panel_ignores_other_breakout_categories() {
        let rows = vec![
            row(BREAKOUT_OVERALL, None, "Yes", 100.0, 40.0),
            row(BREAKOUT_GENDER, Some("Male"), "Yes", 100.0, 55.0),
        ];

        let table = Panel::Overall.build(&rows, AgeMode::More);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].estimate.sample_size, 100.0);
    }

    #[test]
    fn gender_panel_groups_by_breakout_and_response() {
        let rows = vec![
            row(BREAKOUT_GENDER, Some("Male"), "Yes", 100.0, 30.0),
            row(BREAKOUT_GENDER, Some("Female"), "Yes", 100.0, 45.0),
            row(BREAKOUT_GENDER, Some("Male"), "No", 100.0, 70.0),
        ];

        let table = Panel::Gender.build(&rows, AgeMode::More);
        assert_eq!(table.group_by, Some("Break_Out"));
        assert_eq!(table.rows.len(), 3);
        // Lexicographic by break_out, then response.
        assert_eq!(table.rows[0].group.as_deref(), Some("Female"));
        assert_eq!(table.rows[1].group.as_deref(), Some("Male"));
        assert_eq!(table.rows[1].x, "No");
    }

    #[test]
    fn education_panel_follows_fixed_order_with_unrecognized_last() {
        let rows = vec![
            row(BREAKOUT_EDUCATION, Some("College graduate"), "Yes", 10.0, 2.0),
            row(BREAKOUT_EDUCATION, Some("Less than H.S."), "Yes", 10.0, 4.0),
            row(BREAKOUT_EDUCATION, Some("Apprenticeship"), "Yes", 10.0, 3.0),
            row(BREAKOUT_EDUCATION, Some("Some post-H.S."), "Yes", 10.0, 3.0),
        ];

        let table = Panel::Education.build(&rows, AgeMode::More);
        let groups: Vec<&str> = table.rows.iter().filter_map(|r| r.group.as_deref()).collect();
        assert_eq!(
            groups,
            vec![
                "Less than H.S.",
                "Some post-H.S.",
                "College graduate",
                "Apprenticeship",
            ]
        );
    }

    #[test]
    fn fine_age_panel_follows_age_order() {
        let rows = vec![
            row(BREAKOUT_AGE, Some("75+"), "Yes", 10.0, 5.0),
            row(BREAKOUT_AGE, Some("18-24"), "Yes", 10.0, 1.0),
            row(BREAKOUT_AGE, Some("45-54"), "Yes", 10.0, 3.0),
        ];

        let table = Panel::Age.build(&rows, AgeMode::More);
        let groups: Vec<&str> = table.rows.iter().filter_map(|r| r.group.as_deref()).collect();
        assert_eq!(groups, vec!["18-24", "45-54", "75+"]);
    }

    #[test]
    fn coarse_age_panel_merges_bands_and_drops_unmapped() {
        let rows = vec![
            row(BREAKOUT_AGE, Some("45-54"), "Yes", 100.0, 30.0),
            row(BREAKOUT_AGE, Some("55-64"), "Yes", 100.0, 50.0),
            row(BREAKOUT_AGE, Some("18-24"), "Yes", 100.0, 10.0),
            row(BREAKOUT_AGE, Some("unknown"), "Yes", 100.0, 90.0),
        ];

        let table = Panel::Age.build(&rows, AgeMode::Less);
        let groups: Vec<&str> = table.rows.iter().filter_map(|r| r.group.as_deref()).collect();
        assert_eq!(groups, vec!["18-34", "35-64"]);

        let band = table
            .rows
            .iter()
            .find(|r| r.group.as_deref() == Some("35-64"))
            .unwrap();
        assert_eq!(band.estimate.sample_size, 200.0);
        assert_eq!(band.estimate.persons, 80.0);
    }

    #[test]
    fn coarse_age_panel_with_only_unmapped_labels_is_empty() {
        let rows = vec![row(BREAKOUT_AGE, Some("unknown"), "Yes", 100.0, 90.0)];

        let table = Panel::Age.build(&rows, AgeMode::Less);
        assert!(table.rows.is_empty());
        assert!(table.title.contains("no data"));
    }

    #[test]
    fn year_panel_sorts_by_year_then_response() {
        let mut early = row(BREAKOUT_OVERALL, None, "Yes", 100.0, 40.0);
        early.year = Some(2019);
        let mut late_no = row(BREAKOUT_OVERALL, None, "No", 100.0, 60.0);
        late_no.year = Some(2021);
        let mut late_yes = row(BREAKOUT_OVERALL, None, "Yes", 100.0, 45.0);
        late_yes.year = Some(2021);

        let table = Panel::Year.build(&[late_yes, early, late_no], AgeMode::More);
        assert_eq!(table.x_axis, "Year");
        let cells: Vec<(&str, &str)> = table
            .rows
            .iter()
            .map(|r| (r.x.as_str(), r.group.as_deref().unwrap_or("")))
            .collect();
        assert_eq!(cells, vec![("2019", "Yes"), ("2021", "No"), ("2021", "Yes")]);
    }

    #[test]
    fn location_panel_prefers_yes_response() {
        let mut ma_yes = row(BREAKOUT_OVERALL, None, "Yes", 100.0, 40.0);
        ma_yes.location = Some("MA".to_string());
        let mut ny_yes = row(BREAKOUT_OVERALL, None, "Yes", 100.0, 20.0);
        ny_yes.location = Some("NY".to_string());
        let mut ma_no = row(BREAKOUT_OVERALL, None, "No", 100.0, 60.0);
        ma_no.location = Some("MA".to_string());

        let table = Panel::Location.build(&[ny_yes, ma_no, ma_yes], AgeMode::More);
        assert!(table.title.contains("Response = Yes"));
        let xs: Vec<&str> = table.rows.iter().map(|r| r.x.as_str()).collect();
        assert_eq!(xs, vec!["MA", "NY"]);
        assert_eq!(table.rows[0].estimate.persons, 40.0);
    }

    #[test]
    fn location_panel_falls_back_to_first_response() {
        let rows = vec![
            row(BREAKOUT_OVERALL, None, "Sometimes", 100.0, 40.0),
            row(BREAKOUT_OVERALL, None, "Never", 100.0, 20.0),
        ];

        let table = Panel::Location.build(&rows, AgeMode::More);
        assert!(table.title.contains("Response = Never"));
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn missing_response_forms_its_own_bucket() {
        let mut unlabeled = row(BREAKOUT_OVERALL, None, "Yes", 100.0, 40.0);
        unlabeled.response = None;
        let labeled = row(BREAKOUT_OVERALL, None, "No", 100.0, 60.0);

        let table = Panel::Overall.build(&[unlabeled, labeled], AgeMode::More);
        assert_eq!(table.rows.len(), 2);
        // Missing responses sort before any named one and render as an empty cell.
        assert_eq!(table.rows[0].x, "");
        assert_eq!(table.rows[0].estimate.sample_size, 100.0);
        assert_eq!(table.rows[1].x, "No");
    }

    #[test]
    fn gender_panel_keeps_missing_response_rows() {
        let mut unlabeled = row(BREAKOUT_GENDER, Some("Male"), "Yes", 100.0, 40.0);
        unlabeled.response = None;
        let labeled = row(BREAKOUT_GENDER, Some("Male"), "Yes", 50.0, 20.0);

        let table = Panel::Gender.build(&[unlabeled, labeled], AgeMode::More);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].group.as_deref(), Some("Male"));
        assert_eq!(table.rows[0].x, "");
        assert_eq!(table.rows[1].x, "Yes");
        assert_eq!(table.rows[0].estimate.sample_size, 100.0);
    }

    #[test]
    fn location_panel_without_any_region_codes_is_empty() {
        let mut nowhere = row(BREAKOUT_OVERALL, None, "Yes", 100.0, 40.0);
        nowhere.location = None;

        let table = Panel::Location.build(&[nowhere], AgeMode::More);
        assert!(table.rows.is_empty());
        assert_eq!(table.title, "By Location (no data)");
    }

    #[test]
    fn location_panel_drops_rows_without_region() {
        let mut nowhere = row(BREAKOUT_OVERALL, None, "Yes", 100.0, 40.0);
        nowhere.location = None;
        let somewhere = row(BREAKOUT_OVERALL, None, "Yes", 100.0, 20.0);

        let table = Panel::Location.build(&[nowhere, somewhere], AgeMode::More);
        let xs: Vec<&str> = table.rows.iter().map(|r| r.x.as_str()).collect();
        assert_eq!(xs, vec!["MA"]);
    }

    #[test]
    fn empty_slice_yields_labeled_empty_tables() {
        let tables = snapshot(&[], AgeMode::More);
        assert_eq!(tables.len(), 7);
        for table in &tables {
            assert!(table.rows.is_empty());
            assert!(table.title.contains("no data"));
        }
    }

    #[test]
    fn snapshot_produces_all_seven_panels() {
        let rows = vec![
            row(BREAKOUT_OVERALL, None, "Yes", 100.0, 40.0),
            row(BREAKOUT_GENDER, Some("Male"), "Yes", 50.0, 20.0),
            row(BREAKOUT_AGE, Some("18-24"), "Yes", 50.0, 10.0),
        ];

        let tables = snapshot(&rows, AgeMode::Less);
        assert_eq!(tables.len(), 7);
        assert_eq!(tables[0].title, "Overall by Response");
        assert!(tables[2].title.contains("Less detail"));
    }
}
