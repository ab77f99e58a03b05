use std::fmt::Write;

use chrono::Utc;

use crate::models::{AgeMode, Estimate, PanelTable, Selection};

pub fn format_estimate(estimate: &Estimate) -> String {
    match (
        estimate.data_value,
        estimate.confidence_limit_low,
        estimate.confidence_limit_high,
    ) {
        (Some(value), Some(low), Some(high)) => {
            let err_plus = estimate.err_plus().unwrap_or(0.0);
            let err_minus = estimate.err_minus().unwrap_or(0.0);
            format!(
                "{value:.1}% (95% CI {low:.1}-{high:.1}, +{err_plus:.1}/-{err_minus:.1}, n {n:.0})",
                n = estimate.sample_size
            )
        }
        (Some(value), _, _) => format!(
            "{value:.1}% (interval undefined, n {n:.0})",
            n = estimate.sample_size
        ),
        _ => format!("no value (sample size {:.0})", estimate.sample_size),
    }
}

pub fn build_report(selection: &Selection, tables: &[PanelTable]) -> String {
    let mut output = String::new();

    let age_label = match selection.age_mode {
        AgeMode::More => "fine age groups",
        AgeMode::Less => "broad age bands",
    };

    let _ = writeln!(output, "# Survey Panel Report");
    let _ = writeln!(
        output,
        "Generated {} for {} / {} / {} ({})",
        Utc::now().date_naive(),
        selection.class,
        selection.topic,
        selection.question,
        age_label
    );

    for table in tables {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", table.title);

        if table.rows.is_empty() {
            let _ = writeln!(output, "No data for this panel.");
            continue;
        }

        for row in &table.rows {
            let label = match &row.group {
                Some(group) => format!("{} = {group}, {} = {}",
                    table.group_by.unwrap_or("Group"), table.x_axis, row.x),
                None => format!("{} = {}", table.x_axis, row.x),
            };
            let _ = writeln!(output, "- {label}: {}", format_estimate(&row.estimate));
        }
    }

    output
}
