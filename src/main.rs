use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

mod aggregate;
mod dataset;
mod models;
mod panels;
mod report;

use dataset::Dataset;
use models::{AgeMode, PanelTable, Selection};

#[derive(Parser)]
#[command(name = "brfss-panels")]
#[command(about = "Filtered survey health statistics with recomputed confidence intervals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List cascading selector values (classes, then topics, then questions)
    Selectors {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        class: Option<String>,
        #[arg(long, requires = "class")]
        topic: Option<String>,
    },
    /// Compute the seven panels for one selection
    Panels {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        class: Option<String>,
        #[arg(long, requires = "class")]
        topic: Option<String>,
        #[arg(long, requires = "topic")]
        question: Option<String>,
        #[arg(long, value_enum, default_value = "more")]
        age_mode: AgeMode,
        /// Emit the panel tables as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Write a markdown report covering all seven panels
    Report {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        class: Option<String>,
        #[arg(long, requires = "class")]
        topic: Option<String>,
        #[arg(long, requires = "topic")]
        question: Option<String>,
        #[arg(long, value_enum, default_value = "more")]
        age_mode: AgeMode,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Selectors { data, class, topic } => {
            let dataset = Dataset::load(&data)?;
            match (class, topic) {
                (None, _) => {
                    println!("Classes:");
                    for class in dataset.classes() {
                        println!("- {class}");
                    }
                }
                (Some(class), None) => {
                    println!("Topics under {class}:");
                    for topic in dataset.topics(&class) {
                        println!("- {topic}");
                    }
                }
                (Some(class), Some(topic)) => {
                    println!("Questions under {class} / {topic}:");
                    for question in dataset.questions(&class, &topic) {
                        println!("- {question}");
                    }
                }
            }
        }
        Commands::Panels {
            data,
            class,
            topic,
            question,
            age_mode,
            json,
        } => {
            let dataset = Dataset::load(&data)?;
            let selection = resolve_selection(&dataset, class, topic, question, age_mode)?;
            let tables = compute_snapshot(&dataset, &selection);

            if json {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                print_tables(&selection, &tables);
            }
        }
        Commands::Report {
            data,
            class,
            topic,
            question,
            age_mode,
            out,
        } => {
            let dataset = Dataset::load(&data)?;
            let selection = resolve_selection(&dataset, class, topic, question, age_mode)?;
            let tables = compute_snapshot(&dataset, &selection);
            let report = report::build_report(&selection, &tables);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

/// Fills unset selectors the way the dashboard initializes its dropdowns:
/// each level defaults to the first value available under its parents.
fn resolve_selection(
    dataset: &Dataset,
    class: Option<String>,
    topic: Option<String>,
    question: Option<String>,
    age_mode: AgeMode,
) -> anyhow::Result<Selection> {
    if class.is_none() && topic.is_none() && question.is_none() {
        return dataset
            .default_selection(age_mode)
            .context("dataset has no selectable rows");
    }

    let class = match class {
        Some(class) => class,
        None => dataset
            .classes()
            .into_iter()
            .next()
            .context("dataset has no selectable classes")?,
    };
    let topic = match topic {
        Some(topic) => topic,
        None => dataset
            .topics(&class)
            .into_iter()
            .next()
            .with_context(|| format!("no topics under class {class}"))?,
    };
    let question = match question {
        Some(question) => question,
        None => dataset
            .questions(&class, &topic)
            .into_iter()
            .next()
            .with_context(|| format!("no questions under {class} / {topic}"))?,
    };

    Ok(Selection {
        class,
        topic,
        question,
        age_mode,
    })
}

fn compute_snapshot(dataset: &Dataset, selection: &Selection) -> Vec<PanelTable> {
    let filtered = dataset.filter(selection);
    info!(
        rows = filtered.len(),
        question = %selection.question,
        "computing panel snapshot"
    );
    panels::snapshot(&filtered, selection.age_mode)
}

fn print_tables(selection: &Selection, tables: &[PanelTable]) {
    println!(
        "Panels for {} / {} / {}",
        selection.class, selection.topic, selection.question
    );

    for table in tables {
        println!();
        println!("{}", table.title);
        if table.rows.is_empty() {
            println!("  (no data)");
            continue;
        }

        for row in &table.rows {
            let label = match &row.group {
                Some(group) => format!("{group} | {}", row.x),
                None => row.x.clone(),
            };
            println!("  {label}: {}", report::format_estimate(&row.estimate));
        }
    }
}
