use std::path::PathBuf;

use anyhow::Context;
use chrono::{Datelike, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use draw_insights::buckets::{
    aggregate_mismatches, heatmap, reference_record, score_distribution, POOL_FIELD,
};
use draw_insights::checklist::{progress, NewChecklistItem};
use draw_insights::config::Config;
use draw_insights::db;
use draw_insights::delta::latest_draw;
use draw_insights::filter::{contains_ignore_case, FilterCriteria, ProgramFilter, TimeWindow};
use draw_insights::grouping::{
    category_options, group_by_year, latest_by_category, metric_keys, yearly_totals,
};
use draw_insights::models::{DrawRecord, RecordSchema, MISSING_MARKER};
use draw_insights::report;
use draw_insights::stats::metric_stats;
use draw_insights::timeseries::{category_series, metric_series, monthly_counts};

#[derive(Parser)]
#[command(name = "draw-insights")]
#[command(about = "Immigration draw analytics over a document store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct FilterArgs {
    /// Program name, or "All"
    #[arg(long)]
    program: Option<String>,
    /// 1y, 2y, all, or after:YYYY-MM-DD
    #[arg(long, default_value = "all")]
    window: TimeWindow,
}

impl FilterArgs {
    fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            program: ProgramFilter::from(self.program.clone()),
            window: self.window,
            ..FilterCriteria::default()
        }
    }

    fn criteria_for(&self, metric: String) -> FilterCriteria {
        FilterCriteria {
            metric,
            ..self.criteria()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import documents from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
        /// Target collection; defaults to the draws collection
        #[arg(long)]
        collection: Option<String>,
    },
    /// List programs and chartable metrics
    Programs,
    /// Summary statistics for one metric
    Stats {
        #[command(flatten)]
        filter: FilterArgs,
        /// Document field to summarize
        #[arg(long, default_value = "drawCRS")]
        metric: String,
        /// Also print the (date, value) series
        #[arg(long)]
        series: bool,
    },
    /// Most recent draw compared with the previous draw of its program
    Latest,
    /// Applicant counts per CRS range for the most recent draw
    Distribution {
        #[command(flatten)]
        filter: FilterArgs,
        /// Print JSON for a charting front end
        #[arg(long)]
        json: bool,
    },
    /// Applicant counts per CRS range across draws
    Heatmap {
        #[command(flatten)]
        filter: FilterArgs,
        /// Print JSON for a charting front end
        #[arg(long)]
        json: bool,
    },
    /// Draws per month, gaps included
    Months {
        #[command(flatten)]
        filter: FilterArgs,
        /// Print JSON for a charting front end
        #[arg(long)]
        json: bool,
    },
    /// Invitations per year and program
    Totals {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Provincial stream draws
    Streams {
        /// Only streams whose name contains this text
        #[arg(long)]
        stream: Option<String>,
        /// Only draws whose notes contain this text
        #[arg(long)]
        notes: Option<String>,
        /// Only the most recent year present
        #[arg(long)]
        latest_year: bool,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        filter: FilterArgs,
        /// Document field for the statistics section
        #[arg(long, default_value = "drawCRS")]
        metric: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Manage a user's checklist
    Checklist {
        #[arg(long)]
        user: String,
        #[command(subcommand)]
        action: ChecklistAction,
    },
}

#[derive(Subcommand)]
enum ChecklistAction {
    List,
    Add {
        text: String,
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    Done {
        id: Uuid,
    },
    Undo {
        id: Uuid,
    },
    Delete {
        id: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("failed to read configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    let today = Utc::now().date_naive();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(&pool).await?;
            println!("Seed data inserted ({inserted} new documents).");
        }
        Commands::Import { csv, collection } => {
            let collection = collection.unwrap_or_else(|| config.draws_collection.clone());
            let inserted = db::import_csv(&pool, &collection, &csv).await?;
            println!("Inserted {inserted} documents into {collection} from {}.", csv.display());
        }
        Commands::Programs => {
            let documents = db::fetch_collection(&pool, &config.draws_collection).await?;
            let keys = documents.first().map(metric_keys).unwrap_or_default();
            let records: Vec<DrawRecord> = documents
                .into_iter()
                .map(|doc| DrawRecord::from_document(doc, &RecordSchema::EXPRESS_ENTRY))
                .collect();

            println!("Programs:");
            for program in category_options(&records) {
                println!("- {program}");
            }
            println!("Metrics:");
            for key in keys {
                println!("- {key}");
            }
        }
        Commands::Stats {
            filter,
            metric,
            series,
        } => {
            let records = load_draws(&pool, &config).await?;
            let criteria = filter.criteria_for(metric);
            let selected = criteria.apply(&records, today);
            let stats = metric_stats(selected.iter().copied(), &criteria.metric);

            println!("{} over {} ({}):", criteria.metric, criteria.program.label(), criteria.window);
            println!("- Total draws: {}", stats.count);
            println!("- Mean: {}", stats.mean_display());
            println!("- Median: {}", stats.median_display());
            println!("- Min: {}", stats.min_display());
            println!("- Max: {}", stats.max_display());

            if series {
                for point in metric_series(selected.iter().copied(), &criteria.metric) {
                    println!("{} {}", point.date, point.value);
                }
            }
        }
        Commands::Latest => {
            let records = load_draws(&pool, &config).await?;
            let Some(latest) = latest_draw(&records, RecordSchema::EXPRESS_ENTRY.score_field) else {
                println!("No complete draws found.");
                return Ok(());
            };

            let record = &latest.record;
            println!(
                "#{} {} on {}",
                record.text("drawNumber").unwrap_or(MISSING_MARKER),
                record.category_or_empty(),
                record.draw_date.map(|d| d.to_string()).unwrap_or_default()
            );
            println!(
                "CRS {} ({})",
                show(record.score()),
                show_change(latest.score_change)
            );
            println!("Draw size {}", show(record.size()));
            println!(
                "Pool size {} ({})",
                show(record.field(POOL_FIELD)),
                show_change(latest.pool_change)
            );
        }
        Commands::Distribution { filter, json } => {
            let records = load_draws(&pool, &config).await?;
            let selected = filter.criteria().apply(&records, today);

            if let Some(reference) = reference_record(selected.iter().copied()) {
                for (key, stored, children) in aggregate_mismatches(reference) {
                    warn!(key, stored, children, "aggregate bucket differs from its children");
                }
            }

            let Some(distribution) = score_distribution(selected.iter().copied()) else {
                println!("No draws found for this window.");
                return Ok(());
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&distribution)?);
                return Ok(());
            }

            println!(
                "Score distribution on {} (cutoff {}):",
                distribution.draw_date,
                show(distribution.cutoff_score)
            );
            for bar in &distribution.bars {
                let marker = if Some(bar.label) == distribution.cutoff_label {
                    "  <- cutoff"
                } else {
                    ""
                };
                let kind = if bar.aggregate { "aggregate" } else { "applicants" };
                println!(
                    "{:>9} {:>8} {} (base {}){}",
                    bar.label, bar.count, kind, bar.base, marker
                );
            }
        }
        Commands::Heatmap { filter, json } => {
            let records = load_draws(&pool, &config).await?;
            let selected = filter.criteria().apply(&records, today);
            let map = heatmap(selected.iter().copied());
            if json {
                println!("{}", serde_json::to_string_pretty(&map)?);
                return Ok(());
            }

            let header: Vec<String> = map.dates.iter().map(|d| d.to_string()).collect();
            println!("range,{}", header.join(","));
            for (range, row) in map.ranges.iter().zip(&map.cells) {
                let cells: Vec<String> = row
                    .iter()
                    .map(|cell| cell.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()))
                    .collect();
                println!("{range},{}", cells.join(","));
            }
        }
        Commands::Months { filter, json } => {
            let records = load_draws(&pool, &config).await?;
            let selected = filter.criteria().apply(&records, today);
            let months = monthly_counts(selected.iter().copied());
            if json {
                println!("{}", serde_json::to_string_pretty(&months)?);
                return Ok(());
            }
            for month in months {
                println!("{month}: {}", month.count);
            }
        }
        Commands::Totals { filter } => {
            let records = load_draws(&pool, &config).await?;
            let selected = filter.criteria().apply(&records, today);
            for year in yearly_totals(selected.iter().copied()) {
                println!("{}: {} invitations", year.year, year.total());
                for (program, size) in &year.by_category {
                    println!("  - {program}: {size}");
                }
            }
        }
        Commands::Streams {
            stream,
            notes,
            latest_year,
        } => {
            let documents =
                db::fetch_where(&pool, &config.streams_collection, "document_type", "draw").await?;
            let records: Vec<DrawRecord> = documents
                .into_iter()
                .map(|doc| DrawRecord::from_document(doc, &RecordSchema::PROVINCIAL))
                .collect();
            info!(count = records.len(), "loaded stream draws");

            let newest_year = records
                .iter()
                .filter_map(|record| record.draw_date.map(|date| date.year()))
                .max();
            let selected: Vec<&DrawRecord> = records
                .iter()
                .filter(|record| {
                    !latest_year
                        || record.draw_date.map(|date| date.year()) == newest_year
                })
                .filter(|record| {
                    notes
                        .as_deref()
                        .map_or(true, |needle| contains_ignore_case(record, "notes", needle))
                })
                .filter(|record| {
                    stream
                        .as_deref()
                        .map_or(true, |needle| contains_ignore_case(record, "stream", needle))
                })
                .collect();

            println!("Latest draw per stream:");
            for record in latest_by_category(selected.iter().copied()) {
                println!(
                    "- {} on {}: {} invitations, score range {}",
                    record.category_or_empty(),
                    record.draw_date.map(|d| d.to_string()).unwrap_or_default(),
                    show(record.size()),
                    record.text("score_range").unwrap_or(MISSING_MARKER)
                );
            }

            println!("Draws by year:");
            for group in group_by_year(selected.iter().copied()) {
                println!("- {}: {} draws", group.label, group.records.len());
            }

            println!("Score trend per stream:");
            for series in category_series(selected.iter().copied()) {
                let points: Vec<String> = series
                    .points
                    .iter()
                    .map(|p| format!("{} {}", p.date, p.value))
                    .collect();
                println!("- {}: {}", series.category, points.join(", "));
            }
        }
        Commands::Report {
            filter,
            metric,
            out,
        } => {
            let records = load_draws(&pool, &config).await?;
            let report = report::build_report(&filter.criteria_for(metric), today, &records);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Checklist { user, action } => match action {
            ChecklistAction::List => {
                let items = db::list_checklist(&pool, &user).await?;
                let summary = progress(&items);
                println!(
                    "{} of {} completed ({}%)",
                    summary.completed, summary.total, summary.percent
                );
                for item in &items {
                    let mark = if item.done { "x" } else { " " };
                    let due = item
                        .due_date
                        .map(|date| format!(" (due {date})"))
                        .unwrap_or_default();
                    println!("[{mark}] {} {}{}", item.id, item.text, due);
                }
            }
            ChecklistAction::Add { text, due } => {
                let item = NewChecklistItem::new(&text, due)
                    .context("checklist item text must not be empty")?;
                let saved = db::add_checklist_item(&pool, &user, &item).await?;
                println!("Added {}.", saved.id);
            }
            ChecklistAction::Done { id } => {
                db::set_checklist_done(&pool, &user, id, true).await?;
                println!("Marked {id} done.");
            }
            ChecklistAction::Undo { id } => {
                db::set_checklist_done(&pool, &user, id, false).await?;
                println!("Marked {id} not done.");
            }
            ChecklistAction::Delete { id } => {
                db::delete_checklist_item(&pool, &user, id).await?;
                println!("Deleted {id}.");
            }
        },
    }

    Ok(())
}

async fn load_draws(pool: &sqlx::PgPool, config: &Config) -> anyhow::Result<Vec<DrawRecord>> {
    db::load_draws(pool, &config.draws_collection, &RecordSchema::EXPRESS_ENTRY)
        .await
        .with_context(|| format!("failed to load {}", config.draws_collection))
}

fn show(value: Option<f64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| MISSING_MARKER.to_string())
}

fn show_change(change: Option<f64>) -> String {
    match change {
        Some(value) if value > 0.0 => format!("+{value}"),
        Some(value) => value.to_string(),
        None => "no previous draw".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn metric_is_only_accepted_where_it_is_used() {
        let cli = Cli::try_parse_from(["draw-insights", "stats", "--metric", "drawSize"]).unwrap();
        let Commands::Stats { filter, metric, .. } = cli.command else {
            panic!("expected stats");
        };
        assert_eq!(filter.criteria_for(metric).metric, "drawSize");

        let cli = Cli::try_parse_from(["draw-insights", "report", "--window", "1y"]).unwrap();
        let Commands::Report { metric, .. } = cli.command else {
            panic!("expected report");
        };
        assert_eq!(metric, "drawCRS");

        assert!(Cli::try_parse_from(["draw-insights", "months", "--metric", "drawSize"]).is_err());
        assert!(Cli::try_parse_from(["draw-insights", "heatmap", "--metric", "drawSize"]).is_err());
    }
}
