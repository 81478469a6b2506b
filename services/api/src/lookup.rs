use crate::infra::{load_store, parse_category, parse_gender, parse_scope};
use clap::Args;
use cutoff_finder::admissions::{
    AdmissionYear, BaseCategory, ClassifiedResult, DatasetState, DatasetSummary,
    EligibilityEngine, GenderPool, InstituteScope, Query, QueryReport, ViewResult,
};
use cutoff_finder::config::AppConfig;
use cutoff_finder::error::AppError;
use cutoff_finder::telemetry;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct QueryArgs {
    /// Exam rank (category rank for reserved categories)
    #[arg(long)]
    pub(crate) rank: u32,
    /// Base category: OPEN, EWS, OBC-NCL, SC or ST
    #[arg(long, value_parser = parse_category, default_value = "OPEN")]
    pub(crate) category: BaseCategory,
    /// Match PwD seats regardless of base category
    #[arg(long)]
    pub(crate) pwd: bool,
    /// Gender pool: Gender-Neutral or Female-only
    #[arg(long, value_parser = parse_gender, default_value = "Gender-Neutral")]
    pub(crate) gender: GenderPool,
    /// Counselling year to read cutoffs from
    #[arg(long)]
    pub(crate) year: u16,
    /// Institute scope: iit, nit, iiit, gfti or all-except-iit
    #[arg(long, value_parser = parse_scope, default_value = "iit")]
    pub(crate) scope: InstituteScope,
    /// Override the directory holding per-tier cutoff tables
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DatasetsArgs {
    /// Override the directory holding per-tier cutoff tables
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
}

fn prepare(data_dir: Option<PathBuf>) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load()?;
    if let Some(dir) = data_dir {
        config.data.dir = dir;
    }
    telemetry::init(&config.telemetry)?;
    Ok(config)
}

pub(crate) fn run_query(args: QueryArgs) -> Result<(), AppError> {
    let QueryArgs {
        rank,
        category,
        pwd,
        gender,
        year,
        scope,
        data_dir,
    } = args;

    let config = prepare(data_dir)?;
    let store = load_store(&config.data.dir, &config.data.years)?;
    let engine = EligibilityEngine::new(config.views.catalog(), config.data.years.clone());

    let query = Query {
        rank,
        category,
        pwd,
        gender_pool: gender,
        year: AdmissionYear(year),
        institute_scope: scope,
    };

    let report = engine.evaluate(&store, &query)?;
    print!("{}", render_report(&report));
    Ok(())
}

pub(crate) fn run_datasets(args: DatasetsArgs) -> Result<(), AppError> {
    let config = prepare(args.data_dir)?;
    let store = load_store(&config.data.dir, &config.data.years)?;
    print!(
        "{}",
        render_datasets(&config.data.dir.display().to_string(), &store.datasets())
    );
    Ok(())
}

pub(crate) fn render_report(report: &QueryReport) -> String {
    let query = &report.query;
    let category = if query.pwd {
        format!("{} (PwD)", query.category.label())
    } else {
        query.category.label().to_string()
    };

    let mut lines = vec![
        "Cutoff finder results".to_string(),
        format!(
            "Rank {} | {} | {} | {} | {}",
            query.rank,
            category,
            query.gender_pool.label(),
            query.year,
            query.institute_scope.label()
        ),
    ];

    if let Some(note) = report.skipped_note() {
        lines.push(format!("Note: {note}"));
    }
    if !report.missing_tiers.is_empty() {
        let labels: Vec<&str> = report.missing_tiers.iter().map(|tier| tier.label()).collect();
        lines.push(format!("Note: no {} data for {}", query.year, labels.join(", ")));
    }

    for view in &report.views {
        render_view(&mut lines, view, query.institute_scope.is_multi_tier());
    }

    finish(lines)
}

fn render_view(lines: &mut Vec<String>, view: &ViewResult, grouped: bool) {
    lines.push(String::new());
    lines.push(view.label.to_string());
    if view.is_empty() {
        lines.push("No programs matched.".to_string());
        return;
    }

    let counts = view
        .status_counts()
        .into_iter()
        .map(|(status, count)| format!("{count} {}", status.label()))
        .collect::<Vec<_>>()
        .join(", ");
    lines.push(format!("{} programs ({counts})", view.count));

    if grouped {
        for (tier, results) in view.grouped_by_tier() {
            lines.push(format!("[{}]", tier.label()));
            lines.extend(results.into_iter().map(render_row));
        }
    } else {
        lines.extend(view.results.iter().map(render_row));
    }
}

fn render_row(result: &ClassifiedResult) -> String {
    let record = &result.record;
    let quota = record
        .quota
        .map(|quota| format!(" | {}", quota.label()))
        .unwrap_or_default();
    format!(
        "- {} | {}{} | OR {} | CR {} | {}",
        record.institute,
        record.program,
        quota,
        record.opening_rank,
        record.closing_rank,
        result.status.label()
    )
}

pub(crate) fn render_datasets(dir: &str, datasets: &[DatasetSummary]) -> String {
    let mut lines = vec![format!("Cutoff tables in {dir}")];
    if datasets.is_empty() {
        lines.push("No tables found.".to_string());
        return finish(lines);
    }

    for dataset in datasets {
        let detail = match dataset.state {
            DatasetState::Loaded => format!(
                "{} records, {} skipped",
                dataset.records, dataset.skipped
            ),
            DatasetState::Rejected => {
                format!("rejected, missing {}", dataset.missing_columns.join(", "))
            }
            DatasetState::Unreadable => format!(
                "unreadable, {}",
                dataset.error.as_deref().unwrap_or("unknown error")
            ),
        };
        lines.push(format!("- {} {}: {detail}", dataset.tier_label, dataset.year));
    }
    finish(lines)
}

fn finish(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
