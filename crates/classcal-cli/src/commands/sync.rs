//! `classcal sync`: create missing class events.

use std::path::{Path, PathBuf};

use clap::Args;
use classcal_core::schedule::{read_schedule, Schedule};
use classcal_core::sync::{PlannedRow, Planner, SyncReport};
use classcal_core::{GoogleCalendarClient, ResolvedConfig, SyncDriver};

use super::CliResult;

#[derive(Args)]
pub struct SyncArgs {
    /// Schedule CSV (overrides csv_filename)
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Target calendar (overrides calendar_id)
    #[arg(long)]
    calendar_id: Option<String>,
    /// Show the events that would be created without signing in
    #[arg(long)]
    dry_run: bool,
    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(config_path: Option<&Path>, args: SyncArgs) -> CliResult {
    let mut config = super::resolve_config(config_path)?;
    if let Some(csv) = args.csv {
        config.csv_path = csv;
    }
    if let Some(calendar_id) = args.calendar_id {
        config.calendar_id = calendar_id;
    }

    let schedule = read_schedule(&config.csv_path)?;
    if args.dry_run {
        return dry_run(&config, &schedule, args.json);
    }

    // A term that cannot hold every session fails here, before signing in.
    Planner::new(config.term, config.timezone).plan_schedule(&schedule)?;

    let auth = super::authenticator(&config.credentials_file)?;
    auth.ensure_authenticated().await?;
    let client = GoogleCalendarClient::new(auth);

    let report = SyncDriver::from_config(&client, &config)
        .run(&schedule)
        .await?;
    print_report(&report, args.json)?;
    check_failures(&report)
}

fn print_report(report: &SyncReport, json: bool) -> CliResult {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        for outcome in &report.rows {
            println!("{outcome}");
        }
        println!("{}", report.summary);
    }
    Ok(())
}

fn check_failures(report: &SyncReport) -> CliResult {
    if report.has_failures() {
        return Err(format!(
            "{} of {} rows failed ({})",
            report.summary.failed(),
            report.summary.total(),
            report.summary
        )
        .into());
    }
    Ok(())
}

/// Plan every row and print it; no authentication, no remote calls.
fn dry_run(config: &ResolvedConfig, schedule: &Schedule, json: bool) -> CliResult {
    let rows = Planner::new(config.term, config.timezone).plan_schedule(schedule)?;
    let mut planned = Vec::new();
    let mut failures = Vec::new();
    for row in rows {
        match row {
            PlannedRow::Ready(plan) => planned.push(plan),
            PlannedRow::Malformed { error, .. } => failures.push(error),
        }
    }

    if json {
        let value = serde_json::json!({
            "calendar_id": config.calendar_id,
            "planned": planned,
            "failed": failures
                .iter()
                .map(|e| serde_json::json!({ "row": e.row, "field": e.field, "reason": e.message }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        for plan in &planned {
            println!(
                "row {} {}: {} first {} {} {}",
                plan.row,
                plan.session.title(),
                plan.identity,
                plan.recurrence.first_date,
                plan.payload.start.date_time.get(11..16).unwrap_or_default(),
                plan.payload.recurrence.join(" "),
            );
        }
        for err in &failures {
            println!("{err}");
        }
        println!(
            "dry run: {} to check in calendar '{}', {} malformed",
            planned.len(),
            config.calendar_id,
            failures.len()
        );
    }

    if !failures.is_empty() {
        return Err(format!("{} of {} rows are malformed", failures.len(), schedule.len()).into());
    }
    Ok(())
}
