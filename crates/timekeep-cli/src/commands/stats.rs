use chrono::Utc;
use clap::Subcommand;
use serde_json::json;
use timekeep_core::analytics;

use super::common;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Period summary with daily series and per-task breakdown
    Summary {
        /// Reporting period passed to the server (e.g. 7d, 30d, month)
        #[arg(long)]
        period: Option<String>,
        /// Days covered by the daily series
        #[arg(long, default_value = "30")]
        days: u32,
    },
}

pub async fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let api = common::build_api()?;
    match action {
        StatsAction::Summary { period, days } => {
            let sessions = api.list_sessions(period.as_deref()).await?;
            let stats = api.session_stats(period.as_deref()).await?;

            let today = Utc::now().date_naive();
            let report = json!({
                "productivity": analytics::productivity_summary(&sessions, &stats, days),
                "dailyActivity": analytics::daily_activity(&sessions, days, today),
                "taskBreakdown": analytics::task_breakdown(&stats),
            });
            common::print_json(&report)?;
        }
    }
    Ok(())
}
