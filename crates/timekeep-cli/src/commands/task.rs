use clap::Subcommand;
use timekeep_core::{TaskDraft, TaskPatch, TaskPriority, TaskStatus};

use super::common;

#[derive(Subcommand)]
pub enum TaskAction {
    /// List tasks with accumulated time
    List,
    /// Create a task
    Add {
        /// Task name
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// low, medium or high
        #[arg(long, value_parser = parse_priority)]
        priority: Option<TaskPriority>,
    },
    /// Update task fields
    Update {
        /// Task ID
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// low, medium or high
        #[arg(long, value_parser = parse_priority)]
        priority: Option<TaskPriority>,
        /// pending, active or completed
        #[arg(long, value_parser = parse_status)]
        status: Option<TaskStatus>,
    },
    /// Delete a task (stops its timer first if running)
    Rm {
        /// Task ID
        id: String,
    },
}

fn parse_priority(raw: &str) -> Result<TaskPriority, String> {
    match raw {
        "low" => Ok(TaskPriority::Low),
        "medium" => Ok(TaskPriority::Medium),
        "high" => Ok(TaskPriority::High),
        other => Err(format!("unknown priority '{other}' (use low|medium|high)")),
    }
}

fn parse_status(raw: &str) -> Result<TaskStatus, String> {
    match raw {
        "pending" => Ok(TaskStatus::Pending),
        "active" => Ok(TaskStatus::Active),
        "completed" => Ok(TaskStatus::Completed),
        other => Err(format!(
            "unknown status '{other}' (use pending|active|completed)"
        )),
    }
}

pub async fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = common::build_tracker()?;
    match action {
        TaskAction::List => {
            tracker.store().load().await?;
            common::print_json(&tracker.store().tasks())?;
        }
        TaskAction::Add {
            name,
            description,
            category,
            priority,
        } => {
            let draft = TaskDraft {
                name,
                description,
                category,
                priority,
            };
            let result = tracker.create_task(draft).await;
            if !result.success {
                return Err(result.message.unwrap_or_else(|| "create failed".into()).into());
            }
            common::print_json(&tracker.store().tasks())?;
        }
        TaskAction::Update {
            id,
            name,
            description,
            category,
            priority,
            status,
        } => {
            tracker.store().load().await?;
            let patch = TaskPatch {
                name,
                description,
                category,
                priority,
                status,
            };
            let result = tracker.update_task(&id, patch).await;
            if !result.success {
                return Err(result.message.unwrap_or_else(|| "update failed".into()).into());
            }
            common::print_json(&tracker.store().get(&id))?;
        }
        TaskAction::Rm { id } => {
            tracker.init().await?;
            let result = tracker.delete_task(&id).await;
            if !result.success {
                return Err(result.message.unwrap_or_else(|| "delete failed".into()).into());
            }
            println!("deleted {id}");
        }
    }
    Ok(())
}
