use clap::Subcommand;

use super::common;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start (or toggle/switch) the timer for a task
    Start {
        /// Task ID
        task_id: String,
    },
    /// Stop the active timer
    Stop,
    /// Print current timer state as JSON
    Status,
    /// Follow timer state, printing a line per second
    Watch,
}

pub async fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = common::build_tracker()?;
    // adopt any timer left running by a previous session before acting
    tracker.init().await?;

    match action {
        TimerAction::Start { task_id } => {
            tracker.press(&task_id).await?;
            common::print_json(&tracker.engine().snapshot())?;
        }
        TimerAction::Stop => {
            let stopped = tracker.stop().await?;
            if !stopped {
                println!("no active timer");
            }
            common::print_json(&tracker.engine().snapshot())?;
        }
        TimerAction::Status => {
            common::print_json(&tracker.engine().snapshot())?;
        }
        TimerAction::Watch => {
            let mut updates = tracker.engine().subscribe();
            common::print_json(&tracker.engine().snapshot())?;
            loop {
                updates.changed().await?;
                let snap = updates.borrow_and_update().clone();
                println!("{}", serde_json::to_string(&snap)?);
            }
        }
    }

    tracker.engine().dispose();
    Ok(())
}
