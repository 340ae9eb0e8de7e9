use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "goalboard",
    version,
    about = "Terminal goal tracker with rising balloon columns"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a project goals file in the current directory
    Init,
    /// List goals with progress and countdown
    List {
        /// Only show goals whose cycle has fully elapsed
        #[arg(long)]
        overdue: bool,
    },
    /// Add a new goal
    Add {
        /// Display name of the goal
        name: String,
        /// Cycle length, days part
        #[arg(long, default_value_t = 0.0)]
        days: f64,
        /// Cycle length, hours part
        #[arg(long, default_value_t = 0.0)]
        hours: f64,
        /// Cycle length, minutes part
        #[arg(long, default_value_t = 0.0)]
        minutes: f64,
        /// Image asset name (looked up under images/)
        #[arg(long)]
        image: Option<String>,
        /// Ring the terminal bell when the cycle elapses
        #[arg(long)]
        audio: bool,
    },
    /// Edit an existing goal
    Edit {
        /// Goal id to edit
        goal_id: u64,
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// New days part of the cycle
        #[arg(long)]
        days: Option<f64>,
        /// New hours part of the cycle
        #[arg(long)]
        hours: Option<f64>,
        /// New minutes part of the cycle
        #[arg(long)]
        minutes: Option<f64>,
        /// New image asset name
        #[arg(long)]
        image: Option<String>,
        /// Clear the image asset (fall back to the default balloon)
        #[arg(long)]
        clear_image: bool,
        /// Enable or disable the audio alert
        #[arg(long)]
        audio: Option<bool>,
    },
    /// Mark a goal as completed now, restarting its cycle
    Reset {
        /// Goal id to reset
        goal_id: u64,
    },
    /// Delete a goal
    Delete {
        /// Goal id to delete
        goal_id: u64,
    },
    /// Launch the interactive TUI
    Tui,
}
