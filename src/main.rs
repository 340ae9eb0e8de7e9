mod cli;
mod commands;
mod display;
mod model;
mod storage;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Init => commands::init(),
        cli::Command::List { overdue } => commands::list(overdue),
        cli::Command::Add {
            name,
            days,
            hours,
            minutes,
            image,
            audio,
        } => commands::add(name, days, hours, minutes, image, audio),
        cli::Command::Edit {
            goal_id,
            name,
            days,
            hours,
            minutes,
            image,
            clear_image,
            audio,
        } => commands::edit(
            goal_id, name, days, hours, minutes, image, clear_image, audio,
        ),
        cli::Command::Reset { goal_id } => commands::reset(goal_id),
        cli::Command::Delete { goal_id } => commands::delete(goal_id),
        cli::Command::Tui => commands::tui(),
    }
}
