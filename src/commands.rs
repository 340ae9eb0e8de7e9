use crate::display;
use crate::model::{validate_goal_input, Goal, GoalFile};
use crate::storage::{
    init_project_goals, load_goals, locate_goals, save_goals, GoalsLocation,
};
use crate::ui;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use std::env;

pub fn init() -> Result<()> {
    let location = init_project_goals()?;
    println!("Initialized goals file at {}", location.path.display());
    Ok(())
}

pub fn list(overdue: bool) -> Result<()> {
    let (file, location) = load_current_goals()?;
    println!(
        "Goals: {} ({})",
        location.path.display(),
        location.scope.label()
    );
    if file.goals.is_empty() {
        println!("  (no goals)");
        return Ok(());
    }
    let now = Utc::now();
    let mut shown = 0;
    for goal in &file.goals {
        let state = display::derive(goal, now);
        if overdue && !state.overdue {
            continue;
        }
        shown += 1;
        println!("  - {}: {}", goal.id, goal.name);
        println!("    every {}", goal.frequency_label());
        println!(
            "    progress {:>3.0}%  {}  {}",
            state.progress * 100.0,
            display::gradient_hex(state.progress),
            state.countdown
        );
        if goal.audio_alert {
            println!("    audio alert on");
        }
    }
    if shown == 0 {
        println!("  (nothing overdue)");
    }
    Ok(())
}

pub fn add(
    name: String,
    days: f64,
    hours: f64,
    minutes: f64,
    image: Option<String>,
    audio: bool,
) -> Result<()> {
    validate_goal_input(&name, days, hours, minutes)?;
    let (mut file, location) = load_current_goals()?;
    let id = file.next_id();
    let mut goal = Goal::new(id, name, Utc::now());
    goal.frequency_days = days;
    goal.frequency_hours = hours;
    goal.frequency_minutes = minutes;
    goal.image_path = image;
    goal.audio_alert = audio;
    file.add_goal(goal);
    save_goals(&location, &file)?;
    println!("Added goal {}", id);
    Ok(())
}

pub fn edit(
    goal_id: u64,
    name: Option<String>,
    days: Option<f64>,
    hours: Option<f64>,
    minutes: Option<f64>,
    image: Option<String>,
    clear_image: bool,
    audio: Option<bool>,
) -> Result<()> {
    let (mut file, location) = load_current_goals()?;
    let current = file
        .find(goal_id)
        .ok_or_else(|| anyhow!("goal {} not found", goal_id))?;
    let new_name = name.unwrap_or_else(|| current.name.clone());
    let new_days = days.unwrap_or(current.frequency_days);
    let new_hours = hours.unwrap_or(current.frequency_hours);
    let new_minutes = minutes.unwrap_or(current.frequency_minutes);
    validate_goal_input(&new_name, new_days, new_hours, new_minutes)?;
    file.update_goal(goal_id, |goal| {
        goal.name = new_name;
        goal.frequency_days = new_days;
        goal.frequency_hours = new_hours;
        goal.frequency_minutes = new_minutes;
        if clear_image {
            goal.image_path = None;
        }
        if let Some(img) = image {
            goal.image_path = Some(img);
        }
        if let Some(a) = audio {
            goal.audio_alert = a;
        }
    })
    .with_context(|| format!("editing goal {}", goal_id))?;
    save_goals(&location, &file)?;
    println!("Updated goal {}", goal_id);
    Ok(())
}

pub fn reset(goal_id: u64) -> Result<()> {
    let (mut file, location) = load_current_goals()?;
    file.reset_goal(goal_id, Utc::now())
        .with_context(|| format!("resetting goal {}", goal_id))?;
    save_goals(&location, &file)?;
    println!("Reset goal {}", goal_id);
    Ok(())
}

pub fn delete(goal_id: u64) -> Result<()> {
    let (mut file, location) = load_current_goals()?;
    let removed = file
        .remove_goal(goal_id)
        .with_context(|| format!("deleting goal {}", goal_id))?;
    save_goals(&location, &file)?;
    println!("Deleted goal {} ({})", goal_id, removed.name);
    Ok(())
}

pub fn tui() -> Result<()> {
    let cwd = env::current_dir()?;
    let location = locate_goals(&cwd)?;
    match load_goals(&location) {
        Ok(file) => ui::run(Some(file), location, None),
        Err(err) => {
            let message = format!("Could not load goals: {:#}", err);
            ui::run(None, location, Some(message))
        }
    }
}

fn load_current_goals() -> Result<(GoalFile, GoalsLocation)> {
    let cwd = env::current_dir()?;
    let location = locate_goals(&cwd)?;
    let file = load_goals(&location)?;
    Ok((file, location))
}
