//! Terminal output formatting.

use colored::{ColoredString, Colorize};
use unicode_width::UnicodeWidthStr;

use boardsync_core::{BoardState, Priority, Stage, Task};
use boardsync_engine::ConnectionState;

/// Print the board, one column per stage.
pub fn print_board(state: &BoardState) {
    if state.is_loading() {
        println!("{}", "Syncing with the board server...".dimmed());
    }

    if state.total_tasks() == 0 && !state.is_loading() {
        println!(
            "{}",
            "No tasks on the board. Create one with 'boardsync task new <title>'.".dimmed()
        );
        return;
    }

    for stage in Stage::ALL {
        let tasks = state.tasks_in(stage);
        println!(
            "{} {}",
            stage.as_str().bold(),
            format!("({})", tasks.len()).dimmed()
        );
        if tasks.is_empty() {
            println!("  {}", "-".dimmed());
        }
        for task in tasks {
            print_task_line(task);
        }
    }
}

fn print_task_line(task: &Task) {
    let short_id = task.id.get(..8).unwrap_or(&task.id);
    let mut line = format!(
        "  {} {} [{}]",
        short_id.dimmed(),
        truncate_visual(&task.title, 48),
        priority_label(task.priority)
    );
    if !task.attachments.is_empty() {
        line.push_str(&format!(" {}", format!("+{} file(s)", task.attachments.len()).dimmed()));
    }
    println!("{}", line);
}

fn priority_label(priority: Priority) -> ColoredString {
    match priority {
        Priority::Low => "low".dimmed(),
        Priority::Medium => "medium".yellow(),
        Priority::High => "high".red().bold(),
    }
}

/// Print a connectivity transition.
pub fn print_connection(state: &ConnectionState) {
    match state {
        ConnectionState::Connected => println!("{} connected", "●".green()),
        ConnectionState::Connecting => println!("{} connecting...", "●".yellow()),
        ConnectionState::Disconnected => println!("{} disconnected", "●".dimmed()),
        ConnectionState::Error(reason) => println!("{} {}", "●".red(), reason.red()),
    }
}

fn truncate_visual(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    if max_width <= 3 {
        return ".".repeat(max_width);
    }
    let mut result = String::new();
    let mut current_width = 0;
    for ch in s.chars() {
        let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if current_width + ch_width > max_width - 2 {
            break;
        }
        result.push(ch);
        current_width += ch_width;
    }
    result.push_str("..");
    result
}
