use tabled::{settings::Style, Table, Tabled};

use crate::{LogEntry, TodoItem};

#[derive(Tabled)]
pub struct TodoRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "When")]
    pub when: String,
    #[tabled(rename = "Repeat")]
    pub repeat: String,
    #[tabled(rename = "Done")]
    pub done: String,
    #[tabled(rename = "Reminders")]
    pub reminders: String,
    #[tabled(rename = "Images")]
    pub images: usize,
}

impl From<&TodoItem> for TodoRow {
    fn from(todo: &TodoItem) -> Self {
        Self {
            id: todo.id,
            name: todo.name.clone(),
            when: format_millis(todo.time_in_millis),
            repeat: todo.repeat_mode.to_string(),
            done: if todo.is_done { "yes".into() } else { "no".into() },
            reminders: format!("{}/{} every {}h", todo.remind_count, todo.max_retries, todo.retry_interval_hours),
            images: todo.image_paths.len(),
        }
    }
}

#[derive(Tabled)]
pub struct LogRow {
    #[tabled(rename = "Time")]
    pub time: String,
    #[tabled(rename = "Tag")]
    pub tag: String,
    #[tabled(rename = "Message")]
    pub message: String,
}

impl From<&LogEntry> for LogRow {
    fn from(entry: &LogEntry) -> Self {
        Self {
            time: format_millis(entry.timestamp),
            tag: entry.tag.clone(),
            message: entry.message.clone(),
        }
    }
}

/// Epoch milliseconds as local time, or the raw number if out of range
pub fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

pub fn todos_table(todos: &[TodoItem]) -> String {
    if todos.is_empty() {
        return String::new();
    }
    let rows: Vec<TodoRow> = todos.iter().map(TodoRow::from).collect();
    Table::new(&rows).with(Style::rounded()).to_string()
}

pub fn logs_table(entries: &[LogEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let rows: Vec<LogRow> = entries.iter().map(LogRow::from).collect();
    Table::new(&rows).with(Style::rounded()).to_string()
}
