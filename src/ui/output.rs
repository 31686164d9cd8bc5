use crate::ui::{theme, Icons};
use crate::TodoItem;
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::LIST, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

pub fn muted(text: &str) -> String {
    text.style(theme().muted.clone()).to_string()
}

pub fn todo_added(todo: &TodoItem) {
    println!(
        "{} {} {}",
        Icons::NEW.style(theme().success.clone()),
        todo.name.style(theme().open.clone()),
        muted(&format!("#{}", todo.id))
    );
}

pub fn todo_done(todo: &TodoItem) {
    let icon = if todo.is_done { Icons::CHECK } else { Icons::REPEAT };
    let state = if todo.is_done { "done" } else { "open" };
    println!(
        "{} {} {}",
        icon,
        todo.name.style(theme().todo_state(todo.is_done)),
        dim(state)
    );
}

pub fn todo_removed(todo: &TodoItem) {
    println!("{} {}", Icons::DEL, todo.name.style(theme().removed.clone()));
}
