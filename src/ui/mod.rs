pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, header, info, muted, section, success, todo_added, todo_done, todo_removed};
pub use table::{format_millis, logs_table, todos_table};
pub use theme::{theme, Theme};
