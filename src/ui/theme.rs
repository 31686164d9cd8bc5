use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Terminal palette for to-do and log output
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub info: Style,
    pub dim: Style,
    pub muted: Style,
    /// Completed to-dos
    pub done: Style,
    /// To-dos still waiting to fire
    pub open: Style,
    pub removed: Style,
}

impl Theme {
    /// Colored output on a terminal unless `NO_COLOR` is set
    pub fn detect() -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        if no_color || !console::Term::stdout().is_term() {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            info: Style::new().magenta(),
            dim: Style::new().white().dimmed(),
            muted: Style::new().bright_black(),
            done: Style::new().green().strikethrough(),
            open: Style::new().yellow(),
            removed: Style::new().red(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            muted: Style::new(),
            done: Style::new(),
            open: Style::new(),
            removed: Style::new(),
        }
    }

    /// Style for a to-do name given its completion state
    pub fn todo_state(&self, is_done: bool) -> Style {
        if is_done {
            self.done.clone()
        } else {
            self.open.clone()
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use owo_colors::OwoColorize;

    #[test]
    fn test_plain_theme_emits_no_escapes() {
        let theme = Theme::plain();
        assert_eq!("Pay rent".style(theme.todo_state(true)).to_string(), "Pay rent");
        assert_eq!("Pay rent".style(theme.todo_state(false)).to_string(), "Pay rent");
    }

    #[test]
    fn test_done_and_open_are_distinct() {
        let theme = Theme::colored();
        let done = "Pay rent".style(theme.todo_state(true)).to_string();
        let open = "Pay rent".style(theme.todo_state(false)).to_string();
        assert_ne!(done, open);
        assert!(done.contains('\u{1b}'));
    }
}
