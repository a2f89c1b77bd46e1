use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Terminal styles, one per kind of thing the CLI prints.
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub info: Style,
    pub dim: Style,
    pub muted: Style,
    /// Like counters and hearts
    pub likes: Style,
    /// Category labels
    pub category: Style,
    /// Position numbers in the featured list
    pub featured: Style,
}

impl Theme {
    pub fn new(colored: bool) -> Self {
        let pick = |style: Style| if colored { style } else { Style::new() };
        Self {
            header: pick(Style::new().cyan().bold()),
            success: pick(Style::new().green().bold()),
            error: pick(Style::new().red().bold()),
            warn: pick(Style::new().yellow().bold()),
            info: pick(Style::new().magenta()),
            dim: pick(Style::new().dimmed()),
            muted: pick(Style::new().bright_black()),
            likes: pick(Style::new().bright_red().bold()),
            category: pick(Style::new().blue().italic()),
            featured: pick(Style::new().yellow()),
        }
    }

    /// Colored on a terminal unless `NO_COLOR` is set
    pub fn detect() -> Self {
        Self::new(color_enabled())
    }
}

fn color_enabled() -> bool {
    let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
    !no_color && console::Term::stdout().is_term()
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use owo_colors::OwoColorize;

    #[test]
    fn test_plain_theme_adds_no_escapes() {
        let theme = Theme::new(false);
        assert_eq!("tech".style(theme.category).to_string(), "tech");
        assert_eq!(7.style(theme.likes).to_string(), "7");
    }

    #[test]
    fn test_colored_theme_styles_counters() {
        let theme = Theme::new(true);
        let styled = 7.style(theme.likes).to_string();
        assert!(styled.contains('7'));
        assert!(styled.contains('\u{1b}'));
    }
}
