use colored::Colorize;

pub struct Theme {
    pub prompt: String,
    pub error_style: Box<dyn Fn(String) -> String>,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            prompt: "d8sh> ".bright_cyan().to_string(),
            error_style: Box::new(|s| s.bright_red().to_string()),
        }
    }
}

impl Theme {
    pub fn load(theme_name: &str) -> Theme {
        match theme_name {
            "plain" => Theme {
                prompt: "d8sh> ".to_string(),
                error_style: Box::new(|s| s),
            },
            _ => Theme::default(),
        }
    }

    pub fn error(&self, message: &str) -> String {
        (self.error_style)(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_theme_is_uncoloured() {
        let theme = Theme::load("plain");
        assert_eq!(theme.prompt, "d8sh> ");
        assert_eq!(theme.error("syntax error"), "syntax error");
    }

    #[test]
    fn test_unknown_theme_falls_back_to_default() {
        colored::control::set_override(false);
        let theme = Theme::load("sparkly");
        assert_eq!(theme.prompt, "d8sh> ");
    }
}
