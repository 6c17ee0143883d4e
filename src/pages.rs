//! Server-rendered HTML pages.

const VERIFY_REQUEST: &str = include_str!("../templates/verify_request.html");
const FORGOT_PASSWORD: &str = include_str!("../templates/forgot_password.html");
const RESET_PASSWORD: &str = include_str!("../templates/reset_password.html");
const MESSAGE: &str = include_str!("../templates/message.html");

/// Page templates, built once at startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct Pages {
    verify_request: &'static str,
    forgot_password: &'static str,
    reset_password: &'static str,
    message: &'static str,
}

impl Default for Pages {
    fn default() -> Self {
        Self {
            verify_request: VERIFY_REQUEST,
            forgot_password: FORGOT_PASSWORD,
            reset_password: RESET_PASSWORD,
            message: MESSAGE,
        }
    }
}

impl Pages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verify_request(&self) -> String {
        self.verify_request.to_string()
    }

    pub fn forgot_password(&self) -> String {
        self.forgot_password.to_string()
    }

    /// Reset form with the token prefilled in a hidden field.
    pub fn reset_password(&self, token: &str) -> String {
        render(self.reset_password, &[("token", token)])
    }

    pub fn message(&self, title: &str, message: &str) -> String {
        render(self.message, &[("title", title), ("message", message)])
    }
}

/// Substitute `{{name}}` placeholders with HTML-escaped values.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{{{name}}}}}"), &escape(value));
    }
    out
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
