//! Static acknowledgment pages shown in the browser after the redirect.

use loopauth_domain::AuthorizationQuery;

/// Page copy for both redirect outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcknowledgmentPages {
    application_name: String,
}

impl AcknowledgmentPages {
    #[must_use]
    pub fn new(application_name: impl Into<String>) -> Self {
        Self { application_name: application_name.into() }
    }

    #[must_use]
    pub fn success(&self) -> String {
        render(
            "Authentication succeed",
            &format!("Authentication succeed. Return to {}, please.", self.application_name),
        )
    }

    #[must_use]
    pub fn failure(&self) -> String {
        render(
            "Authentication failed",
            &format!("Authentication failed. Return to {}, please.", self.application_name),
        )
    }

    /// Page matching the redirect outcome.
    #[must_use]
    pub fn for_query(&self, query: &AuthorizationQuery) -> String {
        if query.is_code() {
            self.success()
        } else {
            self.failure()
        }
    }
}

fn render(title: &str, message: &str) -> String {
    format!(
        "<!doctype html><html><head><title>{}</title></head><body>{} You can now close the tab. </body></html>",
        escape_html(title),
        escape_html(message)
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
