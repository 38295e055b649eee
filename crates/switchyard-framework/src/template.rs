//! `&token` text templates.
//!
//! ```text
//! "_hey I am alive now &sender_"  ──render──▶  "_hey I am alive now @15551234_"
//! ```
//!
//! Token names are ASCII and match case-insensitively. When several names
//! share a prefix the longest one wins, so `&gname` is never read as `&g`.
//! Unknown tokens are left as written. Substituted values are not rescanned.

use std::time::Duration;

use time::OffsetDateTime;
use time::macros::format_description;

/// A set of template variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    vars: Vec<(String, String)>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a variable, replacing any earlier value of the same name.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        match self.vars.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.vars.push((name, value)),
        }
        self
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.vars
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if `text` references `name`.
    pub fn references(text: &str, name: &str) -> bool {
        text.to_ascii_lowercase()
            .contains(&format!("&{}", name.to_ascii_lowercase()))
    }

    /// Substitutes every known `&token` in `text`.
    pub fn render(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(pos) = rest.find('&') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            let hit = self
                .vars
                .iter()
                .filter(|(name, _)| {
                    after
                        .get(..name.len())
                        .is_some_and(|head| head.eq_ignore_ascii_case(name))
                })
                .max_by_key(|(name, _)| name.len());

            match hit {
                Some((name, value)) => {
                    out.push_str(value);
                    rest = &after[name.len()..];
                }
                None => {
                    out.push('&');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Formats a duration as `1d 2h 3m 4s`.
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!(
        "{}d {}h {}m {}s",
        secs / 86_400,
        (secs % 86_400) / 3_600,
        (secs % 3_600) / 60,
        secs % 60
    )
}

/// Today's date as `October 19, 2026` (UTC).
pub fn format_date(now: OffsetDateTime) -> String {
    let format = format_description!("[month repr:long] [day padding:none], [year]");
    now.format(&format).unwrap_or_else(|_| now.date().to_string())
}
