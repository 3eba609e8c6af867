//! Trigger extraction from room message bodies.
//!
//! Two kinds of trigger are recognised: search requests (the configured
//! command, or an `@displayname` mention carrying a query) and bare URLs
//! anywhere in the body. URL matches are cleaned of trailing punctuation
//! and the close-parens that markdown-style links leave attached.

use regex::Regex;

use crate::error::{BotError, Result};

const TRAILING_PUNCTUATION: &[char] = &['"', '\'', '.', ',', '!', '?', ';', ':'];

/// Parser for search triggers and URLs.
pub struct TriggerParser {
    command: Regex,
    mention_prefix: Option<Regex>,
    mention_suffix: Option<Regex>,
    url_pattern: Regex,
}

impl TriggerParser {
    /// Build a parser for `search_command` and mentions of
    /// `bot_display_name`. An empty display name disables mention
    /// triggers; a leading `@` on the name is tolerated.
    pub fn new(search_command: &str, bot_display_name: &str) -> Result<Self> {
        let command = search_command.trim();
        let command = if command.is_empty() { "/search" } else { command };
        let command = compile(&format!(r"(?i)^\s*{}\s+(.+)$", regex::escape(command)))?;

        let name = bot_display_name.trim().trim_start_matches('@').trim();
        let (mention_prefix, mention_suffix) = if name.is_empty() {
            (None, None)
        } else {
            let escaped = regex::escape(name);
            (
                Some(compile(&format!(r"(?i)^\s*@{escaped}[:,]?\s+(.+)$"))?),
                Some(compile(&format!(r"(?i)^\s*(.+?)\s+@{escaped}\s*$"))?),
            )
        };

        let url_pattern = compile(r#"https?://[^\s<>"']+"#)?;

        Ok(Self {
            command,
            mention_prefix,
            mention_suffix,
            url_pattern,
        })
    }

    /// Extract a search query from `body`, from the command form first and
    /// the mention forms second. Returns `None` when nothing matches or
    /// the query is empty.
    pub fn extract_search_query(&self, body: &str) -> Option<String> {
        let patterns = [
            Some(&self.command),
            self.mention_prefix.as_ref(),
            self.mention_suffix.as_ref(),
        ];
        for pattern in patterns.into_iter().flatten() {
            if let Some(captures) = pattern.captures(body) {
                if let Some(query) = captures.get(1) {
                    let query = query.as_str().trim();
                    if !query.is_empty() {
                        return Some(query.to_string());
                    }
                }
            }
        }
        None
    }

    /// Extract every valid http(s) URL from `body`, cleaned and in order
    /// of appearance.
    pub fn extract_urls(&self, body: &str) -> Vec<String> {
        self.url_pattern
            .find_iter(body)
            .filter_map(|raw| clean_url(raw.as_str()))
            .collect()
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| BotError::Config(format!("trigger pattern: {e}")))
}

fn clean_url(raw: &str) -> Option<String> {
    let mut cleaned = raw.trim().trim_end_matches(TRAILING_PUNCTUATION);
    // Close-parens are only trimmed while unbalanced, so wiki-style URLs
    // ending in "(disambiguation)" survive.
    while cleaned.ends_with(')') {
        let opens = cleaned.matches('(').count();
        let closes = cleaned.matches(')').count();
        if opens >= closes {
            break;
        }
        cleaned = &cleaned[..cleaned.len() - 1];
    }
    if cleaned.is_empty() {
        return None;
    }
    let parsed = url::Url::parse(cleaned).ok()?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }
    parsed.host_str()?;
    Some(cleaned.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> TriggerParser {
        TriggerParser::new("/search", "selkie").unwrap()
    }

    #[test]
    fn command_query_is_extracted() {
        let query = parser().extract_search_query("/search rust borrow checker");
        assert_eq!(query.as_deref(), Some("rust borrow checker"));
    }

    #[test]
    fn command_is_case_insensitive_and_tolerates_whitespace() {
        let query = parser().extract_search_query("  /SEARCH   tokio select  ");
        assert_eq!(query.as_deref(), Some("tokio select"));
    }

    #[test]
    fn bare_command_without_query_is_not_a_trigger() {
        assert_eq!(parser().extract_search_query("/search"), None);
        assert_eq!(parser().extract_search_query("/search   "), None);
    }

    #[test]
    fn mention_prefix_query() {
        let query = parser().extract_search_query("@selkie: wiremock matchers");
        assert_eq!(query.as_deref(), Some("wiremock matchers"));
        let query = parser().extract_search_query("@Selkie rustls roots");
        assert_eq!(query.as_deref(), Some("rustls roots"));
    }

    #[test]
    fn mention_suffix_query() {
        let query = parser().extract_search_query("serde rename rules @selkie");
        assert_eq!(query.as_deref(), Some("serde rename rules"));
    }

    #[test]
    fn empty_display_name_disables_mentions() {
        let parser = TriggerParser::new("/search", "").unwrap();
        assert_eq!(parser.extract_search_query("@selkie hello"), None);
        assert!(parser.extract_search_query("/search hello").is_some());
    }

    #[test]
    fn plain_message_is_not_a_trigger() {
        assert_eq!(parser().extract_search_query("morning all"), None);
    }

    #[test]
    fn urls_are_extracted_in_order() {
        let urls = parser().extract_urls("see https://a.example/x and http://b.example/y too");
        assert_eq!(urls, vec!["https://a.example/x", "http://b.example/y"]);
    }

    #[test]
    fn trailing_punctuation_is_trimmed() {
        let urls = parser().extract_urls("read https://a.example/post.");
        assert_eq!(urls, vec!["https://a.example/post"]);
        let urls = parser().extract_urls("really? https://a.example/q?x=1!");
        assert_eq!(urls, vec!["https://a.example/q?x=1"]);
    }

    #[test]
    fn markdown_close_paren_is_trimmed_but_balanced_parens_survive() {
        let urls = parser().extract_urls("(see https://a.example/page)");
        assert_eq!(urls, vec!["https://a.example/page"]);
        let urls = parser().extract_urls("https://en.example.org/wiki/Name_(disambiguation)");
        assert_eq!(urls, vec!["https://en.example.org/wiki/Name_(disambiguation)"]);
    }

    #[test]
    fn non_http_schemes_are_ignored() {
        assert!(parser().extract_urls("ftp://a.example file").is_empty());
        assert!(parser().extract_urls("nothing here").is_empty());
    }
}
