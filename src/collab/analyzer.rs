//! Keyword-table requirement analyzer.
//!
//! Intent is `<verb>:<subject>`: the verb is the first verb group with a
//! keyword present in the request, the subject is the first recognised API
//! (or `data` when none is).

use std::collections::HashSet;

use crate::collab::Analyzer;
use crate::model::RequirementSpec;

/// Verb groups, checked in order.  First hit wins.
const VERBS: &[(&str, &[&str])] = &[
    ("send", &["send", "notify", "notification", "message", "alert", "post"]),
    ("fetch", &["fetch", "get", "retrieve", "download", "pull", "read"]),
    ("analyze", &["analyze", "analyse", "report", "summarize", "stats"]),
    ("create", &["create", "generate", "build", "make", "write"]),
    ("monitor", &["monitor", "watch", "track", "observe"]),
];

/// Recognised APIs and the keywords that imply them.  Multi-word keywords
/// match as substrings, single words match whole tokens.
const APIS: &[(&str, &[&str])] = &[
    ("telegram", &["telegram"]),
    ("gmail", &["gmail", "email", "e-mail"]),
    ("slack", &["slack"]),
    ("weather", &["weather", "forecast"]),
    ("github", &["github", "repository", "pull request"]),
    ("google_ads", &["google ads", "adwords", "campaign"]),
];

const DEFAULT_VERB: &str = "process";
const DEFAULT_SUBJECT: &str = "data";

/// Stateless analyzer backed by the keyword tables above.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordAnalyzer;

impl KeywordAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

fn mentions(text: &str, tokens: &HashSet<&str>, keyword: &str) -> bool {
    if keyword.contains(' ') {
        text.contains(keyword)
    } else {
        tokens.contains(keyword)
    }
}

impl Analyzer for KeywordAnalyzer {
    fn analyze(&self, text: &str) -> RequirementSpec {
        let lowered = text.to_lowercase();
        let tokens: HashSet<&str> = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '-'))
            .filter(|t| !t.is_empty())
            .collect();

        let verb = VERBS
            .iter()
            .find(|(_, kws)| kws.iter().any(|kw| mentions(&lowered, &tokens, kw)))
            .map(|(verb, _)| *verb)
            .unwrap_or(DEFAULT_VERB);

        let required_apis: Vec<String> = APIS
            .iter()
            .filter(|(_, kws)| kws.iter().any(|kw| mentions(&lowered, &tokens, kw)))
            .map(|(api, _)| api.to_string())
            .collect();

        let subject = required_apis.first().map(String::as_str).unwrap_or(DEFAULT_SUBJECT);

        RequirementSpec {
            raw_request: text.to_string(),
            parsed_intent: format!("{}:{}", verb, subject),
            required_apis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Get the weather for Berlin", "fetch:weather")]
    #[case("Send a telegram notification when CPU exceeds 90%", "send:telegram")]
    #[case("Analyze sales figures", "analyze:data")]
    #[case("Create a weekly digest", "create:data")]
    #[case("Watch the github repository for releases", "monitor:github")]
    #[case("Do something", "process:data")]
    fn test_intent(#[case] text: &str, #[case] intent: &str) {
        assert_eq!(KeywordAnalyzer::new().analyze(text).parsed_intent, intent);
    }

    #[test]
    fn test_raw_request_preserved() {
        let spec = KeywordAnalyzer::new().analyze("Weather please");
        assert_eq!(spec.raw_request, "Weather please");
        assert!(spec.required_apis.contains(&"weather".to_string()));
    }

    #[test]
    fn test_multiple_apis_extracted() {
        let spec = KeywordAnalyzer::new().analyze("Post google ads stats to telegram");
        assert!(spec.required_apis.contains(&"google_ads".to_string()));
        assert!(spec.required_apis.contains(&"telegram".to_string()));
    }

    #[test]
    fn test_single_word_keywords_match_whole_tokens_only() {
        // "target" contains "get" but must not imply fetch
        let spec = KeywordAnalyzer::new().analyze("target audience");
        assert_eq!(spec.parsed_intent, "process:data");
    }
}
