use url::Url;

use crate::models::{CHATGPT_HOSTS, CLAUDE_HOSTS, GEMINI_HOSTS, Source};

pub fn classify_source(page_url: &str) -> Source {
    let lowered = page_url.trim().to_ascii_lowercase();
    let host = Url::parse(&lowered)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string));

    let haystack = host.as_deref().unwrap_or(&lowered);
    if matches_any(haystack, CHATGPT_HOSTS) {
        Source::ChatGpt
    } else if matches_any(haystack, CLAUDE_HOSTS) {
        Source::Claude
    } else if matches_any(haystack, GEMINI_HOSTS) {
        Source::Gemini
    } else {
        Source::Other
    }
}

fn matches_any(haystack: &str, hosts: &[&str]) -> bool {
    hosts.iter().any(|host| haystack.contains(host))
}

#[cfg(test)]
mod tests {
    use super::classify_source;
    use crate::models::Source;

    #[test]
    fn classifies_known_hosts() {
        assert_eq!(classify_source("https://chatgpt.com/c/abc"), Source::ChatGpt);
        assert_eq!(classify_source("https://chat.openai.com/"), Source::ChatGpt);
        assert_eq!(classify_source("https://claude.ai/chat/1"), Source::Claude);
        assert_eq!(classify_source("https://gemini.google.com/app"), Source::Gemini);
    }

    #[test]
    fn host_match_ignores_path_mentions() {
        assert_eq!(
            classify_source("https://example.com/blog/claude.ai-review"),
            Source::Other
        );
    }

    #[test]
    fn unparsable_input_falls_back_to_substring() {
        assert_eq!(classify_source("claude.ai/chat/1"), Source::Claude);
        assert_eq!(classify_source(""), Source::Other);
    }
}
