//! User-agent classification
//!
//! The enricher only needs three facts about a user agent: browser family,
//! OS family and whether it is an automated client. `UserAgentClassifier`
//! keeps the parsing library behind a seam so tests and alternative parsers
//! can be swapped in.

use std::borrow::Cow;

use woothee::parser::Parser;

use crate::error::ClassifyError;

const UNKNOWN: &str = "UNKNOWN";
const CRAWLER_CATEGORY: &str = "crawler";

/// Fields derived from a user-agent string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentInfo {
    pub browser_family: String,
    pub os_family: String,
    pub is_automated: bool,
}

impl UserAgentInfo {
    pub fn unknown() -> Self {
        Self {
            browser_family: UNKNOWN.to_string(),
            os_family: UNKNOWN.to_string(),
            is_automated: false,
        }
    }
}

/// Pure function from a user-agent string to its classification.
pub trait UserAgentClassifier: Send + Sync {
    fn classify(&self, user_agent: &str) -> Result<UserAgentInfo, ClassifyError>;
}

/// Classifier backed by the woothee project's user-agent dataset.
///
/// CloudFront writes the user-agent column percent-encoded
/// (`Mozilla/5.0%20(Windows%20NT%2010.0)`), so the value is decoded once
/// before parsing. Values that do not decode to UTF-8 are parsed as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct WootheeClassifier;

impl WootheeClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl UserAgentClassifier for WootheeClassifier {
    fn classify(&self, user_agent: &str) -> Result<UserAgentInfo, ClassifyError> {
        let decoded = urlencoding::decode(user_agent).unwrap_or(Cow::Borrowed(user_agent));
        let agent = decoded.trim();
        if agent.is_empty() || agent == "-" {
            return Ok(UserAgentInfo::unknown());
        }

        let parsed = Parser::new()
            .parse(agent)
            .ok_or_else(|| ClassifyError::Unparseable(agent.to_string()))?;

        Ok(UserAgentInfo {
            browser_family: parsed.name.to_string(),
            os_family: parsed.os.to_string(),
            is_automated: parsed.category == CRAWLER_CATEGORY,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_desktop_is_not_automated() {
        let info = WootheeClassifier
            .classify("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .unwrap();
        assert_eq!(info.browser_family, "Chrome");
        assert!(info.os_family.starts_with("Windows"));
        assert!(!info.is_automated);
    }

    #[test]
    fn percent_encoded_agent_is_decoded() {
        let info = WootheeClassifier
            .classify("Mozilla/5.0%20(Windows%20NT%2010.0;%20Win64;%20x64)%20AppleWebKit/537.36%20(KHTML,%20like%20Gecko)%20Chrome/120.0.0.0%20Safari/537.36")
            .unwrap();
        assert_eq!(info.browser_family, "Chrome");
        assert!(info.os_family.starts_with("Windows"));
    }

    #[test]
    fn crawler_is_automated() {
        let info = WootheeClassifier
            .classify("Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)")
            .unwrap();
        assert!(info.is_automated);
    }

    #[test]
    fn missing_agent_is_unknown() {
        assert_eq!(WootheeClassifier.classify("-").unwrap(), UserAgentInfo::unknown());
        assert_eq!(WootheeClassifier.classify("").unwrap(), UserAgentInfo::unknown());
    }
}
