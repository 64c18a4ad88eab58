//! URL patterns used by redirect waits
//!
//! Two forms are accepted in configuration:
//!
//! ```toml
//! landing = { glob = "**/dashboard" }
//! entry = { regex = "/login" }
//! ```
//!
//! Globs match the whole URL: `**` spans any characters, `*` any characters
//! except `/`, and `?` a single character. Regexes are unanchored searches.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum PatternSource {
    Glob(String),
    Regex(String),
}

/// A compiled URL pattern
#[derive(Clone)]
pub struct UrlPattern {
    source: PatternSource,
    compiled: Regex,
}

impl UrlPattern {
    /// Compile a glob pattern matched against the full URL
    pub fn glob(glob: &str) -> Result<Self, regex::Error> {
        let compiled = Regex::new(&glob_to_regex(glob))?;
        Ok(Self {
            source: PatternSource::Glob(glob.to_string()),
            compiled,
        })
    }

    /// Compile a regular expression searched anywhere in the URL
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        let compiled = Regex::new(pattern)?;
        Ok(Self {
            source: PatternSource::Regex(pattern.to_string()),
            compiled,
        })
    }

    pub fn is_match(&self, url: &str) -> bool {
        self.compiled.is_match(url)
    }

    fn from_source(source: PatternSource) -> Result<Self, regex::Error> {
        match source {
            PatternSource::Glob(g) => Self::glob(&g),
            PatternSource::Regex(r) => Self::regex(&r),
        }
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            PatternSource::Glob(g) => write!(f, "glob `{}`", g),
            PatternSource::Regex(r) => write!(f, "regex /{}/", r),
        }
    }
}

impl fmt::Debug for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl PartialEq for UrlPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for UrlPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.source.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for UrlPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = PatternSource::deserialize(deserializer)?;
        UrlPattern::from_source(source).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_suffix() {
        let p = UrlPattern::glob("**/dashboard").unwrap();
        assert!(p.is_match("https://app.example.com/dashboard"));
        assert!(!p.is_match("https://app.example.com/dashboard/settings"));
        assert!(!p.is_match("https://app.example.com/login?next=/dashboard2"));
    }

    #[test]
    fn test_glob_contains() {
        let p = UrlPattern::glob("**/oauth2_consent**").unwrap();
        assert!(p.is_match(
            "https://idp.example.com/authenticationendpoint/oauth2_consent.do?app=hrm"
        ));
        assert!(!p.is_match("https://idp.example.com/oidc/oauth2_logout_consent.do"));
    }

    #[test]
    fn test_single_star_stops_at_slash() {
        let p = UrlPattern::glob("https://*/login").unwrap();
        assert!(p.is_match("https://app.example.com/login"));
        assert!(!p.is_match("https://app.example.com/a/login"));
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        let p = UrlPattern::glob("**/login.do?x=1").unwrap();
        assert!(p.is_match("https://idp/login.do?x=1"));
        assert!(!p.is_match("https://idp/loginXdo?x=1"));
    }

    #[test]
    fn test_regex_is_unanchored() {
        let p = UrlPattern::regex("/login").unwrap();
        assert!(p.is_match("http://localhost:3000/login"));
        assert!(p.is_match("http://localhost:3000/login?expired=1"));
        assert!(!p.is_match("http://localhost:3000/dashboard"));
    }

    #[test]
    fn test_deserialize_both_forms() {
        #[derive(Deserialize)]
        struct Holder {
            a: UrlPattern,
            b: UrlPattern,
        }
        let h: Holder = toml::from_str(
            r#"
            a = { glob = "**/dashboard" }
            b = { regex = "/login" }
            "#,
        )
        .unwrap();
        assert_eq!(h.a, UrlPattern::glob("**/dashboard").unwrap());
        assert_eq!(h.b.to_string(), "regex //login/");
    }

    #[test]
    fn test_deserialize_rejects_bad_regex() {
        #[derive(Debug, Deserialize)]
        struct Holder {
            #[allow(dead_code)]
            a: UrlPattern,
        }
        let err = toml::from_str::<Holder>(r#"a = { regex = "(" }"#).unwrap_err();
        assert!(err.to_string().contains("regex"), "{err}");
    }
}
