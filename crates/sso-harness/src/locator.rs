//! Version-tolerant element lookup
//!
//! A [`Locator`] is an ordered list of [`Strategy`] candidates. Lookup resolves
//! to the first candidate that matches a visible element, so one locator can
//! cover several deployed versions of the same page (for example the IdP's
//! `usernameUserInput` field and the older plain `name="username"` input).
//!
//! Strategies are resolved inside the page by a small script; see
//! [`Strategy::script`]. The same [`NameMatch`] rules are implemented on the
//! Rust side in [`NameMatch::matches`].

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ARIA roles understood by [`Strategy::Role`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AriaRole {
    Button,
    Textbox,
    Link,
}

/// How an accessible name or text content is compared
///
/// A bare string is a case-insensitive substring match over
/// whitespace-normalized text. Patterns also run in the page as JavaScript
/// `RegExp`s, so case-insensitivity comes from `ignore_case`; inline flag
/// groups such as `(?i)` are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NameMatch {
    Substring(String),
    Exact {
        exact: String,
    },
    Pattern {
        pattern: String,
        #[serde(default)]
        ignore_case: bool,
    },
}

impl NameMatch {
    pub fn pattern(pattern: impl Into<String>, ignore_case: bool) -> Self {
        NameMatch::Pattern {
            pattern: pattern.into(),
            ignore_case,
        }
    }

    pub fn exact(text: impl Into<String>) -> Self {
        NameMatch::Exact { exact: text.into() }
    }

    /// Compare against a candidate name
    pub fn matches(&self, candidate: &str) -> bool {
        let normalized = normalize(candidate);
        match self {
            NameMatch::Substring(needle) => normalized
                .to_lowercase()
                .contains(&normalize(needle).to_lowercase()),
            NameMatch::Exact { exact } => normalized == normalize(exact),
            NameMatch::Pattern {
                pattern,
                ignore_case,
            } => RegexBuilder::new(pattern)
                .case_insensitive(*ignore_case)
                .build()
                .map(|re| re.is_match(&normalized))
                .unwrap_or(false),
        }
    }

    fn validate(&self) -> Result<(), regex::Error> {
        if let NameMatch::Pattern {
            pattern,
            ignore_case,
        } = self
        {
            if has_inline_flags(pattern) {
                return Err(regex::Error::Syntax(format!(
                    "inline flag group in `{}`; set ignore_case instead",
                    pattern
                )));
            }
            RegexBuilder::new(pattern)
                .case_insensitive(*ignore_case)
                .build()?;
        }
        Ok(())
    }
}

impl From<&str> for NameMatch {
    fn from(s: &str) -> Self {
        NameMatch::Substring(s.to_string())
    }
}

impl fmt::Display for NameMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameMatch::Substring(s) => write!(f, "{:?}", s),
            NameMatch::Exact { exact } => write!(f, "exactly {:?}", exact),
            NameMatch::Pattern {
                pattern,
                ignore_case,
            } => write!(f, "/{}/{}", pattern, if *ignore_case { "i" } else { "" }),
        }
    }
}

/// `(?i)`, `(?x:...)`, `(?P<name>...)` and similar groups the page's `RegExp` rejects
fn has_inline_flags(pattern: &str) -> bool {
    let bytes = pattern.as_bytes();
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' => escaped = true,
            b'(' if bytes.get(i + 1) == Some(&b'?') => {
                if matches!(bytes.get(i + 2), Some(c) if c.is_ascii_alphabetic() || *c == b'-') {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One way of finding an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Strategy {
    /// CSS selector
    Css { selector: String },
    /// ARIA role plus accessible name
    Role { role: AriaRole, name: NameMatch },
    /// CSS selector whose element text matches
    HasText { selector: String, text: NameMatch },
    /// Innermost element whose text matches
    Text { text: NameMatch },
    /// Inner strategy resolved inside elements matching `region`
    Within {
        region: String,
        inner: Box<Strategy>,
    },
}

impl Strategy {
    pub fn css(selector: impl Into<String>) -> Self {
        Strategy::Css {
            selector: selector.into(),
        }
    }

    pub fn button(name: impl Into<NameMatch>) -> Self {
        Strategy::Role {
            role: AriaRole::Button,
            name: name.into(),
        }
    }

    pub fn has_text(selector: impl Into<String>, text: impl Into<NameMatch>) -> Self {
        Strategy::HasText {
            selector: selector.into(),
            text: text.into(),
        }
    }

    pub fn text(text: impl Into<NameMatch>) -> Self {
        Strategy::Text { text: text.into() }
    }

    pub fn within(region: impl Into<String>, inner: Strategy) -> Self {
        Strategy::Within {
            region: region.into(),
            inner: Box::new(inner),
        }
    }

    /// Reject name patterns that would never compile
    pub fn validate(&self) -> Result<(), regex::Error> {
        match self {
            Strategy::Css { .. } => Ok(()),
            Strategy::Role { name, .. } => name.validate(),
            Strategy::HasText { text, .. } | Strategy::Text { text } => text.validate(),
            Strategy::Within { inner, .. } => inner.validate(),
        }
    }

    /// Build a page script that resolves this strategy and runs `body`
    ///
    /// `body` sees `el`, the first visible matching element or `null`, along
    /// with `spec` and `resolve` for re-resolving later. Its `return` value
    /// is the script's result.
    pub fn script(&self, body: &str) -> String {
        // Serializing a strategy of plain strings and enums cannot fail.
        let spec = serde_json::to_string(self).unwrap_or_else(|_| "null".to_string());
        format!(
            "(() => {{\n{resolver}\nconst spec = {spec};\nconst el = resolve(spec, document);\n{body}\n}})()",
            resolver = RESOLVER_JS,
        )
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Css { selector } => write!(f, "css `{}`", selector),
            Strategy::Role { role, name } => write!(f, "{:?} named {}", role, name),
            Strategy::HasText { selector, text } => {
                write!(f, "`{}` with text {}", selector, text)
            }
            Strategy::Text { text } => write!(f, "text {}", text),
            Strategy::Within { region, inner } => write!(f, "{} within `{}`", inner, region),
        }
    }
}

/// Ordered candidate strategies; the first satisfied one wins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator {
    candidates: Vec<Strategy>,
}

impl Locator {
    pub fn new(candidates: Vec<Strategy>) -> Self {
        Self { candidates }
    }

    pub fn one(strategy: Strategy) -> Self {
        Self::new(vec![strategy])
    }

    pub fn candidates(&self) -> &[Strategy] {
        &self.candidates
    }

    pub fn validate(&self) -> Result<(), regex::Error> {
        self.candidates.iter().try_for_each(Strategy::validate)
    }
}

impl From<Strategy> for Locator {
    fn from(strategy: Strategy) -> Self {
        Locator::one(strategy)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, c) in self.candidates.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", c)?;
        }
        f.write_str("]")
    }
}

/// In-page resolver shared by every strategy script
const RESOLVER_JS: &str = r#"
const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
const nameMatches = (m, raw) => {
  const s = norm(raw);
  if (typeof m === 'string') return s.toLowerCase().includes(norm(m).toLowerCase());
  if (m.exact !== undefined) return s === norm(m.exact);
  return new RegExp(m.pattern, m.ignore_case ? 'i' : '').test(s);
};
const visible = (el) => {
  if (!el || !el.isConnected) return false;
  const style = window.getComputedStyle(el);
  if (style.visibility === 'hidden' || style.display === 'none') return false;
  return el.getClientRects().length > 0;
};
const ROLE_SELECTORS = {
  button: 'button, [role="button"], input[type="button"], input[type="submit"], input[type="reset"]',
  textbox: 'input:not([type]), input[type="text"], input[type="email"], input[type="search"], textarea, [role="textbox"]',
  link: 'a[href], [role="link"]',
};
const accessibleName = (el) => {
  const label = el.getAttribute('aria-label');
  if (label) return label;
  const by = el.getAttribute('aria-labelledby');
  if (by) return by.split(/\s+/).map((id) => { const n = document.getElementById(id); return n ? n.textContent : ''; }).join(' ');
  if (el.tagName === 'INPUT') {
    if (el.id) { const l = document.querySelector(`label[for="${CSS.escape(el.id)}"]`); if (l) return l.textContent; }
    return el.value || el.getAttribute('placeholder') || '';
  }
  return el.innerText || el.textContent || '';
};
const all = (root, selector) => Array.from(root.querySelectorAll(selector));
const candidates = (spec, root) => {
  switch (spec.by) {
    case 'css':
      return all(root, spec.selector);
    case 'role':
      return all(root, ROLE_SELECTORS[spec.role]).filter((el) => nameMatches(spec.name, accessibleName(el)));
    case 'has_text':
      return all(root, spec.selector).filter((el) => nameMatches(spec.text, el.innerText || el.textContent));
    case 'text': {
      const hits = all(root, 'body *').filter((el) => nameMatches(spec.text, el.innerText || el.textContent));
      return hits.filter((el) => !hits.some((other) => other !== el && el.contains(other)));
    }
    case 'within':
      return all(root, spec.region).flatMap((region) => candidates(spec.inner, region));
    default:
      return [];
  }
};
const resolve = (spec, root) => candidates(spec, root).find(visible) || null;
"#;
