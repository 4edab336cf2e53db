use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// 参与上下文的前置 (reading, value) 对数量。
pub const CONTEXT_WINDOW: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReadingValue {
    pub reading: String,
    pub value: String,
}

impl ReadingValue {
    pub fn new(reading: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            reading: reading.into(),
            value: value.into(),
        }
    }
}

/// Opaque, exact-match key for the reading/word history around a composition
/// point. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextKey(Arc<str>);

impl ContextKey {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(Arc::from(raw.as_ref()))
    }

    /// Builds `(r1,v1)-(r2,v2)-reading`, using only the last
    /// [`CONTEXT_WINDOW`] preceding pairs and `()` for missing slots.
    /// Following pairs are appended after `|`.
    ///
    /// Readings and values are assumed free of `(`, `)`, `,`, `-` and `|`;
    /// windows containing them may collide with other windows.
    pub fn from_window(
        preceding: &[ReadingValue],
        reading: &str,
        following: &[ReadingValue],
    ) -> Self {
        let start = preceding.len().saturating_sub(CONTEXT_WINDOW);
        let window = &preceding[start..];

        let mut raw = String::new();
        for _ in window.len()..CONTEXT_WINDOW {
            raw.push_str("()-");
        }
        for pair in window {
            push_pair(&mut raw, pair);
            raw.push('-');
        }
        raw.push_str(reading);

        if !following.is_empty() {
            raw.push('|');
            for (i, pair) in following.iter().enumerate() {
                if i > 0 {
                    raw.push('-');
                }
                push_pair(&mut raw, pair);
            }
        }

        Self(Arc::from(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn push_pair(raw: &mut String, pair: &ReadingValue) {
    raw.push('(');
    raw.push_str(&pair.reading);
    raw.push(',');
    raw.push_str(&pair.value);
    raw.push(')');
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContextKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ContextKey {
    fn from(raw: String) -> Self {
        Self(Arc::from(raw))
    }
}
