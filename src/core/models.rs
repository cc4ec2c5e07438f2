use std::fmt;

use serde::Serialize;

/// Lowest severity a record may carry.
pub const MIN_SEVERITY: u8 = 1;
/// Highest severity a record may carry.
pub const MAX_SEVERITY: u8 = 5;
/// Neutral severity used whenever the model gives nothing usable.
pub const DEFAULT_SEVERITY: u8 = 3;

/// Word cap for summaries, applied before [`MAX_SUMMARY_CHARS`].
pub const MAX_SUMMARY_WORDS: usize = 60;
pub const MAX_SUMMARY_CHARS: usize = 500;

/// Closed set of complaint categories. `Other` is the catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Harassment,
    Discrimination,
    Access,
    Noise,
    PropertyDamage,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Harassment,
        Category::Discrimination,
        Category::Access,
        Category::Noise,
        Category::PropertyDamage,
        Category::Other,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Harassment => "harassment",
            Category::Discrimination => "discrimination",
            Category::Access => "access",
            Category::Noise => "noise",
            Category::PropertyDamage => "property_damage",
            Category::Other => "other",
        }
    }

    /// Exact match against the canonical labels. Callers normalize case and
    /// whitespace first.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured outcome of classifying one complaint.
///
/// Records returned by [`Classifier`](crate::Classifier) always keep
/// `severity` within `[MIN_SEVERITY, MAX_SEVERITY]` and `summary` within the
/// word and character caps. Records assembled by hand carry no such guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub category: Category,
    pub severity: u8,
    pub summary: String,
}
