use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

/// A fuzzy name query used to highlight matching cells.
pub struct NameQuery {
    needle: String,
    matcher: SkimMatcherV2,
}

impl NameQuery {
    /// `None` for a blank query.
    pub fn new(needle: &str) -> Option<Self> {
        let needle = needle.trim();
        if needle.is_empty() {
            return None;
        }
        Some(Self {
            needle: needle.to_string(),
            matcher: SkimMatcherV2::default().ignore_case(),
        })
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }

    pub fn matches(&self, name: &str) -> bool {
        self.matcher.fuzzy_match(name, &self.needle).is_some()
    }
}

impl std::fmt::Debug for NameQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameQuery").field("needle", &self.needle).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needle_is_trimmed() {
        let q = NameQuery::new("  rome ").unwrap();
        assert_eq!(q.needle(), "rome");
        assert!(q.matches("Rome"));
    }

    #[test]
    fn blank_query_is_none() {
        assert!(NameQuery::new("   ").is_none());
    }

    #[test]
    fn matches_subsequences_ignoring_case() {
        let q = NameQuery::new("ordr").unwrap();
        assert!(q.matches("Orders"));
        assert!(!q.matches("Clients"));
        assert!(NameQuery::new("cli").unwrap().matches("clients"));
    }
}
