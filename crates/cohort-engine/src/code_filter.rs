//! Code-pattern predicates.
//!
//! A [`CodeFilter`] compiles a list of code patterns into a predicate over
//! code strings. The same predicate type selects diagnosis codes, procedure
//! codes and drug product names.

use std::fmt;

/// Wildcard markers. Both match any run of characters, including none.
const WILDCARDS: [char; 2] = ['*', '%'];

/// Sub-code separator of ICD-style codes.
const SEPARATOR: char = '.';

/// A compiled set of code patterns.
///
/// Pattern rules for codes ([`CodeFilter::new`]):
///
/// - a pattern with neither a wildcard (`*`, `%`) nor a separator (`.`)
///   matches by equality;
/// - a wildcard matches any (possibly empty) run of characters, as SQL
///   `LIKE` with `%` does;
/// - a pattern with a separator but no wildcard matches as a prefix;
/// - a separator directly before a trailing wildcard is optional, so the
///   parent code itself matches.
///
/// An empty pattern list matches nothing. Matching is case sensitive.
///
/// # Examples
///
/// ```
/// use cohort_engine::CodeFilter;
///
/// let filter = CodeFilter::new(["I10.*", "E11"]);
/// assert!(filter.matches("I10"));
/// assert!(filter.matches("I10.9"));
/// assert!(filter.matches("E11"));
/// assert!(!filter.matches("I11"));
/// assert!(!filter.matches("E11.9"));
///
/// assert!(!CodeFilter::new(Vec::<String>::new()).matches("I10"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct CodeFilter {
    source: Vec<String>,
    patterns: Vec<Pattern>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Exact(String),
    Like(LikePattern),
}

impl Pattern {
    fn matches(&self, value: &str) -> bool {
        match self {
            Self::Exact(code) => code == value,
            Self::Like(like) => like.matches(value),
        }
    }
}

/// A `LIKE` pattern split on its wildcards.
///
/// `segments` are the literal pieces between wildcards. `anchored_start` and
/// `anchored_end` are false when the pattern starts or ends with a wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LikePattern {
    segments: Vec<String>,
    anchored_start: bool,
    anchored_end: bool,
}

impl LikePattern {
    fn compile(pattern: &str) -> Self {
        let segments: Vec<String> = pattern
            .split(|c| WILDCARDS.contains(&c))
            .map(str::to_string)
            .collect();
        let anchored_start = !pattern.starts_with(WILDCARDS);
        let anchored_end = !pattern.ends_with(WILDCARDS);
        Self {
            segments: segments.into_iter().filter(|s| !s.is_empty()).collect(),
            anchored_start,
            anchored_end,
        }
    }

    fn matches(&self, value: &str) -> bool {
        let mut rest = value;
        let last = self.segments.len();

        for (i, segment) in self.segments.iter().enumerate() {
            let first = i == 0;
            let final_segment = i + 1 == last;

            if first && self.anchored_start {
                match rest.strip_prefix(segment.as_str()) {
                    Some(remaining) => rest = remaining,
                    None => return false,
                }
                if final_segment && self.anchored_end {
                    return rest.is_empty();
                }
                continue;
            }

            if final_segment && self.anchored_end {
                return rest.ends_with(segment.as_str());
            }

            match rest.find(segment.as_str()) {
                Some(pos) => rest = &rest[pos + segment.len()..],
                None => return false,
            }
        }

        if self.segments.is_empty() {
            // Only wildcards (or nothing at all)
            return !(self.anchored_start && self.anchored_end) || value.is_empty();
        }

        !self.anchored_end || rest.is_empty()
    }
}

fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(WILDCARDS)
}

impl CodeFilter {
    /// Compiles diagnosis or procedure code patterns.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let source: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .collect();

        let mut compiled = Vec::with_capacity(source.len());
        for pattern in &source {
            compile_code_pattern(pattern, &mut compiled);
        }

        Self {
            source,
            patterns: compiled,
        }
    }

    /// Compiles drug product-name patterns.
    ///
    /// Only the wildcard markers switch to pattern matching, since product
    /// names legitimately contain dots. Empty names never match.
    pub fn product_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let source: Vec<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();
        let patterns = source
            .iter()
            .map(|name| {
                if has_wildcard(name) {
                    Pattern::Like(LikePattern::compile(name))
                } else {
                    Pattern::Exact(name.clone())
                }
            })
            .collect();

        Self { source, patterns }
    }

    /// Returns true if `value` matches any pattern.
    pub fn matches(&self, value: &str) -> bool {
        if value.trim().is_empty() {
            return false;
        }
        self.patterns.iter().any(|p| p.matches(value))
    }

    /// Returns true if the filter matches nothing.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns the patterns as configured.
    pub fn patterns(&self) -> &[String] {
        &self.source
    }

    /// Returns the codes to look up directly when every pattern is exact.
    pub fn exact_codes(&self) -> Option<Vec<&str>> {
        self.patterns
            .iter()
            .map(|p| match p {
                Pattern::Exact(code) => Some(code.as_str()),
                Pattern::Like(_) => None,
            })
            .collect()
    }
}

fn compile_code_pattern(pattern: &str, out: &mut Vec<Pattern>) {
    if pattern.is_empty() {
        return;
    }

    if !has_wildcard(pattern) {
        if pattern.contains(SEPARATOR) {
            out.push(Pattern::Like(LikePattern::compile(&format!("{pattern}%"))));
        } else {
            out.push(Pattern::Exact(pattern.to_string()));
        }
        return;
    }

    // `X.*` also matches the parent code `X`
    let trimmed = pattern.trim_end_matches(WILDCARDS);
    if trimmed.len() < pattern.len() {
        if let Some(parent) = trimmed.strip_suffix(SEPARATOR) {
            if !parent.is_empty() {
                out.push(if has_wildcard(parent) {
                    Pattern::Like(LikePattern::compile(parent))
                } else {
                    Pattern::Exact(parent.to_string())
                });
            }
        }
    }

    out.push(Pattern::Like(LikePattern::compile(pattern)));
}

impl fmt::Debug for CodeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CodeFilter").field(&self.source).finish()
    }
}

impl fmt::Display for CodeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.source.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_code_matches_by_equality() {
        let filter = CodeFilter::new(["E282"]);
        assert!(filter.matches("E282"));
        assert!(!filter.matches("E2820"));
        assert!(!filter.matches("e282"));
    }

    #[test]
    fn test_separator_wildcard_matches_parent_and_children() {
        let filter = CodeFilter::new(["I10.*"]);
        assert!(filter.matches("I10"));
        assert!(filter.matches("I10.0"));
        assert!(filter.matches("I10.9"));
        assert!(!filter.matches("I11"));
        assert!(!filter.matches("I100"));
        assert!(!filter.matches("I11.0"));
    }

    #[test]
    fn test_dotted_code_without_wildcard_is_prefix() {
        let filter = CodeFilter::new(["E11.9"]);
        assert!(filter.matches("E11.9"));
        assert!(filter.matches("E11.91"));
        assert!(!filter.matches("E11.8"));
        assert!(!filter.matches("E11"));
    }

    #[test]
    fn test_trailing_wildcard_without_separator() {
        let filter = CodeFilter::new(["E11*"]);
        assert!(filter.matches("E11"));
        assert!(filter.matches("E119"));
        assert!(filter.matches("E11.65"));
        assert!(!filter.matches("E1"));
    }

    #[test]
    fn test_embedded_and_leading_wildcards() {
        let filter = CodeFilter::new(["O24.%1"]);
        assert!(filter.matches("O24.41"));
        assert!(filter.matches("O24.1"));
        assert!(!filter.matches("O24.42"));

        let filter = CodeFilter::new(["%.81"]);
        assert!(filter.matches("E88.81"));
        assert!(!filter.matches("E88.810"));
    }

    #[test]
    fn test_empty_filter_matches_nothing() {
        let filter = CodeFilter::new(Vec::<&str>::new());
        assert!(filter.is_empty());
        assert!(!filter.matches("I10"));
        assert!(!filter.matches(""));
    }

    #[test]
    fn test_product_names_ignore_separator() {
        let filter = CodeFilter::product_names(["METFORMIN HCL 500MG", "LISINOPRIL%"]);
        assert!(filter.matches("METFORMIN HCL 500MG"));
        assert!(!filter.matches("METFORMIN HCL 500MG TAB"));
        assert!(filter.matches("LISINOPRIL 10 MG"));

        let dotted = CodeFilter::product_names(["INSULIN 0.5ML"]);
        assert!(dotted.matches("INSULIN 0.5ML"));
        assert!(!dotted.matches("INSULIN 0.5ML PEN"));
    }

    #[test]
    fn test_blank_values_never_match() {
        let filter = CodeFilter::product_names(["%"]);
        assert!(filter.matches("ANYTHING"));
        assert!(!filter.matches(""));
        assert!(!filter.matches("  "));
    }

    #[test]
    fn test_exact_codes_only_when_all_exact() {
        assert_eq!(
            CodeFilter::new(["E282", "N97"]).exact_codes(),
            Some(vec!["E282", "N97"])
        );
        assert_eq!(CodeFilter::new(["E282", "N97.*"]).exact_codes(), None);
    }

    #[test]
    fn test_display_lists_patterns() {
        let filter = CodeFilter::new(["I10", "I11.*"]);
        assert_eq!(filter.to_string(), "[I10, I11.*]");
        assert_eq!(filter.patterns().len(), 2);
    }
}
