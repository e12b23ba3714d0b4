use std::collections::HashMap;

use crate::keywords::KeywordTable;

/// What a tagger organization span turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Company(String),
    Regulator(String),
    Unknown(String),
}

/// Maps free-form organization names onto the keyword table's canonical names.
pub struct EntityNormalizer {
    /// Normalized surface form -> canonical company name
    companies: HashMap<String, String>,
    /// Normalized keyword -> regulator name
    regulators: HashMap<String, String>,
}

impl EntityNormalizer {
    pub fn new(table: &KeywordTable) -> Self {
        let mut companies = HashMap::new();
        for company in &table.companies {
            for form in company.surface_forms() {
                companies.insert(Self::normalize(form), company.name.clone());
            }
        }

        let mut regulators = HashMap::new();
        for regulator in &table.regulators {
            for keyword in std::iter::once(&regulator.name).chain(regulator.keywords.iter()) {
                regulators.insert(Self::normalize(keyword), regulator.name.clone());
            }
        }

        Self { companies, regulators }
    }

    /// Normalize entity name: lowercase, drop common punctuation, collapse spaces
    pub fn normalize(name: &str) -> String {
        name.to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '.' | ',' | '!' | '?' | ';' | ':' | '\''))
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn resolve_organization(&self, span: &str) -> Resolved {
        let key = Self::normalize(span);

        if let Some(name) = self.regulators.get(&key) {
            return Resolved::Regulator(name.clone());
        }
        if let Some(name) = self.companies.get(&key) {
            return Resolved::Company(name.clone());
        }

        // "HDFC Bank Ltd" -> "HDFC Bank": the longest known form contained in the span.
        // The reverse direction is not used, "Bank" alone must not become a company.
        let span_words: Vec<&str> = key.split_whitespace().collect();
        if let Some(name) = longest_contained(&self.regulators, &span_words) {
            return Resolved::Regulator(name.to_string());
        }
        match longest_contained(&self.companies, &span_words) {
            Some(name) => Resolved::Company(name.to_string()),
            None => Resolved::Unknown(span.trim().to_string()),
        }
    }
}

fn longest_contained<'a>(forms: &'a HashMap<String, String>, span_words: &[&str]) -> Option<&'a str> {
    forms
        .iter()
        .filter(|(form, _)| contains_words(span_words, form))
        .max_by(|a, b| a.0.len().cmp(&b.0.len()).then(b.0.cmp(a.0)))
        .map(|(_, name)| name.as_str())
}

/// Whether `needle`'s words appear contiguously in `haystack`.
fn contains_words(haystack: &[&str], needle: &str) -> bool {
    let needle: Vec<&str> = needle.split_whitespace().collect();
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(EntityNormalizer::normalize("Dr. Reddy's"), "dr reddys");
        assert_eq!(EntityNormalizer::normalize("  HDFC   Bank! "), "hdfc bank");
    }

    #[test]
    fn test_resolves_known_forms() {
        let normalizer = EntityNormalizer::new(&KeywordTable::default());

        assert_eq!(
            normalizer.resolve_organization("Dr Reddy's"),
            Resolved::Company("Dr. Reddy's".to_string())
        );
        assert_eq!(
            normalizer.resolve_organization("HDFC Bank Ltd."),
            Resolved::Company("HDFC Bank".to_string())
        );
        assert_eq!(
            normalizer.resolve_organization("the Reserve Bank of India"),
            Resolved::Regulator("RBI".to_string())
        );
        assert_eq!(
            normalizer.resolve_organization("SEBI"),
            Resolved::Regulator("SEBI".to_string())
        );
    }

    #[test]
    fn test_partial_span_is_not_promoted() {
        let normalizer = EntityNormalizer::new(&KeywordTable::default());
        assert_eq!(
            normalizer.resolve_organization("Bank"),
            Resolved::Unknown("Bank".to_string())
        );
        assert_eq!(
            normalizer.resolve_organization("Acme Holdings"),
            Resolved::Unknown("Acme Holdings".to_string())
        );
    }
}
