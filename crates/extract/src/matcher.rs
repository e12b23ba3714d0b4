use regex::Regex;
use std::collections::BTreeMap;

use crate::keywords::KeywordTable;

/// Span-consuming priority: earlier variants claim text first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Category {
    Company,
    Regulator,
    Sector,
}

struct Pattern {
    regex: Regex,
    owner: usize,
    category: Category,
}

/// Keyword hit counts keyed by the owning table entry's index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordHits {
    pub companies: BTreeMap<usize, usize>,
    pub regulators: BTreeMap<usize, usize>,
    pub sectors: BTreeMap<usize, usize>,
    pub events: BTreeMap<usize, usize>,
}

impl KeywordHits {
    pub fn total(&self) -> usize {
        [&self.companies, &self.regulators, &self.sectors, &self.events]
            .iter()
            .flat_map(|m| m.values())
            .sum()
    }
}

/// Compiled, word-bounded matcher over a [`KeywordTable`].
pub struct KeywordMatcher {
    entity_patterns: Vec<Pattern>,
    event_patterns: Vec<Pattern>,
}

impl KeywordMatcher {
    pub fn new(table: &KeywordTable) -> Result<Self, regex::Error> {
        let mut entity_patterns = Vec::new();
        for (owner, company) in table.companies.iter().enumerate() {
            for form in company.surface_forms() {
                entity_patterns.push(Pattern {
                    regex: compile(form)?,
                    owner,
                    category: Category::Company,
                });
            }
        }
        for (owner, regulator) in table.regulators.iter().enumerate() {
            for keyword in std::iter::once(&regulator.name).chain(regulator.keywords.iter()) {
                entity_patterns.push(Pattern {
                    regex: compile(keyword)?,
                    owner,
                    category: Category::Regulator,
                });
            }
        }
        for (owner, sector) in table.sectors.iter().enumerate() {
            for keyword in &sector.keywords {
                entity_patterns.push(Pattern {
                    regex: compile(keyword)?,
                    owner,
                    category: Category::Sector,
                });
            }
        }

        let mut event_patterns = Vec::new();
        for (owner, event) in table.events.iter().enumerate() {
            for keyword in &event.keywords {
                event_patterns.push(Pattern {
                    regex: compile(keyword)?,
                    owner,
                    // Events only compete with each other
                    category: Category::Company,
                });
            }
        }

        Ok(Self {
            entity_patterns,
            event_patterns,
        })
    }

    pub fn scan(&self, text: &str) -> KeywordHits {
        let mut hits = KeywordHits::default();

        for (category, owner) in claim_spans(&self.entity_patterns, text) {
            let bucket = match category {
                Category::Company => &mut hits.companies,
                Category::Regulator => &mut hits.regulators,
                Category::Sector => &mut hits.sectors,
            };
            *bucket.entry(owner).or_insert(0) += 1;
        }
        for (_, owner) in claim_spans(&self.event_patterns, text) {
            *hits.events.entry(owner).or_insert(0) += 1;
        }

        hits
    }
}

/// Resolve overlapping matches: category priority, then longest match, then leftmost.
fn claim_spans(patterns: &[Pattern], text: &str) -> Vec<(Category, usize)> {
    let mut candidates: Vec<(Category, usize, usize, usize)> = Vec::new();
    for pattern in patterns {
        for m in pattern.regex.find_iter(text) {
            candidates.push((pattern.category, m.start(), m.end(), pattern.owner));
        }
    }

    candidates.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then((b.2 - b.1).cmp(&(a.2 - a.1)))
            .then(a.1.cmp(&b.1))
            .then(a.3.cmp(&b.3))
    });

    let mut taken: Vec<(usize, usize)> = Vec::new();
    let mut claimed = Vec::new();
    for (category, start, end, owner) in candidates {
        if taken.iter().any(|&(s, e)| start < e && s < end) {
            continue;
        }
        taken.push((start, end));
        claimed.push((category, owner));
    }
    claimed
}

/// Acronyms ("IT", "RBI", "Q3") match case-sensitively, everything else ignores case.
fn is_acronym(keyword: &str) -> bool {
    let mut letters = keyword.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(|c| c.is_uppercase())
}

fn compile(keyword: &str) -> Result<Regex, regex::Error> {
    let keyword = keyword.trim();
    let body = keyword
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");

    let starts_word = keyword.chars().next().is_some_and(|c| c.is_alphanumeric());
    let ends_word = keyword.chars().last().is_some_and(|c| c.is_alphanumeric());

    let pattern = format!(
        "{}{}{}{}",
        if is_acronym(keyword) { "" } else { "(?i)" },
        if starts_word { r"\b" } else { "" },
        body,
        if ends_word { r"\b" } else { "" },
    );
    Regex::new(&pattern)
}
