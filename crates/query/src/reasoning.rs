use std::collections::BTreeMap;

use extract::{EntityKind, EntitySet, StockImpact};

use crate::scoring::{EntityMatch, MatchPath};

/// Why one result was returned, e.g.
/// `semantic similarity 0.82; company: HDFC Bank; strongest targeted impact HDFCBANK 1.00 (direct)`.
pub fn explain_result(
    cosine: f32,
    semantic_hit: bool,
    found: &EntityMatch,
    strongest: Option<&StockImpact>,
) -> String {
    let mut parts = Vec::new();

    if semantic_hit {
        parts.push(format!("semantic similarity {:.2}", cosine));
    }
    if found.paths.contains(&MatchPath::Company) {
        parts.push(format!("company: {}", join(found.matched.get(EntityKind::Company))));
    }
    if found.paths.contains(&MatchPath::Sector) {
        let direct: Vec<&String> = found
            .matched
            .sectors
            .iter()
            .filter(|s| !found.expansions.iter().any(|(sector, _)| sector == *s))
            .collect();
        parts.push(format!("sector: {}", join(direct)));
    }
    if found.paths.contains(&MatchPath::SectorExpansion) {
        let via: Vec<String> = found
            .expansions
            .iter()
            .map(|(sector, company)| format!("{} via {}", sector, company))
            .collect();
        parts.push(format!("sector expansion: {}", via.join(", ")));
    }
    if found.paths.contains(&MatchPath::Regulator) {
        parts.push(format!("regulator: {}", join(found.matched.get(EntityKind::Regulator))));
    }
    if found.paths.contains(&MatchPath::Event) {
        parts.push(format!("event: {}", join(found.matched.get(EntityKind::Event))));
    }
    if let Some(impact) = strongest {
        parts.push(format!(
            "strongest targeted impact {} {:.2} ({})",
            impact.symbol,
            impact.confidence,
            basis_label(impact)
        ));
    }

    if parts.is_empty() {
        "weak semantic match".to_string()
    } else {
        parts.join("; ")
    }
}

/// One-line summary of what the query asked and which paths produced results.
pub fn explain_query(
    entities: &EntitySet,
    path_counts: &BTreeMap<MatchPath, usize>,
    total_results: usize,
    relevance_floor: f32,
) -> String {
    let asked = if entities.is_empty() {
        "No known entities in query, ranked by semantic similarity".to_string()
    } else {
        let described: Vec<String> = EntityKind::ALL
            .iter()
            .filter(|kind| !entities.get(**kind).is_empty())
            .map(|kind| format!("{} {}", plural(*kind), join(entities.get(*kind))))
            .collect();
        format!("Query mentions {}", described.join("; "))
    };

    if total_results == 0 {
        return format!("{}. No stored article cleared the relevance floor of {:.2}.", asked, relevance_floor);
    }

    let paths: Vec<String> = path_counts
        .iter()
        .map(|(path, count)| format!("{} via {}", count, path.label()))
        .collect();
    format!("{}. Found {} result(s): {}.", asked, total_results, paths.join(", "))
}

fn plural(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Company => "companies",
        EntityKind::Sector => "sectors",
        EntityKind::Regulator => "regulators",
        EntityKind::Person => "people",
        EntityKind::Event => "events",
    }
}

fn basis_label(impact: &StockImpact) -> &'static str {
    match impact.basis {
        extract::ImpactBasis::Direct => "direct",
        extract::ImpactBasis::Sector => "sector",
        extract::ImpactBasis::Regulator => "regulator",
    }
}

fn join<'a>(values: impl IntoIterator<Item = &'a String>) -> String {
    values.into_iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::ImpactBasis;

    #[test]
    fn test_explain_result_names_paths() {
        let mut found = EntityMatch::default();
        found.matched.insert(EntityKind::Company, "HDFC Bank");
        found.paths.insert(MatchPath::Company);
        found.matched.insert(EntityKind::Sector, "Banking");
        found.paths.insert(MatchPath::SectorExpansion);
        found.expansions.push(("Banking".to_string(), "HDFC Bank".to_string()));

        let impact = StockImpact {
            symbol: "HDFCBANK".to_string(),
            confidence: 1.0,
            basis: ImpactBasis::Direct,
            reason: String::new(),
        };
        let text = explain_result(0.823, true, &found, Some(&impact));
        assert_eq!(
            text,
            "semantic similarity 0.82; company: HDFC Bank; sector expansion: Banking via HDFC Bank; \
             strongest targeted impact HDFCBANK 1.00 (direct)"
        );
    }

    #[test]
    fn test_explain_query() {
        let mut entities = EntitySet::default();
        entities.insert(EntityKind::Regulator, "RBI");
        let counts = BTreeMap::from([(MatchPath::Semantic, 2), (MatchPath::Regulator, 1)]);

        assert_eq!(
            explain_query(&entities, &counts, 2, 0.25),
            "Query mentions regulators RBI. Found 2 result(s): 2 via semantic, 1 via regulator."
        );
        assert!(explain_query(&EntitySet::default(), &BTreeMap::new(), 0, 0.25).contains("relevance floor of 0.25"));
    }
}
