use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ClipError, Result};
use crate::geometric::raster::Legend;
use crate::geometric::summary::FrequencyTable;

/// Category code -> descriptive label, codes unique
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeLookup(BTreeMap<i32, String>);

impl CodeLookup {
    /// Fails with `DuplicateCode` on the first repeated code
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (i32, S)>,
        S: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (code, label) in pairs {
            if map.insert(code, label.into()).is_some() {
                return Err(ClipError::DuplicateCode(code));
            }
        }
        Ok(CodeLookup(map))
    }

    /// Use a raster legend's category names as labels, unnamed entries skipped
    pub fn from_legend(legend: &Legend) -> Self {
        CodeLookup(
            legend
                .iter()
                .filter(|(_, entry)| !entry.name.is_empty())
                .map(|(code, entry)| (code, entry.name.clone()))
                .collect(),
        )
    }

    pub fn label(&self, code: i32) -> Option<&str> {
        self.0.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What to do with a category missing from the lookup table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingCodePolicy {
    /// Fail with `MissingCode`
    #[default]
    Strict,
    /// Label the category with its numeric code
    Lenient,
}

/// A category's label and share of the clipped area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledShare {
    pub code: i32,
    pub label: String,
    pub count: u64,
    pub percentage: f64,
}

/// Attach labels to every row of `table`.
///
/// Output is sorted by descending percentage, ties by ascending code.
pub fn resolve(
    table: &FrequencyTable,
    lookup: &CodeLookup,
    policy: MissingCodePolicy,
) -> Result<Vec<LabeledShare>> {
    let mut shares = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let label = match (lookup.label(row.code), policy) {
            (Some(label), _) => label.to_string(),
            (None, MissingCodePolicy::Lenient) => row.code.to_string(),
            (None, MissingCodePolicy::Strict) => return Err(ClipError::MissingCode(row.code)),
        };
        shares.push(LabeledShare {
            code: row.code,
            label,
            count: row.count,
            percentage: row.percentage,
        });
    }

    shares.sort_by(|a, b| {
        b.percentage
            .total_cmp(&a.percentage)
            .then(a.code.cmp(&b.code))
    });
    Ok(shares)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(counts: &[(i32, u64)]) -> FrequencyTable {
        let counts: BTreeMap<i32, u64> = counts.iter().copied().collect();
        FrequencyTable::from_counts(&counts, 1.0)
    }

    fn lookup() -> CodeLookup {
        CodeLookup::from_pairs(vec![
            (1, "Water"),
            (2, "Forest"),
            (3, "Cropland"),
            (4, "Urban"),
        ])
        .unwrap()
    }

    #[test]
    fn test_resolve_sorts_by_percentage() {
        let shares = resolve(&table(&[(1, 3), (2, 2), (3, 4)]), &lookup(), MissingCodePolicy::Strict)
            .unwrap();
        let labels: Vec<&str> = shares.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Cropland", "Water", "Forest"]);
        assert_eq!(shares[0].percentage, 44.4);
        assert_eq!(shares[0].count, 4);
    }

    #[test]
    fn test_resolve_ties_break_on_code() {
        let shares = resolve(
            &table(&[(4, 5), (2, 5), (3, 1), (1, 5)]),
            &lookup(),
            MissingCodePolicy::Strict,
        )
        .unwrap();
        let codes: Vec<i32> = shares.iter().map(|s| s.code).collect();
        assert_eq!(codes, vec![1, 2, 4, 3]);
        assert!(shares
            .windows(2)
            .all(|w| w[0].percentage >= w[1].percentage));
    }

    #[test]
    fn test_resolve_strict_rejects_unknown_code() {
        let err = resolve(&table(&[(1, 3), (8, 1), (9, 1)]), &lookup(), MissingCodePolicy::Strict)
            .unwrap_err();
        assert_eq!(err, ClipError::MissingCode(8));
    }

    #[test]
    fn test_resolve_lenient_uses_code_as_label() {
        let shares = resolve(&table(&[(1, 3), (8, 1)]), &lookup(), MissingCodePolicy::Lenient)
            .unwrap();
        assert_eq!(shares[0].label, "Water");
        assert_eq!(shares[1].label, "8");
        assert_eq!(shares[1].percentage, 25.0);
    }

    #[test]
    fn test_resolve_empty_table() {
        let shares = resolve(&FrequencyTable::default(), &lookup(), MissingCodePolicy::Strict)
            .unwrap();
        assert!(shares.is_empty());
    }

    #[test]
    fn test_lookup_rejects_duplicate_codes() {
        let err = CodeLookup::from_pairs(vec![(1, "Water"), (1, "Lake")]).unwrap_err();
        assert_eq!(err, ClipError::DuplicateCode(1));
    }

    #[test]
    fn test_lookup_from_legend() {
        let mut legend = Legend::new();
        legend.insert(11, "LCZ A: Dense trees", "#006700");
        legend.insert(17, "LCZ G: Water", "#6d67fd");
        legend.insert(18, "", "#fafafa");
        let lookup = CodeLookup::from_legend(&legend);
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.label(17), Some("LCZ G: Water"));
    }

    #[test]
    fn test_policy_serde() {
        let policy: MissingCodePolicy = serde_json::from_str("\"lenient\"").unwrap();
        assert_eq!(policy, MissingCodePolicy::Lenient);
        assert_eq!(MissingCodePolicy::default(), MissingCodePolicy::Strict);
    }
}
