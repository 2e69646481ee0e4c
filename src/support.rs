//! Support table: stable categorical-feature encoding.
//!
//! Lifecycle is a one-way state machine. The table accepts inserts while
//! `Open`, may collapse near-duplicate categories into canonical
//! representatives (`Reduced`), and becomes read-only once `gen_indexes`
//! assigns the final sorted ordinal codes (`Indexed`).

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::ExtractError;
use crate::types::{CategoryCode, CategoryValue, DomainName, FeatureName};

/// Lifecycle state of a support table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableState {
    /// Accepting inserts.
    Open,
    /// Category aliases collapsed; still accepting inserts and reductions.
    Reduced,
    /// Terminal: codes assigned, table is read-only.
    Indexed,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct CategorySet {
    values: BTreeSet<CategoryValue>,
    codes: BTreeMap<CategoryValue, CategoryCode>,
}

/// Mapping from symbolic category values to stable numeric codes.
///
/// Structure: domain name → feature name → category set. Codes are dense
/// ordinals assigned in sorted order of the surviving values, so the same
/// extraction input always produces the same encoding.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SupportTable {
    state: TableState,
    domains: IndexMap<DomainName, IndexMap<FeatureName, CategorySet>>,
}

impl SupportTable {
    /// Create an empty table in the `Open` state.
    pub fn new() -> Self {
        Self {
            state: TableState::Open,
            domains: IndexMap::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TableState {
        self.state
    }

    /// Register `value` for `feature` under `domain` if unseen.
    ///
    /// Idempotent; inserting an existing value changes nothing. Errors once
    /// the table is `Indexed`.
    pub fn insert(
        &mut self,
        domain: &str,
        feature: &str,
        value: &str,
    ) -> Result<(), ExtractError> {
        if self.state == TableState::Indexed {
            return Err(ExtractError::StateViolation(format!(
                "insert of '{value}' into indexed table"
            )));
        }
        self.domains
            .entry(domain.to_string())
            .or_default()
            .entry(feature.to_string())
            .or_default()
            .values
            .insert(value.to_string());
        Ok(())
    }

    /// Collapse the values of `feature` in `domain` through `equivalence`.
    ///
    /// Each value is replaced by its canonical representative; groups that
    /// map to the same representative survive as a single category.
    /// Idempotent when the values are already collapsed. Errors once the
    /// table is `Indexed`.
    pub fn reduce_categories(
        &mut self,
        domain: &str,
        feature: &str,
        equivalence: impl Fn(&str) -> CategoryValue,
    ) -> Result<(), ExtractError> {
        if self.state == TableState::Indexed {
            return Err(ExtractError::StateViolation(format!(
                "reduce_categories on '{domain}/{feature}' after indexing"
            )));
        }
        if let Some(set) = self
            .domains
            .get_mut(domain)
            .and_then(|features| features.get_mut(feature))
        {
            set.values = set.values.iter().map(|value| equivalence(value)).collect();
        }
        self.state = TableState::Reduced;
        Ok(())
    }

    /// Assign each surviving category a dense ordinal code in sorted order.
    ///
    /// Terminal transition; the table rejects further mutation afterwards.
    pub fn gen_indexes(&mut self) -> Result<(), ExtractError> {
        if self.state == TableState::Indexed {
            return Err(ExtractError::StateViolation(
                "gen_indexes on an already indexed table".into(),
            ));
        }
        for features in self.domains.values_mut() {
            for set in features.values_mut() {
                set.codes = set
                    .values
                    .iter()
                    .enumerate()
                    .map(|(code, value)| (value.clone(), code as CategoryCode))
                    .collect();
            }
        }
        self.state = TableState::Indexed;
        Ok(())
    }

    /// Code for `value`, falling back to the nearest known value when unseen.
    ///
    /// Exact hits return their code. For unseen values the nearest known
    /// value under natural ordering wins: numeric distance when both sides
    /// parse as numbers, otherwise the closest sorted neighbor; ties break
    /// toward the lower value. Total over any input universe — it fails only
    /// when the feature holds no values at all, or before `gen_indexes`.
    pub fn get_close_value(
        &self,
        domain: &str,
        feature: &str,
        value: &str,
    ) -> Result<CategoryCode, ExtractError> {
        if self.state != TableState::Indexed {
            return Err(ExtractError::StateViolation(format!(
                "get_close_value on '{domain}/{feature}' before gen_indexes"
            )));
        }
        let set = self
            .domains
            .get(domain)
            .and_then(|features| features.get(feature))
            .filter(|set| !set.codes.is_empty())
            .ok_or_else(|| ExtractError::EmptyDomain {
                domain: domain.to_string(),
                feature: feature.to_string(),
            })?;
        if let Some(code) = set.codes.get(value) {
            return Ok(*code);
        }
        let nearest = nearest_value(&set.codes, value);
        Ok(set.codes[nearest])
    }

    /// Sorted feature names of `domain` (stable tensor layout).
    pub fn get_sorted_keys(&self, domain: &str) -> Vec<FeatureName> {
        let mut keys: Vec<FeatureName> = self
            .domains
            .get(domain)
            .map(|features| features.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Full `domain → feature → value → code` serialization.
    pub fn to_dict(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        for (domain, features) in &self.domains {
            let mut feature_map = serde_json::Map::new();
            for (feature, set) in features {
                let codes: serde_json::Map<String, serde_json::Value> = set
                    .codes
                    .iter()
                    .map(|(value, code)| (value.clone(), serde_json::Value::from(*code)))
                    .collect();
                feature_map.insert(feature.clone(), serde_json::Value::Object(codes));
            }
            out.insert(domain.clone(), serde_json::Value::Object(feature_map));
        }
        serde_json::Value::Object(out)
    }

    /// Restore a table from its `to_dict` form. Restored tables are
    /// `Indexed` and read-only.
    pub fn from_dict(dict: &serde_json::Value) -> Result<Self, ExtractError> {
        let domains_in = dict
            .as_object()
            .ok_or_else(|| ExtractError::Decode("support table dict is not an object".into()))?;
        let mut domains = IndexMap::new();
        for (domain, features_in) in domains_in {
            let features_in = features_in.as_object().ok_or_else(|| {
                ExtractError::Decode(format!("support domain '{domain}' is not an object"))
            })?;
            let mut features = IndexMap::new();
            for (feature, codes_in) in features_in {
                let codes_in = codes_in.as_object().ok_or_else(|| {
                    ExtractError::Decode(format!("support feature '{feature}' is not an object"))
                })?;
                let mut set = CategorySet::default();
                for (value, code) in codes_in {
                    let code = code.as_u64().ok_or_else(|| {
                        ExtractError::Decode(format!("code for '{value}' is not an integer"))
                    })? as CategoryCode;
                    set.values.insert(value.clone());
                    set.codes.insert(value.clone(), code);
                }
                features.insert(feature.clone(), set);
            }
            domains.insert(domain.clone(), features);
        }
        Ok(Self {
            state: TableState::Indexed,
            domains,
        })
    }
}

impl Default for SupportTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Nearest known value to `query` under natural ordering.
///
/// Numeric distance applies when the query and at least one known value
/// parse as numbers, ties going to the numerically lower candidate;
/// otherwise the closest sorted neighbor wins, preferring the predecessor.
fn nearest_value<'a>(
    codes: &'a BTreeMap<CategoryValue, CategoryCode>,
    query: &str,
) -> &'a CategoryValue {
    if let Ok(target) = query.parse::<f64>() {
        let mut best: Option<(&CategoryValue, f64, f64)> = None;
        for value in codes.keys() {
            if let Ok(candidate) = value.parse::<f64>() {
                let distance = (candidate - target).abs();
                let closer = match best {
                    Some((_, best_candidate, best_distance)) => {
                        distance < best_distance
                            || (distance == best_distance && candidate < best_candidate)
                    }
                    None => true,
                };
                if closer {
                    best = Some((value, candidate, distance));
                }
            }
        }
        if let Some((value, _, _)) = best {
            return value;
        }
    }
    let predecessor = codes
        .range::<str, _>((Bound::Unbounded, Bound::Excluded(query)))
        .next_back();
    let successor = codes
        .range::<str, _>((Bound::Included(query), Bound::Unbounded))
        .next();
    match (predecessor, successor) {
        (Some((value, _)), _) => value,
        (None, Some((value, _))) => value,
        (None, None) => unreachable!("nearest_value called on empty code map"),
    }
}

/// Canonical representative for process-name variants.
///
/// Collapses suffix decorations (step numbers, versions) down to the leading
/// alphabetic family name: `analysis-step2` and `analysis_v3` both map to
/// `analysis`. Values without an alphabetic prefix stay as they are.
pub fn process_family(value: &str) -> CategoryValue {
    let family: String = value
        .chars()
        .take_while(|ch| ch.is_ascii_alphabetic())
        .collect();
    if family.is_empty() {
        value.to_string()
    } else {
        family
    }
}
