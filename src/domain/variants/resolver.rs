//! Selection resolver
//!
//! Stateless queries over a [`VariantSchema`]: which values remain selectable,
//! which SKU a complete selection names, and how a selection reacts to one
//! dimension changing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::schema::{Selection, Sku, VariantSchema, VariantValue};
use crate::domain::value_objects::{SkuId, ValueId};

/// Outcome of resolving a complete selection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resolution<'a> {
    Matched(&'a Sku),
    /// Complete selection with no SKU behind it. Displayable, not an error.
    Unresolved,
}

impl<'a> Resolution<'a> {
    pub fn sku(&self) -> Option<&'a Sku> {
        match self { Self::Matched(sku) => Some(sku), Self::Unresolved => None }
    }
    pub fn is_unresolved(&self) -> bool { matches!(self, Self::Unresolved) }
}

/// Malformed selection input.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SelectionError {
    #[error("unknown dimension {0}")]
    UnknownDimension(String),
    #[error("unknown value {value} for dimension {dimension}")]
    UnknownValue { dimension: String, value: ValueId },
    #[error("selection is missing dimensions: {}", .missing.join(", "))]
    Incomplete { missing: Vec<String> },
}

#[derive(Clone, Copy, Debug)]
pub struct SelectionResolver<'a> {
    schema: &'a VariantSchema,
}

impl<'a> SelectionResolver<'a> {
    pub fn new(schema: &'a VariantSchema) -> Self { Self { schema } }
    pub fn schema(&self) -> &'a VariantSchema { self.schema }

    /// Every dimension and value of `selection` must be declared.
    pub fn validate(&self, selection: &Selection) -> Result<(), SelectionError> {
        for (dimension, value) in selection.iter() {
            let values = self.schema.values(dimension).ok_or_else(|| SelectionError::UnknownDimension(dimension.clone()))?;
            if !values.iter().any(|v| &v.id == value) {
                return Err(SelectionError::UnknownValue { dimension: dimension.clone(), value: value.clone() });
            }
        }
        Ok(())
    }

    /// Values `v` of `dimension`, in declaration order, such that some SKU
    /// carries every other pair of `selection` plus `dimension = v`. Whatever
    /// `selection` holds for `dimension` itself is ignored.
    pub fn available_values(&self, dimension: &str, selection: &Selection) -> Result<Vec<&'a VariantValue>, SelectionError> {
        let values = self.schema.values(dimension).ok_or_else(|| SelectionError::UnknownDimension(dimension.to_string()))?;
        let rest = selection.without(dimension);
        self.validate(&rest)?;

        let schema = self.schema;
        Ok(values
            .iter()
            .filter(|value| schema.matching_skus(&rest).any(|sku| sku.attribute(dimension) == Some(&value.id)))
            .collect())
    }

    /// `Err(Incomplete)` for a partial selection; `Unresolved` for a complete
    /// one that no SKU carries.
    pub fn resolve(&self, selection: &Selection) -> Result<Resolution<'a>, SelectionError> {
        self.validate(selection)?;
        let missing: Vec<String> = self
            .schema
            .dimensions()
            .iter()
            .filter(|d| !selection.contains(&d.name))
            .map(|d| d.name.clone())
            .collect();
        if !missing.is_empty() { return Err(SelectionError::Incomplete { missing }); }

        Ok(match self.schema.sku_for_complete(selection) {
            Some(sku) => Resolution::Matched(sku),
            None => Resolution::Unresolved,
        })
    }

    /// Applies `dimension = value` and clears every other selected value that
    /// no longer reaches a SKU. Other dimensions are re-checked in declared
    /// order against what has been kept so far, so the result is always a
    /// reachable selection when `value` itself appears on some SKU.
    pub fn on_value_changed(&self, dimension: &str, value: &ValueId, prior: &Selection) -> Result<Selection, SelectionError> {
        let dimension = dimension.trim();
        if self.schema.value(dimension, value).is_none() {
            return match self.schema.values(dimension) {
                None => Err(SelectionError::UnknownDimension(dimension.to_string())),
                Some(_) => Err(SelectionError::UnknownValue { dimension: dimension.to_string(), value: value.clone() }),
            };
        }
        self.validate(prior)?;

        let mut next = Selection::new().with(dimension, value.clone());
        for other in self.schema.dimensions().iter().filter(|d| d.name != dimension) {
            let Some(kept) = prior.get(&other.name) else { continue };
            let candidate = next.clone().with(other.name.clone(), kept.clone());
            if self.schema.is_reachable(&candidate) {
                next = candidate;
            } else {
                tracing::debug!(dimension = %other.name, value = %kept, "cleared unreachable selection");
            }
        }
        Ok(next)
    }

    /// Convenience for callers that only need the SKU id.
    pub fn resolve_id(&self, selection: &Selection) -> Result<Option<SkuId>, SelectionError> {
        Ok(self.resolve(selection)?.sku().map(|sku| sku.id().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::schema::fixtures::*;
    use super::*;

    fn ids(values: Vec<&VariantValue>) -> Vec<&str> { values.into_iter().map(|v| v.id.as_str()).collect() }

    #[test]
    fn test_blue_narrows_size_to_small() {
        let schema = tee_schema();
        let resolver = SelectionResolver::new(&schema);
        let selection = Selection::new().with("Color", "Blue");
        assert_eq!(ids(resolver.available_values("Size", &selection).unwrap()), ["S"]);
        assert_eq!(ids(resolver.available_values("Color", &selection).unwrap()), ["Red", "Blue"]);
    }

    #[test]
    fn test_available_values_ignores_own_dimension() {
        let schema = tee_schema();
        let resolver = SelectionResolver::new(&schema);
        let selection = Selection::from_iter([("Color", "Blue"), ("Size", "M")]);
        assert_eq!(ids(resolver.available_values("Size", &selection).unwrap()), ["S"]);
        assert_eq!(ids(resolver.available_values("Color", &selection).unwrap()), ["Red"]);
    }

    #[test]
    fn test_forced_blue_medium_is_unresolved() {
        let schema = tee_schema();
        let resolver = SelectionResolver::new(&schema);
        let selection = Selection::from_iter([("Color", "Blue"), ("Size", "M")]);
        assert_eq!(resolver.resolve(&selection).unwrap(), Resolution::Unresolved);

        let red_m = Selection::from_iter([("Color", "Red"), ("Size", "M")]);
        assert_eq!(resolver.resolve_id(&red_m).unwrap(), Some(SkuId::new("2").unwrap()));
    }

    #[test]
    fn test_partial_selection_is_incomplete_not_unresolved() {
        let schema = tee_schema();
        let resolver = SelectionResolver::new(&schema);
        let err = resolver.resolve(&Selection::new().with("Color", "Red")).unwrap_err();
        assert_eq!(err, SelectionError::Incomplete { missing: vec!["Size".into()] });
    }

    #[test]
    fn test_unknown_dimension_and_value() {
        let schema = tee_schema();
        let resolver = SelectionResolver::new(&schema);
        assert!(matches!(resolver.available_values("Fit", &Selection::new()), Err(SelectionError::UnknownDimension(_))));
        let bad = Selection::new().with("Color", "Green");
        assert!(matches!(resolver.available_values("Size", &bad), Err(SelectionError::UnknownValue { .. })));
        assert!(matches!(resolver.resolve(&bad), Err(SelectionError::UnknownValue { .. })));
    }

    #[test]
    fn test_change_clears_unreachable_values() {
        let schema = tee_schema();
        let resolver = SelectionResolver::new(&schema);
        let prior = Selection::from_iter([("Color", "Red"), ("Size", "M")]);
        let next = resolver.on_value_changed("Color", &ValueId::from("Blue"), &prior).unwrap();
        assert_eq!(next.get("Color"), Some(&ValueId::from("Blue")));
        assert_eq!(next.get("Size"), None);
    }

    #[test]
    fn test_change_keeps_reachable_values() {
        let schema = tee_schema();
        let resolver = SelectionResolver::new(&schema);
        let prior = Selection::from_iter([("Color", "Red"), ("Size", "S")]);
        let next = resolver.on_value_changed("Color", &ValueId::from("Blue"), &prior).unwrap();
        assert_eq!(next, Selection::from_iter([("Color", "Blue"), ("Size", "S")]));
    }

    #[test]
    fn test_change_with_padded_dimension_name() {
        let schema = tee_schema();
        let resolver = SelectionResolver::new(&schema);
        let prior = Selection::from_iter([("Color", "Red"), ("Size", "S")]);
        let next = resolver.on_value_changed(" Color ", &ValueId::from("Blue"), &prior).unwrap();
        assert_eq!(next, Selection::from_iter([("Color", "Blue"), ("Size", "S")]));
    }

    #[test]
    fn test_change_rejects_undeclared_value() {
        let schema = tee_schema();
        let resolver = SelectionResolver::new(&schema);
        let err = resolver.on_value_changed("Color", &ValueId::from("Green"), &Selection::new()).unwrap_err();
        assert!(matches!(err, SelectionError::UnknownValue { .. }));
        let err = resolver.on_value_changed("Fit", &ValueId::from("Slim"), &Selection::new()).unwrap_err();
        assert!(matches!(err, SelectionError::UnknownDimension(_)));
    }
}

#[cfg(test)]
mod property_tests {
    use super::super::schema::{DimensionInput, SkuInput, ValueInput};
    use super::*;
    use crate::domain::value_objects::Money;
    use proptest::prelude::*;
    use std::collections::{BTreeMap, BTreeSet};

    const DIMENSIONS: [&str; 3] = ["Color", "Size", "Fit"];
    const VALUES_PER_DIMENSION: usize = 3;

    /// Random catalog: every combination of 3x3x3 present or not.
    fn arb_schema() -> impl Strategy<Value = VariantSchema> {
        prop::collection::btree_set(prop::collection::vec(0..VALUES_PER_DIMENSION, DIMENSIONS.len()), 0..20).prop_map(build)
    }

    fn build(combinations: BTreeSet<Vec<usize>>) -> VariantSchema {
        let dimensions = DIMENSIONS
            .iter()
            .enumerate()
            .map(|(order, name)| DimensionInput {
                name: name.to_string(),
                order: order as i32,
                values: (0..VALUES_PER_DIMENSION).map(|v| ValueInput { id: ValueId::new(v.to_string()), label: String::new() }).collect(),
            })
            .collect();
        let skus = combinations
            .into_iter()
            .enumerate()
            .map(|(i, combo)| SkuInput {
                id: SkuId::new(format!("sku-{i}")).unwrap(),
                attributes: DIMENSIONS.iter().zip(combo).map(|(d, v)| (d.to_string(), ValueId::new(v.to_string()))).collect::<BTreeMap<_, _>>(),
                price: Money::default(),
                inventory_ref: None,
                images: vec![],
            })
            .collect();
        VariantSchema::build(dimensions, skus).unwrap()
    }

    fn arb_selection() -> impl Strategy<Value = Selection> {
        prop::collection::vec(prop::option::of(0..VALUES_PER_DIMENSION), DIMENSIONS.len()).prop_map(|picks| {
            DIMENSIONS
                .iter()
                .zip(picks)
                .filter_map(|(d, pick)| pick.map(|v| (d.to_string(), ValueId::new(v.to_string()))))
                .collect::<Selection>()
        })
    }

    proptest! {
        #[test]
        fn available_values_are_sound(schema in arb_schema(), selection in arb_selection(), dim in 0..DIMENSIONS.len()) {
            let resolver = SelectionResolver::new(&schema);
            let dimension = DIMENSIONS[dim];
            for value in resolver.available_values(dimension, &selection).unwrap() {
                let extended = selection.without(dimension).with(dimension, value.id.clone());
                prop_assert!(schema.is_reachable(&extended));
            }
        }

        #[test]
        fn available_values_are_complete(schema in arb_schema(), selection in arb_selection(), dim in 0..DIMENSIONS.len()) {
            let resolver = SelectionResolver::new(&schema);
            let dimension = DIMENSIONS[dim];
            let offered: Vec<ValueId> = resolver.available_values(dimension, &selection).unwrap().into_iter().map(|v| v.id.clone()).collect();
            for value in schema.values(dimension).unwrap() {
                let extended = selection.without(dimension).with(dimension, value.id.clone());
                prop_assert_eq!(schema.is_reachable(&extended), offered.contains(&value.id));
            }
        }

        #[test]
        fn resolve_is_deterministic(schema in arb_schema(), selection in arb_selection()) {
            let resolver = SelectionResolver::new(&schema);
            prop_assert_eq!(resolver.resolve(&selection), resolver.resolve(&selection));
        }

        #[test]
        fn changed_selection_stays_reachable(schema in arb_schema(), selection in arb_selection(), dim in 0..DIMENSIONS.len(), pick in 0..VALUES_PER_DIMENSION) {
            let resolver = SelectionResolver::new(&schema);
            let value = ValueId::new(pick.to_string());
            let next = resolver.on_value_changed(DIMENSIONS[dim], &value, &selection).unwrap();
            prop_assert_eq!(next.get(DIMENSIONS[dim]), Some(&value));
            if schema.is_reachable(&Selection::new().with(DIMENSIONS[dim], value.clone())) {
                prop_assert!(schema.is_reachable(&next));
            }
        }

        #[test]
        fn default_selection_resolves_when_catalog_nonempty(schema in arb_schema()) {
            let selection = schema.default_selection();
            if !schema.skus().is_empty() {
                let resolver = SelectionResolver::new(&schema);
                prop_assert!(resolver.resolve(&selection).unwrap().sku().is_some());
            }
        }
    }
}
