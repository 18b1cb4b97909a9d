//! UI-agnostic selection state machine
//!
//! `{schema, selection} -> {selection', outcome}`. Renderers hold a
//! [`SelectionState`] and feed user input through [`SelectionMachine`].

use serde::{Deserialize, Serialize};

use super::resolver::{Resolution, SelectionError, SelectionResolver};
use super::schema::{Selection, VariantDimension, VariantSchema, VariantValue};
use crate::domain::value_objects::{SkuId, ValueId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Matched { sku_id: SkuId },
    /// "This option set is currently unavailable."
    Unresolved,
    Incomplete { missing: Vec<String> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState { pub selection: Selection, pub outcome: Outcome }

impl SelectionState {
    pub fn matched(&self) -> Option<&SkuId> {
        match &self.outcome { Outcome::Matched { sku_id } => Some(sku_id), _ => None }
    }
}

/// One selector row: the dimension, what is picked, and what may be picked.
#[derive(Clone, Debug)]
pub struct DimensionOptions<'a> {
    pub dimension: &'a VariantDimension,
    pub selected: Option<ValueId>,
    pub available: Vec<&'a VariantValue>,
}

#[derive(Clone, Copy, Debug)]
pub struct SelectionMachine<'a> {
    resolver: SelectionResolver<'a>,
}

impl<'a> SelectionMachine<'a> {
    pub fn new(schema: &'a VariantSchema) -> Self { Self { resolver: SelectionResolver::new(schema) } }

    /// Initial state seeded with the schema's default selection.
    pub fn start(&self) -> Result<SelectionState, SelectionError> {
        self.settle(self.resolver.schema().default_selection())
    }

    pub fn select(&self, state: &SelectionState, dimension: &str, value: &ValueId) -> Result<SelectionState, SelectionError> {
        let selection = self.resolver.on_value_changed(dimension, value, &state.selection)?;
        self.settle(selection)
    }

    /// Unselects `dimension`. Like `select`, rejects a state holding
    /// undeclared dimensions or values.
    pub fn clear(&self, state: &SelectionState, dimension: &str) -> Result<SelectionState, SelectionError> {
        if self.resolver.schema().dimension_index(dimension).is_none() {
            return Err(SelectionError::UnknownDimension(dimension.to_string()));
        }
        self.resolver.validate(&state.selection)?;
        self.settle(state.selection.without(dimension))
    }

    pub fn options(&self, state: &SelectionState) -> Result<Vec<DimensionOptions<'a>>, SelectionError> {
        self.resolver
            .schema()
            .dimensions()
            .iter()
            .map(|dimension| -> Result<DimensionOptions<'a>, SelectionError> {
                Ok(DimensionOptions {
                    dimension,
                    selected: state.selection.get(&dimension.name).cloned(),
                    available: self.resolver.available_values(&dimension.name, &state.selection)?,
                })
            })
            .collect()
    }

    /// Selected value labels in declared order, e.g. `Red × M`.
    pub fn label(&self, state: &SelectionState) -> String {
        let schema = self.resolver.schema();
        schema
            .dimensions()
            .iter()
            .filter_map(|d| state.selection.get(&d.name).and_then(|id| schema.value(&d.name, id)))
            .map(|v| v.label.as_str())
            .collect::<Vec<_>>()
            .join(" × ")
    }

    fn settle(&self, selection: Selection) -> Result<SelectionState, SelectionError> {
        let outcome = match self.resolver.resolve(&selection) {
            Ok(Resolution::Matched(sku)) => Outcome::Matched { sku_id: sku.id().clone() },
            Ok(Resolution::Unresolved) => Outcome::Unresolved,
            Err(SelectionError::Incomplete { missing }) => Outcome::Incomplete { missing },
            Err(err) => return Err(err),
        };
        Ok(SelectionState { selection, outcome })
    }
}

/// Purchase quantity stepper: at least one, at most what is available.
pub fn clamp_purchase_quantity(requested: u32, available: u32) -> u32 { requested.min(available).max(1) }
