//! Variant schema: dimensions, their values, and the SKU catalog

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::value_objects::{ImageRef, Money, SkuId, ValueId};

// =============================================================================
// Catalog input
// =============================================================================

/// Catalog snapshot as handed over by the product catalog.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogInput {
    pub dimensions: Vec<DimensionInput>,
    pub skus: Vec<SkuInput>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DimensionInput {
    pub name: String,
    #[serde(default)]
    pub order: i32,
    pub values: Vec<ValueInput>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValueInput {
    pub id: ValueId,
    #[serde(default)]
    pub label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SkuInput {
    pub id: SkuId,
    pub attributes: BTreeMap<String, ValueId>,
    #[serde(default)]
    pub price: Money,
    #[serde(default)]
    pub inventory_ref: Option<SkuId>,
    #[serde(default)]
    pub images: Vec<RawImage>,
}

/// Images come either as a bare URL or as an object carrying a primary flag.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawImage {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        is_primary: bool,
    },
}

/// Resolves raw images. When none is flagged primary the first one is.
pub fn resolve_images(raw: Vec<RawImage>) -> Vec<ImageRef> {
    let mut images: Vec<ImageRef> = raw
        .into_iter()
        .map(|image| match image {
            RawImage::Url(url) => ImageRef { url, is_primary: false },
            RawImage::Detailed { url, is_primary } => ImageRef { url, is_primary },
        })
        .collect();
    if !images.iter().any(|i| i.is_primary) {
        if let Some(first) = images.first_mut() { first.is_primary = true; }
    }
    images
}

// =============================================================================
// Schema types
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDimension { pub name: String, pub declared_order: i32 }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantValue { pub dimension: String, pub id: ValueId, pub label: String }

/// A concrete, purchasable combination of one value per dimension.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sku {
    id: SkuId,
    attributes: BTreeMap<String, ValueId>,
    price: Money,
    inventory_ref: SkuId,
    images: Vec<ImageRef>,
}

impl Sku {
    pub fn id(&self) -> &SkuId { &self.id }
    pub fn attributes(&self) -> &BTreeMap<String, ValueId> { &self.attributes }
    pub fn attribute(&self, dimension: &str) -> Option<&ValueId> { self.attributes.get(dimension.trim()) }
    pub fn price(&self) -> &Money { &self.price }
    pub fn inventory_ref(&self) -> &SkuId { &self.inventory_ref }
    pub fn images(&self) -> &[ImageRef] { &self.images }
    pub fn primary_image(&self) -> Option<&ImageRef> { self.images.iter().find(|i| i.is_primary) }

    /// True when every `(dimension, value)` pair of `selection` is one of ours.
    pub fn satisfies(&self, selection: &Selection) -> bool {
        selection.iter().all(|(dimension, value)| self.attributes.get(dimension) == Some(value))
    }
}

/// A partial or complete choice of one value per dimension. Dimension names
/// are trimmed on the way in, matching how the schema stores them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, ValueId>", into = "BTreeMap<String, ValueId>")]
pub struct Selection(BTreeMap<String, ValueId>);

impl Selection {
    pub fn new() -> Self { Self::default() }
    pub fn get(&self, dimension: &str) -> Option<&ValueId> { self.0.get(dimension.trim()) }
    pub fn set(&mut self, dimension: impl Into<String>, value: ValueId) {
        let dimension: String = dimension.into();
        self.0.insert(dimension.trim().to_string(), value);
    }
    pub fn clear(&mut self, dimension: &str) -> Option<ValueId> { self.0.remove(dimension.trim()) }
    pub fn contains(&self, dimension: &str) -> bool { self.0.contains_key(dimension.trim()) }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ValueId)> { self.0.iter() }

    /// Copy of this selection without `dimension`.
    pub fn without(&self, dimension: &str) -> Self {
        let mut rest = self.clone();
        rest.clear(dimension);
        rest
    }

    pub fn with(mut self, dimension: impl Into<String>, value: impl Into<ValueId>) -> Self {
        self.set(dimension, value.into());
        self
    }
}

impl<D: Into<String>, V: Into<ValueId>> FromIterator<(D, V)> for Selection {
    fn from_iter<I: IntoIterator<Item = (D, V)>>(iter: I) -> Self {
        let mut selection = Self::new();
        for (dimension, value) in iter { selection.set(dimension, value.into()); }
        selection
    }
}

impl From<BTreeMap<String, ValueId>> for Selection {
    fn from(map: BTreeMap<String, ValueId>) -> Self { map.into_iter().collect() }
}

impl From<Selection> for BTreeMap<String, ValueId> {
    fn from(selection: Selection) -> Self { selection.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("dimension name is empty")]
    EmptyDimensionName,
    #[error("dimension {0} declared twice")]
    DuplicateDimension(String),
    #[error("dimension {dimension} declares value {value} twice")]
    DuplicateValue { dimension: String, value: ValueId },
    #[error("SKU {0} listed twice")]
    DuplicateSku(SkuId),
    #[error("SKU {sku} has no value for dimension {dimension}")]
    MissingDimension { sku: SkuId, dimension: String },
    #[error("SKU {sku} references undeclared dimension {dimension}")]
    UndeclaredDimension { sku: SkuId, dimension: String },
    #[error("SKU {sku} references undeclared value {value} of {dimension}")]
    UndeclaredValue { sku: SkuId, dimension: String, value: ValueId },
    #[error("SKU {sku} duplicates the attribute combination of SKU {existing}")]
    DuplicateCombination { sku: SkuId, existing: SkuId },
}

// =============================================================================
// Schema
// =============================================================================

/// Read-only after construction; share it behind an `Arc`.
#[derive(Clone, Debug)]
pub struct VariantSchema {
    dimensions: Vec<VariantDimension>,
    values: Vec<Vec<VariantValue>>,
    skus: Vec<Sku>,
    by_id: HashMap<SkuId, usize>,
    by_combination: HashMap<Vec<ValueId>, usize>,
}

impl VariantSchema {
    pub fn from_catalog(catalog: CatalogInput) -> Result<Self, SchemaError> {
        Self::build(catalog.dimensions, catalog.skus)
    }

    /// Dimensions are ordered by `order`, ties keep input position.
    pub fn build(dimensions: Vec<DimensionInput>, skus: Vec<SkuInput>) -> Result<Self, SchemaError> {
        let mut dimensions = dimensions;
        dimensions.sort_by_key(|d| d.order);

        let mut seen_dimensions = HashSet::new();
        let mut declared = Vec::with_capacity(dimensions.len());
        let mut values = Vec::with_capacity(dimensions.len());
        for input in dimensions {
            let name = input.name.trim().to_string();
            if name.is_empty() { return Err(SchemaError::EmptyDimensionName); }
            if !seen_dimensions.insert(name.clone()) { return Err(SchemaError::DuplicateDimension(name)); }

            let mut seen_values = HashSet::new();
            let mut dimension_values = Vec::with_capacity(input.values.len());
            for value in input.values {
                if !seen_values.insert(value.id.clone()) {
                    return Err(SchemaError::DuplicateValue { dimension: name, value: value.id });
                }
                let label = if value.label.is_empty() { value.id.to_string() } else { value.label };
                dimension_values.push(VariantValue { dimension: name.clone(), id: value.id, label });
            }
            declared.push(VariantDimension { name, declared_order: input.order });
            values.push(dimension_values);
        }

        let mut schema = Self {
            dimensions: declared,
            values,
            skus: Vec::with_capacity(skus.len()),
            by_id: HashMap::with_capacity(skus.len()),
            by_combination: HashMap::with_capacity(skus.len()),
        };
        for input in skus { schema.insert_sku(input)?; }
        Ok(schema)
    }

    fn insert_sku(&mut self, input: SkuInput) -> Result<(), SchemaError> {
        if self.by_id.contains_key(&input.id) { return Err(SchemaError::DuplicateSku(input.id)); }
        let mut attributes = BTreeMap::new();
        for (dimension, value) in input.attributes {
            let dimension = dimension.trim().to_string();
            if self.dimension_index(&dimension).is_none() {
                return Err(SchemaError::UndeclaredDimension { sku: input.id.clone(), dimension });
            }
            if attributes.insert(dimension.clone(), value).is_some() {
                return Err(SchemaError::DuplicateDimension(dimension));
            }
        }

        let mut combination = Vec::with_capacity(self.dimensions.len());
        for (index, dimension) in self.dimensions.iter().enumerate() {
            let value = attributes.get(&dimension.name).ok_or_else(|| SchemaError::MissingDimension {
                sku: input.id.clone(),
                dimension: dimension.name.clone(),
            })?;
            if !self.values[index].iter().any(|v| &v.id == value) {
                return Err(SchemaError::UndeclaredValue {
                    sku: input.id.clone(),
                    dimension: dimension.name.clone(),
                    value: value.clone(),
                });
            }
            combination.push(value.clone());
        }
        if let Some(&existing) = self.by_combination.get(&combination) {
            return Err(SchemaError::DuplicateCombination { sku: input.id, existing: self.skus[existing].id.clone() });
        }

        let position = self.skus.len();
        let inventory_ref = input.inventory_ref.unwrap_or_else(|| input.id.clone());
        self.by_id.insert(input.id.clone(), position);
        self.by_combination.insert(combination, position);
        self.skus.push(Sku {
            id: input.id,
            attributes,
            price: input.price,
            inventory_ref,
            images: resolve_images(input.images),
        });
        Ok(())
    }

    pub fn dimensions(&self) -> &[VariantDimension] { &self.dimensions }
    pub fn skus(&self) -> &[Sku] { &self.skus }
    pub fn sku(&self, id: &SkuId) -> Option<&Sku> { self.by_id.get(id).map(|&i| &self.skus[i]) }
    pub fn dimension_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.dimensions.iter().position(|d| d.name == name)
    }

    /// Values of `dimension` in declaration order.
    pub fn values(&self, dimension: &str) -> Option<&[VariantValue]> {
        self.dimension_index(dimension).map(|i| self.values[i].as_slice())
    }

    pub fn value(&self, dimension: &str, id: &ValueId) -> Option<&VariantValue> {
        self.values(dimension)?.iter().find(|v| &v.id == id)
    }

    /// SKUs whose attribute map is a superset of `selection`.
    pub fn matching_skus<'a>(&'a self, selection: &'a Selection) -> impl Iterator<Item = &'a Sku> + 'a {
        self.skus.iter().filter(move |sku| sku.satisfies(selection))
    }

    /// True when at least one SKU can still complete `selection`.
    pub fn is_reachable(&self, selection: &Selection) -> bool { self.matching_skus(selection).next().is_some() }

    /// Exact lookup of a complete selection.
    pub(crate) fn sku_for_complete(&self, selection: &Selection) -> Option<&Sku> {
        let combination: Option<Vec<ValueId>> = self.dimensions.iter().map(|d| selection.get(&d.name).cloned()).collect();
        combination.and_then(|key| self.by_combination.get(&key)).map(|&i| &self.skus[i])
    }

    /// Walks dimensions in declared order and picks the first declared value
    /// that still reaches a SKU given the values already picked.
    pub fn default_selection(&self) -> Selection {
        let mut selection = Selection::new();
        for (index, dimension) in self.dimensions.iter().enumerate() {
            let pick = self.values[index].iter().find(|value| {
                let candidate = selection.clone().with(dimension.name.clone(), value.id.clone());
                self.is_reachable(&candidate)
            });
            if let Some(value) = pick { selection.set(dimension.name.clone(), value.id.clone()); }
        }
        selection
    }
}
