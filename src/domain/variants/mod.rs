//! Variant schema, selection resolver and selection state machine
pub mod schema;
pub mod resolver;
pub mod machine;

pub use schema::{CatalogInput, DimensionInput, RawImage, SchemaError, Selection, Sku, SkuInput, ValueInput, VariantDimension, VariantSchema, VariantValue};
pub use resolver::{Resolution, SelectionError, SelectionResolver};
pub use machine::{clamp_purchase_quantity, DimensionOptions, Outcome, SelectionMachine, SelectionState};
