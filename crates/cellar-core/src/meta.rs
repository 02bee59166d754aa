//! Model metadata: deriving table configuration from typed models
//!
//! A type that wants a table of its own implements [`TableModel`],
//! describing itself at the class level (name, timestamps, seed data) and
//! per property (primary key, secondary index). [`normalize`] flattens
//! either style of table definition into the plain [`TableConfig`] shape;
//! the two styles must not be mixed within one database.
//!
//! This is the injectable metadata collaborator: any mechanism that can
//! produce the descriptors (hand-written impls, a derive macro, codegen)
//! plugs in here.

use std::collections::BTreeMap;

use crate::config::{IndexSpec, PrimaryKey, TableConfig};
use crate::error::ConfigError;
use crate::record::Record;

/// Class-level metadata for a model type.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDescriptor {
    /// Table name the model maps to.
    pub name: String,
    /// Whether `createdAt`/`updatedAt` injection is enabled.
    pub timestamps: bool,
    /// Records inserted when the table is first created.
    pub init_data: Vec<Record>,
}

impl ClassDescriptor {
    /// Descriptor with timestamps off and no seed data.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamps: false,
            init_data: Vec::new(),
        }
    }
}

/// Primary-key options attached to a model property.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryKeyOptions {
    /// Host-generated keys for records that omit the field.
    pub auto_increment: bool,
    /// Kept for config parity; primary keys are always unique.
    pub unique: bool,
}

impl Default for PrimaryKeyOptions {
    fn default() -> Self {
        Self {
            auto_increment: true,
            unique: true,
        }
    }
}

/// Secondary-index options attached to a model property.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexOptions {
    /// Reject duplicate values for this field.
    pub unique: bool,
    /// Index array elements separately.
    pub multi_entry: bool,
}

/// Per-property metadata for a model type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyDescriptor {
    /// Set when the property is the primary key.
    pub primary_key: Option<PrimaryKeyOptions>,
    /// Set when the property carries a secondary index.
    pub indexed: Option<IndexOptions>,
}

impl PropertyDescriptor {
    /// Descriptor marking the property as the primary key.
    pub fn primary_key(options: PrimaryKeyOptions) -> Self {
        Self {
            primary_key: Some(options),
            indexed: None,
        }
    }

    /// Descriptor marking the property as indexed.
    pub fn indexed(options: IndexOptions) -> Self {
        Self {
            primary_key: None,
            indexed: Some(options),
        }
    }
}

/// A type that maps to a table.
pub trait TableModel {
    /// Class-level metadata: table name, timestamp flag, seed data.
    fn class_meta() -> ClassDescriptor;

    /// Property-level metadata keyed by field name.
    fn property_meta() -> BTreeMap<String, PropertyDescriptor>;
}

/// Captured metadata for one model type, detached from the type itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMetadata {
    /// Class-level descriptor.
    pub class: ClassDescriptor,
    /// Property descriptors keyed by field name.
    pub properties: BTreeMap<String, PropertyDescriptor>,
}

impl ModelMetadata {
    /// Capture the metadata of a model type.
    pub fn of<T: TableModel>() -> Self {
        Self {
            class: T::class_meta(),
            properties: T::property_meta(),
        }
    }

    /// Flatten the descriptors into the plain table configuration shape.
    ///
    /// A model without a primary-key property gets the `id`/auto-increment
    /// default; more than one primary-key property is an error.
    pub fn into_table_config(self) -> Result<TableConfig, ConfigError> {
        let mut primary_key: Option<PrimaryKey> = None;
        let mut indexes = BTreeMap::new();

        for (field, descriptor) in self.properties {
            if let Some(options) = descriptor.primary_key {
                if primary_key.is_some() {
                    return Err(ConfigError::MultiplePrimaryKeys(self.class.name));
                }
                primary_key = Some(PrimaryKey {
                    name: field.clone(),
                    auto_increment: options.auto_increment,
                    unique: options.unique,
                });
            }
            if let Some(options) = descriptor.indexed {
                indexes.insert(
                    field,
                    IndexSpec {
                        unique: options.unique,
                        multi_entry: options.multi_entry,
                    },
                );
            }
        }

        Ok(TableConfig {
            name: self.class.name,
            timestamps: self.class.timestamps,
            init_data: self.class.init_data,
            primary_key: primary_key.unwrap_or_default(),
            indexes,
        })
    }
}

/// One table definition, in either input style.
#[derive(Debug, Clone, PartialEq)]
pub enum TableDef {
    /// A plain table configuration object.
    Config(TableConfig),
    /// Captured model metadata, flattened during normalization.
    Model(ModelMetadata),
}

impl TableDef {
    /// Shorthand for capturing a model type.
    pub fn model<T: TableModel>() -> Self {
        TableDef::Model(ModelMetadata::of::<T>())
    }
}

/// Normalize a list of table definitions into plain table configurations.
///
/// All definitions must share one style; mixing plain configs with model
/// metadata fails with [`ConfigError::MixedStyles`].
pub fn normalize(defs: Vec<TableDef>) -> Result<Vec<TableConfig>, ConfigError> {
    if defs.is_empty() {
        return Err(ConfigError::NoTables);
    }

    let has_plain = defs.iter().any(|d| matches!(d, TableDef::Config(_)));
    let has_model = defs.iter().any(|d| matches!(d, TableDef::Model(_)));
    if has_plain && has_model {
        return Err(ConfigError::MixedStyles);
    }

    defs.into_iter()
        .map(|def| match def {
            TableDef::Config(table) => Ok(table),
            TableDef::Model(meta) => meta.into_table_config(),
        })
        .collect()
}
