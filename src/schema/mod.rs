//! In-memory schema: class descriptors with versioned fields.
//!
//! Every mutable field of a descriptor (name, property map, superclass,
//! subclass set) is its own versioned cell; mutations stage new values and
//! commit promotes them, exactly like graph entities. A pending class drop
//! is an `UncommittedDelete` lifecycle state, again like a vertex.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::model::{ClassId, ClassType, PropertyId, PropertyType, VersionId};
use crate::txn::{StatusFlag, Txn, TxnMode, TxnObject};
use crate::version::{ConcurrentDeleteQueue, ConcurrentMap, VersionControl};

/// Index bookkeeping attached to a property.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    /// Class the index is declared on.
    pub class_id: ClassId,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
}

/// A declared property of a class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    /// Schema-wide property id.
    pub id: PropertyId,
    /// Declared value type.
    pub property_type: PropertyType,
    /// Indexes declared over this property.
    pub indexes: BTreeMap<crate::model::IndexId, IndexInfo>,
}

impl PropertyDescriptor {
    /// A fresh property with no indexes.
    pub fn new(id: PropertyId, property_type: PropertyType) -> Self {
        Self {
            id,
            property_type,
            indexes: BTreeMap::new(),
        }
    }
}

/// Property map of a class, keyed by property name.
pub type ClassProperties = BTreeMap<String, PropertyDescriptor>;

/// A class descriptor: fixed id and type, four versioned fields, and the
/// common lifecycle word.
#[derive(Debug)]
pub struct ClassDescriptor {
    /// Schema-wide class id.
    pub id: ClassId,
    /// Whether the class groups vertices or edges.
    pub class_type: ClassType,
    pub(crate) state: TxnObject,
    pub(crate) name: VersionControl<String>,
    pub(crate) properties: VersionControl<ClassProperties>,
    pub(crate) super_class: VersionControl<Option<ClassId>>,
    pub(crate) sub_classes: VersionControl<BTreeSet<ClassId>>,
}

impl ClassDescriptor {
    pub(crate) fn new(id: ClassId, class_type: ClassType, name: String) -> Arc<Self> {
        Arc::new(Self {
            id,
            class_type,
            state: TxnObject::new(),
            name: VersionControl::staged_with(name),
            properties: VersionControl::staged_with(ClassProperties::new()),
            super_class: VersionControl::staged_with(None),
            sub_classes: VersionControl::staged_with(BTreeSet::new()),
        })
    }

    /// Rebuilds a committed descriptor from a persisted snapshot. The
    /// fields are installed as stable state at `version_id`.
    pub(crate) fn restored(snapshot: ClassSnapshot, version_id: VersionId) -> Arc<Self> {
        let descriptor = Self {
            id: snapshot.id,
            class_type: snapshot.class_type,
            state: TxnObject::committed_at(version_id),
            name: VersionControl::staged_with(snapshot.name),
            properties: VersionControl::staged_with(snapshot.properties),
            super_class: VersionControl::staged_with(snapshot.super_class),
            sub_classes: VersionControl::staged_with(snapshot.sub_classes),
        };
        descriptor.name.promote(version_id);
        descriptor.properties.promote(version_id);
        descriptor.super_class.promote(version_id);
        descriptor.sub_classes.promote(version_id);
        Arc::new(descriptor)
    }

    /// Writer-view snapshot of the descriptor for persistence.
    pub(crate) fn snapshot(&self) -> ClassSnapshot {
        ClassSnapshot {
            id: self.id,
            class_type: self.class_type,
            name: self.name.read_latest().unwrap_or_default(),
            properties: self.properties.read_latest().unwrap_or_default(),
            super_class: self.super_class.read_latest().flatten(),
            sub_classes: self.sub_classes.read_latest().unwrap_or_default(),
        }
    }
}

/// Serialized form of a descriptor, stored in the schema database.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSnapshot {
    pub(crate) id: ClassId,
    pub(crate) class_type: ClassType,
    pub(crate) name: String,
    pub(crate) properties: ClassProperties,
    pub(crate) super_class: Option<ClassId>,
    pub(crate) sub_classes: BTreeSet<ClassId>,
}

/// The in-memory schema store.
#[derive(Debug, Default)]
pub struct Schema {
    pub(crate) classes: ConcurrentMap<ClassId, ClassDescriptor>,
    pub(crate) deleted_classes: ConcurrentDeleteQueue<ClassId>,
}

impl Schema {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `class_id` through the transaction's visibility rule.
    pub fn find_by_id(&self, txn: &Txn<'_>, class_id: ClassId) -> Option<Arc<ClassDescriptor>> {
        match self.classes.get(&class_id) {
            Some(descriptor) => {
                let invisible = match txn.mode() {
                    TxnMode::ReadOnly => descriptor.state.is_invisible_to(txn.version_id()),
                    TxnMode::ReadWrite => descriptor.state.is_invisible_to_writer(),
                };
                (!invisible).then_some(descriptor)
            }
            None => match txn.mode() {
                TxnMode::ReadOnly => None,
                TxnMode::ReadWrite => txn
                    .find_uncommitted_class(&class_id)
                    .filter(|descriptor| !descriptor.state.is_invisible_to_writer()),
            },
        }
    }

    /// Resolves a class by its visible name.
    pub fn find_by_name(&self, txn: &Txn<'_>, name: &str) -> Option<Arc<ClassDescriptor>> {
        let mut candidates: Vec<Arc<ClassDescriptor>> = self
            .classes
            .entries()
            .into_iter()
            .map(|(_, descriptor)| descriptor)
            .collect();
        if txn.mode() == TxnMode::ReadWrite {
            candidates.extend(txn.uncommitted_classes());
        }
        candidates.into_iter().find(|descriptor| {
            self.find_by_id(txn, descriptor.id)
                .and_then(|visible| txn.read_cell(&visible.name))
                .is_some_and(|visible_name| visible_name == name)
        })
    }

    /// Visible name of a class.
    pub fn name_of(&self, txn: &Txn<'_>, class_id: ClassId) -> Result<String> {
        let descriptor = self
            .find_by_id(txn, class_id)
            .ok_or(SchemaError::NoExistClass(class_id))?;
        txn.read_cell(&descriptor.name)
            .ok_or_else(|| SchemaError::NoExistClass(class_id).into())
    }

    /// Visible property map of a class.
    pub fn properties_of(&self, txn: &Txn<'_>, class_id: ClassId) -> Result<ClassProperties> {
        let descriptor = self
            .find_by_id(txn, class_id)
            .ok_or(SchemaError::NoExistClass(class_id))?;
        Ok(txn.read_cell(&descriptor.properties).unwrap_or_default())
    }

    /// Visible superclass of a class, if any.
    pub fn super_class_of(&self, txn: &Txn<'_>, class_id: ClassId) -> Result<Option<ClassId>> {
        let descriptor = self
            .find_by_id(txn, class_id)
            .ok_or(SchemaError::NoExistClass(class_id))?;
        Ok(txn.read_cell(&descriptor.super_class).flatten())
    }

    /// Visible subclass set of a class.
    pub fn sub_classes_of(&self, txn: &Txn<'_>, class_id: ClassId) -> Result<BTreeSet<ClassId>> {
        let descriptor = self
            .find_by_id(txn, class_id)
            .ok_or(SchemaError::NoExistClass(class_id))?;
        Ok(txn.read_cell(&descriptor.sub_classes).unwrap_or_default())
    }

    /// Every class visible to the transaction, sorted by id.
    pub fn classes(&self, txn: &Txn<'_>) -> Vec<Arc<ClassDescriptor>> {
        let mut result: Vec<Arc<ClassDescriptor>> = self
            .classes
            .entries()
            .into_iter()
            .filter_map(|(class_id, _)| self.find_by_id(txn, class_id))
            .collect();
        if txn.mode() == TxnMode::ReadWrite {
            for descriptor in txn.uncommitted_classes() {
                if !descriptor.state.is_invisible_to_writer()
                    && !result.iter().any(|known| known.id == descriptor.id)
                {
                    result.push(descriptor);
                }
            }
        }
        result.sort_unstable_by_key(|descriptor| descriptor.id);
        result
    }

    /// Creates a class and returns its descriptor.
    pub fn create_class(
        &self,
        txn: &mut Txn<'_>,
        name: &str,
        class_type: ClassType,
    ) -> Result<Arc<ClassDescriptor>> {
        txn.ensure_writable()?;
        if name.is_empty() {
            return Err(SchemaError::EmptyClassName.into());
        }
        if self.find_by_name(txn, name).is_some() {
            return Err(SchemaError::DuplicateClass(name.to_owned()).into());
        }
        let class_id = txn.db_info.max_class_id + 1;
        txn.db_info.max_class_id = class_id;
        txn.db_info.num_classes += 1;
        let descriptor = ClassDescriptor::new(class_id, class_type, name.to_owned());
        txn.add_uncommitted_class(Arc::clone(&descriptor));
        txn.persist_class(&descriptor)?;
        Ok(descriptor)
    }

    /// Drops a class, detaching it from its super- and subclasses.
    pub fn drop_class(&self, txn: &mut Txn<'_>, class_id: ClassId) -> Result<()> {
        txn.ensure_writable()?;
        let descriptor = self
            .find_by_id(txn, class_id)
            .ok_or(SchemaError::NoExistClass(class_id))?;

        if let Some(super_id) = txn.read_cell(&descriptor.super_class).flatten() {
            if let Some(super_class) = self.find_by_id(txn, super_id) {
                let mut subs = txn.read_cell(&super_class.sub_classes).unwrap_or_default();
                subs.remove(&class_id);
                super_class.sub_classes.stage(subs);
                txn.add_uncommitted_class(Arc::clone(&super_class));
                txn.persist_class(&super_class)?;
            }
        }
        for sub_id in txn.read_cell(&descriptor.sub_classes).unwrap_or_default() {
            if let Some(sub_class) = self.find_by_id(txn, sub_id) {
                sub_class.super_class.stage(None);
                txn.add_uncommitted_class(Arc::clone(&sub_class));
                txn.persist_class(&sub_class)?;
            }
        }

        txn.db_info.num_classes = txn.db_info.num_classes.saturating_sub(1);
        if descriptor.state.state().1 == StatusFlag::UncommittedCreate {
            txn.remove_uncommitted_class(&class_id);
        } else {
            descriptor.state.set_status(StatusFlag::UncommittedDelete);
            txn.add_uncommitted_class(descriptor);
        }
        txn.erase_class_snapshot(class_id)?;
        Ok(())
    }

    /// Renames a class.
    pub fn rename_class(&self, txn: &mut Txn<'_>, class_id: ClassId, new_name: &str) -> Result<()> {
        txn.ensure_writable()?;
        if new_name.is_empty() {
            return Err(SchemaError::EmptyClassName.into());
        }
        if self.find_by_name(txn, new_name).is_some() {
            return Err(SchemaError::DuplicateClass(new_name.to_owned()).into());
        }
        let descriptor = self
            .find_by_id(txn, class_id)
            .ok_or(SchemaError::NoExistClass(class_id))?;
        descriptor.name.stage(new_name.to_owned());
        txn.add_uncommitted_class(Arc::clone(&descriptor));
        txn.persist_class(&descriptor)?;
        Ok(())
    }

    /// Points a class at a new superclass (or none), maintaining the
    /// inverse subclass sets on both the old and new superclass.
    pub fn set_super_class(
        &self,
        txn: &mut Txn<'_>,
        class_id: ClassId,
        super_id: Option<ClassId>,
    ) -> Result<()> {
        txn.ensure_writable()?;
        let descriptor = self
            .find_by_id(txn, class_id)
            .ok_or(SchemaError::NoExistClass(class_id))?;
        let new_super = match super_id {
            Some(id) => {
                let super_class = self
                    .find_by_id(txn, id)
                    .ok_or(SchemaError::NoExistClass(id))?;
                if super_class.class_type != descriptor.class_type {
                    return Err(SchemaError::MismatchClassType.into());
                }
                Some(super_class)
            }
            None => None,
        };

        if let Some(old_super_id) = txn.read_cell(&descriptor.super_class).flatten() {
            if let Some(old_super) = self.find_by_id(txn, old_super_id) {
                let mut subs = txn.read_cell(&old_super.sub_classes).unwrap_or_default();
                subs.remove(&class_id);
                old_super.sub_classes.stage(subs);
                txn.add_uncommitted_class(Arc::clone(&old_super));
                txn.persist_class(&old_super)?;
            }
        }
        if let Some(new_super) = &new_super {
            let mut subs = txn.read_cell(&new_super.sub_classes).unwrap_or_default();
            subs.insert(class_id);
            new_super.sub_classes.stage(subs);
            txn.add_uncommitted_class(Arc::clone(new_super));
            txn.persist_class(new_super)?;
        }
        descriptor.super_class.stage(super_id);
        txn.add_uncommitted_class(Arc::clone(&descriptor));
        txn.persist_class(&descriptor)?;
        Ok(())
    }

    /// Declares a property on a class and returns its id.
    pub fn add_property(
        &self,
        txn: &mut Txn<'_>,
        class_id: ClassId,
        name: &str,
        property_type: PropertyType,
    ) -> Result<PropertyId> {
        txn.ensure_writable()?;
        if name.is_empty() {
            return Err(SchemaError::EmptyPropertyName.into());
        }
        let descriptor = self
            .find_by_id(txn, class_id)
            .ok_or(SchemaError::NoExistClass(class_id))?;
        let mut properties = txn.read_cell(&descriptor.properties).unwrap_or_default();
        if properties.contains_key(name) {
            return Err(SchemaError::DuplicateProperty(name.to_owned()).into());
        }
        let property_id = txn.db_info.max_property_id + 1;
        txn.db_info.max_property_id = property_id;
        txn.db_info.num_properties += 1;
        properties.insert(
            name.to_owned(),
            PropertyDescriptor::new(property_id, property_type),
        );
        descriptor.properties.stage(properties);
        txn.add_uncommitted_class(Arc::clone(&descriptor));
        txn.persist_class(&descriptor)?;
        Ok(property_id)
    }

    /// Removes a property from a class.
    pub fn drop_property(&self, txn: &mut Txn<'_>, class_id: ClassId, name: &str) -> Result<()> {
        txn.ensure_writable()?;
        let descriptor = self
            .find_by_id(txn, class_id)
            .ok_or(SchemaError::NoExistClass(class_id))?;
        let mut properties = txn.read_cell(&descriptor.properties).unwrap_or_default();
        if properties.remove(name).is_none() {
            return Err(SchemaError::NoExistProperty(name.to_owned()).into());
        }
        txn.db_info.num_properties = txn.db_info.num_properties.saturating_sub(1);
        descriptor.properties.stage(properties);
        txn.add_uncommitted_class(Arc::clone(&descriptor));
        txn.persist_class(&descriptor)?;
        Ok(())
    }

    /// Renames a property on a class, keeping its id and type.
    pub fn rename_property(
        &self,
        txn: &mut Txn<'_>,
        class_id: ClassId,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        txn.ensure_writable()?;
        if new_name.is_empty() {
            return Err(SchemaError::EmptyPropertyName.into());
        }
        let descriptor = self
            .find_by_id(txn, class_id)
            .ok_or(SchemaError::NoExistClass(class_id))?;
        let mut properties = txn.read_cell(&descriptor.properties).unwrap_or_default();
        if properties.contains_key(new_name) {
            return Err(SchemaError::DuplicateProperty(new_name.to_owned()).into());
        }
        let property = properties
            .remove(old_name)
            .ok_or_else(|| SchemaError::NoExistProperty(old_name.to_owned()))?;
        properties.insert(new_name.to_owned(), property);
        descriptor.properties.stage(properties);
        txn.add_uncommitted_class(Arc::clone(&descriptor));
        txn.persist_class(&descriptor)?;
        Ok(())
    }

    /// Installs a descriptor loaded from persistent state as committed.
    pub(crate) fn install_restored(&self, descriptor: Arc<ClassDescriptor>) {
        self.classes.insert(descriptor.id, descriptor);
    }

    /// Drains the deleted-class queue up to `version_id` and physically
    /// erases the drained descriptors.
    pub(crate) fn prune_deleted(&self, version_id: VersionId) {
        let class_ids = self.deleted_classes.drain_up_to(version_id);
        if !class_ids.is_empty() {
            tracing::debug!(count = class_ids.len(), "reclaiming dropped classes");
            self.classes.erase_batch(&class_ids);
        }
    }

    /// Unconditionally wipes the store. Only safe when no transaction is
    /// in flight.
    pub fn clear(&self) {
        self.classes.clear();
    }
}
