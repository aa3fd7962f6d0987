//! Profiles: named installation targets.
//!
//! A [`Profile`] holds its local properties, the set of installed units and a
//! property map per unit. Parent/child links are ids; the
//! [`ProfileRegistry`] owns every profile and resolves inherited properties by
//! walking those ids.

pub mod registry;

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use crate::metadata::InstallableUnit;
use crate::properties::PropertyStore;
use crate::query::{Query, QueryResult};

pub use registry::ProfileRegistry;

/// Errors raised by profile and registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("profile '{0}' not found")]
    NotFound(String),

    #[error("profile '{0}' already exists")]
    Duplicate(String),

    #[error("making '{parent}' the parent of '{child}' would create a cycle")]
    CyclicParent { child: String, parent: String },

    #[error("profile '{0}' still has sub-profiles")]
    HasSubProfiles(String),
}

static EMPTY_PROPERTIES: LazyLock<PropertyStore> = LazyLock::new(PropertyStore::new);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    id: String,
    parent_id: Option<String>,
    sub_profile_ids: IndexSet<String>,
    storage: PropertyStore,
    units: IndexSet<InstallableUnit>,
    unit_properties: IndexMap<InstallableUnit, PropertyStore>,
    changed: bool,
    timestamp: Option<DateTime<Utc>>,
}

impl Profile {
    /// Create a root profile seeded with `properties`.
    ///
    /// Fails with [`ProfileError::InvalidArgument`] when `id` is empty.
    pub fn new(id: impl Into<String>, properties: PropertyStore) -> Result<Self, ProfileError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ProfileError::InvalidArgument(
                "profile id must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id,
            parent_id: None,
            sub_profile_ids: IndexSet::new(),
            storage: properties,
            units: IndexSet::new(),
            unit_properties: IndexMap::new(),
            changed: false,
            timestamp: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn sub_profile_ids(&self) -> impl Iterator<Item = &str> {
        self.sub_profile_ids.iter().map(String::as_str)
    }

    pub fn has_sub_profiles(&self) -> bool {
        !self.sub_profile_ids.is_empty()
    }

    pub(crate) fn set_parent_id(&mut self, parent: Option<String>) {
        self.parent_id = parent;
    }

    pub(crate) fn add_sub_profile(&mut self, id: &str) {
        self.sub_profile_ids.insert(id.to_string());
    }

    pub(crate) fn remove_sub_profile(&mut self, id: &str) {
        self.sub_profile_ids.shift_remove(id);
    }

    // Local properties

    pub fn local_property(&self, key: &str) -> Option<&str> {
        self.storage.get(key)
    }

    pub fn local_properties(&self) -> &PropertyStore {
        &self.storage
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        trace!(profile = %self.id, key = %key, "set property");
        self.storage.set(key, value);
        self.changed = true;
    }

    pub fn remove_property(&mut self, key: &str) -> Option<String> {
        trace!(profile = %self.id, key, "remove property");
        self.changed = true;
        self.storage.remove(key)
    }

    pub fn add_properties<K, V, I>(&mut self, properties: I)
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.storage.put_all(properties);
        self.changed = true;
    }

    pub fn clear_local_properties(&mut self) {
        self.storage.clear();
        self.changed = true;
    }

    // Installable units

    /// Add `unit` in its canonical form. Adding a member again is a no-op.
    pub fn add_installable_unit(&mut self, unit: &InstallableUnit) {
        let unit = unit.unresolved();
        if self.units.contains(&unit) {
            return;
        }
        trace!(profile = %self.id, unit = %unit, "add unit");
        self.units.insert(unit);
        self.changed = true;
    }

    /// Remove `unit` from the membership set.
    ///
    /// Its per-unit properties are left in place until
    /// [`clear_orphaned_installable_unit_properties`](Self::clear_orphaned_installable_unit_properties)
    /// runs.
    pub fn remove_installable_unit(&mut self, unit: &InstallableUnit) {
        let unit = unit.unresolved();
        trace!(profile = %self.id, unit = %unit, "remove unit");
        self.units.shift_remove(&unit);
        self.changed = true;
    }

    pub fn contains_installable_unit(&self, unit: &InstallableUnit) -> bool {
        self.units.contains(unit)
    }

    pub fn installable_units(&self) -> impl Iterator<Item = &InstallableUnit> {
        self.units.iter()
    }

    pub fn installable_unit_count(&self) -> usize {
        self.units.len()
    }

    /// Remove every unit together with all per-unit properties.
    pub fn clear_installable_units(&mut self) {
        self.units.clear();
        self.unit_properties.clear();
        self.changed = true;
    }

    // Per-unit properties

    pub fn installable_unit_property(&self, unit: &InstallableUnit, key: &str) -> Option<&str> {
        self.unit_properties.get(unit).and_then(|p| p.get(key))
    }

    /// The properties stored for `unit`; empty when it has none.
    pub fn installable_unit_properties(&self, unit: &InstallableUnit) -> &PropertyStore {
        self.unit_properties.get(unit).unwrap_or(&EMPTY_PROPERTIES)
    }

    pub fn set_installable_unit_property(
        &mut self,
        unit: &InstallableUnit,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.changed = true;
        self.unit_properties
            .entry(unit.unresolved())
            .or_default()
            .set(key, value)
    }

    /// Remove one per-unit property. The unit's map is dropped with its last
    /// key.
    pub fn remove_installable_unit_property(
        &mut self,
        unit: &InstallableUnit,
        key: &str,
    ) -> Option<String> {
        let properties = self.unit_properties.get_mut(unit)?;
        let old = properties.remove(key);
        if properties.is_empty() {
            self.unit_properties.shift_remove(unit);
        }
        self.changed = true;
        old
    }

    pub fn add_installable_unit_properties<K, V, I>(&mut self, unit: &InstallableUnit, properties: I)
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in properties {
            self.set_installable_unit_property(unit, key, value);
        }
    }

    pub fn clear_installable_unit_properties(&mut self, unit: &InstallableUnit) {
        self.unit_properties.shift_remove(unit);
        self.changed = true;
    }

    /// Drop the property maps of units that are no longer members. Returns the
    /// number of maps removed.
    pub fn clear_orphaned_installable_unit_properties(&mut self) -> usize {
        let before = self.unit_properties.len();
        let units = &self.units;
        self.unit_properties.retain(|unit, _| units.contains(unit));
        let removed = before - self.unit_properties.len();
        if removed > 0 {
            trace!(profile = %self.id, removed, "cleared orphaned unit properties");
            self.changed = true;
        }
        removed
    }

    /// Units that carry per-unit properties, members or not.
    pub fn units_with_properties(&self) -> impl Iterator<Item = &InstallableUnit> {
        self.unit_properties.keys()
    }

    // Queries

    /// Run `query` over this profile's units.
    ///
    /// Profile property queries run over the units that carry per-unit
    /// properties instead, and every query sees this profile.
    pub fn query<'a>(&'a self, query: &'a Query) -> QueryResult<'a, InstallableUnit> {
        QueryResult::new(move || {
            let candidates: Box<dyn Iterator<Item = InstallableUnit> + 'a> =
                if query.targets_unit_properties() {
                    Box::new(self.unit_properties.keys().cloned())
                } else {
                    Box::new(self.units.iter().cloned())
                };
            query.perform(candidates, Some(self))
        })
    }

    /// Units available to this profile. Without a surrogate profile layer this
    /// is the same as [`query`](Self::query).
    pub fn available<'a>(&'a self, query: &'a Query) -> QueryResult<'a, InstallableUnit> {
        self.query(query)
    }

    // State

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn set_changed(&mut self, changed: bool) {
        self.changed = changed;
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = Some(timestamp);
    }

    /// An independent copy of this profile's own state with the dirty flag
    /// cleared. Properties of units that are no longer members are not
    /// copied.
    pub fn snapshot(&self) -> Profile {
        let unit_properties = self
            .unit_properties
            .iter()
            .filter(|(unit, _)| self.units.contains(*unit))
            .map(|(unit, properties)| (unit.clone(), properties.clone()))
            .collect();
        Profile {
            id: self.id.clone(),
            parent_id: self.parent_id.clone(),
            sub_profile_ids: self.sub_profile_ids.clone(),
            storage: self.storage.clone(),
            units: self.units.clone(),
            unit_properties,
            changed: false,
            timestamp: self.timestamp,
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Profile({})", self.id)
    }
}
