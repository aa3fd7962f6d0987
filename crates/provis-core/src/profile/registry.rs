//! Arena of profiles keyed by id.

use indexmap::IndexMap;
use tracing::debug;

use super::{Profile, ProfileError};
use crate::config::ProfileDefaults;
use crate::properties::PropertyStore;

/// Owns every profile and keeps parent/child ids consistent.
///
/// Parent links are ids into this registry, and [`set_parent`](Self::set_parent)
/// refuses links that would make a profile its own ancestor, so inherited
/// lookups always terminate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileRegistry {
    profiles: IndexMap<String, Profile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a profile, optionally under `parent`.
    pub fn add_profile(
        &mut self,
        id: &str,
        parent: Option<&str>,
        properties: PropertyStore,
    ) -> Result<&mut Profile, ProfileError> {
        if self.profiles.contains_key(id) {
            return Err(ProfileError::Duplicate(id.to_string()));
        }
        if let Some(parent) = parent {
            if !self.profiles.contains_key(parent) {
                return Err(ProfileError::NotFound(parent.to_string()));
            }
        }

        let mut profile = Profile::new(id, properties)?;
        if let Some(parent) = parent {
            profile.set_parent_id(Some(parent.to_string()));
            self.lookup_mut(parent)?.add_sub_profile(id);
        }
        debug!(profile = id, parent = ?parent, "added profile");
        Ok(self.profiles.entry(id.to_string()).or_insert(profile))
    }

    /// Create a profile seeded with configured default properties.
    ///
    /// Defaults go only into root profiles; sub-profiles inherit them. Values
    /// in `properties` win over the defaults.
    pub fn add_profile_with_defaults(
        &mut self,
        id: &str,
        parent: Option<&str>,
        defaults: &ProfileDefaults,
        properties: PropertyStore,
    ) -> Result<&mut Profile, ProfileError> {
        if parent.is_some() {
            return self.add_profile(id, parent, properties);
        }
        let mut seeded = defaults.properties.clone();
        seeded.put_all(properties.iter());
        self.add_profile(id, None, seeded)
    }

    /// Remove a profile that has no sub-profiles, detaching it from its parent.
    pub fn remove_profile(&mut self, id: &str) -> Result<Profile, ProfileError> {
        let profile = self.lookup(id)?;
        if profile.has_sub_profiles() {
            return Err(ProfileError::HasSubProfiles(id.to_string()));
        }
        if let Some(parent) = profile.parent_id().map(str::to_string) {
            if let Some(parent) = self.profiles.get_mut(&parent) {
                parent.remove_sub_profile(id);
            }
        }
        debug!(profile = id, "removed profile");
        self.profiles
            .shift_remove(id)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<&Profile> {
        self.profiles.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Profile> {
        self.profiles.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.profiles.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    fn lookup(&self, id: &str) -> Result<&Profile, ProfileError> {
        self.profiles
            .get(id)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))
    }

    fn lookup_mut(&mut self, id: &str) -> Result<&mut Profile, ProfileError> {
        self.profiles
            .get_mut(id)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))
    }

    /// Re-parent `id`, removing it from its old parent's children first.
    pub fn set_parent(&mut self, id: &str, parent: Option<&str>) -> Result<(), ProfileError> {
        let current = self.lookup(id)?.parent_id().map(str::to_string);
        if current.as_deref() == parent {
            return Ok(());
        }
        if let Some(parent) = parent {
            self.lookup(parent)?;
            if parent == id || self.ancestors(parent).any(|p| p.id() == id) {
                return Err(ProfileError::CyclicParent {
                    child: id.to_string(),
                    parent: parent.to_string(),
                });
            }
        }

        if let Some(old) = current {
            if let Some(old) = self.profiles.get_mut(&old) {
                old.remove_sub_profile(id);
            }
        }
        if let Some(parent) = parent {
            self.lookup_mut(parent)?.add_sub_profile(id);
        }
        self.lookup_mut(id)?
            .set_parent_id(parent.map(str::to_string));
        Ok(())
    }

    /// Ancestors of `id`, nearest first. Empty when `id` is unknown.
    pub fn ancestors<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Profile> + 'a {
        let mut next = self.profiles.get(id).and_then(|p| p.parent_id());
        std::iter::from_fn(move || {
            let parent = self.profiles.get(next?)?;
            next = parent.parent_id();
            Some(parent)
        })
    }

    /// The nearest value of `key` along the parent chain, starting with `id`.
    pub fn property(&self, id: &str, key: &str) -> Result<Option<&str>, ProfileError> {
        let profile = self.lookup(id)?;
        Ok(std::iter::once(profile)
            .chain(self.ancestors(id))
            .find_map(|p| p.local_property(key)))
    }

    /// The parent chain's properties overlaid root first, so nearer values win.
    pub fn properties(&self, id: &str) -> Result<PropertyStore, ProfileError> {
        let profile = self.lookup(id)?;
        let mut chain: Vec<&Profile> = std::iter::once(profile).chain(self.ancestors(id)).collect();
        chain.reverse();

        let mut merged = PropertyStore::new();
        for profile in chain {
            merged.put_all(profile.local_properties().iter());
        }
        Ok(merged)
    }

    /// A self-contained registry holding copies of `id` and its ancestors.
    ///
    /// Every copy has its dirty flag cleared; later changes to either side
    /// are not seen by the other.
    pub fn snapshot(&self, id: &str) -> Result<ProfileRegistry, ProfileError> {
        let profile = self.lookup(id)?;
        let mut chain: Vec<&Profile> = std::iter::once(profile).chain(self.ancestors(id)).collect();
        chain.reverse();

        let mut snapshot = ProfileRegistry::new();
        for profile in chain {
            snapshot
                .profiles
                .insert(profile.id().to_string(), profile.snapshot());
        }
        Ok(snapshot)
    }

    /// Put the copy of `id` held by `snapshot` back in place.
    pub fn restore(&mut self, snapshot: &ProfileRegistry, id: &str) -> Result<(), ProfileError> {
        let saved = snapshot.lookup(id)?.snapshot();
        let slot = self.lookup_mut(id)?;
        *slot = saved;
        debug!(profile = id, "restored profile from snapshot");
        Ok(())
    }
}
