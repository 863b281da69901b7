//! Static lookup from a Rust type to its group/version/kind.
//!
//! The table is assembled once at startup with [`SchemeBuilder`], published
//! with [`install`], and only read afterwards.

use std::{
    any::{TypeId, type_name},
    collections::{BTreeMap, HashMap},
    sync::OnceLock,
};

use kube::{Resource, core::GroupVersionKind};
use tracing::*;

use crate::{Error, Result};

static SCHEME: OnceLock<Scheme> = OnceLock::new();

#[derive(Clone, Debug)]
struct Entry {
    type_name: &'static str,
    gvk: GroupVersionKind,
}

/// Injective map from type identity to schema coordinates.
#[derive(Clone, Debug, Default)]
pub struct Scheme {
    kinds: HashMap<TypeId, Entry>,
}

impl Scheme {
    pub fn builder() -> SchemeBuilder {
        SchemeBuilder::default()
    }

    /// Coordinates for `K`.
    ///
    /// # Panics
    /// If `K` was never registered. Every handled kind is registered at
    /// startup, so a miss is a wiring bug.
    pub fn kind_for<K: 'static>(&self) -> &GroupVersionKind {
        match self.try_kind_for::<K>() {
            Some(gvk) => gvk,
            None => panic!("{} is not registered in the scheme", type_name::<K>()),
        }
    }

    pub fn try_kind_for<K: 'static>(&self) -> Option<&GroupVersionKind> {
        self.kinds.get(&TypeId::of::<K>()).map(|e| &e.gvk)
    }

    pub fn is_registered<K: 'static>(&self) -> bool {
        self.kinds.contains_key(&TypeId::of::<K>())
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// All registered coordinates, sorted by group, version, kind.
    pub fn kinds(&self) -> Vec<&GroupVersionKind> {
        let mut kinds: Vec<&GroupVersionKind> = self.kinds.values().map(|e| &e.gvk).collect();
        kinds.sort_by(|a, b| (&a.group, &a.version, &a.kind).cmp(&(&b.group, &b.version, &b.kind)));
        kinds
    }
}

#[derive(Default)]
pub struct SchemeBuilder {
    entries: Vec<(TypeId, Entry)>,
}

impl SchemeBuilder {
    /// Register a kind using the coordinates its `kube::Resource` impl reports.
    pub fn register<K>(self) -> Self
    where
        K: Resource<DynamicType = ()> + 'static,
    {
        let gvk = GroupVersionKind::gvk(&K::group(&()), &K::version(&()), &K::kind(&()));
        self.register_as::<K>(gvk)
    }

    /// Register a kind under explicit coordinates.
    pub fn register_as<K: 'static>(mut self, gvk: GroupVersionKind) -> Self {
        self.entries.push((
            TypeId::of::<K>(),
            Entry {
                type_name: type_name::<K>(),
                gvk,
            },
        ));
        self
    }

    /// Freeze the table, refusing any type or coordinate registered twice
    /// with conflicting counterparts.
    pub fn build(self) -> Result<Scheme> {
        let mut kinds: HashMap<TypeId, Entry> = HashMap::new();
        let mut owners: BTreeMap<(String, String, String), &'static str> = BTreeMap::new();
        for (id, entry) in self.entries {
            if let Some(existing) = kinds.get(&id) {
                if existing.gvk == entry.gvk {
                    continue;
                }
                return Err(Error::ConflictingKind(format!(
                    "{} registered as both {} and {}",
                    entry.type_name,
                    fmt_gvk(&existing.gvk),
                    fmt_gvk(&entry.gvk)
                )));
            }
            let key = (
                entry.gvk.group.clone(),
                entry.gvk.version.clone(),
                entry.gvk.kind.clone(),
            );
            if let Some(owner) = owners.get(&key) {
                return Err(Error::ConflictingKind(format!(
                    "{} is claimed by both {} and {}",
                    fmt_gvk(&entry.gvk),
                    owner,
                    entry.type_name
                )));
            }
            debug!("Registering {} as {}", entry.type_name, fmt_gvk(&entry.gvk));
            owners.insert(key, entry.type_name);
            kinds.insert(id, entry);
        }
        Ok(Scheme { kinds })
    }
}

fn fmt_gvk(gvk: &GroupVersionKind) -> String {
    if gvk.group.is_empty() {
        format!("{}/{}", gvk.version, gvk.kind)
    } else {
        format!("{}/{}/{}", gvk.group, gvk.version, gvk.kind)
    }
}

/// Publish the process-wide scheme. Only the first call succeeds.
pub fn install(scheme: Scheme) -> Result<&'static Scheme> {
    let mut fresh = Some(scheme);
    let installed = SCHEME.get_or_init(|| fresh.take().unwrap_or_default());
    if fresh.is_some() {
        return Err(Error::SchemeAlreadyInstalled);
    }
    info!("Installed scheme with {} kinds", installed.len());
    Ok(installed)
}

/// The process-wide scheme.
///
/// # Panics
/// If [`install`] has not run yet.
pub fn global() -> &'static Scheme {
    match SCHEME.get() {
        Some(scheme) => scheme,
        None => panic!("scheme accessed before install"),
    }
}

/// Coordinates of `K` from the process-wide scheme.
pub fn kind_of<K: 'static>() -> GroupVersionKind {
    global().kind_for::<K>().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;
    struct Gadget;
    struct Unlisted;

    fn widget_gvk() -> GroupVersionKind {
        GroupVersionKind::gvk("toys.example.dev", "v1", "Widget")
    }

    #[test]
    fn lookup_returns_registered_coordinates() {
        let scheme = Scheme::builder()
            .register_as::<Widget>(widget_gvk())
            .register_as::<Gadget>(GroupVersionKind::gvk("toys.example.dev", "v1", "Gadget"))
            .build()
            .unwrap();
        assert_eq!(scheme.kind_for::<Widget>(), &widget_gvk());
        assert_eq!(scheme.len(), 2);
        assert!(scheme.try_kind_for::<Unlisted>().is_none());
        let kinds: Vec<&str> = scheme.kinds().iter().map(|g| g.kind.as_str()).collect();
        assert_eq!(kinds, vec!["Gadget", "Widget"]);
    }

    #[test]
    #[should_panic(expected = "is not registered in the scheme")]
    fn unregistered_lookup_panics() {
        let scheme = Scheme::builder().register_as::<Widget>(widget_gvk()).build().unwrap();
        scheme.kind_for::<Unlisted>();
    }

    #[test]
    fn same_coordinates_for_two_types_is_rejected() {
        let err = Scheme::builder()
            .register_as::<Widget>(widget_gvk())
            .register_as::<Gadget>(widget_gvk())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::ConflictingKind(_)));
    }

    #[test]
    fn one_type_under_two_coordinates_is_rejected() {
        let err = Scheme::builder()
            .register_as::<Widget>(widget_gvk())
            .register_as::<Widget>(GroupVersionKind::gvk("toys.example.dev", "v2", "Widget"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::ConflictingKind(_)));
    }

    #[test]
    fn repeated_identical_registration_is_fine() {
        let scheme = Scheme::builder()
            .register_as::<Widget>(widget_gvk())
            .register_as::<Widget>(widget_gvk())
            .build()
            .unwrap();
        assert_eq!(scheme.len(), 1);
    }
}
