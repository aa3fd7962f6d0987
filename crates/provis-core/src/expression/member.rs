//! Member access dispatch.
//!
//! Members are resolved through an explicit `(type tag, name)` table instead of
//! by-name reflection. The factory resolves an [`Accessor`] eagerly when the
//! target of a member expression is a literal; otherwise evaluation looks the
//! pair up using the runtime tag of the target value.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use super::value::{TypeTag, Value};

pub type AccessorFn = fn(&Value) -> Option<Value>;

/// A resolved member accessor.
///
/// Compared and hashed by its `(tag, name)` key.
#[derive(Clone, Copy)]
pub struct Accessor {
    tag: TypeTag,
    name: &'static str,
    get: AccessorFn,
}

impl Accessor {
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Apply the accessor. `None` when `target` is not of the accessor's type.
    pub fn apply(&self, target: &Value) -> Option<Value> {
        if target.tag() != self.tag {
            return None;
        }
        (self.get)(target)
    }
}

impl PartialEq for Accessor {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.name == other.name
    }
}

impl Eq for Accessor {}

impl Hash for Accessor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Accessor({}.{})", self.tag, self.name)
    }
}

/// Table mapping `(type tag, member name)` to accessor functions.
#[derive(Debug, Default)]
pub struct MemberRegistry {
    accessors: HashMap<(TypeTag, &'static str), Accessor>,
}

impl MemberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The members every expression can use.
    pub fn standard() -> &'static MemberRegistry {
        static STANDARD: OnceLock<MemberRegistry> = OnceLock::new();
        STANDARD.get_or_init(|| {
            let mut registry = MemberRegistry::new();
            registry.register_standard_members();
            registry
        })
    }

    pub fn register(&mut self, tag: TypeTag, name: &'static str, get: AccessorFn) {
        self.accessors.insert((tag, name), Accessor { tag, name, get });
    }

    pub fn resolve(&self, tag: TypeTag, name: &str) -> Option<Accessor> {
        self.accessors.get(&(tag, name)).copied()
    }

    pub fn members_of(&self, tag: TypeTag) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .accessors
            .keys()
            .filter(|(t, _)| *t == tag)
            .map(|(_, n)| *n)
            .collect();
        names.sort_unstable();
        names
    }

    fn register_standard_members(&mut self) {
        self.register(TypeTag::Unit, "id", |v| {
            v.as_unit().map(|u| Value::String(u.id().to_string()))
        });
        self.register(TypeTag::Unit, "version", |v| {
            v.as_unit().map(|u| Value::Version(u.version().clone()))
        });
        self.register(TypeTag::Unit, "properties", |v| {
            v.as_unit().map(|u| Value::from_properties(u.properties()))
        });
        self.register(TypeTag::Unit, "touchpointType", |v| {
            v.as_unit().map(|u| {
                u.touchpoint_type()
                    .map(|t| Value::String(t.id.clone()))
                    .unwrap_or(Value::Null)
            })
        });
        self.register(TypeTag::Unit, "artifacts", |v| {
            v.as_unit().map(|u| {
                Value::Collection(
                    u.artifacts()
                        .iter()
                        .map(|key| Value::String(key.to_string()))
                        .collect(),
                )
            })
        });
        self.register(TypeTag::Unit, "fragments", |v| {
            v.as_unit().map(|u| {
                Value::Collection(
                    u.fragments()
                        .iter()
                        .map(|f| Value::String(f.id.clone()))
                        .collect(),
                )
            })
        });

        self.register(TypeTag::Version, "major", |v| match v {
            Value::Version(version) => i64::try_from(version.major).ok().map(Value::Integer),
            _ => None,
        });
        self.register(TypeTag::Version, "minor", |v| match v {
            Value::Version(version) => i64::try_from(version.minor).ok().map(Value::Integer),
            _ => None,
        });
        self.register(TypeTag::Version, "patch", |v| match v {
            Value::Version(version) => i64::try_from(version.patch).ok().map(Value::Integer),
            _ => None,
        });
        self.register(TypeTag::Version, "qualifier", |v| match v {
            Value::Version(version) => Some(Value::String(version.pre.as_str().to_string())),
            _ => None,
        });

        self.register(TypeTag::Filter, "text", |v| match v {
            Value::Filter(filter) => Some(Value::String(filter.text().to_string())),
            _ => None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::InstallableUnit;
    use semver::Version;

    #[test]
    fn standard_members_resolve_by_tag_and_name() {
        let registry = MemberRegistry::standard();
        let accessor = registry.resolve(TypeTag::Unit, "id").expect("id member");
        let unit = InstallableUnit::builder("org.example", Version::new(1, 0, 0)).build();

        assert_eq!(
            accessor.apply(&Value::Unit(unit)),
            Some(Value::String("org.example".to_string()))
        );
        assert!(registry.resolve(TypeTag::String, "id").is_none());
    }

    #[test]
    fn accessor_rejects_other_types() {
        let accessor = MemberRegistry::standard()
            .resolve(TypeTag::Version, "major")
            .expect("major member");
        assert_eq!(accessor.apply(&Value::Integer(3)), None);
        assert_eq!(
            accessor.apply(&Value::Version(Version::new(3, 1, 0))),
            Some(Value::Integer(3))
        );
    }

    #[test]
    fn runtime_member_names_resolve() {
        let name = String::from("minor");
        let accessor = MemberRegistry::standard()
            .resolve(TypeTag::Version, &name)
            .expect("minor member");
        assert_eq!(
            accessor.apply(&Value::Version(Version::new(3, 1, 0))),
            Some(Value::Integer(1))
        );
        assert!(MemberRegistry::standard().resolve(TypeTag::Version, "build").is_none());
    }

    #[test]
    fn members_of_lists_sorted_names() {
        let names = MemberRegistry::standard().members_of(TypeTag::Version);
        assert_eq!(names, vec!["major", "minor", "patch", "qualifier"]);
    }
}
