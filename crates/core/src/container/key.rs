use std::any::TypeId;
use std::fmt;

/// Identifies a binding: the bound type plus an optional qualifier, so the
/// same type can be bound more than once (e.g. one config per prefix).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Key {
    type_id: TypeId,
    type_name: &'static str,
    qualifier: Option<String>,
}

impl Key {
    /// Key for an unqualified binding of `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            qualifier: None,
        }
    }

    /// Key for a binding of `T` qualified by `qualifier`
    pub fn qualified<T: ?Sized + 'static>(qualifier: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            ..Self::of::<T>()
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{} qualified with \"{}\"", self.type_name, qualifier),
            None => f.write_str(self.type_name),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter {}

    #[test]
    fn test_keys_compare_by_type_and_qualifier() {
        assert_eq!(Key::of::<String>(), Key::of::<String>());
        assert_ne!(Key::of::<String>(), Key::of::<u32>());
        assert_ne!(Key::of::<String>(), Key::qualified::<String>("db"));
        assert_eq!(Key::qualified::<String>("db"), Key::qualified::<String>("db"));
    }

    #[test]
    fn test_key_for_trait_object() {
        let key = Key::of::<dyn Greeter>();
        assert!(key.type_name().contains("Greeter"));
        assert_eq!(Key::qualified::<u8>("x").to_string(), "u8 qualified with \"x\"");
    }
}
