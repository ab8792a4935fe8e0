//! Typed message attributes.
//!
//! Attributes attach arbitrary typed metadata to a message. They are never
//! rendered onto the wire, but they do take part in message equality and
//! hashing, so every value type must be comparable and hashable.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// A typed key for an attribute value of type `T`.
///
/// Two keys address the same slot if their names and value types match.
pub struct AttributeKey<T> {
    name: Cow<'static, str>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> AttributeKey<T> {
    pub fn new<S: Into<Cow<'static, str>>>(name: S) -> Self {
        Self { name: name.into(), _phantom: PhantomData }
    }

    /// Allows declaring keys as `static` items.
    pub const fn from_static(name: &'static str) -> Self {
        Self { name: Cow::Borrowed(name), _phantom: PhantomData }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn erased(&self) -> ErasedKey {
        ErasedKey { name: self.name.clone(), type_id: TypeId::of::<T>() }
    }
}

impl<T> Clone for AttributeKey<T> {
    fn clone(&self) -> Self {
        Self { name: self.name.clone(), _phantom: PhantomData }
    }
}

impl<T> fmt::Debug for AttributeKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AttributeKey").field(&self.name).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct ErasedKey {
    name: Cow<'static, str>,
    type_id: TypeId,
}

/// Object safe view over an attribute value.
trait AttributeValue: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;

    fn dyn_eq(&self, other: &dyn AttributeValue) -> bool;

    fn dyn_hash(&self, state: &mut dyn Hasher);
}

impl<T> AttributeValue for T
where
    T: Any + Send + Sync + fmt::Debug + PartialEq + Hash,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn AttributeValue) -> bool {
        other.as_any().downcast_ref::<T>().is_some_and(|other| self == other)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state);
    }
}

/// The attribute map of a message.
///
/// Copy-on-write: values are shared between clones, mutators return a new map.
#[derive(Clone, Default)]
pub struct Attributes {
    entries: BTreeMap<ErasedKey, Arc<dyn AttributeValue>>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the value stored under `key`.
    ///
    /// The key carries the value type, so the downcast cannot fail for a value
    /// inserted through the same key; it is still checked.
    pub fn get<T: 'static>(&self, key: &AttributeKey<T>) -> Option<&T> {
        self.entries.get(&key.erased()).and_then(|value| value.as_ref().as_any().downcast_ref::<T>())
    }

    pub fn contains<T: 'static>(&self, key: &AttributeKey<T>) -> bool {
        self.entries.contains_key(&key.erased())
    }

    #[must_use]
    pub fn insert<T>(mut self, key: &AttributeKey<T>, value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Debug + PartialEq + Hash,
    {
        self.entries.insert(key.erased(), Arc::new(value));
        self
    }

    #[must_use]
    pub fn remove<T: 'static>(mut self, key: &AttributeKey<T>) -> Self {
        self.entries.remove(&key.erased());
        self
    }

    /// Iterates over the attribute names in key order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|key| key.name.as_ref())
    }
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().zip(other.entries.iter()).all(|((key, value), (other_key, other_value))| {
                key == other_key && value.as_ref().dyn_eq(other_value.as_ref())
            })
    }
}

impl Eq for Attributes {}

impl Hash for Attributes {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.entries.len());
        for (key, value) in &self.entries {
            key.hash(state);
            value.as_ref().dyn_hash(state);
        }
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter().map(|(key, value)| (&key.name, value))).finish()
    }
}
