//! The caller's context value, handed unchanged to executors and subscribers.

use std::any::Any;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

/// A thread-safe context that stores values by type.
///
/// Clones share the same storage, so a value inserted by the caller is visible to the
/// executor of a delegated request and the other way round. Values are cloned when
/// retrieved; wrap expensive values in an `Arc`.
///
/// ```ignore
/// let context = Context::new();
/// context.insert(42);
/// assert_eq!(context.get::<i32>(), Some(42));
/// ```
#[derive(Clone, Default)]
pub struct Context {
    entries: Arc<DashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a value from the context by type.
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        let value = self.entries.get(&TypeId::of::<T>())?.value().clone();
        value.downcast::<T>().ok().map(|value| T::clone(&value))
    }

    /// Inserts a value into the context, replacing any value of the same type.
    pub fn insert<T: Clone + Send + Sync + 'static>(&self, value: T) {
        self.entries.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Removes a value from the context.
    pub fn remove<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        let (_, value) = self.entries.remove(&TypeId::of::<T>())?;
        value.downcast::<T>().ok().map(|value| T::clone(&value))
    }

    pub fn contains<T: Clone + Send + Sync + 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct UserId(String);

    #[test]
    fn clones_share_values() {
        let context = Context::new();
        let clone = context.clone();
        clone.insert(UserId("u1".to_string()));
        assert_eq!(context.get::<UserId>(), Some(UserId("u1".to_string())));
        assert!(context.contains::<UserId>());
        assert_eq!(context.remove::<UserId>(), Some(UserId("u1".to_string())));
        assert!(clone.get::<UserId>().is_none());
    }

    #[test]
    fn insert_overwrites_same_type() {
        let context = Context::new();
        context.insert(1_u32);
        context.insert(2_u32);
        context.insert("other".to_string());
        assert_eq!(context.get::<u32>(), Some(2));
        assert_eq!(context.get::<String>().as_deref(), Some("other"));
    }
}
