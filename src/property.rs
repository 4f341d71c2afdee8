//! Observable scalar values
//!
//! A [`Property`] is a shared, single-threaded cell that notifies its
//! subscribers whenever the stored value changes. UI controls hold one end,
//! a [`PropertyGroup`](crate::PropertyGroup) watches the other.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PROPERTY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Property`] or [`ListProperty`](crate::ListProperty)
///
/// Clones of a property share its id, so it can be used as a registry key
/// without relying on pointer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(u64);

impl PropertyId {
    pub(crate) fn next() -> Self {
        Self(NEXT_PROPERTY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered listener registry shared by properties, lists and groups
pub(crate) struct ListenerList<F: ?Sized> {
    next_id: u64,
    entries: Vec<(u64, Rc<F>)>,
}

impl<F: ?Sized> ListenerList<F> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, listener: Rc<F>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Clone out the listeners so they can run without holding a borrow
    pub(crate) fn snapshot(&self) -> Vec<Rc<F>> {
        self.entries.iter().map(|(_, listener)| Rc::clone(listener)).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Handle to a registered listener
///
/// Dropping the subscription (or calling [`Subscription::unsubscribe`])
/// removes the listener. Use [`Subscription::detach`] to keep the listener
/// alive for as long as the observed value lives.
#[must_use = "dropping a Subscription removes the listener immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Remove the listener now
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keep the listener registered for the lifetime of the observed value
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

type ChangeListener<T> = dyn Fn(&T, &T);

struct PropertyInner<T> {
    value: T,
    listeners: ListenerList<ChangeListener<T>>,
}

/// Shared observable value
///
/// Cloning a `Property` yields another handle onto the same cell. Absent
/// values are modelled with `Property<Option<T>>`.
pub struct Property<T> {
    id: PropertyId,
    inner: Rc<RefCell<PropertyInner<T>>>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Property<T> {
    pub fn new(value: T) -> Self {
        Self {
            id: PropertyId::next(),
            inner: Rc::new(RefCell::new(PropertyInner {
                value,
                listeners: ListenerList::new(),
            })),
        }
    }

    pub fn id(&self) -> PropertyId {
        self.id
    }

    /// Typed registry key for this property
    pub fn key(&self) -> PropertyKey<T> {
        PropertyKey::new(self.id)
    }

    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Store `value` and notify subscribers with `(old, new)`
    ///
    /// Returns false (and notifies nobody) when `value` equals the current
    /// value.
    pub fn set(&self, value: T) -> bool {
        let old = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return false;
            }
            std::mem::replace(&mut inner.value, value)
        };

        let (listeners, new) = {
            let inner = self.inner.borrow();
            (inner.listeners.snapshot(), inner.value.clone())
        };
        for listener in listeners {
            listener(&old, &new);
        }
        true
    }

    /// Register a change listener, called with `(old, new)` after each change
    pub fn subscribe(&self, listener: impl Fn(&T, &T) + 'static) -> Subscription {
        let listener: Rc<ChangeListener<T>> = Rc::new(listener);
        let id = self.inner.borrow_mut().listeners.insert(listener);
        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().listeners.remove(id);
            }
        })
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("id", &self.id)
            .field("value", &self.inner.borrow().value)
            .finish()
    }
}

/// Typed key of a scalar tracked by a [`PropertyGroup`](crate::PropertyGroup)
pub struct PropertyKey<T> {
    id: PropertyId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PropertyKey<T> {
    pub(crate) fn new(id: PropertyId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> PropertyId {
        self.id
    }
}

impl<T> Clone for PropertyKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PropertyKey<T> {}

impl<T> PartialEq for PropertyKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for PropertyKey<T> {}

impl<T> fmt::Debug for PropertyKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyKey({})", self.id)
    }
}

impl<T> From<&Property<T>> for PropertyKey<T> {
    fn from(property: &Property<T>) -> Self {
        Self::new(property.id)
    }
}
