//! Dirty tracking over a tree of property groups
//!
//! A [`PropertyGroup`] watches a set of live [`Property`] and
//! [`ListProperty`] values owned by the UI, keeps an "applied" copy of each,
//! and exposes whether anything (including nested groups) differs from the
//! applied state. [`PropertyGroup::apply`] commits the live values,
//! [`PropertyGroup::reset`] throws the edits away.
//!
//! All notifications are synchronous and no internal borrow is held while
//! user callbacks run, so listeners may freely query the group.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{debug, error, warn};

use crate::error::{ApplyError, GroupError};
use crate::list_property::{ListChange, ListKey, ListProperty};
use crate::property::{ListenerList, Property, PropertyId, PropertyKey, Subscription};

mod tracked;

pub use tracked::Equality;
use tracked::{Tracked, TrackedList, TrackedScalar, partial_eq};

/// Handle to a commit listener registered with [`PropertyGroup::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type CommitListener = dyn Fn();

struct Entry {
    record: Rc<dyn Tracked>,
    /// Keeps the group subscribed to the live value; dropped on removal
    _watch: Subscription,
}

struct ChildEntry {
    group: PropertyGroup,
    _watch: Subscription,
}

struct GroupState {
    properties: IndexMap<PropertyId, Entry>,
    lists: IndexMap<PropertyId, Entry>,
    children: Vec<ChildEntry>,
    listeners: ListenerList<CommitListener>,
    parent: Weak<GroupInner>,
}

struct GroupInner {
    name: Option<String>,
    state: RefCell<GroupState>,
    dirty: Property<bool>,
}

/// Node of a settings tree with OK/Apply/Cancel semantics
///
/// Cloning yields another handle onto the same group.
#[derive(Clone)]
pub struct PropertyGroup {
    inner: Rc<GroupInner>,
}

impl Default for PropertyGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyGroup {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Group with a name used in logs and errors
    pub fn named(name: impl Into<String>) -> Self {
        Self::build(Some(name.into()))
    }

    /// Group tracking `properties` from the start
    pub fn with_properties<T: Clone + PartialEq + 'static>(properties: &[&Property<T>]) -> Self {
        let group = Self::new();
        group.add_properties(properties);
        group
    }

    fn build(name: Option<String>) -> Self {
        Self {
            inner: Rc::new(GroupInner {
                name,
                state: RefCell::new(GroupState {
                    properties: IndexMap::new(),
                    lists: IndexMap::new(),
                    children: Vec::new(),
                    listeners: ListenerList::new(),
                    parent: Weak::new(),
                }),
                dirty: Property::new(false),
            }),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    fn label(&self) -> &str {
        self.name().unwrap_or("<unnamed>")
    }

    /// True when both handles point at the same group
    pub fn ptr_eq(&self, other: &PropertyGroup) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ==========================================================================
    // Scalars
    // ==========================================================================

    /// Track `source`, comparing with `PartialEq`
    ///
    /// The applied copy starts out equal to the current live value. Adding the
    /// same source again replaces the previous record and its applied copy.
    pub fn add_property<T: Clone + PartialEq + 'static>(&self, source: &Property<T>) -> PropertyKey<T> {
        self.add_property_with_eq(source, partial_eq())
    }

    /// Track `source` using a caller-supplied equality
    pub fn add_property_with_eq<T: Clone + PartialEq + 'static>(
        &self,
        source: &Property<T>,
        eq: Equality<T>,
    ) -> PropertyKey<T> {
        let record: Rc<dyn Tracked> = Rc::new(TrackedScalar::new(source, eq));
        let refresh = self.refresher();
        let watch = source.subscribe(move |_, _| refresh());
        self.insert_entry(source.id(), Entry { record, _watch: watch }, false);
        source.key()
    }

    /// Track `source` and call `listener` with `(old, new)` whenever its
    /// applied value changes, i.e. on commit rather than on live edits
    pub fn add_property_with_listener<T: Clone + PartialEq + 'static>(
        &self,
        source: &Property<T>,
        listener: impl Fn(&T, &T) + 'static,
    ) -> PropertyKey<T> {
        let key = self.add_property(source);
        if let Some(applied) = self.applied_property(key) {
            // lives exactly as long as the applied copy
            applied.subscribe(listener).detach();
        }
        key
    }

    pub fn add_properties<T: Clone + PartialEq + 'static>(&self, properties: &[&Property<T>]) -> Vec<PropertyKey<T>> {
        properties.iter().map(|property| self.add_property(property)).collect()
    }

    /// Stop tracking a scalar and drop the subscription on its live value
    ///
    /// Returns false when the key was not tracked.
    pub fn remove_property<T>(&self, key: impl Into<PropertyKey<T>>) -> bool {
        let id = key.into().id();
        let removed = self.inner.state.borrow_mut().properties.shift_remove(&id);
        self.finish_removal(id, removed)
    }

    /// Current applied copy of a tracked scalar
    pub fn applied_value<T: Clone + PartialEq + 'static>(&self, key: impl Into<PropertyKey<T>>) -> Option<T> {
        self.applied_property(key.into()).map(|applied| applied.get())
    }

    /// Attach another listener to the applied copy of a tracked scalar
    ///
    /// The listener stays registered as long as the returned subscription.
    pub fn add_listener_to_property<T: Clone + PartialEq + 'static>(
        &self,
        key: impl Into<PropertyKey<T>>,
        listener: impl Fn(&T, &T) + 'static,
    ) -> Result<Subscription, GroupError> {
        let key = key.into();
        let applied = self
            .applied_property(key)
            .ok_or(GroupError::NotTracked(key.id()))?;
        Ok(applied.subscribe(listener))
    }

    fn applied_property<T: Clone + PartialEq + 'static>(&self, key: PropertyKey<T>) -> Option<Property<T>> {
        let state = self.inner.state.borrow();
        let entry = state.properties.get(&key.id())?;
        entry
            .record
            .as_any()
            .downcast_ref::<TrackedScalar<T>>()
            .map(|scalar| scalar.applied.clone())
    }

    pub fn property_count(&self) -> usize {
        self.inner.state.borrow().properties.len()
    }

    // ==========================================================================
    // Lists
    // ==========================================================================

    /// Track a list, comparing elements with `PartialEq`
    pub fn add_list_property<T: Clone + PartialEq + 'static>(&self, source: &ListProperty<T>) -> ListKey<T> {
        self.add_list_property_with_eq(source, partial_eq())
    }

    pub fn add_list_property_with_eq<T: Clone + 'static>(
        &self,
        source: &ListProperty<T>,
        eq: Equality<T>,
    ) -> ListKey<T> {
        let record: Rc<dyn Tracked> = Rc::new(TrackedList::new(source, eq));
        let refresh = self.refresher();
        let watch = source.subscribe(move |_| refresh());
        self.insert_entry(source.id(), Entry { record, _watch: watch }, true);
        source.key()
    }

    /// Track a list and report structural changes of its applied copy
    pub fn add_list_property_with_listener<T: Clone + PartialEq + 'static>(
        &self,
        source: &ListProperty<T>,
        listener: impl Fn(&ListChange<T>) + 'static,
    ) -> ListKey<T> {
        let key = self.add_list_property(source);
        if let Some(applied) = self.applied_list_property(key) {
            applied.subscribe(listener).detach();
        }
        key
    }

    pub fn add_list_properties<T: Clone + PartialEq + 'static>(&self, lists: &[&ListProperty<T>]) -> Vec<ListKey<T>> {
        lists.iter().map(|list| self.add_list_property(list)).collect()
    }

    pub fn remove_list_property<T>(&self, key: impl Into<ListKey<T>>) -> bool {
        let id = key.into().id();
        let removed = self.inner.state.borrow_mut().lists.shift_remove(&id);
        self.finish_removal(id, removed)
    }

    /// Current applied copy of a tracked list
    pub fn applied_list<T: Clone + 'static>(&self, key: impl Into<ListKey<T>>) -> Option<Vec<T>> {
        self.applied_list_property(key.into()).map(|applied| applied.get())
    }

    fn applied_list_property<T: Clone + 'static>(&self, key: ListKey<T>) -> Option<ListProperty<T>> {
        let state = self.inner.state.borrow();
        let entry = state.lists.get(&key.id())?;
        entry
            .record
            .as_any()
            .downcast_ref::<TrackedList<T>>()
            .map(|list| list.applied.clone())
    }

    pub fn list_property_count(&self) -> usize {
        self.inner.state.borrow().lists.len()
    }

    // ==========================================================================
    // Child groups
    // ==========================================================================

    /// Nest `child` under this group
    ///
    /// A group has at most one parent, and may not be added below itself.
    pub fn add_group(&self, child: &PropertyGroup) -> Result<(), GroupError> {
        if self.ptr_eq(child) || self.ancestors().any(|ancestor| ancestor.ptr_eq(child)) {
            return Err(GroupError::Cycle(child.label().to_string()));
        }
        if child.parent().is_some() {
            return Err(GroupError::AlreadyAttached(child.label().to_string()));
        }

        let refresh = self.refresher();
        let watch = child.inner.dirty.subscribe(move |_, _| refresh());
        child.inner.state.borrow_mut().parent = Rc::downgrade(&self.inner);
        self.inner.state.borrow_mut().children.push(ChildEntry {
            group: child.clone(),
            _watch: watch,
        });
        debug!(group = self.label(), child = child.label(), "Added child group");
        self.refresh();
        Ok(())
    }

    /// Detach `child`; returns false when it is not a direct child
    pub fn remove_group(&self, child: &PropertyGroup) -> bool {
        let removed = {
            let mut state = self.inner.state.borrow_mut();
            let index = state.children.iter().position(|entry| entry.group.ptr_eq(child));
            index.map(|index| state.children.remove(index))
        };
        match removed {
            Some(entry) => {
                entry.group.inner.state.borrow_mut().parent = Weak::new();
                drop(entry);
                debug!(group = self.label(), child = child.label(), "Removed child group");
                self.refresh();
                true
            }
            None => false,
        }
    }

    pub fn children(&self) -> Vec<PropertyGroup> {
        self.inner
            .state
            .borrow()
            .children
            .iter()
            .map(|entry| entry.group.clone())
            .collect()
    }

    pub fn parent(&self) -> Option<PropertyGroup> {
        self.inner
            .state
            .borrow()
            .parent
            .upgrade()
            .map(|inner| PropertyGroup { inner })
    }

    fn ancestors(&self) -> impl Iterator<Item = PropertyGroup> {
        std::iter::successors(self.parent(), |group| group.parent())
    }

    // ==========================================================================
    // Commit listeners
    // ==========================================================================

    /// Register a listener called once after every successful commit
    pub fn add_listener(&self, listener: impl Fn() + 'static) -> ListenerId {
        let id = self.inner.state.borrow_mut().listeners.insert(Rc::new(listener));
        ListenerId(id)
    }

    pub fn add_listeners<F>(&self, listeners: impl IntoIterator<Item = F>) -> Vec<ListenerId>
    where
        F: Fn() + 'static,
    {
        listeners.into_iter().map(|listener| self.add_listener(listener)).collect()
    }

    /// Unregister listeners; unknown ids are ignored
    pub fn remove_listeners(&self, ids: &[ListenerId]) {
        let mut state = self.inner.state.borrow_mut();
        for id in ids {
            if !state.listeners.remove(id.0) {
                warn!(group = self.label(), listener = id.0, "Tried to remove unknown listener");
            }
        }
    }

    // ==========================================================================
    // Dirty state
    // ==========================================================================

    /// Recompute whether any tracked value or child group differs from its
    /// applied state
    pub fn is_changed(&self) -> bool {
        let state = self.inner.state.borrow();
        state.properties.values().any(|entry| entry.record.is_changed())
            || state.lists.values().any(|entry| entry.record.is_changed())
            || state.children.iter().any(|entry| entry.group.is_changed())
    }

    /// Cached dirty flag, refreshed after every tracked mutation
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Be told `(is_dirty)` whenever the cached flag flips
    pub fn subscribe_dirty(&self, listener: impl Fn(bool) + 'static) -> Subscription {
        self.inner.dirty.subscribe(move |_, dirty| listener(*dirty))
    }

    /// Recompute and store the dirty flag, returning it
    fn refresh(&self) -> bool {
        let changed = self.is_changed();
        self.inner.dirty.set(changed);
        changed
    }

    /// Listener that refreshes this group without keeping it alive
    fn refresher(&self) -> impl Fn() + use<> {
        let weak = Rc::downgrade(&self.inner);
        move || {
            if let Some(inner) = weak.upgrade() {
                PropertyGroup { inner }.refresh();
            }
        }
    }

    // ==========================================================================
    // Commit / discard
    // ==========================================================================

    /// Commit live values to the applied state
    ///
    /// Does nothing when the group is clean. Otherwise every scalar is copied,
    /// every list reconciled, every child applied, and the commit listeners
    /// notified in registration order. If the group is still dirty afterwards
    /// (an equality that never holds, e.g. `NaN`), the listeners still run and
    /// [`ApplyError::StillDirty`] is returned.
    pub fn apply(&self) -> Result<(), ApplyError> {
        if !self.is_changed() {
            debug!(group = self.label(), "Nothing to apply");
            return Ok(());
        }

        let (properties, lists, children) = self.snapshot();
        for record in properties.iter().chain(lists.iter()) {
            record.apply();
        }

        let mut child_error = None;
        for child in &children {
            if let Err(err) = child.apply() {
                child_error.get_or_insert(err);
            }
        }

        let outcome = if self.refresh() {
            let properties = properties.iter().filter(|record| record.is_changed()).count();
            let lists = lists.iter().filter(|record| record.is_changed()).count();
            let dirty_children = children.iter().filter(|child| child.is_changed()).count();
            error!(
                group = self.label(),
                properties,
                lists,
                children = dirty_children,
                "PropertyGroup apply failed, group is still dirty"
            );
            Err(match child_error {
                Some(err) => ApplyError::Child(Box::new(err)),
                None => ApplyError::StillDirty {
                    group: self.label().to_string(),
                    properties,
                    lists,
                    children: dirty_children,
                },
            })
        } else {
            debug!(
                group = self.label(),
                properties = properties.len(),
                lists = lists.len(),
                children = children.len(),
                "Applied changes"
            );
            Ok(())
        };

        let listeners = self.inner.state.borrow().listeners.snapshot();
        for listener in listeners {
            listener();
        }
        outcome
    }

    /// Revert live values to the applied state
    ///
    /// Unconditional and silent: commit listeners are not called.
    pub fn reset(&self) {
        let (properties, lists, children) = self.snapshot();
        for record in properties.iter().chain(lists.iter()) {
            record.reset();
        }
        for child in &children {
            child.reset();
        }
        debug!(group = self.label(), "Reset changes");
    }

    /// Clone out the records so user callbacks never run under a borrow
    fn snapshot(&self) -> (Vec<Rc<dyn Tracked>>, Vec<Rc<dyn Tracked>>, Vec<PropertyGroup>) {
        let state = self.inner.state.borrow();
        (
            state.properties.values().map(|entry| Rc::clone(&entry.record)).collect(),
            state.lists.values().map(|entry| Rc::clone(&entry.record)).collect(),
            state.children.iter().map(|entry| entry.group.clone()).collect(),
        )
    }

    fn insert_entry(&self, id: PropertyId, entry: Entry, list: bool) {
        let replaced = {
            let mut state = self.inner.state.borrow_mut();
            let map = if list { &mut state.lists } else { &mut state.properties };
            map.insert(id, entry)
        };
        if replaced.is_some() {
            debug!(group = self.label(), property = %id, "Replaced tracked value");
        }
        // old subscription is dropped here, outside the borrow
        drop(replaced);
        self.refresh();
    }

    fn finish_removal(&self, id: PropertyId, removed: Option<Entry>) -> bool {
        match removed {
            Some(entry) => {
                drop(entry);
                debug!(group = self.label(), property = %id, "Stopped tracking value");
                self.refresh();
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for PropertyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("PropertyGroup")
            .field("name", &self.inner.name)
            .field("properties", &state.properties.len())
            .field("lists", &state.lists.len())
            .field("children", &state.children)
            .field("dirty", &self.inner.dirty.get())
            .finish()
    }
}

impl fmt::Debug for ChildEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.group, f)
    }
}
