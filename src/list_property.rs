//! Observable ordered lists

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::property::{ListenerList, PropertyId, Subscription};

/// Structural change reported to [`ListProperty`] subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum ListChange<T> {
    /// `items` were inserted starting at `index`
    Added { index: usize, items: Vec<T> },
    /// `items` were removed; `index` is where the first of them used to be
    Removed { index: usize, items: Vec<T> },
    /// The whole content was swapped
    Replaced { old: Vec<T>, new: Vec<T> },
}

type ListListener<T> = dyn Fn(&ListChange<T>);

struct ListInner<T> {
    items: Vec<T>,
    listeners: ListenerList<ListListener<T>>,
}

/// Shared observable list
///
/// Every structural mutation notifies subscribers synchronously, before the
/// mutating call returns.
pub struct ListProperty<T> {
    id: PropertyId,
    inner: Rc<RefCell<ListInner<T>>>,
}

impl<T> Clone for ListProperty<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> ListProperty<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            id: PropertyId::next(),
            inner: Rc::new(RefCell::new(ListInner {
                items,
                listeners: ListenerList::new(),
            })),
        }
    }

    pub fn id(&self) -> PropertyId {
        self.id
    }

    pub fn key(&self) -> ListKey<T> {
        ListKey::new(self.id)
    }

    /// Copy of the current items
    pub fn get(&self) -> Vec<T> {
        self.inner.borrow().items.clone()
    }

    pub fn get_at(&self, index: usize) -> Option<T> {
        self.inner.borrow().items.get(index).cloned()
    }

    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.inner.borrow().items)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().items.is_empty()
    }

    pub fn push(&self, item: T) {
        let index = {
            let mut inner = self.inner.borrow_mut();
            inner.items.push(item.clone());
            inner.items.len() - 1
        };
        self.notify(ListChange::Added {
            index,
            items: vec![item],
        });
    }

    /// Insert `item` at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index > len`, like [`Vec::insert`].
    pub fn insert(&self, index: usize, item: T) {
        self.inner.borrow_mut().items.insert(index, item.clone());
        self.notify(ListChange::Added {
            index,
            items: vec![item],
        });
    }

    /// Remove the item at `index`, or return `None` when out of bounds
    pub fn remove(&self, index: usize) -> Option<T> {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            if index >= inner.items.len() {
                return None;
            }
            inner.items.remove(index)
        };
        self.notify(ListChange::Removed {
            index,
            items: vec![removed.clone()],
        });
        Some(removed)
    }

    /// Keep only the items for which `keep` returns true
    ///
    /// Each removed item is reported separately, with the index it had at
    /// the moment of its removal.
    pub fn retain(&self, mut keep: impl FnMut(&T) -> bool) {
        let mut changes = Vec::new();
        {
            let mut inner = self.inner.borrow_mut();
            let mut index = 0;
            while index < inner.items.len() {
                if keep(&inner.items[index]) {
                    index += 1;
                } else {
                    let removed = inner.items.remove(index);
                    changes.push(ListChange::Removed {
                        index,
                        items: vec![removed],
                    });
                }
            }
        }
        for change in changes {
            self.notify(change);
        }
    }

    /// Replace the whole content
    pub fn set_all(&self, items: Vec<T>) {
        let old = std::mem::replace(&mut self.inner.borrow_mut().items, items.clone());
        self.notify(ListChange::Replaced { old, new: items });
    }

    pub fn clear(&self) {
        let removed = std::mem::take(&mut self.inner.borrow_mut().items);
        if !removed.is_empty() {
            self.notify(ListChange::Removed {
                index: 0,
                items: removed,
            });
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&ListChange<T>) + 'static) -> Subscription {
        let listener: Rc<ListListener<T>> = Rc::new(listener);
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

    fn notify(&self, change: ListChange<T>) {
        let listeners = self.inner.borrow().listeners.snapshot();
        for listener in listeners {
            listener(&change);
        }
    }
}

impl<T: Clone + 'static> Default for ListProperty<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: Clone + 'static> FromIterator<T> for ListProperty<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T: fmt::Debug> fmt::Debug for ListProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListProperty")
            .field("id", &self.id)
            .field("items", &self.inner.borrow().items)
            .finish()
    }
}

/// Typed key of a list tracked by a [`PropertyGroup`](crate::PropertyGroup)
pub struct ListKey<T> {
    id: PropertyId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ListKey<T> {
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

impl<T> Clone for ListKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ListKey<T> {}

impl<T> PartialEq for ListKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for ListKey<T> {}

impl<T> fmt::Debug for ListKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListKey({})", self.id)
    }
}

impl<T> From<&ListProperty<T>> for ListKey<T> {
    fn from(list: &ListProperty<T>) -> Self {
        Self::new(list.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + 'static>(list: &ListProperty<T>) -> (Rc<RefCell<Vec<ListChange<T>>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let sub = list.subscribe(move |change| sink.borrow_mut().push(change.clone()));
        (seen, sub)
    }

    #[test]
    fn test_push_and_insert_report_added() {
        let list = ListProperty::new(vec!['a']);
        let (seen, _sub) = recorder(&list);

        list.push('c');
        list.insert(1, 'b');

        assert_eq!(list.get(), vec!['a', 'b', 'c']);
        assert_eq!(
            *seen.borrow(),
            vec![
                ListChange::Added { index: 1, items: vec!['c'] },
                ListChange::Added { index: 1, items: vec!['b'] },
            ]
        );
    }

    #[test]
    fn test_remove_out_of_bounds_is_silent() {
        let list = ListProperty::new(vec![1, 2]);
        let (seen, _sub) = recorder(&list);

        assert_eq!(list.remove(5), None);
        assert_eq!(list.remove(0), Some(1));
        assert_eq!(*seen.borrow(), vec![ListChange::Removed { index: 0, items: vec![1] }]);
        assert_eq!(list.get_at(0), Some(2));
        assert_eq!(list.get_at(1), None);
    }

    #[test]
    fn test_retain_reports_each_removal_at_its_current_index() {
        let list: ListProperty<i32> = (1..=5).collect();
        let (seen, _sub) = recorder(&list);

        list.retain(|n| n % 2 == 1);

        assert_eq!(list.get(), vec![1, 3, 5]);
        assert_eq!(
            *seen.borrow(),
            vec![
                ListChange::Removed { index: 1, items: vec![2] },
                ListChange::Removed { index: 2, items: vec![4] },
            ]
        );
    }

    #[test]
    fn test_set_all_and_clear() {
        let list = ListProperty::new(vec!["x".to_string()]);
        let (seen, _sub) = recorder(&list);

        list.set_all(vec!["y".to_string(), "z".to_string()]);
        list.clear();
        list.clear();

        assert!(list.is_empty());
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(
            seen.borrow()[1],
            ListChange::Removed { index: 0, items: vec!["y".to_string(), "z".to_string()] }
        );
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let list = ListProperty::new(Vec::<u8>::new());
        let (seen, sub) = recorder(&list);
        sub.unsubscribe();

        list.push(1);
        assert!(seen.borrow().is_empty());
        assert_eq!(list.listener_count(), 0);
    }
}
