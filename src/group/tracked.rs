//! Live/applied pairs held by a [`PropertyGroup`](super::PropertyGroup)

use std::any::Any;
use std::rc::Rc;

use crate::list_property::ListProperty;
use crate::property::Property;

/// Equality used to decide whether a live value diverges from its applied copy
pub type Equality<T> = Rc<dyn Fn(&T, &T) -> bool>;

pub(crate) fn partial_eq<T: PartialEq + 'static>() -> Equality<T> {
    Rc::new(|a: &T, b: &T| a == b)
}

/// Type-erased view of a tracked value
pub(crate) trait Tracked {
    fn is_changed(&self) -> bool;

    /// Copy live into applied
    fn apply(&self);

    /// Copy applied into live
    fn reset(&self);

    fn as_any(&self) -> &dyn Any;
}

pub(crate) struct TrackedScalar<T> {
    pub(crate) source: Property<T>,
    pub(crate) applied: Property<T>,
    eq: Equality<T>,
}

impl<T: Clone + PartialEq + 'static> TrackedScalar<T> {
    pub(crate) fn new(source: &Property<T>, eq: Equality<T>) -> Self {
        Self {
            source: source.clone(),
            applied: Property::new(source.get()),
            eq,
        }
    }
}

impl<T: Clone + PartialEq + 'static> Tracked for TrackedScalar<T> {
    fn is_changed(&self) -> bool {
        self.source
            .with(|live| self.applied.with(|applied| !(self.eq)(live, applied)))
    }

    fn apply(&self) {
        self.applied.set(self.source.get());
    }

    fn reset(&self) {
        self.source.set(self.applied.get());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) struct TrackedList<T> {
    pub(crate) source: ListProperty<T>,
    pub(crate) applied: ListProperty<T>,
    eq: Equality<T>,
}

impl<T: Clone + 'static> TrackedList<T> {
    pub(crate) fn new(source: &ListProperty<T>, eq: Equality<T>) -> Self {
        Self {
            source: source.clone(),
            applied: ListProperty::new(source.get()),
            eq,
        }
    }
}

impl<T: Clone + 'static> Tracked for TrackedList<T> {
    fn is_changed(&self) -> bool {
        self.source.with(|live| {
            self.applied
                .with(|applied| !same_elements(live, applied, self.eq.as_ref()))
        })
    }

    fn apply(&self) {
        reconcile(&self.source, &self.applied, self.eq.as_ref());
    }

    fn reset(&self) {
        reconcile(&self.applied, &self.source, self.eq.as_ref());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Make `to` hold the same elements as `from`
///
/// Elements of `from` missing in `to` are appended, then anything in `to`
/// absent from `from` is dropped. Retained elements keep their position in
/// `to`, so the resulting order is not necessarily the order of `from`.
pub(crate) fn reconcile<T: Clone + 'static>(
    from: &ListProperty<T>,
    to: &ListProperty<T>,
    eq: &dyn Fn(&T, &T) -> bool,
) {
    let wanted = from.get();
    for item in &wanted {
        let present = to.with(|items| items.iter().any(|existing| eq(existing, item)));
        if !present {
            to.push(item.clone());
        }
    }
    to.retain(|existing| wanted.iter().any(|item| eq(existing, item)));
}

/// Multiset equality under `eq`, ignoring order
pub(crate) fn same_elements<T>(a: &[T], b: &[T], eq: &dyn Fn(&T, &T) -> bool) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|x| {
        match (0..b.len()).find(|&i| !used[i] && eq(x, &b[i])) {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq_i32(a: &i32, b: &i32) -> bool {
        a == b
    }

    fn same_str(a: &&str, b: &&str) -> bool {
        a == b
    }

    #[test]
    fn test_same_elements_ignores_order() {
        assert!(same_elements(&[1, 2, 3], &[3, 1, 2], &eq_i32));
        assert!(!same_elements(&[1, 2], &[1, 2, 2], &eq_i32));
        assert!(!same_elements(&[1, 1, 2], &[1, 2, 2], &eq_i32));
        assert!(same_elements::<i32>(&[], &[], &eq_i32));
    }

    #[test]
    fn test_reconcile_keeps_prior_order_and_appends() {
        let from = ListProperty::new(vec!["c", "b", "d"]);
        let to = ListProperty::new(vec!["a", "b", "c"]);

        reconcile(&from, &to, &same_str);

        assert_eq!(to.get(), vec!["b", "c", "d"]);
        assert_eq!(from.get(), vec!["c", "b", "d"]);
    }

    #[test]
    fn test_scalar_custom_equality() {
        let source = Property::new("Dark".to_string());
        let tracked = TrackedScalar::new(
            &source,
            Rc::new(|a: &String, b: &String| a.eq_ignore_ascii_case(b)),
        );

        source.set("DARK".to_string());
        assert!(!tracked.is_changed());
        source.set("light".to_string());
        assert!(tracked.is_changed());

        tracked.apply();
        assert_eq!(tracked.applied.get(), "light");
        assert!(!tracked.is_changed());
    }

    #[test]
    fn test_list_reset_restores_applied_elements() {
        let source = ListProperty::new(vec![1, 2]);
        let tracked = TrackedList::new(&source, partial_eq());

        source.push(3);
        source.remove(0);
        assert!(tracked.is_changed());

        tracked.reset();
        assert_eq!(source.get(), vec![2, 1]);
        assert!(!tracked.is_changed());
    }
}
