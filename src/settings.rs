//! Settings dialog model
//!
//! A [`SettingsDialog`] owns a tree of named settings (the navigation pane of
//! a settings window). Each setting is backed by a [`PropertyGroup`] for its
//! page, and every page group hangs off one root group so that OK, Apply
//! and Cancel act on all pages at once.

use tracing::{debug, info};

use crate::error::{ApplyError, GroupError};
use crate::group::PropertyGroup;
use crate::property::Subscription;

/// Index of a setting inside its dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SettingId(usize);

impl SettingId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One page of the dialog
#[derive(Debug)]
pub struct Setting {
    /// Label shown in the navigation tree
    pub name: String,
    /// Path of the view description for this page
    pub resource: String,
    pub group: PropertyGroup,
    pub parent: Option<SettingId>,
    children: Vec<SettingId>,
}

impl Setting {
    pub fn children(&self) -> &[SettingId] {
        &self.children
    }
}

#[derive(Debug)]
pub struct SettingsDialog {
    root: PropertyGroup,
    settings: Vec<Setting>,
    roots: Vec<SettingId>,
    open: bool,
}

impl Default for SettingsDialog {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsDialog {
    pub fn new() -> Self {
        Self {
            root: PropertyGroup::named("settings"),
            settings: Vec::new(),
            roots: Vec::new(),
            open: true,
        }
    }

    /// Group every page group is attached to
    pub fn root_group(&self) -> &PropertyGroup {
        &self.root
    }

    /// Register a page named `name`, below `parent` in the tree or at the top
    ///
    /// `group` is attached to the dialog's root group regardless of where the
    /// page sits in the tree.
    pub fn create_and_add(
        &mut self,
        name: impl Into<String>,
        resource: impl Into<String>,
        group: &PropertyGroup,
        parent: Option<SettingId>,
    ) -> Result<SettingId, GroupError> {
        if let Some(parent) = parent {
            if parent.0 >= self.settings.len() {
                return Err(GroupError::UnknownSetting(parent.0));
            }
        }
        self.root.add_group(group)?;

        let id = SettingId(self.settings.len());
        let name = name.into();
        debug!(setting = %name, parent = ?parent.map(|p| p.0), "Added setting");
        self.settings.push(Setting {
            name,
            resource: resource.into(),
            group: group.clone(),
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.settings[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    pub fn setting(&self, id: SettingId) -> Option<&Setting> {
        self.settings.get(id.0)
    }

    /// Top-level settings in insertion order
    pub fn roots(&self) -> &[SettingId] {
        &self.roots
    }

    pub fn children_of(&self, id: SettingId) -> &[SettingId] {
        self.settings
            .get(id.0)
            .map(|setting| setting.children.as_slice())
            .unwrap_or(&[])
    }

    /// First setting with the given name
    pub fn find(&self, name: &str) -> Option<SettingId> {
        self.settings
            .iter()
            .position(|setting| setting.name == name)
            .map(SettingId)
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Depth-first walk of the tree as `(id, depth)`, in display order
    pub fn walk(&self) -> Vec<(SettingId, usize)> {
        let mut out = Vec::with_capacity(self.settings.len());
        let mut stack: Vec<(SettingId, usize)> = self.roots.iter().rev().map(|&id| (id, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            out.push((id, depth));
            stack.extend(self.children_of(id).iter().rev().map(|&child| (child, depth + 1)));
        }
        out
    }

    /// Whether any page has unapplied edits
    pub fn is_changed(&self) -> bool {
        self.root.is_changed()
    }

    /// Be told when the dialog becomes dirty or clean (enables "Apply")
    pub fn subscribe_dirty(&self, listener: impl Fn(bool) + 'static) -> Subscription {
        self.root.subscribe_dirty(listener)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Commit all pages and keep the dialog open
    pub fn apply(&self) -> Result<(), ApplyError> {
        self.root.apply()
    }

    /// Commit all pages and close; the dialog stays open if the commit fails
    pub fn ok(&mut self) -> Result<(), ApplyError> {
        self.root.apply()?;
        self.open = false;
        info!("Settings dialog closed with OK");
        Ok(())
    }

    /// Discard all edits and close
    pub fn cancel(&mut self) {
        self.root.reset();
        self.open = false;
        info!("Settings dialog closed with Cancel");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Property;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn page(value: &Property<i32>) -> PropertyGroup {
        let group = PropertyGroup::new();
        group.add_property(value);
        group
    }

    #[test]
    fn test_tree_structure_and_walk_order() {
        let mut dialog = SettingsDialog::new();
        let values: Vec<_> = (0..4).map(Property::new).collect();

        let s1 = dialog.create_and_add("setting1", "/pages/setting1.json", &page(&values[0]), None).unwrap();
        let s2 = dialog.create_and_add("setting2", "/pages/setting2.json", &page(&values[1]), None).unwrap();
        let s21 = dialog.create_and_add("setting2-1", "/pages/setting2-1.json", &page(&values[2]), Some(s2)).unwrap();
        let s22 = dialog.create_and_add("setting2-2", "/pages/setting2-2.json", &page(&values[3]), Some(s2)).unwrap();

        assert_eq!(dialog.len(), 4);
        assert_eq!(dialog.roots(), &[s1, s2]);
        assert_eq!(dialog.children_of(s2), &[s21, s22]);
        assert_eq!(dialog.setting(s21).unwrap().parent, Some(s2));
        assert_eq!(dialog.find("setting2-2"), Some(s22));
        assert_eq!(dialog.walk(), vec![(s1, 0), (s2, 0), (s21, 1), (s22, 1)]);
        assert_eq!(dialog.root_group().children().len(), 4);
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let mut dialog = SettingsDialog::new();
        let value = Property::new(0);
        let group = page(&value);

        let result = dialog.create_and_add("orphan", "/pages/orphan.json", &group, Some(SettingId(3)));
        assert_eq!(result, Err(GroupError::UnknownSetting(3)));
        assert!(dialog.is_empty());
        assert!(group.parent().is_none());
    }

    #[test]
    fn test_same_group_cannot_back_two_settings() {
        let mut dialog = SettingsDialog::new();
        let value = Property::new(0);
        let group = page(&value);

        dialog.create_and_add("a", "/a.json", &group, None).unwrap();
        assert!(matches!(
            dialog.create_and_add("b", "/b.json", &group, None),
            Err(GroupError::AlreadyAttached(_))
        ));
        assert_eq!(dialog.len(), 1);
    }

    #[test]
    fn test_ok_applies_and_closes() {
        let mut dialog = SettingsDialog::new();
        let value = Property::new(1);
        let group = page(&value);
        dialog.create_and_add("general", "/general.json", &group, None).unwrap();

        let states = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&states);
        let _sub = dialog.subscribe_dirty(move |dirty| sink.borrow_mut().push(dirty));

        value.set(2);
        assert!(dialog.is_changed());
        dialog.ok().unwrap();

        assert!(!dialog.is_open());
        assert!(!dialog.is_changed());
        assert_eq!(*states.borrow(), vec![true, false]);
    }

    #[test]
    fn test_cancel_reverts_every_page() {
        let mut dialog = SettingsDialog::new();
        let first = Property::new(1);
        let second = Property::new(10);
        let s1 = dialog.create_and_add("one", "/one.json", &page(&first), None).unwrap();
        dialog.create_and_add("two", "/two.json", &page(&second), Some(s1)).unwrap();

        first.set(2);
        second.set(20);
        dialog.apply().unwrap();
        assert!(dialog.is_open());

        first.set(3);
        second.set(30);
        dialog.cancel();

        assert_eq!(first.get(), 2);
        assert_eq!(second.get(), 20);
        assert!(!dialog.is_open());
        assert!(!dialog.is_changed());
    }
}
