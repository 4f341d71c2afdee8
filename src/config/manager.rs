//! JSON-backed config object bound to live settings state

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{error, info};

use crate::error::ConfigError;

/// Moves data between a config object and the live UI state
pub trait ConfigBinding<T> {
    /// Push values from `config` into the live state
    fn load(&mut self, config: &T);

    /// Copy the live state back into `config` before it is written
    fn store(&self, config: &mut T);
}

/// Loads and saves a config object of type `T` as pretty JSON
///
/// Remembers the last loaded object and the last file used, so dialogs can
/// offer "reload" and "save" without asking for a path again.
#[derive(Debug)]
pub struct ConfigManager<T> {
    default: T,
    config: Option<T>,
    path: Option<PathBuf>,
}

impl<T> ConfigManager<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Manager falling back to `default` when no file exists
    pub fn new(default: T) -> Self {
        Self {
            default,
            config: None,
            path: None,
        }
    }

    /// `<config_dir>/property-group/settings.json`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    /// Most recently loaded or saved config
    pub fn config(&self) -> Option<&T> {
        self.config.as_ref()
    }

    /// File used by the last successful load or save
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read `path`, remember it, and push the config into `binding`
    pub fn load_from(
        &mut self,
        path: impl AsRef<Path>,
        binding: &mut impl ConfigBinding<T>,
    ) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let config = read_config(path).inspect_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to load config");
        })?;

        info!(path = %path.display(), "Loaded config");
        self.config = Some(config);
        self.path = Some(path.to_path_buf());
        self.load(binding)
    }

    /// Like [`load_from`](Self::load_from), but a missing file yields the
    /// default config instead of an error
    ///
    /// Returns true when the file existed.
    pub fn load_or_default(
        &mut self,
        path: impl AsRef<Path>,
        binding: &mut impl ConfigBinding<T>,
    ) -> Result<bool, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            self.load_from(path, binding)?;
            return Ok(true);
        }

        info!(path = %path.display(), "Config file not found, using defaults");
        self.config = Some(self.default.clone());
        self.path = Some(path.to_path_buf());
        self.load(binding)?;
        Ok(false)
    }

    /// Push the most recently loaded config into `binding` again
    pub fn load(&self, binding: &mut impl ConfigBinding<T>) -> Result<(), ConfigError> {
        let config = self.config.as_ref().ok_or(ConfigError::NothingLoaded)?;
        binding.load(config);
        Ok(())
    }

    /// Pull the live state out of `binding` and write it to `path`
    pub fn save_to(
        &mut self,
        path: impl AsRef<Path>,
        binding: &impl ConfigBinding<T>,
    ) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let mut config = self.config.clone().unwrap_or_else(|| self.default.clone());
        binding.store(&mut config);

        write_config(path, &config).inspect_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to save config");
        })?;

        info!(path = %path.display(), "Saved config");
        self.config = Some(config);
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    /// Save again to the file used last
    pub fn save(&mut self, binding: &impl ConfigBinding<T>) -> Result<(), ConfigError> {
        let path = self.path.clone().ok_or(ConfigError::NoPath)?;
        self.save_to(path, binding)
    }

    /// Replace the current config with the default and push it into `binding`
    pub fn reset_to_default(&mut self, binding: &mut impl ConfigBinding<T>) {
        binding.load(&self.default);
        self.config = Some(self.default.clone());
    }
}

fn read_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_config<T: Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    fs::write(path, json).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    use crate::{Property, PropertyGroup};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Window {
        title: String,
        #[serde(default = "default_width")]
        width: u16,
    }

    fn default_width() -> u16 {
        640
    }

    fn default_window() -> Window {
        Window {
            title: "untitled".to_string(),
            width: default_width(),
        }
    }

    struct WindowPane {
        title: Property<String>,
        width: Property<u16>,
        group: PropertyGroup,
    }

    impl WindowPane {
        fn new() -> Self {
            let title = Property::new(String::new());
            let width = Property::new(0);
            let group = PropertyGroup::named("window");
            group.add_property(&title);
            group.add_property(&width);
            Self { title, width, group }
        }
    }

    impl ConfigBinding<Window> for WindowPane {
        fn load(&mut self, config: &Window) {
            self.title.set(config.title.clone());
            self.width.set(config.width);
        }

        fn store(&self, config: &mut Window) {
            config.title = self.title.get();
            config.width = self.width.get();
        }
    }

    #[test]
    fn test_load_missing_file_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("window.json");
        let mut manager = ConfigManager::new(default_window());
        let mut pane = WindowPane::new();

        assert!(!manager.load_or_default(&path, &mut pane).unwrap());
        assert_eq!(pane.title.get(), "untitled");
        assert_eq!(pane.width.get(), 640);
        assert_eq!(manager.path(), Some(path.as_path()));
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("window.json");
        let mut manager = ConfigManager::new(default_window());
        let mut pane = WindowPane::new();
        pane.title.set("Inbox".to_string());
        pane.width.set(800);

        manager.save_to(&path, &pane).unwrap();
        assert!(path.exists());

        let mut other = WindowPane::new();
        let mut fresh = ConfigManager::new(default_window());
        assert!(fresh.load_or_default(&path, &mut other).unwrap());
        assert_eq!(other.title.get(), "Inbox");
        assert_eq!(other.width.get(), 800);
        assert_eq!(fresh.config(), manager.config());
    }

    #[test]
    fn test_missing_fields_take_serde_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("window.json");
        fs::write(&path, r#"{ "title": "Old" }"#).unwrap();

        let mut manager = ConfigManager::new(default_window());
        let mut pane = WindowPane::new();
        manager.load_from(&path, &mut pane).unwrap();
        assert_eq!(pane.width.get(), 640);
    }

    #[test]
    fn test_reload_discards_live_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("window.json");
        fs::write(&path, r#"{ "title": "Saved", "width": 300 }"#).unwrap();

        let mut manager = ConfigManager::new(default_window());
        let mut pane = WindowPane::new();
        manager.load_from(&path, &mut pane).unwrap();
        pane.group.apply().unwrap();

        pane.title.set("Edited".to_string());
        assert!(pane.group.is_dirty());
        manager.load(&mut pane).unwrap();
        assert_eq!(pane.title.get(), "Saved");
        assert!(!pane.group.is_dirty());
    }

    #[test]
    fn test_save_without_path_fails() {
        let mut manager = ConfigManager::new(default_window());
        let pane = WindowPane::new();

        assert!(matches!(manager.save(&pane), Err(ConfigError::NoPath)));
        assert!(matches!(
            manager.load(&mut WindowPane::new()),
            Err(ConfigError::NothingLoaded)
        ));
    }

    #[test]
    fn test_parse_error_is_typed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("window.json");
        fs::write(&path, "{ not json").unwrap();

        let mut manager = ConfigManager::new(default_window());
        let result = manager.load_from(&path, &mut WindowPane::new());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
        assert!(manager.config().is_none());
    }

    #[test]
    fn test_save_reuses_last_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("window.json");
        let mut manager = ConfigManager::new(default_window());
        let mut pane = WindowPane::new();
        manager.load_or_default(&path, &mut pane).unwrap();

        pane.width.set(1024);
        manager.save(&pane).unwrap();

        let written: Window = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.width, 1024);
    }

    #[test]
    fn test_reset_to_default() {
        let mut manager = ConfigManager::new(default_window());
        let mut pane = WindowPane::new();
        pane.title.set("Custom".to_string());

        manager.reset_to_default(&mut pane);
        assert_eq!(pane.title.get(), "untitled");
        assert_eq!(manager.config(), Some(&default_window()));
    }
}
