//! Four-page example settings dialog used by the binary

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use tracing::info;

use property_group::{
    ConfigBinding, ListProperty, ListenerId, Property, PropertyGroup, SettingsDialog, Subscription,
};

/// On-disk shape of the demo settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DemoConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub appearance: AppearanceConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_autosave")]
    pub autosave: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppearanceConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
    #[serde(default = "default_font_size")]
    pub font_size: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NetworkConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(default)]
    pub hosts: Vec<String>,
}

fn default_username() -> String {
    "guest".to_string()
}

fn default_autosave() -> bool {
    true
}

fn default_theme() -> String {
    "light".to_string()
}

fn default_font_size() -> u16 {
    12
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            autosave: default_autosave(),
        }
    }
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            accent: None,
            font_size: default_font_size(),
        }
    }
}

/// Live values behind the demo pages, standing in for UI controls
pub struct DemoSettings {
    pub username: Property<String>,
    pub autosave: Property<bool>,
    pub theme: Property<String>,
    pub accent: Property<Option<String>>,
    pub font_size: Property<u16>,
    pub proxy: Property<Option<String>>,
    pub hosts: ListProperty<String>,
    pub dialog: SettingsDialog,
    general: PropertyGroup,
    appearance: PropertyGroup,
    network: PropertyGroup,
    commit_logs: Vec<Subscription>,
    network_log: Option<ListenerId>,
}

impl DemoSettings {
    /// Build the pages: General, Appearance (with Fonts below it), Network
    pub fn new() -> Result<Self> {
        let defaults = DemoConfig::default();
        let username = Property::new(defaults.general.username);
        let autosave = Property::new(defaults.general.autosave);
        let theme = Property::new(defaults.appearance.theme);
        let accent = Property::new(defaults.appearance.accent);
        let font_size = Property::new(defaults.appearance.font_size);
        let proxy = Property::new(defaults.network.proxy);
        let hosts = ListProperty::new(defaults.network.hosts);

        let general = PropertyGroup::named("general");
        general.add_property(&username);
        general.add_property(&autosave);

        let appearance = PropertyGroup::named("appearance");
        appearance.add_property(&theme);
        appearance.add_property(&accent);

        let fonts = PropertyGroup::named("fonts");
        fonts.add_property(&font_size);

        let network = PropertyGroup::named("network");
        network.add_property(&proxy);
        network.add_list_property(&hosts);

        let mut dialog = SettingsDialog::new();
        dialog.create_and_add("General", "pages/general.json", &general, None)?;
        let appearance_id = dialog.create_and_add("Appearance", "pages/appearance.json", &appearance, None)?;
        dialog.create_and_add("Fonts", "pages/fonts.json", &fonts, Some(appearance_id))?;
        dialog.create_and_add("Network", "pages/network.json", &network, None)?;

        Ok(Self {
            username,
            autosave,
            theme,
            accent,
            font_size,
            proxy,
            hosts,
            dialog,
            general,
            appearance,
            network,
            commit_logs: Vec::new(),
            network_log: None,
        })
    }

    /// Log commits of user edits
    ///
    /// Call after the loaded values have been committed, so that taking the
    /// baseline does not show up as an edit.
    pub fn log_commits(&mut self) -> Result<()> {
        if self.network_log.is_some() {
            return Ok(());
        }
        self.commit_logs.push(self.general.add_listener_to_property(&self.autosave, |_, enabled| {
            info!(enabled = *enabled, "Autosave setting committed");
        })?);
        self.commit_logs.push(self.appearance.add_listener_to_property(&self.theme, |old, new| {
            info!(old = %old, new = %new, "Theme committed");
        })?);
        self.network_log = Some(self.network.add_listener(|| info!("Network settings committed")));
        Ok(())
    }

    /// Apply one `KEY=VALUE` edit to the live values
    pub fn edit(&self, assignment: &str) -> Result<()> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected KEY=VALUE, got '{assignment}'"))?;
        let value = value.trim();

        match key.trim() {
            "general.username" => {
                self.username.set(value.to_string());
            }
            "general.autosave" => {
                let enabled = value
                    .parse()
                    .with_context(|| format!("Invalid boolean for general.autosave: '{value}'"))?;
                self.autosave.set(enabled);
            }
            "appearance.theme" => {
                self.theme.set(value.to_string());
            }
            "appearance.accent" => {
                self.accent.set(optional(value));
            }
            "appearance.font_size" => {
                let size = value
                    .parse()
                    .with_context(|| format!("Invalid font size: '{value}'"))?;
                self.font_size.set(size);
            }
            "network.proxy" => {
                self.proxy.set(optional(value));
            }
            "network.hosts" => {
                let hosts: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|host| !host.is_empty())
                    .map(String::from)
                    .collect();
                self.hosts.set_all(hosts);
            }
            other => bail!("Unknown setting '{other}'"),
        }
        Ok(())
    }

    /// Render the page tree with a marker on pages holding unapplied edits
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for (id, depth) in self.dialog.walk() {
            if let Some(setting) = self.dialog.setting(id) {
                let marker = if setting.group.is_changed() { "*" } else { " " };
                out.push_str(&format!("{}{} {}\n", "  ".repeat(depth), marker, setting.name));
            }
        }
        out
    }
}

/// Empty string or "none" clears an optional value
fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(value.to_string())
    }
}

impl ConfigBinding<DemoConfig> for DemoSettings {
    fn load(&mut self, config: &DemoConfig) {
        self.username.set(config.general.username.clone());
        self.autosave.set(config.general.autosave);
        self.theme.set(config.appearance.theme.clone());
        self.accent.set(config.appearance.accent.clone());
        self.font_size.set(config.appearance.font_size);
        self.proxy.set(config.network.proxy.clone());
        self.hosts.set_all(config.network.hosts.clone());
    }

    fn store(&self, config: &mut DemoConfig) {
        config.general.username = self.username.get();
        config.general.autosave = self.autosave.get();
        config.appearance.theme = self.theme.get();
        config.appearance.accent = self.accent.get();
        config.appearance.font_size = self.font_size.get();
        config.network.proxy = self.proxy.get();
        config.network.hosts = self.hosts.get();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_marks_only_touched_pages() {
        let settings = DemoSettings::new().unwrap();
        settings.edit("appearance.font_size=16").unwrap();

        let fonts = settings.dialog.find("Fonts").unwrap();
        let general = settings.dialog.find("General").unwrap();
        assert!(settings.dialog.setting(fonts).unwrap().group.is_changed());
        assert!(!settings.dialog.setting(general).unwrap().group.is_changed());
        assert!(settings.describe().contains("  * Fonts"));
    }

    #[test]
    fn test_edit_rejects_bad_input() {
        let settings = DemoSettings::new().unwrap();
        assert!(settings.edit("general.autosave").is_err());
        assert!(settings.edit("general.autosave=maybe").is_err());
        assert!(settings.edit("nope=1").is_err());
        assert!(!settings.dialog.is_changed());
    }

    #[test]
    fn test_optional_values_and_hosts() {
        let settings = DemoSettings::new().unwrap();
        settings.edit("network.proxy=http://proxy:8080").unwrap();
        settings.edit("network.hosts=a.example, b.example,").unwrap();
        assert_eq!(settings.proxy.get().as_deref(), Some("http://proxy:8080"));
        assert_eq!(settings.hosts.get(), vec!["a.example", "b.example"]);

        settings.edit("network.proxy=none").unwrap();
        assert_eq!(settings.proxy.get(), None);
    }

    #[test]
    fn test_commit_logging_is_attached_once() {
        let mut settings = DemoSettings::new().unwrap();
        assert!(settings.commit_logs.is_empty());
        assert!(settings.network_log.is_none());

        settings.log_commits().unwrap();
        settings.log_commits().unwrap();
        assert_eq!(settings.commit_logs.len(), 2);
        assert!(settings.network_log.is_some());
    }

    #[test]
    fn test_binding_round_trip() {
        let mut settings = DemoSettings::new().unwrap();
        let mut config = DemoConfig::default();
        config.general.username = "alice".to_string();
        config.network.hosts = vec!["h1".to_string()];

        settings.load(&config);
        let mut stored = DemoConfig::default();
        settings.store(&mut stored);
        assert_eq!(stored, config);
    }
}
