use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::html::ProtocolFix;
use crate::page::{DEFAULT_FAVICON, DEFAULT_STYLESHEET, PageOptions};
use crate::theme::{Palette, Theme};

/// Top-level application configuration.
///
/// Loaded from `$XDG_CONFIG_HOME/itempage/config.yaml` (or platform equivalent).
/// If the file does not exist, sensible defaults are used.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Theme the page is rendered for.
    #[serde(default)]
    pub theme: Theme,

    /// Lay the page out right-to-left.
    #[serde(default)]
    pub right_to_left: bool,

    /// Whether to include the title/feed/date header block.
    #[serde(default = "default_show_header")]
    pub show_header: bool,

    /// Markup settings (stylesheet, favicon, URL rewriting).
    #[serde(default)]
    pub display: DisplayConfig,

    /// Per-theme colours.
    #[serde(default)]
    pub colours: ThemeColours,

    /// Image cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// Stylesheet linked from the page head.
    #[serde(default = "default_stylesheet")]
    pub stylesheet: String,

    /// Favicon for feeds that don't have one.
    #[serde(default = "default_favicon")]
    pub default_favicon: String,

    /// How protocol-relative (`//host/...`) URLs are rewritten.
    #[serde(default)]
    pub protocol_relative: ProtocolFix,
}

/// Colours for every theme.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThemeColours {
    #[serde(default = "default_dark_colours")]
    pub dark: ColourConfig,

    #[serde(default = "default_light_colours")]
    pub light: ColourConfig,

    #[serde(default = "default_dark_oled_colours")]
    pub dark_oled: ColourConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ColourConfig {
    /// Colour of divider lines; also the default accent border colour.
    pub divider_line: String,

    /// Background of the header block.
    pub item_list_background: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Image cache directory. Defaults to `$XDG_CACHE_HOME/itempage/images`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Timeout (in seconds) for feed and image downloads.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            right_to_left: false,
            show_header: default_show_header(),
            display: DisplayConfig::default(),
            colours: ThemeColours::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            stylesheet: default_stylesheet(),
            default_favicon: default_favicon(),
            protocol_relative: ProtocolFix::default(),
        }
    }
}

impl Default for ThemeColours {
    fn default() -> Self {
        Self {
            dark: default_dark_colours(),
            light: default_light_colours(),
            dark_oled: default_dark_oled_colours(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl ThemeColours {
    pub fn for_theme(&self, theme: Theme) -> &ColourConfig {
        match theme {
            Theme::Dark => &self.dark,
            Theme::Light => &self.light,
            Theme::DarkOled => &self.dark_oled,
        }
    }
}

impl ColourConfig {
    /// Parse both colours into a [`Palette`].
    pub fn palette(&self) -> anyhow::Result<Palette> {
        let divider_line = parse_color(&self.divider_line)
            .map_err(anyhow::Error::msg)
            .context("Invalid divider_line colour")?;
        let item_list_background = parse_color(&self.item_list_background)
            .map_err(anyhow::Error::msg)
            .context("Invalid item_list_background colour")?;
        Ok(Palette {
            divider_line,
            item_list_background,
        })
    }
}

/// Command-line settings layered over the loaded config.
#[derive(Debug, Default, Clone, Copy)]
pub struct Overrides {
    pub theme: Option<Theme>,
    pub right_to_left: bool,
    pub hide_header: bool,
}

impl Config {
    /// Apply command-line overrides. Flags only ever switch a setting on.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(theme) = overrides.theme {
            self.theme = theme;
        }
        if overrides.right_to_left {
            self.right_to_left = true;
        }
        if overrides.hide_header {
            self.show_header = false;
        }
    }

    /// Palette for the configured theme.
    pub fn palette(&self) -> anyhow::Result<Palette> {
        self.colours.for_theme(self.theme).palette()
    }

    pub fn page_options(&self) -> PageOptions {
        PageOptions {
            stylesheet: self.display.stylesheet.clone(),
            default_favicon: self.display.default_favicon.clone(),
            protocol_fix: self.display.protocol_relative,
        }
    }

    /// Image cache directory, falling back to the platform cache dir.
    pub fn cache_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.cache.dir {
            return Ok(dir.clone());
        }
        let dir = dirs::cache_dir().context("Could not determine cache directory")?;
        Ok(dir.join("itempage").join("images"))
    }
}

/// Parse a colour into a 32-bit ARGB value.
///
/// Accepts `#RRGGBB` (opaque), `#AARRGGBB`, and a handful of names.
pub fn parse_color(color_str: &str) -> Result<u32, String> {
    match color_str.trim().to_lowercase().as_str() {
        "black" => Ok(0xff000000),
        "white" => Ok(0xffffffff),
        "transparent" => Ok(0x00000000),
        "gray" | "grey" => Ok(0xff808080),
        "darkgray" | "dark_grey" | "dark_gray" => Ok(0xff404040),
        "lightgray" | "light_grey" | "light_gray" => Ok(0xffd3d3d3),
        s if s.starts_with('#') => {
            let hex = &s[1..];
            let value = u32::from_str_radix(hex, 16)
                .map_err(|_| format!("Invalid hex colour: {}", color_str))?;
            match hex.len() {
                6 => Ok(0xff000000 | value),
                8 => Ok(value),
                _ => Err(format!("Invalid hex colour format: {}", color_str)),
            }
        }
        _ => Err(format!("Unknown colour: {}", color_str)),
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_show_header() -> bool {
    true
}

fn default_stylesheet() -> String {
    DEFAULT_STYLESHEET.to_string()
}

fn default_favicon() -> String {
    DEFAULT_FAVICON.to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_dark_colours() -> ColourConfig {
    ColourConfig {
        divider_line: "#1fffffff".to_string(),
        item_list_background: "#303030".to_string(),
    }
}

fn default_light_colours() -> ColourConfig {
    ColourConfig {
        divider_line: "#1f000000".to_string(),
        item_list_background: "#fafafa".to_string(),
    }
}

fn default_dark_oled_colours() -> ColourConfig {
    ColourConfig {
        divider_line: "#1fffffff".to_string(),
        item_list_background: "#000000".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Returns the path to the config file:
/// `$XDG_CONFIG_HOME/itempage/config.yaml` (or platform equivalent).
pub fn config_path() -> anyhow::Result<PathBuf> {
    let dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(dir.join("itempage").join("config.yaml"))
}

/// Load configuration from `path`.
///
/// If the file does not exist, returns `Config::default()`.
/// If the file exists but cannot be parsed, the parse error is propagated.
pub fn load_from(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

/// Save configuration to `path`.
///
/// Creates the parent directory if needed and writes via a temp file and
/// rename so a crash never leaves a truncated config behind.
pub fn save_to(config: &Config, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    let yaml = serde_yaml::to_string(config)
        .context("Failed to serialize config to YAML")?;

    let temp_path = path.with_extension("yaml.tmp");
    fs::write(&temp_path, yaml)
        .with_context(|| format!("Failed to write config file: {}", temp_path.display()))?;

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename config file: {} -> {}", temp_path.display(), path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = Config::default();
        assert_eq!(cfg.theme, Theme::Dark);
        assert!(!cfg.right_to_left);
        assert!(cfg.show_header);
        assert_eq!(cfg.display.stylesheet, "web.css");
        assert_eq!(cfg.display.default_favicon, DEFAULT_FAVICON);
        assert_eq!(cfg.display.protocol_relative, ProtocolFix::Global);
        assert_eq!(cfg.cache.fetch_timeout_secs, 30);
        assert!(cfg.cache.dir.is_none());
    }

    #[test]
    fn deserialize_partial_yaml_uses_defaults() {
        let yaml = "theme: light\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.theme, Theme::Light);
        assert!(cfg.show_header);
        assert_eq!(cfg.colours.light.item_list_background, "#fafafa");
    }

    #[test]
    fn deserialize_full_yaml() {
        let yaml = r##"
theme: dark_oled
right_to_left: true
show_header: false
display:
  stylesheet: "reader.css"
  default_favicon: "file:///icons/feed.png"
  protocol_relative: attributes_only
colours:
  dark_oled:
    divider_line: "#222222"
    item_list_background: "black"
cache:
  dir: /tmp/itempage-images
  fetch_timeout_secs: 5
"##;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.theme, Theme::DarkOled);
        assert!(cfg.right_to_left);
        assert!(!cfg.show_header);
        assert_eq!(cfg.display.stylesheet, "reader.css");
        assert_eq!(cfg.display.protocol_relative, ProtocolFix::AttributesOnly);
        assert_eq!(cfg.cache.dir, Some(PathBuf::from("/tmp/itempage-images")));
        assert_eq!(cfg.cache.fetch_timeout_secs, 5);
        // Untouched themes keep their defaults.
        assert_eq!(cfg.colours.dark.item_list_background, "#303030");

        let palette = cfg.palette().unwrap();
        assert_eq!(palette.divider_line, 0xff222222);
        assert_eq!(palette.item_list_background, 0xff000000);

        let options = cfg.page_options();
        assert_eq!(options.stylesheet, "reader.css");
        assert_eq!(options.default_favicon, "file:///icons/feed.png");
    }

    #[test]
    fn parse_color_formats() {
        assert_eq!(parse_color("#336699"), Ok(0xff336699));
        assert_eq!(parse_color("#80336699"), Ok(0x80336699));
        assert_eq!(parse_color(" White "), Ok(0xffffffff));
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("#zzzzzz").is_err());
        assert!(parse_color("chartreuse").is_err());
    }

    #[test]
    fn invalid_palette_colour_is_reported() {
        let colours = ColourConfig {
            divider_line: "nope".to_string(),
            item_list_background: "#000000".to_string(),
        };
        let err = colours.palette().unwrap_err();
        assert!(err.to_string().contains("divider_line"));
    }

    #[test]
    fn default_palettes_parse() {
        let colours = ThemeColours::default();
        for theme in [Theme::Dark, Theme::Light, Theme::DarkOled] {
            colours.for_theme(theme).palette().unwrap();
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.yaml");

        let mut cfg = Config::default();
        cfg.theme = Theme::Light;
        cfg.display.protocol_relative = ProtocolFix::Off;
        save_to(&cfg, &path).unwrap();

        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.theme, Theme::Light);
        assert_eq!(loaded.display.protocol_relative, ProtocolFix::Off);
        assert!(!path.with_extension("yaml.tmp").exists());
    }

    #[test]
    fn overrides_persist_through_save() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        fs::write(&path, "theme: light\nright_to_left: false\n").unwrap();

        let mut cfg = load_from(&path).unwrap();
        cfg.apply(Overrides {
            theme: Some(Theme::DarkOled),
            right_to_left: true,
            hide_header: true,
        });
        save_to(&cfg, &path).unwrap();

        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.theme, Theme::DarkOled);
        assert!(loaded.right_to_left);
        assert!(!loaded.show_header);
    }

    #[test]
    fn empty_overrides_change_nothing() {
        let mut cfg = Config::default();
        cfg.theme = Theme::Light;
        cfg.apply(Overrides::default());
        assert_eq!(cfg.theme, Theme::Light);
        assert!(!cfg.right_to_left);
        assert!(cfg.show_header);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = load_from(&tmp.path().join("absent.yaml")).unwrap();
        assert_eq!(cfg.theme, Theme::Dark);
    }

    #[test]
    fn explicit_cache_dir_wins() {
        let mut cfg = Config::default();
        cfg.cache.dir = Some(PathBuf::from("/var/cache/images"));
        assert_eq!(cfg.cache_dir().unwrap(), PathBuf::from("/var/cache/images"));
    }
}
