use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Visual themes known to the page stylesheet.
///
/// The numeric ids are what a [`ThemeChooser`] reports; unknown ids fall back
/// to [`Theme::Dark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    DarkOled,
}

impl Theme {
    pub fn id(self) -> i32 {
        match self {
            Theme::Dark => 0,
            Theme::Light => 1,
            Theme::DarkOled => 2,
        }
    }

    pub fn from_id(id: i32) -> Self {
        match id {
            1 => Theme::Light,
            2 => Theme::DarkOled,
            _ => Theme::Dark,
        }
    }

    /// Value of the `<body id="...">` attribute the stylesheet keys on.
    pub fn body_id(self) -> &'static str {
        match self {
            Theme::Dark => "darkTheme",
            Theme::Light => "lightTheme",
            Theme::DarkOled => "darkThemeOLED",
        }
    }
}

/// Parse a theme name as accepted on the command line.
pub fn parse_theme(name: &str) -> Result<Theme, String> {
    match name.to_lowercase().as_str() {
        "dark" => Ok(Theme::Dark),
        "light" => Ok(Theme::Light),
        "dark-oled" | "dark_oled" | "oled" => Ok(Theme::DarkOled),
        _ => Err(format!(
            "Unknown theme: {}. Valid options: dark, light, dark-oled",
            name
        )),
    }
}

/// Reports the currently selected theme id.
pub trait ThemeChooser: Send + Sync {
    fn selected_theme(&self) -> i32;
}

impl ThemeChooser for Theme {
    fn selected_theme(&self) -> i32 {
        self.id()
    }
}

/// Themed colour attributes the page needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorAttr {
    DividerLine,
    ItemListBackground,
}

/// Resolves colour attributes to ARGB values for the active theme.
///
/// Implementations return exactly one colour per requested attribute, in
/// request order.
pub trait ColorResolver: Send + Sync {
    fn resolve(&self, attrs: &[ColorAttr]) -> Vec<u32>;
}

/// A fixed set of colours for one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub divider_line: u32,
    pub item_list_background: u32,
}

impl ColorResolver for Palette {
    fn resolve(&self, attrs: &[ColorAttr]) -> Vec<u32> {
        attrs
            .iter()
            .map(|attr| match attr {
                ColorAttr::DividerLine => self.divider_line,
                ColorAttr::ItemListBackground => self.item_list_background,
            })
            .collect()
    }
}

/// Format an ARGB colour as a CSS `rgba()` token.
///
/// Alpha is written as `alpha / 255` in shortest round-trip form, so opaque
/// colours end in `,1.0)`.
pub fn css_color(argb: u32) -> String {
    let a = (argb >> 24) & 0xff;
    let r = (argb >> 16) & 0xff;
    let g = (argb >> 8) & 0xff;
    let b = argb & 0xff;
    format!("rgba({},{},{},{:?})", r, g, b, a as f64 / 255.0)
}

/// Ambient environment a page is rendered in.
#[derive(Clone)]
pub struct RenderContext {
    pub theme: Arc<dyn ThemeChooser>,
    pub colors: Arc<dyn ColorResolver>,
    pub right_to_left: bool,
}

impl RenderContext {
    pub fn new(
        theme: Arc<dyn ThemeChooser>,
        colors: Arc<dyn ColorResolver>,
        right_to_left: bool,
    ) -> Self {
        Self {
            theme,
            colors,
            right_to_left,
        }
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("theme", &self.theme.selected_theme())
            .field("right_to_left", &self.right_to_left)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_ids_map_to_body_ids() {
        assert_eq!(Theme::from_id(0).body_id(), "darkTheme");
        assert_eq!(Theme::from_id(1).body_id(), "lightTheme");
        assert_eq!(Theme::from_id(2).body_id(), "darkThemeOLED");
        assert_eq!(Theme::from_id(99).body_id(), "darkTheme");
        assert_eq!(Theme::from_id(-1).body_id(), "darkTheme");
    }

    #[test]
    fn theme_id_round_trips_through_chooser() {
        for theme in [Theme::Dark, Theme::Light, Theme::DarkOled] {
            assert_eq!(Theme::from_id(theme.selected_theme()), theme);
        }
    }

    #[test]
    fn parse_theme_accepts_cli_names() {
        assert_eq!(parse_theme("Light"), Ok(Theme::Light));
        assert_eq!(parse_theme("dark-oled"), Ok(Theme::DarkOled));
        assert!(parse_theme("sepia").is_err());
    }

    #[test]
    fn css_color_opaque() {
        assert_eq!(css_color(0xff_12_34_56), "rgba(18,52,86,1.0)");
    }

    #[test]
    fn css_color_transparent() {
        assert_eq!(css_color(0x00_ff_00_00), "rgba(255,0,0,0.0)");
    }

    #[test]
    fn css_color_partial_alpha() {
        assert_eq!(css_color(0x33_00_00_00), "rgba(0,0,0,0.2)");
    }

    #[test]
    fn palette_resolves_in_request_order() {
        let palette = Palette {
            divider_line: 1,
            item_list_background: 2,
        };
        assert_eq!(
            palette.resolve(&[ColorAttr::ItemListBackground, ColorAttr::DividerLine]),
            vec![2, 1]
        );
    }
}
