//! Widget configuration.
//!
//! Hosts hand the widget a partial [`WidgetOptions`] document (built in code,
//! or loaded from JSON/YAML with the same camelCase keys the embed snippet
//! uses). [`WidgetConfig::resolve`] merges it onto the defaults, resolves the
//! active language and picks the matching translation bundle. Bad values are
//! never fatal: they are replaced by the default and logged.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use arrrg_derive::CommandLine;
use rand::Rng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

use crate::error::{Error, Result};
use crate::i18n::{Suggestion, Translation, default_translations};

/// Endpoint used when the host does not configure one.
pub const DEFAULT_API_URL: &str = "https://primary-production-33255.up.railway.app/webhook/3b85a429-6ab2-42ec-a6be-98528860366b/chat";

/// Speech-bubble icon shown in the trigger.
pub const DEFAULT_BUBBLE_ICON: &str = r#"<svg viewBox="0 0 24 24" width="28" height="28" aria-hidden="true"><path fill="currentColor" d="M12 3C7 3 3.5 6.5 3.5 10.6c0 2.3 1 4.4 2.7 5.9V21l3.4-1.9c.9.2 1.9.3 2.9.3 5 0 8.5-3.5 8.5-7.6S17 3 12 3z"></path></svg>"#;

const DEFAULT_TITLE: &str = "WiseBot";
const DEFAULT_Z_INDEX: i32 = 9999;
const DEFAULT_WIDTH: u32 = 370;
const DEFAULT_HEIGHT: u32 = 580;
const DEFAULT_FONT_FAMILY: &str = "inherit";
const DEFAULT_FALLBACK_LANG: &str = "fr";
const AUTO_LANG: &str = "auto";

const SESSION_PREFIX: &str = "fcw-";
const SESSION_RANDOM_LEN: usize = 10;

/////////////////////////////////////////// Enums ///////////////////////////////////////////

/// Screen corner the bubble and panel are anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    BottomLeft,
    #[default]
    BottomRight,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::BottomLeft => write!(f, "bottom-left"),
            Position::BottomRight => write!(f, "bottom-right"),
        }
    }
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "bottom-left" => Ok(Position::BottomLeft),
            "bottom-right" => Ok(Position::BottomRight),
            _ => Err(Error::validation(
                format!("unknown position {s:?}; expected bottom-left or bottom-right"),
                Some("position".to_string()),
            )),
        }
    }
}

/// Color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeKind {
    Light,
    #[default]
    Dark,
    /// Dark palette with caller-supplied overrides.
    Custom,
}

impl fmt::Display for ThemeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeKind::Light => write!(f, "light"),
            ThemeKind::Dark => write!(f, "dark"),
            ThemeKind::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for ThemeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(ThemeKind::Light),
            "dark" => Ok(ThemeKind::Dark),
            "custom" => Ok(ThemeKind::Custom),
            _ => Err(Error::validation(
                format!("unknown theme {s:?}; expected light, dark or custom"),
                Some("theme".to_string()),
            )),
        }
    }
}

////////////////////////////////////////// Options //////////////////////////////////////////

/// Partial configuration supplied by the host.
///
/// Every field is optional; omitted fields take the documented defaults and
/// unrecognized keys in a JSON/YAML document are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetOptions {
    /// Chat endpoint receiving `{chatInput, sessionId, lang}`.
    #[serde(alias = "endpoint")]
    pub api_url: Option<String>,
    /// `bottom-left` or `bottom-right`.
    pub position: Option<String>,
    /// `light`, `dark` or `custom`.
    pub theme: Option<String>,
    /// CSS variable overrides applied when the theme is `custom`.
    pub custom_colors: BTreeMap<String, String>,
    /// Trusted markup for the bubble icon.
    pub bubble_icon: Option<String>,
    pub title: Option<String>,
    pub placeholder: Option<String>,
    pub welcome_message: Option<String>,
    pub z_index: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub font_family: Option<String>,
    pub debug: Option<bool>,
    pub session_id: Option<String>,
    /// Language code, or `auto` to follow the browser.
    pub lang: Option<String>,
    pub fallback_lang: Option<String>,
    /// Replaces the built-in bundles wholesale when present.
    pub translations: Option<BTreeMap<String, Translation>>,
    /// Animate bot replies; defaults to true.
    pub streaming: Option<bool>,
}

impl WidgetOptions {
    /// Creates an empty options document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses options from a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads options from a `.json`, `.yaml` or `.yml` file.
    pub fn load(path: &utf8path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_str())
            .map_err(|err| Error::io(format!("failed to read {}", path.as_str()), err))?;
        let lower = path.as_str().to_lowercase();
        if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            Self::from_yaml(&text)
        } else if lower.ends_with(".json") {
            Self::from_json(&text)
        } else {
            Err(Error::validation(
                format!("{} is neither JSON nor YAML", path.as_str()),
                Some("config".to_string()),
            ))
        }
    }

    /// Sets the chat endpoint.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    /// Sets the screen position.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position.to_string());
        self
    }

    /// Sets the theme.
    pub fn with_theme(mut self, theme: ThemeKind) -> Self {
        self.theme = Some(theme.to_string());
        self
    }

    /// Adds a custom color override.
    pub fn with_custom_color(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_colors.insert(key.into(), value.into());
        self
    }

    /// Sets the panel title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Overrides the welcome message of the resolved bundle.
    pub fn with_welcome_message(mut self, welcome: impl Into<String>) -> Self {
        self.welcome_message = Some(welcome.into());
        self
    }

    /// Enables or disables diagnostic logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Fixes the session identifier instead of generating one.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets the language, or `auto`.
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    /// Sets the fallback language.
    pub fn with_fallback_lang(mut self, lang: impl Into<String>) -> Self {
        self.fallback_lang = Some(lang.into());
        self
    }

    /// Replaces the translation bundles.
    pub fn with_translations(mut self, translations: BTreeMap<String, Translation>) -> Self {
        self.translations = Some(translations);
        self
    }

    /// Enables or disables the reply typing animation.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = Some(streaming);
        self
    }
}

/////////////////////////////////////////// Config //////////////////////////////////////////

/// Fully resolved, immutable widget configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetConfig {
    pub api_url: Url,
    pub position: Position,
    pub theme: ThemeKind,
    /// Normalized `fcw-*` variable names mapped to CSS values.
    pub custom_colors: BTreeMap<String, String>,
    pub bubble_icon: String,
    pub title: String,
    pub placeholder: String,
    pub welcome_message: String,
    pub z_index: i32,
    pub width: u32,
    pub height: u32,
    pub font_family: String,
    pub debug: bool,
    /// Session identifier for the first conversation; resets mint new ones.
    pub session_id: String,
    /// Resolved language code sent to the endpoint.
    pub lang: String,
    pub fallback_lang: String,
    pub translations: BTreeMap<String, Translation>,
    pub suggestions: Vec<Suggestion>,
    pub online_text: String,
    pub not_understood: String,
    pub connection_error: String,
    pub streaming: bool,
}

impl WidgetConfig {
    /// Resolves `options` against the defaults.
    ///
    /// `browser_language` is the host's reported locale (e.g. `en-US`); it is
    /// only consulted when the options ask for `auto` language selection.
    pub fn resolve(options: &WidgetOptions, browser_language: Option<&str>) -> Self {
        let api_url = options
            .api_url
            .as_deref()
            .and_then(|raw| match Url::parse(raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
                Ok(url) => {
                    tracing::warn!(scheme = url.scheme(), "ignoring non-HTTP endpoint");
                    None
                }
                Err(err) => {
                    tracing::warn!(%err, "ignoring unparsable endpoint");
                    None
                }
            })
            .unwrap_or_else(default_api_url);
        let position = parse_or_default(options.position.as_deref());
        let theme = parse_or_default(options.theme.as_deref());
        let translations = options
            .translations
            .clone()
            .unwrap_or_else(default_translations);
        let fallback_lang = non_empty(options.fallback_lang.as_deref())
            .unwrap_or(DEFAULT_FALLBACK_LANG)
            .to_string();
        let lang = resolve_language(
            options.lang.as_deref(),
            browser_language,
            &translations,
            &fallback_lang,
        );
        let bundle = translations
            .get(&lang)
            .or_else(|| translations.get(&fallback_lang))
            .cloned()
            .unwrap_or_else(|| Translation::builtin(&fallback_lang));
        let session_id = non_empty(options.session_id.as_deref())
            .map(str::to_string)
            .unwrap_or_else(generate_session_id);

        WidgetConfig {
            api_url,
            position,
            theme,
            custom_colors: normalize_colors(&options.custom_colors),
            bubble_icon: options
                .bubble_icon
                .clone()
                .unwrap_or_else(|| DEFAULT_BUBBLE_ICON.to_string()),
            title: non_empty(options.title.as_deref())
                .unwrap_or(DEFAULT_TITLE)
                .to_string(),
            placeholder: non_empty(options.placeholder.as_deref())
                .map(str::to_string)
                .unwrap_or(bundle.placeholder),
            welcome_message: non_empty(options.welcome_message.as_deref())
                .map(str::to_string)
                .unwrap_or(bundle.welcome_message),
            z_index: options.z_index.unwrap_or(DEFAULT_Z_INDEX),
            width: positive_or(options.width, DEFAULT_WIDTH, "width"),
            height: positive_or(options.height, DEFAULT_HEIGHT, "height"),
            font_family: options
                .font_family
                .as_deref()
                .filter(|font| {
                    let ok = is_safe_css_value(font);
                    if !ok {
                        tracing::warn!(font, "ignoring unsafe font family");
                    }
                    ok
                })
                .and_then(|font| non_empty(Some(font)))
                .unwrap_or(DEFAULT_FONT_FAMILY)
                .to_string(),
            debug: options.debug.unwrap_or(false),
            session_id,
            lang,
            fallback_lang,
            suggestions: bundle.suggestions,
            online_text: non_empty(Some(&bundle.online_text))
                .unwrap_or("Online")
                .to_string(),
            not_understood: bundle.not_understood,
            connection_error: bundle.connection_error,
            translations,
            streaming: options.streaming.unwrap_or(true),
        }
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self::resolve(&WidgetOptions::default(), None)
    }
}

/// Resolves the active language.
///
/// An explicit, non-`auto` preference always wins. Otherwise the browser
/// language (lower-cased) is tried by its two-letter prefix and then in full
/// against the available bundles, before settling on `fallback`.
pub fn resolve_language(
    preference: Option<&str>,
    browser_language: Option<&str>,
    translations: &BTreeMap<String, Translation>,
    fallback: &str,
) -> String {
    if let Some(pref) = non_empty(preference)
        && pref != AUTO_LANG
    {
        return pref.to_string();
    }
    let nav = browser_language.unwrap_or_default().trim().to_lowercase();
    let short = nav.split('-').next().unwrap_or_default();
    if !short.is_empty() && translations.contains_key(short) {
        return short.to_string();
    }
    if !nav.is_empty() && translations.contains_key(&nav) {
        return nav;
    }
    fallback.to_string()
}

/// Mints a fresh session identifier: a random base-36 run plus a millisecond timestamp.
pub fn generate_session_id() -> String {
    let mut rng = rand::rng();
    let random: String = (0..SESSION_RANDOM_LEN)
        .map(|_| char::from_digit(rng.random_range(0..36), 36).unwrap_or('0'))
        .collect();
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    format!("{SESSION_PREFIX}{random}{millis}")
}

/// Reads the process locale from `LC_ALL` or `LANG` in browser form (`en_US.UTF-8` → `en-us`).
pub fn browser_language_from_env() -> Option<String> {
    ["LC_ALL", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(|value| normalize_locale(&value))
}

fn normalize_locale(locale: &str) -> Option<String> {
    let base = locale.split(['.', '@']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-").to_lowercase())
}

/// True when `value` can be interpolated into a CSS declaration without
/// escaping it.
pub(crate) fn is_safe_css_value(value: &str) -> bool {
    !value.chars().any(|c| matches!(c, ';' | '{' | '}' | '<' | '>' | '\n' | '\r'))
}

fn normalize_colors(colors: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut normalized = BTreeMap::new();
    for (key, value) in colors {
        let key = key.trim().trim_start_matches("--");
        let valid_key = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_key || !is_safe_css_value(value) {
            tracing::warn!(key, value = value.as_str(), "ignoring custom color");
            continue;
        }
        let key = if key.starts_with("fcw-") {
            key.to_string()
        } else {
            format!("fcw-{key}")
        };
        normalized.insert(key, value.trim().to_string());
    }
    normalized
}

fn default_api_url() -> Url {
    Url::parse(DEFAULT_API_URL).expect("default endpoint should be a valid URL")
}

fn parse_or_default<T>(value: Option<&str>) -> T
where
    T: FromStr<Err = Error> + Default,
{
    match value.map(str::parse::<T>) {
        Some(Ok(parsed)) => parsed,
        Some(Err(err)) => {
            tracing::warn!(%err, "using default");
            T::default()
        }
        None => T::default(),
    }
}

fn positive_or(value: Option<u32>, default: u32, param: &str) -> u32 {
    match value {
        Some(0) => {
            tracing::warn!(param, "ignoring zero dimension");
            default
        }
        Some(value) => value,
        None => default,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/////////////////////////////////////////// Args ////////////////////////////////////////////

/// Command-line arguments for the floatchat binary.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct WidgetArgs {
    /// Options document to load.
    #[arrrg(optional, "Options document (JSON or YAML)", "FILE")]
    pub config: Option<String>,

    /// Chat endpoint URL.
    #[arrrg(optional, "Chat endpoint URL", "URL")]
    pub endpoint: Option<String>,

    /// Language code.
    #[arrrg(optional, "Language code or auto (default: auto)", "LANG")]
    pub lang: Option<String>,

    /// Theme name.
    #[arrrg(optional, "Theme: light, dark or custom (default: dark)", "THEME")]
    pub theme: Option<String>,

    /// Enable diagnostic logging.
    #[arrrg(flag, "Enable diagnostic logging")]
    pub debug: bool,

    /// Show replies at once instead of typing them out.
    #[arrrg(flag, "Disable the reply typing animation")]
    pub no_stream: bool,

    /// Print a static page snapshot and exit.
    #[arrrg(flag, "Print the widget as a static HTML page and exit")]
    pub html: bool,
}

impl WidgetArgs {
    /// Builds options from the optional document, then applies the flags on top.
    pub fn options(&self) -> Result<WidgetOptions> {
        let mut options = match &self.config {
            Some(path) => WidgetOptions::load(&utf8path::Path::from(path.as_str()))?,
            None => WidgetOptions::default(),
        };
        if let Some(endpoint) = &self.endpoint {
            options.api_url = Some(endpoint.clone());
        }
        if let Some(lang) = &self.lang {
            options.lang = Some(lang.clone());
        }
        if let Some(theme) = &self.theme {
            options.theme = Some(theme.clone());
        }
        if self.debug {
            options.debug = Some(true);
        }
        if self.no_stream {
            options.streaming = Some(false);
        }
        Ok(options)
    }
}
