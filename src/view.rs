//! Markup and stylesheet generation.
//!
//! Everything the widget puts on a page is produced here: the bubble trigger,
//! the chat panel, message bubbles, the loading placeholder, suggestion
//! buttons, the welcome popup and the single stylesheet they share. Text from
//! configuration is escaped before interpolation; the bubble icon is the only
//! trusted markup.

use crate::config::{Position, ThemeKind, WidgetConfig};
use crate::conversation::Sender;
use crate::i18n::Suggestion;
use crate::markdown::escape_html;

/// Element id of the injected stylesheet.
pub const STYLE_ELEMENT_ID: &str = "fcw-style";

/// Element id of the suggestion block inside the log.
pub const SUGGESTIONS_ELEMENT_ID: &str = "fcw-suggestions";

/// Three pulsing dots shown while a reply is pending.
pub const LOADING_MARKUP: &str =
    r#"<div class="fcw-loading"><span></span><span></span><span></span></div>"#;

/// Opening tag of the bubble content inside a message row.
pub const BUBBLE_TEXT_OPEN: &str = r#"<div class="fcw-bubble-text">"#;

/// The empty log container inside the panel.
pub const LOG_ELEMENT: &str = r#"<div class="fcw-messages" role="log" aria-live="polite"></div>"#;

/// The hidden unread badge inside the bubble.
pub const BADGE_ELEMENT: &str = r#"<div class="fcw-unread" style="display:none">0</div>"#;

/// Unread counts above this are displayed as `99+`.
const BADGE_CAP: u32 = 99;

/// Base colors of a theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub primary: &'static str,
    pub background: &'static str,
    pub foreground: &'static str,
    pub muted: &'static str,
}

impl Palette {
    /// Light and dark palettes; custom themes start from the dark one.
    pub fn for_theme(theme: ThemeKind) -> Self {
        match theme {
            ThemeKind::Light => Palette {
                primary: "#1aa6ff",
                background: "#ffffff",
                foreground: "#111827",
                muted: "#666666",
            },
            ThemeKind::Dark | ThemeKind::Custom => Palette {
                primary: "#70c7ff",
                background: "#1f1f1f",
                foreground: "#f8fafc",
                muted: "#666666",
            },
        }
    }
}

/// The bubble and the panel, ready to be mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetMarkup {
    pub bubble: String,
    pub panel: String,
}

/// CSS custom properties in declaration order.
///
/// Custom overrides only replace the keys they name; unknown keys are appended.
pub fn css_variables(config: &WidgetConfig) -> Vec<(String, String)> {
    let palette = Palette::for_theme(config.theme);
    let mut vars = vec![
        ("fcw-width".to_string(), format!("{}px", config.width)),
        ("fcw-height".to_string(), format!("{}px", config.height)),
        ("fcw-radius".to_string(), "16px".to_string()),
        ("fcw-primary".to_string(), palette.primary.to_string()),
        ("fcw-bg".to_string(), palette.background.to_string()),
        ("fcw-foreground".to_string(), palette.foreground.to_string()),
        ("fcw-muted".to_string(), palette.muted.to_string()),
    ];
    if config.theme == ThemeKind::Custom {
        for (key, value) in &config.custom_colors {
            match vars.iter_mut().find(|(name, _)| name == key) {
                Some(slot) => slot.1 = value.clone(),
                None => vars.push((key.clone(), value.clone())),
            }
        }
    }
    vars
}

/// Builds the widget stylesheet.
pub fn stylesheet(config: &WidgetConfig) -> String {
    let root: String = css_variables(config)
        .iter()
        .map(|(name, value)| format!("--{name}:{value};"))
        .collect();
    let side = match config.position {
        Position::BottomLeft => "left",
        Position::BottomRight => "right",
    };
    let z = config.z_index;
    let popup_z = z.saturating_add(1);
    let font = &config.font_family;
    format!(
        r#":root{{{root}}}
.fcw-bubble{{position:fixed;{side}:24px;bottom:24px;z-index:{z};width:56px;height:56px;border-radius:50%;display:flex;align-items:center;justify-content:center;font-size:1.6rem;background:var(--fcw-primary);color:#fff;box-shadow:0 6px 20px rgba(0,0,0,0.15);cursor:pointer;transition:transform .18s,box-shadow .18s}}
.fcw-bubble:hover{{transform:scale(1.06);box-shadow:0 10px 30px rgba(0,0,0,0.2)}}
.fcw-unread{{position:absolute;top:-6px;right:-6px;background:var(--fcw-primary);color:#fff;border-radius:12px;padding:2px 6px;font-size:0.7rem;min-width:20px;text-align:center}}
.fcw-widget{{position:fixed;{side}:24px;bottom:90px;z-index:{z};width:var(--fcw-width);max-width:95vw;height:var(--fcw-height);max-height:80vh;background:var(--fcw-bg);border-radius:var(--fcw-radius);box-shadow:0 12px 40px rgba(0,0,0,0.25);display:flex;flex-direction:column;overflow:hidden;opacity:0;pointer-events:none;transform:translateY(20px) scale(.98);transition:opacity .28s,transform .28s}}
.fcw-widget.open{{opacity:1;pointer-events:auto;transform:translateY(0) scale(1)}}
.fcw-header{{background:linear-gradient(90deg,var(--fcw-primary),#3fb0ff);padding:12px 14px;color:#fff;display:flex;align-items:center;justify-content:space-between}}
.fcw-header-left{{display:flex;align-items:center;gap:10px}}
.fcw-avatar{{width:40px;height:40px;border-radius:50%;background:#fff;flex-shrink:0}}
.fcw-header-info{{display:flex;flex-direction:column}}
.fcw-header-title{{font-weight:700;font-size:1rem}}
.fcw-status{{font-size:0.8rem;color:rgba(255,255,255,0.9)}}
.fcw-header button{{background:none;border:none;color:#fff;font-size:1rem;cursor:pointer}}
.fcw-messages{{flex:1;padding:14px;overflow:auto;color:var(--fcw-foreground);font-family:{font}}}
.fcw-message{{margin-bottom:12px;display:flex;align-items:flex-end}}
.fcw-message.user{{justify-content:flex-end}}
.fcw-message.bot{{justify-content:flex-start}}
.fcw-message .fcw-bubble-text{{border-radius:12px;padding:10px 14px;max-width:80%;font-size:0.96rem;box-shadow:0 4px 18px rgba(0,0,0,0.08)}}
.fcw-message.user .fcw-bubble-text{{background:var(--fcw-primary);color:#000}}
.fcw-message.bot .fcw-bubble-text{{background:rgba(255,255,255,0.06);color:var(--fcw-foreground)}}
.fcw-input-row{{display:flex;align-items:center;padding:8px;border-top:1px solid rgba(255,255,255,0.04)}}
.fcw-input{{flex:1;border:none;padding:10px;border-radius:10px;font-size:1rem;resize:none;max-height:120px;overflow-y:auto;background:rgba(255,255,255,0.02);color:var(--fcw-foreground);outline:none}}
.fcw-send-btn{{background:none;border:none;color:var(--fcw-primary);font-size:1.2rem;padding:8px;cursor:pointer}}
.fcw-loading{{display:inline-flex;align-items:center;gap:6px;color:var(--fcw-muted)}}
.fcw-loading span{{display:inline-block;width:6px;height:6px;border-radius:50%;background:currentColor;animation:fcw-wave 1.2s linear infinite}}
@keyframes fcw-wave{{0%{{opacity:.3;transform:translateY(0)}}50%{{opacity:1;transform:translateY(-6px)}}100%{{opacity:.3;transform:translateY(0)}}}}
.fcw-suggestions{{padding:12px;display:flex;flex-wrap:wrap;gap:8px}}
.fcw-suggestion-btn{{background:transparent;border:1px solid rgba(255,255,255,0.08);padding:8px 10px;border-radius:8px;color:var(--fcw-foreground);cursor:pointer}}
.fcw-welcome-popup{{position:fixed;{side}:90px;bottom:35px;z-index:{popup_z};background:var(--fcw-primary);color:#fff;padding:10px 14px;border-radius:12px;box-shadow:0 6px 30px rgba(0,0,0,0.18);opacity:0;transform:translateY(8px);transition:all .28s}}
.fcw-welcome-popup.show{{opacity:1;transform:translateY(0)}}
.fcw-welcome-close{{background:transparent;border:none;color:#fff;font-weight:700;cursor:pointer}}
"#
    )
}

/// Builds the bubble trigger and the (closed) chat panel.
pub fn widget_markup(config: &WidgetConfig) -> WidgetMarkup {
    let bubble = format!(
        r#"<div class="fcw-bubble" role="button" aria-label="chat">{icon}{badge}</div>"#,
        icon = config.bubble_icon,
        badge = BADGE_ELEMENT,
    );
    let panel = format!(
        r#"<div class="fcw-widget">
  <div class="fcw-header">
    <div class="fcw-header-left">
      <div class="fcw-avatar" aria-hidden="true"></div>
      <div class="fcw-header-info">
        <div class="fcw-header-title">{title}</div>
        <div class="fcw-status"><span class="fcw-status-dot"></span> {online}</div>
      </div>
    </div>
    <div>
      <button class="fcw-minimize-btn" aria-label="minimize">−</button>
      <button class="fcw-close-btn" aria-label="close">✕</button>
    </div>
  </div>
  {log}
  <form class="fcw-input-row" autocomplete="off">
    <textarea class="fcw-input" placeholder="{placeholder}" rows="1"></textarea>
    <button class="fcw-send-btn" type="submit">➤</button>
  </form>
</div>"#,
        title = escape_html(&config.title),
        online = escape_html(&config.online_text),
        placeholder = escape_html(&config.placeholder),
        log = LOG_ELEMENT,
    );
    WidgetMarkup { bubble, panel }
}

/// Wraps bubble content in a message row for `sender`.
pub fn message_markup(sender: Sender, inner: &str) -> String {
    format!(r#"<div class="fcw-message {sender}">{BUBBLE_TEXT_OPEN}{inner}</div></div>"#)
}

/// One button per suggestion; `data-suggestion` carries the index to pass
/// back to the widget when clicked.
pub fn suggestions_markup(suggestions: &[Suggestion]) -> String {
    let buttons: String = suggestions
        .iter()
        .enumerate()
        .map(|(idx, suggestion)| {
            format!(
                r#"<button class="fcw-suggestion-btn" type="button" data-suggestion="{idx}">{}</button>"#,
                escape_html(&suggestion.label)
            )
        })
        .collect();
    format!(r#"<div class="fcw-suggestions" id="{SUGGESTIONS_ELEMENT_ID}">{buttons}</div>"#)
}

/// The welcome callout; `welcome_html` is already formatted.
pub fn welcome_popup_markup(welcome_html: &str) -> String {
    format!(
        r#"<div class="fcw-welcome-popup"><div>{welcome_html}<div style="text-align:right;margin-top:6px"><button class="fcw-welcome-close" aria-label="dismiss">×</button></div></div></div>"#
    )
}

/// Badge text for an unread count; `None` hides the badge.
pub fn badge_text(unread: u32) -> Option<String> {
    match unread {
        0 => None,
        n if n > BADGE_CAP => Some(format!("{BADGE_CAP}+")),
        n => Some(n.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WidgetOptions;

    fn config(options: WidgetOptions) -> WidgetConfig {
        WidgetConfig::resolve(&options, None)
    }

    #[test]
    fn badge_caps_at_99() {
        assert_eq!(badge_text(0), None);
        assert_eq!(badge_text(1).as_deref(), Some("1"));
        assert_eq!(badge_text(99).as_deref(), Some("99"));
        assert_eq!(badge_text(100).as_deref(), Some("99+"));
    }

    #[test]
    fn theme_palettes() {
        let light = css_variables(&config(WidgetOptions::default().with_theme(ThemeKind::Light)));
        assert!(light.contains(&("fcw-primary".to_string(), "#1aa6ff".to_string())));
        assert!(light.contains(&("fcw-width".to_string(), "370px".to_string())));
        let dark = css_variables(&config(WidgetOptions::default()));
        assert!(dark.contains(&("fcw-bg".to_string(), "#1f1f1f".to_string())));
    }

    #[test]
    fn custom_theme_overrides_only_given_keys() {
        let options = WidgetOptions::default()
            .with_theme(ThemeKind::Custom)
            .with_custom_color("fcw-primary", "#ff0000")
            .with_custom_color("accent", "#00ff00");
        let vars = css_variables(&config(options));
        let lookup = |key: &str| {
            vars.iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.clone())
        };
        assert_eq!(lookup("fcw-primary").as_deref(), Some("#ff0000"));
        assert_eq!(lookup("fcw-bg").as_deref(), Some("#1f1f1f"));
        assert_eq!(lookup("fcw-accent").as_deref(), Some("#00ff00"));
        assert_eq!(vars.iter().filter(|(name, _)| name == "fcw-primary").count(), 1);
    }

    #[test]
    fn overrides_ignored_without_custom_theme() {
        let options = WidgetOptions::default().with_custom_color("fcw-primary", "#ff0000");
        let vars = css_variables(&config(options));
        assert!(vars.contains(&("fcw-primary".to_string(), "#70c7ff".to_string())));
    }

    #[test]
    fn stylesheet_follows_position() {
        let css = stylesheet(&config(WidgetOptions::default().with_position(Position::BottomLeft)));
        assert!(css.contains(".fcw-bubble{position:fixed;left:24px;"));
        assert!(css.contains("z-index:10000"));
        assert!(css.starts_with(":root{--fcw-width:370px;"));
    }

    #[test]
    fn panel_escapes_text() {
        let markup = widget_markup(&config(WidgetOptions::default().with_title("<Bot & Co>")));
        assert!(markup.panel.contains("&lt;Bot &amp; Co&gt;"));
        assert!(markup.bubble.contains("<svg"));
    }

    #[test]
    fn suggestion_buttons_carry_index() {
        let markup = suggestions_markup(&[
            Suggestion::new("One", "first"),
            Suggestion::new("<Two>", "second"),
        ]);
        assert!(markup.contains(r#"data-suggestion="0">One<"#));
        assert!(markup.contains(r#"data-suggestion="1">&lt;Two&gt;<"#));
    }

    #[test]
    fn message_rows_by_sender() {
        assert_eq!(
            message_markup(Sender::User, "hi"),
            r#"<div class="fcw-message user"><div class="fcw-bubble-text">hi</div></div>"#
        );
        assert!(message_markup(Sender::Bot, LOADING_MARKUP).contains("fcw-loading"));
    }
}
