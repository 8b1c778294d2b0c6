//! Translation bundles.
//!
//! Each bundle carries the user-facing strings for one language: input
//! placeholder, welcome text, quick-reply suggestions, the online-status label
//! and the two fallback messages the transport adapter renders on failure.
//! Two bundles ship with the crate, `fr` and `en`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A quick-reply button: a short label mapped to a canned outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Button label.
    #[serde(alias = "text")]
    pub label: String,
    /// Message sent when the button is chosen.
    pub message: String,
}

impl Suggestion {
    /// Creates a suggestion from a label and its canned message.
    pub fn new(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            message: message.into(),
        }
    }
}

/// User-facing strings for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub welcome_message: String,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
    #[serde(default = "default_online_text")]
    pub online_text: String,
    #[serde(default = "default_not_understood")]
    pub not_understood: String,
    #[serde(default = "default_connection_error")]
    pub connection_error: String,
}

fn default_online_text() -> String {
    "Online".to_string()
}

fn default_not_understood() -> String {
    "Sorry, I did not understand.".to_string()
}

fn default_connection_error() -> String {
    "Connection error.".to_string()
}

impl Translation {
    /// The built-in French bundle.
    pub fn french() -> Self {
        Self {
            placeholder: "Écrivez votre message...".to_string(),
            welcome_message: "Bienvenue !\nJe suis WiseBot, l’assistant virtuel. Comment puis-je vous aider aujourd’hui ?".to_string(),
            suggestions: vec![
                Suggestion::new(
                    "À propos de W.I.S.E.",
                    "J’aimerais avoir des informations sur votre entreprise.",
                ),
                Suggestion::new("Qu’est-ce que WiseBot ?", "Qu'est-ce que WiseBot ?"),
                Suggestion::new("Nos services", "Quels sont vos services ?"),
            ],
            online_text: "En ligne".to_string(),
            not_understood: "Désolé, je n’ai pas compris.".to_string(),
            connection_error: "Erreur de connexion.".to_string(),
        }
    }

    /// The built-in English bundle.
    pub fn english() -> Self {
        Self {
            placeholder: "Type your message...".to_string(),
            welcome_message:
                "Welcome!\nI am WiseBot, your virtual assistant. How can I help you today?"
                    .to_string(),
            suggestions: vec![
                Suggestion::new(
                    "About W.I.S.E.",
                    "I would like information about your company.",
                ),
                Suggestion::new("About WiseBot", "What is WiseBot?"),
                Suggestion::new("Our services", "What services do you offer?"),
            ],
            online_text: default_online_text(),
            not_understood: default_not_understood(),
            connection_error: default_connection_error(),
        }
    }

    /// The built-in bundle for `lang`; anything other than `fr` gets English.
    pub fn builtin(lang: &str) -> Self {
        if lang == "fr" {
            Self::french()
        } else {
            Self::english()
        }
    }
}

/// The default bundle set keyed by language code.
pub fn default_translations() -> BTreeMap<String, Translation> {
    let mut translations = BTreeMap::new();
    translations.insert("fr".to_string(), Translation::french());
    translations.insert("en".to_string(), Translation::english());
    translations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_bundles_have_three_suggestions() {
        for bundle in default_translations().values() {
            assert_eq!(bundle.suggestions.len(), 3);
            assert!(!bundle.placeholder.is_empty());
            assert!(!bundle.welcome_message.is_empty());
        }
    }

    #[test]
    fn partial_bundle_fills_fallback_texts() {
        let bundle: Translation = serde_json::from_str(
            r#"{"placeholder": "Schreiben...", "suggestions": [{"text": "Hallo", "message": "Hallo!"}]}"#,
        )
        .unwrap();
        assert_eq!(bundle.placeholder, "Schreiben...");
        assert_eq!(bundle.suggestions[0].label, "Hallo");
        assert_eq!(bundle.online_text, "Online");
        assert_eq!(bundle.connection_error, "Connection error.");
        assert!(bundle.welcome_message.is_empty());
    }

    #[test]
    fn builtin_falls_back_to_english() {
        assert_eq!(Translation::builtin("fr"), Translation::french());
        assert_eq!(Translation::builtin("de"), Translation::english());
    }
}
