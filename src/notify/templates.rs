//! Localized SMS bodies

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Fr,
    De,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::En, Language::Fr, Language::De];

    /// Unrecognized codes fall back to English
    pub fn parse(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "fr" => Language::Fr,
            "de" => Language::De,
            _ => Language::En,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Confirmation,
    Reminder,
}

impl MessageKind {
    pub const ALL: [MessageKind; 2] = [MessageKind::Confirmation, MessageKind::Reminder];

    /// Unrecognized kinds fall back to a confirmation
    pub fn parse(kind: &str) -> Self {
        match kind.trim().to_ascii_lowercase().as_str() {
            "reminder" => MessageKind::Reminder,
            _ => MessageKind::Confirmation,
        }
    }
}

const DEFAULT_DAY: &str = "your reserved day";
const DEFAULT_SERVICE: &str = "your scheduled time";

fn template(language: Language, kind: MessageKind) -> &'static str {
    match (language, kind) {
        (Language::En, MessageKind::Confirmation) => {
            "Dear {name}, your table is confirmed for {day} at {service}. See you soon!"
        }
        (Language::En, MessageKind::Reminder) => {
            "Reminder: Your table is booked for {day} at {service}. We look forward to seeing you!"
        }
        (Language::Fr, MessageKind::Confirmation) => {
            "Cher(e) {name}, votre table est confirmee pour {day} a {service}. A bientot!"
        }
        (Language::Fr, MessageKind::Reminder) => {
            "Rappel: Votre table est reservee pour {day} a {service}. Nous vous attendons avec impatience!"
        }
        (Language::De, MessageKind::Confirmation) => {
            "Liebe(r) {name}, Ihr Tisch ist fur {day} um {service} bestatigt. Bis bald!"
        }
        (Language::De, MessageKind::Reminder) => {
            "Erinnerung: Ihr Tisch ist fur {day} um {service} reserviert. Wir freuen uns auf Sie!"
        }
    }
}

/// Fill a template. Missing or blank day and service get generic wording.
pub fn render(
    language: Language,
    kind: MessageKind,
    name: &str,
    day: Option<&str>,
    service: Option<&str>,
) -> String {
    let day = day.filter(|d| !d.trim().is_empty()).unwrap_or(DEFAULT_DAY);
    let service = service.filter(|s| !s.trim().is_empty()).unwrap_or(DEFAULT_SERVICE);
    template(language, kind)
        .replace("{name}", name)
        .replace("{day}", day)
        .replace("{service}", service)
}
