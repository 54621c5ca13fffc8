//! Locale-aware title selection.
//!
//! Records carry a default title plus optional translations keyed by locale
//! tag. The caller passes the locale explicitly.

use std::collections::BTreeMap;

/// Locale tag → translated text.
pub type Translations = BTreeMap<String, String>;

/// A record with a default title and per-locale variants.
pub trait Localized {
    fn default_title(&self) -> &str;
    fn title_translations(&self) -> &Translations;
}

/// Pick the best title for `locale`.
///
/// Lookup order: exact tag (case-insensitive), then the primary language
/// subtag (`fr-CA` → `fr`), then the default title. Blank translations are
/// skipped.
pub fn localize<'a, R: Localized + ?Sized>(record: &'a R, locale: &str) -> &'a str {
    let translations = record.title_translations();
    let wanted = locale.trim().replace('_', "-").to_ascii_lowercase();

    if !wanted.is_empty() {
        if let Some(text) = find(translations, &wanted) {
            return text;
        }
        if let Some((language, _)) = wanted.split_once('-') {
            if let Some(text) = find(translations, language) {
                return text;
            }
        }
    }

    record.default_title()
}

fn find<'a>(translations: &'a Translations, tag: &str) -> Option<&'a str> {
    translations
        .iter()
        .find(|(key, text)| {
            key.replace('_', "-").eq_ignore_ascii_case(tag) && !text.trim().is_empty()
        })
        .map(|(_, text)| text.as_str())
}
