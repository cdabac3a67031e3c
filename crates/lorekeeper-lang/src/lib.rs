//! C1: classify text into one of the eight supported language codes.
//!
//! Built on [`whatlang`], a statistical trigram classifier. `whatlang`
//! already expresses its confidence as a relative distance between the
//! best and second-best candidate language, which is exactly the quantity
//! the minimum relative distance threshold of 0.25 gates on.

use lorekeeper_core::model::{is_supported_language, DEFAULT_LANGUAGE};
use lorekeeper_core::traits::LanguageDetector;

/// Minimum relative distance a classification must clear before we trust
/// it over the `en` fallback.
const MIN_RELATIVE_DISTANCE: f64 = 0.25;

/// Texts shorter than this many trimmed characters always fall back to `en`.
const MIN_TEXT_LEN: usize = 10;

/// Statistical n-gram language detector backed by `whatlang`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl WhatlangDetector {
    #[must_use]
    pub fn new() -> Self {
        WhatlangDetector
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> String {
        let trimmed = text.trim();
        if trimmed.chars().count() < MIN_TEXT_LEN {
            return DEFAULT_LANGUAGE.to_string();
        }

        let Some(info) = whatlang::detect(trimmed) else {
            return DEFAULT_LANGUAGE.to_string();
        };

        if info.confidence() < MIN_RELATIVE_DISTANCE {
            return DEFAULT_LANGUAGE.to_string();
        }

        let code = iso_639_3_to_our_code(info.lang());
        if is_supported_language(code) {
            code.to_string()
        } else {
            DEFAULT_LANGUAGE.to_string()
        }
    }
}

/// Map `whatlang`'s ISO 639-3 codes to the eight two-letter codes this
/// system recognizes; everything else is handled by the `is_supported_language`
/// check in [`WhatlangDetector::detect`].
fn iso_639_3_to_our_code(lang: whatlang::Lang) -> &'static str {
    use whatlang::Lang;
    match lang {
        Lang::Kor => "ko",
        Lang::Eng => "en",
        Lang::Jpn => "ja",
        Lang::Cmn => "zh",
        Lang::Spa => "es",
        Lang::Fra => "fr",
        Lang::Deu => "de",
        Lang::Rus => "ru",
        _ => "",
    }
}
