use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for novel language tags
///
/// Novels carry free-form language tags. When a tag is an ISO 639-1 or
/// ISO 639-2 code it is expanded to its English name before it is written
/// into a prompt; any other tag ("Classical Chinese", "Korean (web novel)")
/// is used verbatim.
/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 => {
            if let Some(lang) = Language::from_639_1(&normalized_code) {
                return Ok(lang.to_639_3().to_string());
            }
        }
        3 => {
            if let Some((_, terminology)) = BIBLIOGRAPHIC_CODES
                .iter()
                .find(|(bibliographic, _)| *bibliographic == normalized_code)
            {
                return Ok((*terminology).to_string());
            }
            if Language::from_639_3(&normalized_code).is_some() {
                return Ok(normalized_code);
            }
        }
        _ => {}
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Check if a tag is a valid ISO 639-1 or ISO 639-2 code
pub fn is_language_code(code: &str) -> bool {
    normalize_to_part2t(code).is_ok()
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Human readable name for a novel language tag
///
/// ISO codes become English names, anything else is returned trimmed.
pub fn display_name(tag: &str) -> String {
    get_language_name(tag).unwrap_or_else(|_| tag.trim().to_string())
}
