//! Language codes of report file names.

/// Alpha-3 to alpha-2 codes of the official EU languages.
///
/// Early ESEF reports often named the language with three letters.
pub const LANG_CODE_TRANSFORM: [(&str, &str); 24] = [
    ("bul", "bg"),
    ("ces", "cs"),
    ("dan", "da"),
    ("deu", "de"),
    ("ell", "el"),
    ("eng", "en"),
    ("est", "et"),
    ("fin", "fi"),
    ("fra", "fr"),
    ("gle", "ga"),
    ("hrv", "hr"),
    ("hun", "hu"),
    ("ita", "it"),
    ("lav", "lv"),
    ("lit", "lt"),
    ("mlt", "mt"),
    ("nld", "nl"),
    ("pol", "pl"),
    ("por", "pt"),
    ("ron", "ro"),
    ("slk", "sk"),
    ("slv", "sl"),
    ("spa", "es"),
    ("swe", "sv"),
];

/// Alpha-2 code for a lowercase alpha-3 EU language code.
pub fn transform_language_code(alpha3: &str) -> Option<&'static str> {
    LANG_CODE_TRANSFORM
        .iter()
        .find(|(a3, _)| *a3 == alpha3)
        .map(|(_, a2)| *a2)
}

/// Fix country codes used in place of language codes.
///
/// Norwegian Bokmål and Nynorsk are both reported as `no`.
pub fn correct_language_code(code: Option<String>, country: Option<&str>) -> Option<String> {
    let code = code?;
    let corrected = match (country, code.as_str()) {
        (Some("CZ"), "cz") => "cs",
        (Some("SE"), "se") => "sv",
        (Some("DK"), "dk") => "da",
        (Some("NO"), "nb" | "nn") => "no",
        _ => return Some(code),
    };
    Some(corrected.to_string())
}
