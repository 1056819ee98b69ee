// Two-letter codes to the catalog's three-letter language ids.
// See http://www.opensubtitles.org/addons/export_languages.php
const LANGUAGE_IDS: &[(&str, &str)] = &[
    ("en", "eng"),
    ("fr", "fre"),
    ("de", "ger"),
    ("ca", "cat"),
    ("es", "spa"),
    ("it", "ita"),
    ("pt", "por"),
    ("nl", "dut"),
];

/// Catalog language id for `code`, or an empty string when the code is not
/// in the table. The catalog reads an empty id as "any language".
pub fn subtitle_language_id(code: &str) -> &'static str {
    let code = code.trim().to_lowercase();
    LANGUAGE_IDS
        .iter()
        .find(|(short, _)| *short == code)
        .map(|(_, id)| *id)
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(subtitle_language_id("en"), "eng");
        assert_eq!(subtitle_language_id("fr"), "fre");
        assert_eq!(subtitle_language_id("de"), "ger");
        assert_eq!(subtitle_language_id("ca"), "cat");
    }

    #[test]
    fn test_lookup_ignores_case_and_padding() {
        assert_eq!(subtitle_language_id(" FR "), "fre");
    }

    #[test]
    fn test_unmapped_code_is_empty() {
        assert_eq!(subtitle_language_id("xx"), "");
        assert_eq!(subtitle_language_id(""), "");
        // already a catalog id, still not a table key
        assert_eq!(subtitle_language_id("eng"), "");
    }
}
