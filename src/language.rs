//! Subtitle language codes
//!
//! Maps the human readable subtitle labels of the watch endpoint to
//! ISO 639-2 codes, which ffmpeg expects in stream language metadata.

/// Code used when a label is not in the table
pub const UNDETERMINED: &str = "und";

/// Known subtitle labels and their ISO 639-2/B codes
const LANGUAGE_CODES: &[(&str, &str)] = &[
    ("arabic", "ara"),
    ("bengali", "ben"),
    ("bulgarian", "bul"),
    ("burmese", "bur"),
    ("catalan", "cat"),
    ("chinese", "chi"),
    ("croatian", "hrv"),
    ("czech", "cze"),
    ("danish", "dan"),
    ("dutch", "dut"),
    ("english", "eng"),
    ("filipino", "fil"),
    ("finnish", "fin"),
    ("french", "fre"),
    ("german", "ger"),
    ("greek", "gre"),
    ("hebrew", "heb"),
    ("hindi", "hin"),
    ("hungarian", "hun"),
    ("indonesian", "ind"),
    ("italian", "ita"),
    ("japanese", "jpn"),
    ("korean", "kor"),
    ("malay", "may"),
    ("norwegian", "nor"),
    ("persian", "per"),
    ("polish", "pol"),
    ("portuguese", "por"),
    ("romanian", "rum"),
    ("russian", "rus"),
    ("serbian", "srp"),
    ("slovak", "slo"),
    ("spanish", "spa"),
    ("swedish", "swe"),
    ("tamil", "tam"),
    ("telugu", "tel"),
    ("thai", "tha"),
    ("turkish", "tur"),
    ("ukrainian", "ukr"),
    ("vietnamese", "vie"),
];

/// Returns the three-letter code for a subtitle label
///
/// Only the part before `" - "` is considered, so regional variants such as
/// `Portuguese - Portuguese(Brazil)` map to their base language.
pub fn language_code(label: &str) -> &'static str {
    let base = label
        .split(" - ")
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    LANGUAGE_CODES
        .iter()
        .find(|(name, _)| *name == base)
        .map(|(_, code)| *code)
        .unwrap_or(UNDETERMINED)
}
