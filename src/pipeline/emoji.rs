//! Country flag emoji from ISO 3166-1 alpha-2 codes

const REGIONAL_INDICATOR_A: u32 = 0x1F1E6;

/// Map a two-letter country code to its flag emoji
///
/// Letters are case-insensitive. Anything that is not exactly two ASCII
/// letters yields an empty string.
pub fn flag_emoji(country_code: &str) -> String {
    let bytes = country_code.as_bytes();
    if bytes.len() != 2 || !bytes.iter().all(u8::is_ascii_alphabetic) {
        return String::new();
    }

    bytes
        .iter()
        .filter_map(|b| {
            let offset = u32::from(b.to_ascii_uppercase() - b'A');
            char::from_u32(REGIONAL_INDICATOR_A + offset)
        })
        .collect()
}
