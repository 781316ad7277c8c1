//! Reversible encoding of names that some filesystems (or the tools run on
//! them) cannot hold: emoji, reserved characters, control characters.
//!
//! Each such character becomes `%<HEX>%` with the code point in uppercase hex.
//! `%` itself is always encoded, so every `%` in an encoded name opens a token
//! and decoding is exact.

const ESCAPE: char = '%';
const RESERVED: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

fn needs_encoding(c: char) -> bool {
    c == ESCAPE || c.is_control() || RESERVED.contains(&c) || is_emoji_component(c)
}

/// Pictographs plus the joiners and modifiers that glue emoji sequences.
fn is_emoji_component(c: char) -> bool {
    matches!(c as u32,
        0x200D                // zero width joiner
        | 0x20E3              // combining enclosing keycap
        | 0x2600..=0x27BF     // misc symbols, dingbats
        | 0x2B00..=0x2BFF     // arrows, stars
        | 0xFE00..=0xFE0F     // variation selectors
        | 0x1F000..=0x1FAFF   // emoji blocks, regional indicators, skin tones
        | 0xE0020..=0xE007F   // tag sequences (subdivision flags)
    )
}

/// Encode a name so it is safe as a single path component.
pub fn sanitize_for_filesystem(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if needs_encoding(c) {
            out.push(ESCAPE);
            out.push_str(&format!("{:X}", c as u32));
            out.push(ESCAPE);
        } else {
            out.push(c);
        }
    }
    out
}

/// Inverse of [`sanitize_for_filesystem`]. Malformed tokens are kept verbatim.
pub fn restore_original(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut rest = name;
    while let Some(start) = rest.find(ESCAPE) {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let decoded = after.find(ESCAPE).and_then(|end| {
            let hex = &after[..end];
            let valid = !hex.is_empty() && hex.len() <= 6 && hex.chars().all(|c| c.is_ascii_hexdigit());
            if !valid {
                return None;
            }
            u32::from_str_radix(hex, 16)
                .ok()
                .and_then(char::from_u32)
                .map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &after[end + 1..];
            }
            None => {
                out.push(ESCAPE);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode a folder name only if it is exactly what [`sanitize_for_filesystem`]
/// would produce; names written by other tools are returned as they are.
pub fn restore_if_encoded(name: &str) -> String {
    let restored = restore_original(name);
    if restored != name && sanitize_for_filesystem(&restored) == name {
        restored
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_untouched() {
        assert_eq!(sanitize_for_filesystem("Summer 2020"), "Summer 2020");
        assert_eq!(restore_original("Summer 2020"), "Summer 2020");
    }

    #[test]
    fn test_emoji_encoded() {
        let encoded = sanitize_for_filesystem("Beach 🏖️");
        assert_eq!(encoded, "Beach %1F3D6%%FE0F%");
        assert_eq!(restore_original(&encoded), "Beach 🏖️");
    }

    #[test]
    fn test_round_trip() {
        let names = [
            "👨‍👩‍👧‍👦 family",
            "🏳️‍🌈",
            "100% fun",
            "%41%",
            "a/b:c?",
            "tab\there",
            "%",
            "%%",
            "👍🏽 ok",
            "日本語のアルバム",
        ];
        for name in names {
            let encoded = sanitize_for_filesystem(name);
            assert!(!encoded.contains('/'));
            assert!(!encoded.contains('\u{200D}'));
            assert_eq!(restore_original(&encoded), name, "round trip of {:?}", name);
        }
    }

    #[test]
    fn test_only_own_encoding_is_decoded() {
        assert_eq!(restore_if_encoded("%1F3D6% Beach"), "🏖 Beach");
        assert_eq!(restore_if_encoded("Sale %20% off"), "Sale %20% off");
        assert_eq!(restore_if_encoded("%41%"), "%41%");
        assert_eq!(restore_if_encoded("50%"), "50%");
        assert_eq!(restore_if_encoded("Trip"), "Trip");
    }

    #[test]
    fn test_malformed_tokens_kept() {
        assert_eq!(restore_original("50%off"), "50%off");
        assert_eq!(restore_original("%ZZ%"), "%ZZ%");
    }
}
