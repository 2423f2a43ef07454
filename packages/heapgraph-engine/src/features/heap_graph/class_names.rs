// JVM encoded class-name normalization
//
// Query text may name classes the way the capture format encodes them:
// `[I`, `[[Ljava.lang.String;`, or a raw numeric id. Lookup normalizes to
// the source form (`int[]`, `java.lang.String[][]`) first.

/// Normalize a JVM-encoded class name: strip array-dimension prefixes, map
/// single-letter primitive codes, re-append `[]` per dimension. Names with
/// no leading `[` pass through unchanged.
pub fn normalize_class_name(name: &str) -> String {
    let dimensions = name.bytes().take_while(|b| *b == b'[').count();
    if dimensions == 0 {
        return name.to_string();
    }
    let element = &name[dimensions..];
    let base = match element {
        "Z" => "boolean",
        "B" => "byte",
        "S" => "short",
        "C" => "char",
        "I" => "int",
        "J" => "long",
        "F" => "float",
        "D" => "double",
        _ => element
            .strip_prefix('L')
            .and_then(|rest| rest.strip_suffix(';'))
            .unwrap_or(element),
    };
    let mut normalized = String::with_capacity(base.len() + 2 * dimensions);
    normalized.push_str(base);
    for _ in 0..dimensions {
        normalized.push_str("[]");
    }
    normalized
}

/// Parse query text as a raw numeric id: decimal, or `0x`-prefixed hex.
pub fn parse_numeric_id(text: &str) -> Option<u64> {
    if let Some(hex) = text.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}
