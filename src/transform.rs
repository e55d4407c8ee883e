use regex::Regex;

/// Extracts the (x, y) translation from a CSS transform value.
///
/// Accepts `translate(..)` as produced by [`encode_translation`], plus the
/// `matrix(..)` and `matrix3d(..)` forms computed styles resolve to. The 2d
/// matrix carries the offsets in components 5 and 6, the 3d form in
/// components 13 and 14. Anything unreadable decodes to `(0.0, 0.0)`.
pub fn decode_translation(transform: &str) -> (f64, f64) {
    try_decode(transform).unwrap_or((0.0, 0.0))
}

fn try_decode(transform: &str) -> Option<(f64, f64)> {
    let value = transform.trim();
    if value.is_empty() || value == "none" {
        return None;
    }
    let pattern = Regex::new(r"^(matrix3d|matrix|translate)\s*\(([^)]*)\)").ok()?;
    let captures = pattern.captures(value)?;
    let name = captures.get(1)?.as_str();
    let components = captures
        .get(2)?
        .as_str()
        .split(',')
        .map(|part| part.trim().trim_end_matches("px").trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    match name {
        "translate" => Some((
            components.first().copied()?,
            components.get(1).copied().unwrap_or(0.0),
        )),
        name if name.contains("3d") => {
            Some((components.get(12).copied()?, components.get(13).copied()?))
        }
        _ => Some((components.get(4).copied()?, components.get(5).copied()?)),
    }
}

/// Full-precision translation, used for live feedback while a drag is in
/// progress.
pub fn encode_translation(x: f64, y: f64) -> String {
    format!("translate({x}px, {y}px)")
}

/// Two-decimal translation, used when committing a gesture's net effect.
pub fn encode_translation_rounded(x: f64, y: f64) -> String {
    format!("translate({x:.2}px, {y:.2}px)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_2d_matrix() {
        assert_eq!(decode_translation("matrix(1, 0, 0, 1, 42, -7)"), (42.0, -7.0));
    }

    #[test]
    fn test_decode_3d_matrix() {
        let value = "matrix3d(1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 8, 9, 0, 1)";
        assert_eq!(decode_translation(value), (8.0, 9.0));
    }

    #[test]
    fn test_decode_translate_with_units() {
        assert_eq!(decode_translation("translate(10px, -5px)"), (10.0, -5.0));
        assert_eq!(decode_translation("translate(3.5px)"), (3.5, 0.0));
    }

    #[test]
    fn test_unreadable_values_default_to_zero() {
        assert_eq!(decode_translation(""), (0.0, 0.0));
        assert_eq!(decode_translation("none"), (0.0, 0.0));
        assert_eq!(decode_translation("rotate(45deg)"), (0.0, 0.0));
        assert_eq!(decode_translation("matrix(1, 2)"), (0.0, 0.0));
        assert_eq!(decode_translation("matrix(1, 0, 0, 1, oops, 6)"), (0.0, 0.0));
    }

    #[test]
    fn test_round_trip_at_two_decimals() {
        let encoded = encode_translation_rounded(10.0, -5.0);
        assert_eq!(encoded, "translate(10.00px, -5.00px)");
        assert_eq!(decode_translation(&encoded), (10.0, -5.0));

        let encoded = encode_translation_rounded(1.23456, -0.987);
        assert_eq!(encoded, "translate(1.23px, -0.99px)");
        assert_eq!(decode_translation(&encoded), (1.23, -0.99));
    }

    #[test]
    fn test_live_encode_keeps_precision() {
        let encoded = encode_translation(1.25, -3.0);
        assert_eq!(encoded, "translate(1.25px, -3px)");
        assert_eq!(decode_translation(&encoded), (1.25, -3.0));
    }
}
