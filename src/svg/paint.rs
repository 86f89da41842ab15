//! Paint value helpers.

/// Swatches offered by the color picker
pub const COMMON_COLORS: [&str; 20] = [
    "#f44336", "#e91e63", "#9c27b0", "#673ab7", "#3f51b5", "#2196f3", "#03a9f4", "#00bcd4",
    "#009688", "#4caf50", "#8bc34a", "#cddc39", "#ffeb3b", "#ffc107", "#ff9800", "#ff5722",
    "#795548", "#607d8b", "#000000", "#ffffff",
];

/// Color shown in the picker when the element has no paint value
pub const DEFAULT_PICKER_COLOR: &str = "#000000";

pub const TRANSPARENT: &str = "transparent";

/// Whether a paint value is an actual visible color.
///
/// Absent values, `none` and `transparent` are not.
pub fn is_visible_color(color: Option<&str>) -> bool {
    match color.map(str::trim) {
        Some(c) => !c.is_empty() && !c.eq_ignore_ascii_case("none") && !c.eq_ignore_ascii_case(TRANSPARENT),
        None => false,
    }
}

/// Parse `#rgb` / `#rrggbb` (and the `a` variants, alpha ignored) into RGB bytes
pub fn parse_hex(color: &str) -> Option<[u8; 3]> {
    let hex = color.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 | 4 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().take(3).enumerate() {
                let v = channel(&c.to_string())?;
                rgb[i] = v * 17;
            }
            Some(rgb)
        }
        6 | 8 => Some([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        ]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_colors() {
        assert!(is_visible_color(Some("#ff0000")));
        assert!(!is_visible_color(Some("none")));
        assert!(!is_visible_color(Some("Transparent")));
        assert!(!is_visible_color(Some("  ")));
        assert!(!is_visible_color(None));
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#ff8000"), Some([255, 128, 0]));
        assert_eq!(parse_hex("#f80"), Some([255, 136, 0]));
        assert_eq!(parse_hex("#ff800080"), Some([255, 128, 0]));
        assert_eq!(parse_hex("red"), None);
        assert_eq!(parse_hex("#ggg"), None);
    }
}
