//! Panel color themes.
//!
//! A theme resolves to a primary color plus two accent shades derived by
//! lightening it in HSL space; the result is emitted as a CSS variable
//! block for exported documents and host styling.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Blue,
    Green,
    Purple,
    Warm,
    Dark,
    /// Uses the separately stored custom primary color.
    Custom,
}

impl Theme {
    /// The theme's primary color as a `#rrggbb` string.
    pub fn primary<'a>(&self, custom_primary: &'a str) -> &'a str {
        match self {
            Theme::Blue => "#3370ff",
            Theme::Green => "#2fb888",
            Theme::Purple => "#7f3bf5",
            Theme::Warm => "#ff8800",
            Theme::Dark => "#2b2f36",
            Theme::Custom => custom_primary,
        }
    }

    /// CSS variable block carrying the primary color and derived accents.
    pub fn css_variables(&self, custom_primary: &str) -> String {
        let primary = self.primary(custom_primary);
        let accent_1 = lighten_hex(primary, 0.08);
        let accent_2 = lighten_hex(primary, 0.28);
        format!(
            ":root {{\n  --cellmark-primary: {primary};\n  --cellmark-accent-1: {accent_1};\n  --cellmark-accent-2: {accent_2};\n}}"
        )
    }
}

/// Lighten a `#rrggbb` color by `amount` (0.0 to 1.0) in HSL space.
/// Unparseable input is returned unchanged.
pub fn lighten_hex(hex: &str, amount: f32) -> String {
    match parse_hex(hex) {
        Some((r, g, b)) => {
            let (h, s, l) = rgb_to_hsl(r, g, b);
            let (r, g, b) = hsl_to_rgb(h, s, (l + amount).clamp(0.0, 1.0));
            format!("#{r:02x}{g:02x}{b:02x}")
        }
        None => hex.to_string(),
    }
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
    let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
    let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
    Some((r, g, b))
}

fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = f32::from(r) / 255.0;
    let g = f32::from(g) / 255.0;
    let b = f32::from(b) / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (h / 6.0, s, l)
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (u8, u8, u8) {
    if s == 0.0 {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let to_channel = |t: f32| -> u8 {
        let mut t = t;
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        let v = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 1.0 / 2.0 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        };
        (v * 255.0).round().clamp(0.0, 255.0) as u8
    };

    (
        to_channel(h + 1.0 / 3.0),
        to_channel(h),
        to_channel(h - 1.0 / 3.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn lighten_moves_toward_white() {
        assert_eq!(lighten_hex("#000000", 0.5), "#808080");
        assert_eq!(lighten_hex("#808080", 1.0), "#ffffff");
    }

    #[test]
    fn lighten_zero_round_trips() {
        assert_eq!(lighten_hex("#2fb888", 0.0), "#2fb888");
    }

    #[rstest]
    #[case("not-a-color")]
    #[case("#12345")]
    #[case("#12345g")]
    fn unparseable_colors_pass_through(#[case] input: &str) {
        assert_eq!(lighten_hex(input, 0.2), input);
    }

    #[test]
    fn css_variables_carry_primary_and_accents() {
        let css = Theme::Green.css_variables("#ffffff");
        assert!(css.contains("--cellmark-primary: #2fb888;"));
        assert!(css.contains("--cellmark-accent-1: "));
        assert!(css.contains("--cellmark-accent-2: "));
    }

    #[test]
    fn custom_theme_uses_the_stored_primary() {
        let css = Theme::Custom.css_variables("#ff69b4");
        assert!(css.contains("--cellmark-primary: #ff69b4;"));
    }
}
