//! Community colors derived by hashing the label into HSL space.
//!
//! The mapping depends on nothing but the label, so there is no palette to
//! share and no collision tracking. Two labels may land on the same color.

const SATURATION: [f64; 3] = [0.35, 0.5, 0.65];
const LIGHTNESS: [f64; 3] = [0.35, 0.5, 0.65];

/// Lowercase `#rrggbb` color for a community label.
pub fn community_color(label: usize) -> String {
    let (r, g, b) = hsl_to_rgb(label_hsl(&label.to_string()));
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn label_hsl(key: &str) -> (f64, f64, f64) {
    let mut hash = crc32fast::hash(key.as_bytes());

    let hue = f64::from(hash % 359);
    hash /= 360;
    let saturation = SATURATION[(hash % 3) as usize];
    hash /= 3;
    let lightness = LIGHTNESS[(hash % 3) as usize];
    (hue, saturation, lightness)
}

fn hsl_to_rgb((h, s, l): (f64, f64, f64)) -> (u8, u8, u8) {
    let h = h / 360.0;
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    let channel = |t: f64| {
        let t = if t < 0.0 {
            t + 1.0
        } else if t > 1.0 {
            t - 1.0
        } else {
            t
        };
        let c = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * 6.0 * (2.0 / 3.0 - t)
        } else {
            p
        };
        // halves round to even
        (c * 255.0).round_ties_even().clamp(0.0, 255.0) as u8
    };

    (channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_for_a_label() {
        for label in [0, 1, 17, 4096] {
            assert_eq!(community_color(label), community_color(label));
        }
    }

    #[test]
    fn matches_atlas_palette() {
        let expected = ["#b587c5", "#6ce0bf", "#ac5356", "#2dd2ac", "#87c5c2"];
        for (label, color) in expected.iter().enumerate() {
            assert_eq!(community_color(label), *color, "label {label}");
        }
        assert_eq!(community_color(17), "#8cbf40");
        assert_eq!(community_color(39), "#51d22d");
    }

    #[test]
    fn hex_format() {
        let color = community_color(3);
        assert_eq!(color.len(), 7);
        assert!(color.starts_with('#'));
        assert!(color[1..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn small_labels_mostly_distinct() {
        let mut colors: Vec<String> = (0..32).map(community_color).collect();
        colors.sort();
        colors.dedup();
        assert!(colors.len() >= 28, "only {} distinct colors", colors.len());
    }

    #[test]
    fn hsl_primaries() {
        assert_eq!(hsl_to_rgb((0.0, 1.0, 0.5)), (255, 0, 0));
        assert_eq!(hsl_to_rgb((120.0, 1.0, 0.5)), (0, 255, 0));
        assert_eq!(hsl_to_rgb((240.0, 1.0, 0.5)), (0, 0, 255));
        assert_eq!(hsl_to_rgb((0.0, 0.0, 0.5)), (128, 128, 128));
    }
}
