use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An 8-bit RGB colour. Used for drawing and, optionally, as the input to
/// the colour-affinity force.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

// Named colours accepted in config files besides hex notation.
const COLOUR_MAP: &[(&str, Rgb)] = &[
    ("black", Rgb::new(0, 0, 0)),
    ("white", Rgb::new(255, 255, 255)),
    ("red", Rgb::new(255, 0, 0)),
    ("green", Rgb::new(0, 255, 0)),
    ("blue", Rgb::new(0, 0, 255)),
    ("yellow", Rgb::new(255, 255, 0)),
    ("cyan", Rgb::new(0, 255, 255)),
    ("magenta", Rgb::new(255, 0, 255)),
];

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rgb`, `#rrggbb` or one of the named colours.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            if !hex.is_ascii() {
                anyhow::bail!("Invalid hex colour '{}'.", s);
            }
            let channel = |digits: &str| -> Result<u8> {
                u8::from_str_radix(digits, 16)
                    .map_err(|e| anyhow::anyhow!("Invalid hex colour '{}': {}", s, e))
            };
            return match hex.len() {
                3 => {
                    // #abc expands to #aabbcc
                    let r = channel(&hex[0..1])?;
                    let g = channel(&hex[1..2])?;
                    let b = channel(&hex[2..3])?;
                    Ok(Self::new(r * 17, g * 17, b * 17))
                }
                6 => Ok(Self::new(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
                _ => anyhow::bail!("Hex colour '{}' must have 3 or 6 digits.", s),
            };
        }
        for &(name, colour) in COLOUR_MAP {
            if name.eq_ignore_ascii_case(s) {
                return Ok(colour);
            }
        }
        anyhow::bail!("Colour '{}' not recognized.", s)
    }

    /// Each channel halved; the default border for a fill colour.
    pub fn halved(self) -> Self {
        Self::new(self.r / 2, self.g / 2, self.b / 2)
    }

    /// Euclidean distance between two colours in RGB space.
    pub fn distance(self, other: Rgb) -> f64 {
        let dr = self.r as f64 - other.r as f64;
        let dg = self.g as f64 - other.g as f64;
        let db = self.b as f64 - other.b as f64;
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Rgb {
    type Error = anyhow::Error;
    fn try_from(value: String) -> Result<Self> {
        Rgb::parse(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> String {
        value.to_string()
    }
}
