use serde::{Deserialize, Serialize};

/// Opacity at or above which a material renders opaque
pub const OPAQUE_THRESHOLD: f32 = 1.0;

/// Opacity below which fragments under `LOW_OPACITY_ALPHA_TEST` are discarded
pub const LOW_OPACITY_THRESHOLD: f32 = 0.5;

/// Alpha-test cutoff applied to low-opacity materials
pub const LOW_OPACITY_ALPHA_TEST: f32 = 0.1;

/// Error returned when a hex colour string cannot be parsed
#[derive(Debug, Clone, PartialEq)]
pub struct ColorParseError(pub String);

impl std::fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid colour '{}': expected #rrggbb or #rgb", self.0)
    }
}

impl std::error::Error for ColorParseError {}

/// sRGB colour, serialized as a `#rrggbb` hex string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or `#rgb` (leading `#` optional)
    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let digits = hex.trim().trim_start_matches('#');
        let err = || ColorParseError(hex.to_string());

        let nibbles = digits
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(err)?;

        let channel = |hi: u8, lo: u8| (hi << 4) | lo;
        match nibbles.as_slice() {
            [r, g, b] => Ok(Self::rgb(channel(*r, *r), channel(*g, *g), channel(*b, *b))),
            [r1, r0, g1, g0, b1, b0] => Ok(Self::rgb(
                channel(*r1, *r0),
                channel(*g1, *g0),
                channel(*b1, *b0),
            )),
            _ => Err(err()),
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Channels as sRGB floats in [0, 1]
    pub fn to_srgb_f32(&self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }

    /// Channels converted to linear light (glTF base colour space)
    pub fn to_linear_f32(&self) -> [f32; 3] {
        self.to_srgb_f32().map(srgb_to_linear)
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// How the renderer composites a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransparencyMode {
    #[default]
    Opaque,
    /// Alpha blending with back faces visible
    Blended,
}

impl TransparencyMode {
    pub fn for_opacity(opacity: f32) -> Self {
        if opacity >= OPAQUE_THRESHOLD {
            TransparencyMode::Opaque
        } else {
            TransparencyMode::Blended
        }
    }
}

/// Surface shading parameters shared by every mesh of a model.
///
/// The transparency mode is not stored: it is always derived from
/// `opacity`, so the two can never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialSpec {
    pub color: Color,
    pub metalness: f32,
    pub roughness: f32,
    pub opacity: f32,
}

impl MaterialSpec {
    pub fn transparency_mode(&self) -> TransparencyMode {
        TransparencyMode::for_opacity(self.opacity)
    }

    /// Alpha-test cutoff for this opacity (0 disables the test)
    pub fn alpha_test(&self) -> f32 {
        if self.opacity < LOW_OPACITY_THRESHOLD {
            LOW_OPACITY_ALPHA_TEST
        } else {
            0.0
        }
    }
}

impl Default for MaterialSpec {
    fn default() -> Self {
        let preset = MaterialPreset::default();
        Self {
            color: preset.color(),
            metalness: preset.metalness(),
            roughness: preset.roughness(),
            opacity: 1.0,
        }
    }
}

/// Named material shortcut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialPreset {
    #[default]
    Chrome,
    Gold,
    Copper,
    Steel,
    Bronze,
}

impl MaterialPreset {
    pub fn metalness(&self) -> f32 {
        match self {
            MaterialPreset::Chrome => 0.9,
            MaterialPreset::Gold => 0.8,
            MaterialPreset::Copper => 0.7,
            MaterialPreset::Steel => 0.6,
            MaterialPreset::Bronze => 0.5,
        }
    }

    pub fn roughness(&self) -> f32 {
        match self {
            MaterialPreset::Chrome => 0.1,
            MaterialPreset::Gold => 0.2,
            MaterialPreset::Copper => 0.3,
            MaterialPreset::Steel => 0.4,
            MaterialPreset::Bronze => 0.5,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            MaterialPreset::Chrome => Color::rgb(0xff, 0xff, 0xff),
            MaterialPreset::Gold => Color::rgb(0xff, 0xd7, 0x00),
            MaterialPreset::Copper => Color::rgb(0xb8, 0x73, 0x33),
            MaterialPreset::Steel => Color::rgb(0xc0, 0xc0, 0xc0),
            MaterialPreset::Bronze => Color::rgb(0xcd, 0x7f, 0x32),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MaterialPreset::Chrome => "chrome",
            MaterialPreset::Gold => "gold",
            MaterialPreset::Copper => "copper",
            MaterialPreset::Steel => "steel",
            MaterialPreset::Bronze => "bronze",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(name.trim()))
    }

    /// All presets in display order
    pub fn all() -> &'static [MaterialPreset] {
        &[
            MaterialPreset::Chrome,
            MaterialPreset::Gold,
            MaterialPreset::Copper,
            MaterialPreset::Steel,
            MaterialPreset::Bronze,
        ]
    }
}
