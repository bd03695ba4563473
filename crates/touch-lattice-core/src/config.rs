//! Configuration for the touch context and the stock gestures.
//!
//! All distances are authored in centimetres and converted to pixels with
//! the context's current dots-per-centimetre value at the moment they are
//! compared. All durations are milliseconds.
//!
//! # Example
//!
//! ```
//! use touch_lattice_core::config::TouchConfig;
//!
//! let config = TouchConfig::from_toml_str(r#"
//!     dots_per_centimeter = 160.0
//!
//!     [gestures.tap]
//!     number_of_taps_required = 2
//!     time_limit_ms = 400
//! "#).unwrap();
//!
//! assert_eq!(config.gestures.tap.number_of_taps_required, 2);
//! assert_eq!(config.gestures.long_press.time_to_press_ms, 1000);
//! ```

use std::ops::{BitOr, BitOrAssign};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ensure_non_negative, ensure_positive};

/// Default screen density: 96 DPI expressed in dots per centimetre.
pub const DEFAULT_DOTS_PER_CENTIMETER: f32 = 96.0 / 2.54;

/// Default number of taps a tap gesture needs.
pub const DEFAULT_NUMBER_OF_TAPS_REQUIRED: u32 = 1;

/// Default window in which released pointers are combined for a tap position.
pub const DEFAULT_COMBINE_POINTERS_INTERVAL_MS: u64 = 300;

/// Default hold time before a long press is recognized.
pub const DEFAULT_TIME_TO_PRESS_MS: u64 = 1000;

/// Default window over which flick movement is summed.
pub const DEFAULT_FLICK_TIME_MS: u64 = 100;

/// Default minimum flick length.
pub const DEFAULT_FLICK_MIN_DISTANCE_CM: f32 = 1.0;

/// Default movement before a flick counts as moving at all.
pub const DEFAULT_FLICK_MOVEMENT_THRESHOLD_CM: f32 = 0.5;

/// Default movement before a transform begins.
pub const DEFAULT_SCREEN_TRANSFORM_THRESHOLD_CM: f32 = 0.1;

/// Default minimum distance between the two points of a two-point transform.
pub const DEFAULT_MIN_SCREEN_POINTS_DISTANCE_CM: f32 = 0.5;

/// Convert centimetres to pixels.
#[inline]
pub fn cm_to_px(cm: f32, dots_per_centimeter: f32) -> f32 {
    cm * dots_per_centimeter
}

/// Which transform components a transform gesture reports.
///
/// These flags can be combined using bitwise OR operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformTypes(u8);

impl TransformTypes {
    /// Nothing.
    pub const NONE: TransformTypes = TransformTypes(0);
    /// Translation.
    pub const TRANSLATION: TransformTypes = TransformTypes(1 << 0);
    /// Rotation.
    pub const ROTATION: TransformTypes = TransformTypes(1 << 1);
    /// Scaling.
    pub const SCALING: TransformTypes = TransformTypes(1 << 2);
    /// All three.
    pub const ALL: TransformTypes =
        TransformTypes(Self::TRANSLATION.0 | Self::ROTATION.0 | Self::SCALING.0);

    /// Check if all bits of `types` are set.
    pub fn has(&self, types: TransformTypes) -> bool {
        (self.0 & types.0) == types.0
    }

    /// True if no component is set.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TransformTypes {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr for TransformTypes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        TransformTypes(self.0 | rhs.0)
    }
}

impl BitOrAssign for TransformTypes {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Direction a flick must go in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlickDirection {
    /// Any direction.
    #[default]
    Any,
    /// Only the horizontal component counts.
    Horizontal,
    /// Only the vertical component counts.
    Vertical,
}

/// Tap recognition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapConfig {
    /// Taps required before the gesture is recognized.
    pub number_of_taps_required: u32,
    /// Maximum time from the first press to recognition. `None` means no limit.
    pub time_limit_ms: Option<u64>,
    /// Maximum movement, and maximum distance between taps. `None` means no limit.
    pub distance_limit_cm: Option<f32>,
    /// Report the centroid of recently released pointers as the tap position.
    pub combine_pointers: bool,
    /// Window used by `combine_pointers`.
    pub combine_pointers_interval_ms: u64,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            number_of_taps_required: DEFAULT_NUMBER_OF_TAPS_REQUIRED,
            time_limit_ms: None,
            distance_limit_cm: None,
            combine_pointers: false,
            combine_pointers_interval_ms: DEFAULT_COMBINE_POINTERS_INTERVAL_MS,
        }
    }
}

impl TapConfig {
    /// The time limit as a duration.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }

    /// The distance limit in pixels, infinite when unset.
    pub fn distance_limit_px(&self, dots_per_centimeter: f32) -> f32 {
        self.distance_limit_cm
            .map_or(f32::INFINITY, |cm| cm_to_px(cm, dots_per_centimeter))
    }

    /// The combine window as a duration.
    pub fn combine_pointers_interval(&self) -> Duration {
        Duration::from_millis(self.combine_pointers_interval_ms)
    }

    /// Check the settings.
    pub fn validate(&self) -> Result<()> {
        if self.number_of_taps_required == 0 {
            return Err(Error::invalid_config(
                "TapConfig",
                "number_of_taps_required must be at least 1",
            ));
        }
        if self.time_limit_ms == Some(0) {
            return Err(Error::invalid_config(
                "TapConfig",
                "time_limit_ms must be positive",
            ));
        }
        if let Some(cm) = self.distance_limit_cm {
            ensure_non_negative("TapConfig", "distance_limit_cm", cm)?;
        }
        Ok(())
    }
}

/// Long press recognition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LongPressConfig {
    /// Hold time before recognition.
    pub time_to_press_ms: u64,
    /// Maximum movement while holding. `None` means no limit.
    pub distance_limit_cm: Option<f32>,
}

impl Default for LongPressConfig {
    fn default() -> Self {
        Self {
            time_to_press_ms: DEFAULT_TIME_TO_PRESS_MS,
            distance_limit_cm: None,
        }
    }
}

impl LongPressConfig {
    /// The hold time as a duration.
    pub fn time_to_press(&self) -> Duration {
        Duration::from_millis(self.time_to_press_ms)
    }

    /// The distance limit in pixels, infinite when unset.
    pub fn distance_limit_px(&self, dots_per_centimeter: f32) -> f32 {
        self.distance_limit_cm
            .map_or(f32::INFINITY, |cm| cm_to_px(cm, dots_per_centimeter))
    }

    /// Check the settings.
    pub fn validate(&self) -> Result<()> {
        if self.time_to_press_ms == 0 {
            return Err(Error::invalid_config(
                "LongPressConfig",
                "time_to_press_ms must be positive",
            ));
        }
        if let Some(cm) = self.distance_limit_cm {
            ensure_non_negative("LongPressConfig", "distance_limit_cm", cm)?;
        }
        Ok(())
    }
}

/// Flick recognition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlickConfig {
    /// Window before release over which movement is summed.
    pub flick_time_ms: u64,
    /// Minimum summed movement.
    pub min_distance_cm: f32,
    /// Movement needed before the pointer counts as moving.
    pub movement_threshold_cm: f32,
    /// Allowed direction.
    pub direction: FlickDirection,
}

impl Default for FlickConfig {
    fn default() -> Self {
        Self {
            flick_time_ms: DEFAULT_FLICK_TIME_MS,
            min_distance_cm: DEFAULT_FLICK_MIN_DISTANCE_CM,
            movement_threshold_cm: DEFAULT_FLICK_MOVEMENT_THRESHOLD_CM,
            direction: FlickDirection::Any,
        }
    }
}

impl FlickConfig {
    /// The flick window as a duration.
    pub fn flick_time(&self) -> Duration {
        Duration::from_millis(self.flick_time_ms)
    }

    /// Check the settings.
    pub fn validate(&self) -> Result<()> {
        if self.flick_time_ms == 0 {
            return Err(Error::invalid_config(
                "FlickConfig",
                "flick_time_ms must be positive",
            ));
        }
        ensure_positive("FlickConfig", "min_distance_cm", self.min_distance_cm)?;
        ensure_non_negative(
            "FlickConfig",
            "movement_threshold_cm",
            self.movement_threshold_cm,
        )
    }
}

/// Transform recognition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Components to report.
    pub types: TransformTypes,
    /// Movement before the gesture begins.
    pub screen_transform_threshold_cm: f32,
    /// Two points closer than this are treated as one.
    pub min_screen_points_distance_cm: f32,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            types: TransformTypes::ALL,
            screen_transform_threshold_cm: DEFAULT_SCREEN_TRANSFORM_THRESHOLD_CM,
            min_screen_points_distance_cm: DEFAULT_MIN_SCREEN_POINTS_DISTANCE_CM,
        }
    }
}

impl TransformConfig {
    /// Check the settings.
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative(
            "TransformConfig",
            "screen_transform_threshold_cm",
            self.screen_transform_threshold_cm,
        )?;
        ensure_non_negative(
            "TransformConfig",
            "min_screen_points_distance_cm",
            self.min_screen_points_distance_cm,
        )
    }
}

/// Default settings for each stock gesture.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureDefaults {
    /// Tap.
    pub tap: TapConfig,
    /// Long press.
    pub long_press: LongPressConfig,
    /// Flick.
    pub flick: FlickConfig,
    /// Transform, pan, rotate and scale.
    pub transform: TransformConfig,
}

/// Top-level configuration of a touch context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchConfig {
    /// Screen density used for every centimetre threshold.
    pub dots_per_centimeter: f32,
    /// Defaults handed to gestures created through the context.
    pub gestures: GestureDefaults,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            dots_per_centimeter: DEFAULT_DOTS_PER_CENTIMETER,
            gestures: GestureDefaults::default(),
        }
    }
}

impl TouchConfig {
    /// Create a config with the given density and default gesture settings.
    pub fn with_dots_per_centimeter(dots_per_centimeter: f32) -> Result<Self> {
        let config = Self {
            dots_per_centimeter,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every setting.
    pub fn validate(&self) -> Result<()> {
        ensure_positive(
            "TouchConfig",
            "dots_per_centimeter",
            self.dots_per_centimeter,
        )?;
        self.gestures.tap.validate()?;
        self.gestures.long_press.validate()?;
        self.gestures.flick.validate()?;
        self.gestures.transform.validate()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::config_parse("TOML", e))?;
        validated(config, "TOML")
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| Error::config_parse("JSON", e))?;
        validated(config, "JSON")
    }

    /// Load a TOML file.
    pub fn load_toml(path: impl AsRef<Path>) -> Result<Self> {
        let text = read_text(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Load a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let text = read_text(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Serialize to a TOML document.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config_parse("TOML", e))
    }
}

fn validated(config: TouchConfig, format: &str) -> Result<TouchConfig> {
    if let Err(error) = config.validate() {
        crate::touch_warn!(format, %error, "rejected configuration");
        return Err(error);
    }
    crate::touch_debug!(
        format,
        dots_per_centimeter = config.dots_per_centimeter,
        "configuration parsed"
    );
    Ok(config)
}

fn read_text(path: &Path) -> Result<String> {
    tracing::debug!(target: "touch_lattice_core::config", path = %path.display(), "loading configuration");
    std::fs::read_to_string(path).map_err(|e| Error::io(path, e))
}
