//! Vendor-neutral A/C state: the interchange format between the per-vendor
//! protocol modules and anything driving them.

use serde::{Deserialize, Serialize};

/// The protocols this library can encode and decode.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Coolix,
    Haier,
    Kelvinator,
    Midea,
    #[strum(serialize = "mitsubishiheavy152", serialize = "mitsubishi_heavy_152")]
    #[serde(rename = "mitsubishiheavy152")]
    MitsubishiHeavy152,
    Vestel,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Off,
    #[strum(serialize = "auto", serialize = "heat_cool")]
    Auto,
    Cool,
    Heat,
    Dry,
    Fan,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum FanSpeed {
    Auto,
    #[strum(serialize = "min", serialize = "minimum")]
    Min,
    Low,
    #[strum(serialize = "medium", serialize = "med", serialize = "mid")]
    Medium,
    High,
    #[strum(serialize = "max", serialize = "maximum")]
    Max,
}

/// Vertical vane position. `Auto` means continuous swing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SwingV {
    Off,
    Auto,
    Highest,
    High,
    #[strum(serialize = "middlehigh", serialize = "middle_high")]
    #[serde(rename = "middlehigh")]
    MiddleHigh,
    Middle,
    #[strum(serialize = "middlelow", serialize = "middle_low")]
    #[serde(rename = "middlelow")]
    MiddleLow,
    Low,
    Lowest,
}

/// Horizontal vane position. `Auto` means continuous swing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SwingH {
    Off,
    Auto,
    #[strum(serialize = "leftmax", serialize = "left_max")]
    #[serde(rename = "leftmax")]
    LeftMax,
    Left,
    Middle,
    Right,
    #[strum(serialize = "rightmax", serialize = "right_max")]
    #[serde(rename = "rightmax")]
    RightMax,
    Wide,
}

/// One complete vendor-neutral command snapshot.
///
/// Settings a vendor does not support read back as the documented default
/// after a round trip: `false` for flags, `-1` for the minute counters,
/// `Off` for the swing positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommonState {
    pub protocol: Protocol,
    /// Vendor model discriminator, -1 when the vendor has a single model.
    #[serde(default = "minus_one")]
    pub model: i16,
    pub power: bool,
    pub mode: Mode,
    pub degrees: f32,
    #[serde(default = "default_true")]
    pub celsius: bool,
    pub fanspeed: FanSpeed,
    #[serde(default = "swingv_off")]
    pub swingv: SwingV,
    #[serde(default = "swingh_off")]
    pub swingh: SwingH,
    #[serde(default)]
    pub quiet: bool,
    #[serde(default)]
    pub turbo: bool,
    #[serde(default)]
    pub econo: bool,
    #[serde(default)]
    pub light: bool,
    #[serde(default)]
    pub filter: bool,
    #[serde(default)]
    pub clean: bool,
    #[serde(default)]
    pub beep: bool,
    /// Minutes of sleep mode, < 0 when off.
    #[serde(default = "minus_one")]
    pub sleep: i16,
    /// Minutes past midnight for the clock, < 0 when unset.
    #[serde(default = "minus_one")]
    pub clock: i16,
}

fn minus_one() -> i16 {
    -1
}

fn default_true() -> bool {
    true
}

fn swingv_off() -> SwingV {
    SwingV::Off
}

fn swingh_off() -> SwingH {
    SwingH::Off
}

impl CommonState {
    /// A powered-off 25C baseline for the given protocol.
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            model: -1,
            power: false,
            mode: Mode::Off,
            degrees: 25.0,
            celsius: true,
            fanspeed: FanSpeed::Auto,
            swingv: SwingV::Off,
            swingh: SwingH::Off,
            quiet: false,
            turbo: false,
            econo: false,
            light: false,
            filter: false,
            clean: false,
            beep: false,
            sleep: -1,
            clock: -1,
        }
    }

    /// The requested temperature in Celsius, whatever unit was asked for.
    pub fn degrees_celsius(&self) -> f32 {
        if self.celsius {
            self.degrees
        } else {
            fahrenheit_to_celsius(self.degrees)
        }
    }
}

pub fn fahrenheit_to_celsius(deg: f32) -> f32 {
    (deg - 32.0) / 1.8
}

pub fn celsius_to_fahrenheit(deg: f32) -> f32 {
    deg * 1.8 + 32.0
}
