//! SmartIR (https://github.com/smartHomeHub/SmartIR) code file export:
//! one base64 Broadlink command for every mode x fan x temperature the
//! protocol supports, plus the off command.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::{
    common::{CommonState, FanSpeed, Mode, Protocol},
    irac,
    recording::{self, Format, Recording},
};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CodeFile {
    pub manufacturer: String,
    pub supported_models: Vec<String>,
    pub supported_controller: String,
    pub commands_encoding: String,
    pub min_temperature: f32,
    pub max_temperature: f32,
    pub precision: u8,
    pub operation_modes: Vec<String>,
    pub fan_modes: Vec<String>,
    pub commands: serde_json::Value,
}

fn manufacturer(protocol: Protocol) -> &'static str {
    match protocol {
        Protocol::Coolix => "Midea",
        Protocol::Haier => "Haier",
        Protocol::Kelvinator => "Kelvinator",
        Protocol::Midea => "Midea",
        Protocol::MitsubishiHeavy152 => "Mitsubishi Heavy Industries",
        Protocol::Vestel => "Vestel",
    }
}

fn temp_range(protocol: Protocol) -> (u8, u8) {
    match protocol {
        Protocol::Coolix => (17, 30),
        Protocol::Haier => (16, 30),
        Protocol::Kelvinator => (16, 30),
        Protocol::Midea => (17, 30),
        Protocol::MitsubishiHeavy152 => (17, 31),
        Protocol::Vestel => (18, 30),
    }
}

/// The fan positions every supported vendor can express directly.
const FAN_MODES: [FanSpeed; 4] = [
    FanSpeed::Auto,
    FanSpeed::Low,
    FanSpeed::Medium,
    FanSpeed::High,
];

/// Builds the full SmartIR code file for one protocol.
pub fn gen_smartir(protocol: Protocol) -> anyhow::Result<CodeFile> {
    let (min_temp, max_temp) = temp_range(protocol);

    // Commands are nested mode -> fan -> temperature; fan-only mode has no
    // temperature level, matching the files shipped with SmartIR itself.
    let mut all_commands = serde_json::Map::new();

    for mode in Mode::iter().filter(|&m| m != Mode::Off) {
        let mode_map = all_commands
            .entry(smartir_mode(mode))
            .or_insert(serde_json::Map::new().into());
        let mode_map = mode_map
            .as_object_mut()
            .ok_or_else(|| anyhow::anyhow!("command tree corrupted"))?;

        for fan in FAN_MODES {
            let mut state = CommonState::new(protocol);
            state.power = true;
            state.mode = mode;
            state.fanspeed = fan;

            match mode {
                Mode::Fan => {
                    state.degrees = min_temp as f32;
                    mode_map.insert(fan.to_string(), encode_state(&state)?.into());
                }
                _ => {
                    let fan_map = mode_map
                        .entry(fan.to_string())
                        .or_insert(serde_json::Map::new().into());
                    let fan_map = fan_map
                        .as_object_mut()
                        .ok_or_else(|| anyhow::anyhow!("command tree corrupted"))?;

                    for temperature in min_temp..=max_temp {
                        state.degrees = temperature as f32;
                        fan_map.insert(temperature.to_string(), encode_state(&state)?.into());
                    }
                }
            }
        }
    }

    let off_state = CommonState::new(protocol);
    all_commands.insert("off".into(), encode_state(&off_state)?.into());

    Ok(CodeFile {
        manufacturer: manufacturer(protocol).into(),
        supported_models: vec![protocol.to_string()],
        supported_controller: "Broadlink".into(),
        commands_encoding: "Base64".into(),
        min_temperature: min_temp as f32,
        max_temperature: max_temp as f32,
        precision: 1,
        operation_modes: Mode::iter()
            .filter(|&m| m != Mode::Off)
            .map(smartir_mode)
            .collect(),
        fan_modes: FAN_MODES.iter().map(|f| f.to_string()).collect(),
        commands: all_commands.into(),
    })
}

// SmartIR spells our Auto mode "heat_cool".
fn smartir_mode(mode: Mode) -> String {
    match mode {
        Mode::Auto => "heat_cool".into(),
        other => other.to_string(),
    }
}

fn encode_state(state: &CommonState) -> anyhow::Result<String> {
    let pulses = irac::encode(state, irac::default_repeat(state.protocol));
    let recording = Recording::from_pulses(&pulses);
    Ok(recording::serialize(Format::Base64, &recording))
}
