//! Kelvinator 128-bit protocol.
//!
//! The 16-byte state is two 8-byte blocks, each transmitted as a header
//! plus four bytes, a 3-bit block marker, then the remaining four bytes.
//! Bytes 0-2 are mirrored into bytes 8-10, and each block carries a
//! 4-bit nibble-sum checksum in the top of its last byte.

use crate::common::{CommonState, FanSpeed, Mode, Protocol, SwingH, SwingV};
use crate::fields::{get_bit8, get_bits8, set_bit8, set_bits8};
use crate::pulse::{self, DecodeFailure, TimingProfile};

pub const STATE_LENGTH: usize = 16;
pub const BLOCK_LENGTH: usize = 8;

pub const MODE_AUTO: u8 = 0;
pub const MODE_COOL: u8 = 1;
pub const MODE_DRY: u8 = 2;
pub const MODE_FAN: u8 = 3;
pub const MODE_HEAT: u8 = 4;

pub const FAN_AUTO: u8 = 0;
pub const FAN_MIN: u8 = 1;
pub const FAN_MAX: u8 = 5;
const BASIC_FAN_MAX: u8 = 3;

pub const MIN_TEMP: u8 = 16;
pub const MAX_TEMP: u8 = 30;
pub const AUTO_TEMP: u8 = 25;

const CHECKSUM_START: u8 = 10;

/// 3-bit marker between the halves of a block.
const BLOCK_FOOTER: u64 = 0b010;
const BLOCK_FOOTER_BITS: u8 = 3;

const TICK: u32 = 85;
const GAP: u32 = 235 * TICK;

pub const TIMING: TimingProfile = TimingProfile {
    hdr_mark: 106 * TICK,
    hdr_space: 53 * TICK,
    bit_mark: 8 * TICK,
    one_space: 18 * TICK,
    zero_space: 6 * TICK,
    footer_mark: 8 * TICK,
    gap: GAP,
    tolerance: 25,
    margin: 50,
    msb_first: false,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KelvinatorAc {
    state: [u8; STATE_LENGTH],
}

impl KelvinatorAc {
    pub fn new() -> Self {
        let mut state = [0u8; STATE_LENGTH];
        state[3] = 0x50;
        state[11] = 0x70;
        Self { state }
    }

    /// The state with per-block checksums and mode constraints applied.
    pub fn raw(&self) -> [u8; STATE_LENGTH] {
        let mut out = *self;
        // X-Fan only exists in Cool and Dry.
        if out.mode() != MODE_COOL && out.mode() != MODE_DRY {
            out.set_xfan(false);
        }
        out.apply_checksum();
        out.state
    }

    pub fn set_raw(&mut self, state: &[u8; STATE_LENGTH]) {
        self.state = *state;
    }

    fn mirror_block1(&mut self) {
        self.state[8] = self.state[0];
        self.state[9] = self.state[1];
        self.state[10] = self.state[2];
    }

    pub fn set_power(&mut self, on: bool) {
        set_bit8(&mut self.state[0], 3, on);
        self.mirror_block1();
    }

    pub fn power(&self) -> bool {
        get_bit8(self.state[0], 3)
    }

    pub fn set_temp(&mut self, degrees: u8) {
        let degrees = degrees.clamp(MIN_TEMP, MAX_TEMP);
        set_bits8(&mut self.state[1], 0, 4, degrees - MIN_TEMP);
        self.mirror_block1();
    }

    pub fn temp(&self) -> u8 {
        get_bits8(self.state[1], 0, 4) + MIN_TEMP
    }

    /// 0 is auto, 1-5 a fixed speed. Changing the speed drops Turbo.
    pub fn set_fan(&mut self, speed: u8) {
        let speed = speed.min(FAN_MAX);
        if speed == self.fan() {
            return;
        }
        set_bits8(&mut self.state[0], 4, 2, speed.min(BASIC_FAN_MAX));
        set_bits8(&mut self.state[14], 4, 3, speed);
        self.mirror_block1();
        self.set_turbo(false);
    }

    pub fn fan(&self) -> u8 {
        get_bits8(self.state[14], 4, 3)
    }

    pub fn set_mode(&mut self, mode: u8) {
        let mode = match mode {
            MODE_COOL | MODE_DRY | MODE_FAN | MODE_HEAT => mode,
            _ => MODE_AUTO,
        };
        if mode == MODE_AUTO || mode == MODE_DRY {
            // The remote pins these modes at 25C.
            self.set_temp(AUTO_TEMP);
        }
        set_bits8(&mut self.state[0], 0, 3, mode);
        self.mirror_block1();
    }

    pub fn mode(&self) -> u8 {
        get_bits8(self.state[0], 0, 3)
    }

    fn update_vent_swing(&mut self) {
        let any = self.swing_vertical() || self.swing_horizontal();
        set_bit8(&mut self.state[0], 6, any);
        self.mirror_block1();
    }

    pub fn set_swing_vertical(&mut self, on: bool) {
        set_bit8(&mut self.state[4], 0, on);
        self.update_vent_swing();
    }

    pub fn swing_vertical(&self) -> bool {
        get_bit8(self.state[4], 0)
    }

    pub fn set_swing_horizontal(&mut self, on: bool) {
        set_bit8(&mut self.state[4], 4, on);
        self.update_vent_swing();
    }

    pub fn swing_horizontal(&self) -> bool {
        get_bit8(self.state[4], 4)
    }

    pub fn set_quiet(&mut self, on: bool) {
        set_bit8(&mut self.state[12], 7, on);
    }

    pub fn quiet(&self) -> bool {
        get_bit8(self.state[12], 7)
    }

    pub fn set_ion_filter(&mut self, on: bool) {
        set_bit8(&mut self.state[2], 6, on);
        self.mirror_block1();
    }

    pub fn ion_filter(&self) -> bool {
        get_bit8(self.state[2], 6)
    }

    pub fn set_light(&mut self, on: bool) {
        set_bit8(&mut self.state[2], 5, on);
        self.mirror_block1();
    }

    pub fn light(&self) -> bool {
        get_bit8(self.state[2], 5)
    }

    /// Fan keeps running after power off to dry the coil.
    pub fn set_xfan(&mut self, on: bool) {
        set_bit8(&mut self.state[2], 7, on);
        self.mirror_block1();
    }

    pub fn xfan(&self) -> bool {
        get_bit8(self.state[2], 7)
    }

    pub fn set_turbo(&mut self, on: bool) {
        set_bit8(&mut self.state[2], 4, on);
        self.mirror_block1();
    }

    pub fn turbo(&self) -> bool {
        get_bit8(self.state[2], 4)
    }

    fn apply_checksum(&mut self) {
        for block in self.state.chunks_exact_mut(BLOCK_LENGTH) {
            let sum = calc_block_checksum(block);
            set_bits8(&mut block[7], 4, 4, sum);
        }
    }
}

impl Default for KelvinatorAc {
    fn default() -> Self {
        Self::new()
    }
}

/// Low nibbles of the first four bytes plus high nibbles of the next
/// three, seeded with 10, truncated to a nibble.
pub fn calc_block_checksum(block: &[u8]) -> u8 {
    let mut sum = CHECKSUM_START;
    for b in &block[0..4] {
        sum = sum.wrapping_add(b & 0xF);
    }
    for b in &block[4..7] {
        sum = sum.wrapping_add(b >> 4);
    }
    sum & 0xF
}

pub fn valid_checksum(state: &[u8; STATE_LENGTH]) -> bool {
    state
        .chunks_exact(BLOCK_LENGTH)
        .all(|block| get_bits8(block[7], 4, 4) == calc_block_checksum(block))
}

const SECTION_HEAD: TimingProfile = TimingProfile {
    footer_mark: 0,
    gap: 0,
    ..TIMING
};

const SECTION_MARKER: TimingProfile = TimingProfile {
    hdr_mark: 0,
    hdr_space: 0,
    ..TIMING
};

const SECTION_TAIL: TimingProfile = TimingProfile {
    hdr_mark: 0,
    hdr_space: 0,
    gap: GAP * 2,
    ..TIMING
};

fn encode_block(block: &[u8], out: &mut Vec<u32>) {
    pulse::encode_bytes(&SECTION_HEAD, &block[0..4], out);
    pulse::encode_bits(&SECTION_MARKER, BLOCK_FOOTER, BLOCK_FOOTER_BITS, out);
    pulse::encode_bytes(&SECTION_TAIL, &block[4..8], out);
}

pub fn frames(ac: &KelvinatorAc, repeat: u8) -> Vec<u32> {
    let state = ac.raw();
    let mut pulses = Vec::new();
    for _ in 0..=repeat {
        for block in state.chunks_exact(BLOCK_LENGTH) {
            encode_block(block, &mut pulses);
        }
    }
    pulses
}

fn decode_block(samples: &[u32], block: &mut [u8]) -> Result<usize, DecodeFailure> {
    let mut offset = pulse::decode_bytes(&SECTION_HEAD, samples, &mut block[0..4], false)?;
    let (marker, used) = pulse::decode_bits(
        &SECTION_MARKER,
        &samples[offset..],
        BLOCK_FOOTER_BITS,
        false,
    )?;
    if marker != BLOCK_FOOTER {
        return Err(DecodeFailure::BadFooter);
    }
    offset += used;
    offset += pulse::decode_bytes(&SECTION_TAIL, &samples[offset..], &mut block[4..8], true)?;
    Ok(offset)
}

pub fn decode(samples: &[u32], strict: bool) -> Result<KelvinatorAc, DecodeFailure> {
    let mut state = [0u8; STATE_LENGTH];
    let mut offset = 0;
    for block in state.chunks_exact_mut(BLOCK_LENGTH) {
        offset += decode_block(&samples[offset..], block)?;
    }
    if strict && !valid_checksum(&state) {
        return Err(DecodeFailure::ChecksumMismatch);
    }
    let mut ac = KelvinatorAc::new();
    ac.set_raw(&state);
    Ok(ac)
}

pub fn from_common(common: &CommonState) -> KelvinatorAc {
    let mut ac = KelvinatorAc::new();
    ac.set_power(common.power);
    ac.set_mode(match common.mode {
        Mode::Cool => MODE_COOL,
        Mode::Heat => MODE_HEAT,
        Mode::Dry => MODE_DRY,
        Mode::Fan => MODE_FAN,
        _ => MODE_AUTO,
    });
    ac.set_temp(common.degrees_celsius().round() as u8);
    ac.set_fan(match common.fanspeed {
        FanSpeed::Auto => FAN_AUTO,
        FanSpeed::Min => 1,
        FanSpeed::Low => 2,
        FanSpeed::Medium => 3,
        FanSpeed::High => 4,
        FanSpeed::Max => 5,
    });
    ac.set_swing_vertical(common.swingv != SwingV::Off);
    ac.set_swing_horizontal(common.swingh != SwingH::Off);
    ac.set_quiet(common.quiet);
    ac.set_turbo(common.turbo);
    ac.set_light(common.light);
    ac.set_ion_filter(common.filter);
    ac.set_xfan(common.clean);
    ac
}

pub fn to_common(ac: &KelvinatorAc) -> CommonState {
    let mut result = CommonState::new(Protocol::Kelvinator);
    result.power = ac.power();
    result.mode = match ac.mode() {
        MODE_COOL => Mode::Cool,
        MODE_HEAT => Mode::Heat,
        MODE_DRY => Mode::Dry,
        MODE_FAN => Mode::Fan,
        _ => Mode::Auto,
    };
    result.degrees = ac.temp() as f32;
    result.fanspeed = match ac.fan() {
        1 => FanSpeed::Min,
        2 => FanSpeed::Low,
        3 => FanSpeed::Medium,
        4 => FanSpeed::High,
        5 => FanSpeed::Max,
        _ => FanSpeed::Auto,
    };
    result.swingv = if ac.swing_vertical() {
        SwingV::Auto
    } else {
        SwingV::Off
    };
    result.swingh = if ac.swing_horizontal() {
        SwingH::Auto
    } else {
        SwingH::Off
    };
    result.quiet = ac.quiet();
    result.turbo = ac.turbo();
    result.light = ac.light();
    result.filter = ac.ion_filter();
    result.clean = ac.xfan();
    result
}
