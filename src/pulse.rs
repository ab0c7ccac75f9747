//! Generic mark/space pulse-train codec.
//!
//! Serializes a bit buffer as alternating IR carrier on/off durations and
//! matches raw captured durations back into bits, driven by a per-protocol
//! [`TimingProfile`]. Every protocol supplies its own timings and matching
//! tolerance; nothing in here is protocol specific.

use thiserror::Error;

/// Per-protocol pulse timings, in microseconds.
///
/// A zero header/footer component means that part of the frame is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingProfile {
    pub hdr_mark: u32,
    pub hdr_space: u32,
    pub bit_mark: u32,
    pub one_space: u32,
    pub zero_space: u32,
    pub footer_mark: u32,
    /// Inter-message gap following the footer mark.
    pub gap: u32,
    /// Receive matching tolerance, as a percentage of the expected duration.
    pub tolerance: u8,
    /// Fixed matching margin added on top of the percentage tolerance.
    pub margin: u32,
    /// Bit order within each transmitted unit.
    pub msb_first: bool,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFailure {
    #[error("not enough raw samples for the expected message")]
    InsufficientSamples,
    #[error("header mark/space did not match")]
    BadHeader,
    #[error("a data pulse pair matched neither a one nor a zero")]
    BadBitEncoding,
    #[error("footer mark or message gap did not match")]
    BadFooter,
    #[error("integrity check failed")]
    ChecksumMismatch,
}

impl TimingProfile {
    /// `|observed - expected| <= expected * tolerance% + margin`
    pub fn matches(&self, observed: u32, expected: u32) -> bool {
        let delta = (expected as u64 * self.tolerance as u64) / 100 + self.margin as u64;
        let diff = (observed as u64).abs_diff(expected as u64);
        diff <= delta
    }

    /// Matches "at least this long": used for trailing gaps, which are often
    /// cut short by the capture window.
    pub fn matches_at_least(&self, observed: u32, expected: u32) -> bool {
        let delta = (expected as u64 * self.tolerance as u64) / 100 + self.margin as u64;
        observed as u64 + delta >= expected as u64
    }
}

/// Appends the header mark/space pair, if the profile has one.
pub fn encode_header(profile: &TimingProfile, out: &mut Vec<u32>) {
    if profile.hdr_mark != 0 {
        out.push(profile.hdr_mark);
    }
    if profile.hdr_space != 0 {
        out.push(profile.hdr_space);
    }
}

/// Appends `nbits` of `data` as [bit mark, one/zero space] pairs.
pub fn encode_data(profile: &TimingProfile, data: u64, nbits: u8, out: &mut Vec<u32>) {
    for i in 0..nbits {
        let bit = if profile.msb_first {
            data >> (nbits - 1 - i) & 1
        } else {
            data >> i & 1
        };
        out.push(profile.bit_mark);
        out.push(if bit != 0 {
            profile.one_space
        } else {
            profile.zero_space
        });
    }
}

/// Appends the footer mark and inter-message gap, if the profile has them.
pub fn encode_footer(profile: &TimingProfile, out: &mut Vec<u32>) {
    if profile.footer_mark != 0 {
        out.push(profile.footer_mark);
    }
    if profile.gap != 0 {
        out.push(profile.gap);
    }
}

/// Encodes one complete frame from a single integer.
pub fn encode_bits(profile: &TimingProfile, data: u64, nbits: u8, out: &mut Vec<u32>) {
    encode_header(profile, out);
    encode_data(profile, data, nbits, out);
    encode_footer(profile, out);
}

/// Encodes one complete frame from a byte buffer, in buffer order.
pub fn encode_bytes(profile: &TimingProfile, data: &[u8], out: &mut Vec<u32>) {
    encode_header(profile, out);
    for &b in data {
        encode_data(profile, b as u64, 8, out);
    }
    encode_footer(profile, out);
}

/// Decodes `nbits` from `samples`, returning the value and the number of
/// samples consumed.
///
/// Malformed input is always a normal decode failure, never a panic. A
/// missing trailing gap is tolerated when the capture ends at the footer
/// mark (`atleast` selects minimum-gap matching for the final space).
pub fn decode_bits(
    profile: &TimingProfile,
    samples: &[u32],
    nbits: u8,
    atleast: bool,
) -> Result<(u64, usize), DecodeFailure> {
    // Cheap early rejection before any matching.
    let mut min_remaining = nbits as usize * 2;
    if profile.hdr_mark != 0 {
        min_remaining += 1;
    }
    if profile.hdr_space != 0 {
        min_remaining += 1;
    }
    if profile.footer_mark != 0 {
        min_remaining += 1;
    }
    if samples.len() < min_remaining {
        return Err(DecodeFailure::InsufficientSamples);
    }

    let mut offset = 0;
    if profile.hdr_mark != 0 {
        if !profile.matches(samples[offset], profile.hdr_mark) {
            return Err(DecodeFailure::BadHeader);
        }
        offset += 1;
    }
    if profile.hdr_space != 0 {
        if !profile.matches(samples[offset], profile.hdr_space) {
            return Err(DecodeFailure::BadHeader);
        }
        offset += 1;
    }

    let mut data = 0u64;
    for i in 0..nbits {
        let mark = samples[offset];
        let space = samples[offset + 1];
        if !profile.matches(mark, profile.bit_mark) {
            return Err(DecodeFailure::BadBitEncoding);
        }
        let bit = if profile.matches(space, profile.one_space) {
            1u64
        } else if profile.matches(space, profile.zero_space) {
            0u64
        } else {
            return Err(DecodeFailure::BadBitEncoding);
        };
        if profile.msb_first {
            data = data << 1 | bit;
        } else {
            data |= bit << i;
        }
        offset += 2;
    }

    if profile.footer_mark != 0 {
        if !profile.matches(samples[offset], profile.footer_mark) {
            return Err(DecodeFailure::BadFooter);
        }
        offset += 1;
    }
    // The gap may be truncated if this was the end of the capture.
    if profile.gap != 0 && offset < samples.len() {
        let ok = if atleast {
            profile.matches_at_least(samples[offset], profile.gap)
        } else {
            profile.matches(samples[offset], profile.gap)
        };
        if !ok {
            return Err(DecodeFailure::BadFooter);
        }
        offset += 1;
    }

    Ok((data, offset))
}

/// Decodes `out.len()` bytes from `samples`, header and footer included.
pub fn decode_bytes(
    profile: &TimingProfile,
    samples: &[u32],
    out: &mut [u8],
    atleast: bool,
) -> Result<usize, DecodeFailure> {
    let min_remaining = out.len() * 16
        + (profile.hdr_mark != 0) as usize
        + (profile.hdr_space != 0) as usize
        + (profile.footer_mark != 0) as usize;
    if samples.len() < min_remaining {
        return Err(DecodeFailure::InsufficientSamples);
    }

    // Header and data, without footer handling.
    let body = TimingProfile {
        footer_mark: 0,
        gap: 0,
        ..*profile
    };
    let mut offset = 0;
    let hdr = TimingProfile {
        hdr_mark: profile.hdr_mark,
        hdr_space: profile.hdr_space,
        ..body
    };
    let no_hdr = TimingProfile {
        hdr_mark: 0,
        hdr_space: 0,
        ..body
    };
    for (i, byte) in out.iter_mut().enumerate() {
        let p = if i == 0 { &hdr } else { &no_hdr };
        let (value, used) = decode_bits(p, &samples[offset..], 8, atleast)?;
        *byte = value as u8;
        offset += used;
    }

    // Footer.
    let tail = TimingProfile {
        hdr_mark: 0,
        hdr_space: 0,
        ..*profile
    };
    let (_, used) = decode_bits(&tail, &samples[offset..], 0, atleast)?;
    Ok(offset + used)
}
