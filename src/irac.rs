//! Vendor-neutral control layer.
//!
//! Callers describe what they want as a [`CommonState`]; this module picks
//! the vendor encoder, rewrites toggle-style settings relative to what the
//! device last heard, and hands the pulses to a [`Transport`]. The inverse
//! direction tries every known protocol on a capture.

use strum::IntoEnumIterator;

use crate::common::{CommonState, Protocol, SwingV};
use crate::pulse::DecodeFailure;
use crate::{coolix, haier, kelvinator, midea, mitsubishi_heavy, vestel};

/// Anything that can push a pulse sequence towards a device: an IR LED,
/// a Broadlink socket, a capture file.
pub trait Transport {
    type Error;

    /// Transmit one sequence of alternating mark/space durations (µs).
    fn transmit(&mut self, pulses: &[u32]) -> Result<(), Self::Error>;
}

/// One decoded vendor message, still in its native representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VendorState {
    Coolix(coolix::Packet),
    Haier(haier::HaierAc),
    Kelvinator(kelvinator::KelvinatorAc),
    Midea(midea::Packet),
    MitsubishiHeavy152(mitsubishi_heavy::MitsubishiHeavyAc),
    Vestel(vestel::VestelAc),
}

impl VendorState {
    pub fn protocol(&self) -> Protocol {
        match self {
            VendorState::Coolix(_) => Protocol::Coolix,
            VendorState::Haier(_) => Protocol::Haier,
            VendorState::Kelvinator(_) => Protocol::Kelvinator,
            VendorState::Midea(_) => Protocol::Midea,
            VendorState::MitsubishiHeavy152(_) => Protocol::MitsubishiHeavy152,
            VendorState::Vestel(_) => Protocol::Vestel,
        }
    }

    /// Maps to the common representation. `prev` resolves toggle-only
    /// messages for the protocols that have them.
    pub fn to_common(&self, prev: Option<&CommonState>) -> CommonState {
        match self {
            VendorState::Coolix(packet) => coolix::to_common(packet, prev),
            VendorState::Haier(ac) => ac.to_common(),
            VendorState::Kelvinator(ac) => kelvinator::to_common(ac),
            VendorState::Midea(packet) => midea::to_common(packet, prev),
            VendorState::MitsubishiHeavy152(ac) => mitsubishi_heavy::to_common(ac),
            VendorState::Vestel(ac) => vestel::to_common(ac),
        }
    }
}

/// Transmission count convention: total sends = repeat + 1.
pub fn default_repeat(protocol: Protocol) -> u8 {
    match protocol {
        Protocol::Coolix => 1,
        _ => 0,
    }
}

/// Builds the full pulse sequence for a (already reconciled) state.
pub fn encode(state: &CommonState, repeat: u8) -> Vec<u32> {
    match state.protocol {
        Protocol::Coolix => coolix::frames(&coolix::words_from_common(state), repeat),
        Protocol::Haier => haier::HaierAc::from_common(state).frames(repeat),
        Protocol::Kelvinator => kelvinator::frames(&kelvinator::from_common(state), repeat),
        Protocol::Midea => {
            let packet = midea::from_common(state);
            midea::frames(&packet, state.swingv != SwingV::Off, repeat)
        }
        Protocol::MitsubishiHeavy152 => {
            mitsubishi_heavy::frames(&mitsubishi_heavy::from_common(state), repeat)
        }
        Protocol::Vestel => vestel::frames(&vestel::from_common(state), repeat),
    }
}

/// Decodes a capture as one specific protocol.
pub fn decode_protocol(
    protocol: Protocol,
    samples: &[u32],
    strict: bool,
) -> Result<VendorState, DecodeFailure> {
    Ok(match protocol {
        Protocol::Coolix => VendorState::Coolix(coolix::decode(samples, strict)?),
        Protocol::Haier => VendorState::Haier(haier::HaierAc::decode(samples, strict)?),
        Protocol::Kelvinator => VendorState::Kelvinator(kelvinator::decode(samples, strict)?),
        Protocol::Midea => VendorState::Midea(midea::decode(samples, strict)?),
        Protocol::MitsubishiHeavy152 => {
            VendorState::MitsubishiHeavy152(mitsubishi_heavy::decode(samples, strict)?)
        }
        Protocol::Vestel => VendorState::Vestel(vestel::decode(samples, strict)?),
    })
}

// How far a failed attempt got before giving up.
fn progress(failure: DecodeFailure) -> u8 {
    match failure {
        DecodeFailure::InsufficientSamples => 0,
        DecodeFailure::BadHeader => 1,
        DecodeFailure::BadBitEncoding => 2,
        DecodeFailure::BadFooter => 3,
        DecodeFailure::ChecksumMismatch => 4,
    }
}

/// Tries every protocol and returns the first that accepts the capture.
///
/// On failure the reported error is from the attempt that got furthest,
/// so a structurally-matching frame with a bad checksum reports
/// [`DecodeFailure::ChecksumMismatch`] rather than a header mismatch.
pub fn detect(samples: &[u32], strict: bool) -> Result<VendorState, DecodeFailure> {
    let mut best = DecodeFailure::InsufficientSamples;
    // Coolix shares its tick timings with Midea and has the least
    // selective frame shape, so it goes last.
    let order = Protocol::iter()
        .filter(|&p| p != Protocol::Coolix)
        .chain([Protocol::Coolix]);
    for protocol in order {
        match decode_protocol(protocol, samples, strict) {
            Ok(state) => return Ok(state),
            Err(failure) => {
                if progress(failure) > progress(best) {
                    best = failure;
                }
            }
        }
    }
    Err(best)
}

/// Rewrites toggle-style settings relative to the state the device is
/// believed to be in. With no usable `prev` the desired state passes
/// through unchanged.
pub fn reconcile(desired: &CommonState, prev: Option<&CommonState>) -> CommonState {
    let mut result = *desired;
    let prev = match prev {
        Some(p) if p.protocol == desired.protocol && p.model == desired.model => p,
        _ => return result,
    };
    let swing_toggled = (desired.swingv == SwingV::Off) != (prev.swingv == SwingV::Off);
    match desired.protocol {
        Protocol::Coolix => {
            result.swingv = if swing_toggled {
                SwingV::Auto
            } else {
                SwingV::Off
            };
            result.turbo = desired.turbo != prev.turbo;
            result.light = desired.light != prev.light;
            result.clean = desired.clean != prev.clean;
            result.sleep = if (desired.sleep >= 0) != (prev.sleep >= 0) {
                0
            } else {
                -1
            };
        }
        Protocol::Midea => {
            result.swingv = if swing_toggled {
                SwingV::Auto
            } else {
                SwingV::Off
            };
        }
        _ => {}
    }
    result
}

/// Tracks one physical device across sends and receives.
///
/// Owns the last intended [`CommonState`], which is what toggle
/// reconciliation needs. After a send the intended state becomes the new
/// reference even when the transport reported a failure: the device may
/// well have heard the frames anyway.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceSession {
    prev: Option<CommonState>,
}

impl DeviceSession {
    pub fn new() -> Self {
        Self { prev: None }
    }

    /// Resume a session for a device whose state is already known.
    pub fn resuming(state: CommonState) -> Self {
        Self { prev: Some(state) }
    }

    pub fn prev(&self) -> Option<&CommonState> {
        self.prev.as_ref()
    }

    pub fn reconcile(&self, desired: &CommonState) -> CommonState {
        reconcile(desired, self.prev.as_ref())
    }

    /// Reconciles, encodes and transmits `desired`, then records it as
    /// the device's assumed state.
    pub fn send<T: Transport>(
        &mut self,
        transport: &mut T,
        desired: &CommonState,
    ) -> Result<(), T::Error> {
        let outgoing = self.reconcile(desired);
        let pulses = encode(&outgoing, default_repeat(outgoing.protocol));
        let result = transport.transmit(&pulses);
        self.prev = Some(*desired);
        result
    }

    /// Decodes a capture and folds it into the tracked state.
    pub fn receive(&mut self, samples: &[u32], strict: bool) -> Result<CommonState, DecodeFailure> {
        let vendor = detect(samples, strict)?;
        let common = vendor.to_common(self.prev.as_ref());
        self.prev = Some(common);
        Ok(common)
    }
}
