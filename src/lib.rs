pub mod common;
pub mod coolix;
pub mod fields;
pub mod haier;
pub mod irac;
pub mod kelvinator;
pub mod midea;
pub mod mitsubishi_heavy;
pub mod pulse;
pub mod recording;
pub mod smartir;
pub mod vestel;

pub use common::{CommonState, FanSpeed, Mode, Protocol, SwingH, SwingV};
pub use irac::{DeviceSession, VendorState};
pub use recording::Recording;
