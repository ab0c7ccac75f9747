//! Bit-field accessors for fixed-layout device state buffers.
//!
//! Every protocol in this family stores its command snapshot either as a
//! small byte array or as a single wide integer, with named settings living
//! at fixed bit offsets. Offsets count from bit 0 = the least significant
//! bit of the addressed byte.

/// A named sub-field of a byte-array state buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub byte: usize,
    pub offset: u8,
    pub width: u8,
}

impl Field {
    pub const fn new(byte: usize, offset: u8, width: u8) -> Self {
        Self {
            byte,
            offset,
            width,
        }
    }

    pub fn get(&self, buf: &[u8]) -> u8 {
        get_bits8(buf[self.byte], self.offset, self.width)
    }

    pub fn set(&self, buf: &mut [u8], value: u8) {
        set_bits8(&mut buf[self.byte], self.offset, self.width, value);
    }
}

pub fn get_bits8(byte: u8, offset: u8, width: u8) -> u8 {
    (byte >> offset) & mask8(width)
}

/// Writes `value` (truncated to `width` bits) leaving the other bits alone.
pub fn set_bits8(byte: &mut u8, offset: u8, width: u8, value: u8) {
    let mask = mask8(width) << offset;
    *byte = (*byte & !mask) | ((value << offset) & mask);
}

pub fn get_bit8(byte: u8, offset: u8) -> bool {
    byte & (1 << offset) != 0
}

pub fn set_bit8(byte: &mut u8, offset: u8, on: bool) {
    if on {
        *byte |= 1 << offset;
    } else {
        *byte &= !(1 << offset);
    }
}

pub fn get_bits64(data: u64, offset: u8, width: u8) -> u64 {
    (data >> offset) & mask64(width)
}

pub fn set_bits64(data: &mut u64, offset: u8, width: u8, value: u64) {
    let mask = mask64(width) << offset;
    *data = (*data & !mask) | ((value << offset) & mask);
}

fn mask8(width: u8) -> u8 {
    if width >= 8 {
        u8::MAX
    } else {
        (1u8 << width) - 1
    }
}

fn mask64(width: u8) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Wrapping additive checksum over a byte range.
pub fn sum_bytes(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Number of set bits in the lowest `width` bits of `data`.
pub fn count_set_bits64(data: u64, width: u8) -> u8 {
    (data & mask64(width)).count_ones() as u8
}

/// Clamp a temperature request to a protocol's supported band.
pub fn clamp_temp(degrees: u8, min: u8, max: u8) -> u8 {
    degrees.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits8() {
        let mut b = 0b1100_1000u8;
        assert_eq!(get_bits8(b, 4, 4), 0b1100);
        assert_eq!(get_bits8(b, 2, 3), 0b010);
        set_bits8(&mut b, 0, 4, 0b0101);
        assert_eq!(b, 0b1100_1101);
        // Truncated to field width, neighbours untouched.
        set_bits8(&mut b, 2, 2, 0xFF);
        assert_eq!(b, 0b1100_1101);
    }

    #[test]
    fn test_bit8() {
        let mut b = 0u8;
        set_bit8(&mut b, 6, true);
        assert!(get_bit8(b, 6));
        set_bit8(&mut b, 6, false);
        assert_eq!(b, 0);
    }

    #[test]
    fn test_bits64() {
        let mut d = 0u64;
        set_bits64(&mut d, 44, 3, 0b100);
        assert_eq!(get_bits64(d, 44, 3), 0b100);
        assert_eq!(d, 0b100u64 << 44);
        set_bits64(&mut d, 44, 3, 0);
        assert_eq!(d, 0);
    }

    #[test]
    fn test_field_descriptor() {
        let mut buf = [0u8; 9];
        let temp = Field::new(1, 4, 4);
        temp.set(&mut buf, 9);
        assert_eq!(buf[1], 0x90);
        assert_eq!(temp.get(&buf), 9);
    }

    #[test]
    fn test_sum_bytes() {
        assert_eq!(sum_bytes(&[0xA5, 0x91, 0x20]), 0x56);
        assert_eq!(sum_bytes(&[0xFF, 0x01]), 0x00);
    }

    #[test]
    fn test_count_set_bits() {
        assert_eq!(count_set_bits64(0x0F00D9001F, 44), 14);
        assert_eq!(count_set_bits64(u64::MAX, 8), 8);
    }
}
