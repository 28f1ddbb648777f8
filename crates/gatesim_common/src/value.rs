//! Two-state signal values: single bits and packed fixed-width buses.
//!
//! Every net and port in the simulator carries a [`Value`]. Scalars and buses
//! convert into each other only through the explicit, total operations on
//! [`Value`]: a scalar widened to a bus is broadcast to every bit, and a bus
//! narrowed to a scalar reads its last (most significant) element.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

/// Widest bus a single [`BusValue`] can hold.
pub const MAX_BUS_WIDTH: u32 = 64;

/// A fixed-width vector of booleans packed into a single word.
///
/// Bit 0 is the least significant element. Widths are clamped to
/// `1..=MAX_BUS_WIDTH`; bits above the width are always zero.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawBus")]
pub struct BusValue {
    width: u32,
    data: u64,
}

/// Unchecked wire form of a [`BusValue`], clamped on conversion.
#[derive(Deserialize)]
struct RawBus {
    width: u32,
    data: u64,
}

impl From<RawBus> for BusValue {
    fn from(raw: RawBus) -> Self {
        BusValue::from_u64(raw.data, raw.width)
    }
}

impl BusValue {
    /// Creates an all-false bus of the given width.
    pub fn new(width: u32) -> Self {
        Self {
            width: clamp_width(width),
            data: 0,
        }
    }

    /// Creates a bus with every bit set to `bit`.
    pub fn splat(width: u32, bit: bool) -> Self {
        let width = clamp_width(width);
        Self {
            width,
            data: if bit { mask(width) } else { 0 },
        }
    }

    /// Creates a bus from the low `width` bits of `value`.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let width = clamp_width(width);
        Self {
            width,
            data: value & mask(width),
        }
    }

    /// Creates a bus from a slice of booleans, index 0 being the LSB.
    pub fn from_bits(bits: &[bool]) -> Self {
        let mut v = Self::new(bits.len() as u32);
        for (i, &b) in bits.iter().take(MAX_BUS_WIDTH as usize).enumerate() {
            v.set(i as u32, b);
        }
        v
    }

    /// Returns the number of elements in this bus.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the bit at `index`; indices past the width read as `false`.
    pub fn get(&self, index: u32) -> bool {
        index < self.width && (self.data >> index) & 1 != 0
    }

    /// Sets the bit at `index`. Writes past the width are ignored.
    pub fn set(&mut self, index: u32, bit: bool) {
        if index >= self.width {
            return;
        }
        if bit {
            self.data |= 1 << index;
        } else {
            self.data &= !(1 << index);
        }
    }

    /// Returns the packed bits as an integer.
    pub fn to_u64(&self) -> u64 {
        self.data
    }

    /// Returns the last (most significant) element.
    pub fn last(&self) -> bool {
        self.width.checked_sub(1).is_some_and(|i| self.get(i))
    }

    /// Returns true if no bit is set.
    pub fn is_all_zero(&self) -> bool {
        self.data == 0
    }

    /// Iterates the bits from LSB to MSB.
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.width).map(move |i| self.get(i))
    }

    /// Returns a copy truncated or zero-extended to `width`.
    pub fn resized(&self, width: u32) -> Self {
        Self::from_u64(self.data, width)
    }

    /// Returns `width` bits starting at `offset`, zero-filled past the end.
    pub fn slice(&self, offset: u32, width: u32) -> Self {
        let shifted = if offset >= MAX_BUS_WIDTH {
            0
        } else {
            self.data >> offset
        };
        Self::from_u64(shifted, width)
    }

    /// Concatenates `self` (low half) with `high` into one wider bus.
    pub fn concat(&self, high: &BusValue) -> Self {
        let width = self.width + high.width;
        let high_bits = if self.width >= MAX_BUS_WIDTH {
            0
        } else {
            high.data << self.width
        };
        Self::from_u64(self.data | high_bits, width)
    }

    /// Parses a binary string such as `"1010"`; the leftmost digit is the MSB.
    ///
    /// Underscores are accepted as separators. Returns `None` on any other
    /// character or an empty string.
    pub fn from_binary_str(s: &str) -> Option<Self> {
        let digits: Vec<char> = s.chars().filter(|c| *c != '_').collect();
        if digits.is_empty() || digits.len() > MAX_BUS_WIDTH as usize {
            return None;
        }
        let mut v = Self::new(digits.len() as u32);
        for (i, c) in digits.iter().rev().enumerate() {
            match c {
                '0' => {}
                '1' => v.set(i as u32, true),
                _ => return None,
            }
        }
        Some(v)
    }
}

impl fmt::Display for BusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            write!(f, "{}", if self.get(i) { '1' } else { '0' })?;
        }
        Ok(())
    }
}

impl fmt::Debug for BusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BusValue({self})")
    }
}

impl BitOr for BusValue {
    type Output = BusValue;

    fn bitor(self, rhs: Self) -> BusValue {
        assert_eq!(self.width, rhs.width, "BusValue width mismatch in OR");
        BusValue {
            width: self.width,
            data: self.data | rhs.data,
        }
    }
}

impl BitAnd for BusValue {
    type Output = BusValue;

    fn bitand(self, rhs: Self) -> BusValue {
        assert_eq!(self.width, rhs.width, "BusValue width mismatch in AND");
        BusValue {
            width: self.width,
            data: self.data & rhs.data,
        }
    }
}

impl Not for BusValue {
    type Output = BusValue;

    fn not(self) -> BusValue {
        BusValue {
            width: self.width,
            data: !self.data & mask(self.width),
        }
    }
}

/// A signal value: either a single boolean or a fixed-width bus.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A single scalar bit.
    Bit(bool),
    /// A multi-bit bus.
    Bus(BusValue),
}

impl Value {
    /// The all-false value for a port or net of the given width.
    ///
    /// Widths of 0 or 1 produce a scalar.
    pub fn zero(width: u32) -> Self {
        if width <= 1 {
            Value::Bit(false)
        } else {
            Value::Bus(BusValue::new(width))
        }
    }

    /// Returns the bit width of this value (1 for scalars).
    pub fn width(&self) -> u32 {
        match self {
            Value::Bit(_) => 1,
            Value::Bus(bus) => bus.width(),
        }
    }

    /// Reduces the value to a boolean.
    ///
    /// A bus reports its last element, used as a liveness indicator where a
    /// single-bit summary is required.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Bit(b) => *b,
            Value::Bus(bus) => bus.last(),
        }
    }

    /// Returns the value as a bus of `width` bits.
    ///
    /// Scalars are broadcast; buses are truncated or zero-extended.
    pub fn to_bus(&self, width: u32) -> BusValue {
        match self {
            Value::Bit(b) => BusValue::splat(width, *b),
            Value::Bus(bus) => bus.resized(width),
        }
    }

    /// Coerces the value to the representation of a `width`-bit net or port.
    pub fn normalise(&self, width: u32) -> Value {
        if width <= 1 {
            Value::Bit(self.to_bool())
        } else {
            Value::Bus(self.to_bus(width))
        }
    }

    /// Wired-OR of two values at the given width.
    pub fn merge_or(&self, other: &Value, width: u32) -> Value {
        if width <= 1 {
            Value::Bit(self.to_bool() || other.to_bool())
        } else {
            Value::Bus(self.to_bus(width) | other.to_bus(width))
        }
    }

    /// Renders the value as upper-case hexadecimal, padded to the width.
    pub fn hex(&self) -> String {
        let (bits, width) = match self {
            Value::Bit(b) => (*b as u64, 1),
            Value::Bus(bus) => (bus.to_u64(), bus.width()),
        };
        let digits = width.div_ceil(4).max(1) as usize;
        format!("{bits:0digits$X}")
    }

    /// Parses a literal for a port of the given width.
    ///
    /// Accepts `0`, `1`, `true`, `false`, `0x..` hexadecimal, `0b..` binary,
    /// and plain decimal integers. The result is normalised to `width`.
    pub fn parse_literal(s: &str, width: u32) -> Option<Value> {
        let s = s.trim();
        let raw = match s.to_ascii_lowercase().as_str() {
            "true" | "on" | "high" => Value::Bit(true),
            "false" | "off" | "low" => Value::Bit(false),
            lower => {
                let n = if let Some(hex) = lower.strip_prefix("0x") {
                    u64::from_str_radix(&hex.replace('_', ""), 16).ok()?
                } else if let Some(bin) = lower.strip_prefix("0b") {
                    BusValue::from_binary_str(bin)?.to_u64()
                } else {
                    lower.parse::<u64>().ok()?
                };
                if width <= 1 {
                    Value::Bit(n != 0)
                } else {
                    Value::Bus(BusValue::from_u64(n, width))
                }
            }
        };
        Some(raw.normalise(width))
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Bit(false)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bit(b)
    }
}

impl From<BusValue> for Value {
    fn from(bus: BusValue) -> Self {
        Value::Bus(bus)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bit(b) => write!(f, "{}", *b as u8),
            Value::Bus(bus) => write!(f, "{bus}"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bit(b) => write!(f, "Bit({b})"),
            Value::Bus(bus) => write!(f, "Bus({bus})"),
        }
    }
}

fn clamp_width(width: u32) -> u32 {
    width.clamp(1, MAX_BUS_WIDTH)
}

fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_bus_is_zero() {
        let v = BusValue::new(8);
        assert_eq!(v.width(), 8);
        assert!(v.is_all_zero());
        assert_eq!(format!("{v}"), "00000000");
    }

    #[test]
    fn set_get_and_out_of_range() {
        let mut v = BusValue::new(4);
        v.set(1, true);
        v.set(3, true);
        v.set(9, true);
        assert!(v.get(1));
        assert!(v.get(3));
        assert!(!v.get(0));
        assert!(!v.get(9));
        assert_eq!(v.to_u64(), 0b1010);
    }

    #[test]
    fn width_is_clamped() {
        assert_eq!(BusValue::new(0).width(), 1);
        assert_eq!(BusValue::new(200).width(), MAX_BUS_WIDTH);
        assert_eq!(BusValue::splat(64, true).to_u64(), u64::MAX);
    }

    #[test]
    fn from_bits_lsb_first() {
        let v = BusValue::from_bits(&[true, false, true, false]);
        assert_eq!(v.to_u64(), 0b0101);
        assert_eq!(format!("{v}"), "0101");
    }

    #[test]
    fn binary_str_msb_first() {
        let v = BusValue::from_binary_str("1000_0001").unwrap();
        assert_eq!(v.width(), 8);
        assert!(v.get(7));
        assert!(v.get(0));
        assert!(BusValue::from_binary_str("10z1").is_none());
        assert!(BusValue::from_binary_str("").is_none());
    }

    #[test]
    fn slice_and_concat() {
        let v = BusValue::from_u64(0xA5, 8);
        assert_eq!(v.slice(0, 4).to_u64(), 0x5);
        assert_eq!(v.slice(4, 4).to_u64(), 0xA);
        assert_eq!(v.slice(6, 4).to_u64(), 0b10);
        let low = BusValue::from_u64(0x5, 4);
        let high = BusValue::from_u64(0xA, 4);
        assert_eq!(low.concat(&high), v);
    }

    #[test]
    fn bus_not_stays_in_width() {
        let v = !BusValue::from_u64(0b0011, 4);
        assert_eq!(v.to_u64(), 0b1100);
    }

    #[test]
    fn zero_is_scalar_for_narrow_widths() {
        assert_eq!(Value::zero(0), Value::Bit(false));
        assert_eq!(Value::zero(1), Value::Bit(false));
        assert_eq!(Value::zero(4), Value::Bus(BusValue::new(4)));
    }

    #[test]
    fn to_bool_reads_last_element() {
        assert!(Value::Bus(BusValue::from_u64(0b1000, 4)).to_bool());
        assert!(!Value::Bus(BusValue::from_u64(0b0111, 4)).to_bool());
        assert!(Value::Bit(true).to_bool());
    }

    #[test]
    fn normalise_broadcasts_scalars() {
        assert_eq!(
            Value::Bit(true).normalise(4),
            Value::Bus(BusValue::from_u64(0xF, 4))
        );
        assert_eq!(Value::Bit(false).normalise(8), Value::zero(8));
    }

    #[test]
    fn normalise_resizes_buses() {
        let v = Value::Bus(BusValue::from_u64(0b1011, 4));
        assert_eq!(v.normalise(8), Value::Bus(BusValue::from_u64(0b1011, 8)));
        assert_eq!(v.normalise(2), Value::Bus(BusValue::from_u64(0b11, 2)));
        assert_eq!(v.normalise(1), Value::Bit(true));
    }

    #[test]
    fn merge_or_scalar() {
        let t = Value::Bit(true);
        let f = Value::Bit(false);
        assert_eq!(t.merge_or(&f, 1), t);
        assert_eq!(f.merge_or(&t, 1), t);
        assert_eq!(f.merge_or(&f, 1), f);
    }

    #[test]
    fn merge_or_bus_with_scalar_broadcasts() {
        let bus = Value::Bus(BusValue::from_u64(0b0001, 4));
        assert_eq!(
            bus.merge_or(&Value::Bit(false), 4),
            Value::Bus(BusValue::from_u64(0b0001, 4))
        );
        assert_eq!(
            bus.merge_or(&Value::Bit(true), 4),
            Value::Bus(BusValue::from_u64(0b1111, 4))
        );
    }

    #[test]
    fn bit_and_bus_never_equal() {
        assert_ne!(Value::Bit(false), Value::zero(4));
        assert_ne!(Value::zero(4), Value::zero(8));
    }

    #[test]
    fn hex_rendering() {
        assert_eq!(Value::Bus(BusValue::from_u64(0xA, 4)).hex(), "A");
        assert_eq!(Value::Bus(BusValue::from_u64(0x0F, 8)).hex(), "0F");
        assert_eq!(Value::Bit(true).hex(), "1");
    }

    #[test]
    fn parse_literals() {
        assert_eq!(Value::parse_literal("1", 1), Some(Value::Bit(true)));
        assert_eq!(Value::parse_literal("false", 1), Some(Value::Bit(false)));
        assert_eq!(
            Value::parse_literal("0xA", 4),
            Some(Value::Bus(BusValue::from_u64(0xA, 4)))
        );
        assert_eq!(
            Value::parse_literal("0b0110", 4),
            Some(Value::Bus(BusValue::from_u64(0b0110, 4)))
        );
        assert_eq!(
            Value::parse_literal("true", 4),
            Some(Value::Bus(BusValue::from_u64(0xF, 4)))
        );
        assert_eq!(Value::parse_literal("maybe", 1), None);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Value::Bit(true)), "1");
        assert_eq!(
            format!("{}", Value::Bus(BusValue::from_u64(0b0110, 4))),
            "0110"
        );
    }

    #[test]
    fn deserialize_clamps_raw_fields() {
        let v: BusValue = serde_json::from_str(r#"{"width":4,"data":255}"#).unwrap();
        assert_eq!(v.width(), 4);
        assert_eq!(v.to_u64(), 0xF);
        let v: BusValue = serde_json::from_str(r#"{"width":0,"data":1}"#).unwrap();
        assert_eq!(v.width(), 1);
    }

    #[test]
    fn serde_untagged() {
        let bit: Value = serde_json::from_str("true").unwrap();
        assert_eq!(bit, Value::Bit(true));
        let bus = Value::Bus(BusValue::from_u64(0b1010, 4));
        let json = serde_json::to_string(&bus).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(bus, back);
    }
}
