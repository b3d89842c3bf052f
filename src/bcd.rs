//! Packed binary-coded-decimal codec for the DS1306 time and alarm registers.
//!
//! Every clock and alarm register except the year stores a two-digit decimal
//! value as BCD in its low seven bits. Bit 7 of an alarm register is the
//! "match any value" flag, so a byte with bit 7 set is never treated as BCD:
//! both [`encode`] and [`decode`] pass it through untouched.
//!
//! Values are not range checked. Encoding anything above 99 produces an
//! unspecified byte.

/// Wildcard sentinel: the alarm ignores the field carrying this bit.
pub const ANY: u8 = 0x80;

/// Seconds and minutes use the low seven bits.
pub const SECONDS_MASK: u8 = 0x7F;
/// Seconds and minutes use the low seven bits.
pub const MINUTES_MASK: u8 = 0x7F;
/// Hours in 24-hour form use the low six bits.
pub const HOURS_24_MASK: u8 = 0x3F;
/// Hours in 12-hour form use the low five bits.
pub const HOURS_12_MASK: u8 = 0x1F;
/// Day of week is a single digit in the low three bits.
pub const DAY_OF_WEEK_MASK: u8 = 0x07;
/// Day of month uses the low six bits.
pub const DAY_MASK: u8 = 0x3F;
/// Month uses the low six bits.
pub const MONTH_MASK: u8 = 0x3F;

/// Returns `true` if `value` carries the wildcard bit.
#[inline]
pub const fn is_any(value: u8) -> bool {
    value & ANY != 0
}

/// Encodes a decimal value (0-99) as BCD and applies `mask`.
///
/// A value with the wildcard bit set is returned unchanged.
pub const fn encode(value: u8, mask: u8) -> u8 {
    if is_any(value) {
        value
    } else {
        encode8(value) & mask
    }
}

/// Masks `value` and decodes it from BCD.
///
/// A value with the wildcard bit set is returned unchanged.
pub const fn decode(value: u8, mask: u8) -> u8 {
    if is_any(value) {
        value
    } else {
        decode8(value & mask)
    }
}

/// Encodes a decimal value (0-99) as BCD using the full byte.
///
/// Used for the year register, which has no wildcard.
pub const fn encode8(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Decodes a full-byte BCD value.
pub const fn decode8(value: u8) -> u8 {
    ((value >> 4) & 0x0F) * 10 + (value & 0x0F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_values() {
        assert_eq!(encode(0, SECONDS_MASK), 0x00);
        assert_eq!(encode(9, SECONDS_MASK), 0x09);
        assert_eq!(encode(10, SECONDS_MASK), 0x10);
        assert_eq!(encode(45, MINUTES_MASK), 0x45);
        assert_eq!(encode(59, SECONDS_MASK), 0x59);
        assert_eq!(encode(23, HOURS_24_MASK), 0x23);
        assert_eq!(encode(12, HOURS_12_MASK), 0x12);
        assert_eq!(encode(31, DAY_MASK), 0x31);
        assert_eq!(encode(12, MONTH_MASK), 0x12);
    }

    #[test]
    fn test_encode_applies_mask() {
        // 99 -> 0x99, the day-of-week mask keeps only the low three bits
        assert_eq!(encode(99, DAY_OF_WEEK_MASK), 0x01);
        assert_eq!(encode(7, DAY_OF_WEEK_MASK), 0x07);
        // 40 -> 0x40, outside the 12-hour mask
        assert_eq!(encode(40, HOURS_12_MASK), 0x00);
    }

    #[test]
    fn test_decode_masks_reserved_bits() {
        // 12-hour flag and PM bit are not part of the hour value
        assert_eq!(decode(0x72, HOURS_12_MASK), 12);
        assert_eq!(decode(0x48, HOURS_12_MASK), 8);
        // Reserved bits above the day-of-week digit are dropped
        assert_eq!(decode(0x7D, DAY_OF_WEEK_MASK), 5);
        assert_eq!(decode(0x59, SECONDS_MASK), 59);
    }

    #[test]
    fn test_round_trip_all_decimal_values() {
        for value in 0..=99u8 {
            assert_eq!(decode8(encode8(value)), value);
        }
        // 80 and up land on the wildcard bit
        for value in 0..=79u8 {
            assert_eq!(decode(encode(value, 0xFF), 0xFF), value);
        }
        for value in 0..=59u8 {
            assert_eq!(decode(encode(value, SECONDS_MASK), SECONDS_MASK), value);
        }
        for value in 0..=23u8 {
            assert_eq!(decode(encode(value, HOURS_24_MASK), HOURS_24_MASK), value);
        }
    }

    #[test]
    fn test_wildcard_passes_through() {
        for value in 0x80..=0xFFu8 {
            assert_eq!(encode(value, SECONDS_MASK), value);
            assert_eq!(decode(value, SECONDS_MASK), value);
            assert_eq!(encode(value, DAY_OF_WEEK_MASK), value);
            assert_eq!(decode(value, DAY_OF_WEEK_MASK), value);
        }
        assert_eq!(decode(encode(ANY, HOURS_24_MASK), HOURS_24_MASK), ANY);
    }

    #[test]
    fn test_full_byte_year() {
        assert_eq!(encode8(99), 0x99);
        assert_eq!(decode8(0x99), 99);
        assert_eq!(encode8(0), 0x00);
        assert_eq!(encode8(24), 0x24);
        // No wildcard semantics on the full-byte variant
        assert_eq!(decode8(0x80), 80);
    }
}
