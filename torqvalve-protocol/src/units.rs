//! Conversions between engineering units and raw register values
//!
//! Speeds and loads are 10-bit magnitudes with a direction flag in bit 10.
//! Speeds are signed fractions of full scale in `[-1, 1]`; negative turns
//! counter-clockwise.

/// Full-scale 10-bit magnitude
pub const FULL_SCALE: u16 = 1023;

/// Direction flag of speed and load words
pub const DIRECTION_BIT: u16 = 1 << 10;

/// Mechanical range covered by the position registers, in degrees
pub const ANGLE_RANGE_DEG: u16 = 300;

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

/// Encode a signed speed fraction as a wheel-mode moving-speed word
///
/// The magnitude is truncated; bit 10 is set iff `speed < 0`.
pub fn encode_speed(speed: f32) -> u16 {
    let speed = clamp_unit(speed);
    let magnitude = if speed < 0.0 { -speed } else { speed };
    let raw = (magnitude * FULL_SCALE as f32) as u16;
    if speed < 0.0 {
        raw | DIRECTION_BIT
    } else {
        raw
    }
}

/// Decode a moving-speed word back into a signed fraction
pub fn decode_speed(raw: u16) -> f32 {
    let magnitude = (raw & FULL_SCALE) as f32 / FULL_SCALE as f32;
    if raw & DIRECTION_BIT != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Decode a present-load word into a signed fraction of full torque
///
/// The servo reports counter-clockwise load with the direction bit clear;
/// it maps to a negative value so the sign matches [`encode_speed`].
pub fn decode_load(raw: u16) -> f32 {
    let raw = raw & 0x7FF;
    let magnitude = (raw & FULL_SCALE) as f32 / FULL_SCALE as f32;
    if raw & DIRECTION_BIT != 0 {
        magnitude
    } else {
        -magnitude
    }
}

/// Encode a torque fraction `[0, 1]` as a max-torque word (truncated)
pub fn encode_torque(fraction: f32) -> u16 {
    let fraction = clamp_unit(fraction).max(0.0);
    (fraction * FULL_SCALE as f32) as u16
}

/// Convert degrees to position units, rounding to nearest
///
/// Angles beyond the mechanical range saturate.
pub fn degrees_to_units(degrees: u16) -> u16 {
    let degrees = degrees.min(ANGLE_RANGE_DEG) as u32;
    ((FULL_SCALE as u32 * degrees + ANGLE_RANGE_DEG as u32 / 2) / ANGLE_RANGE_DEG as u32) as u16
}

/// Convert position units to degrees, truncating
pub fn units_to_degrees(units: u16) -> u16 {
    let units = units.min(FULL_SCALE) as u32;
    (units * ANGLE_RANGE_DEG as u32 / FULL_SCALE as u32) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_speed() {
        assert_eq!(encode_speed(0.0), 0);
        assert_eq!(encode_speed(1.0), 1023);
        assert_eq!(encode_speed(-1.0), 1023 | DIRECTION_BIT);
        // 0.9 * 1023 = 920.7, truncated
        assert_eq!(encode_speed(0.9), 920);
        assert_eq!(encode_speed(-0.9), 920 | DIRECTION_BIT);
    }

    #[test]
    fn test_encode_speed_clamps() {
        assert_eq!(encode_speed(2.5), 1023);
        assert_eq!(encode_speed(-7.0), 1023 | DIRECTION_BIT);
        assert_eq!(encode_speed(f32::NAN), 0);
    }

    #[test]
    fn test_decode_speed() {
        assert_eq!(decode_speed(1023), 1.0);
        assert_eq!(decode_speed(1023 | DIRECTION_BIT), -1.0);
        assert_eq!(decode_speed(0), 0.0);
    }

    #[test]
    fn test_decode_load_direction() {
        // Direction bit set: clockwise, positive
        assert_eq!(decode_load(0x0400 | 1023), 1.0);
        // Direction bit clear: counter-clockwise, negative
        assert_eq!(decode_load(1023), -1.0);
        assert_eq!(decode_load(0), 0.0);
        let delta = decode_load(0x0480) - 128.0 / 1023.0;
        assert!(delta > -1e-6 && delta < 1e-6);
    }

    #[test]
    fn test_decode_load_ignores_high_bits() {
        assert_eq!(decode_load(0xF800 | 0x0400 | 1023), 1.0);
    }

    #[test]
    fn test_encode_torque() {
        // 0.7 * 1023 = 716.1
        assert_eq!(encode_torque(0.7), 716);
        assert_eq!(encode_torque(1.5), 1023);
        assert_eq!(encode_torque(-0.2), 0);
    }

    #[test]
    fn test_angle_conversion() {
        assert_eq!(degrees_to_units(0), 0);
        assert_eq!(degrees_to_units(150), 512);
        assert_eq!(degrees_to_units(300), 1023);
        assert_eq!(degrees_to_units(400), 1023);
        assert_eq!(units_to_degrees(512), 150);
        assert_eq!(units_to_degrees(1023), 300);
        assert_eq!(units_to_degrees(2000), 300);
    }
}
