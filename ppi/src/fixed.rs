// Fixed-point encodings of the PPI-GEOLOCATION tags.
//
// Values are stored offset-binary: the signed range is shifted up by its bound so
// the result always fits an unsigned 32-bit field. Inputs outside of the documented
// range are not rejected, they wrap through two's-complement truncation to 32 bits.
// That loss is accepted, a malformed fix should never stop a frame from being logged.

/// Fractional scale of the 3.7 format (latitude, longitude).
pub const SCALE_3_7: f64 = 10_000_000.0;
/// Offset of the 3.7 format: 180 degrees at the 3.7 scale.
pub const OFFSET_3_7: i64 = 180 * 10_000_000;

/// Fractional scale of the 6.4 format (altitude).
pub const SCALE_6_4: f64 = 10_000.0;
/// Offset of the 6.4 format: 180000 meters at the 6.4 scale.
pub const OFFSET_6_4: i64 = 180_000 * 10_000;

/// 3 integer digits, 7 fractional digits. Resolution is 1e-7 degree.
pub fn to_fixed3_7(value: f64) -> u32 {
    let scaled = (value * SCALE_3_7) as i64;
    scaled.wrapping_add(OFFSET_3_7) as u32
}

/// 6 integer digits, 4 fractional digits. Resolution is 1e-4 meter.
pub fn to_fixed6_4(value: f64) -> u32 {
    let scaled = (value * SCALE_6_4) as i64;
    scaled.wrapping_add(OFFSET_6_4) as u32
}

pub fn from_fixed3_7(value: u32) -> f64 {
    (i64::from(value) - OFFSET_3_7) as f64 / SCALE_3_7
}

pub fn from_fixed6_4(value: u32) -> f64 {
    (i64::from(value) - OFFSET_6_4) as f64 / SCALE_6_4
}
