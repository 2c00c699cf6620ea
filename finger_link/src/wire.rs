//! Encoding and decoding of angle lines.

use finger_pose::{AngleVector, FINGER_COUNT};

use crate::LinkError;

/// Angles as they appear on the wire.
pub type WireAngles = [i64; FINGER_COUNT];

/// Truncate each angle toward zero.
pub fn to_wire(angles: &AngleVector) -> WireAngles {
    angles.map(|a| a.trunc() as i64)
}

/// Render one frame's line, without the terminator.
pub fn encode_line(angles: &AngleVector) -> String {
    to_wire(angles)
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a line produced by [`encode_line`].
///
/// Surrounding whitespace and a trailing `\r\n` are ignored.
pub fn decode_line(line: &str) -> Result<WireAngles, LinkError> {
    let fail = |reason: String| LinkError::Decode { line: line.to_string(), reason };

    let mut out = [0i64; FINGER_COUNT];
    let mut fields = line.split_whitespace();
    for (i, slot) in out.iter_mut().enumerate() {
        let field = fields
            .next()
            .ok_or_else(|| fail(format!("expected {} values, got {}", FINGER_COUNT, i)))?;
        *slot = field
            .parse()
            .map_err(|e| fail(format!("field {} ({:?}): {}", i, field, e)))?;
    }
    if fields.next().is_some() {
        return Err(fail(format!("more than {} values", FINGER_COUNT)));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_truncated_integers() {
        let line = encode_line(&[900.9, 2075.2, 1950.0, 1080.99, 520.5]);
        assert_eq!(line, "900 2075 1950 1080 520");
    }

    #[test]
    fn truncates_toward_zero_for_negatives() {
        assert_eq!(to_wire(&[-0.7, -1.5, 0.0, 3.9, -10.1]), [0, -1, 0, 3, -10]);
        assert_eq!(encode_line(&[-0.7, -1.5, 0.0, 3.9, -10.1]), "0 -1 0 3 -10");
    }

    #[test]
    fn decodes_with_terminator() {
        assert_eq!(decode_line("900 2075 1950 1080 520\r\n").unwrap(), [900, 2075, 1950, 1080, 520]);
    }

    #[test]
    fn rejects_short_long_and_garbage_lines() {
        assert!(decode_line("1 2 3 4").is_err());
        assert!(decode_line("1 2 3 4 5 6").is_err());
        assert!(decode_line("1 2 x 4 5").is_err());
        assert!(decode_line("").is_err());
    }

    #[test]
    fn decode_error_mentions_field() {
        let err = decode_line("1 2 x 4 5").unwrap_err();
        assert!(err.to_string().contains("field 2"));
    }
}
