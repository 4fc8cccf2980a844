//! Wire protocol for the mirror process's stdin channel.
//!
//! One event per line, newline-terminated:
//! `LAEvent:{"event":"ActionDown","data":{"x":500,"y":1200}}`.
//! The protocol is fire-and-forget; nothing is read back on this channel.

use crate::model::{GestureEvent, GestureKind};
use crate::runner::HarnessError;
use serde::{Deserialize, Serialize};

/// Literal tag prepended to every JSON-encoded event line.
pub const PROTOCOL_PREFIX: &str = "LAEvent:";

#[derive(Debug, Serialize, Deserialize)]
struct WireEvent {
    event: GestureKind,
    data: WirePoint,
}

#[derive(Debug, Serialize, Deserialize)]
struct WirePoint {
    x: i32,
    y: i32,
}

/// Serialize one gesture event into a newline-terminated protocol record.
///
/// Pure and side-effect-free. Coordinates are not validated; the mirror
/// process is the authority on acceptance. The only failure mode is JSON
/// serialization, which is fatal for this fixed schema.
pub fn encode_line(event: &GestureEvent) -> Result<String, HarnessError> {
    let wire = WireEvent {
        event: event.kind,
        data: WirePoint {
            x: event.x,
            y: event.y,
        },
    };
    let json = serde_json::to_string(&wire)
        .map_err(|err| HarnessError::protocol("failed to encode gesture event", err))?;
    Ok(format!("{PROTOCOL_PREFIX}{json}\n"))
}

/// Parse a protocol record back into a gesture event.
///
/// Accepts records with or without the trailing newline. Used by round-trip
/// tests and by fixture programs standing in for the mirror process.
pub fn decode_line(line: &str) -> Result<GestureEvent, HarnessError> {
    let record = line.trim_end_matches(['\r', '\n']);
    let json = record.strip_prefix(PROTOCOL_PREFIX).ok_or_else(|| {
        HarnessError::protocol_msg(format!(
            "record does not start with '{PROTOCOL_PREFIX}'"
        ))
    })?;
    let wire: WireEvent = serde_json::from_str(json)
        .map_err(|err| HarnessError::protocol("failed to decode gesture event", err))?;
    Ok(GestureEvent::new(wire.event, wire.data.x, wire.data.y))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::model::GestureKind;

    #[test]
    fn down_event_encodes_to_the_exact_wire_record() {
        let event = GestureEvent::new(GestureKind::Down, 500, 1200);
        let line = encode_line(&event).unwrap();
        assert_eq!(
            line,
            "LAEvent:{\"event\":\"ActionDown\",\"data\":{\"x\":500,\"y\":1200}}\n"
        );
    }

    #[test]
    fn round_trip_preserves_kind_and_coordinates() {
        for event in [
            GestureEvent::new(GestureKind::Down, 0, 0),
            GestureEvent::new(GestureKind::Move, -50, 1200),
            GestureEvent::new(GestureKind::Up, i32::MAX, i32::MIN),
        ] {
            let line = encode_line(&event).unwrap();
            assert_eq!(decode_line(&line).unwrap(), event);
        }
    }

    #[test]
    fn decode_rejects_missing_prefix() {
        let err = decode_line("{\"event\":\"ActionUp\",\"data\":{\"x\":1,\"y\":2}}").unwrap_err();
        assert_eq!(err.code, crate::runner::codes::PROTOCOL);
    }

    #[test]
    fn decode_rejects_malformed_json() {
        let err = decode_line("LAEvent:{not json}").unwrap_err();
        assert_eq!(err.code, crate::runner::codes::PROTOCOL);
    }
}
