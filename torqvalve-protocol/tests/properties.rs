//! Property tests for the wire format

use proptest::prelude::*;
use torqvalve_protocol::units::{decode_speed, encode_speed, DIRECTION_BIT};
use torqvalve_protocol::{checksum, InstructionPacket, StatusFlags, StatusPacket, MAX_PARAMS};

proptest! {
    #[test]
    fn speed_survives_encoding(speed in -1.0f32..=1.0) {
        let raw = encode_speed(speed);
        prop_assert_eq!(raw & DIRECTION_BIT != 0, speed < 0.0);
        let delta = decode_speed(raw) - speed;
        prop_assert!(delta.abs() <= 1.0 / 1023.0 + f32::EPSILON);
    }

    #[test]
    fn out_of_range_speed_saturates(speed in 1.0f32..1000.0) {
        prop_assert_eq!(encode_speed(speed), 1023);
        prop_assert_eq!(encode_speed(-speed), 1023 | DIRECTION_BIT);
    }

    #[test]
    fn checksum_closes_packet(
        id in 0u8..0xFE,
        address in any::<u8>(),
        data in proptest::collection::vec(any::<u8>(), 0..MAX_PARAMS - 1),
    ) {
        let packet = InstructionPacket::write(id, address, &data, false).unwrap();
        let bytes = packet.encode_to_vec().unwrap();
        prop_assert_eq!(bytes.len(), 7 + data.len());
        prop_assert_eq!(bytes[3] as usize, bytes.len() - 4);
        // Everything after the header, checksum included, sums to 0xFF
        let body = &bytes[2..];
        let total = body.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        prop_assert_eq!(total, 0xFF);
        prop_assert_eq!(checksum(&body[..body.len() - 1]), bytes[bytes.len() - 1]);
    }

    #[test]
    fn status_reply_parses_back(
        id in 0u8..0xFE,
        error in 0u8..0x80,
        params in proptest::collection::vec(any::<u8>(), 0..=MAX_PARAMS),
    ) {
        let reply = StatusPacket {
            id,
            error: StatusFlags(error),
            params: heapless::Vec::from_slice(&params).unwrap(),
        };
        let bytes = reply.encode_to_vec().unwrap();
        prop_assert_eq!(StatusPacket::parse(&bytes).unwrap(), reply);
    }
}
