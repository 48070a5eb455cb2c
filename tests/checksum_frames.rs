use stpm3x_rs::checksum::checksum;
use stpm3x_rs::frame::{
    decode_response, encode_response, join_half_words, split_register, ChecksumStatus, Frame,
};
use stpm3x_rs::registers::{dsp_cr3_value, gain_code, Register, US_REG1_CONFIG};
use stpm3x_rs::data_types::{CurrentGain, LatchMode};

#[test]
fn checksum_known_vectors() {
    assert_eq!(checksum(&[0x00, 0x00, 0x00, 0x00]), 0x00);
    assert_eq!(checksum(&[0xFF, 0xFF, 0xFF, 0xFF]), 0xDE);
    assert_eq!(checksum(&[0x01, 0x02, 0x03, 0x04]), 0xE3);
    assert_eq!(checksum(&[0x04, 0xFF, 0xFF, 0xFF]), 0x57);
    assert_eq!(checksum(&[0xFF, 0x24, 0x07, 0x40]), 0x95);
}

/// Bit-at-a-time CRC: shift MSB first, XOR 0x07 on carry, accumulator kept across bytes.
fn bitwise_checksum(bytes: &[u8; 4]) -> u8 {
    let mut crc = 0u8;
    for &byte in bytes {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ 0x07 } else { crc << 1 };
        }
    }
    crc
}

/// xorshift32, enough to spread inputs over the whole range.
fn values(count: usize) -> impl Iterator<Item = u32> {
    let mut x = 0x9E37_79B9u32;
    (0..count).map(move |_| {
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        x
    })
}

#[test]
fn checksum_matches_bitwise_algorithm() {
    for v in values(50_000) {
        let bytes = v.to_le_bytes();
        assert_eq!(checksum(&bytes), bitwise_checksum(&bytes), "payload {:02x?}", bytes);
    }
    for first in 0..=u8::MAX {
        let bytes = [first, 0xFF, 0xFF, 0xFF];
        assert_eq!(checksum(&bytes), bitwise_checksum(&bytes));
    }
}

#[test]
fn checksum_changes_with_any_byte() {
    let base = [0xFF, 0x18, 0x27, 0x03];
    let reference = checksum(&base);
    for i in 0..4 {
        let mut flipped = base;
        flipped[i] ^= 0x01;
        assert_ne!(checksum(&flipped), reference, "byte {}", i);
    }
}

#[test]
fn write_frame_layout() {
    assert_eq!(Frame::write(0x18, 0x0327).bytes(), &[0xFF, 0x18, 0x27, 0x03, 0xEE]);
    assert_eq!(Frame::write(0x05, 0x0080).bytes(), &[0xFF, 0x05, 0x80, 0x00, 0xA7]);
    assert_eq!(Frame::write(0x19, 0x0B27).crc(), 0xBD);
}

#[test]
fn read_frame_layout() {
    assert_eq!(
        Frame::read_request(Register::DSP_REG14.addr()).bytes(),
        &[0x48, 0xFF, 0xFF, 0xFF, 0x24]
    );
    assert_eq!(
        Frame::read_request(Register::DSP_REG15.addr()).bytes(),
        &[0x4A, 0xFF, 0xFF, 0xFF, 0x08]
    );
    assert_eq!(Frame::read_continue().bytes(), &[0xFF, 0xFF, 0xFF, 0xFF, 0xDE]);
    assert_eq!(Frame::idle(), Frame::read_continue());
}

#[test]
fn response_is_little_endian() {
    let response = decode_response(&[0x78, 0x56, 0x34, 0x12, 0x08]);
    assert_eq!(response.value, 0x1234_5678);
    assert_eq!(response.checksum, ChecksumStatus::Valid);
    assert_eq!(encode_response(0x0080_04E0), [0xE0, 0x04, 0x80, 0x00, 0x79]);
}

#[test]
fn bad_response_checksum_is_reported_not_rejected() {
    let response = decode_response(&[0x78, 0x56, 0x34, 0x12, 0x09]);
    assert_eq!(response.value, 0x1234_5678);
    assert_eq!(
        response.checksum,
        ChecksumStatus::Mismatch {
            expected: 0x08,
            received: 0x09
        }
    );
}

#[test]
fn registers_split_low_half_first() {
    assert_eq!(split_register(0x0080_04E0), (0x04E0, 0x0080));
    assert_eq!(join_half_words(0x4007, 0x0050), US_REG1_CONFIG);
    assert_eq!(Register::DSP_CR3.addr_high(), 0x05);
}

#[test]
fn configuration_constants() {
    assert_eq!(US_REG1_CONFIG, 0x0050_4007);
    assert_eq!(dsp_cr3_value(LatchMode::Auto), 0x0080_04E0);
    assert_eq!(dsp_cr3_value(LatchMode::Software), 0x0000_04E0);
    assert_eq!(gain_code(CurrentGain::X2), 0x0327_0327);
    assert_eq!(gain_code(CurrentGain::X4), 0x0727_0327);
    assert_eq!(gain_code(CurrentGain::X8), 0x0B27_0327);
    assert_eq!(gain_code(CurrentGain::X16), 0x0F27_0327);
}

#[test]
fn register_values_survive_write_frames_and_responses() {
    for value in values(20_000).chain([0, u32::MAX, 0x0000_FFFF, 0xFFFF_0000]) {
        let (low, high) = split_register(value);
        let lo_frame = Frame::write(Register::DSP_IRQ1.addr(), low);
        let hi_frame = Frame::write(Register::DSP_IRQ1.addr_high(), high);
        for frame in [lo_frame, hi_frame] {
            let b = frame.bytes();
            assert_eq!(b[0], 0xFF);
            assert_eq!(b[4], bitwise_checksum(&[b[0], b[1], b[2], b[3]]));
        }
        let sent_low = u16::from_le_bytes([lo_frame.bytes()[2], lo_frame.bytes()[3]]);
        let sent_high = u16::from_le_bytes([hi_frame.bytes()[2], hi_frame.bytes()[3]]);
        assert_eq!(join_half_words(sent_low, sent_high), value);

        let response = decode_response(&encode_response(value));
        assert_eq!(response.value, value);
        assert_eq!(response.checksum, ChecksumStatus::Valid);
    }
}
