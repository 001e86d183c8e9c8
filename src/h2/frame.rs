//! L4 — H2 framer (spec §4.4, RFC 7540 §4).
//!
//! Frame header is exactly 9 bytes: 3-byte length, 1-byte type, 1-byte
//! flags, 4-byte stream id with the reserved high bit masked to zero.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

pub const FRAME_HEADER_LEN: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Data,
    Headers,
    Priority,
    RstStream,
    Settings,
    PushPromise,
    Ping,
    GoAway,
    WindowUpdate,
    Continuation,
    Unknown(u8),
}

impl FrameType {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            FrameType::Data => 0x0,
            FrameType::Headers => 0x1,
            FrameType::Priority => 0x2,
            FrameType::RstStream => 0x3,
            FrameType::Settings => 0x4,
            FrameType::PushPromise => 0x5,
            FrameType::Ping => 0x6,
            FrameType::GoAway => 0x7,
            FrameType::WindowUpdate => 0x8,
            FrameType::Continuation => 0x9,
            FrameType::Unknown(c) => c,
        }
    }

    #[must_use]
    pub fn from_code(code: u8) -> FrameType {
        match code {
            0x0 => FrameType::Data,
            0x1 => FrameType::Headers,
            0x2 => FrameType::Priority,
            0x3 => FrameType::RstStream,
            0x4 => FrameType::Settings,
            0x5 => FrameType::PushPromise,
            0x6 => FrameType::Ping,
            0x7 => FrameType::GoAway,
            0x8 => FrameType::WindowUpdate,
            0x9 => FrameType::Continuation,
            other => FrameType::Unknown(other),
        }
    }
}

pub mod flags {
    pub const END_STREAM: u8 = 0x1;
    pub const ACK: u8 = 0x1;
    pub const END_HEADERS: u8 = 0x4;
    pub const PADDED: u8 = 0x8;
    pub const PRIORITY: u8 = 0x20;
}

pub mod error_code {
    pub const NO_ERROR: u32 = 0x0;
    pub const PROTOCOL_ERROR: u32 = 0x1;
    pub const INTERNAL_ERROR: u32 = 0x2;
    pub const FLOW_CONTROL_ERROR: u32 = 0x3;
    pub const SETTINGS_TIMEOUT: u32 = 0x4;
    pub const STREAM_CLOSED: u32 = 0x5;
    pub const FRAME_SIZE_ERROR: u32 = 0x6;
    pub const REFUSED_STREAM: u32 = 0x7;
    pub const CANCEL: u32 = 0x8;
    pub const COMPRESSION_ERROR: u32 = 0x9;
    pub const CONNECT_ERROR: u32 = 0xa;
    pub const ENHANCE_YOUR_CALM: u32 = 0xb;
    pub const INADEQUATE_SECURITY: u32 = 0xc;
    pub const HTTP_1_1_REQUIRED: u32 = 0xd;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingPair {
    pub id: u16,
    pub value: u32,
}

pub mod setting_id {
    pub const HEADER_TABLE_SIZE: u16 = 0x1;
    pub const ENABLE_PUSH: u16 = 0x2;
    pub const MAX_CONCURRENT_STREAMS: u16 = 0x3;
    pub const INITIAL_WINDOW_SIZE: u16 = 0x4;
    pub const MAX_FRAME_SIZE: u16 = 0x5;
    pub const MAX_HEADER_LIST_SIZE: u16 = 0x6;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Data { stream_id: u32, end_stream: bool, data: Bytes },
    Headers { stream_id: u32, end_stream: bool, end_headers: bool, block: Bytes },
    Priority { stream_id: u32 },
    RstStream { stream_id: u32, error_code: u32 },
    Settings { ack: bool, params: Vec<SettingPair> },
    PushPromise { stream_id: u32 },
    Ping { ack: bool, payload: [u8; 8] },
    GoAway { last_stream_id: u32, error_code: u32, debug_data: Bytes },
    WindowUpdate { stream_id: u32, increment: u32 },
    Continuation { stream_id: u32, end_headers: bool, block: Bytes },
    Unknown { frame_type: u8, stream_id: u32 },
}

impl Frame {
    #[must_use]
    pub fn stream_id(&self) -> u32 {
        match self {
            Frame::Data { stream_id, .. }
            | Frame::Headers { stream_id, .. }
            | Frame::Priority { stream_id }
            | Frame::RstStream { stream_id, .. }
            | Frame::PushPromise { stream_id }
            | Frame::WindowUpdate { stream_id, .. }
            | Frame::Continuation { stream_id, .. }
            | Frame::Unknown { stream_id, .. } => *stream_id,
            Frame::Settings { .. } | Frame::Ping { .. } => 0,
            Frame::GoAway { .. } => 0,
        }
    }

    pub fn encode(&self, out: &mut BytesMut) {
        match self {
            Frame::Data { stream_id, end_stream, data } => {
                write_header(out, data.len() as u32, FrameType::Data, if *end_stream { flags::END_STREAM } else { 0 }, *stream_id);
                out.extend_from_slice(data);
            }
            Frame::Headers { stream_id, end_stream, end_headers, block } => {
                let mut fl = 0u8;
                if *end_stream { fl |= flags::END_STREAM; }
                if *end_headers { fl |= flags::END_HEADERS; }
                write_header(out, block.len() as u32, FrameType::Headers, fl, *stream_id);
                out.extend_from_slice(block);
            }
            Frame::Priority { stream_id } => {
                write_header(out, 5, FrameType::Priority, 0, *stream_id);
                out.put_u32(0);
                out.put_u8(0);
            }
            Frame::RstStream { stream_id, error_code } => {
                write_header(out, 4, FrameType::RstStream, 0, *stream_id);
                out.put_u32(*error_code);
            }
            Frame::Settings { ack, params } => {
                let fl = if *ack { flags::ACK } else { 0 };
                let len = if *ack { 0 } else { params.len() as u32 * 6 };
                write_header(out, len, FrameType::Settings, fl, 0);
                if !*ack {
                    for p in params {
                        out.put_u16(p.id);
                        out.put_u32(p.value);
                    }
                }
            }
            Frame::PushPromise { stream_id } => {
                write_header(out, 4, FrameType::PushPromise, 0, *stream_id);
                out.put_u32(0);
            }
            Frame::Ping { ack, payload } => {
                write_header(out, 8, FrameType::Ping, if *ack { flags::ACK } else { 0 }, 0);
                out.extend_from_slice(payload);
            }
            Frame::GoAway { last_stream_id, error_code, debug_data } => {
                write_header(out, 8 + debug_data.len() as u32, FrameType::GoAway, 0, 0);
                out.put_u32(*last_stream_id & 0x7fff_ffff);
                out.put_u32(*error_code);
                out.extend_from_slice(debug_data);
            }
            Frame::WindowUpdate { stream_id, increment } => {
                write_header(out, 4, FrameType::WindowUpdate, 0, *stream_id);
                out.put_u32(*increment & 0x7fff_ffff);
            }
            Frame::Continuation { stream_id, end_headers, block } => {
                let fl = if *end_headers { flags::END_HEADERS } else { 0 };
                write_header(out, block.len() as u32, FrameType::Continuation, fl, *stream_id);
                out.extend_from_slice(block);
            }
            Frame::Unknown { .. } => {}
        }
    }

    /// Decode one frame from `buf`, given the local receive-side
    /// `max_frame_size`. Returns `Ok(None)` if `buf` does not yet contain a
    /// complete frame. Advances `buf` past the consumed bytes on success.
    pub fn decode(buf: &mut Bytes, max_frame_size: u32) -> Result<Option<Frame>> {
        if buf.len() < FRAME_HEADER_LEN {
            return Ok(None);
        }
        let length = u32::from(buf[0]) << 16 | u32::from(buf[1]) << 8 | u32::from(buf[2]);
        if length > max_frame_size {
            return Err(Error::protocol(format!(
                "frame length {length} exceeds MAX_FRAME_SIZE {max_frame_size}"
            )));
        }
        if buf.len() < FRAME_HEADER_LEN + length as usize {
            return Ok(None);
        }

        let frame_type = FrameType::from_code(buf[3]);
        let flags_byte = buf[4];
        let stream_id = u32::from_be_bytes([buf[5], buf[6], buf[7], buf[8]]) & 0x7fff_ffff;

        let mut body = buf.slice(FRAME_HEADER_LEN..FRAME_HEADER_LEN + length as usize);
        buf.advance(FRAME_HEADER_LEN + length as usize);

        let frame = match frame_type {
            FrameType::Data => {
                Frame::Data {
                    stream_id,
                    end_stream: flags_byte & flags::END_STREAM != 0,
                    data: body,
                }
            }
            FrameType::Headers => {
                Frame::Headers {
                    stream_id,
                    end_stream: flags_byte & flags::END_STREAM != 0,
                    end_headers: flags_byte & flags::END_HEADERS != 0,
                    block: body,
                }
            }
            FrameType::Priority => {
                if body.len() != 5 {
                    return Err(Error::protocol("PRIORITY frame must be 5 bytes"));
                }
                Frame::Priority { stream_id }
            }
            FrameType::RstStream => {
                if body.len() != 4 {
                    return Err(Error::protocol("RST_STREAM frame must be 4 bytes"));
                }
                Frame::RstStream { stream_id, error_code: body.get_u32() }
            }
            FrameType::Settings => {
                let ack = flags_byte & flags::ACK != 0;
                if ack {
                    if !body.is_empty() {
                        return Err(Error::protocol("SETTINGS ACK must carry no payload"));
                    }
                    Frame::Settings { ack: true, params: Vec::new() }
                } else {
                    if body.len() % 6 != 0 {
                        return Err(Error::protocol("SETTINGS payload must be a multiple of 6"));
                    }
                    if stream_id != 0 {
                        return Err(Error::protocol("SETTINGS on non-zero stream"));
                    }
                    let mut params = Vec::with_capacity(body.len() / 6);
                    while body.remaining() >= 6 {
                        let id = body.get_u16();
                        let value = body.get_u32();
                        params.push(SettingPair { id, value });
                    }
                    Frame::Settings { ack: false, params }
                }
            }
            FrameType::PushPromise => Frame::PushPromise { stream_id },
            FrameType::Ping => {
                if body.len() != 8 {
                    return Err(Error::protocol("PING frame must be 8 bytes"));
                }
                let mut payload = [0u8; 8];
                body.copy_to_slice(&mut payload);
                Frame::Ping { ack: flags_byte & flags::ACK != 0, payload }
            }
            FrameType::GoAway => {
                if body.len() < 8 {
                    return Err(Error::protocol("GOAWAY frame too short"));
                }
                let last_stream_id = body.get_u32() & 0x7fff_ffff;
                let error_code = body.get_u32();
                let debug_data = body;
                Frame::GoAway { last_stream_id, error_code, debug_data }
            }
            FrameType::WindowUpdate => {
                if body.len() != 4 {
                    return Err(Error::protocol("WINDOW_UPDATE frame must be 4 bytes"));
                }
                let increment = body.get_u32() & 0x7fff_ffff;
                Frame::WindowUpdate { stream_id, increment }
            }
            FrameType::Continuation => {
                Frame::Continuation {
                    stream_id,
                    end_headers: flags_byte & flags::END_HEADERS != 0,
                    block: body,
                }
            }
            FrameType::Unknown(code) => Frame::Unknown { frame_type: code, stream_id },
        };

        Ok(Some(frame))
    }
}

fn write_header(out: &mut BytesMut, length: u32, frame_type: FrameType, flags: u8, stream_id: u32) {
    out.put_u8((length >> 16) as u8);
    out.put_u8((length >> 8) as u8);
    out.put_u8(length as u8);
    out.put_u8(frame_type.code());
    out.put_u8(flags);
    out.put_u32(stream_id & 0x7fff_ffff);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(frame: Frame) {
        let mut buf = BytesMut::new();
        frame.encode(&mut buf);
        let mut bytes = buf.freeze();
        let decoded = Frame::decode(&mut bytes, 1 << 24).unwrap().unwrap();
        assert_eq!(frame, decoded);
        assert!(bytes.is_empty());
    }

    #[test]
    fn round_trips_every_frame_type() {
        round_trip(Frame::Data { stream_id: 1, end_stream: true, data: Bytes::from_static(b"hi") });
        round_trip(Frame::Headers { stream_id: 3, end_stream: false, end_headers: true, block: Bytes::from_static(b"hdrs") });
        round_trip(Frame::Priority { stream_id: 5 });
        round_trip(Frame::RstStream { stream_id: 7, error_code: error_code::CANCEL });
        round_trip(Frame::Settings { ack: false, params: vec![SettingPair { id: setting_id::MAX_FRAME_SIZE, value: 16384 }] });
        round_trip(Frame::Settings { ack: true, params: vec![] });
        round_trip(Frame::Ping { ack: false, payload: [1, 2, 3, 4, 5, 6, 7, 8] });
        round_trip(Frame::GoAway { last_stream_id: 9, error_code: error_code::NO_ERROR, debug_data: Bytes::new() });
        round_trip(Frame::WindowUpdate { stream_id: 0, increment: 65535 });
        round_trip(Frame::Continuation { stream_id: 3, end_headers: true, block: Bytes::from_static(b"more") });
    }

    #[test]
    fn decode_returns_none_on_partial_frame() {
        let mut buf = BytesMut::new();
        Frame::Data { stream_id: 1, end_stream: true, data: Bytes::from_static(b"hello") }.encode(&mut buf);
        let mut partial = buf.freeze().slice(0..5);
        assert!(Frame::decode(&mut partial, 1 << 24).unwrap().is_none());
    }

    #[test]
    fn decode_rejects_oversize_frame_immediately() {
        let mut buf = BytesMut::new();
        Frame::Data { stream_id: 1, end_stream: false, data: Bytes::from_iter(std::iter::repeat(0u8).take(100)) }.encode(&mut buf);
        let mut bytes = buf.freeze();
        assert!(Frame::decode(&mut bytes, 10).is_err());
    }

    #[test]
    fn settings_ack_with_payload_is_rejected() {
        let mut buf = BytesMut::new();
        // Hand-craft an ACK frame with a non-empty payload.
        write_header(&mut buf, 6, FrameType::Settings, flags::ACK, 0);
        buf.put_u16(1);
        buf.put_u32(100);
        let mut bytes = buf.freeze();
        assert!(Frame::decode(&mut bytes, 1 << 24).is_err());
    }

    #[test]
    fn stream_of_frames_round_trips_concatenated() {
        let frames = vec![
            Frame::WindowUpdate { stream_id: 0, increment: 100 },
            Frame::Data { stream_id: 1, end_stream: false, data: Bytes::from_static(b"a") },
            Frame::Data { stream_id: 1, end_stream: true, data: Bytes::from_static(b"b") },
        ];
        let mut buf = BytesMut::new();
        for f in &frames {
            f.encode(&mut buf);
        }
        let mut bytes = buf.freeze();
        let mut decoded = Vec::new();
        while let Some(f) = Frame::decode(&mut bytes, 1 << 24).unwrap() {
            decoded.push(f);
        }
        assert_eq!(frames, decoded);
    }
}
