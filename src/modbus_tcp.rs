//! MBAP framing.
//!
//! ```text
//! [0:2] transaction id | [2:4] protocol id | [4:6] length | [6] unit id | [7..] PDU
//! ```

use bytes::{Buf, BufMut, BytesMut};

use crate::ModbusClientError;
use crate::pdu::{REQUEST_PDU_SIZE, RequestPdu, ResponsePdu};

/// Size of the MBAP header in bytes.
pub const MBAP_HEADER_SIZE: usize = 7;

/// Protocol identifier of Modbus.
pub const MODBUS_PROTOCOL_ID: u16 = 0;

/// Length field of every request this client sends: unit id + read PDU.
pub const REQUEST_LENGTH: u16 = 1 + REQUEST_PDU_SIZE as u16;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MbapHeader {
    pub transaction_id: u16,
    pub protocol_id: u16,
    /// Bytes following the length field (unit id + PDU).
    pub length: u16,
    pub unit_id: u8,
}

impl MbapHeader {
    /// Header for an outgoing read request.
    pub fn for_request(transaction_id: u16, unit_id: u8) -> Self {
        MbapHeader {
            transaction_id,
            protocol_id: MODBUS_PROTOCOL_ID,
            length: REQUEST_LENGTH,
            unit_id,
        }
    }

    pub fn encode_to(&self, buf: &mut BytesMut) {
        buf.put_u16(self.transaction_id);
        buf.put_u16(self.protocol_id);
        buf.put_u16(self.length);
        buf.put_u8(self.unit_id);
    }

    /// Reads the first 7 bytes. The length field is not checked against `frame`.
    pub fn decode(frame: &[u8]) -> Result<Self, ModbusClientError> {
        if frame.len() < MBAP_HEADER_SIZE {
            return Err(ModbusClientError::FrameTooShort);
        }
        let mut buf = &frame[..MBAP_HEADER_SIZE];
        Ok(MbapHeader {
            transaction_id: buf.get_u16(),
            protocol_id: buf.get_u16(),
            length: buf.get_u16(),
            unit_id: buf.get_u8(),
        })
    }
}

/// Total size of the frame starting with `prefix`, once its length field is known.
///
/// Returns `None` while fewer than 6 bytes are available.
pub fn frame_len(prefix: &[u8]) -> Option<usize> {
    if prefix.len() < 6 {
        return None;
    }
    let length = u16::from_be_bytes([prefix[4], prefix[5]]);
    Some(6 + length as usize)
}

/// Encoded read request ADU.
pub fn encode_request(header: &MbapHeader, pdu: &RequestPdu) -> Vec<u8> {
    let mut frame = BytesMut::with_capacity(MBAP_HEADER_SIZE + REQUEST_PDU_SIZE);
    header.encode_to(&mut frame);
    pdu.encode_to(&mut frame);
    frame.to_vec()
}

/// Split a complete response frame into its header and decoded PDU.
pub fn decode_response(frame: &[u8]) -> Result<(MbapHeader, ResponsePdu), ModbusClientError> {
    let header = MbapHeader::decode(frame)?;

    // length - unit identifier
    let pdu_len = (header.length as usize)
        .checked_sub(1)
        .ok_or(ModbusClientError::FrameTooShort)?;
    let end = MBAP_HEADER_SIZE + pdu_len;
    if frame.len() < end {
        return Err(ModbusClientError::FrameTooShort);
    }

    let pdu = ResponsePdu::decode(&frame[MBAP_HEADER_SIZE..end])?;
    Ok((header, pdu))
}
