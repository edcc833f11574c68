use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

use crate::ModbusClientError;
use crate::data_type::normalize_words;

/// Size of an encoded read request PDU.
pub const REQUEST_PDU_SIZE: usize = 5;

/// Set on the function code of an exception response.
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Read request PDU: function code, starting address, quantity.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RequestPdu {
    pub function_code: u8,
    pub starting_address: u16,
    pub quantity: u16,
}

impl RequestPdu {
    pub fn new(function_code: u8, starting_address: u16, quantity: u16) -> Self {
        RequestPdu {
            function_code,
            starting_address,
            quantity,
        }
    }

    pub fn encode_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.function_code);
        buf.put_u16(self.starting_address);
        buf.put_u16(self.quantity);
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(REQUEST_PDU_SIZE);
        self.encode_to(&mut buf);
        buf.to_vec()
    }
}

/// Exception code reported by a device in place of a normal response.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
    Unknown(u8),
}

impl ExceptionCode {
    pub fn code(&self) -> u8 {
        match self {
            ExceptionCode::IllegalFunction => 0x01,
            ExceptionCode::IllegalDataAddress => 0x02,
            ExceptionCode::IllegalDataValue => 0x03,
            ExceptionCode::ServerDeviceFailure => 0x04,
            ExceptionCode::Unknown(code) => *code,
        }
    }
}

impl From<u8> for ExceptionCode {
    fn from(code: u8) -> Self {
        match code {
            0x01 => ExceptionCode::IllegalFunction,
            0x02 => ExceptionCode::IllegalDataAddress,
            0x03 => ExceptionCode::IllegalDataValue,
            0x04 => ExceptionCode::ServerDeviceFailure,
            other => ExceptionCode::Unknown(other),
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ExceptionCode::IllegalFunction => "illegal function",
            ExceptionCode::IllegalDataAddress => "illegal data address",
            ExceptionCode::IllegalDataValue => "illegal data value",
            ExceptionCode::ServerDeviceFailure => "server device failure",
            ExceptionCode::Unknown(_) => "unknown exception code",
        };
        f.write_str(msg)
    }
}

/// Response PDU, normal or exception.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponsePdu {
    /// `value` holds `byte_count` bytes with every word already byte-swapped.
    Normal {
        function_code: u8,
        byte_count: u8,
        value: Vec<u8>,
    },
    Exception {
        function_code: u8,
        exception_code: ExceptionCode,
    },
}

impl ResponsePdu {
    pub fn decode(pdu: &[u8]) -> Result<Self, ModbusClientError> {
        if pdu.len() < 2 {
            return Err(ModbusClientError::FrameTooShort);
        }
        let mut buf = pdu;
        let function_code = buf.get_u8();

        // Check for Modbus exception (function code | 0x80)
        if function_code & EXCEPTION_FLAG != 0 {
            let exception_code = ExceptionCode::from(buf.get_u8());
            return Ok(ResponsePdu::Exception {
                function_code,
                exception_code,
            });
        }

        let byte_count = buf.get_u8();
        if buf.remaining() < byte_count as usize {
            return Err(ModbusClientError::InsufficientData {
                expected: byte_count as usize,
                actual: buf.remaining(),
            });
        }
        let mut value = buf[..byte_count as usize].to_vec();
        normalize_words(&mut value);

        Ok(ResponsePdu::Normal {
            function_code,
            byte_count,
            value,
        })
    }

    pub fn function_code(&self) -> u8 {
        match self {
            ResponsePdu::Normal { function_code, .. } => *function_code,
            ResponsePdu::Exception { function_code, .. } => *function_code,
        }
    }

    pub fn is_exception(&self) -> bool {
        matches!(self, ResponsePdu::Exception { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_pdu_encoding() {
        let pdu = RequestPdu::new(0x03, 100, 10);
        assert_eq!(pdu.encode(), vec![0x03, 0x00, 0x64, 0x00, 0x0A]);

        let pdu = RequestPdu::new(0x04, 0xFFFE, 4);
        assert_eq!(pdu.encode(), vec![0x04, 0xFF, 0xFE, 0x00, 0x04]);
    }

    #[test]
    fn test_normal_response_swaps_words() {
        let pdu = ResponsePdu::decode(&[0x03, 0x04, 0x12, 0x34, 0x56, 0x78]).unwrap();
        assert_eq!(
            pdu,
            ResponsePdu::Normal {
                function_code: 0x03,
                byte_count: 4,
                value: vec![0x34, 0x12, 0x78, 0x56],
            }
        );
        assert!(!pdu.is_exception());
    }

    #[test]
    fn test_coil_response_single_byte() {
        let pdu = ResponsePdu::decode(&[0x01, 0x01, 0x01]).unwrap();
        assert_eq!(
            pdu,
            ResponsePdu::Normal {
                function_code: 0x01,
                byte_count: 1,
                value: vec![0x01],
            }
        );
    }

    #[test]
    fn test_exception_response() {
        let pdu = ResponsePdu::decode(&[0x83, 0x02]).unwrap();
        assert_eq!(pdu.function_code(), 0x83);
        match pdu {
            ResponsePdu::Exception { exception_code, .. } => {
                assert_eq!(exception_code, ExceptionCode::IllegalDataAddress);
                assert_eq!(exception_code.to_string(), "illegal data address");
            }
            other => panic!("expected exception, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_pdus() {
        assert!(matches!(ResponsePdu::decode(&[]), Err(ModbusClientError::FrameTooShort)));
        assert!(matches!(ResponsePdu::decode(&[0x83]), Err(ModbusClientError::FrameTooShort)));
        assert!(matches!(
            ResponsePdu::decode(&[0x03, 0x04, 0x00, 0x2A]),
            Err(ModbusClientError::InsufficientData { expected: 4, actual: 2 })
        ));
    }

    #[test]
    fn test_exception_code_messages() {
        assert_eq!(ExceptionCode::from(1).to_string(), "illegal function");
        assert_eq!(ExceptionCode::from(3).to_string(), "illegal data value");
        assert_eq!(ExceptionCode::from(4).to_string(), "server device failure");
        assert_eq!(ExceptionCode::from(0x0B).to_string(), "unknown exception code");
        assert_eq!(ExceptionCode::from(0x0B).code(), 0x0B);
    }
}
