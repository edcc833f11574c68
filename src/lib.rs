//! Modbus TCP read client decoupled from any networking implementation.
//!
//! [`ModbusClient`] builds request frames and turns response frames back into
//! typed values. Sending, receiving and splitting the byte stream into frames
//! belong to the caller.
//!
//! ```
//! use a3ot_modbus_client::{DataType, ModbusClient, Value};
//!
//! let mut client = ModbusClient::new();
//! let frame = client.build_request(1, "400001", DataType::Word).unwrap();
//! assert_eq!(frame, [0u8, 0, 0, 0, 0, 6, 1, 3, 0, 0, 0, 1]);
//!
//! let response = [0u8, 0, 0, 0, 0, 5, 1, 3, 2, 0, 42];
//! let request = client.process_response(&response).unwrap();
//! assert_eq!(request.response_value(), Some(Value::Word(42)));
//! ```

mod address;
mod client;
mod pdu;
mod data_type;
pub mod modbus_tcp;
mod transactions;

pub use address::{ModbusAddress, PrimaryTable};
pub use client::{ClientConfig, ClientRequest, MAX_TRANSACTIONS_LIMIT, ModbusClient, ModbusClientBuilder};
pub use pdu::{ExceptionCode, RequestPdu, ResponsePdu};
pub use data_type::{DataType, Value};
pub use transactions::TransactionTable;

pub type Result<T> = std::result::Result<T, ModbusClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ModbusClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid address {0:?}: expected 6 digits beginning with the primary table number")]
    InvalidAddress(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("No pending transaction {0}")]
    NoPendingTransaction(u16),

    #[error("Invalid protocol ID: {0}")]
    ProtocolMismatch(u16),

    #[error("Unit ID mismatch: expected {expected}, received {received}")]
    UnitMismatch { expected: u8, received: u8 },

    #[error("Unexpected function code: expected {expected:#x}, received {received:#x}")]
    FunctionMismatch { expected: u8, received: u8 },

    #[error("{0}")]
    DeviceException(ExceptionCode),

    #[error("Frame too short")]
    FrameTooShort,

    #[error("Insufficient data: expected {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },
}
