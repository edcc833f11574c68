use serde::Deserialize;

use crate::address::ModbusAddress;
use crate::pdu::{RequestPdu, ResponsePdu};
use crate::data_type::{DataType, Value};
use crate::modbus_tcp::{self, MODBUS_PROTOCOL_ID, MbapHeader};
use crate::transactions::TransactionTable;
use crate::{ModbusClientError, Result};

/// Largest number of simultaneous pending requests a client may track.
pub const MAX_TRANSACTIONS_LIMIT: usize = 16;

/// A read request built by [`ModbusClient::build_request`].
///
/// Returned from [`ModbusClient::process_response`] with its response value filled in.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientRequest {
    unit_id: u8,
    transaction_id: u16,
    address: String,
    data_type: DataType,
    response_value: Option<Value>,
}

impl ClientRequest {
    pub(crate) fn new(unit_id: u8, transaction_id: u16, address: String, data_type: DataType) -> Self {
        ClientRequest {
            unit_id,
            transaction_id,
            address,
            data_type,
            response_value: None,
        }
    }

    /// Identifies the remote slave behind the connection.
    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    pub fn transaction_id(&self) -> u16 {
        self.transaction_id
    }

    /// The 6-digit address as supplied by the caller.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn response_value(&self) -> Option<Value> {
        self.response_value
    }

    pub fn is_fulfilled(&self) -> bool {
        self.response_value.is_some()
    }

    /// Read function code derived from the stored address.
    pub fn function_code(&self) -> Result<u8> {
        Ok(ModbusAddress::parse(&self.address)?.function_code())
    }

    /// Zero-based wire offset derived from the stored address.
    pub fn starting_address(&self) -> Result<u16> {
        Ok(ModbusAddress::parse(&self.address)?.offset())
    }
}

fn default_max_transactions() -> usize {
    MAX_TRANSACTIONS_LIMIT
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Pending requests kept before the oldest is dropped (1-16).
    #[serde(default = "default_max_transactions")]
    pub max_transactions: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            max_transactions: default_max_transactions(),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_TRANSACTIONS_LIMIT).contains(&self.max_transactions) {
            return Err(ModbusClientError::InvalidConfiguration(format!(
                "max transactions must be from 1 to {MAX_TRANSACTIONS_LIMIT}, got {}",
                self.max_transactions
            )));
        }
        Ok(())
    }
}

pub struct ModbusClientBuilder {
    max_transactions: Option<usize>,
}

impl ModbusClientBuilder {
    pub fn max_transactions(mut self, max_transactions: usize) -> Self {
        self.max_transactions = Some(max_transactions);
        self
    }

    pub fn build(self) -> Result<ModbusClient> {
        let config = ClientConfig {
            max_transactions: self.max_transactions.unwrap_or_else(default_max_transactions),
        };
        ModbusClient::with_config(config)
    }
}

/// Modbus TCP read client decoupled from any networking implementation.
///
/// One client serves exactly one connection: transaction ids are only unique
/// per client, so frames from two clients must never share a socket.
#[derive(Debug)]
pub struct ModbusClient {
    requests: TransactionTable,
    transaction_id: u16,
}

impl Default for ModbusClient {
    fn default() -> Self {
        ModbusClient {
            requests: TransactionTable::new(MAX_TRANSACTIONS_LIMIT),
            transaction_id: 0,
        }
    }
}

impl ModbusClient {
    /// Client tracking up to 16 pending requests.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ModbusClientBuilder {
        ModbusClientBuilder {
            max_transactions: None,
        }
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(ModbusClient {
            requests: TransactionTable::new(config.max_transactions),
            transaction_id: 0,
        })
    }

    pub fn max_transactions(&self) -> usize {
        self.requests.capacity()
    }

    pub fn pending_count(&self) -> usize {
        self.requests.len()
    }

    pub fn is_pending(&self, transaction_id: u16) -> bool {
        self.requests.contains(transaction_id)
    }

    /// Transaction id the next built request will carry.
    pub fn next_transaction_id(&self) -> u16 {
        self.transaction_id
    }

    /// Build a read request frame for transport to the device.
    ///
    /// The request is queued as pending. If the queue is full the oldest
    /// pending request is dropped without notice; use
    /// [`build_request_with_eviction`](Self::build_request_with_eviction) to observe it.
    pub fn build_request(&mut self, unit_id: u8, address: &str, data_type: DataType) -> Result<Vec<u8>> {
        let (frame, _) = self.build_request_with_eviction(unit_id, address, data_type)?;
        Ok(frame)
    }

    /// Same as [`build_request`](Self::build_request), also returning the
    /// request evicted to make room for the new one.
    pub fn build_request_with_eviction(
        &mut self,
        unit_id: u8,
        address: &str,
        data_type: DataType,
    ) -> Result<(Vec<u8>, Option<ClientRequest>)> {
        let parsed = ModbusAddress::parse(address)?;
        let transaction_id = self.transaction_id;

        let request = ClientRequest::new(unit_id, transaction_id, address.to_string(), data_type);
        let evicted = self.requests.insert(request);
        if let Some(ref dropped) = evicted {
            tracing::warn!(
                transaction_id = dropped.transaction_id(),
                address = dropped.address(),
                "pending request evicted before a response arrived"
            );
        }

        let frame = modbus_tcp::encode_request(
            &MbapHeader::for_request(transaction_id, unit_id),
            &RequestPdu::new(parsed.function_code(), parsed.offset(), data_type.quantity()),
        );

        // increment after using in both the table entry and the frame
        self.transaction_id = self.transaction_id.wrapping_add(1);

        tracing::debug!(
            transaction_id,
            unit_id,
            address,
            ?data_type,
            "built read request"
        );
        Ok((frame, evicted))
    }

    /// Match a response frame to its pending request and decode the value.
    ///
    /// On any failure after the transaction id has been matched, the pending
    /// request is discarded.
    pub fn process_response(&mut self, frame: &[u8]) -> Result<ClientRequest> {
        let (header, pdu) = modbus_tcp::decode_response(frame)?;

        let mut request = self
            .requests
            .take(header.transaction_id)
            .ok_or(ModbusClientError::NoPendingTransaction(header.transaction_id))?;

        validate_header(&header, &request)?;
        let value = validate_pdu(pdu, &request)?;

        request.response_value = Some(request.data_type.decode(&value)?);
        tracing::debug!(
            transaction_id = request.transaction_id,
            value = ?request.response_value,
            "response matched"
        );
        Ok(request)
    }
}

fn validate_header(header: &MbapHeader, request: &ClientRequest) -> Result<()> {
    if header.protocol_id != MODBUS_PROTOCOL_ID {
        return Err(ModbusClientError::ProtocolMismatch(header.protocol_id));
    }
    if header.unit_id != request.unit_id {
        return Err(ModbusClientError::UnitMismatch {
            expected: request.unit_id,
            received: header.unit_id,
        });
    }
    Ok(())
}

/// Returns the normalized value bytes of a normal response.
fn validate_pdu(pdu: ResponsePdu, request: &ClientRequest) -> Result<Vec<u8>> {
    match pdu {
        ResponsePdu::Exception {
            function_code,
            exception_code,
        } => {
            tracing::warn!(
                transaction_id = request.transaction_id,
                function_code,
                exception_code = exception_code.code(),
                "device returned exception: {exception_code}"
            );
            Err(ModbusClientError::DeviceException(exception_code))
        }
        ResponsePdu::Normal {
            function_code, value, ..
        } => {
            let expected = request.function_code()?;
            if function_code != expected {
                return Err(ModbusClientError::FunctionMismatch {
                    expected,
                    received: function_code,
                });
            }
            Ok(value)
        }
    }
}
