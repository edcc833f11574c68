use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::ModbusClientError;

// primary table digit followed by a five digit item number
static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0134])([0-9]{5})$").expect("address pattern is a valid regex")
});

/// One of the four addressable data regions of a device.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimaryTable {
    Coils,
    DiscreteInputs,
    InputRegisters,
    HoldingRegisters,
}

impl PrimaryTable {
    fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            b'0' => Some(PrimaryTable::Coils),
            b'1' => Some(PrimaryTable::DiscreteInputs),
            b'3' => Some(PrimaryTable::InputRegisters),
            b'4' => Some(PrimaryTable::HoldingRegisters),
            _ => None,
        }
    }

    pub fn digit(&self) -> char {
        match self {
            PrimaryTable::Coils => '0',
            PrimaryTable::DiscreteInputs => '1',
            PrimaryTable::InputRegisters => '3',
            PrimaryTable::HoldingRegisters => '4',
        }
    }

    /// Read function code serving this table.
    pub fn read_function_code(&self) -> u8 {
        match self {
            PrimaryTable::Coils => 0x01,
            PrimaryTable::DiscreteInputs => 0x02,
            PrimaryTable::HoldingRegisters => 0x03,
            PrimaryTable::InputRegisters => 0x04,
        }
    }
}

/// A parsed 6-digit address such as `400001`.
///
/// The leading digit selects the primary table, the remaining five digits
/// are the item number (1-65535). Item `X` is addressed on the wire as `X - 1`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModbusAddress {
    table: PrimaryTable,
    item: u16,
}

impl ModbusAddress {
    pub fn parse(address: &str) -> Result<Self, ModbusClientError> {
        let invalid = || ModbusClientError::InvalidAddress(address.to_string());

        let caps = ADDRESS_PATTERN.captures(address).ok_or_else(invalid)?;
        let table = PrimaryTable::from_digit(caps[1].as_bytes()[0]).ok_or_else(invalid)?;
        let item: u32 = caps[2].parse().map_err(|_| invalid())?;
        if item == 0 || item > u16::MAX as u32 {
            return Err(invalid());
        }

        Ok(ModbusAddress {
            table,
            item: item as u16,
        })
    }

    pub fn table(&self) -> PrimaryTable {
        self.table
    }

    pub fn item_number(&self) -> u16 {
        self.item
    }

    pub fn function_code(&self) -> u8 {
        self.table.read_function_code()
    }

    /// Zero-based offset sent in the request PDU.
    pub fn offset(&self) -> u16 {
        self.item - 1
    }
}

impl FromStr for ModbusAddress {
    type Err = ModbusClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModbusAddress::parse(s)
    }
}

impl fmt::Display for ModbusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:05}", self.table.digit(), self.item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_function_codes() {
        assert_eq!(ModbusAddress::parse("000001").unwrap().function_code(), 0x01);
        assert_eq!(ModbusAddress::parse("100001").unwrap().function_code(), 0x02);
        assert_eq!(ModbusAddress::parse("300001").unwrap().function_code(), 0x04);
        assert_eq!(ModbusAddress::parse("400001").unwrap().function_code(), 0x03);
    }

    #[test]
    fn test_offset_is_item_minus_one() {
        let addr = ModbusAddress::parse("465535").unwrap();
        assert_eq!(addr.item_number(), 65535);
        assert_eq!(addr.offset(), 65534);
        assert_eq!(addr.table(), PrimaryTable::HoldingRegisters);

        assert_eq!(ModbusAddress::parse("300101").unwrap().offset(), 100);
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in [
            "", "40001", "4000001", "200001", "500001", "40000a", "4 0001", "x00001",
            "400000", "465536", "499999", "４00001",
        ] {
            assert!(
                matches!(ModbusAddress::parse(bad), Err(ModbusClientError::InvalidAddress(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_display_matches_input() {
        let addr: ModbusAddress = "000042".parse().unwrap();
        assert_eq!(addr.to_string(), "000042");
    }
}
