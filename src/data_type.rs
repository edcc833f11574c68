use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModbusClientError;

/// Logical type of the item being read.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// single bit
    Boolean,
    /// unsigned 16 bit value
    Word,
    /// signed 16 bit value
    Short,
    /// unsigned 32 bit value
    Dword,
    /// signed 32 bit value
    Long,
    /// 32 bit floating point value
    Float,
    /// 64 bit floating point value
    Double,
}

impl DataType {
    /// Number of bits or registers to request for this type.
    pub fn quantity(&self) -> u16 {
        match self {
            DataType::Boolean | DataType::Word | DataType::Short => 1,
            DataType::Dword | DataType::Long | DataType::Float => 2,
            DataType::Double => 4,
        }
    }

    /// Bytes needed to decode a value of this type.
    pub fn value_size(&self) -> usize {
        match self {
            DataType::Boolean => 1,
            DataType::Word | DataType::Short => 2,
            DataType::Dword | DataType::Long | DataType::Float => 4,
            DataType::Double => 8,
        }
    }

    /// Decode word-normalized value bytes (see [`normalize_words`]).
    pub fn decode(&self, value: &[u8]) -> Result<Value, ModbusClientError> {
        let size = self.value_size();
        if value.len() < size {
            return Err(ModbusClientError::InsufficientData {
                expected: size,
                actual: value.len(),
            });
        }

        let decoded = match self {
            DataType::Boolean => Value::Boolean(value[0] != 0),
            DataType::Word => Value::Word(u16::from_le_bytes([value[0], value[1]])),
            DataType::Short => Value::Short(i16::from_le_bytes([value[0], value[1]])),
            DataType::Dword => Value::Dword(u32::from_le_bytes(take4(value))),
            DataType::Long => Value::Long(i32::from_le_bytes(take4(value))),
            DataType::Float => Value::Float(f32::from_le_bytes(take4(value))),
            DataType::Double => Value::Double(f64::from_le_bytes(take8(value))),
        };
        Ok(decoded)
    }
}

fn take4(b: &[u8]) -> [u8; 4] {
    [b[0], b[1], b[2], b[3]]
}

fn take8(b: &[u8]) -> [u8; 8] {
    [b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]
}

/// Swap the two bytes of every 16-bit word in place.
///
/// Registers travel big-endian, lowest register first. After the swap the
/// buffer reads as a little-endian number whose least significant word is
/// the first register. A trailing odd byte (coil responses) is left alone.
pub fn normalize_words(value: &mut [u8]) {
    for word in value.chunks_exact_mut(2) {
        word.swap(0, 1);
    }
}

impl TryFrom<u8> for DataType {
    type Error = ModbusClientError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(DataType::Boolean),
            1 => Ok(DataType::Word),
            2 => Ok(DataType::Short),
            3 => Ok(DataType::Dword),
            4 => Ok(DataType::Long),
            5 => Ok(DataType::Float),
            6 => Ok(DataType::Double),
            _ => Err(ModbusClientError::UnsupportedDataType(code.to_string())),
        }
    }
}

impl FromStr for DataType {
    type Err = ModbusClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(DataType::Boolean),
            "word" | "u16" => Ok(DataType::Word),
            "short" | "i16" => Ok(DataType::Short),
            "dword" | "u32" => Ok(DataType::Dword),
            "long" | "i32" => Ok(DataType::Long),
            "float" | "f32" => Ok(DataType::Float),
            "double" | "f64" => Ok(DataType::Double),
            _ => Err(ModbusClientError::UnsupportedDataType(s.to_string())),
        }
    }
}

/// A decoded response value.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Boolean(bool),
    Word(u16),
    Short(i16),
    Dword(u32),
    Long(i32),
    Float(f32),
    Double(f64),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Boolean(_) => DataType::Boolean,
            Value::Word(_) => DataType::Word,
            Value::Short(_) => DataType::Short,
            Value::Dword(_) => DataType::Dword,
            Value::Long(_) => DataType::Long,
            Value::Float(_) => DataType::Float,
            Value::Double(_) => DataType::Double,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::Boolean(v) => {
                if v {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Word(v) => v as f64,
            Value::Short(v) => v as f64,
            Value::Dword(v) => v as f64,
            Value::Long(v) => v as f64,
            Value::Float(v) => v as f64,
            Value::Double(v) => v,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Word(v) => write!(f, "{v}"),
            Value::Short(v) => write!(f, "{v}"),
            Value::Dword(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_wire(data_type: DataType, wire: &[u8]) -> Value {
        let mut buf = wire.to_vec();
        normalize_words(&mut buf);
        data_type.decode(&buf).unwrap()
    }

    #[test]
    fn test_quantities() {
        assert_eq!(DataType::Boolean.quantity(), 1);
        assert_eq!(DataType::Word.quantity(), 1);
        assert_eq!(DataType::Short.quantity(), 1);
        assert_eq!(DataType::Dword.quantity(), 2);
        assert_eq!(DataType::Long.quantity(), 2);
        assert_eq!(DataType::Float.quantity(), 2);
        assert_eq!(DataType::Double.quantity(), 4);
    }

    #[test]
    fn test_word_and_short() {
        assert_eq!(decode_wire(DataType::Word, &[0x00, 0x2A]), Value::Word(42));
        assert_eq!(decode_wire(DataType::Short, &[0xFF, 0xFE]), Value::Short(-2));
    }

    #[test]
    fn test_low_word_first() {
        // registers 0x5678, 0x1234
        let wire = [0x56, 0x78, 0x12, 0x34];
        assert_eq!(decode_wire(DataType::Dword, &wire), Value::Dword(0x1234_5678));
        assert_eq!(decode_wire(DataType::Long, &[0xFF, 0xFF, 0xFF, 0xFF]), Value::Long(-1));
    }

    #[test]
    fn test_float_one_and_a_half() {
        // 1.5f32 = 0x3FC00000, low word first
        assert_eq!(decode_wire(DataType::Float, &[0x00, 0x00, 0x3F, 0xC0]), Value::Float(1.5));
    }

    #[test]
    fn test_double() {
        // -2.5f64 = 0xC004_0000_0000_0000
        let wire = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x04];
        assert_eq!(decode_wire(DataType::Double, &wire), Value::Double(-2.5));
    }

    #[test]
    fn test_boolean_odd_byte_untouched() {
        assert_eq!(decode_wire(DataType::Boolean, &[0x01]), Value::Boolean(true));
        assert_eq!(decode_wire(DataType::Boolean, &[0x00]), Value::Boolean(false));
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let err = DataType::Double.decode(&[0, 0, 0, 0]).unwrap_err();
        assert!(matches!(
            err,
            ModbusClientError::InsufficientData { expected: 8, actual: 4 }
        ));
        assert!(DataType::Boolean.decode(&[]).is_err());
    }

    #[test]
    fn test_unsupported_codes_and_names() {
        assert_eq!(DataType::try_from(5).unwrap(), DataType::Float);
        assert!(matches!(
            DataType::try_from(7),
            Err(ModbusClientError::UnsupportedDataType(_))
        ));
        assert_eq!("DWORD".parse::<DataType>().unwrap(), DataType::Dword);
        assert!(matches!(
            "string".parse::<DataType>(),
            Err(ModbusClientError::UnsupportedDataType(_))
        ));
    }

    #[test]
    fn test_value_helpers() {
        assert_eq!(Value::Long(-7).data_type(), DataType::Long);
        assert_eq!(Value::Boolean(true).as_f64(), 1.0);
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
    }
}
