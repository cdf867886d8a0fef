//! Schema Module
//!
//! Per-column type handling consumed by the write path.
//!
//! A column is described by its physical shape only: fixed or variable
//! length, pass-by-value or by-reference, alignment, and an optional
//! three-way comparison over datum bytes. Columns without a comparison
//! still store data; they simply carry no min/max statistics.
//!
//! ## Datum Encoding
//! ```text
//! by-value fixed   : native little-endian pattern, exactly `len` bytes (1/2/4/8)
//! by-ref fixed     : exactly `len` bytes
//! variable length  : [TotalLen: u32 LE, header included][payload]
//! ```

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Result, StripeError};

/// Size of the length header that starts every variable-length datum
pub const VARLENA_HEADER_SIZE: usize = 4;

/// Three-way comparison over two datums of the same column
pub type CompareFn = fn(&[u8], &[u8]) -> Ordering;

// =============================================================================
// Physical Shape
// =============================================================================

/// Stored width of a column's datums
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLength {
    /// Every datum is exactly this many bytes
    Fixed(usize),

    /// Datums carry their own length header
    Variable,
}

/// Boundary each serialized datum is padded up to
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Char = 1,
    Short = 2,
    Int = 4,
    Double = 8,
}

impl Alignment {
    /// Round `len` up to this alignment
    pub fn align(self, len: usize) -> usize {
        let a = self as usize;
        (len + a - 1) & !(a - 1)
    }
}

// =============================================================================
// Column Descriptor
// =============================================================================

/// Immutable description of one column for the lifetime of a write session
#[derive(Clone)]
pub struct ColumnDescriptor {
    /// Position in the row
    pub index: usize,
    pub length: ColumnLength,
    pub alignment: Alignment,
    /// Datum is passed by value (only legal for fixed widths of 1/2/4/8)
    pub by_value: bool,
    /// Ordering used for min/max statistics; `None` disables them
    pub compare: Option<CompareFn>,
    /// Logical type, when the column was built from a [`ColumnType`]
    pub column_type: Option<ColumnType>,
}

impl ColumnDescriptor {
    /// Describe a column with an arbitrary physical shape
    pub fn custom(
        index: usize,
        length: ColumnLength,
        alignment: Alignment,
        by_value: bool,
        compare: Option<CompareFn>,
    ) -> Result<Self> {
        if by_value && !matches!(length, ColumnLength::Fixed(1 | 2 | 4 | 8)) {
            return Err(StripeError::Config(format!(
                "column {}: by-value columns must be 1, 2, 4 or 8 bytes wide, got {:?}",
                index, length
            )));
        }
        if let ColumnLength::Fixed(0) = length {
            return Err(StripeError::Config(format!(
                "column {}: fixed width must be positive",
                index
            )));
        }

        Ok(Self {
            index,
            length,
            alignment,
            by_value,
            compare,
            column_type: None,
        })
    }

    pub fn is_fixed_length(&self) -> bool {
        matches!(self.length, ColumnLength::Fixed(_))
    }

    pub fn is_comparable(&self) -> bool {
        self.compare.is_some()
    }
}

impl fmt::Debug for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDescriptor")
            .field("index", &self.index)
            .field("length", &self.length)
            .field("alignment", &self.alignment)
            .field("by_value", &self.by_value)
            .field("comparable", &self.compare.is_some())
            .field("column_type", &self.column_type)
            .finish()
    }
}

// =============================================================================
// Built-in Column Types
// =============================================================================

/// Built-in logical column types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Bool,
    Int16,
    Int32,
    Int64,
    Float64,
    /// Fixed-width byte string, passed by reference
    FixedBytes(usize),
    /// UTF-8 text with a length header
    Text,
    /// Variable-length bytes with no ordering (no min/max statistics)
    Opaque,
}

impl ColumnType {
    /// Build the descriptor for this type at the given row position
    ///
    /// Panics on `FixedBytes(0)`; parsing a type name never produces it.
    pub fn descriptor(self, index: usize) -> ColumnDescriptor {
        assert!(
            self != ColumnType::FixedBytes(0),
            "column {}: fixed width must be positive",
            index
        );

        let (length, alignment, by_value, compare): (_, _, _, Option<CompareFn>) = match self {
            ColumnType::Bool => (ColumnLength::Fixed(1), Alignment::Char, true, Some(compare_bool)),
            ColumnType::Int16 => (ColumnLength::Fixed(2), Alignment::Short, true, Some(compare_i16)),
            ColumnType::Int32 => (ColumnLength::Fixed(4), Alignment::Int, true, Some(compare_i32)),
            ColumnType::Int64 => (ColumnLength::Fixed(8), Alignment::Double, true, Some(compare_i64)),
            ColumnType::Float64 => {
                (ColumnLength::Fixed(8), Alignment::Double, true, Some(compare_f64))
            }
            ColumnType::FixedBytes(n) => {
                (ColumnLength::Fixed(n), Alignment::Char, false, Some(compare_bytes))
            }
            ColumnType::Text => (ColumnLength::Variable, Alignment::Int, false, Some(compare_text)),
            ColumnType::Opaque => (ColumnLength::Variable, Alignment::Int, false, None),
        };

        ColumnDescriptor {
            index,
            length,
            alignment,
            by_value,
            compare,
            column_type: Some(self),
        }
    }
}

impl std::str::FromStr for ColumnType {
    type Err = StripeError;

    /// Parse names like `int4`, `text`, `bytes16`
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "bool" => Ok(ColumnType::Bool),
            "int2" | "int16" => Ok(ColumnType::Int16),
            "int4" | "int32" => Ok(ColumnType::Int32),
            "int8" | "int64" => Ok(ColumnType::Int64),
            "float8" | "float64" => Ok(ColumnType::Float64),
            "text" => Ok(ColumnType::Text),
            "opaque" => Ok(ColumnType::Opaque),
            other => match other.strip_prefix("bytes").map(str::parse::<usize>) {
                Some(Ok(n)) if n > 0 => Ok(ColumnType::FixedBytes(n)),
                _ => Err(StripeError::Config(format!("Unknown column type: {}", s))),
            },
        }
    }
}

// -----------------------------------------------------------------------------
// Comparison functions (datums are validated by the codec before comparison)
// -----------------------------------------------------------------------------

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&bytes[..N]);
    buf
}

fn compare_bool(a: &[u8], b: &[u8]) -> Ordering {
    (a[0] != 0).cmp(&(b[0] != 0))
}

fn compare_i16(a: &[u8], b: &[u8]) -> Ordering {
    i16::from_le_bytes(le_array(a)).cmp(&i16::from_le_bytes(le_array(b)))
}

fn compare_i32(a: &[u8], b: &[u8]) -> Ordering {
    i32::from_le_bytes(le_array(a)).cmp(&i32::from_le_bytes(le_array(b)))
}

fn compare_i64(a: &[u8], b: &[u8]) -> Ordering {
    i64::from_le_bytes(le_array(a)).cmp(&i64::from_le_bytes(le_array(b)))
}

fn compare_f64(a: &[u8], b: &[u8]) -> Ordering {
    f64::from_le_bytes(le_array(a)).total_cmp(&f64::from_le_bytes(le_array(b)))
}

fn compare_bytes(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

fn compare_text(a: &[u8], b: &[u8]) -> Ordering {
    a[VARLENA_HEADER_SIZE..].cmp(&b[VARLENA_HEADER_SIZE..])
}

// =============================================================================
// Schema
// =============================================================================

/// Ordered set of column descriptors
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<ColumnDescriptor>,
}

impl Schema {
    /// Build a schema from descriptors; indexes are reassigned to row positions
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(index, mut column)| {
                column.index = index;
                column
            })
            .collect();
        Self { columns }
    }

    /// Build a schema from built-in column types
    pub fn from_types(types: &[ColumnType]) -> Self {
        Self {
            columns: types
                .iter()
                .enumerate()
                .map(|(index, ty)| ty.descriptor(index))
                .collect(),
        }
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Panics if `index` is out of range
    pub fn column(&self, index: usize) -> &ColumnDescriptor {
        &self.columns[index]
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// =============================================================================
// Values
// =============================================================================

/// Convenience typed value for building rows of built-in column types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Bytes(Vec<u8>),
    Text(String),
}

impl Value {
    /// Encode into datum bytes for a column of `ty`; `None` for NULL
    pub fn encode(&self, ty: ColumnType) -> Result<Option<Vec<u8>>> {
        let datum = match (self, ty) {
            (Value::Null, _) => return Ok(None),
            (Value::Bool(v), ColumnType::Bool) => vec![*v as u8],
            (Value::Int16(v), ColumnType::Int16) => v.to_le_bytes().to_vec(),
            (Value::Int32(v), ColumnType::Int32) => v.to_le_bytes().to_vec(),
            (Value::Int64(v), ColumnType::Int64) => v.to_le_bytes().to_vec(),
            (Value::Float64(v), ColumnType::Float64) => v.to_le_bytes().to_vec(),
            (Value::Bytes(v), ColumnType::FixedBytes(n)) if v.len() == n => v.clone(),
            (Value::Text(s), ColumnType::Text | ColumnType::Opaque) => varlena(s.as_bytes()),
            (Value::Bytes(v), ColumnType::Opaque) => varlena(v),
            (value, ty) => {
                return Err(StripeError::InvalidValue(format!(
                    "{:?} cannot be stored in a {:?} column",
                    value, ty
                )))
            }
        };
        Ok(Some(datum))
    }

    /// Decode datum bytes of a column of `ty`
    pub fn decode(ty: ColumnType, datum: &[u8]) -> Result<Value> {
        let short = || {
            StripeError::Corruption(format!(
                "{} byte datum is too short for {:?}",
                datum.len(),
                ty
            ))
        };

        let value = match ty {
            ColumnType::Bool => Value::Bool(*datum.first().ok_or_else(short)? != 0),
            ColumnType::Int16 => Value::Int16(i16::from_le_bytes(fixed(datum).ok_or_else(short)?)),
            ColumnType::Int32 => Value::Int32(i32::from_le_bytes(fixed(datum).ok_or_else(short)?)),
            ColumnType::Int64 => Value::Int64(i64::from_le_bytes(fixed(datum).ok_or_else(short)?)),
            ColumnType::Float64 => {
                Value::Float64(f64::from_le_bytes(fixed(datum).ok_or_else(short)?))
            }
            ColumnType::FixedBytes(_) => Value::Bytes(datum.to_vec()),
            ColumnType::Text => {
                let payload = datum.get(VARLENA_HEADER_SIZE..).ok_or_else(short)?;
                let text = String::from_utf8(payload.to_vec())
                    .map_err(|e| StripeError::Corruption(format!("invalid UTF-8 text: {}", e)))?;
                Value::Text(text)
            }
            ColumnType::Opaque => {
                Value::Bytes(datum.get(VARLENA_HEADER_SIZE..).ok_or_else(short)?.to_vec())
            }
        };
        Ok(value)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Parse a text field for a column of `ty`; an empty field is NULL
    ///
    /// Fixed-width byte strings are written as hex, opaque values as raw text.
    pub fn parse(ty: ColumnType, field: &str) -> Result<Value> {
        if field.is_empty() {
            return Ok(Value::Null);
        }

        let invalid = |e: &dyn fmt::Display| {
            StripeError::InvalidValue(format!("{:?} field {:?}: {}", ty, field, e))
        };
        let value = match ty {
            ColumnType::Bool => Value::Bool(field.parse().map_err(|e| invalid(&e))?),
            ColumnType::Int16 => Value::Int16(field.parse().map_err(|e| invalid(&e))?),
            ColumnType::Int32 => Value::Int32(field.parse().map_err(|e| invalid(&e))?),
            ColumnType::Int64 => Value::Int64(field.parse().map_err(|e| invalid(&e))?),
            ColumnType::Float64 => Value::Float64(field.parse().map_err(|e| invalid(&e))?),
            ColumnType::FixedBytes(_) => Value::Bytes(parse_hex(field).map_err(|e| invalid(&e))?),
            ColumnType::Text => Value::Text(field.to_string()),
            ColumnType::Opaque => Value::Bytes(field.as_bytes().to_vec()),
        };
        Ok(value)
    }
}

/// Decode pairs of hex digits; any non-hex byte (multibyte UTF-8 included) is an error
fn parse_hex(field: &str) -> std::result::Result<Vec<u8>, String> {
    let digits = field.as_bytes();
    if digits.len() % 2 != 0 {
        return Err("odd number of hex digits".to_string());
    }

    digits
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16);
            let lo = (pair[1] as char).to_digit(16);
            match (hi, lo) {
                (Some(hi), Some(lo)) => Ok((hi * 16 + lo) as u8),
                _ => Err("invalid hex digit".to_string()),
            }
        })
        .collect()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Bytes(v) => {
                for b in v {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Prefix `payload` with its variable-length header
pub fn varlena(payload: &[u8]) -> Vec<u8> {
    let total = (payload.len() + VARLENA_HEADER_SIZE) as u32;
    let mut datum = Vec::with_capacity(total as usize);
    datum.extend_from_slice(&total.to_le_bytes());
    datum.extend_from_slice(payload);
    datum
}

fn fixed<const N: usize>(datum: &[u8]) -> Option<[u8; N]> {
    datum.get(..N)?.try_into().ok()
}
