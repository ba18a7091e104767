//! Output builder shared by the byte-view aggregate functions.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BinaryBuilder, Decimal128Builder, Decimal256Builder, FixedSizeBinaryBuilder,
    LargeBinaryBuilder, LargeStringBuilder, StringBuilder,
};
use arrow::datatypes::DataType;
use arrow_buffer::i256;
use keyfold_result::{Error, Result};

/// Builder over any byte-view output type. Values arrive as the byte views
/// produced by `BytesCursor` (decimals as little-endian unscaled words) and
/// are re-encoded into the concrete representation here.
pub(crate) enum ByteColumnBuilder {
    Utf8(StringBuilder),
    LargeUtf8(LargeStringBuilder),
    Binary(BinaryBuilder),
    LargeBinary(LargeBinaryBuilder),
    FixedSize(FixedSizeBinaryBuilder),
    Decimal128(Decimal128Builder),
    Decimal256(Decimal256Builder),
}

impl ByteColumnBuilder {
    pub(crate) fn with_capacity(data_type: &DataType, capacity: usize) -> Result<Self> {
        Ok(match data_type {
            DataType::Utf8 => ByteColumnBuilder::Utf8(StringBuilder::with_capacity(capacity, 0)),
            DataType::LargeUtf8 => {
                ByteColumnBuilder::LargeUtf8(LargeStringBuilder::with_capacity(capacity, 0))
            }
            DataType::Binary => {
                ByteColumnBuilder::Binary(BinaryBuilder::with_capacity(capacity, 0))
            }
            DataType::LargeBinary => {
                ByteColumnBuilder::LargeBinary(LargeBinaryBuilder::with_capacity(capacity, 0))
            }
            DataType::FixedSizeBinary(width) => {
                ByteColumnBuilder::FixedSize(FixedSizeBinaryBuilder::with_capacity(capacity, *width))
            }
            DataType::Decimal128(_, _) => ByteColumnBuilder::Decimal128(
                Decimal128Builder::with_capacity(capacity).with_data_type(data_type.clone()),
            ),
            DataType::Decimal256(_, _) => ByteColumnBuilder::Decimal256(
                Decimal256Builder::with_capacity(capacity).with_data_type(data_type.clone()),
            ),
            other => {
                return Err(Error::UnsupportedType(format!(
                    "{other} is not a byte-view column type"
                )));
            }
        })
    }

    pub(crate) fn append_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        match self {
            ByteColumnBuilder::Utf8(b) => b.append_value(utf8_view(bytes)?),
            ByteColumnBuilder::LargeUtf8(b) => b.append_value(utf8_view(bytes)?),
            ByteColumnBuilder::Binary(b) => b.append_value(bytes),
            ByteColumnBuilder::LargeBinary(b) => b.append_value(bytes),
            ByteColumnBuilder::FixedSize(b) => b.append_value(bytes)?,
            ByteColumnBuilder::Decimal128(b) => {
                let words: [u8; 16] = bytes.try_into().map_err(|_| {
                    Error::Internal("decimal128 byte view must hold 16 bytes".into())
                })?;
                b.append_value(i128::from_le_bytes(words));
            }
            ByteColumnBuilder::Decimal256(b) => {
                let words: [u8; 32] = bytes.try_into().map_err(|_| {
                    Error::Internal("decimal256 byte view must hold 32 bytes".into())
                })?;
                b.append_value(i256::from_le_bytes(words));
            }
        }
        Ok(())
    }

    pub(crate) fn append_null(&mut self) {
        match self {
            ByteColumnBuilder::Utf8(b) => b.append_null(),
            ByteColumnBuilder::LargeUtf8(b) => b.append_null(),
            ByteColumnBuilder::Binary(b) => b.append_null(),
            ByteColumnBuilder::LargeBinary(b) => b.append_null(),
            ByteColumnBuilder::FixedSize(b) => b.append_null(),
            ByteColumnBuilder::Decimal128(b) => b.append_null(),
            ByteColumnBuilder::Decimal256(b) => b.append_null(),
        }
    }

    pub(crate) fn finish(&mut self) -> ArrayRef {
        match self {
            ByteColumnBuilder::Utf8(b) => Arc::new(b.finish()),
            ByteColumnBuilder::LargeUtf8(b) => Arc::new(b.finish()),
            ByteColumnBuilder::Binary(b) => Arc::new(b.finish()),
            ByteColumnBuilder::LargeBinary(b) => Arc::new(b.finish()),
            ByteColumnBuilder::FixedSize(b) => Arc::new(b.finish()),
            ByteColumnBuilder::Decimal128(b) => Arc::new(b.finish()),
            ByteColumnBuilder::Decimal256(b) => Arc::new(b.finish()),
        }
    }
}

fn utf8_view(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes)
        .map_err(|_| Error::Internal("utf8 column held non-utf8 bytes".into()))
}
