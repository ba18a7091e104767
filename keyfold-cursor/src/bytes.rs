//! Shared byte-view cursor for variable-length and decimal columns.

use std::borrow::Cow;

use arrow::array::{
    Array, ArrayRef, BinaryArray, Decimal128Array, Decimal256Array, FixedSizeBinaryArray,
    LargeBinaryArray, LargeStringArray, StringArray, new_empty_array,
};
use arrow::datatypes::DataType;
use keyfold_result::{Error, Result};

use crate::Cursor;

enum ByteRepr {
    Utf8(StringArray),
    LargeUtf8(LargeStringArray),
    Binary(BinaryArray),
    LargeBinary(LargeBinaryArray),
    FixedSize(FixedSizeBinaryArray),
    Decimal128(Decimal128Array),
    Decimal256(Decimal256Array),
}

impl ByteRepr {
    fn from_array(array: &ArrayRef) -> Result<Self> {
        macro_rules! downcast {
            ($variant:ident, $array_ty:ty) => {
                array
                    .as_any()
                    .downcast_ref::<$array_ty>()
                    .map(|a| ByteRepr::$variant(a.clone()))
                    .ok_or_else(|| {
                        Error::Internal(format!(
                            "byte cursor expected a {} array, found a different representation",
                            array.data_type()
                        ))
                    })
            };
        }
        match array.data_type() {
            DataType::Utf8 => downcast!(Utf8, StringArray),
            DataType::LargeUtf8 => downcast!(LargeUtf8, LargeStringArray),
            DataType::Binary => downcast!(Binary, BinaryArray),
            DataType::LargeBinary => downcast!(LargeBinary, LargeBinaryArray),
            DataType::FixedSizeBinary(_) => downcast!(FixedSize, FixedSizeBinaryArray),
            DataType::Decimal128(_, _) => downcast!(Decimal128, Decimal128Array),
            DataType::Decimal256(_, _) => downcast!(Decimal256, Decimal256Array),
            other => Err(Error::UnsupportedType(format!(
                "{other} is not a byte-view column type"
            ))),
        }
    }

    fn as_array(&self) -> &dyn Array {
        match self {
            ByteRepr::Utf8(a) => a,
            ByteRepr::LargeUtf8(a) => a,
            ByteRepr::Binary(a) => a,
            ByteRepr::LargeBinary(a) => a,
            ByteRepr::FixedSize(a) => a,
            ByteRepr::Decimal128(a) => a,
            ByteRepr::Decimal256(a) => a,
        }
    }
}

/// Cursor over any column whose values can be viewed as byte strings:
/// utf8, binary, their large variants, fixed-size binary, and decimals.
///
/// Decimal values expose the little-endian bytes of their unscaled integer,
/// so byte-wise comparison and replay of decimal values is exact, if not
/// numerically ordered.
pub struct BytesCursor {
    repr: ByteRepr,
    pos: usize,
}

impl BytesCursor {
    /// Create a detached cursor for the given byte-view type.
    pub fn new(data_type: &DataType) -> Result<Self> {
        Ok(Self {
            repr: ByteRepr::from_array(&new_empty_array(data_type))?,
            pos: 0,
        })
    }

    /// View the bytes at an arbitrary index. Decimal views are materialized;
    /// all other representations borrow from the array.
    pub fn bytes_at(&self, idx: usize) -> Cow<'_, [u8]> {
        match &self.repr {
            ByteRepr::Utf8(a) => Cow::Borrowed(a.value(idx).as_bytes()),
            ByteRepr::LargeUtf8(a) => Cow::Borrowed(a.value(idx).as_bytes()),
            ByteRepr::Binary(a) => Cow::Borrowed(a.value(idx)),
            ByteRepr::LargeBinary(a) => Cow::Borrowed(a.value(idx)),
            ByteRepr::FixedSize(a) => Cow::Borrowed(a.value(idx)),
            ByteRepr::Decimal128(a) => Cow::Owned(a.value(idx).to_le_bytes().to_vec()),
            ByteRepr::Decimal256(a) => Cow::Owned(a.value(idx).to_le_bytes().to_vec()),
        }
    }

    /// View the bytes at the cursor position and advance.
    pub fn next_bytes(&mut self) -> Cow<'_, [u8]> {
        let idx = self.pos;
        self.pos += 1;
        self.bytes_at(idx)
    }
}

impl Cursor for BytesCursor {
    fn attach(&mut self, array: &ArrayRef) -> Result<()> {
        self.repr = ByteRepr::from_array(array)?;
        self.pos = 0;
        Ok(())
    }

    #[inline]
    fn len(&self) -> usize {
        self.repr.as_array().len()
    }

    #[inline]
    fn has_more(&self) -> bool {
        self.pos < self.len()
    }

    #[inline]
    fn non_null_count(&self) -> usize {
        let array = self.repr.as_array();
        array.len() - array.null_count()
    }

    #[inline]
    fn is_null(&self) -> bool {
        self.pos < self.len() && self.repr.as_array().is_null(self.pos)
    }

    #[inline]
    fn is_null_at(&self, idx: usize) -> bool {
        self.repr.as_array().is_null(idx)
    }

    #[inline]
    fn advance(&mut self) {
        self.pos += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn string_values_view_as_bytes() {
        let array: ArrayRef = Arc::new(StringArray::from(vec![Some("b"), None, Some("a")]));
        let mut cursor = BytesCursor::new(&DataType::Utf8).unwrap();
        cursor.attach(&array).unwrap();
        assert!(!cursor.next_if_null());
        assert_eq!(cursor.next_bytes().as_ref(), b"b");
        assert!(cursor.next_if_null());
        assert_eq!(cursor.bytes_at(2).as_ref(), b"a");
    }

    #[test]
    fn decimal_views_round_trip_through_le_bytes() {
        let array: ArrayRef = Arc::new(
            Decimal128Array::from(vec![-5i128, 123])
                .with_precision_and_scale(10, 2)
                .unwrap(),
        );
        let mut cursor = BytesCursor::new(array.data_type()).unwrap();
        cursor.attach(&array).unwrap();
        let bytes = cursor.bytes_at(0);
        assert_eq!(i128::from_le_bytes(bytes.as_ref().try_into().unwrap()), -5);
    }

    #[test]
    fn rejects_non_byte_view_types() {
        assert!(BytesCursor::new(&DataType::Int32).is_err());
    }
}
