//! Query result row operation.
//!
//! - [`Row`]
//! - [`Field`]
//! - [`Column`]
//! - [`Decode`]
//! - [`Index`]
//! - [`DecodeError`]
use bytes::{Buf, Bytes};
use std::{borrow::Cow, fmt, str::Utf8Error, string::FromUtf8Error, sync::Arc};

use crate::{
    common::ByteStr,
    ext::{BytesExt, FmtExt},
    vertica::{Oid, ProtocolError},
};

/// Description of one result column, parsed from `RowDescription`.
#[derive(Debug, Clone)]
pub struct Field {
    name: ByteStr,
    oid: Oid,
}

impl Field {
    /// Parse the full `RowDescription` body into a shared field list.
    ///
    /// The list is shared by every [`Row`] of the result set.
    pub(crate) fn parse_all(mut body: Bytes) -> Result<Arc<[Field]>, crate::Error> {
        let len = body.get_i16();
        let mut fields = Vec::with_capacity(len as usize);
        for _ in 0..len {
            let name = body.get_nul_bytestr().map_err(ProtocolError::non_utf8)?;
            let _table_oid = body.get_i32();
            let _attribute = body.get_i16();
            let oid = body.get_u32();
            let _type_size = body.get_i16();
            let _type_modifier = body.get_i32();
            let _format_code = body.get_i16();
            fields.push(Field { name, oid });
        }
        Ok(fields.into())
    }

    /// Returns the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field data type [`Oid`].
    pub fn oid(&self) -> Oid {
        self.oid
    }
}

/// One result row.
///
/// Values stay in the raw `DataRow` body and are decoded on access; the
/// row does not outlive the call that produced it in any cached form.
pub struct Row {
    fields: Arc<[Field]>,
    values: Bytes,
}

impl Row {
    /// `body` is a `DataRow` body, value count included.
    pub(crate) fn new(fields: Arc<[Field]>, mut body: Bytes) -> Self {
        assert_eq!(
            fields.len(),
            body.get_i16() as usize,
            "RowDescription len missmatch with DataRow len"
        );
        Self { fields, values: body }
    }

    /// Returns `true` if row contains no columns.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns the column descriptions, in result order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Try get and decode a column by position or name.
    pub fn try_get<I: Index, R: Decode>(&self, idx: I) -> Result<R, DecodeError> {
        let nth = idx.position(&self.fields)?;

        let mut values = self.values.clone();
        let mut value = None;
        for _ in 0..=nth {
            let len = values.get_i32();
            value = match len {
                -1 => None,
                _ => Some(values.split_to(len as usize)),
            };
        }

        R::decode(Column { field: self.fields[nth].clone(), value })
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_map();
        let mut values = self.values.clone();
        for field in &self.fields[..] {
            dbg.key(&field.name);
            match values.get_i32() {
                -1 => dbg.value(&format_args!("NULL")),
                len => dbg.value(&values.split_to(len as usize).lossy()),
            };
        }
        dbg.finish()
    }
}

/// One value of a [`Row`] with its [`Field`] metadata.
#[derive(Debug, Clone)]
pub struct Column {
    field: Field,
    value: Option<Bytes>,
}

impl Column {
    /// Returns the column name.
    pub fn name(&self) -> &str {
        self.field.name()
    }

    /// Returns the column data type [`Oid`].
    pub fn oid(&self) -> Oid {
        self.field.oid()
    }

    /// Return `true` if value is NULL.
    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// Extract the inner bytes as slice.
    ///
    /// Returns [`None`] if value is `NULL`.
    pub fn as_slice(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    /// The text of the value, simple query results are always transmitted
    /// in text format.
    ///
    /// Returns [`None`] if value is `NULL`.
    pub fn as_str(&self) -> Result<Option<&str>, DecodeError> {
        match &self.value {
            Some(b) => Ok(Some(std::str::from_utf8(b)?)),
            None => Ok(None),
        }
    }

    /// The text of the value, erroring on `NULL`.
    pub fn try_as_str(&self) -> Result<&str, DecodeError> {
        self.as_str()?.ok_or(DecodeError::Null)
    }

    /// Try decode type using [`Decode`] implementation.
    pub fn decode<D: Decode>(self) -> Result<D, DecodeError> {
        D::decode(self)
    }
}

// ===== Traits =====

/// A type that can be constructed from a [`Column`].
///
/// Values arrive in text format, implementations parse the text.
pub trait Decode: Sized {
    /// Try decode self from column.
    fn decode(column: Column) -> Result<Self, DecodeError>;
}

impl Decode for Column {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        Ok(column)
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        match column.is_null() {
            true => Ok(None),
            false => column.decode().map(Some),
        }
    }
}

impl Decode for String {
    fn decode(col: Column) -> Result<Self, DecodeError> {
        Ok(col.try_as_str()?.to_owned())
    }
}

macro_rules! decode_parse {
    ($($ty:ty => $name:literal,)*) => {$(
        impl Decode for $ty {
            fn decode(col: Column) -> Result<Self, DecodeError> {
                let text = col.try_as_str()?;
                text.parse().map_err(|_| DecodeError::Parse {
                    ty: $name,
                    value: text.to_owned(),
                })
            }
        }
    )*};
}

decode_parse! {
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    u64 => "u64",
    f64 => "f64",
}

impl Decode for bool {
    fn decode(col: Column) -> Result<Self, DecodeError> {
        match col.try_as_str()? {
            "t" | "true" | "1" => Ok(true),
            "f" | "false" | "0" => Ok(false),
            text => Err(DecodeError::Parse { ty: "bool", value: text.to_owned() }),
        }
    }
}

/// Type that can be used for indexing column.
pub trait Index: Sized + sealed::Sealed {
    /// Returns the position of the column.
    fn position(self, fields: &[Field]) -> Result<usize, DecodeError>;
}

impl Index for usize {
    fn position(self, fields: &[Field]) -> Result<usize, DecodeError> {
        match self < fields.len() {
            true => Ok(self),
            false => Err(DecodeError::IndexOutOfBounds(self)),
        }
    }
}

impl Index for &str {
    fn position(self, fields: &[Field]) -> Result<usize, DecodeError> {
        fields
            .iter()
            .position(|f| f.name() == self)
            .ok_or_else(|| DecodeError::ColumnNotFound(self.to_owned().into()))
    }
}

mod sealed {
    pub trait Sealed { }
    impl Sealed for usize { }
    impl Sealed for &str { }
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for DecodeError {
            fn from($pat: $ty) -> Self {
                $body
            }
        }
    };
}

/// An error when decoding row value.
pub enum DecodeError {
    /// The server returned non utf8 text.
    Utf8(Utf8Error),
    /// Column requested not found.
    ColumnNotFound(Cow<'static, str>),
    /// Index requested is out of bounds.
    IndexOutOfBounds(usize),
    /// Failed to parse the text representation.
    Parse {
        ty: &'static str,
        value: String,
    },
    /// Value is null.
    Null,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to decode value, ")?;
        match self {
            Self::Utf8(e) => write!(f, "{e}"),
            Self::ColumnNotFound(name) => write!(f, "column not found: {name:?}"),
            Self::IndexOutOfBounds(u) => write!(f, "index out of bounds: {u:?}"),
            Self::Parse { ty, value } => write!(f, "invalid {ty}: {value:?}"),
            Self::Null => write!(f, "unexpected NULL value"),
        }
    }
}

from!(<Utf8Error>e => Self::Utf8(e));
from!(<FromUtf8Error>e => Self::Utf8(e.utf8_error()));

impl std::error::Error for DecodeError { }

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::ext::BufMutExt;

    fn description(names: &[&str]) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_i16(names.len() as i16);
        for name in names {
            buf.put_nul_string(name);
            buf.put_i32(0);
            buf.put_i16(0);
            buf.put_u32(6);
            buf.put_i16(8);
            buf.put_i32(-1);
            buf.put_i16(0);
        }
        buf.freeze()
    }

    fn data_row(values: &[Option<&str>]) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_i16(values.len() as i16);
        for value in values {
            match value {
                Some(v) => {
                    buf.put_i32(v.len() as i32);
                    buf.put(v.as_bytes());
                },
                None => buf.put_i32(-1),
            }
        }
        buf.freeze()
    }

    #[test]
    fn get_by_name_and_position() {
        let fields = Field::parse_all(description(&["id", "name", "deleted_at"])).unwrap();
        let row = Row::new(fields, data_row(&[Some("42"), Some("forty two"), None]));

        assert_eq!(row.len(), 3);
        assert_eq!(row.try_get::<_, i32>("id").unwrap(), 42);
        assert_eq!(row.try_get::<_, String>(1).unwrap(), "forty two");
        assert_eq!(row.try_get::<_, Option<String>>("deleted_at").unwrap(), None);

        let err = row.try_get::<_, String>("nope").unwrap_err();
        assert!(matches!(err, DecodeError::ColumnNotFound(_)));
        let err = row.try_get::<_, String>(3).unwrap_err();
        assert!(matches!(err, DecodeError::IndexOutOfBounds(3)));
    }

    #[test]
    fn null_and_parse_errors() {
        let fields = Field::parse_all(description(&["n"])).unwrap();
        let row = Row::new(fields.clone(), data_row(&[None]));
        assert!(matches!(row.try_get::<_, i64>(0), Err(DecodeError::Null)));

        let row = Row::new(fields, data_row(&[Some("abc")]));
        assert!(matches!(
            row.try_get::<_, i64>(0),
            Err(DecodeError::Parse { ty: "i64", .. })
        ));
    }

    #[test]
    fn bool_text_forms() {
        let fields = Field::parse_all(description(&["b"])).unwrap();
        for (text, expect) in [("t", true), ("f", false), ("1", true), ("0", false)] {
            let row = Row::new(fields.clone(), data_row(&[Some(text)]));
            assert_eq!(row.try_get::<_, bool>(0).unwrap(), expect);
        }
    }
}
