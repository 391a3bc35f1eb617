use anyhow::Result;
use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::{string_pool::StringPool, NONE_REF};

/// The 8-byte `Res_value` record: `size:u16, res0:u8, dataType:u8, data:u32`.
///
/// When the data type is STRING the value keeps hold of the referenced string
/// itself, captured from the pool as it looked at parse time. Serialization
/// re-resolves the string against the current pool layout, so appending to the
/// pool (or growing the resource map) never dangles a value.
#[derive(Debug, Clone)]
pub struct ResValue {
    pub size: u16,
    pub res0: u8,
    pub data_type: u8,
    data: u32,
    string: Option<String>,
}

impl ResValue {
    pub const TYPE_NULL: u8 = 0x00;
    /// A reference to another resource table entry.
    pub const TYPE_REFERENCE: u8 = 0x01;
    /// An attribute resource identifier.
    pub const TYPE_ATTRIBUTE: u8 = 0x02;
    /// An index into the document's string pool.
    pub const TYPE_STRING: u8 = 0x03;
    pub const TYPE_FLOAT: u8 = 0x04;
    /// A complex number encoding a dimension value, such as "100in".
    pub const TYPE_DIMENSION: u8 = 0x05;
    /// A complex number encoding a fraction of a container.
    pub const TYPE_FRACTION: u8 = 0x06;
    pub const TYPE_INT_DEC: u8 = 0x10;
    pub const TYPE_INT_HEX: u8 = 0x11;
    /// 0 or 0xFFFFFFFF, for "false" and "true".
    pub const TYPE_INT_BOOLEAN: u8 = 0x12;
    pub const TYPE_INT_COLOR_ARGB8: u8 = 0x1c;
    pub const TYPE_INT_COLOR_RGB8: u8 = 0x1d;
    pub const TYPE_INT_COLOR_ARGB4: u8 = 0x1e;
    pub const TYPE_INT_COLOR_RGB4: u8 = 0x1f;

    pub(crate) fn parse(r: &mut &[u8], pool: &StringPool) -> Result<ResValue> {
        let size = r.read_u16::<LE>()?;
        let res0 = r.read_u8()?;
        let data_type = r.read_u8()?;
        let data = r.read_u32::<LE>()?;

        let string = if data_type == Self::TYPE_STRING && data != NONE_REF {
            Some(pool.original_string(data)?.to_owned())
        } else {
            None
        };

        Ok(ResValue {
            size,
            res0,
            data_type,
            data,
            string,
        })
    }

    pub fn string(value: impl Into<String>) -> ResValue {
        ResValue {
            size: 8,
            res0: 0,
            data_type: Self::TYPE_STRING,
            data: NONE_REF,
            string: Some(value.into()),
        }
    }

    pub fn boolean(value: bool) -> ResValue {
        ResValue {
            size: 8,
            res0: 0,
            data_type: Self::TYPE_INT_BOOLEAN,
            data: if value { NONE_REF } else { 0 },
            string: None,
        }
    }

    pub fn integer(value: i32) -> ResValue {
        ResValue {
            size: 8,
            res0: 0,
            data_type: Self::TYPE_INT_DEC,
            data: value as u32,
            string: None,
        }
    }

    /// The raw 32-bit payload as stored, with no pool resolution.
    pub fn raw_data(&self) -> u32 {
        self.data
    }

    /// The 32-bit payload as it will be serialized: for STRING values with an
    /// attached string this is the string's index in the current pool layout,
    /// otherwise the raw payload.
    pub fn data(&self, pool: &StringPool) -> Result<u32> {
        match &self.string {
            Some(s) if self.data_type == Self::TYPE_STRING => pool.string_ref(s),
            _ => Ok(self.data),
        }
    }

    /// Replaces the payload. For STRING values the attached string is rebound
    /// to the pool entry the new index denoted at load time.
    pub fn set_data(&mut self, data: u32, pool: &StringPool) -> Result<()> {
        self.data = data;
        if self.data_type == Self::TYPE_STRING && data != NONE_REF {
            self.string = Some(pool.original_string(data)?.to_owned());
        }
        Ok(())
    }

    /// Turns the value into a STRING pointing at `value`, appending it to the
    /// pool if it is not already present.
    pub fn set_string(&mut self, value: &str, pool: &mut StringPool) {
        let idx = pool.ensure(value);
        self.data_type = Self::TYPE_STRING;
        self.data = idx;
        self.string = Some(value.to_owned());
    }

    /// A human-readable rendering of the payload.
    pub fn value(&self, pool: &StringPool) -> Result<String> {
        Ok(match self.data_type {
            Self::TYPE_INT_DEC => (self.data as i32).to_string(),
            Self::TYPE_INT_BOOLEAN => {
                if self.data != 0 {
                    "true".to_owned()
                } else {
                    "false".to_owned()
                }
            }
            Self::TYPE_STRING => match &self.string {
                Some(s) => s.clone(),
                None => pool.string_at(self.data)?.to_owned(),
            },
            _ => format!("@{:08x}", self.data),
        })
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>, pool: &StringPool) -> Result<()> {
        out.write_u16::<LE>(self.size)?;
        out.write_u8(self.res0)?;
        out.write_u8(self.data_type)?;
        out.write_u32::<LE>(self.data(pool)?)?;
        Ok(())
    }
}

/// A 32-bit index into the string pool, `0xFFFFFFFF` meaning "none".
///
/// Like [`ResValue`], the referenced string is captured by value at parse time
/// and re-resolved against the pool when serializing.
#[derive(Debug, Clone)]
pub struct ResourceRef {
    raw: u32,
    value: Option<String>,
}

impl ResourceRef {
    pub(crate) fn parse(r: &mut &[u8], pool: &StringPool) -> Result<ResourceRef> {
        let raw = r.read_u32::<LE>()?;
        let value = if raw == NONE_REF {
            None
        } else {
            Some(pool.original_string(raw)?.to_owned())
        };
        Ok(ResourceRef { raw, value })
    }

    pub fn none() -> ResourceRef {
        ResourceRef {
            raw: NONE_REF,
            value: None,
        }
    }

    pub fn from_value(value: impl Into<String>) -> ResourceRef {
        ResourceRef {
            raw: NONE_REF,
            value: Some(value.into()),
        }
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// The index this reference serializes to under the current pool layout.
    pub fn resolve(&self, pool: &StringPool) -> Result<u32> {
        match &self.value {
            Some(s) => pool.string_ref(s),
            None => Ok(NONE_REF),
        }
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>, pool: &StringPool) -> Result<()> {
        out.write_u32::<LE>(self.resolve(pool)?)?;
        Ok(())
    }
}

/// Attribute value kinds observed in manifests. Only strings, booleans and
/// integers can be used to construct new attributes; the other kinds occur
/// when reading existing documents.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    Boolean(bool),
    Integer(i32),
    Reference(u32),
    Float(f32),
}
