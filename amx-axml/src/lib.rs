//! Library to parse, edit and save the Android binary XML format.
//! Used for modifying compiled resources such as the APK manifest in place:
//! the document is read as a stream of chunk events, individual attributes and
//! strings can be changed or new elements spliced in, and the result is
//! serialized back to a byte-compatible document.

mod axml2xml;
mod chunk;
mod document;
mod element;
mod res_ids;
mod res_map;
mod string_pool;
mod value;

pub use axml2xml::axml_to_xml;
pub use chunk::ChunkHeader;
pub use document::{AxmlDocument, ElementMut, Event, Inserter, NodeId};
pub use element::{Attribute, XmlElement, XmlEndElement, XmlNamespace};
pub use res_ids::{attr_ids, AttrIds};
pub use res_map::ResourceMap;
pub use string_pool::StringPool;
pub use value::{AttributeValue, ResValue, ResourceRef};

pub const ANDROID_NS_URI: &str = "http://schemas.android.com/apk/res/android";

/// Reference value meaning "no string" wherever a string-pool index is expected.
pub const NONE_REF: u32 = 0xFFFF_FFFF;

/// String pool `flags` bit: entries are encoded as UTF-8 rather than UTF-16.
pub(crate) const UTF8_FLAG: u32 = 1 << 8;

/// The chunk type codes this library understands. Chunks carrying any other
/// code are preserved verbatim but not interpreted.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ChunkType {
    StringPool,
    Xml,
    XmlStartNamespace,
    XmlEndNamespace,
    XmlStartElement,
    XmlEndElement,
    XmlCdata,
    XmlResourceMap,
}

impl ChunkType {
    pub fn parse(from: u16) -> Option<Self> {
        match from {
            0x0001 => Some(Self::StringPool),
            0x0003 => Some(Self::Xml),
            0x0100 => Some(Self::XmlStartNamespace),
            0x0101 => Some(Self::XmlEndNamespace),
            0x0102 => Some(Self::XmlStartElement),
            0x0103 => Some(Self::XmlEndElement),
            0x0104 => Some(Self::XmlCdata),
            0x0180 => Some(Self::XmlResourceMap),
            _ => None,
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::StringPool => 0x0001,
            Self::Xml => 0x0003,
            Self::XmlStartNamespace => 0x0100,
            Self::XmlEndNamespace => 0x0101,
            Self::XmlStartElement => 0x0102,
            Self::XmlEndElement => 0x0103,
            Self::XmlCdata => 0x0104,
            Self::XmlResourceMap => 0x0180,
        }
    }
}
