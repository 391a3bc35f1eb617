use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::{
    chunk::ChunkHeader,
    string_pool::StringPool,
    value::{AttributeValue, ResValue, ResourceRef},
    ChunkType, NONE_REF,
};

/// The line-number record shared by all XML tree chunks:
/// `lineNumber:u32, commentRef:u32`.
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub line_number: u32,
    pub comment: u32,
}

impl XmlNode {
    fn parse(r: &mut &[u8]) -> Result<XmlNode> {
        Ok(XmlNode {
            line_number: r.read_u32::<LE>()?,
            comment: r.read_u32::<LE>()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.write_u32::<LE>(self.line_number)?;
        out.write_u32::<LE>(self.comment)?;
        Ok(())
    }
}

/// A single attribute record:
/// `ns:ref, name:ref, rawValueRef:u32, typedValue:Res_value`.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub ns: ResourceRef,
    pub name: ResourceRef,
    raw_value: u32,
    pub typed_value: ResValue,
    // Bytes past the 20-byte record when the element declares a wider stride.
    extra: Vec<u8>,
}

impl Attribute {
    fn parse(record: &[u8], pool: &StringPool) -> Result<Attribute> {
        let mut r = record;
        let ns = ResourceRef::parse(&mut r, pool)?;
        let name = ResourceRef::parse(&mut r, pool)?;
        let raw_value = r.read_u32::<LE>()?;
        let typed_value = ResValue::parse(&mut r, pool)?;
        Ok(Attribute {
            ns,
            name,
            raw_value,
            typed_value,
            extra: r.to_vec(),
        })
    }

    /// Builds an attribute from a dynamically typed value. Only strings,
    /// booleans and integers can be synthesized.
    pub fn make(ns: ResourceRef, name: ResourceRef, value: &AttributeValue) -> Result<Attribute> {
        let typed_value = match value {
            AttributeValue::String(s) => ResValue::string(s.clone()),
            AttributeValue::Boolean(b) => ResValue::boolean(*b),
            AttributeValue::Integer(i) => ResValue::integer(*i),
            AttributeValue::Reference(_) | AttributeValue::Float(_) => {
                bail!("attribute values of this type are not supported")
            }
        };
        Ok(Attribute {
            ns,
            name,
            raw_value: NONE_REF,
            typed_value,
            extra: Vec::new(),
        })
    }

    /// The attribute as it would appear in manifest text, e.g.
    /// `android:versionCode`. `namespaces` maps namespace uri to prefix.
    pub fn qualified_name(&self, namespaces: &HashMap<String, String>) -> Option<String> {
        let name = self.name.value()?;
        match self.ns.value().and_then(|uri| namespaces.get(uri)) {
            Some(prefix) => Some(format!("{prefix}:{name}")),
            None => Some(name.to_owned()),
        }
    }

    fn size(&self) -> usize {
        20 + self.extra.len()
    }

    fn write(&self, out: &mut Vec<u8>, pool: &StringPool) -> Result<()> {
        self.ns.write(out, pool)?;
        self.name.write(out, pool)?;
        // The raw value shadows the typed value for strings.
        let raw_value = if self.typed_value.data_type == ResValue::TYPE_STRING {
            self.typed_value.data(pool)?
        } else {
            self.raw_value
        };
        out.write_u32::<LE>(raw_value)?;
        self.typed_value.write(out, pool)?;
        out.extend_from_slice(&self.extra);
        Ok(())
    }
}

/// A start-element chunk: line-number record, attribute extent and the
/// attribute records themselves.
pub struct XmlElement {
    header: ChunkHeader,
    node: XmlNode,
    ns: ResourceRef,
    name: ResourceRef,
    attribute_start: u16,
    attribute_size: u16,
    id_index: u16,
    class_index: u16,
    style_index: u16,
    pub attributes: Vec<Attribute>,
}

impl XmlElement {
    pub(crate) fn parse(chunk: &[u8], pool: &StringPool) -> Result<XmlElement> {
        let (header, body, _) = ChunkHeader::parse(chunk)?;
        if header.header_size < 16 {
            bail!("element header is {} bytes, expected 16", header.header_size);
        }
        let mut node_r = &chunk[8..16];
        let node = XmlNode::parse(&mut node_r)?;

        let mut r = body;
        let ns = ResourceRef::parse(&mut r, pool)?;
        let name = ResourceRef::parse(&mut r, pool)?;
        let attribute_start = r.read_u16::<LE>()?;
        let attribute_size = r.read_u16::<LE>()?;
        let attribute_count = r.read_u16::<LE>()?;
        let id_index = r.read_u16::<LE>()?;
        let class_index = r.read_u16::<LE>()?;
        let style_index = r.read_u16::<LE>()?;

        if attribute_count > 0 && (attribute_size as usize) < 20 {
            bail!("attribute stride {attribute_size} is smaller than the record");
        }
        let mut attributes = Vec::with_capacity(attribute_count as usize);
        let first = header.header_size as usize + attribute_start as usize;
        for i in 0..attribute_count as usize {
            let at = first + i * attribute_size as usize;
            let end = at + attribute_size as usize;
            if end > chunk.len() {
                bail!("attribute record {i} runs past end of chunk");
            }
            attributes.push(Attribute::parse(&chunk[at..end], pool)?);
        }

        Ok(XmlElement {
            header,
            node,
            ns,
            name,
            attribute_start,
            attribute_size,
            id_index,
            class_index,
            style_index,
            attributes,
        })
    }

    /// A fresh start-element chunk for splicing into a document.
    pub(crate) fn synthesize(name: &str, line_number: u32) -> XmlElement {
        XmlElement {
            header: ChunkHeader::synthesize(ChunkType::XmlStartElement, 16),
            node: XmlNode {
                line_number,
                comment: NONE_REF,
            },
            ns: ResourceRef::none(),
            name: ResourceRef::from_value(name),
            attribute_start: 20,
            attribute_size: 20,
            id_index: 0,
            class_index: 0,
            style_index: 0,
            attributes: Vec::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.value()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.ns.value()
    }

    pub fn line_number(&self) -> u32 {
        self.node.line_number
    }

    /// Appends an attribute, padding it out to this element's stride.
    pub fn push_attribute(&mut self, mut attribute: Attribute) {
        let stride = (self.attribute_size as usize).max(20);
        attribute.extra.resize(stride - 20, 0);
        self.attributes.push(attribute);
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>, pool: &StringPool) -> Result<()> {
        let attrs_len: usize = self.attributes.iter().map(Attribute::size).sum();
        let chunk_size = self.header.header_size as usize + 20 + attrs_len;

        self.header.write(out, chunk_size as u32)?;
        self.node.write(out)?;
        self.header.write_raw_tail_from(out, 16);
        self.ns.write(out, pool)?;
        self.name.write(out, pool)?;
        out.write_u16::<LE>(self.attribute_start)?;
        out.write_u16::<LE>(self.attribute_size)?;
        out.write_u16::<LE>(
            self.attributes
                .len()
                .try_into()
                .context("Too many attributes for element")?,
        )?;
        out.write_u16::<LE>(self.id_index)?;
        out.write_u16::<LE>(self.class_index)?;
        out.write_u16::<LE>(self.style_index)?;
        for attribute in &self.attributes {
            attribute.write(out, pool)?;
        }
        Ok(())
    }
}

/// An end-element chunk: line-number record plus `(ns, name)` refs.
pub struct XmlEndElement {
    header: ChunkHeader,
    node: XmlNode,
    ns: ResourceRef,
    name: ResourceRef,
}

impl XmlEndElement {
    pub(crate) fn parse(chunk: &[u8], pool: &StringPool) -> Result<XmlEndElement> {
        let (header, body, _) = ChunkHeader::parse(chunk)?;
        if header.header_size < 16 {
            bail!(
                "end element header is {} bytes, expected 16",
                header.header_size
            );
        }
        let mut node_r = &chunk[8..16];
        let node = XmlNode::parse(&mut node_r)?;
        let mut r = body;
        let ns = ResourceRef::parse(&mut r, pool)?;
        let name = ResourceRef::parse(&mut r, pool)?;
        Ok(XmlEndElement {
            header,
            node,
            ns,
            name,
        })
    }

    pub(crate) fn synthesize(name: &str, line_number: u32) -> XmlEndElement {
        XmlEndElement {
            header: ChunkHeader::synthesize(ChunkType::XmlEndElement, 16),
            node: XmlNode {
                line_number,
                comment: NONE_REF,
            },
            ns: ResourceRef::none(),
            name: ResourceRef::from_value(name),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.value()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.ns.value()
    }

    pub fn line_number(&self) -> u32 {
        self.node.line_number
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>, pool: &StringPool) -> Result<()> {
        let chunk_size = self.header.header_size as u32 + 8;
        self.header.write(out, chunk_size)?;
        self.node.write(out)?;
        self.header.write_raw_tail_from(out, 16);
        self.ns.write(out, pool)?;
        self.name.write(out, pool)?;
        Ok(())
    }
}

/// A namespace start/end chunk: line-number record plus `(prefix, uri)` refs.
pub struct XmlNamespace {
    header: ChunkHeader,
    node: XmlNode,
    prefix: ResourceRef,
    uri: ResourceRef,
}

impl XmlNamespace {
    pub(crate) fn parse(chunk: &[u8], pool: &StringPool) -> Result<XmlNamespace> {
        let (header, body, _) = ChunkHeader::parse(chunk)?;
        if header.header_size < 16 {
            bail!(
                "namespace header is {} bytes, expected 16",
                header.header_size
            );
        }
        let mut node_r = &chunk[8..16];
        let node = XmlNode::parse(&mut node_r)?;
        let mut r = body;
        let prefix = ResourceRef::parse(&mut r, pool)?;
        let uri = ResourceRef::parse(&mut r, pool)?;
        Ok(XmlNamespace {
            header,
            node,
            prefix,
            uri,
        })
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.value()
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.value()
    }

    pub fn line_number(&self) -> u32 {
        self.node.line_number
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>, pool: &StringPool) -> Result<()> {
        let chunk_size = self.header.header_size as u32 + 8;
        self.header.write(out, chunk_size)?;
        self.node.write(out)?;
        self.header.write_raw_tail_from(out, 16);
        self.prefix.write(out, pool)?;
        self.uri.write(out, pool)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ANDROID_NS_URI;

    #[test]
    fn make_rejects_unsupported_value_kinds() {
        let reference = AttributeValue::Reference(0x7F010001);
        assert!(Attribute::make(
            ResourceRef::none(),
            ResourceRef::from_value("theme"),
            &reference
        )
        .is_err());

        let float = AttributeValue::Float(1.5);
        assert!(
            Attribute::make(ResourceRef::none(), ResourceRef::from_value("theme"), &float)
                .is_err()
        );
    }

    #[test]
    fn qualified_name_uses_known_prefixes() -> Result<()> {
        let mut namespaces = HashMap::new();
        namespaces.insert(ANDROID_NS_URI.to_owned(), "android".to_owned());

        let attr = Attribute::make(
            ResourceRef::from_value(ANDROID_NS_URI),
            ResourceRef::from_value("debuggable"),
            &AttributeValue::Boolean(true),
        )?;
        assert_eq!(
            attr.qualified_name(&namespaces),
            Some("android:debuggable".to_owned())
        );

        let plain = Attribute::make(
            ResourceRef::none(),
            ResourceRef::from_value("package"),
            &AttributeValue::String("com.example.app".to_owned()),
        )?;
        assert_eq!(plain.qualified_name(&namespaces), Some("package".to_owned()));
        Ok(())
    }
}
