use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};
use log::debug;

use crate::{
    chunk::ChunkHeader,
    element::{Attribute, XmlElement, XmlEndElement, XmlNamespace},
    res_map::ResourceMap,
    string_pool::StringPool,
    value::{AttributeValue, ResourceRef},
    ChunkType, ANDROID_NS_URI,
};

/// Handle to a chunk in the document's assembly, as yielded by
/// [`AxmlDocument::next_event`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeId(usize);

/// One step of the chunk stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// The document root chunk itself; always yielded first.
    Document,
    StringPool,
    ResourceMap,
    StartNamespace(NodeId),
    EndNamespace(NodeId),
    StartElement(NodeId),
    EndElement(NodeId),
    /// A chunk this library does not interpret, preserved verbatim.
    Unknown { type_code: u16, node: NodeId },
}

enum Node {
    Raw(Vec<u8>),
    StringPool,
    ResourceMap,
    StartNamespace(XmlNamespace),
    EndNamespace(XmlNamespace),
    StartElement(XmlElement),
    EndElement(XmlEndElement),
    Inserted(Vec<InsertedChunk>),
}

enum InsertedChunk {
    Start(XmlElement),
    End(XmlEndElement),
}

/// An Android binary XML document, held as an ordered assembly of chunks.
///
/// Iterate it to the end with [`next_event`](Self::next_event), editing
/// chunks through the handles the events carry, then call
/// [`to_bytes`](Self::to_bytes) to re-serialize. All chunk sizes and
/// string-pool offsets are recomputed from current content, so edits and
/// insertions made along the way land in the output.
pub struct AxmlDocument {
    data: Vec<u8>,
    cursor: usize,
    end: usize,
    first_chunk: bool,
    header: ChunkHeader,
    pool: Option<StringPool>,
    nodes: Vec<Node>,
    namespaces: HashMap<String, String>,
    last_element: Option<usize>,
}

impl AxmlDocument {
    pub fn new(data: Vec<u8>) -> Result<AxmlDocument> {
        let (header, _, _) = ChunkHeader::parse(&data)?;
        if header.chunk_type() != Some(ChunkType::Xml) {
            bail!(
                "initial chunk is not an XML document (type {:#06x})",
                header.type_code
            );
        }
        let cursor = header.header_size as usize;
        let end = header.chunk_size as usize;
        Ok(AxmlDocument {
            data,
            cursor,
            end,
            first_chunk: true,
            header,
            pool: None,
            nodes: Vec::new(),
            namespaces: HashMap::new(),
            last_element: None,
        })
    }

    pub fn has_next(&self) -> bool {
        self.first_chunk || self.cursor < self.end
    }

    /// Reads the next chunk, lifts it into the assembly and reports what it
    /// was. The string pool is expected before any chunk that references it.
    pub fn next_event(&mut self) -> Result<Event> {
        if self.first_chunk {
            self.first_chunk = false;
            return Ok(Event::Document);
        }

        let buf = &self.data[self.cursor..self.end];
        let (header, _, _) = ChunkHeader::parse(buf)?;
        let chunk = &buf[..header.chunk_size as usize];
        self.cursor += header.chunk_size as usize;

        let event = match header.chunk_type() {
            Some(ChunkType::StringPool) => {
                self.pool = Some(StringPool::parse(chunk)?);
                self.nodes.push(Node::StringPool);
                Event::StringPool
            }
            Some(ChunkType::XmlResourceMap) => {
                let pool = self
                    .pool
                    .as_ref()
                    .ok_or_else(|| anyhow!("resource map chunk before string pool"))?;
                let map = ResourceMap::parse(chunk, pool)?;
                match self.pool.as_mut() {
                    Some(pool) => pool.attach_resource_map(map)?,
                    None => bail!("resource map chunk before string pool"),
                }
                self.nodes.push(Node::ResourceMap);
                Event::ResourceMap
            }
            Some(ChunkType::XmlStartNamespace) => {
                let pool = self
                    .pool
                    .as_ref()
                    .ok_or_else(|| anyhow!("namespace chunk before string pool"))?;
                let ns = XmlNamespace::parse(chunk, pool)?;
                if let (Some(prefix), Some(uri)) = (ns.prefix(), ns.uri()) {
                    self.namespaces.insert(uri.to_owned(), prefix.to_owned());
                }
                self.nodes.push(Node::StartNamespace(ns));
                Event::StartNamespace(NodeId(self.nodes.len() - 1))
            }
            Some(ChunkType::XmlEndNamespace) => {
                let pool = self
                    .pool
                    .as_ref()
                    .ok_or_else(|| anyhow!("namespace chunk before string pool"))?;
                let ns = XmlNamespace::parse(chunk, pool)?;
                self.nodes.push(Node::EndNamespace(ns));
                Event::EndNamespace(NodeId(self.nodes.len() - 1))
            }
            Some(ChunkType::XmlStartElement) => {
                let pool = self
                    .pool
                    .as_ref()
                    .ok_or_else(|| anyhow!("element chunk before string pool"))?;
                let element = XmlElement::parse(chunk, pool)?;
                self.nodes.push(Node::StartElement(element));
                Event::StartElement(NodeId(self.nodes.len() - 1))
            }
            Some(ChunkType::XmlEndElement) => {
                let pool = self
                    .pool
                    .as_ref()
                    .ok_or_else(|| anyhow!("element chunk before string pool"))?;
                let element = XmlEndElement::parse(chunk, pool)?;
                self.nodes.push(Node::EndElement(element));
                Event::EndElement(NodeId(self.nodes.len() - 1))
            }
            _ => {
                debug!(
                    "preserving unrecognised chunk type {:#06x} ({} bytes)",
                    header.type_code,
                    chunk.len()
                );
                self.nodes.push(Node::Raw(chunk.to_vec()));
                Event::Unknown {
                    type_code: header.type_code,
                    node: NodeId(self.nodes.len() - 1),
                }
            }
        };

        self.last_element = match event {
            Event::StartElement(NodeId(idx)) | Event::EndElement(NodeId(idx)) => Some(idx),
            _ => None,
        };
        Ok(event)
    }

    pub fn string_pool(&self) -> Option<&StringPool> {
        self.pool.as_ref()
    }

    pub fn string_pool_mut(&mut self) -> Option<&mut StringPool> {
        self.pool.as_mut()
    }

    /// Namespace uri to prefix, for every namespace start seen so far.
    pub fn namespaces(&self) -> &HashMap<String, String> {
        &self.namespaces
    }

    pub fn element(&self, id: NodeId) -> Result<&XmlElement> {
        match self.nodes.get(id.0) {
            Some(Node::StartElement(element)) => Ok(element),
            Some(_) => bail!("chunk {} is not a start element", id.0),
            None => bail!("no chunk with id {}", id.0),
        }
    }

    pub fn end_element(&self, id: NodeId) -> Result<&XmlEndElement> {
        match self.nodes.get(id.0) {
            Some(Node::EndElement(element)) => Ok(element),
            Some(_) => bail!("chunk {} is not an end element", id.0),
            None => bail!("no chunk with id {}", id.0),
        }
    }

    pub fn namespace(&self, id: NodeId) -> Result<&XmlNamespace> {
        match self.nodes.get(id.0) {
            Some(Node::StartNamespace(ns)) | Some(Node::EndNamespace(ns)) => Ok(ns),
            Some(_) => bail!("chunk {} is not a namespace chunk", id.0),
            None => bail!("no chunk with id {}", id.0),
        }
    }

    /// Mutable access to an element together with the pool and namespace map,
    /// for editing attributes in place.
    pub fn element_mut(&mut self, id: NodeId) -> Result<ElementMut<'_>> {
        let pool = self
            .pool
            .as_mut()
            .ok_or_else(|| anyhow!("document has no string pool"))?;
        match self.nodes.get_mut(id.0) {
            Some(Node::StartElement(element)) => Ok(ElementMut {
                element,
                pool,
                namespaces: &self.namespaces,
            }),
            Some(_) => bail!("chunk {} is not a start element", id.0),
            None => bail!("no chunk with id {}", id.0),
        }
    }

    /// Opens an insertion point directly after the chunk most recently
    /// yielded, which must have been a start or end element. Chunks written
    /// through the returned [`Inserter`] are emitted there at serialization
    /// time.
    pub fn insert(&mut self) -> Result<Inserter<'_>> {
        let line = match self.last_element {
            Some(idx) => match &self.nodes[idx] {
                Node::StartElement(element) => element.line_number(),
                Node::EndElement(element) => element.line_number(),
                _ => bail!("cannot insert after non-element chunk types"),
            },
            None => bail!("cannot insert after non-element chunk types"),
        };
        self.nodes.push(Node::Inserted(Vec::new()));
        let node = self.nodes.len() - 1;
        Ok(Inserter {
            doc: self,
            node,
            line,
        })
    }

    /// Serializes the assembly back into a complete document. Chunk sizes,
    /// string counts and pool offsets are recomputed from current content.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        for node in &self.nodes {
            match node {
                Node::Raw(bytes) => body.extend_from_slice(bytes),
                Node::StringPool => self.require_pool()?.serialize(&mut body)?,
                Node::ResourceMap => match self.require_pool()?.resource_map() {
                    Some(map) => map.serialize(&mut body)?,
                    None => bail!("resource map chunk without a loaded resource map"),
                },
                Node::StartNamespace(ns) | Node::EndNamespace(ns) => {
                    ns.write(&mut body, self.require_pool()?)?
                }
                Node::StartElement(element) => element.write(&mut body, self.require_pool()?)?,
                Node::EndElement(element) => element.write(&mut body, self.require_pool()?)?,
                Node::Inserted(chunks) => {
                    let pool = self.require_pool()?;
                    for chunk in chunks {
                        match chunk {
                            InsertedChunk::Start(element) => element.write(&mut body, pool)?,
                            InsertedChunk::End(element) => element.write(&mut body, pool)?,
                        }
                    }
                }
            }
        }

        let mut out = Vec::with_capacity(8 + body.len());
        let chunk_size = self.header.header_size as u32 + body.len() as u32;
        self.header.write(&mut out, chunk_size)?;
        self.header.write_raw_tail_from(&mut out, 8);
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn require_pool(&self) -> Result<&StringPool> {
        self.pool
            .as_ref()
            .ok_or_else(|| anyhow!("document has no string pool"))
    }
}

/// Split-borrow view for in-place attribute edits.
pub struct ElementMut<'a> {
    pub element: &'a mut XmlElement,
    pub pool: &'a mut StringPool,
    pub namespaces: &'a HashMap<String, String>,
}

/// A placeholder in the assembly that new element subtrees can be written
/// into. Everything written here reuses the document's string pool; attribute
/// names are registered through the resource map, values and the `android:`
/// namespace uri through the free-string region.
pub struct Inserter<'a> {
    doc: &'a mut AxmlDocument,
    node: usize,
    line: u32,
}

impl Inserter<'_> {
    pub fn write_start_element(
        &mut self,
        name: &str,
        attributes: &[(&str, AttributeValue)],
        line_number: Option<u32>,
    ) -> Result<()> {
        let pool = self
            .doc
            .pool
            .as_mut()
            .ok_or_else(|| anyhow!("document has no string pool"))?;
        pool.ensure(name);
        pool.ensure(ANDROID_NS_URI);

        let mut element = XmlElement::synthesize(name, line_number.unwrap_or(self.line));
        for (attr_name, value) in attributes {
            let string_value = match value {
                AttributeValue::String(s) => Some(s.as_str()),
                _ => None,
            };
            pool.set_attribute(attr_name, string_value)?;
            let attribute = Attribute::make(
                ResourceRef::from_value(ANDROID_NS_URI),
                ResourceRef::from_value(*attr_name),
                value,
            )?;
            element.push_attribute(attribute);
        }
        self.push(InsertedChunk::Start(element))
    }

    pub fn write_end_element(&mut self, name: &str, line_number: Option<u32>) -> Result<()> {
        let element = XmlEndElement::synthesize(name, line_number.unwrap_or(self.line));
        self.push(InsertedChunk::End(element))
    }

    fn push(&mut self, chunk: InsertedChunk) -> Result<()> {
        match &mut self.doc.nodes[self.node] {
            Node::Inserted(chunks) => {
                chunks.push(chunk);
                Ok(())
            }
            _ => bail!("insertion point is no longer valid"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::string_pool::tests::build_utf16_pool;
    use crate::value::ResValue;
    use crate::NONE_REF;
    use byteorder::{WriteBytesExt, LE};

    const VERSION_CODE_ID: u32 = 0x0101021b;
    const NAME_ID: u32 = 0x01010003;
    const PERMISSION: &str = "android.permission.INTERNET";

    fn write_chunk_header(out: &mut Vec<u8>, type_code: u16, header_size: u16, chunk_size: u32) {
        out.write_u16::<LE>(type_code).unwrap();
        out.write_u16::<LE>(header_size).unwrap();
        out.write_u32::<LE>(chunk_size).unwrap();
    }

    // A namespace or end-element chunk: node record plus two refs.
    fn write_ref_chunk(out: &mut Vec<u8>, type_code: u16, line: u32, a: u32, b: u32) {
        write_chunk_header(out, type_code, 16, 24);
        out.write_u32::<LE>(line).unwrap();
        out.write_u32::<LE>(NONE_REF).unwrap();
        out.write_u32::<LE>(a).unwrap();
        out.write_u32::<LE>(b).unwrap();
    }

    struct RawAttr {
        ns: u32,
        name: u32,
        raw_value: u32,
        data_type: u8,
        data: u32,
    }

    fn write_element(out: &mut Vec<u8>, line: u32, ns: u32, name: u32, attrs: &[RawAttr]) {
        write_chunk_header(out, 0x0102, 16, 36 + attrs.len() as u32 * 20);
        out.write_u32::<LE>(line).unwrap();
        out.write_u32::<LE>(NONE_REF).unwrap();
        out.write_u32::<LE>(ns).unwrap();
        out.write_u32::<LE>(name).unwrap();
        for v in [20u16, 20, attrs.len() as u16, 0, 0, 0] {
            out.write_u16::<LE>(v).unwrap();
        }
        for attr in attrs {
            out.write_u32::<LE>(attr.ns).unwrap();
            out.write_u32::<LE>(attr.name).unwrap();
            out.write_u32::<LE>(attr.raw_value).unwrap();
            out.write_u16::<LE>(8).unwrap();
            out.write_u8(0).unwrap();
            out.write_u8(attr.data_type).unwrap();
            out.write_u32::<LE>(attr.data).unwrap();
        }
    }

    // A minimal manifest: one resource-map attribute (versionCode), the
    // android namespace, and a manifest element carrying
    // android:versionCode="1" and package="com.example.app".
    //
    // Pool layout: 0 versionCode, 1 android, 2 <android ns uri>, 3 manifest,
    // 4 package, 5 com.example.app.
    pub(crate) fn test_manifest() -> Vec<u8> {
        test_manifest_with_extra(None)
    }

    fn test_manifest_with_extra(extra_chunk: Option<&[u8]>) -> Vec<u8> {
        let pool = build_utf16_pool(&[
            "versionCode",
            "android",
            ANDROID_NS_URI,
            "manifest",
            "package",
            "com.example.app",
        ]);

        let mut body = pool;
        write_chunk_header(&mut body, 0x0180, 8, 12);
        body.write_u32::<LE>(VERSION_CODE_ID).unwrap();

        write_ref_chunk(&mut body, 0x0100, 1, 1, 2); // xmlns:android
        write_element(
            &mut body,
            2,
            NONE_REF,
            3,
            &[
                RawAttr {
                    ns: 2,
                    name: 0,
                    raw_value: NONE_REF,
                    data_type: ResValue::TYPE_INT_DEC,
                    data: 1,
                },
                RawAttr {
                    ns: NONE_REF,
                    name: 4,
                    raw_value: 5,
                    data_type: ResValue::TYPE_STRING,
                    data: 5,
                },
            ],
        );
        write_ref_chunk(&mut body, 0x0103, 4, NONE_REF, 3); // </manifest>
        if let Some(extra) = extra_chunk {
            body.extend_from_slice(extra);
        }
        write_ref_chunk(&mut body, 0x0101, 5, 1, 2);

        let mut out = Vec::new();
        write_chunk_header(&mut out, 0x0003, 8, 8 + body.len() as u32);
        out.extend_from_slice(&body);
        out
    }

    fn drain(doc: &mut AxmlDocument) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        while doc.has_next() {
            events.push(doc.next_event()?);
        }
        Ok(events)
    }

    #[test]
    fn identity_round_trip() -> Result<()> {
        let input = test_manifest();
        let mut doc = AxmlDocument::new(input.clone())?;
        let events = drain(&mut doc)?;

        assert!(matches!(
            events.as_slice(),
            [
                Event::Document,
                Event::StringPool,
                Event::ResourceMap,
                Event::StartNamespace(_),
                Event::StartElement(_),
                Event::EndElement(_),
                Event::EndNamespace(_),
            ]
        ));
        assert_eq!(doc.to_bytes()?, input);
        Ok(())
    }

    #[test]
    fn events_expose_parsed_content() -> Result<()> {
        let mut doc = AxmlDocument::new(test_manifest())?;
        let events = drain(&mut doc)?;

        let ns = match events[3] {
            Event::StartNamespace(id) => doc.namespace(id)?,
            _ => panic!("expected namespace event"),
        };
        assert_eq!(ns.prefix(), Some("android"));
        assert_eq!(ns.uri(), Some(ANDROID_NS_URI));
        assert_eq!(
            doc.namespaces().get(ANDROID_NS_URI).map(String::as_str),
            Some("android")
        );

        let element = match events[4] {
            Event::StartElement(id) => doc.element(id)?,
            _ => panic!("expected start element event"),
        };
        let pool = doc.string_pool().ok_or_else(|| anyhow!("no pool"))?;
        assert_eq!(element.name(), Some("manifest"));
        assert_eq!(element.line_number(), 2);
        assert_eq!(
            element.attributes[0].qualified_name(doc.namespaces()),
            Some("android:versionCode".to_owned())
        );
        assert_eq!(element.attributes[0].typed_value.value(pool)?, "1");
        assert_eq!(
            element.attributes[1].qualified_name(doc.namespaces()),
            Some("package".to_owned())
        );
        assert_eq!(
            element.attributes[1].typed_value.value(pool)?,
            "com.example.app"
        );

        let end = match events[5] {
            Event::EndElement(id) => doc.end_element(id)?,
            _ => panic!("expected end element event"),
        };
        assert_eq!(end.name(), Some("manifest"));
        Ok(())
    }

    // Scenario: bump android:versionCode by one. Exactly the four bytes of
    // the typed value payload change.
    #[test]
    fn version_bump_changes_only_the_value_bytes() -> Result<()> {
        let input = test_manifest();
        let mut doc = AxmlDocument::new(input.clone())?;
        while doc.has_next() {
            if let Event::StartElement(id) = doc.next_event()? {
                if doc.element(id)?.name() == Some("manifest") {
                    let view = doc.element_mut(id)?;
                    for attr in view.element.attributes.iter_mut() {
                        if attr.qualified_name(view.namespaces).as_deref()
                            == Some("android:versionCode")
                        {
                            let current = attr.typed_value.raw_data();
                            attr.typed_value.set_data(current + 1, view.pool)?;
                        }
                    }
                }
            }
        }

        let out = doc.to_bytes()?;
        assert_eq!(out.len(), input.len());
        let changed: Vec<usize> = (0..out.len()).filter(|&i| out[i] != input[i]).collect();
        assert!(!changed.is_empty() && changed.len() <= 4);

        let mut reparsed = AxmlDocument::new(out)?;
        while reparsed.has_next() {
            if let Event::StartElement(id) = reparsed.next_event()? {
                let pool = reparsed.string_pool().ok_or_else(|| anyhow!("no pool"))?;
                let element = reparsed.element(id)?;
                assert_eq!(element.attributes[0].typed_value.value(pool)?, "2");
            }
        }
        Ok(())
    }

    #[test]
    fn string_attribute_mutation_is_visible() -> Result<()> {
        let mut doc = AxmlDocument::new(test_manifest())?;
        while doc.has_next() {
            if let Event::StartElement(id) = doc.next_event()? {
                let view = doc.element_mut(id)?;
                view.element.attributes[1]
                    .typed_value
                    .set_string("com.example.renamed", view.pool);
            }
        }

        let out = doc.to_bytes()?;
        let mut reparsed = AxmlDocument::new(out)?;
        while reparsed.has_next() {
            if let Event::StartElement(id) = reparsed.next_event()? {
                let pool = reparsed.string_pool().ok_or_else(|| anyhow!("no pool"))?;
                let element = reparsed.element(id)?;
                assert_eq!(
                    element.attributes[1].typed_value.value(pool)?,
                    "com.example.renamed"
                );
                // The raw value ref tracks the typed value for strings.
                assert_eq!(
                    element.attributes[1].typed_value.data(pool)?,
                    pool.string_ref("com.example.renamed")?
                );
            }
        }
        Ok(())
    }

    // Scenario: splice <uses-permission android:name="..."/> in as the first
    // child of the manifest element.
    #[test]
    fn inserted_subtree_is_serialized_in_place() -> Result<()> {
        let mut doc = AxmlDocument::new(test_manifest())?;
        while doc.has_next() {
            if let Event::StartElement(id) = doc.next_event()? {
                if doc.element(id)?.name() == Some("manifest") {
                    let mut inserter = doc.insert()?;
                    inserter.write_start_element(
                        "uses-permission",
                        &[("name", AttributeValue::String(PERMISSION.to_owned()))],
                        None,
                    )?;
                    inserter.write_end_element("uses-permission", None)?;
                }
            }
        }

        let out = doc.to_bytes()?;
        let mut reparsed = AxmlDocument::new(out)?;
        let mut names = Vec::new();
        let mut permission_value = None;
        while reparsed.has_next() {
            if let Event::StartElement(id) = reparsed.next_event()? {
                let element = reparsed.element(id)?;
                names.push(element.name().map(str::to_owned));
                if element.name() == Some("uses-permission") {
                    let pool = reparsed.string_pool().ok_or_else(|| anyhow!("no pool"))?;
                    let attr = &element.attributes[0];
                    assert_eq!(
                        attr.qualified_name(reparsed.namespaces()),
                        Some("android:name".to_owned())
                    );
                    permission_value = Some(attr.typed_value.value(pool)?);
                }
            }
        }

        assert_eq!(
            names,
            vec![
                Some("manifest".to_owned()),
                Some("uses-permission".to_owned())
            ]
        );
        assert_eq!(permission_value.as_deref(), Some(PERMISSION));

        let pool = reparsed.string_pool().ok_or_else(|| anyhow!("no pool"))?;
        assert!(pool.contains("uses-permission"));
        assert!(pool.contains(PERMISSION));
        let map = pool.resource_map().ok_or_else(|| anyhow!("no map"))?;
        assert_eq!(map.len(), 2);
        assert_eq!(map.resource_id("name"), Some(NAME_ID));
        // The map still names the pool's first entries, in order.
        for (i, name) in map.names().enumerate() {
            assert_eq!(pool.string_at(i as u32)?, name);
        }
        Ok(())
    }

    #[test]
    fn unknown_chunks_survive_verbatim() -> Result<()> {
        let mut extra = Vec::new();
        write_chunk_header(&mut extra, 0x0201, 8, 16);
        extra.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x03, 0x04]);

        let input = test_manifest_with_extra(Some(&extra));
        let mut doc = AxmlDocument::new(input.clone())?;
        let events = drain(&mut doc)?;
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Unknown { type_code: 0x0201, .. })));
        assert_eq!(doc.to_bytes()?, input);
        Ok(())
    }

    #[test]
    fn insert_before_any_element_is_rejected() -> Result<()> {
        let mut doc = AxmlDocument::new(test_manifest())?;
        assert!(doc.insert().is_err()); // before the first event
        doc.next_event()?; // document root
        assert!(doc.insert().is_err());
        doc.next_event()?; // string pool
        assert!(doc.insert().is_err());
        Ok(())
    }

    #[test]
    fn oversized_inner_chunk_is_an_error() -> Result<()> {
        let mut input = test_manifest();
        // Corrupt the string pool chunk size so it runs past the document.
        let size = input.len() as u32;
        input[12..16].copy_from_slice(&size.to_le_bytes());
        let mut doc = AxmlDocument::new(input)?;
        doc.next_event()?; // document root
        assert!(doc.next_event().is_err());
        Ok(())
    }

    #[test]
    fn truncated_document_is_an_error() {
        assert!(AxmlDocument::new(vec![0x03, 0x00, 0x08, 0x00]).is_err());
    }

    #[test]
    fn unknown_attribute_name_cannot_be_registered() -> Result<()> {
        let mut doc = AxmlDocument::new(test_manifest())?;
        while doc.has_next() {
            doc.next_event()?;
        }
        let pool = doc
            .string_pool_mut()
            .ok_or_else(|| anyhow!("no pool"))?;
        assert!(pool
            .set_attribute("definitely-not-an-attribute", None)
            .is_err());
        Ok(())
    }
}
