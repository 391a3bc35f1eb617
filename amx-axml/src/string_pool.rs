use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use log::warn;

use crate::{chunk::ChunkHeader, res_map::ResourceMap, UTF8_FLAG};

/// The document's shared string pool.
///
/// The pool presents a composite view: when a resource map is attached, its
/// attribute names form the first `K` entries and the remaining "free" strings
/// follow. New strings are only ever appended to the free region, so indices
/// handed out earlier stay valid. A snapshot of the pool as loaded is kept so
/// that references parsed from the wire can capture their string by value.
pub struct StringPool {
    header: ChunkHeader,
    style_count: u32,
    flags: u32,
    styles_start: u32,
    free_strings: Vec<String>,
    original: Vec<String>,
    indices: HashMap<String, u32>,
    resource_map: Option<ResourceMap>,
}

impl StringPool {
    /// Loads a pool from a complete string-pool chunk (header included).
    pub(crate) fn parse(chunk: &[u8]) -> Result<StringPool> {
        let (header, _, _) = ChunkHeader::parse(chunk)?;
        if header.header_size < 28 {
            bail!(
                "string pool header is {} bytes, expected at least 28",
                header.header_size
            );
        }

        let mut r = &chunk[8..28];
        let string_count = r.read_u32::<LE>()?;
        let style_count = r.read_u32::<LE>()?;
        let flags = r.read_u32::<LE>()?;
        let strings_start = r.read_u32::<LE>()?;
        let styles_start = r.read_u32::<LE>()?;

        if style_count > 0 {
            warn!("string pool declares {style_count} styles; style data is not preserved");
        }

        let offsets_at = header.header_size as usize;
        let offsets_end = offsets_at + string_count as usize * 4;
        if offsets_end > chunk.len() {
            bail!("string pool offset table runs past end of chunk");
        }
        let mut offsets = Vec::with_capacity(string_count as usize);
        let mut off_r = &chunk[offsets_at..offsets_end];
        for _ in 0..string_count {
            offsets.push(off_r.read_u32::<LE>()?);
        }

        let utf8 = flags & UTF8_FLAG != 0;
        let mut strings = Vec::with_capacity(string_count as usize);
        for offset in offsets {
            let at = strings_start as usize + offset as usize;
            if at >= chunk.len() {
                bail!("string data offset {at} runs past end of chunk");
            }
            let s = if utf8 {
                decode_utf8_string(&chunk[at..])?
            } else {
                decode_utf16_string(&chunk[at..])?
            };
            strings.push(s);
        }

        let mut indices = HashMap::new();
        for (i, s) in strings.iter().enumerate() {
            indices.entry(s.clone()).or_insert(i as u32);
        }

        Ok(StringPool {
            header,
            style_count,
            flags,
            styles_start,
            original: strings.clone(),
            free_strings: strings,
            indices,
            resource_map: None,
        })
    }

    /// Hands ownership of the first `K` strings to the resource map, which
    /// names them from now on. The composite view is unchanged.
    pub(crate) fn attach_resource_map(&mut self, map: ResourceMap) -> Result<()> {
        let k = map.len();
        if k > self.free_strings.len() {
            bail!(
                "resource map has {k} entries but the string pool only holds {}",
                self.free_strings.len()
            );
        }
        self.free_strings.drain(..k);
        self.resource_map = Some(map);
        Ok(())
    }

    pub fn resource_map(&self) -> Option<&ResourceMap> {
        self.resource_map.as_ref()
    }

    pub fn is_utf8(&self) -> bool {
        self.flags & UTF8_FLAG != 0
    }

    fn attr_count(&self) -> u32 {
        self.resource_map.as_ref().map_or(0, |m| m.len() as u32)
    }

    pub fn string_count(&self) -> u32 {
        self.attr_count() + self.free_strings.len() as u32
    }

    /// The composite view: resource-map attribute names first, free strings after.
    pub fn strings(&self) -> impl Iterator<Item = &str> {
        self.resource_map
            .iter()
            .flat_map(|m| m.names())
            .chain(self.free_strings.iter().map(|s| s.as_str()))
    }

    /// Looks a string up by its index in the current composite view.
    pub fn string_at(&self, index: u32) -> Result<&str> {
        let k = self.attr_count();
        if index < k {
            if let Some(map) = &self.resource_map {
                return Ok(map.name_at(index as usize));
            }
        }
        self.free_strings
            .get((index - k) as usize)
            .map(|s| s.as_str())
            .ok_or_else(|| anyhow!("invalid string index {index}"))
    }

    /// Looks a string up in the snapshot taken at load time. References parsed
    /// from the wire resolve through this, so later pool edits cannot change
    /// what an on-wire index meant.
    pub fn original_string(&self, index: u32) -> Result<&str> {
        self.original
            .get(index as usize)
            .map(|s| s.as_str())
            .ok_or_else(|| anyhow!("invalid string index {index}"))
    }

    /// The current index of `s`, for serialization.
    pub fn string_ref(&self, s: &str) -> Result<u32> {
        self.indices
            .get(s)
            .copied()
            .ok_or_else(|| anyhow!("string {s:?} is not in the pool"))
    }

    pub fn contains(&self, s: &str) -> bool {
        self.indices.contains_key(s)
    }

    /// Appends `s` to the free-string region if absent. Returns its index
    /// either way.
    pub fn ensure(&mut self, s: &str) -> u32 {
        if let Some(&idx) = self.indices.get(s) {
            return idx;
        }
        self.free_strings.push(s.to_owned());
        let idx = self.attr_count() + self.free_strings.len() as u32 - 1;
        self.indices.insert(s.to_owned(), idx);
        idx
    }

    /// Registers an attribute for use on an element: the name is added to the
    /// resource map (which requires a well-known resource id for it) and the
    /// value, when it is a string, to the free region.
    pub fn set_attribute(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        let map = self
            .resource_map
            .as_mut()
            .ok_or_else(|| anyhow!("document has no resource map to register {name:?} in"))?;
        if !map.contains(name) {
            map.append(name)?;
        }
        if let Some(v) = value {
            if !self.indices.contains_key(v) {
                self.free_strings.push(v.to_owned());
            }
        }
        self.rebuild_indices();
        Ok(())
    }

    /// Recomputes the reverse index over the composite view. Needed whenever a
    /// resource-map append shifts the free region.
    fn rebuild_indices(&mut self) {
        let mut indices = HashMap::new();
        let mut i = 0u32;
        if let Some(map) = &self.resource_map {
            for name in map.names() {
                indices.entry(name.to_owned()).or_insert(i);
                i += 1;
            }
        }
        for s in &self.free_strings {
            indices.entry(s.clone()).or_insert(i);
            i += 1;
        }
        self.indices = indices;
    }

    fn encoded_len(&self, s: &str) -> usize {
        if self.is_utf8() {
            let units = s.encode_utf16().count();
            len_prefix_size_utf8(units) + len_prefix_size_utf8(s.len()) + s.len() + 1
        } else {
            let units = s.encode_utf16().count();
            2 + units * 2 + 2
        }
    }

    fn write_string(&self, out: &mut Vec<u8>, s: &str) -> Result<()> {
        if self.is_utf8() {
            write_utf8_len(out, s.encode_utf16().count())?;
            write_utf8_len(out, s.len())?;
            out.extend_from_slice(s.as_bytes());
            out.write_u8(0)?;
        } else {
            let units: Vec<u16> = s.encode_utf16().collect();
            write_utf16_len(out, units.len())?;
            for unit in units {
                out.write_u16::<LE>(unit)?;
            }
            out.write_u16::<LE>(0)?;
        }
        Ok(())
    }

    /// Emits the pool chunk: header, offset table, string data in the
    /// encoding the input used, zero padding to a 4-byte boundary.
    pub(crate) fn serialize(&self, out: &mut Vec<u8>) -> Result<()> {
        let count = self.string_count();
        let strings_len: usize = self.strings().map(|s| self.encoded_len(s)).sum();
        let raw_len = self.header.header_size as usize + count as usize * 4 + strings_len;
        let chunk_size = (raw_len + 3) & !3;
        let strings_start = self.header.header_size as u32 + count * 4;

        self.header.write(out, chunk_size as u32)?;
        out.write_u32::<LE>(count)?;
        out.write_u32::<LE>(self.style_count)?;
        out.write_u32::<LE>(self.flags)?;
        out.write_u32::<LE>(strings_start)?;
        out.write_u32::<LE>(self.styles_start)?;
        self.header.write_raw_tail_from(out, 28);

        let mut offset = 0u32;
        for s in self.strings() {
            out.write_u32::<LE>(offset)?;
            offset += self.encoded_len(s) as u32;
        }
        for s in self.strings() {
            self.write_string(out, s)?;
        }
        for _ in raw_len..chunk_size {
            out.write_u8(0)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn for_tests(strings: Vec<String>) -> StringPool {
        let mut indices = HashMap::new();
        for (i, s) in strings.iter().enumerate() {
            indices.entry(s.clone()).or_insert(i as u32);
        }
        StringPool {
            header: ChunkHeader::synthesize(crate::ChunkType::StringPool, 28),
            style_count: 0,
            flags: 0,
            styles_start: 0,
            original: strings.clone(),
            free_strings: strings,
            indices,
            resource_map: None,
        }
    }
}

fn decode_utf8_string(buf: &[u8]) -> Result<String> {
    let mut r = buf;
    let _utf16_units = read_utf8_len(&mut r)?;
    let byte_len = read_utf8_len(&mut r)? as usize;
    if byte_len > r.len() {
        bail!("UTF-8 string of {byte_len} bytes runs past end of pool");
    }
    Ok(std::str::from_utf8(&r[..byte_len])?.to_owned())
}

fn decode_utf16_string(buf: &[u8]) -> Result<String> {
    let mut r = buf;
    let units = read_utf16_len(&mut r)? as usize;
    if units * 2 > r.len() {
        bail!("UTF-16 string of {units} units runs past end of pool");
    }
    let mut data = Vec::with_capacity(units);
    for _ in 0..units {
        data.push(r.read_u16::<LE>()?);
    }
    Ok(String::from_utf16(&data)?)
}

// String lengths are 1-2 byte (UTF-8) or 2-4 byte (UTF-16) varints with the
// high bit of the first unit marking the longer form.
fn read_utf8_len(r: &mut &[u8]) -> Result<u16> {
    let mut len = r.read_u8()? as u16;
    if len & 0x80 != 0 {
        len = ((len & 0x7F) << 8) | r.read_u8()? as u16;
    }
    Ok(len)
}

fn read_utf16_len(r: &mut &[u8]) -> Result<u32> {
    let mut len = r.read_u16::<LE>()? as u32;
    if len & 0x8000 != 0 {
        len = ((len & 0x7FFF) << 16) | r.read_u16::<LE>()? as u32;
    }
    Ok(len)
}

fn len_prefix_size_utf8(len: usize) -> usize {
    if len > 0x7F {
        2
    } else {
        1
    }
}

fn write_utf8_len(out: &mut Vec<u8>, len: usize) -> Result<()> {
    if len > 0x7FFF {
        bail!("string length {len} is too long for the pool");
    }
    if len > 0x7F {
        out.write_u8(((len >> 8) as u8) | 0x80)?;
        out.write_u8((len & 0xFF) as u8)?;
    } else {
        out.write_u8(len as u8)?;
    }
    Ok(())
}

fn write_utf16_len(out: &mut Vec<u8>, len: usize) -> Result<()> {
    if len > 0x7FFF {
        bail!("string length {len} is too long for the pool");
    }
    out.write_u16::<LE>(len as u16)?;
    Ok(())
}
