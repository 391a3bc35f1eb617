use anyhow::{bail, Result};
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use log::debug;

use crate::{chunk::ChunkHeader, res_ids, string_pool::StringPool};

/// The XML resource map: a positional table binding the first `K` string-pool
/// entries to fixed attribute resource ids. An attribute name's index in the
/// pool equals its index here.
pub struct ResourceMap {
    header: ChunkHeader,
    entries: Vec<(String, u32)>,
}

impl ResourceMap {
    /// Parses the map chunk, pairing each id with the pool string at the same
    /// position.
    pub(crate) fn parse(chunk: &[u8], pool: &StringPool) -> Result<ResourceMap> {
        let (header, body, _) = ChunkHeader::parse(chunk)?;
        let count = (header.chunk_size - header.header_size as u32) / 4;

        let mut entries = Vec::with_capacity(count as usize);
        let mut r = body;
        for i in 0..count {
            let id = r.read_u32::<LE>()?;
            entries.push((pool.original_string(i)?.to_owned(), id));
        }
        Ok(ResourceMap { header, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn resource_id(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, id)| id)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub(crate) fn name_at(&self, index: usize) -> &str {
        &self.entries[index].0
    }

    /// Registers `name` at the end of the map, taking its resource id from the
    /// bundled well-known attribute table.
    pub(crate) fn append(&mut self, name: &str) -> Result<()> {
        let ids = res_ids::attr_ids()?;
        match ids.get(name) {
            Some(id) => {
                debug!("registering attribute {name} with resource id {id:#010x}");
                self.entries.push((name.to_owned(), id));
                Ok(())
            }
            None => bail!("no resource id known for attribute {name:?}"),
        }
    }

    pub(crate) fn serialize(&self, out: &mut Vec<u8>) -> Result<()> {
        let chunk_size = self.header.header_size as u32 + self.entries.len() as u32 * 4;
        self.header.write(out, chunk_size)?;
        self.header.write_raw_tail_from(out, 8);
        for (_, id) in &self.entries {
            out.write_u32::<LE>(*id)?;
        }
        Ok(())
    }
}
