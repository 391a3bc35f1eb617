use anyhow::{bail, Result};
use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::ChunkType;

/// The universal 8-byte chunk envelope: `type:u16, headerSize:u16, chunkSize:u32`.
///
/// The original header bytes are retained so that fields this library does not
/// interpret (anything between the envelope and the chunk body) can be
/// re-emitted exactly as received.
#[derive(Debug, Clone)]
pub struct ChunkHeader {
    pub type_code: u16,
    pub header_size: u16,
    pub chunk_size: u32,
    raw: Vec<u8>,
}

impl ChunkHeader {
    /// Reads a header from the front of `buf`, returning the header, the chunk
    /// body (`headerSize..chunkSize`) and the remainder of the buffer after
    /// the chunk.
    pub fn parse(buf: &[u8]) -> Result<(ChunkHeader, &[u8], &[u8])> {
        if buf.len() < 8 {
            bail!("truncated chunk header: {} bytes left", buf.len());
        }
        let mut r = &buf[..8];
        let type_code = r.read_u16::<LE>()?;
        let header_size = r.read_u16::<LE>()?;
        let chunk_size = r.read_u32::<LE>()?;

        if header_size < 8 {
            bail!("chunk header size {header_size} is smaller than the envelope");
        }
        if header_size as u32 > chunk_size {
            bail!("chunk header size {header_size} exceeds chunk size {chunk_size}");
        }
        if chunk_size as usize > buf.len() {
            bail!(
                "chunk size {chunk_size} runs past end of buffer ({} bytes left)",
                buf.len()
            );
        }

        let header = ChunkHeader {
            type_code,
            header_size,
            chunk_size,
            raw: buf[..header_size as usize].to_vec(),
        };
        let body = &buf[header_size as usize..chunk_size as usize];
        let rest = &buf[chunk_size as usize..];
        Ok((header, body, rest))
    }

    /// Header for a chunk synthesized by this library rather than parsed from
    /// input. There are no retained bytes beyond the envelope.
    pub(crate) fn synthesize(chunk_type: ChunkType, header_size: u16) -> ChunkHeader {
        ChunkHeader {
            type_code: chunk_type.code(),
            header_size,
            chunk_size: 0,
            raw: Vec::new(),
        }
    }

    pub fn chunk_type(&self) -> Option<ChunkType> {
        ChunkType::parse(self.type_code)
    }

    /// Writes the 8-byte envelope with a freshly computed chunk size.
    pub(crate) fn write(&self, out: &mut Vec<u8>, chunk_size: u32) -> Result<()> {
        out.write_u16::<LE>(self.type_code)?;
        out.write_u16::<LE>(self.header_size)?;
        out.write_u32::<LE>(chunk_size)?;
        Ok(())
    }

    /// Re-emits any retained original header bytes from `from` up to
    /// `headerSize`. A no-op for synthesized headers and for chunks whose
    /// header holds nothing beyond the fields the caller writes itself.
    pub(crate) fn write_raw_tail_from(&self, out: &mut Vec<u8>, from: usize) {
        if self.raw.len() > from {
            out.extend_from_slice(&self.raw[from..]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_body_and_rest() -> Result<()> {
        // headerSize 8, chunkSize 12: a 4-byte body followed by 2 spare bytes.
        let buf: Vec<u8> = vec![
            0x80, 0x01, 8, 0, 12, 0, 0, 0, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF,
        ];
        let (header, body, rest) = ChunkHeader::parse(&buf)?;
        assert_eq!(header.type_code, 0x0180);
        assert_eq!(header.chunk_type(), Some(ChunkType::XmlResourceMap));
        assert_eq!(body, &[0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(rest, &[0xEE, 0xFF]);
        Ok(())
    }

    #[test]
    fn rejects_header_larger_than_chunk() {
        let buf: Vec<u8> = vec![0x02, 0x01, 24, 0, 16, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(ChunkHeader::parse(&buf).is_err());
    }

    #[test]
    fn rejects_chunk_running_past_buffer() {
        let buf: Vec<u8> = vec![0x02, 0x01, 8, 0, 64, 0, 0, 0];
        assert!(ChunkHeader::parse(&buf).is_err());
    }
}
