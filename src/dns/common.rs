use bitstream_io::{BigEndian, BitWrite, BitWriter};

use super::name::Name;
use crate::error::Result;

pub type WireWriter<'a> = BitWriter<&'a mut Vec<u8>, BigEndian>;

/// Components that have a canonical (RFC 4034 section 6.2) wire form.
pub trait CanonicalWire {
    fn write_canonical(&self, writer: &mut WireWriter<'_>) -> std::io::Result<()>;

    fn to_wire(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let mut writer: WireWriter<'_> = BitWriter::new(&mut buf);
            self.write_canonical(&mut writer)?;
        }
        Ok(buf)
    }
}

impl CanonicalWire for Name {
    fn write_canonical(&self, writer: &mut WireWriter<'_>) -> std::io::Result<()> {
        writer.write_bytes(&self.to_canonical_wire())
    }
}

pub(crate) fn write_u8(writer: &mut WireWriter<'_>, value: u8) -> std::io::Result<()> {
    writer.write_var::<u8>(8, value)
}

pub(crate) fn write_u16(writer: &mut WireWriter<'_>, value: u16) -> std::io::Result<()> {
    writer.write_var::<u16>(16, value)
}

pub(crate) fn write_u32(writer: &mut WireWriter<'_>, value: u32) -> std::io::Result<()> {
    writer.write_var::<u32>(32, value)
}

/// Length-prefixed byte string (salt, hash, TXT segment)
pub(crate) fn write_sized(writer: &mut WireWriter<'_>, data: &[u8]) -> std::io::Result<()> {
    write_u8(writer, data.len() as u8)?;
    writer.write_bytes(data)
}
