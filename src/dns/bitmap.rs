use std::collections::BTreeSet;

use super::enums::DNSResourceType;
use crate::error::{DnsSecError, Result};

/// Type bit map carried by NSEC and NSEC3 records.
///
/// Stored as a set of type numbers and encoded as window blocks: one octet
/// window number, one octet bitmap length, then up to 32 bitmap octets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TypeBitmap {
    types: BTreeSet<u16>,
}

impl TypeBitmap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_types<I: IntoIterator<Item = DNSResourceType>>(types: I) -> Self {
        Self {
            types: types.into_iter().map(u16::from).collect(),
        }
    }

    pub fn insert(&mut self, rtype: DNSResourceType) {
        self.types.insert(rtype.into());
    }

    pub fn contains(&self, rtype: DNSResourceType) -> bool {
        self.types.contains(&u16::from(rtype))
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn types(&self) -> impl Iterator<Item = DNSResourceType> + '_ {
        self.types.iter().map(|t| DNSResourceType::from(*t))
    }

    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut window: Option<u8> = None;
        let mut block = [0u8; 32];

        for &t in &self.types {
            let w = (t >> 8) as u8;
            if window != Some(w) {
                if let Some(prev) = window {
                    flush_window(&mut out, prev, &block);
                    block = [0u8; 32];
                }
                window = Some(w);
            }
            let low = (t & 0xff) as usize;
            block[low / 8] |= 0x80 >> (low % 8);
        }
        if let Some(prev) = window {
            flush_window(&mut out, prev, &block);
        }
        out
    }

    pub fn from_wire(data: &[u8]) -> Result<Self> {
        let mut types = BTreeSet::new();
        let mut pos = 0;
        while pos < data.len() {
            if pos + 2 > data.len() {
                return Err(DnsSecError::Wire("truncated type bitmap".to_string()));
            }
            let window = data[pos] as u16;
            let len = data[pos + 1] as usize;
            pos += 2;
            if len == 0 || len > 32 || pos + len > data.len() {
                return Err(DnsSecError::Wire(format!(
                    "invalid type bitmap window length {}",
                    len
                )));
            }
            for (i, byte) in data[pos..pos + len].iter().enumerate() {
                for bit in 0..8 {
                    if byte & (0x80 >> bit) != 0 {
                        types.insert((window << 8) | (i * 8 + bit) as u16);
                    }
                }
            }
            pos += len;
        }
        Ok(Self { types })
    }
}

fn flush_window(out: &mut Vec<u8>, window: u8, block: &[u8; 32]) {
    let len = block.iter().rposition(|b| *b != 0).map_or(0, |p| p + 1);
    if len > 0 {
        out.push(window);
        out.push(len as u8);
        out.extend_from_slice(&block[..len]);
    }
}
