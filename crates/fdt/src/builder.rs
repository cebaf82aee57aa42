//! In-memory device tree blob builder.
//!
//! Produces version 17 blobs laid out as header, reservation table, structure block,
//! strings block. Used by tests and the `fdtinfo` tool to synthesise inputs.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::endian::align4;
use crate::header::{FDT_MAGIC, HEADER_SIZE};
use crate::parser::Token;

const VERSION: u32 = 17;
const LAST_COMPATIBLE_VERSION: u32 = 16;

/// Builder for a flattened device tree blob.
///
/// Nodes and properties are emitted in call order; the builder does not check that
/// `begin_node`/`end_node` calls are balanced, so tests can produce malformed trees.
pub struct FdtBuilder {
    reservations: Vec<(u64, u64)>,
    structure: Vec<u8>,
    strings: Vec<u8>,
    string_cache: BTreeMap<String, u32>,
    boot_cpu: u32,
}

impl FdtBuilder {
    pub fn new() -> Self {
        Self {
            reservations: Vec::new(),
            structure: Vec::new(),
            strings: Vec::new(),
            string_cache: BTreeMap::new(),
            boot_cpu: 0,
        }
    }

    /// Sets the boot CPU id recorded in the header.
    pub fn boot_cpu(&mut self, id: u32) -> &mut Self {
        self.boot_cpu = id;
        self
    }

    /// Adds an entry to the memory reservation table.
    pub fn reserve(&mut self, address: u64, size: u64) -> &mut Self {
        self.reservations.push((address, size));
        self
    }

    /// Opens a node. The root node has an empty name.
    pub fn begin_node(&mut self, name: &str) -> &mut Self {
        self.token(Token::BEGIN_NODE);
        self.structure.extend_from_slice(name.as_bytes());
        self.structure.push(0);
        self.pad();
        self
    }

    /// Closes the innermost node.
    pub fn end_node(&mut self) -> &mut Self {
        self.token(Token::END_NODE)
    }

    /// Emits a NOP token.
    pub fn nop(&mut self) -> &mut Self {
        self.token(Token::NOP)
    }

    /// Emits an arbitrary token word.
    pub fn raw_token(&mut self, token: u32) -> &mut Self {
        self.token(token)
    }

    /// Adds a property with a raw value.
    pub fn property(&mut self, name: &str, value: &[u8]) -> &mut Self {
        let name_offset = self.intern(name);
        self.token(Token::PROP);
        self.structure
            .extend_from_slice(&(value.len() as u32).to_be_bytes());
        self.structure.extend_from_slice(&name_offset.to_be_bytes());
        self.structure.extend_from_slice(value);
        self.pad();
        self
    }

    /// Adds a single-cell property.
    pub fn property_u32(&mut self, name: &str, value: u32) -> &mut Self {
        self.property(name, &value.to_be_bytes())
    }

    /// Adds a NUL-terminated string property.
    pub fn property_str(&mut self, name: &str, value: &str) -> &mut Self {
        self.property_strs(name, &[value])
    }

    /// Adds a string-list property such as `compatible`.
    pub fn property_strs(&mut self, name: &str, values: &[&str]) -> &mut Self {
        let mut value = Vec::new();
        for entry in values {
            value.extend_from_slice(entry.as_bytes());
            value.push(0);
        }
        self.property(name, &value)
    }

    /// Adds a `reg` property of 32-bit (address, size) pairs.
    pub fn reg32(&mut self, pairs: &[(u32, u32)]) -> &mut Self {
        let mut value = Vec::with_capacity(pairs.len() * 8);
        for (address, size) in pairs {
            value.extend_from_slice(&address.to_be_bytes());
            value.extend_from_slice(&size.to_be_bytes());
        }
        self.property("reg", &value)
    }

    /// Adds a `reg` property of 64-bit (address, size) pairs.
    pub fn reg64(&mut self, pairs: &[(u64, u64)]) -> &mut Self {
        let mut value = Vec::with_capacity(pairs.len() * 16);
        for (address, size) in pairs {
            value.extend_from_slice(&address.to_be_bytes());
            value.extend_from_slice(&size.to_be_bytes());
        }
        self.property("reg", &value)
    }

    /// Builds the final blob, appending the END token.
    pub fn build(&self) -> Vec<u8> {
        let mut structure = self.structure.clone();
        structure.extend_from_slice(&Token::END.to_be_bytes());

        let off_mem_rsvmap = HEADER_SIZE;
        let reservations_size = (self.reservations.len() + 1) * 16;
        let off_dt_struct = off_mem_rsvmap + reservations_size;
        let off_dt_strings = off_dt_struct + structure.len();
        let total_size = align4(off_dt_strings + self.strings.len());

        let fields = [
            FDT_MAGIC,
            total_size as u32,
            off_dt_struct as u32,
            off_dt_strings as u32,
            off_mem_rsvmap as u32,
            VERSION,
            LAST_COMPATIBLE_VERSION,
            self.boot_cpu,
            self.strings.len() as u32,
            structure.len() as u32,
        ];

        let mut blob = Vec::with_capacity(total_size);
        for field in fields {
            blob.extend_from_slice(&field.to_be_bytes());
        }
        let sentinel = core::iter::once((0, 0));
        for (address, size) in self.reservations.iter().copied().chain(sentinel) {
            blob.extend_from_slice(&address.to_be_bytes());
            blob.extend_from_slice(&size.to_be_bytes());
        }
        blob.extend_from_slice(&structure);
        blob.extend_from_slice(&self.strings);
        blob.resize(total_size, 0);
        blob
    }

    fn token(&mut self, token: u32) -> &mut Self {
        self.structure.extend_from_slice(&token.to_be_bytes());
        self
    }

    fn pad(&mut self) {
        self.structure.resize(align4(self.structure.len()), 0);
    }

    fn intern(&mut self, name: &str) -> u32 {
        if let Some(&offset) = self.string_cache.get(name) {
            return offset;
        }

        let offset = self.strings.len() as u32;
        self.strings.extend_from_slice(name.as_bytes());
        self.strings.push(0);
        self.string_cache.insert(String::from(name), offset);
        offset
    }
}

impl Default for FdtBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::FdtHeader;

    #[test]
    fn lays_out_blocks_in_order() {
        let mut builder = FdtBuilder::new();
        builder.reserve(0x8000_0000, 0x1000);
        builder.begin_node("");
        builder.property_u32("#address-cells", 2);
        builder.end_node();
        let blob = builder.build();

        let header = FdtHeader::parse(&blob).unwrap();
        assert_eq!(header.total_size as usize, blob.len());
        assert_eq!(header.off_mem_rsvmap as usize, HEADER_SIZE);
        assert_eq!(header.off_dt_struct as usize, HEADER_SIZE + 32);
        assert_eq!(
            header.off_dt_strings,
            header.off_dt_struct + header.size_dt_struct
        );
        assert_eq!(header.version, 17);
        assert_eq!(blob.len() % 4, 0);
    }

    #[test]
    fn interns_property_names_once() {
        let mut builder = FdtBuilder::new();
        builder.begin_node("");
        builder.reg32(&[(0, 0x1000)]);
        builder.begin_node("child");
        builder.reg32(&[(0x1000, 0x1000)]);
        builder.end_node();
        builder.end_node();

        assert_eq!(builder.strings, b"reg\0");
    }
}
