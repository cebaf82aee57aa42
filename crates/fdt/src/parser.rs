//! Single-pass walk of the structure block.
//!
//! The walk keeps a small stack with one [`NodeContext`] per open node. Each context
//! records what the node means to us ([`NodeClass`]) and whether it is a syscon device
//! waiting for its `reg` property. Semantic nodes are recognised by name and by the
//! depth at which they open:
//!
//! | depth | parent            | name                      | class         |
//! |-------|-------------------|---------------------------|---------------|
//! | 0     | -                 | any                       | `Root`        |
//! | 1     | `Root`            | `cpus`                    | `Cpus`        |
//! | 1     | `Root`            | `memory`, `memory@…`      | `Memory`      |
//! | 1     | `Root`            | `reserved-memory`         | `ReservedMemory` |
//! | 2     | `Cpus`            | `cpu@…`                   | `Cpu`         |
//! | 2     | `ReservedMemory`  | any                       | `Reservation` |
//!
//! Nodes below a `Memory` or `Reservation` node inherit that class.

use crate::boot_info::{BootInfo, MemRegion, SysconDevice};
use crate::endian::{Cursor, cstr_at};
use crate::header::{FdtHeader, HEADER_SIZE};
use crate::property::{RegIter, is_syscon_compatible};

/// Deepest nesting level that gets a context entry. Deeper nodes are walked but
/// carry no meaning.
pub const MAX_NODE_DEPTH: usize = 16;

/// Structure block tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    BeginNode,
    EndNode,
    Prop,
    Nop,
    End,
    Unknown(u32),
}

impl Token {
    pub const BEGIN_NODE: u32 = 0x1;
    pub const END_NODE: u32 = 0x2;
    pub const PROP: u32 = 0x3;
    pub const NOP: u32 = 0x4;
    pub const END: u32 = 0x9;
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        match value {
            Token::BEGIN_NODE => Token::BeginNode,
            Token::END_NODE => Token::EndNode,
            Token::PROP => Token::Prop,
            Token::NOP => Token::Nop,
            Token::END => Token::End,
            other => Token::Unknown(other),
        }
    }
}

/// What a node means to the boot summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    Root,
    Cpus,
    Cpu,
    Memory,
    ReservedMemory,
    Reservation,
    #[default]
    Other,
}

impl NodeClass {
    /// Classifies a node opening at `depth` below a parent of class `parent`.
    fn classify(name: &[u8], depth: usize, parent: Option<NodeClass>) -> Self {
        match (depth, parent) {
            (0, _) => NodeClass::Root,
            (1, Some(NodeClass::Root)) => {
                if name == b"cpus" {
                    NodeClass::Cpus
                } else if name == b"memory" || name.starts_with(b"memory@") {
                    NodeClass::Memory
                } else if name == b"reserved-memory" {
                    NodeClass::ReservedMemory
                } else {
                    NodeClass::Other
                }
            }
            (2, Some(NodeClass::Cpus)) if name.starts_with(b"cpu@") => NodeClass::Cpu,
            (2, Some(NodeClass::ReservedMemory)) => NodeClass::Reservation,
            (_, Some(NodeClass::Memory)) => NodeClass::Memory,
            (_, Some(NodeClass::Reservation)) => NodeClass::Reservation,
            _ => NodeClass::Other,
        }
    }
}

/// Progress of syscon detection for one node.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum SysconState {
    /// No matching `compatible` seen yet.
    #[default]
    Unmatched,
    /// A matching `compatible` was seen; the next `reg` is the device's window.
    AwaitingReg,
    /// The device has been recorded.
    Recorded,
}

/// Per-node state kept while the node is open.
#[derive(Debug, Default, Clone, Copy)]
struct NodeContext<'a> {
    name: &'a [u8],
    class: NodeClass,
    syscon: SysconState,
}

/// Stack of open nodes.
struct NodeStack<'a> {
    entries: [NodeContext<'a>; MAX_NODE_DEPTH],
    depth: usize,
}

impl<'a> NodeStack<'a> {
    fn new() -> Self {
        Self {
            entries: [NodeContext::default(); MAX_NODE_DEPTH],
            depth: 0,
        }
    }

    /// Number of currently open nodes.
    fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the innermost open node, if it has a context entry.
    fn current(&mut self) -> Option<&mut NodeContext<'a>> {
        let index = self.depth.checked_sub(1)?;
        self.entries.get_mut(index)
    }

    fn parent_class(&self) -> Option<NodeClass> {
        let index = self.depth.checked_sub(1)?;
        self.entries.get(index).map(|context| context.class)
    }

    fn push(&mut self, context: NodeContext<'a>) {
        if let Some(slot) = self.entries.get_mut(self.depth) {
            *slot = context;
        }
        self.depth += 1;
    }

    /// Closes the innermost node. Returns `false` if no node was open.
    fn pop(&mut self) -> bool {
        match self.depth.checked_sub(1) {
            Some(depth) => {
                self.depth = depth;
                true
            }
            None => false,
        }
    }
}

/// Parses a device tree blob into a [`BootInfo`].
///
/// Never fails: an invalid header yields an empty summary, and malformed or truncated
/// structure data ends the walk early with whatever had been found up to that point.
pub fn parse(blob: &[u8]) -> BootInfo {
    let header = match FdtHeader::parse(blob) {
        Ok(header) => header,
        Err(e) => {
            log::warn!("device tree rejected: {}", e);
            return BootInfo::empty();
        }
    };

    let blob = match blob.get(..header.total_size as usize) {
        Some(blob) if header.total_size as usize >= HEADER_SIZE => blob,
        _ => blob,
    };

    let mut info = BootInfo::empty();
    info.dtb_base = blob.as_ptr() as usize;
    info.dtb_size = header.total_size as usize;
    info.boot_hart_id = header.boot_cpuid_phys;

    parse_reservation_table(header.reservation_table(blob), &mut info);

    let mut walker = Walker {
        strings: header.strings_block(blob),
        stack: NodeStack::new(),
        info: &mut info,
    };
    walker.walk(header.structure_block(blob));

    info
}

/// Appends the memory reservation table entries to `info.reserved_regions`.
///
/// The table is a list of 64-bit (address, size) pairs ending with a (0, 0) entry.
fn parse_reservation_table(table: &[u8], info: &mut BootInfo) {
    let mut cursor = Cursor::new(table);
    loop {
        let (Some(address), Some(size)) = (cursor.read::<u64>(), cursor.read::<u64>()) else {
            log::warn!("memory reservation table is not terminated");
            return;
        };
        if address == 0 && size == 0 {
            return;
        }

        let region = MemRegion::new(address as usize, size as usize);
        if !info.reserved_regions.push(region) {
            log::debug!("reserved region list full, dropping {}", region);
            return;
        }
    }
}

struct Walker<'a, 'i> {
    strings: &'a [u8],
    stack: NodeStack<'a>,
    info: &'i mut BootInfo,
}

impl<'a> Walker<'a, '_> {
    fn walk(&mut self, structure: &'a [u8]) {
        let mut cursor = Cursor::new(structure);

        loop {
            let Some(token) = cursor.read::<u32>() else {
                log::warn!("structure block ended without an END token");
                return;
            };

            match Token::from(token) {
                Token::BeginNode => {
                    let Some(name) = cursor.take_cstr() else {
                        log::warn!("node name runs past the structure block");
                        return;
                    };
                    cursor.align();
                    self.begin_node(name);
                }
                Token::EndNode => {
                    if !self.stack.pop() {
                        log::warn!("unbalanced END_NODE at offset {:#x}", cursor.offset() - 4);
                        return;
                    }
                }
                Token::Prop => {
                    let (Some(len), Some(name_offset)) =
                        (cursor.read::<u32>(), cursor.read::<u32>())
                    else {
                        log::warn!("property header runs past the structure block");
                        return;
                    };
                    let Some(value) = cursor.take(len as usize) else {
                        log::warn!("property value runs past the structure block");
                        return;
                    };
                    cursor.align();
                    self.property(name_offset, value);
                }
                Token::Nop => {}
                Token::End => return,
                Token::Unknown(token) => {
                    log::warn!(
                        "unknown device tree token {:#010x} at offset {:#x}",
                        token,
                        cursor.offset() - 4
                    );
                    return;
                }
            }
        }
    }

    fn begin_node(&mut self, name: &'a [u8]) {
        let depth = self.stack.depth();
        let class = NodeClass::classify(name, depth, self.stack.parent_class());

        if class == NodeClass::Cpu {
            self.info.core_count += 1;
        }

        self.stack.push(NodeContext {
            name,
            class,
            syscon: SysconState::Unmatched,
        });
    }

    fn property(&mut self, name_offset: u32, value: &'a [u8]) {
        let Some(name) = cstr_at(self.strings, name_offset as usize) else {
            log::warn!("property name offset {:#x} is outside the strings block", name_offset);
            return;
        };
        let depth = self.stack.depth();
        let syscon_full = self.info.syscon_devices.is_full();
        let Some(node) = self.stack.current() else {
            return;
        };

        match name {
            b"compatible" => {
                if depth > 1
                    && !syscon_full
                    && node.syscon == SysconState::Unmatched
                    && is_syscon_compatible(value)
                {
                    node.syscon = SysconState::AwaitingReg;
                }
            }
            b"reg" => {
                let node = *node;
                self.reg(node, value);
            }
            _ => {}
        }
    }

    fn reg(&mut self, node: NodeContext<'a>, value: &'a [u8]) {
        let Some(pairs) = RegIter::new(value) else {
            if matches!(node.class, NodeClass::Memory | NodeClass::Reservation)
                || node.syscon == SysconState::AwaitingReg
            {
                log::warn!("unexpected reg property length {}", value.len());
            }
            return;
        };

        match node.class {
            NodeClass::Memory => {
                Self::append(&mut self.info.memory_regions, pairs.clone(), "memory");
            }
            NodeClass::Reservation => {
                Self::append(&mut self.info.reserved_regions, pairs.clone(), "reserved");
            }
            _ => {}
        }

        if node.syscon == SysconState::AwaitingReg {
            self.record_syscon(node.name, pairs);
        }
    }

    fn append<const N: usize>(
        list: &mut crate::FixedList<MemRegion, N>,
        pairs: RegIter<'_>,
        kind: &str,
    ) {
        for region in pairs {
            if !list.push(region) {
                log::debug!("{} region list full, dropping {}", kind, region);
                return;
            }
        }
    }

    fn record_syscon(&mut self, name: &'a [u8], mut pairs: RegIter<'_>) {
        let Some(window) = pairs.next() else {
            return;
        };

        let device = SysconDevice::new(name, window.base, window.size);
        if self.info.syscon_devices.push(device) {
            log::info!("found syscon device {} @ {:#x}", device.name(), device.base);
        }
        if let Some(node) = self.stack.current() {
            node.syscon = SysconState::Recorded;
        }
    }
}
