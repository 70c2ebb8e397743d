#![allow(dead_code)] // Complete accessor API; the host uses the write side
//! Bounds-checked storage image
//!
//! [`MemoryImage`] models the interpreter's variable storage as a set of
//! allocated regions keyed by base address. Every read validates that the
//! requested range lies inside one allocated region before touching it, so
//! a type descriptor that disagrees with the memory it claims to describe
//! produces an error instead of an out-of-bounds read.
//!
//! # Error Handling
//!
//! Methods return `Result<_, String>`. The trace layer converts failures to
//! `TraceError::CorruptRuntimeState` at its boundary; keeping plain strings
//! here avoids a dependency cycle with the trace error type.

use rustc_hash::FxHashMap;

/// Memory address type (64-bit)
pub type Address = u64;

/// Starting address for allocated regions.
///
/// Address 0 stays unmapped so it can key the null-pointer sentinel, and a
/// generous gap below the base keeps small integers from ever looking like
/// valid addresses.
pub const IMAGE_BASE_ADDRESS: Address = 0x1000;

/// The interpreter's variable storage, addressable by the tracer.
#[derive(Debug, Clone, Default)]
pub struct MemoryImage {
    regions: FxHashMap<Address, Vec<u8>>,
    next_address: Address,
}

impl MemoryImage {
    pub fn new() -> Self {
        MemoryImage {
            regions: FxHashMap::default(),
            next_address: IMAGE_BASE_ADDRESS,
        }
    }

    /// Allocate a zero-filled region and return its base address.
    pub fn alloc(&mut self, size: usize) -> Address {
        let addr = self.next_address;
        // A zero-size slot still gets a distinct address.
        self.next_address += size.max(1) as u64;
        self.regions.insert(addr, vec![0; size]);
        addr
    }

    /// Find the region containing `addr`.
    fn locate(&self, addr: Address) -> Option<(Address, &Vec<u8>)> {
        for (&base, region) in &self.regions {
            if addr >= base && addr < base + region.len() as u64 {
                return Some((base, region));
            }
        }
        None
    }

    fn locate_mut(&mut self, addr: Address) -> Option<(Address, &mut Vec<u8>)> {
        for (&base, region) in &mut self.regions {
            if addr >= base && addr < base + region.len() as u64 {
                return Some((base, region));
            }
        }
        None
    }

    /// Read `size` bytes starting at `addr`, validating the full range.
    pub fn read_bytes(&self, addr: Address, size: usize) -> Result<&[u8], String> {
        let (base, region) = self
            .locate(addr)
            .ok_or_else(|| format!("address {:#x} is not in any allocated region", addr))?;
        let offset = (addr - base) as usize;
        if offset + size > region.len() {
            return Err(format!(
                "read of {} bytes at {:#x} overruns region of {} bytes at {:#x}",
                size,
                addr,
                region.len(),
                base
            ));
        }
        Ok(&region[offset..offset + size])
    }

    /// Write bytes starting at `addr`, validating the full range.
    pub fn write_bytes(&mut self, addr: Address, bytes: &[u8]) -> Result<(), String> {
        let (base, region) = self
            .locate_mut(addr)
            .ok_or_else(|| format!("address {:#x} is not in any allocated region", addr))?;
        let offset = (addr - base) as usize;
        if offset + bytes.len() > region.len() {
            return Err(format!(
                "write of {} bytes at {:#x} overruns region of {} bytes at {:#x}",
                bytes.len(),
                addr,
                region.len(),
                base
            ));
        }
        region[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn read_u8(&self, addr: Address) -> Result<u8, String> {
        Ok(self.read_bytes(addr, 1)?[0])
    }

    pub fn read_i16(&self, addr: Address) -> Result<i16, String> {
        let mut buf = [0u8; 2];
        buf.copy_from_slice(self.read_bytes(addr, 2)?);
        Ok(i16::from_le_bytes(buf))
    }

    pub fn read_u16(&self, addr: Address) -> Result<u16, String> {
        let mut buf = [0u8; 2];
        buf.copy_from_slice(self.read_bytes(addr, 2)?);
        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_i32(&self, addr: Address) -> Result<i32, String> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.read_bytes(addr, 4)?);
        Ok(i32::from_le_bytes(buf))
    }

    pub fn read_u32(&self, addr: Address) -> Result<u32, String> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.read_bytes(addr, 4)?);
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_i64(&self, addr: Address) -> Result<i64, String> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.read_bytes(addr, 8)?);
        Ok(i64::from_le_bytes(buf))
    }

    pub fn read_u64(&self, addr: Address) -> Result<u64, String> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.read_bytes(addr, 8)?);
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_f64(&self, addr: Address) -> Result<f64, String> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.read_bytes(addr, 8)?);
        Ok(f64::from_le_bytes(buf))
    }

    /// Read a pointer-sized target address.
    pub fn read_addr(&self, addr: Address) -> Result<Address, String> {
        self.read_u64(addr)
    }

    pub fn write_u8(&mut self, addr: Address, value: u8) -> Result<(), String> {
        self.write_bytes(addr, &[value])
    }

    pub fn write_i16(&mut self, addr: Address, value: i16) -> Result<(), String> {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    pub fn write_u16(&mut self, addr: Address, value: u16) -> Result<(), String> {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    pub fn write_i32(&mut self, addr: Address, value: i32) -> Result<(), String> {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    pub fn write_u32(&mut self, addr: Address, value: u32) -> Result<(), String> {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    pub fn write_i64(&mut self, addr: Address, value: i64) -> Result<(), String> {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    pub fn write_u64(&mut self, addr: Address, value: u64) -> Result<(), String> {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    pub fn write_f64(&mut self, addr: Address, value: f64) -> Result<(), String> {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    /// Write a pointer-sized target address.
    pub fn write_addr(&mut self, addr: Address, value: Address) -> Result<(), String> {
        self.write_u64(addr, value)
    }

    /// Length of the NUL-terminated string starting at `addr`, excluding
    /// the terminator. Fails if no NUL appears within the containing region.
    pub fn read_cstring_len(&self, addr: Address) -> Result<usize, String> {
        let (base, region) = self
            .locate(addr)
            .ok_or_else(|| format!("address {:#x} is not in any allocated region", addr))?;
        let offset = (addr - base) as usize;
        region[offset..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| format!("unterminated string at {:#x}", addr))
    }
}
