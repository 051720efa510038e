//! ARM physical <-> VideoCore bus address translation
//!
//! The VideoCore sees ARM RAM through an aliased window: bus address =
//! physical address + a fixed offset (0x4000_0000 for the L2-cached alias).
//! Addresses handed across the mailbox go out in bus space and come back
//! in bus space.

/// Fixed-offset translation between ARM physical and VideoCore bus space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusWindow {
    offset: u32,
}

impl BusWindow {
    pub const fn new(offset: u32) -> Self {
        Self { offset }
    }

    pub const fn offset(self) -> u32 {
        self.offset
    }

    /// Physical -> bus
    pub const fn to_bus(self, physical: u32) -> u32 {
        physical.wrapping_add(self.offset)
    }

    /// Bus -> physical
    ///
    /// Addresses at or below the offset are taken to be physical already
    /// and returned unchanged.
    pub const fn to_physical(self, bus: u32) -> u32 {
        if bus > self.offset {
            bus - self.offset
        } else {
            bus
        }
    }
}

/// Resolves kernel pointers to the 32-bit physical addresses the mailbox
/// can carry
pub trait PhysicalMemory {
    /// Physical address of `ptr`, or `None` if it lies outside the 32-bit
    /// window the VideoCore can address
    fn physical_address(&self, ptr: *const u8) -> Option<u32>;
}

/// Identity mapping: the MMU is off during bring-up, so a pointer value is
/// its physical address
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMapped;

impl PhysicalMemory for IdentityMapped {
    fn physical_address(&self, ptr: *const u8) -> Option<u32> {
        u32::try_from(ptr as usize).ok()
    }
}

impl<T: PhysicalMemory + ?Sized> PhysicalMemory for &T {
    fn physical_address(&self, ptr: *const u8) -> Option<u32> {
        (**self).physical_address(ptr)
    }
}
