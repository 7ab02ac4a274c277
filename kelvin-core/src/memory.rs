pub mod dma;
#[cfg(feature = "debugger")]
pub mod hw_registers;
pub mod interrupts;

use byteorder::{ByteOrder, LittleEndian};

pub type Result<T, E = String> = std::result::Result<T, E>;

/// Size of the pages tracked for CPU-side modifications of VRAM.
pub const DIRTY_PAGE_SIZE: usize = 4096;

pub trait BusLine {
    fn read_u32(&mut self, addr: u32) -> Result<u32> {
        Err(format!(
            "{}: u32 read from {:08X}",
            std::any::type_name::<Self>(),
            addr
        ))
    }

    fn write_u32(&mut self, addr: u32, _data: u32) -> Result<()> {
        Err(format!(
            "{}: u32 write to {:08X}",
            std::any::type_name::<Self>(),
            addr
        ))
    }

    fn read_u16(&mut self, addr: u32) -> Result<u16> {
        Err(format!(
            "{}: u16 read from {:08X}",
            std::any::type_name::<Self>(),
            addr
        ))
    }
    fn write_u16(&mut self, addr: u32, _data: u16) -> Result<()> {
        Err(format!(
            "{}: u16 write to {:08X}",
            std::any::type_name::<Self>(),
            addr
        ))
    }

    fn read_u8(&mut self, addr: u32) -> Result<u8> {
        Err(format!(
            "{}: u8 read from {:08X}",
            std::any::type_name::<Self>(),
            addr
        ))
    }
    fn write_u8(&mut self, addr: u32, _data: u8) -> Result<()> {
        Err(format!(
            "{}: u8 write to {:08X}",
            std::any::type_name::<Self>(),
            addr
        ))
    }
}

/// Guest memory as seen by the graphics engine.
///
/// `vram` is the physical memory the DMA objects point into, `ramin` is the
/// instance memory holding DMA and graphics object descriptors.
pub trait GuestMemory: Send {
    fn vram(&self) -> &[u8];
    fn vram_mut(&mut self) -> &mut [u8];
    fn ramin(&self) -> &[u8];

    /// Returns `true` if any byte of `start..start+len` was modified by the
    /// CPU since the last call, and clears the modification state of that range.
    fn take_dirty(&mut self, _start: usize, _len: usize) -> bool {
        false
    }
}

/// Plain memory backed guest memory, with CPU modification tracking
/// at [`DIRTY_PAGE_SIZE`] granularity.
pub struct Vram {
    vram: Box<[u8]>,
    ramin: Box<[u8]>,
    dirty_pages: Vec<bool>,
}

impl Vram {
    pub fn new(vram_size: usize, ramin_size: usize) -> Self {
        let pages = vram_size.div_ceil(DIRTY_PAGE_SIZE);
        Self {
            vram: vec![0; vram_size].into_boxed_slice(),
            ramin: vec![0; ramin_size].into_boxed_slice(),
            dirty_pages: vec![false; pages],
        }
    }

    /// CPU side write, marks the touched pages as dirty
    pub fn write_vram(&mut self, addr: usize, data: &[u8]) {
        assert!(
            addr + data.len() <= self.vram.len(),
            "vram write out of range {:08X}+{:X}",
            addr,
            data.len()
        );
        self.vram[addr..addr + data.len()].copy_from_slice(data);
        self.mark_dirty(addr, data.len());
    }

    pub fn write_vram_u32(&mut self, addr: usize, data: u32) {
        let mut buf = [0; 4];
        LittleEndian::write_u32(&mut buf, data);
        self.write_vram(addr, &buf);
    }

    pub fn read_vram_u32(&self, addr: usize) -> u32 {
        LittleEndian::read_u32(&self.vram[addr..addr + 4])
    }

    pub fn write_ramin_u32(&mut self, addr: usize, data: u32) {
        LittleEndian::write_u32(&mut self.ramin[addr..addr + 4], data);
    }

    fn mark_dirty(&mut self, start: usize, len: usize) {
        if len == 0 {
            return;
        }
        let first = start / DIRTY_PAGE_SIZE;
        let last = (start + len - 1) / DIRTY_PAGE_SIZE;
        for page in &mut self.dirty_pages[first..=last] {
            *page = true;
        }
    }
}

impl GuestMemory for Vram {
    fn vram(&self) -> &[u8] {
        &self.vram
    }

    fn vram_mut(&mut self) -> &mut [u8] {
        &mut self.vram
    }

    fn ramin(&self) -> &[u8] {
        &self.ramin
    }

    fn take_dirty(&mut self, start: usize, len: usize) -> bool {
        if len == 0 {
            return false;
        }
        let first = start / DIRTY_PAGE_SIZE;
        let last = ((start + len - 1) / DIRTY_PAGE_SIZE).min(self.dirty_pages.len() - 1);
        let mut dirty = false;
        for page in &mut self.dirty_pages[first..=last] {
            dirty |= std::mem::take(page);
        }
        dirty
    }
}

#[inline]
pub fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    LittleEndian::read_u32(&data[offset..offset + 4])
}

#[inline]
pub fn write_u32_le(data: &mut [u8], offset: usize, value: u32) {
    LittleEndian::write_u32(&mut data[offset..offset + 4], value);
}

#[inline]
pub fn write_u64_le(data: &mut [u8], offset: usize, value: u64) {
    LittleEndian::write_u64(&mut data[offset..offset + 8], value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_writes_mark_pages_dirty() {
        let mut mem = Vram::new(DIRTY_PAGE_SIZE * 4, 0x1000);
        assert!(!mem.take_dirty(0, DIRTY_PAGE_SIZE * 4));

        mem.write_vram(DIRTY_PAGE_SIZE + 10, &[1, 2, 3]);
        assert!(!mem.take_dirty(0, DIRTY_PAGE_SIZE));
        assert!(mem.take_dirty(DIRTY_PAGE_SIZE, 16));
        // taking clears the state
        assert!(!mem.take_dirty(DIRTY_PAGE_SIZE, 16));
    }

    #[test]
    fn gpu_writes_are_not_tracked() {
        let mut mem = Vram::new(DIRTY_PAGE_SIZE * 2, 0x1000);
        mem.vram_mut()[5] = 0xAA;
        assert!(!mem.take_dirty(0, DIRTY_PAGE_SIZE * 2));
        assert_eq!(mem.vram()[5], 0xAA);
    }

    #[test]
    fn little_endian_helpers() {
        let mut mem = Vram::new(DIRTY_PAGE_SIZE, 0x100);
        mem.write_vram_u32(8, 0x11223344);
        assert_eq!(mem.vram()[8], 0x44);
        assert_eq!(mem.read_vram_u32(8), 0x11223344);

        mem.write_ramin_u32(0x10, 0xDEADBEEF);
        assert_eq!(read_u32_le(mem.ramin(), 0x10), 0xDEADBEEF);
    }
}
