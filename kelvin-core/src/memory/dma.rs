use super::read_u32_le;

/// Class of DMA objects describing a window into VRAM
pub const DMA_CLASS_IN_MEMORY: u32 = 0x3D;

/// Guest physical addresses are masked to the VRAM aperture
const VRAM_ADDRESS_MASK: u32 = 0x07FF_FFFF;

bitflags::bitflags! {
    #[derive(Default, Debug, Clone, Copy)]
    struct DmaFlags: u32 {
        const CLASS  = 0b00000000000000000000111111111111;
        const ADJUST = 0b11111111111100000000000000000000;
    }
}

impl DmaFlags {
    fn class(&self) -> u32 {
        self.bits() & Self::CLASS.bits()
    }

    fn adjust(&self) -> u32 {
        (self.bits() & Self::ADJUST.bits()) >> 20
    }
}

/// A DMA object descriptor as stored in instance memory.
///
/// Layout (3 words): flags (class + page adjust), limit, frame address.
#[derive(Debug, Clone, Copy)]
pub struct DmaObject {
    pub class: u32,
    pub limit: u32,
    pub address: u32,
}

impl DmaObject {
    pub fn load(ramin: &[u8], handle: u32) -> Self {
        let handle = handle as usize;
        assert!(
            handle + 12 <= ramin.len(),
            "DMA object {:08X} outside instance memory",
            handle
        );

        let flags = DmaFlags::from_bits_retain(read_u32_le(ramin, handle));
        let limit = read_u32_le(ramin, handle + 4);
        let frame = read_u32_le(ramin, handle + 8);

        Self {
            class: flags.class(),
            limit,
            address: (frame & 0xFFFF_F000) | flags.adjust(),
        }
    }

    /// Maps the object onto VRAM of `vram_len` bytes, returning the start
    /// offset and the length that can be safely addressed from it.
    pub fn map(&self, vram_len: usize) -> (usize, usize) {
        let addr = (self.address & VRAM_ADDRESS_MASK) as usize;
        assert!(
            addr < vram_len,
            "DMA object address {:08X} outside VRAM",
            self.address
        );
        let length = (self.limit as usize + 1).min(vram_len - addr);
        (addr, length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::write_u32_le;

    #[test]
    fn load_and_map() {
        let mut ramin = vec![0; 0x100];
        write_u32_le(&mut ramin, 0x20, DMA_CLASS_IN_MEMORY | (0x123 << 20));
        write_u32_le(&mut ramin, 0x24, 0xFFF);
        write_u32_le(&mut ramin, 0x28, 0x8001_0000 | 3);

        let dma = DmaObject::load(&ramin, 0x20);
        assert_eq!(dma.class, DMA_CLASS_IN_MEMORY);
        assert_eq!(dma.address, 0x8001_0123);

        let (start, len) = dma.map(0x20000);
        assert_eq!(start, 0x10123);
        assert_eq!(len, 0x1000);
    }

    #[test]
    fn map_clamps_to_vram() {
        let dma = DmaObject {
            class: DMA_CLASS_IN_MEMORY,
            limit: 0xFFFF_FFFE,
            address: 0x100,
        };
        assert_eq!(dma.map(0x1000), (0x100, 0xF00));
    }

    #[test]
    #[should_panic]
    fn load_outside_ramin() {
        let ramin = vec![0; 0x10];
        DmaObject::load(&ramin, 0x8);
    }
}
