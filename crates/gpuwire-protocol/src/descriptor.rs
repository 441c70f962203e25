bitflags::bitflags! {
    /// Access requested by a buffer map operation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MapMode: u32 {
        const READ  = 0b0000_0001;
        const WRITE = 0b0000_0010;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const MAP_READ  = 0x0001;
        const MAP_WRITE = 0x0002;
        const COPY_SRC  = 0x0004;
        const COPY_DST  = 0x0008;
        const INDEX     = 0x0010;
        const VERTEX    = 0x0020;
        const UNIFORM   = 0x0040;
        const STORAGE   = 0x0080;
        const INDIRECT  = 0x0100;
    }
}

/// Decoded buffer creation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    pub size: u64,
    pub usage: BufferUsage,
    pub mapped_at_creation: bool,
}
