use std::fmt;

use serde::{Deserialize, Serialize};

/// A client-chosen reference to a server-side object slot.
///
/// `id` indexes the slot in the per-type object table; `generation`
/// disambiguates reuse of the same id after it has been freed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub struct ObjectHandle {
    pub id: u32,
    pub generation: u32,
}

impl ObjectHandle {
    pub const fn new(id: u32, generation: u32) -> Self {
        Self { id, generation }
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@gen{}", self.id, self.generation)
    }
}

/// The kind of object a handle refers to. Each kind has its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum ObjectType {
    Device,
    Buffer,
    ComputePipeline,
    RenderPipeline,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectType::Device => "device",
            ObjectType::Buffer => "buffer",
            ObjectType::ComputePipeline => "compute pipeline",
            ObjectType::RenderPipeline => "render pipeline",
        };
        f.write_str(name)
    }
}

/// Client-assigned correlation number, echoed back verbatim in the
/// return command that resolves the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub struct RequestSerial(pub u64);

impl fmt::Display for RequestSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
