pub mod archive;
pub mod memory;

pub use archive::{
    ArchiveIndex,
    RunArchive,
    RunArchiveWriter,
};
pub use memory::InMemoryRun;
