//! Domain jobs: one [`Job`](crate::job::Job) implementation per load type

mod cpu;
mod files;
mod memory;
mod network;

pub use cpu::{BurnJob, BurnReport};
pub use files::{write_file, ContentPolicy, FileInput, FileJob, FileWritten, FillJob, SizePolicy};
pub use memory::{MemoryJob, MemoryMode, MemoryRegion, MemorySlice, MemoryTouch};
pub use network::{
    load_url_file, parse_url_list, resolve_targets, split_url_args, HttpResponse, NetworkJob,
};
