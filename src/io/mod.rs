//! Byte sources for the decoders
//!
//! Everything a format parser or codec reads goes through a
//! [`StreamHandle`], a shared handle on a buffered [`StreamFile`].

pub mod memory;
pub mod streamfile;
pub mod util;

pub use memory::MemoryFiles;
pub use streamfile::{
    open_stdio_streamfile, open_stdio_streamfile_buffer, Backing, BufferedStreamFile, StreamFile,
    StreamHandle, STREAMFILE_DEFAULT_BUFFER_SIZE,
};
pub use util::{
    check_extensions, directory_prefix, filename_extension, find_chunk, find_chunk_be, find_chunk_le,
    open_stream_ext, read_key_file, read_pos_file, ChunkLocation,
};
