/// Text encodings accepted when reading INF files and produced when writing.
pub mod encoding;
mod inf_file;

pub use encoding::{Codec, LineEnding};
pub use inf_file::{
    DEFAULT_SIBLING_PREFIX, Descriptor, Destination, PatchError, PatchReport, WriteOptions,
    patch_inf_file, read_descriptor, write_descriptor,
};
