// Change encoders that reduce an image or byte pair to "what changed".
//
// - `mapper` — DeltaMapper/DeltaStream: similarity-gated pixel run tokens
// - `bytes`  — sparse offset-keyed byte diff (ByteDiffEncoder)
// - `varint` — base-128 integers used by the serialized byte diff

pub mod bytes;
pub mod mapper;
pub mod varint;

pub use bytes::{ByteDiff, ByteDiffError, DiffSpan};
pub use mapper::{
    DeltaMapper, DeltaStream, MapperOptions, Token, TokenError, TokenReader, map_images,
};
