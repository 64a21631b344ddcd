//! Cloudflare R2 video store.
//!
//! This crate provides:
//! - The [`VideoStore`] abstraction over an object bucket
//! - An R2 implementation over the S3 API and an in-memory one
//! - Video listing with thumbnail pairing, uploads and deletion
//! - Object key validation and single byte-range handling

pub mod client;
pub mod error;
pub mod memory;
pub mod operations;
pub mod range;
pub mod store;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use operations::{
    delete_video, list_videos, sanitize_file_name, upload_thumbnail, upload_video, validate_key,
    ThumbnailObject, THUMBNAILS_PREFIX, VIDEOS_PREFIX,
};
pub use range::ByteRange;
pub use store::{encode_key, ObjectData, ObjectInfo, VideoStore};
