//! A small facade over an s3 client.
//!
//! Start with [`SimpleS3::new()`]. Retries, request signing and transport are all
//! left to [`aws_sdk_s3`]; this crate only wires local files and remote urls to
//! `put_object`, `get_object` and `list_objects`.

mod config;
mod error;
mod facade;
mod object_ref;
mod put_stream;
mod stage;
mod storage;

pub use crate::config::{Credentials, Options, DEFAULT_PART_SIZE};
pub use crate::error::{BoxError, Error, ErrorKind, Result};
pub use crate::facade::{SimpleS3, UploadAck};
pub use crate::object_ref::{ObjectRef, ParseObjectRefError};
pub use crate::storage::{client, ObjectStorage};
