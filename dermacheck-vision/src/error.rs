use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BufferError {
    #[error("pixel buffer of {len} bytes does not match {width}x{height} RGBA")]
    SizeMismatch { len: usize, width: u32, height: u32 },
}

#[derive(Debug, Error, PartialEq)]
pub enum LibraryError {
    #[error("category name is empty")]
    EmptyName,
    #[error("category \"{0}\" already exists")]
    DuplicateCategory(String),
    #[error("vector has {found} dimensions, library stores {expected}")]
    DimensionMismatch { expected: usize, found: usize },
}
