use crate::cache::CacheLevel;
use kernel_memory_addresses::Pfn;
use thiserror::Error;

/// Why a frame allocation failed.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum AllocError {
    #[error("out of memory")]
    Exhausted,
    #[error("color {color} out of range ({colors} colors)")]
    InvalidColor { color: usize, colors: usize },
    #[error("frame {0} is not free")]
    NotFree(Pfn),
    #[error("no {0} cache described")]
    NoSuchCache(CacheLevel),
}

/// Why a color reservation failed.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("color {0} is already reserved")]
    Unavailable(usize),
    #[error("no free colors left")]
    NoneFree,
    #[error("color {color} out of range ({colors} colors)")]
    InvalidColor { color: usize, colors: usize },
    #[error("no {0} cache described")]
    NoSuchCache(CacheLevel),
}
