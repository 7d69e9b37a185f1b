//! Error types for the map tile cache

use std::fmt;

#[derive(Debug)]
pub enum TileCacheError {
    Io(Box<std::io::Error>),
    Http(Box<reqwest::Error>),
    /// Neither a local-data nor a home directory could be determined
    NoHomeDirectory,
    InvalidBudget {
        max_bytes: u64,
        target_bytes: u64,
    },
    InvalidBoundingBox(String),
    InvalidZoomRange {
        min: u8,
        max: u8,
    },
    InvalidGrid(u32),
    ZoomNotSupported {
        zoom: u8,
        max: u8,
    },
    Provider(String),
}

impl fmt::Display for TileCacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Http(err) => write!(f, "HTTP error: {}", err),
            Self::NoHomeDirectory => write!(f, "Could not determine a home directory"),
            Self::InvalidBudget {
                max_bytes,
                target_bytes,
            } => write!(
                f,
                "Invalid cache budget: target {} bytes must be below max {} bytes",
                target_bytes, max_bytes
            ),
            Self::InvalidBoundingBox(msg) => write!(f, "Invalid bounding box: {}", msg),
            Self::InvalidZoomRange { min, max } => {
                write!(f, "Invalid zoom range: {} > {}", min, max)
            }
            Self::InvalidGrid(n) => write!(f, "Invalid grid size: {} (must be >= 1)", n),
            Self::ZoomNotSupported { zoom, max } => {
                write!(f, "Zoom {} not supported (source max is {})", zoom, max)
            }
            Self::Provider(msg) => write!(f, "Tile provider error: {}", msg),
        }
    }
}

impl std::error::Error for TileCacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err.as_ref()),
            Self::Http(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TileCacheError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Box::new(err))
    }
}

impl From<reqwest::Error> for TileCacheError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, TileCacheError>;
