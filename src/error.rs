use std::fmt;

#[derive(Debug)]
pub enum BobinaError {
    OutOfBounds(String),
    InvalidSchema(String),
    RowMismatch(String),
    CapacityExceeded(String),
    NonDeterministic(String),
    NotSupported(String),
    Disposed,
    InvalidConfiguration(String),
    Codec(image::ImageError),
    Io(std::io::Error),
}

impl fmt::Display for BobinaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BobinaError::OutOfBounds(message) => {
                write!(f, "component does not fit the printable area: {}", message)
            }
            BobinaError::InvalidSchema(message) => {
                write!(f, "invalid table schema: {}", message)
            }
            BobinaError::RowMismatch(message) => {
                write!(f, "inconsistent table row: {}", message)
            }
            BobinaError::CapacityExceeded(message) => {
                write!(f, "capacity exceeded: {}", message)
            }
            BobinaError::NonDeterministic(message) => {
                write!(f, "unresolved required value: {}", message)
            }
            BobinaError::NotSupported(message) => {
                write!(f, "not supported: {}", message)
            }
            BobinaError::Disposed => write!(f, "operation on a closed document"),
            BobinaError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            BobinaError::Codec(err) => write!(f, "image codec error: {}", err),
            BobinaError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for BobinaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BobinaError::Codec(err) => Some(err),
            BobinaError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BobinaError {
    fn from(value: std::io::Error) -> Self {
        BobinaError::Io(value)
    }
}

impl From<image::ImageError> for BobinaError {
    fn from(value: image::ImageError) -> Self {
        BobinaError::Codec(value)
    }
}
