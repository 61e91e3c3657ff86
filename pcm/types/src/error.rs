/*!
    Error types for the pcm crate ecosystem.
*/

use std::fmt;

/**
    Error type for the pcm crate ecosystem.
*/
#[derive(Debug)]
pub enum Error {
    /// Converter construction rejected (non-audio codec, impossible
    /// destination parameters).
    Configuration { message: String },
    /// The resampling engine could not be built from the observed source
    /// and configured destination parameters.
    Initialization { message: String },
    /// A resampling step failed (malformed or inconsistent buffers).
    Conversion { message: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { message } => write!(f, "configuration error: {message}"),
            Self::Initialization { message } => write!(f, "initialization error: {message}"),
            Self::Conversion { message } => write!(f, "conversion error: {message}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /**
        Create a configuration error with the given message.
    */
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /**
        Create an initialization error with the given message.
    */
    pub fn initialization(message: impl Into<String>) -> Self {
        Self::Initialization {
            message: message.into(),
        }
    }

    /**
        Create a conversion error with the given message.
    */
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            message: message.into(),
        }
    }
}

/**
    Result type alias for the pcm crate ecosystem.
*/
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let e = Error::configuration("codec is not audio");
        assert_eq!(format!("{e}"), "configuration error: codec is not audio");

        let e = Error::initialization("zero channels");
        assert_eq!(format!("{e}"), "initialization error: zero channels");

        let e = Error::conversion("bad buffer");
        assert_eq!(format!("{e}"), "conversion error: bad buffer");
    }

    #[test]
    fn error_is_std_error() {
        fn takes_error(_: &dyn std::error::Error) {}
        takes_error(&Error::conversion("test"));
    }
}
