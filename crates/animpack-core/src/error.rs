/// Core error types for the animpack pipeline.
use std::path::PathBuf;

/// A specialized Result type for animpack operations.
pub type AnimResult<T> = Result<T, AnimError>;

/// Top-level error type encompassing every pipeline stage.
///
/// A failure aborts the output spec being processed; outputs already
/// written by earlier specs are never rolled back.
#[derive(Debug, thiserror::Error)]
pub enum AnimError {
    #[error("decode error: {message} ({path:?})")]
    Decode { message: String, path: PathBuf },

    #[error("invalid encoder configuration: {0}")]
    Config(String),

    #[error("frame {index} failed during {stage}: {message}")]
    Frame {
        index: usize,
        stage: &'static str,
        message: String,
    },

    #[error("finalize error: {0}")]
    Finalize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl AnimError {
    /// Create a decode error for an input file.
    pub fn decode(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        AnimError::Decode {
            message: message.into(),
            path: path.into(),
        }
    }

    /// Create a per-frame error carrying the zero-based frame index and the
    /// stage that rejected it.
    pub fn frame(index: usize, stage: &'static str, message: impl Into<String>) -> Self {
        AnimError::Frame {
            index,
            stage,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_error_display() {
        let err = AnimError::frame(1, "color conversion", "bad buffer");
        assert_eq!(
            err.to_string(),
            "frame 1 failed during color conversion: bad buffer"
        );
    }

    #[test]
    fn test_decode_error_display() {
        let err = AnimError::decode("not a png", "/tmp/in.png");
        assert!(err.to_string().contains("not a png"));
        assert!(err.to_string().contains("in.png"));
    }
}
