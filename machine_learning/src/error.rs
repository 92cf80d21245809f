use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    ShapeMismatch {
        node: &'static str,
        input: (usize, usize),
        output: (usize, usize),
    },
    FrameOutOfRange {
        start: usize,
        len: usize,
        frames: usize,
    },
    EmptyInput {
        node: &'static str,
    },
    NotDifferentiable {
        node: &'static str,
    },
    MissingValue {
        node: &'static str,
        value: &'static str,
    },
    TempNotRequested {
        node: &'static str,
    },
    InvalidManifest {
        line: usize,
        reason: String,
    },
    Io(io::Error),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::ShapeMismatch {
                node,
                input,
                output,
            } => write!(
                f,
                "{node} maps its input elementwise, got an input of shape {input:?} and an output of shape {output:?}"
            ),
            MlErr::FrameOutOfRange { start, len, frames } => write!(
                f,
                "The frame range {start}..{} is out of bounds for a minibatch of {frames} frames",
                start + len
            ),
            MlErr::EmptyInput { node } => {
                write!(f, "{node} needs at least one row to reduce over")
            }
            MlErr::NotDifferentiable { node } => write!(
                f,
                "{node} is not differentiable and is used for evaluation only"
            ),
            MlErr::MissingValue { node, value } => write!(
                f,
                "{node} needs its {value} value to compute the input gradient but it was released"
            ),
            MlErr::TempNotRequested { node } => write!(
                f,
                "{node} was asked to backpropagate before requesting its temporary matrices"
            ),
            MlErr::InvalidManifest { line, reason } => {
                write!(f, "Invalid manifest at line {line}: {reason}")
            }
            MlErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MlErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
