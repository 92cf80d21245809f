use std::{error::Error, fmt, io};

use parameter_server::StoreErr;
use tokio::task::JoinError;

/// The parameter synchronization module's result type.
pub type Result<T> = std::result::Result<T, SyncErr>;

/// Parameter synchronization failures.
#[derive(Debug)]
pub enum SyncErr {
    ExclusiveCorrections {
        momentum: f32,
        elastic: f32,
    },
    InvalidRate {
        what: &'static str,
        value: f32,
    },
    InvalidWarmup {
        rounds: usize,
    },
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    State {
        op: &'static str,
        state: &'static str,
    },
    Device(String),
    Aborted(JoinError),
    Store(StoreErr),
}

impl fmt::Display for SyncErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncErr::ExclusiveCorrections { momentum, elastic } => write!(
                f,
                "momentum ({momentum}) and elastic ({elastic}) corrections can't be combined"
            ),
            SyncErr::InvalidRate { what, value } => {
                write!(f, "{what} must be finite and non negative, got {value}")
            }
            SyncErr::InvalidWarmup { rounds } => {
                write!(f, "warmup must span at least one round, got {rounds}")
            }
            SyncErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(f, "{what} size mismatch: got {got}, expected {expected}"),
            SyncErr::State { op, state } => write!(f, "can't {op} while {state}"),
            SyncErr::Device(e) => write!(f, "device error: {e}"),
            SyncErr::Aborted(e) => write!(f, "background exchange aborted: {e}"),
            SyncErr::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl Error for SyncErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SyncErr::Aborted(e) => Some(e),
            SyncErr::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreErr> for SyncErr {
    fn from(value: StoreErr) -> Self {
        Self::Store(value)
    }
}

impl From<JoinError> for SyncErr {
    fn from(value: JoinError) -> Self {
        Self::Aborted(value)
    }
}

impl From<io::Error> for SyncErr {
    fn from(value: io::Error) -> Self {
        Self::Store(StoreErr::Io(value))
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<SyncErr> for io::Error {
    fn from(value: SyncErr) -> Self {
        match value {
            SyncErr::Store(e) => e.into(),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
