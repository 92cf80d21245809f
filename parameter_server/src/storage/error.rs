use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type of every parameter store operation.
pub type Result<T> = std::result::Result<T, StoreErr>;

/// The parameter store's error type.
#[derive(Debug)]
pub enum StoreErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    UnknownTable(u32),
    UnknownShard {
        table: u32,
        shard: u32,
    },
    LayoutMismatch {
        table: u32,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    Closed,
    Remote(String),
    Io(io::Error),
}

impl Display for StoreErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeMismatch {
                what,
                got,
                expected,
            } => write!(f, "size mismatch for {what}, got {got}, expected {expected}"),
            Self::UnknownTable(table) => write!(f, "table {table} was never created"),
            Self::UnknownShard { table, shard } => {
                write!(f, "table {table} has no shard {shard}")
            }
            Self::LayoutMismatch {
                table,
                got,
                expected,
            } => write!(
                f,
                "table {table} already exists with shard sizes {expected:?}, got {got:?}"
            ),
            Self::Closed => f.write_str("the store connection is closed"),
            Self::Remote(e) => write!(f, "remote store error: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for StoreErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StoreErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<StoreErr> for io::Error {
    fn from(value: StoreErr) -> Self {
        match value {
            StoreErr::Io(e) => e,
            e => io::Error::other(e),
        }
    }
}
