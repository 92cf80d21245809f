use std::{borrow::Cow, io};

use crate::{Deserialize, Serialize};

type Header = u32;
const HEADER_SIZE: usize = size_of::<Header>();

/// Size of the fixed fields that precede the values of an `Add` payload.
const ADD_FIELDS_SIZE: usize = 3 * size_of::<u32>();

const KIND_ERR: Header = 0;
const KIND_CONTROL: Header = 1;
const KIND_ADD: Header = 2;
const KIND_VALUES: Header = 3;

/// The payload data for the `Data` variant of the `Msg` enum.
#[derive(Debug)]
pub enum Payload<'a> {
    /// A weighted additive update for one shard of a table, `shard += weight * values`.
    Add {
        table: u32,
        shard: u32,
        weight: f32,
        values: &'a [f32],
    },
    /// The full contents of a table, shards concatenated in order.
    Values(&'a [f32]),
}

/// The command for the `Control` variant of the `Msg` enum.
#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    CreateTable { table: u32, shard_sizes: Vec<usize> },
    BatchLoad { table: u32 },
    Barrier,
    Ack,
    Disconnect,
}

/// The application layer message for the parameter store protocol.
#[derive(Debug)]
pub enum Msg<'a> {
    Control(Command),
    Data(Payload<'a>),
    Err(Cow<'a, str>),
}

impl Msg<'_> {
    /// Returns a short name of the message kind, useful for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Control(_) => "control",
            Msg::Data(Payload::Add { .. }) => "data/add",
            Msg::Data(Payload::Values(_)) => "data/values",
            Msg::Err(_) => "err",
        }
    }

    fn buf_is_too_small<T>(size: usize, expected: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The given buffer is too small {size}, must at least be {expected} bytes"),
        ))
    }

    fn invalid_kind<T>(kind: Header) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an invalid kind header {kind}"),
        ))
    }

    fn read_u32(bytes: &[u8]) -> u32 {
        let mut word = [0; 4];
        word.copy_from_slice(&bytes[..4]);
        u32::from_be_bytes(word)
    }

    fn cast_values(bytes: &[u8]) -> io::Result<&[f32]> {
        bytemuck::try_cast_slice(bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("{e:?}")))
    }
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]> {
        match self {
            Msg::Err(e) => {
                buf.extend_from_slice(&KIND_ERR.to_be_bytes());
                Some(e.as_bytes())
            }
            Msg::Control(cmd) => {
                buf.extend_from_slice(&KIND_CONTROL.to_be_bytes());

                // SAFETY: The `Serialize` impl of `Command` is derived and holds
                //         no maps, so serialization can't fail.
                serde_json::to_writer(buf, cmd).unwrap();
                None
            }
            Msg::Data(Payload::Add {
                table,
                shard,
                weight,
                values,
            }) => {
                buf.extend_from_slice(&KIND_ADD.to_be_bytes());
                buf.extend_from_slice(&table.to_be_bytes());
                buf.extend_from_slice(&shard.to_be_bytes());
                buf.extend_from_slice(&weight.to_bits().to_be_bytes());
                Some(bytemuck::cast_slice(values))
            }
            Msg::Data(Payload::Values(values)) => {
                buf.extend_from_slice(&KIND_VALUES.to_be_bytes());
                Some(bytemuck::cast_slice(values))
            }
        }
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(buf: &'a mut [u8]) -> io::Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Self::buf_is_too_small(buf.len(), HEADER_SIZE);
        }

        let buf: &'a [u8] = buf;
        let (kind, rest) = buf.split_at(HEADER_SIZE);

        match Self::read_u32(kind) {
            KIND_ERR => {
                let string = std::str::from_utf8(rest)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

                Ok(Self::Err(Cow::Borrowed(string)))
            }
            KIND_CONTROL => {
                let cmd = serde_json::from_slice(rest)?;
                Ok(Self::Control(cmd))
            }
            KIND_ADD => {
                if rest.len() < ADD_FIELDS_SIZE {
                    return Self::buf_is_too_small(buf.len(), HEADER_SIZE + ADD_FIELDS_SIZE);
                }

                let (fields, values) = rest.split_at(ADD_FIELDS_SIZE);

                let payload = Payload::Add {
                    table: Self::read_u32(&fields[0..4]),
                    shard: Self::read_u32(&fields[4..8]),
                    weight: f32::from_bits(Self::read_u32(&fields[8..12])),
                    values: Self::cast_values(values)?,
                };

                Ok(Self::Data(payload))
            }
            KIND_VALUES => {
                let values = Self::cast_values(rest)?;
                Ok(Self::Data(Payload::Values(values)))
            }
            kind => Self::invalid_kind(kind),
        }
    }
}
