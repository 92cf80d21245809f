use std::io;

/// Reads a value back from the wire representation of the protocol.
pub trait Deserialize<'a>: Sized {
    /// Deserializes a value borrowing from `buf`.
    ///
    /// # Arguments
    /// * `buf` - The body of a received frame.
    ///
    /// # Returns
    /// The value or an `io::Error` of kind `InvalidData` if the bytes are malformed.
    fn deserialize(buf: &'a mut [u8]) -> io::Result<Self>;
}
