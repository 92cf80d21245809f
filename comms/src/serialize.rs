/// Writes a value into the wire representation of the protocol.
pub trait Serialize<'a> {
    /// Serializes `self` into `buf`.
    ///
    /// # Arguments
    /// * `buf` - The buffer where the header and any owned part of the message are written.
    ///
    /// # Returns
    /// An optional borrowed tail that is written right after `buf` without copying.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]>;
}
