/// Element types a receive buffer can be made of.
///
/// Their alignment is at least that of `f32`, so value payloads can be cast in place out of a
/// frame read into a buffer of them.
pub trait Word: bytemuck::Pod {}

impl Word for u32 {}
impl Word for u64 {}
impl Word for f32 {}
impl Word for f64 {}
