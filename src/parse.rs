//! Typed little-endian reads out of the data segment.
//!
//! Every numeric field in a BMT data segment is little
//! endian. Reads are bounds checked against the slice: a
//! read that runs past the end is a format error, never a
//! short or wrapped-around value.

use std::io::Error as IOError;

use byteordered::{byteorder::ReadBytesExt, ByteOrdered, Endian};

use crate::error::{BmtError, Result};

pub(crate) trait Parseable: Sized {
    fn parse<T: ReadBytesExt, E: Endian>(r: &mut ByteOrdered<T, E>) -> Result<Self, IOError>;
}

macro_rules! impl_parseable {
    ($ty:ty, $method:ident) => {
        impl Parseable for $ty {
            fn parse<T: ReadBytesExt, E: Endian>(
                r: &mut ByteOrdered<T, E>,
            ) -> Result<Self, IOError> {
                r.$method()
            }
        }
    };
}

impl_parseable!(i16, read_i16);
impl_parseable!(u32, read_u32);
impl_parseable!(f32, read_f32);

fn truncated(what: &str, offset: usize) -> BmtError {
    BmtError::format(format!(
        "truncated data segment: `{}` at offset {}",
        what, offset
    ))
}

/// Read one little-endian `T` at `offset` into `data`.
///
/// `what` names the field for the error message.
pub(crate) fn read_le_at<T: Parseable>(data: &[u8], offset: usize, what: &str) -> Result<T> {
    let tail = data.get(offset..).ok_or_else(|| truncated(what, offset))?;
    T::parse(&mut ByteOrdered::le(tail)).map_err(|_| truncated(what, offset))
}

/// Read `count` consecutive little-endian `T`s starting at
/// `offset`. The whole range is checked before decoding.
pub(crate) fn read_le_seq<T: Parseable>(
    data: &[u8],
    offset: usize,
    count: usize,
    what: &str,
) -> Result<Vec<T>> {
    let len = count
        .checked_mul(std::mem::size_of::<T>())
        .and_then(|l| offset.checked_add(l))
        .ok_or_else(|| truncated(what, offset))?;
    let bytes = data.get(offset..len).ok_or_else(|| truncated(what, offset))?;

    let mut rdr = ByteOrdered::le(bytes);
    (0..count)
        .map(|_| T::parse(&mut rdr).map_err(|_| truncated(what, offset)))
        .collect()
}
