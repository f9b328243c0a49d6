//! Fixed-width primitives and primitive slices.
//!
//! One code path per operation, parameterized by `swap`: when the wire
//! order matches the platform the bytes are copied as they sit in memory,
//! otherwise each element is byte-reversed. Floats travel as raw bit
//! patterns, so NaN payloads and signed zeros survive unchanged.
//!
//! Slices with `swap == false` never touch individual elements: the whole
//! run is a single `bytemuck` cast and `copy_from_slice`.

use bytemuck::Pod;

mod sealed {
    pub trait Sealed {}
}

/// Multi-byte primitive that can travel as a fixed-width value.
pub trait Primitive: Pod + Default + sealed::Sealed {
    /// Encoded width in bytes.
    const SIZE: usize = std::mem::size_of::<Self>();
    /// Name used in error messages.
    const NAME: &'static str;
}

macro_rules! primitive {
    ($($t:ty => $name:literal),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}
            impl Primitive for $t {
                const NAME: &'static str = $name;
            }
        )*
    };
}

primitive! {
    i16 => "short",
    u16 => "char",
    i32 => "int",
    i64 => "long",
    u64 => "long",
    f32 => "float",
    f64 => "double",
}

/// Write one value into `dst[..T::SIZE]`.
///
/// # Panics
///
/// Panics if `dst` is shorter than `T::SIZE`.
#[inline]
pub fn write_fixed<T: Primitive>(dst: &mut [u8], v: T, swap: bool) {
    let out = &mut dst[..T::SIZE];
    out.copy_from_slice(bytemuck::bytes_of(&v));
    if swap {
        out.reverse();
    }
}

/// Read one value from `src[..T::SIZE]`.
///
/// # Panics
///
/// Panics if `src` is shorter than `T::SIZE`.
#[inline]
pub fn read_fixed<T: Primitive>(src: &[u8], swap: bool) -> T {
    let mut v = T::default();
    let bytes = bytemuck::bytes_of_mut(&mut v);
    bytes.copy_from_slice(&src[..T::SIZE]);
    if swap {
        bytes.reverse();
    }
    v
}

/// Encode a slice into `dst[..values.len() * T::SIZE]`, returning the byte count.
pub fn encode_slice<T: Primitive>(values: &[T], dst: &mut [u8], swap: bool) -> usize {
    let src: &[u8] = bytemuck::cast_slice(values);
    let out = &mut dst[..src.len()];
    out.copy_from_slice(src);
    if swap {
        for chunk in out.chunks_exact_mut(T::SIZE) {
            chunk.reverse();
        }
    }
    src.len()
}

/// Decode `len` elements from the front of `src`.
///
/// An empty result does not allocate.
///
/// # Panics
///
/// Panics if `src` holds fewer than `len * T::SIZE` bytes.
pub fn decode_slice<T: Primitive>(src: &[u8], len: usize, swap: bool) -> Vec<T> {
    if len == 0 {
        return Vec::new();
    }
    let mut values = vec![T::default(); len];
    let out: &mut [u8] = bytemuck::cast_slice_mut(values.as_mut_slice());
    let n = out.len();
    out.copy_from_slice(&src[..n]);
    if swap {
        for chunk in out.chunks_exact_mut(T::SIZE) {
            chunk.reverse();
        }
    }
    values
}

/// Booleans are one byte each; any non-zero byte reads as `true`.
pub fn encode_bools(values: &[bool], dst: &mut [u8]) -> usize {
    for (b, &v) in dst.iter_mut().zip(values) {
        *b = v as u8;
    }
    values.len()
}

/// Decode `len` booleans from the front of `src`.
pub fn decode_bools(src: &[u8], len: usize) -> Vec<bool> {
    src[..len].iter().map(|&b| b != 0).collect()
}
