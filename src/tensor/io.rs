//! Headerless binary tensor files
//!
//! A tensor file is a flat sequence of fixed-width elements in row-major
//! order (outermost dimension slowest-varying), native byte order, no
//! header. The element count and dtype come from the spec describing the
//! file; the file itself carries no metadata. Used for input images,
//! per-layer weights, biases, and expected-output references.

use super::TensorBuffer;
use crate::dtype::Element;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Load a tensor from a headerless binary file
///
/// Reads `product(shape)` elements of `T`. A missing file or a file with
/// fewer bytes than the shape requires is an error carrying the path and
/// the expected vs. actual byte counts - the data is never silently
/// zero-filled. Trailing bytes beyond the expected count are ignored.
pub fn load_tensor<T: Element>(path: &Path, shape: &[usize]) -> Result<TensorBuffer<T>> {
    let mut out = TensorBuffer::<T>::zeros(shape)?;
    fill_from_file(path, &mut out)?;
    Ok(out)
}

/// Fill an already-allocated buffer from a headerless binary file
///
/// Same format and failure contract as [`load_tensor`].
pub fn fill_from_file<T: Element>(path: &Path, out: &mut TensorBuffer<T>) -> Result<()> {
    let expected = out.elem_count() * std::mem::size_of::<T>();

    let mut file = File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    // Read into the element buffer directly so the destination keeps T's
    // alignment; a plain byte Vec could not be cast back for f64.
    let bytes: &mut [u8] = bytemuck::cast_slice_mut(out.as_mut_slice());
    let mut filled = 0usize;
    while filled < expected {
        match file.read(&mut bytes[filled..]) {
            Ok(0) => {
                return Err(Error::ShortRead {
                    path: path.to_path_buf(),
                    expected,
                    actual: filled,
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(Error::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
    }

    tracing::debug!(path = %path.display(), bytes = expected, "loaded tensor");
    Ok(())
}

/// Store a tensor to a headerless binary file
///
/// Writes the elements in row-major order, native byte order. Loading the
/// file back with the same shape yields an elementwise-identical tensor.
pub fn store_tensor<T: Element>(path: &Path, tensor: &TensorBuffer<T>) -> Result<()> {
    std::fs::write(path, bytemuck::cast_slice::<T, u8>(tensor.as_slice())).map_err(|source| {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}
