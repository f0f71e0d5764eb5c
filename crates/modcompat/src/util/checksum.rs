//! Checksums of the store schema. Also compiled into the build script, so this file may only
//! depend on `blake2`, `digest` and `hex`.

use blake2::Blake2b;
use digest::Digest;

/// Returns the BLAKE2b checksum of some data as a lowercase hex string.
pub fn blake2b_string<T>(data: T) -> String
where
    T: AsRef<[u8]>,
{
    hex::encode(Blake2b::digest(data.as_ref()))
}
