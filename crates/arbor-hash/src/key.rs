//! Byte views of filter keys.

use bytes::Bytes;

/// A key that can be fed to the hash and fingerprint families.
///
/// Text and byte keys hash their content. Unsigned integers hash their
/// big-endian representation, so `42u64` and `42u32` hash differently.
pub trait FilterKey {
    /// Integer keys keep only the low 32 bits of their fingerprint.
    const NARROW_FINGERPRINT: bool = false;

    /// Calls `f` with the bytes that represent this key.
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R;
}

impl FilterKey for [u8] {
    #[inline]
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self)
    }
}

impl FilterKey for Vec<u8> {
    #[inline]
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self)
    }
}

impl FilterKey for Bytes {
    #[inline]
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self.as_ref())
    }
}

impl FilterKey for str {
    #[inline]
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self.as_bytes())
    }
}

impl FilterKey for String {
    #[inline]
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self.as_bytes())
    }
}

impl<T: FilterKey + ?Sized> FilterKey for &T {
    const NARROW_FINGERPRINT: bool = T::NARROW_FINGERPRINT;

    #[inline]
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        (**self).with_bytes(f)
    }
}

macro_rules! impl_integer_key {
    ($($ty:ty),*) => {
        $(
            impl FilterKey for $ty {
                const NARROW_FINGERPRINT: bool = true;

                #[inline]
                fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
                    f(&self.to_be_bytes())
                }
            }
        )*
    };
}

impl_integer_key!(u8, u16, u32, u64, usize);
