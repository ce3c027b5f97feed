use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter, Result};
use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Sub};

/// Referent type for untyped tracee memory.
pub type Void = u8;

/// A pointer into some tracee's address space. It is never dereferenced on
/// the tracer side; all accesses go through a `Task`'s read/write primitives.
/// Arithmetic is scaled by the referent size, so `RemotePtr<Void>` counts
/// bytes.
pub struct RemotePtr<T> {
    ptr: usize,
    phantom: PhantomData<T>,
}

impl<T> RemotePtr<T> {
    pub fn null() -> RemotePtr<T> {
        RemotePtr {
            ptr: 0,
            phantom: PhantomData,
        }
    }

    pub fn new_from_val(val: usize) -> RemotePtr<T> {
        RemotePtr {
            ptr: val,
            phantom: PhantomData,
        }
    }

    pub fn as_usize(&self) -> usize {
        self.ptr
    }

    pub fn is_null(&self) -> bool {
        self.ptr == 0
    }

    pub fn referent_size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    pub fn cast<U>(r: RemotePtr<U>) -> RemotePtr<T> {
        RemotePtr::new_from_val(r.ptr)
    }

    /// Untyped view of this pointer, for byte-granular arithmetic.
    pub fn to_void(self) -> RemotePtr<Void> {
        RemotePtr::new_from_val(self.ptr)
    }
}

impl<T> Default for RemotePtr<T> {
    fn default() -> Self {
        RemotePtr::null()
    }
}

impl<T> Copy for RemotePtr<T> {}

impl<T> Clone for RemotePtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Display for RemotePtr<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{:#x}", self.ptr)
    }
}

impl<T> Debug for RemotePtr<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{:#x}", self.ptr)
    }
}

impl<T> From<usize> for RemotePtr<T> {
    fn from(addr: usize) -> Self {
        RemotePtr::new_from_val(addr)
    }
}

impl<T> Add<usize> for RemotePtr<T> {
    type Output = Self;

    fn add(self, delta: usize) -> Self::Output {
        RemotePtr::new_from_val(self.ptr + delta * std::mem::size_of::<T>())
    }
}

impl<T> AddAssign<usize> for RemotePtr<T> {
    fn add_assign(&mut self, delta: usize) {
        self.ptr += delta * std::mem::size_of::<T>();
    }
}

impl<T> Sub<usize> for RemotePtr<T> {
    type Output = Self;

    fn sub(self, delta: usize) -> Self::Output {
        RemotePtr::new_from_val(self.ptr - delta * std::mem::size_of::<T>())
    }
}

/// Element-scaled distance. For `RemotePtr<Void>` this is a byte count.
impl<T> Sub<RemotePtr<T>> for RemotePtr<T> {
    type Output = usize;

    fn sub(self, rhs: RemotePtr<T>) -> Self::Output {
        debug_assert!(rhs.ptr <= self.ptr);
        (self.ptr - rhs.ptr) / std::mem::size_of::<T>()
    }
}

impl<T> PartialOrd for RemotePtr<T> {
    fn partial_cmp(&self, other: &RemotePtr<T>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for RemotePtr<T> {
    fn cmp(&self, other: &RemotePtr<T>) -> Ordering {
        self.ptr.cmp(&other.ptr)
    }
}

impl<T> PartialEq for RemotePtr<T> {
    fn eq(&self, other: &RemotePtr<T>) -> bool {
        self.ptr == other.ptr
    }
}

impl<T> Eq for RemotePtr<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_test() {
        let a = RemotePtr::<u64>::null();
        assert_eq!(0, a.as_usize());
        assert!(a.is_null());
    }

    #[test]
    fn add_is_scaled_by_referent() {
        let a = RemotePtr::<u64>::new_from_val(8);
        assert_eq!(16, (a + 1).as_usize());
        let b = RemotePtr::<Void>::new_from_val(8);
        assert_eq!(9, (b + 1).as_usize());
    }

    #[test]
    fn sub_same_type() {
        let a = RemotePtr::<Void>::new_from_val(0x1000);
        let b = RemotePtr::<Void>::new_from_val(0x1040);
        assert_eq!(0x40, b - a);
    }

    #[test]
    fn cast_preserves_address() {
        struct S(u64, u64);
        let a = RemotePtr::<u64>::new_from_val(8);
        let b = RemotePtr::<S>::cast(a);
        assert_eq!(8, b.as_usize());
        assert_eq!(16, b.referent_size());
    }

    #[test]
    fn comparison() {
        let c = RemotePtr::<u64>::new_from_val(0);
        let d = RemotePtr::<u64>::new_from_val(16);
        assert!(c < d);
        assert!(c != d);
        assert_eq!(c, c);
    }
}
