/// InlinePayload - fixed-size, heap-free storage for one type-erased value
///
/// Shared by `Task` and `CompleteTask`. The value is written into an aligned
/// byte buffer and remembered only through a monomorphized drop function, so
/// heterogeneous payloads fit in homogeneous fixed-size queues.

use std::cell::Cell;
use std::marker::PhantomData;
use std::mem::{align_of, size_of, MaybeUninit};
use crate::error::{Error, Result};

/// Strongest alignment a payload may require
pub const MAX_PAYLOAD_ALIGN: usize = 16;

#[repr(C, align(16))]
struct AlignedBytes<const N: usize>([MaybeUninit<u8>; N]);

pub(crate) struct InlinePayload<const N: usize> {
    bytes: AlignedBytes<N>,
    drop_fn: Option<unsafe fn(*mut u8)>,
    // Payloads are only required to be Send
    _not_sync: PhantomData<Cell<()>>,
}

unsafe fn drop_value<S>(ptr: *mut u8) {
    // SAFETY: only registered by `InlinePayload::new::<S>`, which wrote an S at `ptr`
    unsafe { std::ptr::drop_in_place(ptr.cast::<S>()) }
}

impl<const N: usize> InlinePayload<N> {
    /// Storage holding nothing
    pub(crate) fn empty() -> Self {
        Self {
            bytes: AlignedBytes([MaybeUninit::uninit(); N]),
            drop_fn: None,
            _not_sync: PhantomData,
        }
    }

    /// Move `value` into inline storage
    ///
    /// Fails if `S` is larger than `N` bytes or more aligned than `MAX_PAYLOAD_ALIGN`.
    pub(crate) fn new<S: Send + 'static>(value: S) -> Result<Self> {
        Self::check_fits::<S>()?;
        let mut payload = Self::empty();
        // SAFETY: size and alignment checked above; the buffer is uninitialized
        unsafe { std::ptr::write(payload.as_mut_ptr().cast::<S>(), value) };
        payload.drop_fn = Some(drop_value::<S>);
        Ok(payload)
    }

    /// Size/alignment validation performed when a task is built
    pub(crate) fn check_fits<S>() -> Result<()> {
        if size_of::<S>() > N || align_of::<S>() > MAX_PAYLOAD_ALIGN {
            return Err(Error::PayloadTooLarge {
                size: size_of::<S>(),
                align: align_of::<S>(),
                capacity: N,
                max_align: MAX_PAYLOAD_ALIGN,
            });
        }
        Ok(())
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.drop_fn.is_some()
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut u8 {
        self.bytes.0.as_mut_ptr().cast::<u8>()
    }
}

impl<const N: usize> Drop for InlinePayload<N> {
    fn drop(&mut self) {
        if let Some(drop_fn) = self.drop_fn.take() {
            let ptr = self.as_mut_ptr();
            // SAFETY: drop_fn matches the value written by `new` and runs once
            unsafe { drop_fn(ptr) };
        }
    }
}
