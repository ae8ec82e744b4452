//! Exclusive ownership of server-allocated query results.

use {
    log::{debug, trace},
    std::{fmt, marker::PhantomData, os::raw::c_void, ptr::NonNull, rc::Rc},
};

use crate::{
    conn::Connection,
    error::{Error, Result},
    native::Backend,
};

/// A kind of native allocation and the call that releases it.
pub trait NativeResource {
    type Raw;
    /// Used in diagnostics and `NotFound` errors.
    const KIND: &'static str;

    /// # Safety
    ///
    /// `raw` must come from `backend` and must not have been released before.
    unsafe fn release(backend: &dyn Backend, raw: *mut Self::Raw);
}

/// Owns exactly one native allocation and releases it exactly once, when the
/// handle is dropped or explicitly [`release`](Handle::release)d.
///
/// The handle keeps its connection alive. The native pointer never leaves the
/// crate; data is read through the typed getters of each resource kind.
pub struct Handle<K: NativeResource> {
    cm: Rc<Connection>,
    raw: NonNull<K::Raw>,
}

impl<K: NativeResource> Handle<K> {
    /// Takes ownership of `raw`. A null result means the query found nothing
    /// for `id`.
    pub(crate) fn acquire(cm: &Rc<Connection>, raw: *mut K::Raw, id: u64) -> Result<Self> {
        match NonNull::new(raw) {
            Some(raw) => {
                debug!("acquired {} {} at {:p}", K::KIND, id, raw);
                Ok(Handle {
                    cm: cm.clone(),
                    raw,
                })
            }
            None => Err(Error::not_found(K::KIND, id)),
        }
    }

    /// Takes ownership of an allocation that may legitimately be absent.
    pub(crate) fn adopt(cm: &Rc<Connection>, raw: *mut K::Raw) -> Option<Self> {
        NonNull::new(raw).map(|raw| Handle {
            cm: cm.clone(),
            raw,
        })
    }

    pub(crate) fn raw(&self) -> &K::Raw {
        // SAFETY: the allocation stays valid until this handle drops.
        unsafe { self.raw.as_ref() }
    }

    pub(crate) fn as_ptr(&self) -> *mut K::Raw {
        self.raw.as_ptr()
    }

    pub fn connection(&self) -> &Rc<Connection> {
        &self.cm
    }

    /// Releases the allocation now instead of at end of scope.
    pub fn release(self) {
        trace!("explicit release of {} at {:p}", K::KIND, self.raw);
    }
}

impl<K: NativeResource> Drop for Handle<K> {
    fn drop(&mut self) {
        debug!("releasing {} at {:p}", K::KIND, self.raw);
        // SAFETY: `raw` came from this connection's backend, and `Drop` runs once.
        unsafe { K::release(self.cm.backend(), self.raw.as_ptr()) }
    }
}

impl<K: NativeResource> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &K::KIND)
            .field("raw", &self.raw)
            .finish()
    }
}

/// Memory the client library hands out for the caller to `XFree`.
pub struct XFreed<T>(PhantomData<T>);

impl<T> NativeResource for XFreed<T> {
    type Raw = T;
    const KIND: &'static str = "buffer";

    unsafe fn release(backend: &dyn Backend, raw: *mut T) {
        backend.free(raw as *mut c_void)
    }
}
