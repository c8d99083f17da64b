use std::{fmt, marker::PhantomData, ops::Deref};

use super::{GLenum, Gl, ObjectKind};
use crate::{Result, ShmVizError};

/// Sentinel the driver reports for "no such index".
pub(crate) const INVALID_INDEX: u32 = gl::INVALID_INDEX;

/// One native object id plus the registry it lives in.
///
/// A handle either owns its object (it was created through the registry) or
/// is a view over an id reported by the driver. Owned handles are released on
/// drop only when the registry was built with `auto_free`.
pub struct Handle<'g> {
    gl: &'g Gl,
    kind: ObjectKind,
    id: u32,
    owned: bool,
}

impl<'g> Handle<'g> {
    pub(crate) fn owned(gl: &'g Gl, kind: ObjectKind, id: u32) -> Self {
        Self {
            gl,
            kind,
            id,
            owned: true,
        }
    }

    /// Wraps an id reported by the driver. The invalid-index sentinel (also
    /// seen as `-1` from integer queries) is "no object".
    pub(crate) fn view(gl: &'g Gl, kind: ObjectKind, id: u32) -> Option<Self> {
        if id == INVALID_INDEX {
            return None;
        }
        Some(Self::borrowed(gl, kind, id))
    }

    /// Non-owning handle for an id known to be valid.
    pub(crate) fn borrowed(gl: &'g Gl, kind: ObjectKind, id: u32) -> Self {
        Self {
            gl,
            kind,
            id,
            owned: false,
        }
    }

    pub fn gl(&self) -> &'g Gl {
        self.gl
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Calls the kind's bind entry point with `targets` followed by the id.
    pub fn bind(&self, targets: &[GLenum]) -> Result<()> {
        let expected = self
            .kind
            .bind_arity()
            .ok_or(ShmVizError::NotBindable(self.kind))?;
        if targets.len() != expected {
            return Err(ShmVizError::InvalidBindTarget {
                kind: self.kind,
                expected,
                got: targets.len(),
            });
        }
        self.gl
            .api()
            .bind_object(self.kind, targets.first().copied(), self.id);
        Ok(())
    }

    /// Releases the native object. The driver does not tolerate a second
    /// release of the same id, and consuming the handle keeps this one from
    /// doing so; other views of the same id are the caller's concern.
    pub fn free(mut self) {
        self.gl.api().delete_object(self.kind, self.id);
        self.owned = false;
    }

    /// Gives up ownership and returns the raw id.
    pub fn into_raw(mut self) -> u32 {
        self.owned = false;
        self.id
    }
}

impl Drop for Handle<'_> {
    fn drop(&mut self) {
        if self.owned && self.gl.config().auto_free {
            self.gl.api().delete_object(self.kind, self.id);
        }
    }
}

impl fmt::Debug for Handle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("owned", &self.owned)
            .finish()
    }
}

/// Shared behaviour of every wrapper that owns exactly one native object.
pub trait ManagedObject<'g>: Sized {
    const KIND: ObjectKind;

    fn from_handle(handle: Handle<'g>) -> Self;
    fn handle(&self) -> &Handle<'g>;
    fn into_handle(self) -> Handle<'g>;

    /// Wraps a known id without allocating. Returns `None` for the driver's
    /// invalid-index sentinel.
    fn from_raw(gl: &'g Gl, id: u32) -> Option<Self> {
        Handle::view(gl, Self::KIND, id).map(Self::from_handle)
    }

    fn id(&self) -> u32 {
        self.handle().id()
    }

    fn bind(&self, targets: &[GLenum]) -> Result<&Self> {
        self.handle().bind(targets)?;
        Ok(self)
    }

    fn free(self) {
        self.into_handle().free()
    }

    fn into_raw(self) -> u32 {
        self.into_handle().into_raw()
    }

    /// Wraps the object in a guard that frees it when the scope ends.
    fn guard(self) -> FreeOnDrop<'g, Self> {
        FreeOnDrop::new(self)
    }
}

/// Objects allocated through the driver's generation call.
pub trait Generate<'g>: ManagedObject<'g> {
    fn create(gl: &'g Gl) -> Self {
        let id = gl.api().gen_object(Self::KIND);
        Self::from_handle(Handle::owned(gl, Self::KIND, id))
    }

    fn create_many(gl: &'g Gl, count: usize) -> Vec<Self> {
        (0..count).map(|_| Self::create(gl)).collect()
    }
}

/// Scope guard that releases its object on drop, whatever the registry's
/// `auto_free` setting.
pub struct FreeOnDrop<'g, T: ManagedObject<'g>> {
    inner: Option<T>,
    _gl: PhantomData<&'g Gl>,
}

impl<'g, T: ManagedObject<'g>> FreeOnDrop<'g, T> {
    pub fn new(object: T) -> Self {
        Self {
            inner: Some(object),
            _gl: PhantomData,
        }
    }

    /// Disarms the guard and hands the object back.
    pub fn into_inner(mut self) -> T {
        match self.inner.take() {
            Some(object) => object,
            None => unreachable!("guard is only emptied on drop"),
        }
    }
}

impl<'g, T: ManagedObject<'g>> Deref for FreeOnDrop<'g, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.inner {
            Some(object) => object,
            None => unreachable!("guard is only emptied on drop"),
        }
    }
}

impl<'g, T: ManagedObject<'g>> Drop for FreeOnDrop<'g, T> {
    fn drop(&mut self) {
        if let Some(object) = self.inner.take() {
            object.free();
        }
    }
}
