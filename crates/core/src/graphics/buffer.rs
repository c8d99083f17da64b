use super::{Generate, Gl, Handle, ManagedObject, ObjectKind};
use crate::{Result, ShmVizError};

/// A buffer object. All operations go through the `GL_ARRAY_BUFFER` target.
#[derive(Debug)]
pub struct Buffer<'g> {
    handle: Handle<'g>,
}

impl<'g> ManagedObject<'g> for Buffer<'g> {
    const KIND: ObjectKind = ObjectKind::Buffer;

    fn from_handle(handle: Handle<'g>) -> Self {
        Self { handle }
    }

    fn handle(&self) -> &Handle<'g> {
        &self.handle
    }

    fn into_handle(self) -> Handle<'g> {
        self.handle
    }
}

impl<'g> Generate<'g> for Buffer<'g> {}

impl<'g> Buffer<'g> {
    /// Wraps an id reported by a binding query, where 0 means nothing is bound.
    pub(crate) fn bound(gl: &'g Gl, id: i32) -> Option<Self> {
        if id == 0 {
            None
        } else {
            Self::from_raw(gl, id as u32)
        }
    }

    fn bind_array(&self) {
        self.handle
            .gl()
            .api()
            .bind_object(ObjectKind::Buffer, Some(gl::ARRAY_BUFFER), self.handle.id());
    }

    /// Replaces the storage with a copy of `data`.
    pub fn set(&self, data: &[u8], usage: u32) -> &Self {
        self.bind_array();
        self.handle
            .gl()
            .api()
            .buffer_data(gl::ARRAY_BUFFER, data.len(), Some(data), usage);
        self
    }

    /// Replaces the storage with `size` uninitialised bytes.
    pub fn allocate(&self, size: usize, usage: u32) -> &Self {
        self.bind_array();
        self.handle
            .gl()
            .api()
            .buffer_data(gl::ARRAY_BUFFER, size, None, usage);
        self
    }

    /// Overwrites part of the existing storage starting at `offset`. With
    /// `Some(size)` only the first `size` bytes of `data` are sent. Writing
    /// past the allocation is left to the driver to reject.
    pub fn update(&self, data: &[u8], offset: usize, size: Option<usize>) -> Result<&Self> {
        let data = match size {
            Some(size) if size > data.len() => {
                return Err(ShmVizError::InvalidInput(
                    "update size exceeds the provided data",
                ))
            }
            Some(size) => &data[..size],
            None => data,
        };
        self.bind_array();
        self.handle
            .gl()
            .api()
            .buffer_sub_data(gl::ARRAY_BUFFER, offset, data);
        Ok(self)
    }

    /// Current allocation length in bytes, as reported by the driver.
    pub fn size(&self) -> usize {
        self.bind_array();
        self.handle
            .gl()
            .api()
            .get_buffer_parameter(gl::ARRAY_BUFFER, gl::BUFFER_SIZE)
            .max(0) as usize
    }
}

/// Native-endian bytes of `values`, ready for upload.
pub fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}
