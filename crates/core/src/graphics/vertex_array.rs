use super::{
    reflect::scalar_size, Attribute, Buffer, GLenum, Generate, Handle, ManagedObject, ObjectKind,
};
use crate::{Result, ShmVizError};

/// A vertex array object. Index it with an [`Attribute`] or, through
/// [`attribute`](Self::attribute), with an attribute index of the current
/// program.
#[derive(Debug)]
pub struct VertexArray<'g> {
    handle: Handle<'g>,
}

impl<'g> ManagedObject<'g> for VertexArray<'g> {
    const KIND: ObjectKind = ObjectKind::VertexArray;

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

impl<'g> Generate<'g> for VertexArray<'g> {}

impl<'g> VertexArray<'g> {
    fn bind_self(&self) {
        self.handle
            .gl()
            .api()
            .bind_object(ObjectKind::VertexArray, None, self.handle.id());
    }

    /// Binding view for `attribute`.
    pub fn binding(&self, attribute: Attribute<'g>) -> VertexArrayBinding<'_, 'g> {
        VertexArrayBinding {
            vao: self,
            attribute,
        }
    }

    /// Binding view for the `index`th active attribute of the current program.
    pub fn attribute(&self, index: usize) -> Result<VertexArrayBinding<'_, 'g>> {
        let context = self.handle.gl().context();
        let max = context.max_vertex_attribs();
        if index >= max {
            return Err(ShmVizError::IndexOutOfRange {
                what: "vertex attribute slot",
                index,
                len: max,
            });
        }
        let attribute = match context.current_program() {
            Some(program) => program.attributes().get(index)?,
            None => {
                return Err(ShmVizError::IndexOutOfRange {
                    what: "attribute",
                    index,
                    len: 0,
                })
            }
        };
        Ok(self.binding(attribute))
    }

    /// Draws `count` vertices from `start`. Without a count, the number of
    /// vertices available in the bound attribute buffers is used: the largest
    /// `(buffer size - offset) / stride` over every attribute of the current
    /// program that has a buffer, less `start`. No such attribute means 0.
    /// Built-in inputs such as `gl_VertexID` have no location and are skipped.
    pub fn draw(&self, primitive: GLenum, start: i32, count: Option<i32>) -> Result<()> {
        self.bind_self();
        let count = match count {
            Some(count) => count,
            None => self.available_vertices()?.saturating_sub(start).max(0),
        };
        self.handle.gl().api().draw_arrays(primitive, start, count);
        Ok(())
    }

    fn available_vertices(&self) -> Result<i32> {
        let max = self.handle.gl().context().max_vertex_attribs();
        let mut end = 0;
        for slot in 0..max {
            let binding = match self.attribute(slot) {
                Ok(binding) => binding,
                Err(ShmVizError::IndexOutOfRange { .. }) => continue,
                Err(err) => return Err(err),
            };
            if binding.attribute().location().is_none() {
                continue;
            }
            let Some(buffer) = binding.buffer()? else {
                continue;
            };
            let stride = binding.actual_stride()?;
            if stride == 0 {
                continue;
            }
            let available = buffer.size().saturating_sub(binding.offset()?) / stride;
            end = end.max(available);
        }
        Ok(i32::try_from(end).unwrap_or(i32::MAX))
    }
}

/// Options for [`VertexArrayBinding::bind`].
#[derive(Debug, Default, Clone, Copy)]
pub struct AttribPointer<'a, 'g> {
    /// Buffer to source from; the current array buffer when `None`.
    pub buffer: Option<&'a Buffer<'g>>,
    /// Component type; the attribute's base type when `None`.
    pub ty: Option<GLenum>,
    pub stride: i32,
    pub offset: usize,
    pub normalized: bool,
}

/// A vertex array paired with one program attribute.
#[derive(Debug)]
pub struct VertexArrayBinding<'v, 'g> {
    vao: &'v VertexArray<'g>,
    attribute: Attribute<'g>,
}

impl<'v, 'g> VertexArrayBinding<'v, 'g> {
    pub fn attribute(&self) -> &Attribute<'g> {
        &self.attribute
    }

    fn location(&self) -> Result<u32> {
        self.attribute
            .location()
            .ok_or_else(|| ShmVizError::AttributeNotFound(self.attribute.name().to_string()))
    }

    fn parameter(&self, pname: GLenum) -> Result<i32> {
        let location = self.location()?;
        self.vao.bind_self();
        Ok(self
            .vao
            .handle
            .gl()
            .api()
            .get_vertex_attrib_parameter(location, pname))
    }

    /// Points the attribute at a buffer and enables its array.
    pub fn bind(&self, pointer: AttribPointer<'_, '_>) -> Result<()> {
        let location = self.location()?;
        self.vao.bind_self();
        if let Some(buffer) = pointer.buffer {
            buffer.bind(&[gl::ARRAY_BUFFER])?;
        }
        let api = self.vao.handle.gl().api();
        api.vertex_attrib_pointer(
            location,
            self.attribute.elements() as i32,
            pointer.ty.unwrap_or_else(|| self.attribute.base_type()),
            pointer.normalized,
            pointer.stride,
            pointer.offset,
        );
        api.set_vertex_attrib_array_enabled(location, true);
        Ok(())
    }

    pub fn disable(&self) -> Result<()> {
        let location = self.location()?;
        self.vao.bind_self();
        self.vao
            .handle
            .gl()
            .api()
            .set_vertex_attrib_array_enabled(location, false);
        Ok(())
    }

    pub fn is_enabled(&self) -> Result<bool> {
        Ok(self.parameter(gl::VERTEX_ATTRIB_ARRAY_ENABLED)? != 0)
    }

    /// Buffer the attribute sources from, if any.
    pub fn buffer(&self) -> Result<Option<Buffer<'g>>> {
        let id = self.parameter(gl::VERTEX_ATTRIB_ARRAY_BUFFER_BINDING)?;
        Ok(Buffer::bound(self.vao.handle.gl(), id))
    }

    /// Components per vertex.
    pub fn size(&self) -> Result<usize> {
        Ok(self.parameter(gl::VERTEX_ATTRIB_ARRAY_SIZE)?.max(0) as usize)
    }

    pub fn stride(&self) -> Result<usize> {
        Ok(self.parameter(gl::VERTEX_ATTRIB_ARRAY_STRIDE)?.max(0) as usize)
    }

    pub fn ty(&self) -> Result<GLenum> {
        Ok(self.parameter(gl::VERTEX_ATTRIB_ARRAY_TYPE)? as GLenum)
    }

    pub fn type_size(&self) -> Result<usize> {
        Ok(scalar_size(self.ty()?))
    }

    /// Explicit stride, or the tightly packed element size when it is 0.
    pub fn actual_stride(&self) -> Result<usize> {
        match self.stride()? {
            0 => Ok(self.size()? * self.type_size()?),
            stride => Ok(stride),
        }
    }

    pub fn offset(&self) -> Result<usize> {
        let location = self.location()?;
        self.vao.bind_self();
        Ok(self.vao.handle.gl().api().get_vertex_attrib_offset(location))
    }
}
