use super::{Buffer, Framebuffer, GLenum, Gl, ManagedObject, Program, TextureUnit};

/// Process-wide driver state: limits, current bindings and global setters.
#[derive(Debug, Clone, Copy)]
pub struct Context<'g> {
    gl: &'g Gl,
}

impl<'g> Context<'g> {
    pub(crate) fn new(gl: &'g Gl) -> Self {
        Self { gl }
    }

    fn integer(&self, pname: GLenum) -> i32 {
        self.gl.api().get_integer(pname)
    }

    pub fn version(&self) -> String {
        self.gl.api().get_string(gl::VERSION)
    }

    pub fn renderer(&self) -> String {
        self.gl.api().get_string(gl::RENDERER)
    }

    pub fn max_vertex_attribs(&self) -> usize {
        self.integer(gl::MAX_VERTEX_ATTRIBS).max(0) as usize
    }

    pub fn max_color_attachments(&self) -> usize {
        self.integer(gl::MAX_COLOR_ATTACHMENTS).max(0) as usize
    }

    /// The program in use, if any. The returned wrapper is a view and has no
    /// cached name tables, so lookups through it query the driver.
    pub fn current_program(&self) -> Option<Program<'g>> {
        match self.integer(gl::CURRENT_PROGRAM) {
            0 => None,
            id => Program::from_raw(self.gl, id as u32),
        }
    }

    pub fn array_buffer(&self) -> Option<Buffer<'g>> {
        Buffer::bound(self.gl, self.integer(gl::ARRAY_BUFFER_BINDING))
    }

    /// Element buffer of the bound vertex array, if any.
    pub fn element_array_buffer(&self) -> Option<Buffer<'g>> {
        Buffer::bound(self.gl, self.integer(gl::ELEMENT_ARRAY_BUFFER_BINDING))
    }

    pub fn draw_framebuffer(&self) -> Framebuffer<'g> {
        self.framebuffer(gl::DRAW_FRAMEBUFFER_BINDING)
    }

    pub fn read_framebuffer(&self) -> Framebuffer<'g> {
        self.framebuffer(gl::READ_FRAMEBUFFER_BINDING)
    }

    fn framebuffer(&self, pname: GLenum) -> Framebuffer<'g> {
        match self.integer(pname) {
            0 => Framebuffer::default_framebuffer(self.gl),
            id => Framebuffer::from_raw(self.gl, id as u32)
                .unwrap_or_else(|| Framebuffer::default_framebuffer(self.gl)),
        }
    }

    /// The active texture unit.
    pub fn texture_unit(&self) -> TextureUnit<'g> {
        let active = self.integer(gl::ACTIVE_TEXTURE) as u32;
        TextureUnit::new(self.gl, active.saturating_sub(gl::TEXTURE0))
    }

    pub fn texture_units(&self, index: u32) -> TextureUnit<'g> {
        TextureUnit::new(self.gl, index)
    }

    pub fn shader_storage(&self, index: u32) -> ShaderStorageBinding<'g> {
        ShaderStorageBinding { gl: self.gl, index }
    }

    pub fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.gl.api().viewport(x, y, width, height);
    }

    pub fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.gl.api().clear_color(r, g, b, a);
    }

    pub fn clear(&self, mask: u32) {
        self.gl.api().clear(mask);
    }

    pub fn enable(&self, capabilities: &[GLenum]) {
        for &capability in capabilities {
            self.gl.api().set_capability(capability, true);
        }
    }

    pub fn disable(&self, capabilities: &[GLenum]) {
        for &capability in capabilities {
            self.gl.api().set_capability(capability, false);
        }
    }

    pub fn blend_func(&self, src: GLenum, dst: GLenum) {
        self.gl.api().blend_func(src, dst);
    }

    /// Pops the oldest recorded driver error, `None` when there is none.
    pub fn error(&self) -> Option<GLenum> {
        match self.gl.api().get_error() {
            gl::NO_ERROR => None,
            code => Some(code),
        }
    }
}

/// One indexed shader storage buffer binding point.
#[derive(Debug, Clone, Copy)]
pub struct ShaderStorageBinding<'g> {
    gl: &'g Gl,
    index: u32,
}

impl<'g> ShaderStorageBinding<'g> {
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Binds `size` bytes of `buffer` from `offset`; the rest of the buffer
    /// when `size` is `None`.
    pub fn bind(&self, buffer: &Buffer<'_>, offset: usize, size: Option<usize>) {
        let size = size.unwrap_or_else(|| buffer.size().saturating_sub(offset));
        self.gl.api().bind_buffer_range(
            gl::SHADER_STORAGE_BUFFER,
            self.index,
            buffer.id(),
            offset,
            size,
        );
    }

    /// Buffer bound at this point, if any.
    pub fn buffer(&self) -> Option<Buffer<'g>> {
        let id = self
            .gl
            .api()
            .get_integer_indexed(gl::SHADER_STORAGE_BUFFER_BINDING, self.index);
        Buffer::bound(self.gl, id)
    }
}
