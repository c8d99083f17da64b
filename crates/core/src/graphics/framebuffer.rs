use super::{GLenum, Generate, Gl, Handle, ManagedObject, ObjectKind, Texture};
use crate::{Result, ShmVizError};

/// Rectangle in framebuffer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn corners(self) -> [i32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }
}

#[derive(Debug)]
pub struct Framebuffer<'g> {
    handle: Handle<'g>,
}

impl<'g> ManagedObject<'g> for Framebuffer<'g> {
    const KIND: ObjectKind = ObjectKind::Framebuffer;

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

impl<'g> Generate<'g> for Framebuffer<'g> {}

impl<'g> Framebuffer<'g> {
    /// The window-system-provided framebuffer (id 0).
    pub fn default_framebuffer(gl: &'g Gl) -> Self {
        Self::from_handle(Handle::borrowed(gl, ObjectKind::Framebuffer, 0))
    }

    fn bind_to(&self, target: GLenum) {
        self.handle
            .gl()
            .api()
            .bind_object(ObjectKind::Framebuffer, Some(target), self.handle.id());
    }

    /// Binds this framebuffer for drawing and reading until the returned
    /// guard drops, at which point the previous bindings are restored. The
    /// restore runs on every exit path, including `?` and unwinding.
    pub fn scope(&self) -> FramebufferScope<'g> {
        let api = self.handle.gl().api();
        let previous_draw = api.get_integer(gl::DRAW_FRAMEBUFFER_BINDING) as u32;
        let previous_read = api.get_integer(gl::READ_FRAMEBUFFER_BINDING) as u32;
        self.bind_to(gl::FRAMEBUFFER);
        FramebufferScope {
            gl: self.handle.gl(),
            previous_draw,
            previous_read,
        }
    }

    pub fn attachments(&self) -> Attachments<'_, 'g> {
        Attachments { framebuffer: self }
    }

    /// Completeness status, e.g. `GL_FRAMEBUFFER_COMPLETE`.
    pub fn status(&self) -> GLenum {
        let _scope = self.scope();
        self.handle
            .gl()
            .api()
            .check_framebuffer_status(gl::FRAMEBUFFER)
    }

    pub fn is_complete(&self) -> bool {
        self.status() == gl::FRAMEBUFFER_COMPLETE
    }

    /// Copies `src` of `source` into `dst` of this framebuffer.
    pub fn blit_from(
        &self,
        source: &Framebuffer<'_>,
        src: Rect,
        dst: Rect,
        mask: u32,
        filter: GLenum,
    ) {
        let _scope = self.scope();
        source.bind_to(gl::READ_FRAMEBUFFER);
        self.handle
            .gl()
            .api()
            .blit_framebuffer(src.corners(), dst.corners(), mask, filter);
    }
}

/// Restores the draw and read framebuffer bindings on drop.
#[derive(Debug)]
pub struct FramebufferScope<'g> {
    gl: &'g Gl,
    previous_draw: u32,
    previous_read: u32,
}

impl Drop for FramebufferScope<'_> {
    fn drop(&mut self) {
        let api = self.gl.api();
        api.bind_object(
            ObjectKind::Framebuffer,
            Some(gl::DRAW_FRAMEBUFFER),
            self.previous_draw,
        );
        api.bind_object(
            ObjectKind::Framebuffer,
            Some(gl::READ_FRAMEBUFFER),
            self.previous_read,
        );
    }
}

/// Attachment points of a framebuffer.
#[derive(Debug, Clone, Copy)]
pub struct Attachments<'f, 'g> {
    framebuffer: &'f Framebuffer<'g>,
}

impl<'f, 'g> Attachments<'f, 'g> {
    pub fn get(&self, attachment: GLenum) -> Attachment<'f, 'g> {
        Attachment {
            framebuffer: self.framebuffer,
            attachment,
        }
    }

    /// Number of colour attachment points the driver supports.
    pub fn color_count(&self) -> usize {
        self.framebuffer.handle.gl().context().max_color_attachments()
    }

    pub fn color(&self, index: usize) -> Result<Attachment<'f, 'g>> {
        let len = self.color_count();
        if index >= len {
            return Err(ShmVizError::IndexOutOfRange {
                what: "color attachment",
                index,
                len,
            });
        }
        Ok(self.get(gl::COLOR_ATTACHMENT0 + index as u32))
    }

    pub fn depth(&self) -> Attachment<'f, 'g> {
        self.get(gl::DEPTH_ATTACHMENT)
    }

    pub fn stencil(&self) -> Attachment<'f, 'g> {
        self.get(gl::STENCIL_ATTACHMENT)
    }

    pub fn depth_stencil(&self) -> Attachment<'f, 'g> {
        self.get(gl::DEPTH_STENCIL_ATTACHMENT)
    }
}

/// Object attached to a framebuffer attachment point.
#[derive(Debug)]
pub enum AttachmentObject<'g> {
    Texture(Texture<'g>),
    Renderbuffer(Renderbuffer<'g>),
}

/// One attachment point.
#[derive(Debug, Clone, Copy)]
pub struct Attachment<'f, 'g> {
    framebuffer: &'f Framebuffer<'g>,
    attachment: GLenum,
}

impl<'f, 'g> Attachment<'f, 'g> {
    pub fn attachment(&self) -> GLenum {
        self.attachment
    }

    fn parameter(&self, pname: GLenum) -> i32 {
        let _scope = self.framebuffer.scope();
        self.framebuffer
            .handle
            .gl()
            .api()
            .get_framebuffer_attachment_parameter(gl::FRAMEBUFFER, self.attachment, pname)
    }

    /// Kind of object attached: `GL_NONE`, `GL_FRAMEBUFFER_DEFAULT`,
    /// `GL_TEXTURE` or `GL_RENDERBUFFER`.
    pub fn object_type(&self) -> GLenum {
        self.parameter(gl::FRAMEBUFFER_ATTACHMENT_OBJECT_TYPE) as GLenum
    }

    pub fn object_name(&self) -> u32 {
        self.parameter(gl::FRAMEBUFFER_ATTACHMENT_OBJECT_NAME) as u32
    }

    /// The attached object, or `None` when nothing (or the default
    /// framebuffer's own storage) is attached.
    pub fn object(&self) -> Result<Option<AttachmentObject<'g>>> {
        let gl = self.framebuffer.handle.gl();
        match self.object_type() {
            gl::NONE | gl::FRAMEBUFFER_DEFAULT => Ok(None),
            gl::TEXTURE => Ok(Texture::from_raw(gl, self.object_name()).map(AttachmentObject::Texture)),
            gl::RENDERBUFFER => Ok(Renderbuffer::from_raw(gl, self.object_name())
                .map(AttachmentObject::Renderbuffer)),
            other => Err(ShmVizError::UnknownAttachmentType(other)),
        }
    }

    pub fn attach_texture(&self, texture: &Texture<'_>, level: i32) {
        let _scope = self.framebuffer.scope();
        self.framebuffer.handle.gl().api().framebuffer_texture(
            gl::FRAMEBUFFER,
            self.attachment,
            texture.id(),
            level,
        );
    }

    pub fn attach_renderbuffer(&self, renderbuffer: &Renderbuffer<'_>) {
        let _scope = self.framebuffer.scope();
        self.framebuffer.handle.gl().api().framebuffer_renderbuffer(
            gl::FRAMEBUFFER,
            self.attachment,
            gl::RENDERBUFFER,
            renderbuffer.id(),
        );
    }

    pub fn attach(&self, object: &AttachmentObject<'_>) {
        match object {
            AttachmentObject::Texture(texture) => self.attach_texture(texture, 0),
            AttachmentObject::Renderbuffer(renderbuffer) => self.attach_renderbuffer(renderbuffer),
        }
    }
}

#[derive(Debug)]
pub struct Renderbuffer<'g> {
    handle: Handle<'g>,
}

impl<'g> ManagedObject<'g> for Renderbuffer<'g> {
    const KIND: ObjectKind = ObjectKind::Renderbuffer;

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

impl<'g> Generate<'g> for Renderbuffer<'g> {}

impl<'g> Renderbuffer<'g> {
    fn bind_self(&self) {
        self.handle
            .gl()
            .api()
            .bind_object(ObjectKind::Renderbuffer, Some(gl::RENDERBUFFER), self.handle.id());
    }

    fn parameter(&self, pname: GLenum) -> i32 {
        self.bind_self();
        self.handle
            .gl()
            .api()
            .get_renderbuffer_parameter(gl::RENDERBUFFER, pname)
    }

    /// Allocates storage of `format`, optionally multisampled.
    pub fn storage(&self, format: GLenum, width: u32, height: u32, samples: u32) -> &Self {
        self.bind_self();
        self.handle.gl().api().renderbuffer_storage_multisample(
            gl::RENDERBUFFER,
            samples as i32,
            format,
            width as i32,
            height as i32,
        );
        self
    }

    pub fn width(&self) -> u32 {
        self.parameter(gl::RENDERBUFFER_WIDTH).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        self.parameter(gl::RENDERBUFFER_HEIGHT).max(0) as u32
    }

    pub fn format(&self) -> GLenum {
        self.parameter(gl::RENDERBUFFER_INTERNAL_FORMAT) as GLenum
    }

    pub fn samples(&self) -> u32 {
        self.parameter(gl::RENDERBUFFER_SAMPLES).max(0) as u32
    }
}
