//! Typed wrappers over OpenGL objects.
//!
//! Every call goes through a [`GlApi`] driver owned by a [`Gl`] registry. The
//! wrappers borrow the registry, so no handle can outlive the context it was
//! created on, and the registry is neither `Send` nor `Sync`, which keeps all
//! graphics calls on the thread owning the context.

mod api;
mod buffer;
mod context;
mod framebuffer;
mod native;
mod object;
mod reflect;
mod shader;
mod texture;
mod vertex_array;

#[cfg(test)]
pub(crate) mod fake;

use std::fmt;

pub use api::{ActiveVariable, GlApi};
pub use buffer::{f32_bytes, Buffer};
pub use context::{Context, ShaderStorageBinding};
pub use framebuffer::{
    Attachment, AttachmentObject, Attachments, Framebuffer, FramebufferScope, Rect, Renderbuffer,
};
pub use gl::types::GLenum;
pub use native::NativeGl;
pub use object::{FreeOnDrop, Generate, Handle, ManagedObject};
pub use reflect::{
    base_type, elements_per_type, scalar_size, Attribute, Attributes, ScalarKind, Uniform,
    UniformBlock, UniformBlocks, UniformValues, Uniforms,
};
pub use shader::{Program, Shader, ShaderStage};
pub use texture::{ImageFormat, Texture, TextureUnit};
pub use vertex_array::{AttribPointer, VertexArray, VertexArrayBinding};

/// Kind of native object a wrapper owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Buffer,
    Shader,
    Program,
    Texture,
    Framebuffer,
    Renderbuffer,
    VertexArray,
}

impl ObjectKind {
    /// Number of target arguments the bind call takes before the object id,
    /// or `None` when the kind cannot be bound at all.
    pub fn bind_arity(self) -> Option<usize> {
        match self {
            Self::Buffer | Self::Texture | Self::Framebuffer | Self::Renderbuffer => Some(1),
            Self::VertexArray => Some(0),
            Self::Shader | Self::Program => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Buffer => "buffer",
            Self::Shader => "shader",
            Self::Program => "program",
            Self::Texture => "texture",
            Self::Framebuffer => "framebuffer",
            Self::Renderbuffer => "renderbuffer",
            Self::VertexArray => "vertex array",
        };
        f.write_str(name)
    }
}

/// Registry options fixed at construction time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Release owned objects when their wrapper is dropped. Wrappers obtained
    /// by querying the driver (the buffer bound to an attribute, the current
    /// program, ...) never own their object and are never released this way.
    pub auto_free: bool,
}

/// Owner of the graphics driver. All wrappers borrow it.
pub struct Gl {
    api: Box<dyn GlApi>,
    config: RegistryConfig,
}

impl Gl {
    pub fn new(api: impl GlApi + 'static, config: RegistryConfig) -> Self {
        Self {
            api: Box::new(api),
            config,
        }
    }

    pub fn api(&self) -> &dyn GlApi {
        self.api.as_ref()
    }

    pub fn config(&self) -> RegistryConfig {
        self.config
    }

    /// Process-wide queries and state setters.
    pub fn context(&self) -> Context<'_> {
        Context::new(self)
    }
}

impl fmt::Debug for Gl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gl").field("config", &self.config).finish()
    }
}
