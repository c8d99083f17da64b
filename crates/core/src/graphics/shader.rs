use std::{cell::RefCell, collections::HashMap};

use super::{
    reflect::strip_array_suffix, Attributes, GLenum, Gl, Handle, ManagedObject, ObjectKind,
    UniformBlocks, Uniforms,
};
use crate::{Result, ShmVizError};

/// Pipeline stage a shader object compiles for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Geometry,
    Fragment,
    Compute,
}

impl ShaderStage {
    pub fn gl_enum(self) -> GLenum {
        match self {
            Self::Vertex => gl::VERTEX_SHADER,
            Self::Geometry => gl::GEOMETRY_SHADER,
            Self::Fragment => gl::FRAGMENT_SHADER,
            Self::Compute => gl::COMPUTE_SHADER,
        }
    }
}

#[derive(Debug)]
pub struct Shader<'g> {
    handle: Handle<'g>,
}

impl<'g> ManagedObject<'g> for Shader<'g> {
    const KIND: ObjectKind = ObjectKind::Shader;

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

impl<'g> Shader<'g> {
    pub fn new(gl: &'g Gl, stage: ShaderStage) -> Self {
        let id = gl.api().create_shader(stage.gl_enum());
        Self::from_handle(Handle::owned(gl, ObjectKind::Shader, id))
    }

    /// Creates, loads and compiles a shader in one go.
    pub fn compiled(gl: &'g Gl, stage: ShaderStage, source: &str) -> Result<Self> {
        let shader = Self::new(gl, stage);
        shader.source(source).compile()?;
        Ok(shader)
    }

    pub fn source(&self, source: &str) -> &Self {
        self.handle.gl().api().shader_source(self.handle.id(), source);
        self
    }

    /// Compiles the loaded source. On failure the driver's info log is the
    /// error payload.
    pub fn compile(&self) -> Result<&Self> {
        let api = self.handle.gl().api();
        api.compile_shader(self.handle.id());
        if api.get_shader_parameter(self.handle.id(), gl::COMPILE_STATUS) == 0 {
            return Err(ShmVizError::Compile(
                api.get_shader_info_log(self.handle.id()),
            ));
        }
        Ok(self)
    }
}

/// Name to index tables captured after a successful link.
#[derive(Debug, Default)]
pub(crate) struct LinkedNames {
    pub(crate) uniforms: HashMap<String, u32>,
    pub(crate) blocks: HashMap<String, u32>,
}

#[derive(Debug)]
pub struct Program<'g> {
    handle: Handle<'g>,
    names: RefCell<Option<LinkedNames>>,
}

impl<'g> ManagedObject<'g> for Program<'g> {
    const KIND: ObjectKind = ObjectKind::Program;

    fn from_handle(handle: Handle<'g>) -> Self {
        Self {
            handle,
            names: RefCell::new(None),
        }
    }

    fn handle(&self) -> &Handle<'g> {
        &self.handle
    }

    fn into_handle(self) -> Handle<'g> {
        self.handle
    }
}

impl<'g> Program<'g> {
    pub fn create(gl: &'g Gl) -> Self {
        let id = gl.api().create_program();
        Self::from_handle(Handle::owned(gl, ObjectKind::Program, id))
    }

    pub(crate) fn gl(&self) -> &'g Gl {
        self.handle.gl()
    }

    pub fn attach(&self, shaders: &[&Shader<'_>]) -> &Self {
        for shader in shaders {
            self.gl().api().attach_shader(self.handle.id(), shader.id());
        }
        self
    }

    /// Links the attached shaders. On failure the driver's info log is the
    /// error payload. A successful link rebuilds the name lookup tables.
    pub fn link(&self) -> Result<&Self> {
        let api = self.gl().api();
        let id = self.handle.id();
        self.names.replace(None);
        api.link_program(id);
        if api.get_program_parameter(id, gl::LINK_STATUS) == 0 {
            return Err(ShmVizError::Link(api.get_program_info_log(id)));
        }
        self.names.replace(Some(self.collect_names()));
        Ok(self)
    }

    pub fn use_program(&self) -> &Self {
        self.gl().api().use_program(self.handle.id());
        self
    }

    pub fn uniforms(&self) -> Uniforms<'_, 'g> {
        Uniforms::new(self)
    }

    pub fn uniform_blocks(&self) -> UniformBlocks<'_, 'g> {
        UniformBlocks::new(self)
    }

    pub fn attributes(&self) -> Attributes<'g> {
        Attributes::new(self.gl(), self.handle.id())
    }

    pub(crate) fn cached_uniform(&self, name: &str) -> Option<u32> {
        self.names
            .borrow()
            .as_ref()
            .and_then(|names| names.uniforms.get(name).copied())
    }

    pub(crate) fn cached_block(&self, name: &str) -> Option<u32> {
        self.names
            .borrow()
            .as_ref()
            .and_then(|names| names.blocks.get(name).copied())
    }

    fn collect_names(&self) -> LinkedNames {
        let api = self.gl().api();
        let id = self.handle.id();

        let count = api.get_program_parameter(id, gl::ACTIVE_UNIFORMS).max(0) as u32;
        let active: Vec<String> = (0..count)
            .map(|i| api.get_active_uniform(id, i).name)
            .collect();
        let queried: Vec<&str> = active.iter().map(String::as_str).collect();
        let indices = api.get_uniform_indices(id, &queried);

        let mut uniforms = HashMap::new();
        for (name, index) in active.iter().zip(indices) {
            if index == super::object::INVALID_INDEX {
                continue;
            }
            uniforms.insert(strip_array_suffix(name).to_string(), index);
            uniforms.insert(name.clone(), index);
        }

        let count = api.get_program_parameter(id, gl::ACTIVE_UNIFORM_BLOCKS).max(0) as u32;
        let blocks = (0..count)
            .map(|i| (api.get_active_uniform_block_name(id, i), i))
            .collect();

        LinkedNames { uniforms, blocks }
    }
}
