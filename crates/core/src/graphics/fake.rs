//! In-memory stand-in for an OpenGL 3.3 driver.
//!
//! Keeps enough object and binding state for the wrappers to be exercised
//! without a context, and compiles shaders with a declaration-only GLSL
//! reader: `#define`, `#error`, `in` declarations, plain and array uniforms,
//! and std140 uniform blocks.

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    rc::Rc,
};

use super::{ActiveVariable, GLenum, GlApi, ObjectKind, ScalarKind};

/// Driver calls worth asserting on.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Delete(ObjectKind, u32),
    UseProgram(u32),
    Uniform {
        location: i32,
        kind: ScalarKind,
        components: usize,
        count: usize,
    },
    DrawArrays {
        mode: GLenum,
        first: i32,
        count: i32,
    },
    BindBufferRange {
        target: GLenum,
        index: u32,
        buffer: u32,
        offset: usize,
        size: usize,
    },
    Blit {
        read: u32,
        draw: u32,
        src: [i32; 4],
        dst: [i32; 4],
    },
    Viewport([i32; 4]),
    ClearColor([f32; 4]),
    Clear(u32),
    Capability(GLenum, bool),
    BlendFunc(GLenum, GLenum),
}

const MAX_VERTEX_ATTRIBS: i32 = 16;
const MAX_COLOR_ATTACHMENTS: i32 = 8;

#[derive(Debug, Clone)]
struct Declared {
    name: String,
    ty: GLenum,
    len: Option<usize>,
}

impl Declared {
    fn reported_name(&self) -> String {
        match self.len {
            Some(_) => format!("{}[0]", self.name),
            None => self.name.clone(),
        }
    }

    fn count(&self) -> usize {
        self.len.unwrap_or(1)
    }
}

#[derive(Debug, Clone)]
struct DeclaredBlock {
    name: String,
    members: Vec<Declared>,
}

#[derive(Debug, Clone, Default)]
struct Declarations {
    inputs: Vec<Declared>,
    uniforms: Vec<Declared>,
    blocks: Vec<DeclaredBlock>,
}

#[derive(Debug, Clone)]
struct ShaderState {
    stage: GLenum,
    source: String,
    compiled: bool,
    log: String,
    declarations: Declarations,
}

#[derive(Debug, Clone)]
struct LinkedUniform {
    name: String,
    size: i32,
    ty: GLenum,
    location: i32,
}

#[derive(Debug, Clone)]
struct LinkedBlock {
    name: String,
    data_size: i32,
    members: Vec<u32>,
    stages: Vec<GLenum>,
    binding: u32,
}

#[derive(Debug, Clone, Default)]
struct ProgramState {
    shaders: Vec<u32>,
    linked: bool,
    log: String,
    uniforms: Vec<LinkedUniform>,
    blocks: Vec<LinkedBlock>,
    attributes: Vec<Declared>,
}

#[derive(Debug, Clone, Copy)]
struct AttribState {
    enabled: bool,
    size: i32,
    ty: GLenum,
    normalized: bool,
    stride: i32,
    offset: usize,
    buffer: u32,
}

impl Default for AttribState {
    fn default() -> Self {
        Self {
            enabled: false,
            size: 4,
            ty: gl::FLOAT,
            normalized: false,
            stride: 0,
            offset: 0,
            buffer: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RenderbufferState {
    width: i32,
    height: i32,
    format: GLenum,
    samples: i32,
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,
    calls: Vec<Call>,
    deleted: Vec<(ObjectKind, u32)>,
    errors: VecDeque<GLenum>,

    buffers: HashMap<u32, usize>,
    buffer_bindings: HashMap<GLenum, u32>,
    indexed_bindings: HashMap<(GLenum, u32), u32>,

    shaders: HashMap<u32, ShaderState>,
    programs: HashMap<u32, ProgramState>,
    current_program: u32,

    vertex_arrays: HashMap<u32, HashMap<u32, AttribState>>,
    current_vertex_array: u32,

    active_unit: u32,
    texture_bindings: HashMap<(u32, GLenum), u32>,
    texture_parameters: HashMap<u32, HashMap<GLenum, i32>>,

    draw_framebuffer: u32,
    read_framebuffer: u32,
    attachments: HashMap<u32, HashMap<GLenum, (GLenum, u32)>>,
    renderbuffers: HashMap<u32, RenderbufferState>,
    current_renderbuffer: u32,
}

impl State {
    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn error(&mut self, code: GLenum) {
        self.errors.push_back(code);
    }

    fn attrib(&mut self, index: u32) -> Option<&mut AttribState> {
        if index >= MAX_VERTEX_ATTRIBS as u32 {
            self.error(gl::INVALID_VALUE);
            return None;
        }
        Some(
            self.vertex_arrays
                .entry(self.current_vertex_array)
                .or_default()
                .entry(index)
                .or_default(),
        )
    }

    fn framebuffer_for(&self, target: GLenum) -> u32 {
        match target {
            gl::READ_FRAMEBUFFER => self.read_framebuffer,
            _ => self.draw_framebuffer,
        }
    }

    fn bound_texture(&self, target: GLenum) -> u32 {
        self.texture_bindings
            .get(&(self.active_unit, target))
            .copied()
            .unwrap_or(0)
    }

    fn program(&mut self, id: u32) -> Option<&mut ProgramState> {
        let found = self.programs.contains_key(&id);
        if !found {
            self.error(gl::INVALID_VALUE);
        }
        self.programs.get_mut(&id)
    }

    fn link(&mut self, id: u32) {
        let Some(program) = self.programs.get(&id) else {
            self.error(gl::INVALID_VALUE);
            return;
        };
        let mut shaders: Vec<ShaderState> = program
            .shaders
            .iter()
            .filter_map(|shader| self.shaders.get(shader).cloned())
            .collect();

        let result = if shaders.is_empty() {
            Err(format!("error: no shaders attached to program {id}"))
        } else if shaders.iter().any(|shader| !shader.compiled) {
            Err("error: attached shader has not been compiled successfully".to_string())
        } else {
            shaders.sort_by_key(|shader| stage_rank(shader.stage));
            Ok(link_stages(&shaders))
        };

        let Some(program) = self.programs.get_mut(&id) else {
            return;
        };
        match result {
            Ok(linked) => {
                program.linked = true;
                program.log.clear();
                program.uniforms = linked.uniforms;
                program.blocks = linked.blocks;
                program.attributes = linked.attributes;
            }
            Err(log) => {
                program.linked = false;
                program.log = log;
                program.uniforms.clear();
                program.blocks.clear();
                program.attributes.clear();
            }
        }
    }
}

/// Recording fake driver. Clones share state, so a test can keep one clone
/// for inspection while the registry owns another.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeGl {
    state: Rc<RefCell<State>>,
}

impl FakeGl {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub(crate) fn deleted(&self) -> Vec<(ObjectKind, u32)> {
        self.state.borrow().deleted.clone()
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl GlApi for FakeGl {
    fn gen_object(&self, _kind: ObjectKind) -> u32 {
        self.state.borrow_mut().allocate_id()
    }

    fn delete_object(&self, kind: ObjectKind, id: u32) {
        let mut state = self.state.borrow_mut();
        match kind {
            ObjectKind::Buffer => {
                state.buffers.remove(&id);
            }
            ObjectKind::Shader => {
                state.shaders.remove(&id);
            }
            ObjectKind::Program => {
                state.programs.remove(&id);
            }
            ObjectKind::Texture => {
                state.texture_parameters.remove(&id);
            }
            ObjectKind::Framebuffer => {
                state.attachments.remove(&id);
            }
            ObjectKind::Renderbuffer => {
                state.renderbuffers.remove(&id);
            }
            ObjectKind::VertexArray => {
                state.vertex_arrays.remove(&id);
            }
        }
        state.deleted.push((kind, id));
        state.calls.push(Call::Delete(kind, id));
    }

    fn bind_object(&self, kind: ObjectKind, target: Option<GLenum>, id: u32) {
        let mut state = self.state.borrow_mut();
        match (kind, target) {
            (ObjectKind::Buffer, Some(target)) => {
                state.buffer_bindings.insert(target, id);
            }
            (ObjectKind::Texture, Some(target)) => {
                let unit = state.active_unit;
                state.texture_bindings.insert((unit, target), id);
            }
            (ObjectKind::Framebuffer, Some(gl::DRAW_FRAMEBUFFER)) => state.draw_framebuffer = id,
            (ObjectKind::Framebuffer, Some(gl::READ_FRAMEBUFFER)) => state.read_framebuffer = id,
            (ObjectKind::Framebuffer, Some(_)) => {
                state.draw_framebuffer = id;
                state.read_framebuffer = id;
            }
            (ObjectKind::Renderbuffer, Some(_)) => state.current_renderbuffer = id,
            (ObjectKind::VertexArray, None) => state.current_vertex_array = id,
            _ => state.error(gl::INVALID_ENUM),
        }
    }

    fn buffer_data(&self, target: GLenum, size: usize, _data: Option<&[u8]>, _usage: GLenum) {
        let mut state = self.state.borrow_mut();
        match state.buffer_bindings.get(&target).copied().unwrap_or(0) {
            0 => state.error(gl::INVALID_OPERATION),
            buffer => {
                state.buffers.insert(buffer, size);
            }
        }
    }

    fn buffer_sub_data(&self, target: GLenum, offset: usize, data: &[u8]) {
        let mut state = self.state.borrow_mut();
        let buffer = state.buffer_bindings.get(&target).copied().unwrap_or(0);
        let size = state.buffers.get(&buffer).copied().unwrap_or(0);
        if buffer == 0 {
            state.error(gl::INVALID_OPERATION);
        } else if offset + data.len() > size {
            state.error(gl::INVALID_VALUE);
        }
    }

    fn get_buffer_parameter(&self, target: GLenum, pname: GLenum) -> i32 {
        let state = self.state.borrow();
        let buffer = state.buffer_bindings.get(&target).copied().unwrap_or(0);
        match pname {
            gl::BUFFER_SIZE => state.buffers.get(&buffer).copied().unwrap_or(0) as i32,
            _ => 0,
        }
    }

    fn bind_buffer_range(
        &self,
        target: GLenum,
        index: u32,
        buffer: u32,
        offset: usize,
        size: usize,
    ) {
        let mut state = self.state.borrow_mut();
        let binding = match target {
            gl::UNIFORM_BUFFER => gl::UNIFORM_BUFFER_BINDING,
            gl::SHADER_STORAGE_BUFFER => gl::SHADER_STORAGE_BUFFER_BINDING,
            _ => {
                state.error(gl::INVALID_ENUM);
                return;
            }
        };
        state.indexed_bindings.insert((binding, index), buffer);
        state.buffer_bindings.insert(target, buffer);
        state.calls.push(Call::BindBufferRange {
            target,
            index,
            buffer,
            offset,
            size,
        });
    }

    fn create_shader(&self, stage: GLenum) -> u32 {
        let mut state = self.state.borrow_mut();
        let id = state.allocate_id();
        state.shaders.insert(
            id,
            ShaderState {
                stage,
                source: String::new(),
                compiled: false,
                log: String::new(),
                declarations: Declarations::default(),
            },
        );
        id
    }

    fn shader_source(&self, shader: u32, source: &str) {
        let mut state = self.state.borrow_mut();
        match state.shaders.get_mut(&shader) {
            Some(shader) => shader.source = source.to_string(),
            None => state.error(gl::INVALID_VALUE),
        }
    }

    fn compile_shader(&self, shader: u32) {
        let mut state = self.state.borrow_mut();
        let Some(shader) = state.shaders.get_mut(&shader) else {
            state.error(gl::INVALID_VALUE);
            return;
        };
        match parse_declarations(&shader.source) {
            Ok(declarations) => {
                shader.compiled = true;
                shader.log.clear();
                shader.declarations = declarations;
            }
            Err(log) => {
                shader.compiled = false;
                shader.log = log;
            }
        }
    }

    fn get_shader_parameter(&self, shader: u32, pname: GLenum) -> i32 {
        let state = self.state.borrow();
        let Some(shader) = state.shaders.get(&shader) else {
            return 0;
        };
        match pname {
            gl::COMPILE_STATUS => shader.compiled as i32,
            gl::SHADER_TYPE => shader.stage as i32,
            gl::INFO_LOG_LENGTH => shader.log.len() as i32,
            _ => 0,
        }
    }

    fn get_shader_info_log(&self, shader: u32) -> String {
        let state = self.state.borrow();
        state
            .shaders
            .get(&shader)
            .map(|shader| shader.log.clone())
            .unwrap_or_default()
    }

    fn create_program(&self) -> u32 {
        let mut state = self.state.borrow_mut();
        let id = state.allocate_id();
        state.programs.insert(id, ProgramState::default());
        id
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        let mut state = self.state.borrow_mut();
        if let Some(program) = state.program(program) {
            program.shaders.push(shader);
        }
    }

    fn link_program(&self, program: u32) {
        self.state.borrow_mut().link(program);
    }

    fn get_program_parameter(&self, program: u32, pname: GLenum) -> i32 {
        let state = self.state.borrow();
        let Some(program) = state.programs.get(&program) else {
            return 0;
        };
        match pname {
            gl::LINK_STATUS => program.linked as i32,
            gl::ATTACHED_SHADERS => program.shaders.len() as i32,
            gl::ACTIVE_UNIFORMS => program.uniforms.len() as i32,
            gl::ACTIVE_UNIFORM_BLOCKS => program.blocks.len() as i32,
            gl::ACTIVE_ATTRIBUTES => program.attributes.len() as i32,
            gl::INFO_LOG_LENGTH => program.log.len() as i32,
            _ => 0,
        }
    }

    fn get_program_info_log(&self, program: u32) -> String {
        let state = self.state.borrow();
        state
            .programs
            .get(&program)
            .map(|program| program.log.clone())
            .unwrap_or_default()
    }

    fn use_program(&self, program: u32) {
        let mut state = self.state.borrow_mut();
        state.current_program = program;
        state.calls.push(Call::UseProgram(program));
    }

    fn get_active_uniform(&self, program: u32, index: u32) -> ActiveVariable {
        let mut state = self.state.borrow_mut();
        let found = state
            .programs
            .get(&program)
            .and_then(|program| program.uniforms.get(index as usize))
            .map(|uniform| ActiveVariable {
                name: uniform.name.clone(),
                size: uniform.size,
                ty: uniform.ty,
            });
        found.unwrap_or_else(|| {
            state.error(gl::INVALID_VALUE);
            missing_variable()
        })
    }

    fn get_uniform_indices(&self, program: u32, names: &[&str]) -> Vec<u32> {
        let state = self.state.borrow();
        let uniforms = state
            .programs
            .get(&program)
            .map(|program| program.uniforms.as_slice())
            .unwrap_or_default();
        names
            .iter()
            .map(|name| {
                uniforms
                    .iter()
                    .position(|uniform| {
                        uniform.name == *name
                            || uniform.name.strip_suffix("[0]") == Some(*name)
                    })
                    .map_or(gl::INVALID_INDEX, |index| index as u32)
            })
            .collect()
    }

    fn get_uniform_location(&self, program: u32, name: &str) -> i32 {
        let state = self.state.borrow();
        let Some(program) = state.programs.get(&program) else {
            return -1;
        };
        let (base, element) = split_element(name);
        program
            .uniforms
            .iter()
            .find(|uniform| uniform.location >= 0 && split_element(&uniform.name).0 == base)
            .filter(|uniform| element < uniform.size.max(1))
            .map_or(-1, |uniform| uniform.location + element)
    }

    fn get_uniform_block_index(&self, program: u32, name: &str) -> u32 {
        let state = self.state.borrow();
        state
            .programs
            .get(&program)
            .and_then(|program| program.blocks.iter().position(|block| block.name == name))
            .map_or(gl::INVALID_INDEX, |index| index as u32)
    }

    fn get_active_uniform_block_name(&self, program: u32, index: u32) -> String {
        let state = self.state.borrow();
        state
            .programs
            .get(&program)
            .and_then(|program| program.blocks.get(index as usize))
            .map(|block| block.name.clone())
            .unwrap_or_default()
    }

    fn get_active_uniform_block_parameter(
        &self,
        program: u32,
        index: u32,
        pname: GLenum,
    ) -> Vec<i32> {
        let mut state = self.state.borrow_mut();
        let Some(block) = state
            .programs
            .get(&program)
            .and_then(|program| program.blocks.get(index as usize))
            .cloned()
        else {
            state.error(gl::INVALID_VALUE);
            return vec![0];
        };
        let referenced = |stage| block.stages.contains(&stage) as i32;
        let value = match pname {
            gl::UNIFORM_BLOCK_DATA_SIZE => block.data_size,
            gl::UNIFORM_BLOCK_BINDING => block.binding as i32,
            gl::UNIFORM_BLOCK_ACTIVE_UNIFORMS => block.members.len() as i32,
            gl::UNIFORM_BLOCK_REFERENCED_BY_VERTEX_SHADER => referenced(gl::VERTEX_SHADER),
            gl::UNIFORM_BLOCK_REFERENCED_BY_GEOMETRY_SHADER => referenced(gl::GEOMETRY_SHADER),
            gl::UNIFORM_BLOCK_REFERENCED_BY_FRAGMENT_SHADER => referenced(gl::FRAGMENT_SHADER),
            gl::UNIFORM_BLOCK_ACTIVE_UNIFORM_INDICES => {
                return block.members.iter().map(|member| *member as i32).collect();
            }
            _ => {
                state.error(gl::INVALID_ENUM);
                return vec![0];
            }
        };
        vec![value]
    }

    fn uniform_block_binding(&self, program: u32, index: u32, binding: u32) {
        let mut state = self.state.borrow_mut();
        let block = state
            .programs
            .get_mut(&program)
            .and_then(|program| program.blocks.get_mut(index as usize));
        match block {
            Some(block) => block.binding = binding,
            None => state.error(gl::INVALID_VALUE),
        }
    }

    fn get_active_attrib(&self, program: u32, index: u32) -> ActiveVariable {
        let mut state = self.state.borrow_mut();
        let found = state
            .programs
            .get(&program)
            .and_then(|program| program.attributes.get(index as usize))
            .map(|attribute| ActiveVariable {
                name: attribute.reported_name(),
                size: attribute.count() as i32,
                ty: attribute.ty,
            });
        found.unwrap_or_else(|| {
            state.error(gl::INVALID_VALUE);
            missing_variable()
        })
    }

    fn get_attrib_location(&self, program: u32, name: &str) -> i32 {
        let state = self.state.borrow();
        state
            .programs
            .get(&program)
            .and_then(|program| {
                program
                    .attributes
                    .iter()
                    .filter(|attribute| !attribute.name.starts_with("gl_"))
                    .position(|attribute| attribute.name == name)
            })
            .map_or(-1, |location| location as i32)
    }

    fn uniform_f32(&self, location: i32, components: usize, values: &[f32]) {
        self.record(Call::Uniform {
            location,
            kind: ScalarKind::Float,
            components,
            count: values.len() / components.max(1),
        });
    }

    fn uniform_i32(&self, location: i32, components: usize, values: &[i32]) {
        self.record(Call::Uniform {
            location,
            kind: ScalarKind::Int,
            components,
            count: values.len() / components.max(1),
        });
    }

    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        ty: GLenum,
        normalized: bool,
        stride: i32,
        offset: usize,
    ) {
        let mut state = self.state.borrow_mut();
        let buffer = state
            .buffer_bindings
            .get(&gl::ARRAY_BUFFER)
            .copied()
            .unwrap_or(0);
        if let Some(attrib) = state.attrib(index) {
            *attrib = AttribState {
                enabled: attrib.enabled,
                size,
                ty,
                normalized,
                stride,
                offset,
                buffer,
            };
        }
    }

    fn set_vertex_attrib_array_enabled(&self, index: u32, enabled: bool) {
        if let Some(attrib) = self.state.borrow_mut().attrib(index) {
            attrib.enabled = enabled;
        }
    }

    fn get_vertex_attrib_parameter(&self, index: u32, pname: GLenum) -> i32 {
        let mut state = self.state.borrow_mut();
        let Some(attrib) = state.attrib(index).copied() else {
            return 0;
        };
        match pname {
            gl::VERTEX_ATTRIB_ARRAY_ENABLED => attrib.enabled as i32,
            gl::VERTEX_ATTRIB_ARRAY_SIZE => attrib.size,
            gl::VERTEX_ATTRIB_ARRAY_STRIDE => attrib.stride,
            gl::VERTEX_ATTRIB_ARRAY_TYPE => attrib.ty as i32,
            gl::VERTEX_ATTRIB_ARRAY_NORMALIZED => attrib.normalized as i32,
            gl::VERTEX_ATTRIB_ARRAY_BUFFER_BINDING => attrib.buffer as i32,
            _ => {
                state.error(gl::INVALID_ENUM);
                0
            }
        }
    }

    fn get_vertex_attrib_offset(&self, index: u32) -> usize {
        let mut state = self.state.borrow_mut();
        state.attrib(index).map_or(0, |attrib| attrib.offset)
    }

    fn draw_arrays(&self, mode: GLenum, first: i32, count: i32) {
        self.record(Call::DrawArrays { mode, first, count });
    }

    fn active_texture(&self, unit: GLenum) {
        let mut state = self.state.borrow_mut();
        match unit.checked_sub(gl::TEXTURE0) {
            Some(index) => state.active_unit = index,
            None => state.error(gl::INVALID_ENUM),
        }
    }

    fn tex_parameter(&self, target: GLenum, pname: GLenum, value: i32) {
        let mut state = self.state.borrow_mut();
        match state.bound_texture(target) {
            0 => state.error(gl::INVALID_OPERATION),
            texture => {
                state
                    .texture_parameters
                    .entry(texture)
                    .or_default()
                    .insert(pname, value);
            }
        }
    }

    fn get_tex_parameter(&self, target: GLenum, pname: GLenum) -> i32 {
        let state = self.state.borrow();
        let texture = state.bound_texture(target);
        state
            .texture_parameters
            .get(&texture)
            .and_then(|parameters| parameters.get(&pname))
            .copied()
            .unwrap_or_else(|| default_tex_parameter(pname))
    }

    fn tex_image_2d(
        &self,
        target: GLenum,
        _level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        _format: GLenum,
        _ty: GLenum,
        _data: Option<&[u8]>,
    ) {
        let mut state = self.state.borrow_mut();
        match state.bound_texture(target) {
            0 => state.error(gl::INVALID_OPERATION),
            texture => {
                let parameters = state.texture_parameters.entry(texture).or_default();
                parameters.insert(gl::TEXTURE_WIDTH, width);
                parameters.insert(gl::TEXTURE_HEIGHT, height);
                parameters.insert(gl::TEXTURE_INTERNAL_FORMAT, internal_format);
            }
        }
    }

    fn check_framebuffer_status(&self, target: GLenum) -> GLenum {
        let state = self.state.borrow();
        let framebuffer = state.framebuffer_for(target);
        if framebuffer == 0 {
            return gl::FRAMEBUFFER_COMPLETE;
        }
        match state.attachments.get(&framebuffer) {
            Some(attached) if !attached.is_empty() => gl::FRAMEBUFFER_COMPLETE,
            _ => gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT,
        }
    }

    fn get_framebuffer_attachment_parameter(
        &self,
        target: GLenum,
        attachment: GLenum,
        pname: GLenum,
    ) -> i32 {
        let state = self.state.borrow();
        let framebuffer = state.framebuffer_for(target);
        let (ty, name) = if framebuffer == 0 {
            (gl::FRAMEBUFFER_DEFAULT, 0)
        } else {
            state
                .attachments
                .get(&framebuffer)
                .and_then(|attached| attached.get(&attachment))
                .copied()
                .unwrap_or((gl::NONE, 0))
        };
        match pname {
            gl::FRAMEBUFFER_ATTACHMENT_OBJECT_TYPE => ty as i32,
            gl::FRAMEBUFFER_ATTACHMENT_OBJECT_NAME => name as i32,
            _ => 0,
        }
    }

    fn framebuffer_texture(&self, target: GLenum, attachment: GLenum, texture: u32, _level: i32) {
        let mut state = self.state.borrow_mut();
        match state.framebuffer_for(target) {
            0 => state.error(gl::INVALID_OPERATION),
            framebuffer => {
                state
                    .attachments
                    .entry(framebuffer)
                    .or_default()
                    .insert(attachment, (gl::TEXTURE, texture));
            }
        }
    }

    fn framebuffer_renderbuffer(
        &self,
        target: GLenum,
        attachment: GLenum,
        _renderbuffer_target: GLenum,
        renderbuffer: u32,
    ) {
        let mut state = self.state.borrow_mut();
        match state.framebuffer_for(target) {
            0 => state.error(gl::INVALID_OPERATION),
            framebuffer => {
                state
                    .attachments
                    .entry(framebuffer)
                    .or_default()
                    .insert(attachment, (gl::RENDERBUFFER, renderbuffer));
            }
        }
    }

    fn blit_framebuffer(&self, src: [i32; 4], dst: [i32; 4], _mask: u32, _filter: GLenum) {
        let mut state = self.state.borrow_mut();
        let call = Call::Blit {
            read: state.read_framebuffer,
            draw: state.draw_framebuffer,
            src,
            dst,
        };
        state.calls.push(call);
    }

    fn renderbuffer_storage_multisample(
        &self,
        _target: GLenum,
        samples: i32,
        format: GLenum,
        width: i32,
        height: i32,
    ) {
        let mut state = self.state.borrow_mut();
        match state.current_renderbuffer {
            0 => state.error(gl::INVALID_OPERATION),
            renderbuffer => {
                state.renderbuffers.insert(
                    renderbuffer,
                    RenderbufferState {
                        width,
                        height,
                        format,
                        samples,
                    },
                );
            }
        }
    }

    fn get_renderbuffer_parameter(&self, _target: GLenum, pname: GLenum) -> i32 {
        let state = self.state.borrow();
        let storage = state
            .renderbuffers
            .get(&state.current_renderbuffer)
            .copied()
            .unwrap_or(RenderbufferState {
                format: gl::RGBA4,
                ..Default::default()
            });
        match pname {
            gl::RENDERBUFFER_WIDTH => storage.width,
            gl::RENDERBUFFER_HEIGHT => storage.height,
            gl::RENDERBUFFER_INTERNAL_FORMAT => storage.format as i32,
            gl::RENDERBUFFER_SAMPLES => storage.samples,
            _ => 0,
        }
    }

    fn get_integer(&self, pname: GLenum) -> i32 {
        let state = self.state.borrow();
        let buffer = |target| state.buffer_bindings.get(&target).copied().unwrap_or(0) as i32;
        match pname {
            gl::MAX_VERTEX_ATTRIBS => MAX_VERTEX_ATTRIBS,
            gl::MAX_COLOR_ATTACHMENTS => MAX_COLOR_ATTACHMENTS,
            gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS => 32,
            gl::CURRENT_PROGRAM => state.current_program as i32,
            gl::ARRAY_BUFFER_BINDING => buffer(gl::ARRAY_BUFFER),
            gl::ELEMENT_ARRAY_BUFFER_BINDING => buffer(gl::ELEMENT_ARRAY_BUFFER),
            gl::UNIFORM_BUFFER_BINDING => buffer(gl::UNIFORM_BUFFER),
            gl::SHADER_STORAGE_BUFFER_BINDING => buffer(gl::SHADER_STORAGE_BUFFER),
            gl::VERTEX_ARRAY_BINDING => state.current_vertex_array as i32,
            gl::DRAW_FRAMEBUFFER_BINDING => state.draw_framebuffer as i32,
            gl::READ_FRAMEBUFFER_BINDING => state.read_framebuffer as i32,
            gl::RENDERBUFFER_BINDING => state.current_renderbuffer as i32,
            gl::ACTIVE_TEXTURE => (gl::TEXTURE0 + state.active_unit) as i32,
            gl::TEXTURE_BINDING_2D => state.bound_texture(gl::TEXTURE_2D) as i32,
            _ => 0,
        }
    }

    fn get_integer_indexed(&self, pname: GLenum, index: u32) -> i32 {
        let state = self.state.borrow();
        state
            .indexed_bindings
            .get(&(pname, index))
            .copied()
            .unwrap_or(0) as i32
    }

    fn get_string(&self, pname: GLenum) -> String {
        match pname {
            gl::VERSION => "3.3.0 Fake".to_string(),
            gl::RENDERER => "shmviz recording driver".to_string(),
            gl::VENDOR => "shmviz".to_string(),
            gl::SHADING_LANGUAGE_VERSION => "3.30".to_string(),
            _ => String::new(),
        }
    }

    fn get_error(&self) -> GLenum {
        self.state
            .borrow_mut()
            .errors
            .pop_front()
            .unwrap_or(gl::NO_ERROR)
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(Call::Viewport([x, y, width, height]));
    }

    fn clear(&self, mask: u32) {
        self.record(Call::Clear(mask));
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.record(Call::ClearColor([r, g, b, a]));
    }

    fn set_capability(&self, capability: GLenum, enabled: bool) {
        self.record(Call::Capability(capability, enabled));
    }

    fn blend_func(&self, src: GLenum, dst: GLenum) {
        self.record(Call::BlendFunc(src, dst));
    }
}

fn missing_variable() -> ActiveVariable {
    ActiveVariable {
        name: String::new(),
        size: 0,
        ty: 0,
    }
}

fn default_tex_parameter(pname: GLenum) -> i32 {
    match pname {
        gl::TEXTURE_MIN_FILTER => gl::NEAREST_MIPMAP_LINEAR as i32,
        gl::TEXTURE_MAG_FILTER => gl::LINEAR as i32,
        gl::TEXTURE_WRAP_S | gl::TEXTURE_WRAP_T | gl::TEXTURE_WRAP_R => gl::REPEAT as i32,
        _ => 0,
    }
}

/// `name[3]` splits into `("name", 3)`; plain names are element 0.
fn split_element(name: &str) -> (&str, i32) {
    name.strip_suffix(']')
        .and_then(|rest| rest.rsplit_once('['))
        .and_then(|(base, index)| index.parse().ok().map(|index| (base, index)))
        .unwrap_or((name, 0))
}

fn stage_rank(stage: GLenum) -> u8 {
    match stage {
        gl::VERTEX_SHADER => 0,
        gl::GEOMETRY_SHADER => 1,
        gl::FRAGMENT_SHADER => 2,
        _ => 3,
    }
}

struct Linked {
    uniforms: Vec<LinkedUniform>,
    blocks: Vec<LinkedBlock>,
    attributes: Vec<Declared>,
}

fn link_stages(shaders: &[ShaderState]) -> Linked {
    let mut uniforms: Vec<LinkedUniform> = Vec::new();
    let mut blocks: Vec<LinkedBlock> = Vec::new();
    let mut attributes = Vec::new();
    let mut next_location = 0;

    for shader in shaders {
        let declarations = &shader.declarations;
        if shader.stage == gl::VERTEX_SHADER {
            attributes = declarations.inputs.clone();
        }

        for declared in &declarations.uniforms {
            let name = declared.reported_name();
            if uniforms.iter().any(|uniform| uniform.name == name) {
                continue;
            }
            uniforms.push(LinkedUniform {
                name,
                size: declared.count() as i32,
                ty: declared.ty,
                location: next_location,
            });
            next_location += declared.count() as i32;
        }

        for declared in &declarations.blocks {
            if let Some(block) = blocks.iter_mut().find(|block| block.name == declared.name) {
                if !block.stages.contains(&shader.stage) {
                    block.stages.push(shader.stage);
                }
                continue;
            }
            let mut members = Vec::new();
            for member in &declared.members {
                members.push(uniforms.len() as u32);
                uniforms.push(LinkedUniform {
                    name: member.reported_name(),
                    size: member.count() as i32,
                    ty: member.ty,
                    location: -1,
                });
            }
            blocks.push(LinkedBlock {
                name: declared.name.clone(),
                data_size: std140_size(&declared.members) as i32,
                members,
                stages: vec![shader.stage],
                binding: 0,
            });
        }
    }

    Linked {
        uniforms,
        blocks,
        attributes,
    }
}

fn round_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

/// Size and alignment of one std140 member.
fn std140_layout(member: &Declared) -> (usize, usize) {
    let (size, align) = match member.ty {
        gl::FLOAT_VEC2 | gl::INT_VEC2 | gl::UNSIGNED_INT_VEC2 => (8, 8),
        gl::FLOAT_VEC3 | gl::INT_VEC3 | gl::UNSIGNED_INT_VEC3 => (12, 16),
        gl::FLOAT_VEC4 | gl::INT_VEC4 | gl::UNSIGNED_INT_VEC4 => (16, 16),
        gl::FLOAT_MAT2 => (32, 16),
        gl::FLOAT_MAT3 => (48, 16),
        gl::FLOAT_MAT4 => (64, 16),
        _ => (4, 4),
    };
    match member.len {
        Some(len) => (round_up(size, 16) * len, 16),
        None => (size, align),
    }
}

fn std140_size(members: &[Declared]) -> usize {
    let end = members.iter().fold(0, |offset, member| {
        let (size, align) = std140_layout(member);
        round_up(offset, align) + size
    });
    round_up(end, 16)
}

fn type_enum(name: &str) -> GLenum {
    match name {
        "vec2" => gl::FLOAT_VEC2,
        "vec3" => gl::FLOAT_VEC3,
        "vec4" => gl::FLOAT_VEC4,
        "int" => gl::INT,
        "ivec2" => gl::INT_VEC2,
        "ivec3" => gl::INT_VEC3,
        "ivec4" => gl::INT_VEC4,
        "uint" => gl::UNSIGNED_INT,
        "uvec2" => gl::UNSIGNED_INT_VEC2,
        "uvec3" => gl::UNSIGNED_INT_VEC3,
        "uvec4" => gl::UNSIGNED_INT_VEC4,
        "bool" => gl::BOOL,
        "mat2" => gl::FLOAT_MAT2,
        "mat3" => gl::FLOAT_MAT3,
        "mat4" => gl::FLOAT_MAT4,
        "double" => gl::DOUBLE,
        "sampler1D" => gl::SAMPLER_1D,
        "sampler2D" => gl::SAMPLER_2D,
        "sampler3D" => gl::SAMPLER_3D,
        "samplerCube" => gl::SAMPLER_CUBE,
        _ => gl::FLOAT,
    }
}

const PRECISION: [&str; 3] = ["lowp", "mediump", "highp"];

/// Reads the declarations the reflection queries care about. Function bodies
/// and parameter lists are skipped wholesale.
fn parse_declarations(source: &str) -> Result<Declarations, String> {
    let mut defines = HashMap::new();
    let mut body = String::new();
    for (number, line) in source.lines().enumerate() {
        let line = line.split("//").next().unwrap_or_default();
        if let Some(directive) = line.trim().strip_prefix('#') {
            let mut words = directive.split_whitespace();
            match words.next() {
                Some("error") => {
                    let message = words.collect::<Vec<_>>().join(" ");
                    return Err(format!("0:{}: error: #error {message}", number + 1));
                }
                Some("define") => {
                    if let (Some(name), Some(value)) = (words.next(), words.next()) {
                        defines.insert(name.to_string(), value.to_string());
                    }
                }
                _ => {}
            }
            continue;
        }
        body.push_str(line);
        body.push('\n');
    }

    let mut spaced = String::with_capacity(body.len());
    for c in body.chars() {
        if "{}[]();,".contains(c) {
            spaced.push(' ');
            spaced.push(c);
            spaced.push(' ');
        } else {
            spaced.push(c);
        }
    }
    let tokens: Vec<&str> = spaced.split_whitespace().collect();
    if !tokens.windows(2).any(|pair| pair == ["main", "("]) {
        return Err("0:0: error: missing main() function".to_string());
    }

    let mut reader = Reader {
        tokens: &tokens,
        pos: 0,
        defines: &defines,
    };
    let mut declarations = Declarations::default();
    while let Some(token) = reader.peek() {
        match token {
            "(" | "{" => reader.skip_group(),
            "uniform" => {
                reader.pos += 1;
                reader.uniform(&mut declarations)?;
            }
            "in" | "attribute" => {
                reader.pos += 1;
                let declared = reader.variable()?;
                declarations.inputs.push(declared);
            }
            _ => reader.pos += 1,
        }
    }

    // Drivers list referenced built-in inputs among the active attributes,
    // without a location.
    let builtins = ["gl_InstanceID", "gl_VertexID"]
        .into_iter()
        .filter(|name| body.contains(name))
        .map(|name| Declared {
            name: name.to_string(),
            ty: gl::INT,
            len: None,
        });
    declarations.inputs.splice(0..0, builtins);
    Ok(declarations)
}

struct Reader<'t> {
    tokens: &'t [&'t str],
    pos: usize,
    defines: &'t HashMap<String, String>,
}

impl<'t> Reader<'t> {
    fn peek(&self) -> Option<&'t str> {
        self.tokens.get(self.pos).copied()
    }

    fn take(&mut self) -> Result<&'t str, String> {
        let token = self
            .peek()
            .ok_or_else(|| "0:0: error: unexpected end of source".to_string())?;
        self.pos += 1;
        Ok(token)
    }

    fn skip_group(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            self.pos += 1;
            match token {
                "(" | "{" => depth += 1,
                ")" | "}" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    fn type_name(&mut self) -> Result<&'t str, String> {
        let mut token = self.take()?;
        while PRECISION.contains(&token) {
            token = self.take()?;
        }
        Ok(token)
    }

    /// `TYPE NAME [N]? ;`
    fn variable(&mut self) -> Result<Declared, String> {
        let ty = type_enum(self.type_name()?);
        let name = self.take()?.to_string();
        let len = if self.peek() == Some("[") {
            self.pos += 1;
            let size = self.take()?;
            let size = self.defines.get(size).map_or(size, String::as_str);
            let len = size
                .parse::<usize>()
                .map_err(|_| format!("0:0: error: array size of '{name}' is not a constant"))?;
            self.take()?;
            Some(len)
        } else {
            None
        };
        while self.take()? != ";" {}
        Ok(Declared { name, ty, len })
    }

    fn uniform(&mut self, declarations: &mut Declarations) -> Result<(), String> {
        let start = self.pos;
        let name = self.type_name()?;
        if self.peek() != Some("{") {
            self.pos = start;
            let declared = self.variable()?;
            declarations.uniforms.push(declared);
            return Ok(());
        }

        self.pos += 1;
        let mut members = Vec::new();
        while self.peek() != Some("}") {
            members.push(self.variable()?);
        }
        while self.take()? != ";" {}
        declarations.blocks.push(DeclaredBlock {
            name: name.to_string(),
            members,
        });
        Ok(())
    }
}
