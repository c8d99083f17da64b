use super::{GLenum, ObjectKind};

/// Name, array length and type enum of an active uniform or attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVariable {
    pub name: String,
    pub size: i32,
    pub ty: GLenum,
}

/// The subset of the OpenGL 3.3+ core API the registry is built on.
///
/// Methods map one-to-one onto driver entry points and never validate their
/// arguments: driver errors are left for the caller to observe through
/// [`get_error`](GlApi::get_error).
pub trait GlApi {
    // Object lifetime. Shaders and programs are created with their own calls.
    fn gen_object(&self, kind: ObjectKind) -> u32;
    fn delete_object(&self, kind: ObjectKind, id: u32);
    fn bind_object(&self, kind: ObjectKind, target: Option<GLenum>, id: u32);

    // Buffers
    fn buffer_data(&self, target: GLenum, size: usize, data: Option<&[u8]>, usage: GLenum);
    fn buffer_sub_data(&self, target: GLenum, offset: usize, data: &[u8]);
    fn get_buffer_parameter(&self, target: GLenum, pname: GLenum) -> i32;
    fn bind_buffer_range(
        &self,
        target: GLenum,
        index: u32,
        buffer: u32,
        offset: usize,
        size: usize,
    );

    // Shaders and programs
    fn create_shader(&self, stage: GLenum) -> u32;
    fn shader_source(&self, shader: u32, source: &str);
    fn compile_shader(&self, shader: u32);
    fn get_shader_parameter(&self, shader: u32, pname: GLenum) -> i32;
    fn get_shader_info_log(&self, shader: u32) -> String;
    fn create_program(&self) -> u32;
    fn attach_shader(&self, program: u32, shader: u32);
    fn link_program(&self, program: u32);
    fn get_program_parameter(&self, program: u32, pname: GLenum) -> i32;
    fn get_program_info_log(&self, program: u32) -> String;
    fn use_program(&self, program: u32);

    // Reflection
    fn get_active_uniform(&self, program: u32, index: u32) -> ActiveVariable;
    fn get_uniform_indices(&self, program: u32, names: &[&str]) -> Vec<u32>;
    fn get_uniform_location(&self, program: u32, name: &str) -> i32;
    fn get_uniform_block_index(&self, program: u32, name: &str) -> u32;
    fn get_active_uniform_block_name(&self, program: u32, index: u32) -> String;
    /// Returns every value the query writes: the member indices for
    /// `UNIFORM_BLOCK_ACTIVE_UNIFORM_INDICES`, a single value otherwise.
    fn get_active_uniform_block_parameter(
        &self,
        program: u32,
        index: u32,
        pname: GLenum,
    ) -> Vec<i32>;
    fn uniform_block_binding(&self, program: u32, index: u32, binding: u32);
    fn get_active_attrib(&self, program: u32, index: u32) -> ActiveVariable;
    fn get_attrib_location(&self, program: u32, name: &str) -> i32;

    /// Uploads `values.len() / components` vectors of `components` floats.
    fn uniform_f32(&self, location: i32, components: usize, values: &[f32]);
    /// Uploads `values.len() / components` vectors of `components` ints.
    fn uniform_i32(&self, location: i32, components: usize, values: &[i32]);

    // Vertex attributes and drawing
    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        ty: GLenum,
        normalized: bool,
        stride: i32,
        offset: usize,
    );
    fn set_vertex_attrib_array_enabled(&self, index: u32, enabled: bool);
    fn get_vertex_attrib_parameter(&self, index: u32, pname: GLenum) -> i32;
    fn get_vertex_attrib_offset(&self, index: u32) -> usize;
    fn draw_arrays(&self, mode: GLenum, first: i32, count: i32);

    // Textures
    fn active_texture(&self, unit: GLenum);
    fn tex_parameter(&self, target: GLenum, pname: GLenum, value: i32);
    fn get_tex_parameter(&self, target: GLenum, pname: GLenum) -> i32;
    #[allow(clippy::too_many_arguments)]
    fn tex_image_2d(
        &self,
        target: GLenum,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: GLenum,
        ty: GLenum,
        data: Option<&[u8]>,
    );

    // Framebuffers and renderbuffers
    fn check_framebuffer_status(&self, target: GLenum) -> GLenum;
    fn get_framebuffer_attachment_parameter(
        &self,
        target: GLenum,
        attachment: GLenum,
        pname: GLenum,
    ) -> i32;
    fn framebuffer_texture(&self, target: GLenum, attachment: GLenum, texture: u32, level: i32);
    fn framebuffer_renderbuffer(
        &self,
        target: GLenum,
        attachment: GLenum,
        renderbuffer_target: GLenum,
        renderbuffer: u32,
    );
    fn blit_framebuffer(&self, src: [i32; 4], dst: [i32; 4], mask: u32, filter: GLenum);
    fn renderbuffer_storage_multisample(
        &self,
        target: GLenum,
        samples: i32,
        format: GLenum,
        width: i32,
        height: i32,
    );
    fn get_renderbuffer_parameter(&self, target: GLenum, pname: GLenum) -> i32;

    // Global state
    fn get_integer(&self, pname: GLenum) -> i32;
    fn get_integer_indexed(&self, pname: GLenum, index: u32) -> i32;
    fn get_string(&self, pname: GLenum) -> String;
    fn get_error(&self) -> GLenum;
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn clear(&self, mask: u32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn set_capability(&self, capability: GLenum, enabled: bool);
    fn blend_func(&self, src: GLenum, dst: GLenum);
}
