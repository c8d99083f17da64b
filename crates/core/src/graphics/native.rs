use std::{
    ffi::{c_void, CStr, CString},
    ptr,
};

use gl::types::{GLchar, GLint, GLsizei, GLsizeiptr, GLuint};

use super::{ActiveVariable, GLenum, GlApi, ObjectKind};

/// Driver backed by the system OpenGL library through the `gl` crate.
///
/// The function pointers are process-global. Load them once, after the
/// windowing collaborator has made a context current on this thread.
#[derive(Debug)]
pub struct NativeGl {
    _private: (),
}

impl NativeGl {
    /// Loads every entry point through `loader` (typically the windowing
    /// library's `get_proc_address`).
    pub fn load_with<F>(loader: F) -> Self
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        gl::load_with(loader);
        Self { _private: () }
    }
}

fn c_name(name: &str) -> Option<CString> {
    CString::new(name).ok()
}

fn log_string(mut buf: Vec<u8>, written: GLsizei) -> String {
    buf.truncate(written.max(0) as usize);
    String::from_utf8_lossy(&buf).into_owned()
}

impl GlApi for NativeGl {
    fn gen_object(&self, kind: ObjectKind) -> u32 {
        let mut id: GLuint = 0;
        unsafe {
            match kind {
                ObjectKind::Buffer => gl::GenBuffers(1, &mut id),
                ObjectKind::Texture => gl::GenTextures(1, &mut id),
                ObjectKind::Framebuffer => gl::GenFramebuffers(1, &mut id),
                ObjectKind::Renderbuffer => gl::GenRenderbuffers(1, &mut id),
                ObjectKind::VertexArray => gl::GenVertexArrays(1, &mut id),
                ObjectKind::Shader | ObjectKind::Program => {}
            }
        }
        id
    }

    fn delete_object(&self, kind: ObjectKind, id: u32) {
        unsafe {
            match kind {
                ObjectKind::Buffer => gl::DeleteBuffers(1, &id),
                ObjectKind::Texture => gl::DeleteTextures(1, &id),
                ObjectKind::Framebuffer => gl::DeleteFramebuffers(1, &id),
                ObjectKind::Renderbuffer => gl::DeleteRenderbuffers(1, &id),
                ObjectKind::VertexArray => gl::DeleteVertexArrays(1, &id),
                ObjectKind::Shader => gl::DeleteShader(id),
                ObjectKind::Program => gl::DeleteProgram(id),
            }
        }
    }

    fn bind_object(&self, kind: ObjectKind, target: Option<GLenum>, id: u32) {
        let target = target.unwrap_or(0);
        unsafe {
            match kind {
                ObjectKind::Buffer => gl::BindBuffer(target, id),
                ObjectKind::Texture => gl::BindTexture(target, id),
                ObjectKind::Framebuffer => gl::BindFramebuffer(target, id),
                ObjectKind::Renderbuffer => gl::BindRenderbuffer(target, id),
                ObjectKind::VertexArray => gl::BindVertexArray(id),
                ObjectKind::Shader | ObjectKind::Program => {}
            }
        }
    }

    fn buffer_data(&self, target: GLenum, size: usize, data: Option<&[u8]>, usage: GLenum) {
        let ptr = data.map_or(ptr::null(), |d| d.as_ptr() as *const c_void);
        unsafe { gl::BufferData(target, size as GLsizeiptr, ptr, usage) }
    }

    fn buffer_sub_data(&self, target: GLenum, offset: usize, data: &[u8]) {
        unsafe {
            gl::BufferSubData(
                target,
                offset as isize,
                data.len() as GLsizeiptr,
                data.as_ptr() as *const c_void,
            )
        }
    }

    fn get_buffer_parameter(&self, target: GLenum, pname: GLenum) -> i32 {
        let mut value: GLint = 0;
        unsafe { gl::GetBufferParameteriv(target, pname, &mut value) };
        value
    }

    fn bind_buffer_range(
        &self,
        target: GLenum,
        index: u32,
        buffer: u32,
        offset: usize,
        size: usize,
    ) {
        unsafe {
            gl::BindBufferRange(target, index, buffer, offset as isize, size as GLsizeiptr)
        }
    }

    fn create_shader(&self, stage: GLenum) -> u32 {
        unsafe { gl::CreateShader(stage) }
    }

    fn shader_source(&self, shader: u32, source: &str) {
        let ptr = source.as_ptr() as *const GLchar;
        let len = source.len() as GLint;
        unsafe { gl::ShaderSource(shader, 1, &ptr, &len) }
    }

    fn compile_shader(&self, shader: u32) {
        unsafe { gl::CompileShader(shader) }
    }

    fn get_shader_parameter(&self, shader: u32, pname: GLenum) -> i32 {
        let mut value: GLint = 0;
        unsafe { gl::GetShaderiv(shader, pname, &mut value) };
        value
    }

    fn get_shader_info_log(&self, shader: u32) -> String {
        let len = self.get_shader_parameter(shader, gl::INFO_LOG_LENGTH).max(1);
        let mut buf = vec![0u8; len as usize];
        let mut written: GLsizei = 0;
        unsafe {
            gl::GetShaderInfoLog(shader, len, &mut written, buf.as_mut_ptr() as *mut GLchar)
        };
        log_string(buf, written)
    }

    fn create_program(&self) -> u32 {
        unsafe { gl::CreateProgram() }
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        unsafe { gl::AttachShader(program, shader) }
    }

    fn link_program(&self, program: u32) {
        unsafe { gl::LinkProgram(program) }
    }

    fn get_program_parameter(&self, program: u32, pname: GLenum) -> i32 {
        let mut value: GLint = 0;
        unsafe { gl::GetProgramiv(program, pname, &mut value) };
        value
    }

    fn get_program_info_log(&self, program: u32) -> String {
        let len = self.get_program_parameter(program, gl::INFO_LOG_LENGTH).max(1);
        let mut buf = vec![0u8; len as usize];
        let mut written: GLsizei = 0;
        unsafe {
            gl::GetProgramInfoLog(program, len, &mut written, buf.as_mut_ptr() as *mut GLchar)
        };
        log_string(buf, written)
    }

    fn use_program(&self, program: u32) {
        unsafe { gl::UseProgram(program) }
    }

    fn get_active_uniform(&self, program: u32, index: u32) -> ActiveVariable {
        let len = self
            .get_program_parameter(program, gl::ACTIVE_UNIFORM_MAX_LENGTH)
            .max(1);
        let mut buf = vec![0u8; len as usize];
        let mut written: GLsizei = 0;
        let mut size: GLint = 0;
        let mut ty: GLenum = 0;
        unsafe {
            gl::GetActiveUniform(
                program,
                index,
                len,
                &mut written,
                &mut size,
                &mut ty,
                buf.as_mut_ptr() as *mut GLchar,
            )
        };
        ActiveVariable {
            name: log_string(buf, written),
            size,
            ty,
        }
    }

    fn get_uniform_indices(&self, program: u32, names: &[&str]) -> Vec<u32> {
        let mut indices = vec![gl::INVALID_INDEX; names.len()];
        let Some(owned) = names.iter().map(|n| c_name(n)).collect::<Option<Vec<_>>>() else {
            return indices;
        };
        let ptrs: Vec<*const GLchar> = owned.iter().map(|n| n.as_ptr()).collect();
        unsafe {
            gl::GetUniformIndices(
                program,
                ptrs.len() as GLsizei,
                ptrs.as_ptr(),
                indices.as_mut_ptr(),
            )
        };
        indices
    }

    fn get_uniform_location(&self, program: u32, name: &str) -> i32 {
        match c_name(name) {
            Some(name) => unsafe { gl::GetUniformLocation(program, name.as_ptr()) },
            None => -1,
        }
    }

    fn get_uniform_block_index(&self, program: u32, name: &str) -> u32 {
        match c_name(name) {
            Some(name) => unsafe { gl::GetUniformBlockIndex(program, name.as_ptr()) },
            None => gl::INVALID_INDEX,
        }
    }

    fn get_active_uniform_block_name(&self, program: u32, index: u32) -> String {
        let mut len: GLint = 0;
        unsafe {
            gl::GetActiveUniformBlockiv(program, index, gl::UNIFORM_BLOCK_NAME_LENGTH, &mut len)
        };
        let len = len.max(1);
        let mut buf = vec![0u8; len as usize];
        let mut written: GLsizei = 0;
        unsafe {
            gl::GetActiveUniformBlockName(
                program,
                index,
                len,
                &mut written,
                buf.as_mut_ptr() as *mut GLchar,
            )
        };
        log_string(buf, written)
    }

    fn get_active_uniform_block_parameter(
        &self,
        program: u32,
        index: u32,
        pname: GLenum,
    ) -> Vec<i32> {
        let len = match pname {
            gl::UNIFORM_BLOCK_ACTIVE_UNIFORM_INDICES => {
                let count = self.get_active_uniform_block_parameter(
                    program,
                    index,
                    gl::UNIFORM_BLOCK_ACTIVE_UNIFORMS,
                );
                count.first().copied().unwrap_or(0).max(0) as usize
            }
            _ => 1,
        };
        let mut out = vec![0; len];
        if len > 0 {
            // `out` holds as many ints as the query writes for `pname`.
            unsafe { gl::GetActiveUniformBlockiv(program, index, pname, out.as_mut_ptr()) }
        }
        out
    }

    fn uniform_block_binding(&self, program: u32, index: u32, binding: u32) {
        unsafe { gl::UniformBlockBinding(program, index, binding) }
    }

    fn get_active_attrib(&self, program: u32, index: u32) -> ActiveVariable {
        let len = self
            .get_program_parameter(program, gl::ACTIVE_ATTRIBUTE_MAX_LENGTH)
            .max(1);
        let mut buf = vec![0u8; len as usize];
        let mut written: GLsizei = 0;
        let mut size: GLint = 0;
        let mut ty: GLenum = 0;
        unsafe {
            gl::GetActiveAttrib(
                program,
                index,
                len,
                &mut written,
                &mut size,
                &mut ty,
                buf.as_mut_ptr() as *mut GLchar,
            )
        };
        ActiveVariable {
            name: log_string(buf, written),
            size,
            ty,
        }
    }

    fn get_attrib_location(&self, program: u32, name: &str) -> i32 {
        match c_name(name) {
            Some(name) => unsafe { gl::GetAttribLocation(program, name.as_ptr()) },
            None => -1,
        }
    }

    fn uniform_f32(&self, location: i32, components: usize, values: &[f32]) {
        let count = (values.len() / components.max(1)) as GLsizei;
        let ptr = values.as_ptr();
        unsafe {
            match components {
                1 => gl::Uniform1fv(location, count, ptr),
                2 => gl::Uniform2fv(location, count, ptr),
                3 => gl::Uniform3fv(location, count, ptr),
                4 => gl::Uniform4fv(location, count, ptr),
                _ => {}
            }
        }
    }

    fn uniform_i32(&self, location: i32, components: usize, values: &[i32]) {
        let count = (values.len() / components.max(1)) as GLsizei;
        let ptr = values.as_ptr();
        unsafe {
            match components {
                1 => gl::Uniform1iv(location, count, ptr),
                2 => gl::Uniform2iv(location, count, ptr),
                3 => gl::Uniform3iv(location, count, ptr),
                4 => gl::Uniform4iv(location, count, ptr),
                _ => {}
            }
        }
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
        let normalized = if normalized { gl::TRUE } else { gl::FALSE };
        unsafe {
            gl::VertexAttribPointer(index, size, ty, normalized, stride, offset as *const c_void)
        }
    }

    fn set_vertex_attrib_array_enabled(&self, index: u32, enabled: bool) {
        unsafe {
            if enabled {
                gl::EnableVertexAttribArray(index)
            } else {
                gl::DisableVertexAttribArray(index)
            }
        }
    }

    fn get_vertex_attrib_parameter(&self, index: u32, pname: GLenum) -> i32 {
        let mut value: GLint = 0;
        unsafe { gl::GetVertexAttribiv(index, pname, &mut value) };
        value
    }

    fn get_vertex_attrib_offset(&self, index: u32) -> usize {
        let mut pointer: *mut c_void = ptr::null_mut();
        unsafe { gl::GetVertexAttribPointerv(index, gl::VERTEX_ATTRIB_ARRAY_POINTER, &mut pointer) };
        pointer as usize
    }

    fn draw_arrays(&self, mode: GLenum, first: i32, count: i32) {
        unsafe { gl::DrawArrays(mode, first, count) }
    }

    fn active_texture(&self, unit: GLenum) {
        unsafe { gl::ActiveTexture(unit) }
    }

    fn tex_parameter(&self, target: GLenum, pname: GLenum, value: i32) {
        unsafe { gl::TexParameteri(target, pname, value) }
    }

    fn get_tex_parameter(&self, target: GLenum, pname: GLenum) -> i32 {
        let mut value: GLint = 0;
        unsafe { gl::GetTexParameteriv(target, pname, &mut value) };
        value
    }

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
    ) {
        let ptr = data.map_or(ptr::null(), |d| d.as_ptr() as *const c_void);
        unsafe {
            gl::TexImage2D(
                target,
                level,
                internal_format,
                width,
                height,
                0,
                format,
                ty,
                ptr,
            )
        }
    }

    fn check_framebuffer_status(&self, target: GLenum) -> GLenum {
        unsafe { gl::CheckFramebufferStatus(target) }
    }

    fn get_framebuffer_attachment_parameter(
        &self,
        target: GLenum,
        attachment: GLenum,
        pname: GLenum,
    ) -> i32 {
        let mut value: GLint = 0;
        unsafe { gl::GetFramebufferAttachmentParameteriv(target, attachment, pname, &mut value) };
        value
    }

    fn framebuffer_texture(&self, target: GLenum, attachment: GLenum, texture: u32, level: i32) {
        unsafe { gl::FramebufferTexture(target, attachment, texture, level) }
    }

    fn framebuffer_renderbuffer(
        &self,
        target: GLenum,
        attachment: GLenum,
        renderbuffer_target: GLenum,
        renderbuffer: u32,
    ) {
        unsafe {
            gl::FramebufferRenderbuffer(target, attachment, renderbuffer_target, renderbuffer)
        }
    }

    fn blit_framebuffer(&self, src: [i32; 4], dst: [i32; 4], mask: u32, filter: GLenum) {
        unsafe {
            gl::BlitFramebuffer(
                src[0], src[1], src[2], src[3], dst[0], dst[1], dst[2], dst[3], mask, filter,
            )
        }
    }

    fn renderbuffer_storage_multisample(
        &self,
        target: GLenum,
        samples: i32,
        format: GLenum,
        width: i32,
        height: i32,
    ) {
        unsafe { gl::RenderbufferStorageMultisample(target, samples, format, width, height) }
    }

    fn get_renderbuffer_parameter(&self, target: GLenum, pname: GLenum) -> i32 {
        let mut value: GLint = 0;
        unsafe { gl::GetRenderbufferParameteriv(target, pname, &mut value) };
        value
    }

    fn get_integer(&self, pname: GLenum) -> i32 {
        let mut value: GLint = 0;
        unsafe { gl::GetIntegerv(pname, &mut value) };
        value
    }

    fn get_integer_indexed(&self, pname: GLenum, index: u32) -> i32 {
        let mut value: GLint = 0;
        unsafe { gl::GetIntegeri_v(pname, index, &mut value) };
        value
    }

    fn get_string(&self, pname: GLenum) -> String {
        let ptr = unsafe { gl::GetString(pname) };
        if ptr.is_null() {
            return String::new();
        }
        unsafe { CStr::from_ptr(ptr as *const _) }
            .to_string_lossy()
            .into_owned()
    }

    fn get_error(&self) -> GLenum {
        unsafe { gl::GetError() }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { gl::Viewport(x, y, width, height) }
    }

    fn clear(&self, mask: u32) {
        unsafe { gl::Clear(mask) }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { gl::ClearColor(r, g, b, a) }
    }

    fn set_capability(&self, capability: GLenum, enabled: bool) {
        unsafe {
            if enabled {
                gl::Enable(capability)
            } else {
                gl::Disable(capability)
            }
        }
    }

    fn blend_func(&self, src: GLenum, dst: GLenum) {
        unsafe { gl::BlendFunc(src, dst) }
    }
}
