//! Read-only views over a linked program's uniforms, uniform blocks and
//! attributes. The views stay meaningful only until the program is linked
//! again.

use super::{object::INVALID_INDEX, Buffer, GLenum, Gl, ManagedObject, Program, Texture};
use crate::{Result, ShmVizError};

/// Components per element for vector types; 1 for everything else.
pub fn elements_per_type(ty: GLenum) -> usize {
    match ty {
        gl::FLOAT_VEC2 | gl::INT_VEC2 | gl::UNSIGNED_INT_VEC2 | gl::DOUBLE_VEC2 => 2,
        gl::FLOAT_VEC3 | gl::INT_VEC3 | gl::UNSIGNED_INT_VEC3 | gl::DOUBLE_VEC3 => 3,
        gl::FLOAT_VEC4 | gl::INT_VEC4 | gl::UNSIGNED_INT_VEC4 | gl::DOUBLE_VEC4 => 4,
        _ => 1,
    }
}

/// Scalar type underlying a (possibly vector) type; float when unknown.
pub fn base_type(ty: GLenum) -> GLenum {
    match ty {
        gl::INT | gl::INT_VEC2 | gl::INT_VEC3 | gl::INT_VEC4 => gl::INT,
        gl::UNSIGNED_INT
        | gl::UNSIGNED_INT_VEC2
        | gl::UNSIGNED_INT_VEC3
        | gl::UNSIGNED_INT_VEC4 => gl::UNSIGNED_INT,
        gl::DOUBLE | gl::DOUBLE_VEC2 | gl::DOUBLE_VEC3 | gl::DOUBLE_VEC4 => gl::DOUBLE,
        _ => gl::FLOAT,
    }
}

/// Size in bytes of a scalar type; 1 when unknown.
pub fn scalar_size(ty: GLenum) -> usize {
    match ty {
        gl::BYTE | gl::UNSIGNED_BYTE => 1,
        gl::SHORT | gl::UNSIGNED_SHORT => 2,
        gl::INT | gl::UNSIGNED_INT | gl::FLOAT => 4,
        gl::DOUBLE => 8,
        _ => 1,
    }
}

/// Array uniforms are reported as `name[0]`.
pub(crate) fn strip_array_suffix(name: &str) -> &str {
    name.strip_suffix("[0]").unwrap_or(name)
}

fn check_index(what: &'static str, index: usize, len: usize) -> Result<u32> {
    if index < len {
        Ok(index as u32)
    } else {
        Err(ShmVizError::IndexOutOfRange { what, index, len })
    }
}

/// Scalar flavour of a uniform upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Float,
    Int,
}

#[derive(Debug, Clone, PartialEq)]
enum UniformData {
    Float(Vec<f32>),
    Int(Vec<i32>),
}

/// Values for a uniform upload together with the inferred vector width.
///
/// A flat list of up to four scalars is one vector of that many components;
/// a longer flat list is an array of scalars; a list of `[T; N]` is an array
/// of `N`-component vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformValues {
    data: UniformData,
    components: usize,
}

impl UniformValues {
    fn scalars(data: UniformData, len: usize) -> Self {
        let components = if len <= 4 { len } else { 1 };
        Self { data, components }
    }

    /// An array of float scalars whatever its length, for uploads where a
    /// short list must not be taken for a vector.
    pub fn float_array(values: &[f32]) -> Self {
        Self {
            data: UniformData::Float(values.to_vec()),
            components: 1,
        }
    }

    pub fn components(&self) -> usize {
        self.components
    }

    /// Number of vectors uploaded.
    pub fn count(&self) -> usize {
        let len = match &self.data {
            UniformData::Float(v) => v.len(),
            UniformData::Int(v) => v.len(),
        };
        len / self.components.max(1)
    }

    pub fn kind(&self) -> ScalarKind {
        match self.data {
            UniformData::Float(_) => ScalarKind::Float,
            UniformData::Int(_) => ScalarKind::Int,
        }
    }

    /// Converts the values to the requested scalar kind.
    pub fn cast(self, kind: ScalarKind) -> Self {
        let data = match (self.data, kind) {
            (UniformData::Float(v), ScalarKind::Int) => {
                UniformData::Int(v.into_iter().map(|x| x as i32).collect())
            }
            (UniformData::Int(v), ScalarKind::Float) => {
                UniformData::Float(v.into_iter().map(|x| x as f32).collect())
            }
            (data, _) => data,
        };
        Self {
            data,
            components: self.components,
        }
    }
}

impl From<f32> for UniformValues {
    fn from(value: f32) -> Self {
        Self::scalars(UniformData::Float(vec![value]), 1)
    }
}

impl From<i32> for UniformValues {
    fn from(value: i32) -> Self {
        Self::scalars(UniformData::Int(vec![value]), 1)
    }
}

impl From<&[f32]> for UniformValues {
    fn from(values: &[f32]) -> Self {
        Self::scalars(UniformData::Float(values.to_vec()), values.len())
    }
}

impl From<&[i32]> for UniformValues {
    fn from(values: &[i32]) -> Self {
        Self::scalars(UniformData::Int(values.to_vec()), values.len())
    }
}

impl From<Vec<f32>> for UniformValues {
    fn from(values: Vec<f32>) -> Self {
        let len = values.len();
        Self::scalars(UniformData::Float(values), len)
    }
}

impl From<Vec<i32>> for UniformValues {
    fn from(values: Vec<i32>) -> Self {
        let len = values.len();
        Self::scalars(UniformData::Int(values), len)
    }
}

impl<const N: usize> From<[f32; N]> for UniformValues {
    fn from(values: [f32; N]) -> Self {
        Self::from(&values[..])
    }
}

impl<const N: usize> From<[i32; N]> for UniformValues {
    fn from(values: [i32; N]) -> Self {
        Self::from(&values[..])
    }
}

impl<const N: usize> From<&[[f32; N]]> for UniformValues {
    fn from(values: &[[f32; N]]) -> Self {
        Self {
            data: UniformData::Float(values.iter().flatten().copied().collect()),
            components: N,
        }
    }
}

impl<const N: usize> From<&[[i32; N]]> for UniformValues {
    fn from(values: &[[i32; N]]) -> Self {
        Self {
            data: UniformData::Int(values.iter().flatten().copied().collect()),
            components: N,
        }
    }
}

/// Active uniforms of a program, indexable by position or resolvable by name.
#[derive(Debug, Clone, Copy)]
pub struct Uniforms<'p, 'g> {
    program: &'p Program<'g>,
}

impl<'p, 'g> Uniforms<'p, 'g> {
    pub(crate) fn new(program: &'p Program<'g>) -> Self {
        Self { program }
    }

    pub fn len(&self) -> usize {
        let gl = self.program.gl();
        gl.api()
            .get_program_parameter(self.program.id(), gl::ACTIVE_UNIFORMS)
            .max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Result<Uniform<'g>> {
        let index = check_index("uniform", index, self.len())?;
        Ok(Uniform::query(self.program.gl(), self.program.id(), index))
    }

    /// Looks a uniform up by name, either plain or with its `[0]` suffix.
    pub fn resolve(&self, name: &str) -> Result<Uniform<'g>> {
        let index = self
            .program
            .cached_uniform(name)
            .or_else(|| {
                let gl = self.program.gl();
                let index = gl.api().get_uniform_indices(self.program.id(), &[name]);
                index.first().copied().filter(|i| *i != INVALID_INDEX)
            })
            .ok_or_else(|| ShmVizError::UniformNotFound(name.to_string()))?;
        self.get(index as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = Uniform<'g>> + '_ {
        let gl = self.program.gl();
        let program = self.program.id();
        (0..self.len() as u32).map(move |i| Uniform::query(gl, program, i))
    }
}

/// One active uniform.
#[derive(Debug, Clone)]
pub struct Uniform<'g> {
    gl: &'g Gl,
    program: u32,
    index: u32,
    name: String,
    len: usize,
    ty: GLenum,
}

impl<'g> Uniform<'g> {
    fn query(gl: &'g Gl, program: u32, index: u32) -> Self {
        let active = gl.api().get_active_uniform(program, index);
        Self {
            gl,
            program,
            index,
            name: active.name,
            len: active.size.max(0) as usize,
            ty: active.ty,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared array length (1 for non-arrays).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn ty(&self) -> GLenum {
        self.ty
    }

    pub fn location(&self) -> i32 {
        self.gl.api().get_uniform_location(self.program, &self.name)
    }

    /// Uploads `values`, inferring vector width and scalar kind from their
    /// shape. The program is made current first.
    pub fn set(&self, values: impl Into<UniformValues>) -> Result<()> {
        self.upload(values.into())
    }

    /// Like [`set`](Self::set) with the scalar kind forced.
    pub fn set_as(&self, values: impl Into<UniformValues>, kind: ScalarKind) -> Result<()> {
        self.upload(values.into().cast(kind))
    }

    /// Activates `texture` on its unit and points this sampler at that unit.
    pub fn set_texture(&self, texture: &Texture<'_>) -> Result<()> {
        let unit = texture.activate(None);
        self.set(unit.index() as i32)
    }

    fn upload(&self, values: UniformValues) -> Result<()> {
        let components = values.components;
        if !(1..=4).contains(&components) {
            return Err(ShmVizError::InvalidComponentCount(components));
        }

        let api = self.gl.api();
        api.use_program(self.program);
        let location = self.location();
        match &values.data {
            UniformData::Float(data) => api.uniform_f32(location, components, data),
            UniformData::Int(data) => api.uniform_i32(location, components, data),
        }
        Ok(())
    }
}

/// Active uniform blocks of a program.
#[derive(Debug, Clone, Copy)]
pub struct UniformBlocks<'p, 'g> {
    program: &'p Program<'g>,
}

impl<'p, 'g> UniformBlocks<'p, 'g> {
    pub(crate) fn new(program: &'p Program<'g>) -> Self {
        Self { program }
    }

    pub fn len(&self) -> usize {
        let gl = self.program.gl();
        gl.api()
            .get_program_parameter(self.program.id(), gl::ACTIVE_UNIFORM_BLOCKS)
            .max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Result<UniformBlock<'g>> {
        let index = check_index("uniform block", index, self.len())?;
        Ok(UniformBlock {
            gl: self.program.gl(),
            program: self.program.id(),
            index,
        })
    }

    pub fn resolve(&self, name: &str) -> Result<UniformBlock<'g>> {
        let index = self
            .program
            .cached_block(name)
            .or_else(|| {
                let gl = self.program.gl();
                let index = gl.api().get_uniform_block_index(self.program.id(), name);
                (index != INVALID_INDEX).then_some(index)
            })
            .ok_or_else(|| ShmVizError::UniformBlockNotFound(name.to_string()))?;
        self.get(index as usize)
    }
}

/// One active uniform block.
#[derive(Debug, Clone, Copy)]
pub struct UniformBlock<'g> {
    gl: &'g Gl,
    program: u32,
    index: u32,
}

impl<'g> UniformBlock<'g> {
    pub fn index(&self) -> u32 {
        self.index
    }

    fn parameter(&self, pname: GLenum) -> i32 {
        self.gl
            .api()
            .get_active_uniform_block_parameter(self.program, self.index, pname)
            .first()
            .copied()
            .unwrap_or(0)
    }

    pub fn name(&self) -> String {
        self.gl
            .api()
            .get_active_uniform_block_name(self.program, self.index)
    }

    /// Data size of the block in bytes.
    pub fn size(&self) -> usize {
        self.parameter(gl::UNIFORM_BLOCK_DATA_SIZE).max(0) as usize
    }

    /// Uniform buffer binding point the block reads from.
    pub fn binding(&self) -> u32 {
        self.parameter(gl::UNIFORM_BLOCK_BINDING).max(0) as u32
    }

    /// Buffer currently bound to the block's binding point, if any.
    pub fn buffer(&self) -> Option<Buffer<'g>> {
        let id = self
            .gl
            .api()
            .get_integer_indexed(gl::UNIFORM_BUFFER_BINDING, self.binding());
        Buffer::bound(self.gl, id)
    }

    /// Member uniforms of the block.
    pub fn uniforms(&self) -> Vec<Uniform<'g>> {
        self.gl
            .api()
            .get_active_uniform_block_parameter(
                self.program,
                self.index,
                gl::UNIFORM_BLOCK_ACTIVE_UNIFORM_INDICES,
            )
            .into_iter()
            .map(|i| Uniform::query(self.gl, self.program, i as u32))
            .collect()
    }

    pub fn is_in_vertex(&self) -> bool {
        self.parameter(gl::UNIFORM_BLOCK_REFERENCED_BY_VERTEX_SHADER) != 0
    }

    pub fn is_in_geometry(&self) -> bool {
        self.parameter(gl::UNIFORM_BLOCK_REFERENCED_BY_GEOMETRY_SHADER) != 0
    }

    pub fn is_in_fragment(&self) -> bool {
        self.parameter(gl::UNIFORM_BLOCK_REFERENCED_BY_FRAGMENT_SHADER) != 0
    }

    /// Routes the block to binding point `index` and binds `size` bytes of
    /// `buffer` from `offset` there. `size` defaults to the rest of the buffer.
    pub fn bind(&self, buffer: &Buffer<'_>, offset: usize, size: Option<usize>) {
        let size = size.unwrap_or_else(|| buffer.size().saturating_sub(offset));
        let api = self.gl.api();
        api.uniform_block_binding(self.program, self.index, self.index);
        api.bind_buffer_range(gl::UNIFORM_BUFFER, self.index, buffer.id(), offset, size);
    }
}

/// Active vertex attributes of a program.
#[derive(Debug, Clone, Copy)]
pub struct Attributes<'g> {
    gl: &'g Gl,
    program: u32,
}

impl<'g> Attributes<'g> {
    pub(crate) fn new(gl: &'g Gl, program: u32) -> Self {
        Self { gl, program }
    }

    pub fn len(&self) -> usize {
        self.gl
            .api()
            .get_program_parameter(self.program, gl::ACTIVE_ATTRIBUTES)
            .max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Result<Attribute<'g>> {
        let index = check_index("attribute", index, self.len())?;
        Ok(Attribute::query(self.gl, self.program, index))
    }

    /// Finds an attribute by scanning the active attributes for `name`.
    pub fn resolve(&self, name: &str) -> Result<Attribute<'g>> {
        self.iter()
            .find(|attribute| attribute.name == name)
            .ok_or_else(|| ShmVizError::AttributeNotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = Attribute<'g>> {
        let gl = self.gl;
        let program = self.program;
        (0..self.len() as u32).map(move |i| Attribute::query(gl, program, i))
    }
}

/// One active vertex attribute.
#[derive(Debug, Clone)]
pub struct Attribute<'g> {
    gl: &'g Gl,
    program: u32,
    index: u32,
    name: String,
    size: usize,
    ty: GLenum,
}

impl<'g> Attribute<'g> {
    fn query(gl: &'g Gl, program: u32, index: u32) -> Self {
        let active = gl.api().get_active_attrib(program, index);
        Self {
            gl,
            program,
            index,
            name: active.name,
            size: active.size.max(0) as usize,
            ty: active.ty,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared array size.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn ty(&self) -> GLenum {
        self.ty
    }

    pub fn elements(&self) -> usize {
        elements_per_type(self.ty)
    }

    pub fn base_type(&self) -> GLenum {
        base_type(self.ty)
    }

    pub fn base_size(&self) -> usize {
        scalar_size(self.base_type())
    }

    /// Bytes per element, the default vertex stride.
    pub fn elem_size(&self) -> usize {
        self.base_size() * self.elements()
    }

    /// Attribute location, `None` when the driver reports none.
    pub fn location(&self) -> Option<u32> {
        let location = self.gl.api().get_attrib_location(self.program, &self.name);
        u32::try_from(location).ok()
    }
}
