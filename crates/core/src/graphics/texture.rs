use super::{GLenum, Generate, Gl, Handle, ManagedObject, ObjectKind};
use crate::{Result, ShmVizError};

/// Row alignment the driver assumes for client pixel data (`UNPACK_ALIGNMENT`).
const UNPACK_ALIGNMENT: usize = 4;

/// A texture image unit.
#[derive(Debug, Clone, Copy)]
pub struct TextureUnit<'g> {
    gl: &'g Gl,
    index: u32,
}

impl<'g> TextureUnit<'g> {
    pub fn new(gl: &'g Gl, index: u32) -> Self {
        Self { gl, index }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn activate(&self) -> &Self {
        self.gl.api().active_texture(gl::TEXTURE0 + self.index);
        self
    }

    /// The 2D texture bound on this unit, if any. Activates the unit.
    pub fn texture_2d(&self) -> Option<Texture<'g>> {
        self.activate();
        let id = self.gl.api().get_integer(gl::TEXTURE_BINDING_2D);
        if id == 0 {
            return None;
        }
        Texture::from_raw(self.gl, id as u32).map(|t| t.with_unit(self.index))
    }
}

impl From<TextureUnit<'_>> for Option<u32> {
    fn from(unit: TextureUnit<'_>) -> Self {
        Some(unit.index)
    }
}

/// Pixel layout for [`Texture::image_2d`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageFormat {
    pub format: GLenum,
    pub ty: GLenum,
    pub internal_format: GLenum,
    pub level: i32,
}

impl ImageFormat {
    /// Bytes per pixel for `format` and `ty`, or `None` for combinations
    /// the registry does not know.
    pub fn pixel_bytes(&self) -> Option<usize> {
        let packed = match self.ty {
            gl::UNSIGNED_BYTE_3_3_2 | gl::UNSIGNED_BYTE_2_3_3_REV => Some(1),
            gl::UNSIGNED_SHORT_5_6_5
            | gl::UNSIGNED_SHORT_5_6_5_REV
            | gl::UNSIGNED_SHORT_4_4_4_4
            | gl::UNSIGNED_SHORT_4_4_4_4_REV
            | gl::UNSIGNED_SHORT_5_5_5_1
            | gl::UNSIGNED_SHORT_1_5_5_5_REV => Some(2),
            gl::UNSIGNED_INT_8_8_8_8
            | gl::UNSIGNED_INT_8_8_8_8_REV
            | gl::UNSIGNED_INT_10_10_10_2
            | gl::UNSIGNED_INT_2_10_10_10_REV
            | gl::UNSIGNED_INT_24_8
            | gl::UNSIGNED_INT_10F_11F_11F_REV
            | gl::UNSIGNED_INT_5_9_9_9_REV => Some(4),
            gl::FLOAT_32_UNSIGNED_INT_24_8_REV => Some(8),
            _ => None,
        };
        if packed.is_some() {
            return packed;
        }
        let scalar = match self.ty {
            gl::UNSIGNED_BYTE | gl::BYTE => 1,
            gl::UNSIGNED_SHORT | gl::SHORT | gl::HALF_FLOAT => 2,
            gl::UNSIGNED_INT | gl::INT | gl::FLOAT => 4,
            _ => return None,
        };
        let components = match self.format {
            gl::RED | gl::RED_INTEGER | gl::DEPTH_COMPONENT | gl::STENCIL_INDEX => 1,
            gl::RG | gl::RG_INTEGER | gl::DEPTH_STENCIL => 2,
            gl::RGB | gl::BGR | gl::RGB_INTEGER | gl::BGR_INTEGER => 3,
            gl::RGBA | gl::BGRA | gl::RGBA_INTEGER | gl::BGRA_INTEGER => 4,
            _ => return None,
        };
        Some(scalar * components)
    }

    /// Bytes the driver reads for a `width` x `height` image: every row but
    /// the last is padded to the unpack alignment.
    pub fn image_bytes(&self, width: u32, height: u32) -> Option<usize> {
        let (width, height) = (width as usize, height as usize);
        if width == 0 || height == 0 {
            return Some(0);
        }
        let row = width.checked_mul(self.pixel_bytes()?)?;
        let stride = row.div_ceil(UNPACK_ALIGNMENT) * UNPACK_ALIGNMENT;
        stride.checked_mul(height - 1)?.checked_add(row)
    }
}

impl Default for ImageFormat {
    fn default() -> Self {
        Self {
            format: gl::RGBA,
            ty: gl::UNSIGNED_BYTE,
            internal_format: gl::RGBA8,
            level: 0,
        }
    }
}

/// A texture object remembering its target and preferred unit. Parameter
/// getters and setters bind the texture on the active unit first.
#[derive(Debug)]
pub struct Texture<'g> {
    handle: Handle<'g>,
    unit: u32,
    target: GLenum,
}

impl<'g> ManagedObject<'g> for Texture<'g> {
    const KIND: ObjectKind = ObjectKind::Texture;

    fn from_handle(handle: Handle<'g>) -> Self {
        Self {
            handle,
            unit: 0,
            target: gl::TEXTURE_2D,
        }
    }

    fn handle(&self) -> &Handle<'g> {
        &self.handle
    }

    fn into_handle(self) -> Handle<'g> {
        self.handle
    }

    /// With no targets, binds to the texture's own target.
    fn bind(&self, targets: &[GLenum]) -> Result<&Self> {
        if targets.is_empty() {
            self.handle.bind(&[self.target])?;
        } else {
            self.handle.bind(targets)?;
        }
        Ok(self)
    }
}

impl<'g> Generate<'g> for Texture<'g> {}

impl<'g> Texture<'g> {
    pub fn with_unit(mut self, unit: u32) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_target(mut self, target: GLenum) -> Self {
        self.target = target;
        self
    }

    pub fn unit(&self) -> u32 {
        self.unit
    }

    pub fn target(&self) -> GLenum {
        self.target
    }

    fn bind_target(&self) {
        self.handle
            .gl()
            .api()
            .bind_object(ObjectKind::Texture, Some(self.target), self.handle.id());
    }

    /// Activates `unit` (a unit index or a [`TextureUnit`]; the texture's
    /// own unit when `None`) and binds the texture there. Returns the unit
    /// used.
    pub fn activate(&self, unit: impl Into<Option<u32>>) -> TextureUnit<'g> {
        let index = unit.into().unwrap_or(self.unit);
        let unit = TextureUnit::new(self.handle.gl(), index);
        unit.activate();
        self.bind_target();
        unit
    }

    pub fn parameter(&self, pname: GLenum) -> i32 {
        self.bind_target();
        self.handle.gl().api().get_tex_parameter(self.target, pname)
    }

    pub fn set_parameter(&self, pname: GLenum, value: i32) -> &Self {
        self.bind_target();
        self.handle
            .gl()
            .api()
            .tex_parameter(self.target, pname, value);
        self
    }

    pub fn min_filter(&self) -> i32 {
        self.parameter(gl::TEXTURE_MIN_FILTER)
    }

    pub fn set_min_filter(&self, value: GLenum) -> &Self {
        self.set_parameter(gl::TEXTURE_MIN_FILTER, value as i32)
    }

    pub fn mag_filter(&self) -> i32 {
        self.parameter(gl::TEXTURE_MAG_FILTER)
    }

    pub fn set_mag_filter(&self, value: GLenum) -> &Self {
        self.set_parameter(gl::TEXTURE_MAG_FILTER, value as i32)
    }

    pub fn wrap_s(&self) -> i32 {
        self.parameter(gl::TEXTURE_WRAP_S)
    }

    pub fn set_wrap_s(&self, value: GLenum) -> &Self {
        self.set_parameter(gl::TEXTURE_WRAP_S, value as i32)
    }

    pub fn wrap_t(&self) -> i32 {
        self.parameter(gl::TEXTURE_WRAP_T)
    }

    pub fn set_wrap_t(&self, value: GLenum) -> &Self {
        self.set_parameter(gl::TEXTURE_WRAP_T, value as i32)
    }

    pub fn wrap_r(&self) -> i32 {
        self.parameter(gl::TEXTURE_WRAP_R)
    }

    pub fn set_wrap_r(&self, value: GLenum) -> &Self {
        self.set_parameter(gl::TEXTURE_WRAP_R, value as i32)
    }

    /// Uploads a 2D image. `None` allocates storage without data. Data
    /// shorter than the image `format` describes is rejected.
    pub fn image_2d(
        &self,
        data: Option<&[u8]>,
        width: u32,
        height: u32,
        format: ImageFormat,
    ) -> Result<&Self> {
        if i32::try_from(width).is_err() || i32::try_from(height).is_err() {
            return Err(ShmVizError::InvalidInput("texture dimensions exceed i32"));
        }
        if let Some(data) = data {
            let needed = format
                .image_bytes(width, height)
                .ok_or(ShmVizError::InvalidInput("unsupported pixel format or type"))?;
            if data.len() < needed {
                return Err(ShmVizError::InvalidInput(
                    "image data is shorter than width x height pixels",
                ));
            }
        }
        self.bind_target();
        self.handle.gl().api().tex_image_2d(
            self.target,
            format.level,
            format.internal_format as i32,
            width as i32,
            height as i32,
            format.format,
            format.ty,
            data,
        );
        Ok(self)
    }
}
