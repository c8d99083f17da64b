//! Full-screen spectrum renderer built on the graphics registry.

use crate::{
    config::RendererConfig,
    graphics::{
        f32_bytes, AttribPointer, Buffer, Generate, Gl, ManagedObject, Program, Shader,
        ShaderStage, Uniform, UniformValues, VertexArray,
    },
    Result, ShmVizError,
};

const VERTEX_SOURCE: &str = include_str!("../../shaders/spectrum.vert");
const FRAGMENT_SOURCE: &str = include_str!("../../shaders/spectrum.frag");

/// Replaced by the per-renderer `#define` block in both shader stages.
const DEFINES_MARKER: &str = "@SHADER_DEFINES@";

/// Corners of a quad covering clip space, drawn as a triangle fan.
const QUAD: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0];

/// The display side of the consumer loop, provided by the windowing library.
pub trait Surface {
    /// Drawable size in pixels.
    fn size(&self) -> (u32, u32);

    fn should_close(&self) -> bool;

    /// Presents the frame. May block on vertical sync.
    fn swap_buffers(&mut self) -> Result<()>;
}

/// Expands the defines marker in `source` for a spectrum of `samples` bins.
pub fn shader_source(source: &str, samples: usize) -> String {
    source.replace(DEFINES_MARKER, &format!("#define SAMPLES {samples}"))
}

/// Draws a spectrum frame as a log-log histogram over the whole viewport.
#[derive(Debug)]
pub struct SpectrumRenderer<'g> {
    gl: &'g Gl,
    samples: usize,
    program: Program<'g>,
    quad: Buffer<'g>,
    vao: VertexArray<'g>,
    spectrum: Uniform<'g>,
    win_size: Uniform<'g>,
}

impl<'g> SpectrumRenderer<'g> {
    /// Compiles the built-in shaders for `samples` bins and uploads the quad.
    pub fn new(gl: &'g Gl, samples: usize, config: &RendererConfig) -> Result<Self> {
        if samples == 0 {
            return Err(ShmVizError::InvalidInput(
                "spectrum renderer needs at least one sample",
            ));
        }

        let vs = Shader::compiled(
            gl,
            ShaderStage::Vertex,
            &shader_source(VERTEX_SOURCE, samples),
        )?
        .guard();
        let fs = Shader::compiled(
            gl,
            ShaderStage::Fragment,
            &shader_source(FRAGMENT_SOURCE, samples),
        )?
        .guard();

        let program = Program::create(gl);
        program.attach(&[&*vs, &*fs]).link()?.use_program();

        let quad = Buffer::create(gl);
        quad.set(&f32_bytes(&QUAD), gl::STATIC_DRAW);

        let vao = VertexArray::create(gl);
        let position = program.attributes().resolve("vPosition")?;
        vao.binding(position).bind(AttribPointer {
            buffer: Some(&quad),
            ..Default::default()
        })?;

        let uniforms = program.uniforms();
        let spectrum = uniforms.resolve("uSpectrum")?;
        let win_size = uniforms.resolve("uWinSize")?;

        let renderer = Self {
            gl,
            samples,
            spectrum,
            win_size,
            program,
            quad,
            vao,
        };
        renderer.configure(config)?;
        Ok(renderer)
    }

    /// Number of magnitudes each frame must carry.
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn program(&self) -> &Program<'g> {
        &self.program
    }

    /// Uploads the colour and axis mapping.
    pub fn configure(&self, config: &RendererConfig) -> Result<()> {
        let uniforms = self.program.uniforms();
        let settings = [
            ("uIntensityExp", config.intensity_exp),
            ("uHueExp", config.hue_exp),
            ("uFreqExp", config.freq_exp),
            ("uYExp", config.y_exp),
            ("uMinClip", config.min_clip),
            ("uMaxClip", config.max_clip),
            ("uTopVal", config.top_val),
            ("uRange", config.range),
        ];
        for (name, value) in settings {
            uniforms.resolve(name)?.set(value)?;
        }
        Ok(())
    }

    /// Draws `frame` over a `width` x `height` viewport.
    pub fn draw(&self, frame: &[f32], width: u32, height: u32) -> Result<()> {
        if frame.len() != self.samples {
            return Err(ShmVizError::InvalidInput(
                "frame length does not match the renderer's sample count",
            ));
        }

        let context = self.gl.context();
        context.viewport(0, 0, width as i32, height as i32);
        context.clear_color(0.0, 0.0, 0.0, 0.0);
        context.clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT);

        self.program.use_program();
        self.spectrum.set(UniformValues::float_array(frame))?;
        self.win_size.set([width as f32, height as f32])?;
        self.vao.draw(gl::TRIANGLE_FAN, 0, None)
    }

    /// Releases the program, quad buffer and vertex array.
    pub fn free(self) {
        self.vao.free();
        self.quad.free();
        self.program.free();
    }
}
