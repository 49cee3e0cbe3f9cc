use std::ffi::CStr;
use std::num::NonZeroU32;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use glow::HasContext;
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version,
};
use glutin::display::{Display, DisplayApiPreference};
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::window::Window;

use crate::graphics::{AttributeType, ScalarKind};

use super::{
    AttributePointer, BackendError, BufferId, BufferTarget, BufferUsage, GlInit, GraphicsBackend,
    ProgramAttribute, ProgramId, SamplerDesc, TextureFilter, TextureId, TextureWrap,
    VertexArrayId,
};

/// OpenGL backend bound to one window.
///
/// Owns the GL context, the window surface it presents to, and the function
/// table loaded from the driver. The context is made current on creation and
/// stays current on the calling thread.
pub struct GlBackend {
    gl: glow::Context,
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    window: Arc<Window>,
    max_texture_slots: u32,
    max_texture_units: u32,
    /// Immutable texture storage (GL 4.2 or `ARB_texture_storage`).
    texture_storage: bool,
}

impl GlBackend {
    /// Creates a context and window surface for `window` and makes it current.
    pub fn new(window: Arc<Window>, init: &GlInit) -> Result<Self> {
        let raw_display = window
            .display_handle()
            .context("window has no display handle")?
            .as_raw();
        let raw_window = window
            .window_handle()
            .context("window has no window handle")?
            .as_raw();

        #[cfg(target_os = "windows")]
        let preference = DisplayApiPreference::Wgl(Some(raw_window));
        #[cfg(target_os = "macos")]
        let preference = DisplayApiPreference::Cgl;
        #[cfg(all(unix, not(target_os = "macos")))]
        let preference = DisplayApiPreference::Egl;

        let display = unsafe { Display::new(raw_display, preference) }
            .context("failed to open GL display")?;

        let template = ConfigTemplateBuilder::new()
            .with_stencil_size(init.stencil_bits)
            .with_transparency(false)
            .build();
        let config = unsafe { display.find_configs(template) }
            .context("failed to enumerate GL configs")?
            .next()
            .context("no suitable GL config")?;

        let size = window.inner_size();
        let width = NonZeroU32::new(size.width.max(1)).unwrap_or(NonZeroU32::MIN);
        let height = NonZeroU32::new(size.height.max(1)).unwrap_or(NonZeroU32::MIN);
        let surface_attributes =
            SurfaceAttributesBuilder::<WindowSurface>::new().build(raw_window, width, height);
        let surface = unsafe { display.create_window_surface(&config, &surface_attributes) }
            .context("failed to create GL window surface")?;

        let (major, minor) = init.version;
        let context_attributes = ContextAttributesBuilder::new()
            .with_debug(init.debug_context)
            .with_profile(GlProfile::Core)
            .with_context_api(ContextApi::OpenGl(Some(Version::new(major, minor))))
            .build(Some(raw_window));
        let context = unsafe { display.create_context(&config, &context_attributes) }
            .context("failed to create GL context")?
            .make_current(&surface)
            .context("failed to make GL context current")?;

        let interval = if init.vsync {
            SwapInterval::Wait(NonZeroU32::MIN)
        } else {
            SwapInterval::DontWait
        };
        if let Err(e) = surface.set_swap_interval(&context, interval) {
            log::warn!("failed to set swap interval (vsync={}): {e}", init.vsync);
        }

        let mut gl = unsafe {
            glow::Context::from_loader_function_cstr(|s: &CStr| display.get_proc_address(s))
        };
        log_driver_info(&gl);

        if init.debug_context && gl.supports_debug() {
            unsafe {
                gl.enable(glow::DEBUG_OUTPUT);
                gl.enable(glow::DEBUG_OUTPUT_SYNCHRONOUS);
                gl.debug_message_callback(log_debug_message);
            }
            log::debug!("GL debug output enabled");
        }

        let version = gl.version();
        let texture_storage = (version.major, version.minor) >= (4, 2)
            || gl.supported_extensions().contains("GL_ARB_texture_storage");

        let max_texture_slots = unsafe { gl.get_parameter_i32(glow::MAX_TEXTURE_IMAGE_UNITS) };
        let max_texture_units =
            unsafe { gl.get_parameter_i32(glow::MAX_COMBINED_TEXTURE_IMAGE_UNITS) };

        Ok(Self {
            gl,
            surface,
            context,
            window,
            max_texture_slots: max_texture_slots.max(0) as u32,
            max_texture_units: max_texture_units.max(0) as u32,
            texture_storage,
        })
    }

    /// Returns the window this backend presents to.
    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Raw function table, for collaborators such as shader compilation that
    /// live outside the core.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }
}

impl GraphicsBackend for GlBackend {
    fn create_buffer(&mut self) -> Result<BufferId, BackendError> {
        let buffer = unsafe { self.gl.create_buffer() }?;
        Ok(BufferId(buffer.0))
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        unsafe { self.gl.delete_buffer(glow::NativeBuffer(buffer.0)) }
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>) {
        unsafe {
            self.gl
                .bind_buffer(gl_target(target), buffer.map(|b| glow::NativeBuffer(b.0)))
        }
    }

    fn allocate_buffer(
        &mut self,
        target: BufferTarget,
        size: usize,
        usage: BufferUsage,
    ) -> Result<(), BackendError> {
        let size = i32::try_from(size).map_err(|_| {
            BackendError::new(format!("{size} byte buffer exceeds the GL size range"))
        })?;
        let usage = match usage {
            BufferUsage::Static => glow::STATIC_DRAW,
            BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
        };
        unsafe { self.gl.buffer_data_size(gl_target(target), size, usage) };
        Ok(())
    }

    fn write_buffer(&mut self, target: BufferTarget, offset: usize, data: &[u8]) {
        unsafe {
            self.gl
                .buffer_sub_data_u8_slice(gl_target(target), gl_int(offset), data)
        }
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayId, BackendError> {
        let vao = unsafe { self.gl.create_vertex_array() }?;
        Ok(VertexArrayId(vao.0))
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        unsafe {
            self.gl
                .bind_vertex_array(vertex_array.map(|v| glow::NativeVertexArray(v.0)))
        }
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        unsafe {
            self.gl
                .delete_vertex_array(glow::NativeVertexArray(vertex_array.0))
        }
    }

    fn enable_attribute(&mut self, slot: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(slot) }
    }

    fn disable_attribute(&mut self, slot: u32) {
        unsafe { self.gl.disable_vertex_attrib_array(slot) }
    }

    fn float_attribute_pointer(&mut self, slot: u32, p: AttributePointer) {
        unsafe {
            self.gl.vertex_attrib_pointer_f32(
                slot,
                i32::from(p.components),
                gl_scalar(p.scalar),
                false,
                gl_int(p.stride as usize),
                gl_int(p.offset as usize),
            )
        }
    }

    fn integer_attribute_pointer(&mut self, slot: u32, p: AttributePointer) {
        unsafe {
            self.gl.vertex_attrib_pointer_i32(
                slot,
                i32::from(p.components),
                gl_scalar(p.scalar),
                gl_int(p.stride as usize),
                gl_int(p.offset as usize),
            )
        }
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        unsafe { self.gl.use_program(program.map(|p| glow::NativeProgram(p.0))) }
    }

    fn program_attributes(&mut self, program: ProgramId) -> Vec<ProgramAttribute> {
        let native = glow::NativeProgram(program.0);
        let count = unsafe { self.gl.get_active_attributes(native) };

        (0..count)
            .filter_map(|index| {
                let active = unsafe { self.gl.get_active_attribute(native, index) }?;
                // Built-in inputs (gl_VertexID, ...) have no location.
                let slot = unsafe { self.gl.get_attrib_location(native, &active.name) }?;
                Some(ProgramAttribute {
                    ty: attribute_type_from_gl(active.atype),
                    name: active.name,
                    slot,
                })
            })
            .collect()
    }

    fn validate_program(&mut self, program: ProgramId) -> Result<(), BackendError> {
        let native = glow::NativeProgram(program.0);
        unsafe {
            self.gl.validate_program(native);
            if self.gl.get_program_validate_status(native) {
                Ok(())
            } else {
                Err(BackendError::new(self.gl.get_program_info_log(native)))
            }
        }
    }

    fn max_texture_slots(&self) -> u32 {
        self.max_texture_slots
    }

    fn max_texture_units(&self) -> u32 {
        self.max_texture_units
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
        sampler: SamplerDesc,
    ) -> Result<TextureId, BackendError> {
        let filter = match sampler.filter {
            TextureFilter::Linear => glow::LINEAR,
            TextureFilter::Nearest => glow::NEAREST,
        };
        let wrap = match sampler.wrap {
            TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
            TextureWrap::Repeat => glow::REPEAT,
        };
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(BackendError::new(format!(
                "{width}x{height} RGBA8 texture needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        let (Ok(w), Ok(h)) = (i32::try_from(width), i32::try_from(height)) else {
            return Err(BackendError::new(format!(
                "{width}x{height} texture exceeds the GL size range"
            )));
        };

        unsafe {
            let texture = self.gl.create_texture()?;
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_BASE_LEVEL, 0);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAX_LEVEL, 0);
            if self.texture_storage {
                self.gl
                    .tex_storage_2d(glow::TEXTURE_2D, 1, glow::RGBA8, w, h);
                self.gl.tex_sub_image_2d(
                    glow::TEXTURE_2D,
                    0,
                    0,
                    0,
                    w,
                    h,
                    glow::RGBA,
                    glow::UNSIGNED_BYTE,
                    glow::PixelUnpackData::Slice(Some(pixels)),
                );
            } else {
                self.gl.tex_image_2d(
                    glow::TEXTURE_2D,
                    0,
                    glow::RGBA8 as i32,
                    w,
                    h,
                    0,
                    glow::RGBA,
                    glow::UNSIGNED_BYTE,
                    glow::PixelUnpackData::Slice(Some(pixels)),
                );
            }
            self.gl.bind_texture(glow::TEXTURE_2D, None);
            Ok(TextureId(texture.0))
        }
    }

    fn bind_texture(&mut self, slot: u32, texture: Option<TextureId>) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + slot);
            self.gl
                .bind_texture(glow::TEXTURE_2D, texture.map(|t| glow::NativeTexture(t.0)));
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        unsafe { self.gl.delete_texture(glow::NativeTexture(texture.0)) }
    }

    fn set_blending(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(glow::BLEND);
                self.gl
                    .blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
            } else {
                self.gl.disable(glow::BLEND);
            }
        }
    }

    fn draw_indexed_triangles(&mut self, index_count: u32) {
        unsafe {
            self.gl.draw_elements(
                glow::TRIANGLES,
                gl_int(index_count as usize),
                glow::UNSIGNED_INT,
                0,
            )
        }
    }

    fn clear(&mut self, [r, g, b, a]: [f32; 4]) {
        unsafe {
            self.gl.clear_color(r, g, b, a);
            self.gl
                .clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT);
        }
    }

    fn present(&mut self) -> Result<(), BackendError> {
        self.window.pre_present_notify();
        self.surface
            .swap_buffers(&self.context)
            .map_err(|e| BackendError::new(e.to_string()))
    }

    fn resize(&mut self, width: u32, height: u32) {
        let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) else {
            return;
        };
        self.surface.resize(&self.context, w, h);
        unsafe {
            self.gl
                .viewport(0, 0, gl_int(width as usize), gl_int(height as usize))
        }
    }
}

fn gl_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Vertex => glow::ARRAY_BUFFER,
        BufferTarget::Index => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn gl_scalar(scalar: ScalarKind) -> u32 {
    match scalar {
        ScalarKind::Float => glow::FLOAT,
        ScalarKind::Int => glow::INT,
        ScalarKind::UInt => glow::UNSIGNED_INT,
    }
}

fn gl_int(n: usize) -> i32 {
    i32::try_from(n).unwrap_or_else(|_| panic!("{n} exceeds the GL size range"))
}

fn attribute_type_from_gl(atype: u32) -> Option<AttributeType> {
    Some(match atype {
        glow::FLOAT => AttributeType::Float,
        glow::FLOAT_VEC2 => AttributeType::Float2,
        glow::FLOAT_VEC3 => AttributeType::Float3,
        glow::FLOAT_VEC4 => AttributeType::Float4,
        glow::INT => AttributeType::Int,
        glow::INT_VEC2 => AttributeType::Int2,
        glow::INT_VEC3 => AttributeType::Int3,
        glow::INT_VEC4 => AttributeType::Int4,
        glow::UNSIGNED_INT => AttributeType::UInt,
        glow::UNSIGNED_INT_VEC2 => AttributeType::UInt2,
        glow::UNSIGNED_INT_VEC3 => AttributeType::UInt3,
        glow::UNSIGNED_INT_VEC4 => AttributeType::UInt4,
        _ => return None,
    })
}

fn log_driver_info(gl: &glow::Context) {
    let (vendor, renderer, version) = unsafe {
        (
            gl.get_parameter_string(glow::VENDOR),
            gl.get_parameter_string(glow::RENDERER),
            gl.get_parameter_string(glow::VERSION),
        )
    };
    log::info!("OpenGL driver: {renderer} [{vendor}], {version}");
}

fn log_debug_message(_source: u32, _ty: u32, id: u32, severity: u32, message: &str) {
    match severity {
        glow::DEBUG_SEVERITY_HIGH | glow::DEBUG_SEVERITY_MEDIUM => {
            log::error!("GL [{id}]: {message}")
        }
        glow::DEBUG_SEVERITY_LOW => log::warn!("GL [{id}]: {message}"),
        _ => log::trace!("GL [{id}]: {message}"),
    }
}
