//! Ziggurat studio: a small demo that streams colored (optionally textured)
//! quads through the shared quad batch every frame.
//!
//! Usage: `ziggurat-studio [image-path]`

use std::f32::consts::TAU;

use anyhow::{bail, Result};
use glow::HasContext;
use ziggurat_engine::core::{App, AppControl, FrameCtx, InitCtx};
use ziggurat_engine::device::{GlBackend, GlInit, ProgramId};
use ziggurat_engine::events::{Event, EventKind};
use ziggurat_engine::graphics::{Graphics, GraphicsConfig, Quad, QuadBatchVertex, TextureHandle};
use ziggurat_engine::logging::{init_logging, LoggingConfig};
use ziggurat_engine::window::{Runtime, RuntimeConfig};

const VERTEX_SHADER: &str = r#"#version 330 core
in vec3 position;
in vec4 color;
in vec2 uv;

out vec4 v_color;
out vec2 v_uv;

void main() {
    v_color = color;
    v_uv = uv;
    gl_Position = vec4(position, 1.0);
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 330 core
in vec4 v_color;
in vec2 v_uv;

uniform sampler2D u_texture;
uniform int u_textured;

out vec4 frag_color;

void main() {
    vec4 texel = u_textured != 0 ? texture(u_texture, v_uv) : vec4(1.0);
    frag_color = v_color * texel;
}
"#;

/// Quads orbiting the window center.
const QUADS: u32 = 6;

#[derive(Default)]
struct Studio {
    image: Option<String>,
    program: Option<glow::NativeProgram>,
    texture: Option<TextureHandle>,
    quads: Vec<Quad>,
}

impl Studio {
    fn with_image(image: Option<String>) -> Self {
        Self {
            image,
            ..Self::default()
        }
    }
}

impl App for Studio {
    fn on_init(&mut self, ctx: &mut InitCtx<'_>) -> Result<()> {
        let program = compile_program(ctx.graphics.backend().gl())?;
        self.program = Some(program);
        ctx.graphics.use_program(Some(ProgramId(program.0)));

        if let Some(path) = &self.image {
            match ctx.graphics.load_texture(path) {
                Ok(texture) => {
                    ctx.graphics.bind_texture(texture, 0);
                    self.texture = Some(texture);
                }
                Err(e) => log::warn!("drawing untextured: {e:#}"),
            }
        }

        let gl = ctx.graphics.backend().gl();
        unsafe {
            let sampler = gl.get_uniform_location(program, "u_texture");
            gl.uniform_1_i32(sampler.as_ref(), 0);
            let textured = gl.get_uniform_location(program, "u_textured");
            gl.uniform_1_i32(textured.as_ref(), i32::from(self.texture.is_some()));
        }

        ctx.events.subscribe(EventKind::WindowResized, |event, _| {
            if let Event::WindowResized { width, height } = event {
                log::debug!("drawable is now {width}x{height}");
            }
            false
        });

        let (width, height) = ctx.window.physical_size();
        log::info!("studio ready at {width}x{height}");
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        let Some(batch) = ctx.graphics.quad_batch() else {
            return AppControl::Exit;
        };
        let count = QUADS.min(batch.max_quads());
        let (width, height) = ctx.window.logical_size();
        let aspect = if height > 0.0 { width / height } else { 1.0 };

        let t = ctx.frame_index as f32 / 120.0;
        self.quads.clear();
        self.quads.extend((0..count).map(|i| {
            let angle = t + i as f32 * TAU / count as f32;
            let hue = i as f32 / count as f32;
            orbiting_quad(angle, aspect, hue)
        }));

        ctx.graphics.write_quads(&self.quads, 0);
        ctx.graphics.draw_quads(count);
        AppControl::Continue
    }

    fn on_cleanup(&mut self, graphics: &mut Graphics<GlBackend>) {
        if let Some(texture) = self.texture.take() {
            graphics.delete_texture(texture);
        }
        if let Some(program) = self.program.take() {
            graphics.forget_program(ProgramId(program.0));
            unsafe { graphics.backend().gl().delete_program(program) };
        }
    }
}

fn orbiting_quad(angle: f32, aspect: f32, hue: f32) -> Quad {
    let (cx, cy) = (0.5 * angle.cos() / aspect, 0.5 * angle.sin());
    let (hx, hy) = (0.15 / aspect, 0.15);
    let color = [hue, 1.0 - hue, 0.5 + 0.5 * angle.sin(), 1.0];

    let corner = |dx: f32, dy: f32, u: f32, v: f32| QuadBatchVertex {
        position: [cx + dx * hx, cy + dy * hy, 0.0],
        color,
        uv: [u, v],
    };
    [
        corner(-1.0, -1.0, 0.0, 0.0),
        corner(1.0, -1.0, 1.0, 0.0),
        corner(1.0, 1.0, 1.0, 1.0),
        corner(-1.0, 1.0, 0.0, 1.0),
    ]
}

fn compile_program(gl: &glow::Context) -> Result<glow::NativeProgram> {
    unsafe {
        let program = gl.create_program().map_err(anyhow::Error::msg)?;
        let mut shaders = Vec::with_capacity(2);

        for (kind, source) in [
            (glow::VERTEX_SHADER, VERTEX_SHADER),
            (glow::FRAGMENT_SHADER, FRAGMENT_SHADER),
        ] {
            let shader = gl.create_shader(kind).map_err(anyhow::Error::msg)?;
            gl.shader_source(shader, source);
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                bail!("shader compilation failed: {}", gl.get_shader_info_log(shader));
            }
            gl.attach_shader(program, shader);
            shaders.push(shader);
        }

        gl.link_program(program);
        if !gl.get_program_link_status(program) {
            bail!("program link failed: {}", gl.get_program_info_log(program));
        }

        for shader in shaders {
            gl.detach_shader(program, shader);
            gl.delete_shader(shader);
        }
        Ok(program)
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let image = std::env::args().nth(1);
    Runtime::run(
        RuntimeConfig {
            title: "Ziggurat Studio".to_string(),
            ..RuntimeConfig::default()
        },
        GlInit::default(),
        GraphicsConfig {
            quad_batch_max_quads: 64,
            clear_color: [0.08, 0.08, 0.1, 1.0],
            ..GraphicsConfig::default()
        },
        Studio::with_image(image),
    )
}
