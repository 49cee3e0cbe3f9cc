use std::collections::HashMap;
use std::fmt;

use anyhow::{Context, Result};

use crate::asset::{ImageCrateDecoder, ImageDecoder, PathResolver, VirtualPaths};
use crate::device::{GraphicsBackend, ProgramId, VertexArrayId};
use crate::events::{Event, EventBus, EventKind, Outbox};

use super::arrays::ArrayRegistry;
use super::draw::{BindState, ProgramSlots};
use super::textures::TextureRegistry;
use super::{GraphicsConfig, QuadBatch};

/// The graphics system: owns the backend, every array and texture created
/// through it, and the record of what the context currently has bound.
///
/// Lifecycle:
/// - [`init`](Self::init) once the backend's surface exists
/// - [`update`](Self::update) (or [`begin_frame`](Self::begin_frame) /
///   [`end_frame`](Self::end_frame)) once per frame
/// - [`cleanup`](Self::cleanup) at shutdown
///
/// All methods must run on the thread owning the backend's context.
pub struct Graphics<B: GraphicsBackend> {
    pub(super) backend: B,
    pub(super) config: GraphicsConfig,

    pub(super) arrays: ArrayRegistry,
    pub(super) programs: HashMap<ProgramId, ProgramSlots>,
    pub(super) bind: BindState,
    pub(super) textures: TextureRegistry,

    pub(super) paths: Box<dyn PathResolver>,
    pub(super) images: Box<dyn ImageDecoder>,

    pub(super) quad_batch: Option<QuadBatch>,
    vertex_array: VertexArrayId,
}

impl<B: GraphicsBackend> Graphics<B> {
    /// Brings up the graphics system on a backend whose surface already exists.
    ///
    /// - subscribes the default `WindowClose → QuitRequested` forwarder
    ///   (applications override it by subscribing later)
    /// - binds the single vertex-array object all arrays share
    /// - sizes the texture-slot table from the backend's reported maximum
    /// - allocates the shared quad batch
    pub fn init(mut backend: B, config: GraphicsConfig, events: &mut EventBus) -> Result<Self> {
        events.subscribe(EventKind::WindowClose, forward_close_as_quit);

        let vertex_array = backend
            .create_vertex_array()
            .context("failed to create the default vertex array")?;
        backend.bind_vertex_array(Some(vertex_array));

        let slots = backend.max_texture_slots();
        log::info!(
            "texture slots: {slots} per stage, {} combined",
            backend.max_texture_units()
        );

        backend.set_blending(config.blending);

        let max_quads = config.quad_batch_max_quads;
        let mut graphics = Self {
            backend,
            config,
            arrays: ArrayRegistry::new(),
            programs: HashMap::new(),
            bind: BindState::default(),
            textures: TextureRegistry::new(slots),
            paths: Box::new(VirtualPaths::new()),
            images: Box::new(ImageCrateDecoder),
            quad_batch: None,
            vertex_array,
        };

        if max_quads > 0 {
            let batch = graphics
                .create_quad_batch(max_quads)
                .context("failed to allocate the quad batch")?;
            graphics.quad_batch = Some(batch);
        }

        log::debug!("graphics initialized");
        Ok(graphics)
    }

    /// Replaces the resolver used by [`load_texture`](Self::load_texture).
    pub fn set_path_resolver(&mut self, resolver: impl PathResolver + 'static) {
        self.paths = Box::new(resolver);
    }

    /// Replaces the decoder used by [`load_texture`](Self::load_texture).
    pub fn set_image_decoder(&mut self, decoder: impl ImageDecoder + 'static) {
        self.images = Box::new(decoder);
    }

    /// Clears the render target, runs `draw`, then presents.
    pub fn update<F>(&mut self, draw: F) -> Result<()>
    where
        F: FnOnce(&mut Self),
    {
        self.begin_frame();
        draw(self);
        self.end_frame()
    }

    pub fn begin_frame(&mut self) {
        self.backend.clear(self.config.clear_color);
    }

    pub fn end_frame(&mut self) -> Result<()> {
        self.backend.present().context("failed to present frame")
    }

    /// Forwards a drawable resize to the backend.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.backend.resize(width, height);
    }

    pub fn config(&self) -> &GraphicsConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Releases everything the system still owns and hands the backend back.
    ///
    /// Dropping the returned backend destroys the primary surface.
    pub fn cleanup(mut self) -> B {
        #[cfg(debug_assertions)]
        for texture in self.textures.leaked() {
            log::warn!("{texture} was never deleted");
        }
        self.textures.release();

        let arrays = self.arrays.handles();
        let batch = self.quad_batch.take().map(|b| b.array());
        let leaked = arrays.iter().filter(|h| Some(**h) != batch).count();
        if leaked > 0 {
            log::debug!("releasing {leaked} vertex arrays still alive at cleanup");
        }
        for handle in arrays {
            self.delete_array(handle);
        }

        self.use_program(None);
        self.programs.clear();
        self.backend.bind_vertex_array(None);
        self.backend.delete_vertex_array(self.vertex_array);

        log::debug!("graphics cleaned up");
        self.backend
    }
}

impl<B: GraphicsBackend> fmt::Debug for Graphics<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graphics")
            .field("config", &self.config)
            .field("arrays", &self.arrays.len())
            .field("programs", &self.programs.len())
            .field("bind", &self.bind)
            .field("textures", &self.textures)
            .field("quad_batch", &self.quad_batch)
            .finish_non_exhaustive()
    }
}

fn forward_close_as_quit(_: &Event, outbox: &mut Outbox) -> bool {
    outbox.emit(Event::QuitRequested);
    true
}

/// A headless system with every init-time call drained from the log.
#[cfg(test)]
pub(super) fn headless(config: GraphicsConfig) -> Graphics<crate::device::HeadlessBackend> {
    let mut events = EventBus::new();
    let mut graphics =
        Graphics::init(crate::device::HeadlessBackend::new(), config, &mut events).unwrap();
    graphics.backend.take_calls();
    graphics
}

/// [`headless`] without the quad batch.
#[cfg(test)]
pub(super) fn headless_bare() -> Graphics<crate::device::HeadlessBackend> {
    headless(GraphicsConfig {
        quad_batch_max_quads: 0,
        ..GraphicsConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::device::{BackendCall, BufferTarget, BufferUsage, HeadlessBackend};
    use crate::graphics::{AttributeType, TRIANGLE_INDEX_BYTES, VertexLayout};

    use super::*;

    fn quit_counter(events: &mut EventBus) -> Rc<Cell<u32>> {
        let quits = Rc::new(Cell::new(0));
        let seen = Rc::clone(&quits);
        events.subscribe(EventKind::QuitRequested, move |_, _| {
            seen.set(seen.get() + 1);
            true
        });
        quits
    }

    #[test]
    fn init_binds_vertex_array_and_sets_blending() {
        let mut events = EventBus::new();
        let config = GraphicsConfig {
            quad_batch_max_quads: 0,
            blending: false,
            ..GraphicsConfig::default()
        };
        let graphics = Graphics::init(HeadlessBackend::new(), config, &mut events).unwrap();

        let calls = graphics.backend().calls();
        let BackendCall::CreateVertexArray(vao) = calls[0] else {
            panic!("expected vertex array creation first, got {:?}", calls[0]);
        };
        assert_eq!(calls[1], BackendCall::BindVertexArray(Some(vao)));
        assert_eq!(calls[2], BackendCall::SetBlending(false));
        assert_eq!(calls.len(), 3);

        assert_eq!(graphics.max_texture_slots(), 16);
        assert_eq!(graphics.array_count(), 0);
        assert!(graphics.quad_batch().is_none());
    }

    #[test]
    fn init_allocates_quad_batch_by_default() {
        let mut events = EventBus::new();
        let graphics =
            Graphics::init(HeadlessBackend::new(), GraphicsConfig::default(), &mut events).unwrap();

        let batch = graphics.quad_batch().expect("batch enabled by default");
        assert_eq!(batch.max_quads(), 1000);
        assert_eq!(graphics.array_capacity(batch.array()), (4000, 2000));
        assert!(graphics.backend().calls().contains(&BackendCall::AllocateBuffer {
            target: BufferTarget::Index,
            size: 2000 * TRIANGLE_INDEX_BYTES,
            usage: BufferUsage::Static,
        }));
    }

    #[test]
    fn init_fails_when_backend_refuses() {
        let mut backend = HeadlessBackend::new();
        backend.refuse_creation(true);
        let mut events = EventBus::new();

        let err = Graphics::init(backend, GraphicsConfig::default(), &mut events).unwrap_err();
        assert!(err.to_string().contains("vertex array"));
    }

    #[test]
    fn debug_output_summarizes_state() {
        let mut graphics = headless_bare();
        let layout = VertexLayout::new([("pos", AttributeType::Float2)]);
        graphics.create_array(3, 1, layout).unwrap();

        let text = format!("{graphics:?}");
        assert!(text.starts_with("Graphics {"));
        assert!(text.contains("arrays: 1"));
    }

    #[test]
    fn window_close_is_forwarded_as_quit() {
        let mut events = EventBus::new();
        let quits = quit_counter(&mut events);
        let _graphics =
            Graphics::init(HeadlessBackend::new(), GraphicsConfig::default(), &mut events).unwrap();

        assert!(events.dispatch(Event::WindowClose));
        assert_eq!(quits.get(), 1);
    }

    #[test]
    fn later_close_handler_overrides_forwarder() {
        let mut events = EventBus::new();
        let quits = quit_counter(&mut events);
        let _graphics =
            Graphics::init(HeadlessBackend::new(), GraphicsConfig::default(), &mut events).unwrap();
        events.subscribe(EventKind::WindowClose, |_, _| true);

        assert!(events.dispatch(Event::WindowClose));
        assert_eq!(quits.get(), 0);
    }

    #[test]
    fn update_clears_draws_then_presents() {
        let mut graphics = headless(GraphicsConfig {
            quad_batch_max_quads: 0,
            clear_color: [0.1, 0.2, 0.3, 1.0],
            ..GraphicsConfig::default()
        });

        graphics.update(|g| g.backend.set_blending(true)).unwrap();

        assert_eq!(
            graphics.backend().calls(),
            [
                BackendCall::Clear([0.1, 0.2, 0.3, 1.0]),
                BackendCall::SetBlending(true),
                BackendCall::Present,
            ]
        );
    }

    #[test]
    fn resize_reaches_backend() {
        let mut graphics = headless_bare();
        graphics.resize(640, 480);
        graphics.resize(0, 480);
        assert_eq!(graphics.backend().calls(), [BackendCall::Resize(640, 480)]);
    }

    #[test]
    fn cleanup_releases_everything() {
        let mut graphics = headless(GraphicsConfig::default());
        let layout = VertexLayout::new([("pos", AttributeType::Float2)]);
        let handle = graphics.create_array(3, 1, layout).unwrap();
        let record = graphics.arrays.get(handle);
        let buffers = [record.vertex_buffer, record.index_buffer];

        let backend = graphics.cleanup();

        assert!(buffers.iter().all(|b| !backend.is_buffer_live(*b)));
        let deleted = backend
            .calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::DeleteBuffer(_)))
            .count();
        assert_eq!(deleted, 4);
        assert!(matches!(
            backend.calls().last(),
            Some(BackendCall::DeleteVertexArray(_))
        ));
    }
}
