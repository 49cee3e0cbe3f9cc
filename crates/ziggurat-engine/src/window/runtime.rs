use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl, FrameCtx, InitCtx, WindowCtx};
use crate::device::{GlBackend, GlInit};
use crate::events::{Event, EventBus, EventKind};
use crate::graphics::{Graphics, GraphicsConfig};

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub resizable: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "ziggurat".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            resizable: true,
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window, brings up graphics, and drives `app` until a
    /// `QuitRequested` event is dispatched or a callback asks to exit.
    ///
    /// Returns the first initialization or presentation error, after teardown.
    pub fn run<A>(
        config: RuntimeConfig,
        gl_init: GlInit,
        graphics: GraphicsConfig,
        app: A,
    ) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gl_init, graphics, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Everything alive between window creation and teardown.
struct Session {
    window: Arc<Window>,
    events: EventBus,
    graphics: Graphics<GlBackend>,
    /// Set by the `QuitRequested` handler.
    quit: Rc<Cell<bool>>,
    frame_index: u64,
}

struct AppState<A>
where
    A: App + 'static,
{
    config: RuntimeConfig,
    gl_init: GlInit,
    graphics_config: GraphicsConfig,
    app: A,

    session: Option<Session>,
    failure: Option<anyhow::Error>,
    finished: bool,
}

impl<A> AppState<A>
where
    A: App + 'static,
{
    fn new(
        config: RuntimeConfig,
        gl_init: GlInit,
        graphics_config: GraphicsConfig,
        app: A,
    ) -> Self {
        Self {
            config,
            gl_init,
            graphics_config,
            app,
            session: None,
            failure: None,
            finished: false,
        }
    }

    fn start_session(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size)
            .with_resizable(self.config.resizable);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );
        let backend = GlBackend::new(Arc::clone(&window), &self.gl_init)
            .context("failed to initialize OpenGL backend")?;

        let mut events = EventBus::new();
        let quit = Rc::new(Cell::new(false));
        let flag = Rc::clone(&quit);
        events.subscribe(EventKind::QuitRequested, move |_, _| {
            flag.set(true);
            true
        });

        let graphics = Graphics::init(backend, self.graphics_config.clone(), &mut events)?;
        let mut session = Session {
            window,
            events,
            graphics,
            quit,
            frame_index: 0,
        };

        let mut ctx = InitCtx {
            window: WindowCtx {
                id: session.window.id(),
                window: session.window.as_ref(),
            },
            graphics: &mut session.graphics,
            events: &mut session.events,
        };
        if let Err(e) = self.app.on_init(&mut ctx) {
            self.session = Some(session);
            return Err(e.context("application init failed"));
        }

        session.window.request_redraw();
        self.session = Some(session);
        Ok(())
    }

    fn draw_frame(&mut self) -> Result<()> {
        let (app, Some(session)) = (&mut self.app, self.session.as_mut()) else {
            return Ok(());
        };

        let window = &session.window;
        let frame_index = session.frame_index;
        let mut control = AppControl::Continue;

        session.graphics.update(|graphics| {
            let mut ctx = FrameCtx {
                window: WindowCtx {
                    id: window.id(),
                    window: window.as_ref(),
                },
                graphics,
                frame_index,
            };
            control = app.on_frame(&mut ctx);
        })?;
        session.frame_index += 1;

        if control == AppControl::Exit {
            session.events.dispatch(Event::QuitRequested);
        }
        Ok(())
    }

    fn dispatch(&mut self, event: Event) {
        if let Some(session) = self.session.as_mut() {
            session.events.dispatch(event);
        }
    }

    fn quit_requested(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.quit.get())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        if self.failure.is_none() {
            self.failure = Some(err);
        }
        self.shutdown(event_loop);
    }

    /// Tears the session down in reverse creation order and stops the loop.
    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.teardown();
        event_loop.exit();
    }

    fn teardown(&mut self) {
        self.finished = true;
        let Some(mut session) = self.session.take() else {
            return;
        };

        self.app.on_cleanup(&mut session.graphics);
        let backend = session.graphics.cleanup();
        drop(backend);
        log::info!("shut down after {} frames", session.frame_index);
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() || self.finished {
            return;
        }

        if let Err(e) = self.start_session(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.finished {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw.
        if let Some(session) = &self.session {
            session.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.finished {
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.dispatch(Event::WindowClose),

            WindowEvent::Resized(size) => {
                if let Some(session) = self.session.as_mut() {
                    session.graphics.resize(size.width, size.height);
                    session.window.request_redraw();
                }
                self.dispatch(Event::WindowResized {
                    width: size.width,
                    height: size.height,
                });
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = self.draw_frame() {
                    self.fail(event_loop, e);
                    return;
                }
            }

            _ => {}
        }

        if self.quit_requested() {
            self.shutdown(event_loop);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.teardown();
    }
}
