use std::collections::{HashMap, VecDeque};

/// Notification delivered through an [`EventBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The user asked to close the primary window.
    WindowClose,
    /// The application should shut down.
    QuitRequested,
    /// The drawable changed size (physical pixels).
    WindowResized { width: u32, height: u32 },
}

/// Discriminant used to subscribe to a family of events.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EventKind {
    WindowClose,
    QuitRequested,
    WindowResized,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::WindowClose => EventKind::WindowClose,
            Event::QuitRequested => EventKind::QuitRequested,
            Event::WindowResized { .. } => EventKind::WindowResized,
        }
    }
}

/// Follow-up events emitted by handlers during a dispatch.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: VecDeque<Event>,
}

impl Outbox {
    pub fn emit(&mut self, event: Event) {
        self.pending.push_back(event);
    }
}

type Handler = Box<dyn FnMut(&Event, &mut Outbox) -> bool>;

/// Single-threaded publish/subscribe hub.
///
/// Handlers for a kind run newest-first; the first one returning `true`
/// consumes the event. Events emitted into the [`Outbox`] are dispatched after
/// the current one, in emission order.
#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<EventKind, Vec<Handler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&Event, &mut Outbox) -> bool + 'static,
    {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
    }

    /// Dispatches `event` and everything it causes.
    ///
    /// Returns whether `event` itself was consumed.
    pub fn dispatch(&mut self, event: Event) -> bool {
        let mut outbox = Outbox::default();
        let consumed = self.deliver(&event, &mut outbox);

        while let Some(next) = outbox.pending.pop_front() {
            if !self.deliver(&next, &mut outbox) {
                log::trace!("unhandled event {next:?}");
            }
        }
        consumed
    }

    fn deliver(&mut self, event: &Event, outbox: &mut Outbox) -> bool {
        let Some(handlers) = self.handlers.get_mut(&event.kind()) else {
            return false;
        };
        handlers.iter_mut().rev().any(|handler| handler(event, outbox))
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<_, _> = self.handlers.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn recorder(
        log: &Rc<RefCell<Vec<&'static str>>>,
        tag: &'static str,
        consume: bool,
    ) -> impl FnMut(&Event, &mut Outbox) -> bool + 'static {
        let log = Rc::clone(log);
        move |_, _| {
            log.borrow_mut().push(tag);
            consume
        }
    }

    #[test]
    fn newest_handler_runs_first_and_consumes() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.subscribe(EventKind::WindowClose, recorder(&log, "old", true));
        bus.subscribe(EventKind::WindowClose, recorder(&log, "new", true));

        assert!(bus.dispatch(Event::WindowClose));
        assert_eq!(*log.borrow(), ["new"]);
    }

    #[test]
    fn unconsumed_event_falls_through() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.subscribe(EventKind::WindowClose, recorder(&log, "old", false));
        bus.subscribe(EventKind::WindowClose, recorder(&log, "new", false));

        assert!(!bus.dispatch(Event::WindowClose));
        assert_eq!(*log.borrow(), ["new", "old"]);
    }

    #[test]
    fn follow_up_events_are_dispatched() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.subscribe(EventKind::WindowClose, |_, outbox| {
            outbox.emit(Event::QuitRequested);
            true
        });
        bus.subscribe(EventKind::QuitRequested, recorder(&log, "quit", true));

        bus.dispatch(Event::WindowClose);
        assert_eq!(*log.borrow(), ["quit"]);
    }

    #[test]
    fn no_subscribers_is_unhandled() {
        let mut bus = EventBus::new();
        assert!(!bus.dispatch(Event::WindowResized { width: 1, height: 1 }));
    }
}
