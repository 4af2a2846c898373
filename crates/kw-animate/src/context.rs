//! Shared animation context
//!
//! One context is shared by the manager and every module it owns. It
//! holds the attribute parser and a cached viewport size kept fresh by a
//! single resize listener, no matter how many modules read it.

use crate::config::Config;
use crate::parser::AttributeParser;
use kw_host::{Host, HostEvent, ListenerId};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

/// Shared handle to the context
pub type SharedContext = Rc<AnimationContext>;

/// Cached viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug)]
pub struct AnimationContext {
    parser: RefCell<AttributeParser>,
    viewport: Cell<ViewportSize>,
    resize_listener: Cell<Option<ListenerId>>,
}

impl AnimationContext {
    pub fn new(config: Config) -> SharedContext {
        Rc::new(Self {
            parser: RefCell::new(AttributeParser::new(config)),
            viewport: Cell::new(ViewportSize::default()),
            resize_listener: Cell::new(None),
        })
    }

    pub fn parser(&self) -> Ref<'_, AttributeParser> {
        self.parser.borrow()
    }

    pub fn parser_mut(&self) -> RefMut<'_, AttributeParser> {
        self.parser.borrow_mut()
    }

    pub fn attribute_name(&self) -> String {
        self.parser().attribute_name().to_string()
    }

    /// Install the resize listener and seed the viewport cache. Repeated
    /// calls are no-ops.
    pub fn attach(&self, host: &mut Host) {
        if self.resize_listener.get().is_some() {
            return;
        }
        let viewport = host.viewport();
        self.viewport.set(ViewportSize {
            width: viewport.width,
            height: viewport.height,
        });
        self.resize_listener.set(Some(host.add_resize_listener()));
        tracing::debug!("animation context attached at {}x{}", viewport.width, viewport.height);
    }

    pub fn is_attached(&self) -> bool {
        self.resize_listener.get().is_some()
    }

    /// Remove the resize listener. Only the first call has an effect.
    pub fn teardown(&self, host: &mut Host) {
        if let Some(listener) = self.resize_listener.take() {
            host.remove_resize_listener(listener);
            tracing::debug!("animation context torn down");
        }
    }

    pub fn viewport(&self) -> ViewportSize {
        self.viewport.get()
    }

    /// Consume resize events addressed to this context
    pub fn handle_event(&self, event: &HostEvent) -> bool {
        match event {
            HostEvent::Resize {
                listener,
                width,
                height,
            } if self.resize_listener.get() == Some(*listener) => {
                self.viewport.set(ViewportSize {
                    width: *width,
                    height: *height,
                });
                true
            }
            _ => false,
        }
    }
}
