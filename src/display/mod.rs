//! Display surface hosting
//!
//! The host application owns a container (a window, a widget, a DOM node)
//! and exposes it through [`DisplayHost`]. [`DisplaySurfaceHost`] mounts the
//! protocol-rendered surface into it once per connection and forwards size
//! changes to the protocol client.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::protocol::ProtocolClient;

/// Opaque handle to a protocol-rendered surface
#[derive(Clone)]
pub struct SurfaceHandle(Arc<dyn Any + Send + Sync>);

impl SurfaceHandle {
    /// Wraps a host-specific surface
    pub fn new<T: Any + Send + Sync>(surface: T) -> Self {
        Self(Arc::new(surface))
    }

    /// Borrows the surface as its concrete type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Returns true if both handles point to the same surface
    pub fn ptr_eq(&self, other: &SurfaceHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SurfaceHandle").finish()
    }
}

/// Bounding box of the host container
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width in (possibly fractional) pixels
    pub width: f64,
    /// Height in (possibly fractional) pixels
    pub height: f64,
}

impl Viewport {
    /// Creates a viewport
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns the size floored to whole pixels
    pub fn floor(&self) -> (u32, u32) {
        (floor_px(self.width), floor_px(self.height))
    }
}

fn floor_px(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.floor().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// The host container a session renders into
pub trait DisplayHost: Send {
    /// Returns the container's current bounding box
    fn viewport(&self) -> Viewport;

    /// Shows `surface` inside the container, replacing any previous one
    fn mount(&mut self, surface: SurfaceHandle);

    /// Removes the mounted surface
    fn unmount(&mut self);

    /// Gives the container input focus
    fn focus(&mut self);
}

/// Mounts protocol surfaces into a [`DisplayHost`]
pub struct DisplaySurfaceHost {
    host: Box<dyn DisplayHost>,
    mounted_generation: Option<u64>,
}

impl DisplaySurfaceHost {
    /// Wraps the host container
    pub fn new(host: Box<dyn DisplayHost>) -> Self {
        Self {
            host,
            mounted_generation: None,
        }
    }

    /// Returns the container size floored to whole pixels
    pub fn viewport_size(&self) -> (u32, u32) {
        self.host.viewport().floor()
    }

    /// Mounts the client's surface for connection `generation`
    ///
    /// Repeated calls for the same generation are no-ops. Returns true when
    /// a surface was mounted.
    pub fn attach(&mut self, generation: u64, client: &dyn ProtocolClient) -> bool {
        if self.mounted_generation == Some(generation) {
            debug!("Surface for connection {} already mounted", generation);
            return false;
        }

        self.host.mount(client.display().element());
        self.mounted_generation = Some(generation);
        debug!("Mounted surface for connection {}", generation);
        true
    }

    /// Forwards the current container size to the client
    pub fn resize(&mut self, client: &mut dyn ProtocolClient) {
        let (width, height) = self.viewport_size();
        client.send_size(width, height);
    }

    /// Focuses the container
    pub fn focus(&mut self) {
        self.host.focus();
    }

    /// Unmounts the surface. Only used on session teardown.
    pub fn detach(&mut self) {
        if self.mounted_generation.take().is_some() {
            self.host.unmount();
        }
    }

    /// Returns true while a surface is mounted
    pub fn is_mounted(&self) -> bool {
        self.mounted_generation.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_floor() {
        assert_eq!(Viewport::new(1279.7, 719.2).floor(), (1279, 719));
        assert_eq!(Viewport::new(-3.0, f64::NAN).floor(), (0, 0));
    }

    #[test]
    fn test_surface_handle_downcast() {
        let handle = SurfaceHandle::new(42u32);
        assert_eq!(handle.downcast_ref::<u32>(), Some(&42));
        assert!(handle.downcast_ref::<String>().is_none());

        let other = handle.clone();
        assert!(handle.ptr_eq(&other));
        assert!(!handle.ptr_eq(&SurfaceHandle::new(42u32)));
    }
}
