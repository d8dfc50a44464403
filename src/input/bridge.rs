//! Forwarding of local input to the protocol client

use tracing::trace;

use crate::display::DisplaySurfaceHost;
use crate::input::types::{ButtonMask, InputEvent, MouseState};
use crate::protocol::ProtocolClient;

/// Normalizes captured input and forwards it to the protocol client
///
/// Keyboard input is captured document-wide and always forwarded. Mouse
/// input is captured over the display surface, so it is only forwarded once
/// a surface has been mounted.
#[derive(Debug, Default)]
pub struct InputBridge {
    buttons: ButtonMask,
    mouse_attached: bool,
}

impl InputBridge {
    /// Creates a bridge with keyboard capture only
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the mouse capture region over a newly mounted surface
    pub fn attach_mouse(&mut self) {
        self.mouse_attached = true;
        self.buttons = ButtonMask::NONE;
    }

    /// Forwards one event, returning false if it was dropped
    ///
    /// Pointer moves are divided by the display's render scale. Button
    /// events focus the display container and keep raw coordinates.
    pub fn forward(
        &mut self,
        event: InputEvent,
        client: &mut dyn ProtocolClient,
        display: &mut DisplaySurfaceHost,
    ) -> bool {
        match event {
            InputEvent::MouseMove { x, y } => {
                if !self.mouse_attached {
                    trace!("Dropping mouse move, no surface mounted");
                    return false;
                }
                let scale = effective_scale(client.display().scale());
                client.send_mouse_state(MouseState::new(x / scale, y / scale, self.buttons));
            }
            InputEvent::MouseButton {
                x,
                y,
                button_mask,
                pressed,
            } => {
                if !self.mouse_attached {
                    trace!("Dropping mouse button, no surface mounted");
                    return false;
                }
                display.focus();
                self.buttons = if pressed {
                    self.buttons | button_mask
                } else {
                    self.buttons & !button_mask
                };
                client.send_mouse_state(MouseState::new(x, y, self.buttons));
            }
            InputEvent::Key { keysym, pressed } => {
                client.send_key_event(pressed, keysym);
            }
        }

        true
    }
}

fn effective_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{DisplayHost, SurfaceHandle, Viewport};
    use crate::error::ProtocolResult;
    use crate::input::Keysym;
    use crate::protocol::{OutputStream, RemoteDisplay};
    use std::sync::{Arc, Mutex};

    struct FixedDisplay(f64);

    impl RemoteDisplay for FixedDisplay {
        fn element(&self) -> SurfaceHandle {
            SurfaceHandle::new(())
        }

        fn scale(&self) -> f64 {
            self.0
        }
    }

    struct NullStream;

    impl OutputStream for NullStream {
        fn write(&mut self, _data: &[u8]) -> ProtocolResult<()> {
            Ok(())
        }

        fn end(&mut self) -> ProtocolResult<()> {
            Ok(())
        }
    }

    struct RecordingClient {
        display: FixedDisplay,
        mouse: Vec<MouseState>,
        keys: Vec<(bool, Keysym)>,
    }

    impl RecordingClient {
        fn with_scale(scale: f64) -> Self {
            Self {
                display: FixedDisplay(scale),
                mouse: Vec::new(),
                keys: Vec::new(),
            }
        }
    }

    impl ProtocolClient for RecordingClient {
        fn connect(&mut self, _handshake: &str) -> ProtocolResult<()> {
            Ok(())
        }
        fn disconnect(&mut self) {}
        fn send_mouse_state(&mut self, state: MouseState) {
            self.mouse.push(state);
        }
        fn send_key_event(&mut self, pressed: bool, keysym: Keysym) {
            self.keys.push((pressed, keysym));
        }
        fn send_size(&mut self, _width: u32, _height: u32) {}
        fn create_clipboard_stream(&mut self, _mimetype: &str) -> Box<dyn OutputStream> {
            Box::new(NullStream)
        }
        fn create_audio_stream(&mut self, _mimetype: &str) -> Box<dyn OutputStream> {
            Box::new(NullStream)
        }
        fn display(&self) -> &dyn RemoteDisplay {
            &self.display
        }
    }

    struct FocusCounter(Arc<Mutex<u32>>);

    impl DisplayHost for FocusCounter {
        fn viewport(&self) -> Viewport {
            Viewport::new(800.0, 600.0)
        }
        fn mount(&mut self, _surface: SurfaceHandle) {}
        fn unmount(&mut self) {}
        fn focus(&mut self) {
            *self.0.lock().unwrap() += 1;
        }
    }

    fn host() -> (DisplaySurfaceHost, Arc<Mutex<u32>>) {
        let focused = Arc::new(Mutex::new(0));
        let host = DisplaySurfaceHost::new(Box::new(FocusCounter(Arc::clone(&focused))));
        (host, focused)
    }

    #[test]
    fn test_mouse_move_is_scaled_and_button_is_not() {
        let mut bridge = InputBridge::new();
        bridge.attach_mouse();
        let mut client = RecordingClient::with_scale(2.0);
        let (mut display, focused) = host();

        bridge.forward(InputEvent::MouseMove { x: 100.0, y: 50.0 }, &mut client, &mut display);
        bridge.forward(
            InputEvent::MouseButton {
                x: 100.0,
                y: 50.0,
                button_mask: ButtonMask::LEFT,
                pressed: true,
            },
            &mut client,
            &mut display,
        );

        assert_eq!(client.mouse[0], MouseState::new(50.0, 25.0, ButtonMask::NONE));
        assert_eq!(client.mouse[1], MouseState::new(100.0, 50.0, ButtonMask::LEFT));
        assert_eq!(*focused.lock().unwrap(), 1);
    }

    #[test]
    fn test_drag_carries_held_buttons() {
        let mut bridge = InputBridge::new();
        bridge.attach_mouse();
        let mut client = RecordingClient::with_scale(1.0);
        let (mut display, focused) = host();

        let press = InputEvent::MouseButton {
            x: 10.0,
            y: 10.0,
            button_mask: ButtonMask::RIGHT,
            pressed: true,
        };
        let release = InputEvent::MouseButton {
            x: 30.0,
            y: 30.0,
            button_mask: ButtonMask::RIGHT,
            pressed: false,
        };

        bridge.forward(press, &mut client, &mut display);
        bridge.forward(InputEvent::MouseMove { x: 20.0, y: 20.0 }, &mut client, &mut display);
        bridge.forward(release, &mut client, &mut display);

        assert_eq!(client.mouse[1].buttons, ButtonMask::RIGHT);
        assert_eq!(client.mouse[2].buttons, ButtonMask::NONE);
        assert_eq!(*focused.lock().unwrap(), 2);
    }

    #[test]
    fn test_mouse_dropped_before_surface_mounted() {
        let mut bridge = InputBridge::new();
        let mut client = RecordingClient::with_scale(1.0);
        let (mut display, _) = host();

        assert!(!bridge.forward(InputEvent::MouseMove { x: 1.0, y: 1.0 }, &mut client, &mut display));
        assert!(client.mouse.is_empty());
        assert!(!bridge.mouse_attached);
    }

    #[test]
    fn test_keys_forwarded_without_surface() {
        let mut bridge = InputBridge::new();
        let mut client = RecordingClient::with_scale(1.0);
        let (mut display, _) = host();

        bridge.forward(
            InputEvent::Key {
                keysym: Keysym::RETURN,
                pressed: true,
            },
            &mut client,
            &mut display,
        );
        bridge.forward(
            InputEvent::Key {
                keysym: Keysym::RETURN,
                pressed: false,
            },
            &mut client,
            &mut display,
        );

        assert_eq!(
            client.keys,
            vec![(true, Keysym::RETURN), (false, Keysym::RETURN)]
        );
    }

    #[test]
    fn test_invalid_scale_falls_back_to_identity() {
        let mut bridge = InputBridge::new();
        bridge.attach_mouse();
        let mut client = RecordingClient::with_scale(0.0);
        let (mut display, _) = host();

        bridge.forward(InputEvent::MouseMove { x: 8.0, y: 6.0 }, &mut client, &mut display);
        assert_eq!(client.mouse[0], MouseState::new(8.0, 6.0, ButtonMask::NONE));
    }
}
