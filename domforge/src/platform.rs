//! Desktop host: drives an [`Engine`] from a `winit` event loop.
//!
//! The window only serves as an input source and a clock. Drawing stays with whatever
//! [`RenderSurface`](crate::surface::RenderSurface) the engine was built with.

use std::time::Instant;

use anyhow::Result;
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, MouseButton, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::Window,
};

use crate::engine::Engine;
use crate::math::Vec2;

/// Open a window sized from the engine config and tick the engine until it is closed.
#[allow(deprecated)]
pub fn run_windowed(mut engine: Engine) -> Result<()> {
    let event_loop = EventLoop::new()?;
    let mut attributes = Window::default_attributes();
    attributes.title = engine.config().title.clone();
    attributes.inner_size = Some(LogicalSize::new(engine.config().width, engine.config().height).into());
    let window = event_loop.create_window(attributes)?;

    let listener = engine.start(Instant::now());
    let mut cursor = Vec2::ZERO;

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::CloseRequested => elwt.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                // Held keys already read as pressed.
                if event.repeat {
                    return;
                }
                let Some(key) = key_id(&event.logical_key) else {
                    return;
                };
                match event.state {
                    ElementState::Pressed => listener.key_down(key),
                    ElementState::Released => listener.key_up(key),
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let Some(button) = mouse_button_index(button) else {
                    return;
                };
                match state {
                    ElementState::Pressed => listener.mouse_down(button, cursor),
                    ElementState::Released => listener.mouse_up(button, cursor),
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let scale = window.scale_factor();
                let logical = position.to_logical::<f64>(scale);
                cursor = Vec2::new(logical.x as f32, logical.y as f32);
                listener.mouse_move(cursor);
            }
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            engine.frame(now);
            elwt.set_control_flow(ControlFlow::WaitUntil(now + engine.frame_interval()));
        }
        _ => {}
    })?;

    Ok(())
}

/// Key id for a logical key: the printed character, or the name of a named key
/// (`"ArrowLeft"`, `"Escape"`, ...). The space bar maps to `" "`.
pub fn key_id(key: &Key) -> Option<String> {
    match key {
        Key::Named(NamedKey::Space) => Some(" ".to_string()),
        Key::Named(named) => Some(format!("{named:?}")),
        Key::Character(text) => Some(text.to_string()),
        _ => None,
    }
}

/// DOM button index of a mouse button.
pub fn mouse_button_index(button: MouseButton) -> Option<u8> {
    match button {
        MouseButton::Left => Some(0),
        MouseButton::Middle => Some(1),
        MouseButton::Right => Some(2),
        MouseButton::Back => Some(3),
        MouseButton::Forward => Some(4),
        MouseButton::Other(n) => u8::try_from(n).ok(),
    }
}
