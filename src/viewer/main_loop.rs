use glium::winit;
use std::time::Instant;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::keyboard::ModifiersState;

use super::viewer::Viewer;
use crate::scene::Scene;

pub fn main_loop(scene: Scene) {
    let event_loop = winit::event_loop::EventLoop::builder()
        .build()
        .expect("event loop building");
    let (window, display) = glium::backend::glutin::SimpleWindowBuilder::new()
        .with_inner_size(super::WINDOW_WIDTH, super::WINDOW_HEIGHT)
        .build(&event_loop);

    let mut viewer = Viewer::new(&display, scene);

    struct State {
        last_mouse_xy: PhysicalPosition<f64>,
        mouse_grabbed: bool,
        modifiers: ModifiersState,
        win_title: String,
        last_time: Instant,
    }

    let mut state = State {
        last_mouse_xy: PhysicalPosition { x: 0.0, y: 0.0 },
        mouse_grabbed: false,
        modifiers: Default::default(),
        win_title: String::with_capacity(512),
        last_time: Instant::now(),
    };

    let _ = event_loop.run(move |ev, window_target| {
        use winit::event::DeviceEvent as DEv;
        use winit::event::Event as Ev;
        use winit::event::WindowEvent as WEv;

        match ev {
            Ev::WindowEvent { event, .. } => match event {
                WEv::RedrawRequested => {
                    let now = Instant::now();
                    let dt = now.duration_since(state.last_time).as_secs_f64();
                    state.last_time = now;

                    viewer.update(dt);

                    let PhysicalSize { width, height } = window.inner_size();
                    if width > 0 && height > 0 {
                        viewer.set_aspect_ratio(width as f64 / height as f64);
                    }

                    let mut frame = display.draw();
                    viewer.draw(&display, &mut frame);
                    frame.finish().expect("rendering error");

                    state.win_title.clear();
                    viewer.title(&mut state.win_title);
                    window.set_title(&state.win_title);
                }
                WEv::CloseRequested => {
                    window_target.exit();
                }
                WEv::KeyboardInput { event: e, .. } => {
                    if let winit::keyboard::PhysicalKey::Code(code) = e.physical_key {
                        viewer.key(
                            code,
                            e.state == winit::event::ElementState::Pressed,
                            state.modifiers,
                        );
                    }
                }
                WEv::ModifiersChanged(m) => {
                    state.modifiers = m.state();
                }
                WEv::MouseInput { state: mouse_state, button, .. } => {
                    use winit::event::ElementState as Es;
                    use winit::event::MouseButton as MB;

                    match (mouse_state, button) {
                        (Es::Pressed, MB::Left) => {
                            state.mouse_grabbed = true;
                            let _ = window.set_cursor_grab(winit::window::CursorGrabMode::Locked);
                            window.set_cursor_visible(false);
                        }
                        (Es::Released, MB::Left) => {
                            state.mouse_grabbed = false;
                            let _ = window.set_cursor_grab(winit::window::CursorGrabMode::None);
                            window.set_cursor_visible(true);
                        }
                        _ => (),
                    }
                }
                WEv::CursorMoved { position, .. } => {
                    state.last_mouse_xy = position;
                }
                WEv::Focused(false) => {
                    viewer.blur();

                    // Release the mouse
                    state.mouse_grabbed = false;
                    let _ = window.set_cursor_grab(winit::window::CursorGrabMode::None);
                    window.set_cursor_visible(true);
                }
                _ => (),
            },
            Ev::DeviceEvent { event, .. } => match event {
                DEv::MouseMotion { delta } => {
                    // delta is in an "unspecified coordinate system" but
                    // appears to be pixels on my machine
                    if state.mouse_grabbed {
                        viewer.mouse_drag(delta);
                    }
                }
                _ => (),
            },
            Ev::AboutToWait => {
                window.request_redraw();
            }
            _ => (),
        }
    });
}
