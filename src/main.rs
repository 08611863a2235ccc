// main.rs — 桌面宿主：窗口、输入事件 → 控制器，逐帧渲染与 UI 叠加

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // 在 Release 模式下隐藏控制台窗口

mod fonts;
mod renderer;

use renderer::Renderer;
use travellens_vr::i18n::{tr, tr_with};
use travellens_vr::{ControllerAction, LaunchOptions, PanoramaViewer, ViewerKey, ViewerPhase};
use travellens_vr::TouchPhase as GesturePhase;

use winit::{
    dpi::{LogicalPosition, LogicalSize, PhysicalPosition},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, Window, WindowBuilder},
};

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Browser-style wheel units per winit line step.
const WHEEL_LINE_UNITS: f64 = 100.0;

/// Controller input is in logical pixels so drag and wheel speed do not
/// depend on the display scale factor.
fn logical(pos: PhysicalPosition<f64>, scale_factor: f64) -> LogicalPosition<f64> {
    pos.to_logical(scale_factor)
}

/// What the overlay asked for this frame.
#[derive(Default)]
struct UiRequests {
    open_dialog: bool,
    close: bool,
    fullscreen: Option<bool>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = match LaunchOptions::from_env() {
        Ok(o) => o,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(2);
        }
    };
    travellens_vr::i18n::init(opts.lang.clone());

    let event_loop = EventLoop::new();
    let window = match WindowBuilder::new()
        .with_title(tr("app.title"))
        .with_inner_size(LogicalSize::new(1280, 720))
        .build(&event_loop)
    {
        Ok(w) => Arc::new(w),
        Err(e) => {
            log::error!("cannot create window: {}", e);
            std::process::exit(1);
        }
    };

    let mut renderer = match pollster::block_on(Renderer::new(window.clone(), &opts.lang)) {
        Ok(r) => r,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let mut viewer = PanoramaViewer::new(opts.config.clone());
    viewer.resize(renderer.size.width, renderer.size.height);
    if let Some(image) = &opts.image {
        let title = opts.title.clone().unwrap_or_else(|| title_for(image));
        viewer.open_viewer(image, &title);
    }

    // 交互状态；控制器只看逻辑像素，拖动速度不随 DPI 变化
    let mut cursor: Option<LogicalPosition<f64>> = None;

    // FPS 计算
    let mut last_fps_time = Instant::now();
    let mut frame_count = 0;
    let mut fps = 0.0;
    let mut show_fps = false;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        match event {
            Event::WindowEvent { event, .. } => {
                // 松开鼠标总是结束拖动，即使落在 UI 上
                if let WindowEvent::MouseInput {
                    state: ElementState::Released,
                    button: MouseButton::Left,
                    ..
                } = event
                {
                    viewer.controller_mut().pointer_up();
                }

                // 先让 egui 处理事件
                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.consumed {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                        viewer.resize(new_size.width, new_size.height);
                        // 平台可能自行退出全屏
                        viewer
                            .controller_mut()
                            .set_fullscreen(window.fullscreen().is_some());
                    }

                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state != ElementState::Pressed {
                            return;
                        }
                        let key = match input.virtual_keycode {
                            Some(VirtualKeyCode::Escape) => Some(ViewerKey::Escape),
                            Some(VirtualKeyCode::F11) => Some(ViewerKey::ToggleFullscreen),
                            Some(VirtualKeyCode::R) => Some(ViewerKey::ToggleAutoRotate),
                            Some(VirtualKeyCode::Equals)
                            | Some(VirtualKeyCode::Plus)
                            | Some(VirtualKeyCode::NumpadAdd) => Some(ViewerKey::ZoomIn),
                            Some(VirtualKeyCode::Minus) | Some(VirtualKeyCode::NumpadSubtract) => {
                                Some(ViewerKey::ZoomOut)
                            }
                            Some(VirtualKeyCode::O) => {
                                open_with_dialog(&mut viewer);
                                None
                            }
                            _ => None,
                        };
                        if let Some(key) = key {
                            let action = viewer.handle_key(key);
                            apply_action(action, &window, &mut viewer, &mut renderer);
                        }
                    }

                    WindowEvent::MouseInput { state, button, .. } => {
                        if button == MouseButton::Left && viewer.is_open() {
                            match (state, cursor) {
                                (ElementState::Pressed, Some(pos)) => {
                                    viewer.controller_mut().pointer_down(pos.x, pos.y)
                                }
                                (ElementState::Released, _) => viewer.controller_mut().pointer_up(),
                                _ => {}
                            }
                        }
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        let pos = logical(position, window.scale_factor());
                        cursor = Some(pos);
                        viewer.controller_mut().pointer_move(pos.x, pos.y);
                    }

                    WindowEvent::CursorLeft { .. } => {
                        cursor = None;
                        viewer.controller_mut().pointer_up();
                    }

                    WindowEvent::Touch(touch) => {
                        if !viewer.is_open() {
                            return;
                        }
                        let pos = logical(touch.location, window.scale_factor());
                        let phase = match touch.phase {
                            TouchPhase::Started => GesturePhase::Started,
                            TouchPhase::Moved => GesturePhase::Moved,
                            TouchPhase::Ended | TouchPhase::Cancelled => GesturePhase::Ended,
                        };
                        // 单指拖动，双指捏合缩放
                        viewer.controller_mut().touch(touch.id, phase, pos.x, pos.y);
                    }

                    WindowEvent::TouchpadMagnify { delta, .. } => {
                        viewer.controller_mut().magnify(delta);
                    }

                    WindowEvent::MouseWheel { delta, .. } => {
                        // winit: 正值 = 向上滚 → 拉近
                        let delta_y = match delta {
                            MouseScrollDelta::LineDelta(_, y) => -(y as f64) * WHEEL_LINE_UNITS,
                            MouseScrollDelta::PixelDelta(pos) => {
                                -logical(pos, window.scale_factor()).y
                            }
                        };
                        viewer.controller_mut().wheel(delta_y);
                    }

                    WindowEvent::DroppedFile(path) => {
                        let url = path.to_string_lossy().to_string();
                        let title = title_for(&url);
                        viewer.open_viewer(&url, &title);
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                frame_count += 1;
                let now = Instant::now();
                if now.duration_since(last_fps_time).as_secs_f32() >= 1.0 {
                    fps = frame_count as f32 / now.duration_since(last_fps_time).as_secs_f32();
                    frame_count = 0;
                    last_fps_time = now;
                }

                viewer.poll_loader();
                if let Some(frame) = viewer.tick() {
                    renderer.present_frame(&frame);
                }

                let mut requests = UiRequests::default();
                let render_result = renderer.render_with_ui(&window, |ctx| {
                    draw_ui(ctx, &mut viewer, &mut requests, &mut show_fps, fps);
                });

                if requests.open_dialog {
                    open_with_dialog(&mut viewer);
                }
                if requests.close {
                    viewer.close_viewer();
                    apply_action(ControllerAction::Close, &window, &mut viewer, &mut renderer);
                }
                if let Some(fullscreen) = requests.fullscreen {
                    apply_action(
                        ControllerAction::SetFullscreen(fullscreen),
                        &window,
                        &mut viewer,
                        &mut renderer,
                    );
                }
                if !viewer.render_loop().is_running() {
                    renderer.clear_frame();
                }

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => *control_flow = ControlFlow::Exit,
                    Err(e) => log::warn!("render error: {:?}", e),
                }
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }
    });
}

fn title_for(url: &str) -> String {
    Path::new(url)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| url.to_string())
}

fn open_with_dialog(viewer: &mut PanoramaViewer) {
    if let Some(path) = rfd::FileDialog::new()
        .add_filter(&tr("file.filter.images"), &["jpg", "jpeg", "png", "bmp", "webp"])
        .pick_file()
    {
        let url = path.to_string_lossy().to_string();
        let title = title_for(&url);
        viewer.open_viewer(&url, &title);
    }
}

fn apply_action(
    action: ControllerAction,
    window: &Window,
    viewer: &mut PanoramaViewer,
    renderer: &mut Renderer,
) {
    match action {
        ControllerAction::None => {}
        ControllerAction::Close => {
            // 查看器关闭时一并退出全屏
            window.set_fullscreen(None);
            viewer.controller_mut().set_fullscreen(false);
            renderer.clear_frame();
        }
        ControllerAction::SetFullscreen(on) => {
            window.set_fullscreen(on.then(|| Fullscreen::Borderless(None)));
            viewer
                .controller_mut()
                .set_fullscreen(window.fullscreen().is_some());
        }
    }
}

fn draw_ui(
    ctx: &egui::Context,
    viewer: &mut PanoramaViewer,
    requests: &mut UiRequests,
    show_fps: &mut bool,
    fps: f32,
) {
    let overlay = egui::Frame::none()
        .fill(egui::Color32::from_black_alpha(160))
        .inner_margin(egui::Margin::same(12.0));

    if !viewer.is_open() {
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                ui.centered_and_justified(|ui| {
                    if ui.button(tr("viewer.empty")).clicked() {
                        requests.open_dialog = true;
                    }
                });
            });
        return;
    }

    egui::TopBottomPanel::top("header").frame(overlay).show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.vertical(|ui| {
                ui.heading(egui::RichText::new(viewer.title()).color(egui::Color32::WHITE));
                ui.label(egui::RichText::new(tr("viewer.hint")).color(egui::Color32::GRAY));
            });
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("✕").on_hover_text(tr("viewer.close")).clicked() {
                    requests.close = true;
                }
                if ui.button(tr("viewer.open")).clicked() {
                    requests.open_dialog = true;
                }
            });
        });
    });

    match viewer.phase().clone() {
        ViewerPhase::Loading => {
            egui::Area::new(egui::Id::new("loading"))
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.spinner();
                        ui.label(egui::RichText::new(tr("viewer.loading")).color(egui::Color32::WHITE));
                    });
                });
        }
        ViewerPhase::Failed(reason) => {
            egui::Area::new(egui::Id::new("failed"))
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.label(egui::RichText::new(tr("viewer.failed")).color(egui::Color32::LIGHT_RED));
                        ui.label(egui::RichText::new(reason).small().color(egui::Color32::GRAY));
                    });
                });
        }
        ViewerPhase::Ready | ViewerPhase::Closed => {}
    }

    egui::TopBottomPanel::bottom("controls").frame(overlay).show(ctx, |ui| {
        let auto = viewer.controller().state().is_auto_rotating;
        let fullscreen = viewer.controller().state().is_fullscreen;

        ui.horizontal(|ui| {
            if ui.selectable_label(auto, tr("viewer.auto_rotate")).clicked() {
                viewer.controller_mut().toggle_auto_rotate();
            }
            ui.separator();
            if ui.button("−").on_hover_text(tr("viewer.zoom_out")).clicked() {
                viewer.controller_mut().zoom_out();
            }
            ui.label(tr_with(
                "viewer.zoom_label",
                &[("pct", viewer.zoom_percent().to_string())],
            ));
            if ui.button("+").on_hover_text(tr("viewer.zoom_in")).clicked() {
                viewer.controller_mut().zoom_in();
            }
            ui.separator();
            let fs_label = if fullscreen {
                tr("viewer.fullscreen.exit")
            } else {
                tr("viewer.fullscreen.enter")
            };
            if ui.button(fs_label).clicked() {
                requests.fullscreen = Some(!fullscreen);
            }
            ui.separator();
            ui.checkbox(show_fps, "FPS");
        });

        ui.horizontal(|ui| {
            let (lon, lat) = viewer.controller().view().compass_degrees();
            ui.label(
                egui::RichText::new(tr_with(
                    "viewer.compass",
                    &[("lon", lon.to_string()), ("lat", lat.to_string())],
                ))
                .small()
                .color(egui::Color32::GRAY),
            );
            if *show_fps {
                ui.label("|");
                ui.label(
                    egui::RichText::new(tr_with("viewer.fps", &[("fps", format!("{:.1}", fps))]))
                        .color(egui::Color32::GREEN),
                );
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(egui::RichText::new(tr("viewer.watermark")).small());
            });
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use travellens_vr::{InteractionController, ViewerConfig};

    #[test]
    fn hidpi_drag_matches_standard_density() {
        let drag = |scale: f64| {
            let mut c = InteractionController::new(&ViewerConfig::default());
            let start = logical(PhysicalPosition::new(100.0 * scale, 100.0 * scale), scale);
            let end = logical(PhysicalPosition::new(150.0 * scale, 90.0 * scale), scale);
            c.pointer_down(start.x, start.y);
            c.pointer_move(end.x, end.y);
            *c.view()
        };
        let standard = drag(1.0);
        let retina = drag(2.0);
        assert!((standard.longitude - retina.longitude).abs() < 1e-9);
        assert!((standard.latitude - retina.latitude).abs() < 1e-9);
        assert!((retina.longitude - -10.0).abs() < 1e-9);
    }

    #[test]
    fn pixel_wheel_delta_is_scaled_to_logical() {
        assert_eq!(logical(PhysicalPosition::new(0.0, 240.0), 2.0).y, 120.0);
        assert_eq!(logical(PhysicalPosition::new(0.0, 240.0), 1.0).y, 240.0);
    }
}
