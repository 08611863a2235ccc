// controller.rs — 鼠标/触摸/滚轮 → 视角变化

use crate::config::ViewerConfig;
use crate::panorama::{DragSession, RenderLoopState, ViewLimits, ViewState};

/// Host-independent keys the controller understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerKey {
    Escape,
    ToggleFullscreen,
    ToggleAutoRotate,
    ZoomIn,
    ZoomOut,
}

/// Host-independent touch phase; a cancelled touch counts as ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Started,
    Moved,
    Ended,
}

/// Wheel units per unit of trackpad magnification.
const MAGNIFY_WHEEL_UNITS: f64 = 200.0;

/// Side effects the host has to carry out on the controller's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerAction {
    None,
    Close,
    /// Ask the platform to enter (`true`) or leave fullscreen.
    SetFullscreen(bool),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerTuning {
    pub drag_sensitivity: f64,
    pub wheel_zoom_sensitivity: f64,
    pub zoom_step: f64,
    pub auto_rotate_speed: f64,
}

impl ControllerTuning {
    pub fn from_config(cfg: &ViewerConfig) -> Self {
        Self {
            drag_sensitivity: cfg.drag_sensitivity,
            wheel_zoom_sensitivity: cfg.wheel_zoom_sensitivity,
            zoom_step: cfg.zoom_step,
            auto_rotate_speed: cfg.auto_rotate_speed,
        }
    }
}

/// Sole writer of [`ViewState`]. All inputs saturate; none are rejected.
#[derive(Debug, Clone)]
pub struct InteractionController {
    view: ViewState,
    state: RenderLoopState,
    drag: Option<DragSession>,
    /// Up to two tracked fingers: (id, x, y).
    touches: Vec<(u64, f64, f64)>,
    /// Finger distance at the last pinch update, while two fingers are down.
    pinch_distance: Option<f64>,
    limits: ViewLimits,
    tuning: ControllerTuning,
    defaults: (ViewState, RenderLoopState),
}

impl InteractionController {
    pub fn new(cfg: &ViewerConfig) -> Self {
        let view = ViewState::from_config(cfg);
        let state = RenderLoopState::from_config(cfg);
        Self {
            view,
            state,
            drag: None,
            touches: Vec::with_capacity(2),
            pinch_distance: None,
            limits: ViewLimits::from_config(cfg),
            tuning: ControllerTuning::from_config(cfg),
            defaults: (view, state),
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn state(&self) -> &RenderLoopState {
        &self.state
    }

    pub fn limits(&self) -> &ViewLimits {
        &self.limits
    }

    pub fn drag_session(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    /// Back to the configured defaults. Fullscreen mirrors the platform and
    /// is left alone.
    pub fn reset(&mut self) {
        let fullscreen = self.state.is_fullscreen;
        self.view = self.defaults.0;
        self.state = self.defaults.1;
        self.state.is_fullscreen = fullscreen;
        self.drag = None;
        self.touches.clear();
        self.pinch_distance = None;
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.drag = Some(DragSession {
            start_x: x,
            start_y: y,
            start_longitude: self.view.longitude,
            start_latitude: self.view.latitude,
        });
        self.state.is_dragging = true;
        // 拖动总是关闭自动旋转，松开后也不会自动恢复
        self.state.is_auto_rotating = false;
    }

    /// Returns `true` if the view changed.
    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        let Some(session) = self.drag else {
            return false;
        };
        let dx = x - session.start_x;
        let dy = y - session.start_y;
        let s = self.tuning.drag_sensitivity;

        // 向右拖 → 视角向左
        let longitude = session.start_longitude - dx * s;
        let latitude = self.limits.clamp_latitude(session.start_latitude + dy * s);

        let changed = longitude != self.view.longitude || latitude != self.view.latitude;
        self.view.longitude = longitude;
        self.view.latitude = latitude;
        changed
    }

    /// Pointer up, touch end and pointer leave all end the drag.
    pub fn pointer_up(&mut self) {
        if self.drag.take().is_some() {
            log::debug!(
                "drag ended at lon {:.1} lat {:.1}",
                self.view.longitude,
                self.view.latitude
            );
        }
        self.state.is_dragging = false;
    }

    pub fn touch_start(&mut self, x: f64, y: f64) {
        self.pointer_down(x, y);
    }

    pub fn touch_move(&mut self, x: f64, y: f64) -> bool {
        self.pointer_move(x, y)
    }

    pub fn touch_end(&mut self) {
        self.pointer_up();
    }

    pub fn is_pinching(&self) -> bool {
        self.pinch_distance.is_some()
    }

    /// Raw touch event with finger id. One finger drags; a second finger
    /// ends the drag and turns the gesture into a pinch zoom until a finger
    /// lifts. Returns `true` if the view changed.
    pub fn touch(&mut self, id: u64, phase: TouchPhase, x: f64, y: f64) -> bool {
        match phase {
            TouchPhase::Started => {
                if self.touches.len() >= 2 || self.touches.iter().any(|t| t.0 == id) {
                    return false;
                }
                self.touches.push((id, x, y));
                if self.touches.len() == 1 {
                    self.touch_start(x, y);
                } else {
                    self.touch_end();
                    self.pinch_distance = Some(self.finger_distance());
                    log::debug!("pinch started");
                }
                false
            }
            TouchPhase::Moved => {
                let Some(t) = self.touches.iter_mut().find(|t| t.0 == id) else {
                    return false;
                };
                t.1 = x;
                t.2 = y;
                match self.pinch_distance {
                    Some(last) => {
                        let distance = self.finger_distance();
                        self.pinch_distance = Some(distance);
                        let before = self.view.fov;
                        self.pinch(distance - last);
                        self.view.fov != before
                    }
                    None => self.touch_move(x, y),
                }
            }
            TouchPhase::Ended => {
                let Some(i) = self.touches.iter().position(|t| t.0 == id) else {
                    return false;
                };
                self.touches.remove(i);
                if self.pinch_distance.take().is_some() {
                    // 剩下的手指不恢复拖动，避免视角跳动
                    log::debug!("pinch ended at fov {:.1}", self.view.fov);
                } else {
                    self.touch_end();
                }
                false
            }
        }
    }

    fn finger_distance(&self) -> f64 {
        match self.touches.as_slice() {
            [a, b] => (a.1 - b.1).hypot(a.2 - b.2),
            _ => 0.0,
        }
    }

    /// Change in finger distance, in the same units as drag deltas. Spreading
    /// (`distance_delta > 0`) narrows the view, one unit per wheel unit.
    pub fn pinch(&mut self, distance_delta: f64) {
        self.wheel(-distance_delta);
    }

    /// Trackpad magnification; positive zooms in.
    pub fn magnify(&mut self, delta: f64) {
        self.wheel(-delta * MAGNIFY_WHEEL_UNITS);
    }

    /// `delta_y > 0` widens the view (scroll down / pinch in).
    pub fn wheel(&mut self, delta_y: f64) {
        if !delta_y.is_finite() {
            return;
        }
        self.set_fov(self.view.fov + delta_y * self.tuning.wheel_zoom_sensitivity);
    }

    pub fn zoom_in(&mut self) {
        self.set_fov(self.view.fov - self.tuning.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.set_fov(self.view.fov + self.tuning.zoom_step);
    }

    fn set_fov(&mut self, fov: f64) {
        self.view.fov = self.limits.clamp_fov(fov);
    }

    pub fn toggle_auto_rotate(&mut self) -> bool {
        self.state.is_auto_rotating = !self.state.is_auto_rotating;
        self.state.is_auto_rotating
    }

    /// Returns the fullscreen state to request from the platform; the flag
    /// itself only changes via [`Self::set_fullscreen`].
    pub fn toggle_fullscreen(&self) -> ControllerAction {
        ControllerAction::SetFullscreen(!self.state.is_fullscreen)
    }

    /// Mirrors what the platform reports.
    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.state.is_fullscreen = fullscreen;
    }

    pub fn handle_key(&mut self, key: ViewerKey) -> ControllerAction {
        match key {
            ViewerKey::Escape => ControllerAction::Close,
            ViewerKey::ToggleFullscreen => self.toggle_fullscreen(),
            ViewerKey::ToggleAutoRotate => {
                self.toggle_auto_rotate();
                ControllerAction::None
            }
            ViewerKey::ZoomIn => {
                self.zoom_in();
                ControllerAction::None
            }
            ViewerKey::ZoomOut => {
                self.zoom_out();
                ControllerAction::None
            }
        }
    }

    /// Idle-state advance, applied once per render tick.
    pub fn auto_rotate_step(&mut self) -> bool {
        if self.state.is_auto_rotating && !self.state.is_dragging {
            self.view.longitude += self.tuning.auto_rotate_speed;
            true
        } else {
            false
        }
    }
}
