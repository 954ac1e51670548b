use std::f64::consts::TAU;
use std::rc::Rc;

use kurbo::{Point, Vec2};
use uuid::Uuid;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};
use yew::prelude::*;

use super::zoom_controls::ZoomControls;
use crate::model::{GardenAction, GardenState};
use crate::state::units::Scale;
use crate::state::{
    BackgroundDimensions, Camera, InteractionState, Marker, MarkerCommand, PlantMove, Viewport,
    marker_at, project_markers,
};

/// Pointer travel (view px) below which a press counts as a click.
const CLICK_SLOP: f64 = 3.0;

#[derive(Properties, PartialEq, Clone)]
pub struct GardenCanvasProps {
    pub state: UseReducerHandle<GardenState>,
    pub show_letters: bool,
    pub header_height: f64,
    pub refit_delay_ms: i32,
    pub default_scale: Scale,
    /// A background click places a plant when a variety is armed.
    pub armed: bool,
    pub on_place: Callback<Point>,
    pub on_move: Callback<PlantMove>,
    pub on_hover: Callback<Option<Uuid>>,
    pub on_select: Callback<Option<Uuid>>,
}

#[derive(Default)]
struct Press {
    down: bool,
    start: Point,
    travelled: f64,
    /// Dragged plant, grab offset from its centre, and current centre (image px).
    drag: Option<(Uuid, Vec2, Point)>,
}

fn markers_for(props: &GardenCanvasProps) -> Vec<Marker> {
    let state = &*props.state;
    let scale = state
        .garden
        .as_ref()
        .map_or(props.default_scale, |g| g.scale(props.default_scale));
    project_markers(
        &state.plants,
        &state.varieties,
        &state.visible,
        scale,
        props.show_letters,
    )
}

fn draw_marker(ctx: &CanvasRenderingContext2d, m: &Marker, at: Point, highlighted: bool) {
    ctx.set_global_alpha(m.opacity);
    ctx.begin_path();
    if ctx.arc(at.x, at.y, m.radius, 0.0, TAU).is_err() {
        return;
    }
    ctx.set_fill_style_str(&m.fill);
    ctx.fill();
    if m.stroke != "transparent" {
        ctx.set_stroke_style_str(m.stroke);
        ctx.set_line_width(m.stroke_width);
        ctx.stroke();
    }
    if highlighted {
        ctx.begin_path();
        if ctx.arc(at.x, at.y, m.radius + 3.0, 0.0, TAU).is_ok() {
            ctx.set_stroke_style_str("#58a6ff");
            ctx.set_line_width(2.0);
            ctx.stroke();
        }
    }
    if let Some(letter) = m.letter {
        ctx.set_fill_style_str("#111827");
        ctx.set_font(&format!("bold {}px sans-serif", (m.radius * 1.2).max(8.0).round()));
        ctx.set_text_align("center");
        ctx.set_text_baseline("middle");
        let _ = ctx.fill_text(&letter.to_string(), at.x, at.y);
    }
    ctx.set_global_alpha(1.0);
}

#[function_component(GardenCanvas)]
pub fn garden_canvas(props: &GardenCanvasProps) -> Html {
    let canvas_ref = use_node_ref();
    let camera = use_mut_ref(Camera::default);
    let interaction = use_mut_ref(InteractionState::default);
    let press = use_mut_ref(Press::default);
    let image = use_mut_ref(|| None::<HtmlImageElement>);
    let draw_ref = use_mut_ref(|| None::<Rc<dyn Fn()>>);
    // Latest props for the long-lived listeners.
    let props_ref = use_mut_ref(|| props.clone());
    *props_ref.borrow_mut() = props.clone();

    let redraw = {
        let draw_ref = draw_ref.clone();
        move || {
            if let Some(f) = &*draw_ref.borrow() {
                f();
            }
        }
    };

    // Mount: draw closure, listeners, resize.
    {
        let canvas_ref = canvas_ref.clone();
        let camera = camera.clone();
        let interaction = interaction.clone();
        let press = press.clone();
        let image = image.clone();
        let draw_ref = draw_ref.clone();
        let props_ref = props_ref.clone();
        use_effect_with((), move |_| {
            let window = web_sys::window();
            let canvas = canvas_ref.cast::<HtmlCanvasElement>();
            let mut listeners: Vec<(web_sys::EventTarget, &'static str, Closure<dyn FnMut(web_sys::Event)>)> =
                Vec::new();

            if let (Some(window), Some(canvas)) = (window, canvas) {
                let draw: Rc<dyn Fn()> = {
                    let canvas = canvas.clone();
                    let camera = camera.clone();
                    let interaction = interaction.clone();
                    let press = press.clone();
                    let image = image.clone();
                    let props_ref = props_ref.clone();
                    Rc::new(move || {
                        if !canvas.is_connected() {
                            return;
                        }
                        let Some(ctx) = canvas
                            .get_context("2d")
                            .ok()
                            .flatten()
                            .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
                        else {
                            return;
                        };
                        let props = props_ref.borrow();
                        let cam = camera.borrow();
                        let w = canvas.width() as f64;
                        let h = canvas.height() as f64;
                        let bg_color = props
                            .state
                            .garden
                            .as_ref()
                            .map_or("#0e1116", |g| g.background_color.as_str());
                        let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
                        ctx.set_fill_style_str(bg_color);
                        ctx.fill_rect(0.0, 0.0, w, h);
                        let [a, b, c, d, e, f] = cam.transform.affine().as_coeffs();
                        let _ = ctx.set_transform(a, b, c, d, e, f);
                        if let Some(img) = &*image.borrow() {
                            if img.complete() && img.natural_width() > 0 {
                                let _ = ctx.draw_image_with_html_image_element(img, 0.0, 0.0);
                            }
                        }
                        let ui = interaction.borrow();
                        let drag = press.borrow().drag;
                        for m in markers_for(&props) {
                            let at = match drag {
                                Some((id, _, pos)) if id == m.plant_id => pos,
                                _ => m.center(),
                            };
                            let highlighted =
                                ui.hovered == Some(m.plant_id) || ui.selected == Some(m.plant_id);
                            draw_marker(&ctx, &m, at, highlighted);
                        }
                    })
                };
                *draw_ref.borrow_mut() = Some(draw.clone());

                let fit_canvas = {
                    let canvas = canvas.clone();
                    let window = window.clone();
                    let camera = camera.clone();
                    let props_ref = props_ref.clone();
                    move || {
                        let header = props_ref.borrow().header_height;
                        let width = window
                            .inner_width()
                            .ok()
                            .and_then(|v| v.as_f64())
                            .unwrap_or(800.0);
                        let height = window
                            .inner_height()
                            .ok()
                            .and_then(|v| v.as_f64())
                            .unwrap_or(600.0)
                            - header;
                        let viewport = Viewport::new(width, height);
                        canvas.set_width(viewport.width as u32);
                        canvas.set_height(viewport.height as u32);
                        camera.borrow_mut().resize(viewport);
                    }
                };
                fit_canvas();
                camera.borrow_mut().reset();
                draw();

                let canvas_target: web_sys::EventTarget = canvas.clone().into();
                let window_target: web_sys::EventTarget = window.clone().into();

                // Wheel zoom at the pointer
                let wheel_cb = {
                    let camera = camera.clone();
                    let draw = draw.clone();
                    Closure::wrap(Box::new(move |e: web_sys::Event| {
                        let Some(e) = e.dyn_ref::<web_sys::WheelEvent>() else {
                            return;
                        };
                        e.prevent_default();
                        let pointer = Point::new(e.offset_x() as f64, e.offset_y() as f64);
                        camera.borrow_mut().wheel_zoom(pointer, e.delta_y());
                        draw();
                    }) as Box<dyn FnMut(_)>)
                };
                listeners.push((canvas_target.clone(), "wheel", wheel_cb));

                let mousedown_cb = {
                    let camera = camera.clone();
                    let interaction = interaction.clone();
                    let press = press.clone();
                    let props_ref = props_ref.clone();
                    let draw = draw.clone();
                    Closure::wrap(Box::new(move |e: web_sys::Event| {
                        let Some(e) = e.dyn_ref::<web_sys::MouseEvent>() else {
                            return;
                        };
                        let view = Point::new(e.offset_x() as f64, e.offset_y() as f64);
                        let mut p = press.borrow_mut();
                        *p = Press {
                            down: true,
                            start: view,
                            travelled: 0.0,
                            drag: None,
                        };
                        let world = camera.borrow().transform.view_to_world(view);
                        let markers = markers_for(&props_ref.borrow());
                        if let (0, Some(hit)) = (e.button(), marker_at(&markers, world)) {
                            p.drag = Some((hit.plant_id, world - hit.center(), hit.center()));
                            interaction
                                .borrow_mut()
                                .dispatch(MarkerCommand::DragStart { plant_id: hit.plant_id });
                        } else {
                            camera
                                .borrow_mut()
                                .begin_pan(e.client_x() as f64, e.client_y() as f64);
                        }
                        drop(p);
                        draw();
                    }) as Box<dyn FnMut(_)>)
                };
                listeners.push((canvas_target.clone(), "mousedown", mousedown_cb));

                let mousemove_cb = {
                    let camera = camera.clone();
                    let interaction = interaction.clone();
                    let press = press.clone();
                    let props_ref = props_ref.clone();
                    let draw = draw.clone();
                    Closure::wrap(Box::new(move |e: web_sys::Event| {
                        let Some(e) = e.dyn_ref::<web_sys::MouseEvent>() else {
                            return;
                        };
                        let view = Point::new(e.offset_x() as f64, e.offset_y() as f64);
                        {
                            let mut p = press.borrow_mut();
                            if p.down {
                                p.travelled = p.travelled.max((view - p.start).hypot());
                            }
                            let drag = p.drag;
                            if let Some((id, grab, _)) = drag {
                                let world = camera.borrow().transform.view_to_world(view);
                                p.drag = Some((id, grab, world - grab));
                                drop(p);
                                draw();
                                return;
                            }
                        }
                        if camera
                            .borrow_mut()
                            .pan_to(e.client_x() as f64, e.client_y() as f64)
                        {
                            draw();
                            return;
                        }
                        let world = camera.borrow().transform.view_to_world(view);
                        let props = props_ref.borrow().clone();
                        let markers = markers_for(&props);
                        let hit = marker_at(&markers, world).map(|m| m.plant_id);
                        let mut ui = interaction.borrow_mut();
                        if ui.hovered != hit {
                            if let Some(prev) = ui.hovered {
                                ui.dispatch(MarkerCommand::Hover { plant_id: prev, hovering: false });
                            }
                            if let Some(id) = hit {
                                ui.dispatch(MarkerCommand::Hover { plant_id: id, hovering: true });
                            }
                            drop(ui);
                            props.on_hover.emit(hit);
                            draw();
                        }
                    }) as Box<dyn FnMut(_)>)
                };
                listeners.push((canvas_target.clone(), "mousemove", mousemove_cb));

                let mouseup_cb = {
                    let camera = camera.clone();
                    let interaction = interaction.clone();
                    let press = press.clone();
                    let props_ref = props_ref.clone();
                    let draw = draw.clone();
                    Closure::wrap(Box::new(move |_e: web_sys::Event| {
                        camera.borrow_mut().end_pan();
                        let p = std::mem::take(&mut *press.borrow_mut());
                        if !p.down {
                            return;
                        }
                        let clicked = p.travelled < CLICK_SLOP;
                        let props = props_ref.borrow().clone();
                        match p.drag {
                            Some((plant_id, _, _)) if clicked => {
                                let mut ui = interaction.borrow_mut();
                                ui.dragging = None;
                                ui.dispatch(MarkerCommand::Click { plant_id });
                                drop(ui);
                                props.on_select.emit(Some(plant_id));
                            }
                            Some((plant_id, _, pos)) => {
                                let moved = interaction.borrow_mut().dispatch(MarkerCommand::DragEnd {
                                    plant_id,
                                    x: pos.x,
                                    y: pos.y,
                                });
                                if let Some(m) = moved {
                                    props.on_move.emit(m);
                                }
                            }
                            None if clicked => {
                                interaction.borrow_mut().selected = None;
                                props.on_select.emit(None);
                                if props.armed {
                                    let world = camera.borrow().transform.view_to_world(p.start);
                                    props.on_place.emit(world);
                                }
                            }
                            None => {}
                        }
                        draw();
                    }) as Box<dyn FnMut(_)>)
                };
                listeners.push((window_target.clone(), "mouseup", mouseup_cb));

                let contextmenu_cb = Closure::wrap(Box::new(move |e: web_sys::Event| {
                    e.prevent_default();
                }) as Box<dyn FnMut(_)>);
                listeners.push((canvas_target.clone(), "contextmenu", contextmenu_cb));

                // Resize, then refit once layout settles.
                let resize_cb = {
                    let camera = camera.clone();
                    let props_ref = props_ref.clone();
                    let window = window.clone();
                    let draw = draw.clone();
                    Closure::wrap(Box::new(move |_e: web_sys::Event| {
                        fit_canvas();
                        draw();
                        let refit = {
                            let camera = camera.clone();
                            let draw = draw.clone();
                            Closure::once_into_js(move || {
                                let mut cam = camera.borrow_mut();
                                if cam.refit_pending && cam.reset() {
                                    drop(cam);
                                    draw();
                                }
                            })
                        };
                        let delay = props_ref.borrow().refit_delay_ms;
                        if window
                            .set_timeout_with_callback_and_timeout_and_arguments_0(
                                refit.unchecked_ref(),
                                delay,
                            )
                            .is_err()
                        {
                            tracing::warn!("could not schedule refit after resize");
                        }
                    }) as Box<dyn FnMut(_)>)
                };
                listeners.push((window_target, "resize", resize_cb));

                for (target, kind, cb) in &listeners {
                    if target
                        .add_event_listener_with_callback(kind, cb.as_ref().unchecked_ref())
                        .is_err()
                    {
                        tracing::warn!(kind, "could not attach canvas listener");
                    }
                }
            } else {
                tracing::error!("garden canvas mounted without a window or canvas element");
            }

            move || {
                for (target, kind, cb) in &listeners {
                    let _ = target.remove_event_listener_with_callback(kind, cb.as_ref().unchecked_ref());
                }
                *draw_ref.borrow_mut() = None;
            }
        });
    }

    // Background image: load, seed dimensions, fit.
    {
        let camera = camera.clone();
        let image = image.clone();
        let state = props.state.clone();
        let redraw = redraw.clone();
        let url = props
            .state
            .garden
            .as_ref()
            .map(|g| g.background_image_url.clone())
            .filter(|u| !u.is_empty());
        use_effect_with(url, move |url| {
            let mut handlers: Option<(Closure<dyn FnMut()>, Closure<dyn FnMut()>)> = None;
            *image.borrow_mut() = None;
            match (url, HtmlImageElement::new()) {
                (Some(url), Ok(img)) => {
                    let on_load = {
                        let img = img.clone();
                        let camera = camera.clone();
                        let redraw = redraw.clone();
                        Closure::wrap(Box::new(move || {
                            let dims = BackgroundDimensions::new(
                                img.natural_width() as f64,
                                img.natural_height() as f64,
                            );
                            tracing::debug!(?dims, "garden image loaded");
                            state.dispatch(GardenAction::SetBackground(dims));
                            let mut cam = camera.borrow_mut();
                            cam.set_background(dims);
                            cam.reset();
                            drop(cam);
                            redraw();
                        }) as Box<dyn FnMut()>)
                    };
                    let on_error = {
                        let url = url.clone();
                        Closure::wrap(Box::new(move || {
                            tracing::error!(%url, "failed to load garden image");
                        }) as Box<dyn FnMut()>)
                    };
                    img.set_onload(Some(on_load.as_ref().unchecked_ref()));
                    img.set_onerror(Some(on_error.as_ref().unchecked_ref()));
                    img.set_src(url);
                    *image.borrow_mut() = Some(img);
                    handlers = Some((on_load, on_error));
                }
                (Some(url), Err(_)) => tracing::error!(%url, "could not create image element"),
                (None, _) => {
                    camera.borrow_mut().set_background(None);
                    redraw();
                }
            }
            move || {
                if let Some(img) = &*image.borrow() {
                    img.set_onload(None);
                    img.set_onerror(None);
                }
                drop(handlers);
            }
        });
    }

    // Redraw on any state or settings change.
    {
        let redraw = redraw.clone();
        use_effect_with((props.state.version, props.show_letters), move |_| {
            redraw();
            || ()
        });
    }

    let zoom_in = {
        let camera = camera.clone();
        let redraw = redraw.clone();
        Callback::from(move |()| {
            camera.borrow_mut().zoom_in();
            redraw();
        })
    };
    let zoom_out = {
        let camera = camera.clone();
        let redraw = redraw.clone();
        Callback::from(move |()| {
            camera.borrow_mut().zoom_out();
            redraw();
        })
    };
    let fit = {
        let camera = camera.clone();
        let redraw = redraw.clone();
        Callback::from(move |()| {
            if camera.borrow_mut().reset() {
                redraw();
            }
        })
    };

    let cursor = if props.armed { "crosshair" } else { "grab" };
    html! {<div style="position:relative; width:100%; height:100%;">
        <canvas ref={canvas_ref} id="garden-canvas" style={format!("display:block; width:100%; height:100%; cursor:{cursor};")}></canvas>
        <ZoomControls on_zoom_in={zoom_in} on_zoom_out={zoom_out} on_fit={fit} />
    </div>}
}
