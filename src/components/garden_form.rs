use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{FileReader, HtmlImageElement, HtmlInputElement};
use yew::prelude::*;

use crate::services::ImageUpload;

/// What the form collects; the caller turns it into a `GardenForm`.
#[derive(Clone, Debug, PartialEq)]
pub struct NewGarden {
    pub name: String,
    pub pixels_per_meters: f64,
    pub background_color: String,
    pub image: ImageUpload,
}

#[derive(Properties, PartialEq, Clone)]
pub struct GardenFormProps {
    pub default_pixels_per_meter: f64,
    pub on_submit: Callback<NewGarden>,
    pub on_cancel: Callback<()>,
}

/// Reads the file as a data URL, then decodes it once to learn its natural size.
fn read_image(file: web_sys::File, done: Callback<Option<ImageUpload>>) {
    let Ok(reader) = FileReader::new() else {
        done.emit(None);
        return;
    };
    let reader = Rc::new(reader);
    let on_read = {
        let reader = reader.clone();
        let done = done.clone();
        Closure::once_into_js(move || {
            let Some(data_url) = reader.result().ok().and_then(|v| v.as_string()) else {
                tracing::error!("file reader returned no data");
                done.emit(None);
                return;
            };
            let Ok(img) = HtmlImageElement::new() else {
                done.emit(None);
                return;
            };
            let on_load = {
                let img = img.clone();
                let data_url = data_url.clone();
                let done = done.clone();
                Closure::once_into_js(move || {
                    done.emit(Some(ImageUpload {
                        data_url,
                        width: img.natural_width() as f64,
                        height: img.natural_height() as f64,
                    }));
                })
            };
            let on_error = {
                let done = done.clone();
                Closure::once_into_js(move || {
                    tracing::error!("selected file is not a readable image");
                    done.emit(None);
                })
            };
            img.set_onload(Some(on_load.unchecked_ref()));
            img.set_onerror(Some(on_error.unchecked_ref()));
            img.set_src(&data_url);
        })
    };
    reader.set_onload(Some(on_read.unchecked_ref()));
    if reader.read_as_data_url(&file).is_err() {
        tracing::error!("could not read selected file");
        done.emit(None);
    }
}

#[function_component]
pub fn GardenForm(props: &GardenFormProps) -> Html {
    let name_ref = use_node_ref();
    let scale_ref = use_node_ref();
    let color_ref = use_node_ref();
    let image = use_state(|| None::<ImageUpload>);
    let loading = use_state(|| false);

    let on_file = {
        let image = image.clone();
        let loading = loading.clone();
        Callback::from(move |e: Event| {
            let input = e.target_unchecked_into::<HtmlInputElement>();
            let Some(file) = input.files().and_then(|f| f.get(0)) else {
                image.set(None);
                return;
            };
            loading.set(true);
            let image = image.clone();
            let loading = loading.clone();
            read_image(
                file,
                Callback::from(move |upload: Option<ImageUpload>| {
                    image.set(upload);
                    loading.set(false);
                }),
            );
        })
    };

    let submit = {
        let name_ref = name_ref.clone();
        let scale_ref = scale_ref.clone();
        let color_ref = color_ref.clone();
        let image = image.clone();
        let default_scale = props.default_pixels_per_meter;
        let cb = props.on_submit.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            let Some(upload) = (*image).clone() else {
                return;
            };
            let name = name_ref
                .cast::<HtmlInputElement>()
                .map(|i| i.value().trim().to_owned())
                .unwrap_or_default();
            if name.is_empty() {
                return;
            }
            let pixels_per_meters = scale_ref
                .cast::<HtmlInputElement>()
                .and_then(|i| i.value().parse::<f64>().ok())
                .unwrap_or(default_scale);
            let background_color = color_ref
                .cast::<HtmlInputElement>()
                .map(|i| i.value())
                .unwrap_or_else(|| "#ffffff".into());
            cb.emit(NewGarden {
                name,
                pixels_per_meters,
                background_color,
                image: upload,
            });
        })
    };
    let cancel = {
        let cb = props.on_cancel.clone();
        Callback::from(move |_: MouseEvent| cb.emit(()))
    };

    let image_note = match (&*image, *loading) {
        (_, true) => "Reading image…".to_owned(),
        (Some(img), false) => format!("{} × {} px", img.width, img.height),
        (None, false) => "Choose a plan or aerial photo".to_owned(),
    };

    html! {<div style="position:absolute; inset:0; display:flex; align-items:center; justify-content:center; background:rgba(0,0,0,0.55); z-index:40;">
        <form onsubmit={submit} style="background:#161b22; border:1px solid #30363d; border-radius:12px; padding:16px 20px; min-width:340px; display:flex; flex-direction:column; gap:10px;">
            <h3 style="margin:0; font-size:18px;">{"New garden"}</h3>
            <input ref={name_ref} placeholder="Name" />
            <label style="display:flex; gap:8px; align-items:center;">
                {"Pixels per meter"}
                <input ref={scale_ref} type="number" min="1" step="any" value={props.default_pixels_per_meter.to_string()} style="width:80px;" />
            </label>
            <label style="display:flex; gap:8px; align-items:center;">
                {"Background"}<input ref={color_ref} type="color" value="#ffffff" />
            </label>
            <input type="file" accept="image/*" onchange={on_file} />
            <div style="font-size:11px; opacity:0.7;">{ image_note }</div>
            <div style="display:flex; gap:8px;">
                <button type="submit" disabled={image.is_none() || *loading} style="flex:1;">{"Create"}</button>
                <button type="button" onclick={cancel}>{"Cancel"}</button>
            </div>
        </form>
    </div>}
}
