use yew::prelude::*;

#[derive(Properties, PartialEq, Clone)]
pub struct ZoomControlsProps {
    pub on_zoom_in: Callback<()>,
    pub on_zoom_out: Callback<()>,
    pub on_fit: Callback<()>,
}

#[function_component(ZoomControls)]
pub fn zoom_controls(props: &ZoomControlsProps) -> Html {
    let emit = |cb: &Callback<()>| {
        let cb = cb.clone();
        Callback::from(move |_: MouseEvent| cb.emit(()))
    };
    html! {<div style="position:absolute; right:12px; bottom:12px; background:rgba(22,27,34,0.9); border:1px solid #30363d; border-radius:8px; padding:8px; display:flex; flex-direction:column; gap:6px;">
        <button title="Zoom in" onclick={emit(&props.on_zoom_in)}>{"+"}</button>
        <button title="Zoom out" onclick={emit(&props.on_zoom_out)}>{"-"}</button>
        <button title="Fit garden to view" onclick={emit(&props.on_fit)}>{"Fit"}</button>
    </div>}
}
