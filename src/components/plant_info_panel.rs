use uuid::Uuid;
use yew::prelude::*;

use crate::model::{Plant, PlantStatus, Variety};
use crate::state::markers::status_stroke;
use crate::util::format_meters;

#[derive(Properties, PartialEq, Clone)]
pub struct PlantInfoPanelProps {
    pub plant: Option<Plant>,
    pub variety: Option<Variety>,
    /// Only shown for the selected plant, not a hovered one.
    #[prop_or_default]
    pub on_delete: Option<Callback<Uuid>>,
    #[prop_or_default]
    pub on_status: Option<Callback<(Uuid, PlantStatus)>>,
}

const STATUSES: [PlantStatus; 4] = [
    PlantStatus::Planted,
    PlantStatus::Healthy,
    PlantStatus::Sick,
    PlantStatus::Dead,
];

#[function_component]
pub fn PlantInfoPanel(props: &PlantInfoPanelProps) -> Html {
    let Some(plant) = &props.plant else {
        return html! {};
    };

    let panel_style = "position:absolute; right:12px; top:12px; \
        background:rgba(22,27,34,0.95); border:1px solid #30363d; border-radius:8px; \
        padding:12px 16px; min-width:240px; max-width:280px; font-size:13px; color:#c9d1d9;";
    let header_style = "font-weight:600; font-size:15px; margin-bottom:8px; display:flex; align-items:center; gap:8px;";
    let section_style = "margin-top:10px; padding-top:8px; border-top:1px solid #30363d;";
    let row_style = "display:flex; justify-content:space-between; margin:4px 0; font-size:12px;";
    let label_style = "color:#8b949e;";

    let row = |label: &'static str, value: String| {
        html! { <div style={row_style}><span style={label_style}>{label}</span><span>{value}</span></div> }
    };

    let swatch = props
        .variety
        .as_ref()
        .and_then(|v| v.main_color.clone())
        .unwrap_or_else(|| "#ffffff".into());
    let stroke = match status_stroke(plant.status) {
        "transparent" => "#30363d",
        s => s,
    };

    let variety_section = match &props.variety {
        Some(v) => html! { <div style={section_style}>
            { row("Variety", v.name.clone()) }
            { row("Category", v.category.label().to_owned()) }
            { v.scientific_name.clone().map(|s| row("Species", s)).unwrap_or_default() }
            { v.harvest_period.clone().map(|s| row("Harvest", s)).unwrap_or_default() }
            { v.reference_url.clone().map(|u| html!{
                <div style={row_style}><span style={label_style}>{"Reference"}</span><a href={u} target="_blank" style="color:#58a6ff;">{"link"}</a></div>
            }).unwrap_or_default() }
        </div> },
        None => html! { <div style={section_style}><span style={label_style}>{"Unknown variety"}</span></div> },
    };

    let actions = if props.on_delete.is_some() || props.on_status.is_some() {
        let id = plant.id;
        let status_buttons = props.on_status.as_ref().map(|cb| {
            html! { <div style="display:flex; gap:4px; flex-wrap:wrap;">
                { for STATUSES.into_iter().map(|s| {
                    let cb = cb.clone();
                    let onclick = Callback::from(move |_: MouseEvent| cb.emit((id, s)));
                    html!{ <button disabled={s == plant.status} style="font-size:11px; padding:2px 6px;" {onclick}>{ s.label() }</button> }
                }) }
            </div> }
        });
        let delete = props.on_delete.as_ref().map(|cb| {
            let cb = cb.clone();
            let onclick = Callback::from(move |_: MouseEvent| {
                let confirmed = web_sys::window()
                    .and_then(|w| w.confirm_with_message("Delete this plant?").ok())
                    .unwrap_or(true);
                if confirmed {
                    cb.emit(id);
                }
            });
            html! { <button style="background:#f85149; border:1px solid #b62324; color:#fff; margin-top:6px;" {onclick}>{"Delete plant"}</button> }
        });
        html! { <div style={section_style}>{ status_buttons.unwrap_or_default() }{ delete.unwrap_or_default() }</div> }
    } else {
        html! {}
    };

    html! {<div style={panel_style}>
        <div style={header_style}>
            <span style={format!("display:inline-block; width:14px; height:14px; border-radius:50%; background:{swatch}; border:2px solid {stroke};")}></span>
            <span>{ &plant.name }</span>
        </div>
        { if plant.description.is_empty() { html!{} } else { html!{ <div style="font-size:12px; opacity:0.8;">{ &plant.description }</div> } } }
        <div style={section_style}>
            { row("Status", plant.status.label().to_owned()) }
            { row("Width", format_meters(plant.width)) }
            { row("Height", format_meters(plant.height)) }
            { plant.planted_date.map(|d| row("Planted", d.format("%Y-%m-%d").to_string())).unwrap_or_default() }
        </div>
        { variety_section }
        { actions }
    </div>}
}
