use uuid::Uuid;
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

use crate::model::{PlantCategory, Variety};
use crate::services::VarietyForm;

#[derive(Properties, PartialEq, Clone)]
pub struct PlantToolbarProps {
    pub varieties: Vec<Variety>,
    /// Variety placed by the next background click.
    pub armed: Option<Uuid>,
    pub on_arm: Callback<Option<Uuid>>,
    pub on_add_variety: Callback<VarietyForm>,
}

#[function_component]
pub fn PlantToolbar(props: &PlantToolbarProps) -> Html {
    let name_ref = use_node_ref();
    let color_ref = use_node_ref();
    let category = use_state(|| PlantCategory::Vegetable);
    let adding = use_state(|| false);

    let pick = {
        let cb = props.on_arm.clone();
        Callback::from(move |e: Event| {
            let value = e.target_unchecked_into::<HtmlSelectElement>().value();
            cb.emit(Uuid::parse_str(&value).ok());
        })
    };
    let disarm = {
        let cb = props.on_arm.clone();
        Callback::from(move |_: MouseEvent| cb.emit(None))
    };
    let toggle_adding = {
        let adding = adding.clone();
        Callback::from(move |_: MouseEvent| adding.set(!*adding))
    };
    let pick_category = {
        let category = category.clone();
        Callback::from(move |e: Event| {
            let value = e.target_unchecked_into::<HtmlSelectElement>().value();
            if let Some(c) = PlantCategory::parse(&value) {
                category.set(c);
            }
        })
    };
    let submit = {
        let name_ref = name_ref.clone();
        let color_ref = color_ref.clone();
        let category = category.clone();
        let adding = adding.clone();
        let cb = props.on_add_variety.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            let Some(name_input) = name_ref.cast::<HtmlInputElement>() else {
                return;
            };
            let name = name_input.value().trim().to_owned();
            if name.is_empty() {
                return;
            }
            let main_color = color_ref
                .cast::<HtmlInputElement>()
                .map(|i| i.value())
                .filter(|v| !v.is_empty());
            cb.emit(VarietyForm {
                name,
                scientific_name: None,
                harvest_period: None,
                main_color,
                reference_url: None,
                category: *category,
            });
            name_input.set_value("");
            adding.set(false);
        })
    };

    let armed_value = props.armed.map(|id| id.to_string()).unwrap_or_default();

    html! {<div style="position:absolute; left:12px; top:12px; background:rgba(22,27,34,0.9); border:1px solid #30363d; border-radius:8px; padding:8px; display:flex; flex-direction:column; gap:6px; min-width:220px;">
        <div style="display:flex; gap:6px; align-items:center;">
            <select onchange={pick} style="flex:1;">
                <option value="" selected={props.armed.is_none()}>{"Pick a variety to plant"}</option>
                { for props.varieties.iter().map(|v| {
                    let id = v.id.to_string();
                    html!{ <option value={id.clone()} selected={id == armed_value}>{ format!("{} ({})", v.name, v.category.letter()) }</option> }
                }) }
            </select>
            <button title="New variety" onclick={toggle_adding}>{ if *adding { "×" } else { "+" } }</button>
        </div>
        { if props.armed.is_some() { html!{
            <div style="font-size:11px; color:#8b949e; display:flex; justify-content:space-between; align-items:center;">
                <span>{"Click the garden to place it"}</span>
                <button style="font-size:11px; padding:2px 6px;" onclick={disarm}>{"Cancel"}</button>
            </div>
        } } else { html!{} } }
        { if *adding { html!{
            <form onsubmit={submit} style="display:flex; flex-direction:column; gap:4px; border-top:1px solid #30363d; padding-top:6px;">
                <input ref={name_ref} placeholder="Variety name" />
                <select onchange={pick_category}>
                    { for PlantCategory::ALL.into_iter().map(|c| html!{
                        <option value={c.as_str()} selected={c == *category}>{ c.label() }</option>
                    }) }
                </select>
                <label style="display:flex; gap:6px; align-items:center; font-size:12px;">
                    {"Colour"}<input ref={color_ref} type="color" value="#4ade80" />
                </label>
                <button type="submit">{"Add variety"}</button>
            </form>
        } } else { html!{} } }
    </div>}
}
