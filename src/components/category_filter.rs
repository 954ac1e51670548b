use std::collections::BTreeSet;

use yew::prelude::*;

use crate::model::PlantCategory;

#[derive(Properties, PartialEq, Clone)]
pub struct CategoryRowProps {
    pub category: PlantCategory,
    pub checked: bool,
    pub count: usize,
    pub on_toggle: Callback<PlantCategory>,
}

#[function_component(CategoryRow)]
pub fn category_row(props: &CategoryRowProps) -> Html {
    let onchange = {
        let cb = props.on_toggle.clone();
        let category = props.category;
        Callback::from(move |_: Event| cb.emit(category))
    };
    html! { <label style="display:flex; align-items:center; gap:8px; margin:3px 0; cursor:pointer;">
        <input type="checkbox" checked={props.checked} {onchange} />
        <span style="display:inline-block; width:16px; text-align:center; font-weight:600; border:1px solid #30363d; border-radius:2px;">{ props.category.letter() }</span>
        <span>{ props.category.label() }</span>
        <span style="margin-left:auto; color:#8b949e;">{ props.count }</span>
    </label> }
}

#[derive(Properties, PartialEq, Clone)]
pub struct CategoryFilterProps {
    pub visible: BTreeSet<PlantCategory>,
    /// Plants per category in the open garden.
    pub counts: Vec<(PlantCategory, usize)>,
    pub on_toggle: Callback<PlantCategory>,
    pub on_show_all: Callback<()>,
}

#[function_component(CategoryFilter)]
pub fn category_filter(props: &CategoryFilterProps) -> Html {
    let show_all = {
        let cb = props.on_show_all.clone();
        Callback::from(move |_: MouseEvent| cb.emit(()))
    };
    let count_of = |c: PlantCategory| {
        props
            .counts
            .iter()
            .find(|(k, _)| *k == c)
            .map_or(0, |(_, n)| *n)
    };
    html! {<div style="position:absolute; left:12px; bottom:12px; background:rgba(22,27,34,0.9); border:1px solid #30363d; border-radius:8px; padding:8px; min-width:170px;">
        <div style="display:flex; justify-content:space-between; align-items:center; font-weight:600; margin-bottom:4px;">
            <span>{"Categories"}</span>
            { if props.visible.len() < PlantCategory::ALL.len() {
                html!{ <button style="font-size:11px; padding:2px 6px;" onclick={show_all}>{"All"}</button> }
            } else { html!{} } }
        </div>
        { for PlantCategory::ALL.into_iter().map(|c| html!{
            <CategoryRow category={c} checked={props.visible.contains(&c)} count={count_of(c)} on_toggle={props.on_toggle.clone()} />
        }) }
    </div>}
}
