use web_sys::HtmlSelectElement;
use yew::prelude::*;

use crate::model::Settings;
use crate::services::SettingsUpdateForm;
use crate::state::Session;

#[derive(Properties, PartialEq, Clone)]
pub struct SettingsModalProps {
    pub show: bool,
    pub on_close: Callback<()>,
    pub settings: Option<Settings>,
    pub on_save: Callback<SettingsUpdateForm>,
}

const THEMES: [(&str, &str); 3] = [("system", "System"), ("light", "Light"), ("dark", "Dark")];

#[function_component]
pub fn SettingsModal(props: &SettingsModalProps) -> Html {
    let session = use_context::<UseReducerHandle<Session>>();
    // Start from the stored row: saving writes every field.
    let draft = {
        let settings = props.settings.clone();
        use_state(move || settings.as_ref().map(SettingsUpdateForm::from).unwrap_or_default())
    };
    {
        let draft = draft.clone();
        use_effect_with(props.settings.clone(), move |settings| {
            draft.set(settings.as_ref().map(SettingsUpdateForm::from).unwrap_or_default());
            || ()
        });
    }

    if !props.show {
        return html! {};
    }

    let close_cb = {
        let cb = props.on_close.clone();
        Callback::from(move |_: MouseEvent| cb.emit(()))
    };
    let toggle_letters = {
        let draft = draft.clone();
        Callback::from(move |_: MouseEvent| {
            let mut next = (*draft).clone();
            next.show_markers_letters = Some(!next.show_markers_letters.unwrap_or(false));
            draft.set(next);
        })
    };
    let change_theme = {
        let draft = draft.clone();
        Callback::from(move |e: Event| {
            let value = e.target_unchecked_into::<HtmlSelectElement>().value();
            let mut next = (*draft).clone();
            next.default_color_theme = Some(value);
            draft.set(next);
        })
    };
    let save_cb = {
        let draft = draft.clone();
        let on_save = props.on_save.clone();
        let on_close = props.on_close.clone();
        Callback::from(move |_: MouseEvent| {
            on_save.emit((*draft).clone());
            on_close.emit(());
        })
    };

    let theme = draft.default_color_theme.clone().unwrap_or_else(|| "system".into());
    let account = session
        .as_ref()
        .and_then(|s| s.user.clone())
        .map(|u| u.email.unwrap_or_else(|| u.id.to_string()))
        .unwrap_or_else(|| "Not signed in".into());

    html! {<div style="position:absolute; inset:0; display:flex; align-items:center; justify-content:center; background:rgba(0,0,0,0.55); z-index:50;">
        <div style="background:#161b22; border:1px solid #30363d; border-radius:12px; padding:16px 20px; min-width:340px; max-width:480px; display:flex; flex-direction:column; gap:14px;">
            <div style="display:flex; justify-content:space-between; align-items:center;">
                <h3 style="margin:0; font-size:18px;">{"Settings"}</h3>
                <button onclick={close_cb.clone()} style="padding:4px 8px;">{"Close"}</button>
            </div>
            <div style="display:flex; flex-direction:column; gap:10px;">
                <label style="display:flex; align-items:center; gap:8px; cursor:pointer;">
                    <input type="checkbox" checked={draft.show_markers_letters.unwrap_or(false)} onclick={toggle_letters} />
                    <span>{"Show category letters on markers"}</span>
                </label>
                <label style="display:flex; align-items:center; gap:8px;">
                    <span>{"Colour theme"}</span>
                    <select onchange={change_theme}>
                        { for THEMES.iter().map(|(value, label)| html!{
                            <option value={*value} selected={theme == *value}>{ *label }</option>
                        }) }
                    </select>
                </label>
            </div>
            <div style="display:flex; gap:8px;">
                <button onclick={save_cb} style="flex:1;">{"Save"}</button>
                <button onclick={close_cb} style="flex:0 0 auto;">{"Cancel"}</button>
            </div>
            <div style="font-size:11px; line-height:1.4; opacity:0.7;">{ format!("Account: {account}") }</div>
        </div>
    </div>}
}
