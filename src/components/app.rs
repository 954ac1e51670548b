use std::rc::Rc;

use chrono::Utc;
use kurbo::Point;
use uuid::Uuid;
use web_sys::HtmlSelectElement;
use yew::prelude::*;

use super::category_filter::CategoryFilter;
use super::garden_canvas::GardenCanvas;
use super::garden_form::{GardenForm, NewGarden};
use super::plant_info_panel::PlantInfoPanel;
use super::plant_toolbar::PlantToolbar;
use super::settings_modal::SettingsModal;
use crate::backend::{Backend, LocalBackend};
use crate::config::AppConfig;
use crate::error::GardenError;
use crate::model::{
    ColorTheme, Garden, GardenAction, GardenState, OWNER_ROLE, PlantCategory, PlantStatus,
    Profile, Settings, User,
};
use crate::services::{
    self, GardenService, PlantForm, PlantService, ProfileService, SettingsService,
    SettingsUpdateForm, TeamService, VarietyForm, VarietyService,
};
use crate::state::{PlantMove, Scale, Session, SessionAction};

/// Session handle shared with components through context.
pub type SessionContext = UseReducerHandle<Session>;

/// Footprint of a freshly placed plant, in meters.
const NEW_PLANT_SIZE_M: f64 = 0.5;

struct Services {
    gardens: GardenService,
    plants: PlantService,
    varieties: VarietyService,
    profiles: ProfileService,
    settings: SettingsService,
    teams: TeamService,
}

impl Services {
    fn new(backend: Rc<dyn Backend>) -> Self {
        Self {
            gardens: GardenService::new(backend.clone()),
            plants: PlantService::new(backend.clone()),
            varieties: VarietyService::new(backend.clone()),
            profiles: ProfileService::new(backend.clone()),
            settings: SettingsService::new(backend.clone()),
            teams: TeamService::new(backend),
        }
    }
}

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

/// The browser's stable local identity, created on first visit.
fn local_user(config: &AppConfig) -> User {
    let key = config.storage_key("user");
    let store = local_storage();
    let stored = store
        .as_ref()
        .and_then(|s| s.get_item(&key).ok().flatten())
        .and_then(|raw| Uuid::parse_str(&raw).ok());
    let id = stored.unwrap_or_else(|| {
        let id = Uuid::new_v4();
        if let Some(s) = &store {
            let _ = s.set_item(&key, &id.to_string());
        }
        id
    });
    User { id, email: None }
}

fn remembered_garden(config: &AppConfig) -> Option<Uuid> {
    local_storage()
        .and_then(|s| s.get_item(&config.storage_key("garden")).ok().flatten())
        .and_then(|raw| Uuid::parse_str(&raw).ok())
}

fn remember_garden(config: &AppConfig, id: Option<Uuid>) {
    let Some(store) = local_storage() else {
        return;
    };
    let key = config.storage_key("garden");
    let _ = match id {
        Some(id) => store.set_item(&key, &id.to_string()),
        None => store.remove_item(&key),
    };
}

fn report(e: &GardenError) {
    tracing::error!(error = %e, "request failed");
    if let Some(w) = web_sys::window() {
        let _ = w.alert_with_message(&e.to_string());
    }
}

fn open_garden(
    services: &Services,
    state: &UseReducerHandle<GardenState>,
    config: &AppConfig,
    garden: Option<Garden>,
) {
    let id = garden.as_ref().map(|g| g.id);
    state.dispatch(GardenAction::SetGarden(garden));
    remember_garden(config, id);
    if let Some(id) = id {
        match services.plants.fetch_plants(id) {
            Ok(plants) => state.dispatch(GardenAction::SetPlants(plants)),
            Err(e) => tracing::error!(%id, error = %e, "could not load plants"),
        }
    }
}

fn theme_style(theme: Option<ColorTheme>) -> &'static str {
    match theme {
        Some(ColorTheme::Light) => "background:#f6f8fa; color:#1f2328;",
        _ => "background:#0e1116; color:#c9d1d9;",
    }
}

#[function_component(App)]
pub fn app() -> Html {
    let config = use_memo((), |_| AppConfig::load());
    let services = {
        let config = config.clone();
        use_memo((), move |_| {
            let backend: Rc<dyn Backend> = Rc::new(LocalBackend::load(&config));
            Services::new(backend)
        })
    };
    let session = use_reducer(Session::anonymous);
    let garden_state = use_reducer(GardenState::default);
    let gardens = use_state(Vec::<Garden>::new);
    let profile = use_state(|| None::<Profile>);
    let settings = use_state(|| None::<Settings>);
    let is_owner = use_state(|| false);
    let armed = use_state(|| None::<Uuid>);
    let hovered = use_state(|| None::<Uuid>);
    let selected = use_state(|| None::<Uuid>);
    let creating = use_state(|| false);
    let open_settings = use_state(|| false);

    // Sign in the local user and load the catalog and garden list.
    {
        let config = config.clone();
        let services = services.clone();
        let session = session.clone();
        let garden_state = garden_state.clone();
        let gardens = gardens.clone();
        use_effect_with((), move |_| {
            session.dispatch(SessionAction::SignedIn(local_user(&config)));
            match services.varieties.fetch_varieties() {
                Ok(v) => garden_state.dispatch(GardenAction::SetVarieties(v)),
                Err(e) => tracing::error!(error = %e, "could not load varieties"),
            }
            match services.gardens.fetch_gardens() {
                Ok(list) => {
                    let wanted = remembered_garden(&config);
                    let first = list
                        .iter()
                        .find(|g| Some(g.id) == wanted)
                        .or_else(|| list.first())
                        .cloned();
                    open_garden(&services, &garden_state, &config, first);
                    gardens.set(list);
                }
                Err(e) => tracing::error!(error = %e, "could not load gardens"),
            }
            || ()
        });
    }

    // Profile and settings rows follow the session.
    {
        let services = services.clone();
        let profile = profile.clone();
        let settings = settings.clone();
        use_effect_with((*session).clone(), move |session| {
            if session.is_authenticated() {
                match services.profiles.ensure_profile(session) {
                    Ok(p) => profile.set(Some(p)),
                    Err(e) => tracing::error!(error = %e, "could not load profile"),
                }
                match services.settings.ensure_settings(session) {
                    Ok(s) => settings.set(Some(s)),
                    Err(e) => tracing::error!(error = %e, "could not load settings"),
                }
            } else {
                profile.set(None);
                settings.set(None);
            }
            || ()
        });
    }

    {
        let services = services.clone();
        let is_owner = is_owner.clone();
        let garden_id = garden_state.garden.as_ref().map(|g| g.id);
        use_effect_with(((*session).clone(), garden_id), move |(session, garden_id)| {
            let owner = match garden_id {
                Some(id) => services.teams.is_owner(session, *id).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "could not determine garden ownership");
                    false
                }),
                None => false,
            };
            is_owner.set(owner);
            || ()
        });
    }

    let select_garden = {
        let services = services.clone();
        let config = config.clone();
        let garden_state = garden_state.clone();
        let gardens = gardens.clone();
        let selected = selected.clone();
        Callback::from(move |e: Event| {
            let value = e.target_unchecked_into::<HtmlSelectElement>().value();
            let id = Uuid::parse_str(&value).ok();
            let garden = gardens.iter().find(|g| Some(g.id) == id).cloned();
            selected.set(None);
            open_garden(&services, &garden_state, &config, garden);
        })
    };

    let create_garden = {
        let services = services.clone();
        let config = config.clone();
        let session = session.clone();
        let garden_state = garden_state.clone();
        let gardens = gardens.clone();
        let creating = creating.clone();
        Callback::from(move |new: NewGarden| {
            let form = services::GardenForm {
                name: new.name,
                position: Point::ZERO,
                background_color: new.background_color,
                image: new.image,
                pixels_per_meters: new.pixels_per_meters,
            };
            let garden = match services.gardens.add_garden(&form) {
                Ok(g) => g,
                Err(e) => return report(&e),
            };
            // The creator owns the garden through its first team.
            if let Ok(user) = session.require_user() {
                let owned = services
                    .teams
                    .create_team(garden.id, Some(garden.name.as_str()))
                    .and_then(|team| services.teams.add_team_member(team.id, user, Some(OWNER_ROLE)));
                if let Err(e) = owned {
                    tracing::warn!(error = %e, "garden created without an owner team");
                }
            }
            let mut list = (*gardens).clone();
            list.insert(0, garden.clone());
            gardens.set(list);
            creating.set(false);
            open_garden(&services, &garden_state, &config, Some(garden));
        })
    };

    let delete_garden = {
        let services = services.clone();
        let config = config.clone();
        let garden_state = garden_state.clone();
        let gardens = gardens.clone();
        Callback::from(move |_: MouseEvent| {
            let Some(garden) = garden_state.garden.clone() else {
                return;
            };
            let confirmed = web_sys::window()
                .and_then(|w| {
                    w.confirm_with_message(&format!("Delete the garden \"{}\"?", garden.name))
                        .ok()
                })
                .unwrap_or(false);
            if !confirmed {
                return;
            }
            if let Err(e) = services
                .gardens
                .delete_garden(garden.id, Some(garden.image_path.as_str()))
            {
                return report(&e);
            }
            let list: Vec<Garden> = gardens.iter().filter(|g| g.id != garden.id).cloned().collect();
            open_garden(&services, &garden_state, &config, list.first().cloned());
            gardens.set(list);
        })
    };

    let place_plant = {
        let services = services.clone();
        let garden_state = garden_state.clone();
        let armed = armed.clone();
        let selected = selected.clone();
        Callback::from(move |at: Point| {
            let (Some(variety_id), Some(garden)) = (*armed, garden_state.garden.as_ref()) else {
                return;
            };
            let Some(variety) = garden_state.variety(variety_id) else {
                return;
            };
            let form = PlantForm {
                name: variety.name.clone(),
                description: String::new(),
                status: PlantStatus::Planted,
                planted_date: Some(Utc::now().date_naive()),
                height: NEW_PLANT_SIZE_M,
                width: NEW_PLANT_SIZE_M,
                x_position: Some(at.x),
                y_position: Some(at.y),
                garden_id: Some(garden.id),
                variety_id,
            };
            match services.plants.add_plant(&form) {
                Ok(plant) => {
                    selected.set(Some(plant.id));
                    garden_state.dispatch(GardenAction::UpsertPlant(plant));
                }
                Err(e) => report(&e),
            }
        })
    };

    let move_plant = {
        let services = services.clone();
        let garden_state = garden_state.clone();
        Callback::from(move |m: PlantMove| {
            garden_state.dispatch(GardenAction::MovePlant {
                id: m.plant_id,
                x: m.x,
                y: m.y,
            });
            if let Err(e) = services.plants.move_plant(m.plant_id, m.x, m.y) {
                tracing::error!(plant = %m.plant_id, error = %e, "position not saved, reloading");
                if let Some(g) = &garden_state.garden {
                    if let Ok(plants) = services.plants.fetch_plants(g.id) {
                        garden_state.dispatch(GardenAction::SetPlants(plants));
                    }
                }
            }
        })
    };

    let set_status = {
        let services = services.clone();
        let garden_state = garden_state.clone();
        Callback::from(move |(id, status): (Uuid, PlantStatus)| {
            let Some(plant) = garden_state.plant(id) else {
                return;
            };
            let mut form = PlantForm::from(plant);
            form.status = status;
            match services.plants.update_plant(id, &form) {
                Ok(p) => garden_state.dispatch(GardenAction::UpsertPlant(p)),
                Err(e) => report(&e),
            }
        })
    };

    let delete_plant = {
        let services = services.clone();
        let garden_state = garden_state.clone();
        let selected = selected.clone();
        Callback::from(move |id: Uuid| match services.plants.delete_plant(id) {
            Ok(()) => {
                selected.set(None);
                garden_state.dispatch(GardenAction::RemovePlant(id));
            }
            Err(e) => report(&e),
        })
    };

    let add_variety = {
        let services = services.clone();
        let garden_state = garden_state.clone();
        let armed = armed.clone();
        Callback::from(move |form: VarietyForm| match services.varieties.add_variety(&form) {
            Ok(v) => {
                armed.set(Some(v.id));
                garden_state.dispatch(GardenAction::AddVariety(v));
            }
            Err(e) => report(&e),
        })
    };

    let save_settings = {
        let services = services.clone();
        let session = session.clone();
        let settings = settings.clone();
        Callback::from(move |form: SettingsUpdateForm| {
            match services.settings.update_settings(&session, &form) {
                Ok(s) => settings.set(Some(s)),
                Err(e) => report(&e),
            }
        })
    };

    let on_arm = {
        let armed = armed.clone();
        Callback::from(move |id: Option<Uuid>| armed.set(id))
    };
    let on_hover = {
        let hovered = hovered.clone();
        Callback::from(move |id: Option<Uuid>| hovered.set(id))
    };
    let on_select = {
        let selected = selected.clone();
        Callback::from(move |id: Option<Uuid>| selected.set(id))
    };
    let toggle_category = {
        let garden_state = garden_state.clone();
        Callback::from(move |c: PlantCategory| garden_state.dispatch(GardenAction::ToggleCategory(c)))
    };
    let show_all = {
        let garden_state = garden_state.clone();
        Callback::from(move |()| garden_state.dispatch(GardenAction::ShowAllCategories))
    };
    let start_create = {
        let creating = creating.clone();
        Callback::from(move |_: MouseEvent| creating.set(true))
    };
    let cancel_create = {
        let creating = creating.clone();
        Callback::from(move |()| creating.set(false))
    };
    let show_settings = {
        let open_settings = open_settings.clone();
        Callback::from(move |_: MouseEvent| open_settings.set(true))
    };
    let close_settings = {
        let open_settings = open_settings.clone();
        Callback::from(move |()| open_settings.set(false))
    };

    let counts: Vec<(PlantCategory, usize)> = PlantCategory::ALL
        .into_iter()
        .map(|c| {
            let n = garden_state
                .plants
                .iter()
                .filter(|p| {
                    garden_state
                        .variety(p.variety_id)
                        .map_or(PlantCategory::Other, |v| v.category)
                        == c
                })
                .count();
            (c, n)
        })
        .collect();

    // Hover wins over selection; actions only for the selected plant.
    let shown = (*hovered).or(*selected);
    let shown_plant = shown.and_then(|id| garden_state.plant(id)).cloned();
    let shown_variety = shown_plant
        .as_ref()
        .and_then(|p| garden_state.variety(p.variety_id))
        .cloned();
    let actionable = shown.is_some() && shown == *selected;

    let show_letters = (*settings).as_ref().is_some_and(Settings::show_letters);
    let theme = (*settings).as_ref().and_then(Settings::color_theme);
    let header = config.header_height;
    let default_scale = Scale::or(config.default_pixels_per_meter, Scale::default());
    let current_id = garden_state.garden.as_ref().map(|g| g.id);
    let user_label = (*profile)
        .as_ref()
        .map(Profile::display_name)
        .unwrap_or_else(|| "Signed out".into());

    html! {
    <ContextProvider<SessionContext> context={session.clone()}>
        <div style={format!("position:relative; width:100vw; height:100vh; overflow:hidden; {}", theme_style(theme))}>
            <div id="top-bar" style={format!("height:{header}px; box-sizing:border-box; display:flex; align-items:center; gap:10px; padding:0 16px; border-bottom:1px solid #30363d;")}>
                <strong style="font-size:18px;">{"Garden planner"}</strong>
                <select onchange={select_garden}>
                    <option value="" selected={current_id.is_none()}>{"Choose a garden"}</option>
                    { for gardens.iter().map(|g| html!{
                        <option value={g.id.to_string()} selected={Some(g.id) == current_id}>{ &g.name }</option>
                    }) }
                </select>
                <button onclick={start_create}>{"New garden"}</button>
                { if *is_owner { html!{ <button onclick={delete_garden}>{"Delete garden"}</button> } } else { html!{} } }
                <span style="margin-left:auto; opacity:0.8;">{ user_label }</span>
                <button onclick={show_settings}>{"Settings"}</button>
            </div>
            <div style={format!("position:relative; height:calc(100vh - {header}px);")}>
                { if garden_state.garden.is_some() { html!{ <>
                    <GardenCanvas
                        state={garden_state.clone()}
                        show_letters={show_letters}
                        header_height={header}
                        refit_delay_ms={config.refit_delay_ms}
                        default_scale={default_scale}
                        armed={armed.is_some()}
                        on_place={place_plant}
                        on_move={move_plant}
                        on_hover={on_hover}
                        on_select={on_select}
                    />
                    <PlantToolbar varieties={garden_state.varieties.clone()} armed={*armed} on_arm={on_arm} on_add_variety={add_variety} />
                    <CategoryFilter visible={garden_state.visible.clone()} counts={counts} on_toggle={toggle_category} on_show_all={show_all} />
                    <PlantInfoPanel
                        plant={shown_plant}
                        variety={shown_variety}
                        on_delete={actionable.then_some(delete_plant)}
                        on_status={actionable.then_some(set_status)}
                    />
                </> } } else { html!{
                    <div style="height:100%; display:flex; align-items:center; justify-content:center; opacity:0.7;">
                        {"Create a garden from a plan or aerial photo to get started."}
                    </div>
                } } }
            </div>
            { if *creating { html!{
                <GardenForm default_pixels_per_meter={default_scale.get()} on_submit={create_garden} on_cancel={cancel_create} />
            } } else { html!{} } }
            <SettingsModal show={*open_settings} on_close={close_settings} settings={(*settings).clone()} on_save={save_settings} />
        </div>
    </ContextProvider<SessionContext>>
    }
}
