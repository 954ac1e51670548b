use garden_planner::components::App;
use garden_planner::config::AppConfig;
use garden_planner::util;

fn main() {
    util::init_logging(AppConfig::load().level());
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "garden planner starting");
    yew::Renderer::<App>::new().render();
}
