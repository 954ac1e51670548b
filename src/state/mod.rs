pub mod interaction;
pub mod markers;
pub mod session;
pub mod units;
pub mod viewport;

pub use interaction::{InteractionState, MarkerCommand, PlantMove};
pub use markers::{Marker, marker_at, project_markers};
pub use session::{Session, SessionAction};
pub use units::Scale;
pub use viewport::{BackgroundDimensions, Camera, Viewport};
