// Marker events as explicit commands, dispatched through one function.
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MarkerCommand {
    Click { plant_id: Uuid },
    DragStart { plant_id: Uuid },
    /// `x`/`y` are the drop position in image pixels.
    DragEnd { plant_id: Uuid, x: f64, y: f64 },
    Hover { plant_id: Uuid, hovering: bool },
}

/// Position update to forward to the plant service.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlantMove {
    pub plant_id: Uuid,
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InteractionState {
    pub hovered: Option<Uuid>,
    pub selected: Option<Uuid>,
    pub dragging: Option<Uuid>,
}

impl InteractionState {
    pub fn dispatch(&mut self, cmd: MarkerCommand) -> Option<PlantMove> {
        match cmd {
            MarkerCommand::Click { plant_id } => {
                tracing::debug!(%plant_id, "plant clicked");
                self.selected = Some(plant_id);
                None
            }
            MarkerCommand::DragStart { plant_id } => {
                tracing::debug!(%plant_id, "plant drag started");
                self.dragging = Some(plant_id);
                None
            }
            MarkerCommand::DragEnd { plant_id, x, y } => {
                if self.dragging != Some(plant_id) {
                    return None;
                }
                self.dragging = None;
                if !(x.is_finite() && y.is_finite()) {
                    return None;
                }
                tracing::debug!(%plant_id, x, y, "plant drag ended");
                Some(PlantMove { plant_id, x, y })
            }
            MarkerCommand::Hover { plant_id, hovering } => {
                if hovering {
                    self.hovered = Some(plant_id);
                } else if self.hovered == Some(plant_id) {
                    self.hovered = None;
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_end_moves_only_the_dragged_plant() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut st = InteractionState::default();
        assert_eq!(st.dispatch(MarkerCommand::DragEnd { plant_id: a, x: 1.0, y: 2.0 }), None);
        st.dispatch(MarkerCommand::DragStart { plant_id: a });
        assert_eq!(st.dispatch(MarkerCommand::DragEnd { plant_id: b, x: 1.0, y: 2.0 }), None);
        assert_eq!(st.dragging, Some(a));
        assert_eq!(
            st.dispatch(MarkerCommand::DragEnd { plant_id: a, x: 5.0, y: 6.0 }),
            Some(PlantMove { plant_id: a, x: 5.0, y: 6.0 })
        );
        assert_eq!(st.dragging, None);
    }

    #[test]
    fn hover_out_only_clears_matching_plant() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut st = InteractionState::default();
        st.dispatch(MarkerCommand::Hover { plant_id: a, hovering: true });
        st.dispatch(MarkerCommand::Hover { plant_id: b, hovering: false });
        assert_eq!(st.hovered, Some(a));
        st.dispatch(MarkerCommand::Hover { plant_id: a, hovering: false });
        assert_eq!(st.hovered, None);
        st.dispatch(MarkerCommand::Click { plant_id: b });
        assert_eq!(st.selected, Some(b));
    }
}
