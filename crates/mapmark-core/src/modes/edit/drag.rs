use crate::MapMark;
use crate::events::{EditAction, EventContext, Flow, SystemEvent};
use crate::features::{FeatureId, FeatureSnapshot, LngLat, SourceName};
use crate::modes::{EditModeName, Mode, ModeName};

/// Moves whole features along the marker gestures.
///
/// A captured feature lives in the temporary source until it is released.
#[derive(Debug, Default)]
pub struct DragMode {
    captured: Option<FeatureId>,
    previous_lng_lat: Option<LngLat>,
}

impl DragMode {
    pub fn new() -> Self {
        Self::default()
    }

    fn notify(ctx: &mut MapMark, action: EditAction) {
        ctx.fire(SystemEvent::Edit {
            mode: EditModeName::Drag,
            action,
        });
    }

    fn snapshot(ctx: &MapMark, id: &FeatureId) -> Option<FeatureSnapshot> {
        ctx.features().get_any(id).map(|feature| feature.snapshot())
    }

    fn capture(&mut self, ctx: &mut MapMark, id: &FeatureId) {
        if self.captured.is_some() {
            self.release(ctx);
        }
        if !ctx.change_source(id, SourceName::Temporary, true) {
            return;
        }
        self.captured = Some(id.clone());
        self.previous_lng_lat = None;
        ctx.update_mode_flags(self.mode(), |flags| flags.action_in_progress = true);

        if let Some(feature) = Self::snapshot(ctx, id) {
            log::debug!("Drag started on \"{}\"", feature.id);
            Self::notify(ctx, EditAction::FeatureEditStart { feature });
        }
    }

    fn drag(&mut self, ctx: &mut MapMark, id: &FeatureId, start: LngLat, end: LngLat) -> Flow {
        if self.captured.as_ref() != Some(id) {
            return Flow::Next;
        }
        let previous = *self.previous_lng_lat.get_or_insert(start);
        let Some(mut geometry) = ctx.features().get_any(id).map(|feature| feature.geometry().clone()) else {
            return Flow::Next;
        };
        geometry.translate(end[0] - previous[0], end[1] - previous[1]);

        let Some(old) = ctx.update_feature_geometry(id, geometry) else {
            return Flow::Next;
        };
        self.previous_lng_lat = Some(end);
        if let Some(feature) = Self::snapshot(ctx, id) {
            let new = feature.geojson.clone();
            Self::notify(ctx, EditAction::FeatureUpdated { feature, old, new });
        }
        Flow::Stop
    }

    fn release(&mut self, ctx: &mut MapMark) {
        let Some(id) = self.captured.take() else {
            return;
        };
        self.previous_lng_lat = None;
        ctx.change_source(&id, SourceName::Main, true);
        ctx.update_mode_flags(self.mode(), |flags| flags.action_in_progress = false);

        if let Some(feature) = Self::snapshot(ctx, &id) {
            log::debug!("Drag ended on \"{}\"", feature.id);
            Self::notify(ctx, EditAction::FeatureEditEnd { feature });
        }
    }
}

impl Mode for DragMode {
    fn mode(&self) -> ModeName {
        ModeName::Edit(EditModeName::Drag)
    }

    fn on_start_action(&mut self, _ctx: &mut MapMark) {}

    fn on_end_action(&mut self, ctx: &mut MapMark) {
        self.release(ctx);
    }

    fn handle_edit_event(&mut self, ctx: &mut MapMark, action: &EditAction) -> Flow {
        match action {
            EditAction::MarkerCaptured { feature, .. } => {
                self.capture(ctx, feature);
                Flow::Next
            }
            EditAction::MarkerMove {
                feature,
                lng_lat_start,
                lng_lat_end,
            } => self.drag(ctx, feature, *lng_lat_start, *lng_lat_end),
            EditAction::MarkerReleased { feature } if self.captured.as_ref() == Some(feature) => {
                self.release(ctx);
                Flow::Next
            }
            _ => Flow::Next,
        }
    }
}
