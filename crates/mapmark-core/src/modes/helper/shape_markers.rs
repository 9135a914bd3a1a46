use crate::MapMark;
use crate::events::{EditAction, EventContext, Flow, PointerEvent, PointerEventName, SystemEvent};
use crate::features::{FeatureId, LngLat, SourceName};
use crate::modes::{HelperModeName, Mode, ModeName};

#[derive(Debug, Clone)]
struct Capture {
    feature: FeatureId,
    lng_lat: LngLat,
}

/// Turns pointer presses on features into marker gestures for the running
/// edit modes.
#[derive(Debug, Default)]
pub struct ShapeMarkersMode {
    capture: Option<Capture>,
}

impl ShapeMarkersMode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send a gesture to every running edit mode. Stops at the first mode
    /// that consumes it.
    fn notify(ctx: &mut MapMark, action: EditAction) -> Flow {
        let edit_modes: Vec<_> = ctx
            .active_modes()
            .into_iter()
            .filter_map(|mode| match mode {
                ModeName::Edit(mode) => Some(mode),
                _ => None,
            })
            .collect();
        for mode in edit_modes {
            let event = SystemEvent::Edit {
                mode,
                action: action.clone(),
            };
            if ctx.fire(event) == Flow::Stop {
                return Flow::Stop;
            }
        }
        Flow::Next
    }

    fn has_edit_mode(ctx: &MapMark) -> bool {
        ctx.active_modes()
            .iter()
            .any(|mode| matches!(mode, ModeName::Edit(_)))
    }

    fn press(&mut self, ctx: &mut MapMark, event: &PointerEvent) -> Flow {
        if !Self::has_edit_mode(ctx) {
            return Flow::Next;
        }
        let Some(feature) = ctx
            .feature_by_pointer(event, &[SourceName::Main])
            .filter(|feature| feature.shape().as_shape().is_some())
            .map(|feature| feature.id().clone())
        else {
            return Flow::Next;
        };

        self.capture = Some(Capture {
            feature: feature.clone(),
            lng_lat: event.lng_lat,
        });
        ctx.update_mode_flags(self.mode(), |flags| flags.action_in_progress = true);
        Self::notify(
            ctx,
            EditAction::MarkerCaptured {
                feature,
                lng_lat: event.lng_lat,
            },
        );
        Flow::Stop
    }

    fn release(&mut self, ctx: &mut MapMark) -> Flow {
        let Some(capture) = self.capture.take() else {
            return Flow::Next;
        };
        ctx.update_mode_flags(self.mode(), |flags| flags.action_in_progress = false);
        Self::notify(
            ctx,
            EditAction::MarkerReleased {
                feature: capture.feature,
            },
        );
        Flow::Stop
    }
}

impl Mode for ShapeMarkersMode {
    fn mode(&self) -> ModeName {
        ModeName::Helper(HelperModeName::ShapeMarkers)
    }

    fn pointer_events(&self) -> &'static [PointerEventName] {
        &[
            PointerEventName::MouseDown,
            PointerEventName::MouseMove,
            PointerEventName::MouseUp,
        ]
    }

    fn on_start_action(&mut self, _ctx: &mut MapMark) {}

    fn on_end_action(&mut self, ctx: &mut MapMark) {
        self.release(ctx);
    }

    fn handle_pointer(&mut self, ctx: &mut MapMark, event: &PointerEvent) -> Flow {
        match event.kind {
            PointerEventName::MouseDown => self.press(ctx, event),
            PointerEventName::MouseMove => match &self.capture {
                Some(capture) => {
                    let action = EditAction::MarkerMove {
                        feature: capture.feature.clone(),
                        lng_lat_start: capture.lng_lat,
                        lng_lat_end: event.lng_lat,
                    };
                    Self::notify(ctx, action)
                }
                None => Flow::Next,
            },
            PointerEventName::MouseUp => self.release(ctx),
            _ => Flow::Next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;
    use crate::features::{CreateFeature, Feature, Geometry};
    use crate::modes::EditModeName;
    use crate::options::Options;
    use kurbo::Point;

    fn pointer(kind: PointerEventName, lng: f64, lat: f64) -> PointerEvent {
        PointerEvent::new(kind, Point::new(lng * 100.0, -lat * 100.0), [lng, lat])
    }

    #[test]
    fn test_press_without_edit_mode_is_ignored() {
        let mut ctx = MapMark::new(Options::default(), MemoryAdapter::new());
        ctx.init().unwrap();
        let feature = Feature::new(Geometry::Point { coordinates: [1.0, 1.0] });
        ctx.create_feature(CreateFeature::new(feature, SourceName::Main));
        ctx.enable_mode(ModeName::Helper(HelperModeName::ShapeMarkers));

        let flow = ctx.handle_pointer(pointer(PointerEventName::MouseDown, 1.0, 1.0));
        assert_eq!(flow, Flow::Next);
        assert_eq!(
            ctx.mode_flags(ModeName::Helper(HelperModeName::ShapeMarkers))
                .map(|flags| flags.action_in_progress),
            Some(false)
        );
    }

    #[test]
    fn test_pointer_gesture_drags_feature() {
        let mut ctx = MapMark::new(Options::default(), MemoryAdapter::new());
        ctx.init().unwrap();
        let feature = Feature::new(Geometry::Point { coordinates: [1.0, 1.0] });
        let id = ctx
            .create_feature(CreateFeature::new(feature, SourceName::Main))
            .unwrap()
            .id;
        ctx.enable_mode(ModeName::Edit(EditModeName::Drag));

        ctx.handle_pointer(pointer(PointerEventName::MouseDown, 1.0, 1.0));
        assert!(ctx.features().has(SourceName::Temporary, &id));
        ctx.handle_pointer(pointer(PointerEventName::MouseMove, 1.5, 1.0));
        ctx.handle_pointer(pointer(PointerEventName::MouseMove, 2.0, 2.0));
        ctx.handle_pointer(pointer(PointerEventName::MouseUp, 2.0, 2.0));

        let moved = ctx.features().get(SourceName::Main, &id).unwrap();
        assert_eq!(moved.geometry(), &Geometry::Point { coordinates: [2.0, 2.0] });
    }
}
