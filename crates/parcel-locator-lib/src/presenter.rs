//! HighlightPresenter - overlay and edge label lifecycle
//!
//! The overlay is a single renderer source that is created once and then only
//! has its data swapped, so switching parcels never flickers. Labels are owned
//! by the presenter for exactly as long as their selection is active, and the
//! view-change subscription lives exactly as long as there are labels to move.

use crate::{LabelHandle, LabelSurface, Selection, TileRenderer, ViewSubscription};
use geo::{MultiPolygon, Point};

/// A label element bound to an edge midpoint
#[derive(Debug, Clone)]
struct ActiveLabel {
    handle: LabelHandle,
    midpoint: Point<f64>,
    text: String,
}

/// Draws the active selection and keeps its labels in place
pub struct HighlightPresenter<R, S> {
    renderer: R,
    surface: S,
    overlay_id: String,
    /// Whether the overlay source exists on the renderer
    overlay_installed: bool,
    labels: Vec<ActiveLabel>,
    subscription: Option<ViewSubscription>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<R: TileRenderer, S: LabelSurface> HighlightPresenter<R, S> {
    pub fn new(renderer: R, surface: S, overlay_id: impl Into<String>) -> Self {
        Self {
            renderer,
            surface,
            overlay_id: overlay_id.into(),
            overlay_installed: false,
            labels: Vec::new(),
            subscription: None,
        }
    }

    /// Show `selection`, replacing whatever was shown before
    pub fn render(&mut self, selection: &Selection) {
        profiling::scope!("HighlightPresenter::render");

        // Old labels go before any new one is created
        self.destroy_labels();
        self.set_overlay(selection.parcel.geometry());

        for label in &selection.labels {
            let handle = self.surface.create_label();
            let text = format_length(label.length_m);
            let position = self.renderer.project_to_screen(label.midpoint);
            self.surface.position_label(handle, position, &text);
            self.labels.push(ActiveLabel {
                handle,
                midpoint: label.midpoint,
                text,
            });
        }

        if self.subscription.is_none() {
            self.subscription = Some(self.renderer.subscribe_view_changed());
        }

        tracing::debug!(
            "Highlighted parcel {} with {} edge labels",
            selection.parcel.code(),
            self.labels.len()
        );
    }

    /// Remove the highlight. Safe to call when nothing is shown.
    pub fn clear(&mut self) {
        self.destroy_labels();
        if self.overlay_installed {
            self.renderer
                .set_overlay_data(&self.overlay_id, &MultiPolygon::new(vec![]));
        }
        if let Some(subscription) = self.subscription.take() {
            self.renderer.unsubscribe_view_changed(subscription);
        }
    }

    /// Re-project every label after the view moved. Geometry is untouched.
    pub fn on_view_changed(&mut self) {
        profiling::scope!("HighlightPresenter::on_view_changed");

        for label in &self.labels {
            let position = self.renderer.project_to_screen(label.midpoint);
            self.surface
                .position_label(label.handle, position, &label.text);
        }
    }

    /// Number of label elements currently alive
    #[inline]
    pub fn active_labels(&self) -> usize {
        self.labels.len()
    }

    /// Whether view-change notifications are subscribed
    #[inline]
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Geographic anchors of the active labels, in edge order
    pub fn label_anchors(&self) -> Vec<Point<f64>> {
        self.labels.iter().map(|label| label.midpoint).collect()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    fn set_overlay(&mut self, geometry: &MultiPolygon<f64>) {
        if self.overlay_installed {
            self.renderer.set_overlay_data(&self.overlay_id, geometry);
        } else {
            self.renderer.add_overlay_source(&self.overlay_id, geometry);
            self.overlay_installed = true;
        }
    }

    fn destroy_labels(&mut self) {
        for label in self.labels.drain(..) {
            self.surface.destroy_label(label.handle);
        }
    }
}

/// Label text of an edge length: meters with one decimal
pub fn format_length(length_m: f64) -> String {
    format!("{length_m:.1}")
}
