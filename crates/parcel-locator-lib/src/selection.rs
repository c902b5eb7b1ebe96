//! SelectionController - click orchestration
//!
//! A click runs region lookup, then parcel lookup, then hands the result to the
//! [`HighlightPresenter`]. Every click restarts the pipeline and takes a new
//! generation number; a lookup that resumes after a newer click has started is
//! stale and its result is dropped without any visible effect.
//!
//! Callers that run clicks as background tasks take the generation with
//! [`SelectionController::begin`] in input order and only move
//! [`SelectionController::resolve`] into the task.

use crate::{
    Config, HighlightPresenter, LabelSurface, LookupError, Notice, ParcelInfo, ParcelStore,
    PolygonFeature, RegionCache, RegionLookup, ResourceFetcher, Result, TileRenderer,
    geometry::{self, EdgeLabel},
};
use geo::Point;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The resolved parcel and its edge labels
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub region_code: String,
    pub parcel: PolygonFeature,
    /// Labels of the edges at least `min_label_length_m` long, in ring order
    pub labels: Vec<EdgeLabel>,
}

impl Selection {
    pub fn new(
        region_code: impl Into<String>,
        parcel: PolygonFeature,
        min_label_length_m: f64,
    ) -> Result<Self> {
        let labels = geometry::edge_labels(&parcel, min_label_length_m)?;
        Ok(Self {
            region_code: region_code.into(),
            parcel,
            labels,
        })
    }
}

/// Controller state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Resolving,
    Selected,
    Failed,
}

/// What a click resolved to
#[derive(Debug, Clone)]
pub enum ClickOutcome {
    /// A parcel was found and is now highlighted
    Selected {
        region_code: String,
        parcel_code: String,
    },
    /// Region boundaries are not loaded
    NotReady,
    /// The click is outside every region
    OutsideCoverage,
    /// The region has no parcel at the click
    ParcelNotFound { region_code: String },
    /// The region's parcels could not be fetched
    Failed(LookupError),
    /// A newer click started before this one finished; nothing was shown
    Superseded,
}

/// A click that has taken its generation but not been resolved yet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingClick {
    generation: u64,
    point: Point<f64>,
}

impl PendingClick {
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn point(&self) -> Point<f64> {
        self.point
    }
}

struct Inner<R, S> {
    state: ControllerState,
    /// Generation of the most recent click (or clear)
    generation: u64,
    selection: Option<Arc<Selection>>,
    presenter: HighlightPresenter<R, S>,
}

/// Owns the single active selection and resolves clicks into it
pub struct SelectionController<F, R, S> {
    config: Config,
    regions: Arc<RegionCache>,
    parcels: ParcelStore<F>,
    inner: Mutex<Inner<R, S>>,
}

impl<F, R, S> SelectionController<F, R, S>
where
    F: ResourceFetcher,
    R: TileRenderer,
    S: LabelSurface,
{
    pub fn new(
        config: Config,
        regions: Arc<RegionCache>,
        parcels: ParcelStore<F>,
        renderer: R,
        surface: S,
    ) -> Self {
        let presenter = HighlightPresenter::new(renderer, surface, config.overlay_id.clone());
        Self {
            config,
            regions,
            parcels,
            inner: Mutex::new(Inner {
                state: ControllerState::Idle,
                generation: 0,
                selection: None,
                presenter,
            }),
        }
    }

    /// Convenience constructor building the caches from `config`
    pub fn with_fetcher(config: Config, fetcher: F, renderer: R, surface: S) -> Self {
        let regions = Arc::new(RegionCache::with_code_property(
            config.region_code_property.clone(),
        ));
        let parcels = ParcelStore::new(fetcher, config.clone());
        Self::new(config, regions, parcels, renderer, surface)
    }

    /// Load the region boundaries through the parcel store's fetcher
    pub async fn load_regions(&self) -> Result<()> {
        self.regions
            .load(self.parcels.fetcher(), &self.config.region_path)
            .await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn regions(&self) -> &RegionCache {
        &self.regions
    }

    pub fn parcels(&self) -> &ParcelStore<F> {
        &self.parcels
    }

    pub fn state(&self) -> ControllerState {
        self.lock().state
    }

    /// The active selection, if any
    pub fn selection(&self) -> Option<Arc<Selection>> {
        self.lock().selection.clone()
    }

    /// Run `f` with exclusive access to the presenter (and through it the
    /// renderer and surface)
    pub fn with_presenter<T>(&self, f: impl FnOnce(&mut HighlightPresenter<R, S>) -> T) -> T {
        f(&mut self.lock().presenter)
    }

    /// Forward a view-change notification to the presenter
    pub fn on_view_changed(&self) {
        self.lock().presenter.on_view_changed();
    }

    /// Drop the active selection and any in-flight resolution
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.presenter.clear();
        inner.selection = None;
        transition(&mut inner, ControllerState::Idle);
    }

    /// Resolve a click at `point` (lon/lat degrees)
    pub async fn click(&self, point: Point<f64>) -> ClickOutcome {
        let pending = self.begin(point);
        self.resolve(pending).await
    }

    /// Start a click: supersede older ones and clear the old highlight.
    ///
    /// The click's place in the last-click-wins order is fixed here, so call
    /// this in input order even when [`resolve`](Self::resolve) runs later.
    pub fn begin(&self, point: Point<f64>) -> PendingClick {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.presenter.clear();
        inner.selection = None;
        transition(&mut inner, ControllerState::Resolving);
        tracing::debug!(
            "Click #{} at ({:.6}, {:.6})",
            inner.generation,
            point.x(),
            point.y()
        );
        PendingClick {
            generation: inner.generation,
            point,
        }
    }

    /// Finish a click started with [`begin`](Self::begin)
    pub async fn resolve(&self, pending: PendingClick) -> ClickOutcome {
        let PendingClick { generation, point } = pending;
        if self.lock().generation != generation {
            return ClickOutcome::Superseded;
        }

        let region_code = match self.regions.locate(point) {
            RegionLookup::Found(code) => code,
            RegionLookup::NotReady => {
                return self.finish_without_selection(
                    generation,
                    Notice::BoundariesNotReady,
                    ClickOutcome::NotReady,
                );
            }
            RegionLookup::NotFound => {
                return self.finish_without_selection(
                    generation,
                    Notice::OutsideCoverage,
                    ClickOutcome::OutsideCoverage,
                );
            }
        };
        tracing::debug!("Click #{generation} is in region {region_code}");

        let lookup = self.parcels.locate(&region_code, point).await;

        let mut inner = self.lock();
        if inner.generation != generation {
            tracing::debug!("Discarding stale result of click #{generation}");
            return ClickOutcome::Superseded;
        }

        let parcel = match lookup {
            Ok(Some(parcel)) => parcel,
            Ok(None) => {
                let notice = Notice::ParcelNotFound {
                    region_code: region_code.clone(),
                };
                inner.presenter.surface_mut().show_notice(&notice);
                transition(&mut inner, ControllerState::Idle);
                return ClickOutcome::ParcelNotFound { region_code };
            }
            Err(error) => return fail(&mut inner, region_code, error),
        };

        let selection = match Selection::new(
            region_code.clone(),
            parcel,
            self.config.min_label_length_m,
        ) {
            Ok(selection) => Arc::new(selection),
            Err(error) => return fail(&mut inner, region_code, error),
        };

        let info = ParcelInfo::from_feature(&selection.parcel, &self.config.attribute_keys);
        inner.presenter.render(&selection);
        inner.presenter.surface_mut().render_attributes(&info);

        let parcel_code = selection.parcel.code().to_string();
        tracing::info!("Selected parcel {parcel_code} in region {region_code}");
        inner.selection = Some(selection);
        transition(&mut inner, ControllerState::Selected);

        ClickOutcome::Selected {
            region_code,
            parcel_code,
        }
    }

    fn finish_without_selection(
        &self,
        generation: u64,
        notice: Notice,
        outcome: ClickOutcome,
    ) -> ClickOutcome {
        let mut inner = self.lock();
        if inner.generation != generation {
            return ClickOutcome::Superseded;
        }
        inner.presenter.surface_mut().show_notice(&notice);
        transition(&mut inner, ControllerState::Idle);
        outcome
    }

    fn lock(&self) -> MutexGuard<'_, Inner<R, S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn fail<R: TileRenderer, S: LabelSurface>(
    inner: &mut Inner<R, S>,
    region_code: String,
    error: LookupError,
) -> ClickOutcome {
    transition(inner, ControllerState::Failed);
    tracing::warn!("Lookup in region {region_code} failed: {error}");
    let notice = Notice::DataUnavailable {
        region_code,
        reason: error.to_string(),
    };
    inner.presenter.surface_mut().show_notice(&notice);
    transition(inner, ControllerState::Idle);
    ClickOutcome::Failed(error)
}

fn transition<R, S>(inner: &mut Inner<R, S>, to: ControllerState) {
    if inner.state != to {
        tracing::trace!("Controller {:?} -> {:?}", inner.state, to);
        inner.state = to;
    }
}
