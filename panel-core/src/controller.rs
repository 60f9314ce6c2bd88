//! Drives the panel: mounts the view, runs the two independent data sources and
//! funnels every completion through the reducer.
//!
//! All methods must be called from within a tokio runtime.

use parking_lot::Mutex;
use std::{
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::sync::watch;

use crate::{
    config::Config,
    fetcher::PrimaryFetcher,
    location::{LocationProvider, LocationResolver},
    provider::{HttpDataSource, HttpImageProbe, ImageLoadObserver, NominatimGeocoder},
    scheduler::{Scheduler, Task, TaskHandle, TokioScheduler},
    state::{Event, ViewState, reduce},
    store::{CacheSlot, KeyValueStore},
    view::{RenderOptions, ViewModel, render},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTrigger {
    Startup,
    Timer,
    Manual,
}

/// Everything the controller talks to.
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub fetcher: PrimaryFetcher,
    pub resolver: LocationResolver,
    pub image_observer: Arc<dyn ImageLoadObserver>,
    pub scheduler: Arc<dyn Scheduler>,
}

impl Collaborators {
    /// The production wiring: HTTP for every remote resource and a tokio interval timer.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        location: Arc<dyn LocationProvider>,
    ) -> anyhow::Result<Self> {
        let source = HttpDataSource::new(&config.api_base_url);
        let geocoder =
            NominatimGeocoder::new(&config.geocoder_base_url, config.user_agent.clone())?;
        let cache = CacheSlot::new(store, config.cache_key.clone());

        Ok(Self {
            fetcher: PrimaryFetcher::new(Arc::new(source), cache),
            resolver: LocationResolver::new(location, Arc::new(geocoder)),
            image_observer: Arc::new(HttpImageProbe::new()),
            scheduler: Arc::new(TokioScheduler),
        })
    }
}

#[derive(Debug, Clone)]
pub struct StatusController {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    deps: Collaborators,
    render: RenderOptions,
    poll_interval: Duration,
    state: Mutex<ViewState>,
    updates: watch::Sender<ViewState>,
    timer: Mutex<Option<TaskHandle>>,
}

impl StatusController {
    pub fn new(deps: Collaborators, render: RenderOptions, poll_interval: Duration) -> Self {
        let (updates, _) = watch::channel(ViewState::default());
        Self {
            inner: Arc::new(Inner {
                deps,
                render,
                poll_interval,
                state: Mutex::new(ViewState::default()),
                updates,
                timer: Mutex::new(None),
            }),
        }
    }

    pub fn from_config(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        location: Arc<dyn LocationProvider>,
    ) -> anyhow::Result<Self> {
        let deps = Collaborators::from_config(config, store, location)?;
        Ok(Self::new(deps, config.render_options()?, config.poll_interval()?))
    }

    pub fn fetcher(&self) -> &PrimaryFetcher {
        &self.inner.deps.fetcher
    }

    pub fn resolver(&self) -> &LocationResolver {
        &self.inner.deps.resolver
    }

    pub fn state(&self) -> ViewState {
        self.inner.state.lock().clone()
    }

    pub fn view(&self) -> ViewModel {
        render(&self.state(), &self.inner.render)
    }

    pub fn render_options(&self) -> &RenderOptions {
        &self.inner.render
    }

    /// Receives every state the reducer produces.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.inner.updates.subscribe()
    }

    /// Starts location resolution and the first fetch, then the poll timer.
    /// Mounting an already mounted view does nothing.
    pub fn mount(&self) {
        let epoch = {
            let mut state = self.inner.state.lock();
            if state.mounted {
                return;
            }
            self.apply(&mut state, Event::Mounted);
            state.epoch
        };

        tracing::info!(epoch, interval = ?self.inner.poll_interval, "Mounting status panel");

        self.spawn_location(epoch);
        self.start_fetch(FetchTrigger::Startup);

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let task: Task = Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                StatusController { inner }.start_fetch(FetchTrigger::Timer);
            }
        });
        let handle = self.inner.deps.scheduler.every(self.inner.poll_interval, task);

        if let Some(mut previous) = self.inner.timer.lock().replace(handle) {
            previous.cancel();
        }
    }

    /// Cancels the timer. Requests still in flight complete into the void.
    pub fn unmount(&self) {
        if let Some(mut timer) = self.inner.timer.lock().take() {
            timer.cancel();
        }
        self.dispatch(Event::Unmounted);
        tracing::info!("Status panel unmounted");
    }

    /// User-initiated refresh. Returns `false` without doing anything while a
    /// fetch is already loading or the view is not mounted.
    pub fn refresh(&self) -> bool {
        self.start_fetch(FetchTrigger::Manual).is_some()
    }

    fn start_fetch(&self, trigger: FetchTrigger) -> Option<u64> {
        let (seq, epoch) = {
            let mut state = self.inner.state.lock();
            if !state.mounted || (trigger == FetchTrigger::Manual && state.loading) {
                tracing::debug!(?trigger, "Fetch not started");
                return None;
            }
            let seq = state.next_seq();
            self.apply(&mut state, Event::FetchStarted { seq });
            (seq, state.epoch)
        };

        tracing::debug!(seq, ?trigger, "Starting primary fetch");

        let this = self.clone();
        tokio::spawn(async move {
            let outcome = this.inner.deps.fetcher.fetch_or_cached().await;
            this.dispatch_for(epoch, Event::FetchCompleted { seq, outcome });
        });

        Some(seq)
    }

    fn spawn_location(&self, epoch: u64) {
        let this = self.clone();
        tokio::spawn(async move {
            let resolver = &this.inner.deps.resolver;

            let coords = match resolver.coordinates().await {
                Ok(coords) => coords,
                Err(e) => {
                    tracing::info!("Location unavailable: {}", e);
                    this.dispatch_for(epoch, Event::LocationFailed(e.to_string()));
                    return;
                }
            };
            this.dispatch_for(epoch, Event::LocationAcquired(coords));

            let image = this.clone();
            let url = this.inner.render.map.url(coords);
            tokio::spawn(async move {
                let event = match image.inner.deps.image_observer.wait_loaded(&url).await {
                    Ok(()) => Event::MapImageLoaded,
                    Err(e) => Event::MapImageFailed(e.to_string()),
                };
                image.dispatch_for(epoch, event);
            });

            let event = match resolver.describe(coords).await {
                Ok(info) => Event::LocationResolved(info),
                Err(e) => {
                    tracing::warn!("Reverse geocoding failed: {}", e);
                    Event::LocationFailed(e.to_string())
                }
            };
            this.dispatch_for(epoch, event);
        });
    }

    fn dispatch(&self, event: Event) {
        let mut state = self.inner.state.lock();
        self.apply(&mut state, event);
    }

    /// Drops the event if the view has been remounted since `epoch`.
    fn dispatch_for(&self, epoch: u64, event: Event) {
        let mut state = self.inner.state.lock();
        if state.epoch != epoch {
            tracing::debug!(epoch, current = state.epoch, "Dropping event from an earlier mount");
            return;
        }
        self.apply(&mut state, event);
    }

    /// Publishes while still holding the lock so subscribers see states in reducer order.
    fn apply(&self, state: &mut ViewState, event: Event) {
        let next = reduce(std::mem::take(state), event);
        *state = next.clone();
        self.inner.updates.send_replace(next);
    }
}
