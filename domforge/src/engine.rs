use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::assets::{ContentFetcher, FileFetcher};
use crate::camera::Camera;
use crate::entities::Entity;
use crate::error::EngineError;
use crate::input::{Input, InputListener, InputState, KeyCallback};
use crate::math::Vec2;
use crate::scene::{Scene, SceneLogic};
use crate::surface::RenderSurface;
use crate::ui::{PanelId, UiHandler, UiPanel};
use crate::world::{EntityId, World};

/// Configuration values for the engine and its host window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Target tick rate in Hz.
    pub frame_rate: f64,
    /// Background shown around the world when the camera moves.
    pub void_color: String,
    /// Absolute axis value a gamepad stick must exceed to press `gamepad{n}_axis`.
    pub gamepad_deadzone: f32,
    /// Root directory the default [`FileFetcher`] reads panel markup from.
    pub asset_root: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "domforge".into(),
            width: 800,
            height: 600,
            frame_rate: 60.0,
            void_color: "#000000".into(),
            gamepad_deadzone: 0.1,
            asset_root: PathBuf::from("assets"),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[must_use]
    pub fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Parse a JSON document. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading engine config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing engine config {}", path.display()))
    }

    /// Minimum time between two processed ticks. A non-positive rate never throttles.
    pub fn frame_interval(&self) -> Duration {
        if self.frame_rate.is_finite() && self.frame_rate > 0.0 {
            Duration::from_secs_f64(1.0 / self.frame_rate)
        } else {
            Duration::ZERO
        }
    }
}

/// Scene change asked for from inside a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SceneRequest {
    Start(String),
    Stop,
}

struct FetchResult {
    panel: PanelId,
    result: Result<String, EngineError>,
}

/// Shared state handed to callbacks and scene hooks.
///
/// Owns the entity world, the render surface, the input subsystem, the optional camera and
/// the mounted UI panels.
pub struct EngineContext {
    world: World,
    surface: Box<dyn RenderSurface>,
    input: Input,
    camera: Option<Camera>,
    panels: BTreeMap<PanelId, UiPanel>,
    next_panel: u32,
    fetcher: Arc<dyn ContentFetcher>,
    fetch_tx: Sender<FetchResult>,
    fetch_rx: Receiver<FetchResult>,
    pending_scene: Option<SceneRequest>,
    delta_time: Duration,
    elapsed_time: Duration,
    frame_count: u64,
    fps: f32,
}

impl EngineContext {
    fn new(config: &EngineConfig, mut surface: Box<dyn RenderSurface>) -> Self {
        surface.set_void_color(&config.void_color);
        let (fetch_tx, fetch_rx) = crossbeam_channel::unbounded();
        Self {
            world: World::new(),
            surface,
            input: Input::new(config.gamepad_deadzone),
            camera: None,
            panels: BTreeMap::new(),
            next_panel: 1,
            fetcher: Arc::new(FileFetcher::new(config.asset_root.clone())),
            fetch_tx,
            fetch_rx,
            pending_scene: None,
            delta_time: Duration::ZERO,
            elapsed_time: Duration::ZERO,
            frame_count: 0,
            fps: 0.0,
        }
    }

    /// Store an entity and create its box. The box stays detached until [`EngineContext::attach`].
    pub fn spawn(&mut self, mut entity: Entity) -> EntityId {
        entity.realize(self.surface.as_mut());
        self.world.insert(entity)
    }

    /// Remove an entity and its box.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.world.remove(id)?;
        if let Some(node) = entity.node() {
            self.surface.detach(node);
            self.surface.remove_box(node);
        }
        Some(entity)
    }

    /// Add an entity to the render set and attach its box.
    pub fn attach(&mut self, id: EntityId) -> bool {
        if !self.world.attach(id) {
            return false;
        }
        if let Some(node) = self.world.get(id).and_then(Entity::node) {
            self.surface.attach(node);
        }
        true
    }

    pub fn detach(&mut self, id: EntityId) -> bool {
        if !self.world.detach(id) {
            return false;
        }
        if let Some(node) = self.world.get(id).and_then(Entity::node) {
            self.surface.detach(node);
        }
        true
    }

    /// Entities currently attached, in attach order.
    pub fn attached_entities(&self) -> &[EntityId] {
        self.world.attached()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.world.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.world.get_mut(id)
    }

    /// Borrow an entity together with the surface, for code that mutates and re-renders it.
    pub fn entity_and_surface(&mut self, id: EntityId) -> Option<(&mut Entity, &mut dyn RenderSurface)> {
        let entity = self.world.get_mut(id)?;
        let surface: &mut dyn RenderSurface = self.surface.as_mut();
        Some((entity, surface))
    }

    /// Switch an entity's animation state. Returns false if nothing changed.
    pub fn change_state(&mut self, id: EntityId, state: &str) -> bool {
        match self.entity_and_surface(id) {
            Some((entity, surface)) => entity.change_state(state, surface),
            None => false,
        }
    }

    pub fn set_position(&mut self, id: EntityId, x: f32, y: f32) -> bool {
        match self.entity_and_surface(id) {
            Some((entity, surface)) => entity.set_position(x, y, surface),
            None => false,
        }
    }

    /// Snapshot of normalized input. Read-only.
    pub fn input(&self) -> &InputState {
        self.input.state()
    }

    /// Handle for pushing raw input from outside the tick.
    pub fn input_listener(&self) -> InputListener {
        self.input.listener()
    }

    /// Register or replace the key-state entry for `key`.
    pub fn bind_key(&mut self, key: impl Into<String>, on_start: KeyCallback, on_stop: KeyCallback) {
        self.input.bindings_mut().insert(key, on_start, on_stop);
    }

    pub fn add_custom_input(
        &mut self,
        key: impl Into<String>,
        on_start: impl Fn(&mut EngineContext) + 'static,
        on_stop: impl Fn(&mut EngineContext) + 'static,
    ) {
        self.bind_key(key, std::rc::Rc::new(on_start), std::rc::Rc::new(on_stop));
    }

    /// Delete one key-state entry. Unknown keys are a no-op.
    pub fn remove_input_listeners(&mut self, key: &str) -> bool {
        self.input.bindings_mut().remove(key)
    }

    pub fn is_key_registered(&self, key: &str) -> bool {
        self.input.bindings().contains(key)
    }

    pub fn is_key_pressed(&self, key: &str) -> bool {
        self.input.bindings().is_pressed(key)
    }

    pub fn registered_keys(&self) -> impl Iterator<Item = &str> {
        self.input.bindings().keys()
    }

    /// Install a camera. Its void color becomes the container background.
    pub fn set_camera(&mut self, camera: Camera) {
        self.surface.set_void_color(camera.void_color());
        self.camera = Some(camera);
    }

    pub fn clear_camera(&mut self) -> Option<Camera> {
        self.camera.take()
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.camera.as_mut()
    }

    /// Mount a panel on the surface.
    pub fn add_panel(&mut self, mut panel: UiPanel) -> PanelId {
        let id = PanelId(self.next_panel);
        self.next_panel += 1;
        panel.mount(self.surface.as_mut());
        log::debug!("mounted panel '{}' as {id:?}", panel.tag());
        self.panels.insert(id, panel);
        id
    }

    pub fn remove_panel(&mut self, id: PanelId) -> Option<UiPanel> {
        let mut panel = self.panels.remove(&id)?;
        panel.unmount(self.surface.as_mut());
        Some(panel)
    }

    pub fn panel(&self, id: PanelId) -> Option<&UiPanel> {
        self.panels.get(&id)
    }

    /// Replace a panel's markup right away.
    pub fn set_panel_content(&mut self, id: PanelId, markup: impl Into<String>) -> bool {
        match self.panels.get_mut(&id) {
            Some(panel) => {
                panel.set_content(markup.into(), self.surface.as_mut());
                true
            }
            None => false,
        }
    }

    /// Load `url` through the content fetcher on a background thread.
    ///
    /// The markup is swapped into the panel at the start of the first tick after the fetch
    /// completes. A failed fetch is logged and leaves the panel as it was.
    pub fn require(&mut self, panel: PanelId, url: impl Into<String>) {
        let url = url.into();
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.fetch_tx.clone();
        log::debug!("fetching {url} for {panel:?}");
        std::thread::spawn(move || {
            let result = fetcher.fetch(&url);
            // The engine may be gone by now; nothing to deliver to.
            let _ = tx.send(FetchResult { panel, result });
        });
    }

    pub(crate) fn set_fetcher(&mut self, fetcher: Arc<dyn ContentFetcher>) {
        self.fetcher = fetcher;
    }

    /// Ask for a scene switch once the current tick finishes.
    pub fn request_scene(&mut self, name: impl Into<String>) {
        self.pending_scene = Some(SceneRequest::Start(name.into()));
    }

    /// Ask for the active scene to be stopped once the current tick finishes.
    pub fn request_stop(&mut self) {
        self.pending_scene = Some(SceneRequest::Stop);
    }

    pub fn surface(&self) -> &dyn RenderSurface {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> &mut dyn RenderSurface {
        self.surface.as_mut()
    }

    /// Container client size as reported by the surface.
    pub fn viewport_size(&self) -> Vec2 {
        self.surface.container_size()
    }

    /// Last FPS sample, `1 / delta` of the latest processed tick.
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Time between the two latest processed ticks.
    pub fn delta_time(&self) -> Duration {
        self.delta_time
    }

    /// Sum of processed tick deltas since start.
    pub fn elapsed_time(&self) -> Duration {
        self.elapsed_time
    }

    /// Number of processed ticks.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn update_time(&mut self, delta: Duration) {
        self.delta_time = delta;
        self.elapsed_time += delta;
        self.frame_count += 1;
        let secs = delta.as_secs_f32();
        self.fps = if secs > 0.0 { 1.0 / secs } else { 0.0 };
    }

    /// Apply queued raw input and finished fetches, then run UI handlers.
    fn begin_tick(&mut self) {
        let ui_events = self.input.drain();

        while let Ok(FetchResult { panel, result }) = self.fetch_rx.try_recv() {
            match result {
                Ok(markup) => {
                    if !self.set_panel_content(panel, markup) {
                        log::debug!("fetched content for removed panel {panel:?}");
                    }
                }
                Err(err) => log::error!("{err}"),
            }
        }

        for (tag, event) in ui_events {
            let handlers: Vec<UiHandler> = self
                .panels
                .values()
                .filter(|p| p.tag() == tag)
                .filter_map(|p| p.handler(&event))
                .collect();
            if handlers.is_empty() {
                log::debug!("no handler for '{event}' on panel '{tag}'");
            }
            for handler in handlers {
                handler(&mut *self);
            }
        }
    }

    fn dispatch_keys(&mut self) {
        for callback in self.input.bindings().due_callbacks() {
            callback(&mut *self);
        }
    }

    fn step_camera(&mut self) {
        if let Some(camera) = self.camera.as_mut() {
            camera.update(&self.world, self.surface.as_mut());
        }
    }
}

type UpdateCallback = Box<dyn FnMut(&mut EngineContext)>;

/// Frame scheduler and scene registry.
///
/// The engine does not own a clock. A host calls [`Engine::frame`] with the current time as
/// often as it likes; ticks closer together than the configured interval are skipped.
pub struct Engine {
    config: EngineConfig,
    frame_interval: Duration,
    last_frame: Option<Instant>,
    running: bool,
    scenes: HashMap<String, Scene>,
    active: Option<String>,
    update: Option<UpdateCallback>,
    ctx: EngineContext,
}

impl Engine {
    pub fn new(config: EngineConfig, surface: impl RenderSurface + 'static) -> Self {
        let ctx = EngineContext::new(&config, Box::new(surface));
        Self {
            frame_interval: config.frame_interval(),
            config,
            last_frame: None,
            running: false,
            scenes: HashMap::new(),
            active: None,
            update: None,
            ctx,
        }
    }

    /// Replace the default file-backed content fetcher.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: impl ContentFetcher + 'static) -> Self {
        self.ctx.set_fetcher(Arc::new(fetcher));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Replace the per-frame hook. It runs first in every processed tick.
    pub fn set_update_callback(&mut self, callback: impl FnMut(&mut EngineContext) + 'static) {
        self.update = Some(Box::new(callback));
    }

    /// Compose `logic` and register it under `name`.
    ///
    /// Registering a name twice replaces the earlier scene; if that scene is active it is
    /// stopped and its entities are removed.
    pub fn add_scene(&mut self, name: impl Into<String>, logic: impl SceneLogic + 'static) -> Result<()> {
        let name = name.into();
        let scene = Scene::compose(Box::new(logic), &mut self.ctx)?;
        if let Some(mut old) = self.scenes.insert(name.clone(), scene) {
            log::warn!("scene '{name}' replaced");
            if self.active.as_deref() == Some(name.as_str()) {
                old.stop(&mut self.ctx);
                self.active = None;
            }
            for id in old.entities() {
                self.ctx.despawn(*id);
            }
        }
        Ok(())
    }

    /// Activate the scene registered under `name`, stopping the current one first.
    ///
    /// An unknown name is reported as [`EngineError::UnknownScene`] and leaves the active scene
    /// running.
    pub fn start_scene(&mut self, name: &str) -> Result<()> {
        if !self.scenes.contains_key(name) {
            log::warn!("no scene named '{name}'");
            return Err(EngineError::UnknownScene(name.to_string()).into());
        }

        self.stop_scene();

        let Some(scene) = self.scenes.get_mut(name) else {
            return Err(EngineError::UnknownScene(name.to_string()).into());
        };
        log::info!("starting scene '{name}'");
        self.active = Some(name.to_string());
        scene.start(&mut self.ctx)
    }

    /// Stop the active scene, leaving none running. Returns the name of the stopped scene.
    pub fn stop_scene(&mut self) -> Option<String> {
        let previous = self.active.take()?;
        if let Some(scene) = self.scenes.get_mut(&previous) {
            log::debug!("stopping scene '{previous}'");
            scene.stop(&mut self.ctx);
        }
        Some(previous)
    }

    pub fn active_scene(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.get(name)
    }

    /// Start the scheduler at `now` and hand out the raw input listener.
    ///
    /// # Panics
    ///
    /// Panics if the engine is already running.
    pub fn start(&mut self, now: Instant) -> InputListener {
        if self.running {
            panic!("{}", EngineError::AlreadyStarted);
        }
        self.running = true;
        self.last_frame = Some(now);
        log::info!(
            "engine started at {} Hz ({:?} per tick)",
            self.config.frame_rate,
            self.frame_interval
        );
        self.ctx.input_listener()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run one scheduler tick at `now`. Returns false if the tick was skipped.
    pub fn frame(&mut self, now: Instant) -> bool {
        let Some(last) = self.last_frame.filter(|_| self.running) else {
            return false;
        };
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.frame_interval {
            return false;
        }

        // Keep the remainder so the cadence does not drift.
        let interval = self.frame_interval.as_nanos();
        let remainder = if interval == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos((elapsed.as_nanos() % interval) as u64)
        };
        self.last_frame = Some(now - remainder);
        self.ctx.update_time(elapsed);

        self.ctx.begin_tick();
        if let Some(update) = self.update.as_mut() {
            update(&mut self.ctx);
        }
        self.ctx.dispatch_keys();
        self.ctx.step_camera();
        log::trace!("frame {} at {:.1} fps", self.ctx.frame_count, self.ctx.fps);
        self.ctx.input.end_tick();

        match self.ctx.pending_scene.take() {
            Some(SceneRequest::Start(name)) => {
                if let Err(err) = self.start_scene(&name) {
                    log::error!("switching to scene '{name}' failed: {err:#}");
                }
            }
            Some(SceneRequest::Stop) => {
                self.stop_scene();
            }
            None => {}
        }
        true
    }

    /// Start the engine and tick it for as long as `host` keeps producing frames.
    pub fn run(&mut self, host: &mut impl FrameHost) {
        let listener = self.start(host.now());
        host.attach(listener);
        while host.next_frame() {
            self.frame(host.now());
        }
    }

    /// See [`EngineContext::remove_input_listeners`].
    pub fn remove_input_listeners(&mut self, key: &str) -> bool {
        self.ctx.remove_input_listeners(key)
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.ctx
    }
}

/// Scheduling primitive that drives [`Engine::run`].
pub trait FrameHost {
    fn now(&mut self) -> Instant;

    /// Block until the next frame opportunity. Returning false ends the run.
    fn next_frame(&mut self) -> bool;

    /// Receives the raw input handle once the engine has started.
    fn attach(&mut self, _listener: InputListener) {}
}

/// Host that sleeps between frame opportunities, optionally for a fixed number of frames.
#[derive(Debug, Clone)]
pub struct SleepHost {
    resolution: Duration,
    remaining: Option<u64>,
}

impl SleepHost {
    pub fn new(resolution: Duration) -> Self {
        Self {
            resolution,
            remaining: None,
        }
    }

    #[must_use]
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.remaining = Some(frames);
        self
    }
}

impl FrameHost for SleepHost {
    fn now(&mut self) -> Instant {
        Instant::now()
    }

    fn next_frame(&mut self) -> bool {
        match self.remaining.as_mut() {
            Some(0) => return false,
            Some(n) => *n -= 1,
            None => {}
        }
        std::thread::sleep(self.resolution);
        true
    }
}
