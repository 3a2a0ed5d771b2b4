use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use anyhow::Result;
use domforge::{
    Engine, EngineConfig, EngineError, Entity, HeadlessSurface, SceneContext, SceneLogic,
    ScenePhase, UiPanel,
};

type Trace = Rc<RefCell<Vec<String>>>;

/// Scene with `entities` boxes, one key binding and one panel, recording its hooks.
struct Recorder {
    name: &'static str,
    entities: usize,
    trace: Trace,
}

impl Recorder {
    fn new(name: &'static str, entities: usize, trace: &Trace) -> Self {
        Self {
            name,
            entities,
            trace: Rc::clone(trace),
        }
    }

    fn note(&self, hook: &str) {
        self.trace.borrow_mut().push(format!("{}:{hook}", self.name));
    }
}

impl SceneLogic for Recorder {
    fn compose(&mut self, scene: &mut SceneContext<'_>) -> Result<()> {
        for n in 0..self.entities {
            let x = 10.0 + n as f32 * 20.0;
            scene.spawn(Entity::new(x, 10.0, 16.0, 16.0, "#abc"));
        }
        self.note("compose");
        Ok(())
    }

    fn input_handler(&mut self, scene: &mut SceneContext<'_>) -> Result<()> {
        scene.add_custom_input(format!("{}-key", self.name), |_| {}, |_| {});
        self.note("input");
        Ok(())
    }

    fn start_logic(&mut self, _scene: &mut SceneContext<'_>) -> Result<()> {
        self.note("logic");
        Ok(())
    }

    fn ui_logic(&mut self, scene: &mut SceneContext<'_>) -> Result<()> {
        scene.add_panel(UiPanel::new(self.name).with_content(self.name));
        self.note("ui");
        Ok(())
    }
}

fn setup() -> (Engine, HeadlessSurface, Trace) {
    let surface = HeadlessSurface::new(640.0, 480.0);
    let engine = Engine::new(EngineConfig::default(), surface.clone());
    (engine, surface, Trace::default())
}

#[test]
fn start_runs_hooks_in_order() {
    let (mut engine, _, trace) = setup();
    engine.add_scene("level", Recorder::new("level", 2, &trace)).unwrap();
    assert_eq!(engine.scene("level").unwrap().phase(), ScenePhase::Constructed);
    assert!(engine.context().attached_entities().is_empty());

    engine.start_scene("level").unwrap();
    assert_eq!(
        *trace.borrow(),
        ["level:compose", "level:input", "level:logic", "level:ui"]
    );
    assert_eq!(engine.active_scene(), Some("level"));
    assert_eq!(engine.context().attached_entities().len(), 2);
    assert!(engine.context().is_key_registered("level-key"));
}

#[test]
fn switching_scenes_keeps_one_scene_attached() {
    let (mut engine, surface, trace) = setup();
    engine.add_scene("level", Recorder::new("level", 3, &trace)).unwrap();
    engine.add_scene("menu", Recorder::new("menu", 1, &trace)).unwrap();

    engine.start_scene("level").unwrap();
    engine.start_scene("menu").unwrap();

    let level = engine.scene("level").unwrap();
    assert_eq!(level.phase(), ScenePhase::Stopped);
    assert_eq!(level.registered_inputs().count(), 0);
    assert!(level.panels().is_empty());

    let menu_entities = engine.scene("menu").unwrap().entities().to_vec();
    assert_eq!(engine.context().attached_entities(), menu_entities.as_slice());
    assert!(!engine.context().is_key_registered("level-key"));
    assert!(engine.context().is_key_registered("menu-key"));
    // One entity box plus the menu panel.
    assert_eq!(surface.attached_nodes().len(), 2);
}

#[test]
fn restart_reattaches_and_rebinds() {
    let (mut engine, _, trace) = setup();
    engine.add_scene("level", Recorder::new("level", 2, &trace)).unwrap();
    engine.add_scene("empty", Recorder::new("empty", 0, &trace)).unwrap();

    engine.start_scene("level").unwrap();
    engine.start_scene("empty").unwrap();
    engine.start_scene("level").unwrap();

    assert_eq!(engine.context().attached_entities().len(), 2);
    assert!(engine.context().is_key_registered("level-key"));
    let starts = trace.borrow().iter().filter(|t| *t == "level:input").count();
    assert_eq!(starts, 2);
}

#[test]
fn unknown_scene_leaves_active_scene_running() {
    let (mut engine, _, trace) = setup();
    engine.add_scene("level", Recorder::new("level", 1, &trace)).unwrap();
    engine.start_scene("level").unwrap();

    let err = engine.start_scene("credits").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::UnknownScene(name)) if name == "credits"
    ));
    assert_eq!(engine.active_scene(), Some("level"));
    assert_eq!(engine.context().attached_entities().len(), 1);
}

#[test]
fn replacing_the_active_scene_stops_it() {
    let (mut engine, surface, trace) = setup();
    engine.add_scene("level", Recorder::new("level", 2, &trace)).unwrap();
    engine.start_scene("level").unwrap();

    engine.add_scene("level", Recorder::new("level", 1, &trace)).unwrap();
    assert_eq!(engine.active_scene(), None);
    assert!(engine.context().attached_entities().is_empty());
    assert!(!engine.context().is_key_registered("level-key"));
    // Only the replacement's detached box remains.
    assert_eq!(surface.node_count(), 1);
}

#[test]
fn requested_scene_switch_happens_after_the_tick() {
    let (mut engine, _, trace) = setup();
    engine.add_scene("level", Recorder::new("level", 1, &trace)).unwrap();
    engine.add_scene("menu", Recorder::new("menu", 1, &trace)).unwrap();
    engine.start_scene("level").unwrap();
    engine
        .context_mut()
        .add_custom_input("Escape", |ctx| ctx.request_scene("menu"), |_| {});

    let t0 = Instant::now();
    let listener = engine.start(t0);
    listener.key_down("Escape");
    assert!(engine.frame(t0 + engine.frame_interval()));

    assert_eq!(engine.active_scene(), Some("menu"));
    assert_eq!(engine.scene("level").unwrap().phase(), ScenePhase::Stopped);
}

struct Failing;

impl SceneLogic for Failing {
    fn compose(&mut self, scene: &mut SceneContext<'_>) -> Result<()> {
        scene.spawn(Entity::new(1.0, 1.0, 4.0, 4.0, "#f00"));
        scene.spawn(Entity::new(9.0, 1.0, 4.0, 4.0, "#f00"));
        anyhow::bail!("broken level data")
    }
}

#[test]
fn compose_errors_are_returned_and_cleaned_up() {
    let (mut engine, surface, _) = setup();
    let err = engine.add_scene("broken", Failing).unwrap_err();
    assert_eq!(err.to_string(), "broken level data");
    assert!(engine.scene("broken").is_none());
    assert!(engine.context().world().is_empty());
    assert_eq!(surface.node_count(), 0);
}

/// Spawns one projectile every time it starts.
struct Spawner;

impl SceneLogic for Spawner {
    fn compose(&mut self, scene: &mut SceneContext<'_>) -> Result<()> {
        scene.spawn(Entity::new(5.0, 5.0, 10.0, 10.0, "#00f"));
        Ok(())
    }

    fn start_logic(&mut self, scene: &mut SceneContext<'_>) -> Result<()> {
        scene.spawn(Entity::new(50.0, 50.0, 2.0, 2.0, "#ff0"));
        Ok(())
    }
}

#[test]
fn restarting_does_not_accumulate_hook_entities() {
    let (mut engine, surface, trace) = setup();
    engine.add_scene("a", Spawner).unwrap();
    engine.add_scene("b", Recorder::new("b", 0, &trace)).unwrap();

    for _ in 0..3 {
        engine.start_scene("a").unwrap();
        engine.start_scene("b").unwrap();
    }
    engine.start_scene("a").unwrap();

    let scene = engine.scene("a").unwrap();
    assert_eq!(scene.entities().len(), 1);
    assert_eq!(scene.transient_entities().len(), 1);
    assert_eq!(engine.context().attached_entities().len(), 2);
    // Composed box plus the current projectile.
    assert_eq!(engine.context().world().len(), 2);
    assert_eq!(surface.node_count(), 2);
}

#[test]
fn stop_scene_undoes_start() {
    let (mut engine, surface, trace) = setup();
    engine.add_scene("level", Recorder::new("level", 2, &trace)).unwrap();
    engine.start_scene("level").unwrap();

    assert_eq!(engine.stop_scene().as_deref(), Some("level"));
    assert_eq!(engine.active_scene(), None);
    assert_eq!(engine.stop_scene(), None);

    let level = engine.scene("level").unwrap();
    assert_eq!(level.phase(), ScenePhase::Stopped);
    assert!(level.panels().is_empty());
    assert_eq!(level.registered_inputs().count(), 0);
    assert!(engine.context().attached_entities().is_empty());
    assert_eq!(engine.context().registered_keys().count(), 0);
    assert!(surface.attached_nodes().is_empty());
}

#[test]
fn requested_stop_happens_after_the_tick() {
    let (mut engine, _, trace) = setup();
    engine.add_scene("level", Recorder::new("level", 1, &trace)).unwrap();
    engine.start_scene("level").unwrap();
    engine
        .context_mut()
        .add_custom_input("q", |ctx| ctx.request_stop(), |_| {});

    let t0 = Instant::now();
    let listener = engine.start(t0);
    listener.key_down("q");
    assert!(engine.frame(t0 + engine.frame_interval()));

    assert_eq!(engine.active_scene(), None);
    assert!(engine.context().attached_entities().is_empty());
}
