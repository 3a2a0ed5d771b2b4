use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use domforge::{
    ButtonSnapshot, Camera, Engine, EngineConfig, EngineContext, Entity, GamepadSnapshot,
    HeadlessSurface, InputListener, RawInput, Rfx, StaticFetcher, UiPanel, Vec2,
};

struct Harness {
    engine: Engine,
    surface: HeadlessSurface,
    listener: InputListener,
    now: Instant,
}

impl Harness {
    fn new() -> Self {
        Self::with_engine(|e| e)
    }

    fn with_engine(configure: impl FnOnce(Engine) -> Engine) -> Self {
        let surface = HeadlessSurface::new(800.0, 600.0);
        let mut engine = configure(Engine::new(EngineConfig::default(), surface.clone()));
        let now = Instant::now();
        let listener = engine.start(now);
        Self {
            engine,
            surface,
            listener,
            now,
        }
    }

    /// Advance by one full interval and tick.
    fn tick(&mut self) -> bool {
        self.now += self.engine.frame_interval();
        self.engine.frame(self.now)
    }

    fn ctx(&mut self) -> &mut EngineContext {
        self.engine.context_mut()
    }
}

type Log = Rc<RefCell<Vec<&'static str>>>;

fn bind_logged(ctx: &mut EngineContext, key: &str, log: &Log) {
    let (start, stop) = (Rc::clone(log), Rc::clone(log));
    ctx.add_custom_input(
        key,
        move |_| start.borrow_mut().push("start"),
        move |_| stop.borrow_mut().push("stop"),
    );
}

#[test]
fn key_toggle_runs_start_stop_start() {
    let mut h = Harness::new();
    let log: Log = Rc::default();
    bind_logged(h.ctx(), "a", &log);

    h.listener.key_down("a");
    assert!(h.tick());
    h.listener.key_up("a");
    assert!(h.tick());
    h.listener.key_down("a");
    assert!(h.tick());

    assert_eq!(*log.borrow(), ["start", "stop", "start"]);
    assert!(h.engine.context().input().is_key_down("a"));
}

#[test]
fn ticks_inside_the_interval_are_skipped() {
    let mut h = Harness::new();
    let log: Log = Rc::default();
    bind_logged(h.ctx(), "a", &log);

    let half = h.engine.frame_interval() / 2;
    assert!(!h.engine.frame(h.now + half));
    assert!(log.borrow().is_empty());
    assert_eq!(h.engine.context().frame_count(), 0);

    assert!(h.tick());
    assert_eq!(log.borrow().len(), 1);
}

#[test]
#[should_panic(expected = "engine already started")]
fn second_start_panics() {
    let mut h = Harness::new();
    h.engine.start(h.now);
}

#[test]
fn update_callback_runs_before_key_callbacks() {
    let mut h = Harness::new();
    let log: Log = Rc::default();
    bind_logged(h.ctx(), "a", &log);
    let update_log = Rc::clone(&log);
    h.engine
        .set_update_callback(move |_| update_log.borrow_mut().push("update"));

    h.tick();
    assert_eq!(*log.borrow(), ["update", "stop"]);
}

#[test]
fn removing_a_key_stops_its_callbacks() {
    let mut h = Harness::new();
    let log: Log = Rc::default();
    bind_logged(h.ctx(), "a", &log);

    assert!(h.engine.remove_input_listeners("a"));
    assert!(!h.engine.remove_input_listeners("a"));
    assert!(!h.engine.remove_input_listeners("never-bound"));
    h.tick();
    assert!(log.borrow().is_empty());
}

#[test]
fn mouse_move_flags_position_for_one_tick() {
    let mut h = Harness::new();
    let log: Log = Rc::default();
    bind_logged(h.ctx(), "getMousePosition", &log);

    h.listener.mouse_move(Vec2::new(12.0, 34.0));
    h.tick();
    h.tick();
    assert_eq!(*log.borrow(), ["start", "stop"]);
    assert_eq!(h.engine.context().input().mouse_position(), Vec2::new(12.0, 34.0));
}

#[test]
fn mouse_buttons_use_numbered_keys() {
    let mut h = Harness::new();
    let log: Log = Rc::default();
    bind_logged(h.ctx(), "mouse2", &log);

    h.listener.mouse_down(2, Vec2::new(1.0, 1.0));
    h.tick();
    h.listener.mouse_up(2, Vec2::new(1.0, 1.0));
    h.tick();
    assert_eq!(*log.borrow(), ["start", "stop"]);
}

#[test]
fn gamepad_buttons_reach_registered_keys() {
    let mut h = Harness::new();
    let log: Log = Rc::default();
    bind_logged(h.ctx(), "gamepad0_button1", &log);

    let pad = GamepadSnapshot::new(0, "test pad").with_buttons(vec![
        ButtonSnapshot::default(),
        ButtonSnapshot {
            pressed: true,
            value: 1.0,
        },
    ]);
    h.listener.send(RawInput::GamepadConnected(pad));
    h.tick();
    h.listener.send(RawInput::GamepadDisconnected { index: 0 });
    h.tick();

    // Disconnecting leaves the last mirrored flag in place.
    assert_eq!(*log.borrow(), ["start", "start"]);
    assert!(h.engine.context().input().gamepad(0).is_none());
}

#[test]
fn camera_is_stepped_each_tick() {
    let mut h = Harness::new();
    let id = h.ctx().spawn(Entity::new(500.0, 400.0, 20.0, 40.0, "#fff"));
    h.ctx().attach(id);
    h.ctx().set_camera(Camera::new("#101010").following(id));

    h.tick();
    assert_eq!(h.surface.view_offset(), Vec2::new(110.0, 120.0));
    assert_eq!(h.surface.void_color(), "#101010");
}

#[test]
fn rfx_moves_its_entity_from_the_update_hook() {
    let mut h = Harness::new();
    let id = h.ctx().spawn(Entity::new(10.0, 10.0, 8.0, 8.0, "#0f0"));
    let rfx = Rfx::new(id, 100.0);
    h.engine.set_update_callback(move |ctx| {
        rfx.apply(ctx);
    });

    h.tick();
    let entity = h.engine.context().entity(id).unwrap();
    // (10 + 0.5) * 0.9 vertically, 10 * 0.9 horizontally.
    assert!((entity.position.y - 9.45).abs() < 1e-4);
    assert!((entity.position.x - 9.0).abs() < 1e-4);
    let node = h.surface.node(entity.node().unwrap()).unwrap();
    assert_eq!(node.position, entity.position);
}

#[test]
fn change_state_applies_style_once() {
    let mut h = Harness::new();
    let id = h.ctx().spawn(
        Entity::new(5.0, 5.0, 10.0, 10.0, "#000").with_animation_state("hit", "bgColor(FF0000)"),
    );
    assert!(h.ctx().change_state(id, "hit"));
    assert!(!h.ctx().change_state(id, "hit"));

    let node = h.engine.context().entity(id).unwrap().node().unwrap();
    assert_eq!(h.surface.style_writes(node), 1);
    assert!(h.surface.node(node).unwrap().style_text.contains("#FF0000"));
}

#[test]
fn ui_events_reach_panel_handlers() {
    let mut h = Harness::new();
    let clicks = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&clicks);
    h.ctx().add_panel(
        UiPanel::new("menu").with_handler("click", move |_| *counter.borrow_mut() += 1),
    );

    h.listener.ui_event("menu", "click");
    h.listener.ui_event("menu", "hover");
    h.listener.ui_event("other", "click");
    h.tick();
    assert_eq!(*clicks.borrow(), 1);
}

fn tick_until(h: &mut Harness, mut done: impl FnMut(&EngineContext) -> bool) -> bool {
    for _ in 0..200 {
        h.tick();
        if done(h.engine.context()) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn required_content_is_swapped_in_on_a_later_tick() {
    let mut h = Harness::with_engine(|e| {
        e.with_fetcher(StaticFetcher::new().with_page("/hud.html", "<p>hp 3</p>"))
    });
    let panel = h.ctx().add_panel(UiPanel::new("hud").with_content("loading"));
    h.ctx().require(panel, "/hud.html");

    let loaded = tick_until(&mut h, |ctx| {
        ctx.panel(panel).map(UiPanel::content) == Some("<p>hp 3</p>")
    });
    assert!(loaded);
    let node = h.engine.context().panel(panel).unwrap().node().unwrap();
    assert_eq!(h.surface.node(node).unwrap().content, "<p>hp 3</p>");
}

#[test]
fn failed_fetch_keeps_previous_content() {
    let mut h = Harness::with_engine(|e| e.with_fetcher(StaticFetcher::new()));
    let panel = h.ctx().add_panel(UiPanel::new("hud").with_content("loading"));
    h.ctx().require(panel, "/missing.html");

    for _ in 0..10 {
        h.tick();
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(h.engine.context().panel(panel).unwrap().content(), "loading");
}
