//! Host pipeline driven end to end with the demo engine on the simulated board.

use engine_demo::{indicator_origin, DemoEngine, BUILTIN_IMAGE};
use host_core::engine::{Engine, EngineAdapter, EngineState};
use host_core::host::{HostConfig, HostContext, RunLimit, RunOutcome};
use host_core::key::{Button, KeyEvent};
use host_core::peripherals::TouchState;
use host_core::sim::{ScriptedTouch, SdramFault, SimBoard, SimDisplay, SimSdram, PANEL_HEIGHT, PANEL_WIDTH, SDRAM_BASE, SDRAM_SIZE};
use host_core::touch_pad::TouchKeypadLayout;
use host_core::Framebuffer;

fn config() -> HostConfig {
    HostConfig {
        splash_ms: 0,
        ..HostConfig::default()
    }
}

fn board_with_touch(script: Vec<TouchState>) -> SimBoard {
    SimBoard::with_parts(
        SimDisplay::new(PANEL_WIDTH, PANEL_HEIGHT),
        SimSdram::new(SDRAM_BASE, SDRAM_SIZE),
        ScriptedTouch::new(script),
    )
}

fn touch_on(button: Button) -> TouchState {
    let layout = TouchKeypadLayout::default();
    let r = layout
        .regions
        .iter()
        .find(|r| r.button == button)
        .expect("button in default layout");
    TouchState::at(r.x + 2, r.y + 2)
}

/// Physical colour of the top-left pixel of a button indicator under the default blit.
fn shown_indicator(display: &SimDisplay, button: Button) -> u32 {
    let (x, y) = indicator_origin(button);
    display.pixel(144 + 2 * x as u32, 2 * y as u32)
}

#[test]
fn render_after_load_changes_framebuffer() {
    let mut adapter = EngineAdapter::new(DemoEngine::builtin());
    let mut fb = Framebuffer::new();

    // The engine must be loaded first; the adapter refuses otherwise
    assert!(adapter.render_into(&mut fb).is_err());

    adapter.initialize().unwrap();
    adapter.load().unwrap();
    adapter.render_into(&mut fb).unwrap();

    assert!(!fb.is_blank());
    assert_eq!(adapter.state(), EngineState::Running);
}

#[test]
fn key_latch_is_independent_of_frame_cadence() {
    for frames_between in [0usize, 1, 7] {
        let mut engine = DemoEngine::builtin();
        engine.initialize();
        assert!(engine.load());
        let mut fb = Framebuffer::new();
        let (x, y) = indicator_origin(Button::A);

        engine.update_key(KeyEvent::PressA);
        for _ in 0..frames_between {
            engine.render_into(fb.as_array_mut());
            assert_eq!(fb.pixel(x, y), [0xFF; 3]);
        }
        engine.render_into(fb.as_array_mut());
        assert_eq!(fb.pixel(x, y), [0xFF; 3]);
        assert!(engine.latch().is_pressed(Button::A));

        engine.update_key(KeyEvent::ReleaseA);
        engine.render_into(fb.as_array_mut());
        assert_ne!(fb.pixel(x, y), [0xFF; 3]);
    }
}

#[test]
fn boot_shows_status_screen_and_runs_frames() {
    let mut host = HostContext::new(SimBoard::new(), DemoEngine::builtin(), config()).unwrap();
    let report = host.boot().clone();
    assert!(report.all_passed(), "{:?}", report);
    assert!(host.board().performance_enabled());

    let outcome = host.run(RunLimit::Frames(3)).unwrap();
    assert_eq!(outcome, RunOutcome::Completed { frames: 3 });
    assert_eq!(host.engine().frames(), 3);
    assert_eq!(host.board().display.pixel_writes(), 3 * 240 * 256 * 4);
    assert_eq!(host.board().display.text_at(5, 5), Some("2"));
    assert_eq!(host.board().touch.polls(), 3);
}

#[test]
fn touch_press_reaches_engine_through_keypad() {
    let script = vec![TouchState::NONE, touch_on(Button::B), touch_on(Button::B), TouchState::NONE];
    let mut host = HostContext::new(board_with_touch(script), DemoEngine::builtin(), config()).unwrap();
    host.boot();

    host.run(RunLimit::Frames(1)).unwrap();
    assert_ne!(shown_indicator(&host.board().display, Button::B), 0xFFFF_FFFF);

    host.run(RunLimit::Frames(2)).unwrap();
    assert_eq!(shown_indicator(&host.board().display, Button::B), 0xFFFF_FFFF);
    assert_ne!(shown_indicator(&host.board().display, Button::A), 0xFFFF_FFFF);

    host.run(RunLimit::Frames(1)).unwrap();
    assert_ne!(shown_indicator(&host.board().display, Button::B), 0xFFFF_FFFF);
}

#[test]
fn rejected_image_skips_frame_loop() {
    let mut image = BUILTIN_IMAGE.to_vec();
    image[0] = b'X';
    let mut host = HostContext::new(SimBoard::new(), DemoEngine::new(image), config()).unwrap();
    let report = host.boot().clone();
    assert!(!report.engine_load.is_passed());

    assert_eq!(host.run(RunLimit::Frames(5)).unwrap(), RunOutcome::SkippedLoadFailed);
    assert_eq!(host.board().display.pixel_writes(), 0);
    assert_eq!(host.engine().state(), EngineState::Initialized);
}

#[test]
fn rejected_image_with_run_on_failure_is_refused_by_adapter() {
    let config = HostConfig {
        run_on_load_failure: true,
        ..config()
    };
    let mut host = HostContext::new(SimBoard::new(), DemoEngine::new(Vec::new()), config).unwrap();
    host.boot();
    assert!(host.run(RunLimit::Frames(1)).is_err());
}

#[test]
fn failed_peripherals_do_not_stop_boot() {
    let board = SimBoard::with_parts(
        SimDisplay::new(PANEL_WIDTH, PANEL_HEIGHT).failing_init(),
        SimSdram::new(SDRAM_BASE, SDRAM_SIZE).with_fault(SdramFault::StuckBit { bit: 0 }),
        ScriptedTouch::idle().failing_init(),
    );
    let config = HostConfig {
        splash_ms: 1500,
        ..HostConfig::default()
    };
    let mut host = HostContext::new(board, DemoEngine::builtin(), config).unwrap();

    let report = host.boot().clone();
    assert_eq!(host.board().elapsed_ms(), 1500);
    assert!(report.sdram_init.is_passed());
    assert_eq!(report.self_test.first_failure(), Some("compare"));
    assert!(!report.display_init.is_passed());
    assert!(!report.touch_init.is_passed());
    assert!(report.engine_load.is_passed());

    // Failures are diagnostic only: the loop still runs
    assert_eq!(
        host.run(RunLimit::Frames(2)).unwrap(),
        RunOutcome::Completed { frames: 2 }
    );
}

#[test]
fn splash_is_cleared_and_keypad_drawn() {
    let mut host = HostContext::new(SimBoard::new(), DemoEngine::builtin(), config()).unwrap();
    host.boot();
    let display = &host.board().display;
    assert!(!display.has_text("SDRAM Initialization : OK"));
    assert!(display.has_text("START"));
    assert_eq!(display.pixel(400, 240), 0xFF00_0000);
}

#[test]
fn debug_state_serializes() {
    let mut host = HostContext::new(SimBoard::new(), DemoEngine::builtin(), config()).unwrap();
    host.boot();
    host.run(RunLimit::Frames(1)).unwrap();
    let state = host.debug_state();
    assert_eq!(state["engine_state"], "Running");
    assert_eq!(state["frame_counter"], 1);
    assert_eq!(state["boot"]["core_clock_hz"], 216_000_000);
    let text = serde_json::to_string_pretty(&state).unwrap();
    assert!(text.contains("self_test"));
}
