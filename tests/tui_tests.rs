use std::time::Duration;

use ratatui::backend::TestBackend;
use ratatui::Terminal;
use starscan::config::Config;
use starscan::engine::{EventQueue, ScanEngine};
use starscan::persist::{KeyValueStore, MemoryStore};
use starscan::tui::app::{Action, App, Screen};
use starscan::tui::ui::render;

fn setup_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
    let backend = TestBackend::new(width, height);
    Terminal::new(backend).unwrap()
}

fn make_app(targets: usize) -> App {
    let config = Config {
        seed: Some(11),
        target_count: targets,
        challenges: vec!["rate-click".to_string()],
        ..Config::default()
    };
    let store: Box<dyn KeyValueStore> = Box::new(MemoryStore::new());
    App::new(ScanEngine::new(config, store, EventQueue::new())).unwrap()
}

fn start(app: &mut App) {
    for c in "Nova".chars() {
        app.handle_action(Action::Char(c)).unwrap();
    }
    app.handle_action(Action::Confirm).unwrap();
}

fn draw(app: &App) -> String {
    let mut terminal = setup_terminal(100, 40);
    terminal
        .draw(|f| {
            render(f, app);
        })
        .unwrap();
    format!("{:?}", terminal.backend().buffer())
}

#[test]
fn test_render_welcome() {
    let app = make_app(6);
    let content = draw(&app);

    assert!(content.contains("starscan - Sector 7G"));
    assert!(content.contains("Welcome to the Cartography Academy"));
    assert!(content.contains("Designation: _"));
    assert!(content.contains("start mission"));
}

#[test]
fn test_render_welcome_typing() {
    let mut app = make_app(6);
    for c in "Vega".chars() {
        app.handle_action(Action::Char(c)).unwrap();
    }
    let content = draw(&app);
    assert!(content.contains("Designation: Vega_"));
}

#[test]
fn test_render_star_map() {
    let mut app = make_app(6);
    start(&mut app);
    assert_eq!(app.screen(), Screen::Map);

    let content = draw(&app);
    assert!(content.contains("Star Map"));
    assert!(content.contains("Alpha Centauri"));
    assert!(content.contains("Sirius"));
    assert!(content.contains("Systems Scanned: 0 / 6"));
    assert!(content.contains("Trainee Nova"));
    assert!(content.contains("Console"));
}

#[test]
fn test_render_briefing_popup() {
    let mut app = make_app(6);
    start(&mut app);
    app.handle_action(Action::Confirm).unwrap();

    let content = draw(&app);
    assert!(content.contains("Briefing"));
    assert!(content.contains("Power Surge Calibration"));
    assert!(content.contains("Target: Alpha Centauri (sys-0)"));
    assert!(content.contains("Press Enter to start calibration"));
}

#[test]
fn test_render_challenge_popup() {
    let mut app = make_app(6);
    start(&mut app);
    app.handle_action(Action::Confirm).unwrap();
    app.handle_action(Action::Confirm).unwrap();

    // Launch is still pending.
    let content = draw(&app);
    assert!(content.contains("Calibrating scanner..."));

    app.tick(Duration::from_millis(150)).unwrap();
    for _ in 0..3 {
        app.handle_action(Action::Press).unwrap();
    }
    let content = draw(&app);
    assert!(content.contains("Power Surge Calibration"));
    assert!(content.contains("Charge 3 / 15"));
}

#[test]
fn test_render_reset_prompt() {
    let mut app = make_app(6);
    start(&mut app);
    app.handle_action(Action::Char('r')).unwrap();

    let content = draw(&app);
    assert!(content.contains("Reset mission progress?"));
    assert!(content.contains("y: reset   n: keep"));
}

#[test]
fn test_render_completion() {
    let mut app = make_app(1);
    start(&mut app);
    app.handle_action(Action::Confirm).unwrap();
    app.handle_action(Action::Confirm).unwrap();
    app.tick(Duration::from_millis(150)).unwrap();
    for _ in 0..15 {
        app.handle_action(Action::Press).unwrap();
    }
    app.tick(Duration::from_millis(1000)).unwrap();
    assert_eq!(app.screen(), Screen::Completed);

    let content = draw(&app);
    assert!(content.contains("Mission Complete"));
    assert!(content.contains("Trainee Nova has charted Sector 7G."));
    assert!(content.contains("Systems charted: 1 / 1"));
    assert!(content.contains("new mission"));
}

#[test]
fn test_render_small_terminal() {
    let mut app = make_app(12);
    start(&mut app);
    let mut terminal = setup_terminal(40, 12);
    terminal
        .draw(|f| {
            render(f, &app);
        })
        .unwrap();
}
