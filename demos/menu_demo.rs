//! Menu demo
//!
//! Drives a small settings menu on the host terminal. Left/Right switch
//! panels, Up/Down walk controls, Enter engages, Escape backs out.
//!
//! Set `CRYSTALLINE_LOG` (e.g. `CRYSTALLINE_LOG=crystalline=debug`) to log
//! to stderr. Pass `--grid 16x2` to emulate a fixed character display.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crystalline::{
    shared, ButtonControl, ContentRef, ControlPanel, CrosstermBackend, DecimalControl,
    DecimalStepper, IntegerControl, IntegerStepper, LabelControl, LayoutRef, MenuLayout,
    NavigationPanel, Popup, PopupKind, Property, Switch, SwitchControl, Toggle, ToggleControl,
    UiContext,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

const TICK_MS: u32 = 30;
const PROGRESS_SPAN: Duration = Duration::from_secs(3);

fn init_logging() {
    if std::env::var_os("CRYSTALLINE_LOG").is_none() {
        return;
    }
    let filter = EnvFilter::from_env("CRYSTALLINE_LOG");
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

/// Parse a `WxH` character grid such as `16x2`.
fn parse_grid(value: &str) -> Result<(u16, u16), String> {
    let (w, h) = value
        .split_once('x')
        .ok_or_else(|| format!("expected WxH, got `{value}`"))?;
    let w: u16 = w.parse().map_err(|e| format!("bad width `{w}`: {e}"))?;
    let h: u16 = h.parse().map_err(|e| format!("bad height `{h}`: {e}"))?;
    if w == 0 || h == 0 {
        return Err(format!("grid `{value}` has no cells"));
    }
    Ok((w, h))
}

#[derive(Parser)]
#[command(name = "menu_demo")]
#[command(about = "Settings menu on a character display")]
struct Args {
    /// Emulate a fixed character display, e.g. `16x2`. Defaults to the
    /// terminal size.
    #[arg(long, value_name = "WxH", value_parser = parse_grid)]
    grid: Option<(u16, u16)>,
}

fn cell_property<T: Copy + 'static>(cell: &Rc<Cell<T>>) -> Property<T> {
    let (r, w) = (cell.clone(), cell.clone());
    Property::read_write(move || r.get(), move |v| w.set(v))
}

fn settings_panel() -> LayoutRef {
    let volume = Rc::new(Cell::new(4));
    let contrast = Rc::new(Cell::new(0.5_f32));
    let backlight = Rc::new(Cell::new(true));
    let mode = Rc::new(Cell::new(0));

    let controls: Vec<ContentRef> = vec![
        shared(IntegerControl::new(
            "Volume",
            cell_property(&volume),
            IntegerStepper {
                suffix: "dB".into(),
            },
        ))
        .into(),
        shared(DecimalControl::new(
            "Contrast",
            cell_property(&contrast),
            DecimalStepper::default(),
        ))
        .into(),
        shared(ToggleControl::new(
            "Light",
            cell_property(&backlight),
            Toggle::default(),
        ))
        .into(),
        shared(SwitchControl::new(
            "Mode",
            cell_property(&mode),
            Switch::new(["Eco", "Normal", "Boost"]),
        ))
        .into(),
    ];
    shared(ControlPanel::new("Settings", controls)).into()
}

fn system_panel() -> LayoutRef {
    let confirm = shared(Popup::new(
        "Reset all?",
        1,
        PopupKind::dialog(|_, yes| {
            tracing::info!(yes, "reset dialog answered");
            true
        }),
    ));
    let lock = shared(Popup::new(
        "Code",
        2,
        PopupKind::lock(4, true, |ui, entry| {
            if entry == "1234" {
                return true;
            }
            let denied = shared(Popup::new("Denied", 3, PopupKind::warning("Wrong code")));
            ui.show_popup(denied.into());
            false
        }),
    ));

    let started = Rc::new(Cell::new(Instant::now()));
    let clock = started.clone();
    let progress = shared(Popup::new(
        "Saving",
        0,
        PopupKind::progress(move || {
            clock.get().elapsed().as_secs_f32() / PROGRESS_SPAN.as_secs_f32()
        }),
    ));

    let controls: Vec<ContentRef> = vec![
        shared(LabelControl::new("crystalline")).into(),
        shared(ButtonControl::new("Reset", move |ui: &mut UiContext| {
            ui.show_popup(confirm.clone().into());
        }))
        .into(),
        shared(ButtonControl::new("Unlock", move |ui: &mut UiContext| {
            ui.show_popup(lock.clone().into());
        }))
        .into(),
        shared(ButtonControl::new("Save", move |ui: &mut UiContext| {
            started.set(Instant::now());
            ui.show_popup(progress.clone().into());
        }))
        .into(),
        shared(ButtonControl::inert("Disabled")).into(),
    ];
    shared(ControlPanel::new("System", controls)).into()
}

fn run(ui: &mut UiContext, quit: &Cell<bool>) -> crystalline::Result<()> {
    while !quit.get() {
        ui.read_input(TICK_MS);
        ui.update()?;
    }
    Ok(())
}

fn main() -> crystalline::Result<()> {
    let args = Args::parse();
    init_logging();

    let quit = Rc::new(Cell::new(false));
    let exit = quit.clone();
    let panels = vec![
        settings_panel(),
        system_panel(),
        shared(NavigationPanel::new("Exit", move |_| exit.set(true))).into(),
    ];
    let menu: LayoutRef = shared(MenuLayout::new(panels)).into();

    let backend = Box::new(CrosstermBackend::new(args.grid));
    let mut ui = UiContext::begin(backend, menu)?;
    ui.set_debug(std::env::var_os("CRYSTALLINE_LOG").is_some());

    // The terminal is restored even when a tick fails.
    let result = run(&mut ui, &quit);
    ui.end()?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crystalline::{HeadlessBackend, Interaction, Key};

    #[test]
    fn test_grid_flag() {
        let args = Args::try_parse_from(["menu_demo", "--grid", "16x2"]).unwrap();
        assert_eq!(args.grid, Some((16, 2)));
        assert_eq!(Args::try_parse_from(["menu_demo"]).unwrap().grid, None);
        assert!(Args::try_parse_from(["menu_demo", "--grid", "16x"]).is_err());
        assert!(Args::try_parse_from(["menu_demo", "--grid", "0x2"]).is_err());
    }

    #[test]
    fn test_run_stops_when_exit_is_chosen() {
        let quit = Rc::new(Cell::new(false));
        let exit = quit.clone();
        let panels = vec![shared(NavigationPanel::new("Exit", move |_| exit.set(true))).into()];
        let menu: LayoutRef = shared(MenuLayout::new(panels)).into();
        let mut ui = UiContext::begin(Box::new(HeadlessBackend::new(16, 2)), menu).unwrap();
        ui.update().unwrap();
        ui.interact(Interaction::down(Key::Enter));
        assert!(run(&mut ui, &quit).is_ok());
        assert!(ui.end().is_ok());
    }
}
