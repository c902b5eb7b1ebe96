//! Interactive session: reads commands from stdin and drives the controller

use crate::console::{ConsoleRenderer, ConsoleSurface};
use crate::settings::Settings;
use crate::source::DataSource;
use geo::Point;
use parcel_locator_lib::{ClickOutcome, LookupError, SelectionController};
use std::io::Stdout;
use std::ops::ControlFlow;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

type Controller =
    SelectionController<DataSource, ConsoleRenderer<Stdout>, ConsoleSurface<Stdout>>;

const HELP: &str = "\
commands:
  click <lon> <lat>   select the parcel at a point
  pan <dx> <dy>       move the map by pixels
  zoom <level>        set the zoom level
  clear               drop the selection
  reload              retry loading region boundaries
  status              show the session state
  help                show this text
  quit                exit";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to set up data source: {0}")]
    Source(#[from] LookupError),

    #[error("Failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),

    #[error("`{command}` expects {expected}")]
    Arguments {
        command: &'static str,
        expected: &'static str,
    },
}

/// A parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Click { lon: f64, lat: f64 },
    Pan { dx: f64, dy: f64 },
    Zoom(f64),
    Clear,
    Reload,
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        let numbers = |command: &'static str, expected: &'static str, count: usize| {
            let values: Option<Vec<f64>> = args
                .iter()
                .map(|a| {
                    a.trim_end_matches(',')
                        .parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite())
                })
                .collect();
            values
                .filter(|v| v.len() == count && args.len() == count)
                .ok_or(CommandError::Arguments { command, expected })
        };

        Ok(match name.as_str() {
            "click" => {
                let v = numbers("click", "<lon> <lat>", 2)?;
                Command::Click { lon: v[0], lat: v[1] }
            }
            "pan" => {
                let v = numbers("pan", "<dx> <dy> in pixels", 2)?;
                Command::Pan { dx: v[0], dy: v[1] }
            }
            "zoom" => Command::Zoom(numbers("zoom", "<level>", 1)?[0]),
            "clear" => Command::Clear,
            "reload" => Command::Reload,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        })
    }
}

/// Run the session until `quit` or end of input
pub async fn run(settings: Settings) -> Result<(), AppError> {
    let source = DataSource::from_settings(&settings)?;
    let renderer = ConsoleRenderer::new(
        settings.center,
        settings.zoom,
        (settings.viewport_width, settings.viewport_height),
        std::io::stdout(),
    );
    let surface = ConsoleSurface::new(std::io::stdout());
    let controller: Arc<Controller> = Arc::new(SelectionController::with_fetcher(
        settings.to_config(),
        source,
        renderer,
        surface,
    ));

    let mut tasks = JoinSet::new();
    // Boundaries load in the background; clicks before that report "not ready"
    tasks.spawn(load_regions(controller.clone()));

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if handle(command, &controller, &mut tasks).is_break() {
            break;
        }

        // Reap finished clicks so the set does not grow for the whole session
        while tasks.try_join_next().is_some() {}
    }

    tasks.join_all().await;
    tracing::info!("Session ended");
    Ok(())
}

/// Apply one command. Everything that decides ordering happens before this
/// returns; only lookups that wait on data continue in `tasks`.
fn handle(
    command: Command,
    controller: &Arc<Controller>,
    tasks: &mut JoinSet<()>,
) -> ControlFlow<()> {
    tracing::debug!("Command: {command:?}");

    match command {
        Command::Click { lon, lat } => {
            // Taken now, so a later command always supersedes this click
            let pending = controller.begin(Point::new(lon, lat));
            let controller = controller.clone();
            tasks.spawn(async move {
                report(controller.resolve(pending).await);
            });
        }
        Command::Pan { dx, dy } => {
            let notify = controller.with_presenter(|p| {
                p.renderer_mut().pan(dx, dy);
                p.renderer().has_view_listeners()
            });
            if notify {
                controller.on_view_changed();
            }
        }
        Command::Zoom(level) => {
            let notify = controller.with_presenter(|p| {
                p.renderer_mut().set_zoom(level);
                p.renderer().has_view_listeners()
            });
            if notify {
                controller.on_view_changed();
            }
        }
        Command::Clear => controller.clear(),
        Command::Reload => {
            tasks.spawn(load_regions(controller.clone()));
        }
        Command::Status => print_status(controller),
        Command::Help => println!("{HELP}"),
        Command::Quit => return ControlFlow::Break(()),
    }
    ControlFlow::Continue(())
}

async fn load_regions(controller: Arc<Controller>) {
    match controller.load_regions().await {
        Ok(()) => println!("{} regions loaded", controller.regions().len()),
        // Already logged by the cache
        Err(e) => println!("! Boundary data failed to load ({e}). Use `reload` to retry."),
    }
}

fn report(outcome: ClickOutcome) {
    match outcome {
        ClickOutcome::Selected {
            region_code,
            parcel_code,
        } => println!("selected parcel {parcel_code} in region {region_code}"),
        ClickOutcome::Superseded => tracing::debug!("Click superseded by a newer one"),
        // The surface has already shown the notice
        _ => {}
    }
}

fn print_status(controller: &Controller) {
    let (zoom, (lon, lat), labels) = controller.with_presenter(|p| {
        (
            p.renderer().zoom(),
            p.renderer().center(),
            p.surface().live_labels(),
        )
    });
    println!("state:    {:?}", controller.state());
    println!(
        "regions:  {}",
        if controller.regions().is_ready() {
            controller.regions().len().to_string()
        } else {
            "not loaded".to_string()
        }
    );
    println!("cached:   {} region(s)", controller.parcels().cached_regions());
    match controller.selection() {
        Some(selection) => println!(
            "selected: {} in region {} ({labels} labels)",
            selection.parcel.code(),
            selection.region_code
        ),
        None => println!("selected: none"),
    }
    println!("view:     {lon:.6}, {lat:.6} @ z{zoom:.1}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcel_locator_lib::{Config, ControllerState, FileFetcher};
    use std::path::Path;

    fn rect(min: (f64, f64), max: (f64, f64)) -> String {
        format!(
            r#"{{"type":"Polygon","coordinates":[[[{x0},{y0}],[{x1},{y0}],[{x1},{y1}],[{x0},{y1}],[{x0},{y0}]]]}}"#,
            x0 = min.0,
            y0 = min.1,
            x1 = max.0,
            y1 = max.1
        )
    }

    /// One region R1 with parcels A and B side by side
    fn write_dataset(root: &Path) {
        std::fs::create_dir_all(root.join("geojson")).unwrap();
        std::fs::write(
            root.join("ranhgioi.geojson"),
            format!(
                r#"{{"type":"FeatureCollection","features":[{{"type":"Feature","properties":{{"MaXa":"R1"}},"geometry":{}}}]}}"#,
                rect((108.0, 16.0), (108.1, 16.1))
            ),
        )
        .unwrap();
        std::fs::write(
            root.join("geojson/R1.geojson"),
            format!(
                r#"{{"type":"FeatureCollection","features":[{{"type":"Feature","id":"A","geometry":{}}},{{"type":"Feature","id":"B","geometry":{}}}]}}"#,
                rect((108.050, 16.050), (108.051, 16.051)),
                rect((108.052, 16.050), (108.053, 16.051))
            ),
        )
        .unwrap();
    }

    async fn session(root: &Path) -> Arc<Controller> {
        write_dataset(root);
        let controller = Arc::new(SelectionController::with_fetcher(
            Config::default(),
            DataSource::File(FileFetcher::new(root)),
            ConsoleRenderer::new((108.05, 16.05), 18.0, (800, 600), std::io::stdout()),
            ConsoleSurface::new(std::io::stdout()),
        ));
        controller.load_regions().await.unwrap();
        controller
    }

    fn click(lon: f64, lat: f64) -> Command {
        Command::Click { lon, lat }
    }

    #[tokio::test]
    async fn test_clear_typed_after_click_wins() {
        let dir = tempfile::tempdir().unwrap();
        let controller = session(dir.path()).await;
        let mut tasks = JoinSet::new();

        assert!(handle(click(108.0505, 16.0505), &controller, &mut tasks).is_continue());
        assert!(handle(Command::Clear, &controller, &mut tasks).is_continue());
        tasks.join_all().await;

        assert!(controller.selection().is_none());
        assert_eq!(controller.state(), ControllerState::Idle);
        assert_eq!(controller.with_presenter(|p| p.surface().live_labels()), 0);
    }

    #[tokio::test]
    async fn test_later_click_wins() {
        let dir = tempfile::tempdir().unwrap();
        let controller = session(dir.path()).await;
        let mut tasks = JoinSet::new();

        let _ = handle(click(108.0505, 16.0505), &controller, &mut tasks);
        let _ = handle(click(108.0525, 16.0505), &controller, &mut tasks);
        tasks.join_all().await;

        let selection = controller.selection().unwrap();
        assert_eq!(selection.parcel.code(), "B");
        assert_eq!(controller.state(), ControllerState::Selected);
        assert_eq!(
            controller.with_presenter(|p| p.surface().live_labels()),
            selection.labels.len()
        );
    }

    #[tokio::test]
    async fn test_pan_and_quit() {
        let dir = tempfile::tempdir().unwrap();
        let controller = session(dir.path()).await;
        let mut tasks = JoinSet::new();

        let _ = handle(Command::Zoom(17.0), &controller, &mut tasks);
        let _ = handle(Command::Pan { dx: 10.0, dy: 0.0 }, &controller, &mut tasks);
        assert_eq!(controller.with_presenter(|p| p.renderer().zoom()), 17.0);
        assert!(handle(Command::Quit, &controller, &mut tasks).is_break());
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "click 108.05 16.05".parse::<Command>(),
            Ok(Command::Click {
                lon: 108.05,
                lat: 16.05
            })
        );
        assert_eq!(
            "  PAN -10 4.5 ".parse::<Command>(),
            Ok(Command::Pan { dx: -10.0, dy: 4.5 })
        );
        assert_eq!("zoom 17".parse::<Command>(), Ok(Command::Zoom(17.0)));
        assert_eq!("clear".parse::<Command>(), Ok(Command::Clear));
        assert_eq!("q".parse::<Command>(), Ok(Command::Quit));
    }

    #[test]
    fn test_click_accepts_comma_separated_pair() {
        assert_eq!(
            "click 108.05, 16.05".parse::<Command>(),
            Ok(Command::Click {
                lon: 108.05,
                lat: 16.05
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "click 108.05".parse::<Command>(),
            Err(CommandError::Arguments {
                command: "click",
                expected: "<lon> <lat>"
            })
        );
        assert!("click a b".parse::<Command>().is_err());
        assert!("zoom 1 2".parse::<Command>().is_err());
        assert!("zoom NaN".parse::<Command>().is_err());
        assert_eq!(
            "fly".parse::<Command>(),
            Err(CommandError::Unknown("fly".to_string()))
        );
    }
}
