//! Parcel Locator - terminal front end
//!
//! Reads `click`, `pan`, `zoom` and other commands from stdin and prints the
//! highlighted parcel, its edge labels and attributes.

mod app;
mod console;
mod logging;
mod settings;
mod source;

use settings::Settings;

fn main() {
    let settings = Settings::from_cli();
    logging::setup_logging();
    tracing::debug!("Settings: {settings:?}");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start the async runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(app::run(settings)) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
