mod app;
mod data;
mod layout;
mod util;

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to the cluster hierarchy JSON file.
    #[arg(long)]
    hierarchy: PathBuf,

    /// Directory with per-subcluster topic files (`<id>.json`).
    #[arg(long)]
    topics: Option<PathBuf>,
}

fn main() -> eframe::Result<()> {
    let _ = env_logger::builder().format_timestamp(None).try_init();

    let args = Args::parse();
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "clioscope",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::ClioApp::new(
                cc,
                args.hierarchy.clone(),
                args.topics.clone(),
            )))
        }),
    )
}
