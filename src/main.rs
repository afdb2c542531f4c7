// GUI-subsystem binary on Windows: no console window for the editor.
// CLI mode (--input/-i) attaches to the parent terminal so println!/eprintln!
// reach it.
#![windows_subsystem = "windows"]

use eframe::egui;
use pixelstretch::app::PixelStretchApp;
use pixelstretch::{cli, logger};

fn main() -> Result<(), eframe::Error> {
    // -- Windows console management ------------------------------------
    #[cfg(target_os = "windows")]
    if cli::CliArgs::is_cli_mode() {
        unsafe extern "system" {
            fn AttachConsole(dwProcessId: u32) -> i32;
        }
        const ATTACH_PARENT_PROCESS: u32 = 0xFFFF_FFFF;
        unsafe {
            AttachConsole(ATTACH_PARENT_PROCESS);
        }
    }

    // -- CLI / headless mode ---------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        use clap::Parser;
        let args = cli::CliArgs::parse();
        logger::open(logger::Session::Batch);
        let code = cli::run(args);
        std::process::exit(if code == std::process::ExitCode::SUCCESS {
            0
        } else {
            1
        });
    }

    // -- GUI mode -----------------------------------------------------

    // Editor log (truncates the previous run's)
    logger::open(logger::Session::Editor);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 900.0])
            .with_title("PixelStretch"),
        ..Default::default()
    };

    eframe::run_native(
        "PixelStretch",
        options,
        Box::new(|cc| Box::new(PixelStretchApp::new(cc))),
    )
}
