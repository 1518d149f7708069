// Tue Jan 13 2026 - Alex

use windowed_wordcount::engine::EngineError;
use windowed_wordcount::ui;

fn main() {
    if let Err(e) = ui::cli::run() {
        let code = e
            .downcast_ref::<EngineError>()
            .map_or(1, |engine| engine.exit_code());
        ui::print_error(&format!("{:#}", e));
        std::process::exit(code);
    }
}
