#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> Result<(), eframe::Error> {
    // Set up logging for development
    env_logger::init();

    // File dialogs are spawned on the tokio runtime
    finetune_tool::run_app()
}

// The web build starts through `finetune_tool::start_web`.
#[cfg(target_arch = "wasm32")]
fn main() {}
