//! `doki health`: is the language backend up, and is the model installed?

use crate::runtime;
use doki_brain::ResponseGenerator;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = runtime::load_config()?;
    let provider = doki_providers::build_from_config(&config.llm)?;
    let generator = ResponseGenerator::from_config(provider, &config.llm);
    let report = generator.health().await;

    println!("🩺 Doki Health");
    println!("==============\n");
    println!("  Backend:  {}", report.backend);
    println!("  Model:    {}", report.model);

    if !report.reachable {
        match &report.error {
            Some(e) => println!("  ❌ Backend unreachable: {e}"),
            None => println!("  ❌ Backend unreachable"),
        }
        if report.backend == "ollama" {
            println!("     Start it with `ollama serve`.");
        }
        return Ok(());
    }

    println!("  ✅ Backend reachable");
    if report.model_installed {
        println!("  ✅ Model installed");
    } else if !report.available_models.is_empty() {
        println!("  ⚠️  Model `{}` not found. Installed:", report.model);
        for model in &report.available_models {
            println!("     - {model}");
        }
    }
    Ok(())
}
