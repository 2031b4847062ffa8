//! `doki moderate`: run the safety gate on one message.

use crate::runtime;
use doki_security::SafetyGate;

pub fn run(text: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = runtime::load_config()?;
    let gate = SafetyGate::from_config(&config.safety)?;
    let verdict = gate.evaluate(text);

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(());
    }

    match verdict.reason {
        None => println!("  ✅ Approved"),
        Some(reason) => {
            println!("  🚫 {:?} ({reason})", verdict.outcome);
            println!("  {}", verdict.user_message);
        }
    }
    Ok(())
}
