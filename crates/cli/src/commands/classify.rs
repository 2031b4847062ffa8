//! `doki classify`: subject and topic detection only.

use doki_subjects::SubjectClassifier;

pub fn run(text: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let classifier = SubjectClassifier::default();
    let detection = classifier.detect(text);

    if json {
        println!("{}", serde_json::to_string_pretty(&detection)?);
        return Ok(());
    }

    println!(
        "  {} {} ({})",
        classifier.icon(&detection.subject),
        classifier.display_name(&detection.subject),
        detection.subject
    );
    println!("  Topic:      {}", detection.topic.as_deref().unwrap_or("-"));
    println!("  Confidence: {:.2}", detection.confidence);
    if !detection.matched_keywords.is_empty() {
        println!("  Keywords:   {}", detection.matched_keywords.join(", "));
    }
    Ok(())
}
