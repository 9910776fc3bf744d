//! On-demand scene summaries

use aroundme_eye::EnrichedDetection;

const NOTHING_DETECTED: &str = "No objects detected";
const DESCRIBE_LIMIT: usize = 5;

/// Count summary, e.g. "I can see 2 persons, 1 car"
pub fn scan_summary(detections: &[EnrichedDetection]) -> String {
    if detections.is_empty() {
        return NOTHING_DETECTED.to_string();
    }

    // first-seen order
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for detection in detections {
        match counts.iter_mut().find(|(label, _)| *label == detection.label()) {
            Some((_, count)) => *count += 1,
            None => counts.push((detection.label(), 1)),
        }
    }

    let parts: Vec<String> = counts
        .into_iter()
        .map(|(label, count)| {
            if count > 1 {
                format!("{} {}s", count, label)
            } else {
                format!("{} {}", count, label)
            }
        })
        .collect();

    format!("I can see {}", parts.join(", "))
}

/// Position and distance of up to five obstacles
pub fn detailed_description(detections: &[EnrichedDetection]) -> String {
    if detections.is_empty() {
        return NOTHING_DETECTED.to_string();
    }

    let mut text = String::from("Detailed scan. ");
    for detection in detections.iter().take(DESCRIBE_LIMIT) {
        text.push_str(&detection.description);
        text.push_str(". ");
    }
    text
}
