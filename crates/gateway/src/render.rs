use inference::Detection;

/// Render detections as one line of JSON terminated by a single `\n`.
pub fn render_detections(detections: &[Detection]) -> Result<String, serde_json::Error> {
    let mut body = serde_json::to_string(detections)?;
    body.push('\n');
    Ok(body)
}
