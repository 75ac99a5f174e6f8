/// Fuse a text and an image embedding of the same item into one vector.
///
/// `w` is the cosine similarity between the two modalities, clamped to
/// `[0, 1]`; the result is `w*t + (1-w)*i`. Vectors that disagree collapse
/// toward the image; vectors that agree bias toward text. If either vector
/// has zero norm, `w = 0.5`. This is reproduced as specified, including the
/// degenerate case where anti-correlated modalities push `w` toward 0 — it
/// is not special-cased.
pub fn fuse(text: &[f32], image: &[f32]) -> Vec<f32> {
    let dim = text.len().min(image.len());
    let t = &text[..dim];
    let i = &image[..dim];

    let dot: f32 = t.iter().zip(i).map(|(a, b)| a * b).sum();
    let norm_t = (t.iter().map(|v| v * v).sum::<f32>()).sqrt();
    let norm_i = (i.iter().map(|v| v * v).sum::<f32>()).sqrt();

    let w = if norm_t == 0.0 || norm_i == 0.0 {
        0.5
    } else {
        (dot / (norm_t * norm_i)).clamp(0.0, 1.0)
    };

    t.iter().zip(i).map(|(a, b)| w * a + (1.0 - w) * b).collect()
}
