use crate::models::band::Band;

/// Overall band from whichever module bands are present.
///
/// Zero bands count as absent. The mean is rounded to the nearest half
/// band (`round(mean * 2) / 2`); with nothing to average the result is unset.
pub fn compute_overall(bands: &[Band]) -> Option<Band> {
    let present: Vec<f64> = bands
        .iter()
        .filter(|b| !b.is_zero())
        .map(|b| b.value())
        .collect();
    if present.is_empty() {
        return None;
    }
    let mean = present.iter().sum::<f64>() / present.len() as f64;
    Band::rounded(mean).ok()
}
