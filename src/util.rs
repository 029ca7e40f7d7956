pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let mu = mean(data)?;
    let sum_sq: f64 = data.iter().map(|x| (x - mu).powi(2)).sum();
    Some((sum_sq / data.len() as f64).sqrt())
}

/// `part / whole` as a percentage, 0 when there is nothing to divide by
pub fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64) * 100.0
}
