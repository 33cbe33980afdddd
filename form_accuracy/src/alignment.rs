use log::warn;

// Label of the header cells that sit in the rating columns.
const HEADER_LABEL: &str = "Misalignment";

/// The severity attached to a misalignment rating written in the ground truth.
///
/// Returns None for empty cells, for the column header and for values that are
/// not one of the standard ratings (those are reported).
pub fn misalignment_rating(cell: &str) -> Option<u32> {
    match cell.trim() {
        "" => None,
        "none" => Some(0),
        "small" => Some(2),
        "medium" => Some(5),
        "large" => Some(10),
        HEADER_LABEL => None,
        other => {
            warn!("misalignment_rating: non-standardized value {:?}", other);
            None
        }
    }
}

/// The mean misalignment rating of a form. Higher is worse.
///
/// None if no cell carries a rating.
pub fn alignment_score(cells: &[Option<String>]) -> Option<f64> {
    let ratings: Vec<u32> = cells
        .iter()
        .flatten()
        .filter_map(|c| misalignment_rating(c))
        .collect();
    if ratings.is_empty() {
        None
    } else {
        Some(ratings.iter().sum::<u32>() as f64 / ratings.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(v: &[Option<&str>]) -> Vec<Option<String>> {
        v.iter().map(|c| c.map(|s| s.to_string())).collect()
    }

    #[test]
    fn ratings() {
        assert_eq!(misalignment_rating("none"), Some(0));
        assert_eq!(misalignment_rating(" small "), Some(2));
        assert_eq!(misalignment_rating("medium"), Some(5));
        assert_eq!(misalignment_rating("large"), Some(10));
        assert_eq!(misalignment_rating("Misalignment"), None);
        assert_eq!(misalignment_rating("huge"), None);
        assert_eq!(misalignment_rating(""), None);
    }

    #[test]
    fn mean_over_rated_cells() {
        let c = cells(&[Some("small"), None, Some("large"), Some("??"), Some("none")]);
        assert_eq!(alignment_score(&c), Some(4.0));
    }

    #[test]
    fn no_rating() {
        assert_eq!(alignment_score(&cells(&[None, Some("Misalignment")])), None);
        assert_eq!(alignment_score(&[]), None);
    }
}
