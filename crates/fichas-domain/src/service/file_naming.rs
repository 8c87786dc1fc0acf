//! File names of the generated sheets

/// Characters of the driver name kept in the file name
pub const NAME_FRAGMENT_CHARS: usize = 10;

/// `Fluxo_<position>_<fragment>.xlsx`, where position is 1-based and the fragment is the
/// first ten characters of the driver name with whitespace turned into underscores.
pub fn sheet_file_name(position: usize, driver: &str) -> String {
    format!("Fluxo_{}_{}.xlsx", position, name_fragment(driver))
}

pub fn name_fragment(driver: &str) -> String {
    driver
        .chars()
        .take(NAME_FRAGMENT_CHARS)
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_truncates_then_replaces() {
        assert_eq!(sheet_file_name(3, "Carlos Eduardo"), "Fluxo_3_Carlos_Edu.xlsx");
        assert_eq!(name_fragment("Ana Lee"), "Ana_Lee");
    }

    #[test]
    fn test_empty_driver() {
        assert_eq!(sheet_file_name(1, ""), "Fluxo_1_.xlsx");
    }

    #[test]
    fn test_fragment_counts_characters() {
        assert_eq!(name_fragment("João Antônio Souza"), "João_Antôn");
    }
}
