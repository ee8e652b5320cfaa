use crate::domain::Location;

/// Locations served when none are configured: the filesystem root on unix,
/// one location per mounted drive letter on Windows.
pub fn discover_locations() -> Vec<Location> {
    #[cfg(windows)]
    {
        ('A'..='Z')
            .filter(|letter| std::path::Path::new(&format!("{letter}:\\")).exists())
            .map(|letter| {
                Location::filesystem(
                    letter.to_ascii_lowercase().to_string(),
                    format!("{letter}:"),
                    format!("{letter}:\\"),
                )
            })
            .collect()
    }

    #[cfg(not(windows))]
    {
        vec![Location::filesystem("root", "/", "/")]
    }
}
