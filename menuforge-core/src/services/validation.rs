use crate::errors::{CatalogError, CatalogResult};

const MAX_NAME_LEN: usize = 120;
const MAX_SLUG_LEN: usize = 120;

/// Input checks shared by every catalog write.
pub struct CatalogValidator;

impl CatalogValidator {
    /// Trim and validate a display name.
    pub fn validate_name(field: &str, name: &str) -> CatalogResult<String> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(CatalogError::validation(format!("{field} is required")));
        }

        if trimmed.chars().count() > MAX_NAME_LEN {
            return Err(CatalogError::validation(format!(
                "{field} is too long (max {MAX_NAME_LEN} characters)"
            )));
        }

        Ok(trimmed.to_string())
    }

    /// Trim and validate a slug: lowercase letters, digits and single
    /// hyphens.
    pub fn validate_slug(slug: &str) -> CatalogResult<String> {
        let trimmed = slug.trim();

        if trimmed.is_empty() {
            return Err(CatalogError::validation("Slug is required"));
        }

        if trimmed.len() > MAX_SLUG_LEN {
            return Err(CatalogError::validation(format!(
                "Slug is too long (max {MAX_SLUG_LEN} characters)"
            )));
        }

        let valid_chars = trimmed
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid_chars || trimmed.starts_with('-') || trimmed.ends_with('-') || trimmed.contains("--")
        {
            return Err(CatalogError::validation(format!(
                "Slug '{trimmed}' may only contain lowercase letters, digits and single hyphens"
            )));
        }

        Ok(trimmed.to_string())
    }

    /// Reject an id list that names the same id twice.
    pub fn validate_unique_ids(ids: &[i32]) -> CatalogResult<()> {
        let mut seen = std::collections::HashSet::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(*id) {
                return Err(CatalogError::validation(format!("Id {id} is listed twice")));
            }
        }
        Ok(())
    }
}

/// Candidate slug for the `attempt`-th copy of `base`.
pub fn copy_slug(base: &str, attempt: usize) -> String {
    if attempt <= 1 {
        format!("{base}-copy")
    } else {
        format!("{base}-copy-{attempt}")
    }
}

pub fn copy_name(name: &str) -> String {
    format!("{name} (copy)")
}
