//! Boutique commands.

use super::{CliError, data_client, supabase_config};

/// List boutiques whose name or address matches `term`.
///
/// # Errors
///
/// Returns an error if the boutiques cannot be read.
pub async fn list(term: &str) -> Result<(), CliError> {
    let config = supabase_config()?;
    let boutiques = data_client(&config).list_boutiques().await?;
    let matched = maison_core::boutique::search(&boutiques, term);

    tracing::info!(shown = matched.len(), total = boutiques.len(), "Boutiques");
    for boutique in matched {
        let location = boutique
            .coordinates()
            .map_or_else(|| "-".to_string(), |(lat, lon)| format!("{lat:.4}, {lon:.4}"));
        tracing::info!(
            "  {:<28} {:<40} {}",
            boutique.name,
            boutique.address.as_deref().unwrap_or("-"),
            location
        );
    }
    Ok(())
}
