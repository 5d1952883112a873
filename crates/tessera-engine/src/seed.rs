//! Initial pattern: an RLE file stamped at the region origin, or a soup.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use tessera_core::config::SeedConfig;
use tessera_core::engine::IncrementalEngine;
use tessera_core::rle;
use tessera_rules::RuleDefinition;
use tracing::{info, warn};

use crate::error::AppError;

/// Build an engine for `rule` seeded as configured.
pub async fn seeded_engine(
    seed: &SeedConfig,
    rule: RuleDefinition,
) -> Result<IncrementalEngine, AppError> {
    let mut engine = IncrementalEngine::empty(rule);

    if let Some(path) = &seed.rle_path {
        let text = tokio::fs::read_to_string(path).await?;
        let decoded = rle::decode(&text)?;
        if let Some(declared) = decoded.header.rule.as_deref()
            && declared != engine.rule().rule_name()
        {
            warn!(
                declared,
                running = engine.rule().rule_name(),
                "Pattern was saved under a different rule"
            );
        }
        let written = engine.stamp(&decoded.grid, seed.region.origin())?;
        info!(
            path = %path.display(),
            width = decoded.header.width,
            height = decoded.header.height,
            written,
            "Seeded from RLE file"
        );
        return Ok(engine);
    }

    let rect = seed.region.to_rect()?;
    let mut rng = seed
        .rng_seed
        .map_or_else(SmallRng::from_os_rng, SmallRng::seed_from_u64);
    let writes = seed
        .soup
        .generate(&mut rng, Some(&rect), engine.rule().n_states())?;
    let written = engine.apply_edits(writes)?;
    info!(
        rect = %rect,
        rng_seed = seed.rng_seed,
        written,
        population = engine.population(),
        "Seeded from soup"
    );
    Ok(engine)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tessera_core::config::RegionConfig;
    use tessera_rules::LifeLike;
    use tessera_types::Coord;

    use super::*;

    fn conway() -> RuleDefinition {
        LifeLike::definition("B3/S23").unwrap()
    }

    #[tokio::test]
    async fn seeded_soup_is_reproducible() {
        let seed = SeedConfig {
            rng_seed: Some(3),
            ..SeedConfig::default()
        };
        let a = seeded_engine(&seed, conway()).await.unwrap();
        let b = seeded_engine(&seed, conway()).await.unwrap();
        assert_eq!(a.grid(), b.grid());
        assert!(a.population() > 0);
        assert_eq!(a.generation(), 0);
    }

    #[tokio::test]
    async fn rle_file_is_stamped_at_region_origin() {
        let path = std::env::temp_dir().join(format!("tessera-seed-{}.rle", std::process::id()));
        tokio::fs::write(&path, "x = 3, y = 1, rule = B3/S23\n3A$!")
            .await
            .unwrap();
        let seed = SeedConfig {
            rle_path: Some(path.clone()),
            region: RegionConfig {
                top: 7,
                left: -2,
                ..RegionConfig::default()
            },
            ..SeedConfig::default()
        };

        let engine = seeded_engine(&seed, conway()).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(engine.population(), 3);
        assert!(engine.grid().is_live(Coord::new(7, -2)));
        assert!(engine.grid().is_live(Coord::new(7, 0)));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let seed = SeedConfig {
            rle_path: Some("/nonexistent/tessera/seed.rle".into()),
            ..SeedConfig::default()
        };
        assert!(matches!(
            seeded_engine(&seed, conway()).await,
            Err(AppError::Io { .. })
        ));
    }
}
