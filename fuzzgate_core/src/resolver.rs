use crate::engine::FuzzEngine;
use crate::error::DriverError;
use crate::target::TargetCatalog;

/// Asks the engine which fuzz targets the project defines.
///
/// The engine's order is kept as-is. Failures are returned without retrying;
/// listing is cheap, so a failure here is a configuration problem worth seeing.
pub fn resolve_catalog<E: FuzzEngine + ?Sized>(
    engine: &mut E,
) -> Result<TargetCatalog, DriverError> {
    match engine.list_targets() {
        Ok(targets) => {
            log::debug!("Engine reported {} fuzz target(s)", targets.len());
            Ok(TargetCatalog::new(targets))
        }
        Err(DriverError::CatalogUnavailable(reason)) => {
            Err(DriverError::CatalogUnavailable(reason))
        }
        Err(other) => Err(DriverError::CatalogUnavailable(other.to_string())),
    }
}
