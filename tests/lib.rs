//! Shared fixtures for the behaviour tests.

use std::path::Path;

use bourse_warehouse::{Warehouse, WarehouseConfig, WarehouseError};
use tempfile::TempDir;

/// Observations recorded for `AAA` (rising value) and `BBB` (flat value).
pub const AAA_OBSERVATIONS: usize = 30;
pub const BBB_OBSERVATIONS: usize = 25;

const SEED_SQL: &str = r"
INSERT INTO markets VALUES (1, 'Euronext Paris', 'PAR'), (2, 'Euronext Amsterdam', 'AMS');
INSERT INTO companies VALUES
    (1, 'Alpha Industries', 'AAA', 1),
    (2, 'Beta Holdings', 'BBB', 1),
    (3, 'Gamma NV', 'CCC', 2);
INSERT INTO stocks
    SELECT TIMESTAMP '2024-01-01 09:00:00' + to_days(CAST(i AS INTEGER)), 1, 10.0 + i, 1000 + i
    FROM range(30) t(i);
INSERT INTO stocks
    SELECT TIMESTAMP '2024-01-01 09:00:00' + to_days(CAST(i AS INTEGER)), 2, 50.0, 200
    FROM range(25) t(i);
";

/// A seeded on-disk store that lives as long as its temp directory.
pub struct Fixture {
    pub dir: TempDir,
    pub warehouse: Warehouse,
}

impl Fixture {
    pub fn config(&self, read_only: bool) -> WarehouseConfig {
        config_in(self.dir.path(), read_only)
    }
}

pub fn config_in(dir: &Path, read_only: bool) -> WarehouseConfig {
    WarehouseConfig {
        bourse_home: dir.to_path_buf(),
        db_path: dir.join("bourse.duckdb"),
        read_only,
    }
}

/// Open a fresh store under a temp directory and load the reference data.
pub fn seeded_store() -> Result<Fixture, WarehouseError> {
    let dir = TempDir::new()?;
    let warehouse = Warehouse::open(config_in(dir.path(), false))?;
    warehouse.connection()?.execute_batch(SEED_SQL)?;
    Ok(Fixture { dir, warehouse })
}
