mod logging;

use std::error::Error;

use shelf_adapters::memory::InMemoryStore;
use shelf_adapters::mysql::MysqlRecordStore;
use shelf_core::catalog::TableCatalog;
use shelf_core::settings::{BackendKind, BrowserSettings, FileSettingsStore, Settings};
use tracing::{info, warn};

fn run_app(
    settings: &Settings,
    run_tui: impl FnOnce(TableCatalog, BrowserSettings) -> Result<(), shelf_tui::TuiError>,
) -> Result<(), Box<dyn Error>> {
    let catalog = settings.catalog()?;
    info!(
        backend = ?settings.backend,
        tables = catalog.tables().len(),
        default_table = %settings.browser.default_table,
        "starting shelf"
    );
    run_tui(catalog, settings.browser.clone())?;
    Ok(())
}

/// The seeded demo library, or empty tables when the catalog was overridden.
fn demo_store(catalog: TableCatalog) -> InMemoryStore {
    if catalog == TableCatalog::library() {
        return InMemoryStore::library_demo();
    }
    warn!("custom catalog with the memory backend, starting without demo data");
    InMemoryStore::new(catalog)
}

fn main() -> Result<(), Box<dyn Error>> {
    let settings_store = FileSettingsStore::load_default()?;
    let wrote_template = settings_store.write_if_missing()?;
    let settings = settings_store.settings();
    logging::init_logging(&settings.logging.level, &settings_store.log_path())?;
    info!(
        path = %settings_store.path().display(),
        wrote_template,
        "settings loaded"
    );

    run_app(settings, |catalog, browser| match settings.backend {
        BackendKind::Memory => {
            let store_catalog = catalog.clone();
            shelf_tui::run(move || demo_store(store_catalog), catalog, browser)
        }
        BackendKind::Mysql => {
            let profile = settings.connection.clone();
            shelf_tui::run(
                move || MysqlRecordStore::from_profile(&profile),
                catalog,
                browser,
            )
        }
    })
}
