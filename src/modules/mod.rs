pub mod books;

use bookshelf_db::Database;
use bookshelf_kernel::settings::Settings;
use bookshelf_kernel::ModuleRegistry;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, database: &Database, settings: &Settings) {
    let store = books::BookStore::new(
        database.pool().clone(),
        settings.catalog.books_per_shelf,
    );
    registry.register_custom(books::create_module(store));
}
