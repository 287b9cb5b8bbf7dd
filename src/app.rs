//! Application bootstrap: wires settings, the database and the module
//! registry together and drives the module lifecycle around the HTTP server.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use bookshelf_db::{Database, DatabaseModule};
use bookshelf_kernel::settings::Settings;
use bookshelf_kernel::{InitCtx, ModuleRegistry};

use crate::modules;

pub struct Application {
    settings: Settings,
    database: Database,
    registry: ModuleRegistry,
}

impl Application {
    /// Connect to the database and register every module. Nothing is
    /// initialized yet; see [`Application::start`].
    pub async fn build(settings: Settings) -> anyhow::Result<Self> {
        let database = Database::connect(&settings.database)
            .await
            .context("failed to open the book store")?;

        let mut registry = ModuleRegistry::new();
        registry.register_core(Arc::new(DatabaseModule::new(database.clone())));
        modules::register_all(&mut registry, &database, &settings);

        Ok(Self {
            settings,
            database,
            registry,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Apply pending migrations. Returns how many ran.
    pub async fn migrate(&self) -> anyhow::Result<usize> {
        let applied = self
            .database
            .migrate(&self.registry)
            .await
            .context("failed to apply migrations")?;
        tracing::info!(applied, "migrations complete");
        Ok(applied)
    }

    /// Initialize modules, apply migrations, then start modules.
    pub async fn start(&self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
            db: self.database.pool(),
        };

        self.registry.init_core_modules(&ctx).await?;
        self.registry.init_custom_modules(&ctx).await?;
        self.migrate().await?;
        self.registry.start_core_modules(&ctx).await?;
        self.registry.start_custom_modules(&ctx).await?;
        Ok(())
    }

    /// Stop custom modules, then core modules. The database closes last.
    pub async fn stop(&self) -> anyhow::Result<()> {
        self.registry.stop_custom_modules().await?;
        self.registry.stop_core_modules().await?;
        Ok(())
    }

    /// The fully layered router, as served by [`Application::serve`].
    pub fn router(&self) -> anyhow::Result<Router> {
        bookshelf_http::build_router(&self.registry, &self.settings)
    }

    /// Start, serve until `shutdown` resolves, then stop.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.start().await?;

        let served = bookshelf_http::start_server(&self.registry, &self.settings, shutdown).await;
        let stopped = self.stop().await;

        served?;
        stopped
    }
}
