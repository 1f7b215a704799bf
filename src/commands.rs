use crate::{OutputMode, emit_success};
use std::path::{Path, PathBuf};
use stockroom::config::{self, StockroomConfig};
use stockroom::ui::{self, Icons};
use stockroom::{Catalog, Error, FileSlot, ImportMode, Product, ProductFields};

/// Effective settings after merging defaults, config file and flags
pub struct Settings {
    pub config_path: PathBuf,
    pub storage: PathBuf,
    pub key: String,
    pub quota: Option<usize>,
}

impl Settings {
    pub fn resolve(
        config_path: Option<&Path>,
        storage: Option<PathBuf>,
        key: Option<String>,
    ) -> anyhow::Result<Self> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(config::default_config_path);
        let file = config::load_config(Some(&config_path))?.unwrap_or_default();

        Ok(Self {
            storage: storage.unwrap_or_else(|| file.storage_path()),
            key: key.unwrap_or_else(|| file.key().to_string()),
            quota: file.quota(),
            config_path,
        })
    }

    fn open_catalog(&self) -> anyhow::Result<Catalog<FileSlot>> {
        let slot = FileSlot::open(&self.storage).with_quota(self.quota);
        let catalog = Catalog::open(slot, self.key.clone())?;
        if let stockroom::catalog::OpenState::Recovered { reason } = catalog.open_state() {
            ui::warn(&format!("Saved catalog was unreadable ({}); starting empty", reason));
        }
        Ok(catalog)
    }
}

/// A requested change to one optional field
pub enum Change<T> {
    Keep,
    Set(T),
    Clear,
}

impl<T> Change<T> {
    pub fn from_flags(value: Option<T>, clear: bool) -> Self {
        match (value, clear) {
            (_, true) => Change::Clear,
            (Some(v), false) => Change::Set(v),
            (None, false) => Change::Keep,
        }
    }

    fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Change::Keep => current,
            Change::Set(v) => Some(v),
            Change::Clear => None,
        }
    }
}

/// Field edits for `edit`; anything not mentioned keeps its value
pub struct FieldEdit {
    pub name: Option<String>,
    pub barcode: Change<String>,
    pub price: Change<f64>,
    pub description: Change<String>,
}

impl FieldEdit {
    fn apply(self, current: &Product) -> ProductFields {
        let base = ProductFields::from(current);
        ProductFields {
            name: self.name.unwrap_or(base.name),
            barcode: self.barcode.apply(base.barcode),
            price: self.price.apply(base.price),
            description: self.description.apply(base.description),
        }
    }
}

fn print_product(product: &Product) {
    ui::section(&format!("Product #{}", product.id));
    ui::summary_row("Name:", &product.name);
    ui::summary_row("Barcode:", product.barcode.as_deref().unwrap_or("-"));
    ui::summary_row(
        "Price:",
        &product.price.map(|p| format!("{:.2}", p)).unwrap_or_else(|| "-".to_string()),
    );
    ui::summary_row("Description:", product.description.as_deref().unwrap_or("-"));
    ui::summary_row("Created:", &product.created_at);
    ui::summary_row("Updated:", &product.updated_at);
}

pub fn run_init(settings: &Settings, force: bool, output_mode: OutputMode) -> anyhow::Result<()> {
    let mut cfg = StockroomConfig::with_defaults();
    cfg.storage = Some(settings.storage.display().to_string());
    cfg.key = Some(settings.key.clone());
    config::write_config(&settings.config_path, &cfg, force)?;

    if output_mode.is_human() {
        ui::success(&format!("Wrote {}", settings.config_path.display()));
        ui::info("Storage", &settings.storage.display().to_string());
        ui::info("Key", &settings.key);
    } else {
        emit_success(output_mode, "init", serde_json::to_value(&cfg)?)?;
    }
    Ok(())
}

pub fn run_add(settings: &Settings, fields: ProductFields, output_mode: OutputMode) -> anyhow::Result<()> {
    let mut catalog = settings.open_catalog()?;
    let product = catalog.create(fields)?;

    if output_mode.is_human() {
        ui::success(&format!("{} Added #{} {}", Icons::NEW, product.id, product.name));
    } else {
        emit_success(output_mode, "add", serde_json::to_value(&product)?)?;
    }
    Ok(())
}

pub fn run_edit(settings: &Settings, id: i64, edit: FieldEdit, output_mode: OutputMode) -> anyhow::Result<()> {
    let mut catalog = settings.open_catalog()?;
    let current = catalog.get(id)?.ok_or(Error::NotFound(id))?;
    let product = catalog.update(id, edit.apply(&current))?;

    if output_mode.is_human() {
        ui::success(&format!("{} Updated #{} {}", Icons::EDIT, product.id, product.name));
    } else {
        emit_success(output_mode, "edit", serde_json::to_value(&product)?)?;
    }
    Ok(())
}

pub fn run_remove(settings: &Settings, id: i64, output_mode: OutputMode) -> anyhow::Result<()> {
    let mut catalog = settings.open_catalog()?;

    // A missing id is reported, not treated as a failure
    let deleted = match catalog.delete(id) {
        Ok(()) => true,
        Err(Error::NotFound(_)) => false,
        Err(e) => return Err(e.into()),
    };

    if output_mode.is_human() {
        if deleted {
            ui::success(&format!("{} Removed #{}", Icons::DEL, id));
        } else {
            ui::warn(&format!("No product with id {}", id));
        }
    } else {
        emit_success(output_mode, "remove", serde_json::json!({ "id": id, "deleted": deleted }))?;
    }
    Ok(())
}

pub fn run_show(settings: &Settings, id: i64, output_mode: OutputMode) -> anyhow::Result<()> {
    let catalog = settings.open_catalog()?;
    let product = catalog.get(id)?.ok_or(Error::NotFound(id))?;

    if output_mode.is_human() {
        print_product(&product);
    } else {
        emit_success(output_mode, "show", serde_json::to_value(&product)?)?;
    }
    Ok(())
}

pub fn run_search(settings: &Settings, term: Option<&str>, output_mode: OutputMode) -> anyhow::Result<()> {
    let catalog = settings.open_catalog()?;
    let products = catalog.search(term)?;

    if output_mode.is_human() {
        match term.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => ui::header(&format!("{} Searching for '{}'", Icons::SEARCH, t)),
            None => ui::header("All products"),
        }
        if products.is_empty() {
            println!("{} No products found.", Icons::CROSS);
        } else {
            println!("{}", ui::product_table(&products));
            ui::summary_row("Matches:", &products.len().to_string());
        }
    } else {
        emit_success(
            output_mode,
            "search",
            serde_json::json!({ "term": term, "products": products }),
        )?;
    }
    Ok(())
}

pub fn run_export(settings: &Settings, output: Option<&Path>, output_mode: OutputMode) -> anyhow::Result<()> {
    let catalog = settings.open_catalog()?;
    let sql = catalog.export_sql()?;
    let count = catalog.stats()?.products;

    match output {
        Some(path) => {
            std::fs::write(path, &sql).map_err(Error::from)?;
            if output_mode.is_human() {
                ui::success(&format!("{} Exported {} products to {}", Icons::EXPORT, count, path.display()));
            } else {
                emit_success(
                    output_mode,
                    "export",
                    serde_json::json!({ "products": count, "path": path.display().to_string() }),
                )?;
            }
        }
        None if output_mode.is_human() => print!("{}", sql),
        None => emit_success(output_mode, "export", serde_json::json!({ "products": count, "sql": sql }))?,
    }
    Ok(())
}

pub fn run_import(settings: &Settings, file: &Path, mode: ImportMode, output_mode: OutputMode) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file).map_err(Error::from)?;
    let mut catalog = settings.open_catalog()?;
    let summary = catalog.import_sql(&text, mode)?;

    if output_mode.is_human() {
        ui::header(&format!("{} Imported {} ({} mode)", Icons::IMPORT, file.display(), mode));
        ui::summary_row("Imported:", &summary.imported.to_string());
        ui::summary_row("Failed:", &summary.failed.to_string());
        ui::summary_row("Ignored:", &summary.ignored.to_string());
        ui::summary_row("Rows added:", &summary.rows.to_string());
        if summary.rolled_back {
            ui::warn("Nothing could be imported; existing products were kept");
        } else if summary.failed > 0 {
            ui::warn(&format!("{} statements were skipped because they failed", summary.failed));
        }
    } else {
        emit_success(output_mode, "import", serde_json::to_value(&summary)?)?;
    }
    Ok(())
}

pub fn run_stats(settings: &Settings, output_mode: OutputMode) -> anyhow::Result<()> {
    let catalog = settings.open_catalog()?;
    let stats = catalog.stats()?;

    if output_mode.is_human() {
        ui::header(&format!("{} Catalog statistics", Icons::STATS));
        ui::info("Storage", &format!("{} ({})", settings.storage.display(), settings.key));
        let products = stats.products.to_string();
        let with_barcode = stats.with_barcode.to_string();
        let with_price = stats.with_price.to_string();
        let image = format!("{} bytes", stats.image_bytes);
        println!(
            "{}",
            ui::stats_table(&[
                ("Products", products.as_str()),
                ("With barcode", with_barcode.as_str()),
                ("With price", with_price.as_str()),
                ("Image size", image.as_str()),
            ])
        );
    } else {
        emit_success(output_mode, "stats", serde_json::to_value(&stats)?)?;
    }
    Ok(())
}

pub fn run_reset(settings: &Settings, yes: bool, output_mode: OutputMode) -> anyhow::Result<()> {
    if !yes {
        anyhow::bail!("reset deletes every product; pass --yes to confirm");
    }

    let mut catalog = settings.open_catalog()?;
    let removed = catalog.stats()?.products;
    catalog.reset()?;

    if output_mode.is_human() {
        ui::success(&format!("{} Reset catalog ({} products removed)", Icons::DATABASE, removed));
    } else {
        emit_success(output_mode, "reset", serde_json::json!({ "removed": removed }))?;
    }
    Ok(())
}
