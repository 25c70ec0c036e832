//! Business logic services for the warehouse inventory service

pub mod category;
pub mod inventory;
pub mod ledger;
pub mod sku;
pub mod supplier;

pub use category::CategoryService;
pub use inventory::InventoryService;
pub use ledger::StockLedger;
pub use sku::SkuRegistry;
pub use supplier::SupplierService;

/// `%keyword%` for ILIKE with `%`, `_` and `\\` matched literally, or None
/// when there is nothing to search for
pub(crate) fn keyword_pattern(keyword: Option<&str>) -> Option<String> {
    keyword
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| {
            let escaped = k
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{}%", escaped)
        })
}
